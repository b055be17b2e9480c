use anyhow::{bail, Result};
use std::env;
use std::path::PathBuf;

use cantobench::{
    pipeline, sources, PipelineConfig, PipelineOutput, QuestionDataset, QuestionGenerator,
};

/// Default RNG seed for question sampling; override with --seed for a
/// different (still reproducible) draw
const DEFAULT_SEED: u64 = 20_240_101;

const DEFAULT_QUESTION_LIMIT: usize = 50;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let args: Vec<String> = env::args().collect();

    match args.get(1).map(String::as_str) {
        Some("extract") => run_extract(&args[2..]),
        Some("questions") => run_questions(&args[2..]),
        _ => {
            print_usage();
            Ok(())
        }
    }
}

fn print_usage() {
    println!("cantobench {} - Cantonese benchmark curation pipeline", cantobench::VERSION);
    println!();
    println!("Usage:");
    println!("  cantobench extract <triples_dir> <out_dir> [options]");
    println!("      Build person records, co-memberships and a run report");
    println!("  cantobench questions <triples_dir> <out_dir> [options]");
    println!("      Also generate teammate and birth-year question datasets");
    println!();
    println!("Options:");
    println!("  --paranames <file>   ParaNames TSV for extra Cantonese names");
    println!("  --table <file>       Hand-authored Lua translation table");
    println!("  --seed <n>           RNG seed for question sampling");
    println!("  --limit <n>          Max questions per dataset (default {})", DEFAULT_QUESTION_LIMIT);
}

struct CliOptions {
    config: PipelineConfig,
    out_dir: PathBuf,
    seed: u64,
    limit: usize,
}

fn parse_options(args: &[String]) -> Result<CliOptions> {
    if args.len() < 2 {
        bail!("expected <triples_dir> <out_dir>; run without arguments for usage");
    }

    let mut options = CliOptions {
        config: PipelineConfig {
            triples_dir: PathBuf::from(&args[0]),
            paranames_path: None,
            translation_table_path: None,
        },
        out_dir: PathBuf::from(&args[1]),
        seed: DEFAULT_SEED,
        limit: DEFAULT_QUESTION_LIMIT,
    };

    let mut rest = args[2..].iter();
    while let Some(flag) = rest.next() {
        let value = rest
            .next()
            .ok_or_else(|| anyhow::anyhow!("missing value for {}", flag))?;
        match flag.as_str() {
            "--paranames" => options.config.paranames_path = Some(PathBuf::from(value)),
            "--table" => options.config.translation_table_path = Some(PathBuf::from(value)),
            "--seed" => options.seed = value.parse()?,
            "--limit" => options.limit = value.parse()?,
            other => bail!("unknown option {}", other),
        }
    }

    Ok(options)
}

fn run_pipeline(options: &CliOptions) -> Result<PipelineOutput> {
    println!("Reading documents from {}...", options.config.triples_dir.display());
    let output = pipeline::run(&options.config)?;
    println!("✓ {}", output.report.summary());
    Ok(output)
}

fn write_records(options: &CliOptions, output: &PipelineOutput) -> Result<()> {
    sources::write_json(&options.out_dir.join("person_records.json"), &output.records)?;
    sources::write_json(
        &options.out_dir.join("co_memberships.json"),
        &output.co_memberships,
    )?;
    sources::write_json(&options.out_dir.join("run_report.json"), &output.report)?;
    sources::write_json(
        &options.out_dir.join("name_misses.json"),
        &output.report.name_misses,
    )?;

    println!("✓ Person records: {}", options.out_dir.join("person_records.json").display());
    println!("✓ Co-memberships: {}", options.out_dir.join("co_memberships.json").display());
    println!("✓ Run report:     {}", options.out_dir.join("run_report.json").display());

    if !output.report.name_misses.is_empty() {
        println!(
            "  {} entities have no Cantonese name; see name_misses.json",
            output.report.name_misses.len()
        );
    }

    Ok(())
}

fn run_extract(args: &[String]) -> Result<()> {
    let options = parse_options(args)?;
    let output = run_pipeline(&options)?;
    write_records(&options, &output)
}

fn run_questions(args: &[String]) -> Result<()> {
    let options = parse_options(args)?;
    let output = run_pipeline(&options)?;
    write_records(&options, &output)?;

    let mut generator = QuestionGenerator::new(options.seed);

    println!("\nGenerating teammate questions...");
    let teammate = generator.teammate_questions(
        &output.records,
        &output.co_memberships,
        &output.representative_orgs,
        options.limit,
    );
    println!("✓ Generated {} teammate questions", teammate.len());
    let teammate_dataset = QuestionDataset::new(
        "Multiple-choice questions about football player club teammate relationships in English and Cantonese",
        "club_teammate_relationship",
        teammate,
    );
    let teammate_path = options.out_dir.join("teammate_questions.json");
    sources::write_json(&teammate_path, &teammate_dataset)?;
    println!("✓ Saved to {}", teammate_path.display());

    println!("\nGenerating birth-year questions...");
    let birth_year = generator.birth_year_questions(&output.birth_records, options.limit);
    println!("✓ Generated {} birth-year questions", birth_year.len());
    let birth_year_dataset = QuestionDataset::new(
        "Multiple-choice questions about football players' birth years in English and Cantonese",
        "player_birth_year",
        birth_year,
    );
    let birth_year_path = options.out_dir.join("birth_year_questions.json");
    sources::write_json(&birth_year_path, &birth_year_dataset)?;
    println!("✓ Saved to {}", birth_year_path.display());

    Ok(())
}
