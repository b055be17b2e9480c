// Pipeline - stage orchestration
// Wires extraction -> classification -> resolution -> aggregation ->
// derivation over in-memory collections. Per-record trouble is skipped and
// logged; an unreadable or empty input collection aborts the run.

use anyhow::{bail, Result};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use tracing::{info, warn};

use crate::aggregate::{aggregate, is_representative_team, PersonRecord};
use crate::names::{NameResolver, ParaNames, TranslationTable, WikidataLabels};
use crate::questions::BirthRecord;
use crate::report::{RunReport, SkipRecord};
use crate::sources::scan_documents;
use crate::statement::StatementGraph;
use crate::teammates::{derive_co_memberships, CoMembership};
use crate::temporal::parse_year;

// ============================================================================
// CONFIG
// ============================================================================

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Directory of per-person JSON-LD documents
    pub triples_dir: PathBuf,

    /// Optional ParaNames TSV
    pub paranames_path: Option<PathBuf>,

    /// Optional hand-authored Lua translation table
    pub translation_table_path: Option<PathBuf>,
}

// ============================================================================
// OUTPUT
// ============================================================================

#[derive(Debug)]
pub struct PipelineOutput {
    pub records: Vec<PersonRecord>,
    pub co_memberships: Vec<CoMembership>,
    pub birth_records: Vec<BirthRecord>,

    /// Organization IDs the keyword heuristic flagged as national/youth sides
    pub representative_orgs: BTreeSet<String>,

    pub report: RunReport,
}

// ============================================================================
// RUN
// ============================================================================

/// Run the full pipeline from a directory of JSON-LD documents.
pub fn run(config: &PipelineConfig) -> Result<PipelineOutput> {
    let documents = scan_documents(&config.triples_dir)?;
    if documents.is_empty() {
        bail!(
            "no JSON-LD documents found in {}",
            config.triples_dir.display()
        );
    }

    let paranames = match &config.paranames_path {
        Some(path) => ParaNames::from_path(path)?,
        None => ParaNames::default(),
    };
    let table = match &config.translation_table_path {
        Some(path) => TranslationTable::from_path(path)?,
        None => TranslationTable::default(),
    };

    run_documents(documents, paranames, table)
}

/// Run the pipeline over already-deserialized documents. Split out from
/// `run` so tests drive it with fixed in-memory providers.
pub fn run_documents(
    documents: Vec<(String, Value)>,
    paranames: ParaNames,
    table: TranslationTable,
) -> Result<PipelineOutput> {
    if documents.is_empty() {
        bail!("input collection is empty");
    }

    let mut report = RunReport::new();

    // Parse graphs, skipping malformed documents
    let mut graphs = Vec::new();
    for (person_id, document) in documents {
        match StatementGraph::new(&person_id, document) {
            Ok(graph) => graphs.push(graph),
            Err(err) => {
                warn!(person = %person_id, %err, "malformed document");
                report
                    .skipped
                    .push(SkipRecord::new(&person_id, "read", err.to_string()));
            }
        }
    }
    if graphs.is_empty() {
        bail!("every input document was malformed");
    }
    report.counts.documents_read = graphs.len();

    // Stage 1: extract membership facts; the label index is built from the
    // same pass over the graphs
    let mut labels = WikidataLabels::new();
    let mut facts = Vec::new();
    for graph in &graphs {
        labels.absorb(graph);
        let (graph_facts, skipped) = graph.membership_facts();
        facts.extend(graph_facts);
        report.skipped.extend(skipped);
    }
    report.counts.facts_extracted = facts.len();
    report.counts.facts_skipped = report
        .skipped
        .iter()
        .filter(|skip| skip.stage == "extract")
        .count();

    // Stage 3 collaborator: provider chain in fixed priority order
    let mut resolver = NameResolver::new(vec![
        Box::new(labels.clone()),
        Box::new(paranames),
        Box::new(table),
    ]);

    // Stages 2-4: classification happens inside aggregation
    let outcome = aggregate(&facts, &labels, &mut resolver);
    report.counts.persons_emitted = outcome.records.len();
    report.counts.persons_skipped = outcome.persons_skipped;
    report.skipped.extend(outcome.skipped);

    // Stage 5
    let co_memberships = derive_co_memberships(&outcome.records);
    report.counts.co_memberships = co_memberships.len();

    // National/youth sides, for question-pool partitioning
    let mut representative_orgs = BTreeSet::new();
    for record in &outcome.records {
        for org in &record.organizations {
            let description = labels.description(&org.organization_id).unwrap_or("");
            if is_representative_team(&org.name, description) {
                representative_orgs.insert(org.organization_id.clone());
            }
        }
    }

    // Birth facts for the birth-year generator, names via the same records
    let by_id: BTreeMap<&str, &PersonRecord> = outcome
        .records
        .iter()
        .map(|record| (record.person_id.as_str(), record))
        .collect();
    let mut birth_records = Vec::new();
    for graph in &graphs {
        let Some(record) = by_id.get(graph.person_id.as_str()) else {
            continue;
        };
        if let Some(birth_date) = graph.birth_date() {
            if let Some(birth_year) = parse_year(&birth_date) {
                birth_records.push(BirthRecord {
                    person_id: record.person_id.clone(),
                    display_name: record.display_name.clone(),
                    localized_name: record.localized_name.clone(),
                    birth_date,
                    birth_year,
                });
            }
        }
    }

    report.name_misses = resolver.misses();
    report.counts.names_unresolved = resolver.miss_count();

    info!(summary = %report.summary(), "pipeline complete");

    Ok(PipelineOutput {
        records: outcome.records,
        co_memberships,
        birth_records,
        representative_orgs,
        report,
    })
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn statement(org: &str, start: Option<&str>, end: Option<&str>) -> Value {
        let mut item = json!({
            "@type": "wikibase:Statement",
            "ps:P54": format!("wd:{}", org),
        });
        if let Some(start) = start {
            item["P580"] = json!(start);
        }
        if let Some(end) = end {
            item["P582"] = json!(end);
        }
        item
    }

    fn entity(id: &str, en: &str) -> Value {
        json!({
            "@id": format!("wd:{}", id),
            "@type": "wikibase:Item",
            "label": {"@language": "en", "@value": en}
        })
    }

    fn paranames(entries: &[(&str, &str)]) -> ParaNames {
        let mut map = BTreeMap::new();
        for (id, name) in entries {
            let mut langs = BTreeMap::new();
            langs.insert("yue".to_string(), name.to_string());
            map.insert(id.to_string(), langs);
        }
        ParaNames::from_entries(map)
    }

    /// Three facts across two persons: P1 at OrgA (2010-, current) and OrgB
    /// (2015-2016, former), P2 at OrgA (2011-, current).
    fn scenario_documents() -> Vec<(String, Value)> {
        let p1 = json!({
            "@graph": [
                entity("Q1", "Name1"),
                entity("Q100", "Org A"),
                entity("Q200", "Org B"),
                statement("Q100", Some("2010-01-01T00:00:00Z"), None),
                statement("Q200", Some("2015-01-01T00:00:00Z"), Some("2016-01-01T00:00:00Z")),
            ]
        });
        let p2 = json!({
            "@graph": [
                entity("Q2", "Name2"),
                statement("Q100", Some("2011-01-01T00:00:00Z"), None),
            ]
        });
        vec![("Q1".to_string(), p1), ("Q2".to_string(), p2)]
    }

    fn scenario_providers() -> ParaNames {
        paranames(&[
            ("Q1", "名一"),
            ("Q2", "名二"),
            ("Q100", "甲會"),
            ("Q200", "乙會"),
        ])
    }

    #[test]
    fn test_end_to_end_scenario() {
        let output = run_documents(
            scenario_documents(),
            scenario_providers(),
            TranslationTable::default(),
        )
        .unwrap();

        assert_eq!(output.records.len(), 2);

        let p1 = &output.records[0];
        assert_eq!(p1.person_id, "Q1");
        assert_eq!(p1.display_name, "Name1");
        assert_eq!(p1.localized_name.as_deref(), Some("名一"));
        assert_eq!(p1.organizations.len(), 2);
        assert_eq!(p1.organizations[0].organization_id, "Q100");
        assert!(p1.organizations[0].is_current);
        assert_eq!(p1.organizations[1].organization_id, "Q200");
        assert!(!p1.organizations[1].is_current);

        let p2 = &output.records[1];
        assert_eq!(p2.person_id, "Q2");
        assert_eq!(p2.organizations.len(), 1);
        assert_eq!(p2.organizations[0].organization_id, "Q100");
        assert!(p2.organizations[0].is_current);

        assert_eq!(output.co_memberships.len(), 1);
        let pair = &output.co_memberships[0];
        assert_eq!(pair.person_a, "Q1");
        assert_eq!(pair.person_b, "Q2");
        assert_eq!(pair.organization_id, "Q100");

        assert!(output.report.name_misses.is_empty());
    }

    #[test]
    fn test_pipeline_is_idempotent() {
        let first = run_documents(
            scenario_documents(),
            scenario_providers(),
            TranslationTable::default(),
        )
        .unwrap();
        let second = run_documents(
            scenario_documents(),
            scenario_providers(),
            TranslationTable::default(),
        )
        .unwrap();

        assert_eq!(
            serde_json::to_string(&first.records).unwrap(),
            serde_json::to_string(&second.records).unwrap()
        );
        assert_eq!(
            serde_json::to_string(&first.co_memberships).unwrap(),
            serde_json::to_string(&second.co_memberships).unwrap()
        );
    }

    #[test]
    fn test_empty_input_is_fatal() {
        let result = run_documents(
            Vec::new(),
            ParaNames::default(),
            TranslationTable::default(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_all_malformed_is_fatal() {
        let documents = vec![("Q1".to_string(), json!({"no_graph": true}))];
        let result = run_documents(
            documents,
            ParaNames::default(),
            TranslationTable::default(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_unresolved_names_reported_not_fatal() {
        let output = run_documents(
            scenario_documents(),
            ParaNames::default(),
            TranslationTable::default(),
        )
        .unwrap();

        // Records still come out, without localized names
        assert_eq!(output.records.len(), 2);
        assert!(output.records[0].localized_name.is_none());
        assert_eq!(output.report.name_misses.len(), 4);
        assert_eq!(output.report.counts.names_unresolved, 4);
    }

    #[test]
    fn test_representative_orgs_flagged() {
        let p1 = json!({
            "@graph": [
                entity("Q1", "Name1"),
                {
                    "@id": "wd:Q300",
                    "@type": "wikibase:Item",
                    "label": {"@language": "en", "@value": "Ruritania national football team"},
                    "description": {"@language": "en", "@value": "men's national team"}
                },
                entity("Q100", "Org A"),
                statement("Q300", Some("2012-01-01T00:00:00Z"), None),
                statement("Q100", Some("2010-01-01T00:00:00Z"), None),
            ]
        });
        let output = run_documents(
            vec![("Q1".to_string(), p1)],
            ParaNames::default(),
            TranslationTable::default(),
        )
        .unwrap();

        assert!(output.representative_orgs.contains("Q300"));
        assert!(!output.representative_orgs.contains("Q100"));
    }
}
