// Cantobench - Cantonese cultural-knowledge benchmark curation
// Exposes all pipeline stages for use in the CLI and tests

pub mod statement;
pub mod temporal;
pub mod names;
pub mod aggregate;
pub mod teammates;
pub mod questions;
pub mod report;
pub mod pipeline;
pub mod sources;

// Re-export commonly used types
pub use statement::{MembershipFact, StatementGraph};
pub use temporal::{is_current, parse_year, TimeWindow};
pub use names::{
    NameProvider, NameResolver, NameSource, ParaNames, ResolvedName, TranslationTable,
    WikidataLabels,
};
pub use aggregate::{aggregate, is_representative_team, AggregateOutcome, Organization, PersonRecord};
pub use teammates::{derive_co_memberships, CoMembership};
pub use questions::{BirthRecord, Question, QuestionDataset, QuestionGenerator};
pub use report::{RunReport, SkipRecord, StageCounts};
pub use pipeline::{run, PipelineConfig, PipelineOutput};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
