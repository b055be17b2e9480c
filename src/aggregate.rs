// Entity Aggregator - one consolidated record per person
// Groups membership facts, attaches resolved names and temporal status,
// dedups, and orders each person's organization list chronologically.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

use crate::names::{NameResolver, WikidataLabels};
use crate::report::SkipRecord;
use crate::statement::MembershipFact;
use crate::temporal::is_current;

// ============================================================================
// OUTPUT RECORDS
// ============================================================================

/// One organization entry in a person's record. Field names and nesting are
/// the contract the question generators consume; do not rename.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Organization {
    pub organization_id: String,
    pub name: String,
    pub localized_name: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub is_current: bool,
}

/// Consolidated record for one person. Immutable once built.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonRecord {
    pub person_id: String,
    pub display_name: String,
    pub localized_name: Option<String>,
    pub organizations: Vec<Organization>,
}

#[derive(Debug, Default)]
pub struct AggregateOutcome {
    pub records: Vec<PersonRecord>,
    pub skipped: Vec<SkipRecord>,
    pub persons_skipped: usize,
}

// ============================================================================
// TEAM KIND HEURISTIC
// ============================================================================

/// Best-effort detection of national/youth sides by keyword, since the
/// source stores them in the same membership structure as clubs. Fuzzy by
/// nature; used only to pick question pools, never to drop memberships.
pub fn is_representative_team(name: &str, description: &str) -> bool {
    let name = name.to_lowercase();
    let description = description.to_lowercase();

    const DESCRIPTION_KEYWORDS: &[&str] = &["national", "under-", "youth"];
    const NAME_KEYWORDS: &[&str] = &["national", "under-", "u-", "youth"];

    DESCRIPTION_KEYWORDS
        .iter()
        .any(|kw| description.contains(kw))
        || NAME_KEYWORDS.iter().any(|kw| name.contains(kw))
}

// ============================================================================
// AGGREGATION
// ============================================================================

/// Group facts by person and build consolidated records.
///
/// A person is skipped only when no display name resolves at all; a person
/// with zero organizations is valid output. Organization entries whose
/// display name is unknown are excluded rather than emitted blank.
pub fn aggregate(
    facts: &[MembershipFact],
    labels: &WikidataLabels,
    resolver: &mut NameResolver,
) -> AggregateOutcome {
    let mut by_person: BTreeMap<&str, Vec<&MembershipFact>> = BTreeMap::new();
    for fact in facts {
        by_person.entry(&fact.person_id).or_default().push(fact);
    }

    let mut outcome = AggregateOutcome::default();

    for (person_id, person_facts) in by_person {
        let display_name = match labels.display_name(person_id) {
            Some(name) => name.to_string(),
            None => {
                debug!(person = person_id, "person display name unresolved");
                outcome.skipped.push(SkipRecord::new(
                    person_id,
                    "aggregate",
                    "person display name unresolved",
                ));
                outcome.persons_skipped += 1;
                continue;
            }
        };

        let person_name = resolver.resolve(person_id, &display_name);

        let mut seen = HashSet::new();
        let mut organizations = Vec::new();

        for fact in person_facts {
            if !seen.insert(fact.dedup_key()) {
                continue;
            }

            let org_name = match labels.display_name(&fact.organization_id) {
                Some(name) => name.to_string(),
                None => {
                    outcome.skipped.push(SkipRecord::new(
                        &fact.organization_id,
                        "aggregate",
                        format!("organization display name unresolved (person {})", person_id),
                    ));
                    continue;
                }
            };

            let org_localized = resolver.resolve(&fact.organization_id, &org_name);

            organizations.push(Organization {
                organization_id: fact.organization_id.clone(),
                name: org_name,
                localized_name: org_localized.localized_name,
                start_date: fact.start_date.clone(),
                end_date: fact.end_date.clone(),
                is_current: is_current(fact),
            });
        }

        // Chronological, unknown starts last; stable sort keeps encounter
        // order among equal keys
        organizations.sort_by_key(|org| match org.start_date.as_deref() {
            Some(date) => (0u8, date.strip_prefix('+').unwrap_or(date).to_string()),
            None => (1, String::new()),
        });

        outcome.records.push(PersonRecord {
            person_id: person_id.to_string(),
            display_name,
            localized_name: person_name.localized_name,
            organizations,
        });
    }

    outcome
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::names::NameResolver;
    use crate::statement::StatementGraph;
    use serde_json::json;

    fn fact(person: &str, org: &str, start: Option<&str>, end: Option<&str>) -> MembershipFact {
        MembershipFact {
            person_id: person.to_string(),
            organization_id: org.to_string(),
            start_date: start.map(String::from),
            end_date: end.map(String::from),
        }
    }

    fn labels_for(entities: &[(&str, &str)]) -> WikidataLabels {
        let graph_items: Vec<_> = entities
            .iter()
            .map(|(id, name)| {
                json!({
                    "@id": format!("wd:{}", id),
                    "label": {"@language": "en", "@value": name}
                })
            })
            .collect();
        let doc = json!({ "@graph": graph_items });
        let graph = StatementGraph::new(entities[0].0, doc).unwrap();
        let mut labels = WikidataLabels::new();
        labels.absorb(&graph);
        labels
    }

    fn empty_resolver() -> NameResolver {
        NameResolver::new(vec![])
    }

    #[test]
    fn test_ordering_unknown_start_last() {
        let labels = labels_for(&[
            ("Q1", "Player"),
            ("Q21", "Org A"),
            ("Q22", "Org B"),
            ("Q23", "Org C"),
        ]);
        let facts = vec![
            fact("Q1", "Q21", Some("2012-01-01T00:00:00Z"), None),
            fact("Q1", "Q22", Some("2008-01-01T00:00:00Z"), None),
            fact("Q1", "Q23", None, None),
        ];

        let outcome = aggregate(&facts, &labels, &mut empty_resolver());
        assert_eq!(outcome.records.len(), 1);

        let orgs: Vec<&str> = outcome.records[0]
            .organizations
            .iter()
            .map(|o| o.organization_id.as_str())
            .collect();
        assert_eq!(orgs, vec!["Q22", "Q21", "Q23"]);
    }

    #[test]
    fn test_exact_duplicates_collapse() {
        let labels = labels_for(&[("Q1", "Player"), ("Q21", "Org A")]);
        let facts = vec![
            fact("Q1", "Q21", Some("2010-01-01T00:00:00Z"), Some("2012-01-01T00:00:00Z")),
            fact("Q1", "Q21", Some("2010-01-01T00:00:00Z"), Some("2012-01-01T00:00:00Z")),
        ];

        let outcome = aggregate(&facts, &labels, &mut empty_resolver());
        assert_eq!(outcome.records[0].organizations.len(), 1);
    }

    #[test]
    fn test_distinct_spells_at_same_org_kept() {
        let labels = labels_for(&[("Q1", "Player"), ("Q21", "Org A")]);
        let facts = vec![
            fact("Q1", "Q21", Some("2010-01-01T00:00:00Z"), Some("2012-01-01T00:00:00Z")),
            fact("Q1", "Q21", Some("2014-01-01T00:00:00Z"), None),
        ];

        let outcome = aggregate(&facts, &labels, &mut empty_resolver());
        assert_eq!(outcome.records[0].organizations.len(), 2);
    }

    #[test]
    fn test_person_without_display_name_skipped() {
        let labels = labels_for(&[("Q21", "Org A")]);
        let facts = vec![fact("Q404", "Q21", None, None)];

        let outcome = aggregate(&facts, &labels, &mut empty_resolver());
        assert!(outcome.records.is_empty());
        assert_eq!(outcome.skipped.len(), 1);
        assert_eq!(outcome.skipped[0].entity_id, "Q404");
    }

    #[test]
    fn test_unnamed_organization_excluded_not_blank() {
        let labels = labels_for(&[("Q1", "Player"), ("Q21", "Org A")]);
        let facts = vec![
            fact("Q1", "Q21", Some("2010-01-01T00:00:00Z"), None),
            fact("Q1", "Q999", Some("2011-01-01T00:00:00Z"), None),
        ];

        let outcome = aggregate(&facts, &labels, &mut empty_resolver());
        let record = &outcome.records[0];
        assert_eq!(record.organizations.len(), 1);
        assert_eq!(record.organizations[0].organization_id, "Q21");
        assert!(outcome
            .skipped
            .iter()
            .any(|s| s.entity_id == "Q999" && s.stage == "aggregate"));
    }

    #[test]
    fn test_current_former_status() {
        let labels = labels_for(&[("Q1", "Player"), ("Q21", "Org A"), ("Q22", "Org B")]);
        let facts = vec![
            fact("Q1", "Q21", Some("2010-01-01T00:00:00Z"), None),
            fact("Q1", "Q22", Some("2015-01-01T00:00:00Z"), Some("2016-01-01T00:00:00Z")),
        ];

        let outcome = aggregate(&facts, &labels, &mut empty_resolver());
        let orgs = &outcome.records[0].organizations;
        assert!(orgs.iter().find(|o| o.organization_id == "Q21").unwrap().is_current);
        assert!(!orgs.iter().find(|o| o.organization_id == "Q22").unwrap().is_current);
    }

    #[test]
    fn test_representative_team_heuristic() {
        assert!(is_representative_team(
            "Germany national football team",
            "men's national association football team"
        ));
        assert!(is_representative_team("England U-21", ""));
        assert!(is_representative_team("Borussia Dortmund Youth", ""));
        assert!(!is_representative_team(
            "Manchester United F.C.",
            "association football club in Manchester, England"
        ));
    }
}
