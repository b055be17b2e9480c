// Relationship Deriver - co-membership ("teammate") pairs
// Pairwise scan per organization roster; rosters are small relative to the
// global person count, so the quadratic pass stays cheap.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

use crate::aggregate::PersonRecord;
use crate::temporal::TimeWindow;

// ============================================================================
// CO-MEMBERSHIP PAIR
// ============================================================================

/// Two persons who shared an organization during overlapping time windows.
/// `person_a` is always the lexicographically smaller ID, so a pair has one
/// canonical form. The same pair recurs once per shared organization; callers
/// needing pair-level uniqueness deduplicate on (person_a, person_b).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoMembership {
    pub person_a: String,
    pub person_b: String,
    pub organization_id: String,
    pub overlap: TimeWindow,
}

impl CoMembership {
    /// Canonical (smaller, larger) pair key for caller-side deduplication.
    pub fn pair_key(&self) -> (String, String) {
        (self.person_a.clone(), self.person_b.clone())
    }
}

// ============================================================================
// DERIVATION
// ============================================================================

/// Derive co-membership pairs from aggregated person records.
///
/// Unknown time boundaries count as open, so a membership with no dates can
/// overlap anything at the same organization. One pair is emitted per
/// (person pair, organization) even when several spells overlap.
pub fn derive_co_memberships(records: &[PersonRecord]) -> Vec<CoMembership> {
    // organization -> roster of (person, window), in record order
    let mut rosters: BTreeMap<&str, Vec<(&str, TimeWindow)>> = BTreeMap::new();
    for record in records {
        for org in &record.organizations {
            rosters.entry(&org.organization_id).or_default().push((
                &record.person_id,
                TimeWindow::from_dates(org.start_date.as_deref(), org.end_date.as_deref()),
            ));
        }
    }

    let mut pairs = Vec::new();
    let mut seen: HashSet<(String, String, String)> = HashSet::new();

    for (organization_id, roster) in rosters {
        if roster.len() < 2 {
            continue;
        }

        for i in 0..roster.len() {
            for j in (i + 1)..roster.len() {
                let (person_1, window_1) = roster[i];
                let (person_2, window_2) = roster[j];

                // Same person twice means two spells at one organization
                if person_1 == person_2 {
                    continue;
                }

                if !window_1.overlaps(&window_2) {
                    continue;
                }

                let (person_a, person_b) = if person_1 <= person_2 {
                    (person_1, person_2)
                } else {
                    (person_2, person_1)
                };

                let key = (
                    person_a.to_string(),
                    person_b.to_string(),
                    organization_id.to_string(),
                );
                if !seen.insert(key) {
                    continue;
                }

                pairs.push(CoMembership {
                    person_a: person_a.to_string(),
                    person_b: person_b.to_string(),
                    organization_id: organization_id.to_string(),
                    overlap: window_1.intersect(&window_2),
                });
            }
        }
    }

    pairs
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::Organization;

    fn record(person_id: &str, orgs: Vec<(&str, Option<&str>, Option<&str>)>) -> PersonRecord {
        PersonRecord {
            person_id: person_id.to_string(),
            display_name: format!("Player {}", person_id),
            localized_name: None,
            organizations: orgs
                .into_iter()
                .map(|(org, start, end)| Organization {
                    organization_id: org.to_string(),
                    name: format!("Org {}", org),
                    localized_name: None,
                    start_date: start.map(String::from),
                    end_date: end.map(String::from),
                    is_current: end.is_none(),
                })
                .collect(),
        }
    }

    #[test]
    fn test_overlapping_spells_pair_up() {
        let records = vec![
            record(
                "Q1",
                vec![(
                    "Q100",
                    Some("2010-01-01T00:00:00Z"),
                    Some("2012-01-01T00:00:00Z"),
                )],
            ),
            record(
                "Q2",
                vec![(
                    "Q100",
                    Some("2011-01-01T00:00:00Z"),
                    Some("2013-01-01T00:00:00Z"),
                )],
            ),
        ];

        let pairs = derive_co_memberships(&records);
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].person_a, "Q1");
        assert_eq!(pairs[0].person_b, "Q2");
        assert_eq!(pairs[0].organization_id, "Q100");
        assert_eq!(pairs[0].overlap, TimeWindow::new(Some(2011), Some(2012)));
    }

    #[test]
    fn test_disjoint_spells_do_not_pair() {
        let records = vec![
            record(
                "Q1",
                vec![(
                    "Q100",
                    Some("2010-01-01T00:00:00Z"),
                    Some("2011-01-01T00:00:00Z"),
                )],
            ),
            record(
                "Q2",
                vec![(
                    "Q100",
                    Some("2013-01-01T00:00:00Z"),
                    Some("2015-01-01T00:00:00Z"),
                )],
            ),
        ];

        assert!(derive_co_memberships(&records).is_empty());
    }

    #[test]
    fn test_unknown_dates_assume_overlap() {
        let records = vec![
            record("Q1", vec![("Q100", None, None)]),
            record("Q2", vec![("Q100", Some("2011-01-01T00:00:00Z"), None)]),
        ];

        assert_eq!(derive_co_memberships(&records).len(), 1);
    }

    #[test]
    fn test_pair_repeats_per_shared_organization() {
        let records = vec![
            record(
                "Q1",
                vec![
                    ("Q100", Some("2010-01-01T00:00:00Z"), None),
                    ("Q200", Some("2010-01-01T00:00:00Z"), None),
                ],
            ),
            record(
                "Q2",
                vec![
                    ("Q100", Some("2010-01-01T00:00:00Z"), None),
                    ("Q200", Some("2010-01-01T00:00:00Z"), None),
                ],
            ),
        ];

        let pairs = derive_co_memberships(&records);
        assert_eq!(pairs.len(), 2);

        let mut unique = pairs.iter().map(CoMembership::pair_key).collect::<Vec<_>>();
        unique.dedup();
        assert_eq!(unique.len(), 1);
    }

    #[test]
    fn test_two_spells_emit_single_pair() {
        // Q1 had two spells at Q100; both overlap Q2's spell
        let records = vec![
            record(
                "Q1",
                vec![
                    (
                        "Q100",
                        Some("2010-01-01T00:00:00Z"),
                        Some("2012-01-01T00:00:00Z"),
                    ),
                    ("Q100", Some("2013-01-01T00:00:00Z"), None),
                ],
            ),
            record("Q2", vec![("Q100", Some("2011-01-01T00:00:00Z"), None)]),
        ];

        assert_eq!(derive_co_memberships(&records).len(), 1);
    }

    #[test]
    fn test_pair_ids_canonically_ordered() {
        let records = vec![
            record("Q9", vec![("Q100", None, None)]),
            record("Q2", vec![("Q100", None, None)]),
        ];

        let pairs = derive_co_memberships(&records);
        assert_eq!(pairs[0].person_a, "Q2");
        assert_eq!(pairs[0].person_b, "Q9");
    }
}
