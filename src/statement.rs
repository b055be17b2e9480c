// Statement Extractor - typed membership facts out of JSON-LD triples
// One document per person; the @graph array mixes the person item, statement
// nodes with qualifiers, and the referenced organization items.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use tracing::debug;

use crate::report::SkipRecord;
use crate::temporal::parse_year;

/// Membership predicate (member of sports team) as it appears on statement nodes
pub const MEMBERSHIP_PREDICATE: &str = "ps:P54";

/// Temporal qualifiers on membership statements
pub const START_TIME: &str = "P580";
pub const END_TIME: &str = "P582";

/// Date of birth property on the person item
pub const DATE_OF_BIRTH: &str = "P569";

// ============================================================================
// MEMBERSHIP FACT
// ============================================================================

/// One person-belonged-to-organization assertion with optional dates.
///
/// Dates are raw ISO-8601 timestamps as found in the source. A missing date
/// means unknown; for end dates it also covers placeholder markers, which
/// the extractor collapses to None (the single "ongoing" sentinel).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipFact {
    pub person_id: String,
    pub organization_id: String,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

impl MembershipFact {
    /// Content hash for duplicate detection within a person's fact set.
    pub fn dedup_key(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(format!(
            "{}|{}|{}|{}",
            self.person_id,
            self.organization_id,
            self.start_date.as_deref().unwrap_or(""),
            self.end_date.as_deref().unwrap_or(""),
        ));
        format!("{:x}", hasher.finalize())
    }
}

// ============================================================================
// STATEMENT GRAPH
// ============================================================================

/// A person's JSON-LD document, deserialized but untyped.
#[derive(Debug, Clone)]
pub struct StatementGraph {
    pub person_id: String,
    items: Vec<Value>,
}

impl StatementGraph {
    /// Wrap a deserialized document. Fails when the @graph array is missing,
    /// which marks the document itself as malformed.
    pub fn new(person_id: &str, document: Value) -> anyhow::Result<Self> {
        let items = document
            .get("@graph")
            .and_then(Value::as_array)
            .ok_or_else(|| anyhow::anyhow!("document for {} has no @graph array", person_id))?
            .clone();

        Ok(StatementGraph {
            person_id: person_id.to_string(),
            items,
        })
    }

    pub fn items(&self) -> &[Value] {
        &self.items
    }

    /// Scan the graph for membership statements and produce flat facts.
    ///
    /// Statements without a resolvable organization reference, and statements
    /// whose known end year precedes their known start year, are dropped and
    /// recorded as skips. Output order follows graph order but carries no
    /// guarantee; downstream stages sort for themselves.
    pub fn membership_facts(&self) -> (Vec<MembershipFact>, Vec<SkipRecord>) {
        let mut facts = Vec::new();
        let mut skipped = Vec::new();

        for item in &self.items {
            if !is_statement(item) || item.get(MEMBERSHIP_PREDICATE).is_none() {
                continue;
            }

            let organization_id = match item.get(MEMBERSHIP_PREDICATE).and_then(entity_ref) {
                Some(id) => id,
                None => {
                    debug!(person = %self.person_id, "membership statement without organization id");
                    skipped.push(SkipRecord::new(
                        &self.person_id,
                        "extract",
                        "membership statement without resolvable organization id",
                    ));
                    continue;
                }
            };

            let start_date = item.get(START_TIME).and_then(time_value);
            let end_date = item.get(END_TIME).and_then(time_value);

            // Known end before known start violates the fact invariant
            if let (Some(start), Some(end)) = (start_date.as_deref(), end_date.as_deref()) {
                if let (Some(sy), Some(ey)) = (parse_year(start), parse_year(end)) {
                    if ey < sy {
                        skipped.push(SkipRecord::new(
                            &self.person_id,
                            "extract",
                            format!("end year {} precedes start year {} at {}", ey, sy, organization_id),
                        ));
                        continue;
                    }
                }
            }

            facts.push(MembershipFact {
                person_id: self.person_id.clone(),
                organization_id,
                start_date,
                end_date,
            });
        }

        (facts, skipped)
    }

    /// Labels of an entity in this graph, keyed by language code. The first
    /// declared value per language wins, keeping resolution deterministic.
    pub fn labels(&self, entity_id: &str) -> BTreeMap<String, String> {
        let target = format!("wd:{}", entity_id);
        let mut labels = BTreeMap::new();

        for item in &self.items {
            if item.get("@id").and_then(Value::as_str) != Some(target.as_str()) {
                continue;
            }
            if let Some(label) = item.get("label") {
                for (lang, value) in language_values(label) {
                    labels.entry(lang).or_insert(value);
                }
            }
        }

        labels
    }

    /// Descriptions of an entity in this graph, keyed by language code.
    pub fn descriptions(&self, entity_id: &str) -> BTreeMap<String, String> {
        let target = format!("wd:{}", entity_id);
        let mut descriptions = BTreeMap::new();

        for item in &self.items {
            if item.get("@id").and_then(Value::as_str) != Some(target.as_str()) {
                continue;
            }
            if let Some(description) = item.get("description") {
                for (lang, value) in language_values(description) {
                    descriptions.entry(lang).or_insert(value);
                }
            }
        }

        descriptions
    }

    /// English display name: the entity's "en" label, falling back to the
    /// linked English Wikipedia article title.
    pub fn display_name(&self, entity_id: &str) -> Option<String> {
        if let Some(name) = self.labels(entity_id).get("en") {
            return Some(name.clone());
        }

        for item in &self.items {
            let is_article = item.get("@type").and_then(Value::as_str) == Some("schema:Article");
            let in_english = item.get("inLanguage").and_then(Value::as_str) == Some("en");
            let from_wikipedia = item
                .get("@id")
                .and_then(Value::as_str)
                .map(|id| id.contains("wikipedia.org"))
                .unwrap_or(false);

            if is_article && in_english && from_wikipedia {
                if let Some(name) = item.get("name").and_then(time_value) {
                    return Some(name);
                }
            }
        }

        None
    }

    /// The person's date of birth (P569), when present on the person item.
    pub fn birth_date(&self) -> Option<String> {
        let target = format!("wd:{}", self.person_id);
        for item in &self.items {
            if item.get("@id").and_then(Value::as_str) == Some(target.as_str()) {
                if let Some(value) = item.get(DATE_OF_BIRTH).and_then(time_value) {
                    return Some(value);
                }
            }
        }
        None
    }
}

// ============================================================================
// VALUE HELPERS
// ============================================================================

/// A statement node's @type may be a plain string or an array of types.
pub fn is_statement(item: &Value) -> bool {
    match item.get("@type") {
        Some(Value::String(t)) => t == "wikibase:Statement",
        Some(Value::Array(types)) => types
            .iter()
            .any(|t| t.as_str() == Some("wikibase:Statement")),
        _ => false,
    }
}

/// Resolve a "wd:Q…" entity reference to its bare ID. Blank nodes and
/// non-entity values yield None.
pub fn entity_ref(value: &Value) -> Option<String> {
    let raw = value.as_str()?;
    let id = raw.strip_prefix("wd:")?;
    if id.starts_with('Q') {
        Some(id.to_string())
    } else {
        None
    }
}

/// Extract a time/text value that may be a plain string, a {"@value": …}
/// object, or an unresolvable blank-node reference ({"@id": "_:…"}).
/// Blank nodes collapse to None: they are the source's "somevalue" marker.
pub fn time_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Object(map) => {
            if let Some(Value::String(id)) = map.get("@id") {
                if id.starts_with("_:") {
                    return None;
                }
            }
            map.get("@value")
                .and_then(Value::as_str)
                .map(String::from)
        }
        _ => None,
    }
}

/// Flatten a label/description field ({"@language","@value"} object or array
/// of such objects) into (language, value) pairs in declaration order.
pub fn language_values(field: &Value) -> Vec<(String, String)> {
    let mut pairs = Vec::new();

    let entries: Vec<&Value> = match field {
        Value::Array(values) => values.iter().collect(),
        single => vec![single],
    };

    for entry in entries {
        if let Value::Object(map) = entry {
            let lang = map.get("@language").and_then(Value::as_str);
            let value = map.get("@value").and_then(Value::as_str);
            if let (Some(lang), Some(value)) = (lang, value) {
                if !value.is_empty() {
                    pairs.push((lang.to_string(), value.to_string()));
                }
            }
        }
    }

    pairs
}

// ============================================================================
// TESTS
// ============================================================================
