// Name Resolver - localized (Cantonese) names with provider fallback
// Providers are tried strictly in chain order; the first hit wins and later
// providers never override it. Everything is keyed through ordered maps so a
// fixed input set always resolves the same way.

use anyhow::{Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;
use tracing::{debug, warn};

use crate::statement::{language_values, StatementGraph};

/// Cantonese language codes in preference order, as used by the label data
pub const WIKIDATA_LANGS: &[&str] = &["yue", "zh-hk"];

/// The hand-authored translation tables use Hong Kong first, then Macau
pub const TABLE_LANGS: &[&str] = &["zh-hk", "zh-mo"];

// ============================================================================
// RESOLVED NAME
// ============================================================================

/// Which provider a localized name came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NameSource {
    #[serde(rename = "wikidata")]
    Wikidata,
    #[serde(rename = "paranames")]
    ParaNames,
    #[serde(rename = "translation_table")]
    TranslationTable,
    #[serde(rename = "none")]
    None,
}

/// Resolution result for one entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolvedName {
    pub entity_id: String,
    pub display_name: String,

    /// Set only when some provider yielded a name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub localized_name: Option<String>,

    /// Language code the localized name was found under
    #[serde(skip_serializing_if = "Option::is_none")]
    pub localized_lang: Option<String>,

    pub source: NameSource,
}

impl ResolvedName {
    pub fn is_resolved(&self) -> bool {
        self.localized_name.is_some()
    }
}

// ============================================================================
// PROVIDER TRAIT
// ============================================================================

/// A dataset that can map an entity to a localized name.
///
/// `display_name` is passed alongside the ID because hand-authored tables
/// have no entity IDs and match on the English name instead.
pub trait NameProvider {
    fn source(&self) -> NameSource;

    /// Returns (localized name, language code) on a hit.
    fn lookup(&self, entity_id: &str, display_name: &str) -> Option<(String, String)>;
}

// ============================================================================
// WIKIDATA LABELS
// ============================================================================

/// Label index built from the JSON-LD documents themselves: English display
/// names plus Cantonese labels for every entity the graphs mention.
#[derive(Debug, Clone, Default)]
pub struct WikidataLabels {
    english: BTreeMap<String, String>,
    localized: BTreeMap<String, BTreeMap<String, String>>,
    descriptions: BTreeMap<String, String>,
}

impl WikidataLabels {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index every labeled entity in a graph. First declaration wins per
    /// (entity, language); the person's article title backs up a missing
    /// English label.
    pub fn absorb(&mut self, graph: &StatementGraph) {
        for item in graph.items() {
            let entity_id = match item
                .get("@id")
                .and_then(Value::as_str)
                .and_then(|id| id.strip_prefix("wd:"))
            {
                Some(id) if id.starts_with('Q') => id.to_string(),
                _ => continue,
            };

            if let Some(label) = item.get("label") {
                for (lang, value) in language_values(label) {
                    if lang == "en" {
                        self.english.entry(entity_id.clone()).or_insert(value);
                    } else if WIKIDATA_LANGS.contains(&lang.as_str()) {
                        self.localized
                            .entry(entity_id.clone())
                            .or_default()
                            .entry(lang)
                            .or_insert(value);
                    }
                }
            }

            if let Some(description) = item.get("description") {
                for (lang, value) in language_values(description) {
                    if lang == "en" {
                        self.descriptions.entry(entity_id.clone()).or_insert(value);
                    }
                }
            }
        }

        if !self.english.contains_key(&graph.person_id) {
            if let Some(name) = graph.display_name(&graph.person_id) {
                self.english.insert(graph.person_id.clone(), name);
            }
        }
    }

    pub fn display_name(&self, entity_id: &str) -> Option<&str> {
        self.english.get(entity_id).map(String::as_str)
    }

    /// English description, used by the team-kind keyword heuristic.
    pub fn description(&self, entity_id: &str) -> Option<&str> {
        self.descriptions.get(entity_id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.english.len()
    }

    pub fn is_empty(&self) -> bool {
        self.english.is_empty()
    }
}

impl NameProvider for WikidataLabels {
    fn source(&self) -> NameSource {
        NameSource::Wikidata
    }

    fn lookup(&self, entity_id: &str, _display_name: &str) -> Option<(String, String)> {
        let labels = self.localized.get(entity_id)?;
        for lang in WIKIDATA_LANGS {
            if let Some(name) = labels.get(*lang) {
                return Some((name.clone(), lang.to_string()));
            }
        }
        None
    }
}

// ============================================================================
// PARANAMES
// ============================================================================

/// ParaNames TSV provider: wikidata_id / language / label rows, restricted to
/// Cantonese-related codes at load time.
#[derive(Debug, Clone, Default)]
pub struct ParaNames {
    entries: BTreeMap<String, BTreeMap<String, String>>,
}

#[derive(Debug, Deserialize)]
struct ParaNamesRow {
    wikidata_id: String,
    language: String,
    label: String,
}

impl ParaNames {
    /// Load from TSV. A missing file degrades to an empty provider with a
    /// warning; a present-but-unreadable file is an error.
    pub fn from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            warn!(path = %path.display(), "ParaNames file not found, provider will be empty");
            return Ok(Self::default());
        }

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .from_path(path)
            .with_context(|| format!("failed to open ParaNames file {}", path.display()))?;

        let mut entries: BTreeMap<String, BTreeMap<String, String>> = BTreeMap::new();
        for row in reader.deserialize() {
            let row: ParaNamesRow = match row {
                Ok(row) => row,
                Err(err) => {
                    debug!(%err, "skipping malformed ParaNames row");
                    continue;
                }
            };

            let id = row.wikidata_id.trim();
            let label = row.label.trim();
            let language = row.language.trim();

            if id.is_empty() || label.is_empty() {
                continue;
            }
            if !WIKIDATA_LANGS.contains(&language) {
                continue;
            }

            entries
                .entry(id.to_string())
                .or_default()
                .entry(language.to_string())
                .or_insert_with(|| label.to_string());
        }

        Ok(ParaNames { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[cfg(test)]
    pub fn from_entries(entries: BTreeMap<String, BTreeMap<String, String>>) -> Self {
        ParaNames { entries }
    }
}

impl NameProvider for ParaNames {
    fn source(&self) -> NameSource {
        NameSource::ParaNames
    }

    fn lookup(&self, entity_id: &str, _display_name: &str) -> Option<(String, String)> {
        let labels = self.entries.get(entity_id)?;
        for lang in WIKIDATA_LANGS {
            if let Some(name) = labels.get(*lang) {
                return Some((name.clone(), lang.to_string()));
            }
        }
        None
    }
}

// ============================================================================
// TRANSLATION TABLE
// ============================================================================

/// Hand-authored Lua conversion table: Item('English Name', 'rules') entries
/// where rules are ';'-separated "lang:translation" pairs, optionally in the
/// "original=>lang:translation" form. No entity IDs, so lookups key on the
/// entity's English display name.
#[derive(Debug, Clone, Default)]
pub struct TranslationTable {
    entries: BTreeMap<String, BTreeMap<String, String>>,
}

impl TranslationTable {
    pub fn from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            warn!(path = %path.display(), "translation table not found, provider will be empty");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read translation table {}", path.display()))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        // Item('Name', 'zh-hk:譯名;zh-mo:譯名')
        let item_re = Regex::new(r"Item\('([^']+)',\s*'([^']+)'")?;

        let mut entries: BTreeMap<String, BTreeMap<String, String>> = BTreeMap::new();
        for capture in item_re.captures_iter(content) {
            let english = capture[1].trim();
            if english.is_empty() {
                continue;
            }

            let translations = entries.entry(english.to_string()).or_default();
            for rule in capture[2].split(';') {
                let rule = rule.rsplit("=>").next().unwrap_or(rule);
                if let Some((lang, translation)) = rule.split_once(':') {
                    let lang = lang.trim();
                    let translation = translation.trim();
                    if !lang.is_empty() && !translation.is_empty() {
                        translations
                            .entry(lang.to_string())
                            .or_insert_with(|| translation.to_string());
                    }
                }
            }
        }

        entries.retain(|_, translations| !translations.is_empty());
        Ok(TranslationTable { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl NameProvider for TranslationTable {
    fn source(&self) -> NameSource {
        NameSource::TranslationTable
    }

    fn lookup(&self, _entity_id: &str, display_name: &str) -> Option<(String, String)> {
        let translations = self.entries.get(display_name)?;
        for lang in TABLE_LANGS {
            if let Some(name) = translations.get(*lang) {
                return Some((name.clone(), lang.to_string()));
            }
        }
        None
    }
}

// ============================================================================
// NAME RESOLVER
// ============================================================================

/// Chains providers in priority order with an explicit per-run cache.
///
/// The cache is owned here, not global state: tests substitute fixed
/// providers and get identical resolutions on every run.
pub struct NameResolver {
    providers: Vec<Box<dyn NameProvider>>,
    cache: HashMap<String, ResolvedName>,
    misses: BTreeSet<String>,
}

impl NameResolver {
    pub fn new(providers: Vec<Box<dyn NameProvider>>) -> Self {
        NameResolver {
            providers,
            cache: HashMap::new(),
            misses: BTreeSet::new(),
        }
    }

    /// Resolve an entity's localized name. An entity no provider knows is a
    /// recoverable miss: it still gets a ResolvedName (without a localized
    /// name) and its ID is recorded for follow-up.
    pub fn resolve(&mut self, entity_id: &str, display_name: &str) -> ResolvedName {
        if let Some(hit) = self.cache.get(entity_id) {
            return hit.clone();
        }

        let mut resolved = ResolvedName {
            entity_id: entity_id.to_string(),
            display_name: display_name.to_string(),
            localized_name: None,
            localized_lang: None,
            source: NameSource::None,
        };

        for provider in &self.providers {
            if let Some((name, lang)) = provider.lookup(entity_id, display_name) {
                resolved.localized_name = Some(name);
                resolved.localized_lang = Some(lang);
                resolved.source = provider.source();
                break;
            }
        }

        if !resolved.is_resolved() {
            debug!(entity = entity_id, "no localized name in any provider");
            self.misses.insert(entity_id.to_string());
        }

        self.cache.insert(entity_id.to_string(), resolved.clone());
        resolved
    }

    /// Unresolved entity IDs, sorted, one per entity.
    pub fn misses(&self) -> Vec<String> {
        self.misses.iter().cloned().collect()
    }

    pub fn miss_count(&self) -> usize {
        self.misses.len()
    }
}

// ============================================================================
// TESTS
// ============================================================================
