// Question Generators - bilingual multiple-choice benchmark items
// Teammate-relationship and birth-year questions over the aggregated
// records. Sampling runs on a seeded RNG so a fixed seed reproduces the
// dataset byte for byte.

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

use crate::aggregate::PersonRecord;
use crate::teammates::CoMembership;

pub const CHOICE_LETTERS: [&str; 4] = ["A", "B", "C", "D"];

// ============================================================================
// QUESTION RECORDS
// ============================================================================

/// One four-choice question in the benchmark's bilingual JSON schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub question: String,
    pub question_cantonese: String,

    /// Letter -> choice text
    pub choices: BTreeMap<String, String>,
    pub choices_cantonese: BTreeMap<String, String>,

    pub correct_answer: String,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub explanations: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub explanations_cantonese: BTreeMap<String, String>,

    pub question_type: String,

    /// Extensible per-question context (correct pair, player info, ...)
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

/// Dataset wrapper written next to the questions themselves.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetMetadata {
    pub description: String,
    pub purpose: String,
    pub question_type: String,
    pub languages: Vec<String>,
    pub total_questions: usize,
    pub generation_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionDataset {
    pub metadata: DatasetMetadata,
    pub questions: Vec<Question>,
}

impl QuestionDataset {
    pub fn new(description: &str, question_type: &str, questions: Vec<Question>) -> Self {
        QuestionDataset {
            metadata: DatasetMetadata {
                description: description.to_string(),
                purpose: "Cantonese benchmark for evaluating language models on cultural knowledge"
                    .to_string(),
                question_type: question_type.to_string(),
                languages: vec!["English".to_string(), "Cantonese".to_string()],
                total_questions: questions.len(),
                generation_date: Utc::now(),
            },
            questions,
        }
    }
}

/// A person's birth fact with names already resolved, input to the
/// birth-year generator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BirthRecord {
    pub person_id: String,
    pub display_name: String,
    pub localized_name: Option<String>,
    pub birth_date: String,
    pub birth_year: i32,
}

impl BirthRecord {
    fn best_name(&self) -> &str {
        self.localized_name.as_deref().unwrap_or(&self.display_name)
    }
}

// ============================================================================
// GENERATOR
// ============================================================================

pub struct QuestionGenerator {
    rng: StdRng,
    /// Cap on distractor sampling attempts per question
    max_attempts: usize,
}

impl QuestionGenerator {
    pub fn new(seed: u64) -> Self {
        QuestionGenerator {
            rng: StdRng::seed_from_u64(seed),
            max_attempts: 1000,
        }
    }

    // ------------------------------------------------------------------
    // Teammate questions
    // ------------------------------------------------------------------

    /// Build teammate-relationship questions from confirmed co-memberships.
    ///
    /// Only club organizations qualify (`representative_orgs` holds the IDs
    /// the keyword heuristic flagged as national/youth sides), and a pair
    /// qualifies only when both persons and the shared organization carry
    /// localized names. Distractor pairs are sampled from persons who never
    /// shared any organization.
    pub fn teammate_questions(
        &mut self,
        records: &[PersonRecord],
        pairs: &[CoMembership],
        representative_orgs: &BTreeSet<String>,
        limit: usize,
    ) -> Vec<Question> {
        let by_id: BTreeMap<&str, &PersonRecord> = records
            .iter()
            .map(|record| (record.person_id.as_str(), record))
            .collect();

        // Every confirmed pair, across all organizations; distractors must
        // avoid all of them, not just the club-only pool
        let teammate_keys: BTreeSet<(String, String)> =
            pairs.iter().map(CoMembership::pair_key).collect();

        // Persons eligible as distractor material
        let localized_ids: Vec<&str> = records
            .iter()
            .filter(|record| record.localized_name.is_some())
            .map(|record| record.person_id.as_str())
            .collect();

        let mut pool: Vec<&CoMembership> = pairs
            .iter()
            .filter(|pair| !representative_orgs.contains(&pair.organization_id))
            .filter(|pair| pair_is_askable(pair, &by_id))
            .collect();

        debug!(
            eligible = pool.len(),
            total = pairs.len(),
            "teammate question pool"
        );

        if pool.len() > limit {
            pool.shuffle(&mut self.rng);
            pool.truncate(limit);
        }

        let mut questions = Vec::new();
        for pair in pool {
            if let Some(question) =
                self.teammate_question(pair, &by_id, &teammate_keys, &localized_ids)
            {
                questions.push(question);
            }
        }
        questions
    }

    fn teammate_question(
        &mut self,
        pair: &CoMembership,
        by_id: &BTreeMap<&str, &PersonRecord>,
        teammate_keys: &BTreeSet<(String, String)>,
        localized_ids: &[&str],
    ) -> Option<Question> {
        let person_a = by_id.get(pair.person_a.as_str())?;
        let person_b = by_id.get(pair.person_b.as_str())?;

        let org = person_a
            .organizations
            .iter()
            .find(|org| org.organization_id == pair.organization_id)?;
        let org_localized = org.localized_name.as_deref()?;

        let a_localized = person_a.localized_name.as_deref()?;
        let b_localized = person_b.localized_name.as_deref()?;

        let distractors =
            self.non_teammate_pairs(localized_ids, teammate_keys, &pair.pair_key(), 3)?;

        // First entry is the correct pair; the shuffle below hides it
        let mut entries: Vec<(String, String, bool)> = Vec::with_capacity(4);
        entries.push((
            format!("{} and {}", person_a.display_name, person_b.display_name),
            format!("{}同{}", a_localized, b_localized),
            true,
        ));
        for (id_1, id_2) in &distractors {
            let record_1 = by_id[id_1.as_str()];
            let record_2 = by_id[id_2.as_str()];
            entries.push((
                format!("{} and {}", record_1.display_name, record_2.display_name),
                format!(
                    "{}同{}",
                    record_1.localized_name.as_deref().unwrap_or(&record_1.display_name),
                    record_2.localized_name.as_deref().unwrap_or(&record_2.display_name),
                ),
                false,
            ));
        }
        entries.shuffle(&mut self.rng);

        let mut choices = BTreeMap::new();
        let mut choices_cantonese = BTreeMap::new();
        let mut explanations = BTreeMap::new();
        let mut explanations_cantonese = BTreeMap::new();
        let mut correct_answer = String::new();

        for (letter, (text_en, text_zh, is_correct)) in CHOICE_LETTERS.iter().zip(&entries) {
            choices.insert(letter.to_string(), text_en.clone());
            choices_cantonese.insert(letter.to_string(), text_zh.clone());
            if *is_correct {
                correct_answer = letter.to_string();
                explanations.insert(
                    letter.to_string(),
                    format!("They were teammates at {}", org.name),
                );
                explanations_cantonese.insert(
                    letter.to_string(),
                    format!("佢哋喺{}做過隊友", org_localized),
                );
            } else {
                explanations.insert(
                    letter.to_string(),
                    "They have never been teammates".to_string(),
                );
                explanations_cantonese
                    .insert(letter.to_string(), "佢哋從來冇做過隊友".to_string());
            }
        }

        let mut metadata = BTreeMap::new();
        metadata.insert(
            "correct_pair_info".to_string(),
            json!({
                "person_a": {
                    "id": person_a.person_id,
                    "name_english": person_a.display_name,
                    "name_cantonese": a_localized,
                },
                "person_b": {
                    "id": person_b.person_id,
                    "name_english": person_b.display_name,
                    "name_cantonese": b_localized,
                },
                "organization": {
                    "id": pair.organization_id,
                    "name_english": org.name,
                    "name_cantonese": org_localized,
                },
                "overlap": pair.overlap,
            }),
        );

        Some(Question {
            question: "Which two players below have been teammates in the same club before?"
                .to_string(),
            question_cantonese: "以下邊對球員曾經喺同一間球會做過隊友？".to_string(),
            choices,
            choices_cantonese,
            correct_answer,
            explanations,
            explanations_cantonese,
            question_type: "club_teammate_relationship".to_string(),
            metadata,
        })
    }

    /// Sample `count` canonical person pairs who were never teammates.
    fn non_teammate_pairs(
        &mut self,
        localized_ids: &[&str],
        teammate_keys: &BTreeSet<(String, String)>,
        exclude: &(String, String),
        count: usize,
    ) -> Option<Vec<(String, String)>> {
        if localized_ids.len() < 2 {
            return None;
        }

        let mut found: Vec<(String, String)> = Vec::with_capacity(count);
        let mut attempts = 0;

        while found.len() < count && attempts < self.max_attempts {
            attempts += 1;

            let id_1 = *localized_ids.choose(&mut self.rng)?;
            let id_2 = *localized_ids.choose(&mut self.rng)?;
            if id_1 == id_2 {
                continue;
            }

            let key = if id_1 <= id_2 {
                (id_1.to_string(), id_2.to_string())
            } else {
                (id_2.to_string(), id_1.to_string())
            };

            if teammate_keys.contains(&key) || key == *exclude || found.contains(&key) {
                continue;
            }

            found.push(key);
        }

        if found.len() == count {
            Some(found)
        } else {
            debug!(attempts, "not enough non-teammate distractor pairs");
            None
        }
    }

    // ------------------------------------------------------------------
    // Birth-year questions
    // ------------------------------------------------------------------

    /// Build birth-year questions. Distractor years come from the corpus
    /// distribution, preferring years close to the correct one; nearby
    /// synthetic years pad the pool when the corpus is thin.
    pub fn birth_year_questions(
        &mut self,
        births: &[BirthRecord],
        limit: usize,
    ) -> Vec<Question> {
        let mut distribution: BTreeMap<i32, usize> = BTreeMap::new();
        for birth in births {
            *distribution.entry(birth.birth_year).or_insert(0) += 1;
        }

        let mut pool: Vec<&BirthRecord> = births.iter().collect();
        if pool.len() > limit {
            pool.shuffle(&mut self.rng);
            pool.truncate(limit);
        }

        let mut questions = Vec::new();
        for birth in pool {
            if let Some(question) = self.birth_year_question(birth, &distribution) {
                questions.push(question);
            }
        }
        questions
    }

    fn birth_year_question(
        &mut self,
        birth: &BirthRecord,
        distribution: &BTreeMap<i32, usize>,
    ) -> Option<Question> {
        let distractors = birth_year_distractors(birth.birth_year, distribution, 3);
        if distractors.len() < 3 {
            return None;
        }

        let mut years: Vec<i32> = Vec::with_capacity(4);
        years.push(birth.birth_year);
        years.extend(&distractors);
        years.shuffle(&mut self.rng);

        let mut choices = BTreeMap::new();
        let mut choices_cantonese = BTreeMap::new();
        let mut correct_answer = String::new();

        for (letter, year) in CHOICE_LETTERS.iter().zip(&years) {
            choices.insert(letter.to_string(), year.to_string());
            choices_cantonese.insert(letter.to_string(), format!("{}年", year));
            if *year == birth.birth_year {
                correct_answer = letter.to_string();
            }
        }

        let mut metadata = BTreeMap::new();
        metadata.insert(
            "correct_birth_info".to_string(),
            json!({
                "birth_year": birth.birth_year,
                "birth_date": birth.birth_date,
            }),
        );
        metadata.insert(
            "player_info".to_string(),
            json!({
                "id": birth.person_id,
                "name": birth.display_name,
                "name_cantonese": birth.best_name(),
            }),
        );
        metadata.insert("distractors".to_string(), json!(distractors));

        Some(Question {
            question: format!(
                "What year was {}, the soccer player, born?",
                birth.display_name
            ),
            question_cantonese: format!("足球員{}係邊年出世？", birth.best_name()),
            choices,
            choices_cantonese,
            correct_answer,
            explanations: BTreeMap::new(),
            explanations_cantonese: BTreeMap::new(),
            question_type: "player_birth_year".to_string(),
            metadata,
        })
    }
}

fn pair_is_askable(pair: &CoMembership, by_id: &BTreeMap<&str, &PersonRecord>) -> bool {
    let Some(person_a) = by_id.get(pair.person_a.as_str()) else {
        return false;
    };
    let Some(person_b) = by_id.get(pair.person_b.as_str()) else {
        return false;
    };

    let org_localized = person_a
        .organizations
        .iter()
        .find(|org| org.organization_id == pair.organization_id)
        .map(|org| org.localized_name.is_some())
        .unwrap_or(false);

    person_a.localized_name.is_some() && person_b.localized_name.is_some() && org_localized
}

/// Score candidate years by closeness to the correct year plus corpus
/// frequency, padding with nearby years when the corpus has too few.
fn birth_year_distractors(
    correct_year: i32,
    distribution: &BTreeMap<i32, usize>,
    count: usize,
) -> Vec<i32> {
    let mut candidates: Vec<i32> = distribution
        .keys()
        .copied()
        .filter(|year| *year != correct_year)
        .collect();

    if candidates.len() < count {
        for offset in [1, -1, 2, -2, 3, -3, 4, -4, 5, -5] {
            let year = correct_year + offset;
            if (1970..=2010).contains(&year) && !candidates.contains(&year) {
                candidates.push(year);
            }
            if candidates.len() >= count {
                break;
            }
        }
    }

    let score = |year: i32| -> f64 {
        let distance_penalty = (year - correct_year).abs() as f64;
        let frequency_bonus = distribution.get(&year).copied().unwrap_or(0) as f64 * 0.1;
        -distance_penalty + frequency_bonus
    };

    candidates.sort_by(|a, b| {
        score(*b)
            .partial_cmp(&score(*a))
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.cmp(b))
    });
    candidates.truncate(count);
    candidates
}

// ============================================================================
// TESTS
// ============================================================================
