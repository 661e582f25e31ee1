//! Question repository: decodes the JSON document, validates every record against
//! its declared type and hands out an immutable, ordered question list.
//!
//! Decoding is lenient about field names (`question`/`text`, `questionType`/`type`)
//! and about the answer key's raw shape. Validation is strict: a record whose key
//! does not fit its type fails the whole load with the offending id.

use std::{
  collections::{BTreeMap, BTreeSet, HashSet},
  path::Path,
};

use serde::Deserialize;
use serde_json::Value;
use tracing::{info, instrument, warn};

use crate::domain::{ChoiceOption, DropZone, Dropdown, MatchingItem, Question, QuestionKind, QuestionType, YesNo};
use crate::error::LoadError;

/// Document header fields next to `questions`. Unknown fields are ignored.
#[derive(Debug, Default, Deserialize)]
struct RawHeader {
  #[serde(default)]
  title: Option<String>,
  #[serde(default, rename = "totalQuestions")]
  total_questions: Option<usize>,
}

/// Answer key exactly as written in the document; interpreted per type.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum RawAnswer {
  Text(String),
  List(Vec<String>),
  Map(BTreeMap<String, String>),
}

#[derive(Debug, Deserialize)]
struct RawQuestion {
  id: i64,
  #[serde(alias = "text")]
  question: String,
  #[serde(default, rename = "questionType", alias = "type")]
  question_type: Option<QuestionType>,
  #[serde(default)]
  options: Vec<ChoiceOption>,
  #[serde(default)]
  statements: Vec<String>,
  #[serde(default, rename = "matchingItems")]
  matching_items: Vec<MatchingItem>,
  #[serde(default)]
  dropdowns: Vec<Dropdown>,
  #[serde(default, rename = "dragOptions")]
  drag_options: Vec<String>,
  #[serde(default, rename = "dropZones")]
  drop_zones: Vec<DropZone>,
  #[serde(default)]
  answer: Option<RawAnswer>,
  #[serde(default)]
  image: Option<String>,
  #[serde(default)]
  explanation: Option<String>,
}

/// The full, validated question set in document order.
#[derive(Clone, Debug)]
pub struct Repository {
  title: Option<String>,
  declared_total: Option<usize>,
  questions: Vec<Question>,
}

impl Repository {
  /// Read and validate the document at `path`.
  #[instrument(level = "info", skip_all, fields(path = %path.as_ref().display()))]
  pub async fn load(path: impl AsRef<Path>) -> Result<Self, LoadError> {
    let path = path.as_ref();
    let raw = tokio::fs::read_to_string(path)
      .await
      .map_err(|source| LoadError::Io { path: path.to_path_buf(), source })?;
    let repo = Self::from_json(&raw)?;
    info!(target: "quizdeck", questions = repo.len(), title = repo.title().unwrap_or("-"), "Question repository loaded");
    Ok(repo)
  }

  /// Parse and validate a document already in memory. All-or-nothing.
  pub fn from_json(raw: &str) -> Result<Self, LoadError> {
    let (header, records) = match serde_json::from_str::<Value>(raw)? {
      Value::Array(records) => (RawHeader::default(), records),
      Value::Object(mut fields) => {
        let records = match fields.remove("questions") {
          Some(Value::Array(records)) => records,
          _ => return Err(LoadError::Layout("expected a `questions` array".into())),
        };
        let header = serde_json::from_value::<RawHeader>(Value::Object(fields))
          .map_err(|e| LoadError::Layout(e.to_string()))?;
        (header, records)
      }
      _ => return Err(LoadError::Layout("expected an array of questions or an object with `questions`".into())),
    };

    let questions = records
      .into_iter()
      .map(|record| decode_record(record).and_then(validate_question))
      .collect::<Result<Vec<_>, _>>()?;
    Self::from_questions(header.title, header.total_questions, questions)
  }

  /// Build from already-typed questions (used by `from_json` and tests).
  pub fn from_questions(
    title: Option<String>,
    declared_total: Option<usize>,
    questions: Vec<Question>,
  ) -> Result<Self, LoadError> {
    if questions.is_empty() {
      return Err(LoadError::Empty);
    }
    let mut seen = HashSet::new();
    for q in &questions {
      if !seen.insert(q.id) {
        return Err(LoadError::DuplicateId(q.id));
      }
    }
    if let Some(total) = declared_total {
      if total != questions.len() {
        warn!(target: "quizdeck", declared = total, actual = questions.len(), "totalQuestions does not match the number of questions");
      }
    }
    Ok(Self { title, declared_total, questions })
  }

  pub fn title(&self) -> Option<&str> {
    self.title.as_deref()
  }

  pub fn declared_total(&self) -> Option<usize> {
    self.declared_total
  }

  pub fn len(&self) -> usize {
    self.questions.len()
  }

  pub fn questions(&self) -> &[Question] {
    &self.questions
  }

  pub fn get(&self, position: usize) -> Option<&Question> {
    self.questions.get(position)
  }

  /// Question count per type, for the summary endpoint and startup logs.
  pub fn counts_by_type(&self) -> BTreeMap<QuestionType, usize> {
    let mut counts = BTreeMap::new();
    for q in &self.questions {
      *counts.entry(q.question_type()).or_insert(0) += 1;
    }
    counts
  }

  /// Log image references that do not resolve under `static_dir`.
  /// Absolute URLs are skipped. Returns the ids with missing images.
  #[instrument(level = "debug", skip(self))]
  pub fn audit_images(&self, static_dir: &Path) -> Vec<u32> {
    let mut missing = Vec::new();
    let mut by_type: BTreeMap<QuestionType, usize> = BTreeMap::new();
    for q in &self.questions {
      let Some(image) = q.image.as_deref() else { continue };
      *by_type.entry(q.question_type()).or_insert(0) += 1;
      if image.contains("://") || image.starts_with("data:") {
        continue;
      }
      if !static_dir.join(image.trim_start_matches('/')).exists() {
        warn!(target: "quizdeck", id = q.id, %image, "Image referenced by question is missing");
        missing.push(q.id);
      }
    }
    for (kind, count) in by_type {
      info!(target: "quizdeck", %kind, count, "Questions with images");
    }
    missing
  }
}

/// Typed view of one record. Decode failures are reported against the record's id.
fn decode_record(record: Value) -> Result<RawQuestion, LoadError> {
  let id = record
    .get("id")
    .and_then(Value::as_u64)
    .and_then(|id| u32::try_from(id).ok())
    .unwrap_or(0);
  serde_json::from_value(record).map_err(|e| LoadError::invalid(id, e.to_string()))
}

fn validate_question(raw: RawQuestion) -> Result<Question, LoadError> {
  let id = u32::try_from(raw.id)
    .ok()
    .filter(|id| *id > 0)
    .ok_or_else(|| LoadError::invalid(0, format!("id {} is not a positive integer", raw.id)))?;

  if raw.question.trim().is_empty() {
    return Err(LoadError::invalid(id, "question text is empty"));
  }

  let kind = match raw.question_type.unwrap_or_default() {
    QuestionType::Single => {
      let letters = option_letters(id, &raw.options)?;
      let answer = match raw.answer {
        Some(RawAnswer::Text(s)) => s.trim().to_string(),
        Some(RawAnswer::List(v)) if v.len() == 1 => v[0].trim().to_string(),
        other => return Err(wrong_key(id, QuestionType::Single, &other)),
      };
      if !letters.contains(answer.as_str()) {
        return Err(LoadError::invalid(id, format!("answer '{}' is not one of the option letters", answer)));
      }
      QuestionKind::Single { options: raw.options, answer }
    }

    QuestionType::Multi => {
      let letters = option_letters(id, &raw.options)?;
      let answer: Vec<String> = match raw.answer {
        Some(RawAnswer::List(v)) => v.into_iter().map(|s| s.trim().to_string()).collect(),
        Some(RawAnswer::Text(s)) => split_letter_key(&s),
        other => return Err(wrong_key(id, QuestionType::Multi, &other)),
      };
      let answer = dedup_in_order(answer);
      if answer.is_empty() {
        return Err(LoadError::invalid(id, "MULTI answer key has no letters"));
      }
      if let Some(bad) = answer.iter().find(|l| !letters.contains(l.as_str())) {
        return Err(LoadError::invalid(id, format!("answer letter '{}' is not one of the options", bad)));
      }
      QuestionKind::Multi { options: raw.options, answer }
    }

    QuestionType::Hotspot => {
      if raw.statements.is_empty() {
        return Err(LoadError::invalid(id, "HOTSPOT question has no statements"));
      }
      let cells: Vec<String> = match raw.answer {
        Some(RawAnswer::List(v)) => v,
        Some(RawAnswer::Text(s)) => split_delimited(&s),
        other => return Err(wrong_key(id, QuestionType::Hotspot, &other)),
      };
      if cells.len() != raw.statements.len() {
        return Err(LoadError::invalid(
          id,
          format!("HOTSPOT key has {} values for {} statements", cells.len(), raw.statements.len()),
        ));
      }
      let answer = cells
        .iter()
        .map(|c| c.parse::<YesNo>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| LoadError::invalid(id, e))?;
      QuestionKind::Hotspot { statements: raw.statements, answer }
    }

    QuestionType::Matching => {
      if raw.matching_items.is_empty() {
        return Err(LoadError::invalid(id, "MATCHING question has no matchingItems"));
      }
      for (i, item) in raw.matching_items.iter().enumerate() {
        if item.options.is_empty() {
          return Err(LoadError::invalid(id, format!("matching item {} has no options", i + 1)));
        }
        if !item.options.contains(&item.answer) {
          return Err(LoadError::invalid(
            id,
            format!("matching item {} answer '{}' is not one of its options", i + 1, item.answer),
          ));
        }
      }
      QuestionKind::Matching { items: raw.matching_items }
    }

    QuestionType::Dropdown => {
      if raw.dropdowns.is_empty() {
        return Err(LoadError::invalid(id, "DROPDOWN question has no dropdowns"));
      }
      let answer = match raw.answer {
        Some(RawAnswer::Map(m)) => m,
        other => return Err(wrong_key(id, QuestionType::Dropdown, &other)),
      };
      let mut ids = HashSet::new();
      for dd in &raw.dropdowns {
        if !ids.insert(dd.id.as_str()) {
          return Err(LoadError::invalid(id, format!("dropdown id '{}' is repeated", dd.id)));
        }
        let letters = option_letters(id, &dd.options)?;
        match answer.get(&dd.id) {
          Some(letter) if letters.contains(letter.as_str()) => {}
          Some(letter) => {
            return Err(LoadError::invalid(
              id,
              format!("dropdown '{}' answer '{}' is not one of its letters", dd.id, letter),
            ))
          }
          None => return Err(LoadError::invalid(id, format!("no answer for dropdown '{}'", dd.id))),
        }
      }
      if let Some(extra) = answer.keys().find(|k| !ids.contains(k.as_str())) {
        return Err(LoadError::invalid(id, format!("answer names unknown dropdown '{}'", extra)));
      }
      QuestionKind::Dropdown { dropdowns: raw.dropdowns, answer }
    }

    QuestionType::DragDrop => {
      if raw.drag_options.is_empty() || raw.drop_zones.is_empty() {
        return Err(LoadError::invalid(id, "DRAG_DROP question needs dragOptions and dropZones"));
      }
      if let Some(zone) = raw.drop_zones.iter().find(|z| !raw.drag_options.contains(&z.correct_answer)) {
        return Err(LoadError::invalid(
          id,
          format!("drop zone '{}' expects '{}', which is not a drag option", zone.description, zone.correct_answer),
        ));
      }
      QuestionKind::DragDrop { drag_options: raw.drag_options, zones: raw.drop_zones }
    }
  };

  Ok(Question {
    id,
    text: raw.question,
    image: raw.image.filter(|s| !s.trim().is_empty()),
    explanation: raw.explanation.filter(|s| !s.trim().is_empty()),
    kind,
  })
}

fn option_letters(id: u32, options: &[ChoiceOption]) -> Result<BTreeSet<&str>, LoadError> {
  if options.is_empty() {
    return Err(LoadError::invalid(id, "question has no options"));
  }
  let mut letters = BTreeSet::new();
  for o in options {
    if !letters.insert(o.letter.as_str()) {
      return Err(LoadError::invalid(id, format!("option letter '{}' is repeated", o.letter)));
    }
  }
  Ok(letters)
}

fn wrong_key(id: u32, ty: QuestionType, got: &Option<RawAnswer>) -> LoadError {
  let shape = match got {
    None => "missing",
    Some(RawAnswer::Text(_)) => "a string",
    Some(RawAnswer::List(_)) => "a list",
    Some(RawAnswer::Map(_)) => "a map",
  };
  LoadError::invalid(id, format!("{} answer key is {}", ty, shape))
}

fn split_delimited(s: &str) -> Vec<String> {
  s.split(|c: char| c == ',' || c == '\n')
    .map(str::trim)
    .filter(|t| !t.is_empty())
    .map(str::to_string)
    .collect()
}

/// Legacy MULTI key: "A,C" or "A\nC". Only single-character tokens survive.
pub fn split_letter_key(s: &str) -> Vec<String> {
  split_delimited(s)
    .into_iter()
    .filter(|t| t.chars().count() == 1)
    .collect()
}

fn dedup_in_order(v: Vec<String>) -> Vec<String> {
  let mut seen = HashSet::new();
  v.into_iter().filter(|s| seen.insert(s.clone())).collect()
}
