//! Answer evaluation. Pure functions from (question, submitted answer) to a verdict.
//!
//! Incomplete submissions are rejected with `SubmitError` before any comparison
//! happens, so a `Verdict` always describes a fully answered question.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::domain::{Question, QuestionKind, YesNo};
use crate::error::SubmitError;

/// What the user submitted, shaped per question type.
///
/// Grid-like answers use `Option` per slot so the page can send what it has and
/// let the evaluator decide whether the submission is complete.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum UserAnswer {
  Single(String),
  /// Letters currently marked selected. Duplicates collapse.
  Multi(Vec<String>),
  Hotspot(Vec<Option<YesNo>>),
  Matching(Vec<Option<String>>),
  Dropdown(BTreeMap<String, String>),
  DragDrop(Vec<Option<String>>),
}

impl UserAnswer {
  pub fn label(&self) -> &'static str {
    match self {
      UserAnswer::Single(_) => "SINGLE",
      UserAnswer::Multi(_) => "MULTI",
      UserAnswer::Hotspot(_) => "HOTSPOT",
      UserAnswer::Matching(_) => "MATCHING",
      UserAnswer::Dropdown(_) => "DROPDOWN",
      UserAnswer::DragDrop(_) => "DRAG_DROP",
    }
  }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct PartialScore {
  pub correct: usize,
  pub total: usize,
}

/// Outcome of one evaluated submission.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Verdict {
  pub is_correct: bool,
  /// Per statement / item / dropdown / zone, in display order. Empty for choice types.
  pub item_results: Vec<bool>,
  pub partial: Option<PartialScore>,
  /// Whether the page should print the overall correct/incorrect sentence.
  /// DRAG_DROP only shows its partial score.
  pub announce_overall: bool,
}

impl Verdict {
  fn whole(is_correct: bool) -> Self {
    Self { is_correct, item_results: Vec::new(), partial: None, announce_overall: true }
  }

  fn per_item(item_results: Vec<bool>, announce_overall: bool) -> Self {
    let correct = item_results.iter().filter(|ok| **ok).count();
    let total = item_results.len();
    Self {
      is_correct: correct == total,
      item_results,
      partial: Some(PartialScore { correct, total }),
      announce_overall,
    }
  }
}

/// Evaluate `answer` against `question`. Never mutates anything.
pub fn evaluate(question: &Question, answer: &UserAnswer) -> Result<Verdict, SubmitError> {
  match (&question.kind, answer) {
    (QuestionKind::Single { answer: key, .. }, UserAnswer::Single(letter)) => {
      let letter = letter.trim();
      if letter.is_empty() {
        return Err(SubmitError::NoSelection);
      }
      Ok(Verdict::whole(letter == key))
    }

    (QuestionKind::Multi { answer: key, .. }, UserAnswer::Multi(letters)) => {
      let picked: BTreeSet<&str> = letters.iter().map(|l| l.trim()).filter(|l| !l.is_empty()).collect();
      if picked.is_empty() {
        return Err(SubmitError::NoSelection);
      }
      let correct: BTreeSet<&str> = key.iter().map(String::as_str).collect();
      let ok = picked.len() == correct.len() && picked.iter().all(|l| correct.contains(l));
      Ok(Verdict::whole(ok))
    }

    (QuestionKind::Hotspot { answer: key, .. }, UserAnswer::Hotspot(cells)) => {
      let cells = complete(cells, key.len())?;
      Ok(Verdict::per_item(cells.iter().zip(key).map(|(got, want)| *got == want).collect(), true))
    }

    (QuestionKind::Matching { items }, UserAnswer::Matching(picks)) => {
      let picks = complete(picks, items.len())?;
      Ok(Verdict::per_item(picks.iter().zip(items).map(|(got, item)| **got == item.answer).collect(), true))
    }

    (QuestionKind::Dropdown { dropdowns, answer: key }, UserAnswer::Dropdown(picks)) => {
      let answered = dropdowns
        .iter()
        .filter(|dd| picks.get(&dd.id).is_some_and(|l| !l.trim().is_empty()))
        .count();
      if answered < dropdowns.len() {
        return Err(SubmitError::Incomplete { answered, required: dropdowns.len() });
      }
      let results = dropdowns
        .iter()
        .map(|dd| picks.get(&dd.id).map(|l| l.trim()) == key.get(&dd.id).map(String::as_str))
        .collect();
      Ok(Verdict::per_item(results, true))
    }

    (QuestionKind::DragDrop { zones, .. }, UserAnswer::DragDrop(dropped)) => {
      let dropped = complete(dropped, zones.len())?;
      Ok(Verdict::per_item(dropped.iter().zip(zones).map(|(got, zone)| **got == zone.correct_answer).collect(), false))
    }

    (kind, other) => Err(SubmitError::WrongShape { expected: kind.question_type().label(), got: other.label() }),
  }
}

/// The expected answer per element, for reveal after submission.
pub fn solution(question: &Question) -> Vec<String> {
  match &question.kind {
    QuestionKind::Single { answer, .. } => vec![answer.clone()],
    QuestionKind::Multi { answer, .. } => answer.clone(),
    QuestionKind::Hotspot { answer, .. } => answer.iter().map(YesNo::to_string).collect(),
    QuestionKind::Matching { items } => items.iter().map(|i| i.answer.clone()).collect(),
    QuestionKind::Dropdown { dropdowns, answer } => dropdowns
      .iter()
      .map(|dd| answer.get(&dd.id).cloned().unwrap_or_default())
      .collect(),
    QuestionKind::DragDrop { zones, .. } => zones.iter().map(|z| z.correct_answer.clone()).collect(),
  }
}

/// Every slot must be filled and the slot count must match the question.
fn complete<T>(slots: &[Option<T>], required: usize) -> Result<Vec<&T>, SubmitError> {
  let filled: Vec<&T> = slots.iter().take(required).flatten().collect();
  if filled.len() < required {
    return Err(SubmitError::Incomplete { answered: filled.len(), required });
  }
  Ok(filled)
}
