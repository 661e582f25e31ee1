//! Domain models: question types, the per-type answer keys, and the question itself.
//!
//! A `Question` is only ever built by the repository loader after validation, so
//! every `QuestionKind` variant carries an answer key that fits its own shape.

use std::{collections::BTreeMap, fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// Which interaction a question uses. `SINGLE` when the document says nothing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuestionType {
  #[default]
  #[serde(alias = "MULTIPLE_CHOICE", alias = "SINGLE_CHOICE")]
  Single,
  #[serde(alias = "MULTI_SELECT", alias = "MULTIPLE_ANSWER")]
  Multi,
  Hotspot,
  Matching,
  Dropdown,
  #[serde(alias = "DRAG_AND_DROP")]
  DragDrop,
}

impl QuestionType {
  pub fn label(self) -> &'static str {
    match self {
      QuestionType::Single => "SINGLE",
      QuestionType::Multi => "MULTI",
      QuestionType::Hotspot => "HOTSPOT",
      QuestionType::Matching => "MATCHING",
      QuestionType::Dropdown => "DROPDOWN",
      QuestionType::DragDrop => "DRAG_DROP",
    }
  }
}

impl fmt::Display for QuestionType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.label())
  }
}

/// One lettered choice ("A. Azure Storage").
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceOption {
  pub letter: String,
  pub text: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchingItem {
  pub item: String,
  pub options: Vec<String>,
  pub answer: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dropdown {
  pub id: String,
  pub options: Vec<ChoiceOption>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropZone {
  pub description: String,
  #[serde(rename = "correctAnswer")]
  pub correct_answer: String,
}

/// Hotspot cell value. Parses the usual spellings of yes/no.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub enum YesNo {
  Yes,
  No,
}

impl FromStr for YesNo {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().as_str() {
      "yes" | "y" | "true" => Ok(YesNo::Yes),
      "no" | "n" | "false" => Ok(YesNo::No),
      other => Err(format!("'{}' is not a Yes/No value", other)),
    }
  }
}

impl TryFrom<String> for YesNo {
  type Error = String;

  fn try_from(value: String) -> Result<Self, Self::Error> {
    value.parse()
  }
}

impl fmt::Display for YesNo {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      YesNo::Yes => "Yes",
      YesNo::No => "No",
    })
  }
}

/// Per-type presentation data plus the answer key that goes with it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum QuestionKind {
  Single { options: Vec<ChoiceOption>, answer: String },
  /// Key letters are deduplicated and kept in document order.
  Multi { options: Vec<ChoiceOption>, answer: Vec<String> },
  Hotspot { statements: Vec<String>, answer: Vec<YesNo> },
  Matching { items: Vec<MatchingItem> },
  Dropdown { dropdowns: Vec<Dropdown>, answer: BTreeMap<String, String> },
  DragDrop { drag_options: Vec<String>, zones: Vec<DropZone> },
}

impl QuestionKind {
  pub fn question_type(&self) -> QuestionType {
    match self {
      QuestionKind::Single { .. } => QuestionType::Single,
      QuestionKind::Multi { .. } => QuestionType::Multi,
      QuestionKind::Hotspot { .. } => QuestionType::Hotspot,
      QuestionKind::Matching { .. } => QuestionType::Matching,
      QuestionKind::Dropdown { .. } => QuestionType::Dropdown,
      QuestionKind::DragDrop { .. } => QuestionType::DragDrop,
    }
  }

  /// Lettered options, only for the choice types.
  pub fn options(&self) -> &[ChoiceOption] {
    match self {
      QuestionKind::Single { options, .. } | QuestionKind::Multi { options, .. } => options,
      _ => &[],
    }
  }
}

/// A validated, immutable question record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Question {
  pub id: u32,
  pub text: String,
  pub image: Option<String>,
  pub explanation: Option<String>,
  pub kind: QuestionKind,
}

impl Question {
  pub fn question_type(&self) -> QuestionType {
    self.kind.question_type()
  }

  /// Case-insensitive substring match on the question text only.
  /// `needle` must already be lowercased.
  pub fn text_contains(&self, needle: &str) -> bool {
    self.text.to_lowercase().contains(needle)
  }

  /// Text match, widened to option text for SINGLE/MULTI.
  /// `needle` must already be lowercased.
  pub fn matches_filter(&self, needle: &str) -> bool {
    self.text_contains(needle)
      || self
        .kind
        .options()
        .iter()
        .any(|o| o.text.to_lowercase().contains(needle))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn question_type_accepts_legacy_names() {
    let t: QuestionType = serde_json::from_str("\"MULTIPLE_CHOICE\"").unwrap();
    assert_eq!(t, QuestionType::Single);
    let t: QuestionType = serde_json::from_str("\"DRAG_AND_DROP\"").unwrap();
    assert_eq!(t, QuestionType::DragDrop);
    let t: QuestionType = serde_json::from_str("\"HOTSPOT\"").unwrap();
    assert_eq!(t, QuestionType::Hotspot);
    assert_eq!(serde_json::to_string(&QuestionType::DragDrop).unwrap(), "\"DRAG_DROP\"");
  }

  #[test]
  fn yes_no_parses_common_spellings() {
    assert_eq!("Yes".parse::<YesNo>(), Ok(YesNo::Yes));
    assert_eq!(" n ".parse::<YesNo>(), Ok(YesNo::No));
    assert_eq!("TRUE".parse::<YesNo>(), Ok(YesNo::Yes));
    assert!("maybe".parse::<YesNo>().is_err());
    let v: Vec<YesNo> = serde_json::from_str(r#"["yes","No"]"#).unwrap();
    assert_eq!(v, vec![YesNo::Yes, YesNo::No]);
  }

  #[test]
  fn filter_looks_at_options_only_for_choice_types() {
    let single = Question {
      id: 1,
      text: "Which service?".into(),
      image: None,
      explanation: None,
      kind: QuestionKind::Single {
        options: vec![ChoiceOption { letter: "A".into(), text: "Blob Storage".into() }],
        answer: "A".into(),
      },
    };
    assert!(single.matches_filter("storage"));
    assert!(!single.text_contains("storage"));

    let hotspot = Question {
      id: 2,
      text: "Evaluate each statement.".into(),
      image: None,
      explanation: None,
      kind: QuestionKind::Hotspot { statements: vec!["Storage is cheap.".into()], answer: vec![YesNo::Yes] },
    };
    assert!(!hotspot.matches_filter("storage"));
  }
}
