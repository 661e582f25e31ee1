//! Public protocol structs for WebSocket and HTTP endpoints (serde ready).
//! Keep this small and stable to evolve backend and page independently.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::{ChoiceOption, Question, QuestionKind, QuestionType};
use crate::evaluator::{PartialScore, UserAnswer};

/// Messages the page can send over WebSocket. One session per connection.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientWsMessage {
    Ping,
    /// Re-send the current view.
    View,
    /// Raw key press; decoded by the presentation adapter.
    Key {
        key: String,
        #[serde(default, rename = "inSearch")]
        in_search: bool,
    },
    /// Completed touch gesture, in pixels.
    Swipe {
        dx: f64,
        #[serde(default)]
        dy: f64,
    },
    Next,
    Prev,
    Shuffle,
    ToggleBookmark,
    /// Narrow the working set (search box input).
    Search {
        query: String,
    },
    /// Search box closed or emptied.
    ClearSearch,
    FindNext {
        query: String,
    },
    JumpTo {
        index: usize,
    },
    Submit {
        answer: UserAnswer,
    },
}

/// Messages the server sends back over WebSocket.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerWsMessage {
    Pong,
    View {
        view: QuestionView,
    },
    SubmitResult {
        result: SubmitOut,
        view: QuestionView,
    },
    /// Blocking validation notice; nothing was evaluated.
    Notice {
        message: String,
    },
    NotFound {
        query: String,
    },
    /// The question repository could not be loaded. Terminal for the session.
    LoadError {
        message: String,
    },
    Error {
        message: String,
    },
}

/// Read-only render snapshot of the session.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionView {
    /// 1-based; 0 when the working set is empty.
    pub position: usize,
    pub total: usize,
    pub progress_percent: f64,
    pub score_percent: u32,
    pub score: usize,
    pub attempts: usize,
    pub can_prev: bool,
    pub can_next: bool,
    pub bookmarked: bool,
    pub question: Option<QuestionOut>,
    pub first_attempt: Option<FirstAttemptOut>,
    pub jump_markers: Vec<JumpMarker>,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct JumpMarker {
    pub index: usize,
    pub label: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FirstAttemptOut {
    pub is_correct: bool,
    pub user_answer: UserAnswer,
}

/// A question as the page sees it: everything but the answer key and explanation.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionOut {
    pub id: u32,
    pub label: String,
    pub text: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<ChoiceOption>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub statements: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub matching_items: Vec<MatchingItemOut>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dropdowns: Vec<DropdownOut>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub drag_options: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub drop_zones: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct MatchingItemOut {
    pub item: String,
    pub options: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct DropdownOut {
    pub id: String,
    pub options: Vec<ChoiceOption>,
}

/// Convert a full `Question` (internal) to the public DTO.
pub fn to_out(q: &Question) -> QuestionOut {
    let mut out = QuestionOut {
        id: q.id,
        label: format!("Q{}", q.id),
        text: q.text.clone(),
        question_type: q.question_type(),
        image: q.image.clone(),
        options: Vec::new(),
        statements: Vec::new(),
        matching_items: Vec::new(),
        dropdowns: Vec::new(),
        drag_options: Vec::new(),
        drop_zones: Vec::new(),
    };
    match &q.kind {
        QuestionKind::Single { options, .. } | QuestionKind::Multi { options, .. } => {
            out.options = options.clone();
        }
        QuestionKind::Hotspot { statements, .. } => out.statements = statements.clone(),
        QuestionKind::Matching { items } => {
            out.matching_items = items
                .iter()
                .map(|i| MatchingItemOut { item: i.item.clone(), options: i.options.clone() })
                .collect();
        }
        QuestionKind::Dropdown { dropdowns, .. } => {
            out.dropdowns = dropdowns
                .iter()
                .map(|d| DropdownOut { id: d.id.clone(), options: d.options.clone() })
                .collect();
        }
        QuestionKind::DragDrop { drag_options, zones } => {
            out.drag_options = drag_options.clone();
            out.drop_zones = zones.iter().map(|z| z.description.clone()).collect();
        }
    }
    out
}

/// Outcome of one submission, including what to reveal.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitOut {
    pub question_id: u32,
    pub correct: bool,
    pub announce_overall: bool,
    pub partial: Option<PartialScore>,
    pub item_results: Vec<bool>,
    pub solution: Vec<String>,
    pub feedback: String,
    pub explanation: String,
    pub is_first_attempt: bool,
    pub first_attempt_correct: bool,
    /// Secondary indicator shown on resubmissions.
    pub first_attempt_note: Option<String>,
}

//
// HTTP response DTOs
//

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryOut {
    pub loaded: bool,
    pub title: Option<String>,
    pub total_questions: usize,
    /// `totalQuestions` as written in the document, if any.
    pub declared_total: Option<usize>,
    pub by_type: BTreeMap<QuestionType, usize>,
    pub error: Option<String>,
}

#[derive(Serialize)]
pub struct BookmarksOut {
    pub key: String,
    pub ids: Vec<u32>,
}
