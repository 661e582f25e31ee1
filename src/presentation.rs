//! Presentation adapter: decodes raw input (keys, swipes) into session actions and
//! renders read-only snapshots and submit results for the page.

use crate::evaluator::{solution, Verdict};
use crate::protocol::{to_out, FirstAttemptOut, JumpMarker, QuestionView, SubmitOut};
use crate::session::{Direction, Session, Submission};

const NO_EXPLANATION: &str = "No explanation provided.";

/// Session-level effect of an input gesture.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
  Advance(Direction),
  Shuffle,
  ToggleBookmark,
}

/// Keyboard policy. Keys typed into the search box never reach the quiz.
pub fn decode_key(key: &str, in_search: bool) -> Option<Action> {
  if in_search {
    return None;
  }
  match key {
    "ArrowLeft" => Some(Action::Advance(Direction::Backward)),
    "ArrowRight" => Some(Action::Advance(Direction::Forward)),
    "s" | "S" => Some(Action::Shuffle),
    "b" | "B" => Some(Action::ToggleBookmark),
    _ => None,
  }
}

/// Horizontal swipe beyond `threshold` pixels. Swiping left shows the next question.
pub fn decode_swipe(dx: f64, dy: f64, threshold: f64) -> Option<Action> {
  if !dx.is_finite() || dx.abs() <= threshold || dx.abs() < dy.abs() {
    return None;
  }
  Some(Action::Advance(if dx < 0.0 { Direction::Forward } else { Direction::Backward }))
}

/// One marker every `block` questions, labelled with the 1-based range start.
pub fn jump_markers(len: usize, block: usize) -> Vec<JumpMarker> {
  let block = block.max(1);
  (0..len)
    .step_by(block)
    .map(|index| JumpMarker { index, label: format!("{}-{}", index + 1, (index + block).min(len)) })
    .collect()
}

pub fn build_view(session: &Session, jump_block: usize) -> QuestionView {
  let total = session.len();
  let question = session.current();
  let position = if question.is_some() { session.current_index() + 1 } else { 0 };
  QuestionView {
    position,
    total,
    progress_percent: if total == 0 { 0.0 } else { position as f64 * 100.0 / total as f64 },
    score_percent: session.score_percentage(),
    score: session.score(),
    attempts: session.attempts(),
    can_prev: question.is_some() && session.current_index() > 0,
    can_next: question.is_some() && session.current_index() + 1 < total,
    bookmarked: question.is_some_and(|q| session.is_bookmarked(q.id)),
    first_attempt: question
      .and_then(|q| session.first_attempt(q.id))
      .map(|a| FirstAttemptOut { is_correct: a.is_correct, user_answer: a.user_answer.clone() }),
    question: question.map(to_out),
    jump_markers: jump_markers(total, jump_block),
  }
}

/// The sentence shown under the question after a submit.
pub fn feedback_line(verdict: &Verdict) -> String {
  let score = verdict.partial.map(|p| format!("{}/{} correct", p.correct, p.total));
  match (verdict.announce_overall, score) {
    (false, Some(score)) => score,
    (_, score) => {
      let overall = if verdict.is_correct { "✓ Correct!" } else { "✗ Incorrect." };
      match score {
        Some(score) => format!("{} ({})", overall, score),
        None => overall.to_string(),
      }
    }
  }
}

pub fn submit_out(session: &Session, submission: &Submission) -> SubmitOut {
  let question = session.current().filter(|q| q.id == submission.question_id);
  let first_attempt_note = (!submission.is_first).then(|| {
    format!(
      "First attempt was {}",
      if submission.first_attempt.is_correct { "correct" } else { "incorrect" }
    )
  });
  SubmitOut {
    question_id: submission.question_id,
    correct: submission.verdict.is_correct,
    announce_overall: submission.verdict.announce_overall,
    partial: submission.verdict.partial,
    item_results: submission.verdict.item_results.clone(),
    solution: question.map(solution).unwrap_or_default(),
    feedback: feedback_line(&submission.verdict),
    explanation: question
      .and_then(|q| q.explanation.clone())
      .unwrap_or_else(|| NO_EXPLANATION.to_string()),
    is_first_attempt: submission.is_first,
    first_attempt_correct: submission.first_attempt.is_correct,
    first_attempt_note,
  }
}
