//! Session state for one quiz run: working order, position, first attempts, score
//! and bookmarks.
//!
//! The working order is a list of positions into the shared `Repository`, so
//! shuffles and filters never copy question records.

use std::{collections::HashMap, sync::Arc};

use rand::{seq::SliceRandom, Rng};
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::bookmarks::Bookmarks;
use crate::domain::Question;
use crate::error::SubmitError;
use crate::evaluator::{evaluate, UserAnswer, Verdict};
use crate::repository::Repository;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
  Forward,
  Backward,
}

/// The recorded outcome of the first submission of a question.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FirstAttempt {
  pub is_correct: bool,
  pub user_answer: UserAnswer,
}

/// Result of a submit: this submission's verdict plus what was recorded first.
#[derive(Clone, Debug)]
pub struct Submission {
  pub question_id: u32,
  pub verdict: Verdict,
  pub first_attempt: FirstAttempt,
  /// True when this call created the first-attempt record.
  pub is_first: bool,
}

pub struct Session {
  repo: Arc<Repository>,
  order: Vec<usize>,
  current: usize,
  first_attempts: HashMap<u32, FirstAttempt>,
  score: usize,
  bookmarks: Bookmarks,
}

impl Session {
  /// Start a session over the full repository in document order.
  pub fn new(repo: Arc<Repository>, bookmarks: Bookmarks) -> Self {
    let order = (0..repo.len()).collect();
    Self { repo, order, current: 0, first_attempts: HashMap::new(), score: 0, bookmarks }
  }

  pub fn len(&self) -> usize {
    self.order.len()
  }

  pub fn current_index(&self) -> usize {
    self.current
  }

  /// `None` only when a filter matched nothing.
  pub fn current(&self) -> Option<&Question> {
    self.order.get(self.current).and_then(|p| self.repo.get(*p))
  }

  /// Question ids of the working order, in order.
  pub fn ordered_ids(&self) -> Vec<u32> {
    self.order.iter().filter_map(|p| self.repo.get(*p)).map(|q| q.id).collect()
  }

  pub fn first_attempt(&self, id: u32) -> Option<&FirstAttempt> {
    self.first_attempts.get(&id)
  }

  pub fn attempts(&self) -> usize {
    self.first_attempts.len()
  }

  pub fn score(&self) -> usize {
    self.score
  }

  pub fn is_bookmarked(&self, id: u32) -> bool {
    self.bookmarks.contains(id)
  }

  /// Uniform Fisher-Yates permutation of the full set. Resets position, attempts
  /// and score; bookmarks stay.
  #[instrument(level = "debug", skip_all)]
  pub fn shuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) {
    let mut order: Vec<usize> = (0..self.repo.len()).collect();
    order.shuffle(rng);
    self.order = order;
    self.current = 0;
    self.first_attempts.clear();
    self.score = 0;
    info!(target: "session", questions = self.order.len(), "Questions shuffled; score reset");
  }

  /// Narrow the working set to questions matching `query` (text, or option text
  /// for choice types), in document order. Blank queries do nothing.
  /// Returns the number of matches, or `None` for a blank query.
  #[instrument(level = "debug", skip(self))]
  pub fn filter(&mut self, query: &str) -> Option<usize> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
      return None;
    }
    self.order = self
      .repo
      .questions()
      .iter()
      .enumerate()
      .filter(|(_, q)| q.matches_filter(&needle))
      .map(|(p, _)| p)
      .collect();
    self.current = 0;
    debug!(target: "session", %query, matches = self.order.len(), "Filter applied");
    Some(self.order.len())
  }

  /// Back to the full set in document order.
  pub fn clear_filter(&mut self) {
    self.order = (0..self.repo.len()).collect();
    self.current = 0;
  }

  /// Move to the next question whose text contains `query`, wrapping around and
  /// never re-checking the current one. Returns the new index, or `None` on a miss.
  #[instrument(level = "debug", skip(self))]
  pub fn find_next(&mut self, query: &str) -> Option<usize> {
    let needle = query.trim().to_lowercase();
    let n = self.order.len();
    if needle.is_empty() || n == 0 {
      return None;
    }
    let hit = (1..n)
      .map(|step| (self.current + step) % n)
      .find(|i| self.repo.get(self.order[*i]).is_some_and(|q| q.text_contains(&needle)))?;
    self.current = hit;
    Some(hit)
  }

  /// Step once in `direction`. Returns false at the boundary.
  pub fn advance(&mut self, direction: Direction) -> bool {
    match direction {
      Direction::Backward if self.current > 0 => self.current -= 1,
      Direction::Forward if self.current + 1 < self.order.len() => self.current += 1,
      _ => return false,
    }
    true
  }

  /// Jump to `index`. Out-of-range indices leave the position unchanged.
  pub fn jump_to(&mut self, index: usize) -> bool {
    if index >= self.order.len() {
      return false;
    }
    self.current = index;
    true
  }

  /// Flip the current question's bookmark. `None` when there is no current question.
  pub fn toggle_bookmark(&mut self) -> Option<bool> {
    let id = self.current()?.id;
    let now = self.bookmarks.toggle(id);
    info!(target: "session", id, bookmarked = now, "Bookmark toggled");
    Some(now)
  }

  /// Keep the first outcome per id. Later calls return the stored record untouched.
  pub fn record_attempt(&mut self, question_id: u32, is_correct: bool, user_answer: UserAnswer) -> (FirstAttempt, bool) {
    if let Some(existing) = self.first_attempts.get(&question_id) {
      return (existing.clone(), false);
    }
    let attempt = FirstAttempt { is_correct, user_answer };
    if is_correct {
      self.score += 1;
    }
    self.first_attempts.insert(question_id, attempt.clone());
    (attempt, true)
  }

  /// Evaluate `answer` for the current question and record it if it is the first.
  #[instrument(level = "info", skip(self, answer))]
  pub fn submit(&mut self, answer: UserAnswer) -> Result<Submission, SubmitError> {
    let question = self.current().ok_or(SubmitError::NoCurrentQuestion)?;
    let question_id = question.id;
    let verdict = evaluate(question, &answer)?;
    let (first_attempt, is_first) = self.record_attempt(question_id, verdict.is_correct, answer);
    info!(
      target: "session",
      id = question_id,
      correct = verdict.is_correct,
      first = is_first,
      score = self.score,
      attempts = self.first_attempts.len(),
      "Answer evaluated"
    );
    Ok(Submission { question_id, verdict, first_attempt, is_first })
  }

  /// `round(100 * score / max(1, attempts))`, halves rounding up.
  pub fn score_percentage(&self) -> u32 {
    let attempts = self.first_attempts.len().max(1);
    ((200 * self.score + attempts) / (2 * attempts)) as u32
  }
}

#[cfg(test)]
pub(crate) mod tests {
  use super::*;
  use crate::bookmarks::{KeyValueStore, MemoryStore};
  use crate::domain::{ChoiceOption, QuestionKind, YesNo};
  use rand::{rngs::StdRng, SeedableRng};

  pub(crate) fn single(id: u32, text: &str, answer: &str) -> Question {
    Question {
      id,
      text: text.into(),
      image: None,
      explanation: None,
      kind: QuestionKind::Single {
        options: ["A", "B", "C", "D"]
          .iter()
          .map(|l| ChoiceOption { letter: l.to_string(), text: format!("choice {l}") })
          .collect(),
        answer: answer.into(),
      },
    }
  }

  /// Ten questions; only 3 and 8 mention "storage".
  pub(crate) fn ten() -> Arc<Repository> {
    let qs = (1..=10)
      .map(|id| {
        let text = match id {
          3 => "Which Azure Storage tier is cheapest?".to_string(),
          8 => "Where is blob STORAGE billed?".to_string(),
          _ => format!("General question number {id}"),
        };
        single(id, &text, "A")
      })
      .collect();
    Arc::new(Repository::from_questions(None, None, qs).unwrap())
  }

  pub(crate) fn session(repo: Arc<Repository>) -> Session {
    let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::default());
    Session::new(repo, Bookmarks::load(store, "az900_bookmarks"))
  }

  fn pick(letter: &str) -> UserAnswer {
    UserAnswer::Single(letter.into())
  }

  #[test]
  fn starts_in_document_order() {
    let s = session(ten());
    assert_eq!(s.ordered_ids(), (1..=10).collect::<Vec<_>>());
    assert_eq!(s.current_index(), 0);
    assert_eq!(s.score_percentage(), 0);
  }

  #[test]
  fn first_attempt_is_sticky() {
    let qs = (1..=7).map(|id| single(id, "q", "A")).collect();
    let repo = Arc::new(Repository::from_questions(None, None, qs).unwrap());
    let mut s = session(repo);
    assert!(s.jump_to(6));

    let first = s.submit(pick("A")).unwrap();
    assert!(first.is_first && first.verdict.is_correct);
    let second = s.submit(pick("B")).unwrap();
    assert!(!second.is_first);
    assert!(!second.verdict.is_correct);
    assert!(second.first_attempt.is_correct);
    let third = s.submit(pick("A")).unwrap();
    assert!(!third.is_first);

    assert_eq!(s.first_attempt(7), Some(&FirstAttempt { is_correct: true, user_answer: pick("A") }));
    assert_eq!(s.score(), 1);
    assert_eq!(s.attempts(), 1);
  }

  #[test]
  fn record_attempt_is_idempotent_after_first_call() {
    let mut s = session(ten());
    let (first, created) = s.record_attempt(7, true, pick("A"));
    assert!(created && first.is_correct);
    let (again, created) = s.record_attempt(7, false, pick("C"));
    assert!(!created);
    assert_eq!(again, first);
    s.record_attempt(7, true, pick("A"));
    assert_eq!(s.score(), 1);
    assert_eq!(s.attempts(), 1);
  }

  #[test]
  fn wrong_first_attempt_is_not_upgraded() {
    let mut s = session(ten());
    s.submit(pick("B")).unwrap();
    s.submit(pick("A")).unwrap();
    assert_eq!(s.score(), 0);
    assert!(!s.first_attempt(1).unwrap().is_correct);
  }

  #[test]
  fn rejected_submission_changes_nothing() {
    let mut s = session(ten());
    assert_eq!(s.submit(pick("")).unwrap_err(), SubmitError::NoSelection);
    assert_eq!(
      s.submit(UserAnswer::Hotspot(vec![Some(YesNo::Yes)])).unwrap_err(),
      SubmitError::WrongShape { expected: "SINGLE", got: "HOTSPOT" }
    );
    assert_eq!(s.attempts(), 0);
    assert_eq!(s.score(), 0);
  }

  #[test]
  fn score_percentage_rounds() {
    let mut s = session(ten());
    for (i, letter) in ["A", "A", "A", "B"].iter().enumerate() {
      s.jump_to(i);
      s.submit(pick(letter)).unwrap();
    }
    assert_eq!(s.score_percentage(), 75);

    let mut s = session(ten());
    for (i, letter) in ["A", "B", "B"].iter().enumerate() {
      s.jump_to(i);
      s.submit(pick(letter)).unwrap();
    }
    assert_eq!(s.score_percentage(), 33);

    let mut s = session(ten());
    s.jump_to(0);
    s.submit(pick("A")).unwrap();
    s.jump_to(1);
    s.submit(pick("B")).unwrap();
    assert_eq!(s.score_percentage(), 50);
  }

  #[test]
  fn score_matches_correct_first_attempts() {
    let mut s = session(ten());
    for i in 0..10 {
      s.jump_to(i);
      let letter = if i % 3 == 0 { "A" } else { "C" };
      s.submit(pick(letter)).unwrap();
      s.submit(pick("A")).unwrap();
    }
    let correct = s.ordered_ids().iter().filter(|id| s.first_attempt(**id).is_some_and(|a| a.is_correct)).count();
    assert_eq!(s.score(), correct);
    assert_eq!(s.score(), 4);
  }

  #[test]
  fn shuffle_is_a_permutation_and_resets_progress() {
    let mut s = session(ten());
    s.submit(pick("A")).unwrap();
    s.jump_to(5);
    s.toggle_bookmark();
    let mut rng = StdRng::seed_from_u64(7);
    s.shuffle(&mut rng);

    let mut ids = s.ordered_ids();
    ids.sort_unstable();
    assert_eq!(ids, (1..=10).collect::<Vec<_>>());
    assert_eq!(s.current_index(), 0);
    assert_eq!(s.attempts(), 0);
    assert_eq!(s.score(), 0);
    assert!(s.is_bookmarked(6));
  }

  #[test]
  fn shuffle_is_uniform_over_many_trials() {
    let qs = (1..=3).map(|id| single(id, "q", "A")).collect();
    let repo = Arc::new(Repository::from_questions(None, None, qs).unwrap());
    let mut s = session(repo);
    let mut rng = StdRng::seed_from_u64(0x5eed);
    let mut counts: HashMap<Vec<u32>, usize> = HashMap::new();
    let trials = 60_000;
    for _ in 0..trials {
      s.shuffle(&mut rng);
      *counts.entry(s.ordered_ids()).or_insert(0) += 1;
    }
    assert_eq!(counts.len(), 6);
    let expected = trials as f64 / 6.0;
    // Chi-square with 5 degrees of freedom; 20.5 is roughly p = 0.001.
    let chi2: f64 = counts.values().map(|c| (*c as f64 - expected).powi(2) / expected).sum();
    assert!(chi2 < 20.5, "chi2 = {chi2}, counts = {counts:?}");
  }

  #[test]
  fn filter_keeps_relative_order_and_history() {
    let mut s = session(ten());
    s.jump_to(2);
    s.submit(pick("A")).unwrap();
    s.jump_to(7);
    s.submit(pick("B")).unwrap();
    s.jump_to(5);

    assert_eq!(s.filter("storage"), Some(2));
    assert_eq!(s.ordered_ids(), vec![3, 8]);
    assert_eq!(s.current_index(), 0);
    assert!(s.first_attempt(3).unwrap().is_correct);
    assert!(!s.first_attempt(8).unwrap().is_correct);
    assert_eq!(s.score(), 1);
  }

  #[test]
  fn filter_matches_option_text_and_ignores_blank_queries() {
    let mut s = session(ten());
    s.jump_to(4);
    assert_eq!(s.filter("   "), None);
    assert_eq!(s.current_index(), 4);
    assert_eq!(s.len(), 10);

    // every question has "choice A" as an option
    assert_eq!(s.filter("CHOICE a"), Some(10));
  }

  #[test]
  fn filter_uses_document_order_after_shuffle() {
    let mut s = session(ten());
    s.shuffle(&mut StdRng::seed_from_u64(3));
    s.filter("storage");
    assert_eq!(s.ordered_ids(), vec![3, 8]);
    s.clear_filter();
    assert_eq!(s.ordered_ids(), (1..=10).collect::<Vec<_>>());
  }

  #[test]
  fn empty_filter_result_has_no_current_question() {
    let mut s = session(ten());
    assert_eq!(s.filter("kubernetes"), Some(0));
    assert!(s.current().is_none());
    assert!(!s.advance(Direction::Forward));
    assert!(!s.jump_to(0));
    assert_eq!(s.toggle_bookmark(), None);
    assert_eq!(s.submit(pick("A")).unwrap_err(), SubmitError::NoCurrentQuestion);
    assert_eq!(s.find_next("general"), None);
  }

  #[test]
  fn find_next_wraps_and_skips_current() {
    let mut s = session(ten());
    s.jump_to(9);
    assert_eq!(s.find_next("question number 1"), Some(0));
    assert_eq!(s.current_index(), 0);

    // q10's text contains "number 1" as well
    assert_eq!(s.find_next("question number 1"), Some(9));
    assert_eq!(s.find_next("question number 1"), Some(0));
  }

  #[test]
  fn find_next_miss_leaves_index() {
    let mut s = session(ten());
    s.jump_to(3);
    assert_eq!(s.find_next("kubernetes"), None);
    assert_eq!(s.current_index(), 3);
    // current question alone matching counts as a miss
    s.jump_to(2);
    assert_eq!(s.find_next("cheapest"), None);
    assert_eq!(s.current_index(), 2);
  }

  #[test]
  fn find_next_ignores_option_text() {
    let mut s = session(ten());
    assert_eq!(s.find_next("choice"), None);
  }

  #[test]
  fn advance_stops_at_boundaries() {
    let mut s = session(ten());
    assert!(!s.advance(Direction::Backward));
    assert!(s.advance(Direction::Forward));
    assert_eq!(s.current_index(), 1);
    s.jump_to(9);
    assert!(!s.advance(Direction::Forward));
    assert_eq!(s.current_index(), 9);
    assert!(s.advance(Direction::Backward));
    assert_eq!(s.current_index(), 8);
  }

  #[test]
  fn jump_out_of_range_is_a_no_op() {
    let mut s = session(ten());
    s.jump_to(4);
    assert!(!s.jump_to(10));
    assert_eq!(s.current_index(), 4);
  }

  #[test]
  fn bookmarks_toggle_current_question() {
    let mut s = session(ten());
    s.jump_to(2);
    assert_eq!(s.toggle_bookmark(), Some(true));
    assert!(s.is_bookmarked(3));
    assert_eq!(s.toggle_bookmark(), Some(false));
    assert!(!s.is_bookmarked(3));
  }
}
