//! Core behaviors shared by the WebSocket loop and HTTP handlers.
//!
//! `handle_client_message` is the single place where page events turn into
//! session calls; every branch answers with exactly one server message.

use rand::Rng;
use tracing::{debug, instrument};

use crate::presentation::{build_view, decode_key, decode_swipe, submit_out, Action};
use crate::protocol::{BookmarksOut, ClientWsMessage, ServerWsMessage, SummaryOut};
use crate::session::{Direction, Session};
use crate::state::AppState;

/// Presentation knobs a session loop needs.
#[derive(Clone, Copy, Debug)]
pub struct ViewSettings {
  pub swipe_threshold_px: f64,
  pub jump_block: usize,
}

#[instrument(level = "debug", skip(session, rng, settings))]
pub fn handle_client_message<R: Rng + ?Sized>(
  session: &mut Session,
  msg: ClientWsMessage,
  settings: ViewSettings,
  rng: &mut R,
) -> ServerWsMessage {
  match msg {
    ClientWsMessage::Ping => ServerWsMessage::Pong,
    ClientWsMessage::View => view(session, settings),

    ClientWsMessage::Key { key, in_search } => {
      if let Some(action) = decode_key(&key, in_search) {
        apply_action(session, action, rng);
      }
      view(session, settings)
    }

    ClientWsMessage::Swipe { dx, dy } => {
      if let Some(action) = decode_swipe(dx, dy, settings.swipe_threshold_px) {
        apply_action(session, action, rng);
      }
      view(session, settings)
    }

    ClientWsMessage::Next => {
      apply_action(session, Action::Advance(Direction::Forward), rng);
      view(session, settings)
    }
    ClientWsMessage::Prev => {
      apply_action(session, Action::Advance(Direction::Backward), rng);
      view(session, settings)
    }
    ClientWsMessage::Shuffle => {
      apply_action(session, Action::Shuffle, rng);
      view(session, settings)
    }
    ClientWsMessage::ToggleBookmark => {
      apply_action(session, Action::ToggleBookmark, rng);
      view(session, settings)
    }

    ClientWsMessage::Search { query } => {
      if query.trim().is_empty() {
        session.clear_filter();
      } else {
        session.filter(&query);
      }
      view(session, settings)
    }
    ClientWsMessage::ClearSearch => {
      session.clear_filter();
      view(session, settings)
    }

    ClientWsMessage::FindNext { query } => match session.find_next(&query) {
      Some(_) => view(session, settings),
      None => {
        debug!(target: "session", %query, "Search miss");
        ServerWsMessage::NotFound { query }
      }
    },

    ClientWsMessage::JumpTo { index } => {
      session.jump_to(index);
      view(session, settings)
    }

    ClientWsMessage::Submit { answer } => match session.submit(answer) {
      Ok(submission) => ServerWsMessage::SubmitResult {
        result: submit_out(session, &submission),
        view: build_view(session, settings.jump_block),
      },
      Err(e) => ServerWsMessage::Notice { message: e.to_string() },
    },
  }
}

fn view(session: &Session, settings: ViewSettings) -> ServerWsMessage {
  ServerWsMessage::View { view: build_view(session, settings.jump_block) }
}

fn apply_action<R: Rng + ?Sized>(session: &mut Session, action: Action, rng: &mut R) {
  match action {
    Action::Advance(direction) => {
      session.advance(direction);
    }
    Action::Shuffle => session.shuffle(rng),
    Action::ToggleBookmark => {
      session.toggle_bookmark();
    }
  }
}

/// Repository overview, or the load error when there is no repository.
pub fn summary(state: &AppState) -> SummaryOut {
  match state.repository() {
    Ok(repo) => SummaryOut {
      loaded: true,
      title: repo.title().map(str::to_string),
      total_questions: repo.len(),
      declared_total: repo.declared_total(),
      by_type: repo.counts_by_type(),
      error: None,
    },
    Err(message) => SummaryOut {
      loaded: false,
      title: None,
      total_questions: 0,
      declared_total: None,
      by_type: Default::default(),
      error: Some(message.to_string()),
    },
  }
}

pub fn bookmarks(state: &AppState) -> BookmarksOut {
  let b = state.load_bookmarks();
  BookmarksOut { key: state.config.bookmark_key.clone(), ids: b.ids() }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::evaluator::UserAnswer;
  use crate::session::tests::{session, ten};
  use rand::{rngs::StdRng, SeedableRng};

  const SETTINGS: ViewSettings = ViewSettings { swipe_threshold_px: 50.0, jump_block: 50 };

  fn send(s: &mut Session, msg: ClientWsMessage) -> ServerWsMessage {
    handle_client_message(s, msg, SETTINGS, &mut StdRng::seed_from_u64(1))
  }

  fn position(m: &ServerWsMessage) -> usize {
    match m {
      ServerWsMessage::View { view } | ServerWsMessage::SubmitResult { view, .. } => view.position,
      other => panic!("expected a view, got {other:?}"),
    }
  }

  #[test]
  fn keys_and_swipes_navigate() {
    let mut s = session(ten());
    assert_eq!(position(&send(&mut s, ClientWsMessage::Key { key: "ArrowRight".into(), in_search: false })), 2);
    assert_eq!(position(&send(&mut s, ClientWsMessage::Key { key: "ArrowRight".into(), in_search: true })), 2);
    assert_eq!(position(&send(&mut s, ClientWsMessage::Swipe { dx: -120.0, dy: 0.0 })), 3);
    assert_eq!(position(&send(&mut s, ClientWsMessage::Swipe { dx: 20.0, dy: 0.0 })), 3);
    assert_eq!(position(&send(&mut s, ClientWsMessage::Prev)), 2);
  }

  #[test]
  fn bookmark_key_toggles() {
    let mut s = session(ten());
    send(&mut s, ClientWsMessage::Key { key: "b".into(), in_search: false });
    assert!(s.is_bookmarked(1));
  }

  #[test]
  fn shuffle_key_resets_score() {
    let mut s = session(ten());
    send(&mut s, ClientWsMessage::Submit { answer: UserAnswer::Single("A".into()) });
    assert_eq!(s.score(), 1);
    send(&mut s, ClientWsMessage::Key { key: "S".into(), in_search: false });
    assert_eq!(s.score(), 0);
    assert_eq!(s.current_index(), 0);
  }

  #[test]
  fn search_then_clear() {
    let mut s = session(ten());
    match send(&mut s, ClientWsMessage::Search { query: "storage".into() }) {
      ServerWsMessage::View { view } => assert_eq!(view.total, 2),
      other => panic!("unexpected {other:?}"),
    }
    match send(&mut s, ClientWsMessage::Search { query: "  ".into() }) {
      ServerWsMessage::View { view } => assert_eq!(view.total, 10),
      other => panic!("unexpected {other:?}"),
    }
  }

  #[test]
  fn find_next_miss_is_reported() {
    let mut s = session(ten());
    match send(&mut s, ClientWsMessage::FindNext { query: "nope".into() }) {
      ServerWsMessage::NotFound { query } => assert_eq!(query, "nope"),
      other => panic!("unexpected {other:?}"),
    }
  }

  #[test]
  fn incomplete_submit_is_a_notice() {
    let mut s = session(ten());
    match send(&mut s, ClientWsMessage::Submit { answer: UserAnswer::Single(String::new()) }) {
      ServerWsMessage::Notice { message } => assert_eq!(message, "select at least one option"),
      other => panic!("unexpected {other:?}"),
    }
    assert_eq!(s.attempts(), 0);
  }

  #[test]
  fn submit_returns_result_and_view() {
    let mut s = session(ten());
    match send(&mut s, ClientWsMessage::Submit { answer: UserAnswer::Single("A".into()) }) {
      ServerWsMessage::SubmitResult { result, view } => {
        assert!(result.correct);
        assert_eq!(result.feedback, "✓ Correct!");
        assert_eq!(view.score_percent, 100);
      }
      other => panic!("unexpected {other:?}"),
    }
  }

  #[test]
  fn client_messages_parse_from_json() {
    let m: ClientWsMessage = serde_json::from_str(r#"{"type":"jump_to","index":50}"#).unwrap();
    assert!(matches!(m, ClientWsMessage::JumpTo { index: 50 }));
    let m: ClientWsMessage =
      serde_json::from_str(r#"{"type":"submit","answer":{"kind":"multi","value":["A","C"]}}"#).unwrap();
    assert!(matches!(m, ClientWsMessage::Submit { answer: UserAnswer::Multi(_) }));
    let m: ClientWsMessage = serde_json::from_str(r#"{"type":"key","key":"b"}"#).unwrap();
    assert!(matches!(m, ClientWsMessage::Key { in_search: false, .. }));
  }
}
