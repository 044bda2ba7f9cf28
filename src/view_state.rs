//! Local "show only enabled notes" toggle for the notes list.

use crate::api::types::Note;

/// Which notes the list shows.
///
/// `EnabledOnly` holds the enabled notes as they were when the filter was
/// switched on. Later changes to the cached list do not reach it until the
/// filter is reset and switched on again.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum NotesFilter {
  #[default]
  All,
  EnabledOnly(Vec<Note>),
}

impl NotesFilter {
  /// Snapshot the enabled notes of `loaded`. No-op if already filtering.
  pub fn show_enabled_only(&mut self, loaded: &[Note]) {
    if let Self::All = self {
      *self = Self::EnabledOnly(loaded.iter().filter(|n| !n.is_disabled).cloned().collect());
    }
  }

  /// Drop the snapshot and go back to the live list
  pub fn reset(&mut self) {
    *self = Self::All;
  }

  pub fn is_enabled_only(&self) -> bool {
    matches!(self, Self::EnabledOnly(_))
  }

  /// Notes to display, given the live cached list
  pub fn visible<'a>(&'a self, live: &'a [Note]) -> &'a [Note] {
    match self {
      Self::All => live,
      Self::EnabledOnly(snapshot) => snapshot,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::fake::{note, FakeNotesApi};
  use crate::api::types::NewNote;
  use crate::api::NotesService;
  use crate::query::QueryCache;
  use std::sync::Arc;

  fn seeded() -> Vec<Note> {
    vec![note(1, "A", "aa", false), note(2, "B", "bb", true)]
  }

  #[test]
  fn test_enabled_only_then_reset() {
    let live = seeded();
    let mut filter = NotesFilter::default();
    assert_eq!(filter.visible(&live), live.as_slice());

    filter.show_enabled_only(&live);
    assert!(filter.is_enabled_only());
    assert_eq!(filter.visible(&live), &[note(1, "A", "aa", false)]);

    filter.reset();
    assert!(!filter.is_enabled_only());
    assert_eq!(filter.visible(&live), live.as_slice());
  }

  #[test]
  fn test_snapshot_ignores_later_changes() {
    let mut live = seeded();
    let mut filter = NotesFilter::default();
    filter.show_enabled_only(&live);

    live[1].is_disabled = false;
    live.push(note(3, "C", "cc", false));
    assert_eq!(filter.visible(&live).len(), 1);

    // Switching on again while active keeps the old snapshot
    filter.show_enabled_only(&live);
    assert_eq!(filter.visible(&live).len(), 1);

    filter.reset();
    filter.show_enabled_only(&live);
    assert_eq!(filter.visible(&live).len(), 3);
  }

  #[test]
  fn test_empty_list() {
    let mut filter = NotesFilter::default();
    filter.show_enabled_only(&[]);
    assert!(filter.visible(&seeded()).is_empty());
  }

  #[tokio::test]
  async fn test_new_note_appears_only_after_retoggle() {
    let service = NotesService::new(
      Arc::new(FakeNotesApi::with_notes(seeded())),
      QueryCache::default(),
    );
    let mut filter = NotesFilter::default();

    let live = service.queries.notes(None).await.unwrap();
    filter.show_enabled_only(&live);

    let created = service
      .mutations
      .create_note(NewNote {
        title: "New".to_string(),
        content: "hello".to_string(),
      })
      .await
      .unwrap()
      .note;

    let live = service.queries.notes(None).await.unwrap();
    assert!(live.contains(&created));
    assert!(!filter.visible(&live).contains(&created));

    filter.reset();
    filter.show_enabled_only(&live);
    assert!(filter.visible(&live).contains(&created));
  }
}
