use serde::{Deserialize, Serialize};

/// A note as stored by the server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
  pub id: u64,
  pub title: String,
  pub content: String,
  #[serde(default)]
  pub is_disabled: bool,
}

/// Payload for creating a note; the server assigns the id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewNote {
  pub title: String,
  pub content: String,
}

/// Response body of `POST /notes`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedNote {
  pub note: Note,
}

/// Partial note body for `PATCH /notes/:id`. Absent fields are left alone by
/// the server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotePatch {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub title: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub content: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub is_disabled: Option<bool>,
}

impl NotePatch {
  pub fn disabled(is_disabled: bool) -> Self {
    Self {
      is_disabled: Some(is_disabled),
      ..Self::default()
    }
  }
}

impl From<&Note> for NotePatch {
  fn from(note: &Note) -> Self {
    Self {
      title: Some(note.title.clone()),
      content: Some(note.content.clone()),
      is_disabled: Some(note.is_disabled),
    }
  }
}

/// Read-only reference entry, fetched page-wise
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Skill {
  pub id: u64,
  pub name: String,
  pub value: String,
}

/// One page of the skills listing. Pages are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SkillPage {
  pub page: u32,
  pub limit: u32,
}

impl SkillPage {
  pub fn new(page: u32, limit: u32) -> Self {
    Self {
      page: page.max(1),
      limit: limit.max(1),
    }
  }

  pub fn next(self) -> Self {
    Self::new(self.page.saturating_add(1), self.limit)
  }

  pub fn previous(self) -> Self {
    Self::new(self.page.saturating_sub(1), self.limit)
  }
}
