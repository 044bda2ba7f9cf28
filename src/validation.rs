//! Client-side checks on the note form, applied before anything is sent.

use std::fmt;

use thiserror::Error;

use crate::api::types::NewNote;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
  Title,
  Content,
}

impl fmt::Display for Field {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Field::Title => write!(f, "Title"),
      Field::Content => write!(f, "Content"),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
  #[error("{0} is required")]
  Required(Field),
  #[error("{field} must be at least {min} characters long")]
  TooShort { field: Field, min: usize },
  #[error("{field} must be at most {max} characters long")]
  TooLong { field: Field, max: usize },
}

impl ValidationError {
  pub fn field(&self) -> Field {
    match self {
      Self::Required(field) | Self::TooShort { field, .. } | Self::TooLong { field, .. } => *field,
    }
  }
}

const TITLE_LEN: (usize, usize) = (3, 50);
const CONTENT_LEN: (usize, usize) = (3, 100);

/// Trim and check both fields, collecting every failure.
pub fn validate_note(title: &str, content: &str) -> Result<NewNote, Vec<ValidationError>> {
  let title = title.trim();
  let content = content.trim();

  let errors: Vec<ValidationError> = [
    check(Field::Title, title, TITLE_LEN),
    check(Field::Content, content, CONTENT_LEN),
  ]
  .into_iter()
  .flatten()
  .collect();

  if !errors.is_empty() {
    return Err(errors);
  }

  Ok(NewNote {
    title: title.to_string(),
    content: content.to_string(),
  })
}

fn check(field: Field, value: &str, (min, max): (usize, usize)) -> Option<ValidationError> {
  let len = value.chars().count();
  if len == 0 {
    Some(ValidationError::Required(field))
  } else if len < min {
    Some(ValidationError::TooShort { field, min })
  } else if len > max {
    Some(ValidationError::TooLong { field, max })
  } else {
    None
  }
}
