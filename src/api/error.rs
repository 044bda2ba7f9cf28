use thiserror::Error;

/// Errors surfaced by the notes API.
///
/// `Clone` because a single failed load fans out to every observer of a cache
/// entry.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
  /// Transport failure, no response received
  #[error("network error: {0}")]
  Network(String),

  /// The server answered 404
  #[error("not found: {0}")]
  NotFound(String),

  /// Any other non-2xx response
  #[error("server returned HTTP {status}")]
  Status { status: u16 },

  /// A 2xx response whose body did not match the expected shape
  #[error("failed to decode response: {0}")]
  Decode(String),
}

impl ApiError {
  /// HTTP status carried by this error, if the server answered at all.
  pub fn status(&self) -> Option<u16> {
    match self {
      Self::NotFound(_) => Some(404),
      Self::Status { status } => Some(*status),
      Self::Network(_) | Self::Decode(_) => None,
    }
  }

  pub fn is_not_found(&self) -> bool {
    matches!(self, Self::NotFound(_))
  }
}

impl From<reqwest::Error> for ApiError {
  fn from(err: reqwest::Error) -> Self {
    if err.is_decode() {
      Self::Decode(err.to_string())
    } else {
      Self::Network(err.to_string())
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_status_of_not_found() {
    let err = ApiError::NotFound("/notes/7".to_string());
    assert_eq!(err.status(), Some(404));
    assert!(err.is_not_found());
  }

  #[test]
  fn test_status_of_transport_errors() {
    assert_eq!(ApiError::Network("refused".to_string()).status(), None);
    assert_eq!(ApiError::Decode("eof".to_string()).status(), None);
    assert_eq!(ApiError::Status { status: 500 }.status(), Some(500));
  }

  #[test]
  fn test_display() {
    assert_eq!(
      ApiError::Status { status: 502 }.to_string(),
      "server returned HTTP 502"
    );
  }
}
