use std::future::Future;

use tokio::sync::mpsc;

use crate::api::ApiError;

/// The state of a mutation
#[derive(Debug, Clone)]
pub enum MutationState<T> {
  /// Nothing submitted yet
  Idle,
  /// Write in progress
  Loading,
  /// Write applied
  Success(T),
  /// Write rejected; nothing was applied
  Error(ApiError),
}

/// A single background write, polled from the event loop like a [`Query`].
///
/// [`Query`]: super::Query
pub struct Mutation<T> {
  state: MutationState<T>,
  receiver: Option<mpsc::UnboundedReceiver<Result<T, ApiError>>>,
}

impl<T: Send + 'static> Default for Mutation<T> {
  fn default() -> Self {
    Self::new()
  }
}

impl<T: Send + 'static> Mutation<T> {
  pub fn new() -> Self {
    Self {
      state: MutationState::Idle,
      receiver: None,
    }
  }

  pub fn state(&self) -> &MutationState<T> {
    &self.state
  }

  pub fn is_loading(&self) -> bool {
    matches!(self.state, MutationState::Loading)
  }

  pub fn error(&self) -> Option<&ApiError> {
    match &self.state {
      MutationState::Error(e) => Some(e),
      _ => None,
    }
  }

  /// Run `write` in the background.
  ///
  /// Ignored while a previous write is still running.
  pub fn mutate<Fut>(&mut self, write: Fut)
  where
    Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
  {
    if self.is_loading() {
      return;
    }

    let (tx, rx) = mpsc::unbounded_channel();
    self.receiver = Some(rx);
    self.state = MutationState::Loading;

    tokio::spawn(async move {
      let result = write.await;
      // Ignore send errors - receiver may have been dropped
      let _ = tx.send(result);
    });
  }

  /// Poll for the result of a pending write.
  ///
  /// Returns `true` if the state changed.
  pub fn poll(&mut self) -> bool {
    let receiver = match &mut self.receiver {
      Some(rx) => rx,
      None => return false,
    };

    match receiver.try_recv() {
      Ok(Ok(value)) => {
        self.state = MutationState::Success(value);
        self.receiver = None;
        true
      }
      Ok(Err(error)) => {
        self.state = MutationState::Error(error);
        self.receiver = None;
        true
      }
      Err(mpsc::error::TryRecvError::Empty) => false,
      Err(mpsc::error::TryRecvError::Disconnected) => {
        self.state = MutationState::Error(ApiError::Network("write was cancelled".to_string()));
        self.receiver = None;
        true
      }
    }
  }

  /// Forget the last outcome
  pub fn reset(&mut self) {
    self.state = MutationState::Idle;
    self.receiver = None;
  }
}
