//! Incremental delivery of a streamed answer.
//!
//! [`channel`] creates a connected [`StreamWriter`] and [`StreamHandle`].
//! The writer is the only producer: it appends text fragments and finally
//! moves the stream into a terminal state. Any number of readers (clones of
//! the handle) can poll a snapshot or await fragments one by one, each with
//! its own read position.
//!
//! ```text
//!        append()          close(None)
//! Open ───────────▶ Open ─────────────▶ Done
//!                     │
//!                     └───────────────▶ Failed(err)
//!                      close(Some(err))
//! ```
//!
//! Terminal states absorb: once a stream is `Done` or `Failed`, further
//! appends are rejected and further closes are ignored.

use std::error::Error as StdError;
use std::fmt::{self, Display};

use chatbridge_model::ErrorKind;
use tokio::sync::watch;

use crate::error::BackendError;

/// The lifecycle state of a stream.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum StreamState {
    /// The producer may still append fragments.
    #[default]
    Open,
    /// The producer finished successfully.
    Done,
    /// The producer finished with an error.
    Failed(BackendError),
}

impl StreamState {
    /// Whether the state is `Done` or `Failed`.
    #[inline]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, StreamState::Open)
    }
}

/// Returned when appending to a stream that is already closed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StreamClosedError;

impl Display for StreamClosedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "the stream is already closed")
    }
}

impl StdError for StreamClosedError {}

#[derive(Default)]
struct Shared {
    fragments: Vec<String>,
    state: StreamState,
}

/// Creates a new open stream.
pub fn channel() -> (StreamWriter, StreamHandle) {
    let (tx, rx) = watch::channel(Shared::default());
    let writer = StreamWriter { tx };
    let handle = StreamHandle {
        rx,
        cursor: 0,
        terminal_seen: false,
    };
    (writer, handle)
}

/// The producing side of a stream.
///
/// Dropping a writer that is still open closes the stream as failed, so
/// readers never wait forever.
pub struct StreamWriter {
    tx: watch::Sender<Shared>,
}

impl StreamWriter {
    /// Appends a fragment to the stream.
    ///
    /// Empty fragments are ignored.
    pub fn append(&self, fragment: &str) -> Result<(), StreamClosedError> {
        let mut result = Ok(());
        self.tx.send_if_modified(|shared| {
            if shared.state.is_terminal() {
                result = Err(StreamClosedError);
                return false;
            }
            if fragment.is_empty() {
                return false;
            }
            shared.fragments.push(fragment.to_owned());
            true
        });
        result
    }

    /// Moves the stream into `Done` (no error) or `Failed`.
    ///
    /// Returns `false` if the stream was already closed, in which case
    /// the state is left untouched.
    pub fn close(&self, error: Option<BackendError>) -> bool {
        self.tx.send_if_modified(|shared| {
            if shared.state.is_terminal() {
                return false;
            }
            shared.state = match error {
                Some(err) => StreamState::Failed(err),
                None => StreamState::Done,
            };
            true
        })
    }

    /// Whether the stream reached a terminal state.
    #[inline]
    pub fn is_closed(&self) -> bool {
        self.tx.borrow().state.is_terminal()
    }
}

impl Drop for StreamWriter {
    fn drop(&mut self) {
        if self.is_closed() {
            return;
        }
        warn!("stream producer dropped while the stream is still open");
        self.close(Some(BackendError::new(
            ErrorKind::Other,
            "stream producer dropped",
        )));
    }
}

impl fmt::Debug for StreamWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shared = self.tx.borrow();
        f.debug_struct("StreamWriter")
            .field("fragments", &shared.fragments.len())
            .field("state", &shared.state)
            .finish()
    }
}

/// A point-in-time view of a stream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StreamSnapshot {
    /// Fragments appended so far, in emission order.
    pub fragments: Vec<String>,
    /// The state at the time of the snapshot.
    pub state: StreamState,
}

impl StreamSnapshot {
    /// Concatenation of the fragments.
    #[inline]
    pub fn content(&self) -> String {
        self.fragments.concat()
    }
}

/// The consuming side of a stream.
///
/// Cloning a handle yields an independent reader that starts at the same
/// position as the original. Dropping every handle does not affect the
/// producer.
#[derive(Clone)]
pub struct StreamHandle {
    rx: watch::Receiver<Shared>,
    cursor: usize,
    terminal_seen: bool,
}

enum Step {
    Ready(Option<Result<String, BackendError>>),
    Pending,
}

impl StreamHandle {
    /// Returns everything received so far along with the current state.
    ///
    /// This never blocks and doesn't move the read position.
    pub fn snapshot(&self) -> StreamSnapshot {
        let shared = self.rx.borrow();
        StreamSnapshot {
            fragments: shared.fragments.clone(),
            state: shared.state.clone(),
        }
    }

    /// Returns the text received so far.
    #[inline]
    pub fn content(&self) -> String {
        self.rx.borrow().fragments.concat()
    }

    /// Returns the current state.
    #[inline]
    pub fn state(&self) -> StreamState {
        self.rx.borrow().state.clone()
    }

    /// Waits for the next fragment.
    ///
    /// Fragments are yielded in emission order. After the last fragment,
    /// a failed stream yields its error once, and then `None` is returned
    /// for good.
    ///
    /// # Cancel safety
    ///
    /// This method is cancel safe: no fragment is lost if the future is
    /// dropped before it completes.
    pub async fn next_fragment(
        &mut self,
    ) -> Option<Result<String, BackendError>> {
        loop {
            if let Step::Ready(item) = self.step() {
                return item;
            }
            if self.rx.changed().await.is_err() {
                // The writer is gone. Its drop handler has already left a
                // terminal state behind, which the next step observes.
                if let Step::Ready(item) = self.step() {
                    return item;
                }
                return None;
            }
        }
    }

    fn step(&mut self) -> Step {
        let shared = self.rx.borrow_and_update();
        if let Some(fragment) = shared.fragments.get(self.cursor) {
            self.cursor += 1;
            return Step::Ready(Some(Ok(fragment.clone())));
        }
        match &shared.state {
            StreamState::Open => Step::Pending,
            StreamState::Done => Step::Ready(None),
            StreamState::Failed(_) if self.terminal_seen => Step::Ready(None),
            StreamState::Failed(err) => {
                self.terminal_seen = true;
                Step::Ready(Some(Err(err.clone())))
            }
        }
    }

    /// Waits until the stream is closed, returning the full content on
    /// success.
    ///
    /// The content always covers every fragment, regardless of how many
    /// have already been read through [`next_fragment`].
    ///
    /// [`next_fragment`]: StreamHandle::next_fragment
    pub async fn wait(mut self) -> Result<String, BackendError> {
        // An error means the writer is gone, and the final value is still
        // readable below.
        let _ = self.rx.wait_for(|shared| shared.state.is_terminal()).await;
        let shared = self.rx.borrow();
        match &shared.state {
            StreamState::Done => Ok(shared.fragments.concat()),
            StreamState::Failed(err) => Err(err.clone()),
            StreamState::Open => Err(BackendError::new(
                ErrorKind::Other,
                "stream producer dropped",
            )),
        }
    }
}

impl fmt::Debug for StreamHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shared = self.rx.borrow();
        f.debug_struct("StreamHandle")
            .field("cursor", &self.cursor)
            .field("fragments", &shared.fragments.len())
            .field("state", &shared.state)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn some_error() -> BackendError {
        BackendError::new(ErrorKind::Other, "connection reset")
    }

    #[tokio::test]
    async fn test_accumulation() {
        let (writer, mut handle) = channel();
        let reader = handle.clone();

        tokio::spawn(async move {
            for fragment in ["Hel", "lo, ", "world"] {
                tokio::time::sleep(Duration::from_millis(1)).await;
                writer.append(fragment).unwrap();
            }
            assert!(writer.close(None));
        });

        let mut fragments = vec![];
        while let Some(fragment) = handle.next_fragment().await {
            fragments.push(fragment.unwrap());
        }
        assert_eq!(fragments, ["Hel", "lo, ", "world"]);
        assert_eq!(handle.state(), StreamState::Done);

        assert_eq!(reader.wait().await.unwrap(), "Hello, world");
        assert_eq!(handle.content(), "Hello, world");
    }

    #[tokio::test]
    async fn test_failure_seen_by_late_reader() {
        let (writer, handle) = channel();
        writer.append("partial").unwrap();
        assert!(writer.close(Some(some_error())));
        drop(writer);

        let snapshot = handle.snapshot();
        assert_eq!(snapshot.content(), "partial");
        assert_eq!(snapshot.state, StreamState::Failed(some_error()));

        let mut late = handle.clone();
        assert_eq!(late.next_fragment().await, Some(Ok("partial".to_owned())));
        assert_eq!(late.next_fragment().await, Some(Err(some_error())));
        assert_eq!(late.next_fragment().await, None);

        assert_eq!(handle.wait().await.unwrap_err(), some_error());
    }

    #[tokio::test]
    async fn test_first_close_wins() {
        let (writer, handle) = channel();
        assert!(!writer.is_closed());
        assert!(writer.close(None));
        assert!(!writer.close(Some(some_error())));
        assert!(writer.is_closed());
        assert_eq!(writer.append("late"), Err(StreamClosedError));
        assert_eq!(handle.state(), StreamState::Done);
        assert!(handle.snapshot().fragments.is_empty());
    }

    #[tokio::test]
    async fn test_empty_fragments_ignored() {
        let (writer, handle) = channel();
        writer.append("").unwrap();
        writer.append("a").unwrap();
        writer.append("").unwrap();
        writer.close(None);
        assert_eq!(handle.snapshot().fragments, ["a"]);
    }

    #[tokio::test]
    async fn test_dropped_writer_fails_stream() {
        let (writer, mut handle) = channel();
        writer.append("half").unwrap();
        drop(writer);

        assert_eq!(handle.next_fragment().await, Some(Ok("half".to_owned())));
        let err = handle.next_fragment().await.unwrap().unwrap_err();
        assert_eq!(err.message(), "stream producer dropped");
        assert_eq!(handle.next_fragment().await, None);
    }

    #[tokio::test]
    async fn test_readers_have_own_cursor() {
        let (writer, mut first) = channel();
        writer.append("one").unwrap();
        let mut second = first.clone();
        assert_eq!(first.next_fragment().await, Some(Ok("one".to_owned())));

        writer.append("two").unwrap();
        writer.close(None);

        let mut third = first.clone();
        assert_eq!(first.next_fragment().await, Some(Ok("two".to_owned())));
        assert_eq!(first.next_fragment().await, None);
        assert_eq!(second.next_fragment().await, Some(Ok("one".to_owned())));
        assert_eq!(third.next_fragment().await, Some(Ok("two".to_owned())));
        assert_eq!(third.next_fragment().await, None);
    }
}
