#[cfg(test)]
use std::collections::VecDeque;

use bytes::Bytes;
use reqwest::Response;

/// The body could not be read any further.
#[derive(Debug, PartialEq, Eq)]
pub struct Error(pub String);

/// A source of body chunks, in arrival order.
pub enum Chunks {
    Http(Response),
    /// In-memory chunks, optionally ending with a read failure instead of
    /// the end of the body.
    #[cfg(test)]
    Scripted {
        chunks: VecDeque<Bytes>,
        then_fail: bool,
    },
}

impl Chunks {
    pub fn from_response(response: Response) -> Self {
        Chunks::Http(response)
    }

    #[cfg(test)]
    pub fn from_vec_deque(chunks: VecDeque<Bytes>) -> Self {
        Chunks::Scripted {
            chunks,
            then_fail: false,
        }
    }

    #[cfg(test)]
    pub fn failing_after(chunks: VecDeque<Bytes>) -> Self {
        Chunks::Scripted {
            chunks,
            then_fail: true,
        }
    }

    /// Returns the next chunk, or `None` at the end of the body.
    #[inline]
    pub async fn next_chunk(&mut self) -> Result<Option<Bytes>, Error> {
        match self {
            Chunks::Http(response) => {
                response.chunk().await.map_err(|err| Error(err.to_string()))
            }
            #[cfg(test)]
            Chunks::Scripted { chunks, then_fail } => {
                match (chunks.pop_front(), *then_fail) {
                    (None, true) => Err(Error("connection reset".to_owned())),
                    (chunk, _) => Ok(chunk),
                }
            }
        }
    }
}
