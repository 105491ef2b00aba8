use super::{Chunks, ChunksError};

#[derive(Debug, PartialEq, Eq)]
pub enum Error {
    ChunksError(ChunksError),
    InvalidPayload,
}

/// A type for reading server-sent events from a chunk stream.
///
/// Bytes are buffered raw and only complete events are decoded, so a
/// multi-byte character may be split across chunks.
pub struct Sse {
    buf: Vec<u8>,
    // A CR at the end of the last chunk, waiting to see if LF follows.
    pending_cr: bool,
    chunks: Chunks,
}

impl Sse {
    #[inline]
    pub fn new(chunks: Chunks) -> Self {
        Self {
            buf: Vec::new(),
            pending_cr: false,
            chunks,
        }
    }

    /// Returns the `data` of the next event, or `None` when the stream
    /// has ended.
    pub async fn next_event(&mut self) -> Result<Option<String>, Error> {
        loop {
            // Drain complete events already buffered before reading more.
            if let Some(event) = self.try_parse_event()? {
                return Ok(Some(event));
            }

            let Some(bytes) =
                self.chunks.next_chunk().await.map_err(Error::ChunksError)?
            else {
                // A trailing partial event is dropped.
                return Ok(None);
            };
            self.push_chunk(&bytes);
        }
    }

    // CRLF is normalized to LF, even when split across chunks.
    fn push_chunk(&mut self, bytes: &[u8]) {
        self.buf.reserve(bytes.len());
        for &byte in bytes {
            if self.pending_cr {
                self.pending_cr = false;
                if byte != b'\n' {
                    self.buf.push(b'\r');
                }
            }
            if byte == b'\r' {
                self.pending_cr = true;
            } else {
                self.buf.push(byte);
            }
        }
    }

    fn try_parse_event(&mut self) -> Result<Option<String>, Error> {
        // event         = *( comment / field ) end-of-line
        // comment       = colon *any-char end-of-line
        // field         = 1*name-char [ colon [ space ] *any-char ] end-of-line
        while let Some(eol_idx) =
            self.buf.windows(2).position(|w| w == b"\n\n")
        {
            let block: Vec<u8> = self.buf.drain(..eol_idx + 2).collect();
            let Ok(block) = str::from_utf8(&block[..eol_idx]) else {
                return Err(Error::InvalidPayload);
            };

            let mut data: Option<String> = None;
            for line in block.lines() {
                if line.is_empty() || line.starts_with(':') {
                    continue;
                }
                let (name, value) = line.split_once(':').unwrap_or((line, ""));
                let value = value.strip_prefix(' ').unwrap_or(value);
                if name != "data" {
                    // `event`, `id`, `retry` and unknown fields carry
                    // nothing for us.
                    continue;
                }
                match &mut data {
                    Some(data) => {
                        data.push('\n');
                        data.push_str(value);
                    }
                    None => data = Some(value.to_owned()),
                }
            }

            if let Some(data) = data {
                return Ok(Some(data));
            }
            // Comment-only blocks (keep-alives) carry nothing.
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;

    #[tokio::test]
    async fn test_normal_events() {
        let chunks = Chunks::from_vec_deque(
            vec![
                Bytes::from_static(b"data: hello\n\n"),
                Bytes::from_static(b"data: bye\n\n"),
            ]
            .into(),
        );
        let mut sse = Sse::new(chunks);
        assert_eq!(sse.next_event().await.unwrap().unwrap(), "hello");
        assert_eq!(sse.next_event().await.unwrap().unwrap(), "bye");
        assert_eq!(sse.next_event().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_quirk_streaming() {
        let chunks = Chunks::from_vec_deque(
            vec![
                Bytes::from_static(b"data:"),
                Bytes::from_static(b" hello\r\n"),
                Bytes::from_static(b"\r\n"),
            ]
            .into(),
        );
        let mut sse = Sse::new(chunks);
        assert_eq!(sse.next_event().await.unwrap().unwrap(), "hello");
        assert_eq!(sse.next_event().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_comments_and_batched_events() {
        let chunks = Chunks::from_vec_deque(
            vec![Bytes::from_static(
                b": keep-alive\n\nevent: message\ndata: a\n\ndata: b\n\ndata:\ndata: c\n\n",
            )]
            .into(),
        );
        let mut sse = Sse::new(chunks);
        assert_eq!(sse.next_event().await.unwrap().unwrap(), "a");
        assert_eq!(sse.next_event().await.unwrap().unwrap(), "b");
        assert_eq!(sse.next_event().await.unwrap().unwrap(), "\nc");
        assert_eq!(sse.next_event().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_invalid_data() {
        let chunks = Chunks::from_vec_deque(
            vec![Bytes::from_static(&[b'd', b'a', 0xff, b'\n', b'\n'])].into(),
        );
        let mut sse = Sse::new(chunks);
        assert_eq!(sse.next_event().await.unwrap_err(), Error::InvalidPayload);

        let chunks = Chunks::from_vec_deque(
            vec![Bytes::from_static(b"data: \xE4\xBD\n\n")].into(),
        );
        let mut sse = Sse::new(chunks);
        assert_eq!(sse.next_event().await.unwrap_err(), Error::InvalidPayload);
    }

    #[tokio::test]
    async fn test_character_split_across_chunks() {
        let chunks = Chunks::from_vec_deque(
            vec![
                Bytes::from_static(b"data: \xE4\xBD"),
                Bytes::from_static(b"\xA0\n\n"),
                Bytes::from_static(b"data: \xE5"),
                Bytes::from_static(b"\xA5"),
                Bytes::from_static(b"\xBD\r"),
                Bytes::from_static(b"\n\r\n"),
            ]
            .into(),
        );
        let mut sse = Sse::new(chunks);
        assert_eq!(sse.next_event().await.unwrap().unwrap(), "你");
        assert_eq!(sse.next_event().await.unwrap().unwrap(), "好");
        assert_eq!(sse.next_event().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_unknown_fields_ignored() {
        let chunks = Chunks::from_vec_deque(
            vec![Bytes::from_static(
                b"x-vendor: 1\ndata: a\nretry: 100\n\nbare-field\n\ndata: b\n\n",
            )]
            .into(),
        );
        let mut sse = Sse::new(chunks);
        assert_eq!(sse.next_event().await.unwrap().unwrap(), "a");
        assert_eq!(sse.next_event().await.unwrap().unwrap(), "b");
        assert_eq!(sse.next_event().await.unwrap(), None);

        let chunks = Chunks::from_vec_deque(
            vec![Bytes::from_static(b"xxxxxx\n")].into(),
        );
        let mut sse = Sse::new(chunks);
        assert_eq!(sse.next_event().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_transport_error() {
        let chunks = Chunks::failing_after(
            vec![Bytes::from_static(b"data: hello\n\n")].into(),
        );
        let mut sse = Sse::new(chunks);
        assert_eq!(sse.next_event().await.unwrap().unwrap(), "hello");
        assert!(matches!(
            sse.next_event().await.unwrap_err(),
            Error::ChunksError(_)
        ));
    }
}
