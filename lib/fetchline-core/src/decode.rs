//! Incremental UTF-8 decoding of streamed bodies.
//!
//! Chunk boundaries do not respect character boundaries: a multi-byte sequence may
//! be split across two chunks. [`Utf8Decoder`] keeps the incomplete tail of a chunk
//! and completes it with the next one. Invalid sequences decode to U+FFFD.

use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::{Buf, Bytes, BytesMut};
use futures_core::Stream;

use crate::{Result, StreamingBody};

/// Append-only UTF-8 decoder for chunked input.
#[derive(Debug, Default)]
pub struct Utf8Decoder {
    pending: BytesMut,
}

impl Utf8Decoder {
    /// Create a decoder with no pending bytes.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode the next chunk.
    ///
    /// Returns the text completed by this chunk. A trailing incomplete sequence is
    /// retained until the next call.
    pub fn decode(&mut self, chunk: &[u8]) -> String {
        self.pending.extend_from_slice(chunk);

        let mut text = String::with_capacity(self.pending.len());
        loop {
            match std::str::from_utf8(&self.pending) {
                Ok(valid) => {
                    text.push_str(valid);
                    self.pending.clear();
                    break;
                }
                Err(err) => {
                    let valid_up_to = err.valid_up_to();
                    let valid = self.pending.split_to(valid_up_to);
                    // `valid_up_to` bytes are guaranteed to be valid UTF-8
                    text.push_str(&String::from_utf8_lossy(&valid));

                    match err.error_len() {
                        Some(invalid) => {
                            text.push(char::REPLACEMENT_CHARACTER);
                            self.pending.advance(invalid);
                        }
                        // Incomplete sequence at the end: wait for more input
                        None => break,
                    }
                }
            }
        }
        text
    }

    /// Returns `true` if an incomplete sequence is waiting for more input.
    #[must_use]
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Flush the decoder at end of input.
    ///
    /// An incomplete trailing sequence decodes to U+FFFD; returns `None` when nothing
    /// was pending.
    pub fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        self.pending.clear();
        Some(char::REPLACEMENT_CHARACTER.to_string())
    }
}

/// A body chunk together with the text it completed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChunk {
    /// Raw bytes as received.
    pub raw: Bytes,
    /// Text decoded from this chunk (plus any tail carried from the previous one).
    pub text: String,
}

/// Lazy, single-pass stream of [`TextChunk`]s over a streaming body.
///
/// Dropping the stream releases the underlying body.
pub struct TextStream {
    body: StreamingBody,
    decoder: Utf8Decoder,
}

impl std::fmt::Debug for TextStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextStream")
            .field("decoder", &self.decoder)
            .finish_non_exhaustive()
    }
}

impl TextStream {
    /// Wrap a streaming body.
    #[must_use]
    pub fn new(body: StreamingBody) -> Self {
        Self {
            body,
            decoder: Utf8Decoder::new(),
        }
    }

    /// Returns `true` if the last chunk ended inside a multi-byte sequence.
    #[must_use]
    pub fn has_pending(&self) -> bool {
        self.decoder.has_pending()
    }
}

impl Stream for TextStream {
    type Item = Result<TextChunk>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        match this.body.as_mut().poll_next(cx) {
            Poll::Ready(Some(Ok(raw))) => {
                let text = this.decoder.decode(&raw);
                Poll::Ready(Some(Ok(TextChunk { raw, text })))
            }
            Poll::Ready(Some(Err(err))) => Poll::Ready(Some(Err(err))),
            Poll::Ready(None) => Poll::Ready(None),
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Decode a streaming body into text chunks.
#[must_use]
pub fn decode_text(body: StreamingBody) -> TextStream {
    TextStream::new(body)
}

#[cfg(test)]
mod tests {
    use futures_util::StreamExt;

    use super::*;

    #[test]
    fn decode_ascii_chunks() {
        let mut decoder = Utf8Decoder::new();
        assert_eq!(decoder.decode(b"ab"), "ab");
        assert_eq!(decoder.decode(b"cd"), "cd");
        assert!(decoder.finish().is_none());
    }

    #[test]
    fn decode_split_multibyte_sequence() {
        // "é" is 0xC3 0xA9, "€" is 0xE2 0x82 0xAC
        let mut decoder = Utf8Decoder::new();
        assert_eq!(decoder.decode(&[b'a', 0xC3]), "a");
        assert!(decoder.has_pending());
        assert_eq!(decoder.decode(&[0xA9, 0xE2]), "é");
        assert_eq!(decoder.decode(&[0x82]), "");
        assert_eq!(decoder.decode(&[0xAC, b'!']), "€!");
        assert!(!decoder.has_pending());
    }

    #[test]
    fn decode_invalid_bytes_replaced() {
        let mut decoder = Utf8Decoder::new();
        assert_eq!(decoder.decode(&[b'a', 0xFF, b'b']), "a\u{FFFD}b");
    }

    #[test]
    fn finish_flushes_truncated_sequence() {
        let mut decoder = Utf8Decoder::new();
        assert_eq!(decoder.decode(&[0xE2, 0x82]), "");
        assert_eq!(decoder.finish().as_deref(), Some("\u{FFFD}"));
        assert!(!decoder.has_pending());
    }

    #[tokio::test]
    async fn text_stream_yields_raw_and_text() {
        let body: StreamingBody = Box::pin(futures_util::stream::iter(vec![
            Ok::<_, crate::Error>(Bytes::from_static(&[0xF0, 0x9F])),
            Ok(Bytes::from_static(&[0xA6, 0x80])),
        ]));

        let chunks: Vec<TextChunk> = decode_text(body)
            .map(|chunk| chunk.expect("chunk"))
            .collect()
            .await;

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks.first().map(|c| c.text.as_str()), Some(""));
        assert_eq!(chunks.get(1).map(|c| c.text.as_str()), Some("🦀"));
        assert_eq!(
            chunks.get(1).map(|c| c.raw.as_ref()),
            Some(&[0xA6_u8, 0x80][..])
        );
    }
}
