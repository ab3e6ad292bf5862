//! Server-sent-events framing for word streams.
//!
//! Transports that receive the lookup as `text/event-stream` can hand their
//! byte stream to [`sse_event_stream`] and return the result from
//! `EventSource::open`.

use std::fmt::Display;

use futures::{Stream, StreamExt as _};

use crate::cancel::CancelSignal;
use crate::errors::SourceError;
use crate::event::{EventStream, StreamEvent};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseFrame {
    pub event: Option<String>,
    pub data: String,
}

/// Incremental SSE frame splitter; tolerates frames cut across chunks.
#[derive(Default)]
pub struct SseDecoder {
    buf: Vec<u8>,
}

impl SseDecoder {
    /// Appends raw bytes and returns every frame completed by them.
    pub fn push_chunk(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
        self.buf.extend_from_slice(chunk);
        let mut frames = Vec::new();
        while let Some((idx, delim_len)) = find_frame_delimiter(&self.buf) {
            let frame_bytes: Vec<u8> = self.buf.drain(..idx + delim_len).take(idx).collect();
            if let Some(frame) = parse_sse_frame(&frame_bytes) {
                frames.push(frame);
            }
        }
        frames
    }

    /// Flushes a trailing frame that was not followed by a blank line.
    pub fn finish(&mut self) -> Option<SseFrame> {
        let rest = std::mem::take(&mut self.buf);
        parse_sse_frame(&rest)
    }
}

fn find_frame_delimiter(buf: &[u8]) -> Option<(usize, usize)> {
    let mut i = 0;
    while i + 1 < buf.len() {
        if buf[i] == b'\n' && buf[i + 1] == b'\n' {
            return Some((i, 2));
        }
        if i + 3 < buf.len()
            && buf[i] == b'\r'
            && buf[i + 1] == b'\n'
            && buf[i + 2] == b'\r'
            && buf[i + 3] == b'\n'
        {
            return Some((i, 4));
        }
        i += 1;
    }
    None
}

fn parse_sse_frame(bytes: &[u8]) -> Option<SseFrame> {
    if bytes.is_empty() {
        return None;
    }
    let text = String::from_utf8_lossy(bytes);
    let mut event: Option<String> = None;
    let mut data_lines: Vec<&str> = Vec::new();
    for raw_line in text.split('\n') {
        let line = raw_line.trim_end_matches('\r');
        if line.is_empty() || line.starts_with(':') {
            continue;
        }
        if let Some(rest) = line.strip_prefix("event:") {
            event = Some(rest.trim().to_string());
            continue;
        }
        if let Some(rest) = line.strip_prefix("data:") {
            // Only the single separator space belongs to the framing.
            data_lines.push(rest.strip_prefix(' ').unwrap_or(rest));
        }
    }
    if event.is_none() && data_lines.is_empty() {
        return None;
    }
    Some(SseFrame {
        event,
        data: data_lines.join("\n"),
    })
}

/// Maps one frame onto the session's event vocabulary.
///
/// `Ok(None)` means the frame carries nothing for the session (keep-alives,
/// `done` markers, unknown event names).
pub fn frame_to_event(frame: SseFrame) -> Result<Option<StreamEvent>, SourceError> {
    if frame.data.trim() == "[DONE]" {
        return Ok(None);
    }
    match frame.event.as_deref() {
        None | Some("chunk") | Some("message") => Ok(Some(StreamEvent::Chunk(frame.data))),
        Some("metadata") => Ok(Some(StreamEvent::Metadata(frame.data))),
        Some("error") => {
            let parsed: Option<serde_json::Value> = serde_json::from_str(&frame.data).ok();
            let message = parsed
                .as_ref()
                .and_then(|v| v.get("message"))
                .and_then(|v| v.as_str())
                .map(ToOwned::to_owned)
                .unwrap_or_else(|| frame.data.clone());
            let status_code = parsed
                .as_ref()
                .and_then(|v| v.get("status"))
                .and_then(|v| v.as_u64())
                .and_then(|v| u16::try_from(v).ok());
            Err(SourceError::upstream(message, status_code))
        }
        Some(_) => Ok(None),
    }
}

/// Decodes an SSE byte stream into session events.
///
/// The stream ends after the first error, and yields
/// [`SourceError::Cancelled`] once `signal` fires.
pub fn sse_event_stream<S, B, E>(bytes: S, mut signal: CancelSignal) -> EventStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Display + Send + 'static,
{
    Box::pin(async_stream::try_stream! {
        let mut bytes = Box::pin(bytes);
        let mut decoder = SseDecoder::default();
        loop {
            let next = tokio::select! {
                biased;
                _ = signal.cancelled() => Err(SourceError::Cancelled),
                item = bytes.next() => Ok(item),
            };
            let frames = match next? {
                Some(chunk) => {
                    let chunk = chunk.map_err(|e| SourceError::transport(e.to_string()))?;
                    decoder.push_chunk(chunk.as_ref())
                }
                None => {
                    if let Some(frame) = decoder.finish() {
                        if let Some(event) = frame_to_event(frame)? {
                            yield event;
                        }
                    }
                    break;
                }
            };
            for frame in frames {
                if let Some(event) = frame_to_event(frame)? {
                    yield event;
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    type ByteChunks = stream::Iter<std::vec::IntoIter<Result<Vec<u8>, String>>>;

    fn byte_chunks(parts: &[&str]) -> ByteChunks {
        let owned: Vec<Result<Vec<u8>, String>> =
            parts.iter().map(|p| Ok(p.as_bytes().to_vec())).collect();
        stream::iter(owned)
    }

    #[test]
    fn decoder_handles_partial_chunk_boundaries() {
        let mut decoder = SseDecoder::default();
        assert!(decoder.push_chunk(b"event: chunk\ndata: {\"id\":").is_empty());
        let frames = decoder.push_chunk(b"\"1\"}\n\n");
        assert_eq!(
            frames,
            vec![SseFrame {
                event: Some("chunk".into()),
                data: "{\"id\":\"1\"}".into(),
            }]
        );
    }

    #[test]
    fn data_keeps_inner_whitespace() {
        let mut decoder = SseDecoder::default();
        let frames = decoder.push_chunk(b"data:   indented\r\ndata: two\r\n\r\n: keep-alive\n\n");
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].data, "  indented\ntwo");
    }

    #[test]
    fn finish_flushes_trailing_frame() {
        let mut decoder = SseDecoder::default();
        assert!(decoder.push_chunk(b"data: tail").is_empty());
        assert_eq!(decoder.finish().map(|f| f.data), Some("tail".to_string()));
        assert_eq!(decoder.finish(), None);
    }

    #[test]
    fn maps_frames_to_events() {
        let metadata = SseFrame {
            event: Some("metadata".into()),
            data: "{}".into(),
        };
        assert_eq!(
            frame_to_event(metadata).expect("metadata"),
            Some(StreamEvent::metadata("{}"))
        );
        let done = SseFrame {
            event: None,
            data: "[DONE]".into(),
        };
        assert_eq!(frame_to_event(done).expect("done"), None);
        let error = SseFrame {
            event: Some("error".into()),
            data: r#"{"message":"quota exceeded","status":429}"#.into(),
        };
        assert_eq!(
            frame_to_event(error),
            Err(SourceError::upstream("quota exceeded", Some(429)))
        );
    }

    #[tokio::test]
    async fn stream_decodes_events_in_order() {
        let events: Vec<_> = sse_event_stream(
            byte_chunks(&[
                "event: metadata\ndata: {\"flavor\":\"MONO\"}\n\n",
                "data: # te",
                "st\n\nevent: chunk\ndata: more\n\n",
            ]),
            CancelSignal::never(),
        )
        .collect()
        .await;
        assert_eq!(
            events,
            vec![
                Ok(StreamEvent::metadata("{\"flavor\":\"MONO\"}")),
                Ok(StreamEvent::chunk("# test")),
                Ok(StreamEvent::chunk("more")),
            ]
        );
    }

    #[tokio::test]
    async fn transport_errors_end_the_stream() {
        let bytes = stream::iter(vec![
            Ok(b"data: a\n\n".to_vec()),
            Err("connection reset".to_string()),
            Ok(b"data: b\n\n".to_vec()),
        ]);
        let events: Vec<_> = sse_event_stream(bytes, CancelSignal::never()).collect().await;
        assert_eq!(
            events,
            vec![
                Ok(StreamEvent::chunk("a")),
                Err(SourceError::transport("connection reset")),
            ]
        );
    }

    #[tokio::test]
    async fn cancelled_signal_stops_a_pending_stream() {
        let (handle, signal) = CancelSignal::pair();
        let mut events = sse_event_stream(stream::pending::<Result<Vec<u8>, String>>(), signal);
        handle.abort();
        assert_eq!(events.next().await, Some(Err(SourceError::Cancelled)));
        assert_eq!(events.next().await, None);
    }
}
