/// Incremental event-stream (SSE) decoder.
///
/// Consumes raw bytes as they arrive from the upstream body and yields one
/// [`StreamEvent`] per complete frame. Feed bytes with [`EventDecoder::feed`],
/// drain frames with [`EventDecoder::next_event`]; partial frames straddling
/// chunk boundaries stay buffered until a later feed completes them.
use memchr::memmem;
use std::sync::LazyLock;

use super::{extract_delta, StreamEvent};
use crate::error::RelayError;

const DONE_SENTINEL: &[u8] = b"[DONE]";

static LF_LF_FINDER: LazyLock<memmem::Finder<'static>> =
    LazyLock::new(|| memmem::Finder::new(b"\n\n"));
static CRLF_CRLF_FINDER: LazyLock<memmem::Finder<'static>> =
    LazyLock::new(|| memmem::Finder::new(b"\r\n\r\n"));

/// Locate the next blank-line frame terminator, returning its byte offset
/// and length (`\n\n` or `\r\n\r\n`).
#[inline]
fn find_frame_terminator(buffer: &[u8], scan_from: usize) -> Option<(usize, usize)> {
    let scan_from = scan_from.min(buffer.len());
    let haystack = &buffer[scan_from..];
    let lf_lf = LF_LF_FINDER.find(haystack).map(|rel| scan_from + rel);
    let crlf_crlf = CRLF_CRLF_FINDER.find(haystack).map(|rel| scan_from + rel);

    match (lf_lf, crlf_crlf) {
        (Some(lf), Some(crlf)) if crlf < lf => Some((crlf, 4)),
        (Some(lf), _) => Some((lf, 2)),
        (None, Some(crlf)) => Some((crlf, 4)),
        (None, None) => None,
    }
}

pub struct EventDecoder {
    buffer: Vec<u8>,
    scan_from: usize,
    finished: bool,
}

impl EventDecoder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            buffer: Vec::with_capacity(4096),
            scan_from: 0,
            finished: false,
        }
    }

    /// Append raw upstream bytes. Nothing is interpreted until
    /// [`next_event`](Self::next_event) is called.
    pub fn feed(&mut self, chunk: &[u8]) {
        if self.finished {
            return;
        }
        self.buffer.extend_from_slice(chunk);
    }

    /// Drain the next complete frame, if any.
    ///
    /// Returns `Ok(None)` when the buffered bytes do not yet contain a full
    /// frame. After a `Done` event the decoder emits nothing further,
    /// regardless of remaining buffered bytes.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Decode`] when a frame's `data` payload is not
    /// valid JSON of the expected shape.
    pub fn next_event(&mut self) -> Result<Option<StreamEvent>, RelayError> {
        while !self.finished {
            let Some((terminator, terminator_len)) =
                find_frame_terminator(&self.buffer, self.scan_from)
            else {
                // Keep a small overlap so a terminator split across feeds is
                // still found on the next scan.
                self.scan_from = self.buffer.len().saturating_sub(3);
                return Ok(None);
            };

            let event = match decode_frame(&self.buffer[..terminator]) {
                Ok(event) => event,
                Err(err) => {
                    // Decode failures are terminal; stop interpreting bytes.
                    self.finished = true;
                    return Err(err);
                }
            };
            self.buffer.drain(..terminator + terminator_len);
            self.scan_from = 0;

            match event {
                Some(StreamEvent::Done) => {
                    self.finished = true;
                    return Ok(Some(StreamEvent::Done));
                }
                Some(delta) => return Ok(Some(delta)),
                // Frame carried no data field; keep scanning.
                None => {}
            }
        }
        Ok(None)
    }
}

impl Default for EventDecoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Decode one complete frame (terminator excluded).
///
/// Only the `data` field is interpreted; multiple `data:` lines concatenate
/// with `\n`. Comment lines and unknown fields are ignored, never errors.
fn decode_frame(frame: &[u8]) -> Result<Option<StreamEvent>, RelayError> {
    let mut data: Option<Vec<u8>> = None;

    for mut line in frame.split(|&byte| byte == b'\n') {
        if line.last() == Some(&b'\r') {
            line = &line[..line.len() - 1];
        }
        if line.is_empty() || line[0] == b':' {
            continue;
        }
        if let Some(value) = line.strip_prefix(b"data:") {
            let value = value.strip_prefix(b" ").unwrap_or(value);
            match data.as_mut() {
                Some(buffer) => {
                    buffer.push(b'\n');
                    buffer.extend_from_slice(value);
                }
                None => data = Some(value.to_vec()),
            }
        }
    }

    let Some(data) = data else {
        return Ok(None);
    };

    if data.trim_ascii() == DONE_SENTINEL {
        return Ok(Some(StreamEvent::Done));
    }
    extract_delta(&data).map(|text| Some(StreamEvent::Delta(text)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(decoder: &mut EventDecoder) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        while let Some(event) = decoder.next_event().expect("decode") {
            events.push(event);
        }
        events
    }

    fn delta(text: &str) -> StreamEvent {
        StreamEvent::Delta(text.to_string())
    }

    #[test]
    fn test_decode_single_delta_frame() {
        let mut decoder = EventDecoder::new();
        decoder.feed(b"data: {\"choices\":[{\"delta\":{\"content\":\"Hi\"}}]}\n\n");
        assert_eq!(drain(&mut decoder), vec![delta("Hi")]);
    }

    #[test]
    fn test_decode_done_sentinel() {
        let mut decoder = EventDecoder::new();
        decoder.feed(b"data: [DONE]\n\n");
        assert_eq!(drain(&mut decoder), vec![StreamEvent::Done]);
    }

    #[test]
    fn test_done_terminates_despite_trailing_bytes() {
        let mut decoder = EventDecoder::new();
        decoder.feed(b"data: [DONE]\n\ndata: {\"choices\":[{\"delta\":{\"content\":\"late\"}}]}\n\n");
        assert_eq!(
            decoder.next_event().unwrap(),
            Some(StreamEvent::Done)
        );
        assert_eq!(decoder.next_event().unwrap(), None);

        // Bytes fed after the sentinel are discarded too.
        decoder.feed(b"data: {\"choices\":[{\"delta\":{\"content\":\"more\"}}]}\n\n");
        assert_eq!(decoder.next_event().unwrap(), None);
    }

    #[test]
    fn test_partial_frame_buffers_across_feeds() {
        let mut decoder = EventDecoder::new();
        decoder.feed(b"data: {\"choices\":[{\"delta\":{\"con");
        assert_eq!(decoder.next_event().unwrap(), None);
        decoder.feed(b"tent\":\"Hi\"}}]}\n");
        assert_eq!(decoder.next_event().unwrap(), None);
        decoder.feed(b"\n");
        assert_eq!(decoder.next_event().unwrap(), Some(delta("Hi")));
    }

    #[test]
    fn test_chunk_boundary_independence() {
        let body: &[u8] = b"data: {\"choices\":[{\"delta\":{\"content\":\"Hello\"}}]}\r\n\r\ndata: {\"choices\":[{\"delta\":{\"content\":\" there\"}}]}\n\ndata: [DONE]\n\n";

        let mut whole = EventDecoder::new();
        whole.feed(body);
        let expected = drain(&mut whole);
        assert_eq!(
            expected,
            vec![delta("Hello"), delta(" there"), StreamEvent::Done]
        );

        let mut byte_at_a_time = EventDecoder::new();
        let mut events = Vec::new();
        for byte in body {
            byte_at_a_time.feed(std::slice::from_ref(byte));
            while let Some(event) = byte_at_a_time.next_event().expect("decode") {
                events.push(event);
            }
        }
        assert_eq!(events, expected);
    }

    #[test]
    fn test_multiple_data_lines_concatenate() {
        // Multi-line payloads are legal framing even though the upstream
        // emits single-line JSON in practice.
        let mut decoder = EventDecoder::new();
        decoder.feed(b"data: {\"choices\":[{\"delta\":\ndata: {\"content\":\"Hi\"}}]}\n\n");
        // "\n" joins the two lines; the result must still parse as one JSON value.
        assert_eq!(drain(&mut decoder), vec![delta("Hi")]);
    }

    #[test]
    fn test_unknown_fields_and_comments_ignored() {
        let mut decoder = EventDecoder::new();
        decoder.feed(b": keepalive\nevent: message\nid: 7\nretry: 100\ndata: {\"choices\":[{\"delta\":{\"content\":\"ok\"}}]}\n\n");
        assert_eq!(drain(&mut decoder), vec![delta("ok")]);
    }

    #[test]
    fn test_frame_without_data_emits_nothing() {
        let mut decoder = EventDecoder::new();
        decoder.feed(b"event: ping\n\ndata: [DONE]\n\n");
        assert_eq!(drain(&mut decoder), vec![StreamEvent::Done]);
    }

    #[test]
    fn test_malformed_payload_fails_decoder() {
        let mut decoder = EventDecoder::new();
        decoder.feed(b"data: {broken\n\n");
        let err = decoder.next_event().unwrap_err();
        assert!(matches!(err, RelayError::Decode(_)));
    }

    #[test]
    fn test_absent_content_is_empty_delta() {
        let mut decoder = EventDecoder::new();
        decoder.feed(b"data: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\n\n");
        assert_eq!(drain(&mut decoder), vec![delta("")]);
    }

    #[test]
    fn test_data_without_space_after_colon() {
        let mut decoder = EventDecoder::new();
        decoder.feed(b"data:[DONE]\n\n");
        assert_eq!(drain(&mut decoder), vec![StreamEvent::Done]);
    }
}
