/// Outbound stream relay.
///
/// Wraps the upstream byte stream in a pull-based chain: the outbound
/// consumer's pacing governs how fast the decoder is drained, which governs
/// how fast bytes are pulled off the network socket. Dropping the returned
/// stream drops the upstream body with it, aborting the HTTP request.
use bytes::Bytes;
use futures_util::{Stream, StreamExt};

use super::{EventDecoder, StreamEvent};
use crate::error::RelayError;

/// Number of forwarded chunks below which newline-bearing fragments are
/// suppressed. Tuned to the provider's habit of prefacing answers with
/// formatting whitespace in the first couple of tokens.
const NEWLINE_SUPPRESSION_CHUNKS: u64 = 2;

struct RelayState<S> {
    upstream: std::pin::Pin<Box<S>>,
    decoder: EventDecoder,
    emitted_chunks: u64,
    closed: bool,
}

/// Relay an upstream event-stream body as a stream of UTF-8 text fragments.
///
/// Yields one `Bytes` item per forwarded delta. Closes cleanly on the
/// `[DONE]` sentinel or on upstream exhaustion without one; a decode failure
/// or a mid-stream transport failure yields a single `Err` item and ends the
/// stream, so callers can tell a truncated response from a complete one.
pub fn relay_stream<S, E>(
    upstream: S,
) -> impl Stream<Item = Result<Bytes, RelayError>> + Send + 'static
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    let state = RelayState {
        upstream: Box::pin(upstream),
        decoder: EventDecoder::new(),
        emitted_chunks: 0,
        closed: false,
    };

    futures_util::stream::unfold(state, |mut state| async move {
        if state.closed {
            return None;
        }
        loop {
            match state.decoder.next_event() {
                Err(err) => {
                    state.closed = true;
                    return Some((Err(err), state));
                }
                Ok(Some(StreamEvent::Done)) => {
                    state.closed = true;
                    return None;
                }
                Ok(Some(StreamEvent::Delta(text))) => {
                    // Zero-length writes are short-circuited; they carry no
                    // content and must not count toward the window.
                    if text.is_empty() {
                        continue;
                    }
                    if state.emitted_chunks < NEWLINE_SUPPRESSION_CHUNKS
                        && text.contains('\n')
                    {
                        continue;
                    }
                    state.emitted_chunks += 1;
                    return Some((Ok(Bytes::from(text)), state));
                }
                Ok(None) => match state.upstream.as_mut().next().await {
                    Some(Ok(bytes)) => state.decoder.feed(&bytes),
                    Some(Err(err)) => {
                        state.closed = true;
                        return Some((
                            Err(RelayError::Transport(format!(
                                "upstream body failed mid-stream: {err}"
                            ))),
                            state,
                        ));
                    }
                    // Upstream closed without a sentinel; treat as a normal end.
                    None => {
                        state.closed = true;
                        return None;
                    }
                },
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;

    fn frame(content: &str) -> Bytes {
        let payload = serde_json::json!({"choices":[{"delta":{"content":content}}]});
        Bytes::from(format!("data: {payload}\n\n"))
    }

    fn done() -> Bytes {
        Bytes::from_static(b"data: [DONE]\n\n")
    }

    async fn collect_ok<S>(stream: S) -> Vec<String>
    where
        S: Stream<Item = Result<Bytes, RelayError>>,
    {
        stream
            .map(|item| String::from_utf8(item.expect("relay item").to_vec()).expect("utf8"))
            .collect()
            .await
    }

    fn source(chunks: Vec<Bytes>) -> impl Stream<Item = Result<Bytes, Infallible>> {
        futures_util::stream::iter(chunks.into_iter().map(Ok))
    }

    #[tokio::test]
    async fn test_relay_forwards_deltas_until_done() {
        let chunks = vec![frame("Hello"), frame(" there"), done()];
        let out = collect_ok(relay_stream(source(chunks))).await;
        assert_eq!(out.join(""), "Hello there");
    }

    #[tokio::test]
    async fn test_newline_suppression_window() {
        let chunks = vec![
            frame("Hi"),
            frame("\nthere"),
            frame("\n"),
            frame("!"),
            frame("\nok"),
            done(),
        ];
        let out = collect_ok(relay_stream(source(chunks))).await;
        assert_eq!(out, vec!["Hi", "!", "\nok"]);
    }

    #[tokio::test]
    async fn test_leading_newline_fragments_all_dropped_below_window() {
        let chunks = vec![frame("\n"), frame("\n\n"), frame("text"), done()];
        let out = collect_ok(relay_stream(source(chunks))).await;
        assert_eq!(out, vec!["text"]);
    }

    #[tokio::test]
    async fn test_empty_fragments_do_not_count() {
        // Two empty deltas then a newline-bearing one: the window must still
        // be open, so the newline fragment is dropped.
        let chunks = vec![frame(""), frame(""), frame("\nx"), frame("a"), done()];
        let out = collect_ok(relay_stream(source(chunks))).await;
        assert_eq!(out, vec!["a"]);
    }

    #[tokio::test]
    async fn test_exhaustion_without_sentinel_is_clean_close() {
        let chunks = vec![frame("partial")];
        let items: Vec<_> = relay_stream(source(chunks)).collect().await;
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].as_ref().unwrap(), "partial");
    }

    #[tokio::test]
    async fn test_decode_error_aborts_after_partial_output() {
        let chunks = vec![frame("ok"), Bytes::from_static(b"data: {broken\n\n")];
        let items: Vec<_> = relay_stream(source(chunks)).collect().await;
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_ref().unwrap(), "ok");
        assert!(matches!(items[1], Err(RelayError::Decode(_))));
    }

    #[tokio::test]
    async fn test_transport_error_mid_stream_aborts() {
        let chunks: Vec<Result<Bytes, &str>> =
            vec![Ok(frame("ok")), Err("connection reset")];
        let items: Vec<_> = relay_stream(futures_util::stream::iter(chunks)).collect().await;
        assert_eq!(items.len(), 2);
        assert!(items[0].is_ok());
        assert!(matches!(items[1], Err(RelayError::Transport(_))));
    }

    #[tokio::test]
    async fn test_frames_split_across_network_chunks() {
        let body = b"data: {\"choices\":[{\"delta\":{\"content\":\"Hel".to_vec();
        let rest = b"lo\"}}]}\n\ndata: [DONE]\n\n".to_vec();
        let chunks = vec![Bytes::from(body), Bytes::from(rest)];
        let out = collect_ok(relay_stream(source(chunks))).await;
        assert_eq!(out, vec!["Hello"]);
    }

    #[tokio::test]
    async fn test_nothing_after_done_is_forwarded() {
        let chunks = vec![frame("a"), frame("b"), done(), frame("late")];
        let out = collect_ok(relay_stream(source(chunks))).await;
        assert_eq!(out, vec!["a", "b"]);
    }
}
