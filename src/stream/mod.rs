pub mod relay;
pub mod sse;

pub use relay::relay_stream;
pub use sse::EventDecoder;

use serde::Deserialize;

use crate::error::RelayError;

/// A decoded upstream frame: either one incremental text delta or the
/// explicit end-of-stream sentinel. Produced and consumed within one relay,
/// never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    Delta(String),
    Done,
}

/// Partial schema for the subset of the upstream chunk JSON the relay
/// depends on. Everything else in the provider payload is ignored.
#[derive(Debug, Deserialize)]
struct CompletionChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
}

#[derive(Debug, Default, Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: ChunkDelta,
}

#[derive(Debug, Default, Deserialize)]
struct ChunkDelta {
    #[serde(default)]
    content: Option<String>,
}

/// Extract the incremental text of one `data` payload.
///
/// Absent `choices[0].delta.content` yields an empty string; JSON that does
/// not parse at all fails with [`RelayError::Decode`] and is never skipped.
pub fn extract_delta(payload: &[u8]) -> Result<String, RelayError> {
    let chunk: CompletionChunk = serde_json::from_slice(payload)
        .map_err(|err| RelayError::Decode(format!("malformed upstream chunk: {err}")))?;
    Ok(chunk
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.delta.content)
        .unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_delta_content() {
        let payload = br#"{"choices":[{"delta":{"content":"Hello"}}]}"#;
        assert_eq!(extract_delta(payload).unwrap(), "Hello");
    }

    #[test]
    fn test_extract_delta_absent_content_is_empty() {
        let payload = br#"{"choices":[{"delta":{}}]}"#;
        assert_eq!(extract_delta(payload).unwrap(), "");

        let payload = br#"{"choices":[{"delta":{"role":"assistant"}}]}"#;
        assert_eq!(extract_delta(payload).unwrap(), "");
    }

    #[test]
    fn test_extract_delta_no_choices_is_empty() {
        let payload = br#"{"id":"chatcmpl-1","choices":[]}"#;
        assert_eq!(extract_delta(payload).unwrap(), "");
    }

    #[test]
    fn test_extract_delta_malformed_json_fails() {
        let err = extract_delta(b"{not json").unwrap_err();
        assert!(matches!(err, RelayError::Decode(_)));
    }

    #[test]
    fn test_extract_delta_ignores_extra_provider_fields() {
        let payload = br#"{"id":"chatcmpl-1","object":"chat.completion.chunk","created":1727000000,"model":"gpt-3.5-turbo","choices":[{"index":0,"delta":{"content":" there"},"finish_reason":null}]}"#;
        assert_eq!(extract_delta(payload).unwrap(), " there");
    }
}
