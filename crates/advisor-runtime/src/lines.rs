//! SSE line framing for the Gemini stream.
//!
//! Turns a `reqwest` byte stream into a stream of complete, non-empty lines;
//! [`sse_data`] then picks the `data:` payloads out of them.

use futures::{Stream, StreamExt};

use advisor_core::error::{ProviderError, Result};

/// Split a byte stream into trimmed, non-empty lines.
///
/// A trailing line without a newline is still yielded when the body ends.
/// After a transport error the stream yields that error once and ends.
pub fn lines<S, B, E>(body: S) -> impl Stream<Item = Result<String>> + Send
where
    S: Stream<Item = std::result::Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    let state = (Box::pin(body), Vec::<u8>::new(), false);

    futures::stream::unfold(state, |(mut body, mut buf, mut eof)| async move {
        loop {
            if let Some(pos) = buf.iter().position(|b| *b == b'\n') {
                let raw: Vec<u8> = buf.drain(..=pos).collect();
                let line = String::from_utf8_lossy(&raw).trim().to_string();
                if line.is_empty() {
                    continue;
                }
                return Some((Ok(line), (body, buf, eof)));
            }

            if eof {
                let line = String::from_utf8_lossy(&buf).trim().to_string();
                buf.clear();
                if line.is_empty() {
                    return None;
                }
                return Some((Ok(line), (body, buf, eof)));
            }

            match body.next().await {
                Some(Ok(bytes)) => buf.extend_from_slice(bytes.as_ref()),
                Some(Err(e)) => {
                    buf.clear();
                    return Some((
                        Err(ProviderError::Provider(format!("stream interrupted: {e}"))),
                        (body, buf, true),
                    ));
                }
                None => eof = true,
            }
        }
    })
}

/// Payload of an SSE `data:` line, if this is one
pub fn sse_data(line: &str) -> Option<&str> {
    line.strip_prefix("data:").map(str::trim_start)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunks(parts: &[&'static str]) -> impl Stream<Item = std::result::Result<&'static [u8], String>> + Send + 'static {
        let owned: Vec<std::result::Result<&'static [u8], String>> =
            parts.iter().map(|p| Ok(p.as_bytes())).collect();
        futures::stream::iter(owned)
    }

    #[tokio::test]
    async fn joins_lines_split_across_chunks() {
        let stream = lines(chunks(&["{\"a\":", "1}\n{\"b\"", ":2}\n"]));
        let out: Vec<String> = stream.map(|l| l.unwrap()).collect().await;
        assert_eq!(out, vec![r#"{"a":1}"#, r#"{"b":2}"#]);
    }

    #[tokio::test]
    async fn skips_blank_lines_and_crlf() {
        let stream = lines(chunks(&["data: x\r\n\r\n", "data: y\r\n"]));
        let out: Vec<String> = stream.map(|l| l.unwrap()).collect().await;
        assert_eq!(out, vec!["data: x", "data: y"]);
    }

    #[tokio::test]
    async fn yields_trailing_line_without_newline() {
        let stream = lines(chunks(&["one\ntwo"]));
        let out: Vec<String> = stream.map(|l| l.unwrap()).collect().await;
        assert_eq!(out, vec!["one", "two"]);
    }

    #[tokio::test]
    async fn transport_error_ends_stream() {
        let parts: Vec<std::result::Result<&'static [u8], String>> = vec![
            Ok(b"partial".as_slice()),
            Err("connection reset".to_string()),
            Ok(b"never\n".as_slice()),
        ];
        let out: Vec<Result<String>> = lines(futures::stream::iter(parts)).collect().await;
        assert_eq!(out.len(), 1);
        assert!(matches!(out[0], Err(ProviderError::Provider(_))));
    }

    #[test]
    fn sse_data_prefix() {
        assert_eq!(sse_data("data: {\"x\":1}"), Some("{\"x\":1}"));
        assert_eq!(sse_data("data:{}"), Some("{}"));
        assert_eq!(sse_data("event: ping"), None);
    }
}
