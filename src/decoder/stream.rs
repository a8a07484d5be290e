//! Drive an `NdjsonDecoder` from an async chunk stream
//!
//! Suspension happens only while awaiting the next chunk. Each chunk is fully
//! decoded (handlers included) before the next one is requested.

use super::{DecoderStats, NdjsonDecoder};
use crate::events::EventHandler;
use bytes::Bytes;
use futures::{Stream, StreamExt};

/// What the decoder saw over a whole stream
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StreamSummary {
    pub stats: DecoderStats,
    /// Unterminated final fragment dropped at end of stream
    pub dropped_tail: Option<Bytes>,
}

/// Decode every chunk of `stream` into `handler` until the stream ends
///
/// A transport error stops decoding immediately and is returned as-is;
/// events already dispatched stay dispatched.
pub async fn decode_stream<S, B, E, H>(stream: S, handler: &mut H) -> Result<StreamSummary, E>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    H: EventHandler + ?Sized,
{
    let mut decoder = NdjsonDecoder::new();
    futures::pin_mut!(stream);

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        tracing::trace!(bytes = chunk.as_ref().len(), "Received stream chunk");
        decoder.feed(chunk.as_ref(), handler);
    }

    let dropped_tail = decoder.close();
    let stats = decoder.stats();
    tracing::debug!(
        lines = stats.lines,
        dispatched = stats.dispatched,
        malformed = stats.malformed,
        "Stream finished"
    );

    Ok(StreamSummary {
        stats,
        dropped_tail,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::SimulationEvent;
    use futures::stream;

    #[tokio::test]
    async fn test_decodes_stream_of_chunks() {
        let chunks: Vec<Result<&[u8], std::io::Error>> = vec![
            Ok(&b"{\"type\":\"progress\",\"cur"[..]),
            Ok(&b"rent\":1}\n{\"type\":\"progress\",\"current\":2}\n"[..]),
            Ok(&b"{\"type\":\"error\",\"message\":\"bad audience\"}\n"[..]),
        ];

        let mut events: Vec<SimulationEvent> = Vec::new();
        let summary = decode_stream(stream::iter(chunks), &mut events)
            .await
            .unwrap();

        assert_eq!(
            events,
            vec![
                SimulationEvent::Progress { current: 1 },
                SimulationEvent::Progress { current: 2 },
                SimulationEvent::Error {
                    message: "bad audience".to_string()
                },
            ]
        );
        assert_eq!(summary.stats.dispatched, 3);
        assert_eq!(summary.dropped_tail, None);
    }

    #[tokio::test]
    async fn test_reports_dropped_tail() {
        let chunks: Vec<Result<Vec<u8>, std::io::Error>> = vec![Ok(
            b"{\"type\":\"progress\",\"current\":1}\n{\"type\":\"progress\",\"current\":2}".to_vec(),
        )];

        let mut events: Vec<SimulationEvent> = Vec::new();
        let summary = decode_stream(stream::iter(chunks), &mut events)
            .await
            .unwrap();

        assert_eq!(events, vec![SimulationEvent::Progress { current: 1 }]);
        assert_eq!(
            summary.dropped_tail.as_deref(),
            Some(&br#"{"type":"progress","current":2}"#[..])
        );
    }

    #[tokio::test]
    async fn test_transport_error_stops_decoding() {
        let chunks: Vec<Result<&[u8], String>> = vec![
            Ok(&b"{\"type\":\"progress\",\"current\":1}\n"[..]),
            Err("connection reset".to_string()),
            Ok(&b"{\"type\":\"progress\",\"current\":2}\n"[..]),
        ];

        let mut events: Vec<SimulationEvent> = Vec::new();
        let err = decode_stream(stream::iter(chunks), &mut events)
            .await
            .unwrap_err();

        assert_eq!(err, "connection reset");
        assert_eq!(events, vec![SimulationEvent::Progress { current: 1 }]);
    }
}
