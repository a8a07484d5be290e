// NDJSON event decoder for simulation streams
//
// The backend answers `POST /api/simulate` with one JSON object per line.
// Network chunks arrive with arbitrary boundaries, so the decoder keeps a
// line buffer holding the trailing partial record between chunks:
//
// ```text
//   chunk 1: {"typ
//   chunk 2: e":"progress","current":1}\n{"type":"res
//   chunk 3: ult","data":{"id":"1"}}\n
// ```
//
// Every complete line is parsed and dispatched to an `EventHandler` before
// the next chunk is read. Blank lines are skipped, malformed lines are logged
// and dropped, and the stream keeps going.
//
// The buffer holds raw bytes rather than text. `\n` never occurs inside a
// multi-byte UTF-8 sequence, so splitting on the byte is safe even when a
// character straddles two chunks.
//
// End of stream does NOT flush an unterminated final line. `close()` hands
// the fragment back so the caller can report it.

mod stream;

pub use stream::{decode_stream, StreamSummary};

use crate::events::{EventHandler, SimulationEvent};
use crate::util::truncate_utf8_safe;
use bytes::{Bytes, BytesMut};
use serde::Deserialize;

/// Longest slice of a bad line that goes into the log
const MAX_LOGGED_LINE: usize = 200;

/// Counters for one decoded stream
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecoderStats {
    /// Newline-terminated lines extracted, blank ones included
    pub lines: usize,
    pub blank: usize,
    pub malformed: usize,
    /// Well-formed records with an unrecognised or missing `type`
    pub unknown: usize,
    /// Events handed to the handler
    pub dispatched: usize,
    /// Dispatched `result` and `error` events
    pub terminal: usize,
}

/// Incremental decoder for one NDJSON stream
///
/// `feed` takes `&mut self`, so a decoder cannot be shared between two
/// concurrent streams.
#[derive(Debug, Default)]
pub struct NdjsonDecoder {
    buffer: BytesMut,
    /// Bytes of `buffer` already known to contain no newline
    scanned: usize,
    stats: DecoderStats,
}

impl NdjsonDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and dispatch every record it completes, in order
    pub fn feed<H: EventHandler + ?Sized>(&mut self, chunk: &[u8], handler: &mut H) {
        self.buffer.extend_from_slice(chunk);

        while let Some(offset) = self.buffer[self.scanned..]
            .iter()
            .position(|&b| b == b'\n')
        {
            let newline_pos = self.scanned + offset;
            let line = self.buffer.split_to(newline_pos + 1).freeze();
            self.scanned = 0;
            self.process_line(&line[..newline_pos], handler);
        }

        self.scanned = self.buffer.len();
    }

    /// End of stream: drop whatever partial line remains
    ///
    /// Returns the dropped fragment when it held anything but whitespace.
    pub fn close(&mut self) -> Option<Bytes> {
        let rest = self.buffer.split().freeze();
        self.scanned = 0;

        if rest.iter().all(u8::is_ascii_whitespace) {
            return None;
        }

        tracing::warn!(
            bytes = rest.len(),
            fragment = %truncate_utf8_safe(&String::from_utf8_lossy(&rest), MAX_LOGGED_LINE),
            "Stream ended without a trailing newline, final fragment dropped"
        );
        Some(rest)
    }

    /// The not-yet-terminated tail held between chunks
    #[cfg(test)]
    pub fn buffered(&self) -> &[u8] {
        &self.buffer
    }

    pub fn stats(&self) -> DecoderStats {
        self.stats
    }

    fn process_line<H: EventHandler + ?Sized>(&mut self, line: &[u8], handler: &mut H) {
        self.stats.lines += 1;

        let text = String::from_utf8_lossy(line);
        if text.trim().is_empty() {
            self.stats.blank += 1;
            return;
        }

        handler.on_record(&text);

        // Parse the lossy text so a stray invalid byte costs one character,
        // not the whole record
        let value: serde_json::Value = match serde_json::from_str(&text) {
            Ok(value) => value,
            Err(e) => {
                self.stats.malformed += 1;
                tracing::warn!(
                    error = %e,
                    line = %truncate_utf8_safe(&text, MAX_LOGGED_LINE),
                    "Error parsing JSON line"
                );
                return;
            }
        };

        if !value.get("type").is_some_and(serde_json::Value::is_string) {
            self.skip_unknown(&text);
            return;
        }

        match SimulationEvent::deserialize(&value) {
            Ok(SimulationEvent::Unknown) => self.skip_unknown(&text),
            Ok(event) => {
                self.stats.dispatched += 1;
                if event.is_terminal() {
                    self.stats.terminal += 1;
                }
                event.dispatch(handler);
            }
            Err(e) => {
                self.stats.malformed += 1;
                tracing::warn!(
                    error = %e,
                    line = %truncate_utf8_safe(&text, MAX_LOGGED_LINE),
                    "Event payload does not match its type"
                );
            }
        }
    }

    /// Well-formed JSON with no recognised `type` reaches no handler
    fn skip_unknown(&mut self, text: &str) {
        self.stats.unknown += 1;
        tracing::debug!(
            line = %truncate_utf8_safe(text, MAX_LOGGED_LINE),
            "Skipping record with unrecognised type"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SimulationResult;

    fn decode_chunks(chunks: &[&[u8]]) -> (Vec<SimulationEvent>, NdjsonDecoder) {
        let mut decoder = NdjsonDecoder::new();
        let mut events: Vec<SimulationEvent> = Vec::new();
        for chunk in chunks {
            decoder.feed(chunk, &mut events);
        }
        (events, decoder)
    }

    fn result_with_id(id: &str) -> SimulationEvent {
        SimulationEvent::Result {
            data: serde_json::from_str::<SimulationResult>(&format!(r#"{{"id":"{}"}}"#, id))
                .unwrap(),
        }
    }

    const STREAM: &str = concat!(
        "{\"type\":\"progress\",\"current\":1}\n",
        "\n",
        "{\"type\":\"progress\",\"current\":2}\n",
        "not json\n",
        "{\"type\":\"heartbeat\"}\n",
        "{\"type\":\"error\",\"message\":\"LLM timeout\"}\n",
        "{\"type\":\"result\",\"data\":{\"id\":\"run-7\",\"timestamp\":1700000000000}}\n",
        "{\"type\":\"progress\",\"current\":9}"
    );

    #[test]
    fn test_split_scenario_dispatches_in_order() {
        let (events, decoder) = decode_chunks(&[
            br#"{"typ"#,
            b"e\":\"progress\",\"current\":1}\n{\"type\":\"result\",\"data\":{\"id\":\"1\"}}\n",
        ]);

        assert_eq!(
            events,
            vec![SimulationEvent::Progress { current: 1 }, result_with_id("1")]
        );
        assert!(decoder.buffered().is_empty());
    }

    #[test]
    fn test_any_chunking_matches_single_chunk() {
        let (whole, _) = decode_chunks(&[STREAM.as_bytes()]);
        assert_eq!(whole.len(), 4);

        let bytes = STREAM.as_bytes();
        for size in 1..=bytes.len() {
            let chunks: Vec<&[u8]> = bytes.chunks(size).collect();
            let (events, decoder) = decode_chunks(&chunks);
            assert_eq!(events, whole, "chunk size {}", size);
            assert_eq!(decoder.buffered(), br#"{"type":"progress","current":9}"#);
        }
    }

    #[test]
    fn test_uneven_split_points_match_single_chunk() {
        let (whole, _) = decode_chunks(&[STREAM.as_bytes()]);
        let bytes = STREAM.as_bytes();
        for a in (0..bytes.len()).step_by(7) {
            for b in (a..bytes.len()).step_by(11) {
                let (events, _) = decode_chunks(&[&bytes[..a], &bytes[a..b], &bytes[b..]]);
                assert_eq!(events, whole, "split at {} and {}", a, b);
            }
        }
    }

    #[test]
    fn test_blank_lines_produce_nothing() {
        let (events, decoder) = decode_chunks(&[b"\n   \n\t\r\n{\"type\":\"progress\",\"current\":4}\n"]);
        assert_eq!(events, vec![SimulationEvent::Progress { current: 4 }]);
        assert_eq!(decoder.stats().blank, 3);
        assert_eq!(decoder.stats().dispatched, 1);
    }

    #[test]
    fn test_malformed_line_is_isolated() {
        let (events, decoder) = decode_chunks(&[concat!(
            "{\"type\":\"progress\",\"current\":1}\n",
            "{\"type\":\"progress\",\"current\":\n",
            "{\"type\":\"progress\",\"current\":2}\n"
        )
        .as_bytes()]);

        assert_eq!(
            events,
            vec![
                SimulationEvent::Progress { current: 1 },
                SimulationEvent::Progress { current: 2 }
            ]
        );
        assert_eq!(decoder.stats().malformed, 1);
    }

    #[test]
    fn test_wrong_payload_shape_is_malformed() {
        let (events, decoder) = decode_chunks(&[
            b"{\"type\":\"progress\",\"current\":\"three\"}\n{\"type\":\"result\",\"data\":{}}\n",
        ]);
        assert!(events.is_empty());
        assert_eq!(decoder.stats().malformed, 2);
    }

    #[test]
    fn test_unterminated_tail_is_not_flushed() {
        let mut decoder = NdjsonDecoder::new();
        let mut events: Vec<SimulationEvent> = Vec::new();
        decoder.feed(
            b"{\"type\":\"progress\",\"current\":1}\n{\"type\":\"progress\",\"current\":2}",
            &mut events,
        );

        assert_eq!(events, vec![SimulationEvent::Progress { current: 1 }]);
        assert_eq!(decoder.buffered(), br#"{"type":"progress","current":2}"#);

        let dropped = decoder.close().expect("fragment should be reported");
        assert_eq!(&dropped[..], br#"{"type":"progress","current":2}"#);
        assert_eq!(events.len(), 1);
        assert!(decoder.buffered().is_empty());
    }

    #[test]
    fn test_tail_completed_by_later_chunk() {
        let mut decoder = NdjsonDecoder::new();
        let mut events: Vec<SimulationEvent> = Vec::new();
        decoder.feed(b"{\"type\":\"progress\",\"current\":2}", &mut events);
        assert!(events.is_empty());
        decoder.feed(b"\n", &mut events);
        assert_eq!(events, vec![SimulationEvent::Progress { current: 2 }]);
        assert_eq!(decoder.close(), None);
    }

    #[test]
    fn test_whitespace_tail_is_not_reported() {
        let mut decoder = NdjsonDecoder::new();
        decoder.feed(b"{\"type\":\"progress\",\"current\":1}\n  ", &mut Vec::<SimulationEvent>::new());
        assert_eq!(decoder.close(), None);
    }

    #[test]
    fn test_discriminator_dispatch() {
        let (events, decoder) = decode_chunks(&[concat!(
            "{\"type\":\"progress\",\"current\":3}\n",
            "{\"type\":\"result\",\"data\":{\"id\":\"r\"}}\n",
            "{\"type\":\"error\",\"message\":\"x\"}\n",
            "{\"type\":\"unknown\"}\n"
        )
        .as_bytes()]);

        assert_eq!(
            events,
            vec![
                SimulationEvent::Progress { current: 3 },
                result_with_id("r"),
                SimulationEvent::Error {
                    message: "x".to_string()
                },
            ]
        );
        assert_eq!(decoder.stats().unknown, 1);
    }

    #[test]
    fn test_events_after_terminal_still_dispatched() {
        let (events, _) = decode_chunks(&[concat!(
            "{\"type\":\"error\",\"message\":\"first\"}\n",
            "{\"type\":\"progress\",\"current\":5}\n"
        )
        .as_bytes()]);
        assert_eq!(events.len(), 2);
    }

    #[test]
    fn test_multibyte_character_split_across_chunks() {
        let line = "{\"type\":\"error\",\"message\":\"Ошибка 😬\"}\n".as_bytes();
        // Split inside the emoji (4-byte sequence) and inside a Cyrillic letter
        let emoji_start = line.iter().position(|&b| b == 0xF0).unwrap();
        let (events, _) = decode_chunks(&[
            &line[..30],
            &line[30..emoji_start + 2],
            &line[emoji_start + 2..],
        ]);
        assert_eq!(
            events,
            vec![SimulationEvent::Error {
                message: "Ошибка 😬".to_string()
            }]
        );
    }

    #[test]
    fn test_on_record_sees_raw_lines() {
        struct Lines(Vec<String>);
        impl EventHandler for Lines {
            fn on_record(&mut self, line: &str) {
                self.0.push(line.to_string());
            }
        }

        let mut lines = Lines(Vec::new());
        let mut decoder = NdjsonDecoder::new();
        decoder.feed(b"\nbad\n{\"type\":\"progress\",\"current\":1}\n", &mut lines);
        assert_eq!(
            lines.0,
            vec!["bad".to_string(), r#"{"type":"progress","current":1}"#.to_string()]
        );
    }

    #[test]
    fn test_invalid_utf8_byte_is_replaced_not_dropped() {
        let (events, decoder) =
            decode_chunks(&[b"{\"type\":\"error\",\"message\":\"bad \xFF byte\"}\n"]);
        assert_eq!(
            events,
            vec![SimulationEvent::Error {
                message: "bad \u{FFFD} byte".to_string()
            }]
        );
        assert_eq!(decoder.stats().malformed, 0);
    }

    #[test]
    fn test_json_without_string_type_is_unknown() {
        let (events, decoder) = decode_chunks(&[concat!(
            "42\n",
            "null\n",
            "{\"type\":5}\n",
            "[1,2]\n",
            "{\"current\":1}\n"
        )
        .as_bytes()]);
        assert!(events.is_empty());
        assert_eq!(decoder.stats().unknown, 5);
        assert_eq!(decoder.stats().malformed, 0);
    }

    #[test]
    fn test_terminal_events_are_counted() {
        let (_, decoder) = decode_chunks(&[STREAM.as_bytes()]);
        let stats = decoder.stats();
        assert_eq!(stats.dispatched, 4);
        assert_eq!(stats.terminal, 2);
        assert_eq!(stats.unknown, 1);
        assert_eq!(stats.malformed, 1);
    }
}
