//! Record simulation streams to NDJSON files and replay them
//!
//! A recording holds the raw records exactly as the decoder saw them, one per
//! line, so replaying one drives the decoder through the same sequence (blank
//! lines and the unterminated tail are not recorded).

use crate::decoder::{decode_stream, StreamSummary};
use crate::events::EventHandler;
use crate::models::SimulationResult;
use anyhow::{Context, Result};
use std::io::Write;
use std::path::Path;
use tokio::io::AsyncReadExt;

/// Default read size when replaying a recording
pub const DEFAULT_REPLAY_CHUNK: usize = 4096;

/// Handler decorator that tees each raw record to a writer
///
/// A failed write is logged once and recording stops; the wrapped handler
/// keeps receiving events.
pub struct Recorder<H, W: Write> {
    inner: H,
    writer: Option<W>,
    lines: usize,
}

impl<H: EventHandler, W: Write> Recorder<H, W> {
    pub fn new(inner: H, writer: W) -> Self {
        Self {
            inner,
            writer: Some(writer),
            lines: 0,
        }
    }

    /// Lines written so far
    pub fn lines(&self) -> usize {
        self.lines
    }

    /// Flush the writer and hand back the wrapped handler
    pub fn finish(mut self) -> (H, Option<W>) {
        if let Some(writer) = self.writer.as_mut() {
            if let Err(e) = writer.flush() {
                tracing::warn!(error = %e, "Failed to flush recording");
            }
        }
        (self.inner, self.writer)
    }
}

impl<H: EventHandler, W: Write> EventHandler for Recorder<H, W> {
    fn on_progress(&mut self, current: u64) {
        self.inner.on_progress(current)
    }

    fn on_result(&mut self, result: SimulationResult) {
        self.inner.on_result(result)
    }

    fn on_error(&mut self, message: String) {
        self.inner.on_error(message)
    }

    fn on_record(&mut self, line: &str) {
        if let Some(writer) = self.writer.as_mut() {
            if let Err(e) = writeln!(writer, "{}", line) {
                tracing::warn!(error = %e, "Recording write failed, recording disabled");
                self.writer = None;
                return;
            }
            self.lines += 1;
        }
        self.inner.on_record(line);
    }
}

/// Replay a recorded file through the decoder in `chunk_size` reads
pub async fn replay_file<H: EventHandler + ?Sized>(
    path: &Path,
    chunk_size: usize,
    handler: &mut H,
) -> Result<StreamSummary> {
    let file = tokio::fs::File::open(path)
        .await
        .with_context(|| format!("Failed to open recording {}", path.display()))?;

    let chunk_size = chunk_size.max(1);
    let chunks = futures::stream::unfold(Some(file), move |state| async move {
        let Some(mut file) = state else {
            return None;
        };
        let mut buf = vec![0u8; chunk_size];
        match file.read(&mut buf).await {
            Ok(0) => None,
            Ok(n) => {
                buf.truncate(n);
                Some((Ok(buf), Some(file)))
            }
            // Yield the error once, then end the stream
            Err(e) => Some((Err(e), None)),
        }
    });

    decode_stream(chunks, handler)
        .await
        .with_context(|| format!("Failed to read recording {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::NdjsonDecoder;
    use crate::events::SimulationEvent;

    const STREAM: &[u8] = b"{\"type\":\"progress\",\"current\":1}\n\n  \nnot json\n{\"type\":\"result\",\"data\":{\"id\":\"r1\"}}\n{\"type\":\"progress\"";

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("mailsim-{}-{}.ndjson", name, std::process::id()))
    }

    #[test]
    fn test_recorder_writes_non_blank_records() {
        let mut recorder = Recorder::new(Vec::<SimulationEvent>::new(), Vec::<u8>::new());
        let mut decoder = NdjsonDecoder::new();
        decoder.feed(STREAM, &mut recorder);

        assert_eq!(recorder.lines(), 3);
        let (events, written) = recorder.finish();
        assert_eq!(events.len(), 2);
        assert_eq!(
            String::from_utf8(written.unwrap()).unwrap(),
            "{\"type\":\"progress\",\"current\":1}\nnot json\n{\"type\":\"result\",\"data\":{\"id\":\"r1\"}}\n"
        );
    }

    #[test]
    fn test_recorder_survives_write_failure() {
        struct Broken;
        impl Write for Broken {
            fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
                Err(std::io::Error::new(std::io::ErrorKind::Other, "disk full"))
            }
            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        let mut recorder = Recorder::new(Vec::<SimulationEvent>::new(), Broken);
        NdjsonDecoder::new().feed(STREAM, &mut recorder);

        assert_eq!(recorder.lines(), 0);
        let (events, writer) = recorder.finish();
        assert_eq!(events.len(), 2);
        assert!(writer.is_none());
    }

    #[tokio::test]
    async fn test_replay_matches_live_decode_for_any_chunk_size() {
        let path = temp_path("replay");
        std::fs::write(&path, STREAM).unwrap();

        let mut live: Vec<SimulationEvent> = Vec::new();
        NdjsonDecoder::new().feed(STREAM, &mut live);

        for chunk_size in [1, 3, 17, DEFAULT_REPLAY_CHUNK] {
            let mut replayed: Vec<SimulationEvent> = Vec::new();
            let summary = replay_file(&path, chunk_size, &mut replayed).await.unwrap();
            assert_eq!(replayed, live, "chunk size {}", chunk_size);
            assert_eq!(summary.stats.malformed, 1);
            assert!(summary.dropped_tail.is_some());
        }

        std::fs::remove_file(&path).ok();
    }

    #[tokio::test]
    async fn test_replay_missing_file_errors() {
        let mut events: Vec<SimulationEvent> = Vec::new();
        let err = replay_file(Path::new("/nonexistent/mailsim.ndjson"), 16, &mut events)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Failed to open recording"));
    }
}
