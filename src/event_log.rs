//! Append-only event log of call entries and exits
//!
//! Each tracer writes one line when it is armed and one when it is disposed:
//!
//! ```text
//! Entering parse
//! Exiting parse (Execution Time: 42 µs)
//! ```
//!
//! The sink is opened once and held for the session's lifetime behind its own
//! lock, so lines from concurrent threads never interleave. Write failures are
//! counted and reported through `tracing`; they never reach the instrumented
//! code.

use crate::error::{Result, TraceError};
use crate::frame::Frame;
use std::fmt;
use std::fs::OpenOptions;
use std::io::{self, LineWriter, Write};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

type Sink = Box<dyn Write + Send>;

/// Serialized line sink for `Entering` / `Exiting` events
pub struct EventLog {
    writer: Mutex<Option<Sink>>,
    target: String,
    failures: AtomicU64,
}

impl EventLog {
    /// Log that drops every event
    pub fn disabled() -> Self {
        Self {
            writer: Mutex::new(None),
            target: "<disabled>".to_string(),
            failures: AtomicU64::new(0),
        }
    }

    /// Open (or create) a log file
    ///
    /// With `append` the existing contents are kept, matching repeated runs
    /// of an instrumented program; otherwise the file is truncated.
    pub fn open<P: AsRef<Path>>(path: P, append: bool) -> Result<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .append(append)
            .truncate(!append)
            .open(path)
            .map_err(|e| TraceError::sink(path.display().to_string(), e))?;

        tracing::debug!(path = %path.display(), append, "event log opened");
        Ok(Self::from_writer(LineWriter::new(file), path.display().to_string()))
    }

    /// Log into an arbitrary writer
    pub fn from_writer<W: Write + Send + 'static>(writer: W, target: impl Into<String>) -> Self {
        Self {
            writer: Mutex::new(Some(Box::new(writer))),
            target: target.into(),
            failures: AtomicU64::new(0),
        }
    }

    /// Log into memory, returning a handle to read the lines back
    ///
    /// # Example
    ///
    /// ```
    /// use calltrace::event_log::EventLog;
    /// use calltrace::frame::Frame;
    ///
    /// let (log, sink) = EventLog::in_memory();
    /// log.record_entry(&Frame::new("main").unwrap());
    /// assert_eq!(sink.lines(), vec!["Entering main"]);
    /// ```
    pub fn in_memory() -> (Self, MemorySink) {
        let sink = MemorySink::default();
        (Self::from_writer(sink.clone(), "<memory>"), sink)
    }

    /// Whether events are written anywhere
    pub fn is_enabled(&self) -> bool {
        self.lock().is_some()
    }

    /// Description of the destination (path, `<memory>`, ...)
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Number of failed writes so far
    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    /// Write `Entering <frame>`
    pub fn record_entry(&self, frame: &Frame) {
        self.write_line(format_args!("Entering {frame}"));
    }

    /// Write `Exiting <frame> (Execution Time: <duration> µs)`
    pub fn record_exit(&self, frame: &Frame, duration_us: u64) {
        self.write_line(format_args!(
            "Exiting {frame} (Execution Time: {duration_us} µs)"
        ));
    }

    /// Flush buffered lines to the destination
    pub fn flush(&self) -> Result<()> {
        match self.lock().as_mut() {
            Some(writer) => writer
                .flush()
                .map_err(|e| TraceError::sink(self.target.clone(), e)),
            None => Ok(()),
        }
    }

    fn write_line(&self, line: fmt::Arguments<'_>) {
        let mut guard = self.lock();
        let Some(writer) = guard.as_mut() else {
            return;
        };

        if let Err(e) = writeln!(writer, "{line}") {
            let previous = self.failures.fetch_add(1, Ordering::Relaxed);
            if previous == 0 {
                tracing::warn!(target_sink = %self.target, error = %e, "event log write failed");
            } else {
                tracing::debug!(target_sink = %self.target, error = %e, "event log write failed");
            }
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<Sink>> {
        self.writer.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for EventLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventLog")
            .field("target", &self.target)
            .field("failures", &self.failures())
            .finish_non_exhaustive()
    }
}

impl Drop for EventLog {
    fn drop(&mut self) {
        if let Err(e) = self.flush() {
            tracing::warn!(error = %e, "event log flush on close failed");
        }
    }
}

/// Shared in-memory buffer backing [`EventLog::in_memory`]
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl MemorySink {
    /// Everything written so far
    pub fn contents(&self) -> String {
        let buffer = self.buffer.lock().unwrap_or_else(PoisonError::into_inner);
        String::from_utf8_lossy(&buffer).into_owned()
    }

    /// Written lines without terminators
    pub fn lines(&self) -> Vec<String> {
        self.contents().lines().map(str::to_string).collect()
    }
}

impl Write for MemorySink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingWriter;

    impl Write for FailingWriter {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn frame(name: &str) -> Frame {
        Frame::new(name).unwrap()
    }

    #[test]
    fn test_entry_and_exit_format() {
        let (log, sink) = EventLog::in_memory();
        log.record_entry(&frame("functionA"));
        log.record_exit(&frame("functionA"), 17);

        assert_eq!(
            sink.lines(),
            vec![
                "Entering functionA",
                "Exiting functionA (Execution Time: 17 µs)"
            ]
        );
    }

    #[test]
    fn test_disabled_log_writes_nothing() {
        let log = EventLog::disabled();
        assert!(!log.is_enabled());
        log.record_entry(&frame("a"));
        assert_eq!(log.failures(), 0);
        assert!(log.flush().is_ok());
    }

    #[test]
    fn test_write_failures_are_counted_not_raised() {
        let log = EventLog::from_writer(FailingWriter, "broken");
        log.record_entry(&frame("a"));
        log.record_exit(&frame("a"), 1);
        assert_eq!(log.failures(), 2);
    }

    #[test]
    fn test_open_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("event_log.txt");

        {
            let log = EventLog::open(&path, true).unwrap();
            log.record_entry(&frame("first"));
        }
        {
            let log = EventLog::open(&path, true).unwrap();
            log.record_entry(&frame("second"));
        }

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "Entering first\nEntering second\n");
    }

    #[test]
    fn test_open_truncates_without_append() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("event_log.txt");
        std::fs::write(&path, "stale\n").unwrap();

        let log = EventLog::open(&path, false).unwrap();
        log.record_entry(&frame("fresh"));
        drop(log);

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "Entering fresh\n");
    }

    #[test]
    fn test_open_missing_directory_is_sink_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("event_log.txt");

        let err = EventLog::open(&path, true).unwrap_err();
        assert!(matches!(err, TraceError::SinkUnavailable { .. }));
    }

    #[test]
    fn test_concurrent_lines_do_not_interleave() {
        let (log, sink) = EventLog::in_memory();
        let log = Arc::new(log);

        let handles: Vec<_> = (0..4)
            .map(|t| {
                let log = Arc::clone(&log);
                std::thread::spawn(move || {
                    let f = frame(&format!("worker_{t}"));
                    for _ in 0..100 {
                        log.record_entry(&f);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let lines = sink.lines();
        assert_eq!(lines.len(), 400);
        assert!(lines.iter().all(|l| l.starts_with("Entering worker_")));
    }
}
