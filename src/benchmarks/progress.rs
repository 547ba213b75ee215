//! Append-only progress log of a benchmark run.

use log::info;
use std::sync::{Arc, Mutex};

/// Receives one line per micro-step of a run.
pub trait ProgressSink: Send + Sync {
    fn log(&self, line: &str);
}

/// Forwards lines to the `log` facade at info level.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogProgressSink;

impl ProgressSink for LogProgressSink {
    fn log(&self, line: &str) {
        info!("{}", line);
    }
}

/// Prints lines to standard output.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdoutProgressSink;

impl ProgressSink for StdoutProgressSink {
    fn log(&self, line: &str) {
        println!("{}", line);
    }
}

/// Keeps lines in memory. Clones share the same log.
#[derive(Debug, Clone, Default)]
pub struct MemoryProgressSink {
    lines: Arc<Mutex<Vec<String>>>,
}

impl MemoryProgressSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl ProgressSink for MemoryProgressSink {
    fn log(&self, line: &str) {
        self.lines
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(line.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_sink_shares_lines() {
        let sink = MemoryProgressSink::new();
        let clone = sink.clone();
        clone.log("Test started.");
        sink.log("Sample 0 ...");
        assert_eq!(sink.lines(), vec!["Test started.", "Sample 0 ..."]);
    }
}
