//! Output aggregation.

use std::io::{self, Write};

use crossbeam_channel::Receiver;

use super::job::{JobOutput, Outcome};
use super::RunSummary;

/// Writes job blocks to the sink in arrival order.
///
/// Each block is written whole, so blocks of different sources never
/// interleave. Draining ends when every sender is gone.
pub struct OutputAggregator<'a, W: Write> {
    sink: &'a mut W,
    summary: RunSummary,
    error: Option<io::Error>,
}

impl<'a, W: Write> OutputAggregator<'a, W> {
    pub fn new(sink: &'a mut W) -> Self {
        Self {
            sink,
            summary: RunSummary::default(),
            error: None,
        }
    }

    /// Write one block and tally its outcome.
    pub fn push(&mut self, output: &JobOutput) {
        self.summary.record(output.outcome);

        // After a sink failure keep tallying but stop writing.
        if self.error.is_some() {
            return;
        }
        let written = self
            .sink
            .write_all(output.block.as_bytes())
            .and_then(|()| self.sink.flush());
        if let Err(e) = written {
            self.error = Some(e);
        }
    }

    /// Consume blocks until the channel disconnects.
    pub fn drain(mut self, blocks: Receiver<JobOutput>) -> io::Result<RunSummary> {
        for output in blocks.iter() {
            self.push(&output);
        }
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.summary),
        }
    }
}

impl RunSummary {
    fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Analyzed { exit_code } => {
                self.analyzed += 1;
                if exit_code != Some(0) {
                    self.analyzer_failures += 1;
                }
            }
            Outcome::Cached => self.cached += 1,
            Outcome::Skipped => self.skipped += 1,
            Outcome::Failed => self.errors += 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn output(name: &str, outcome: Outcome) -> JobOutput {
        JobOutput {
            source: PathBuf::from(name),
            outcome,
            block: format!("analyzer {name} --\nresult for {name}\n"),
        }
    }

    struct FailingSink;

    impl Write for FailingSink {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_writes_in_arrival_order_and_terminates() {
        let (tx, rx) = crossbeam_channel::unbounded();
        tx.send(output("b.m", Outcome::Analyzed { exit_code: Some(0) })).unwrap();
        tx.send(output("a.m", Outcome::Cached)).unwrap();
        tx.send(output("c.m", Outcome::Analyzed { exit_code: Some(1) })).unwrap();
        drop(tx);

        let mut sink = Vec::new();
        let summary = OutputAggregator::new(&mut sink).drain(rx).unwrap();

        let text = String::from_utf8(sink).unwrap();
        assert_eq!(
            text,
            "analyzer b.m --\nresult for b.m\n\
             analyzer a.m --\nresult for a.m\n\
             analyzer c.m --\nresult for c.m\n"
        );
        assert_eq!(summary.analyzed, 2);
        assert_eq!(summary.analyzer_failures, 1);
        assert_eq!(summary.cached, 1);
    }

    #[test]
    fn test_empty_channel() {
        let (tx, rx) = crossbeam_channel::unbounded::<JobOutput>();
        drop(tx);

        let mut sink = Vec::new();
        let summary = OutputAggregator::new(&mut sink).drain(rx).unwrap();
        assert!(sink.is_empty());
        assert_eq!(summary, RunSummary::default());
    }

    #[test]
    fn test_sink_error_still_drains() {
        let (tx, rx) = crossbeam_channel::unbounded();
        tx.send(output("a.m", Outcome::Skipped)).unwrap();
        tx.send(output("b.m", Outcome::Skipped)).unwrap();
        drop(tx);

        let mut sink = FailingSink;
        let err = OutputAggregator::new(&mut sink).drain(rx).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }
}
