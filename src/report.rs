//! Tabular report output

use crate::tracker::TimeSample;
use std::io::{self, Write};
use std::time::Duration;

pub const HEADER: &str = "       Elapsed   Value Interval";

/// Writes one line per sample, repeating the header every `header_every` rows
#[derive(Debug)]
pub struct Reporter<W> {
    out: W,
    header_every: u64,
}

impl<W: Write> Reporter<W> {
    pub fn new(out: W, header_every: u64) -> Self {
        Self {
            out,
            header_every: header_every.max(1),
        }
    }

    /// Write `sample`, preceded by the header when it opens a new block.
    /// The output is flushed so rows appear as they happen.
    pub fn write_sample(&mut self, sample: &TimeSample) -> io::Result<()> {
        if sample.seq % self.header_every == 0 {
            writeln!(self.out, "{}", HEADER)?;
        }
        writeln!(self.out, "{}", format_row(sample))?;
        self.out.flush()
    }

    /// Free-form line, used for the `pid` banner
    pub fn write_line(&mut self, line: &str) -> io::Result<()> {
        writeln!(self.out, "{}", line)?;
        self.out.flush()
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

/// Render a single data row without the trailing newline
pub fn format_row(sample: &TimeSample) -> String {
    let mut row = format!("{:<7} {:6.2}", sample.label.as_str(), secs(sample.elapsed));
    if let Some(timer) = sample.timer {
        row.push_str(&format!(
            "  {:6.2}  {:6.2}",
            secs(timer.remaining),
            secs(timer.interval)
        ));
    }
    row
}

fn secs(d: Duration) -> f64 {
    d.as_secs_f64()
}
