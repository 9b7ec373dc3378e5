use std::fs::File;
use std::io::{self, BufRead, BufReader, Lines};
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use daqdiag_core::{DaqConfig, EventData};

/// One line of the input stream.
#[derive(Debug, Deserialize)]
#[serde(tag = "record", rename_all = "snake_case")]
pub enum Record {
    DaqConfig(DaqConfig),
    Event(EventData),
}

/// Open `path` for reading; `-` means stdin.
pub fn open(path: &Path) -> Result<Box<dyn BufRead>> {
    if path == Path::new("-") {
        return Ok(Box::new(BufReader::new(io::stdin())));
    }
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    Ok(Box::new(BufReader::new(file)))
}

/// Newline-delimited JSON records. Blank lines are skipped.
pub struct Records<R> {
    lines: Lines<R>,
    line: usize,
}

impl<R: BufRead> Records<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line: 0,
        }
    }
}

impl<R: BufRead> Iterator for Records<R> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = self.lines.next()?;
            self.line += 1;
            let n = self.line;

            let line = match line.with_context(|| format!("failed to read line {}", n)) {
                Ok(line) => line,
                Err(e) => return Some(Err(e)),
            };
            if line.trim().is_empty() {
                continue;
            }
            return Some(
                serde_json::from_str(&line).with_context(|| format!("malformed record on line {}", n)),
            );
        }
    }
}
