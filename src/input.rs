//! Streaming reader for prediction records stored as JSON Lines.
//!
//! Each non-blank line holds one [`RawPrediction`]. Records are parsed on
//! demand so arbitrarily large prediction dumps can be inspected without
//! loading them into memory.

use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::{Path, PathBuf};

use crate::error::InputError;
use crate::record::RawPrediction;

/// Lazily parses prediction records, one per line.
#[derive(Debug)]
pub struct JsonLinesReader<R: BufRead> {
    origin: PathBuf,
    lines: Lines<R>,
    line: usize,
}

impl JsonLinesReader<BufReader<File>> {
    /// Opens a predictions file.
    ///
    /// # Errors
    /// Returns [`InputError::Read`] if the file cannot be opened.
    pub fn open(path: &Path) -> Result<Self, InputError> {
        let file = File::open(path).map_err(|source| InputError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::with_origin(BufReader::new(file), path))
    }
}

impl<R: BufRead> JsonLinesReader<R> {
    /// Reads records from an already open stream.
    pub fn new(reader: R) -> Self {
        Self::with_origin(reader, Path::new("<stream>"))
    }

    fn with_origin(reader: R, origin: &Path) -> Self {
        Self {
            origin: origin.to_path_buf(),
            lines: reader.lines(),
            line: 0,
        }
    }
}

impl<R: BufRead> Iterator for JsonLinesReader<R> {
    type Item = Result<RawPrediction, InputError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let text = self.lines.next()?;
            self.line += 1;
            let text = match text {
                Ok(text) => text,
                Err(source) => {
                    return Some(Err(InputError::Read {
                        path: self.origin.clone(),
                        source,
                    }))
                }
            };
            if text.trim().is_empty() {
                continue;
            }
            return Some(serde_json::from_str(&text).map_err(|err| InputError::MalformedRecord {
                line: self.line,
                message: err.to_string(),
            }));
        }
    }
}

/// Counts the records in a predictions file without parsing them.
///
/// # Errors
/// Returns [`InputError::Read`] if the file cannot be read.
pub fn count_records(path: &Path) -> Result<usize, InputError> {
    let read_err = |source| InputError::Read {
        path: path.to_path_buf(),
        source,
    };
    let reader = BufReader::new(File::open(path).map_err(read_err)?);
    let mut count = 0;
    for line in reader.lines() {
        if !line.map_err(read_err)?.trim().is_empty() {
            count += 1;
        }
    }
    Ok(count)
}
