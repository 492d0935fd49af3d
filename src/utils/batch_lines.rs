//! Parsing of plain-text redirect batches.
//!
//! One mapping per line, source and destination separated by `|`:
//!
//! ```text
//! # comments and blank lines are skipped
//! /old-page|https://example.com/new
//! /retired-page
//! ```
//!
//! A line without `|` has no destination yet.

/// A malformed line in a batch file.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
#[error("line {line}: missing source URL")]
pub struct BatchLineError {
    pub line: usize,
}

/// Parses batch text into `(source, destination)` pairs, in file order.
///
/// # Errors
///
/// Returns [`BatchLineError`] for the first line whose source part is empty.
pub fn parse_batch_lines(input: &str) -> Result<Vec<(String, Option<String>)>, BatchLineError> {
    let mut pairs = Vec::new();

    for (idx, raw) in input.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let (source, destination) = match line.split_once('|') {
            Some((source, destination)) => (source.trim(), Some(destination.trim())),
            None => (line, None),
        };

        if source.is_empty() {
            return Err(BatchLineError { line: idx + 1 });
        }

        let destination = destination.filter(|d| !d.is_empty()).map(str::to_string);
        pairs.push((source.to_string(), destination));
    }

    Ok(pairs)
}
