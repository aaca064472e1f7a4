//! Splitting of the composite exception header.
//!
//! The runtime prints every exception of a chain on the first line(s),
//! outermost first, and later marks the end of each inner exception's frames
//! with a boundary line. When the number of header segments agrees with the
//! number of boundaries, headers can be moved next to their own frames,
//! innermost exception first.

use serde::Serialize;

use super::grammar::split_chained_message;
use crate::error::{StackmarkError, Result};

/// One `Type: message` segment of the header
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExceptionHeader {
    pub type_name: String,
    pub message: String,
}

impl ExceptionHeader {
    pub fn parse(segment: &str) -> Result<Self> {
        let (type_name, message) = segment
            .split_once(": ")
            .filter(|(type_name, _)| !type_name.is_empty())
            .ok_or_else(|| StackmarkError::MalformedExceptionMessage(segment.to_string()))?;

        Ok(Self {
            type_name: type_name.to_string(),
            message: message.to_string(),
        })
    }
}

/// Chain headers in emission order, consumed one boundary at a time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExceptionChain {
    headers: Vec<ExceptionHeader>,
    next: usize,
}

impl ExceptionChain {
    /// Splits `header` if the segment count equals the number of `inner_boundary`
    /// lines in `body` plus one. `Ok(None)` means the header stays as it is.
    pub fn split(header: &str, body: &[&str], inner_boundary: &str) -> Result<Option<Self>> {
        let segments = split_chained_message(header);
        if segments.is_empty() {
            return Ok(None);
        }

        let boundaries = count_boundaries(body, inner_boundary);
        if segments.len() != boundaries + 1 {
            return Ok(None);
        }

        let headers = segments
            .into_iter()
            .rev()
            .map(ExceptionHeader::parse)
            .collect::<Result<Vec<_>>>()?;

        Ok(Some(Self { headers, next: 0 }))
    }

    /// The next header with its position, or `None` once all are used
    pub fn next_header(&mut self) -> Option<(usize, &ExceptionHeader)> {
        let index = self.next;
        let header = self.headers.get(index)?;
        self.next += 1;
        Some((index, header))
    }
}

/// Lines consisting of the marker and surrounding whitespace only
pub fn count_boundaries(lines: &[&str], marker: &str) -> usize {
    lines.iter().filter(|line| line.trim() == marker).count()
}
