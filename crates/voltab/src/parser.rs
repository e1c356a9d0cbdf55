//! Text table parser for Volatility 3 console renderer output.
//!
//! The renderer prints a couple of startup lines, one header line, then one
//! whitespace-aligned line per result. Some plugins interleave hexdumps or
//! disassembly (malfind) and some cells contain spaces (paths, timestamps), so
//! the only structural guarantee is the header's column count.

use crate::error::{TableError, TableResult};
use crate::types::RawRow;
use regex::Regex;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;
use tracing::debug;

/// Prefixes of the tool's startup chatter printed before the header.
pub const BANNER_PREFIXES: &[&str] = &["Volatility", "Progress"];

/// Header columns that the renderer prints as two words.
const SPLIT_HEADER_COLUMNS: &[(&str, &str)] = &[("File", "output")];

static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));

/// Parse a report read from disk.
///
/// Invalid UTF-8 is replaced rather than rejected; the renderer occasionally
/// prints raw bytes from process memory.
pub fn parse_table_file(path: impl AsRef<Path>) -> TableResult<Vec<RawRow>> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(TableError::FileNotFound(path.display().to_string()));
    }

    let bytes =
        fs::read(path).map_err(|e| TableError::Io(format!("reading {}: {}", path.display(), e)))?;

    Ok(parse_table(&String::from_utf8_lossy(&bytes)))
}

/// Parse report text into rows keyed by header column.
///
/// Lines whose token count differs from the header's are dropped. Text with
/// no header yields an empty vec.
pub fn parse_table(text: &str) -> Vec<RawRow> {
    let mut lines = text.lines().filter(|l| !l.trim().is_empty());

    let header_line = loop {
        match lines.next() {
            Some(line) if is_banner(line) => continue,
            Some(line) => break line,
            None => return Vec::new(),
        }
    };

    let headers = split_header(header_line);
    let width = headers.len();

    let mut rows = Vec::new();
    let mut dropped = 0usize;

    for line in lines {
        let parts: Vec<&str> = WHITESPACE_RUN.splitn(line.trim(), width).collect();
        if parts.len() != width {
            dropped += 1;
            continue;
        }
        rows.push(RawRow::from_pairs(headers.iter().map(String::as_str).zip(parts)));
    }

    debug!(
        "parsed table: {} columns, {} rows, {} non-tabular lines dropped",
        width,
        rows.len(),
        dropped
    );
    rows
}

fn is_banner(line: &str) -> bool {
    BANNER_PREFIXES.iter().any(|p| line.starts_with(p))
}

/// Split a header line into column names, re-joining known two-word columns
/// when they end the header.
fn split_header(line: &str) -> Vec<String> {
    let mut headers: Vec<String> = WHITESPACE_RUN
        .split(line.trim())
        .map(str::to_string)
        .collect();

    let n = headers.len();
    if n >= 2 {
        for (first, second) in SPLIT_HEADER_COLUMNS {
            if headers[n - 2] == *first && headers[n - 1] == *second {
                headers.truncate(n - 2);
                headers.push(format!("{} {}", first, second));
                break;
            }
        }
    }

    headers
}
