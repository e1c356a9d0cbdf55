//! RowReader: typed field access over a [`RawRow`].
//!
//! Column names drift between Volatility releases (`PID` vs `Pid`,
//! `Start VPN` vs `Start`), so every accessor takes an ordered list of
//! accepted names. Each name is tried as an exact match first; if none hit,
//! the list is retried against a loose form of the column name (lowercase,
//! spaces and underscores removed).

use crate::types::RawRow;

/// Cell values the renderer prints for "no value".
pub const SENTINELS: &[&str] = &["", "N/A", "NA", "-", "--"];

/// Returns true if `value` is one of the renderer's "no value" tokens.
pub fn is_sentinel(value: &str) -> bool {
    SENTINELS.contains(&value.trim())
}

/// Parse a decimal, non-negative integer cell. Sentinels and garbage give `None`.
pub fn parse_int(value: &str) -> Option<u64> {
    let value = value.trim();
    if is_sentinel(value) {
        return None;
    }
    value.parse::<u64>().ok()
}

/// Parse an address cell: `0x`-prefixed hex or plain decimal.
pub fn parse_address(value: &str) -> Option<u64> {
    let value = value.trim();
    if let Some(hex) = value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        u64::from_str_radix(hex, 16).ok()
    } else {
        value.parse::<u64>().ok()
    }
}

fn loose(name: &str) -> String {
    name.chars()
        .filter(|c| *c != ' ' && *c != '_')
        .flat_map(char::to_lowercase)
        .collect()
}

/// Typed accessor for one row.
#[derive(Debug, Clone, Copy)]
pub struct RowReader<'a> {
    row: &'a RawRow,
}

impl<'a> RowReader<'a> {
    pub fn new(row: &'a RawRow) -> Self {
        RowReader { row }
    }

    pub fn row(&self) -> &'a RawRow {
        self.row
    }

    /// Raw cell for the first accepted name present in the row.
    pub fn raw(&self, names: &[&str]) -> Option<&'a str> {
        if let Some(v) = names.iter().find_map(|n| self.row.get(n)) {
            return Some(v);
        }
        let wanted: Vec<String> = names.iter().map(|n| loose(n)).collect();
        wanted.iter().find_map(|w| {
            self.row
                .iter()
                .find(|(col, _)| loose(col) == *w)
                .map(|(_, v)| v)
        })
    }

    /// Cell text as an owned string.
    pub fn text(&self, names: &[&str]) -> Option<String> {
        self.raw(names).map(str::to_string)
    }

    /// Integer with a fallback for missing, sentinel or unparsable cells.
    pub fn int(&self, names: &[&str], default: u64) -> u64 {
        self.opt_int(names).unwrap_or(default)
    }

    /// Integer, or `None` for missing, sentinel or unparsable cells.
    pub fn opt_int(&self, names: &[&str]) -> Option<u64> {
        self.raw(names).and_then(parse_int)
    }

    /// Case-insensitive `true` literal; anything else (including absence) is false.
    pub fn flag(&self, names: &[&str]) -> bool {
        self.raw(names)
            .map(|v| v.trim().eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    }

    /// Ternary flag using the renderer's exact `True` casing.
    ///
    /// `None` means the column is absent, which is different from a `False`
    /// cell and must not be counted as one.
    pub fn exact_true(&self, names: &[&str]) -> Option<bool> {
        self.raw(names).map(|v| v == "True")
    }
}
