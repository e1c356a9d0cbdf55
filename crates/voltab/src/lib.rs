//! Parser for the plain-text tables Volatility 3 prints for each plugin.
//!
//! This crate provides:
//!
//! - `parse_table` / `parse_table_file`: banner skipping, header detection and
//!   whitespace-aligned row splitting, dropping any line that does not fit the
//!   header (hexdumps, disassembly, wrapped text)
//! - `RawRow`: one data line as an ordered column → cell mapping
//! - `RowReader`: typed access to a row with ordered column-name synonyms and
//!   the renderer's "no value" sentinels
//!
//! # Example
//!
//! ```rust
//! use voltab::{parse_table, RowReader};
//!
//! let rows = parse_table("PID PPID ImageFileName\n4 0 System\n");
//! let pid = RowReader::new(&rows[0]).int(&["PID"], 0);
//! assert_eq!(pid, 4);
//! ```

pub mod error;
pub mod parser;
pub mod reader;
pub mod types;

// Re-export key types at crate root.
pub use error::{TableError, TableResult};
pub use parser::{parse_table, parse_table_file};
pub use reader::{is_sentinel, parse_address, parse_int, RowReader};
pub use types::RawRow;
