//! DllList normalizer: `windows.dlllist` rows to [`DllEntry`].
//!
//! The renderer prints LoadTime as `2024-01-15 10:30:00.000000 UTC`, which
//! the table parser spreads over several cells (and the trailing
//! `File output` column). Every column outside the fixed set is glued back
//! together, in order, as the load time.

use serde::{Deserialize, Serialize};
use voltab::{RawRow, RowReader};

/// Columns with a fixed meaning; everything else is load-time residue.
const FIXED_COLUMNS: &[&str] = &["PID", "Process", "Base", "Size", "Name", "Path"];

/// A DLL loaded into a process. `pid` is `None` when the PID cell is
/// unreadable; the DLL still counts at image level.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct DllEntry {
    pub pid: Option<u64>,
    pub process_name: Option<String>,
    pub base_address: Option<String>,
    pub size: Option<String>,
    pub module_name: Option<String>,
    pub path: Option<String>,
    pub load_time: String,
}

pub fn normalize(rows: &[RawRow]) -> Vec<DllEntry> {
    rows.iter().map(read_dll).collect()
}

fn read_dll(row: &RawRow) -> DllEntry {
    let r = RowReader::new(row);

    let load_time = row
        .iter()
        .filter(|(col, _)| !FIXED_COLUMNS.contains(col))
        .map(|(_, v)| v)
        .collect::<Vec<_>>()
        .join(" ")
        .trim()
        .to_string();

    DllEntry {
        pid: r.opt_int(&["PID"]),
        process_name: r.text(&["Process"]),
        base_address: r.text(&["Base"]),
        size: r.text(&["Size"]),
        module_name: r.text(&["Name"]),
        path: r.text(&["Path"]),
        load_time,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use voltab::parse_table;

    #[test]
    fn test_dlllist_load_time_reassembled() {
        let row = RawRow::from_pairs([
            ("PID", "1234"),
            ("Process", "notepad.exe"),
            ("Base", "0x7ff6a0000000"),
            ("Size", "0x38000"),
            ("Name", "notepad.exe"),
            ("Path", "C:\\Windows\\notepad.exe"),
            ("LoadTime", "2024-01-15"),
            ("File output", "10:30:00.000000 UTC Disabled"),
        ]);
        let dlls = normalize(&[row]);
        assert_eq!(dlls.len(), 1);
        assert_eq!(dlls[0].pid, Some(1234));
        assert_eq!(dlls[0].module_name.as_deref(), Some("notepad.exe"));
        assert_eq!(dlls[0].load_time, "2024-01-15 10:30:00.000000 UTC Disabled");
    }

    #[test]
    fn test_dlllist_from_table() {
        let text = "\
PID Process Base Size Name Path LoadTime File output
1234 notepad.exe 0x7ffb0000 0x1f8000 ntdll.dll C:\\Windows\\SYSTEM32\\ntdll.dll 2024-01-15 10:30:00.000000 UTC Disabled
";
        let dlls = normalize(&parse_table(text));
        assert_eq!(dlls.len(), 1);
        assert_eq!(dlls[0].path.as_deref(), Some("C:\\Windows\\SYSTEM32\\ntdll.dll"));
        assert_eq!(dlls[0].load_time, "2024-01-15 10:30:00.000000 UTC Disabled");
    }

    #[test]
    fn test_dlllist_no_extra_columns() {
        let row = RawRow::from_pairs([("PID", "x"), ("Name", "kernel32.dll")]);
        let dlls = normalize(&[row]);
        assert_eq!(dlls[0].pid, None);
        assert_eq!(dlls[0].load_time, "");
        assert_eq!(dlls[0].path, None);
    }
}
