//! LdrModules normalizer: `windows.ldrmodules` rows to [`LdrModuleEntry`].
//!
//! ldrmodules cross-checks each mapped image against the three PEB loader
//! lists. A module missing from a list it should be in is the classic
//! unlinked-DLL signal.
//!
//! Two renderer defects are repaired here:
//! - the columns can shift by one so that `Base` holds the process name and
//!   the real base address lands in `InLoad`
//! - `MappedPath` can arrive as `False\t\Windows\...`, a stray flag glued to
//!   the path with a tab

use serde::{Deserialize, Serialize};
use voltab::{RawRow, RowReader};

/// One mapped image as seen by the three loader lists.
/// `pid` is `None` when the PID cell is unreadable.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct LdrModuleEntry {
    pub pid: Option<u64>,
    pub process_name: Option<String>,
    pub base_address: Option<String>,
    pub in_load: bool,
    pub in_init: bool,
    pub in_mem: bool,
    pub mapped_path: String,
}

pub fn normalize(rows: &[RawRow]) -> Vec<LdrModuleEntry> {
    rows.iter().map(read_module).collect()
}

fn read_module(row: &RawRow) -> LdrModuleEntry {
    let r = RowReader::new(row);

    let mut base_address = r.text(&["Base"]);
    if base_address.as_deref().is_some_and(|b| !b.starts_with("0x")) {
        base_address = r.text(&["InLoad"]);
    }

    LdrModuleEntry {
        pid: r.opt_int(&["Pid", "PID"]),
        process_name: r.text(&["Process"]),
        base_address,
        in_load: r.flag(&["InLoad"]),
        in_init: r.flag(&["InInit"]),
        in_mem: r.flag(&["InMem"]),
        mapped_path: clean_mapped_path(r.raw(&["MappedPath"]).unwrap_or("")),
    }
}

/// Keep only the text after the last tab.
fn clean_mapped_path(raw: &str) -> String {
    raw.rsplit('\t').next().unwrap_or(raw).trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use voltab::parse_table;

    #[test]
    fn test_ldrmodules_clean_row() {
        let text = "\
Pid Process Base InLoad InInit InMem MappedPath
612 lsass.exe 0x7ff7c0e10000 True False True \\Windows\\System32\\lsass.exe
";
        let mods = normalize(&parse_table(text));
        assert_eq!(mods.len(), 1);
        let m = &mods[0];
        assert_eq!(m.pid, Some(612));
        assert_eq!(m.base_address.as_deref(), Some("0x7ff7c0e10000"));
        assert!(m.in_load);
        assert!(!m.in_init);
        assert!(m.in_mem);
        assert_eq!(m.mapped_path, "\\Windows\\System32\\lsass.exe");
    }

    #[test]
    fn test_ldrmodules_shifted_base_recovered() {
        let row = RawRow::from_pairs([
            ("Pid", "700"),
            ("Process", "svchost.exe"),
            ("Base", "svchost.exe"),
            ("InLoad", "0x7ffb10000000"),
            ("InInit", "False"),
            ("InMem", "False"),
            ("MappedPath", "False\t\\Windows\\System32\\evil.dll  "),
        ]);
        let mods = normalize(&[row]);
        let m = &mods[0];
        assert_eq!(m.base_address.as_deref(), Some("0x7ffb10000000"));
        assert!(!m.in_load);
        assert_eq!(m.mapped_path, "\\Windows\\System32\\evil.dll");
    }

    #[test]
    fn test_mapped_path_uses_last_tab_segment() {
        assert_eq!(clean_mapped_path("True\tFalse\t\\a\\b.dll"), "\\a\\b.dll");
        assert_eq!(clean_mapped_path(" \\a\\b.dll "), "\\a\\b.dll");
        assert_eq!(clean_mapped_path(""), "");
    }

    #[test]
    fn test_ldrmodules_missing_columns() {
        let row = RawRow::from_pairs([("PID", "9")]);
        let m = &normalize(&[row])[0];
        assert_eq!(m.pid, Some(9));
        assert_eq!(m.base_address, None);
        assert!(!m.in_load && !m.in_init && !m.in_mem);
        assert_eq!(m.mapped_path, "");
    }
}
