//! Handles normalizer: `windows.handles` rows to [`HandleEntry`].

use serde::{Deserialize, Serialize};
use voltab::{RawRow, RowReader};

/// An open handle. `pid` is `None` when the owning process column is
/// unreadable; such rows still count toward image-level handle totals.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct HandleEntry {
    pub pid: Option<u64>,
    pub offset: Option<String>,
    pub handle_value: Option<String>,
    pub handle_type: Option<String>,
    pub granted_access: Option<String>,
    pub name: Option<String>,
}

pub fn normalize(rows: &[RawRow]) -> Vec<HandleEntry> {
    rows.iter()
        .map(|row| {
            let r = RowReader::new(row);
            HandleEntry {
                pid: r.opt_int(&["PID"]),
                offset: r.text(&["Offset", "Offset(V)", "Offset(P)"]),
                handle_value: r.text(&["HandleValue"]),
                handle_type: r.text(&["Type"]),
                granted_access: r.text(&["GrantedAccess"]),
                name: r.text(&["Name"]),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use voltab::parse_table;

    const HANDLES: &str = "\
PID Process Offset HandleValue Type GrantedAccess Name
4 System 0xe0000a2a1080 0x4 Process 0x1fffff System Pid 4
???? System 0xe0000a2a2080 0x8 Thread 0x1fffff Tid 12 Pid 4
612 lsass.exe 0xe0000a2b3000 0x1c Key 0x20019 MACHINE\\SYSTEM\\CONTROLSET001
";

    #[test]
    fn test_handles_rows() {
        let handles = normalize(&parse_table(HANDLES));
        assert_eq!(handles.len(), 3);

        assert_eq!(handles[0].pid, Some(4));
        assert_eq!(handles[0].handle_type.as_deref(), Some("Process"));
        assert_eq!(handles[0].name.as_deref(), Some("System Pid 4"));

        // unreadable pid kept, not dropped
        assert_eq!(handles[1].pid, None);
        assert_eq!(handles[1].handle_value.as_deref(), Some("0x8"));

        assert_eq!(handles[2].granted_access.as_deref(), Some("0x20019"));
        assert_eq!(handles[2].offset.as_deref(), Some("0xe0000a2b3000"));
    }

    #[test]
    fn test_handles_physical_offset_column() {
        let row = RawRow::from_pairs([("PID", "8"), ("Offset(P)", "0x1000"), ("Type", "File")]);
        let handles = normalize(&[row]);
        assert_eq!(handles[0].offset.as_deref(), Some("0x1000"));
        assert_eq!(handles[0].name, None);
    }
}
