//! PsList normalizer: `windows.pslist` rows to [`ProcessEntry`].
//!
//! The process list is the backbone of every per-process feature, so no row
//! is ever dropped here: a garbled numeric cell degrades to 0 instead of
//! losing the process.

use serde::{Deserialize, Serialize};
use voltab::{RawRow, RowReader};

/// One process from the active process list.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ProcessEntry {
    pub pid: u64,
    pub parent_pid: u64,
    pub image_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<String>,
    pub thread_count: u64,
    pub handle_count: u64,
    pub session_id: u64,
    pub is_wow64: bool,
    pub create_time: Option<String>,
    pub exit_time: Option<String>,
}

pub fn normalize(rows: &[RawRow]) -> Vec<ProcessEntry> {
    rows.iter().map(read_process).collect()
}

fn read_process(row: &RawRow) -> ProcessEntry {
    let r = RowReader::new(row);
    ProcessEntry {
        pid: r.int(&["PID"], 0),
        parent_pid: r.int(&["PPID"], 0),
        image_name: r.text(&["ImageFileName"]),
        offset: r.text(&["Offset(V)", "Offset"]),
        thread_count: r.int(&["Threads"], 0),
        handle_count: r.int(&["Handles"], 0),
        session_id: r.int(&["SessionId"], 0),
        is_wow64: r.flag(&["Wow64"]),
        create_time: r.text(&["CreateTime"]),
        exit_time: r.text(&["ExitTime"]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use voltab::parse_table;

    #[test]
    fn test_pslist_system_row() {
        let text = "\
PID PPID ImageFileName Threads Handles SessionId Wow64 CreateTime ExitTime
4 0 System 120 0 0 False 2024-01-01 -
";
        let procs = normalize(&parse_table(text));
        assert_eq!(
            procs,
            vec![ProcessEntry {
                pid: 4,
                parent_pid: 0,
                image_name: Some("System".to_string()),
                offset: None,
                thread_count: 120,
                handle_count: 0,
                session_id: 0,
                is_wow64: false,
                create_time: Some("2024-01-01".to_string()),
                exit_time: Some("-".to_string()),
            }]
        );
    }

    #[test]
    fn test_pslist_garbled_numbers_degrade_to_zero() {
        let text = "\
PID PPID ImageFileName Offset(V) Threads Handles SessionId Wow64 CreateTime ExitTime
N/A 4 smss.exe 0xe0000a1b2040 two - N/A True 2024-01-01 N/A
";
        let procs = normalize(&parse_table(text));
        assert_eq!(procs.len(), 1);
        let p = &procs[0];
        assert_eq!(p.pid, 0);
        assert_eq!(p.parent_pid, 4);
        assert_eq!(p.offset.as_deref(), Some("0xe0000a1b2040"));
        assert_eq!(p.thread_count, 0);
        assert_eq!(p.handle_count, 0);
        assert_eq!(p.session_id, 0);
        assert!(p.is_wow64);
    }

    #[test]
    fn test_pslist_empty() {
        assert!(normalize(&[]).is_empty());
    }
}
