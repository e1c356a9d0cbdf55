//! PsXView normalizer: `windows.psxview` rows to [`VisibilityEntry`].
//!
//! psxview enumerates processes from several independent kernel sources and
//! prints one `True`/`False` column per source. A process missing from one
//! source while present in others is a hiding indicator.
//!
//! Flags are ternary. A source column the renderer did not print is `None`,
//! which is not the same as an explicit `False`; only the latter counts as
//! hidden downstream.

use serde::{Deserialize, Serialize};
use tracing::debug;
use voltab::{RawRow, RowReader};

const PSLIST_COLUMNS: &[&str] = &["pslist"];
const EPROCESS_COLUMNS: &[&str] = &["eprocess_pool", "psscan"];
const ETHREAD_COLUMNS: &[&str] = &["ethread_pool", "thrdscan"];
const PSPCID_COLUMNS: &[&str] = &["pspcid_list", "pspcid"];
const CSRSS_COLUMNS: &[&str] = &["csrss_handles", "csrss"];
const SESSION_COLUMNS: &[&str] = &["session"];
const DESKTHRD_COLUMNS: &[&str] = &["deskthrd"];

/// Per-source visibility of one process.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct VisibilityEntry {
    pub pid: u64,
    pub visible_in_process_list: Option<bool>,
    pub visible_in_kernel_pool_by_eprocess: Option<bool>,
    pub visible_in_kernel_pool_by_ethread: Option<bool>,
    pub visible_in_pid_table: Option<bool>,
    pub visible_in_csrss_handles: Option<bool>,
    pub visible_in_session: Option<bool>,
    pub visible_in_desktop_thread: Option<bool>,
}

impl VisibilityEntry {
    /// Flags in the fixed source order used by the feature schemas.
    pub fn sources(&self) -> [Option<bool>; 7] {
        [
            self.visible_in_process_list,
            self.visible_in_kernel_pool_by_eprocess,
            self.visible_in_kernel_pool_by_ethread,
            self.visible_in_pid_table,
            self.visible_in_csrss_handles,
            self.visible_in_session,
            self.visible_in_desktop_thread,
        ]
    }

    /// Number of sources that explicitly reported this process as absent.
    pub fn hidden_count(&self) -> usize {
        self.sources().iter().filter(|s| **s == Some(false)).count()
    }
}

pub fn normalize(rows: &[RawRow]) -> Vec<VisibilityEntry> {
    let entries: Vec<VisibilityEntry> = rows.iter().filter_map(read_entry).collect();
    if entries.len() != rows.len() {
        debug!("psxview: dropped {} rows without a pid", rows.len() - entries.len());
    }
    entries
}

fn read_entry(row: &RawRow) -> Option<VisibilityEntry> {
    let r = RowReader::new(row);
    Some(VisibilityEntry {
        pid: r.opt_int(&["PID", "Pid"])?,
        visible_in_process_list: r.exact_true(PSLIST_COLUMNS),
        visible_in_kernel_pool_by_eprocess: r.exact_true(EPROCESS_COLUMNS),
        visible_in_kernel_pool_by_ethread: r.exact_true(ETHREAD_COLUMNS),
        visible_in_pid_table: r.exact_true(PSPCID_COLUMNS),
        visible_in_csrss_handles: r.exact_true(CSRSS_COLUMNS),
        visible_in_session: r.exact_true(SESSION_COLUMNS),
        visible_in_desktop_thread: r.exact_true(DESKTHRD_COLUMNS),
    })
}
