//! Malfind normalizer: `windows.malfind` rows to [`InjectedRegion`].
//!
//! Each malfind hit is followed by a hexdump and a disassembly listing. Most
//! of those lines never reach us (wrong token count), but a long hexdump line
//! can accidentally match the header width. A row is therefore only a hit if
//! its pid parses and it has both a start and an end address.
//!
//! Address format and the protection string are deliberately not used for
//! acceptance: renderers differ on hex prefixes, and a missing protection
//! column only loses the classification, not the region.

use serde::{Deserialize, Serialize};
use tracing::debug;
use voltab::{parse_address, RawRow, RowReader};

const START_COLUMNS: &[&str] = &["Start VPN", "Start", "StartVPN", "start_vpn", "start"];
const END_COLUMNS: &[&str] = &["End VPN", "End", "EndVPN", "end_vpn", "end"];

/// A suspicious private memory region.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct InjectedRegion {
    pub pid: u64,
    pub process_name: Option<String>,
    pub start_address: String,
    pub end_address: String,
    pub tag: Option<String>,
    pub protection: Option<String>,
    pub commit_charge: u64,
    pub is_executable: bool,
    pub is_exec_write: bool,
}

impl InjectedRegion {
    /// Protection grants both execute and some form of write
    /// (`EXECUTE_READWRITE` or `EXECUTE_WRITECOPY`).
    pub fn is_writable_executable(&self) -> bool {
        self.protection
            .as_deref()
            .map(|p| {
                let p = p.to_ascii_uppercase();
                p.contains("EXECUTE") && p.contains("WRITE")
            })
            .unwrap_or(false)
    }
}

pub fn normalize(rows: &[RawRow]) -> Vec<InjectedRegion> {
    let regions: Vec<InjectedRegion> = rows.iter().filter_map(read_region).collect();
    debug!(
        "malfind: {} of {} rows accepted as injected regions",
        regions.len(),
        rows.len()
    );
    regions
}

fn read_region(row: &RawRow) -> Option<InjectedRegion> {
    let r = RowReader::new(row);

    let pid = r.opt_int(&["PID", "Pid"])?;
    let start = r.raw(START_COLUMNS)?;
    let end = r.raw(END_COLUMNS)?;

    let protection = r.text(&["Protection"]);
    let upper = protection.as_deref().unwrap_or("").to_ascii_uppercase();

    Some(InjectedRegion {
        pid,
        process_name: r.text(&["Process"]),
        start_address: normalize_address(start),
        end_address: normalize_address(end),
        tag: r.text(&["Tag"]),
        commit_charge: r.int(&["CommitCharge"], 0),
        is_executable: upper.contains("EXECUTE"),
        is_exec_write: upper.contains("EXECUTE_READWRITE"),
        protection,
    })
}

/// Render parseable addresses as lowercase `0x` hex; keep anything else verbatim.
fn normalize_address(raw: &str) -> String {
    match parse_address(raw) {
        Some(addr) => format!("{:#x}", addr),
        None => raw.to_string(),
    }
}
