//! SvcScan normalizer: `windows.svcscan` rows to [`ServiceEntry`].
//!
//! The renderer's `Binary` column is frequently a useless placeholder while
//! the real image path (and, for svchost-hosted services, the ServiceDll)
//! sits in the trailing `Dll` cell, tab-separated:
//!
//! ```text
//! -p\t%SystemRoot%\system32\svchost.exe -k netsvcs\t%SystemRoot%\System32\wuaueng.dll
//! ```
//!
//! The cell is split on its first tab into a main and an extra segment and the
//! two paths are reconciled from those.

use serde::{Deserialize, Serialize};
use voltab::{RawRow, RowReader};

/// `Binary` values that carry no path.
const BINARY_PLACEHOLDERS: &[&str] = &["-", "Driver", "-k"];

const KERNEL_DRIVER: &str = "SERVICE_KERNEL_DRIVER";
const FILE_SYSTEM_DRIVER: &str = "SERVICE_FILE_SYSTEM_DRIVER";
const OWN_PROCESS: &str = "SERVICE_WIN32_OWN_PROCESS";
const SHARE_PROCESS: &str = "SERVICE_WIN32_SHARE_PROCESS";
const INTERACTIVE_PROCESS: &str = "SERVICE_INTERACTIVE_PROCESS";

/// A service or driver registration.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct ServiceEntry {
    /// Hosting process; `None` for stopped services and drivers.
    pub pid: Option<u64>,
    pub name: Option<String>,
    pub display_name: Option<String>,
    pub start_type: Option<String>,
    pub state: Option<String>,
    pub type_raw: String,
    pub is_kernel_driver: bool,
    pub is_filesystem_driver: bool,
    pub is_own_process: bool,
    pub is_shared_process: bool,
    pub is_interactive: bool,
    pub registry_key: Option<String>,
    pub binary_path: Option<String>,
    pub service_dll: Option<String>,
}

impl ServiceEntry {
    pub fn is_running(&self) -> bool {
        self.state
            .as_deref()
            .is_some_and(|s| s.trim().eq_ignore_ascii_case("SERVICE_RUNNING"))
    }
}

pub fn normalize(rows: &[RawRow]) -> Vec<ServiceEntry> {
    rows.iter().map(read_service).collect()
}

fn read_service(row: &RawRow) -> ServiceEntry {
    let r = RowReader::new(row);

    let type_raw = r.text(&["Type"]).unwrap_or_default();
    let (main, extra) = split_dll_cell(r.raw(&["Dll"]).unwrap_or(""));

    let mut binary_path = r
        .raw(&["Binary"])
        .map(str::trim)
        .filter(|b| !b.is_empty())
        .map(str::to_string);
    let useless = binary_path
        .as_deref()
        .is_none_or(|b| BINARY_PLACEHOLDERS.contains(&b));
    if useless && !main.is_empty() {
        binary_path = Some(main.to_string());
    }

    let service_dll = [extra, main]
        .into_iter()
        .find(|seg| seg.to_ascii_lowercase().ends_with(".dll"))
        .map(str::to_string);

    ServiceEntry {
        pid: r.opt_int(&["PID", "Pid"]),
        name: r.text(&["Name"]),
        display_name: r.text(&["Display"]),
        start_type: r.text(&["Start"]),
        state: r.text(&["State"]),
        is_kernel_driver: type_raw.contains(KERNEL_DRIVER),
        is_filesystem_driver: type_raw.contains(FILE_SYSTEM_DRIVER),
        is_own_process: type_raw.contains(OWN_PROCESS),
        is_shared_process: type_raw.contains(SHARE_PROCESS),
        is_interactive: type_raw.contains(INTERACTIVE_PROCESS),
        type_raw,
        registry_key: r.text(&["(Registry)"]),
        binary_path,
        service_dll,
    }
}

/// Split on the first tab; both halves trimmed.
fn split_dll_cell(raw: &str) -> (&str, &str) {
    match raw.split_once('\t') {
        Some((main, extra)) => (main.trim(), extra.trim()),
        None => (raw.trim(), ""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn service(pairs: &[(&str, &str)]) -> ServiceEntry {
        let row = RawRow::from_pairs(pairs.iter().copied());
        normalize(&[row]).remove(0)
    }

    #[test]
    fn test_svchost_hosted_service() {
        let s = service(&[
            ("PID", "1044"),
            ("Start", "SERVICE_AUTO_START"),
            ("State", "SERVICE_RUNNING"),
            ("Type", "SERVICE_WIN32_SHARE_PROCESS"),
            ("Name", "wuauserv"),
            ("Display", "Windows Update"),
            ("Binary", "-k"),
            ("(Registry)", "\\REGISTRY\\MACHINE\\SYSTEM\\ControlSet001\\Services\\wuauserv"),
            (
                "Dll",
                "C:\\Windows\\system32\\svchost.exe\tC:\\Windows\\system32\\wuaueng.dll",
            ),
        ]);
        assert_eq!(s.pid, Some(1044));
        assert_eq!(s.binary_path.as_deref(), Some("C:\\Windows\\system32\\svchost.exe"));
        assert_eq!(s.service_dll.as_deref(), Some("C:\\Windows\\system32\\wuaueng.dll"));
        assert!(s.is_shared_process);
        assert!(!s.is_own_process);
        assert!(s.is_running());
        assert!(s.registry_key.as_deref().is_some_and(|k| k.ends_with("wuauserv")));
    }

    #[test]
    fn test_kernel_driver_without_pid() {
        let s = service(&[
            ("PID", "N/A"),
            ("State", "SERVICE_STOPPED"),
            ("Type", "SERVICE_KERNEL_DRIVER"),
            ("Name", "evildrv"),
            ("Binary", "Driver"),
            ("Dll", "\\Driver\\evildrv"),
        ]);
        assert_eq!(s.pid, None);
        assert!(s.is_kernel_driver);
        assert!(!s.is_filesystem_driver);
        assert_eq!(s.binary_path.as_deref(), Some("\\Driver\\evildrv"));
        assert_eq!(s.service_dll, None);
        assert!(!s.is_running());
    }

    #[test]
    fn test_real_binary_kept() {
        let s = service(&[
            ("Binary", "C:\\Program Files\\Agent\\agent.exe"),
            ("Dll", "C:\\other.exe"),
        ]);
        assert_eq!(s.binary_path.as_deref(), Some("C:\\Program Files\\Agent\\agent.exe"));
    }

    #[test]
    fn test_placeholder_kept_when_dll_cell_empty() {
        let s = service(&[("Binary", "-"), ("Dll", "")]);
        assert_eq!(s.binary_path.as_deref(), Some("-"));
        let s = service(&[("Binary", "  ")]);
        assert_eq!(s.binary_path, None);
    }

    #[test]
    fn test_main_segment_dll() {
        let s = service(&[("Dll", "C:\\Windows\\System32\\Helper.DLL")]);
        assert_eq!(s.service_dll.as_deref(), Some("C:\\Windows\\System32\\Helper.DLL"));
        assert_eq!(s.binary_path.as_deref(), Some("C:\\Windows\\System32\\Helper.DLL"));
    }

    #[rstest]
    #[case("SERVICE_KERNEL_DRIVER", [true, false, false, false, false])]
    #[case("SERVICE_FILE_SYSTEM_DRIVER", [false, true, false, false, false])]
    #[case("SERVICE_WIN32_OWN_PROCESS", [false, false, true, false, false])]
    #[case("SERVICE_WIN32_SHARE_PROCESS", [false, false, false, true, false])]
    #[case(
        "SERVICE_WIN32_OWN_PROCESS|SERVICE_INTERACTIVE_PROCESS",
        [false, false, true, false, true]
    )]
    #[case("", [false; 5])]
    fn test_type_flags(#[case] type_raw: &str, #[case] expected: [bool; 5]) {
        let s = service(&[("Type", type_raw)]);
        assert_eq!(
            [
                s.is_kernel_driver,
                s.is_filesystem_driver,
                s.is_own_process,
                s.is_shared_process,
                s.is_interactive,
            ],
            expected
        );
    }

    #[test]
    fn test_split_dll_cell() {
        assert_eq!(split_dll_cell(" a \t b \t c "), ("a", "b \t c"));
        assert_eq!(split_dll_cell("only"), ("only", ""));
    }
}
