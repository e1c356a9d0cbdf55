//! Per-plugin normalizers.
//!
//! Each module turns the [`RawRow`]s of one Volatility plugin report into
//! typed records, absorbing that plugin's known rendering quirks. Everything
//! downstream works on these records, never on raw rows.

pub mod dlllist;
pub mod handles;
pub mod ldrmodules;
pub mod malfind;
pub mod pslist;
pub mod psxview;
pub mod svcscan;

use serde::{Deserialize, Serialize};
use std::fmt;
use voltab::RawRow;

/// Supported plugins: (short name, description, category).
pub const PLUGINS: &[(&str, &str, &str)] = &[
    ("pslist", "Active process list (EPROCESS links)", "processes"),
    ("dlllist", "Loaded DLLs per process from the PEB", "processes"),
    ("handles", "Open handles per process", "processes"),
    ("ldrmodules", "Mapped images cross-checked against the PEB loader lists", "malware"),
    ("malfind", "Private executable regions (injected code)", "malware"),
    ("psxview", "Process visibility across kernel enumeration sources", "malware"),
    ("svcscan", "Services and drivers from the SCM database", "services"),
];

/// The closed set of plugins this crate understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PluginKind {
    ProcessList,
    LoadedDlls,
    OpenHandles,
    ModuleLoadAnomalies,
    InjectedRegions,
    CrossViewVisibility,
    ServiceList,
}

impl PluginKind {
    pub const ALL: [PluginKind; 7] = [
        PluginKind::ProcessList,
        PluginKind::LoadedDlls,
        PluginKind::OpenHandles,
        PluginKind::ModuleLoadAnomalies,
        PluginKind::InjectedRegions,
        PluginKind::CrossViewVisibility,
        PluginKind::ServiceList,
    ];

    /// Resolve `windows.pslist` or `pslist` (any case). Unknown names give `None`.
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim().to_ascii_lowercase();
        let short = name.strip_prefix("windows.").unwrap_or(&name);
        Self::ALL.into_iter().find(|k| k.short_name() == short)
    }

    pub fn short_name(self) -> &'static str {
        match self {
            PluginKind::ProcessList => "pslist",
            PluginKind::LoadedDlls => "dlllist",
            PluginKind::OpenHandles => "handles",
            PluginKind::ModuleLoadAnomalies => "ldrmodules",
            PluginKind::InjectedRegions => "malfind",
            PluginKind::CrossViewVisibility => "psxview",
            PluginKind::ServiceList => "svcscan",
        }
    }

    /// Name as passed to `vol -f <image> <name>`.
    pub fn canonical_name(self) -> &'static str {
        match self {
            PluginKind::ProcessList => "windows.pslist",
            PluginKind::LoadedDlls => "windows.dlllist",
            PluginKind::OpenHandles => "windows.handles",
            PluginKind::ModuleLoadAnomalies => "windows.ldrmodules",
            PluginKind::InjectedRegions => "windows.malfind",
            PluginKind::CrossViewVisibility => "windows.psxview",
            PluginKind::ServiceList => "windows.svcscan",
        }
    }
}

impl fmt::Display for PluginKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.canonical_name())
    }
}

/// One normalized row of any plugin. Serializes as the bare record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum NormalizedRecord {
    Process(pslist::ProcessEntry),
    Dll(dlllist::DllEntry),
    Handle(handles::HandleEntry),
    LdrModule(ldrmodules::LdrModuleEntry),
    Injection(malfind::InjectedRegion),
    Visibility(psxview::VisibilityEntry),
    Service(svcscan::ServiceEntry),
}

impl NormalizedRecord {
    pub fn kind(&self) -> PluginKind {
        match self {
            NormalizedRecord::Process(_) => PluginKind::ProcessList,
            NormalizedRecord::Dll(_) => PluginKind::LoadedDlls,
            NormalizedRecord::Handle(_) => PluginKind::OpenHandles,
            NormalizedRecord::LdrModule(_) => PluginKind::ModuleLoadAnomalies,
            NormalizedRecord::Injection(_) => PluginKind::InjectedRegions,
            NormalizedRecord::Visibility(_) => PluginKind::CrossViewVisibility,
            NormalizedRecord::Service(_) => PluginKind::ServiceList,
        }
    }
}

/// Run the normalizer for `kind`.
pub fn normalize(kind: PluginKind, rows: &[RawRow]) -> Vec<NormalizedRecord> {
    fn wrap<T>(records: Vec<T>, f: fn(T) -> NormalizedRecord) -> Vec<NormalizedRecord> {
        records.into_iter().map(f).collect()
    }

    match kind {
        PluginKind::ProcessList => wrap(pslist::normalize(rows), NormalizedRecord::Process),
        PluginKind::LoadedDlls => wrap(dlllist::normalize(rows), NormalizedRecord::Dll),
        PluginKind::OpenHandles => wrap(handles::normalize(rows), NormalizedRecord::Handle),
        PluginKind::ModuleLoadAnomalies => {
            wrap(ldrmodules::normalize(rows), NormalizedRecord::LdrModule)
        }
        PluginKind::InjectedRegions => wrap(malfind::normalize(rows), NormalizedRecord::Injection),
        PluginKind::CrossViewVisibility => {
            wrap(psxview::normalize(rows), NormalizedRecord::Visibility)
        }
        PluginKind::ServiceList => wrap(svcscan::normalize(rows), NormalizedRecord::Service),
    }
}
