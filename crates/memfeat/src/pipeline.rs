//! One snapshot's normalized plugin data, and the path from report files to it.

use crate::analyzers::image_features::{aggregate_image, FeatureVector};
use crate::analyzers::process_features::{aggregate_processes, ProcessFeatures};
use crate::config::Settings;
use crate::error::{PipelineError, PipelineResult};
use crate::plugins::dlllist::DllEntry;
use crate::plugins::handles::HandleEntry;
use crate::plugins::ldrmodules::LdrModuleEntry;
use crate::plugins::malfind::InjectedRegion;
use crate::plugins::pslist::ProcessEntry;
use crate::plugins::psxview::VisibilityEntry;
use crate::plugins::svcscan::ServiceEntry;
use crate::plugins::{self, NormalizedRecord, PluginKind};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use voltab::{parse_table, parse_table_file, RawRow};

/// Normalized records of one memory image, one typed set per plugin.
///
/// A plugin that was never ingested is simply empty; both aggregators treat
/// that as "no data" and still emit their full schema.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Snapshot {
    pub processes: Vec<ProcessEntry>,
    pub dlls: Vec<DllEntry>,
    pub handles: Vec<HandleEntry>,
    pub ldr_modules: Vec<LdrModuleEntry>,
    pub injections: Vec<InjectedRegion>,
    pub visibility: Vec<VisibilityEntry>,
    pub services: Vec<ServiceEntry>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and normalize one plugin report, replacing any earlier data for
    /// that plugin. Unknown plugin names are ignored.
    pub fn ingest(&mut self, plugin: &str, text: &str) -> Option<PluginKind> {
        let Some(kind) = PluginKind::from_name(plugin) else {
            debug!("ignoring report for unsupported plugin '{}'", plugin);
            return None;
        };
        self.ingest_rows(kind, &parse_table(text));
        Some(kind)
    }

    pub fn ingest_rows(&mut self, kind: PluginKind, rows: &[RawRow]) {
        self.clear(kind);
        self.insert(plugins::normalize(kind, rows));
    }

    /// Append already-normalized records to their plugin's set.
    pub fn insert(&mut self, records: impl IntoIterator<Item = NormalizedRecord>) {
        for record in records {
            match record {
                NormalizedRecord::Process(r) => self.processes.push(r),
                NormalizedRecord::Dll(r) => self.dlls.push(r),
                NormalizedRecord::Handle(r) => self.handles.push(r),
                NormalizedRecord::LdrModule(r) => self.ldr_modules.push(r),
                NormalizedRecord::Injection(r) => self.injections.push(r),
                NormalizedRecord::Visibility(r) => self.visibility.push(r),
                NormalizedRecord::Service(r) => self.services.push(r),
            }
        }
    }

    /// Like [`insert`](Self::insert), keyed by plugin name. Returns false
    /// (and stores nothing) for names outside the supported set. Records
    /// whose kind does not match the named plugin are dropped.
    pub fn insert_named(
        &mut self,
        plugin: &str,
        records: impl IntoIterator<Item = NormalizedRecord>,
    ) -> bool {
        match PluginKind::from_name(plugin) {
            Some(kind) => {
                self.insert(records.into_iter().filter(|r| {
                    let matches = r.kind() == kind;
                    if !matches {
                        debug!("dropping {:?} record passed as '{}'", r.kind(), plugin);
                    }
                    matches
                }));
                true
            }
            None => {
                debug!("ignoring records for unsupported plugin '{}'", plugin);
                false
            }
        }
    }

    pub fn clear(&mut self, kind: PluginKind) {
        match kind {
            PluginKind::ProcessList => self.processes.clear(),
            PluginKind::LoadedDlls => self.dlls.clear(),
            PluginKind::OpenHandles => self.handles.clear(),
            PluginKind::ModuleLoadAnomalies => self.ldr_modules.clear(),
            PluginKind::InjectedRegions => self.injections.clear(),
            PluginKind::CrossViewVisibility => self.visibility.clear(),
            PluginKind::ServiceList => self.services.clear(),
        }
    }

    pub fn len(&self, kind: PluginKind) -> usize {
        match kind {
            PluginKind::ProcessList => self.processes.len(),
            PluginKind::LoadedDlls => self.dlls.len(),
            PluginKind::OpenHandles => self.handles.len(),
            PluginKind::ModuleLoadAnomalies => self.ldr_modules.len(),
            PluginKind::InjectedRegions => self.injections.len(),
            PluginKind::CrossViewVisibility => self.visibility.len(),
            PluginKind::ServiceList => self.services.len(),
        }
    }

    /// The records of one plugin as the variant type.
    pub fn records(&self, kind: PluginKind) -> Vec<NormalizedRecord> {
        fn wrap<T: Clone>(items: &[T], f: fn(T) -> NormalizedRecord) -> Vec<NormalizedRecord> {
            items.iter().cloned().map(f).collect()
        }

        match kind {
            PluginKind::ProcessList => wrap(&self.processes, NormalizedRecord::Process),
            PluginKind::LoadedDlls => wrap(&self.dlls, NormalizedRecord::Dll),
            PluginKind::OpenHandles => wrap(&self.handles, NormalizedRecord::Handle),
            PluginKind::ModuleLoadAnomalies => wrap(&self.ldr_modules, NormalizedRecord::LdrModule),
            PluginKind::InjectedRegions => wrap(&self.injections, NormalizedRecord::Injection),
            PluginKind::CrossViewVisibility => wrap(&self.visibility, NormalizedRecord::Visibility),
            PluginKind::ServiceList => wrap(&self.services, NormalizedRecord::Service),
        }
    }

    pub fn image_features(&self) -> FeatureVector {
        aggregate_image(self)
    }

    pub fn process_features(&self) -> Vec<ProcessFeatures> {
        aggregate_processes(self)
    }
}

/// Report file for `kind` inside `dir`: `<short>.<ext>`, then
/// `windows.<short>.<ext>`.
pub fn find_report(dir: &Path, kind: PluginKind, extension: &str) -> Option<PathBuf> {
    [kind.short_name(), kind.canonical_name()]
        .iter()
        .map(|stem| dir.join(format!("{}.{}", stem, extension)))
        .find(|path| path.is_file())
}

/// Load every configured plugin report found in `dir`.
///
/// Missing reports are normal (the plugin was not run). A report that exists
/// but cannot be read is logged and skipped; the snapshot still aggregates.
pub fn load_snapshot(dir: &Path, settings: &Settings) -> PipelineResult<Snapshot> {
    if !dir.is_dir() {
        return Err(PipelineError::SnapshotNotFound(dir.display().to_string()));
    }

    let mut snapshot = Snapshot::new();
    for name in &settings.plugins {
        let Some(kind) = PluginKind::from_name(name) else {
            debug!("configured plugin '{}' is not supported, skipping", name);
            continue;
        };
        let Some(path) = find_report(dir, kind, &settings.report_extension) else {
            debug!("{}: no {} report", dir.display(), kind);
            continue;
        };
        match parse_table_file(&path) {
            Ok(rows) => {
                snapshot.ingest_rows(kind, &rows);
                debug!(
                    "{}: {} rows, {} records",
                    path.display(),
                    rows.len(),
                    snapshot.len(kind)
                );
            }
            Err(e) => warn!("skipping {}: {}", path.display(), e),
        }
    }

    info!(
        "{}: loaded {} processes, {} dlls, {} handles, {} injections",
        dir.display(),
        snapshot.processes.len(),
        snapshot.dlls.len(),
        snapshot.handles.len(),
        snapshot.injections.len()
    );
    Ok(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const PSLIST: &str = "\
Volatility 3 Framework 2.5.2
PID PPID ImageFileName Threads Handles SessionId Wow64 CreateTime ExitTime
4 0 System 120 0 0 False 2024-01-01 -
";

    #[test]
    fn test_ingest_known_and_unknown() {
        let mut snap = Snapshot::new();
        assert_eq!(snap.ingest("windows.pslist", PSLIST), Some(PluginKind::ProcessList));
        assert_eq!(snap.ingest("windows.netscan", "Offset Proto\n0x1 TCPv4\n"), None);
        assert_eq!(snap.processes.len(), 1);
        assert_eq!(snap.processes[0].pid, 4);
    }

    #[test]
    fn test_ingest_replaces_previous_report() {
        let mut snap = Snapshot::new();
        snap.ingest("pslist", PSLIST);
        snap.ingest("pslist", PSLIST);
        assert_eq!(snap.processes.len(), 1);
    }

    #[test]
    fn test_insert_named_routes_by_variant() {
        let mut src = Snapshot::new();
        src.ingest("pslist", PSLIST);
        let records = src.records(PluginKind::ProcessList);

        let mut dst = Snapshot::new();
        assert!(!dst.insert_named("windows.modules", records.clone()));
        assert!(dst.processes.is_empty());
        assert!(dst.insert_named("windows.pslist", records));
        assert_eq!(dst, src);
    }

    #[test]
    fn test_insert_named_drops_mismatched_kind() {
        let mut src = Snapshot::new();
        src.ingest("pslist", PSLIST);
        let records = src.records(PluginKind::ProcessList);
        assert!(!records.is_empty());

        let mut dst = Snapshot::new();
        assert!(dst.insert_named("windows.dlllist", records));
        assert_eq!(dst, Snapshot::new());
    }

    #[test]
    fn test_same_text_same_features() {
        let build = || {
            let mut snap = Snapshot::new();
            snap.ingest("pslist", PSLIST);
            snap.ingest("psxview", "PID pslist psscan\n4 True False\n");
            (snap.image_features(), snap.process_features())
        };
        assert_eq!(build(), build());
    }

    #[test]
    fn test_load_snapshot_finds_both_name_forms() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("pslist.txt"), PSLIST).unwrap();
        fs::write(
            dir.path().join("windows.malfind.txt"),
            "PID Process Start End Protection\n4 System 0x10 0x20 PAGE_EXECUTE_READWRITE\n",
        )
        .unwrap();
        fs::write(dir.path().join("netscan.txt"), "Offset Proto\n0x1 TCPv4\n").unwrap();

        let snap = load_snapshot(dir.path(), &Settings::default()).unwrap();
        assert_eq!(snap.processes.len(), 1);
        assert_eq!(snap.injections.len(), 1);
        assert!(snap.handles.is_empty());
    }

    #[test]
    fn test_load_snapshot_respects_plugin_selection() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("pslist.txt"), PSLIST).unwrap();
        let settings = Settings {
            plugins: vec!["malfind".into()],
            ..Settings::default()
        };
        let snap = load_snapshot(dir.path(), &settings).unwrap();
        assert!(snap.processes.is_empty());
    }

    #[test]
    fn test_load_snapshot_missing_dir() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope");
        assert!(matches!(
            load_snapshot(&missing, &Settings::default()),
            Err(PipelineError::SnapshotNotFound(_))
        ));
    }
}
