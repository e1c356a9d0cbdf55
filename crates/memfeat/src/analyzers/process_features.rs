//! Per-process feature records.
//!
//! Built by folding each plugin's records into a [`ProcessTable`] in a fixed
//! order. pslist seeds identity fields; every later plugin may still
//! introduce a pid pslist never saw. A process that only shows up in malfind
//! or psxview is exactly the unlinked process the classifier is after.

use crate::pipeline::Snapshot;
use crate::plugins::{dlllist::DllEntry, handles::HandleEntry, ldrmodules::LdrModuleEntry};
use crate::plugins::{malfind::InjectedRegion, pslist::ProcessEntry};
use crate::plugins::{psxview::VisibilityEntry, svcscan::ServiceEntry};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// Field names of [`ProcessFeatures`], in serialization order.
pub const PROCESS_FEATURE_FIELDS: &[&str] = &[
    "pid",
    "name",
    "ppid",
    "threads",
    "handles_pslist",
    "session_id",
    "dll_count",
    "handle_count",
    "file_handle_count",
    "thread_handle_count",
    "key_handle_count",
    "mutant_handle_count",
    "malfind_regions",
    "malfind_commit_sum",
    "malfind_rwx_regions",
    "hidden_source_count",
    "hidden_in_pslist",
    "hidden_in_eprocess_pool",
    "hidden_in_ethread_pool",
    "hidden_in_pspcid_list",
    "hidden_in_csrss_handles",
    "hidden_in_session",
    "hidden_in_deskthrd",
    "ldr_not_in_load",
    "ldr_not_in_init",
    "ldr_not_in_mem",
    "svc_is_kernel_driver",
    "svc_is_fs_driver",
    "svc_is_own_process",
    "svc_is_shared_process",
    "svc_is_running",
];

/// One process as seen across all plugins. Flag fields are 0/1.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessFeatures {
    pub pid: u64,
    pub name: Option<String>,
    pub ppid: Option<u64>,
    pub threads: u64,
    pub handles_pslist: u64,
    pub session_id: Option<u64>,

    pub dll_count: u64,

    pub handle_count: u64,
    pub file_handle_count: u64,
    pub thread_handle_count: u64,
    pub key_handle_count: u64,
    pub mutant_handle_count: u64,

    pub malfind_regions: u64,
    pub malfind_commit_sum: u64,
    pub malfind_rwx_regions: u64,

    pub hidden_source_count: u64,
    pub hidden_in_pslist: u8,
    pub hidden_in_eprocess_pool: u8,
    pub hidden_in_ethread_pool: u8,
    pub hidden_in_pspcid_list: u8,
    pub hidden_in_csrss_handles: u8,
    pub hidden_in_session: u8,
    pub hidden_in_deskthrd: u8,

    pub ldr_not_in_load: u64,
    pub ldr_not_in_init: u64,
    pub ldr_not_in_mem: u64,

    pub svc_is_kernel_driver: u8,
    pub svc_is_fs_driver: u8,
    pub svc_is_own_process: u8,
    pub svc_is_shared_process: u8,
    pub svc_is_running: u8,
}

impl ProcessFeatures {
    fn new(pid: u64) -> Self {
        ProcessFeatures { pid, ..Default::default() }
    }

    fn hidden_flags_mut(&mut self) -> [&mut u8; 7] {
        [
            &mut self.hidden_in_pslist,
            &mut self.hidden_in_eprocess_pool,
            &mut self.hidden_in_ethread_pool,
            &mut self.hidden_in_pspcid_list,
            &mut self.hidden_in_csrss_handles,
            &mut self.hidden_in_session,
            &mut self.hidden_in_deskthrd,
        ]
    }

    /// CSV cells in [`PROCESS_FEATURE_FIELDS`] order; `None` renders empty.
    pub fn csv_cells(&self) -> Vec<String> {
        fn opt<T: ToString>(v: &Option<T>) -> String {
            v.as_ref().map(T::to_string).unwrap_or_default()
        }
        vec![
            self.pid.to_string(),
            opt(&self.name),
            opt(&self.ppid),
            self.threads.to_string(),
            self.handles_pslist.to_string(),
            opt(&self.session_id),
            self.dll_count.to_string(),
            self.handle_count.to_string(),
            self.file_handle_count.to_string(),
            self.thread_handle_count.to_string(),
            self.key_handle_count.to_string(),
            self.mutant_handle_count.to_string(),
            self.malfind_regions.to_string(),
            self.malfind_commit_sum.to_string(),
            self.malfind_rwx_regions.to_string(),
            self.hidden_source_count.to_string(),
            self.hidden_in_pslist.to_string(),
            self.hidden_in_eprocess_pool.to_string(),
            self.hidden_in_ethread_pool.to_string(),
            self.hidden_in_pspcid_list.to_string(),
            self.hidden_in_csrss_handles.to_string(),
            self.hidden_in_session.to_string(),
            self.hidden_in_deskthrd.to_string(),
            self.ldr_not_in_load.to_string(),
            self.ldr_not_in_init.to_string(),
            self.ldr_not_in_mem.to_string(),
            self.svc_is_kernel_driver.to_string(),
            self.svc_is_fs_driver.to_string(),
            self.svc_is_own_process.to_string(),
            self.svc_is_shared_process.to_string(),
            self.svc_is_running.to_string(),
        ]
    }
}

/// Accumulator: records in first-discovery order plus a pid index.
#[derive(Debug, Default)]
pub struct ProcessTable {
    records: Vec<ProcessFeatures>,
    index: HashMap<u64, usize>,
}

impl ProcessTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record for `pid`, created on first sight.
    pub fn entry(&mut self, pid: u64) -> &mut ProcessFeatures {
        let idx = match self.index.get(&pid) {
            Some(&idx) => idx,
            None => {
                self.records.push(ProcessFeatures::new(pid));
                self.index.insert(pid, self.records.len() - 1);
                self.records.len() - 1
            }
        };
        &mut self.records[idx]
    }

    pub fn get(&self, pid: u64) -> Option<&ProcessFeatures> {
        self.index.get(&pid).map(|&idx| &self.records[idx])
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn into_records(self) -> Vec<ProcessFeatures> {
        self.records
    }

    pub fn fold_pslist(mut self, procs: &[ProcessEntry]) -> Self {
        for p in procs {
            let rec = self.entry(p.pid);
            if p.image_name.is_some() {
                rec.name = p.image_name.clone();
            }
            rec.ppid = Some(p.parent_pid);
            rec.threads = p.thread_count;
            rec.handles_pslist = p.handle_count;
            rec.session_id = Some(p.session_id);
        }
        self
    }

    pub fn fold_dlllist(mut self, dlls: &[DllEntry]) -> Self {
        for d in dlls {
            let Some(pid) = d.pid else { continue };
            self.entry(pid).dll_count += 1;
        }
        self
    }

    pub fn fold_handles(mut self, handles: &[HandleEntry]) -> Self {
        for h in handles {
            let Some(pid) = h.pid else { continue };
            let rec = self.entry(pid);
            rec.handle_count += 1;
            match h.handle_type.as_deref().map(str::to_ascii_lowercase).as_deref() {
                Some("file") => rec.file_handle_count += 1,
                Some("thread") => rec.thread_handle_count += 1,
                Some("key") => rec.key_handle_count += 1,
                Some("mutant") => rec.mutant_handle_count += 1,
                _ => {}
            }
        }
        self
    }

    pub fn fold_malfind(mut self, regions: &[InjectedRegion]) -> Self {
        for r in regions {
            let rec = self.entry(r.pid);
            rec.malfind_regions += 1;
            rec.malfind_commit_sum += r.commit_charge;
            if r.is_writable_executable() {
                rec.malfind_rwx_regions += 1;
            }
        }
        self
    }

    /// A source flag sticks at 1 once any row reports the pid absent there;
    /// `hidden_source_count` is the number of such sources.
    pub fn fold_psxview(mut self, entries: &[VisibilityEntry]) -> Self {
        for e in entries {
            let rec = self.entry(e.pid);
            for (flag, source) in rec.hidden_flags_mut().into_iter().zip(e.sources()) {
                if source == Some(false) {
                    *flag = 1;
                }
            }
            let hidden: u64 = rec.hidden_flags_mut().iter().map(|f| u64::from(**f)).sum();
            rec.hidden_source_count = hidden;
        }
        self
    }

    pub fn fold_ldrmodules(mut self, modules: &[LdrModuleEntry]) -> Self {
        for m in modules {
            let Some(pid) = m.pid else { continue };
            let rec = self.entry(pid);
            rec.ldr_not_in_load += u64::from(!m.in_load);
            rec.ldr_not_in_init += u64::from(!m.in_init);
            rec.ldr_not_in_mem += u64::from(!m.in_mem);
        }
        self
    }

    pub fn fold_svcscan(mut self, services: &[ServiceEntry]) -> Self {
        for s in services {
            let Some(pid) = s.pid else { continue };
            let rec = self.entry(pid);
            rec.svc_is_kernel_driver |= u8::from(s.is_kernel_driver);
            rec.svc_is_fs_driver |= u8::from(s.is_filesystem_driver);
            rec.svc_is_own_process |= u8::from(s.is_own_process);
            rec.svc_is_shared_process |= u8::from(s.is_shared_process);
            rec.svc_is_running |= u8::from(s.is_running());
        }
        self
    }
}

/// One record per pid seen in any plugin, in first-discovery order.
pub fn aggregate_processes(snapshot: &Snapshot) -> Vec<ProcessFeatures> {
    let table = ProcessTable::new()
        .fold_pslist(&snapshot.processes)
        .fold_dlllist(&snapshot.dlls)
        .fold_handles(&snapshot.handles)
        .fold_malfind(&snapshot.injections)
        .fold_psxview(&snapshot.visibility)
        .fold_ldrmodules(&snapshot.ldr_modules)
        .fold_svcscan(&snapshot.services);

    debug!("process features: {} processes", table.len());
    table.into_records()
}
