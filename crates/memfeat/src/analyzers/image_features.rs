//! Image-level feature vector.
//!
//! One fixed-schema row per memory snapshot. Every key is emitted on every
//! run; a plugin with no records contributes zeros. Averages go through
//! [`safe_div`] so an empty denominator gives 0.0, never NaN.

use crate::pipeline::Snapshot;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Handle types counted in the `handles.n*` histogram, lowercase.
pub const HANDLE_TYPES: &[&str] = &[
    "port",
    "file",
    "event",
    "desktop",
    "key",
    "thread",
    "directory",
    "semaphore",
    "timer",
    "section",
    "mutant",
];

/// Serialized key names of [`FeatureVector`], in emission order.
pub const IMAGE_FEATURE_NAMES: &[&str] = &[
    "pslist.nproc",
    "pslist.nppid",
    "pslist.avg_threads",
    "pslist.avg_handlers",
    "pslist.nprocs64bit",
    "dlllist.ndlls",
    "dlllist.avg_dlls_per_proc",
    "handles.nhandles",
    "handles.avg_handles_per_proc",
    "handles.nport",
    "handles.nfile",
    "handles.nevent",
    "handles.ndesktop",
    "handles.nkey",
    "handles.nthread",
    "handles.ndirectory",
    "handles.nsemaphore",
    "handles.ntimer",
    "handles.nsection",
    "handles.nmutant",
    "ldrmodules.not_in_load",
    "ldrmodules.not_in_init",
    "ldrmodules.not_in_mem",
    "ldrmodules.not_in_load_avg",
    "ldrmodules.not_in_init_avg",
    "ldrmodules.not_in_mem_avg",
    "malfind.ninjections",
    "malfind.commitCharge",
    "malfind.rwx_regions",
    "malfind.uniqueInjections",
    "psxview.not_in_pslist",
    "psxview.not_in_eprocess_pool",
    "psxview.not_in_ethread_pool",
    "psxview.not_in_pspcid_list",
    "psxview.not_in_csrss_handles",
    "psxview.not_in_session",
    "psxview.not_in_deskthrd",
    "psxview.not_in_pslist_false_avg",
    "psxview.not_in_eprocess_pool_false_avg",
    "psxview.not_in_ethread_pool_false_avg",
    "psxview.not_in_pspcid_list_false_avg",
    "psxview.not_in_csrss_handles_false_avg",
    "psxview.not_in_session_false_avg",
    "psxview.not_in_deskthrd_false_avg",
    "svcscan.nservices",
    "svcscan.kernel_drivers",
    "svcscan.fs_drivers",
    "svcscan.process_services",
    "svcscan.shared_process_services",
    "svcscan.interactive_process_services",
    "svcscan.nactive",
];

/// Fixed-schema numeric summary of one snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    #[serde(rename = "pslist.nproc")]
    pub nproc: u64,
    #[serde(rename = "pslist.nppid")]
    pub nppid: u64,
    #[serde(rename = "pslist.avg_threads")]
    pub avg_threads: f64,
    #[serde(rename = "pslist.avg_handlers")]
    pub avg_handlers: f64,
    #[serde(rename = "pslist.nprocs64bit")]
    pub nprocs64bit: u64,

    #[serde(rename = "dlllist.ndlls")]
    pub ndlls: u64,
    #[serde(rename = "dlllist.avg_dlls_per_proc")]
    pub avg_dlls_per_proc: f64,

    #[serde(rename = "handles.nhandles")]
    pub nhandles: u64,
    #[serde(rename = "handles.avg_handles_per_proc")]
    pub avg_handles_per_proc: f64,
    #[serde(rename = "handles.nport")]
    pub nport: u64,
    #[serde(rename = "handles.nfile")]
    pub nfile: u64,
    #[serde(rename = "handles.nevent")]
    pub nevent: u64,
    #[serde(rename = "handles.ndesktop")]
    pub ndesktop: u64,
    #[serde(rename = "handles.nkey")]
    pub nkey: u64,
    #[serde(rename = "handles.nthread")]
    pub nthread: u64,
    #[serde(rename = "handles.ndirectory")]
    pub ndirectory: u64,
    #[serde(rename = "handles.nsemaphore")]
    pub nsemaphore: u64,
    #[serde(rename = "handles.ntimer")]
    pub ntimer: u64,
    #[serde(rename = "handles.nsection")]
    pub nsection: u64,
    #[serde(rename = "handles.nmutant")]
    pub nmutant: u64,

    #[serde(rename = "ldrmodules.not_in_load")]
    pub ldr_not_in_load: u64,
    #[serde(rename = "ldrmodules.not_in_init")]
    pub ldr_not_in_init: u64,
    #[serde(rename = "ldrmodules.not_in_mem")]
    pub ldr_not_in_mem: u64,
    #[serde(rename = "ldrmodules.not_in_load_avg")]
    pub ldr_not_in_load_avg: f64,
    #[serde(rename = "ldrmodules.not_in_init_avg")]
    pub ldr_not_in_init_avg: f64,
    #[serde(rename = "ldrmodules.not_in_mem_avg")]
    pub ldr_not_in_mem_avg: f64,

    #[serde(rename = "malfind.ninjections")]
    pub ninjections: u64,
    #[serde(rename = "malfind.commitCharge")]
    pub commit_charge: u64,
    #[serde(rename = "malfind.rwx_regions")]
    pub rwx_regions: u64,
    #[serde(rename = "malfind.uniqueInjections")]
    pub unique_injections: u64,

    #[serde(rename = "psxview.not_in_pslist")]
    pub not_in_pslist: u64,
    #[serde(rename = "psxview.not_in_eprocess_pool")]
    pub not_in_eprocess_pool: u64,
    #[serde(rename = "psxview.not_in_ethread_pool")]
    pub not_in_ethread_pool: u64,
    #[serde(rename = "psxview.not_in_pspcid_list")]
    pub not_in_pspcid_list: u64,
    #[serde(rename = "psxview.not_in_csrss_handles")]
    pub not_in_csrss_handles: u64,
    #[serde(rename = "psxview.not_in_session")]
    pub not_in_session: u64,
    #[serde(rename = "psxview.not_in_deskthrd")]
    pub not_in_deskthrd: u64,
    #[serde(rename = "psxview.not_in_pslist_false_avg")]
    pub not_in_pslist_false_avg: f64,
    #[serde(rename = "psxview.not_in_eprocess_pool_false_avg")]
    pub not_in_eprocess_pool_false_avg: f64,
    #[serde(rename = "psxview.not_in_ethread_pool_false_avg")]
    pub not_in_ethread_pool_false_avg: f64,
    #[serde(rename = "psxview.not_in_pspcid_list_false_avg")]
    pub not_in_pspcid_list_false_avg: f64,
    #[serde(rename = "psxview.not_in_csrss_handles_false_avg")]
    pub not_in_csrss_handles_false_avg: f64,
    #[serde(rename = "psxview.not_in_session_false_avg")]
    pub not_in_session_false_avg: f64,
    #[serde(rename = "psxview.not_in_deskthrd_false_avg")]
    pub not_in_deskthrd_false_avg: f64,

    #[serde(rename = "svcscan.nservices")]
    pub nservices: u64,
    #[serde(rename = "svcscan.kernel_drivers")]
    pub kernel_drivers: u64,
    #[serde(rename = "svcscan.fs_drivers")]
    pub fs_drivers: u64,
    #[serde(rename = "svcscan.process_services")]
    pub process_services: u64,
    #[serde(rename = "svcscan.shared_process_services")]
    pub shared_process_services: u64,
    #[serde(rename = "svcscan.interactive_process_services")]
    pub interactive_process_services: u64,
    #[serde(rename = "svcscan.nactive")]
    pub nactive: u64,
}

/// `num / denom`, or 0.0 when `denom` is zero.
pub fn safe_div(num: u64, denom: u64) -> f64 {
    if denom == 0 {
        0.0
    } else {
        num as f64 / denom as f64
    }
}

fn count<T>(items: &[T], pred: impl Fn(&T) -> bool) -> u64 {
    items.iter().filter(|item| pred(*item)).count() as u64
}

/// Build the feature vector. Total: never fails, any plugin may be empty.
pub fn aggregate_image(snapshot: &Snapshot) -> FeatureVector {
    let mut fv = FeatureVector::default();

    // pslist
    let procs = &snapshot.processes;
    let nproc = procs.len() as u64;
    fv.nproc = nproc;
    fv.nppid = procs.iter().map(|p| p.parent_pid).collect::<HashSet<_>>().len() as u64;
    fv.avg_threads = safe_div(procs.iter().map(|p| p.thread_count).sum(), nproc);
    fv.avg_handlers = safe_div(procs.iter().map(|p| p.handle_count).sum(), nproc);
    fv.nprocs64bit = count(procs, |p| !p.is_wow64);

    // dlllist
    let dlls = &snapshot.dlls;
    fv.ndlls = dlls.len() as u64;
    let dll_procs = dlls.iter().filter_map(|d| d.pid).collect::<HashSet<_>>().len() as u64;
    fv.avg_dlls_per_proc = safe_div(fv.ndlls, nonzero_or(dll_procs, nproc));

    // handles
    let handles = &snapshot.handles;
    fv.nhandles = handles.len() as u64;
    let handle_procs = handles.iter().filter_map(|h| h.pid).collect::<HashSet<_>>().len() as u64;
    fv.avg_handles_per_proc = safe_div(fv.nhandles, nonzero_or(handle_procs, nproc));

    let mut histogram = [0u64; HANDLE_TYPES.len()];
    for h in handles {
        let ty = h.handle_type.as_deref().unwrap_or("").to_ascii_lowercase();
        if let Some(i) = HANDLE_TYPES.iter().position(|t| *t == ty) {
            histogram[i] += 1;
        }
    }
    [
        fv.nport,
        fv.nfile,
        fv.nevent,
        fv.ndesktop,
        fv.nkey,
        fv.nthread,
        fv.ndirectory,
        fv.nsemaphore,
        fv.ntimer,
        fv.nsection,
        fv.nmutant,
    ] = histogram;

    // ldrmodules
    let ldr = &snapshot.ldr_modules;
    fv.ldr_not_in_load = count(ldr, |m| !m.in_load);
    fv.ldr_not_in_init = count(ldr, |m| !m.in_init);
    fv.ldr_not_in_mem = count(ldr, |m| !m.in_mem);
    // averaged over pslist.nproc, not over processes seen by ldrmodules
    fv.ldr_not_in_load_avg = safe_div(fv.ldr_not_in_load, nproc);
    fv.ldr_not_in_init_avg = safe_div(fv.ldr_not_in_init, nproc);
    fv.ldr_not_in_mem_avg = safe_div(fv.ldr_not_in_mem, nproc);

    // malfind
    let regions = &snapshot.injections;
    fv.ninjections = regions.len() as u64;
    fv.commit_charge = regions.iter().map(|r| r.commit_charge).sum();
    fv.rwx_regions = count(regions, |r| r.is_writable_executable());
    fv.unique_injections = regions
        .iter()
        .map(|r| (r.pid, r.start_address.as_str()))
        .collect::<HashSet<_>>()
        .len() as u64;

    // psxview
    let mut not_in = [0u64; 7];
    for entry in &snapshot.visibility {
        for (slot, flag) in not_in.iter_mut().zip(entry.sources()) {
            if flag == Some(false) {
                *slot += 1;
            }
        }
    }
    [
        fv.not_in_pslist,
        fv.not_in_eprocess_pool,
        fv.not_in_ethread_pool,
        fv.not_in_pspcid_list,
        fv.not_in_csrss_handles,
        fv.not_in_session,
        fv.not_in_deskthrd,
    ] = not_in;
    [
        fv.not_in_pslist_false_avg,
        fv.not_in_eprocess_pool_false_avg,
        fv.not_in_ethread_pool_false_avg,
        fv.not_in_pspcid_list_false_avg,
        fv.not_in_csrss_handles_false_avg,
        fv.not_in_session_false_avg,
        fv.not_in_deskthrd_false_avg,
    ] = not_in.map(|n| safe_div(n, nproc)); // pslist.nproc, not psxview row count

    // svcscan
    let services = &snapshot.services;
    fv.nservices = services.len() as u64;
    fv.kernel_drivers = count(services, |s| s.is_kernel_driver);
    fv.fs_drivers = count(services, |s| s.is_filesystem_driver);
    fv.process_services = count(services, |s| s.is_own_process);
    fv.shared_process_services = count(services, |s| s.is_shared_process);
    fv.interactive_process_services = count(services, |s| s.is_interactive);
    fv.nactive = count(services, |s| s.is_running());

    fv
}

fn nonzero_or(value: u64, fallback: u64) -> u64 {
    if value == 0 {
        fallback
    } else {
        value
    }
}
