//! memfeat: Volatility 3 plugin reports to classifier features.
//!
//! Reports are parsed with [`voltab`], normalized per plugin into typed
//! records ([`plugins`]), collected into a [`Snapshot`] and aggregated into
//! an image-level [`FeatureVector`] plus one [`ProcessFeatures`] row per pid.
//!
//! ```rust
//! use memfeat::Snapshot;
//!
//! let mut snap = Snapshot::new();
//! snap.ingest("windows.pslist", "PID PPID ImageFileName\n4 0 System\n");
//! snap.ingest("windows.malfind", "PID Process Start End\n666 x.exe 0x1000 0x1fff\n");
//!
//! assert_eq!(snap.image_features().nproc, 1);
//! let pids: Vec<u64> = snap.process_features().iter().map(|p| p.pid).collect();
//! assert_eq!(pids, [4, 666]);
//! ```

pub mod analyzers;
pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod plugins;

pub use analyzers::image_features::{aggregate_image, FeatureVector, IMAGE_FEATURE_NAMES};
pub use analyzers::process_features::{
    aggregate_processes, ProcessFeatures, ProcessTable, PROCESS_FEATURE_FIELDS,
};
pub use self::config::Settings;
pub use error::{PipelineError, PipelineResult};
pub use pipeline::{load_snapshot, Snapshot};
pub use plugins::{NormalizedRecord, PluginKind};
