//! Artifact writers for one processed snapshot.
//!
//! Layout under the output directory:
//!
//! ```text
//! <plugin>.json            normalized records (when enabled)
//! features_image.json      one flat object, every image feature key
//! features_process.json    list of per-process objects
//! features_process.csv     same rows, header = PROCESS_FEATURE_FIELDS
//! ```

use crate::analyzers::image_features::FeatureVector;
use crate::analyzers::process_features::{ProcessFeatures, PROCESS_FEATURE_FIELDS};
use crate::error::PipelineResult;
use crate::pipeline::Snapshot;
use crate::plugins::PluginKind;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

pub const IMAGE_FEATURES_FILE: &str = "features_image.json";
pub const PROCESS_FEATURES_JSON: &str = "features_process.json";
pub const PROCESS_FEATURES_CSV: &str = "features_process.csv";

/// What [`write_snapshot`] produced.
#[derive(Debug, Clone, Serialize)]
pub struct OutputSummary {
    pub output_dir: PathBuf,
    pub processes: usize,
    pub files: Vec<PathBuf>,
}

pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> PipelineResult<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

/// Quote a CSV cell when it holds a delimiter, quote or line break.
fn csv_escape(cell: &str) -> String {
    if cell.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", cell.replace('"', "\"\""))
    } else {
        cell.to_string()
    }
}

pub fn write_process_csv<W: Write>(mut out: W, records: &[ProcessFeatures]) -> std::io::Result<()> {
    writeln!(out, "{}", PROCESS_FEATURE_FIELDS.join(","))?;
    for record in records {
        let cells: Vec<String> = record.csv_cells().iter().map(|c| csv_escape(c)).collect();
        writeln!(out, "{}", cells.join(","))?;
    }
    out.flush()
}

/// Aggregate `snapshot` and write every artifact into `out_dir`.
pub fn write_snapshot(
    out_dir: &Path,
    snapshot: &Snapshot,
    write_normalized: bool,
) -> PipelineResult<OutputSummary> {
    fs::create_dir_all(out_dir)?;
    let mut files = Vec::new();

    if write_normalized {
        for kind in PluginKind::ALL {
            let path = out_dir.join(format!("{}.json", kind.short_name()));
            write_json(&path, &snapshot.records(kind))?;
            files.push(path);
        }
    }

    let image: FeatureVector = snapshot.image_features();
    let path = out_dir.join(IMAGE_FEATURES_FILE);
    write_json(&path, &image)?;
    files.push(path);

    let processes = snapshot.process_features();
    let path = out_dir.join(PROCESS_FEATURES_JSON);
    write_json(&path, &processes)?;
    files.push(path);

    let path = out_dir.join(PROCESS_FEATURES_CSV);
    write_process_csv(BufWriter::new(File::create(&path)?), &processes)?;
    files.push(path);

    info!(
        "{}: wrote {} files ({} processes)",
        out_dir.display(),
        files.len(),
        processes.len()
    );

    Ok(OutputSummary {
        output_dir: out_dir.to_path_buf(),
        processes: processes.len(),
        files,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::image_features::IMAGE_FEATURE_NAMES;
    use tempfile::TempDir;

    fn snapshot() -> Snapshot {
        let mut snap = Snapshot::new();
        snap.ingest(
            "pslist",
            "PID PPID ImageFileName Threads Handles SessionId\n4 0 System 120 0 0\n612 4 a,b.exe 3 9 1\n",
        );
        snap
    }

    #[test]
    fn test_csv_escape() {
        assert_eq!(csv_escape("plain"), "plain");
        assert_eq!(csv_escape("a,b"), "\"a,b\"");
        assert_eq!(csv_escape("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn test_process_csv_layout() {
        let mut buf = Vec::new();
        write_process_csv(&mut buf, &snapshot().process_features()).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("pid,name,ppid,"));
        assert!(lines[1].starts_with("4,System,0,120,0,0,"));
        assert!(lines[2].starts_with("612,\"a,b.exe\",4,"));
    }

    #[test]
    fn test_write_snapshot_artifacts() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("out");
        let summary = write_snapshot(&out, &snapshot(), true).unwrap();
        assert_eq!(summary.processes, 2);
        assert_eq!(summary.files.len(), PluginKind::ALL.len() + 3);

        let image: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(out.join(IMAGE_FEATURES_FILE)).unwrap()).unwrap();
        let image = image.as_object().unwrap();
        assert_eq!(image.len(), IMAGE_FEATURE_NAMES.len());
        assert_eq!(image["pslist.nproc"], 2);

        let pslist: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(out.join("pslist.json")).unwrap()).unwrap();
        assert_eq!(pslist[1]["image_name"], "a,b.exe");

        let malfind = fs::read_to_string(out.join("malfind.json")).unwrap();
        assert_eq!(malfind.trim(), "[]");
    }

    #[test]
    fn test_write_snapshot_without_normalized() {
        let dir = TempDir::new().unwrap();
        let summary = write_snapshot(dir.path(), &Snapshot::new(), false).unwrap();
        assert_eq!(summary.files.len(), 3);
        assert!(!dir.path().join("pslist.json").exists());
        let csv = fs::read_to_string(dir.path().join(PROCESS_FEATURES_CSV)).unwrap();
        assert_eq!(csv.lines().count(), 1);
    }
}
