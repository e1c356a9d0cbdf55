//! memfeat: turn directories of Volatility 3 plugin reports into feature files.
//!
//! Each positional argument is one snapshot directory holding `<plugin>.txt`
//! reports. Snapshots are independent and processed in parallel. Logs go to
//! stderr; stdout carries only the JSON run summary.

use anyhow::{bail, Context};
use clap::Parser;
use memfeat::output::{self, OutputSummary};
use memfeat::plugins::PLUGINS;
use memfeat::{load_snapshot, PluginKind, Settings};
use rayon::prelude::*;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "memfeat")]
#[command(about = "Build image- and process-level features from Volatility 3 reports")]
#[command(version)]
struct Cli {
    /// Snapshot directories, one per memory image.
    #[arg(required_unless_present = "list_plugins")]
    snapshots: Vec<PathBuf>,

    /// Output directory. With several snapshots, each gets a subdirectory
    /// named after its input directory (`-2`, `-3`, ... on repeated names).
    #[arg(short, long, default_value = "features")]
    output: PathBuf,

    /// Settings file (default: ./memfeat.toml if present).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Plugins to load, comma-separated (overrides settings).
    #[arg(long, value_delimiter = ',')]
    plugins: Option<Vec<String>>,

    /// Skip writing the per-plugin normalized JSON files.
    #[arg(long)]
    no_normalized: bool,

    /// Print the supported plugins and exit.
    #[arg(long)]
    list_plugins: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if cli.list_plugins {
        for (name, description, category) in PLUGINS {
            println!("{:<12} {:<10} {}", name, category, description);
        }
        return Ok(());
    }

    let mut settings = Settings::load(cli.config.as_deref()).context("loading settings")?;
    if let Some(plugins) = cli.plugins {
        settings.plugins = plugins;
    }
    if cli.no_normalized {
        settings.write_normalized = false;
    }
    for name in &settings.plugins {
        if PluginKind::from_name(name).is_none() {
            warn!("unsupported plugin '{}' will be ignored", name);
        }
    }

    info!(
        "processing {} snapshot(s) into {}",
        cli.snapshots.len(),
        cli.output.display()
    );

    let out_dirs = output_dirs(&cli.output, &cli.snapshots);
    let results: Vec<(PathBuf, anyhow::Result<OutputSummary>)> = cli
        .snapshots
        .par_iter()
        .zip(out_dirs.par_iter())
        .map(|(dir, out_dir)| (dir.clone(), process_snapshot(dir, out_dir, &settings)))
        .collect();

    let mut summaries = Vec::new();
    let mut failed = 0usize;
    for (dir, result) in results {
        match result {
            Ok(summary) => summaries.push(summary),
            Err(e) => {
                error!("{}: {:#}", dir.display(), e);
                failed += 1;
            }
        }
    }

    println!("{}", serde_json::to_string_pretty(&summaries)?);

    if failed > 0 {
        bail!("{} of {} snapshot(s) failed", failed, cli.snapshots.len());
    }
    Ok(())
}

fn process_snapshot(dir: &Path, out_dir: &Path, settings: &Settings) -> anyhow::Result<OutputSummary> {
    let snapshot = load_snapshot(dir, settings)?;
    let summary = output::write_snapshot(out_dir, &snapshot, settings.write_normalized)
        .with_context(|| format!("writing {}", out_dir.display()))?;
    Ok(summary)
}

/// One output directory per snapshot. A single snapshot writes straight into
/// `root`; several get `root/<dir name>`, with `-2`, `-3`, ... appended to
/// repeated names so no two snapshots share a directory.
fn output_dirs(root: &Path, snapshots: &[PathBuf]) -> Vec<PathBuf> {
    if snapshots.len() <= 1 {
        return vec![root.to_path_buf(); snapshots.len()];
    }

    let mut taken = HashSet::new();
    snapshots
        .iter()
        .map(|snapshot| {
            let base = snapshot
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "snapshot".to_string());
            let mut name = base.clone();
            let mut n = 1;
            while !taken.insert(name.clone()) {
                n += 1;
                name = format!("{}-{}", base, n);
            }
            root.join(name)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_cli_plugin_list_parsing() {
        let cli = Cli::try_parse_from(["memfeat", "a", "--plugins", "pslist,malfind"]).unwrap();
        assert_eq!(cli.plugins, Some(vec!["pslist".to_string(), "malfind".to_string()]));
        assert_eq!(cli.output, PathBuf::from("features"));
        assert!(Cli::try_parse_from(["memfeat"]).is_err());
        assert!(Cli::try_parse_from(["memfeat", "--list-plugins"]).is_ok());
    }

    #[test]
    fn test_single_snapshot_writes_to_root() {
        let dirs = output_dirs(Path::new("out"), &[PathBuf::from("/cases/img1")]);
        assert_eq!(dirs, vec![PathBuf::from("out")]);
    }

    #[test]
    fn test_same_named_snapshots_get_distinct_dirs() {
        let snapshots = [
            PathBuf::from("/case1/image"),
            PathBuf::from("/case2/image"),
            PathBuf::from("/case3/image-2"),
            PathBuf::from("/case4/other"),
        ];
        let dirs = output_dirs(Path::new("out"), &snapshots);
        assert_eq!(
            dirs,
            vec![
                PathBuf::from("out/image"),
                PathBuf::from("out/image-2"),
                PathBuf::from("out/image-2-2"),
                PathBuf::from("out/other"),
            ]
        );
        let unique: HashSet<_> = dirs.iter().collect();
        assert_eq!(unique.len(), dirs.len());
    }
}
