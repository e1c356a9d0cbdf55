//! Settings for the memfeat CLI.
//!
//! [`Settings::load`] layers, lowest first: the built-in defaults below, an
//! optional TOML file (`memfeat.toml` in the working directory unless a path
//! is given) and `MEMFEAT_*` environment variables. `MEMFEAT_PLUGINS` takes a
//! comma-separated list.

use crate::error::PipelineResult;
use serde::Deserialize;
use std::path::Path;

const DEFAULT_SETTINGS: &str = r#"
plugins = [
    "windows.pslist",
    "windows.dlllist",
    "windows.handles",
    "windows.ldrmodules",
    "windows.malfind",
    "windows.psxview",
    "windows.svcscan",
]
report_extension = "txt"
write_normalized = true
"#;

const DEFAULT_FILE: &str = "memfeat.toml";
const ENV_PREFIX: &str = "MEMFEAT";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Settings {
    /// Plugin reports to look for in each snapshot directory.
    pub plugins: Vec<String>,
    /// Extension of report files, without the dot.
    pub report_extension: String,
    /// Also write `<plugin>.json` with the normalized records.
    pub write_normalized: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self::defaults()
    }
}

impl Settings {
    pub fn load(file: Option<&Path>) -> PipelineResult<Self> {
        let file_source = match file {
            Some(path) => config::File::from(path).required(true),
            None => config::File::with_name(DEFAULT_FILE).required(false),
        };

        let settings = config::Config::builder()
            .add_source(config::File::from_str(DEFAULT_SETTINGS, config::FileFormat::Toml))
            .add_source(file_source)
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("plugins"),
            )
            .build()?
            .try_deserialize()?;
        Ok(settings)
    }

    /// The built-in defaults, without reading files or the environment.
    pub fn defaults() -> Self {
        config::Config::builder()
            .add_source(config::File::from_str(DEFAULT_SETTINGS, config::FileFormat::Toml))
            .build()
            .and_then(config::Config::try_deserialize)
            .expect("built-in default settings must be valid")
    }
}
