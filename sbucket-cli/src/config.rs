use std::fs;
use std::io;
use std::path::Path;

use sbucket_directory::DirectoryConfig;
use serde::{Deserialize, Serialize};

use crate::report::MeasurementTemplate;

/// Optional JSON settings file. Command-line flags take precedence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default)]
    pub projection: Option<String>,
    #[serde(default)]
    pub max_iterations: Option<usize>,
    #[serde(default)]
    pub countries: Vec<String>,
    #[serde(default)]
    pub online_only: Option<bool>,
    #[serde(default)]
    pub floor_cells: bool,
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub directory: DirectoryConfig,
    #[serde(default)]
    pub measurement: MeasurementTemplate,
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let data = fs::read(path)?;
        let cfg = serde_json::from_slice(&data)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        Ok(cfg)
    }
}
