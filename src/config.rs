use crate::error::{KpiError, Result};
use crate::types::JoinMode;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub data_dir: PathBuf,
    pub sites_file: String,
    pub counters_file: String,
    pub power_file: String,
    pub output_dir: PathBuf,
    pub join_mode: JoinMode,
    /// Power records whose model contains this text are left out.
    pub power_excluded_model: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            sites_file: "gdf_RAC.csv".to_string(),
            counters_file: "df_KPI.csv".to_string(),
            power_file: "df_BRP.csv".to_string(),
            output_dir: PathBuf::from("."),
            join_mode: JoinMode::Left,
            power_excluded_model: "D5S".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from any key lookup; unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();
        Ok(Self {
            data_dir: lookup("RAN_KPI_DATA_DIR").map(PathBuf::from).unwrap_or(defaults.data_dir),
            sites_file: lookup("RAN_KPI_SITES_FILE").unwrap_or(defaults.sites_file),
            counters_file: lookup("RAN_KPI_COUNTERS_FILE").unwrap_or(defaults.counters_file),
            power_file: lookup("RAN_KPI_POWER_FILE").unwrap_or(defaults.power_file),
            output_dir: lookup("RAN_KPI_OUTPUT_DIR").map(PathBuf::from).unwrap_or(defaults.output_dir),
            join_mode: match lookup("RAN_KPI_JOIN_MODE") {
                Some(raw) => raw.parse()?,
                None => defaults.join_mode,
            },
            power_excluded_model: lookup("RAN_KPI_POWER_EXCLUDED_MODEL").unwrap_or(defaults.power_excluded_model),
        })
    }

    pub fn sites_path(&self) -> PathBuf {
        self.data_dir.join(&self.sites_file)
    }

    pub fn counters_path(&self) -> PathBuf {
        self.data_dir.join(&self.counters_file)
    }

    pub fn power_path(&self) -> PathBuf {
        self.data_dir.join(&self.power_file)
    }

    pub fn output_path(&self, file: &str) -> PathBuf {
        self.output_dir.join(file)
    }

    /// Creates the output directory if needed.
    pub fn ensure_output_dir(&self) -> Result<()> {
        std::fs::create_dir_all(&self.output_dir).map_err(KpiError::from)
    }
}
