use crate::counters::{CounterSums, CounterValues};
use crate::error::KpiError;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tabled::Tabled;

/// One row of the site/cell metadata export, before cleaning.
#[derive(Debug, Deserialize)]
pub struct RawSiteRow {
    #[serde(rename = "ID")]
    pub id: Option<String>,
    #[serde(rename = "workingBand", alias = "工作频段", default)]
    pub band: Option<String>,
    #[serde(rename = "province", alias = "省份", default)]
    pub province: Option<String>,
    #[serde(rename = "city", alias = "地市", default)]
    pub city: Option<String>,
    #[serde(rename = "county", alias = "县区", default)]
    pub county: Option<String>,
    #[serde(rename = "town", alias = "镇区", default)]
    pub town: Option<String>,
    #[serde(rename = "village", alias = "村区", default)]
    pub village: Option<String>,
    #[serde(rename = "siteName", alias = "基站名称", default)]
    pub site_name: Option<String>,
    #[serde(rename = "cellName", alias = "小区名称", default)]
    pub cell_name: Option<String>,
    #[serde(rename = "elementId", alias = "网元标识", default)]
    pub element_id: Option<String>,
    #[serde(rename = "longitude", alias = "Longitude", default)]
    pub longitude: Option<String>,
    #[serde(rename = "latitude", alias = "Latitude", default)]
    pub latitude: Option<String>,
}

/// Descriptive attributes of one cell. `site_id` is unique per table.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SiteMetadata {
    pub site_id: String,
    pub band: String,
    pub province: String,
    pub city: String,
    pub county: String,
    pub town: String,
    pub village: String,
    pub site_name: String,
    pub cell_name: String,
    pub element_id: String,
    pub longitude: Option<f64>,
    pub latitude: Option<f64>,
}

/// One measurement interval of one cell.
///
/// `interval_start` is `None` when the source timestamp could not be parsed;
/// such records survive joins but never land in an aggregation bucket.
#[derive(Debug, Clone, PartialEq)]
pub struct CounterRecord {
    pub site_id: String,
    pub interval_start: Option<NaiveDateTime>,
    pub counters: CounterValues,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JoinMode {
    /// Drop counter records without metadata.
    Inner,
    /// Keep counter records without metadata, with no metadata attached.
    #[default]
    Left,
}

impl FromStr for JoinMode {
    type Err = KpiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "inner" => Ok(JoinMode::Inner),
            "left" => Ok(JoinMode::Left),
            other => Err(KpiError::InvalidConfig(format!(
                "join mode must be 'inner' or 'left', got '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for JoinMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JoinMode::Inner => f.write_str("inner"),
            JoinMode::Left => f.write_str("left"),
        }
    }
}

/// A counter record with its (optional) metadata attached.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JoinedRow<'a> {
    pub record: &'a CounterRecord,
    pub site: Option<&'a SiteMetadata>,
}

/// Counter totals of every row sharing one `interval_start`.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedInterval {
    pub interval_start: NaiveDateTime,
    pub sums: CounterSums,
    pub row_count: usize,
    /// Distinct `site_id`s in the bucket, when requested.
    pub cell_count: Option<usize>,
}

/// One row of the equipment power export, before cleaning.
#[derive(Debug, Deserialize)]
pub struct RawPowerRow {
    #[serde(rename = "Model")]
    pub model: Option<String>,
    #[serde(rename = "bbuName", alias = "BBU名称", default)]
    pub bbu_name: Option<String>,
    #[serde(rename = "bbuPowerW", alias = "BBU功耗(R1054_001)[W]", default)]
    pub bbu_power_w: Option<String>,
    #[serde(rename = "rruTotalPower", alias = "RRU总功耗", default)]
    pub rru_total_power: Option<String>,
    #[serde(rename = "bbuEnergyKwh", alias = "BBU功耗[千瓦时]", default)]
    pub bbu_energy_kwh: Option<String>,
    #[serde(rename = "antennaCount", alias = "天线数量", default)]
    pub antenna_count: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PowerRecord {
    pub model: String,
    pub bbu_name: String,
    pub bbu_power_w: f64,
    pub rru_total_power: f64,
    pub bbu_energy_kwh: f64,
    pub antenna_count: f64,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct KpiRow {
    #[serde(rename = "StartTime")]
    #[tabled(rename = "StartTime")]
    pub start_time: String,
    #[serde(rename = "DataTrafficTB")]
    #[tabled(rename = "DataTrafficTB")]
    pub data_traffic_tb: String,
    #[serde(rename = "VonrTrafficKErl")]
    #[tabled(rename = "VonrTrafficKErl")]
    pub vonr_traffic_kerl: String,
    #[serde(rename = "RadioConnectRate")]
    #[tabled(rename = "RadioConnectRate")]
    pub radio_connect_rate: String,
    #[serde(rename = "RadioDropRate")]
    #[tabled(rename = "RadioDropRate")]
    pub radio_drop_rate: String,
    #[serde(rename = "IntraHandoverRate")]
    #[tabled(rename = "IntraHandoverRate")]
    pub intra_handover_rate: String,
    #[serde(rename = "VonrConnectRate")]
    #[tabled(rename = "VonrConnectRate")]
    pub vonr_connect_rate: String,
    #[serde(rename = "VonrDropRate")]
    #[tabled(rename = "VonrDropRate")]
    pub vonr_drop_rate: String,
    #[serde(rename = "VonrHandoverRate")]
    #[tabled(rename = "VonrHandoverRate")]
    pub vonr_handover_rate: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct ExtremumRow {
    #[serde(rename = "Kpi")]
    #[tabled(rename = "Kpi")]
    pub kpi: String,
    #[serde(rename = "Max")]
    #[tabled(rename = "Max")]
    pub max_value: String,
    #[serde(rename = "MaxTime")]
    #[tabled(rename = "MaxTime")]
    pub max_time: String,
    #[serde(rename = "Min")]
    #[tabled(rename = "Min")]
    pub min_value: String,
    #[serde(rename = "MinTime")]
    #[tabled(rename = "MinTime")]
    pub min_time: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct TrafficTrendRow {
    #[serde(rename = "StartTime")]
    #[tabled(rename = "StartTime")]
    pub start_time: String,
    #[serde(rename = "DataTrafficTB")]
    #[tabled(rename = "DataTrafficTB")]
    pub data_traffic_tb: String,
    #[serde(rename = "VonrTrafficKErl")]
    #[tabled(rename = "VonrTrafficKErl")]
    pub vonr_traffic_kerl: String,
    #[serde(rename = "Cells")]
    #[tabled(rename = "Cells")]
    pub cells: usize,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct ZeroTrafficRow {
    #[serde(rename = "StartTime")]
    #[tabled(rename = "StartTime")]
    pub start_time: String,
    #[serde(rename = "ZeroTrafficCells")]
    #[tabled(rename = "ZeroTrafficCells")]
    pub zero_cells: usize,
    #[serde(rename = "TotalCells")]
    #[tabled(rename = "TotalCells")]
    pub total_cells: usize,
    #[serde(rename = "ZeroTrafficPct")]
    #[tabled(rename = "ZeroTrafficPct")]
    pub zero_pct: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct CellInventoryRow {
    #[serde(rename = "StartTime")]
    #[tabled(rename = "StartTime")]
    pub start_time: String,
    #[serde(rename = "DistinctElements")]
    #[tabled(rename = "DistinctElements")]
    pub distinct_elements: usize,
    #[serde(rename = "DistinctCellNames")]
    #[tabled(rename = "DistinctCellNames")]
    pub distinct_cell_names: usize,
    #[serde(rename = "ZeroTrafficRows")]
    #[tabled(rename = "ZeroTrafficRows")]
    pub zero_traffic_rows: usize,
}

#[derive(Debug, Serialize, Tabled, Clone, PartialEq)]
pub struct SiteCountRow {
    #[serde(rename = "Band")]
    #[tabled(rename = "Band")]
    pub band: String,
    #[serde(rename = "Sites")]
    #[tabled(rename = "Sites")]
    pub sites: usize,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct PowerSummaryRow {
    #[serde(rename = "Model")]
    #[tabled(rename = "Model")]
    pub model: String,
    #[serde(rename = "Mean")]
    #[tabled(rename = "Mean")]
    pub mean: String,
    #[serde(rename = "Max")]
    #[tabled(rename = "Max")]
    pub max: String,
    #[serde(rename = "Min")]
    #[tabled(rename = "Min")]
    pub min: String,
    #[serde(rename = "MaxRatioPct")]
    #[tabled(rename = "MaxRatioPct")]
    pub max_ratio: String,
    #[serde(rename = "MinRatioPct")]
    #[tabled(rename = "MinRatioPct")]
    pub min_ratio: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct PowerDistributionRow {
    #[serde(rename = "BbuName")]
    #[tabled(rename = "BbuName")]
    pub bbu_name: String,
    #[serde(rename = "Count")]
    #[tabled(rename = "Count")]
    pub count: usize,
    #[serde(rename = "Min")]
    #[tabled(rename = "Min")]
    pub min: String,
    #[serde(rename = "Q1")]
    #[tabled(rename = "Q1")]
    pub q1: String,
    #[serde(rename = "Median")]
    #[tabled(rename = "Median")]
    pub median: String,
    #[serde(rename = "Q3")]
    #[tabled(rename = "Q3")]
    pub q3: String,
    #[serde(rename = "Max")]
    #[tabled(rename = "Max")]
    pub max: String,
}

/// Machine-readable companion of the KPI tables, written as JSON.
#[derive(Debug, Serialize)]
pub struct KpiSummary {
    pub join_mode: String,
    pub intervals: usize,
    pub first_interval: Option<NaiveDateTime>,
    pub last_interval: Option<NaiveDateTime>,
    pub extremes: Vec<KpiExtremes>,
}

#[derive(Debug, Serialize)]
pub struct KpiExtremes {
    pub kpi: String,
    pub max_value: Option<f64>,
    pub max_time: Option<NaiveDateTime>,
    pub min_value: Option<f64>,
    pub min_time: Option<NaiveDateTime>,
}

/// Recent-month daily averages shown beside the traffic trend.
#[derive(Debug, Serialize, Clone, Copy, PartialEq)]
pub struct TrafficSummary {
    pub avg_traffic_tb: Option<f64>,
    pub avg_vonr_kerl: Option<f64>,
}
