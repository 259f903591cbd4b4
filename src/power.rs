//! Equipment power consumption: per-model statistics and per-BBU
//! distributions of the derived device power.

use crate::types::{PowerDistributionRow, PowerRecord, PowerSummaryRow};
use crate::util::{average, format_kpi, percentile, ratio};
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

/// RRU share multiplier applied per antenna.
const RRU_FACTOR: f64 = 3.0;

#[derive(Debug, Clone, PartialEq)]
pub struct DevicePower {
    pub model: String,
    pub bbu_name: String,
    pub device_power: f64,
}

/// Drops excluded models and rows with zero BBU or RRU readings, then derives
/// `bbu_energy_kwh + rru_total_power / antenna_count * 3` for the rest.
/// Rows reporting no antennas cannot be apportioned and are dropped too.
pub fn device_power(records: &[PowerRecord], excluded_model: &str) -> Vec<DevicePower> {
    let out: Vec<DevicePower> = records
        .iter()
        .filter(|r| excluded_model.is_empty() || !r.model.contains(excluded_model))
        .filter(|r| r.bbu_power_w != 0.0 && r.rru_total_power != 0.0)
        .filter(|r| r.antenna_count != 0.0)
        .map(|r| DevicePower {
            model: r.model.clone(),
            bbu_name: r.bbu_name.clone(),
            device_power: r.bbu_energy_kwh + (r.rru_total_power / r.antenna_count) * RRU_FACTOR,
        })
        .collect();
    debug!(input = records.len(), kept = out.len(), "derived device power");
    out
}

/// Distinct models in first-seen order, for the model picker.
pub fn model_list(devices: &[DevicePower]) -> Vec<String> {
    let mut seen = HashSet::new();
    devices
        .iter()
        .filter(|d| seen.insert(d.model.as_str()))
        .map(|d| d.model.clone())
        .collect()
}

/// Keeps devices of the chosen models; `None` keeps everything.
pub fn select_models<'a>(devices: &'a [DevicePower], models: Option<&[String]>) -> Vec<&'a DevicePower> {
    devices
        .iter()
        .filter(|d| models.map_or(true, |m| m.iter().any(|x| *x == d.model)))
        .collect()
}

fn group_values<'a, F>(devices: &[&'a DevicePower], key: F) -> BTreeMap<&'a str, Vec<f64>>
where
    F: Fn(&'a DevicePower) -> &'a str,
{
    let mut groups: BTreeMap<&'a str, Vec<f64>> = BTreeMap::new();
    for &d in devices {
        groups.entry(key(d)).or_default().push(d.device_power);
    }
    groups
}

/// Mean, max and min per model, ordered by model name. The ratios express how
/// far max and min stray from the mean, in percent.
pub fn power_summary(devices: &[&DevicePower]) -> Vec<PowerSummaryRow> {
    group_values(devices, |d| d.model.as_str())
        .into_iter()
        .map(|(model, values)| {
            let mean = average(&values);
            let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let min = values.iter().copied().fold(f64::INFINITY, f64::min);
            PowerSummaryRow {
                model: model.to_string(),
                mean: format_kpi(mean),
                max: format_kpi(max),
                min: format_kpi(min),
                max_ratio: format_kpi(100.0 * ratio(max - mean, mean)),
                min_ratio: format_kpi(100.0 * ratio(mean - min, mean)),
            }
        })
        .collect()
}

/// Five-number summary of device power per BBU, ordered by BBU name.
pub fn power_distribution(devices: &[&DevicePower]) -> Vec<PowerDistributionRow> {
    group_values(devices, |d| d.bbu_name.as_str())
        .into_iter()
        .map(|(bbu_name, mut values)| {
            values.sort_by(f64::total_cmp);
            PowerDistributionRow {
                bbu_name: bbu_name.to_string(),
                count: values.len(),
                min: format_kpi(percentile(&values, 0.0)),
                q1: format_kpi(percentile(&values, 25.0)),
                median: format_kpi(percentile(&values, 50.0)),
                q3: format_kpi(percentile(&values, 75.0)),
                max: format_kpi(percentile(&values, 100.0)),
            }
        })
        .collect()
}
