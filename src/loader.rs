use crate::counters::{looks_like_counter, CounterCode, CounterValues};
use crate::error::{KpiError, Result};
use crate::types::{CounterRecord, PowerRecord, RawPowerRow, RawSiteRow, SiteMetadata};
use crate::util::{parse_counter_cell, parse_f64_safe, parse_timestamp_safe, CounterCell};
use csv::{ReaderBuilder, StringRecord};
use serde::Serialize;
use std::collections::HashSet;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info, warn};

const SITE_ID_HEADERS: &[&str] = &["ID"];
const START_TIME_HEADERS: &[&str] = &["startTime", "开始时间"];

/// Data-quality counts gathered while reading the source tables.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LoadReport {
    pub site_rows: usize,
    pub duplicate_sites: usize,
    pub counter_rows: usize,
    pub unparsed_timestamps: usize,
    pub coerced_counter_values: usize,
    pub skipped_rows: usize,
    pub missing_counters: Vec<String>,
}

/// Immutable source tables, loaded once per process.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub sites: Vec<SiteMetadata>,
    pub counters: Vec<CounterRecord>,
    pub report: LoadReport,
}

impl Dataset {
    pub fn load(sites_path: &Path, counters_path: &Path) -> Result<Self> {
        let mut report = LoadReport::default();
        let sites = load_sites(sites_path, &mut report)?;
        let counters = load_counters(counters_path, &mut report)?;
        info!(
            sites = sites.len(),
            counter_rows = counters.len(),
            skipped = report.skipped_rows,
            unparsed_timestamps = report.unparsed_timestamps,
            "dataset loaded"
        );
        Ok(Self { sites, counters, report })
    }
}

fn clean(s: Option<String>) -> String {
    s.map(|v| v.trim().to_string()).unwrap_or_default()
}

fn open(path: &Path) -> Result<csv::Reader<std::fs::File>> {
    Ok(ReaderBuilder::new().flexible(true).trim(csv::Trim::Headers).from_path(path)?)
}

fn require_column(headers: &StringRecord, names: &[&str], file: &str) -> Result<usize> {
    // Spreadsheet exports may prefix the first header with a BOM.
    headers
        .iter()
        .position(|h| names.contains(&h.trim_start_matches('\u{feff}')))
        .ok_or_else(|| KpiError::MissingColumns {
            file: file.to_string(),
            columns: vec![names[0].to_string()],
        })
}

pub fn load_sites(path: &Path, report: &mut LoadReport) -> Result<Vec<SiteMetadata>> {
    read_sites(open(path)?, &path.display().to_string(), report)
}

/// Reads site metadata from any CSV source. Rows without an `ID` are skipped;
/// repeated ids keep their first row.
pub fn read_sites<R: Read>(mut rdr: csv::Reader<R>, file: &str, report: &mut LoadReport) -> Result<Vec<SiteMetadata>> {
    require_column(rdr.headers()?, SITE_ID_HEADERS, file)?;

    let mut seen: HashSet<String> = HashSet::new();
    let mut sites = Vec::new();
    for result in rdr.deserialize::<RawSiteRow>() {
        let row = match result {
            Ok(r) => r,
            Err(e) => {
                debug!(file, error = %e, "skipping unreadable site row");
                report.skipped_rows += 1;
                continue;
            }
        };
        let site_id = clean(row.id);
        if site_id.is_empty() {
            report.skipped_rows += 1;
            continue;
        }
        if !seen.insert(site_id.clone()) {
            report.duplicate_sites += 1;
            continue;
        }
        sites.push(SiteMetadata {
            site_id,
            band: clean(row.band),
            province: clean(row.province),
            city: clean(row.city),
            county: clean(row.county),
            town: clean(row.town),
            village: clean(row.village),
            site_name: clean(row.site_name),
            cell_name: clean(row.cell_name),
            element_id: clean(row.element_id),
            longitude: parse_f64_safe(row.longitude.as_deref()),
            latitude: parse_f64_safe(row.latitude.as_deref()),
        });
    }

    if report.duplicate_sites > 0 {
        warn!(file, duplicates = report.duplicate_sites, "duplicate site ids ignored");
    }
    report.site_rows = sites.len();
    Ok(sites)
}

pub fn load_counters(path: &Path, report: &mut LoadReport) -> Result<Vec<CounterRecord>> {
    read_counters(open(path)?, &path.display().to_string(), report)
}

/// Reads counter records from any CSV source.
///
/// Known counter columns are mapped onto [`CounterCode`]s; other columns are
/// ignored. Non-numeric counter cells become zero, empty ones stay missing,
/// and unparseable timestamps are kept as `None`.
pub fn read_counters<R: Read>(mut rdr: csv::Reader<R>, file: &str, report: &mut LoadReport) -> Result<Vec<CounterRecord>> {
    let headers = rdr.headers()?.clone();
    let id_col = require_column(&headers, SITE_ID_HEADERS, file)?;
    let ts_col = require_column(&headers, START_TIME_HEADERS, file)?;

    let mut columns: Vec<(usize, CounterCode)> = Vec::new();
    for (idx, header) in headers.iter().enumerate() {
        match header.parse::<CounterCode>() {
            Ok(code) => columns.push((idx, code)),
            Err(_) if looks_like_counter(header) => {
                debug!(file, header, "ignoring counter column not used by any KPI")
            }
            Err(_) => {}
        }
    }

    let present: HashSet<CounterCode> = columns.iter().map(|(_, c)| *c).collect();
    report.missing_counters = CounterCode::ALL
        .iter()
        .filter(|c| !present.contains(*c))
        .map(|c| c.as_str().to_string())
        .collect();
    if !report.missing_counters.is_empty() {
        warn!(
            file,
            missing = %report.missing_counters.join(","),
            "counter columns absent; dependent KPIs will be undefined"
        );
    }

    let mut records = Vec::new();
    for result in rdr.records() {
        let row = match result {
            Ok(r) => r,
            Err(e) => {
                debug!(file, error = %e, "skipping unreadable counter row");
                report.skipped_rows += 1;
                continue;
            }
        };
        let site_id = row.get(id_col).map(str::trim).unwrap_or_default();
        if site_id.is_empty() {
            report.skipped_rows += 1;
            continue;
        }

        let interval_start = parse_timestamp_safe(row.get(ts_col));
        if interval_start.is_none() {
            report.unparsed_timestamps += 1;
        }

        let mut counters = CounterValues::default();
        for (idx, code) in &columns {
            let value = match parse_counter_cell(row.get(*idx).unwrap_or_default()) {
                CounterCell::Missing => None,
                CounterCell::Value(v) => Some(v),
                CounterCell::Malformed => {
                    report.coerced_counter_values += 1;
                    Some(0.0)
                }
            };
            counters.set(*code, value);
        }

        records.push(CounterRecord {
            site_id: site_id.to_string(),
            interval_start,
            counters,
        });
    }

    if report.coerced_counter_values > 0 {
        warn!(file, cells = report.coerced_counter_values, "non-numeric counter values read as zero");
    }
    if report.unparsed_timestamps > 0 {
        warn!(file, rows = report.unparsed_timestamps, "rows with unparseable start time");
    }
    report.counter_rows = records.len();
    Ok(records)
}

pub fn load_power(path: &Path) -> Result<Vec<PowerRecord>> {
    read_power(open(path)?, &path.display().to_string())
}

/// Reads equipment power rows. Rows whose numeric fields cannot be parsed are
/// skipped; filtering by model and zero readings is left to the analysis.
pub fn read_power<R: Read>(mut rdr: csv::Reader<R>, file: &str) -> Result<Vec<PowerRecord>> {
    require_column(rdr.headers()?, &["Model"], file)?;

    let mut records = Vec::new();
    let mut skipped = 0usize;
    for result in rdr.deserialize::<RawPowerRow>() {
        let row = match result {
            Ok(r) => r,
            Err(_) => {
                skipped += 1;
                continue;
            }
        };
        let parsed = (
            parse_f64_safe(row.bbu_power_w.as_deref()),
            parse_f64_safe(row.rru_total_power.as_deref()),
            parse_f64_safe(row.bbu_energy_kwh.as_deref()),
            parse_f64_safe(row.antenna_count.as_deref()),
        );
        let (Some(bbu_power_w), Some(rru_total_power), Some(bbu_energy_kwh), Some(antenna_count)) = parsed else {
            skipped += 1;
            continue;
        };
        records.push(PowerRecord {
            model: clean(row.model),
            bbu_name: clean(row.bbu_name),
            bbu_power_w,
            rru_total_power,
            bbu_energy_kwh,
            antenna_count,
        });
    }

    info!(file, rows = records.len(), skipped, "power records loaded");
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reader(data: &str) -> csv::Reader<&[u8]> {
        ReaderBuilder::new().flexible(true).from_reader(data.as_bytes())
    }

    #[test]
    fn test_read_sites_accepts_source_headers() {
        let data = "ID,工作频段,地市,县区,镇区,村区,基站名称\n1,n41,CityA,C1,T1,V1,SiteA\n2,n28,CityB,C2,T2,V2,SiteB\n";
        let mut report = LoadReport::default();
        let sites = read_sites(reader(data), "sites", &mut report).unwrap();
        assert_eq!(sites.len(), 2);
        assert_eq!(sites[0].band, "n41");
        assert_eq!(sites[1].city, "CityB");
        assert_eq!(sites[1].site_name, "SiteB");
        assert_eq!(sites[0].province, "");
        assert_eq!(report.site_rows, 2);
    }

    #[test]
    fn test_read_sites_skips_duplicates_and_blank_ids() {
        let data = "ID,workingBand\n1,n41\n1,n28\n,n41\n";
        let mut report = LoadReport::default();
        let sites = read_sites(reader(data), "sites", &mut report).unwrap();
        assert_eq!(sites.len(), 1);
        assert_eq!(sites[0].band, "n41");
        assert_eq!(report.duplicate_sites, 1);
        assert_eq!(report.skipped_rows, 1);
    }

    #[test]
    fn test_read_sites_requires_id() {
        let data = "workingBand,city\nn41,A\n";
        let err = read_sites(reader(data), "sites", &mut LoadReport::default()).unwrap_err();
        assert!(matches!(err, KpiError::MissingColumns { .. }));
    }

    #[test]
    fn test_read_counters_lenient_values() {
        let data = "ID,开始时间,R1012_001,R1012_002,R1504_002\n\
                    1,2024-01-01 00:00:00,100,oops,7\n\
                    2,bad-date,,50,7\n";
        let mut report = LoadReport::default();
        let recs = read_counters(reader(data), "kpi", &mut report).unwrap();

        assert_eq!(recs.len(), 2);
        assert_eq!(recs[0].counters.get(CounterCode::R1012_001), Some(100.0));
        assert_eq!(recs[0].counters.get(CounterCode::R1012_002), Some(0.0));
        assert_eq!(recs[1].counters.get(CounterCode::R1012_001), None);
        assert!(recs[1].interval_start.is_none());

        assert_eq!(report.coerced_counter_values, 1);
        assert_eq!(report.unparsed_timestamps, 1);
        assert!(report.missing_counters.contains(&"K1009_001".to_string()));
        assert!(!report.missing_counters.contains(&"R1012_001".to_string()));
    }

    #[test]
    fn test_read_counters_requires_start_time() {
        let data = "ID,R1012_001\n1,5\n";
        let err = read_counters(reader(data), "kpi", &mut LoadReport::default()).unwrap_err();
        match err {
            KpiError::MissingColumns { columns, .. } => assert_eq!(columns, vec!["startTime"]),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_read_power_skips_unparseable() {
        let data = "Model,BBU名称,BBU功耗(R1054_001)[W],RRU总功耗,BBU功耗[千瓦时],天线数量\n\
                    M1,B1,100,64,2.5,4\n\
                    M2,B2,x,64,2.5,4\n";
        let recs = read_power(reader(data), "power").unwrap();
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].bbu_name, "B1");
        assert_eq!(recs[0].antenna_count, 4.0);
    }
}
