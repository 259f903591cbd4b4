use crate::counters::{CounterCode, CounterValues};
use crate::kpi::{extremum, extremum_of, Extremum, Kpi, KpiInterval};
use crate::types::{
    CellInventoryRow, ExtremumRow, JoinMode, JoinedRow, KpiExtremes, KpiRow, KpiSummary, SiteCountRow,
    SiteMetadata, TrafficSummary, TrafficTrendRow, ZeroTrafficRow,
};
use crate::util::{average, format_kpi, ratio, round2};
use chrono::{Months, NaiveDateTime};
use std::collections::{BTreeMap, HashSet};

pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

fn fmt_time(ts: NaiveDateTime) -> String {
    ts.format(TIME_FORMAT).to_string()
}

/// Data traffic of a single row. `None` when either direction is unmeasured,
/// so such rows never count as zero-traffic.
fn row_traffic(values: &CounterValues) -> Option<f64> {
    Some(values.get(CounterCode::R1012_001)? + values.get(CounterCode::R1012_002)?)
}

pub fn kpi_table(series: &[KpiInterval]) -> Vec<KpiRow> {
    series
        .iter()
        .map(|i| {
            let v = |k: Kpi| format_kpi(i.kpis.get(k));
            KpiRow {
                start_time: fmt_time(i.interval_start),
                data_traffic_tb: v(Kpi::DataTrafficTb),
                vonr_traffic_kerl: v(Kpi::VonrTrafficKErl),
                radio_connect_rate: v(Kpi::RadioConnectRate),
                radio_drop_rate: v(Kpi::RadioDropRate),
                intra_handover_rate: v(Kpi::IntraHandoverRate),
                vonr_connect_rate: v(Kpi::VonrConnectRate),
                vonr_drop_rate: v(Kpi::VonrDropRate),
                vonr_handover_rate: v(Kpi::VonrHandoverRate),
            }
        })
        .collect()
}

/// One row per KPI with its chart annotations; KPIs without any defined
/// value read "no data".
pub fn extremes_table(series: &[KpiInterval]) -> Vec<ExtremumRow> {
    Kpi::ALL
        .iter()
        .map(|kpi| {
            let label = format!("{} ({})", kpi.name(), kpi.unit());
            match extremum(series, *kpi) {
                Some(e) => ExtremumRow {
                    kpi: label,
                    max_value: format_kpi(e.max_value),
                    max_time: fmt_time(e.max_at),
                    min_value: format_kpi(e.min_value),
                    min_time: fmt_time(e.min_at),
                },
                None => ExtremumRow {
                    kpi: label,
                    max_value: "no data".to_string(),
                    max_time: String::new(),
                    min_value: "no data".to_string(),
                    min_time: String::new(),
                },
            }
        })
        .collect()
}

pub fn kpi_summary(series: &[KpiInterval], join_mode: JoinMode) -> KpiSummary {
    let extremes = Kpi::ALL
        .iter()
        .map(|kpi| {
            let e = extremum(series, *kpi);
            KpiExtremes {
                kpi: kpi.name().to_string(),
                max_value: e.map(|e| round2(e.max_value)),
                max_time: e.map(|e| e.max_at),
                min_value: e.map(|e| round2(e.min_value)),
                min_time: e.map(|e| e.min_at),
            }
        })
        .collect();
    KpiSummary {
        join_mode: join_mode.to_string(),
        intervals: series.len(),
        first_interval: series.first().map(|i| i.interval_start),
        last_interval: series.last().map(|i| i.interval_start),
        extremes,
    }
}

/// Distinct base-station names, overall first, then per band.
pub fn site_counts(sites: &[&SiteMetadata]) -> Vec<SiteCountRow> {
    let mut all: HashSet<&str> = HashSet::new();
    let mut by_band: BTreeMap<&str, HashSet<&str>> = BTreeMap::new();
    for s in sites {
        if s.site_name.is_empty() {
            continue;
        }
        all.insert(&s.site_name);
        by_band.entry(s.band.as_str()).or_default().insert(&s.site_name);
    }

    let mut rows = vec![SiteCountRow {
        band: "all".to_string(),
        sites: all.len(),
    }];
    rows.extend(by_band.into_iter().map(|(band, names)| SiteCountRow {
        band: band.to_string(),
        sites: names.len(),
    }));
    rows
}

/// Traffic volumes per bucket with the distinct-cell count. `series` should
/// come from an aggregation run with cell counting enabled.
pub fn traffic_trend(series: &[KpiInterval]) -> Vec<TrafficTrendRow> {
    series
        .iter()
        .map(|i| TrafficTrendRow {
            start_time: fmt_time(i.interval_start),
            data_traffic_tb: format_kpi(i.kpis.get(Kpi::DataTrafficTb)),
            vonr_traffic_kerl: format_kpi(i.kpis.get(Kpi::VonrTrafficKErl)),
            cells: i.cell_count.unwrap_or_default(),
        })
        .collect()
}

/// Mean traffic over buckets no older than one calendar month before the
/// latest bucket.
pub fn recent_month_average(series: &[KpiInterval]) -> TrafficSummary {
    let Some(last) = series.last().map(|i| i.interval_start) else {
        return TrafficSummary {
            avg_traffic_tb: None,
            avg_vonr_kerl: None,
        };
    };
    let cutoff = last.checked_sub_months(Months::new(1)).unwrap_or(NaiveDateTime::MIN);
    let recent: Vec<&KpiInterval> = series.iter().filter(|i| i.interval_start >= cutoff).collect();
    let mean_of = |kpi: Kpi| {
        let values: Vec<f64> = recent.iter().map(|i| i.kpis.get(kpi)).collect();
        average(&values)
    };
    TrafficSummary {
        avg_traffic_tb: Some(round2(mean_of(Kpi::DataTrafficTb))),
        avg_vonr_kerl: Some(round2(mean_of(Kpi::VonrTrafficKErl))),
    }
}

/// `(bucket, zero-traffic cells, all cells)` for buckets with at least one
/// zero-traffic cell.
fn zero_traffic_counts(rows: &[JoinedRow<'_>]) -> Vec<(NaiveDateTime, usize, usize)> {
    #[derive(Default)]
    struct Acc<'r> {
        all: HashSet<&'r str>,
        zero: HashSet<&'r str>,
    }

    let mut buckets: BTreeMap<NaiveDateTime, Acc<'_>> = BTreeMap::new();
    for row in rows {
        let Some(ts) = row.record.interval_start else {
            continue;
        };
        let acc = buckets.entry(ts).or_default();
        let id = row.record.site_id.as_str();
        acc.all.insert(id);
        if row_traffic(&row.record.counters) == Some(0.0) {
            acc.zero.insert(id);
        }
    }

    buckets
        .into_iter()
        .filter(|(_, acc)| !acc.zero.is_empty())
        .map(|(ts, acc)| (ts, acc.zero.len(), acc.all.len()))
        .collect()
}

/// Per bucket: cells whose own traffic is zero against all cells reporting.
/// Buckets with no zero-traffic cell are left out.
pub fn zero_traffic_trend(rows: &[JoinedRow<'_>]) -> Vec<ZeroTrafficRow> {
    zero_traffic_counts(rows)
        .into_iter()
        .map(|(ts, zero, all)| ZeroTrafficRow {
            start_time: fmt_time(ts),
            zero_cells: zero,
            total_cells: all,
            zero_pct: format_kpi(100.0 * ratio(zero as f64, all as f64)),
        })
        .collect()
}

/// Extremes of the zero-traffic cell count, for chart annotation.
pub fn zero_traffic_extremes(rows: &[JoinedRow<'_>]) -> Option<Extremum> {
    extremum_of(
        zero_traffic_counts(rows)
            .into_iter()
            .map(|(ts, zero, _)| (ts, zero as f64)),
    )
}

/// Per bucket: distinct network elements, distinct cell names, and rows
/// carrying no traffic. Unlike the zero-traffic trend, a missing traffic
/// counter reads as zero here.
pub fn cell_inventory(rows: &[JoinedRow<'_>]) -> Vec<CellInventoryRow> {
    #[derive(Default)]
    struct Acc<'r> {
        elements: HashSet<&'r str>,
        cell_names: HashSet<&'r str>,
        zero_rows: usize,
    }

    let mut buckets: BTreeMap<NaiveDateTime, Acc<'_>> = BTreeMap::new();
    for row in rows {
        let Some(ts) = row.record.interval_start else {
            continue;
        };
        let acc = buckets.entry(ts).or_default();
        if let Some(site) = row.site {
            if !site.element_id.is_empty() {
                acc.elements.insert(&site.element_id);
            }
            if !site.cell_name.is_empty() {
                acc.cell_names.insert(&site.cell_name);
            }
        }
        let c = &row.record.counters;
        if c.value_or_zero(CounterCode::R1012_001) + c.value_or_zero(CounterCode::R1012_002) == 0.0 {
            acc.zero_rows += 1;
        }
    }

    buckets
        .into_iter()
        .map(|(ts, acc)| CellInventoryRow {
            start_time: fmt_time(ts),
            distinct_elements: acc.elements.len(),
            distinct_cell_names: acc.cell_names.len(),
            zero_traffic_rows: acc.zero_rows,
        })
        .collect()
}
