use chrono::NaiveDate;
use ran_kpi::counters::CounterCode;
use ran_kpi::filter::filter_sites;
use ran_kpi::loader::{load_power, Dataset};
use ran_kpi::output;
use ran_kpi::types::JoinedRow;
use ran_kpi::util::round2;
use ran_kpi::{
    aggregate, candidate_values, derive_kpis, extremum, filter, join, power, reports, FilterField, FilterSelection,
    JoinMode, Kpi,
};
use std::path::{Path, PathBuf};

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(name)
}

fn dataset() -> Dataset {
    Dataset::load(&fixture("sites.csv"), &fixture("counters.csv")).expect("Failed to load fixtures")
}

fn day(d: u32) -> chrono::NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, d).unwrap().and_hms_opt(0, 0, 0).unwrap()
}

fn ids(rows: &[JoinedRow<'_>]) -> Vec<String> {
    rows.iter().map(|r| r.record.site_id.clone()).collect()
}

#[test]
fn test_load_report() {
    let data = dataset();
    assert_eq!(data.sites.len(), 3);
    assert_eq!(data.report.duplicate_sites, 1);
    assert_eq!(data.counters.len(), 6);
    assert_eq!(data.report.unparsed_timestamps, 1);
    assert_eq!(data.report.coerced_counter_values, 1);
    assert!(data.report.missing_counters.contains(&"R2035_003".to_string()));
    // First row wins for a repeated id.
    assert_eq!(data.sites[0].city, "Shenzhen");
}

#[test]
fn test_left_join_keeps_every_counter_row() {
    let data = dataset();
    let rows = join(&data.counters, &data.sites, JoinMode::Left);
    assert_eq!(rows.len(), data.counters.len());
    assert_eq!(rows.iter().filter(|r| r.site.is_none()).count(), 1);
    assert_eq!(ids(&rows), vec!["1", "2", "9", "3", "1", "2"]);
}

#[test]
fn test_inner_join_drops_unmatched_rows() {
    let data = dataset();
    let rows = join(&data.counters, &data.sites, JoinMode::Inner);
    assert!(rows.len() <= data.counters.len());
    assert_eq!(rows.len(), 5);
    assert!(rows.iter().all(|r| r.site.is_some()));
}

#[test]
fn test_end_to_end_inner() {
    let data = dataset();
    let rows = join(&data.counters, &data.sites, JoinMode::Inner);
    let series = derive_kpis(&aggregate(&filter(&rows, &FilterSelection::default()), false));
    assert_eq!(series.len(), 2);

    let first = &series[0];
    assert_eq!(first.interval_start, day(1));
    assert!((first.kpis.get(Kpi::DataTrafficTb) - 3.5e-7).abs() < 1e-15);
    assert_eq!(round2(first.kpis.get(Kpi::DataTrafficTb)), 0.0);
    assert_eq!(round2(first.kpis.get(Kpi::RadioDropRate)), 100.0);
    assert_eq!(round2(first.kpis.get(Kpi::VonrTrafficKErl)), 1.0);

    let table = reports::kpi_table(&series);
    assert_eq!(table[0].start_time, "2024-01-01 00:00");
    assert_eq!(table[0].data_traffic_tb, "0.00");
    assert_eq!(table[0].radio_drop_rate, "100.00");
}

#[test]
fn test_ratio_of_sums() {
    let data = dataset();
    let rows = join(&data.counters, &data.sites, JoinMode::Inner);
    let site = |id: &str| {
        rows.iter()
            .filter(|r| r.record.site_id == id && r.record.interval_start == Some(day(1)))
            .copied()
            .collect::<Vec<_>>()
    };
    let (a, b) = (site("1"), site("2"));
    let union: Vec<JoinedRow<'_>> = a.iter().chain(b.iter()).copied().collect();

    let rate = |rows: &[JoinedRow<'_>]| derive_kpis(&aggregate(rows, false))[0].kpis.get(Kpi::RadioConnectRate);
    // 100 * (9 + 30) / (10 + 30), not the mean of 90 and 100.
    assert_eq!(round2(rate(union.as_slice())), 97.5);
    assert_eq!(round2(rate(a.as_slice())), 90.0);
    assert_eq!(round2(rate(b.as_slice())), 100.0);
}

#[test]
fn test_filter_is_idempotent() {
    let data = dataset();
    let rows = join(&data.counters, &data.sites, JoinMode::Left);
    let selection = FilterSelection::default()
        .with(FilterField::Band, "n41")
        .with(FilterField::City, "Shenzhen");
    let once = filter(&rows, &selection);
    let twice = filter(&once, &selection);
    assert_eq!(once, twice);
    // The unmatched row cannot satisfy a band constraint.
    assert_eq!(ids(&once), vec!["1", "2", "1", "2"]);
}

#[test]
fn test_date_range_is_inclusive_and_drops_unparsed() {
    let data = dataset();
    let rows = join(&data.counters, &data.sites, JoinMode::Left);
    let d2 = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
    let selection = FilterSelection::default().with_dates(d2, d2);
    assert_eq!(ids(&filter(&rows, &selection)), vec!["3", "1"]);
}

#[test]
fn test_aggregation_completeness() {
    let data = dataset();
    let rows = join(&data.counters, &data.sites, JoinMode::Left);
    let buckets = aggregate(&rows, false);

    for code in [CounterCode::R1012_001, CounterCode::R1012_002, CounterCode::R1004_003] {
        let bucketed: f64 = buckets.iter().map(|b| b.sums.get(code)).sum();
        let direct: f64 = rows
            .iter()
            .filter(|r| r.record.interval_start.is_some())
            .map(|r| r.record.counters.value_or_zero(code))
            .sum();
        assert_eq!(bucketed, direct, "{code}");
    }
    assert_eq!(buckets[0].sums.get(CounterCode::R1012_001), 1300.0);
    assert_eq!(buckets.iter().map(|b| b.row_count).sum::<usize>(), 5);
}

#[test]
fn test_extremum_tie_and_undefined_kpis() {
    let data = dataset();
    let rows = join(&data.counters, &data.sites, JoinMode::Left);
    let series = derive_kpis(&aggregate(&rows, false));

    // Drop rate is 100% on both days; the earlier day wins.
    let drop = extremum(&series, Kpi::RadioDropRate).unwrap();
    assert_eq!(drop.max_at, day(1));
    assert_eq!(drop.min_at, day(1));

    // No VoNR drop counters at all: undefined everywhere, others unaffected.
    assert!(extremum(&series, Kpi::VonrDropRate).is_none());
    assert!(series.iter().all(|i| i.kpis.get(Kpi::VonrDropRate).is_nan()));
    let connect = extremum(&series, Kpi::RadioConnectRate).unwrap();
    assert_eq!(round2(connect.max_value), 100.0);
    assert_eq!(connect.max_at, day(2));

    let extremes = reports::extremes_table(&series);
    let vonr_drop = extremes.iter().find(|r| r.kpi.starts_with("vonrDropRate")).unwrap();
    assert_eq!(vonr_drop.max_value, "no data");
}

#[test]
fn test_empty_selection_yields_no_data() {
    let data = dataset();
    let rows = join(&data.counters, &data.sites, JoinMode::Left);
    let selection = FilterSelection::default().with(FilterField::Province, "Hainan");
    let series = derive_kpis(&aggregate(&filter(&rows, &selection), false));
    assert!(series.is_empty());
    assert!(Kpi::ALL.iter().all(|k| extremum(&series, *k).is_none()));

    let summary = reports::kpi_summary(&series, JoinMode::Left);
    assert_eq!(summary.intervals, 0);
    assert_eq!(summary.first_interval, None);
}

#[test]
fn test_candidate_values_cascade() {
    let data = dataset();
    let none = FilterSelection::default();
    assert_eq!(candidate_values(FilterField::City, &none, &data.sites), vec!["Shenzhen", "Guangzhou"]);

    let n41 = FilterSelection::default().with(FilterField::Band, "n41");
    assert_eq!(candidate_values(FilterField::City, &n41, &data.sites), vec!["Shenzhen"]);

    let shenzhen = n41.with(FilterField::City, "Shenzhen");
    assert_eq!(
        candidate_values(FilterField::County, &shenzhen, &data.sites),
        vec!["Nanshan", "Futian"]
    );

    // "all" clears the constraint again.
    let mut cleared = shenzhen.clone();
    cleared.set(FilterField::City, Some("all"));
    assert_eq!(candidate_values(FilterField::County, &cleared, &data.sites).len(), 2);
    cleared.set(FilterField::Band, Some("全部"));
    assert_eq!(candidate_values(FilterField::County, &cleared, &data.sites).len(), 3);
}

#[test]
fn test_traffic_reports() {
    let data = dataset();
    let counts = reports::site_counts(&filter_sites(&data.sites, &FilterSelection::default()));
    let pairs: Vec<(&str, usize)> = counts.iter().map(|r| (r.band.as_str(), r.sites)).collect();
    assert_eq!(pairs, vec![("all", 3), ("n28", 1), ("n41", 2)]);

    let rows = join(&data.counters, &data.sites, JoinMode::Left);
    let trend = reports::traffic_trend(&derive_kpis(&aggregate(&rows, true)));
    assert_eq!(trend.iter().map(|r| r.cells).collect::<Vec<_>>(), vec![3, 2]);

    // Site 3 reports zero traffic on the second day; site 1's unreadable
    // downlink value is read as zero but its uplink is not.
    let zero = reports::zero_traffic_trend(&rows);
    assert_eq!(zero.len(), 1);
    assert_eq!(zero[0].start_time, "2024-01-02 00:00");
    assert_eq!((zero[0].zero_cells, zero[0].total_cells), (1, 2));
    assert_eq!(zero[0].zero_pct, "50.00");

    let inventory = reports::cell_inventory(&rows);
    assert_eq!(inventory[0].distinct_elements, 2);
    assert_eq!(inventory[1].zero_traffic_rows, 1);
}

#[test]
fn test_power_analysis() {
    let records = load_power(&fixture("power.csv")).expect("Failed to load power fixture");
    assert_eq!(records.len(), 5);

    let devices = power::device_power(&records, "D5S");
    assert_eq!(power::model_list(&devices), vec!["AAU-A", "AAU-B"]);

    let summary = power::power_summary(&power::select_models(&devices, None));
    assert_eq!(summary[0].mean, "10.00");
    assert_eq!(summary[1].mean, "8.00");

    let only_a = vec!["AAU-A".to_string()];
    let dist = power::power_distribution(&power::select_models(&devices, Some(only_a.as_slice())));
    assert_eq!(dist.len(), 1);
    assert_eq!(dist[0].bbu_name, "BBU1");
    assert_eq!(dist[0].median, "10.00");
}

#[test]
fn test_export_kpi_reports() {
    let data = dataset();
    let rows = join(&data.counters, &data.sites, JoinMode::Inner);
    let series = derive_kpis(&aggregate(&rows, false));

    let dir = std::env::temp_dir().join("ran_kpi_export_test");
    std::fs::create_dir_all(&dir).unwrap();
    let csv_path = dir.join("kpi_series.csv");
    let json_path = dir.join("kpi_summary.json");

    output::write_csv(&csv_path, &reports::kpi_table(&series)).unwrap();
    output::write_json(&json_path, &reports::kpi_summary(&series, JoinMode::Inner)).unwrap();

    let csv = std::fs::read_to_string(&csv_path).unwrap();
    assert!(csv.starts_with("StartTime,DataTrafficTB,"));
    assert_eq!(csv.lines().count(), 3);

    let summary: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&json_path).unwrap()).unwrap();
    assert_eq!(summary["join_mode"], "inner");
    assert_eq!(summary["intervals"], 2);

    std::fs::remove_dir_all(&dir).unwrap();
}
