//! Joining counter records with site metadata and bucketing them by time.

use crate::counters::CounterSums;
use crate::types::{AggregatedInterval, CounterRecord, JoinMode, JoinedRow, SiteMetadata};
use chrono::NaiveDateTime;
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::debug;

/// Attaches metadata to every counter record by `site_id`.
///
/// Under [`JoinMode::Left`] every record yields exactly one row; under
/// [`JoinMode::Inner`] records without metadata are dropped. Output keeps the
/// input order. If the metadata table repeats a `site_id`, the first entry wins.
pub fn join<'a>(counters: &'a [CounterRecord], metadata: &'a [SiteMetadata], mode: JoinMode) -> Vec<JoinedRow<'a>> {
    let mut by_id: HashMap<&str, &SiteMetadata> = HashMap::with_capacity(metadata.len());
    for site in metadata {
        by_id.entry(site.site_id.as_str()).or_insert(site);
    }

    let rows: Vec<JoinedRow<'a>> = counters
        .iter()
        .filter_map(|record| {
            let site = by_id.get(record.site_id.as_str()).copied();
            match (mode, site) {
                (JoinMode::Inner, None) => None,
                _ => Some(JoinedRow { record, site }),
            }
        })
        .collect();

    debug!(
        mode = %mode,
        input = counters.len(),
        output = rows.len(),
        "joined counters with site metadata"
    );
    rows
}

/// Groups rows by `interval_start` and sums every counter per bucket.
///
/// Rows with an unparsed timestamp are skipped. Buckets come back in
/// ascending time order. With `count_cells` set, each bucket also carries the
/// number of distinct `site_id`s it contains.
pub fn aggregate(rows: &[JoinedRow<'_>], count_cells: bool) -> Vec<AggregatedInterval> {
    #[derive(Default)]
    struct Acc<'r> {
        sums: CounterSums,
        rows: usize,
        sites: HashSet<&'r str>,
    }

    let mut buckets: BTreeMap<NaiveDateTime, Acc<'_>> = BTreeMap::new();
    let mut skipped = 0usize;
    for row in rows {
        let Some(ts) = row.record.interval_start else {
            skipped += 1;
            continue;
        };
        let acc = buckets.entry(ts).or_default();
        acc.sums.add(&row.record.counters);
        acc.rows += 1;
        if count_cells {
            acc.sites.insert(row.record.site_id.as_str());
        }
    }

    debug!(
        rows = rows.len(),
        buckets = buckets.len(),
        skipped,
        "aggregated rows by interval"
    );

    buckets
        .into_iter()
        .map(|(interval_start, acc)| AggregatedInterval {
            interval_start,
            sums: acc.sums,
            row_count: acc.rows,
            cell_count: count_cells.then_some(acc.sites.len()),
        })
        .collect()
}
