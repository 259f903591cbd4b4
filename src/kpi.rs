//! KPI formulas over aggregated counter sums.
//!
//! Every ratio is computed from bucket totals (ratio of sums), never as an
//! average of per-cell ratios. Values keep full precision here; rounding
//! happens when they are rendered.

use crate::counters::{CounterCode as C, CounterSums};
use crate::types::AggregatedInterval;
use crate::util::ratio;
use chrono::NaiveDateTime;
use std::fmt;

const BYTES_PER_TB: f64 = 1e9;

const INTRA_HO_SUCCESS: &[C] = &[C::R2007_002, C::R2007_004, C::R2006_004, C::R2006_008, C::R2005_004, C::R2005_008];
const INTRA_HO_ATTEMPT: &[C] = &[C::R2007_001, C::R2007_003, C::R2006_001, C::R2006_005, C::R2005_001, C::R2005_005];
const VONR_HO_SUCCESS: &[C] = &[C::R2005_063, C::R2005_067, C::R2006_071, C::R2006_075, C::R2007_036, C::R2007_040];
const VONR_HO_ATTEMPT: &[C] = &[C::R2005_060, C::R2005_064, C::R2006_068, C::R2006_072, C::R2007_033, C::R2007_037];
const DROP_DENOMINATOR: &[C] = &[C::R1004_002, C::R1004_007, C::R1005_012, C::R1006_012];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kpi {
    DataTrafficTb,
    VonrTrafficKErl,
    RadioConnectRate,
    RadioDropRate,
    IntraHandoverRate,
    VonrConnectRate,
    VonrDropRate,
    VonrHandoverRate,
}

impl Kpi {
    pub const ALL: [Kpi; 8] = [
        Kpi::DataTrafficTb,
        Kpi::VonrTrafficKErl,
        Kpi::RadioConnectRate,
        Kpi::RadioDropRate,
        Kpi::IntraHandoverRate,
        Kpi::VonrConnectRate,
        Kpi::VonrDropRate,
        Kpi::VonrHandoverRate,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Kpi::DataTrafficTb => "dataTrafficTB",
            Kpi::VonrTrafficKErl => "vonrTrafficKErl",
            Kpi::RadioConnectRate => "radioConnectRate",
            Kpi::RadioDropRate => "radioDropRate",
            Kpi::IntraHandoverRate => "intraSystemHandoverRate",
            Kpi::VonrConnectRate => "vonrConnectRate",
            Kpi::VonrDropRate => "vonrDropRate",
            Kpi::VonrHandoverRate => "vonrHandoverRate",
        }
    }

    pub fn unit(self) -> &'static str {
        match self {
            Kpi::DataTrafficTb => "TB",
            Kpi::VonrTrafficKErl => "kErl",
            _ => "%",
        }
    }

    /// Evaluates the KPI for one bucket. A zero denominator yields NaN.
    pub fn compute(self, s: &CounterSums) -> f64 {
        match self {
            Kpi::DataTrafficTb => (s[C::R1012_001] + s[C::R1012_002]) / BYTES_PER_TB,
            Kpi::VonrTrafficKErl => (s[C::K1009_001] / 4.0) / 1000.0,
            Kpi::RadioConnectRate => {
                100.0
                    * ratio(s[C::R1001_012], s[C::R1001_001])
                    * ratio(s[C::R1034_012], s[C::R1034_001])
                    * ratio(s[C::R1039_002], s[C::R1039_001])
            }
            Kpi::RadioDropRate => {
                100.0 * ratio(s[C::R1004_003] - s[C::R1004_004], s.total(DROP_DENOMINATOR))
            }
            Kpi::IntraHandoverRate => 100.0 * ratio(s.total(INTRA_HO_SUCCESS), s.total(INTRA_HO_ATTEMPT)),
            Kpi::VonrConnectRate => {
                100.0
                    * ratio(s[C::R1034_013], s[C::R1034_002])
                    * ratio(
                        s[C::R1001_018] + s[C::R1001_015],
                        s[C::R1001_007] + s[C::R1001_004],
                    )
            }
            Kpi::VonrDropRate => {
                100.0
                    * ratio(
                        s[C::R2035_003] - s[C::R2035_013],
                        s[C::R2035_003] + s[C::R2035_026],
                    )
            }
            Kpi::VonrHandoverRate => 100.0 * ratio(s.total(VONR_HO_SUCCESS), s.total(VONR_HO_ATTEMPT)),
        }
    }
}

impl fmt::Display for Kpi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// All KPIs of one bucket, unrounded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KpiValues {
    values: [f64; 8],
}

impl KpiValues {
    pub fn from_sums(sums: &CounterSums) -> Self {
        Self {
            values: Kpi::ALL.map(|k| k.compute(sums)),
        }
    }

    pub fn get(&self, kpi: Kpi) -> f64 {
        self.values[kpi as usize]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct KpiInterval {
    pub interval_start: NaiveDateTime,
    pub cell_count: Option<usize>,
    pub kpis: KpiValues,
}

pub fn derive_kpis(aggregated: &[AggregatedInterval]) -> Vec<KpiInterval> {
    aggregated
        .iter()
        .map(|a| KpiInterval {
            interval_start: a.interval_start,
            cell_count: a.cell_count,
            kpis: KpiValues::from_sums(&a.sums),
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extremum {
    pub max_value: f64,
    pub max_at: NaiveDateTime,
    pub min_value: f64,
    pub min_at: NaiveDateTime,
}

/// Max and min of `kpi` across the series, skipping undefined values.
///
/// On ties the earliest timestamp wins. Returns `None` when no bucket has a
/// defined value, including for an empty series.
pub fn extremum(series: &[KpiInterval], kpi: Kpi) -> Option<Extremum> {
    extremum_of(series.iter().map(|i| (i.interval_start, i.kpis.get(kpi))))
}

/// Same as [`extremum`] over arbitrary `(time, value)` points, which must
/// arrive in ascending time order for the tie-break to hold.
pub fn extremum_of<I>(points: I) -> Option<Extremum>
where
    I: IntoIterator<Item = (NaiveDateTime, f64)>,
{
    let mut best: Option<Extremum> = None;
    for (at, value) in points {
        if !value.is_finite() {
            continue;
        }
        match best.as_mut() {
            None => {
                best = Some(Extremum {
                    max_value: value,
                    max_at: at,
                    min_value: value,
                    min_at: at,
                })
            }
            Some(e) => {
                if value > e.max_value {
                    e.max_value = value;
                    e.max_at = at;
                }
                if value < e.min_value {
                    e.min_value = value;
                    e.min_at = at;
                }
            }
        }
    }
    best
}
