//! Typed access to the raw network counters.
//!
//! Counter columns are identified by their vendor codes (`R1012_001`,
//! `K1009_001`, ...). Only the codes that feed a KPI formula are known to the
//! crate; they form a closed enumeration so a misspelled code is a compile
//! error in Rust code and an [`KpiError::UnknownCounter`] when parsed from text.

use crate::error::KpiError;
use std::fmt;
use std::ops::Index;
use std::str::FromStr;

macro_rules! counter_codes {
    ($($variant:ident => $code:literal),+ $(,)?) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum CounterCode {
            $($variant),+
        }

        impl CounterCode {
            pub const ALL: &'static [CounterCode] = &[$(CounterCode::$variant),+];
            pub const COUNT: usize = CounterCode::ALL.len();

            /// Column header used by the source exports.
            pub fn as_str(self) -> &'static str {
                match self {
                    $(CounterCode::$variant => $code),+
                }
            }

            fn index(self) -> usize {
                self as usize
            }
        }

        impl FromStr for CounterCode {
            type Err = KpiError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim() {
                    $($code => Ok(CounterCode::$variant),)+
                    other => Err(KpiError::UnknownCounter(other.to_string())),
                }
            }
        }
    };
}

counter_codes! {
    // Data traffic (uplink / downlink bytes)
    R1012_001 => "R1012_001",
    R1012_002 => "R1012_002",
    // VoNR traffic
    K1009_001 => "K1009_001",
    // RRC / NG / QoS flow setup
    R1001_001 => "R1001_001",
    R1001_004 => "R1001_004",
    R1001_007 => "R1001_007",
    R1001_012 => "R1001_012",
    R1001_015 => "R1001_015",
    R1001_018 => "R1001_018",
    R1034_001 => "R1034_001",
    R1034_002 => "R1034_002",
    R1034_012 => "R1034_012",
    R1034_013 => "R1034_013",
    R1039_001 => "R1039_001",
    R1039_002 => "R1039_002",
    // Abnormal releases
    R1004_002 => "R1004_002",
    R1004_003 => "R1004_003",
    R1004_004 => "R1004_004",
    R1004_007 => "R1004_007",
    R1005_012 => "R1005_012",
    R1006_012 => "R1006_012",
    // Intra-system handover
    R2005_001 => "R2005_001",
    R2005_004 => "R2005_004",
    R2005_005 => "R2005_005",
    R2005_008 => "R2005_008",
    R2006_001 => "R2006_001",
    R2006_004 => "R2006_004",
    R2006_005 => "R2006_005",
    R2006_008 => "R2006_008",
    R2007_001 => "R2007_001",
    R2007_002 => "R2007_002",
    R2007_003 => "R2007_003",
    R2007_004 => "R2007_004",
    // VoNR drops
    R2035_003 => "R2035_003",
    R2035_013 => "R2035_013",
    R2035_026 => "R2035_026",
    // VoNR handover
    R2005_060 => "R2005_060",
    R2005_063 => "R2005_063",
    R2005_064 => "R2005_064",
    R2005_067 => "R2005_067",
    R2006_068 => "R2006_068",
    R2006_071 => "R2006_071",
    R2006_072 => "R2006_072",
    R2006_075 => "R2006_075",
    R2007_033 => "R2007_033",
    R2007_036 => "R2007_036",
    R2007_037 => "R2007_037",
    R2007_040 => "R2007_040",
}

impl fmt::Display for CounterCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returns true for headers shaped like a vendor counter code
/// (`R####_###` or `K####_###`), whether or not the crate knows the code.
pub fn looks_like_counter(header: &str) -> bool {
    let b = header.as_bytes();
    b.len() == 9
        && (b[0] == b'R' || b[0] == b'K')
        && b[1..5].iter().all(u8::is_ascii_digit)
        && b[5] == b'_'
        && b[6..].iter().all(u8::is_ascii_digit)
}

/// Counter readings of one record. `None` means the interval carried no
/// measurement for that counter.
#[derive(Debug, Clone, PartialEq)]
pub struct CounterValues {
    values: [Option<f64>; CounterCode::COUNT],
}

impl Default for CounterValues {
    fn default() -> Self {
        Self {
            values: [None; CounterCode::COUNT],
        }
    }
}

impl CounterValues {
    pub fn get(&self, code: CounterCode) -> Option<f64> {
        self.values[code.index()]
    }

    pub fn set(&mut self, code: CounterCode, value: Option<f64>) {
        self.values[code.index()] = value;
    }

    /// Builder-style setter, mostly handy when constructing fixtures.
    pub fn with(mut self, code: CounterCode, value: f64) -> Self {
        self.set(code, Some(value));
        self
    }

    pub fn value_or_zero(&self, code: CounterCode) -> f64 {
        self.get(code).unwrap_or(0.0)
    }
}

/// Per-bucket totals, one slot per [`CounterCode`].
#[derive(Debug, Clone, PartialEq)]
pub struct CounterSums {
    sums: [f64; CounterCode::COUNT],
}

impl Default for CounterSums {
    fn default() -> Self {
        Self {
            sums: [0.0; CounterCode::COUNT],
        }
    }
}

impl CounterSums {
    /// Adds every counter of `values`; missing readings count as zero.
    pub fn add(&mut self, values: &CounterValues) {
        for (sum, value) in self.sums.iter_mut().zip(values.values.iter()) {
            *sum += value.unwrap_or(0.0);
        }
    }

    pub fn get(&self, code: CounterCode) -> f64 {
        self.sums[code.index()]
    }

    /// Sum of several counters of the same bucket.
    pub fn total(&self, codes: &[CounterCode]) -> f64 {
        codes.iter().map(|c| self.get(*c)).sum()
    }
}

impl Index<CounterCode> for CounterSums {
    type Output = f64;

    fn index(&self, code: CounterCode) -> &f64 {
        &self.sums[code.index()]
    }
}
