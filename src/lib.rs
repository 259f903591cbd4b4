//! 5G RAN KPI reporting pipeline.
//!
//! Raw per-cell counters are joined with site metadata, filtered by
//! geography, band and date, summed per interval, and turned into KPI time
//! series (traffic volumes, setup, drop and handover rates).
//!
//! ```text
//! join -> filter -> aggregate -> derive_kpis -> reports
//! ```

pub mod config;
pub mod counters;
pub mod error;
pub mod filter;
pub mod kpi;
pub mod loader;
pub mod output;
pub mod pipeline;
pub mod power;
pub mod reports;
pub mod types;
pub mod util;

pub use error::{KpiError, Result};
pub use filter::{candidate_values, filter, FilterField, FilterSelection};
pub use kpi::{derive_kpis, extremum, Kpi, KpiInterval};
pub use pipeline::{aggregate, join};
pub use types::{AggregatedInterval, CounterRecord, JoinMode, SiteMetadata};
