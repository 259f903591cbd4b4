// Entry point and high-level CLI flow.
//
// Each subcommand plays one dashboard page:
// - `kpi` renders the KPI time series and their extremes,
// - `traffic` renders base-station counts, traffic and zero-traffic trends,
// - `options` lists the values offered by a cascading filter selector,
// - `power` renders the equipment power analysis.
// Tables are previewed on the console and exported as CSV/JSON.
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use once_cell::sync::OnceCell;
use ran_kpi::config::Config;
use ran_kpi::filter::{filter_sites, FilterField, FilterSelection};
use ran_kpi::loader::{load_power, Dataset};
use ran_kpi::types::{JoinMode, JoinedRow};
use ran_kpi::util::{format_int, format_kpi, parse_date};
use ran_kpi::{aggregate, candidate_values, derive_kpis, filter, join, output, power, reports};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

// The source tables are read once per process and shared read-only by every
// command that needs them.
static DATASET: OnceCell<Dataset> = OnceCell::new();

#[derive(Parser)]
#[command(name = "ran_kpi")]
#[command(about = "5G RAN KPI reports from counter and site exports", long_about = None)]
struct Cli {
    /// Directory holding the CSV exports (overrides RAN_KPI_DATA_DIR)
    #[arg(long, global = true)]
    data_dir: Option<String>,

    /// Directory for exported reports (overrides RAN_KPI_OUTPUT_DIR)
    #[arg(long, global = true)]
    output_dir: Option<String>,

    /// How counters without site metadata are treated: inner or left
    #[arg(long, global = true)]
    join_mode: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug, Default)]
struct FilterArgs {
    /// Working band ("all" for no constraint)
    #[arg(long)]
    band: Option<String>,
    #[arg(long)]
    province: Option<String>,
    #[arg(long)]
    city: Option<String>,
    #[arg(long)]
    county: Option<String>,
    #[arg(long)]
    town: Option<String>,
    #[arg(long)]
    village: Option<String>,
    /// First day to include, YYYY-MM-DD
    #[arg(long)]
    from: Option<String>,
    /// Last day to include, YYYY-MM-DD
    #[arg(long)]
    to: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// KPI time series with max/min annotations
    Kpi {
        #[command(flatten)]
        filters: FilterArgs,
        /// Rows shown in the console preview
        #[arg(long, default_value_t = 10)]
        preview: usize,
    },
    /// Base-station counts, traffic trend and zero-traffic cells
    Traffic {
        #[command(flatten)]
        filters: FilterArgs,
        #[arg(long, default_value_t = 10)]
        preview: usize,
    },
    /// Values available for a filter field under the current selection
    Options {
        /// band, province, city, county, town or village
        #[arg(long)]
        field: String,
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// Equipment power consumption per model and per BBU
    Power {
        /// Restrict to these models (repeatable); all models by default
        #[arg(long = "model")]
        models: Vec<String>,
    },
}

impl FilterArgs {
    fn to_selection(&self) -> Result<FilterSelection> {
        let mut selection = FilterSelection::default();
        selection.set(FilterField::Band, self.band.as_deref());
        selection.set(FilterField::Province, self.province.as_deref());
        selection.set(FilterField::City, self.city.as_deref());
        selection.set(FilterField::County, self.county.as_deref());
        selection.set(FilterField::Town, self.town.as_deref());
        selection.set(FilterField::Village, self.village.as_deref());
        selection = match (&self.from, &self.to) {
            (None, None) => selection,
            (from, to) => {
                let from = from.as_deref().map(parse_date).transpose()?;
                let to = to.as_deref().map(parse_date).transpose()?;
                selection.with_dates(
                    from.unwrap_or(chrono::NaiveDate::MIN),
                    to.unwrap_or(chrono::NaiveDate::MAX),
                )
            }
        };
        Ok(selection)
    }
}

fn dataset(config: &Config) -> Result<&'static Dataset> {
    DATASET.get_or_try_init(|| {
        let sites = config.sites_path();
        let counters = config.counters_path();
        info!(sites = %sites.display(), counters = %counters.display(), "loading dataset");
        Dataset::load(&sites, &counters).with_context(|| format!("failed to load data from {}", config.data_dir.display()))
    })
}

fn print_load_report(data: &Dataset) {
    let r = &data.report;
    println!(
        "Processing dataset... ({} sites, {} counter rows loaded)",
        format_int(r.site_rows),
        format_int(r.counter_rows)
    );
    if r.skipped_rows > 0 || r.unparsed_timestamps > 0 {
        println!(
            "Note: {} rows skipped, {} rows with unreadable start time.",
            format_int(r.skipped_rows),
            format_int(r.unparsed_timestamps)
        );
    }
    if r.coerced_counter_values > 0 {
        println!(
            "Info: {} non-numeric counter values read as zero.",
            format_int(r.coerced_counter_values)
        );
    }
}

fn filtered_rows<'a>(data: &'a Dataset, mode: JoinMode, selection: &FilterSelection) -> Vec<JoinedRow<'a>> {
    let joined = join(&data.counters, &data.sites, mode);
    let rows = filter(&joined, selection);
    if rows.is_empty() {
        warn!("no rows match the selected filters");
    }
    rows
}

/// `kpi`: KPI series, extremes, and a JSON summary.
fn handle_kpi(config: &Config, filters: &FilterArgs, preview: usize) -> Result<()> {
    let data = dataset(config)?;
    print_load_report(data);
    let selection = filters.to_selection()?;

    let rows = filtered_rows(data, config.join_mode, &selection);
    let series = derive_kpis(&aggregate(&rows, false));

    let table = reports::kpi_table(&series);
    let extremes = reports::extremes_table(&series);
    let summary = reports::kpi_summary(&series, config.join_mode);

    config.ensure_output_dir()?;
    output::write_csv(&config.output_path("kpi_series.csv"), &table)?;
    output::write_csv(&config.output_path("kpi_extremes.csv"), &extremes)?;
    output::write_json(&config.output_path("kpi_summary.json"), &summary)?;

    output::preview_table("Data Traffic and Performance KPIs", Some("ratio of summed counters per interval"), &table, preview);
    output::preview_table("KPI Extremes", None, &extremes, extremes.len());
    println!("\n(Full tables exported to {})", config.output_dir.display());
    Ok(())
}

/// `traffic`: site counts, traffic trend with recent averages, zero-traffic cells.
fn handle_traffic(config: &Config, filters: &FilterArgs, preview: usize) -> Result<()> {
    let data = dataset(config)?;
    print_load_report(data);
    let selection = filters.to_selection()?;

    let sites = filter_sites(&data.sites, &selection);
    let counts = reports::site_counts(&sites);

    let rows = filtered_rows(data, config.join_mode, &selection);
    let series = derive_kpis(&aggregate(&rows, true));
    let trend = reports::traffic_trend(&series);
    let recent = reports::recent_month_average(&series);
    let zero = reports::zero_traffic_trend(&rows);
    let inventory = reports::cell_inventory(&rows);

    config.ensure_output_dir()?;
    output::write_csv(&config.output_path("site_counts.csv"), &counts)?;
    output::write_csv(&config.output_path("traffic_trend.csv"), &trend)?;
    output::write_csv(&config.output_path("zero_traffic_trend.csv"), &zero)?;
    output::write_csv(&config.output_path("cell_inventory.csv"), &inventory)?;
    output::write_json(&config.output_path("traffic_summary.json"), &recent)?;

    output::preview_table("5G Base Stations", None, &counts, counts.len());
    output::preview_table("Traffic Trend", None, &trend, preview);
    let avg = |v: Option<f64>| v.map(format_kpi).unwrap_or_else(|| "no data".to_string());
    println!(
        "Last-month average: {} TB, {} kErl",
        avg(recent.avg_traffic_tb),
        avg(recent.avg_vonr_kerl)
    );
    output::preview_table("Zero-Traffic Cells", None, &zero, preview);
    if let Some(e) = reports::zero_traffic_extremes(&rows) {
        println!(
            "Most zero-traffic cells: {} at {}; fewest: {} at {}",
            e.max_value, e.max_at, e.min_value, e.min_at
        );
    }
    output::preview_table("Cell Inventory", None, &inventory, preview);
    Ok(())
}

/// `options`: candidate values for one selector.
fn handle_options(config: &Config, field: &str, filters: &FilterArgs) -> Result<()> {
    let field: FilterField = field.parse()?;
    let data = dataset(config)?;
    let selection = filters.to_selection()?;
    let values = candidate_values(field, &selection, &data.sites);
    println!("{} ({} values):", field, values.len());
    println!("  all");
    for v in values {
        println!("  {}", v);
    }
    Ok(())
}

/// `power`: per-model statistics and per-BBU distribution.
fn handle_power(config: &Config, models: &[String]) -> Result<()> {
    let path = config.power_path();
    let records = load_power(&path).with_context(|| format!("failed to load {}", path.display()))?;
    let devices = power::device_power(&records, &config.power_excluded_model);
    println!("Available models: {}", power::model_list(&devices).join(", "));

    let chosen = (!models.is_empty()).then_some(models);
    let selected = power::select_models(&devices, chosen);
    let summary = power::power_summary(&selected);
    let distribution = power::power_distribution(&selected);

    config.ensure_output_dir()?;
    output::write_csv(&config.output_path("power_summary.csv"), &summary)?;
    output::write_csv(&config.output_path("power_distribution.csv"), &distribution)?;

    output::preview_table("Device Power by Model (kWh)", None, &summary, summary.len());
    output::preview_table("Device Power Distribution by BBU", None, &distribution, distribution.len());
    Ok(())
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = Config::from_env()?;
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir.into();
    }
    if let Some(dir) = cli.output_dir {
        config.output_dir = dir.into();
    }
    if let Some(mode) = cli.join_mode {
        config.join_mode = mode.parse()?;
    }
    info!(join_mode = %config.join_mode, data_dir = %config.data_dir.display(), "configuration loaded");

    match &cli.command {
        Commands::Kpi { filters, preview } => handle_kpi(&config, filters, *preview),
        Commands::Traffic { filters, preview } => handle_traffic(&config, filters, *preview),
        Commands::Options { field, filters } => handle_options(&config, field, filters),
        Commands::Power { models } => handle_power(&config, models),
    }
}
