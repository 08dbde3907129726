use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use rdatacmp_common::{
    default_plugin_dir, load_config, load_scheme, CompareReport, CompareSummary,
    FieldDeclaration, FieldValue, RowResult, RowStatus,
};
use rdatacmp_core::{compare_scheme, normalize, Granularity, PluginWarning, Registries};
use serde::Serialize;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "rdatacmp")]
#[command(author = "RDataCmp Contributors")]
#[command(version)]
#[command(about = "Field-level comparison of two tabular data sources", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare the primary and shadow sources of a scheme file
    Compare {
        /// Scheme file (TOML)
        scheme: PathBuf,

        /// Show only rows with differences
        #[arg(short = 'd', long)]
        diff_only: bool,

        /// Output results as JSON
        #[arg(long)]
        json: bool,

        /// Disable ANSI colors in output
        #[arg(long)]
        no_color: bool,

        #[command(flatten)]
        plugins: PluginArgs,
    },

    /// List registered comparators and data sources
    Plugins {
        /// Output as JSON
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        plugins: PluginArgs,
    },

    /// Show how a value normalizes for the temporal comparators
    CheckValue {
        value: String,

        /// Granularity to normalize to
        #[arg(long = "as", value_enum, default_value_t = GranularityArg::Date)]
        granularity: GranularityArg,

        /// Treat the value as epoch milliseconds
        #[arg(long)]
        epoch: bool,
    },
}

#[derive(clap::Args)]
struct PluginArgs {
    /// Directory scanned for plugin manifests
    #[arg(short, long)]
    plugin_dir: Option<PathBuf>,

    /// Only use built-in comparators and sources
    #[arg(long, conflicts_with = "plugin_dir")]
    no_plugins: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum GranularityArg {
    Date,
    Datetime,
    Time,
}

impl From<GranularityArg> for Granularity {
    fn from(arg: GranularityArg) -> Self {
        match arg {
            GranularityArg::Date => Granularity::Date,
            GranularityArg::Datetime => Granularity::DateTime,
            GranularityArg::Time => Granularity::Time,
        }
    }
}

fn main() -> ExitCode {
    // Logs go to stderr so JSON output stays clean on stdout
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Compare {
            scheme,
            diff_only,
            json,
            no_color,
            plugins,
        } => run_compare(scheme, diff_only, json, no_color, plugins).map(|differs| {
            if differs {
                ExitCode::from(2)
            } else {
                ExitCode::SUCCESS
            }
        }),
        Commands::Plugins { json, plugins } => run_plugins(json, plugins).map(|_| ExitCode::SUCCESS),
        Commands::CheckValue {
            value,
            granularity,
            epoch,
        } => run_check_value(&value, granularity.into(), epoch),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn build_registries(args: &PluginArgs) -> anyhow::Result<Registries> {
    let mut registries = Registries::with_builtins();
    if args.no_plugins {
        return Ok(registries);
    }

    let dir = match &args.plugin_dir {
        Some(dir) => dir.clone(),
        None => {
            let loaded = load_config(false)?;
            match loaded.config.plugin_dir {
                Some(dir) => dir,
                None => default_plugin_dir(loaded.portable, &loaded.path)?,
            }
        }
    };

    info!("Loading plugin manifests from {}", dir.display());
    let report = registries.discover(&dir)?;
    if !report.added.is_empty() {
        info!("Registered {} plugin entries", report.added.len());
    }
    for skipped in &report.skipped {
        warn!("Skipped already registered entry {}", skipped);
    }
    for warning in &report.warnings {
        warn!("{}", warning);
    }
    Ok(registries)
}

/// Returns whether any difference was found
fn run_compare(
    scheme_path: PathBuf,
    diff_only: bool,
    json: bool,
    no_color: bool,
    plugin_args: PluginArgs,
) -> anyhow::Result<bool> {
    let scheme = load_scheme(&scheme_path)
        .with_context(|| format!("Failed to load scheme {}", scheme_path.display()))?;
    info!("Scheme: {}", scheme.name);
    info!("  Primary: {}/{}", scheme.primary.group, scheme.primary.name);
    info!("  Shadow:  {}/{}", scheme.shadow.group, scheme.shadow.name);

    let registries = build_registries(&plugin_args)?;

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner().template("{spinner} {msg}")?);
    spinner.set_message(format!("Comparing {}", scheme.name));
    spinner.enable_steady_tick(Duration::from_millis(100));
    let run = compare_scheme(&scheme, &registries, None);
    spinner.finish_and_clear();
    let run = run?;
    let differs = run.report.summary.has_differences();

    if json {
        let report = build_json_report(&scheme.name, &run.report, &run.warnings, diff_only);
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(differs);
    }

    let use_color = !no_color && std::io::stdout().is_terminal();
    print_report(&scheme.name, &scheme.fields, &run.report, diff_only, use_color);
    Ok(differs)
}

fn status_symbol(row: &RowResult) -> &'static str {
    match row.status {
        RowStatus::Matched if row.has_differences => "!=",
        RowStatus::Matched => "==",
        RowStatus::PrimaryOnly => "<<",
        RowStatus::ShadowOnly => ">>",
    }
}

fn status_color(row: &RowResult) -> &'static str {
    match row.status {
        RowStatus::Matched if row.has_differences => "\x1b[31m", // Red
        RowStatus::Matched => "\x1b[32m",                        // Green
        RowStatus::PrimaryOnly => "\x1b[33m",                    // Yellow
        RowStatus::ShadowOnly => "\x1b[34m",                     // Blue
    }
}

fn display_value(value: Option<&FieldValue>) -> String {
    match value {
        Some(value) => value.to_string(),
        None => "(missing)".to_string(),
    }
}

/// One line per differing field of a matched row, labelled by nickname
/// when the field declares one
fn describe_differences(row: &RowResult, fields: &[FieldDeclaration]) -> Vec<String> {
    row.differing_fields()
        .map(|cell| {
            let label = fields
                .iter()
                .find(|field| field.code == cell.code)
                .map_or(cell.code.as_str(), FieldDeclaration::display_name);
            format!(
                "{}: {} -> {}",
                label,
                display_value(cell.primary_value.as_ref()),
                display_value(cell.shadow_value.as_ref())
            )
        })
        .collect()
}

fn print_report(
    scheme: &str,
    fields: &[FieldDeclaration],
    report: &CompareReport,
    diff_only: bool,
    use_color: bool,
) {
    println!("\n{}", "=".repeat(80));
    println!("Comparison Results: {}", scheme);
    println!("{}", "=".repeat(80));

    for row in &report.rows {
        if diff_only && !row.has_differences {
            continue;
        }

        let (color, reset) = if use_color {
            (status_color(row), "\x1b[0m")
        } else {
            ("", "")
        };
        println!("  {}{}{}  {}", color, status_symbol(row), reset, row.key);

        if row.status == RowStatus::Matched {
            for line in describe_differences(row, fields) {
                println!("        {}", line);
            }
        }
    }

    print_summary(&report.summary, use_color);
}

fn print_summary(summary: &CompareSummary, use_color: bool) {
    let mark = |symbol: &str, color: &str| {
        if use_color {
            format!("{}({}){}", color, symbol, "\x1b[0m")
        } else {
            format!("({})", symbol)
        }
    };

    println!("\n{}", "=".repeat(80));
    println!("Summary:");
    println!("  Primary rows:    {}", summary.primary_rows);
    println!("  Shadow rows:     {}", summary.shadow_rows);
    println!("  Identical:       {} {}", summary.identical, mark("==", "\x1b[32m"));
    println!("  Different:       {} {}", summary.different, mark("!=", "\x1b[31m"));
    println!("  Primary only:    {} {}", summary.primary_only, mark("<<", "\x1b[33m"));
    println!("  Shadow only:     {} {}", summary.shadow_only, mark(">>", "\x1b[34m"));
    if summary.duplicate_shadow_keys > 0 {
        println!("  Duplicate keys:  {} (later shadow row kept)", summary.duplicate_shadow_keys);
    }
    println!("{}", "=".repeat(80));
}

#[derive(Serialize)]
struct JsonReport<'a> {
    scheme: &'a str,
    run_id: String,
    summary: &'a CompareSummary,
    warnings: &'a [PluginWarning],
    rows: Vec<&'a RowResult>,
}

fn build_json_report<'a>(
    scheme: &'a str,
    report: &'a CompareReport,
    warnings: &'a [PluginWarning],
    diff_only: bool,
) -> JsonReport<'a> {
    let rows = if diff_only {
        report.only_differences().collect()
    } else {
        report.rows.iter().collect()
    };

    JsonReport {
        scheme,
        run_id: report.run_id.to_string(),
        summary: &report.summary,
        warnings,
        rows,
    }
}

#[derive(Serialize)]
struct JsonPluginEntry {
    group: String,
    name: String,
    description: Option<String>,
}

#[derive(Serialize)]
struct JsonPlugins {
    comparators: Vec<JsonPluginEntry>,
    data_sources: Vec<JsonPluginEntry>,
}

fn list_plugins(registries: &Registries) -> JsonPlugins {
    let comparators = registries
        .comparators
        .entries()
        .into_iter()
        .map(|(group, name)| JsonPluginEntry {
            group: group.to_string(),
            name: name.to_string(),
            description: registries
                .comparators
                .resolve_strict(group, name)
                .map(|c| c.describe()),
        })
        .collect();

    let data_sources = registries
        .sources
        .entries()
        .into_iter()
        .map(|(group, name)| JsonPluginEntry {
            group: group.to_string(),
            name: name.to_string(),
            description: None,
        })
        .collect();

    JsonPlugins {
        comparators,
        data_sources,
    }
}

fn run_plugins(json: bool, plugin_args: PluginArgs) -> anyhow::Result<()> {
    let registries = build_registries(&plugin_args)?;
    let plugins = list_plugins(&registries);

    if json {
        println!("{}", serde_json::to_string_pretty(&plugins)?);
        return Ok(());
    }

    println!("Comparators:");
    for entry in &plugins.comparators {
        let qualified = format!("{}/{}", entry.group, entry.name);
        match &entry.description {
            Some(description) => println!("  {:<36} {}", qualified, description),
            None => println!("  {}", qualified),
        }
    }
    println!("\nData sources:");
    for entry in &plugins.data_sources {
        println!("  {}/{}", entry.group, entry.name);
    }
    Ok(())
}

fn run_check_value(value: &str, granularity: Granularity, epoch: bool) -> anyhow::Result<ExitCode> {
    let input = if epoch {
        let millis: i64 = value
            .trim()
            .parse()
            .with_context(|| format!("Not an epoch millisecond value: {}", value))?;
        FieldValue::Int(millis)
    } else {
        FieldValue::from(value)
    };

    let normalized = normalize(&input, granularity);
    println!("{}", normalized);
    if normalized.is_value() {
        Ok(ExitCode::SUCCESS)
    } else {
        warn!("'{}' is not a recognized {:?} value", value, granularity);
        Ok(ExitCode::FAILURE)
    }
}
