//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use curriculum_core::{
    BuildResult, CurriculumQuery, FinalizedStructure, ProgressReporter, SilentProgress,
    build_structure, load_published, publish_structure,
};
use curriculum_shared::{
    AppConfig, BuildConfig, PublishTarget, SchemaVariant, init_config, load_config,
    load_config_from,
};
use curriculum_source::{CsvRecordSource, RecordSource};
use curriculum_storage::{Storage, WriteReceipt};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// Turn an outcomes table into a queryable curriculum structure.
#[derive(Parser)]
#[command(
    name = "curriculum",
    version,
    about = "Build, publish, and query curriculum structures from an outcomes table.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file to use instead of ~/.curriculum/curriculum.toml.
    #[arg(long, global = true, env = "CURRICULUM_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Build summary format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub(crate) enum SummaryFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Build the structure and print it (or write it to a file) as JSON.
    Build {
        /// Outcomes CSV (defaults to [source].path).
        #[arg(long)]
        csv: Option<PathBuf>,

        /// Hierarchy shape: grouped or legacy.
        #[arg(long)]
        schema: Option<SchemaVariant>,

        /// Write JSON here instead of stdout.
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Emit compact JSON.
        #[arg(long)]
        compact: bool,

        /// Build summary format on stderr.
        #[arg(long, default_value = "text")]
        summary: SummaryFormat,
    },

    /// Build the structure and store it in the document store.
    Publish {
        /// Outcomes CSV (defaults to [source].path).
        #[arg(long)]
        csv: Option<PathBuf>,

        /// Hierarchy shape: grouped or legacy.
        #[arg(long)]
        schema: Option<SchemaVariant>,

        /// Database file (defaults to [storage].db_path).
        #[arg(long)]
        db: Option<PathBuf>,

        /// Summary format. JSON goes to stdout as one object.
        #[arg(long, default_value = "text")]
        summary: SummaryFormat,
    },

    /// Print the raw outcome rows as JSON.
    Rows {
        /// Outcomes CSV (defaults to [source].path).
        #[arg(long)]
        csv: Option<PathBuf>,
    },

    /// Look things up in a structure.
    Query {
        /// Build from this CSV instead of reading the published document.
        #[arg(long)]
        csv: Option<PathBuf>,

        /// Hierarchy shape when building from CSV.
        #[arg(long)]
        schema: Option<SchemaVariant>,

        /// Database file (defaults to [storage].db_path).
        #[arg(long)]
        db: Option<PathBuf>,

        /// Print results as a JSON array.
        #[arg(long)]
        json: bool,

        #[command(subcommand)]
        lookup: Lookup,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Query lookups, broadest first.
#[derive(Subcommand)]
pub(crate) enum Lookup {
    /// List stages.
    Stages,
    /// List areas in a stage.
    Areas {
        #[arg(long)]
        stage: String,
    },
    /// List focus areas in an area.
    FocusAreas {
        #[arg(long)]
        stage: String,
        #[arg(long)]
        area: String,
    },
    /// List content groups in a focus area.
    Groups {
        #[arg(long)]
        stage: String,
        #[arg(long)]
        area: String,
        #[arg(long)]
        focus: String,
    },
    /// List content points in a focus area, optionally within one group.
    Points {
        #[arg(long)]
        stage: String,
        #[arg(long)]
        area: String,
        #[arg(long)]
        focus: String,
        #[arg(long)]
        group: Option<String>,
    },
    /// List outcome codes of a content point.
    Outcomes {
        #[arg(long)]
        stage: String,
        #[arg(long)]
        area: String,
        #[arg(long)]
        focus: String,
        #[arg(long)]
        group: String,
        #[arg(long)]
        point: String,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "curriculum=info",
        1 => "curriculum=debug",
        _ => "curriculum=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    // stdout carries command output; logs go to stderr.
    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };

    match cli.command {
        Command::Build {
            csv,
            schema,
            out,
            compact,
            summary,
        } => cmd_build(&config, csv, schema, out.as_deref(), compact, summary),
        Command::Publish {
            csv,
            schema,
            db,
            summary,
        } => cmd_publish(&config, csv, schema, db, summary).await,
        Command::Rows { csv } => cmd_rows(&config, csv),
        Command::Query {
            csv,
            schema,
            db,
            json,
            lookup,
        } => cmd_query(&config, csv, schema, db, json, lookup).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(&config),
        },
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn csv_source(config: &AppConfig, csv: Option<PathBuf>) -> CsvRecordSource {
    let path = csv.unwrap_or_else(|| PathBuf::from(&config.source.path));
    CsvRecordSource::new(path, config.source.columns.clone())
}

fn build_config(config: &AppConfig, schema: Option<SchemaVariant>) -> BuildConfig {
    let mut build = BuildConfig::from(config);
    if let Some(schema) = schema {
        build.schema = schema;
    }
    build
}

fn db_path(config: &AppConfig, db: Option<PathBuf>) -> PathBuf {
    db.unwrap_or_else(|| PathBuf::from(&config.storage.db_path))
}

fn print_summary(result: &BuildResult) {
    let stats = &result.stats;
    let schema = result
        .structure
        .schema()
        .map_or_else(|| "(empty)".to_string(), |s| s.to_string());
    eprintln!();
    eprintln!("  Curriculum structure built!");
    eprintln!("  Build:    {}", result.build_id);
    eprintln!("  Schema:   {schema}");
    eprintln!("  Rows:     {}", stats.records_read);
    eprintln!("  Used:     {}", stats.records_used);
    eprintln!("  Skipped:  {} (unknown stage: {})", stats.skipped(), stats.skipped_unknown_stage);
    for (field, count) in &stats.skipped_missing_field {
        eprintln!("            {count} missing {field}");
    }
    eprintln!("  Stages:   {}", result.structure.stages().len());
    eprintln!("  Points:   {}", stats.leaf_count);
    eprintln!("  Time:     {:.1}ms", result.elapsed.as_secs_f64() * 1000.0);
    eprintln!();
}

/// Machine-readable build summary, with the store receipt when published.
fn summary_json(result: &BuildResult, receipt: Option<&WriteReceipt>) -> serde_json::Value {
    serde_json::json!({
        "build_id": result.build_id.to_string(),
        "schema": result.structure.schema(),
        "stages": result.structure.stages().len(),
        "stats": result.stats,
        "elapsed_ms": result.elapsed.as_millis() as u64,
        "receipt": receipt,
    })
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn records_read(&self, count: usize) {
        self.spinner.set_message(format!("Read {count} rows"));
    }

    fn done(&self, _result: &BuildResult) {
        self.spinner.finish_and_clear();
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

fn cmd_build(
    config: &AppConfig,
    csv: Option<PathBuf>,
    schema: Option<SchemaVariant>,
    out: Option<&Path>,
    compact: bool,
    summary: SummaryFormat,
) -> Result<()> {
    let source = csv_source(config, csv);
    let build = build_config(config, schema);

    info!(source = source.name(), schema = %build.schema, "building curriculum structure");

    let reporter = CliProgress::new();
    let result = build_structure(&source, &build, &reporter)?;

    let json = if compact {
        serde_json::to_string(&result.structure)?
    } else {
        serde_json::to_string_pretty(&result.structure)?
    };

    match out {
        Some(path) => {
            std::fs::write(path, json)
                .map_err(|e| eyre!("cannot write '{}': {e}", path.display()))?;
            info!(path = %path.display(), "structure written");
        }
        None => println!("{json}"),
    }

    match summary {
        SummaryFormat::Text => print_summary(&result),
        SummaryFormat::Json => eprintln!("{}", summary_json(&result, None)),
    }
    Ok(())
}

async fn cmd_publish(
    config: &AppConfig,
    csv: Option<PathBuf>,
    schema: Option<SchemaVariant>,
    db: Option<PathBuf>,
    summary: SummaryFormat,
) -> Result<()> {
    let source = csv_source(config, csv);
    let build = build_config(config, schema);
    let target = PublishTarget::from(config);
    let db_path = db_path(config, db);

    info!(
        source = source.name(),
        db = %db_path.display(),
        collection = %target.collection,
        document = %target.document,
        "publishing curriculum structure"
    );

    // Build fully before touching the store so a failed read publishes nothing.
    let reporter = CliProgress::new();
    let result = build_structure(&source, &build, &reporter)?;

    let storage = Storage::open(&db_path).await?;
    let receipt = publish_structure(&storage, &result, &target).await?;

    if summary == SummaryFormat::Json {
        println!(
            "{}",
            serde_json::to_string_pretty(&summary_json(&result, Some(&receipt)))?
        );
        return Ok(());
    }

    print_summary(&result);
    println!("  Published: {}/{}", receipt.meta.collection, receipt.meta.doc_id);
    println!("  Hash:      {}", receipt.meta.content_hash);
    println!(
        "  Changed:   {}",
        if receipt.changed { "yes" } else { "no" }
    );
    println!();

    Ok(())
}

fn cmd_rows(config: &AppConfig, csv: Option<PathBuf>) -> Result<()> {
    let source = csv_source(config, csv);
    let records = source.read_records()?;
    info!(rows = records.len(), "rows read");
    println!("{}", serde_json::to_string_pretty(&records)?);
    Ok(())
}

async fn cmd_query(
    config: &AppConfig,
    csv: Option<PathBuf>,
    schema: Option<SchemaVariant>,
    db: Option<PathBuf>,
    json: bool,
    lookup: Lookup,
) -> Result<()> {
    let structure = match csv {
        Some(path) => {
            let source = csv_source(config, Some(path));
            build_structure(&source, &build_config(config, schema), &SilentProgress)?.structure
        }
        None => load_structure(config, db).await?,
    };

    let query = CurriculumQuery::new(structure);
    let items = match lookup {
        Lookup::Stages => query.list_stages(),
        Lookup::Areas { stage } => query.list_areas(&stage)?,
        Lookup::FocusAreas { stage, area } => query.list_focus_areas(&stage, &area)?,
        Lookup::Groups { stage, area, focus } => {
            query.list_content_groups(&stage, &area, &focus)?
        }
        Lookup::Points {
            stage,
            area,
            focus,
            group,
        } => query.list_content_points(&stage, &area, &focus, group.as_deref())?,
        Lookup::Outcomes {
            stage,
            area,
            focus,
            group,
            point,
        } => query.list_outcomes(&stage, &area, &focus, &group, &point)?,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&items)?);
    } else {
        for item in items {
            println!("{item}");
        }
    }
    Ok(())
}

async fn load_structure(config: &AppConfig, db: Option<PathBuf>) -> Result<FinalizedStructure> {
    let db_path = db_path(config, db);
    let target = PublishTarget::from(config);
    let storage = Storage::open_readonly(&db_path).await?;
    Ok(load_published(&storage, &target).await?)
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(config: &AppConfig) -> Result<()> {
    let toml_str = toml::to_string_pretty(config)?;
    println!("{toml_str}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_query_with_optional_group() {
        let cli = Cli::try_parse_from([
            "curriculum",
            "query",
            "--schema",
            "legacy",
            "points",
            "--stage",
            "Stage 1",
            "--area",
            "Math",
            "--focus",
            "Number",
        ])
        .expect("parse");

        match cli.command {
            Command::Query {
                schema,
                lookup: Lookup::Points { group, stage, .. },
                ..
            } => {
                assert_eq!(schema, Some(SchemaVariant::Legacy));
                assert_eq!(stage, "Stage 1");
                assert!(group.is_none());
            }
            _ => panic!("expected query points"),
        }
    }

    #[test]
    fn rejects_unknown_schema() {
        let result = Cli::try_parse_from(["curriculum", "build", "--schema", "flat"]);
        assert!(result.is_err());
    }

    #[test]
    fn json_summary_carries_stats_schema_and_receipt() {
        use curriculum_shared::{CurriculumRecord, RecordField};
        use curriculum_source::VecSource;

        let source = VecSource::new(
            "rows",
            vec![
                CurriculumRecord::default()
                    .with(RecordField::Stage, "Stage 1")
                    .with(RecordField::Area, "Math")
                    .with(RecordField::FocusArea, "Number")
                    .with(RecordField::ContentGroup, "Addition")
                    .with(RecordField::ContentPoint, "Add to 10")
                    .with(RecordField::OutcomeCode1, "MA1-1"),
                CurriculumRecord::default().with(RecordField::Stage, "Stage 1"),
            ],
        );
        let result =
            build_structure(&source, &BuildConfig::default(), &SilentProgress).expect("build");

        let summary = summary_json(&result, None);
        assert_eq!(summary["schema"], "grouped");
        assert_eq!(summary["stages"], 1);
        assert_eq!(summary["stats"]["records_read"], 2);
        assert_eq!(summary["stats"]["records_used"], 1);
        assert_eq!(summary["stats"]["skipped_missing_field"]["Area"], 1);
        assert_eq!(summary["stats"]["leaf_count"], 1);
        assert!(summary["receipt"].is_null());
    }

    #[test]
    fn parses_summary_format() {
        let cli = Cli::try_parse_from(["curriculum", "publish", "--summary", "json"])
            .expect("parse");
        assert!(matches!(
            cli.command,
            Command::Publish {
                summary: SummaryFormat::Json,
                ..
            }
        ));
    }

    #[test]
    fn schema_flag_overrides_config() {
        let config = AppConfig::default();
        assert_eq!(build_config(&config, None).schema, SchemaVariant::Grouped);
        assert_eq!(
            build_config(&config, Some(SchemaVariant::Legacy)).schema,
            SchemaVariant::Legacy
        );
    }
}
