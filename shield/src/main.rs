use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use ip_reputation::{AbuseIpDbClient, ReputationLookup};
use scanlog_sqlite::Db;
use shield::alert::{AlertSink, LogAlertSink, WebhookAlertSink};
use shield::config::{self, Config};
use shield::{ExplanationState, Logged, Pipeline, ScanOutcome, ScoringContext};
use shield_core::{summarize, ScanFilter, ScanKind, ScanLog, ScanRecord, SummaryStats};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum OutputFormat { Text, Json }

#[derive(Debug, Parser)]
#[command(name = "shield", version, about = "Threat and abuse detection: URLs, messages, profiles, IDS events and IPs")]
struct Cli {
    /// Optional config file (YAML). If omitted, loads ./shield.yaml if present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Scan log database (overrides store.path)
    #[arg(long, global = true, value_name = "FILE")]
    db: Option<PathBuf>,
    /// Directory holding the model artifacts (overrides models.dir)
    #[arg(long, global = true, value_name = "DIR")]
    models: Option<PathBuf>,
    /// Output format
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
    /// Debug logging (RUST_LOG still wins when set)
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print version information
    Version,
    /// Classify a URL as Malicious or Safe
    Url { url: String },
    /// Check a message for cyberbullying
    Text {
        #[arg(conflicts_with = "file")]
        text: Option<String>,
        /// Read the message from a file
        #[arg(long, value_name = "FILE")]
        file: Option<PathBuf>,
    },
    /// Score a profile record (JSON) for fake-account risk
    Profile {
        #[arg(conflicts_with = "file")]
        json: Option<String>,
        #[arg(long, value_name = "FILE")]
        file: Option<PathBuf>,
    },
    /// Run the IDS rules over one log line
    Ids {
        #[arg(conflicts_with = "simulate")]
        line: Option<String>,
        /// Generate a random attack line instead
        #[arg(long, default_value_t = false)]
        simulate: bool,
    },
    /// Look up an IP address reputation
    Ip { address: String },
    /// Show logged scans, most recent first
    History {
        #[arg(long, default_value_t = 200)]
        limit: usize,
        /// Only this kind (URL, Text, Profile, IDS, IP)
        #[arg(long)]
        kind: Option<ScanKind>,
        /// Only results containing this text (case-insensitive)
        #[arg(long)]
        result: Option<String>,
    },
    /// Aggregate statistics over the whole log
    Summary,
    /// Export the scan log
    Export {
        #[arg(long, value_name = "FILE")]
        csv: Option<PathBuf>,
        #[cfg(feature = "parquet")]
        #[arg(long, value_name = "FILE")]
        parquet: Option<PathBuf>,
    },
    /// Run the demo URLs and messages through the pipeline
    Seed,
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "info" }));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(filter)
        .init();
}

fn open_store(path: &Path) -> Result<Db> {
    Ok(Db::open_or_create(path)?)
}

/// Scans still return their verdict when the store is down.
fn open_store_for_scans(path: &Path) -> Db {
    match Db::open_or_create(path) {
        Ok(db) => db,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "scan log unavailable; results will not be recorded");
            Db::deferred(path)
        }
    }
}

fn build_pipeline(cfg: &Config, store: &Path, models: &Path) -> Result<Pipeline<Db>> {
    let ctx = ScoringContext::load(models).with_context(|| format!("loading models from {}", models.display()))?;
    let reputation: Arc<dyn ReputationLookup> =
        Arc::new(AbuseIpDbClient::new(cfg.reputation(std::env::var(config::API_KEY_ENV).ok()))?);
    let pipeline = Pipeline::new(Arc::new(ctx), open_store_for_scans(store), reputation);
    let alerts = cfg.alerts();
    if !alerts.enabled.unwrap_or(false) {
        return Ok(pipeline);
    }
    let timeout = Duration::from_millis(alerts.timeout_ms.unwrap_or(5_000));
    let sink: Box<dyn AlertSink> = match alerts.webhook_url {
        Some(url) => Box::new(WebhookAlertSink::new(url, timeout)?),
        None => Box::new(LogAlertSink),
    };
    let recipient = alerts.recipient.unwrap_or_else(|| "security@localhost".to_string());
    Ok(pipeline.with_alerts(sink, recipient))
}

fn read_arg(value: Option<String>, file: Option<PathBuf>, what: &str) -> Result<String> {
    match (value, file) {
        (Some(v), _) => Ok(v),
        (None, Some(p)) => std::fs::read_to_string(&p).with_context(|| format!("reading {}", p.display())),
        (None, None) => Err(anyhow!("provide {what} or --file <FILE>")),
    }
}

fn outcome_json(out: &ScanOutcome) -> serde_json::Value {
    let logged = match &out.logged {
        Logged::Stored(r) => serde_json::json!({ "id": r.id, "timestamp": r.timestamp }),
        Logged::Failed(e) => serde_json::json!({ "error": e.to_string(), "code": e.code() }),
    };
    serde_json::json!({
        "type": out.kind,
        "result": out.verdict.label,
        "confidence": out.verdict.confidence,
        "reasons": out.verdict.reasons,
        "explanation": out.explanation,
        "logged": logged,
    })
}

fn print_outcome(out: &ScanOutcome, format: OutputFormat) -> Result<()> {
    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string(&outcome_json(out))?);
        return Ok(());
    }
    println!("[{}] {} (confidence {:.2})", out.kind, out.verdict.label, out.verdict.confidence);
    for r in &out.verdict.reasons {
        println!("  - {r}");
    }
    match &out.explanation {
        ExplanationState::Available(e) if !e.is_empty() => {
            println!("  top factors:");
            for c in e.top(5) {
                println!("    {:<24} {:+.4}", c.factor, c.value);
            }
        }
        ExplanationState::Unavailable(why) => println!("  explanation unavailable: {why}"),
        _ => {}
    }
    match &out.logged {
        Logged::Stored(r) => println!("  logged #{} at {}", r.id, r.timestamp),
        Logged::Failed(e) => eprintln!("warning: result not logged: {e}"),
    }
    Ok(())
}

fn print_records(records: &[ScanRecord], format: OutputFormat) -> Result<()> {
    for r in records {
        match format {
            OutputFormat::Json => println!("{}", serde_json::to_string(r)?),
            OutputFormat::Text => {
                let input: String = r.input.chars().take(60).collect();
                println!("{:>6}  {}  {:<7} {:<28} {:.2}  {}", r.id, r.timestamp, r.kind, r.result, r.confidence, input);
            }
        }
    }
    Ok(())
}

fn print_summary(s: &SummaryStats, format: OutputFormat) -> Result<()> {
    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string(s)?);
        return Ok(());
    }
    println!("total scans: {}", s.total);
    println!("malicious:   {}", s.malicious);
    println!("safe:        {}", s.safe);
    println!("other:       {}", s.unclassified());
    for (title, map) in [("by type", &s.by_kind), ("by result", &s.by_result), ("by day", &s.by_day)] {
        if map.is_empty() {
            continue;
        }
        println!("{title}:");
        for (k, v) in map {
            println!("  {k:<30} {v}");
        }
    }
    Ok(())
}

fn run_scan(cfg: &Config, store: &Path, models: &Path, kind: ScanKind, input: &str, format: OutputFormat) -> Result<()> {
    let pipeline = build_pipeline(cfg, store, models)?;
    let rt = tokio::runtime::Runtime::new()?;
    let out = rt.block_on(pipeline.run(kind, input))?;
    print_outcome(&out, format)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let cfg = config::load_config(cli.config.as_deref())?;
    let store = cli.db.clone().unwrap_or_else(|| cfg.store_path());
    let models = cli.models.clone().unwrap_or_else(|| cfg.models_dir());
    let format = cli.format;

    match cli.command {
        Commands::Version => {
            println!("shield {} (core {})", env!("CARGO_PKG_VERSION"), shield_core::version());
        }
        Commands::Url { url } => run_scan(&cfg, &store, &models, ScanKind::Url, &url, format)?,
        Commands::Text { text, file } => {
            let text = read_arg(text, file, "a message")?;
            run_scan(&cfg, &store, &models, ScanKind::Text, &text, format)?;
        }
        Commands::Profile { json, file } => {
            let json = read_arg(json, file, "a profile JSON record")?;
            run_scan(&cfg, &store, &models, ScanKind::Profile, &json, format)?;
        }
        Commands::Ids { line, simulate } => {
            let line = if simulate {
                let ev = ids_scan::simulate(&mut rand::thread_rng());
                tracing::info!(source_ip = ev.source_ip, event = ev.event.label(), "simulated attack");
                ev.line
            } else {
                line.ok_or_else(|| anyhow!("provide a log line or --simulate"))?
            };
            run_scan(&cfg, &store, &models, ScanKind::IdsEvent, &line, format)?;
        }
        Commands::Ip { address } => run_scan(&cfg, &store, &models, ScanKind::IpReputation, &address, format)?,
        Commands::History { limit, kind, result } => {
            let db = open_store(&store)?;
            let records = db.fetch_filtered(&ScanFilter { kind, result_contains: result, limit: Some(limit) })?;
            if records.is_empty() && format == OutputFormat::Text {
                println!("no scans logged yet");
            }
            print_records(&records, format)?;
        }
        Commands::Summary => {
            let db = open_store(&store)?;
            print_summary(&summarize(&db.fetch_all()?), format)?;
        }
        #[cfg(not(feature = "parquet"))]
        Commands::Export { csv } => {
            let path = csv.ok_or_else(|| anyhow!("provide --csv <FILE>"))?;
            let db = open_store(&store)?;
            let n = shield::export::export_csv(&db.fetch_all()?, &path)?;
            println!("exported {n} scans to {}", path.display());
        }
        #[cfg(feature = "parquet")]
        Commands::Export { csv, parquet } => {
            if csv.is_none() && parquet.is_none() {
                return Err(anyhow!("provide --csv <FILE> and/or --parquet <FILE>"));
            }
            let db = open_store(&store)?;
            if let Some(path) = csv {
                let n = shield::export::export_csv(&db.fetch_all()?, &path)?;
                println!("exported {n} scans to {}", path.display());
            }
            if let Some(path) = parquet {
                let n = db.export_parquet(&path)?;
                println!("exported {n} scans to {}", path.display());
            }
        }
        Commands::Seed => {
            let pipeline = build_pipeline(&cfg, &store, &models)?;
            let rt = tokio::runtime::Runtime::new()?;
            let results = rt.block_on(shield::seed::seed(&pipeline));
            let mut failed = 0usize;
            for (kind, input, res) in results {
                match res {
                    Ok(out) => print_outcome(&out, format)?,
                    Err(e) => {
                        failed += 1;
                        eprintln!("[{kind}] {input}: {e}");
                    }
                }
            }
            if failed > 0 {
                return Err(anyhow!("{failed} demo scans failed"));
            }
        }
    }
    Ok(())
}
