//! Lorecraft CLI: enhance generated tabletop-RPG content, inspect stages,
//! manage the stored configuration, or serve MCP.
//!
//! Usage:
//!   lorecraft enhance <FILE> [--kind adventure] [--mode quality] [--json]
//!   lorecraft stages | health
//!   lorecraft config show|save <FILE>|reset [--db path] [--user id]
//!   lorecraft mcp [--db path] [--user id]

use clap::{Parser, Subcommand};
use lorecraft::{
    AdapterRegistry, ConfigStore, ContentItem, ContentKind, Enhancement, EnhancementConfig,
    EnhancementInput, EnhancementPipeline, FallbackBehavior, GenerationContext, HeuristicBackend,
    OpenStore, PerformanceMode, PipelineError, SqliteConfigStore, StageStatus,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(
    name = "lorecraft",
    version,
    about = "Enhancement pipeline and quality scoring for generated tabletop-RPG content"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the enhancement pipeline over a markdown file
    Enhance {
        /// Markdown file to enhance
        file: PathBuf,
        /// Content kind (adventure, npc, monster, puzzle, encounter, other)
        #[arg(long, default_value = "adventure")]
        kind: ContentKind,
        /// Title (defaults to the file stem)
        #[arg(long)]
        title: Option<String>,
        /// Prompt the content was generated from (defaults to the title)
        #[arg(long)]
        prompt: Option<String>,
        /// Rules system, e.g. 5e
        #[arg(long)]
        system: Option<String>,
        /// Performance mode preset (speed, balanced, quality)
        #[arg(long)]
        mode: Option<PerformanceMode>,
        /// YAML configuration file; overrides the stored configuration
        #[arg(long)]
        config: Option<PathBuf>,
        /// Fail if any enabled stage fails
        #[arg(long)]
        strict: bool,
        /// Per-stage timeout in milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,
        /// Print the full enhancement as JSON
        #[arg(long)]
        json: bool,
        /// Path to SQLite database file
        #[arg(long)]
        db: Option<PathBuf>,
        /// User whose stored configuration to use
        #[arg(long)]
        user: Option<String>,
    },
    /// List pipeline stages and their availability
    Stages,
    /// Initialize every adapter and print health and metrics
    Health,
    /// Manage the stored enhancement configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
        /// Path to SQLite database file
        #[arg(long, global = true)]
        db: Option<PathBuf>,
        /// User the configuration belongs to
        #[arg(long, global = true)]
        user: Option<String>,
    },
    /// Start the MCP (Model Context Protocol) server on stdio
    Mcp {
        /// Path to SQLite database file
        #[arg(long)]
        db: Option<PathBuf>,
        /// User whose stored configuration the server uses
        #[arg(long)]
        user: Option<String>,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration as YAML
    Show,
    /// Store a YAML configuration file
    Save {
        /// YAML file to store
        file: PathBuf,
    },
    /// Delete the stored configuration
    Reset,
}

/// Get the default database path (~/.local/share/lorecraft/lorecraft.db)
fn default_db_path() -> PathBuf {
    let data_dir = dirs::data_dir()
        .unwrap_or_else(|| dirs::home_dir().unwrap_or_default().join(".local/share"));
    data_dir.join("lorecraft").join("lorecraft.db")
}

fn open_store(db: Option<PathBuf>) -> Result<SqliteConfigStore, String> {
    let db_path = db.unwrap_or_else(default_db_path);
    SqliteConfigStore::open(&db_path).map_err(|e| format!("Failed to open database: {}", e))
}

fn build_pipeline() -> EnhancementPipeline {
    let registry = AdapterRegistry::with_builtin_adapters(Arc::new(HeuristicBackend::new()));
    EnhancementPipeline::new(Arc::new(registry))
}

fn load_config(
    config: Option<&Path>,
    db: Option<PathBuf>,
    user: Option<&str>,
) -> Result<EnhancementConfig, String> {
    if let Some(path) = config {
        let text = std::fs::read_to_string(path)
            .map_err(|e| format!("cannot read '{}': {}", path.display(), e))?;
        return EnhancementConfig::from_yaml(&text).map_err(|e| e.to_string());
    }
    let store = open_store(db)?;
    let stored = store.load(user).map_err(|e| e.to_string())?;
    Ok(stored.unwrap_or_default())
}

/// A blank or missing prompt falls back to the title.
fn prompt_or_title(prompt: Option<String>, title: &str) -> String {
    prompt
        .filter(|p| !p.trim().is_empty())
        .unwrap_or_else(|| title.to_string())
}

fn runtime() -> Result<tokio::runtime::Runtime, String> {
    tokio::runtime::Runtime::new().map_err(|e| format!("failed to create tokio runtime: {}", e))
}

struct EnhanceArgs {
    file: PathBuf,
    kind: ContentKind,
    title: Option<String>,
    prompt: Option<String>,
    system: Option<String>,
    mode: Option<PerformanceMode>,
    config: Option<PathBuf>,
    strict: bool,
    timeout_ms: Option<u64>,
    json: bool,
    db: Option<PathBuf>,
    user: Option<String>,
}

fn cmd_enhance(args: EnhanceArgs) -> i32 {
    let body = match std::fs::read_to_string(&args.file) {
        Ok(body) => body,
        Err(e) => {
            eprintln!("Error: cannot read '{}': {}", args.file.display(), e);
            return 1;
        }
    };
    let mut config = match load_config(args.config.as_deref(), args.db, args.user.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    if let Some(mode) = args.mode {
        config = config.with_mode(mode);
    }
    if args.strict {
        config = config.with_fallback(FallbackBehavior::Strict);
    }
    if let Some(ms) = args.timeout_ms {
        config = config.with_timeout_ms(ms);
    }

    let title = args.title.unwrap_or_else(|| {
        args.file
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default()
    });
    let mut context = GenerationContext::new(prompt_or_title(args.prompt, &title));
    context.game_system = args.system;
    let input = EnhancementInput::new(ContentItem::new(args.kind, title, body), context);

    let rt = match runtime() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    let pipeline = build_pipeline();
    match rt.block_on(pipeline.run(input, &config, None)) {
        Ok(enhancement) if args.json => match serde_json::to_string_pretty(&enhancement) {
            Ok(text) => {
                println!("{}", text);
                0
            }
            Err(e) => {
                eprintln!("Error: {}", e);
                1
            }
        },
        Ok(enhancement) => {
            print_summary(&enhancement);
            0
        }
        Err(PipelineError::PartialFailure { report }) => {
            eprintln!(
                "Error: {} of {} enabled stages failed",
                report.failed_steps,
                report.enabled_steps()
            );
            for result in report.step_details.iter().filter(|r| r.status == StageStatus::Failed) {
                eprintln!(
                    "  {:<24} {}",
                    result.stage,
                    result.error.as_deref().unwrap_or("")
                );
            }
            2
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn print_summary(enhancement: &Enhancement) {
    let metrics = &enhancement.quality_metrics;
    println!(
        "{}  grade {}  overall {:.1}  impact {:.1}  ({} ms)",
        enhancement.original_content.title,
        enhancement.grade,
        metrics.overall_score,
        metrics.impact_score,
        enhancement.processing_time.as_millis()
    );
    for (label, score) in metrics.sub_scores() {
        println!("  {:<24} {:>5.1}", label, score);
    }
    println!();
    println!("{:<24}  {:<10}  {:>8}", "STAGE", "STATUS", "TIME(ms)");
    println!("{}", "-".repeat(46));
    for result in &enhancement.report.step_details {
        let status = match result.status {
            StageStatus::Completed => "completed",
            StageStatus::Failed => "failed",
            StageStatus::Skipped => "skipped",
        };
        println!(
            "{:<24}  {:<10}  {:>8}",
            result.stage,
            status,
            result.duration.as_millis()
        );
    }
    for line in &enhancement.breakdown.improvements {
        println!("- {}", line);
    }
}

fn cmd_stages() -> i32 {
    let rt = match runtime() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    let pipeline = build_pipeline();
    let available = rt.block_on(pipeline.registry().list_available());
    println!("{:<24}  {:<28}  {:>6}  {:>9}", "NAME", "LABEL", "IMPACT", "AVAILABLE");
    println!("{}", "-".repeat(74));
    for stage in &pipeline.definition().stages {
        println!(
            "{:<24}  {:<28}  {:>6.0}  {:>9}",
            stage,
            stage.label(),
            stage.base_impact(),
            if available.contains(stage) { "yes" } else { "no" }
        );
    }
    0
}

fn cmd_health() -> i32 {
    let rt = match runtime() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    let pipeline = build_pipeline();
    let registry = pipeline.registry();
    let summary = rt.block_on(registry.initialize_all());
    println!(
        "Initialized {} of {} adapters",
        summary.succeeded, summary.total
    );
    let snapshot = serde_json::json!({
        "health": registry.health_snapshot(),
        "metrics": registry.metrics_snapshot(),
    });
    match serde_json::to_string_pretty(&snapshot) {
        Ok(text) => {
            println!("{}", text);
            if summary.is_acceptable() {
                0
            } else {
                1
            }
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn cmd_config_show(store: &SqliteConfigStore, user: Option<&str>) -> i32 {
    let config = match store.load(user) {
        Ok(stored) => stored.unwrap_or_default(),
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    match config.to_yaml() {
        Ok(text) => {
            print!("{}", text);
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn cmd_config_save(store: &SqliteConfigStore, file: &Path, user: Option<&str>) -> i32 {
    let text = match std::fs::read_to_string(file) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("Error: cannot read '{}': {}", file.display(), e);
            return 1;
        }
    };
    let config = match EnhancementConfig::from_yaml(&text) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    match store.save(&config, user) {
        Ok(()) => {
            println!("Saved configuration");
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn cmd_config_reset(store: &SqliteConfigStore, user: Option<&str>) -> i32 {
    match store.delete(user) {
        Ok(true) => {
            println!("Deleted stored configuration");
            0
        }
        Ok(false) => {
            println!("No stored configuration");
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lorecraft=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let code = match cli.command {
        Commands::Enhance {
            file,
            kind,
            title,
            prompt,
            system,
            mode,
            config,
            strict,
            timeout_ms,
            json,
            db,
            user,
        } => cmd_enhance(EnhanceArgs {
            file,
            kind,
            title,
            prompt,
            system,
            mode,
            config,
            strict,
            timeout_ms,
            json,
            db,
            user,
        }),
        Commands::Stages => cmd_stages(),
        Commands::Health => cmd_health(),
        Commands::Config { action, db, user } => {
            let store = match open_store(db) {
                Ok(s) => s,
                Err(e) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            };
            match action {
                ConfigAction::Show => cmd_config_show(&store, user.as_deref()),
                ConfigAction::Save { file } => cmd_config_save(&store, &file, user.as_deref()),
                ConfigAction::Reset => cmd_config_reset(&store, user.as_deref()),
            }
        }
        Commands::Mcp { db, user } => {
            let db_path = db.unwrap_or_else(default_db_path);
            lorecraft::mcp::run_mcp_server(db_path, user)
        }
    };
    std::process::exit(code);
}
