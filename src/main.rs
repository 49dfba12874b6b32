use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use serde_json::Value;
use std::path::PathBuf;
use tracing::{error, info};

use firedash::api::Channel;
use firedash::export::{codec, DEFAULT_EXPORT_FILENAME};
use firedash::logging::init_logging;
use firedash::settings::Settings;
use firedash::workflow::{CrawlRequest, ExtractRequest, MapRequest, Notification, ScrapeRequest, WorkflowOutcome};
use firedash::{AppConfig, ExportFormat, ExportOptions, ExportTarget, Firedash, FiredashError, OperationKind};

#[derive(Parser)]
#[command(name = "firedash")]
#[command(about = "Scrape, crawl, map and extract websites through the Firecrawl API")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(short, long, global = true, help = "Enable verbose logging")]
    verbose: bool,

    #[arg(short, long, global = true, help = "Configuration file path")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape a single page
    Scrape {
        url: String,

        #[arg(short, long, value_delimiter = ',', default_value = "markdown", help = "Content formats to request")]
        formats: Vec<Channel>,

        #[arg(long, help = "Keep headers, navigation and footers")]
        full_page: bool,

        #[command(flatten)]
        export: ExportArgs,
    },

    /// Crawl a website starting from a URL
    Crawl {
        url: String,

        #[arg(long, help = "Link depth to follow (1-10, defaults to the saved setting)")]
        max_depth: Option<u32>,

        #[arg(long, help = "Maximum number of pages")]
        limit: Option<u32>,

        #[arg(short, long, value_delimiter = ',', default_value = "markdown", help = "Content formats to request")]
        formats: Vec<Channel>,

        #[arg(long, help = "Follow links to other domains")]
        follow_external: bool,

        #[arg(long, help = "Keep headers, navigation and footers")]
        full_page: bool,

        #[command(flatten)]
        export: ExportArgs,
    },

    /// List the URLs of a website
    Map {
        url: String,

        #[arg(long, help = "Include subdomains")]
        include_subdomains: bool,

        #[arg(long, help = "Only return URLs matching this search term")]
        search: Option<String>,

        #[command(flatten)]
        export: ExportArgs,
    },

    /// Extract structured data with a prompt or JSON schema
    Extract {
        url: String,

        #[arg(short, long, help = "What to extract")]
        prompt: Option<String>,

        #[arg(short, long, help = "JSON schema, inline or @path/to/schema.json")]
        schema: Option<String>,

        #[command(flatten)]
        export: ExportArgs,
    },

    /// Browse and manage past operations
    History {
        #[command(subcommand)]
        action: HistoryAction,
    },

    /// Show or change saved settings
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },

    /// Convert a file between formats
    Convert {
        #[arg(help = "Input file")]
        input: PathBuf,

        #[arg(long, help = "Format of the input file")]
        from: ExportFormat,

        #[arg(long, help = "Format to produce")]
        to: ExportFormat,

        #[arg(short, long, help = "Output file path (stdout when omitted)")]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum HistoryAction {
    /// List entries, newest first
    List {
        #[arg(short = 't', long = "type", help = "Only show one operation type")]
        kind: Option<OperationKind>,

        #[arg(short, long, help = "Case-insensitive URL filter")]
        search: Option<String>,
    },

    /// Show one entry with its results
    Show { id: String },

    /// Remove one entry
    Remove { id: String },

    /// Remove every entry
    Clear,

    /// Write an entry's results to the export directory
    Export {
        id: String,

        #[command(flatten)]
        export: ExportArgs,
    },

    /// Write a summary of every entry to the export directory
    ExportAll {
        #[arg(short, long, default_value = "json", help = "Format of the summary file")]
        format: ExportFormat,
    },
}

#[derive(Subcommand)]
enum SettingsAction {
    Show,
    SetApiKey { api_key: String },
    Reset,
}

#[derive(Args, Clone, Default)]
struct ExportArgs {
    #[arg(long, help = "Export results in this format")]
    export: Option<ExportFormat>,

    #[arg(long, value_delimiter = ',', help = "Export results as a zip with these formats")]
    archive: Vec<ExportFormat>,

    #[arg(long, default_value = DEFAULT_EXPORT_FILENAME, help = "Base name of the exported file")]
    filename: String,

    #[arg(long, help = "Do not append a timestamp to the file name")]
    no_timestamp: bool,
}

impl ExportArgs {
    /// Options when `--export` or `--archive` asked for an export
    fn options(&self) -> Option<ExportOptions> {
        (self.export.is_some() || !self.archive.is_empty()).then(|| self.options_or_json())
    }

    /// Options for an export that always happens, in JSON unless told otherwise
    fn options_or_json(&self) -> ExportOptions {
        let target = if !self.archive.is_empty() {
            ExportTarget::Archive(self.archive.clone())
        } else {
            ExportTarget::Format(self.export.unwrap_or(ExportFormat::Json))
        };

        ExportOptions {
            filename: self.filename.clone(),
            timestamp: !self.no_timestamp,
            target,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => AppConfig::load_from_file(path).await?,
        None => AppConfig::load().await?,
    };

    if cli.verbose {
        config.logging.level = "debug".to_string();
    }
    init_logging(&config.logging)?;

    info!("Firedash CLI v{}", env!("CARGO_PKG_VERSION"));

    // Conversion is purely local
    if let Commands::Convert { input, from, to, output } = &cli.command {
        return convert_file(input, *from, *to, output.as_deref()).await;
    }

    let app = Firedash::new(config).await?;

    match cli.command {
        Commands::Scrape { url, formats, full_page, export } => {
            let request = ScrapeRequest {
                url,
                formats,
                only_main_content: !full_page,
            };
            let outcome = app.panels().scrape(request).await;
            finish(&app, outcome, &export).await?;
        }
        Commands::Crawl { url, max_depth, limit, formats, follow_external, full_page, export } => {
            let defaults = app.settings().load().await.crawl_defaults;
            let request = CrawlRequest {
                url,
                max_depth: max_depth.unwrap_or(defaults.max_depth),
                limit,
                formats,
                follow_external: follow_external || defaults.follow_external,
                only_main_content: !full_page && defaults.main_content_only,
            };
            let outcome = app.panels().crawl(request).await;
            finish(&app, outcome, &export).await?;
        }
        Commands::Map { url, include_subdomains, search, export } => {
            let request = MapRequest {
                url,
                include_subdomains,
                search,
            };
            let outcome = app.panels().map(request).await;
            finish(&app, outcome, &export).await?;
        }
        Commands::Extract { url, prompt, schema, export } => {
            let schema = match schema {
                Some(arg) => Some(read_schema(&arg).await?),
                None => None,
            };
            let request = ExtractRequest { url, prompt, schema };
            let outcome = app.panels().extract(request).await;
            finish(&app, outcome, &export).await?;
        }
        Commands::History { action } => run_history(&app, action).await?,
        Commands::Settings { action } => run_settings(&app, action).await?,
        Commands::Convert { .. } => {}
    }

    Ok(())
}

/// Report a workflow outcome and export its results when asked to
async fn finish(
    app: &Firedash,
    outcome: Result<WorkflowOutcome, FiredashError>,
    export: &ExportArgs,
) -> Result<()> {
    let outcome = match outcome {
        Ok(outcome) => outcome,
        Err(e) => {
            print_notification(&Notification::for_validation(&e));
            std::process::exit(2);
        }
    };

    print_notification(&outcome.notification);
    println!("History entry: {}", outcome.entry.id);

    if !outcome.is_success() {
        std::process::exit(1);
    }

    if let Some(results) = outcome.results() {
        for (i, document) in results.documents().iter().enumerate() {
            let channels: Vec<String> = document.present_channels().iter().map(|c| c.to_string()).collect();
            println!("  [{}] {}", i + 1, channels.join(", "));
        }
    }

    if let Some(options) = export.options() {
        let stats = app.export_entry(&outcome.entry.id, &options).await?;
        println!(
            "Results exported to: {} ({} bytes)",
            stats.file_path.display(),
            stats.file_size_bytes
        );
    }

    Ok(())
}

fn print_notification(notification: &Notification) {
    println!("{}: {}", notification.title, notification.description);
}

/// Inline JSON, or the contents of a file when prefixed with `@`
async fn read_schema(arg: &str) -> Result<String> {
    match arg.strip_prefix('@') {
        Some(path) => Ok(tokio::fs::read_to_string(path).await?),
        None => Ok(arg.to_string()),
    }
}

async fn run_history(app: &Firedash, action: HistoryAction) -> Result<()> {
    let history = app.history();

    match action {
        HistoryAction::List { kind, search } => {
            let entries = history.list_entries(kind, search.as_deref()).await;

            println!("{:<36} {:<8} {:<8} {:<20} {}", "ID", "Type", "Status", "Created", "URL");
            println!("{}", "-".repeat(100));

            for entry in entries {
                let status = serde_json::to_value(entry.status)?;
                println!(
                    "{:<36} {:<8} {:<8} {:<20} {}",
                    entry.id,
                    entry.kind,
                    status.as_str().unwrap_or_default(),
                    entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
                    entry.url
                );
            }
        }
        HistoryAction::Show { id } => match history.get_entry(&id).await {
            Some(entry) => println!("{}", serde_json::to_string_pretty(&entry)?),
            None => {
                error!("No history entry with id {}", id);
                std::process::exit(1);
            }
        },
        HistoryAction::Remove { id } => {
            if history.remove_entry(&id).await {
                println!("History entry has been removed.");
            } else {
                println!("No history entry with id {}", id);
            }
        }
        HistoryAction::Clear => {
            history.clear_history().await;
            println!("All history entries have been removed.");
        }
        HistoryAction::Export { id, export } => {
            let stats = app.export_entry(&id, &export.options_or_json()).await?;
            println!("Results downloaded to: {}", stats.file_path.display());
        }
        HistoryAction::ExportAll { format } => {
            let stats = app.export_history(format).await?;
            println!("History exported as {}: {}", format.to_string().to_uppercase(), stats.file_path.display());
        }
    }

    Ok(())
}

async fn run_settings(app: &Firedash, action: SettingsAction) -> Result<()> {
    let store = app.settings();

    match action {
        SettingsAction::Show => {
            let settings = store.load().await;
            println!("{}", serde_json::to_string_pretty(&masked(settings))?);
        }
        SettingsAction::SetApiKey { api_key } => {
            store.set_api_key(&api_key).await?;
            println!("Your API key has been saved successfully.");
        }
        SettingsAction::Reset => {
            store.reset().await?;
            println!("All settings have been reset to defaults.");
        }
    }

    Ok(())
}

fn masked(mut settings: Settings) -> Settings {
    if let Some(key) = settings.api_key() {
        let visible: String = key.chars().take(3).collect();
        settings.api_key = format!("{}****", visible);
    }
    settings
}

async fn convert_file(input: &std::path::Path, from: ExportFormat, to: ExportFormat, output: Option<&std::path::Path>) -> Result<()> {
    let text = tokio::fs::read_to_string(input).await?;
    let converted = codec::convert(&Value::String(text), from, to).map_err(FiredashError::export)?;

    match output {
        Some(path) => {
            tokio::fs::write(path, &converted).await?;
            info!("Converted {} ({}) to {} ({})", input.display(), from, path.display(), to);
        }
        None => println!("{}", converted),
    }

    Ok(())
}
