use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing::warn;
use tracing_subscriber::EnvFilter;

use honsagashi_core::config::PluginConfig;
use honsagashi_core::identifiers::isbn::Isbn;
use honsagashi_core::source::{AUTHOR, DESCRIPTION, IdentifyQuery, MetadataSource, NdlSource, VERSION};
use honsagashi_core::{AbortSignal, Cover, NormalizedMetadata};

// ─── CLI Definition ─────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "honsagashi",
    about = "Japanese book metadata and covers from NDL Search",
    version,
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output in JSON format (for scripts).
    /// Also enabled by setting HONSAGASHI_JSON=1.
    #[arg(long, global = true)]
    json: bool,

    /// Override `max_results` from the config file.
    #[arg(long, global = true)]
    max_results: Option<u32>,

    /// Override `base_url` from the config file.
    #[arg(long, global = true)]
    base_url: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Look up metadata by ISBN, NDLBibID or title/author.
    Identify {
        #[arg(long)]
        isbn: Option<String>,
        #[arg(long)]
        ndlbibid: Option<String>,
        #[arg(long)]
        title: Option<String>,
        #[arg(long, action = clap::ArgAction::Append)]
        author: Vec<String>,
        /// Per-request timeout in seconds.
        #[arg(long)]
        timeout: Option<u64>,
        /// Keep author names exactly as catalogued.
        #[arg(long)]
        raw_authors: bool,
    },

    /// Download the cover thumbnail for an ISBN.
    Cover {
        #[arg(long)]
        isbn: String,
        /// Where to write the image (default: <isbn>.jpg).
        #[arg(long)]
        output: Option<PathBuf>,
        #[arg(long)]
        timeout: Option<u64>,
    },

    /// Config management.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Run live lookups against NDL Search and compare with known records.
    Check,
}

// ─── Config Actions ──────────────────────────────────────────────────────────

#[derive(Subcommand)]
enum ConfigAction {
    /// Show all config values.
    List,
    /// Print the config file path.
    Path,
    /// Write a config file with default values.
    Init {
        #[arg(long)]
        force: bool,
    },
    /// Describe the available options.
    Options,
}

// ─── Main ────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let start = Instant::now();
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    // ── Env var overrides ──────────────────────────────────────────────────
    let json_output = cli.json || std::env::var("HONSAGASHI_JSON").as_deref() == Ok("1");

    let mut config = PluginConfig::load()?;
    if let Some(max_results) = cli.max_results {
        config.max_results = max_results;
    }
    if let Some(base_url) = cli.base_url {
        config.base_url = base_url;
    }

    match cli.command {
        Commands::Identify {
            isbn,
            ndlbibid,
            title,
            author,
            timeout,
            raw_authors,
        } => {
            if raw_authors {
                config.clean_authorname = false;
            }
            let timeout = timeout.map(Duration::from_secs).unwrap_or(config.timeout());
            let source = NdlSource::with_config(config)?;

            let mut identifiers = BTreeMap::new();
            if let Some(isbn) = isbn {
                if let Err(e) = Isbn::parse(&isbn) {
                    warn!(error = %e, "searching anyway");
                }
                identifiers.insert("isbn".to_string(), isbn);
            }
            if let Some(id) = ndlbibid {
                identifiers.insert("ndlbibid".to_string(), id);
            }
            let query = IdentifyQuery {
                title,
                authors: author,
                identifiers,
            };
            if query.title.is_none() && query.identifiers.is_empty() {
                bail!("give at least one of --isbn, --ndlbibid or --title");
            }

            let results = identify(&source, &query, timeout).await;
            let dur = start.elapsed().as_millis();

            if json_output {
                print_json(&serde_json::json!({
                    "status": "ok",
                    "data": { "items": results, "total": results.len() },
                    "meta": { "duration_ms": dur }
                }))?;
            } else if results.is_empty() {
                println!("No records found.");
                std::process::exit(2);
            } else {
                for (i, meta) in results.iter().enumerate() {
                    if i > 0 {
                        println!();
                    }
                    print_metadata(meta);
                }
            }
        }

        // ── Cover ──────────────────────────────────────────────────────────

        Commands::Cover {
            isbn,
            output,
            timeout,
        } => {
            let timeout = timeout.map(Duration::from_secs).unwrap_or(config.timeout());
            let source = NdlSource::with_config(config)?;
            let identifiers = BTreeMap::from([("isbn".to_string(), isbn.clone())]);

            let sink: Mutex<Vec<Cover>> = Mutex::new(Vec::new());
            source
                .download_cover(&sink, &AbortSignal::new(), timeout, &identifiers)
                .await;
            let cover = sink
                .into_inner()
                .map_err(|_| anyhow::anyhow!("cover queue poisoned"))?
                .into_iter()
                .next();
            let dur = start.elapsed().as_millis();

            let Some(cover) = cover else {
                if json_output {
                    print_json(&serde_json::json!({"status":"error","error":"not_found","message":format!("No cover for {isbn}"),"meta":{"duration_ms":dur}}))?;
                } else {
                    eprintln!("No cover for ISBN {isbn}");
                }
                std::process::exit(2);
            };

            let path = output.unwrap_or_else(|| PathBuf::from(format!("{}.jpg", isbn.replace('-', ""))));
            std::fs::write(&path, &cover.data)
                .with_context(|| format!("writing {}", path.display()))?;

            if json_output {
                print_json(&serde_json::json!({"status":"ok","data":{"path":path,"bytes":cover.data.len(),"source":cover.source},"meta":{"duration_ms":dur}}))?;
            } else {
                println!("Saved cover ({} bytes) to {}", cover.data.len(), path.display());
            }
        }

        // ── Config ─────────────────────────────────────────────────────────

        Commands::Config { action } => {
            let dur = start.elapsed().as_millis();
            match action {
                ConfigAction::List => {
                    let kv = config_key_values(&config);
                    if json_output {
                        print_json(&serde_json::json!({"status":"ok","data":kv,"meta":{"duration_ms":dur}}))?;
                    } else {
                        for (k, v) in &kv {
                            println!("{k} = {v}");
                        }
                    }
                }
                ConfigAction::Path => {
                    let path = PluginConfig::config_path();
                    if json_output {
                        print_json(&serde_json::json!({"status":"ok","data":{"path":path,"exists":path.exists()},"meta":{"duration_ms":dur}}))?;
                    } else {
                        println!("{}", path.display());
                    }
                }
                ConfigAction::Init { force } => {
                    let path = PluginConfig::config_path();
                    if path.exists() && !force {
                        eprintln!("Config already exists at {}. Add --force to overwrite.", path.display());
                        std::process::exit(8);
                    }
                    PluginConfig::default().save_to(&path)?;
                    if json_output {
                        print_json(&serde_json::json!({"status":"ok","data":{"path":path},"meta":{"duration_ms":dur}}))?;
                    } else {
                        println!("Wrote default config to {}", path.display());
                    }
                }
                ConfigAction::Options => {
                    let options = PluginConfig::options();
                    if json_output {
                        print_json(&serde_json::json!({"status":"ok","data":options,"meta":{"duration_ms":dur}}))?;
                    } else {
                        for opt in &options {
                            println!("{} (default {}): {}", opt.name, opt.default, opt.label);
                            println!("    {}", opt.tooltip);
                        }
                    }
                }
            }
        }

        // ── Check ──────────────────────────────────────────────────────────

        Commands::Check => {
            // The known records are checked against the default behaviour.
            config.filename_shortcut = true;
            config.clean_authorname = true;
            let timeout = config.timeout();
            let source = NdlSource::with_config(config)?;
            let mut issues = 0;

            println!(
                "{} v{}.{}.{} by {}",
                source.name(),
                VERSION.0,
                VERSION.1,
                VERSION.2,
                AUTHOR
            );
            println!("{DESCRIPTION}\n");

            for case in smoke_cases() {
                let results = identify(&source, &case.query, timeout).await;
                let hit = results
                    .iter()
                    .any(|m| m.title == case.title && m.authors == case.authors);
                if hit {
                    println!("✓ {}: {}", case.label, case.title);
                } else {
                    issues += 1;
                    let got = results.first().map(|m| m.title.as_str()).unwrap_or("no results");
                    println!("✗ {}: expected {}, got {got}", case.label, case.title);
                }
            }

            if issues == 0 {
                println!("\nAll checks passed ✓");
            } else {
                println!("\n{issues} checks failed");
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

// ─── Helpers ────────────────────────────────────────────────────────────────

async fn identify(
    source: &NdlSource,
    query: &IdentifyQuery,
    timeout: Duration,
) -> Vec<NormalizedMetadata> {
    let sink: Mutex<Vec<NormalizedMetadata>> = Mutex::new(Vec::new());
    source
        .identify(&sink, &AbortSignal::new(), timeout, query)
        .await;
    sink.into_inner().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn print_json(val: &serde_json::Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(val)?);
    Ok(())
}

fn print_metadata(meta: &NormalizedMetadata) {
    println!("Title:       {}", meta.title);
    println!("Authors:     {}", meta.authors.join(" & "));
    println!("Publisher:   {}", meta.publisher);
    if let Some(date) = &meta.pubdate {
        println!("Published:   {date}");
    }
    if !meta.tags.is_empty() {
        println!("Tags:        {}", meta.tags.join(", "));
    }
    for (kind, value) in &meta.identifiers {
        println!("{:<12} {value}", format!("{kind}:"));
    }
    if !meta.comments.is_empty() {
        println!("Comments:    {}", meta.comments);
    }
}

fn config_key_values(config: &PluginConfig) -> BTreeMap<&'static str, String> {
    let mut map = BTreeMap::new();
    map.insert("config_path", PluginConfig::config_path().to_string_lossy().to_string());
    map.insert("max_results", config.max_results.to_string());
    map.insert("filename_shortcut", config.filename_shortcut.to_string());
    map.insert("clean_authorname", config.clean_authorname.to_string());
    map.insert("base_url", config.base_url.clone());
    map.insert("timeout_secs", config.timeout_secs.to_string());
    map
}

struct SmokeCase {
    label: &'static str,
    query: IdentifyQuery,
    title: &'static str,
    authors: Vec<String>,
}

fn smoke_cases() -> Vec<SmokeCase> {
    vec![
        SmokeCase {
            label: "ISBN 9784121027504",
            query: IdentifyQuery {
                identifiers: BTreeMap::from([("isbn".to_string(), "9784121027504".to_string())]),
                ..IdentifyQuery::default()
            },
            title: "幕府海軍 : ペリー来航から五稜郭まで",
            authors: vec!["金澤裕之".to_string()],
        },
        SmokeCase {
            label: "NDLBibID in title",
            query: IdentifyQuery {
                title: Some("近世後期の海防と社会変容[033336476]".to_string()),
                ..IdentifyQuery::default()
            },
            title: "近世後期の海防と社会変容",
            authors: vec!["清水詩織".to_string()],
        },
    ]
}
