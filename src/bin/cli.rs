//! dashquery CLI
//!
//! Command-line interface for running the query engine offline:
//! - Print the interval plan for a time range
//! - Compile chart/visualization requests into engine request bodies
//! - Reshape a saved engine response into a chart payload
//! - Check API server status

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::io::Read;
use std::path::{Path, PathBuf};

use dashquery::config::{generate_default_config, Config};
use dashquery::query::{build_search_query, create_bar_chart, ChartRequest, VisualizationRequest};
use dashquery::reshape::{reshape_chart, reshape_visualization, SearchResponse};
use dashquery::time::{parse_offset, IntervalPlan};

#[derive(Parser)]
#[command(name = "dashquery")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Dashboard query engine")]
#[command(long_about = "dashquery compiles dashboard chart requests into search-engine aggregations\nand reshapes bucket responses into gap-filled chart series.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (default: standard locations)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// API server URL
    #[arg(long, default_value = "http://localhost:8082", global = true)]
    pub api_url: String,

    /// Output format (table, json)
    #[arg(short, long, default_value = "table", global = true)]
    pub format: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the histogram interval and timeline for a range
    Plan {
        /// Range start, local time (e.g., 2024-01-01T00:00:00Z)
        gte: String,
        /// Range end, local time
        lte: String,
        /// Local UTC offset (default: from config)
        #[arg(long, allow_hyphen_values = true)]
        offset: Option<String>,
    },

    /// Compile a request file into the engine request body
    Compile {
        /// Request JSON file, `-` for stdin
        input: PathBuf,
        /// Input is a bar/breakdown visualization instead of a chart request
        #[arg(long)]
        visualization: bool,
    },

    /// Reshape a saved engine response for a request
    Reshape {
        /// Request JSON file
        request: PathBuf,
        /// Engine response JSON file, `-` for stdin
        response: PathBuf,
        /// Request is a bar/breakdown visualization
        #[arg(long)]
        visualization: bool,
    },

    /// Show API server status
    Status,

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_with_env(path)?,
        None => Config::load_default(),
    };
    let mut ctx = config.query_context()?;

    match cli.command {
        Commands::Plan { gte, lte, offset } => {
            if let Some(offset) = offset {
                ctx.time.utc_offset = parse_offset(&offset)?;
            }

            let plan = IntervalPlan::new(&gte, &lte, &ctx.time)?;
            let labels = plan.labels();

            if cli.format == "json" {
                let out = json!({
                    "band": plan.band(),
                    "interval": plan.interval().to_json(),
                    "label_class": plan.label_class(),
                    "start": plan.normalized_start().to_string(),
                    "end": plan.normalized_end().to_string(),
                    "labels": labels,
                });
                println!("{}", serde_json::to_string_pretty(&out)?);
            } else {
                println!("Band:      {}", plan.band());
                println!("Interval:  {}", Value::Object(plan.interval().to_json()));
                println!("Start:     {}", plan.normalized_start());
                println!("End:       {}", plan.normalized_end());
                println!("Points:    {}", labels.len());
                println!();
                for label in labels {
                    println!("  {}", label);
                }
            }
        }

        Commands::Compile {
            input,
            visualization,
        } => {
            let body = if visualization {
                let viz: VisualizationRequest = read_json(&input)?;
                let compiled = create_bar_chart(&viz, &ctx.time)?;
                json!({"index": viz.index, "shape": compiled.shape, "body": compiled.request.to_value()})
            } else {
                let chart: ChartRequest = read_json(&input)?;
                let request = build_search_query(&chart.to_params(), &ctx)?;
                json!({"index": chart.index, "body": request.to_value()})
            };
            println!("{}", serde_json::to_string_pretty(&body)?);
        }

        Commands::Reshape {
            request,
            response,
            visualization,
        } => {
            let raw: Value = read_json(&response)?;
            let response = SearchResponse::from_value(&raw);

            let payload = if visualization {
                let viz: VisualizationRequest = read_json(&request)?;
                let shape = create_bar_chart(&viz, &ctx.time)?.shape;
                reshape_visualization(&viz, shape, &response)
            } else {
                let chart: ChartRequest = read_json(&request)?;
                let plan = chart.plan(&ctx)?;
                reshape_chart(chart.kind, &response, plan.as_ref())
            };
            println!("{}", serde_json::to_string_pretty(&payload)?);
        }

        Commands::Status => status(&cli.api_url).await?,

        Commands::Config { output } => {
            let content = generate_default_config();
            match output {
                Some(path) => {
                    std::fs::write(&path, content)
                        .with_context(|| format!("writing {}", path.display()))?;
                    println!("Config written to {}", path.display());
                }
                None => print!("{}", content),
            }
        }
    }

    Ok(())
}

/// Read a JSON document from a file or stdin (`-`)
fn read_json<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let text = if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?
    };
    serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

async fn status(api_url: &str) -> anyhow::Result<()> {
    let response = reqwest::Client::new()
        .get(format!("{}/health", api_url))
        .send()
        .await
        .with_context(|| format!("cannot connect to dashquery API at {}", api_url))?;

    if !response.status().is_success() {
        bail!("API returned error: {}", response.status());
    }

    let health: Value = response.json().await?;
    println!("dashquery v{}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("API Status: {}", health["status"].as_str().unwrap_or("unknown"));
    println!("Engine:     {}", health["engine"].as_str().unwrap_or("unknown"));
    if let Some(uptime) = health["uptime_seconds"].as_u64() {
        println!("Uptime:     {}", format_duration(uptime));
    }
    Ok(())
}

fn format_duration(seconds: u64) -> String {
    let days = seconds / 86400;
    let hours = (seconds % 86400) / 3600;
    let minutes = (seconds % 3600) / 60;

    if days > 0 {
        format!("{}d {}h {}m", days, hours, minutes)
    } else if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else {
        format!("{}m {}s", minutes, seconds % 60)
    }
}
