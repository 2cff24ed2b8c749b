//! CLI interface for travel-agent

use anyhow::Context;
use clap::Parser;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tracing::{debug, error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use travel_agent::config::{
    default_amadeus_base_url, default_eventbrite_base_url, default_llm_base_url, default_llm_model,
    default_max_results, default_nominatim_base_url, default_overpass_url, default_radius_m,
    default_timeout_secs,
};
use travel_agent::{Settings, TravelPlanner};

#[derive(Parser)]
#[command(name = "travel-agent")]
#[command(about = "Plan a trip from a single sentence")]
#[command(version)]
pub struct Cli {
    /// Travel request; read from stdin when omitted
    #[arg(short, long)]
    pub request: Option<String>,

    /// API key for the language model endpoint
    #[arg(long, env = "LLM_API_KEY", hide_env_values = true)]
    pub llm_api_key: Option<String>,
    /// OpenAI-compatible chat completions base URL
    #[arg(long, env = "LLM_BASE_URL", default_value_t = default_llm_base_url())]
    pub llm_base_url: String,
    /// Model identifier
    #[arg(long, env = "TRAVEL_AGENT_MODEL", default_value_t = default_llm_model())]
    pub model: String,

    #[arg(long, env = "AMADEUS_API_KEY", hide_env_values = true)]
    pub amadeus_api_key: Option<String>,
    #[arg(long, env = "AMADEUS_API_SECRET", hide_env_values = true)]
    pub amadeus_api_secret: Option<String>,
    #[arg(long, env = "AMADEUS_BASE_URL", default_value_t = default_amadeus_base_url())]
    pub amadeus_base_url: String,

    /// Events are skipped when no token is given
    #[arg(long, env = "EVENTBRITE_TOKEN", hide_env_values = true)]
    pub eventbrite_token: Option<String>,
    #[arg(long, env = "EVENTBRITE_BASE_URL", default_value_t = default_eventbrite_base_url())]
    pub eventbrite_base_url: String,

    #[arg(long, env = "OVERPASS_BASE_URL", default_value_t = default_overpass_url())]
    pub overpass_url: String,
    #[arg(long, env = "NOMINATIM_BASE_URL", default_value_t = default_nominatim_base_url())]
    pub nominatim_base_url: String,

    /// Results kept per search
    #[arg(long, default_value_t = default_max_results())]
    pub max_results: usize,
    /// Restaurant search radius in meters
    #[arg(long, default_value_t = default_radius_m())]
    pub radius_m: u32,
    /// Per-request HTTP timeout in seconds
    #[arg(long, default_value_t = default_timeout_secs())]
    pub timeout_secs: u64,

    /// Log level used when RUST_LOG is unset
    #[arg(long, default_value = "warn")]
    pub log_level: String,
    /// Log to stderr as JSON
    #[arg(long)]
    pub log_json: bool,
    /// Also write JSON logs to a daily rolling file in this directory
    #[arg(long)]
    pub log_dir: Option<PathBuf>,
}

impl Cli {
    pub fn settings(&self) -> Settings {
        let mut settings = Settings::new(
            self.llm_api_key.clone().unwrap_or_default(),
            self.amadeus_api_key.clone().unwrap_or_default(),
            self.amadeus_api_secret.clone().unwrap_or_default(),
            self.eventbrite_token.clone(),
        );
        settings.llm.base_url = self.llm_base_url.clone();
        settings.llm.model = self.model.clone();
        settings.amadeus.base_url = self.amadeus_base_url.clone();
        settings.eventbrite.base_url = self.eventbrite_base_url.clone();
        settings.overpass.url = self.overpass_url.clone();
        settings.nominatim.base_url = self.nominatim_base_url.clone();
        settings.search.max_results = self.max_results;
        settings.search.radius_m = self.radius_m;
        settings.search.timeout_secs = self.timeout_secs;
        settings
    }
}

fn init_logging(cli: &Cli) -> anyhow::Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&cli.log_level)
            .with_context(|| format!("invalid log level '{}'", cli.log_level))?,
    };

    let stderr_json = cli.log_json.then(|| {
        tracing_subscriber::fmt::layer()
            .with_writer(io::stderr)
            .with_target(true)
            .json()
    });
    let stderr_text = (!cli.log_json).then(|| {
        tracing_subscriber::fmt::layer()
            .with_writer(io::stderr)
            .with_target(false)
    });

    let file_layer = match &cli.log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("cannot create log directory {}", dir.display()))?;
            let file_appender = tracing_appender::rolling::daily(dir, "travel-agent.log");
            Some(
                tracing_subscriber::fmt::layer()
                    .with_writer(file_appender)
                    .with_ansi(false)
                    .with_target(true)
                    .with_file(true)
                    .with_line_number(true)
                    .json(),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_json)
        .with(stderr_text)
        .with(file_layer)
        .try_init()
        .context("failed to install the log subscriber")?;

    debug!(log_dir = ?cli.log_dir, json = cli.log_json, "Logging initialized");
    Ok(())
}

fn read_request() -> io::Result<String> {
    print!("Enter your travel request: ");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();
    init_logging(&cli)?;

    let settings = cli.settings();
    debug!(?settings, "Loaded settings");

    let planner = match TravelPlanner::from_settings(&settings) {
        Ok(planner) => planner,
        Err(e) => {
            error!(error = %e, "Failed to start");
            eprintln!("{}", e.user_message());
            std::process::exit(1);
        }
    };

    let request = match cli.request.clone() {
        Some(request) => request,
        None => read_request().context("failed to read the travel request")?,
    };

    let today = chrono::Local::now().date_naive();
    info!(%today, "Planning trip");

    match planner.plan(&request, today).await {
        Ok(plan) => {
            println!("\n--- Your Itinerary ---\n");
            println!("{}", plan.itinerary);
        }
        Err(e) => {
            error!(error = %e, "Trip planning failed");
            eprintln!("{}", e.user_message());
            std::process::exit(1);
        }
    }

    Ok(())
}
