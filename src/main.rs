//! caregate - Model routing and cost governance for care agents
//!
//! Serves the model router over HTTP, and inspects routing configuration
//! from the command line.

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use caregate::api::run_server;
use caregate::config::{Config, ConfigError, KeySource};
use caregate::router::{Route, RouteContext, RouteSelector};

#[derive(Parser)]
#[command(name = "caregate")]
#[command(about = "Model routing and cost governance for aging-in-place care agents")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Path to configuration file
        #[arg(short, long, default_value = "config.toml")]
        config: String,

        /// Override listen address
        #[arg(short, long)]
        listen: Option<String>,
    },

    /// Validate configuration file
    Check {
        /// Path to configuration file
        #[arg(short, long, default_value = "config.toml")]
        config: String,
    },

    /// Show the route table, or the route a topic resolves to
    Routes {
        /// Path to configuration file
        #[arg(short, long, default_value = "config.toml")]
        config: String,

        /// Resolve a single topic instead of listing every rule
        #[arg(short, long)]
        topic: Option<String>,

        /// Treat the topic as an emergency request
        #[arg(long)]
        emergency: bool,
    },
}

impl Commands {
    fn config_path(&self) -> &str {
        match self {
            Commands::Serve { config, .. }
            | Commands::Check { config }
            | Commands::Routes { config, .. } => config,
        }
    }
}

/// Install the global subscriber. `RUST_LOG` wins over the configured level.
fn init_tracing(level: Option<&str>) {
    let default_filter = match level {
        Some(level) => format!("caregate={level},tower_http={level}"),
        None => "caregate=info,tower_http=info".to_string(),
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn log_key_sources(key_sources: &[(String, KeySource)]) {
    for (provider, source) in key_sources {
        match source {
            KeySource::None => {
                tracing::warn!(provider = %provider, "No API key resolved for provider")
            }
            _ => tracing::info!(provider = %provider, source = %source, "Resolved API key"),
        }
    }
}

fn format_temperature(temperature: Option<f32>) -> String {
    temperature
        .map(|t| format!("{:.2}", t))
        .unwrap_or_else(|| "caller".to_string())
}

fn print_route(route: &Route) {
    println!(
        "  {:<24} {:<12} {:<32} temp={:<7} {}",
        route.name,
        route.provider,
        route.model,
        format_temperature(route.temperature),
        route.strategy
    );
    for candidate in &route.candidates {
        println!(
            "    -> {}/{} temp={}",
            candidate.provider,
            candidate.model,
            format_temperature(candidate.temperature)
        );
    }
}

fn print_routes(
    config: &Config,
    topic: Option<String>,
    emergency: bool,
) -> Result<(), ConfigError> {
    let selector = RouteSelector::new(config.routing.rules.clone(), config.llm.clone())?;

    if let Some(topic) = topic {
        let mut context = RouteContext::new(topic);
        context.emergency = emergency;
        println!("Route for '{}':", context.topic);
        print_route(&selector.select(&context));
        return Ok(());
    }

    println!("Rules (first match wins):");
    for rule in selector.rules() {
        println!("  match '{}'", rule.match_pattern);
        print_route(&Route::from_rule(rule, selector.defaults()));
    }
    println!("Default:");
    print_route(&Route::system_default(selector.defaults()));
    println!("Emergency override:");
    print_route(&Route::emergency());

    let limits = &config.cost.hard_limits;
    let show = |v: Option<f64>| {
        v.map(|v| format!("${:.2}", v))
            .unwrap_or_else(|| "none".to_string())
    };
    println!(
        "Hard limits: daily={} monthly={} per_tenant={}",
        show(limits.daily),
        show(limits.monthly),
        show(limits.per_tenant)
    );
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let loaded = Config::from_file_with_env(cli.command.config_path());
    init_tracing(
        loaded
            .as_ref()
            .ok()
            .map(|(config, _)| config.logging.level.as_str()),
    );

    match cli.command {
        Commands::Serve { config, listen } => {
            tracing::info!(config = %config, "Loading configuration");
            let (mut config, key_sources) = loaded?;
            log_key_sources(&key_sources);

            if let Some(addr) = listen {
                tracing::info!(listen = %addr, "Override listen address");
                config.server.listen = addr;
            }

            run_server(config).await
        }

        Commands::Check { config: path } => {
            tracing::info!(config = %path, "Checking configuration");
            let (config, key_sources) = loaded?;
            log_key_sources(&key_sources);
            // Compiles every rule pattern.
            RouteSelector::new(config.routing.rules.clone(), config.llm.clone())?;

            println!(
                "Configuration OK: {} provider(s), {} routing rule(s)",
                config.providers.len(),
                config.routing.rules.len()
            );
            Ok(())
        }

        Commands::Routes {
            topic, emergency, ..
        } => {
            let (config, _) = loaded?;
            print_routes(&config, topic, emergency)?;
            Ok(())
        }
    }
}
