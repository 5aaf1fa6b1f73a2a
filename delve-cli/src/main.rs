//! Delve CLI - Command-line interface for Delve
//!
//! Runs grounded web research, single- and dual-model chat from the terminal

use clap::{Parser, Subcommand};
use delve_core::{
    config_error, init_logging, log_operation_error, log_operation_start, log_operation_success,
    ConfigOverrides, DelveConfig, DelveError, DelveResult, ErrorContext, LoggingConfig, Message,
    Provider,
};
use delve_research::{DualModelChat, ResearchEngine, SingleModelChat};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "delve")]
#[command(about = "Web research and dual-model chat with Gemini and SiliconFlow")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Research a question on the web and print a cited answer
    Research {
        /// Question to research
        question: String,

        /// Number of search queries generated up front
        #[arg(short, long)]
        queries: Option<usize>,

        /// Maximum number of reflection loops
        #[arg(short, long)]
        loops: Option<usize>,

        /// Provider for every stage (gemini or siliconflow)
        #[arg(short, long)]
        provider: Option<String>,

        /// Model used for reflection and the final answer
        #[arg(long)]
        reasoning_model: Option<String>,

        /// Print the outcome as JSON
        #[arg(long)]
        json: bool,
    },

    /// Ask the configured chat model
    Chat {
        /// Message to send
        message: String,

        /// Chat provider (gemini or siliconflow)
        #[arg(short, long)]
        provider: Option<String>,

        /// Chat model name
        #[arg(short, long)]
        model: Option<String>,
    },

    /// Ask Gemini and SiliconFlow together and merge their answers
    Dual {
        /// Message to send
        message: String,

        /// Print the outcome as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the model resolved for every stage
    Models,

    /// Configuration management
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,

        /// Initialize configuration file
        #[arg(long)]
        init: bool,

        /// Validate current configuration
        #[arg(long)]
        validate: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    dotenvy::dotenv().ok();

    let mut logging_config = LoggingConfig {
        level: "warn".to_string(),
        ..LoggingConfig::default()
    };
    if cli.verbose {
        logging_config.level = "debug".to_string();
    }

    init_logging(&logging_config)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    info!("Starting Delve CLI v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config(cli.config.as_ref())?;

    match cli.command {
        Commands::Research {
            question,
            queries,
            loops,
            provider,
            reasoning_model,
            json,
        } => {
            let overrides = ConfigOverrides {
                model_provider: parse_provider(provider.as_deref())?,
                initial_search_query_count: queries,
                max_research_loops: loops,
                reasoning_model,
                ..Default::default()
            };
            handle_research(question, overrides, json, config).await?;
        }
        Commands::Chat {
            message,
            provider,
            model,
        } => {
            let overrides = ConfigOverrides {
                chat_provider: parse_provider(provider.as_deref())?,
                chat_model: model,
                ..Default::default()
            };
            handle_chat(message, overrides, config).await?;
        }
        Commands::Dual { message, json } => {
            handle_dual(message, json, config).await?;
        }
        Commands::Models => {
            handle_models(&config);
        }
        Commands::Config {
            show,
            init,
            validate,
        } => {
            handle_config(show, init, validate, cli.config.as_ref())?;
        }
    }

    Ok(())
}

fn parse_provider(value: Option<&str>) -> DelveResult<Option<Provider>> {
    value.map(str::parse::<Provider>).transpose()
}

/// Load configuration from a file, then fill API keys from the environment
///
/// Without an explicit path the usual locations are tried before falling
/// back to the environment alone.
fn load_config(config_path: Option<&PathBuf>) -> DelveResult<DelveConfig> {
    if let Some(path) = config_path {
        info!("Loading configuration from {:?}", path);
        return Ok(DelveConfig::from_file(path)?.with_env_keys());
    }

    for path in default_config_paths().into_iter().flatten() {
        if path.exists() {
            info!("Loading configuration from {:?}", path);
            return Ok(DelveConfig::from_file(&path)?.with_env_keys());
        }
    }

    info!("No configuration file found, using environment");
    DelveConfig::from_env()
}

fn default_config_paths() -> [Option<PathBuf>; 3] {
    [
        dirs::config_dir().map(|d| d.join("delve").join("config.toml")),
        dirs::home_dir().map(|d| d.join(".delve").join("config.toml")),
        Some(PathBuf::from("delve.toml")),
    ]
}

async fn handle_research(
    question: String,
    overrides: ConfigOverrides,
    json: bool,
    config: DelveConfig,
) -> anyhow::Result<()> {
    log_operation_start!("research", question = %question);

    let engine = ResearchEngine::new(config);
    let outcome = engine.run(vec![Message::user(question)], &overrides).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        println!("{}", outcome.answer);
        if !outcome.sources.is_empty() {
            println!("\nSources:");
            for source in &outcome.sources {
                println!("  - {}: {}", source.label, source.value);
            }
        }
        println!(
            "\n{} queries over {} loop(s)",
            outcome.search_queries.len(),
            outcome.research_loop_count
        );
    }

    match outcome.error_message {
        Some(message) if !outcome.success => {
            log_operation_error!("research", message);
            anyhow::bail!(message)
        }
        _ => {
            log_operation_success!("research", sources = outcome.sources.len());
            Ok(())
        }
    }
}

async fn handle_chat(
    message: String,
    overrides: ConfigOverrides,
    config: DelveConfig,
) -> anyhow::Result<()> {
    log_operation_start!("chat");

    let chat = SingleModelChat::new(config);
    let reply = chat.chat(&message, &[], &overrides).await;

    println!("{}", reply.response);
    if reply.success {
        log_operation_success!("chat", provider = %reply.provider, model = %reply.model);
        Ok(())
    } else {
        let message = reply.error_message.unwrap_or_default();
        log_operation_error!("chat", message);
        anyhow::bail!(message)
    }
}

async fn handle_dual(message: String, json: bool, config: DelveConfig) -> anyhow::Result<()> {
    log_operation_start!("dual_model_chat");

    let chat = DualModelChat::new(config);
    let outcome = chat.chat(&message, &[]).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        println!("{}", outcome.transcript());
    }

    if outcome.success {
        log_operation_success!("dual_model_chat");
        Ok(())
    } else {
        let message = outcome.error_message.unwrap_or_default();
        log_operation_error!("dual_model_chat", message);
        anyhow::bail!(message)
    }
}

fn handle_models(config: &DelveConfig) {
    println!("{:<16} {:<12} {:<32} key", "stage", "provider", "model");
    for info in config.all_model_info() {
        println!(
            "{:<16} {:<12} {:<32} {}",
            info.stage,
            info.provider,
            info.model_name,
            if info.api_key_set { "set" } else { "missing" }
        );
    }

    let missing = config.missing_keys();
    if !missing.is_empty() {
        println!("\nMissing: {}", missing.join(", "));
    }
}

fn handle_config(
    show: bool,
    init: bool,
    validate: bool,
    config_path: Option<&PathBuf>,
) -> DelveResult<()> {
    if init {
        let config_dir = dirs::config_dir()
            .or_else(|| dirs::home_dir().map(|d| d.join(".config")))
            .ok_or_else(|| config_error!("No configuration directory available", "cli"))?
            .join("delve");

        std::fs::create_dir_all(&config_dir)?;
        let config_path = config_dir.join("config.toml");

        DelveConfig::default().save_to_file(&config_path)?;
        println!("Configuration initialized at: {:?}", config_path);
        println!("API keys are read from GEMINI_API_KEY and SILICONFLOW_API_KEY.");
    }

    if show {
        let mut config = load_config(config_path)?;
        config.api.gemini_api_key = config.api.gemini_api_key.map(|_| "<set>".to_string());
        config.api.siliconflow_api_key =
            config.api.siliconflow_api_key.map(|_| "<set>".to_string());
        let rendered = toml::to_string_pretty(&config).map_err(|e| DelveError::Config {
            message: format!("Failed to serialize config: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("cli").with_operation("show_config"),
        })?;
        println!("{}", rendered);
    }

    if validate {
        let config = load_config(config_path)?;
        match config.validate().and_then(|_| config.validate_keys()) {
            Ok(()) => println!("Configuration is valid"),
            Err(e) => {
                println!("Configuration validation failed: {}", e);
                return Err(e);
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_research_args() {
        let cli = Cli::parse_from([
            "delve",
            "research",
            "why is the sky blue",
            "--queries",
            "3",
            "--loops",
            "1",
            "--reasoning-model",
            "gemini-2.5-pro",
        ]);
        match cli.command {
            Commands::Research {
                question,
                queries,
                loops,
                reasoning_model,
                json,
                ..
            } => {
                assert_eq!(question, "why is the sky blue");
                assert_eq!(queries, Some(3));
                assert_eq!(loops, Some(1));
                assert_eq!(reasoning_model.as_deref(), Some("gemini-2.5-pro"));
                assert!(!json);
            }
            _ => panic!("expected research command"),
        }
    }

    #[test]
    fn test_global_flags() {
        let cli = Cli::parse_from(["delve", "-v", "--config", "delve.toml", "models"]);
        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("delve.toml")));
        assert!(matches!(cli.command, Commands::Models));
    }

    #[test]
    fn test_parse_provider() {
        assert_eq!(parse_provider(None).unwrap(), None);
        assert_eq!(
            parse_provider(Some("siliconflow")).unwrap(),
            Some(Provider::SiliconFlow)
        );
        assert!(parse_provider(Some("openai")).is_err());
    }

    #[tokio::test]
    async fn test_research_reports_missing_key() {
        let result = handle_research(
            "what is rust".to_string(),
            ConfigOverrides::default(),
            false,
            DelveConfig::default(),
        )
        .await;

        let error = result.unwrap_err().to_string();
        assert!(error.contains("GEMINI_API_KEY"), "{}", error);
    }

    #[test]
    fn test_load_config_from_explicit_file() {
        let dir = std::env::temp_dir().join(format!("delve-cli-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, "[research]\nmax_research_loops = 7\n").unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.research.max_research_loops, 7);

        std::fs::remove_dir_all(&dir).ok();
    }
}
