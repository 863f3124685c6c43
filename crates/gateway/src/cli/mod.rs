pub mod chat;
pub mod config;
pub mod run;

use clap::{Parser, Subcommand};

/// LexIntake: conversational intake gateway for law firms.
#[derive(Debug, Parser)]
#[command(name = "lexintake", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start the gateway server (default when no subcommand is given).
    Serve,
    /// Configuration utilities.
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Run a single intake turn and print the reply.
    Run {
        /// The client message to send.
        message: String,
        /// Team (firm) the session belongs to.
        #[arg(long)]
        team: String,
        /// Session id (defaults to "cli:run").
        #[arg(long, default_value = "cli:run")]
        session: String,
        /// Attach an uploaded file by URL. Repeatable.
        #[arg(long = "attach", value_name = "URL")]
        attachments: Vec<String>,
        /// Output the full turn result as JSON instead of plain text.
        #[arg(long)]
        json: bool,
    },
    /// Interactive intake conversation in the terminal.
    Chat {
        /// Team (firm) the session belongs to.
        #[arg(long)]
        team: String,
        /// Session id (defaults to "cli:chat").
        #[arg(long, default_value = "cli:chat")]
        session: String,
    },
    /// Print version information.
    Version,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Parse the config file and report any errors.
    Validate,
    /// Dump the resolved configuration (with defaults) as TOML.
    Show,
}

// ── Config loading helper ─────────────────────────────────────────────

/// Load the configuration from the path specified by `LI_CONFIG` (or
/// `config.toml` by default). Returns the parsed [`Config`] and the
/// path that was used.
///
/// [`Config`]: li_domain::config::Config
pub fn load_config() -> anyhow::Result<(li_domain::config::Config, String)> {
    let config_path = std::env::var("LI_CONFIG").unwrap_or_else(|_| "config.toml".into());

    let config = if std::path::Path::new(&config_path).exists() {
        let raw = std::fs::read_to_string(&config_path)
            .map_err(|e| anyhow::anyhow!("reading {config_path}: {e}"))?;
        toml::from_str(&raw).map_err(|e| anyhow::anyhow!("parsing {config_path}: {e}"))?
    } else {
        li_domain::config::Config::default()
    };

    Ok((config, config_path))
}
