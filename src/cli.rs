//! Command-line interface definitions using clap

use clap::{Parser, Subcommand};

use crate::config::DEFAULT_CONFIG_PATH;

/// soplink - click-tracking redirector
#[derive(Parser, Debug)]
#[command(name = "soplink")]
#[command(version)]
#[command(about = "Click-tracking redirector with duplicate suppression", long_about = None)]
pub struct Cli {
    /// Configuration file (TOML), overlaid by SOPLINK__* environment variables
    #[arg(long, short = 'c', global = true, default_value = DEFAULT_CONFIG_PATH)]
    pub config: String,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Start the HTTP server (default)
    Serve,

    /// Print a sample configuration file
    ConfigGen {
        /// Write to this file instead of stdout
        #[arg(long, short = 'o')]
        output: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_to_serve() {
        let cli = Cli::parse_from(["soplink"]);
        assert_eq!(cli.config, DEFAULT_CONFIG_PATH);
        assert_eq!(cli.command, None);
    }

    #[test]
    fn test_config_and_subcommand() {
        let cli = Cli::parse_from(["soplink", "-c", "prod.toml", "serve"]);
        assert_eq!(cli.config, "prod.toml");
        assert_eq!(cli.command, Some(Commands::Serve));

        let cli = Cli::parse_from(["soplink", "config-gen", "-o", "out.toml"]);
        assert_eq!(
            cli.command,
            Some(Commands::ConfigGen {
                output: Some("out.toml".into())
            })
        );
    }

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
