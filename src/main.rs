use anyhow::{Context, Result};
use clap::Parser;

use soplink::cli::{Cli, Commands};
use soplink::config::StaticConfig;
use soplink::runtime::modes::run_server;
use soplink::system::init_logging;

#[actix_web::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    match cli.command.clone().unwrap_or(Commands::Serve) {
        Commands::ConfigGen { output } => {
            let sample = StaticConfig::generate_sample_config();
            match output {
                Some(path) => {
                    std::fs::write(&path, sample)
                        .with_context(|| format!("Failed to write {}", path))?;
                    println!("Sample configuration written to {}", path);
                }
                None => print!("{}", sample),
            }
            Ok(())
        }
        Commands::Serve => {
            let config = StaticConfig::load(&cli.config)
                .with_context(|| format!("Failed to load configuration from {}", cli.config))?;

            // guard 必须存活到进程结束，否则日志会丢失
            let _guard = init_logging(&config.logging);
            run_server(config).await
        }
    }
}
