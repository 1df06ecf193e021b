/// Command-line arguments
use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(name = "marketgate", about = "Credential-injecting proxy and read-through cache for a market-data API")]
pub struct Arguments {
    /// Path to the TOML configuration file
    #[arg(long, default_value = "marketgate.toml")]
    pub config: String,

    /// Override the webserver port from the config file
    #[arg(long)]
    pub port: Option<u16>,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,
}
