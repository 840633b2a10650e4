use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "embygram")]
#[command(author, version, about = "Emby to Telegram notification bridge")]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the webhook server
    Serve {
        /// Host to bind to (overrides HOST)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (overrides PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Check the resolved configuration and exit
    Validate,

    /// Display version information
    Version,
}
