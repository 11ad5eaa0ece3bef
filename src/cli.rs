//! # Command Line Interface
//!
//! Flags override the matching environment variables, see [`crate::config`].

use clap::Parser;

#[derive(Debug, Clone, Default, Parser)]
#[command(name = "tfstate-gateway")]
#[command(about = "Terraform HTTP state backend storing state in HashiCorp Vault")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// Address to bind when no socket is passed in by the service manager
    #[arg(short, long, env = "TFSTATE_LISTEN_ADDR")]
    pub listen_addr: Option<String>,

    /// Vault server address override
    #[arg(long, env = "VAULT_ADDR")]
    pub vault_addr: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}
