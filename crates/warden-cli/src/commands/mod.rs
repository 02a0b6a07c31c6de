use warden_config::WardenConfig;

use crate::cli::Commands;

pub mod pki;
pub mod role;
pub mod token;

/// Dispatch a parsed command to the corresponding handler module.
pub async fn dispatch(command: Commands, config: WardenConfig) -> anyhow::Result<()> {
    match command {
        Commands::Token { action } => token::handle(&action, &config).await,
        Commands::Pki { action } => pki::handle(&action, &config).await,
        Commands::Role { action } => role::handle(&action, &config),
    }
}
