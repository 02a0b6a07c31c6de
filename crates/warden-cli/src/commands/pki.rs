use anyhow::Context;
use serde_json::json;
use warden_config::WardenConfig;
use warden_pki::{PkeSecreter, PkiSettings};

use crate::cli::PkiCommands;
use crate::context;
use crate::output::output;

pub async fn handle(action: &PkiCommands, config: &WardenConfig) -> anyhow::Result<()> {
    config.pki.validate().context("invalid [pki] configuration")?;
    let secreter = PkeSecreter::new(
        context::secret_backend(config)?,
        PkiSettings::from_config(&config.pki),
    );

    match action {
        PkiCommands::Generate(args) => {
            let secret = secreter
                .generate_pke_secret(args.org, &args.tags)
                .await
                .context("failed to generate cluster PKI")?;
            output(&secret)
        }
        PkiCommands::Delete(args) => {
            secreter
                .delete_pke_secret(args.org, &args.tags)
                .await
                .context("failed to delete cluster PKI")?;
            output(&json!({ "deleted": true }))
        }
    }
}
