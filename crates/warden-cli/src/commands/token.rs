use anyhow::Context;
use chrono::{Duration, Utc};
use serde_json::json;
use warden_auth::{StoredToken, TokenManager, TokenRequest};
use warden_config::WardenConfig;

use crate::cli::TokenCommands;
use crate::context;
use crate::output::output;

pub async fn handle(action: &TokenCommands, config: &WardenConfig) -> anyhow::Result<()> {
    let manager = manager(config)?;

    match action {
        TokenCommands::Issue(args) => {
            let mut request = TokenRequest::new(&args.subject);
            if let Some(name) = &args.name {
                request = request.named(name);
            }
            if let Some(hours) = args.ttl_hours {
                request = request.expiring_at(Utc::now() + Duration::hours(i64::from(hours)));
            }
            if let Some(text) = &args.text {
                request = request.with_text(text);
            }
            let issued = manager.issue(request).await?;
            output(&issued)
        }
        TokenCommands::List(args) => {
            let tokens: Vec<StoredToken> = manager
                .list(&args.subject)
                .await?
                .into_iter()
                .map(|token| StoredToken {
                    value: None,
                    ..token
                })
                .collect();
            output(&tokens)
        }
        TokenCommands::Revoke(args) => {
            manager.revoke(&args.subject, &args.id).await?;
            output(&json!({ "revoked": args.id }))
        }
        TokenCommands::Cluster(args) => {
            let (id, token) = manager
                .cluster_tokens()
                .generate_cluster_token(args.org, &args.cluster)
                .await?;
            output(&json!({ "id": id, "token": token }))
        }
        TokenCommands::Gc => {
            let removed = manager.gc().await?;
            output(&json!({ "removed": removed }))
        }
    }
}

fn manager(config: &WardenConfig) -> anyhow::Result<TokenManager> {
    config
        .auth
        .validate()
        .context("invalid [auth] configuration")?;
    let backend = context::secret_backend(config)?;
    Ok(warden_auth::manager_from_config(&config.auth, backend)?)
}
