use anyhow::Context;
use serde_json::json;
use warden_config::WardenConfig;
use warden_rbac::RoleBinder;

use crate::cli::RoleCommands;
use crate::output::output;

pub fn handle(action: &RoleCommands, config: &WardenConfig) -> anyhow::Result<()> {
    match action {
        RoleCommands::Bind(args) => {
            config.rbac.validate().context("invalid [rbac] configuration")?;
            let binder =
                RoleBinder::from_config(&config.rbac).context("invalid [rbac] bindings")?;
            let role = binder.bind_role(&args.groups);
            output(&json!({ "groups": args.groups, "role": role }))
        }
    }
}
