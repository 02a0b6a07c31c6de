use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub mod subcommands;

pub use subcommands::{PkiCommands, RoleCommands, TokenCommands};

/// Top-level CLI parser for the `wardenctl` binary.
#[derive(Debug, Parser)]
#[command(
    name = "wardenctl",
    version,
    about = "Warden - tokens, cluster PKI and role bindings"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Quiet mode (errors only)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose mode (debug logging)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Extra configuration file layered over the defaults
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

/// Top-level command tree.
#[derive(Clone, Debug, Subcommand)]
pub enum Commands {
    /// API tokens.
    Token {
        #[command(subcommand)]
        action: TokenCommands,
    },
    /// Cluster PKI secrets.
    Pki {
        #[command(subcommand)]
        action: PkiCommands,
    },
    /// Group-to-role bindings.
    Role {
        #[command(subcommand)]
        action: RoleCommands,
    },
}

#[cfg(test)]
mod tests {
    use clap::{CommandFactory, Parser};
    use pretty_assertions::assert_eq;

    use super::{Cli, Commands, PkiCommands, RoleCommands, TokenCommands};

    #[test]
    fn clap_command_tree_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_parse_before_subcommand() {
        let cli = Cli::try_parse_from([
            "wardenctl",
            "--verbose",
            "--config",
            "/etc/warden.toml",
            "role",
            "bind",
            "admins",
        ])
        .expect("cli should parse");

        assert!(cli.verbose);
        assert_eq!(
            cli.config.as_deref().and_then(|p| p.to_str()),
            Some("/etc/warden.toml")
        );
        let Commands::Role {
            action: RoleCommands::Bind(args),
        } = cli.command
        else {
            panic!("expected role bind");
        };
        assert_eq!(args.groups, vec!["admins"]);
    }

    #[test]
    fn token_issue_parses_optional_fields() {
        let cli = Cli::try_parse_from([
            "wardenctl",
            "token",
            "issue",
            "--subject",
            "alice",
            "--name",
            "ci",
            "--ttl-hours",
            "24",
        ])
        .expect("cli should parse");

        let Commands::Token {
            action: TokenCommands::Issue(args),
        } = cli.command
        else {
            panic!("expected token issue");
        };
        assert_eq!(args.subject, "alice");
        assert_eq!(args.name.as_deref(), Some("ci"));
        assert_eq!(args.ttl_hours, Some(24));
        assert!(args.text.is_none());
    }

    #[test]
    fn pki_generate_collects_repeated_tags() {
        let cli = Cli::try_parse_from([
            "wardenctl",
            "pki",
            "generate",
            "--org",
            "7",
            "--tag",
            "env:prod",
            "--tag",
            "clusterID:c-1",
        ])
        .expect("cli should parse");

        let Commands::Pki {
            action: PkiCommands::Generate(args),
        } = cli.command
        else {
            panic!("expected pki generate");
        };
        assert_eq!(args.org, 7);
        assert_eq!(args.tags, vec!["env:prod", "clusterID:c-1"]);
    }

    #[test]
    fn pki_generate_requires_a_tag() {
        let result = Cli::try_parse_from(["wardenctl", "pki", "generate", "--org", "7"]);
        assert!(result.is_err());
    }

    #[test]
    fn role_bind_requires_a_group() {
        let result = Cli::try_parse_from(["wardenctl", "role", "bind"]);
        assert!(result.is_err());
    }
}
