use clap::{Args, Subcommand};

/// Token commands.
#[derive(Clone, Debug, Subcommand)]
pub enum TokenCommands {
    /// Issue a user token.
    Issue(TokenIssueArgs),
    /// List stored tokens of a subject.
    List(TokenListArgs),
    /// Revoke one token.
    Revoke(TokenRevokeArgs),
    /// Get or create the token of a cluster.
    Cluster(TokenClusterArgs),
    /// Drop expired token records.
    Gc,
}

#[derive(Clone, Debug, Args)]
pub struct TokenIssueArgs {
    /// Subject the token is issued to.
    #[arg(long)]
    pub subject: String,
    /// Display name of the token.
    #[arg(long)]
    pub name: Option<String>,
    /// Lifetime in hours; omit for a token that never expires.
    #[arg(long)]
    pub ttl_hours: Option<u32>,
    /// Free-form text carried in the token.
    #[arg(long)]
    pub text: Option<String>,
}

#[derive(Clone, Debug, Args)]
pub struct TokenListArgs {
    #[arg(long)]
    pub subject: String,
}

#[derive(Clone, Debug, Args)]
pub struct TokenRevokeArgs {
    #[arg(long)]
    pub subject: String,
    /// Token identifier (`jti`).
    #[arg(long)]
    pub id: String,
}

#[derive(Clone, Debug, Args)]
pub struct TokenClusterArgs {
    /// Organization identifier.
    #[arg(long)]
    pub org: u64,
    /// Cluster identifier.
    #[arg(long)]
    pub cluster: String,
}

/// PKI commands.
#[derive(Clone, Debug, Subcommand)]
pub enum PkiCommands {
    /// Issue the CA hierarchy and keys of a cluster.
    Generate(PkiArgs),
    /// Remove every PKI mount of a cluster.
    Delete(PkiArgs),
}

#[derive(Clone, Debug, Args)]
pub struct PkiArgs {
    /// Organization identifier.
    #[arg(long)]
    pub org: u64,
    /// Secret tag; one must be `clusterID:<id>`.
    #[arg(long = "tag", required = true)]
    pub tags: Vec<String>,
}

/// Role binding commands.
#[derive(Clone, Debug, Subcommand)]
pub enum RoleCommands {
    /// Resolve the role the configured bindings give a set of groups.
    Bind(RoleBindArgs),
}

#[derive(Clone, Debug, Args)]
pub struct RoleBindArgs {
    /// Upstream group names.
    #[arg(required = true)]
    pub groups: Vec<String>,
}
