//! Per-role permission decisions for organization-scoped requests.
//!
//! Two interchangeable engines:
//! - [`StaticPolicy`]: the built-in decision table
//! - [`RulePolicy`]: a declarative rule matrix with `*` wildcards, hot-swappable
//!   and optionally refreshed from a [`PolicyRuleSource`]
//!
//! [`RulePolicy::defaults`] encodes the same decisions as [`StaticPolicy`]:
//! both compare non-empty path segments.

use std::str::FromStr;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use warden_config::{PolicyKind, PolicyRuleConfig, RbacConfig};
use warden_core::Role;

use crate::error::RbacError;

pub trait PolicyEngine: Send + Sync {
    /// Whether `role` may perform `method` on `path`.
    fn permits(&self, role: Role, path: &str, method: &str) -> bool;
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|segment| !segment.is_empty())
}

fn is_cluster_collection(path: &str) -> bool {
    let parts: Vec<&str> = segments(path).collect();
    matches!(parts.as_slice(), [.., "orgs", _, "clusters"])
}

// ---------------------------------------------------------------------------
// Static table
// ---------------------------------------------------------------------------

/// Admins may do anything. Members may not create clusters or touch secrets.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticPolicy;

impl PolicyEngine for StaticPolicy {
    fn permits(&self, role: Role, path: &str, method: &str) -> bool {
        match role {
            Role::Admin => true,
            Role::Member => {
                if method.eq_ignore_ascii_case("POST") && is_cluster_collection(path) {
                    return false;
                }
                !segments(path).any(|segment| segment == "secrets")
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Rule matrix
// ---------------------------------------------------------------------------

/// Match a request path against a rule object, segment by segment.
///
/// A lone `*` matches any path. Otherwise `**` spans zero or more whole
/// segments and `*` inside a segment matches any run of characters within
/// that segment. Empty segments are ignored on both sides, so leading and
/// trailing slashes do not matter.
#[must_use]
pub fn wildcard_match(pattern: &str, path: &str) -> bool {
    if pattern == "*" {
        return true;
    }
    let pattern: Vec<&str> = segments(pattern).collect();
    let path: Vec<&str> = segments(path).collect();
    match_segments(&pattern, &path)
}

fn match_segments(pattern: &[&str], path: &[&str]) -> bool {
    match pattern.split_first() {
        None => path.is_empty(),
        Some((&"**", rest)) => (0..=path.len()).any(|skip| match_segments(rest, &path[skip..])),
        Some((glob, rest)) => path
            .split_first()
            .is_some_and(|(segment, tail)| match_glob(glob, segment) && match_segments(rest, tail)),
    }
}

fn match_glob(glob: &str, segment: &str) -> bool {
    let Some((literal, rest)) = glob.split_once('*') else {
        return glob == segment;
    };
    let Some(remaining) = segment.strip_prefix(literal) else {
        return false;
    };
    remaining
        .char_indices()
        .map(|(offset, _)| offset)
        .chain(std::iter::once(remaining.len()))
        .any(|offset| match_glob(rest, &remaining[offset..]))
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Effect {
    #[default]
    Allow,
    Deny,
}

impl FromStr for Effect {
    type Err = RbacError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "allow" => Ok(Self::Allow),
            "deny" => Ok(Self::Deny),
            other => Err(RbacError::InvalidRule(format!("unknown effect '{other}'"))),
        }
    }
}

/// `subject` role may (or may not) perform `action` on paths matching `object`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyRule {
    pub subject: Role,
    pub object: String,
    /// HTTP method, or `*` for any.
    pub action: String,
    pub effect: Effect,
}

impl PolicyRule {
    #[must_use]
    pub fn allow(subject: Role, object: &str, action: &str) -> Self {
        Self {
            subject,
            object: object.to_string(),
            action: action.to_string(),
            effect: Effect::Allow,
        }
    }

    #[must_use]
    pub fn deny(subject: Role, object: &str, action: &str) -> Self {
        Self {
            effect: Effect::Deny,
            ..Self::allow(subject, object, action)
        }
    }

    /// # Errors
    ///
    /// Returns `RbacError::UnknownRole` or `RbacError::InvalidRule`.
    pub fn from_config(rule: &PolicyRuleConfig) -> Result<Self, RbacError> {
        let subject = rule
            .subject
            .parse()
            .map_err(|_| RbacError::UnknownRole(rule.subject.clone()))?;
        let effect = rule.effect.as_deref().map_or(Ok(Effect::Allow), str::parse)?;
        Ok(Self {
            subject,
            object: rule.object.clone(),
            action: rule.action.clone(),
            effect,
        })
    }

    fn matches(&self, role: Role, path: &str, method: &str) -> bool {
        self.subject == role
            && (self.action == "*" || self.action.eq_ignore_ascii_case(method))
            && wildcard_match(&self.object, path)
    }
}

/// Source the rule matrix is periodically reloaded from.
#[async_trait]
pub trait PolicyRuleSource: Send + Sync {
    async fn load_rules(&self) -> Result<Vec<PolicyRule>, RbacError>;
}

/// Declarative rules; deny overrides allow, no matching allow means deny.
#[derive(Debug, Default)]
pub struct RulePolicy {
    rules: RwLock<Vec<PolicyRule>>,
}

impl RulePolicy {
    #[must_use]
    pub fn new(rules: Vec<PolicyRule>) -> Self {
        Self {
            rules: RwLock::new(rules),
        }
    }

    /// Rules equivalent to [`StaticPolicy`].
    #[must_use]
    pub fn defaults() -> Self {
        Self::new(default_rules())
    }

    /// # Errors
    ///
    /// Returns the first rule that fails to convert.
    pub fn from_config(rules: &[PolicyRuleConfig]) -> Result<Self, RbacError> {
        let rules = rules
            .iter()
            .map(PolicyRule::from_config)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(rules))
    }

    /// Atomically replace the rule set.
    pub fn replace_rules(&self, rules: Vec<PolicyRule>) {
        *self.rules.write().unwrap_or_else(PoisonError::into_inner) = rules;
    }

    #[must_use]
    pub fn rules(&self) -> Vec<PolicyRule> {
        self.rules
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Reload the rules from `source` every `every`, keeping the previous
    /// rules when a load fails.
    ///
    /// Decisions between reloads may use a stale rule set.
    pub fn spawn_refresh(
        self: &Arc<Self>,
        source: Arc<dyn PolicyRuleSource>,
        every: Duration,
    ) -> tokio::task::JoinHandle<()> {
        let policy = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            loop {
                interval.tick().await;
                match source.load_rules().await {
                    Ok(rules) => {
                        tracing::debug!(rules = rules.len(), "refreshed policy rules");
                        policy.replace_rules(rules);
                    }
                    Err(error) => {
                        tracing::warn!(%error, "policy refresh failed; keeping previous rules");
                    }
                }
            }
        })
    }
}

impl PolicyEngine for RulePolicy {
    fn permits(&self, role: Role, path: &str, method: &str) -> bool {
        let rules = self.rules.read().unwrap_or_else(PoisonError::into_inner);
        let mut allowed = false;
        for rule in rules.iter().filter(|r| r.matches(role, path, method)) {
            match rule.effect {
                Effect::Deny => return false,
                Effect::Allow => allowed = true,
            }
        }
        allowed
    }
}

fn default_rules() -> Vec<PolicyRule> {
    vec![
        PolicyRule::allow(Role::Admin, "*", "*"),
        PolicyRule::allow(Role::Member, "*", "*"),
        PolicyRule::deny(Role::Member, "**/orgs/*/clusters", "POST"),
        PolicyRule::deny(Role::Member, "**/secrets/**", "*"),
    ]
}

/// Build the engine selected by `rbac.policy`.
///
/// With the `rules` engine and a `source`, the rules are reloaded every
/// `rbac.policy_refresh_secs` on a background task, which must be started
/// inside a Tokio runtime. The static table ignores `source`.
///
/// # Errors
///
/// Returns an error if a configured rule is invalid.
pub fn policy_from_config(
    config: &RbacConfig,
    source: Option<Arc<dyn PolicyRuleSource>>,
) -> Result<Arc<dyn PolicyEngine>, RbacError> {
    if config.policy == PolicyKind::Static {
        if source.is_some() {
            tracing::warn!("static policy selected; ignoring policy rule source");
        }
        return Ok(Arc::new(StaticPolicy));
    }

    let policy = Arc::new(if config.rules.is_empty() {
        RulePolicy::defaults()
    } else {
        RulePolicy::from_config(&config.rules)?
    });
    if let Some(source) = source {
        let every = Duration::from_secs(config.policy_refresh_secs);
        tracing::info!(every_secs = config.policy_refresh_secs, "starting policy refresh");
        // Detached: the task lives as long as the runtime.
        drop(policy.spawn_refresh(source, every));
    }
    Ok(policy)
}
