//! Role binding and authorization policy configuration.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use warden_core::Role;

use crate::ConfigError;

const fn default_policy_refresh_secs() -> u64 {
    10
}

/// Which authorization policy backend evaluates member permissions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyKind {
    /// Built-in decision table.
    #[default]
    Static,
    /// Declarative rule matrix (`rbac.rules`).
    Rules,
}

/// One declarative policy rule: `subject` role, `object` path pattern, `action` method.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PolicyRuleConfig {
    pub subject: String,
    pub object: String,
    pub action: String,
    /// `allow` (default) or `deny`.
    #[serde(default)]
    pub effect: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RbacConfig {
    /// Role granted when no binding matches; a match never yields less.
    #[serde(default)]
    pub default_role: Role,

    /// Role name to regular expression matched against upstream group names.
    /// An empty expression never matches.
    #[serde(default)]
    pub bindings: BTreeMap<String, String>,

    #[serde(default)]
    pub policy: PolicyKind,

    /// Rules for the `rules` policy; the built-in rule set is used when empty.
    #[serde(default)]
    pub rules: Vec<PolicyRuleConfig>,

    /// Interval for re-reading policy rules from their source.
    #[serde(default = "default_policy_refresh_secs")]
    pub policy_refresh_secs: u64,
}

impl Default for RbacConfig {
    fn default() -> Self {
        Self {
            default_role: Role::default(),
            bindings: BTreeMap::new(),
            policy: PolicyKind::default(),
            rules: Vec::new(),
            policy_refresh_secs: default_policy_refresh_secs(),
        }
    }
}

impl RbacConfig {
    /// Reject binding keys and rule subjects outside the known role set.
    ///
    /// Pattern compilation is checked when the role binder is built.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for role in self.bindings.keys() {
            role.parse::<Role>().map_err(|e| ConfigError::InvalidValue {
                field: format!("rbac.bindings.{role}"),
                reason: e.to_string(),
            })?;
        }
        for (index, rule) in self.rules.iter().enumerate() {
            rule.subject
                .parse::<Role>()
                .map_err(|e| ConfigError::InvalidValue {
                    field: format!("rbac.rules[{index}].subject"),
                    reason: e.to_string(),
                })?;
            if let Some(effect) = rule.effect.as_deref()
                && !matches!(effect, "allow" | "deny")
            {
                return Err(ConfigError::InvalidValue {
                    field: format!("rbac.rules[{index}].effect"),
                    reason: format!("expected 'allow' or 'deny', got '{effect}'"),
                });
            }
        }
        if self.policy_refresh_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "rbac.policy_refresh_secs".into(),
                reason: "must be greater than zero".into(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_correct() {
        let config = RbacConfig::default();
        assert_eq!(config.default_role, Role::Member);
        assert!(config.bindings.is_empty());
        assert_eq!(config.policy, PolicyKind::Static);
        assert_eq!(config.policy_refresh_secs, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn unknown_binding_role_is_rejected() {
        let config = RbacConfig {
            bindings: BTreeMap::from([("owner".to_string(), ".*".to_string())]),
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("rbac.bindings.owner"));
    }

    #[test]
    fn unknown_rule_effect_is_rejected() {
        let config = RbacConfig {
            rules: vec![PolicyRuleConfig {
                subject: "member".into(),
                object: "*".into(),
                action: "*".into(),
                effect: Some("maybe".into()),
            }],
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
