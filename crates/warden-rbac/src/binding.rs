//! Mapping of upstream group claims to internal roles.

use regex::Regex;
use warden_config::RbacConfig;
use warden_core::Role;

use crate::error::RbacError;

/// Compiled `role → pattern` table. Immutable once built.
#[derive(Debug, Clone)]
pub struct RoleBinder {
    default_role: Role,
    /// `None` for an empty pattern, which matches nothing.
    bindings: Vec<(Role, Option<Regex>)>,
}

impl RoleBinder {
    /// Build a binder from raw `(role name, regex source)` pairs.
    ///
    /// # Errors
    ///
    /// Returns `RbacError::UnknownRole` for a role outside the known set and
    /// `RbacError::InvalidPattern` for a pattern that does not compile.
    pub fn new<I, K, V>(default_role: Role, raw_bindings: I) -> Result<Self, RbacError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut bindings = Vec::new();
        for (name, source) in raw_bindings {
            let name = name.as_ref();
            let role: Role = name
                .parse()
                .map_err(|_| RbacError::UnknownRole(name.to_string()))?;
            let source = source.as_ref();
            let pattern = if source.is_empty() {
                None
            } else {
                Some(
                    Regex::new(source).map_err(|source| RbacError::InvalidPattern {
                        role: name.to_string(),
                        source,
                    })?,
                )
            };
            bindings.push((role, pattern));
        }
        Ok(Self {
            default_role,
            bindings,
        })
    }

    /// A binder whose default is the lowest role.
    ///
    /// # Errors
    ///
    /// See [`RoleBinder::new`].
    pub fn with_member_default<I, K, V>(raw_bindings: I) -> Result<Self, RbacError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        Self::new(Role::lowest(), raw_bindings)
    }

    /// # Errors
    ///
    /// See [`RoleBinder::new`].
    pub fn from_config(config: &RbacConfig) -> Result<Self, RbacError> {
        Self::new(config.default_role, &config.bindings)
    }

    #[must_use]
    pub const fn default_role(&self) -> Role {
        self.default_role
    }

    /// The highest role whose pattern matches any of `groups`, never below the
    /// default. A match on a role ranked under the default yields the default.
    #[must_use]
    pub fn bind_role<S: AsRef<str>>(&self, groups: &[S]) -> Role {
        let mut best: Option<Role> = None;
        for group in groups {
            let group = group.as_ref();
            for (role, pattern) in &self.bindings {
                let Some(pattern) = pattern else { continue };
                if best.is_some_and(|current| !role.outranks(current)) {
                    continue;
                }
                if pattern.is_match(group) {
                    best = Some(*role);
                }
            }
        }
        match best {
            Some(role) if role.outranks(self.default_role) => role,
            _ => self.default_role,
        }
    }
}
