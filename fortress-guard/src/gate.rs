//! Named ability checks.
//!
//! Hosts register abilities once at startup and then ask the gate, with the
//! request's guard, whether an ability is allowed. Each ability delegates to a
//! global permission or global role check on the guard.

use std::collections::BTreeMap;

use crate::config::FortressConfig;
use crate::error::{GuardError, GuardResult};
use crate::guard::Guard;

/// How a registered ability is decided.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbilityCheck {
    /// Allowed when the subject has this global permission
    GlobalPermission(String),
    /// Allowed when the subject holds this global role
    GlobalRole(String),
}

/// Registry of named abilities.
///
/// # Examples
///
/// ```rust,no_run
/// use fortress_guard::{Gate, Guard};
///
/// fn check(guard: &Guard) {
///     let mut gate = Gate::new();
///     gate.define_global_permission("manage-users")
///         .define_global_role("admin-area", "admin");
///
///     if gate.denies(guard, "manage-users") {
///         // reject with 403
///     }
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct Gate {
    abilities: BTreeMap<String, AbilityCheck>,
}

impl Gate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register every ability named in the configured global role table as a
    /// global permission check.
    pub fn from_config(config: &FortressConfig) -> Self {
        let mut gate = Self::new();
        for ability in config.global_abilities() {
            gate.define_global_permission(ability);
        }
        gate
    }

    /// Register `ability` as a global permission check of the same name.
    pub fn define_global_permission(&mut self, ability: impl Into<String>) -> &mut Self {
        let ability = ability.into();
        self.abilities
            .insert(ability.clone(), AbilityCheck::GlobalPermission(ability));
        self
    }

    /// Register `ability` as a check for the global role `role`.
    pub fn define_global_role(&mut self, ability: impl Into<String>, role: impl Into<String>) -> &mut Self {
        self.abilities
            .insert(ability.into(), AbilityCheck::GlobalRole(role.into()));
        self
    }

    /// Check if an ability is registered.
    pub fn has(&self, ability: &str) -> bool {
        self.abilities.contains_key(ability)
    }

    /// Registered ability names, sorted.
    pub fn abilities(&self) -> impl Iterator<Item = &str> {
        self.abilities.keys().map(String::as_str)
    }

    /// Check an ability for the guard's subject.
    ///
    /// Unregistered abilities are denied.
    pub fn allows(&self, guard: &Guard, ability: &str) -> bool {
        match self.abilities.get(ability) {
            Some(AbilityCheck::GlobalPermission(permission)) => guard.has_global_permission(permission),
            Some(AbilityCheck::GlobalRole(role)) => guard.has_global_role(role),
            None => {
                tracing::debug!(ability, "Ability not registered, denying");
                false
            }
        }
    }

    /// Negation of [`Gate::allows`].
    pub fn denies(&self, guard: &Guard, ability: &str) -> bool {
        !self.allows(guard, ability)
    }

    /// Require an ability.
    ///
    /// # Errors
    ///
    /// [`GuardError::Forbidden`] when the ability is denied or unregistered.
    pub fn authorize(&self, guard: &Guard, ability: &str) -> GuardResult<()> {
        if self.allows(guard, ability) {
            Ok(())
        } else {
            Err(GuardError::Forbidden(format!(
                "{} may not {}",
                guard.subject(),
                ability
            )))
        }
    }
}
