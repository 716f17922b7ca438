//! Global table upgrade policy.
//!
//! In a multi-tenant installation some tables are shared by every tenant.
//! Whether those may be altered in the current context is the host's
//! decision; the engine only asks.

use std::collections::HashSet;

/// Decides whether shared ("global") tables may be migrated.
pub trait GlobalTablePolicy: Send + Sync {
    /// Returns the names of the global tables.
    fn global_tables(&self) -> HashSet<String>;

    /// Returns whether the current context may alter global tables.
    fn should_upgrade_global_tables(&self) -> bool;

    /// Returns true if `table` must be left alone in this context.
    fn skips(&self, table: &str) -> bool {
        !self.should_upgrade_global_tables() && self.global_tables().contains(table)
    }
}

/// Policy for single-tenant installations: nothing is global.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoGlobalTables;

impl GlobalTablePolicy for NoGlobalTables {
    fn global_tables(&self) -> HashSet<String> {
        HashSet::new()
    }

    fn should_upgrade_global_tables(&self) -> bool {
        true
    }
}

/// A fixed set of global tables with a fixed upgrade decision.
#[derive(Debug, Clone)]
pub struct StaticPolicy {
    tables: HashSet<String>,
    upgrade: bool,
}

impl Default for StaticPolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl StaticPolicy {
    /// Creates a policy with no global tables that allows upgrades.
    #[must_use]
    pub fn new() -> Self {
        Self {
            tables: HashSet::new(),
            upgrade: true,
        }
    }

    /// Marks a table as global.
    #[must_use]
    pub fn with_global_table(mut self, table: impl Into<String>) -> Self {
        self.tables.insert(table.into());
        self
    }

    /// Marks several tables as global.
    #[must_use]
    pub fn with_global_tables<I, S>(mut self, tables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tables.extend(tables.into_iter().map(Into::into));
        self
    }

    /// Sets whether global tables may be upgraded.
    #[must_use]
    pub fn upgrade_global_tables(mut self, upgrade: bool) -> Self {
        self.upgrade = upgrade;
        self
    }
}

impl GlobalTablePolicy for StaticPolicy {
    fn global_tables(&self) -> HashSet<String> {
        self.tables.clone()
    }

    fn should_upgrade_global_tables(&self) -> bool {
        self.upgrade
    }
}
