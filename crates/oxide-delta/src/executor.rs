//! Reconciliation orchestration.
//!
//! [`DbDelta`] ties the pieces together: it classifies the declared
//! statements, introspects each declared table, diffs it, orders the
//! resulting statements and optionally executes them.

use indexmap::IndexMap;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::backend::Backend;
use crate::classifier::{Queries, classify, split_batch, strip_leading_comments};
use crate::differ::{ChangeSet, Differ, DifferOptions};
use crate::error::{DeltaError, Result};
use crate::extract::{Unparseable, parse_create_table};
use crate::introspect::Introspector;
use crate::policy::{GlobalTablePolicy, NoGlobalTables};
use crate::schema::TableSchema;
use crate::scope::SchemaSource;

/// The ordered statements needed to reconcile a schema, before execution.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DeltaPlan {
    /// Report entries keyed by table, column or index.
    pub changes: IndexMap<String, String>,
    /// Statements in execution order.
    pub statements: Vec<String>,
    /// The `ALTER TABLE` changes included in `statements`.
    pub alterations: ChangeSet,
    /// Statements that were not recognized.
    pub unclassified: Vec<String>,
    /// Declared clauses that could not be used.
    pub unparseable: Vec<Unparseable>,
    /// Global tables left alone because the policy forbids upgrading them.
    pub skipped: Vec<String>,
}

impl DeltaPlan {
    /// Returns true if the plan changes no table.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}

/// The result of executing one statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OutcomeStatus {
    /// The statement succeeded.
    Applied {
        /// Rows affected as reported by the server.
        rows_affected: u64,
    },
    /// The statement failed; later statements still ran.
    Failed {
        /// The error message.
        error: String,
    },
}

/// One executed statement and how it went.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatementOutcome {
    /// The statement text.
    pub statement: String,
    /// Its result.
    #[serde(flatten)]
    pub status: OutcomeStatus,
}

impl StatementOutcome {
    /// Returns true if the statement failed.
    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(self.status, OutcomeStatus::Failed { .. })
    }
}

/// The result of a reconciliation run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DeltaReport {
    /// Report entries in insertion order.
    pub changes: IndexMap<String, String>,
    /// Statements in execution order.
    pub statements: Vec<String>,
    /// Per-statement results; empty unless the run executed.
    pub outcomes: Vec<StatementOutcome>,
    /// Statements that were not recognized.
    pub unclassified: Vec<String>,
    /// Declared clauses that could not be used.
    pub unparseable: Vec<Unparseable>,
    /// Global tables left alone.
    pub skipped: Vec<String>,
    /// Whether the statements were executed.
    pub executed: bool,
}

impl DeltaReport {
    fn from_plan(plan: DeltaPlan) -> Self {
        Self {
            changes: plan.changes,
            statements: plan.statements,
            outcomes: Vec::new(),
            unclassified: plan.unclassified,
            unparseable: plan.unparseable,
            skipped: plan.skipped,
            executed: false,
        }
    }

    /// Returns the report messages in order.
    #[must_use]
    pub fn messages(&self) -> Vec<&str> {
        self.changes.values().map(String::as_str).collect()
    }

    /// Returns the failed statements.
    pub fn failures(&self) -> impl Iterator<Item = &StatementOutcome> {
        self.outcomes.iter().filter(|o| o.is_failed())
    }

    /// Returns true if any statement failed.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.failures().next().is_some()
    }
}

/// Schema reconciliation engine.
///
/// # Example
///
/// ```no_run
/// use oxide_delta::prelude::*;
///
/// # async fn example() -> oxide_delta::Result<()> {
/// let backend = MySqlBackend::connect("mysql://root@localhost/blog").await?;
/// let delta = DbDelta::new(backend);
///
/// let report = delta
///     .run(
///         "CREATE TABLE wp_terms (
///  term_id bigint(20) unsigned NOT NULL auto_increment,
///  name varchar(200) NOT NULL default '',
///  PRIMARY KEY  (term_id)
/// )",
///         true,
///     )
///     .await?;
///
/// for message in report.messages() {
///     println!("{message}");
/// }
/// # Ok(())
/// # }
/// ```
pub struct DbDelta<B, P = NoGlobalTables> {
    backend: B,
    policy: P,
    source: Option<Box<dyn SchemaSource>>,
    options: Option<DifferOptions>,
}

impl<B: Backend> DbDelta<B> {
    /// Creates an engine with no global tables and no schema source.
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            policy: NoGlobalTables,
            source: None,
            options: None,
        }
    }
}

impl<B: Backend, P: GlobalTablePolicy> DbDelta<B, P> {
    /// Replaces the global table policy.
    #[must_use]
    pub fn with_policy<Q: GlobalTablePolicy>(self, policy: Q) -> DbDelta<B, Q> {
        DbDelta {
            backend: self.backend,
            policy,
            source: self.source,
            options: self.options,
        }
    }

    /// Sets the source used to resolve [`Queries::Scope`].
    #[must_use]
    pub fn with_schema_source(mut self, source: impl SchemaSource + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Fixes the differ options instead of deriving them from the server
    /// version.
    #[must_use]
    pub fn with_differ_options(mut self, options: DifferOptions) -> Self {
        self.options = Some(options);
        self
    }

    /// Returns the backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Returns the global table policy.
    pub fn policy(&self) -> &P {
        &self.policy
    }

    /// Returns the live schema of a table, or `None` if it does not exist.
    pub async fn inspect(&self, table: &str) -> Option<TableSchema> {
        Introspector::new(&self.backend).table(table).await
    }

    /// Computes the statements needed to reconcile `queries` without
    /// executing anything.
    pub async fn plan(&self, queries: impl Into<Queries>) -> Result<DeltaPlan> {
        let statements = self.resolve(queries.into())?;
        let batch = classify(statements);
        let differ = Differ::new(self.differ_options().await);
        let introspector = Introspector::new(&self.backend);

        let mut plan = DeltaPlan {
            unclassified: batch.unclassified,
            ..DeltaPlan::default()
        };
        for statement in &plan.unclassified {
            debug!(sql = %statement, "Unclassified statement");
        }

        let mut creates = Vec::new();
        for (table, create) in &batch.tables {
            if self.policy.skips(table) {
                warn!(table = %table, "Skipping global table");
                plan.skipped.push(table.clone());
                continue;
            }

            match introspector.table(table).await {
                None => {
                    debug!(table = %table, "Table does not exist");
                    creates.push(create.clone());
                    plan.changes
                        .insert(table.clone(), format!("Created table {table}"));
                }
                Some(live) => {
                    let parsed = parse_create_table(table, strip_leading_comments(create));
                    plan.unparseable.extend(parsed.unparseable);

                    let changes = differ.diff_table(&parsed.schema, &live);
                    for change in &changes {
                        plan.changes
                            .insert(change.report_key.clone(), change.report_message.clone());
                    }
                    plan.alterations.extend(changes);
                }
            }
        }

        plan.statements.extend(batch.databases);
        plan.statements.extend(creates);
        plan.statements.extend(
            plan.alterations
                .iter()
                .map(|change| change.statement.clone())
                .collect::<Vec<_>>(),
        );
        plan.statements.extend(batch.inserts);

        info!(
            tables = batch.tables.len(),
            statements = plan.statements.len(),
            changes = plan.changes.len(),
            "Planned schema reconciliation"
        );

        Ok(plan)
    }

    /// Plans the reconciliation and, if `execute` is true, runs every
    /// statement in order.
    ///
    /// A failing statement does not stop the run; its error is recorded in
    /// [`DeltaReport::outcomes`].
    pub async fn run(&self, queries: impl Into<Queries>, execute: bool) -> Result<DeltaReport> {
        let plan = self.plan(queries).await?;
        if execute {
            Ok(self.apply(plan).await)
        } else {
            Ok(DeltaReport::from_plan(plan))
        }
    }

    /// Executes a plan.
    pub async fn apply(&self, plan: DeltaPlan) -> DeltaReport {
        let mut report = DeltaReport::from_plan(plan);

        for statement in &report.statements {
            debug!(sql = %statement, "Executing SQL");
            let status = match self.backend.query(statement).await {
                Ok(rows_affected) => OutcomeStatus::Applied { rows_affected },
                Err(e) => {
                    warn!(sql = %statement, error = %e, "Statement failed");
                    OutcomeStatus::Failed {
                        error: e.to_string(),
                    }
                }
            };
            report.outcomes.push(StatementOutcome {
                statement: statement.clone(),
                status,
            });
        }
        report.executed = true;

        let failed = report.failures().count();
        info!(
            applied = report.outcomes.len() - failed,
            failed, "Executed schema reconciliation"
        );

        report
    }

    fn resolve(&self, queries: Queries) -> Result<Vec<String>> {
        match queries {
            Queries::Batch(sql) => Ok(split_batch(&sql)),
            Queries::List(statements) => Ok(statements),
            Queries::Scope(scope) => {
                let source = self
                    .source
                    .as_ref()
                    .ok_or(DeltaError::MissingSchemaSource(scope))?;
                Ok(split_batch(&source.schema(scope)?))
            }
        }
    }

    async fn differ_options(&self) -> DifferOptions {
        if let Some(options) = self.options {
            return options;
        }

        match Introspector::new(&self.backend).server_info().await {
            Some(info) => {
                debug!(version = %info.version, "Detected server version");
                DifferOptions::new()
                    .ignore_integer_display_width(info.ignores_integer_display_width())
            }
            None => DifferOptions::default(),
        }
    }
}
