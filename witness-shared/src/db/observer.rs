/// Query observation
///
/// Every statement the model layer sends to PostgreSQL passes through
/// [`Database::statement`](super::database::Database::statement), which reports it to the
/// [`QueryObserver`] the handle was built with. Production handles use
/// [`TracingObserver`]; tests inject a counting observer to assert on the statements a block
/// of code issues.
///
/// # Example
///
/// ```
/// use std::panic::Location;
/// use witness_shared::db::observer::{QueryObserver, StatementKind};
///
/// struct PrintObserver;
///
/// impl QueryObserver for PrintObserver {
///     fn on_statement(&self, database: &str, sql: &str, call_site: &'static Location<'static>) {
///         println!("[{}] {} at {}", database, sql.trim(), call_site);
///     }
/// }
///
/// assert_eq!(StatementKind::classify("  SELECT 1"), "select");
/// ```

use std::fmt;
use std::panic::Location;

/// Receives every statement issued through a [`Database`](super::database::Database) handle
pub trait QueryObserver: Send + Sync {
    /// Called once per statement, before it is sent to the server
    ///
    /// # Arguments
    ///
    /// * `database` - Name of the database handle (e.g. `"default"`)
    /// * `sql` - The statement text as written in the model layer
    /// * `call_site` - Source location of the model function that issued it
    fn on_statement(&self, database: &str, sql: &str, call_site: &'static Location<'static>);
}

/// Observer that logs statements at TRACE level
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl QueryObserver for TracingObserver {
    fn on_statement(&self, database: &str, sql: &str, call_site: &'static Location<'static>) {
        tracing::trace!(
            database,
            call_site = %call_site,
            statement = %StatementKind::classify(sql),
            "executing query"
        );
    }
}

/// Leading-keyword classification of a SQL statement
///
/// Statement kinds are compared as lower-cased strings, so anything the server accepts
/// (`select`, `insert`, `update`, `delete`, `with`, ...) gets its own bucket.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StatementKind(String);

impl StatementKind {
    /// Statement kinds that never count towards a statement histogram
    pub const IGNORED: [&'static str; 4] = ["savepoint", "release", "set", "show"];

    /// Returns the lower-cased leading keyword of `sql`
    pub fn classify(sql: &str) -> Self {
        let keyword = sql
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .trim_start_matches('(')
            .to_lowercase();

        StatementKind(keyword)
    }

    /// Whether statements of this kind are transaction or session plumbing
    pub fn is_ignored(&self) -> bool {
        Self::IGNORED.contains(&self.0.as_str())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl PartialEq<&str> for StatementKind {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}
