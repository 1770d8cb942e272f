/// Query-count assertions
///
/// [`QueryCounter`] is a [`QueryObserver`] that records statements only while a capture is
/// running. Point a [`Database`] handle at it with [`QueryCounter::observe`], then wrap the
/// code under test in [`QueryCounter::assert_num_queries`]:
///
/// ```no_run
/// use witness_shared::db::Database;
/// use witness_shared::models::user::User;
/// use witness_shared::testing::queries::QueryCounter;
/// use uuid::Uuid;
///
/// # async fn example(db: Database, id: Uuid) {
/// let counter = QueryCounter::new();
/// let db = counter.observe(&db);
///
/// counter
///     .assert_num_queries(&[("select", 1)], async {
///         User::find_by_id(&db, id).await.unwrap();
///     })
///     .await;
/// # }
/// ```
///
/// When writing a new assertion, start with empty counts, run the test with
/// `QUERY_COUNT_VERBOSE=1`, check the statements listed in the failure, and copy the counts
/// from the message.

use regex::Regex;
use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::panic::Location;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};

use crate::db::database::{Database, DEFAULT_DATABASE};
use crate::db::observer::{QueryObserver, StatementKind};

/// Environment variable that turns on statement listings in failure messages
pub const VERBOSE_ENV: &str = "QUERY_COUNT_VERBOSE";

/// A statement seen during a capture
#[derive(Debug, Clone)]
pub struct CapturedQuery {
    pub sql: String,
    pub call_site: &'static Location<'static>,
}

impl CapturedQuery {
    pub fn kind(&self) -> StatementKind {
        StatementKind::classify(&self.sql)
    }

    /// The statement with quoted string literals replaced by `'<str>'`
    pub fn short_sql(&self) -> String {
        static STRING_LITERAL: OnceLock<Regex> = OnceLock::new();
        let re = STRING_LITERAL.get_or_init(|| Regex::new(r"(?s)'.*?'").expect("valid regex"));

        re.replace_all(self.sql.trim(), "'<str>'").into_owned()
    }
}

/// Statement counts keyed by lower-cased statement kind
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryCounts(BTreeMap<String, usize>);

impl QueryCounts {
    /// Builds counts from `(kind, count)` pairs, dropping zero counts
    pub fn expected(pairs: &[(&str, usize)]) -> Self {
        let mut counts = BTreeMap::new();
        for (kind, count) in pairs {
            if *count > 0 {
                *counts.entry(kind.to_lowercase()).or_insert(0) += count;
            }
        }
        QueryCounts(counts)
    }

    /// Histogram of captured statements, skipping transaction and session plumbing
    pub fn from_captured(captured: &[CapturedQuery]) -> Self {
        let mut counts = BTreeMap::new();
        for query in captured {
            let kind = query.kind();
            if !kind.is_ignored() {
                *counts.entry(kind.as_str().to_string()).or_insert(0) += 1;
            }
        }
        QueryCounts(counts)
    }

    pub fn get(&self, kind: &str) -> usize {
        self.0.get(kind).copied().unwrap_or(0)
    }
}

impl fmt::Display for QueryCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (kind, count)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "'{}': {}", kind, count)?;
        }
        f.write_str("}")
    }
}

/// Expected and actual counts differed
#[derive(Debug, Clone)]
pub struct QueryCountMismatch {
    pub expected: QueryCounts,
    pub actual: QueryCounts,
    pub captured: Vec<CapturedQuery>,
    pub verbose: bool,
}

impl fmt::Display for QueryCountMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Unexpected queries: expected {}, got {}",
            self.expected, self.actual
        )?;

        if !self.verbose {
            return write!(f, " (set {}=1 to show queries)", VERBOSE_ENV);
        }

        f.write_str("\n\nQueries:\n========\n\n")?;
        for query in &self.captured {
            write!(
                f,
                "{}:{}:\n{}\n\n",
                query.call_site.file(),
                query.call_site.line(),
                query.short_sql()
            )?;
        }
        Ok(())
    }
}

impl std::error::Error for QueryCountMismatch {}

#[derive(Debug, Default)]
struct CaptureState {
    active: bool,
    captured: Vec<CapturedQuery>,
}

/// Counts the statements issued against one named database during a capture
#[derive(Debug)]
pub struct QueryCounter {
    database: String,
    verbose: bool,
    state: Mutex<CaptureState>,
}

impl QueryCounter {
    /// Counter for the `"default"` database
    pub fn new() -> Arc<Self> {
        Self::for_database(DEFAULT_DATABASE)
    }

    /// Counter for a named database; statements on other handles are ignored
    pub fn for_database(database: &str) -> Arc<Self> {
        let verbose = std::env::var(VERBOSE_ENV)
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        Arc::new(Self {
            database: database.to_string(),
            verbose,
            state: Mutex::new(CaptureState::default()),
        })
    }

    /// Counter with statement listings forced on or off, ignoring the environment
    pub fn verbose(database: &str, verbose: bool) -> Arc<Self> {
        Arc::new(Self {
            database: database.to_string(),
            verbose,
            state: Mutex::new(CaptureState::default()),
        })
    }

    /// Returns a handle on `db`'s pool that reports to this counter
    pub fn observe(self: &Arc<Self>, db: &Database) -> Database {
        db.observed_by(self.clone())
    }

    /// Runs `block` and returns its output together with the statements it issued
    pub async fn capture<F: Future>(&self, block: F) -> (F::Output, Vec<CapturedQuery>) {
        {
            let mut state = self.lock();
            state.active = true;
            state.captured.clear();
        }

        let output = block.await;

        let mut state = self.lock();
        state.active = false;
        (output, std::mem::take(&mut state.captured))
    }

    /// Runs `block` and compares the statement histogram with `expected`
    ///
    /// Zero counts in `expected` are ignored, so `[("select", 1), ("update", 0)]` matches a
    /// block that issues exactly one select.
    pub async fn try_assert_num_queries<F: Future>(
        &self,
        expected: &[(&str, usize)],
        block: F,
    ) -> Result<F::Output, QueryCountMismatch> {
        let (output, captured) = self.capture(block).await;

        let expected = QueryCounts::expected(expected);
        let actual = QueryCounts::from_captured(&captured);
        if expected != actual {
            return Err(QueryCountMismatch {
                expected,
                actual,
                captured,
                verbose: self.verbose,
            });
        }

        Ok(output)
    }

    /// Like [`try_assert_num_queries`](Self::try_assert_num_queries) but panics on mismatch
    #[track_caller]
    pub fn assert_num_queries<'a, F: Future + 'a>(
        &'a self,
        expected: &'a [(&'a str, usize)],
        block: F,
    ) -> impl Future<Output = F::Output> + 'a {
        let caller = Location::caller();
        async move {
            match self.try_assert_num_queries(expected, block).await {
                Ok(output) => output,
                Err(mismatch) => panic!("{}\n(asserted at {})", mismatch, caller),
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, CaptureState> {
        // A panicking test must not poison later captures
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl QueryObserver for QueryCounter {
    fn on_statement(&self, database: &str, sql: &str, call_site: &'static Location<'static>) {
        if database != self.database {
            return;
        }

        let mut state = self.lock();
        if state.active {
            state.captured.push(CapturedQuery {
                sql: sql.to_string(),
                call_site,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lazy_db(name: &str) -> Database {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .connect_lazy("postgresql://localhost/unused")
            .unwrap();
        Database::named(name, pool)
    }

    /// Issues `selects` selects and `updates` updates without touching the server
    fn issue(db: &Database, selects: usize, updates: usize) {
        for _ in 0..selects {
            db.statement("SELECT id FROM users WHERE email = 'a@b.c'");
        }
        for _ in 0..updates {
            db.statement("UPDATE users SET first_name = 'x' WHERE id = $1");
        }
        db.statement("SAVEPOINT sp1");
        db.statement("RELEASE SAVEPOINT sp1");
    }

    #[tokio::test]
    async fn test_matching_counts_pass() {
        let counter = QueryCounter::verbose(DEFAULT_DATABASE, false);
        let db = counter.observe(&lazy_db(DEFAULT_DATABASE));

        let result = counter
            .try_assert_num_queries(&[("select", 2), ("update", 3)], async { issue(&db, 2, 3) })
            .await;

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_any_other_counts_fail() {
        let counter = QueryCounter::verbose(DEFAULT_DATABASE, false);
        let db = counter.observe(&lazy_db(DEFAULT_DATABASE));

        for (selects, updates) in [(1, 3), (2, 2), (0, 0), (3, 3)] {
            let mismatch = counter
                .try_assert_num_queries(&[("select", selects), ("update", updates)], async {
                    issue(&db, 2, 3)
                })
                .await
                .unwrap_err();

            assert_eq!(mismatch.actual.get("select"), 2);
            assert_eq!(mismatch.actual.get("update"), 3);
            assert!(mismatch
                .to_string()
                .starts_with("Unexpected queries: expected {"));
            assert!(mismatch.to_string().contains("got {'select': 2, 'update': 3}"));
        }
    }

    #[tokio::test]
    async fn test_zero_expectations_are_ignored() {
        let counter = QueryCounter::verbose(DEFAULT_DATABASE, false);
        let db = counter.observe(&lazy_db(DEFAULT_DATABASE));

        counter
            .assert_num_queries(&[("select", 1), ("delete", 0)], async { issue(&db, 1, 0) })
            .await;
        counter.assert_num_queries(&[], async {}).await;
    }

    #[tokio::test]
    async fn test_statements_outside_capture_are_not_recorded() {
        let counter = QueryCounter::verbose(DEFAULT_DATABASE, false);
        let db = counter.observe(&lazy_db(DEFAULT_DATABASE));

        issue(&db, 5, 5);
        let (_, captured) = counter.capture(async {}).await;
        assert!(captured.is_empty());
    }

    #[tokio::test]
    async fn test_other_databases_are_ignored() {
        let counter = QueryCounter::verbose("replica", false);
        let default_db = counter.observe(&lazy_db(DEFAULT_DATABASE));
        let replica = counter.observe(&lazy_db("replica"));

        counter
            .assert_num_queries(&[("select", 1)], async {
                issue(&default_db, 4, 0);
                issue(&replica, 1, 0);
            })
            .await;
    }

    #[tokio::test]
    async fn test_verbose_message_lists_statements() {
        let counter = QueryCounter::verbose(DEFAULT_DATABASE, true);
        let db = counter.observe(&lazy_db(DEFAULT_DATABASE));

        let message = counter
            .try_assert_num_queries(&[], async { issue(&db, 1, 0) })
            .await
            .unwrap_err()
            .to_string();

        assert!(message.contains("\n\nQueries:\n========\n\n"));
        assert!(message.contains("SELECT id FROM users WHERE email = '<str>'"));
        assert!(message.contains("SAVEPOINT sp1"));
        assert!(message.contains(file!()));
    }

    #[tokio::test]
    #[should_panic(expected = "Unexpected queries")]
    async fn test_assert_num_queries_panics() {
        let counter = QueryCounter::verbose(DEFAULT_DATABASE, false);
        let db = counter.observe(&lazy_db(DEFAULT_DATABASE));

        counter
            .assert_num_queries(&[("update", 1)], async { issue(&db, 1, 0) })
            .await;
    }

    #[test]
    fn test_short_sql_spans_lines() {
        let query = CapturedQuery {
            sql: "INSERT INTO t VALUES ('multi\nline', 'x')".to_string(),
            call_site: Location::caller(),
        };
        assert_eq!(query.short_sql(), "INSERT INTO t VALUES ('<str>', '<str>')");
    }
}
