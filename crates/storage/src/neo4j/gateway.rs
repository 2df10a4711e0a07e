//! Query execution gateway
//!
//! Every operation opens one [`Session`] bound to one explicit transaction,
//! runs its statements and either commits or rolls back. Dropping a session
//! without committing returns the pooled connection, which resets it and
//! abandons the transaction. Read sessions refuse write clauses and are always
//! rolled back.

use futures::channel::mpsc;
use futures::stream::BoxStream;
use futures::{SinkExt, StreamExt};
use neo4rs::{BoltType, ConfigBuilder, Graph, Query, Row, Txn};
use std::future::Future;
use std::iter::Peekable;
use std::str::Chars;
use std::sync::Arc;
use std::time::Duration;
use tracegraph_core::StorageConfig;
use tracing::{debug, error, info, warn};

use crate::error::{Result, StorageError};

/// Lazy, finite, cancellable sequence of mapped rows
pub type RecordStream<T> = BoxStream<'static, Result<T>>;

/// Clauses that modify the graph, or may through a procedure
const WRITE_CLAUSES: &[&str] = &[
    "CREATE", "MERGE", "SET", "DELETE", "DETACH", "REMOVE", "DROP", "FOREACH", "LOAD", "CALL",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    Read,
    Write,
}

/// Parameterized Cypher statement
#[derive(Debug, Clone)]
pub struct CypherQuery {
    text: String,
    params: Vec<(String, BoltType)>,
}

impl CypherQuery {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            params: Vec::new(),
        }
    }

    pub fn param(mut self, key: &str, value: impl Into<BoltType>) -> Self {
        self.params.push((key.to_string(), value.into()));
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    fn to_query(&self) -> Query {
        self.params
            .iter()
            .fold(Query::new(self.text.clone()), |query, (key, value)| {
                query.param(key, value.clone())
            })
    }
}

/// Fails when a statement meant for a read session would modify the graph
///
/// Keywords inside string literals, backtick identifiers, property accesses,
/// labels and parameter names are ignored. Procedures are not inspected, so
/// every `CALL` is refused. The check is textual: read sessions still run in an
/// ordinary transaction, which is rolled back when the session ends.
pub fn ensure_read_only(text: &str) -> Result<()> {
    let mut chars = text.chars().peekable();
    // Last non-whitespace character seen outside a word
    let mut prev = ' ';
    while let Some(c) = chars.next() {
        match c {
            '\'' | '"' | '`' => {
                skip_quoted(&mut chars, c);
                prev = c;
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut word = String::from(c);
                while let Some(&next) = chars.peek() {
                    if !(next.is_ascii_alphanumeric() || next == '_') {
                        break;
                    }
                    word.push(next);
                    chars.next();
                }
                let upper = word.to_ascii_uppercase();
                if !matches!(prev, '.' | '$' | ':') && WRITE_CLAUSES.contains(&upper.as_str()) {
                    return Err(StorageError::CapabilityViolation(format!(
                        "write clause {upper} in read-scoped statement"
                    )));
                }
                prev = 'w';
            }
            c if c.is_whitespace() => {}
            c => prev = c,
        }
    }
    Ok(())
}

fn skip_quoted(chars: &mut Peekable<Chars<'_>>, quote: char) {
    while let Some(c) = chars.next() {
        if c == '\\' {
            chars.next();
        } else if c == quote {
            break;
        }
    }
}

async fn bounded<T, F>(limit: Duration, fut: F) -> Result<T>
where
    F: Future<Output = std::result::Result<T, neo4rs::Error>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result.map_err(StorageError::from),
        Err(_) => Err(StorageError::Timeout(limit.as_millis() as u64)),
    }
}

/// One transaction on one pooled connection
pub struct Session {
    txn: Txn,
    mode: AccessMode,
    statement_timeout: Duration,
}

impl Session {
    fn admit(&self, query: &CypherQuery) -> Result<Query> {
        if self.mode == AccessMode::Read {
            if let Err(e) = ensure_read_only(query.text()) {
                error!("Rejected statement in read session: {}", query.text());
                return Err(e);
            }
        }
        Ok(query.to_query())
    }

    /// Runs a statement and maps every row
    pub async fn fetch_all<T, D>(&mut self, query: &CypherQuery, decode: D) -> Result<Vec<T>>
    where
        D: Fn(&Row) -> Result<T>,
    {
        let q = self.admit(query)?;
        let limit = self.statement_timeout;
        let mut rows = bounded(limit, self.txn.execute(q)).await?;
        let mut mapped = Vec::new();
        while let Some(row) = bounded(limit, rows.next(self.txn.handle())).await? {
            mapped.push(decode(&row)?);
        }
        Ok(mapped)
    }

    /// Runs a statement and maps its first row, if any
    pub async fn fetch_optional<T, D>(&mut self, query: &CypherQuery, decode: D) -> Result<Option<T>>
    where
        D: Fn(&Row) -> Result<T>,
    {
        let q = self.admit(query)?;
        let limit = self.statement_timeout;
        let mut rows = bounded(limit, self.txn.execute(q)).await?;
        let mut first = None;
        // Drain so the connection is ready for the next statement
        while let Some(row) = bounded(limit, rows.next(self.txn.handle())).await? {
            if first.is_none() {
                first = Some(decode(&row)?);
            }
        }
        Ok(first)
    }

    /// Runs a statement for its effect only
    pub async fn run(&mut self, query: &CypherQuery) -> Result<()> {
        let q = self.admit(query)?;
        bounded(self.statement_timeout, self.txn.run(q)).await
    }

    pub async fn commit(self) -> Result<()> {
        if self.mode == AccessMode::Read {
            return self.rollback().await;
        }
        bounded(self.statement_timeout, self.txn.commit()).await
    }

    pub async fn rollback(self) -> Result<()> {
        bounded(self.statement_timeout, self.txn.rollback()).await
    }

    /// Commits on success, rolls back on failure, and returns the original outcome
    pub async fn finish<T>(self, outcome: Result<T>) -> Result<T> {
        match outcome {
            Ok(value) => {
                self.commit().await?;
                Ok(value)
            }
            Err(e) => {
                if let Err(rollback_err) = self.rollback().await {
                    warn!("Rollback after failure also failed: {rollback_err}");
                }
                Err(e)
            }
        }
    }
}

/// Single-error stream for a read statement that would write
fn refuse_write_stream<T: Send + 'static>(query: &CypherQuery) -> Option<RecordStream<T>> {
    let err = ensure_read_only(query.text()).err()?;
    error!("Rejected streamed read: {}", query.text());
    Some(futures::stream::once(async move { Err(err) }).boxed())
}

/// Connection pool plus the timeouts applied to every session
#[derive(Clone)]
pub struct QueryGateway {
    graph: Arc<Graph>,
    acquisition_timeout: Duration,
    statement_timeout: Duration,
    stream_buffer: usize,
    read_retry_attempts: usize,
}

impl QueryGateway {
    /// Opens the connection pool described by `config`
    pub async fn connect(config: &StorageConfig) -> Result<Self> {
        let acquisition_timeout = config
            .acquisition_timeout()
            .map_err(|e| StorageError::InvalidConfig(e.to_string()))?;
        let statement_timeout = config
            .statement_timeout()
            .map_err(|e| StorageError::InvalidConfig(e.to_string()))?;

        let neo4j_config = ConfigBuilder::default()
            .uri(config.connection_uri())
            .user(config.neo4j_user.as_str())
            .password(config.neo4j_password.as_str())
            .db(config.neo4j_database.as_str())
            .fetch_size(config.fetch_size)
            .max_connections(config.max_connection_pool_size)
            .build()
            .map_err(|e| StorageError::InvalidConfig(format!("Failed to build Neo4j config: {e}")))?;

        let graph = bounded(acquisition_timeout, Graph::connect(neo4j_config))
            .await
            .map_err(|e| match e {
                StorageError::Timeout(ms) => StorageError::Timeout(ms),
                other => StorageError::Connectivity(other.to_string()),
            })?;

        info!(
            "Connected to Neo4j at {} (database {}, pool {})",
            config.neo4j_uri, config.neo4j_database, config.max_connection_pool_size
        );

        Ok(Self {
            graph: Arc::new(graph),
            acquisition_timeout,
            statement_timeout,
            stream_buffer: config.fetch_size.max(1),
            read_retry_attempts: config.read_retry_attempts,
        })
    }

    /// Opens a session with its own transaction
    pub async fn begin(&self, mode: AccessMode) -> Result<Session> {
        let txn = bounded(self.acquisition_timeout, self.graph.start_txn()).await?;
        Ok(Session {
            txn,
            mode,
            statement_timeout: self.statement_timeout,
        })
    }

    /// Runs one write statement and maps its first row
    pub async fn execute_write<T, D>(&self, query: CypherQuery, decode: D) -> Result<Option<T>>
    where
        D: Fn(&Row) -> Result<T>,
    {
        let mut session = self.begin(AccessMode::Write).await?;
        let outcome = session.fetch_optional(&query, decode).await;
        session.finish(outcome).await
    }

    /// Runs one write statement for its effect
    pub async fn execute_write_many(&self, query: CypherQuery) -> Result<()> {
        let mut session = self.begin(AccessMode::Write).await?;
        let outcome = session.run(&query).await;
        session.finish(outcome).await
    }

    /// Runs one read statement and maps its first row
    ///
    /// Connectivity failures are retried up to the configured attempt count.
    pub async fn execute_read<T, D>(&self, query: CypherQuery, decode: D) -> Result<Option<T>>
    where
        D: Fn(&Row) -> Result<T>,
    {
        ensure_read_only(query.text())?;
        let mut attempt = 0;
        loop {
            let outcome = self.read_once(&query, &decode).await;
            match outcome {
                Err(e) if e.is_transient() && attempt < self.read_retry_attempts => {
                    attempt += 1;
                    warn!("Read failed ({e}), retrying (attempt {attempt})");
                    tokio::time::sleep(Duration::from_millis(100 * attempt as u64)).await;
                }
                other => return other,
            }
        }
    }

    async fn read_once<T, D>(&self, query: &CypherQuery, decode: &D) -> Result<Option<T>>
    where
        D: Fn(&Row) -> Result<T>,
    {
        let mut session = self.begin(AccessMode::Read).await?;
        let outcome = session.fetch_optional(query, decode).await;
        session.finish(outcome).await
    }

    /// Streams mapped rows of one read statement
    ///
    /// Rows are fetched by a background task into a bounded channel, so the
    /// producer stays at most one buffer ahead of the consumer. Dropping the
    /// stream stops the task, which rolls back and releases the session.
    pub fn execute_read_stream<T, D>(&self, query: CypherQuery, decode: D) -> RecordStream<T>
    where
        T: Send + 'static,
        D: Fn(&Row) -> Result<T> + Send + Sync + 'static,
    {
        if let Some(refused) = refuse_write_stream(&query) {
            return refused;
        }

        let (mut tx, rx) = mpsc::channel::<Result<T>>(self.stream_buffer);
        let gateway = self.clone();

        tokio::spawn(async move {
            let produced = async {
                let mut session = gateway.begin(AccessMode::Read).await?;
                let q = session.admit(&query)?;
                let limit = session.statement_timeout;
                let mut rows = bounded(limit, session.txn.execute(q)).await?;
                while let Some(row) = bounded(limit, rows.next(session.txn.handle())).await? {
                    let item = decode(&row);
                    let failed = item.is_err();
                    if tx.send(item).await.is_err() {
                        debug!("Stream consumer went away, abandoning read");
                        break;
                    }
                    if failed {
                        break;
                    }
                }
                session.rollback().await
            }
            .await;

            if let Err(e) = produced {
                let _ = tx.send(Err(e)).await;
            }
        });

        rx.boxed()
    }

    /// Runs a schema statement in its own auto-commit transaction
    pub async fn execute_schema(&self, statement: &str) -> Result<()> {
        bounded(self.statement_timeout, self.graph.run(Query::new(statement.to_string()))).await
    }
}
