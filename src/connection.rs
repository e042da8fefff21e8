//! Connection handling
//!
//! A [`Connection`] owns one database [`Session`] together with the statement
//! cache and the connection state. Work is done through [`Cursor`]s created
//! with [`Connection::cursor`]; every cursor shares the connection's session.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::config::Config;
use crate::cursor::Cursor;
use crate::error::{Error, Result};
use crate::row::Value;
use crate::session::{Execution, Session};
use crate::statement::Statement;
use crate::statement_cache::StatementCache;

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Session open and ready for work
    Ready,
    /// Connection is closed
    Closed,
}

/// Connection state shared with every cursor of the connection
pub(crate) struct ConnectionInner<S> {
    session: S,
    statement_cache: StatementCache,
    state: ConnectionState,
}

impl<S: Session> ConnectionInner<S> {
    fn new(session: S, cache_size: usize) -> Self {
        Self {
            session,
            statement_cache: StatementCache::new(cache_size),
            state: ConnectionState::Ready,
        }
    }

    pub(crate) fn ensure_open(&self) -> Result<()> {
        match self.state {
            ConnectionState::Ready => Ok(()),
            ConnectionState::Closed => Err(Error::ConnectionClosed),
        }
    }

    /// Resolve a locally parsed statement to a prepared one, from the cache
    /// when possible
    pub(crate) async fn prepare(&mut self, mut statement: Statement) -> Result<Statement> {
        if let Some(cached) = self.statement_cache.get(statement.sql()) {
            return Ok(cached);
        }

        self.session.prepare(&mut statement).await?;
        tracing::trace!(
            sql = statement.sql(),
            cursor_id = statement.cursor_id(),
            "Prepared statement"
        );
        Ok(statement)
    }

    /// Hand a statement back to the cache once the execution is over
    pub(crate) fn release(&mut self, statement: Statement) {
        self.statement_cache.put(statement);
    }

    pub(crate) async fn execute(
        &mut self,
        statement: &Statement,
        binds: &[Value],
    ) -> Result<Execution<S::ResultSet>> {
        self.session.execute(statement, binds).await
    }

    pub(crate) async fn commit(&mut self) -> Result<()> {
        self.session.commit().await
    }
}

/// A connection to an Oracle database
///
/// # Example
///
/// ```rust,ignore
/// let conn = Connection::<MySession>::connect("localhost:1521/FREEPDB1", "scott", "tiger").await?;
/// let mut cursor = conn.cursor()?;
///
/// let outcome = cursor
///     .execute_many(
///         "insert into t (id, name) values (:1, :2)",
///         vec![vec![1.into(), "one".into()], vec![2.into(), "two".into()]],
///         BatchOptions::new().with_row_counts(),
///     )
///     .await?;
/// conn.commit().await?;
/// ```
///
/// # Thread Safety
///
/// Operations are serialized internally via a mutex. A batch holds the
/// session for its whole duration, so rows from different cursors never
/// interleave.
pub struct Connection<S> {
    inner: Arc<Mutex<ConnectionInner<S>>>,
    config: Config,
    closed: AtomicBool,
    id: u32,
}

static CONNECTION_ID_COUNTER: AtomicU32 = AtomicU32::new(1);

impl<S: Session> Connection<S> {
    /// Open a connection from an EZConnect string and credentials
    pub async fn connect(connect_string: &str, username: &str, password: &str) -> Result<Self> {
        let mut config: Config = connect_string.parse()?;
        config.set_username(username);
        config.set_password(password);
        Self::connect_with_config(config).await
    }

    /// Open a connection using a [`Config`]
    pub async fn connect_with_config(config: Config) -> Result<Self> {
        let session = S::open(&config).await?;
        Ok(Self::from_session(session, config))
    }

    /// Wrap a session that is already open
    pub fn from_session(session: S, config: Config) -> Self {
        let id = CONNECTION_ID_COUNTER.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(
            connection_id = id,
            target = %config,
            stmtcachesize = config.stmtcachesize,
            "Connection established"
        );

        Self {
            inner: Arc::new(Mutex::new(ConnectionInner::new(
                session,
                config.stmtcachesize,
            ))),
            config,
            closed: AtomicBool::new(false),
            id,
        }
    }

    /// Get the connection ID
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Get the connection configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Check if the connection is closed
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Relaxed)
    }

    /// Get the current connection state
    pub async fn state(&self) -> ConnectionState {
        self.inner.lock().await.state
    }

    /// Create a cursor on this connection
    ///
    /// The cursor starts with the array size and batch timeout from the
    /// connection's [`Config`].
    pub fn cursor(&self) -> Result<Cursor<S>> {
        if self.is_closed() {
            return Err(Error::ConnectionClosed);
        }
        Ok(Cursor::new(
            Arc::clone(&self.inner),
            self.id,
            self.config.arraysize,
            self.config.batch_timeout,
        ))
    }

    /// Commit the current transaction
    pub async fn commit(&self) -> Result<()> {
        let mut inner = self.inner.lock().await;
        inner.ensure_open()?;
        inner.commit().await?;
        tracing::debug!(connection_id = self.id, "Transaction committed");
        Ok(())
    }

    /// Roll back the current transaction
    pub async fn rollback(&self) -> Result<()> {
        let mut inner = self.inner.lock().await;
        inner.ensure_open()?;
        inner.session.rollback().await?;
        tracing::debug!(connection_id = self.id, "Transaction rolled back");
        Ok(())
    }

    /// Close the connection
    ///
    /// Closing twice is a no-op. Cursors created from this connection fail
    /// with [`Error::ConnectionClosed`] afterwards.
    pub async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::Relaxed) {
            return Ok(());
        }

        let mut inner = self.inner.lock().await;
        inner.state = ConnectionState::Closed;
        inner.statement_cache.clear();

        if let Err(e) = inner.session.close().await {
            tracing::warn!(connection_id = self.id, error = %e, "Session close failed");
            return Err(e);
        }

        tracing::debug!(connection_id = self.id, "Connection closed");
        Ok(())
    }
}

impl<S> std::fmt::Debug for Connection<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("target", &self.config.to_string())
            .field("closed", &self.closed.load(Ordering::Relaxed))
            .finish()
    }
}
