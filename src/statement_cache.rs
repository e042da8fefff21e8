//! Client-side statement cache
//!
//! Executing the same SQL text many times (the common case for batch DML)
//! should parse it on the server once. The cache keeps prepared
//! [`Statement`]s keyed by SQL text; a hit hands back a copy that still
//! carries the server cursor id, so the session can skip the prepare step.
//!
//! Entries are ordered from least to most recently used. DDL is never cached,
//! nor is a statement the session has not assigned a cursor to.

use indexmap::IndexMap;

use crate::statement::Statement;

#[derive(Debug)]
struct CacheEntry {
    statement: Statement,
    in_use: bool,
}

/// LRU cache of prepared statements
#[derive(Debug)]
pub struct StatementCache {
    entries: IndexMap<String, CacheEntry>,
    max_size: usize,
}

impl StatementCache {
    /// Create a cache holding at most `max_size` statements
    ///
    /// A size of 0 disables caching.
    pub fn new(max_size: usize) -> Self {
        Self {
            entries: IndexMap::with_capacity(max_size),
            max_size,
        }
    }

    /// Take a prepared statement for `sql`, marking it in use
    ///
    /// Returns `None` on a miss, and also when the cached statement is
    /// already checked out; the caller then prepares a fresh one.
    pub fn get(&mut self, sql: &str) -> Option<Statement> {
        if self.max_size == 0 {
            return None;
        }

        let Some(index) = self.entries.get_index_of(sql) else {
            tracing::trace!(sql, "Statement cache miss");
            return None;
        };

        let last = self.entries.len() - 1;
        self.entries.move_index(index, last);
        let (_, entry) = self.entries.get_index_mut(last)?;

        if entry.in_use {
            tracing::trace!(sql, "Statement cache hit but in use");
            return None;
        }

        entry.in_use = true;
        tracing::trace!(
            sql,
            cursor_id = entry.statement.cursor_id(),
            "Statement cache hit"
        );
        Some(entry.statement.clone())
    }

    /// Store a prepared statement, or release the one already cached for its
    /// SQL text
    pub fn put(&mut self, statement: Statement) {
        if self.max_size == 0 {
            return;
        }

        if statement.is_ddl() {
            tracing::trace!(sql = statement.sql(), "Not caching DDL statement");
            return;
        }

        if statement.cursor_id() == 0 {
            tracing::trace!(sql = statement.sql(), "Not caching unprepared statement");
            return;
        }

        let sql = statement.sql().to_string();
        if let Some(entry) = self.entries.get_mut(&sql) {
            entry.statement = statement;
            entry.in_use = false;
            return;
        }

        if self.entries.len() >= self.max_size && !self.evict_lru() {
            return;
        }

        tracing::trace!(
            sql = sql.as_str(),
            cursor_id = statement.cursor_id(),
            "Adding statement to cache"
        );
        self.entries.insert(
            sql,
            CacheEntry {
                statement,
                in_use: false,
            },
        );
    }

    /// Release a statement without replacing it
    pub fn release(&mut self, sql: &str) {
        if let Some(entry) = self.entries.get_mut(sql) {
            entry.in_use = false;
        }
    }

    /// Drop every cached statement
    pub fn clear(&mut self) {
        self.entries.clear();
        tracing::debug!("Statement cache cleared");
    }

    /// Number of cached statements
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the cache is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum number of cached statements
    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Evict the least recently used statement that is not checked out
    fn evict_lru(&mut self) -> bool {
        let Some(index) = self.entries.values().position(|entry| !entry.in_use) else {
            tracing::warn!("Statement cache full and all statements in use");
            return false;
        };

        if let Some((sql, entry)) = self.entries.shift_remove_index(index) {
            tracing::trace!(
                sql = sql.as_str(),
                cursor_id = entry.statement.cursor_id(),
                "Evicted statement from cache"
            );
        }
        true
    }
}
