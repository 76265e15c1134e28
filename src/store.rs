//! SQLite connection pools shared by the ticker source and price cache

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use std::time::Duration;

/// Build a lazily connecting pool for `url`
///
/// No connection is opened here, so an unreachable store surfaces on first
/// use where the caller can classify the failure. In-memory databases are
/// pinned to a single long-lived connection, since every SQLite connection
/// to `:memory:` sees its own private database.
pub fn lazy_pool(url: &str, create_if_missing: bool) -> Result<SqlitePool, sqlx::Error> {
    let in_memory = is_in_memory_url(url);

    let mut options = SqliteConnectOptions::from_str(url)?
        .create_if_missing(create_if_missing)
        .busy_timeout(Duration::from_secs(5));
    if !in_memory {
        options = options.journal_mode(SqliteJournalMode::Wal);
    }

    let pool_options = if in_memory {
        SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        SqlitePoolOptions::new().max_connections(4)
    };

    Ok(pool_options
        .acquire_timeout(Duration::from_secs(10))
        .connect_lazy_with(options))
}

/// Both `sqlite::memory:` and `mode=memory` URLs open private databases
fn is_in_memory_url(url: &str) -> bool {
    url.contains(":memory:")
        || url
            .split_once('?')
            .is_some_and(|(_, query)| query.split('&').any(|param| param == "mode=memory"))
}

/// Reject anything but plain SQL identifiers for configurable table names
pub fn is_valid_table_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
