//! Sortable identifiers for gateway connections.

use ulid::Ulid;

const CONNECTION_PREFIX: &str = "conn";

/// A fresh `conn_<ulid>` identifier.
///
/// Ids minted in later milliseconds sort after earlier ones, so log lines
/// keyed by connection id order by connect time.
pub fn connection_id() -> String {
    format!("{CONNECTION_PREFIX}_{}", Ulid::new())
}

/// Timestamp portion of an id produced by [`connection_id`], in unix millis.
///
/// Returns `None` for anything that is not a connection id.
pub fn connected_at_ms(id: &str) -> Option<u64> {
    let (prefix, body) = id.split_once('_')?;
    if prefix != CONNECTION_PREFIX {
        return None;
    }
    Ulid::from_string(body).ok().map(|ulid| ulid.timestamp_ms())
}
