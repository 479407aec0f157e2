//! Hex <-> bytes helpers shared by the row mappers.
//!
//! SQLite only ever sees lower-case hex text for key material; these helpers
//! convert back to bytes inside `rusqlite` row closures, reporting failures
//! as `FromSqlConversionFailure` so they surface through the normal query
//! error path.

use rusqlite::types::Type;

/// Decode a hex column into raw bytes.
pub(crate) fn decode_hex(idx: usize, s: &str) -> rusqlite::Result<Vec<u8>> {
    hex::decode(s).map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Decode a hex column that must hold exactly 32 bytes (keys, SKs).
pub(crate) fn decode_key32(idx: usize, s: &str) -> rusqlite::Result<[u8; 32]> {
    let bytes = decode_hex(idx, s)?;
    let mut out = [0u8; 32];
    if bytes.len() != 32 {
        return Err(rusqlite::Error::FromSqlConversionFailure(
            idx,
            Type::Text,
            Box::new(hex::FromHexError::InvalidStringLength),
        ));
    }
    out.copy_from_slice(&bytes);
    Ok(out)
}

/// Parse an RFC 3339 timestamp column.
pub(crate) fn decode_timestamp(
    idx: usize,
    s: &str,
) -> rusqlite::Result<chrono::DateTime<chrono::Utc>> {
    chrono::DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&chrono::Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Parse a UUID column.
pub(crate) fn decode_uuid(idx: usize, s: &str) -> rusqlite::Result<uuid::Uuid> {
    uuid::Uuid::parse_str(s)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}
