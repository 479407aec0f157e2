//! Pre-key and one-time-key storage.
//!
//! These are the only operations gated on readiness: the key pools are
//! consulted during identity setup, which races the background schema
//! bootstrap, so every call suspends on [`Store::wait_ready`] first.
//!
//! `pre_keys` holds "the" signed pre-key as its first row — keeping exactly
//! one live row there is the caller's invariant, not enforced here.
//! `one_time_keys` is a consumable pool: each row is used by a single
//! handshake and then deleted by index.

use rusqlite::{params, OptionalExtension};

use crate::codec;
use crate::error::{Result, StoreError};
use crate::models::{KeyPair, PreKeyPair};
use crate::store::Store;

impl Store {
    /// Persist a key-pair and its signature, hex-encoded, into `pre_keys`
    /// (`one_time == false`) or `one_time_keys`.  Returns the assigned
    /// index.
    pub async fn save_pre_keys(&self, pre_keys: &PreKeyPair, one_time: bool) -> Result<i64> {
        self.wait_ready().await?;

        let guard = self.inner.conn.lock().await;
        let conn = guard.as_ref().ok_or(StoreError::Closed)?;

        let table = if one_time { "one_time_keys" } else { "pre_keys" };
        conn.execute(
            &format!(
                "INSERT INTO {table} (private_key, public_key, signature) VALUES (?1, ?2, ?3)"
            ),
            params![
                hex::encode(pre_keys.key_pair.secret),
                hex::encode(pre_keys.key_pair.public),
                hex::encode(&pre_keys.signature),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// The signed pre-key: the first row of `pre_keys`, or `None` if
    /// identity setup has not run yet.
    ///
    /// The key-pair is rebuilt from the stored private half, so the public
    /// key is always consistent with the secret even if the stored copy
    /// were tampered with.
    pub async fn get_pre_keys(&self) -> Result<Option<PreKeyPair>> {
        self.wait_ready().await?;

        let guard = self.inner.conn.lock().await;
        let conn = guard.as_ref().ok_or(StoreError::Closed)?;

        let pre_keys = conn
            .query_row(
                "SELECT id, private_key, signature FROM pre_keys ORDER BY id ASC LIMIT 1",
                [],
                |row| row_to_pre_keys(row, false),
            )
            .optional()?;
        Ok(pre_keys)
    }

    /// Look up a one-time key by index.
    ///
    /// The returned pair carries the index back so the caller can consume
    /// the row with [`Store::delete_one_time_key`] once the handshake
    /// completes.
    pub async fn get_one_time_key(&self, index: i64) -> Result<Option<PreKeyPair>> {
        self.wait_ready().await?;

        let guard = self.inner.conn.lock().await;
        let conn = guard.as_ref().ok_or(StoreError::Closed)?;

        let otk = conn
            .query_row(
                "SELECT id, private_key, signature FROM one_time_keys WHERE id = ?1",
                params![index],
                |row| row_to_pre_keys(row, true),
            )
            .optional()?;
        Ok(otk)
    }

    /// Remove a consumed one-time key.  Deleting a missing index is fine.
    pub async fn delete_one_time_key(&self, index: i64) -> Result<()> {
        self.wait_ready().await?;

        let guard = self.inner.conn.lock().await;
        let conn = guard.as_ref().ok_or(StoreError::Closed)?;

        conn.execute("DELETE FROM one_time_keys WHERE id = ?1", params![index])?;
        Ok(())
    }
}

/// Map a key row to a [`PreKeyPair`], rebuilding the key-pair from the
/// private half.
fn row_to_pre_keys(row: &rusqlite::Row<'_>, with_index: bool) -> rusqlite::Result<PreKeyPair> {
    let index: i64 = row.get(0)?;
    let private_hex: String = row.get(1)?;
    let signature_hex: String = row.get(2)?;

    let secret = codec::decode_key32(1, &private_hex)?;

    Ok(PreKeyPair {
        key_pair: KeyPair::from_secret(secret),
        signature: codec::decode_hex(2, &signature_hex)?,
        index: with_index.then_some(index),
    })
}
