//! CRUD operations for [`Session`] records.
//!
//! Key material (`sk`, `public_key`, `fingerprint`) is hex text inside
//! SQLite and raw bytes everywhere else; the row mapper owns the decode.
//! Sessions are never deleted here — revocation is handled by the session
//! negotiation layer.

use chrono::Utc;
use rusqlite::{params, OptionalExtension};
use uuid::Uuid;

use crate::codec;
use crate::error::{Result, StoreError};
use crate::models::{Session, SessionMode};
use crate::store::Store;

const SESSION_COLUMNS: &str =
    "session_id, user_id, sk, public_key, fingerprint, mode, last_used, verified";

impl Store {
    /// Insert a newly negotiated session.
    ///
    /// `sk` is unique across all sessions; a collision fails with
    /// [`StoreError::Conflict`].
    pub async fn save_session(&self, session: &Session) -> Result<()> {
        let guard = self.inner.conn.lock().await;
        let conn = guard.as_ref().ok_or(StoreError::Closed)?;

        conn.execute(
            "INSERT INTO sessions
                 (session_id, user_id, sk, public_key, fingerprint, mode, last_used, verified)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                session.session_id.to_string(),
                session.user_id.to_string(),
                hex::encode(session.sk),
                hex::encode(session.public_key),
                hex::encode(&session.fingerprint),
                session.mode.as_str(),
                session.last_used.to_rfc3339(),
                session.verified,
            ],
        )?;
        Ok(())
    }

    /// Look up a session by the remote device's public key.
    pub async fn get_session_by_public_key(
        &self,
        public_key: &[u8; 32],
    ) -> Result<Option<Session>> {
        let guard = self.inner.conn.lock().await;
        let conn = guard.as_ref().ok_or(StoreError::Closed)?;

        let session = conn
            .query_row(
                &format!(
                    "SELECT {SESSION_COLUMNS} FROM sessions WHERE public_key = ?1 LIMIT 1"
                ),
                params![hex::encode(public_key)],
                row_to_session,
            )
            .optional()?;
        Ok(session)
    }

    /// The current session for `user_id`: the most-recently-used row.
    pub async fn get_session(&self, user_id: Uuid) -> Result<Option<Session>> {
        let guard = self.inner.conn.lock().await;
        let conn = guard.as_ref().ok_or(StoreError::Closed)?;

        let session = conn
            .query_row(
                &format!(
                    "SELECT {SESSION_COLUMNS} FROM sessions
                     WHERE user_id = ?1
                     ORDER BY last_used DESC
                     LIMIT 1"
                ),
                params![user_id.to_string()],
                row_to_session,
            )
            .optional()?;
        Ok(session)
    }

    /// All known sessions, most recently used first.
    pub async fn get_sessions(&self) -> Result<Vec<Session>> {
        let guard = self.inner.conn.lock().await;
        let conn = guard.as_ref().ok_or(StoreError::Closed)?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {SESSION_COLUMNS} FROM sessions ORDER BY last_used DESC"
        ))?;
        let rows = stmt.query_map([], row_to_session)?;

        let mut sessions = Vec::new();
        for row in rows {
            sessions.push(row?);
        }
        Ok(sessions)
    }

    /// Bump `last_used` to now for the matching session.
    pub async fn mark_session_used(&self, session_id: Uuid) -> Result<()> {
        let guard = self.inner.conn.lock().await;
        let conn = guard.as_ref().ok_or(StoreError::Closed)?;

        conn.execute(
            "UPDATE sessions SET last_used = ?1 WHERE session_id = ?2",
            params![Utc::now().to_rfc3339(), session_id.to_string()],
        )?;
        Ok(())
    }

    /// Record the outcome of an out-of-band fingerprint verification.
    pub async fn mark_session_verified(&self, session_id: Uuid, verified: bool) -> Result<()> {
        let guard = self.inner.conn.lock().await;
        let conn = guard.as_ref().ok_or(StoreError::Closed)?;

        conn.execute(
            "UPDATE sessions SET verified = ?1 WHERE session_id = ?2",
            params![verified, session_id.to_string()],
        )?;
        Ok(())
    }
}

/// Map a `rusqlite::Row` to a [`Session`], decoding hex key material back
/// to bytes.
fn row_to_session(row: &rusqlite::Row<'_>) -> rusqlite::Result<Session> {
    let session_id_str: String = row.get(0)?;
    let user_id_str: String = row.get(1)?;
    let sk_hex: String = row.get(2)?;
    let public_key_hex: String = row.get(3)?;
    let fingerprint_hex: String = row.get(4)?;
    let mode_str: String = row.get(5)?;
    let last_used_str: String = row.get(6)?;
    let verified: bool = row.get(7)?;

    let mode = SessionMode::from_str(&mode_str).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            5,
            rusqlite::types::Type::Text,
            format!("unknown session mode {mode_str:?}").into(),
        )
    })?;

    Ok(Session {
        session_id: codec::decode_uuid(0, &session_id_str)?,
        user_id: codec::decode_uuid(1, &user_id_str)?,
        sk: codec::decode_key32(2, &sk_hex)?,
        public_key: codec::decode_key32(3, &public_key_hex)?,
        fingerprint: codec::decode_hex(4, &fingerprint_hex)?,
        mode,
        last_used: codec::decode_timestamp(6, &last_used_str)?,
        verified,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    async fn open_store() -> Store {
        let store = Store::open_in_memory().unwrap();
        store.wait_ready().await.unwrap();
        store
    }

    fn test_session(user_id: Uuid, sk_byte: u8) -> Session {
        Session {
            session_id: Uuid::new_v4(),
            user_id,
            sk: [sk_byte; 32],
            public_key: [sk_byte.wrapping_add(1); 32],
            fingerprint: vec![0xF0, 0x0D, sk_byte],
            mode: SessionMode::Initiator,
            last_used: Utc::now(),
            verified: false,
        }
    }

    #[tokio::test]
    async fn key_material_round_trips() {
        let store = open_store().await;
        let user = Uuid::new_v4();
        let session = test_session(user, 0x11);

        store.save_session(&session).await.unwrap();
        let loaded = store.get_session(user).await.unwrap().unwrap();

        assert_eq!(loaded.sk, session.sk);
        assert_eq!(loaded.public_key, session.public_key);
        assert_eq!(loaded.fingerprint, session.fingerprint);
        assert_eq!(loaded.mode, SessionMode::Initiator);
    }

    #[tokio::test]
    async fn duplicate_sk_conflicts() {
        let store = open_store().await;
        let user = Uuid::new_v4();

        store.save_session(&test_session(user, 0x22)).await.unwrap();
        let err = store
            .save_session(&test_session(user, 0x22))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn lookup_by_public_key() {
        let store = open_store().await;
        let session = test_session(Uuid::new_v4(), 0x33);
        store.save_session(&session).await.unwrap();

        let found = store
            .get_session_by_public_key(&session.public_key)
            .await
            .unwrap();
        assert_eq!(found.map(|s| s.session_id), Some(session.session_id));

        let missing = store.get_session_by_public_key(&[0xEE; 32]).await.unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn missing_user_returns_none() {
        let store = open_store().await;
        assert!(store.get_session(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn most_recently_used_wins() {
        let store = open_store().await;
        let user = Uuid::new_v4();

        let mut older = test_session(user, 0x44);
        older.last_used = Utc::now() - Duration::hours(1);
        let newer = test_session(user, 0x55);

        store.save_session(&older).await.unwrap();
        store.save_session(&newer).await.unwrap();

        let current = store.get_session(user).await.unwrap().unwrap();
        assert_eq!(current.session_id, newer.session_id);

        // touching the older session makes it current again
        store.mark_session_used(older.session_id).await.unwrap();
        let current = store.get_session(user).await.unwrap().unwrap();
        assert_eq!(current.session_id, older.session_id);
    }

    #[tokio::test]
    async fn verified_is_a_strict_bool() {
        let store = open_store().await;
        let session = test_session(Uuid::new_v4(), 0x66);
        store.save_session(&session).await.unwrap();

        let sessions = store.get_sessions().await.unwrap();
        assert_eq!(sessions.len(), 1);
        assert!(!sessions[0].verified);

        store
            .mark_session_verified(session.session_id, true)
            .await
            .unwrap();
        let sessions = store.get_sessions().await.unwrap();
        assert!(sessions[0].verified);
    }
}
