//! CRUD operations for [`Message`] records.
//!
//! Messages are written once and never updated.  History reads are capped
//! at the 100 most recent rows for a conversation partner.

use rusqlite::params;
use uuid::Uuid;

use crate::codec;
use crate::error::{Result, StoreError};
use crate::models::{Direction, Message};
use crate::store::Store;

/// Maximum number of rows returned by [`Store::get_message_history`].
const HISTORY_LIMIT: u32 = 100;

impl Store {
    /// Insert a new message.
    ///
    /// A duplicate `nonce` fails with [`StoreError::Conflict`]; there is no
    /// pre-check beyond the primary-key constraint.
    pub async fn save_message(&self, message: &Message) -> Result<()> {
        let guard = self.inner.conn.lock().await;
        let conn = guard.as_ref().ok_or(StoreError::Closed)?;

        conn.execute(
            "INSERT INTO messages
                 (nonce, sender, recipient, group_id, mail_id, body, direction, timestamp, decrypted)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                message.nonce,
                message.sender.to_string(),
                message.recipient.map(|r| r.to_string()),
                message.group_id.map(|g| g.to_string()),
                message.mail_id.to_string(),
                message.body,
                message.direction.as_str(),
                message.timestamp.to_rfc3339(),
                message.decrypted,
            ],
        )?;
        Ok(())
    }

    /// Delete every message with the given delivery ID (zero or more rows).
    ///
    /// Called when the server acknowledges delivery.  Returns the number of
    /// rows removed; a miss is not an error.
    pub async fn delete_message(&self, mail_id: Uuid) -> Result<usize> {
        tracing::debug!(%mail_id, "deleting message");
        let guard = self.inner.conn.lock().await;
        let conn = guard.as_ref().ok_or(StoreError::Closed)?;

        let affected = conn.execute(
            "DELETE FROM messages WHERE mail_id = ?1",
            params![mail_id.to_string()],
        )?;
        Ok(affected)
    }

    /// The 100 most recent messages exchanged with `user_id` (as sender or
    /// recipient), newest first.
    pub async fn get_message_history(&self, user_id: Uuid) -> Result<Vec<Message>> {
        let guard = self.inner.conn.lock().await;
        let conn = guard.as_ref().ok_or(StoreError::Closed)?;

        let mut stmt = conn.prepare(
            "SELECT nonce, sender, recipient, group_id, mail_id, body, direction, timestamp, decrypted
             FROM messages
             WHERE sender = ?1 OR recipient = ?1
             ORDER BY timestamp DESC
             LIMIT ?2",
        )?;

        let rows = stmt.query_map(params![user_id.to_string(), HISTORY_LIMIT], row_to_message)?;

        let mut messages = Vec::new();
        for row in rows {
            messages.push(row?);
        }
        Ok(messages)
    }

    /// Delete all messages exchanged with `user_id`.
    pub async fn delete_messages_for_user(&self, user_id: Uuid) -> Result<usize> {
        let guard = self.inner.conn.lock().await;
        let conn = guard.as_ref().ok_or(StoreError::Closed)?;

        let affected = conn.execute(
            "DELETE FROM messages WHERE sender = ?1 OR recipient = ?1",
            params![user_id.to_string()],
        )?;
        Ok(affected)
    }

    /// Delete the entire message table (full history wipe).
    pub async fn delete_all_messages(&self) -> Result<usize> {
        tracing::info!("clearing message history");
        let guard = self.inner.conn.lock().await;
        let conn = guard.as_ref().ok_or(StoreError::Closed)?;

        let affected = conn.execute("DELETE FROM messages", [])?;
        Ok(affected)
    }
}

/// Map a `rusqlite::Row` to a [`Message`].
fn row_to_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<Message> {
    let nonce: String = row.get(0)?;
    let sender_str: String = row.get(1)?;
    let recipient_str: Option<String> = row.get(2)?;
    let group_str: Option<String> = row.get(3)?;
    let mail_id_str: String = row.get(4)?;
    let body: String = row.get(5)?;
    let direction_str: String = row.get(6)?;
    let ts_str: String = row.get(7)?;
    let decrypted: bool = row.get(8)?;

    let sender = codec::decode_uuid(1, &sender_str)?;
    let recipient = recipient_str
        .map(|s| codec::decode_uuid(2, &s))
        .transpose()?;
    let group_id = group_str.map(|s| codec::decode_uuid(3, &s)).transpose()?;
    let mail_id = codec::decode_uuid(4, &mail_id_str)?;

    let direction = Direction::from_str(&direction_str).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            6,
            rusqlite::types::Type::Text,
            format!("unknown direction {direction_str:?}").into(),
        )
    })?;

    let timestamp = codec::decode_timestamp(7, &ts_str)?;

    Ok(Message {
        nonce,
        sender,
        recipient,
        group_id,
        mail_id,
        body,
        direction,
        timestamp,
        decrypted,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    async fn open_store() -> Store {
        let store = Store::open_in_memory().unwrap();
        store.wait_ready().await.unwrap();
        store
    }

    fn message_between(nonce: &str, sender: Uuid, recipient: Uuid) -> Message {
        Message {
            nonce: nonce.to_string(),
            sender,
            recipient: Some(recipient),
            group_id: None,
            mail_id: Uuid::new_v4(),
            body: format!("message {nonce}"),
            direction: Direction::Outgoing,
            timestamp: Utc::now(),
            decrypted: true,
        }
    }

    #[tokio::test]
    async fn save_and_read_back() {
        let store = open_store().await;
        let me = Uuid::new_v4();
        let them = Uuid::new_v4();

        let message = message_between("n1", me, them);
        store.save_message(&message).await.unwrap();

        let history = store.get_message_history(them).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].nonce, "n1");
        assert_eq!(history[0].direction, Direction::Outgoing);
        // timestamp comes back as a real point in time, not SQLite text
        assert_eq!(history[0].timestamp, message.timestamp);
    }

    #[tokio::test]
    async fn duplicate_nonce_conflicts() {
        let store = open_store().await;
        let me = Uuid::new_v4();
        let them = Uuid::new_v4();

        store
            .save_message(&message_between("dup", me, them))
            .await
            .unwrap();
        let err = store
            .save_message(&message_between("dup", me, them))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn history_is_newest_first() {
        let store = open_store().await;
        let me = Uuid::new_v4();
        let them = Uuid::new_v4();
        let base = Utc::now();

        for (nonce, offset) in [("t1", 0), ("t2", 1), ("t3", 2)] {
            let mut message = message_between(nonce, me, them);
            message.timestamp = base + Duration::seconds(offset);
            store.save_message(&message).await.unwrap();
        }

        let history = store.get_message_history(me).await.unwrap();
        let nonces: Vec<&str> = history.iter().map(|m| m.nonce.as_str()).collect();
        assert_eq!(nonces, vec!["t3", "t2", "t1"]);
    }

    #[tokio::test]
    async fn history_is_capped_at_100() {
        let store = open_store().await;
        let me = Uuid::new_v4();
        let them = Uuid::new_v4();
        let base = Utc::now();

        for i in 0..150 {
            let mut message = message_between(&format!("n{i}"), me, them);
            message.timestamp = base + Duration::seconds(i);
            store.save_message(&message).await.unwrap();
        }

        let history = store.get_message_history(me).await.unwrap();
        assert_eq!(history.len(), 100);
        // the 100 most recent: n149 down to n50
        assert_eq!(history[0].nonce, "n149");
        assert_eq!(history[99].nonce, "n50");
    }

    #[tokio::test]
    async fn delete_by_mail_id_is_idempotent() {
        let store = open_store().await;
        let me = Uuid::new_v4();
        let them = Uuid::new_v4();

        let message = message_between("del", me, them);
        store.save_message(&message).await.unwrap();

        assert_eq!(store.delete_message(message.mail_id).await.unwrap(), 1);
        assert_eq!(store.delete_message(message.mail_id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn scoped_and_full_wipes() {
        let store = open_store().await;
        let me = Uuid::new_v4();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();

        store
            .save_message(&message_between("a1", me, alice))
            .await
            .unwrap();
        store
            .save_message(&message_between("b1", bob, me))
            .await
            .unwrap();

        assert_eq!(store.delete_messages_for_user(alice).await.unwrap(), 1);
        assert_eq!(store.get_message_history(bob).await.unwrap().len(), 1);

        assert_eq!(store.delete_all_messages().await.unwrap(), 1);
        assert!(store.get_message_history(bob).await.unwrap().is_empty());
    }
}
