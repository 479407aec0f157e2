//! Domain model structs persisted in the local SQLite database.
//!
//! Every struct derives `Serialize` and `Deserialize` so it can be handed
//! directly to the UI layer over IPC.  Binary key material lives in these
//! structs as raw bytes; hex conversion happens inside the store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use x25519_dalek::{PublicKey, StaticSecret};

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// Whether a message was received or sent by this device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Incoming,
    Outgoing,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Incoming => "incoming",
            Direction::Outgoing => "outgoing",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "incoming" => Some(Direction::Incoming),
            "outgoing" => Some(Direction::Outgoing),
            _ => None,
        }
    }
}

/// A single locally-known message.
///
/// Rows are written once and never updated; they are removed either by
/// delivery acknowledgement (`mail_id`) or by a history-clear operation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    /// Hex-encoded encryption nonce; the sole identity of a message row.
    pub nonce: String,
    /// User ID of the sender.
    pub sender: Uuid,
    /// User ID of the recipient; `None` for group messages.
    pub recipient: Option<Uuid>,
    /// Group/channel ID; `None` for direct messages.
    pub group_id: Option<Uuid>,
    /// Server-assigned delivery identifier, used for deletion on ack.
    pub mail_id: Uuid,
    /// Message payload; ciphertext until `decrypted` is set.
    pub body: String,
    /// Incoming or outgoing.
    pub direction: Direction,
    /// When the message was sent.
    pub timestamp: DateTime<Utc>,
    /// Whether `body` holds decrypted plaintext.
    pub decrypted: bool,
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// Which side of the handshake this device was on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionMode {
    Initiator,
    Receiver,
}

impl SessionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionMode::Initiator => "initiator",
            SessionMode::Receiver => "receiver",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "initiator" => Some(SessionMode::Initiator),
            "receiver" => Some(SessionMode::Receiver),
            _ => None,
        }
    }
}

/// A negotiated session with a remote device.
///
/// `sk` is unique across all sessions.  Callers treat the most-recently-used
/// session for a user as the current one; rows are never deleted here
/// (revocation happens elsewhere).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Session {
    /// Unique session identifier.
    pub session_id: Uuid,
    /// Remote identity that owns the session.
    pub user_id: Uuid,
    /// Negotiated session key (32 bytes), stored as hex in SQLite.
    pub sk: [u8; 32],
    /// Remote device X25519 public key (32 bytes), stored as hex.
    pub public_key: [u8; 32],
    /// Derived verification fingerprint, stored as hex.
    pub fingerprint: Vec<u8>,
    /// Handshake role.
    pub mode: SessionMode,
    /// Bumped on every use; drives most-recently-used selection.
    pub last_used: DateTime<Utc>,
    /// Whether the user has verified the fingerprint out of band.
    pub verified: bool,
}

// ---------------------------------------------------------------------------
// Pre-keys
// ---------------------------------------------------------------------------

/// An X25519 key-pair.  Only the secret half is persisted; the public half
/// is re-derived deterministically on load.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct KeyPair {
    /// X25519 secret key (32 bytes), stored as hex.
    pub secret: [u8; 32],
    /// X25519 public key (32 bytes).
    pub public: [u8; 32],
}

impl KeyPair {
    /// Rebuild the full key-pair from the secret half.
    pub fn from_secret(secret: [u8; 32]) -> Self {
        let sk = StaticSecret::from(secret);
        let public = PublicKey::from(&sk).to_bytes();
        Self { secret, public }
    }
}

/// A signed pre-key or one-time key-pair used for asynchronous session
/// establishment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PreKeyPair {
    /// The key-pair itself.
    pub key_pair: KeyPair,
    /// Signature over the public half, proving authenticity.
    pub signature: Vec<u8>,
    /// Table index; set on one-time-key reads so the caller can consume
    /// (delete) the row afterwards.
    pub index: Option<i64>,
}
