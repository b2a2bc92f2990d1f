//! Peer-to-peer wire protocol
//! One JSON object per message, no version, sequence, or signature

use bytes::Bytes;
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Projectile as carried in a state message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireBullet {
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
}

/// Full state of one player, flooded to every connected peer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireState {
    /// Claimed sender id (public key hex), trusted verbatim
    pub id: String,
    pub x: f32,
    pub y: f32,
    /// Heading in radians
    pub a: f32,
    pub health: i32,
    /// Absent from peers that predate projectiles
    #[serde(default)]
    pub bullets: Vec<WireBullet>,
    /// Absent from peers without the lobby
    #[serde(default)]
    pub ready: bool,
}

/// Last state received from a peer
pub type PeerState = WireState;

/// First line on every mesh connection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Handshake {
    /// Hex topic hash
    pub topic: String,
    /// Sender public key hex
    pub key: String,
}

pub fn encode(state: &WireState) -> Result<Bytes, ProtocolError> {
    serde_json::to_vec(state)
        .map(Bytes::from)
        .map_err(ProtocolError::Encode)
}

pub fn decode(payload: &[u8]) -> Result<WireState, ProtocolError> {
    serde_json::from_slice(payload).map_err(ProtocolError::Malformed)
}

pub fn encode_handshake(handshake: &Handshake) -> Result<Bytes, ProtocolError> {
    serde_json::to_vec(handshake)
        .map(Bytes::from)
        .map_err(ProtocolError::Encode)
}

pub fn decode_handshake(payload: &[u8]) -> Result<Handshake, ProtocolError> {
    serde_json::from_slice(payload).map_err(ProtocolError::Malformed)
}

/// Rendezvous topic: SHA-256 of the application id, lowercase hex
pub fn topic_hash(app_id: &str) -> String {
    hex::encode(Sha256::digest(app_id.as_bytes()))
}

/// Fresh 32-byte identity rendered as lowercase hex
pub fn generate_key<R: Rng + ?Sized>(rng: &mut R) -> String {
    let bytes: [u8; 32] = rng.gen();
    hex::encode(bytes)
}

/// Protocol errors
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("Malformed peer message: {0}")]
    Malformed(#[source] serde_json::Error),

    #[error("Failed to encode message: {0}")]
    Encode(#[source] serde_json::Error),
}
