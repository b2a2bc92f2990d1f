//! Peer bookkeeping and state flooding
//!
//! Records are replaced wholesale by whatever arrives (last write wins).
//! The claimed id is never checked against the link it arrived on.

use std::collections::HashMap;

use tracing::{debug, info};

use super::mesh::{ConnId, PeerLink};
use super::protocol::{decode, encode, PeerState, ProtocolError, WireState};

/// One remote player as last heard from
#[derive(Debug, Clone)]
pub struct RemotePeerRecord {
    pub id: String,
    pub link: PeerLink,
    /// `None` until the first message arrives
    pub state: Option<PeerState>,
}

/// Peer mapping owned by the frame loop
#[derive(Debug, Default)]
pub struct Session {
    peers: HashMap<String, RemotePeerRecord>,
    links: HashMap<ConnId, PeerLink>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a fresh connection and greet it with the local snapshot.
    /// A peer that is already known keeps its last state.
    pub fn on_connected(&mut self, link: PeerLink, snapshot: &WireState) -> Result<(), ProtocolError> {
        let id = link.remote_key().to_string();
        info!(peer = %id, conn = %link.conn(), "Peer registered");

        self.links.insert(link.conn(), link.clone());
        self.peers
            .entry(id.clone())
            .and_modify(|record| record.link = link.clone())
            .or_insert_with(|| RemotePeerRecord {
                id,
                link: link.clone(),
                state: None,
            });

        let payload = encode(snapshot)?;
        if !link.send(payload) {
            debug!(conn = %link.conn(), "Initial snapshot dropped, link gone");
        }
        Ok(())
    }

    /// Replace the record for the sender's claimed id.
    /// Returns the id that was written.
    pub fn on_data(&mut self, conn: ConnId, payload: &[u8]) -> Result<Option<String>, ProtocolError> {
        let state = decode(payload)?;

        let Some(link) = self.links.get(&conn) else {
            debug!(conn = %conn, "Message on unknown connection, dropping");
            return Ok(None);
        };

        let id = state.id.clone();
        self.peers.insert(
            id.clone(),
            RemotePeerRecord {
                id: id.clone(),
                link: link.clone(),
                state: Some(state),
            },
        );
        Ok(Some(id))
    }

    /// Forget the connection and every record that arrived over it.
    /// Records move to another live link from the same remote key instead.
    pub fn on_closed(&mut self, conn: ConnId) -> usize {
        let fallback = self.links.remove(&conn).and_then(|closed| {
            self.links
                .values()
                .find(|link| link.remote_key() == closed.remote_key())
                .cloned()
        });

        if let Some(fallback) = fallback {
            let mut rebound = 0;
            for record in self.peers.values_mut().filter(|r| r.link.conn() == conn) {
                record.link = fallback.clone();
                rebound += 1;
            }
            info!(conn = %conn, to = %fallback.conn(), rebound, "Peer link closed, records kept");
            return 0;
        }

        let before = self.peers.len();
        self.peers.retain(|_, record| record.link.conn() != conn);
        let removed = before - self.peers.len();
        info!(conn = %conn, removed, "Peer disconnected");
        removed
    }

    /// Flood the local state to every connected link.
    /// Returns how many links accepted the message.
    pub fn broadcast(&self, snapshot: &WireState) -> Result<usize, ProtocolError> {
        let payload = encode(snapshot)?;
        let mut sent = 0;
        for link in self.links.values() {
            if link.send(payload.clone()) {
                sent += 1;
            } else {
                debug!(conn = %link.conn(), "Broadcast dropped, link gone");
            }
        }
        Ok(sent)
    }

    /// Drop peers whose last known health is zero or below
    pub fn prune_dead(&mut self) -> usize {
        let before = self.peers.len();
        self.peers.retain(|id, record| match &record.state {
            Some(state) if state.health <= 0 => {
                info!(peer = %id, "Peer eliminated");
                false
            }
            _ => true,
        });
        before - self.peers.len()
    }

    #[cfg(test)]
    pub fn get(&self, id: &str) -> Option<&RemotePeerRecord> {
        self.peers.get(id)
    }

    /// Last state of one peer, if it has sent any
    pub fn state_mut(&mut self, id: &str) -> Option<&mut PeerState> {
        self.peers.get_mut(id).and_then(|r| r.state.as_mut())
    }

    pub fn peers(&self) -> impl Iterator<Item = &RemotePeerRecord> {
        self.peers.values()
    }

    /// Records that have received at least one state
    pub fn states(&self) -> impl Iterator<Item = &PeerState> {
        self.peers.values().filter_map(|r| r.state.as_ref())
    }

    pub fn states_mut(&mut self) -> Vec<&mut PeerState> {
        self.peers
            .values_mut()
            .filter_map(|r| r.state.as_mut())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use tokio::sync::mpsc;
    use uuid::Uuid;

    fn link(key: &str) -> (PeerLink, mpsc::UnboundedReceiver<Bytes>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (PeerLink::new(Uuid::new_v4(), key.to_string(), tx), rx)
    }

    fn state(id: &str, health: i32) -> WireState {
        WireState {
            id: id.to_string(),
            x: 4.0,
            y: 5.0,
            a: 0.0,
            health,
            bullets: Vec::new(),
            ready: false,
        }
    }

    #[test]
    fn connection_registers_and_greets() {
        let mut session = Session::new();
        let (peer, mut rx) = link("bb");
        let local = state("aa", 100);

        session.on_connected(peer, &local).unwrap();

        assert_eq!(session.len(), 1);
        assert!(session.get("bb").unwrap().state.is_none());
        let greeting = rx.try_recv().unwrap();
        assert_eq!(decode(&greeting).unwrap(), local);
    }

    #[test]
    fn close_removes_never_updated_record() {
        let mut session = Session::new();
        let (peer, _rx) = link("bb");
        let conn = peer.conn();
        session.on_connected(peer, &state("aa", 100)).unwrap();

        assert_eq!(session.on_closed(conn), 1);
        assert!(session.is_empty());
        assert_eq!(session.link_count(), 0);
    }

    #[test]
    fn data_replaces_record_for_claimed_id() {
        let mut session = Session::new();
        let (peer, _rx) = link("bb");
        let conn = peer.conn();
        session.on_connected(peer, &state("aa", 100)).unwrap();

        let first = encode(&state("bb", 100)).unwrap();
        session.on_data(conn, &first).unwrap();
        let second = encode(&state("bb", 35)).unwrap();
        session.on_data(conn, &second).unwrap();

        assert_eq!(session.len(), 1);
        assert_eq!(session.get("bb").unwrap().state.as_ref().unwrap().health, 35);
    }

    #[test]
    fn claimed_id_is_not_checked_against_link() {
        let mut session = Session::new();
        let (peer, _rx) = link("bb");
        let conn = peer.conn();
        session.on_connected(peer, &state("aa", 100)).unwrap();

        let spoofed = encode(&state("zz", 1)).unwrap();
        assert_eq!(session.on_data(conn, &spoofed).unwrap(), Some("zz".to_string()));
        assert_eq!(session.len(), 2);

        // Both records go away with the link that carried them
        assert_eq!(session.on_closed(conn), 2);
        assert!(session.is_empty());
    }

    #[test]
    fn malformed_payload_is_an_error_and_changes_nothing() {
        let mut session = Session::new();
        let (peer, _rx) = link("bb");
        let conn = peer.conn();
        session.on_connected(peer, &state("aa", 100)).unwrap();

        assert!(session.on_data(conn, b"{oops").is_err());
        assert!(session.get("bb").unwrap().state.is_none());
    }

    #[test]
    fn broadcast_reaches_every_link_once() {
        let mut session = Session::new();
        let (b, mut b_rx) = link("bb");
        let (c, mut c_rx) = link("cc");
        let b_conn = b.conn();
        session.on_connected(b, &state("aa", 100)).unwrap();
        session.on_connected(c, &state("aa", 100)).unwrap();
        b_rx.try_recv().unwrap();
        c_rx.try_recv().unwrap();

        // A second id claimed on b does not double the traffic
        session.on_data(b_conn, &encode(&state("b2", 100)).unwrap()).unwrap();

        let sent = session.broadcast(&state("aa", 90)).unwrap();
        assert_eq!(sent, 2);
        assert_eq!(decode(&b_rx.try_recv().unwrap()).unwrap().health, 90);
        assert_eq!(decode(&c_rx.try_recv().unwrap()).unwrap().health, 90);
        assert!(b_rx.try_recv().is_err());
    }

    #[test]
    fn prune_dead_drops_eliminated_peers() {
        let mut session = Session::new();
        let (b, _b_rx) = link("bb");
        let b_conn = b.conn();
        session.on_connected(b, &state("aa", 100)).unwrap();
        session.on_data(b_conn, &encode(&state("bb", 0)).unwrap()).unwrap();

        assert_eq!(session.prune_dead(), 1);
        assert!(session.is_empty());
        // The link stays, so the peer can come back with its next message
        assert_eq!(session.link_count(), 1);
    }

    #[test]
    fn send_to_closed_link_is_not_counted() {
        let mut session = Session::new();
        let (b, b_rx) = link("bb");
        session.on_connected(b, &state("aa", 100)).unwrap();
        drop(b_rx);

        assert_eq!(session.broadcast(&state("aa", 100)).unwrap(), 0);
    }

    #[test]
    fn reconnect_keeps_known_state() {
        let mut session = Session::new();
        let (first, _first_rx) = link("bb");
        let first_conn = first.conn();
        session.on_connected(first, &state("aa", 100)).unwrap();
        session.on_data(first_conn, &encode(&state("bb", 60)).unwrap()).unwrap();

        let (second, _second_rx) = link("bb");
        let second_conn = second.conn();
        session.on_connected(second, &state("aa", 100)).unwrap();

        let record = session.get("bb").unwrap();
        assert_eq!(record.link.conn(), second_conn);
        assert_eq!(record.state.as_ref().unwrap().health, 60);
        assert_eq!(session.link_count(), 2);
    }

    #[test]
    fn closing_one_of_two_links_to_a_peer_keeps_it() {
        let mut session = Session::new();
        let (first, _first_rx) = link("bb");
        let (second, _second_rx) = link("bb");
        let first_conn = first.conn();
        let second_conn = second.conn();
        session.on_connected(first, &state("aa", 100)).unwrap();
        session.on_connected(second, &state("aa", 100)).unwrap();

        // Data on the first link binds the record back to it
        session.on_data(first_conn, &encode(&state("bb", 70)).unwrap()).unwrap();
        assert_eq!(session.get("bb").unwrap().link.conn(), first_conn);

        assert_eq!(session.on_closed(first_conn), 0);
        let record = session.get("bb").unwrap();
        assert_eq!(record.link.conn(), second_conn);
        assert_eq!(record.state.as_ref().unwrap().health, 70);

        assert_eq!(session.on_closed(second_conn), 1);
        assert!(session.is_empty());
        assert_eq!(session.link_count(), 0);
    }

    #[test]
    fn state_mut_reaches_only_updated_records() {
        let mut session = Session::new();
        let (b, _b_rx) = link("bb");
        let b_conn = b.conn();
        session.on_connected(b, &state("aa", 100)).unwrap();
        assert!(session.state_mut("bb").is_none());

        session.on_data(b_conn, &encode(&state("bb", 100)).unwrap()).unwrap();
        session.state_mut("bb").unwrap().health = 5;
        assert_eq!(session.get("bb").unwrap().state.as_ref().unwrap().health, 5);
        assert!(session.state_mut("cc").is_none());
    }
}
