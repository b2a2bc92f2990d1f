//! The single-threaded frame loop
//!
//! Key events, mesh events and the frame tick are multiplexed on one task,
//! so the game state and the peer session are never shared.

use std::io;
use std::time::Instant;

use crossterm::event::{Event, KeyEvent};
use futures::{Stream, StreamExt};
use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, trace, warn};

use crate::game::state::FrameReport;
use crate::game::{Command, GameState, Phase, SnapshotBuilder};
use crate::net::{MeshEvent, Session, WireState};
use crate::render::{present, Compositor, Frame, Hud, RayConfig, RenderSurface, RosterEntry, SceneView};
use crate::util::time::{frame_period, FrameClock};

use super::state::AppState;

pub struct FrameLoop<S: RenderSurface> {
    app: AppState,
    game: GameState,
    session: Session,
    compositor: Compositor,
    surface: S,
    clock: FrameClock,
    snapshots: SnapshotBuilder,
}

impl<S: RenderSurface> FrameLoop<S> {
    pub fn new(app: AppState, surface: S) -> Self {
        let game = GameState::new(
            app.world.clone(),
            app.local_id.clone(),
            app.sim_settings(),
            app.seed,
        );
        let compositor = Compositor::new(
            RayConfig::with_width(app.config.screen_width),
            app.config.screen_height,
        );
        let snapshots = SnapshotBuilder::new(app.config.broadcast);

        Self {
            app,
            game,
            session: Session::new(),
            compositor,
            surface,
            clock: FrameClock::new(),
            snapshots,
        }
    }

    /// Run until the quit key or the end of the key stream
    pub async fn run<K>(
        mut self,
        mut keys: K,
        mut mesh: mpsc::UnboundedReceiver<MeshEvent>,
    ) -> anyhow::Result<()>
    where
        K: Stream<Item = io::Result<Event>> + Unpin,
    {
        let mut ticker = interval(frame_period(self.app.config.frame_rate));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        self.surface.clear()?;
        info!(player = %self.app.local_id, "Frame loop started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.frame(Instant::now())?;
                }
                key = keys.next() => match key {
                    Some(Ok(Event::Key(key))) => {
                        if self.handle_key(&key) {
                            info!("Quit requested");
                            return Ok(());
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return Err(e.into()),
                    None => {
                        info!("Key stream ended");
                        return Ok(());
                    }
                },
                Some(event) = mesh.recv() => {
                    self.handle_mesh(event);
                }
            }
        }
    }

    /// Queue the key's command. Returns true when it asks to quit.
    pub fn handle_key(&mut self, key: &KeyEvent) -> bool {
        let Some(command) = Command::from_key(key) else {
            return false;
        };
        if command == Command::Quit {
            return true;
        }
        self.game.queue(command);
        self.snapshots.note_input();
        false
    }

    pub fn handle_mesh(&mut self, event: MeshEvent) {
        match event {
            MeshEvent::Connected(link) => {
                let snapshot = self.snapshot();
                if let Err(e) = self.session.on_connected(link, &snapshot) {
                    warn!(error = %e, "Failed to greet peer");
                }
                debug!(peers = self.session.len(), links = self.session.link_count(), "Session grew");
            }
            MeshEvent::Data { conn, payload } => match self.session.on_data(conn, &payload) {
                Ok(Some(id)) => {
                    trace!(peer = %id, "Peer state updated");
                    if let Some(state) = self.session.state_mut(&id) {
                        let hits = self.game.absorb_hits(state);
                        if hits > 0 {
                            debug!(peer = %id, hits, health = self.game.player.health, "Hit by peer");
                        }
                    }
                }
                Ok(None) => {}
                Err(e) => warn!(conn = %conn, error = %e, "Dropping malformed peer message"),
            },
            MeshEvent::Closed { conn } => {
                self.session.on_closed(conn);
                if self.session.is_empty() {
                    debug!(links = self.session.link_count(), "No peers left");
                }
            }
        }
    }

    /// Simulate, draw and flood one frame
    pub fn frame(&mut self, now: Instant) -> anyhow::Result<FrameReport> {
        let dt = self.clock.tick(now);

        let report = {
            let mut peers = self.session.states_mut();
            self.game.simulate(dt, now, &mut peers)
        };
        if report.hits_dealt > 0 || report.hits_taken > 0 {
            debug!(
                dealt = report.hits_dealt,
                taken = report.hits_taken,
                health = self.game.player.health,
                "Hits resolved"
            );
        }

        if self.app.config.lobby {
            self.session.prune_dead();
        }

        let frame = match self.game.phase {
            Phase::Lobby => self.compositor.compose_lobby(&self.roster()),
            Phase::Game => self.compose_arena(),
        };
        present(&mut self.surface, &frame)?;

        if self.snapshots.should_send() {
            let snapshot = self.snapshot();
            self.session.broadcast(&snapshot)?;
            self.game.retire_spent();
        }

        Ok(report)
    }

    fn snapshot(&self) -> WireState {
        SnapshotBuilder::build(&self.game.player, &self.game.projectiles)
    }

    fn compose_arena(&self) -> Frame {
        let peers: Vec<(f32, f32)> = self.session.states().map(|s| (s.x, s.y)).collect();
        let remote_projectiles: Vec<(f32, f32)> = self
            .session
            .states()
            .flat_map(|s| s.bullets.iter().map(|b| (b.x, b.y)))
            .collect();
        let projectiles: Vec<(f32, f32)> = self
            .game
            .projectiles
            .iter()
            .filter(|p| p.in_flight())
            .map(|p| (p.x, p.y))
            .collect();

        let pose = self.game.player.pose;
        let view = SceneView {
            world: self.game.world(),
            pose,
            peers: &peers,
            projectiles: &projectiles,
            remote_projectiles: &remote_projectiles,
            hud: Hud {
                x: pose.x,
                y: pose.y,
                heading: pose.heading,
                health: self.game.player.health,
                fps: self.clock.fps(),
            },
        };
        self.compositor.compose(&view)
    }

    /// Local player first, then peers by id
    fn roster(&self) -> Vec<RosterEntry> {
        let player = &self.game.player;
        let mut roster = vec![RosterEntry {
            id: player.local_id.clone(),
            health: Some(player.health),
            ready: player.ready,
            is_local: true,
        }];

        let mut peers: Vec<RosterEntry> = self
            .session
            .peers()
            .map(|record| RosterEntry {
                id: record.id.clone(),
                health: record.state.as_ref().map(|s| s.health),
                ready: record.state.as_ref().is_some_and(|s| s.ready),
                is_local: false,
            })
            .collect();
        peers.sort_by(|a, b| a.id.cmp(&b.id));
        roster.extend(peers);
        roster
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BroadcastPolicy, Config};
    use crate::game::Pose;
    use crate::net::protocol::{decode, encode};
    use crate::net::mesh::PeerLink;
    use crate::net::protocol::WireBullet;
    use crate::render::surface::testing::RecordingSurface;
    use bytes::Bytes;
    use crossterm::event::{KeyCode, KeyModifiers};
    use std::time::Duration;
    use uuid::Uuid;

    fn app(config: Config) -> AppState {
        AppState::new(Config {
            rng_seed: Some(3),
            ..config
        })
    }

    fn frame_loop(config: Config) -> FrameLoop<RecordingSurface> {
        FrameLoop::new(app(config), RecordingSurface::default())
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn peer_link(key: &str) -> (PeerLink, mpsc::UnboundedReceiver<Bytes>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (PeerLink::new(Uuid::new_v4(), key.to_string(), tx), rx)
    }

    fn remote(id: &str, x: f32, y: f32, health: i32) -> WireState {
        WireState {
            id: id.to_string(),
            x,
            y,
            a: 0.0,
            health,
            bullets: Vec::new(),
            ready: true,
        }
    }

    fn screen_contains(frame_loop: &FrameLoop<RecordingSurface>, needle: &str) -> bool {
        frame_loop.surface.written().iter().any(|row| row.contains(needle))
    }

    #[test]
    fn ctrl_c_quits_and_other_keys_queue() {
        let mut frame_loop = frame_loop(Config::default());
        assert!(!frame_loop.handle_key(&key(KeyCode::Up)));
        assert!(!frame_loop.handle_key(&key(KeyCode::Char('z'))));
        assert!(frame_loop.handle_key(&KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)));
    }

    #[test]
    fn lobby_renders_roster_until_enter() {
        let mut frame_loop = frame_loop(Config::default());
        frame_loop.frame(Instant::now()).unwrap();
        assert_eq!(frame_loop.game.phase, Phase::Lobby);
        assert!(screen_contains(&frame_loop, "Press Enter"));
        assert!(screen_contains(&frame_loop, &frame_loop.app.local_id[..8]));

        frame_loop.handle_key(&key(KeyCode::Enter));
        frame_loop.frame(Instant::now()).unwrap();
        assert_eq!(frame_loop.game.phase, Phase::Game);
        assert!(screen_contains(&frame_loop, "Health=100"));
    }

    #[test]
    fn new_peer_is_greeted_and_then_flooded_each_frame() {
        let mut frame_loop = frame_loop(Config {
            lobby: false,
            ..Config::default()
        });
        let (link, mut rx) = peer_link("bb");
        frame_loop.handle_mesh(MeshEvent::Connected(link));

        let greeting = decode(&rx.try_recv().unwrap()).unwrap();
        assert_eq!(greeting.id, frame_loop.app.local_id);
        assert_eq!(greeting.health, 100);

        frame_loop.frame(Instant::now()).unwrap();
        frame_loop.frame(Instant::now()).unwrap();
        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_ok());
    }

    #[test]
    fn per_input_policy_only_floods_after_keys() {
        let mut frame_loop = frame_loop(Config {
            lobby: false,
            broadcast: BroadcastPolicy::PerInput,
            ..Config::default()
        });
        let (link, mut rx) = peer_link("bb");
        frame_loop.handle_mesh(MeshEvent::Connected(link));
        rx.try_recv().unwrap();

        frame_loop.frame(Instant::now()).unwrap();
        assert!(rx.try_recv().is_err());

        frame_loop.handle_key(&key(KeyCode::Left));
        frame_loop.frame(Instant::now()).unwrap();
        assert!(rx.try_recv().is_ok());
    }

    #[test]
    fn peer_data_updates_roster_and_close_removes_it() {
        let mut frame_loop = frame_loop(Config::default());
        let (link, _rx) = peer_link("bb");
        let conn = link.conn();
        frame_loop.handle_mesh(MeshEvent::Connected(link));

        let payload = encode(&remote("bbbbbbbbbbbb", 4.0, 4.0, 80)).unwrap();
        frame_loop.handle_mesh(MeshEvent::Data { conn, payload });
        frame_loop.frame(Instant::now()).unwrap();
        assert!(screen_contains(&frame_loop, "bbbbbbbb"));
        assert!(screen_contains(&frame_loop, "READY"));

        frame_loop.handle_mesh(MeshEvent::Closed { conn });
        assert!(frame_loop.session.is_empty());
    }

    #[test]
    fn malformed_peer_message_is_dropped() {
        let mut frame_loop = frame_loop(Config::default());
        let (link, _rx) = peer_link("bb");
        let conn = link.conn();
        frame_loop.handle_mesh(MeshEvent::Connected(link));

        frame_loop.handle_mesh(MeshEvent::Data {
            conn,
            payload: Bytes::from_static(b"{not json"),
        });
        assert!(frame_loop.session.get("bb").unwrap().state.is_none());
    }

    #[test]
    fn dead_peers_are_pruned_with_lobby_enabled() {
        let mut frame_loop = frame_loop(Config::default());
        let (link, _rx) = peer_link("bb");
        let conn = link.conn();
        frame_loop.handle_mesh(MeshEvent::Connected(link));
        let payload = encode(&remote("bb", 4.0, 4.0, 0)).unwrap();
        frame_loop.handle_mesh(MeshEvent::Data { conn, payload });

        frame_loop.frame(Instant::now()).unwrap();
        assert!(frame_loop.session.is_empty());
    }

    #[test]
    fn local_shot_damages_peer_record() {
        let mut frame_loop = frame_loop(Config {
            lobby: false,
            ..Config::default()
        });
        let (link, mut rx) = peer_link("bb");
        let conn = link.conn();
        frame_loop.handle_mesh(MeshEvent::Connected(link));
        // Directly ahead of the spawn, inside the hit radius after one step
        let payload = encode(&remote("bb", 8.0, 8.2, 100)).unwrap();
        frame_loop.handle_mesh(MeshEvent::Data { conn, payload });

        rx.try_recv().unwrap();

        frame_loop.handle_key(&key(KeyCode::Char(' ')));
        let report = frame_loop.frame(Instant::now()).unwrap();
        assert_eq!(report.hits_dealt, 1);
        let health = frame_loop.session.get("bb").unwrap().state.as_ref().unwrap().health;
        assert_eq!(health, 90);

        // The struck bullet goes out once so the target can register it
        let sent = decode(&rx.try_recv().unwrap()).unwrap();
        assert_eq!(sent.bullets.len(), 1);
        assert!(frame_loop.game.projectiles.is_empty());

        frame_loop.frame(Instant::now()).unwrap();
        let sent = decode(&rx.try_recv().unwrap()).unwrap();
        assert!(sent.bullets.is_empty());
    }

    #[test]
    fn arriving_bullet_hits_before_the_next_frame() {
        let mut frame_loop = frame_loop(Config {
            lobby: false,
            ..Config::default()
        });
        let (link, _rx) = peer_link("bb");
        let conn = link.conn();
        frame_loop.handle_mesh(MeshEvent::Connected(link));

        let pose = frame_loop.game.player.pose;
        let shot = WireState {
            bullets: vec![WireBullet { x: pose.x, y: pose.y + 0.2, vx: 0.0, vy: 8.0 }],
            ..remote("bb", 8.0, 4.0, 100)
        };
        frame_loop.handle_mesh(MeshEvent::Data { conn, payload: encode(&shot).unwrap() });
        assert_eq!(frame_loop.game.player.health, 90);

        // A newer snapshot replacing the record before the frame cannot undo it
        let moved_on = remote("bb", 8.0, 4.0, 100);
        frame_loop.handle_mesh(MeshEvent::Data { conn, payload: encode(&moved_on).unwrap() });
        let report = frame_loop.frame(Instant::now()).unwrap();
        assert_eq!(report.hits_taken, 0);
        assert_eq!(frame_loop.game.player.health, 90);
    }

    #[test]
    fn projectile_into_wall_is_not_drawn() {
        let mut frame_loop = frame_loop(Config {
            lobby: false,
            ..Config::default()
        });
        frame_loop.game.player.pose = Pose::new(8.5, 14.9, 0.0);
        frame_loop.handle_key(&key(KeyCode::Char(' ')));

        frame_loop.frame(Instant::now() + Duration::from_millis(100)).unwrap();
        assert!(frame_loop.game.projectiles.is_empty());
        assert!(!screen_contains(&frame_loop, "*"));
    }

    #[tokio::test]
    async fn run_returns_on_ctrl_c() {
        let frame_loop = frame_loop(Config::default());
        let (_mesh_tx, mesh_rx) = mpsc::unbounded_channel();
        let quit = Event::Key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
        let keys = futures::stream::iter(vec![Ok(quit)]);

        let result = tokio::time::timeout(
            Duration::from_secs(5),
            frame_loop.run(keys, mesh_rx),
        )
        .await
        .expect("frame loop did not stop");
        tokio_test::assert_ok!(result);
    }
}
