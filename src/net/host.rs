//! Host session - owns the authoritative simulation and its peer connections
//!
//! Transport tasks never touch the game state. They talk to the session
//! through a cloneable [`HostHandle`]: lifecycle events (open, join, close,
//! error) go through a queue drained at the start of every tick, and inputs
//! overwrite a per-identity slot. The session alone mutates the game.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, Receiver, Sender};
use hashbrown::HashMap;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::GameConfig;
use crate::game::clock::Clock;
use crate::game::constants::net::MAX_NICKNAME_LEN;
use crate::game::game_loop::{GameLoop, GameLoopEvent};
use crate::game::input_buffer::InputBuffer;
use crate::game::match_state::MatchError;
use crate::game::state::PlayerId;
use crate::metrics::Metrics;
use crate::net::channel::{ChannelError, Frame, PeerChannel};
use crate::net::protocol::{self, Message};
use crate::util::vec2::Vec2;

/// Connection identity; doubles as the player id once joined
pub type ConnectionId = PlayerId;

/// Lifecycle notification from a transport task
pub enum HostEvent {
    Open {
        conn: ConnectionId,
        channel: Arc<dyn PeerChannel>,
    },
    Join {
        conn: ConnectionId,
        nickname: String,
    },
    Close {
        conn: ConnectionId,
    },
    Error {
        conn: ConnectionId,
        message: String,
    },
}

/// Cloneable entry point for transport tasks
#[derive(Clone)]
pub struct HostHandle {
    events: Sender<HostEvent>,
    inputs: InputBuffer,
    metrics: Arc<Metrics>,
}

impl HostHandle {
    /// Register a new peer channel and get its identity
    pub fn open(&self, channel: Arc<dyn PeerChannel>) -> ConnectionId {
        let conn = Uuid::new_v4();
        self.push(HostEvent::Open { conn, channel });
        conn
    }

    /// Handle one inbound text frame
    pub fn deliver(&self, conn: ConnectionId, text: &str) {
        self.metrics.record_received(text.len());

        match protocol::decode(text) {
            Ok(Message::Join(join)) => self.push(HostEvent::Join {
                conn,
                nickname: join.nickname,
            }),
            Ok(Message::Input(input)) => self.inputs.submit(conn, input.direction()),
            Ok(other) => debug!("Ignoring {} from {}", other.kind(), conn),
            Err(e) => {
                self.metrics.decode_failures.fetch_add(1, Ordering::Relaxed);
                warn!("Malformed frame from {}: {}", conn, e);
            }
        }
    }

    pub fn close(&self, conn: ConnectionId) {
        self.push(HostEvent::Close { conn });
    }

    pub fn error(&self, conn: ConnectionId, message: impl Into<String>) {
        self.push(HostEvent::Error {
            conn,
            message: message.into(),
        });
    }

    fn push(&self, event: HostEvent) {
        if self.events.send(event).is_err() {
            debug!("Host session gone, dropping event");
        }
    }
}

struct Connection {
    channel: Arc<dyn PeerChannel>,
    joined: bool,
}

/// Authoritative host for one match session
pub struct HostSession {
    game: GameLoop,
    connections: HashMap<ConnectionId, Connection>,
    inputs: InputBuffer,
    events_tx: Sender<HostEvent>,
    events_rx: Receiver<HostEvent>,
    metrics: Arc<Metrics>,
    local_id: Option<PlayerId>,
}

impl HostSession {
    /// Open a room; `host_nickname` adds the host's own player
    pub fn new(config: GameConfig, host_nickname: Option<&str>, metrics: Arc<Metrics>) -> Self {
        let mut game = GameLoop::new(config);
        let local_id = host_nickname.map(|name| {
            let id = Uuid::new_v4();
            game.add_player(id, sanitize_nickname(name, id), false);
            id
        });
        let (events_tx, events_rx) = unbounded();

        Self {
            game,
            connections: HashMap::new(),
            inputs: InputBuffer::new(),
            events_tx,
            events_rx,
            metrics,
            local_id,
        }
    }

    pub fn handle(&self) -> HostHandle {
        HostHandle {
            events: self.events_tx.clone(),
            inputs: self.inputs.clone(),
            metrics: self.metrics.clone(),
        }
    }

    pub fn game(&self) -> &GameLoop {
        &self.game
    }

    pub fn game_mut(&mut self) -> &mut GameLoop {
        &mut self.game
    }

    /// The host's own player, if it plays
    pub fn local_id(&self) -> Option<PlayerId> {
        self.local_id
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Movement input for the host's own player
    pub fn set_local_input(&self, direction: Vec2) {
        if let Some(id) = self.local_id {
            self.inputs.submit(id, direction);
        }
    }

    pub fn add_bot(&mut self) -> PlayerId {
        self.game.add_bot()
    }

    pub fn force_start(&mut self, now: Duration) -> Result<(), MatchError> {
        self.game.force_start(now)
    }

    /// Run one frame: drain events, simulate, broadcast
    pub fn tick(&mut self, now: Duration) -> Vec<GameLoopEvent> {
        let started = Instant::now();

        self.drain_events();

        let game = &self.game;
        self.inputs.retain(|id| game.state().contains_player(*id));
        let inputs = self.inputs.snapshot();

        let events = self.game.tick(now, &inputs);
        self.broadcast(&Message::state(self.game.state()));

        for event in &events {
            match event {
                GameLoopEvent::CountdownStarted => debug!("Countdown broadcast"),
                GameLoopEvent::MatchStarted { first_zombie } => {
                    debug!("Match broadcast, first zombie {:?}", first_zombie)
                }
                GameLoopEvent::PlayerInfected { .. } => {
                    self.metrics.infections_total.fetch_add(1, Ordering::Relaxed);
                }
                GameLoopEvent::MatchEnded { reason } => {
                    self.metrics.matches_finished.fetch_add(1, Ordering::Relaxed);
                    self.broadcast(&Message::game_over(*reason));
                }
            }
        }

        self.metrics.record_game_state(self.game.state());
        self.metrics
            .connections_active
            .store(self.connections.len() as u64, Ordering::Relaxed);
        self.metrics.record_tick_time(started.elapsed());

        events
    }

    fn drain_events(&mut self) {
        while let Ok(event) = self.events_rx.try_recv() {
            match event {
                HostEvent::Open { conn, channel } => {
                    info!("Connection {} opened", conn);
                    self.connections.insert(
                        conn,
                        Connection {
                            channel,
                            joined: false,
                        },
                    );
                }
                HostEvent::Join { conn, nickname } => self.handle_join(conn, &nickname),
                HostEvent::Close { conn } => self.handle_close(conn),
                HostEvent::Error { conn, message } => {
                    warn!("Connection {} reported error: {}", conn, message);
                }
            }
        }
    }

    fn handle_join(&mut self, conn: ConnectionId, nickname: &str) {
        let Some(connection) = self.connections.get_mut(&conn) else {
            debug!("Join from unknown connection {}", conn);
            return;
        };

        if connection.joined {
            debug!("Duplicate join from {}, re-sending welcome", conn);
        } else {
            let name = sanitize_nickname(nickname, conn);
            connection.joined = true;
            self.game.add_player(conn, name, false);
        }

        let welcome = Message::welcome(self.game.state(), conn);
        if let Some(frame) = self.encode(&welcome) {
            self.send_to(conn, frame);
        }
    }

    fn handle_close(&mut self, conn: ConnectionId) {
        if let Some(connection) = self.connections.remove(&conn) {
            connection.channel.close();
        }
        self.inputs.remove(conn);
        if self.game.remove_player(conn).is_some() {
            info!("Connection {} closed, player removed", conn);
        } else {
            debug!("Connection {} closed before joining", conn);
        }
    }

    fn encode(&self, message: &Message) -> Option<Frame> {
        match protocol::encode(message) {
            Ok(text) => Some(Arc::from(text)),
            Err(e) => {
                warn!("Failed to encode {}: {}", message.kind(), e);
                None
            }
        }
    }

    fn send_to(&self, conn: ConnectionId, frame: Frame) {
        if let Some(connection) = self.connections.get(&conn) {
            self.send_frame(conn, connection, frame);
        }
    }

    fn send_frame(&self, conn: ConnectionId, connection: &Connection, frame: Frame) {
        if !connection.channel.is_open() {
            return;
        }
        let len = frame.len();
        match connection.channel.send(frame) {
            Ok(()) => self.metrics.record_sent(len),
            Err(ChannelError::Full) => {
                self.metrics.messages_dropped.fetch_add(1, Ordering::Relaxed);
                warn!("Outbound queue full for {}, dropping frame", conn);
            }
            Err(ChannelError::Closed) => {
                self.metrics.messages_dropped.fetch_add(1, Ordering::Relaxed);
                debug!("Channel to {} closed, dropping frame", conn);
            }
        }
    }

    /// Encode once and send to every open connection
    fn broadcast(&self, message: &Message) {
        let Some(frame) = self.encode(message) else {
            return;
        };
        for (conn, connection) in &self.connections {
            self.send_frame(*conn, connection, frame.clone());
        }
    }
}

/// Trim, strip control characters and cap the length; generate a name if empty
pub fn sanitize_nickname(raw: &str, id: PlayerId) -> String {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| !c.is_control())
        .take(MAX_NICKNAME_LEN)
        .collect();
    let cleaned = cleaned.trim();

    if cleaned.is_empty() {
        let simple = id.simple().to_string();
        format!("Player-{}", &simple[..4])
    } else {
        cleaned.to_string()
    }
}

/// Drive the session at a fixed rate until the task is dropped
///
/// Missed ticks are skipped rather than bursted; remaining time is derived
/// from the clock, so skipping frames does not stretch the match.
pub async fn run_host_loop<C: Clock>(mut session: HostSession, clock: C, tick_duration: Duration) {
    let mut ticker = interval(tick_duration);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;
        session.tick(clock.now());
    }
}
