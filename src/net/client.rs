//! Client-side reconciliation
//!
//! Keeps a local copy of the session driven by host messages. Authoritative
//! positions only move the interpolation target; the rendered position eases
//! toward it once per client frame, independently of packet arrival.

use std::sync::Arc;

use hashbrown::HashMap;
use tracing::{debug, info, warn};

use crate::game::constants::client::INTERPOLATION;
use crate::game::match_state::MatchEndReason;
use crate::game::state::{MatchPhase, Obstacle, PlayerId, Role, RoleCounts};
use crate::net::channel::{ChannelError, PeerChannel};
use crate::net::protocol::{self, EncodeError, Message, PlayerRecord};
use crate::util::vec2::Vec2;

/// Local copy of a player
#[derive(Debug, Clone, PartialEq)]
pub struct ClientPlayer {
    pub id: PlayerId,
    pub nickname: String,
    /// Rendered position
    pub position: Vec2,
    /// Last authoritative position
    pub target: Vec2,
    pub role: Role,
    pub is_bot: bool,
}

impl ClientPlayer {
    fn from_record(record: &PlayerRecord) -> Self {
        let at = record.position();
        Self {
            id: record.id,
            nickname: record.nickname.clone(),
            position: at,
            target: at,
            role: record.role,
            is_bot: record.is_bot,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConnectionStatus {
    #[default]
    Connecting,
    Joined,
    Disconnected(String),
}

/// Everything a renderer needs, reconstructed from host messages
#[derive(Debug, Clone, Default)]
pub struct ClientView {
    local_id: Option<PlayerId>,
    players: Vec<ClientPlayer>,
    obstacles: Vec<Obstacle>,
    phase: MatchPhase,
    time_left: f32,
    counts: RoleCounts,
    game_over: Option<MatchEndReason>,
    status: ConnectionStatus,
}

impl ClientView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode and apply a text frame; malformed frames are ignored
    pub fn apply_frame(&mut self, text: &str) -> bool {
        match protocol::decode(text) {
            Ok(message) => {
                self.apply(message);
                true
            }
            Err(e) => {
                warn!("Ignoring malformed frame: {}", e);
                false
            }
        }
    }

    pub fn apply(&mut self, message: Message) {
        match message {
            Message::Welcome(welcome) => {
                self.local_id = Some(welcome.self_id);
                self.players = welcome.players.iter().map(ClientPlayer::from_record).collect();
                self.obstacles = welcome.obstacles;
                self.phase = welcome.phase;
                self.time_left = welcome.time_left;
                self.counts = count_roles(&self.players);
                self.game_over = None;
                self.status = ConnectionStatus::Joined;
                info!("Joined as {} with {} players", welcome.self_id, self.players.len());
            }
            Message::State(state) => {
                self.reconcile(&state.players);
                self.phase = state.phase;
                self.time_left = state.time_left;
                self.counts = if state.counts.total() == self.players.len() {
                    state.counts
                } else {
                    count_roles(&self.players)
                };
            }
            Message::GameOver(over) => {
                self.phase = MatchPhase::GameOver;
                self.game_over = Some(over.reason);
                info!("Match over: {:?}", over.reason);
            }
            other => debug!("Ignoring {} on client", other.kind()),
        }
    }

    /// Per-identity merge in incoming order
    ///
    /// Known players keep their rendered position and get a new target, with
    /// role and nickname applied immediately. New players appear at their
    /// reported position. Players missing from the update are dropped.
    fn reconcile(&mut self, records: &[PlayerRecord]) {
        let mut known: HashMap<PlayerId, ClientPlayer> =
            self.players.drain(..).map(|p| (p.id, p)).collect();

        self.players = records
            .iter()
            .map(|record| match known.remove(&record.id) {
                Some(mut local) => {
                    local.target = record.position();
                    local.role = record.role;
                    local.nickname.clone_from(&record.nickname);
                    local.is_bot = record.is_bot;
                    local
                }
                None => ClientPlayer::from_record(record),
            })
            .collect();
    }

    /// Ease every rendered position toward its target; call once per frame
    pub fn interpolate(&mut self) {
        for player in &mut self.players {
            player.position = player.position.smooth_toward(player.target, INTERPOLATION);
        }
    }

    /// The transport closed; the caller decides whether to exit
    pub fn on_close(&mut self, reason: impl Into<String>) {
        let reason = reason.into();
        info!("Disconnected: {}", reason);
        self.status = ConnectionStatus::Disconnected(reason);
    }

    pub fn local_id(&self) -> Option<PlayerId> {
        self.local_id
    }

    pub fn local_player(&self) -> Option<&ClientPlayer> {
        let id = self.local_id?;
        self.player(id)
    }

    pub fn player(&self, id: PlayerId) -> Option<&ClientPlayer> {
        self.players.iter().find(|p| p.id == id)
    }

    pub fn players(&self) -> &[ClientPlayer] {
        &self.players
    }

    pub fn obstacles(&self) -> &[Obstacle] {
        &self.obstacles
    }

    pub fn phase(&self) -> MatchPhase {
        self.phase
    }

    pub fn time_left(&self) -> f32 {
        self.time_left
    }

    pub fn counts(&self) -> RoleCounts {
        self.counts
    }

    pub fn game_over(&self) -> Option<MatchEndReason> {
        self.game_over
    }

    pub fn status(&self) -> &ConnectionStatus {
        &self.status
    }
}

fn count_roles(players: &[ClientPlayer]) -> RoleCounts {
    let zombies = players.iter().filter(|p| p.role == Role::Zombie).count();
    RoleCounts {
        zombies,
        survivors: players.len() - zombies,
    }
}

/// Why an outbound client message was not queued
#[derive(Debug, thiserror::Error)]
pub enum SendError {
    #[error(transparent)]
    Encode(#[from] EncodeError),
    #[error(transparent)]
    Channel(#[from] ChannelError),
}

/// A client connection: outbound channel plus the reconciled view
pub struct ClientSession {
    channel: Arc<dyn PeerChannel>,
    view: ClientView,
}

impl ClientSession {
    pub fn new(channel: Arc<dyn PeerChannel>) -> Self {
        Self {
            channel,
            view: ClientView::new(),
        }
    }

    pub fn join(&self, nickname: &str) -> Result<(), SendError> {
        self.send(&Message::join(nickname))
    }

    /// Send the latest movement direction (clamped to length 1)
    pub fn send_input(&self, direction: Vec2) -> Result<(), SendError> {
        self.send(&Message::input(direction))
    }

    fn send(&self, message: &Message) -> Result<(), SendError> {
        let text = protocol::encode(message)?;
        self.channel.send(Arc::from(text))?;
        Ok(())
    }

    /// Handle a text frame from the host
    pub fn receive(&mut self, text: &str) {
        self.view.apply_frame(text);
    }

    /// Per-frame update
    pub fn frame(&mut self) {
        self.view.interpolate();
    }

    pub fn on_close(&mut self, reason: impl Into<String>) {
        self.channel.close();
        self.view.on_close(reason);
    }

    pub fn view(&self) -> &ClientView {
        &self.view
    }
}
