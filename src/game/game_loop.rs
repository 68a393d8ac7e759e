//! Simulation tick orchestrator
//!
//! Owns the authoritative [`GameState`] and advances it one frame at a time:
//! movement, infection, role counts, then the match state machine.

use std::time::Duration;

use hashbrown::HashMap;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

use crate::config::GameConfig;
use crate::game::match_state::{MatchEndReason, MatchError, MatchState, MatchTransition};
use crate::game::spatial::{find_spawn_point, generate_obstacles};
use crate::game::state::{GameState, MapBounds, MatchPhase, Player, PlayerId};
use crate::game::systems::ai::{self, SteeringParams};
use crate::game::systems::infection;
use crate::game::systems::physics::{self, MovementParams};
use crate::util::vec2::Vec2;

/// Something that happened during a tick
#[derive(Debug, Clone, PartialEq)]
pub enum GameLoopEvent {
    CountdownStarted,
    /// Entered Playing; `first_zombie` is None only when nobody was left
    MatchStarted { first_zombie: Option<PlayerId> },
    PlayerInfected { victim_id: PlayerId, zombie_id: PlayerId },
    MatchEnded { reason: MatchEndReason },
}

pub struct GameLoop {
    state: GameState,
    config: GameConfig,
    movement: MovementParams,
    steering: SteeringParams,
    rng: StdRng,
    bots_spawned: usize,
}

impl GameLoop {
    /// Open a session: generate the obstacle set and enter Lobby
    pub fn new(config: GameConfig) -> Self {
        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let bounds = MapBounds::new(config.map_width, config.map_height);
        let obstacles = generate_obstacles(
            &mut rng,
            bounds,
            config.wall_count,
            config.debris_count,
            config.safe_zone_radius,
        );
        info!(
            "Generated {} obstacles on a {}x{} map",
            obstacles.len(),
            config.map_width,
            config.map_height
        );

        let match_state = MatchState::new(config.countdown, config.match_duration);

        Self {
            state: GameState::new(bounds, obstacles, match_state),
            movement: MovementParams::from_config(&config),
            steering: SteeringParams::from_config(&config),
            config,
            rng,
            bots_spawned: 0,
        }
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut GameState {
        &mut self.state
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    #[inline]
    pub fn phase(&self) -> MatchPhase {
        self.state.match_state.phase()
    }

    /// Add a player at a free spawn point; returns false if the id is taken
    pub fn add_player(&mut self, player_id: PlayerId, name: String, is_bot: bool) -> bool {
        if self.state.contains_player(player_id) {
            return false;
        }

        let radius = self.config.player_radius;
        let spawn = find_spawn_point(&mut self.rng, self.state.bounds, &self.state.obstacles, radius);
        let player = Player::with_radius(player_id, name, spawn.position(), is_bot, radius);

        info!(
            "{} {} joined at ({:.0}, {:.0})",
            if is_bot { "Bot" } else { "Player" },
            player.name,
            player.position.x,
            player.position.y
        );
        self.state.add_player(player);
        true
    }

    /// Add an autonomous player with a generated name
    pub fn add_bot(&mut self) -> PlayerId {
        self.bots_spawned += 1;
        let id = uuid::Uuid::new_v4();
        let name = format!("Bot {}", self.bots_spawned);
        self.add_player(id, name, true);
        id
    }

    pub fn remove_player(&mut self, player_id: PlayerId) -> Option<Player> {
        let player = self.state.remove_player(player_id)?;
        info!("{} left", player.name);
        Some(player)
    }

    /// Host-requested start with at least one player
    pub fn force_start(&mut self, now: Duration) -> Result<(), MatchError> {
        let players = self.state.players.len();
        self.state.match_state.force_start(players, now)?;
        Ok(())
    }

    /// Advance the simulation by one frame
    ///
    /// `inputs` holds the latest direction per human player; missing entries
    /// mean no input.
    pub fn tick(&mut self, now: Duration, inputs: &HashMap<PlayerId, Vec2>) -> Vec<GameLoopEvent> {
        let mut events = Vec::new();
        self.state.tick += 1;

        physics::update(&mut self.state, inputs, &self.movement);
        ai::update(&mut self.state, &self.steering, &self.movement, &mut self.rng);

        if self.state.match_state.is_playing() {
            for (victim_id, zombie_id) in infection::update(&mut self.state) {
                debug!("{} infected by {}", victim_id, zombie_id);
                events.push(GameLoopEvent::PlayerInfected { victim_id, zombie_id });
            }
            self.state.match_state.record_playing_tick();
        }

        let counts = infection::refresh_counts(&mut self.state);

        match self.state.match_state.update(now, counts) {
            Some(MatchTransition::CountdownStarted) => events.push(GameLoopEvent::CountdownStarted),
            Some(MatchTransition::MatchStarted) => {
                let first_zombie = self.pick_first_zombie();
                infection::refresh_counts(&mut self.state);
                events.push(GameLoopEvent::MatchStarted { first_zombie });
            }
            Some(MatchTransition::MatchEnded(reason)) => {
                events.push(GameLoopEvent::MatchEnded { reason });
            }
            None => {}
        }

        events
    }

    /// Turn one uniformly random player into the initial zombie
    fn pick_first_zombie(&mut self) -> Option<PlayerId> {
        if self.state.players.is_empty() {
            return None;
        }
        let index = self.rng.gen_range(0..self.state.players.len());
        let player = &mut self.state.players[index];
        player.infect();
        info!("{} is patient zero", player.name);
        Some(player.id)
    }
}
