use hashbrown::HashMap;

use crate::config::GameConfig;
use crate::game::constants::physics::{BASE_SPEED, INPUT_SMOOTHING, VELOCITY_SNAP};
use crate::game::spatial::resolve_collision;
use crate::game::state::{GameState, MapBounds, Obstacle, Player, PlayerId, Role};
use crate::util::vec2::Vec2;

/// Per-role movement speed
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MovementParams {
    /// Map units per tick at full input
    pub base_speed: f32,
    pub zombie_multiplier: f32,
    pub survivor_multiplier: f32,
}

impl Default for MovementParams {
    fn default() -> Self {
        Self {
            base_speed: BASE_SPEED,
            zombie_multiplier: 1.0,
            survivor_multiplier: 1.0,
        }
    }
}

impl MovementParams {
    pub fn from_config(config: &GameConfig) -> Self {
        Self {
            base_speed: config.base_speed,
            zombie_multiplier: config.zombie_speed_multiplier,
            survivor_multiplier: config.survivor_speed_multiplier,
        }
    }

    #[inline]
    pub fn speed(&self, role: Role) -> f32 {
        let multiplier = match role {
            Role::Zombie => self.zombie_multiplier,
            Role::Survivor => self.survivor_multiplier,
        };
        self.base_speed * multiplier
    }
}

/// One exponential smoothing step followed by the zero snap
#[inline]
pub fn smooth_velocity(velocity: Vec2, target: Vec2, factor: f32) -> Vec2 {
    let next = velocity.smooth_toward(target, factor);
    if next.length() < VELOCITY_SNAP {
        Vec2::ZERO
    } else {
        next
    }
}

/// Move a player by its current velocity and resolve collisions
pub fn integrate(
    player: &mut Player,
    params: &MovementParams,
    bounds: MapBounds,
    obstacles: &[Obstacle],
) {
    let step = player.velocity * params.speed(player.role());
    player.position = resolve_collision(player.position + step, player.radius(), bounds, obstacles);
}

/// Steer a human-controlled player toward its input direction
pub fn apply_input(
    player: &mut Player,
    direction: Vec2,
    params: &MovementParams,
    bounds: MapBounds,
    obstacles: &[Obstacle],
) {
    player.velocity = smooth_velocity(player.velocity, direction, INPUT_SMOOTHING);
    integrate(player, params, bounds, obstacles);
}

/// Update every human-controlled player from the latest inputs
///
/// Players without a reported input steer toward zero.
pub fn update(state: &mut GameState, inputs: &HashMap<PlayerId, Vec2>, params: &MovementParams) {
    let bounds = state.bounds;
    let obstacles = &state.obstacles;

    for player in state.players.iter_mut().filter(|p| !p.is_bot) {
        let direction = inputs.get(&player.id).copied().unwrap_or(Vec2::ZERO);
        apply_input(player, direction, params, bounds, obstacles);
    }
}
