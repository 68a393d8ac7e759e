//! Steering controller for autonomous players
//!
//! Each tick a bot perceives its neighbors, decides an intent (chase, flee or
//! wander), blends in separation, slides along walls it is about to hit, and
//! finally integrates like any other player.

use rand::Rng;

use crate::config::GameConfig;
use crate::game::constants::ai::*;
use crate::game::spatial::{line_of_sight_blocked, segment_rect_intersect, surface_normal};
use crate::game::state::{GameState, MapBounds, Obstacle, Player, PlayerId, Role};
use crate::game::systems::physics::{self, MovementParams};
use crate::util::vec2::Vec2;

/// Role-dependent perception ranges
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SteeringParams {
    pub zombie_vision: f32,
    pub survivor_vision: f32,
}

impl Default for SteeringParams {
    fn default() -> Self {
        Self {
            zombie_vision: ZOMBIE_VISION,
            survivor_vision: SURVIVOR_VISION,
        }
    }
}

impl SteeringParams {
    pub fn from_config(config: &GameConfig) -> Self {
        Self {
            zombie_vision: config.zombie_vision,
            survivor_vision: config.survivor_vision,
        }
    }

    #[inline]
    pub fn vision(&self, role: Role) -> f32 {
        match role {
            Role::Zombie => self.zombie_vision,
            Role::Survivor => self.survivor_vision,
        }
    }
}

/// Position snapshot of a player taken before any bot moves this tick
#[derive(Debug, Clone, Copy)]
pub struct Agent {
    pub id: PlayerId,
    pub position: Vec2,
    pub role: Role,
}

impl From<&Player> for Agent {
    fn from(player: &Player) -> Self {
        Self {
            id: player.id,
            position: player.position,
            role: player.role(),
        }
    }
}

/// Steering decision for one tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Steering {
    pub direction: Vec2,
    /// Direction was corrected to slide along a wall
    pub wall_corrected: bool,
}

/// Averaged inverse-distance repulsion from neighbors within the separation radius
pub fn separation(bot_id: PlayerId, position: Vec2, agents: &[Agent]) -> Vec2 {
    let mut force = Vec2::ZERO;
    let mut neighbors = 0usize;

    for other in agents.iter().filter(|a| a.id != bot_id) {
        let away = position - other.position;
        let dist = away.length();
        if dist > 0.0 && dist < SEPARATION_RADIUS {
            force += away.normalize() / dist;
            neighbors += 1;
        }
    }

    if neighbors > 0 {
        force / neighbors as f32
    } else {
        force
    }
}

/// Nearest opposite-role player in vision range with a clear line of sight
///
/// Targets within the line-of-sight skip distance are always visible.
pub fn find_visible_target(
    bot_id: PlayerId,
    position: Vec2,
    role: Role,
    range: f32,
    agents: &[Agent],
    obstacles: &[Obstacle],
) -> Option<Agent> {
    let range_sq = range * range;
    let prey = role.opposite();

    agents
        .iter()
        .filter(|a| a.id != bot_id && a.role == prey)
        .filter_map(|a| {
            let dist_sq = position.distance_sq_to(a.position);
            (dist_sq <= range_sq).then_some((a, dist_sq))
        })
        .filter(|(a, dist_sq)| {
            *dist_sq <= LOS_SKIP_DISTANCE * LOS_SKIP_DISTANCE
                || !line_of_sight_blocked(position, a.position, obstacles)
        })
        .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(a, _)| *a)
}

/// Sample a wander point far enough from `position`
///
/// Falls back to the last sample when none of the attempts is far enough.
pub fn sample_wander_target<R: Rng + ?Sized>(rng: &mut R, position: Vec2, bounds: MapBounds) -> Vec2 {
    let max_x = (bounds.width - WANDER_MARGIN).max(WANDER_MARGIN + 1.0);
    let max_y = (bounds.height - WANDER_MARGIN).max(WANDER_MARGIN + 1.0);
    let min_dist_sq = WANDER_MIN_DISTANCE * WANDER_MIN_DISTANCE;

    let mut candidate = bounds.center();
    for _ in 0..WANDER_ATTEMPTS {
        candidate = Vec2::new(
            rng.gen_range(WANDER_MARGIN..max_x),
            rng.gen_range(WANDER_MARGIN..max_y),
        );
        if candidate.distance_sq_to(position) > min_dist_sq {
            break;
        }
    }
    candidate
}

/// Intent direction: chase or flee a visible target, otherwise wander
pub fn choose_intent<R: Rng + ?Sized>(
    bot: &mut Player,
    target: Option<Agent>,
    bounds: MapBounds,
    rng: &mut R,
) -> Vec2 {
    if let Some(target) = target {
        if rng.gen::<f32>() < FORGET_CHANCE {
            bot.wander_target = None;
        }
        return match bot.role() {
            Role::Zombie => (target.position - bot.position).normalize(),
            Role::Survivor => (bot.position - target.position).normalize(),
        };
    }

    let arrive_sq = WANDER_ARRIVE_DISTANCE * WANDER_ARRIVE_DISTANCE;
    let wander = match bot.wander_target {
        Some(point) if point.distance_sq_to(bot.position) > arrive_sq => point,
        _ => {
            let point = sample_wander_target(rng, bot.position, bounds);
            bot.wander_target = Some(point);
            point
        }
    };
    (wander - bot.position).normalize()
}

/// Combine intent with weighted separation
#[inline]
pub fn blend(intent: Vec2, separation: Vec2) -> Vec2 {
    (intent + separation * SEPARATION_WEIGHT).normalize_if_longer(MIN_DIRECTION)
}

/// Deflect `direction` along the first wall hit by the look-ahead probe
pub fn slide_along_walls(
    position: Vec2,
    direction: Vec2,
    radius: f32,
    obstacles: &[Obstacle],
) -> Steering {
    let probe = position + direction * LOOKAHEAD;

    if let Some(wall) = obstacles
        .iter()
        .find(|o| segment_rect_intersect(position, probe, o, radius))
    {
        let normal = surface_normal(wall, position);
        let into_wall = direction.dot(normal);
        if into_wall < 0.0 {
            let slid = direction - normal * into_wall + normal * WALL_PUSH;
            return Steering {
                direction: slid.normalize(),
                wall_corrected: true,
            };
        }
    }

    Steering {
        direction,
        wall_corrected: false,
    }
}

/// Full steering decision for one bot
pub fn steer<R: Rng + ?Sized>(
    bot: &mut Player,
    agents: &[Agent],
    obstacles: &[Obstacle],
    bounds: MapBounds,
    params: &SteeringParams,
    rng: &mut R,
) -> Steering {
    let push = separation(bot.id, bot.position, agents);
    let target = find_visible_target(
        bot.id,
        bot.position,
        bot.role(),
        params.vision(bot.role()),
        agents,
        obstacles,
    );
    let intent = choose_intent(bot, target, bounds, rng);
    let desired = blend(intent, push);
    slide_along_walls(bot.position, desired, bot.radius(), obstacles)
}

/// Steer and move every bot
///
/// Perception uses positions from the start of the pass so bot order does not
/// change what each bot sees.
pub fn update<R: Rng + ?Sized>(
    state: &mut GameState,
    params: &SteeringParams,
    movement: &MovementParams,
    rng: &mut R,
) {
    if state.players.iter().all(|p| !p.is_bot) {
        return;
    }

    let agents: Vec<Agent> = state.players.iter().map(Agent::from).collect();
    let bounds = state.bounds;
    let obstacles = &state.obstacles;

    for bot in state.players.iter_mut().filter(|p| p.is_bot) {
        let steering = steer(bot, &agents, obstacles, bounds, params, rng);
        let smoothing = if steering.wall_corrected {
            WALL_SMOOTHING
        } else {
            TURN_SMOOTHING
        };
        bot.velocity = physics::smooth_velocity(bot.velocity, steering.direction, smoothing);
        physics::integrate(bot, movement, bounds, obstacles);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::match_state::MatchState;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use uuid::Uuid;

    fn bot_at(x: f32, y: f32) -> Player {
        Player::new(Uuid::new_v4(), "bot".to_string(), Vec2::new(x, y), true)
    }

    fn zombie_bot_at(x: f32, y: f32) -> Player {
        let mut p = bot_at(x, y);
        p.infect();
        p
    }

    fn bounds() -> MapBounds {
        MapBounds::new(2000.0, 2000.0)
    }

    fn state_with(players: Vec<Player>, obstacles: Vec<Obstacle>) -> GameState {
        let mut state = GameState::new(bounds(), obstacles, MatchState::default());
        for p in players {
            state.add_player(p);
        }
        state
    }

    #[test]
    fn test_separation_pushes_apart() {
        let a = bot_at(100.0, 100.0);
        let b = bot_at(130.0, 100.0);
        let agents = [Agent::from(&a), Agent::from(&b)];

        let push = separation(a.id, a.position, &agents);
        assert!(push.x < 0.0);
        assert!((push.x + 1.0 / 30.0).abs() < 1e-5);
        assert_eq!(push.y, 0.0);
    }

    #[test]
    fn test_separation_ignores_distant_neighbors() {
        let a = bot_at(100.0, 100.0);
        let b = bot_at(200.0, 100.0);
        let agents = [Agent::from(&a), Agent::from(&b)];
        assert_eq!(separation(a.id, a.position, &agents), Vec2::ZERO);
    }

    #[test]
    fn test_zombie_sees_nearest_survivor() {
        let zombie = zombie_bot_at(500.0, 500.0);
        let near = bot_at(700.0, 500.0);
        let far = bot_at(500.0, 900.0);
        let agents = [Agent::from(&zombie), Agent::from(&near), Agent::from(&far)];

        let target = find_visible_target(zombie.id, zombie.position, Role::Zombie, 450.0, &agents, &[]);
        assert_eq!(target.map(|t| t.id), Some(near.id));
    }

    #[test]
    fn test_vision_range_by_role() {
        let survivor = bot_at(500.0, 500.0);
        let zombie = zombie_bot_at(900.0, 500.0);
        let agents = [Agent::from(&survivor), Agent::from(&zombie)];
        let params = SteeringParams::default();

        // 400 apart: inside zombie vision, outside survivor vision
        assert!(find_visible_target(
            survivor.id,
            survivor.position,
            Role::Survivor,
            params.vision(Role::Survivor),
            &agents,
            &[]
        )
        .is_none());
        assert!(find_visible_target(
            zombie.id,
            zombie.position,
            Role::Zombie,
            params.vision(Role::Zombie),
            &agents,
            &[]
        )
        .is_some());
    }

    #[test]
    fn test_line_of_sight_blocked_by_wall() {
        let zombie = zombie_bot_at(100.0, 300.0);
        let survivor = bot_at(300.0, 300.0);
        let agents = [Agent::from(&zombie), Agent::from(&survivor)];
        let wall = [Obstacle::new(190.0, 100.0, 20.0, 400.0)];

        assert!(find_visible_target(zombie.id, zombie.position, Role::Zombie, 450.0, &agents, &wall).is_none());
    }

    #[test]
    fn test_close_target_visible_through_wall() {
        let zombie = zombie_bot_at(90.0, 300.0);
        let survivor = bot_at(140.0, 300.0);
        let agents = [Agent::from(&zombie), Agent::from(&survivor)];
        let wall = [Obstacle::new(110.0, 100.0, 10.0, 400.0)];

        assert!(find_visible_target(zombie.id, zombie.position, Role::Zombie, 450.0, &agents, &wall).is_some());
    }

    #[test]
    fn test_chase_and_flee_intent() {
        let mut rng = StdRng::seed_from_u64(1);
        let target = Agent {
            id: Uuid::new_v4(),
            position: Vec2::new(600.0, 500.0),
            role: Role::Survivor,
        };

        let mut zombie = zombie_bot_at(500.0, 500.0);
        let chase = choose_intent(&mut zombie, Some(target), bounds(), &mut rng);
        assert!(chase.approx_eq(Vec2::new(1.0, 0.0), 1e-5));

        let mut survivor = bot_at(500.0, 500.0);
        let flee = choose_intent(&mut survivor, Some(Agent { role: Role::Zombie, ..target }), bounds(), &mut rng);
        assert!(flee.approx_eq(Vec2::new(-1.0, 0.0), 1e-5));
    }

    #[test]
    fn test_steers_toward_held_wander_target() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut bot = bot_at(1000.0, 1000.0);
        let held = Vec2::new(1000.0, 1600.0);
        bot.wander_target = Some(held);

        let agents = [Agent::from(&bot)];
        let steering = steer(&mut bot, &agents, &[], bounds(), &SteeringParams::default(), &mut rng);

        assert_eq!(bot.wander_target, Some(held));
        assert!(steering.direction.approx_eq(Vec2::new(0.0, 1.0), 1e-5));
        assert!(!steering.wall_corrected);
    }

    #[test]
    fn test_wander_target_resampled_on_arrival() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut bot = bot_at(1000.0, 1000.0);
        bot.wander_target = Some(Vec2::new(1030.0, 1000.0));

        choose_intent(&mut bot, None, bounds(), &mut rng);

        let next = bot.wander_target.unwrap();
        assert_ne!(next, Vec2::new(1030.0, 1000.0));
        assert!(next.distance_to(bot.position) > WANDER_MIN_DISTANCE);
        assert!(next.x >= WANDER_MARGIN && next.x <= 2000.0 - WANDER_MARGIN);
    }

    #[test]
    fn test_wander_sample_within_margins() {
        let mut rng = StdRng::seed_from_u64(4);
        for _ in 0..200 {
            let from = Vec2::new(rng.gen_range(0.0..2000.0), rng.gen_range(0.0..2000.0));
            let point = sample_wander_target(&mut rng, from, bounds());
            assert!(point.x >= WANDER_MARGIN && point.y >= WANDER_MARGIN);
            assert!(point.x < 2000.0 - WANDER_MARGIN && point.y < 2000.0 - WANDER_MARGIN);
        }
    }

    #[test]
    fn test_wall_slide_removes_into_wall_component() {
        // Wall to the right, moving diagonally into it
        let wall = [Obstacle::new(130.0, 0.0, 20.0, 600.0)];
        let position = Vec2::new(100.0, 300.0);
        let direction = Vec2::new(1.0, 1.0).normalize();

        let steering = slide_along_walls(position, direction, 20.0, &wall);
        assert!(steering.wall_corrected);

        let normal = Vec2::new(-1.0, 0.0);
        assert!(steering.direction.dot(normal) >= 0.0);
        assert!(steering.direction.y > 0.0);
        assert!((steering.direction.length() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_wall_slide_ignores_moving_away() {
        let wall = [Obstacle::new(130.0, 0.0, 20.0, 600.0)];
        let position = Vec2::new(100.0, 300.0);
        let direction = Vec2::new(-0.1, 1.0).normalize();

        let steering = slide_along_walls(position, direction, 20.0, &wall);
        assert!(!steering.wall_corrected);
        assert_eq!(steering.direction, direction);
    }

    #[test]
    fn test_update_moves_only_bots() {
        let mut rng = StdRng::seed_from_u64(5);
        let bot = bot_at(1000.0, 1000.0);
        let human = Player::new(Uuid::new_v4(), "human".to_string(), Vec2::new(300.0, 300.0), false);
        let (bot_id, human_id) = (bot.id, human.id);
        let mut state = state_with(vec![bot, human], Vec::new());

        for _ in 0..30 {
            update(&mut state, &SteeringParams::default(), &MovementParams::default(), &mut rng);
        }

        assert_ne!(state.get_player(bot_id).unwrap().position, Vec2::new(1000.0, 1000.0));
        assert_eq!(state.get_player(human_id).unwrap().position, Vec2::new(300.0, 300.0));
    }

    #[test]
    fn test_zombie_bot_closes_distance() {
        let mut rng = StdRng::seed_from_u64(6);
        let zombie = zombie_bot_at(800.0, 1000.0);
        let survivor = Player::new(Uuid::new_v4(), "s".to_string(), Vec2::new(1100.0, 1000.0), false);
        let (zid, sid) = (zombie.id, survivor.id);
        let mut state = state_with(vec![zombie, survivor], Vec::new());

        for _ in 0..60 {
            update(&mut state, &SteeringParams::default(), &MovementParams::default(), &mut rng);
        }

        let z = state.get_player(zid).unwrap().position;
        let s = state.get_player(sid).unwrap().position;
        assert!(z.distance_to(s) < 300.0);
    }

    #[test]
    fn test_bots_stay_clear_of_obstacles() {
        let mut rng = StdRng::seed_from_u64(7);
        let obstacles = crate::game::spatial::generate_obstacles(&mut rng, bounds(), 25, 40, 200.0);
        let bots: Vec<Player> = (0..10)
            .map(|i| bot_at(900.0 + i as f32 * 25.0, 1000.0))
            .collect();
        let mut state = state_with(bots, obstacles);

        for _ in 0..300 {
            update(&mut state, &SteeringParams::default(), &MovementParams::default(), &mut rng);
            for p in &state.players {
                assert!(p.position.x >= p.radius() && p.position.x <= 2000.0 - p.radius());
                assert!(p.position.y >= p.radius() && p.position.y <= 2000.0 - p.radius());
            }
        }
    }
}
