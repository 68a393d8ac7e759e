//! Game state definitions and structures
//!
//! Contains the player entities, the obstacle set and the match session state
//! owned by the host.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::game::constants::physics;
use crate::game::match_state::MatchState;
use crate::util::vec2::Vec2;

/// Unique player identifier (connection-scoped)
pub type PlayerId = Uuid;

/// Player role
///
/// Survivor -> Zombie is the only transition allowed within a match.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// Pursuer
    Zombie,
    /// Evader
    Survivor,
}

impl Role {
    pub fn opposite(self) -> Self {
        match self {
            Role::Zombie => Role::Survivor,
            Role::Survivor => Role::Zombie,
        }
    }
}

/// Match phase
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchPhase {
    /// Waiting for players
    #[default]
    Lobby,
    /// Countdown before match starts
    Countdown,
    /// Match in progress
    Playing,
    /// Match ended (terminal)
    GameOver,
}

/// Player state
#[derive(Debug, Clone, PartialEq)]
pub struct Player {
    /// Position in map units
    pub position: Vec2,
    /// Smoothed movement direction (unit-ish)
    pub velocity: Vec2,
    /// Collision radius, fixed for the player's lifetime
    radius: f32,
    role: Role,
    /// Held wander/pursuit point for autonomous players
    pub wander_target: Option<Vec2>,
    /// Whether the steering controller drives this player
    pub is_bot: bool,
    pub id: PlayerId,
    pub name: String,
}

impl Player {
    pub fn new(id: PlayerId, name: String, position: Vec2, is_bot: bool) -> Self {
        Self::with_radius(id, name, position, is_bot, physics::PLAYER_RADIUS)
    }

    pub fn with_radius(
        id: PlayerId,
        name: String,
        position: Vec2,
        is_bot: bool,
        radius: f32,
    ) -> Self {
        Self {
            position,
            velocity: Vec2::ZERO,
            radius,
            role: Role::Survivor,
            wander_target: None,
            is_bot,
            id,
            name,
        }
    }

    #[inline]
    pub fn radius(&self) -> f32 {
        self.radius
    }

    #[inline]
    pub fn role(&self) -> Role {
        self.role
    }

    pub fn is_zombie(&self) -> bool {
        self.role == Role::Zombie
    }

    /// Turn this player into a zombie. Returns true if the role changed.
    ///
    /// There is deliberately no way back to Survivor.
    pub fn infect(&mut self) -> bool {
        if self.role == Role::Zombie {
            return false;
        }
        self.role = Role::Zombie;
        true
    }
}

/// Axis-aligned rectangular obstacle
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Obstacle {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Obstacle {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.x + self.width * 0.5, self.y + self.height * 0.5)
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// Point inside the rectangle grown by `padding` on every side
    pub fn contains(&self, point: Vec2, padding: f32) -> bool {
        point.x >= self.x - padding
            && point.x <= self.right() + padding
            && point.y >= self.y - padding
            && point.y <= self.bottom() + padding
    }

    /// Closest point of the rectangle to `point`
    pub fn closest_point(&self, point: Vec2) -> Vec2 {
        Vec2::new(
            point.x.clamp(self.x, self.right()),
            point.y.clamp(self.y, self.bottom()),
        )
    }
}

/// Map dimensions
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapBounds {
    pub width: f32,
    pub height: f32,
}

impl MapBounds {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.width * 0.5, self.height * 0.5)
    }

    /// Clamp a circle center so the circle stays inside the map
    pub fn clamp(&self, position: Vec2, radius: f32) -> Vec2 {
        Vec2::new(
            position.x.clamp(radius, (self.width - radius).max(radius)),
            position.y.clamp(radius, (self.height - radius).max(radius)),
        )
    }

    /// Whether a circle centered at `position` lies fully inside the map
    pub fn contains_circle(&self, position: Vec2, radius: f32) -> bool {
        position.x >= radius
            && position.x <= self.width - radius
            && position.y >= radius
            && position.y <= self.height - radius
    }
}

/// Number of players per role
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoleCounts {
    pub zombies: usize,
    pub survivors: usize,
}

impl RoleCounts {
    pub fn total(&self) -> usize {
        self.zombies + self.survivors
    }
}

/// Complete match session state (host-owned)
#[derive(Debug, Clone)]
pub struct GameState {
    pub tick: u64,
    pub bounds: MapBounds,
    pub match_state: MatchState,
    /// Players in join order
    pub players: Vec<Player>,
    /// Immutable once generated
    pub obstacles: Vec<Obstacle>,
    /// Role counts as of the last tick
    pub counts: RoleCounts,
}

impl GameState {
    pub fn new(bounds: MapBounds, obstacles: Vec<Obstacle>, match_state: MatchState) -> Self {
        Self {
            tick: 0,
            bounds,
            match_state,
            players: Vec::new(),
            obstacles,
            counts: RoleCounts::default(),
        }
    }

    pub fn get_player(&self, id: PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    pub fn get_player_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.id == id)
    }

    pub fn contains_player(&self, id: PlayerId) -> bool {
        self.players.iter().any(|p| p.id == id)
    }

    /// Add a player at the end of the join order
    pub fn add_player(&mut self, player: Player) {
        self.players.push(player);
    }

    /// Remove a player, preserving the join order of the rest
    pub fn remove_player(&mut self, id: PlayerId) -> Option<Player> {
        let index = self.players.iter().position(|p| p.id == id)?;
        Some(self.players.remove(index))
    }

    /// Count players per role
    pub fn role_counts(&self) -> RoleCounts {
        let zombies = self.players.iter().filter(|p| p.is_zombie()).count();
        RoleCounts {
            zombies,
            survivors: self.players.len() - zombies,
        }
    }

    pub fn bot_count(&self) -> usize {
        self.players.iter().filter(|p| p.is_bot).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player(name: &str) -> Player {
        Player::new(Uuid::new_v4(), name.to_string(), Vec2::new(100.0, 100.0), false)
    }

    fn empty_state() -> GameState {
        GameState::new(MapBounds::new(1000.0, 1000.0), Vec::new(), MatchState::default())
    }

    #[test]
    fn test_player_new_is_survivor() {
        let p = player("Alice");
        assert_eq!(p.role(), Role::Survivor);
        assert_eq!(p.radius(), physics::PLAYER_RADIUS);
        assert!(p.wander_target.is_none());
    }

    #[test]
    fn test_infect_is_one_way() {
        let mut p = player("Bob");
        assert!(p.infect());
        assert!(p.is_zombie());
        // Second infection is a no-op
        assert!(!p.infect());
        assert_eq!(p.role(), Role::Zombie);
    }

    #[test]
    fn test_role_opposite() {
        assert_eq!(Role::Zombie.opposite(), Role::Survivor);
        assert_eq!(Role::Survivor.opposite(), Role::Zombie);
    }

    #[test]
    fn test_obstacle_geometry() {
        let o = Obstacle::new(10.0, 20.0, 100.0, 50.0);
        assert_eq!(o.center(), Vec2::new(60.0, 45.0));
        assert!(o.contains(Vec2::new(10.0, 20.0), 0.0));
        assert!(!o.contains(Vec2::new(5.0, 20.0), 0.0));
        assert!(o.contains(Vec2::new(5.0, 20.0), 5.0));
        assert_eq!(o.closest_point(Vec2::new(0.0, 0.0)), Vec2::new(10.0, 20.0));
        assert_eq!(o.closest_point(Vec2::new(50.0, 30.0)), Vec2::new(50.0, 30.0));
    }

    #[test]
    fn test_bounds_clamp() {
        let bounds = MapBounds::new(500.0, 400.0);
        let clamped = bounds.clamp(Vec2::new(-10.0, 900.0), 20.0);
        assert_eq!(clamped, Vec2::new(20.0, 380.0));
    }

    #[test]
    fn test_players_keep_join_order() {
        let mut state = empty_state();
        let a = player("A");
        let b = player("B");
        let c = player("C");
        let b_id = b.id;
        state.add_player(a);
        state.add_player(b);
        state.add_player(c);

        assert!(state.remove_player(b_id).is_some());
        let names: Vec<_> = state.players.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["A", "C"]);
        assert!(state.remove_player(b_id).is_none());
    }

    #[test]
    fn test_role_counts() {
        let mut state = empty_state();
        let mut z = player("Z");
        z.infect();
        state.add_player(z);
        state.add_player(player("S1"));
        state.add_player(player("S2"));

        let counts = state.role_counts();
        assert_eq!(counts.zombies, 1);
        assert_eq!(counts.survivors, 2);
        assert_eq!(counts.total(), 3);
    }

    #[test]
    fn test_role_serialization() {
        assert_eq!(serde_json::to_string(&Role::Zombie).unwrap(), "\"ZOMBIE\"");
        assert_eq!(
            serde_json::to_string(&MatchPhase::GameOver).unwrap(),
            "\"GAME_OVER\""
        );
    }
}
