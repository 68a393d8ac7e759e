/// Movement constants - all speeds are map units per tick
pub mod physics {
    /// Server tick rate in Hz (one tick per rendered host frame)
    pub const TICK_RATE: u32 = 60;
    /// Base movement speed shared by both roles
    pub const BASE_SPEED: f32 = 4.0;
    /// Exponential smoothing factor for human-controlled velocity
    pub const INPUT_SMOOTHING: f32 = 0.2;
    /// Velocities shorter than this snap to zero
    pub const VELOCITY_SNAP: f32 = 0.01;
    /// Player collision radius
    pub const PLAYER_RADIUS: f32 = 20.0;
}

/// Map and obstacle generation constants
pub mod map {
    /// Default map width
    pub const WIDTH: f32 = 2000.0;
    /// Default map height
    pub const HEIGHT: f32 = 2000.0;
    /// Number of elongated walls
    pub const WALL_COUNT: usize = 25;
    /// Number of square debris blocks
    pub const DEBRIS_COUNT: usize = 40;
    /// Radius of the obstacle-free zone around the map center
    pub const SAFE_ZONE_RADIUS: f32 = 200.0;
    /// Wall thickness
    pub const WALL_THICKNESS: f32 = 20.0;
    /// Wall length range [min, max)
    pub const WALL_LENGTH_MIN: f32 = 100.0;
    pub const WALL_LENGTH_MAX: f32 = 500.0;
    /// Debris side range [min, max)
    pub const DEBRIS_SIZE_MIN: f32 = 30.0;
    pub const DEBRIS_SIZE_MAX: f32 = 80.0;
    /// Candidate placements tried per requested obstacle before giving up on it
    pub const PLACEMENT_ATTEMPTS_PER_OBSTACLE: usize = 20;
}

/// Spawn placement constants
pub mod spawn {
    /// Random samples tried before the grid sweep
    pub const MAX_ATTEMPTS: usize = 100;
    /// Grid sweep step (map units)
    pub const SWEEP_STEP: f32 = 40.0;
}

/// Infection rule constants
pub mod infection {
    /// Fraction of the summed radii that counts as contact
    pub const CONTACT_FACTOR: f32 = 0.8;
}

/// Match timing constants (seconds)
pub mod game {
    /// Countdown before the match starts
    pub const COUNTDOWN: f32 = 3.0;
    /// Match duration
    pub const MATCH_DURATION: f32 = 120.0;
    /// Players needed for the automatic Lobby -> Countdown transition
    pub const AUTO_START_PLAYERS: usize = 2;
    /// Players needed for a host force-start
    pub const FORCE_START_PLAYERS: usize = 1;
    /// Upper bound accepted for countdown and match duration
    pub const MAX_DURATION: f32 = 86_400.0;
}

/// Steering controller constants
pub mod ai {
    /// Default number of bots the host binary fills the room with
    pub const COUNT: usize = 0;
    /// Neighbors closer than this push the bot away
    pub const SEPARATION_RADIUS: f32 = 60.0;
    /// Weight of the separation force in the blend
    pub const SEPARATION_WEIGHT: f32 = 2.0;
    /// How far a zombie can spot survivors
    pub const ZOMBIE_VISION: f32 = 450.0;
    /// How far a survivor can spot zombies
    pub const SURVIVOR_VISION: f32 = 350.0;
    /// Targets this close skip the line-of-sight test
    pub const LOS_SKIP_DISTANCE: f32 = 60.0;
    /// Per-tick chance of dropping the wander target while a target is in sight
    pub const FORGET_CHANCE: f32 = 0.01;
    /// Wander targets must be at least this far away when sampled
    pub const WANDER_MIN_DISTANCE: f32 = 400.0;
    /// Wander target counts as reached inside this distance
    pub const WANDER_ARRIVE_DISTANCE: f32 = 60.0;
    /// Samples tried when picking a wander target
    pub const WANDER_ATTEMPTS: usize = 10;
    /// Wander targets stay this far from the map edge
    pub const WANDER_MARGIN: f32 = 50.0;
    /// Look-ahead probe length for wall detection
    pub const LOOKAHEAD: f32 = 40.0;
    /// Push along the wall normal added after removing the into-wall component
    pub const WALL_PUSH: f32 = 0.3;
    /// Velocity smoothing right after a wall correction
    pub const WALL_SMOOTHING: f32 = 0.5;
    /// Velocity smoothing for free movement
    pub const TURN_SMOOTHING: f32 = 0.1;
    /// Direction vectors shorter than this are not renormalized
    pub const MIN_DIRECTION: f32 = 0.01;
}

/// Client-side interpolation constants
pub mod client {
    /// Fraction of the remaining distance covered per client frame
    pub const INTERPOLATION: f32 = 0.3;
}

/// Network constants
pub mod net {
    /// Maximum framed message size
    pub const MAX_MESSAGE_SIZE: usize = 256 * 1024;
    /// Outbound frames queued per peer before sends are dropped
    pub const OUTBOUND_QUEUE: usize = 64;
    /// Maximum nickname length after sanitization
    pub const MAX_NICKNAME_LEN: usize = 16;
}
