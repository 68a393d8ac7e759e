use std::net::{IpAddr, Ipv4Addr};
use std::str::FromStr;
use std::time::Duration;

use crate::game::constants::{ai, game, map, net, physics};

/// Configuration validation failure
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("port cannot be 0")]
    ZeroPort,
    #[error("tick_rate must be 1-240, got {0}")]
    TickRate(u32),
    #[error("map must be larger than the safe zone ({width}x{height}, safe radius {safe_radius})")]
    MapTooSmall {
        width: f32,
        height: f32,
        safe_radius: f32,
    },
    #[error("{0} must be positive")]
    NonPositive(&'static str),
    #[error("{field} must be a finite number of seconds up to {max}, got {value}")]
    Duration {
        field: &'static str,
        value: f32,
        max: f32,
    },
}

/// Host process configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind the WebTransport endpoint to
    pub bind_address: IpAddr,
    /// WebTransport port
    pub port: u16,
    /// Metrics HTTP port
    pub metrics_port: u16,
    /// Simulation ticks per second
    pub tick_rate: u32,
    /// Outbound frames buffered per peer before sends are dropped
    pub outbound_queue: usize,
    /// Nickname of the host's own player (None = dedicated host without a player)
    pub host_nickname: Option<String>,
    /// Autonomous players added when the room opens
    pub bot_count: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)),
            port: 4433,
            metrics_port: 9090,
            tick_rate: physics::TICK_RATE,
            outbound_queue: net::OUTBOUND_QUEUE,
            host_nickname: Some("Host".to_string()),
            bot_count: ai::COUNT,
        }
    }
}

impl ServerConfig {
    /// Load config from environment or use defaults
    pub fn load_or_default() -> Self {
        let mut config = Self::default();

        if let Some(addr) = env_parse::<IpAddr>("BIND_ADDRESS") {
            config.bind_address = addr;
        }
        if let Some(port) = env_parse::<u16>("PORT") {
            config.port = port;
        }
        if let Some(port) = env_parse::<u16>("METRICS_PORT") {
            config.metrics_port = port;
        }
        if let Some(rate) = env_parse::<u32>("TICK_RATE") {
            config.tick_rate = rate;
        }
        if let Some(depth) = env_parse::<usize>("OUTBOUND_QUEUE") {
            config.outbound_queue = depth;
        }
        if let Some(count) = env_parse::<usize>("BOT_COUNT") {
            config.bot_count = count;
        }
        if let Ok(name) = std::env::var("HOST_NICKNAME") {
            let name = name.trim();
            config.host_nickname = if name.is_empty() {
                None
            } else {
                Some(name.to_string())
            };
        }

        config
    }

    /// Duration of one simulation tick
    pub fn tick_duration(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.tick_rate.max(1) as f64)
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::ZeroPort);
        }
        if self.tick_rate == 0 || self.tick_rate > 240 {
            return Err(ConfigError::TickRate(self.tick_rate));
        }
        if self.outbound_queue == 0 {
            return Err(ConfigError::NonPositive("outbound_queue"));
        }
        Ok(())
    }
}

/// Simulation tuning for one match session
#[derive(Debug, Clone)]
pub struct GameConfig {
    pub map_width: f32,
    pub map_height: f32,
    pub wall_count: usize,
    pub debris_count: usize,
    pub safe_zone_radius: f32,
    pub player_radius: f32,
    /// Base speed in map units per tick
    pub base_speed: f32,
    pub zombie_speed_multiplier: f32,
    pub survivor_speed_multiplier: f32,
    pub zombie_vision: f32,
    pub survivor_vision: f32,
    /// Countdown before Playing (seconds)
    pub countdown: f32,
    /// Match duration (seconds)
    pub match_duration: f32,
    /// Seed for obstacle generation, spawns and bot decisions (None = entropy)
    pub seed: Option<u64>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            map_width: map::WIDTH,
            map_height: map::HEIGHT,
            wall_count: map::WALL_COUNT,
            debris_count: map::DEBRIS_COUNT,
            safe_zone_radius: map::SAFE_ZONE_RADIUS,
            player_radius: physics::PLAYER_RADIUS,
            base_speed: physics::BASE_SPEED,
            zombie_speed_multiplier: 1.0,
            survivor_speed_multiplier: 1.0,
            zombie_vision: ai::ZOMBIE_VISION,
            survivor_vision: ai::SURVIVOR_VISION,
            countdown: game::COUNTDOWN,
            match_duration: game::MATCH_DURATION,
            seed: None,
        }
    }
}

impl GameConfig {
    /// Load config from environment or use defaults
    pub fn load_or_default() -> Self {
        let mut config = Self::default();

        if let Some(v) = env_parse::<f32>("MAP_WIDTH") {
            config.map_width = v;
        }
        if let Some(v) = env_parse::<f32>("MAP_HEIGHT") {
            config.map_height = v;
        }
        if let Some(v) = env_parse::<usize>("WALL_COUNT") {
            config.wall_count = v;
        }
        if let Some(v) = env_parse::<usize>("DEBRIS_COUNT") {
            config.debris_count = v;
        }
        if let Some(v) = env_parse::<f32>("ZOMBIE_SPEED_MULTIPLIER") {
            config.zombie_speed_multiplier = v;
        }
        if let Some(v) = env_parse::<f32>("SURVIVOR_SPEED_MULTIPLIER") {
            config.survivor_speed_multiplier = v;
        }
        if let Some(v) = env_parse::<f32>("COUNTDOWN_SECS") {
            config.countdown = v;
        }
        if let Some(v) = env_parse::<f32>("MATCH_DURATION_SECS") {
            config.match_duration = v;
        }
        if let Some(v) = env_parse::<u64>("MAP_SEED") {
            config.seed = Some(v);
        }

        config
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.map_width <= self.safe_zone_radius * 2.0
            || self.map_height <= self.safe_zone_radius * 2.0
        {
            return Err(ConfigError::MapTooSmall {
                width: self.map_width,
                height: self.map_height,
                safe_radius: self.safe_zone_radius,
            });
        }
        if self.player_radius <= 0.0 {
            return Err(ConfigError::NonPositive("player_radius"));
        }
        if self.base_speed <= 0.0 {
            return Err(ConfigError::NonPositive("base_speed"));
        }
        for (field, value) in [("countdown", self.countdown), ("match_duration", self.match_duration)] {
            if !value.is_finite() || value > game::MAX_DURATION {
                return Err(ConfigError::Duration {
                    field,
                    value,
                    max: game::MAX_DURATION,
                });
            }
        }
        if self.match_duration <= 0.0 {
            return Err(ConfigError::NonPositive("match_duration"));
        }
        if self.countdown < 0.0 {
            return Err(ConfigError::NonPositive("countdown"));
        }
        Ok(())
    }
}

/// Read and parse an environment variable, warning on invalid values
fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!("Invalid {} '{}', using default", key, raw);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_server_config() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 4433);
        assert_eq!(config.tick_rate, 60);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_tick_duration() {
        let config = ServerConfig {
            tick_rate: 50,
            ..Default::default()
        };
        assert_eq!(config.tick_duration(), Duration::from_millis(20));
    }

    #[test]
    fn test_server_config_rejects_zero_tick_rate() {
        let config = ServerConfig {
            tick_rate: 0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::TickRate(0)));
    }

    #[test]
    fn test_default_game_config() {
        let config = GameConfig::default();
        assert_eq!(config.zombie_speed_multiplier, config.survivor_speed_multiplier);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_game_config_rejects_unrepresentable_durations() {
        for bad in [f32::INFINITY, f32::NAN, 1e30] {
            let config = GameConfig {
                match_duration: bad,
                ..Default::default()
            };
            assert!(matches!(
                config.validate(),
                Err(ConfigError::Duration { field: "match_duration", .. })
            ));
        }

        let config = GameConfig {
            countdown: f32::INFINITY,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Duration { field: "countdown", .. })
        ));
    }

    #[test]
    fn test_game_config_rejects_tiny_map() {
        let config = GameConfig {
            map_width: 300.0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MapTooSmall { .. })
        ));
    }

    #[test]
    fn test_load_or_default() {
        let config = GameConfig::load_or_default();
        assert!(config.map_width > 0.0);
        let server = ServerConfig::load_or_default();
        assert!(server.tick_rate > 0);
    }
}
