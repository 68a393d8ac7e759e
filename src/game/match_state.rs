//! Match state machine
//!
//! `Lobby -> Countdown -> Playing -> GameOver`, with GameOver terminal.
//! Remaining time is always derived from clock readings, never from
//! accumulated per-tick decrements, so frame timing does not skew it.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::game::constants::game;
use crate::game::state::{MatchPhase, RoleCounts};

/// Why a match ended
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchEndReason {
    /// No survivors left while more than one player was present
    AllInfected,
    /// Match duration elapsed
    TimeUp,
}

/// Rejected state machine request
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum MatchError {
    #[error("match already started")]
    NotInLobby,
    #[error("cannot start a match without players")]
    NoPlayers,
}

/// Phase change produced by [`MatchState::update`] or [`MatchState::force_start`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchTransition {
    CountdownStarted,
    /// Entered Playing; the caller assigns the initial zombie
    MatchStarted,
    MatchEnded(MatchEndReason),
}

#[derive(Debug, Clone)]
pub struct MatchState {
    phase: MatchPhase,
    countdown: Duration,
    duration: Duration,
    countdown_started_at: Option<Duration>,
    started_at: Option<Duration>,
    /// Simulation ticks executed while Playing
    playing_ticks: u64,
    end_reason: Option<MatchEndReason>,
    /// Seconds left in the current phase (countdown or match)
    time_left: f32,
}

impl Default for MatchState {
    fn default() -> Self {
        Self::new(game::COUNTDOWN, game::MATCH_DURATION)
    }
}

impl MatchState {
    /// Create a state machine in Lobby with the given durations in seconds
    pub fn new(countdown_secs: f32, match_duration_secs: f32) -> Self {
        let countdown = seconds(countdown_secs, game::COUNTDOWN);
        let duration = seconds(match_duration_secs, game::MATCH_DURATION);
        Self {
            phase: MatchPhase::Lobby,
            countdown,
            duration,
            countdown_started_at: None,
            started_at: None,
            playing_ticks: 0,
            end_reason: None,
            time_left: duration.as_secs_f32(),
        }
    }

    #[inline]
    pub fn phase(&self) -> MatchPhase {
        self.phase
    }

    #[inline]
    pub fn time_left(&self) -> f32 {
        self.time_left
    }

    pub fn end_reason(&self) -> Option<MatchEndReason> {
        self.end_reason
    }

    /// Clock reading at which Playing began
    pub fn started_at(&self) -> Option<Duration> {
        self.started_at
    }

    pub fn playing_ticks(&self) -> u64 {
        self.playing_ticks
    }

    pub fn is_playing(&self) -> bool {
        self.phase == MatchPhase::Playing
    }

    /// Host-requested Lobby -> Countdown with at least one player
    pub fn force_start(
        &mut self,
        player_count: usize,
        now: Duration,
    ) -> Result<MatchTransition, MatchError> {
        if self.phase != MatchPhase::Lobby {
            return Err(MatchError::NotInLobby);
        }
        if player_count < game::FORCE_START_PLAYERS {
            return Err(MatchError::NoPlayers);
        }
        self.enter_countdown(now);
        Ok(MatchTransition::CountdownStarted)
    }

    /// Note that one simulation tick ran in Playing
    ///
    /// Role-count win conditions stay disarmed until this has been called at
    /// least once since the match started.
    pub fn record_playing_tick(&mut self) {
        if self.phase == MatchPhase::Playing {
            self.playing_ticks += 1;
        }
    }

    /// Advance the state machine; at most one transition per call
    pub fn update(&mut self, now: Duration, counts: RoleCounts) -> Option<MatchTransition> {
        match self.phase {
            MatchPhase::Lobby => {
                self.time_left = self.duration.as_secs_f32();
                if counts.total() >= game::AUTO_START_PLAYERS {
                    self.enter_countdown(now);
                    return Some(MatchTransition::CountdownStarted);
                }
                None
            }
            MatchPhase::Countdown => {
                let started = self.countdown_started_at.unwrap_or(now);
                let elapsed = now.saturating_sub(started);
                if elapsed >= self.countdown {
                    self.phase = MatchPhase::Playing;
                    self.started_at = Some(now);
                    self.playing_ticks = 0;
                    self.time_left = self.duration.as_secs_f32();
                    info!("Match started");
                    return Some(MatchTransition::MatchStarted);
                }
                self.time_left = (self.countdown - elapsed).as_secs_f32();
                None
            }
            MatchPhase::Playing => {
                let started = self.started_at.unwrap_or(now);
                let elapsed = now.saturating_sub(started);
                self.time_left = self.duration.saturating_sub(elapsed).as_secs_f32();

                if self.playing_ticks >= 1 && counts.total() > 1 && counts.survivors == 0 {
                    return Some(self.end(MatchEndReason::AllInfected));
                }
                if elapsed >= self.duration {
                    return Some(self.end(MatchEndReason::TimeUp));
                }
                None
            }
            MatchPhase::GameOver => None,
        }
    }

    fn enter_countdown(&mut self, now: Duration) {
        self.phase = MatchPhase::Countdown;
        self.countdown_started_at = Some(now);
        self.time_left = self.countdown.as_secs_f32();
        info!("Countdown started ({:.1}s)", self.time_left);
    }

    fn end(&mut self, reason: MatchEndReason) -> MatchTransition {
        self.phase = MatchPhase::GameOver;
        self.end_reason = Some(reason);
        info!("Match over: {:?}", reason);
        MatchTransition::MatchEnded(reason)
    }
}

/// Non-negative seconds as a Duration; out-of-range values fall back to `default`
fn seconds(value: f32, default: f32) -> Duration {
    Duration::try_from_secs_f32(value.max(0.0)).unwrap_or_else(|_| {
        warn!("Duration of {} seconds is out of range, using {}", value, default);
        Duration::from_secs_f32(default)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counts(zombies: usize, survivors: usize) -> RoleCounts {
        RoleCounts { zombies, survivors }
    }

    fn secs(s: f32) -> Duration {
        Duration::from_secs_f32(s)
    }

    /// Drive a state machine into Playing at t = 3s
    fn playing() -> MatchState {
        let mut state = MatchState::new(3.0, 120.0);
        assert_eq!(
            state.update(secs(0.0), counts(0, 2)),
            Some(MatchTransition::CountdownStarted)
        );
        assert_eq!(
            state.update(secs(3.0), counts(0, 2)),
            Some(MatchTransition::MatchStarted)
        );
        state
    }

    #[test]
    fn test_lobby_waits_for_two_players() {
        let mut state = MatchState::default();
        assert_eq!(state.update(secs(1.0), counts(0, 1)), None);
        assert_eq!(state.phase(), MatchPhase::Lobby);
        assert_eq!(state.time_left(), game::MATCH_DURATION);

        assert_eq!(
            state.update(secs(2.0), counts(0, 2)),
            Some(MatchTransition::CountdownStarted)
        );
        assert_eq!(state.phase(), MatchPhase::Countdown);
    }

    #[test]
    fn test_force_start() {
        let mut state = MatchState::default();
        assert_eq!(state.force_start(0, secs(0.0)), Err(MatchError::NoPlayers));
        assert_eq!(
            state.force_start(1, secs(0.0)),
            Ok(MatchTransition::CountdownStarted)
        );
        assert_eq!(state.force_start(1, secs(0.0)), Err(MatchError::NotInLobby));
    }

    #[test]
    fn test_unrepresentable_durations_fall_back() {
        let state = MatchState::new(f32::NAN, f32::INFINITY);
        assert_eq!(state.time_left(), game::MATCH_DURATION);

        let mut state = MatchState::new(1e30, -5.0);
        assert_eq!(state.time_left(), 0.0);
        state.force_start(1, secs(0.0)).unwrap();
        assert_eq!(state.time_left(), game::COUNTDOWN);
    }

    #[test]
    fn test_countdown_elapses_into_playing() {
        let mut state = MatchState::new(3.0, 120.0);
        state.update(secs(10.0), counts(0, 2));

        assert_eq!(state.update(secs(11.5), counts(0, 2)), None);
        assert!((state.time_left() - 1.5).abs() < 1e-3);

        assert_eq!(
            state.update(secs(13.0), counts(0, 2)),
            Some(MatchTransition::MatchStarted)
        );
        assert!(state.is_playing());
        assert_eq!(state.started_at(), Some(secs(13.0)));
        assert_eq!(state.time_left(), 120.0);
    }

    #[test]
    fn test_all_infected_not_evaluated_before_first_playing_tick() {
        let mut state = playing();
        // Stale counts from before the zombie was assigned must not end the match
        assert_eq!(state.update(secs(3.0), counts(2, 0)), None);
        assert!(state.is_playing());

        state.record_playing_tick();
        assert_eq!(
            state.update(secs(3.1), counts(2, 0)),
            Some(MatchTransition::MatchEnded(MatchEndReason::AllInfected))
        );
        assert_eq!(state.end_reason(), Some(MatchEndReason::AllInfected));
    }

    #[test]
    fn test_single_player_never_ends_by_infection() {
        let mut state = MatchState::default();
        state.force_start(1, secs(0.0)).unwrap();
        state.update(secs(3.0), counts(0, 1));
        state.record_playing_tick();

        // Lone zombie: more-than-one-player condition fails
        assert_eq!(state.update(secs(4.0), counts(1, 0)), None);
        assert!(state.is_playing());
    }

    #[test]
    fn test_time_up() {
        let mut state = playing();
        state.record_playing_tick();

        assert_eq!(state.update(secs(60.0), counts(1, 1)), None);
        assert!((state.time_left() - 63.0).abs() < 1e-3);

        assert_eq!(
            state.update(secs(123.0), counts(1, 1)),
            Some(MatchTransition::MatchEnded(MatchEndReason::TimeUp))
        );
        assert_eq!(state.time_left(), 0.0);
    }

    #[test]
    fn test_time_up_independent_of_frame_timing() {
        // Same wall-clock span, wildly different tick cadences
        let cadences = [1.0 / 240.0, 1.0 / 60.0, 0.25, 7.0];
        for step in cadences {
            let mut state = playing();
            let mut t = 3.0f32;
            let ended_at = loop {
                t += step;
                state.record_playing_tick();
                if let Some(MatchTransition::MatchEnded(reason)) =
                    state.update(secs(t), counts(1, 1))
                {
                    assert_eq!(reason, MatchEndReason::TimeUp);
                    break t;
                }
            };
            // Ends on the first tick at or after the deadline
            assert!(ended_at >= 123.0 - 1e-3);
            assert!(ended_at < 123.0 + step + 1e-3);
        }
    }

    #[test]
    fn test_game_over_is_terminal() {
        let mut state = playing();
        state.record_playing_tick();
        state.update(secs(200.0), counts(1, 1));
        assert_eq!(state.phase(), MatchPhase::GameOver);

        assert_eq!(state.update(secs(300.0), counts(0, 5)), None);
        state.record_playing_tick();
        assert_eq!(state.phase(), MatchPhase::GameOver);
        assert_eq!(state.force_start(3, secs(300.0)), Err(MatchError::NotInLobby));
    }

    #[test]
    fn test_end_reason_serialization() {
        assert_eq!(
            serde_json::to_string(&MatchEndReason::AllInfected).unwrap(),
            "\"ALL_INFECTED\""
        );
        assert_eq!(
            serde_json::to_string(&MatchEndReason::TimeUp).unwrap(),
            "\"TIME_UP\""
        );
    }
}
