//! Latest-input slots
//!
//! One slot per player identity holding the most recent movement direction.
//! Connection handlers overwrite the slot; the game loop reads it once per
//! tick without consuming it, so a player keeps moving in the last reported
//! direction until a new input arrives. Stale inputs are never queued.

use std::sync::Arc;

use hashbrown::HashMap;
use parking_lot::Mutex;

use crate::game::state::PlayerId;
use crate::util::vec2::Vec2;

/// Shared latest-input table
///
/// Cloning is cheap; all clones refer to the same slots. The lock is only
/// held for a single map operation.
#[derive(Debug, Clone, Default)]
pub struct InputBuffer {
    slots: Arc<Mutex<HashMap<PlayerId, Vec2>>>,
}

impl InputBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the slot for `player_id`
    ///
    /// Non-finite components are treated as zero and the vector is clamped to
    /// length 1.
    pub fn submit(&self, player_id: PlayerId, direction: Vec2) {
        let direction = sanitize(direction);
        self.slots.lock().insert(player_id, direction);
    }

    /// Copy every slot out under one lock acquisition
    pub fn snapshot(&self) -> HashMap<PlayerId, Vec2> {
        self.slots.lock().clone()
    }

    pub fn remove(&self, player_id: PlayerId) {
        self.slots.lock().remove(&player_id);
    }

    /// Drop slots whose identity no longer passes `keep`
    pub fn retain<F>(&self, mut keep: F)
    where
        F: FnMut(&PlayerId) -> bool,
    {
        self.slots.lock().retain(|id, _| keep(id));
    }

    pub fn len(&self) -> usize {
        self.slots.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.lock().is_empty()
    }
}

fn sanitize(direction: Vec2) -> Vec2 {
    if !direction.is_finite() {
        return Vec2::ZERO;
    }
    direction.clamp_length(1.0)
}
