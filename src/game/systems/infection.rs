use smallvec::SmallVec;

use crate::game::constants::infection::CONTACT_FACTOR;
use crate::game::state::{GameState, Player, PlayerId, Role, RoleCounts};

/// Players infected in one pass, victim then infector
pub type Infections = SmallVec<[(PlayerId, PlayerId); 4]>;

/// Whether two players are close enough for contact
#[inline]
pub fn in_contact(a: &Player, b: &Player) -> bool {
    let reach = CONTACT_FACTOR * (a.radius() + b.radius());
    a.position.distance_sq_to(b.position) < reach * reach
}

/// Run one infection pass
///
/// Contact is evaluated against the zombies present when the pass starts, so
/// a survivor infected this tick cannot infect others until the next tick and
/// the result does not depend on player order.
pub fn update(state: &mut GameState) -> Infections {
    let mut infections = Infections::new();

    {
        let zombies: SmallVec<[&Player; 8]> =
            state.players.iter().filter(|p| p.is_zombie()).collect();
        if zombies.is_empty() {
            return infections;
        }

        for survivor in state.players.iter().filter(|p| p.role() == Role::Survivor) {
            if let Some(zombie) = zombies.iter().find(|z| in_contact(z, survivor)) {
                infections.push((survivor.id, zombie.id));
            }
        }
    }

    for (victim, _) in &infections {
        if let Some(player) = state.get_player_mut(*victim) {
            player.infect();
        }
    }

    infections
}

/// Recount roles and store the result on the state
pub fn refresh_counts(state: &mut GameState) -> RoleCounts {
    state.counts = state.role_counts();
    state.counts
}
