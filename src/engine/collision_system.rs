use tracing::info;

use super::utils::within_reach;
use super::*;

impl GameEngine {
    pub(super) fn resolve_crashes(&mut self) {
        let rules = &self.rules;
        for (idx, player) in self.players.iter_mut().enumerate() {
            if !player.alive {
                continue;
            }
            let offset = rules.slot_offsets[idx];
            let hit = self.obstacles.iter().find(|obstacle| {
                rules.in_collision_band(obstacle.y)
                    && within_reach(obstacle.x, offset, player.x, rules.hit_distance)
            });
            if let Some(obstacle) = hit {
                player.alive = false;
                info!(
                    slot = player.slot,
                    x = player.x,
                    obstacle_x = obstacle.x + offset,
                    tick = self.tick,
                    "participant crashed"
                );
            }
        }
    }

    /// Each pickup goes to the lowest living slot touching it.
    pub(super) fn collect_pickups(&mut self) {
        let rules = &self.rules;
        let players = &mut self.players;
        self.pickups.retain(|pickup| {
            if !rules.in_collision_band(pickup.y) {
                return true;
            }
            let collector = players.iter_mut().enumerate().find(|(idx, player)| {
                player.alive
                    && within_reach(pickup.x, rules.slot_offsets[*idx], player.x, rules.hit_distance)
            });
            match collector {
                Some((_, player)) => {
                    player.pickups = Some(player.pickups.unwrap_or(0) + 1);
                    false
                }
                None => true,
            }
        });
    }
}
