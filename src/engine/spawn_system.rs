use tracing::debug;

use super::utils::{has_spawn_room, nearest_y};
use super::*;

impl GameEngine {
    /// One obstacle attempt per tick. A roll that lands while the spawn line
    /// is crowded is dropped, not deferred.
    pub(super) fn try_spawn_obstacle(&mut self) {
        if self.rules.lanes.is_empty() || !self.rng.chance(self.rules.obstacle_spawn_chance) {
            return;
        }
        let nearest = nearest_y(self.obstacles.iter().map(|obstacle| obstacle.y));
        if !has_spawn_room(nearest, self.rules.spawn_y, self.rules.obstacle_min_gap) {
            return;
        }

        let lane = self.rules.lanes[self.rng.pick_index(self.rules.lanes.len())];
        let img = self
            .rules
            .obstacle_images
            .get(self.rng.pick_index(self.rules.obstacle_images.len()))
            .cloned()
            .unwrap_or_default();
        debug!(tick = self.tick, side = ?lane.side, x = lane.x, img = %img, "spawned obstacle");
        self.obstacles.push(ObstacleView {
            x: lane.x,
            y: self.rules.spawn_y,
            side: lane.side,
            img,
        });
        self.last_obstacle_y = Some(self.rules.spawn_y);
    }

    pub(super) fn try_spawn_pickup(&mut self) {
        if self.rules.lanes.is_empty() || !self.rng.chance(self.rules.pickup_spawn_chance) {
            return;
        }
        let nearest = nearest_y(self.pickups.iter().map(|pickup| pickup.y));
        if !has_spawn_room(nearest, self.rules.spawn_y, self.rules.pickup_min_gap) {
            return;
        }

        let lane = self.rules.lanes[self.rng.pick_index(self.rules.lanes.len())];
        let kind = self
            .rules
            .pickup_kinds
            .get(self.rng.pick_index(self.rules.pickup_kinds.len()))
            .cloned()
            .unwrap_or_default();
        debug!(tick = self.tick, x = lane.x, kind = %kind, "spawned pickup");
        self.pickups.push(PickupView {
            x: lane.x,
            y: self.rules.spawn_y,
            kind,
        });
        self.last_pickup_y = Some(self.rules.spawn_y);
    }
}
