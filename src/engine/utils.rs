/// Vertical coordinate of the entity closest to the spawn line, if any.
pub(super) fn nearest_y<I>(ys: I) -> Option<f64>
where
    I: IntoIterator<Item = f64>,
{
    ys.into_iter().min_by(f64::total_cmp)
}

/// True when a new entity at `spawn_y` would sit at least `min_gap` above
/// every existing entity of its class.
pub(super) fn has_spawn_room(nearest: Option<f64>, spawn_y: f64, min_gap: f64) -> bool {
    nearest.is_none_or(|y| y - spawn_y >= min_gap)
}

pub(super) fn within_reach(entity_x: f64, slot_offset: f64, player_x: f64, hit_distance: f64) -> bool {
    (entity_x + slot_offset - player_x).abs() < hit_distance
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nearest_picks_smallest_y() {
        assert_eq!(nearest_y([400.0, -20.0, 80.0]), Some(-20.0));
        assert_eq!(nearest_y(Vec::<f64>::new()), None);
    }

    #[test]
    fn spawn_room_requires_full_gap() {
        assert!(has_spawn_room(None, -100.0, 250.0));
        assert!(has_spawn_room(Some(150.0), -100.0, 250.0));
        assert!(!has_spawn_room(Some(149.9), -100.0, 250.0));
    }

    #[test]
    fn reach_is_strict_and_offset_aware() {
        assert!(within_reach(100.0, 0.0, 159.0, 60.0));
        assert!(!within_reach(100.0, 0.0, 160.0, 60.0));
        assert!(within_reach(100.0, 300.0, 400.0, 60.0));
        assert!(!within_reach(100.0, 0.0, 400.0, 60.0));
    }
}
