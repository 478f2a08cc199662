/// Missed-cast estimation for the gated ability.
///
/// Waste is already haste-adjusted, so it is divided by the *base* cooldown:
///   missed       = floor(waste / base_cooldown)
///   max_possible = actual + missed
use crate::state::Window;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Opportunity {
    pub actual:       u32,
    pub missed:       u32,
    pub max_possible: u32,
}

pub fn missed_casts(waste_ms: f64, base_cooldown_ms: u64) -> u32 {
    if base_cooldown_ms == 0 || !(waste_ms > 0.0) {
        return 0;
    }
    (waste_ms / base_cooldown_ms as f64).floor() as u32
}

impl Opportunity {
    pub fn for_window(window: &Window, gated_spell_id: u32, base_cooldown_ms: u64) -> Self {
        let actual = window.casts_of(gated_spell_id) as u32;
        let missed = missed_casts(window.haste_adjusted_waste_ms, base_cooldown_ms);
        Self { actual, missed, max_possible: actual + missed }
    }

    /// `actual / max_possible`, or `None` when there was nothing to cast.
    pub fn ratio(&self) -> Option<f64> {
        (self.max_possible > 0).then(|| self.actual as f64 / self.max_possible as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{CastRecord, Trigger, TriggerKind};

    fn window(waste: f64, gated_casts: usize) -> Window {
        Window {
            trigger: Trigger { timestamp_ms: 0, spell_id: 114051, kind: TriggerKind::Cast },
            casts: (0..gated_casts)
                .map(|i| CastRecord { timestamp_ms: i as u64, spell_id: 115356, spell_name: String::new() })
                .collect(),
            extra_damage: 0,
            start_ms: 0,
            end_ms: 15_000,
            haste_adjusted_waste_ms: waste,
        }
    }

    #[test]
    fn floors_waste_into_missed_casts() {
        assert_eq!(missed_casts(0.0, 3000), 0);
        assert_eq!(missed_casts(2999.9, 3000), 0);
        assert_eq!(missed_casts(3000.0, 3000), 1);
        assert_eq!(missed_casts(4000.0, 3000), 1);
        assert_eq!(missed_casts(9000.0, 3000), 3);
    }

    #[test]
    fn missed_is_monotonic_in_waste() {
        let mut last = 0;
        for step in 0..200 {
            let missed = missed_casts(step as f64 * 137.5, 3000);
            assert!(missed >= last);
            last = missed;
        }
    }

    #[test]
    fn degenerate_inputs_miss_nothing() {
        assert_eq!(missed_casts(5000.0, 0), 0);
        assert_eq!(missed_casts(-10.0, 3000), 0);
        assert_eq!(missed_casts(f64::NAN, 3000), 0);
    }

    #[test]
    fn counts_gated_casts_and_missed() {
        let o = Opportunity::for_window(&window(4000.0, 1), 115356, 3000);
        assert_eq!(o, Opportunity { actual: 1, missed: 1, max_possible: 2 });
        assert_eq!(o.ratio(), Some(0.5));
    }

    #[test]
    fn empty_window_has_no_ratio() {
        let o = Opportunity::for_window(&window(0.0, 0), 115356, 3000);
        assert_eq!(o.max_possible, 0);
        assert_eq!(o.ratio(), None);
    }
}
