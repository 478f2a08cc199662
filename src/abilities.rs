/// Ability registration for the gated ability.
///
/// The analyzer declares the gated ability's cooldown to whatever host keeps
/// the cast-efficiency table. The cooldown shrinks with haste:
///   cooldown(rate) = base / (1 + rate)
/// The efficiency target is carried for external reporting only; grading
/// uses the fixed tiers in `rules::gated_usage`.
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbilityDeclaration {
    pub spell_id:               u32,
    pub name:                   String,
    pub base_cooldown_ms:       u64,
    /// Base global cooldown triggered by the ability (0 = off-GCD).
    pub gcd_base_ms:            u64,
    pub recommended_efficiency: f64,
}

impl AbilityDeclaration {
    /// Haste-scaled cooldown in milliseconds.
    pub fn cooldown_ms(&self, rate: f64) -> f64 {
        self.base_cooldown_ms as f64 / (1.0 + rate)
    }
}

/// Anything that accepts ability declarations.
pub trait AbilityRegistry {
    fn add(&mut self, declaration: AbilityDeclaration);
}

impl AbilityRegistry for Vec<AbilityDeclaration> {
    fn add(&mut self, declaration: AbilityDeclaration) {
        self.retain(|d| d.spell_id != declaration.spell_id);
        self.push(declaration);
    }
}

/// Observed casts against the estimated maximum, summed over all windows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CastEfficiency {
    pub spell_id:    u32,
    pub casts:       u32,
    pub max_casts:   u32,
    pub recommended: f64,
}

impl CastEfficiency {
    /// `None` when there was nothing to cast.
    pub fn efficiency(&self) -> Option<f64> {
        (self.max_casts > 0).then(|| self.casts as f64 / self.max_casts as f64)
    }

    pub fn meets_target(&self) -> bool {
        self.efficiency().map_or(true, |e| e >= self.recommended)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn windstrike() -> AbilityDeclaration {
        AbilityDeclaration {
            spell_id:               115356,
            name:                   "Windstrike".into(),
            base_cooldown_ms:       3000,
            gcd_base_ms:            1500,
            recommended_efficiency: 0.8,
        }
    }

    #[test]
    fn cooldown_scales_with_haste() {
        let ws = windstrike();
        assert_eq!(ws.cooldown_ms(0.0), 3000.0);
        assert!((ws.cooldown_ms(0.5) - 2000.0).abs() < 1e-9);
    }

    #[test]
    fn registry_replaces_duplicate_declarations() {
        let mut registry: Vec<AbilityDeclaration> = Vec::new();
        registry.add(windstrike());
        let mut changed = windstrike();
        changed.recommended_efficiency = 0.9;
        registry.add(changed);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry[0].recommended_efficiency, 0.9);
    }

    #[test]
    fn efficiency_handles_no_opportunities() {
        let e = CastEfficiency { spell_id: 1, casts: 0, max_casts: 0, recommended: 0.8 };
        assert_eq!(e.efficiency(), None);
        assert!(e.meets_target());

        let e = CastEfficiency { spell_id: 1, casts: 3, max_casts: 5, recommended: 0.8 };
        assert!(!e.meets_target());
    }
}
