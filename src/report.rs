/// Report types handed to whatever renders the review (serialised as JSON by
/// the CLI). Building a report is pure: correlate linked effects, run the
/// rules, combine grades, count fillers.
use crate::{
    abilities::CastEfficiency,
    config::ActivationMode,
    links::{DamageHit, DamageIndex},
    opportunity::Opportunity,
    procs::ProcStatistics,
    rules::{self, ChecklistItem, Grade, RuleContext},
    specs::SpecProfile,
    state::{Trigger, Window},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// Payload types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FillerCount {
    pub spell_id:   u32,
    pub spell_name: String,
    pub casts:      u32,
}

/// One graded empowerment window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowReport {
    pub trigger:                 Trigger,
    pub start_ms:                u64,
    pub end_ms:                  u64,
    pub extra_damage:            u64,
    pub haste_adjusted_waste_ms: f64,
    pub opportunity:             Opportunity,
    pub checklist:               Vec<ChecklistItem>,
    pub grade:                   Grade,
    /// "Perfect Usage", "Good Usage", "Ok Usage" or "Bad Usage".
    pub label:                   String,
    /// Non-gated casts inside the window, most frequent first.
    pub fillers:                 Vec<FillerCount>,
}

/// Everything produced by one replay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub profile:           String,
    pub activation:        ActivationMode,
    pub windows:           Vec<WindowReport>,
    pub cast_efficiency:   CastEfficiency,
    /// Casts-per-proc distribution; only meaningful for the proc build.
    pub procs:             Option<ProcStatistics>,
    /// First reviewed event to fight end (or the last timestamp).
    pub fight_duration_ms: u64,
    /// Fraction of the fight spent inside windows; `None` for an empty fight.
    pub buff_uptime:       Option<f64>,
}

impl AnalysisReport {
    pub fn overall(&self) -> Grade {
        rules::combine(self.windows.iter().map(|w| w.grade))
    }
}

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

/// Non-gated casts grouped by ability.
pub fn fillers(window: &Window, profile: &SpecProfile) -> Vec<FillerCount> {
    let mut counts: BTreeMap<u32, u32> = BTreeMap::new();
    for cast in window.casts.iter().filter(|c| c.spell_id != profile.gated.spell_id) {
        *counts.entry(cast.spell_id).or_insert(0) += 1;
    }
    let mut out: Vec<FillerCount> = counts
        .into_iter()
        .map(|(spell_id, casts)| FillerCount { spell_id, spell_name: profile.spell_name(spell_id), casts })
        .collect();
    out.sort_by(|a, b| b.casts.cmp(&a.casts).then(a.spell_id.cmp(&b.spell_id)));
    out
}

/// Summed window duration over fight duration.
pub fn buff_uptime(windows: &[Window], fight_duration_ms: u64) -> Option<f64> {
    if fight_duration_ms == 0 {
        return None;
    }
    let covered: u64 = windows.iter().map(Window::duration_ms).sum();
    Some((covered as f64 / fight_duration_ms as f64).min(1.0))
}

pub fn window_report(
    window:  &Window,
    profile: &SpecProfile,
    mode:    ActivationMode,
    damage:  &DamageIndex,
) -> WindowReport {
    let gated_casts: Vec<u64> = window
        .casts
        .iter()
        .filter(|c| c.spell_id == profile.gated.spell_id)
        .map(|c| c.timestamp_ms)
        .collect();
    let links: Vec<Option<Vec<DamageHit>>> = match profile.link.as_ref() {
        Some(rule) => rule.correlate(&gated_casts, damage),
        None => Vec::new(),
    };

    let ctx = RuleContext { window, profile, mode };
    let checklist = rules::evaluate(&ctx, &links);
    let grade = rules::combine(checklist.iter().map(|i| i.grade));

    WindowReport {
        trigger:                 window.trigger.clone(),
        start_ms:                window.start_ms,
        end_ms:                  window.end_ms,
        extra_damage:            window.extra_damage,
        haste_adjusted_waste_ms: window.haste_adjusted_waste_ms,
        opportunity:             Opportunity::for_window(window, profile.gated.spell_id, profile.gated.base_cooldown_ms),
        checklist,
        grade,
        label:                   rules::usage_label(grade),
        fillers:                 fillers(window, profile),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::specs;
    use crate::state::{CastRecord, TriggerKind};

    fn cast(ts: u64, spell_id: u32) -> CastRecord {
        CastRecord { timestamp_ms: ts, spell_id, spell_name: String::new() }
    }

    #[test]
    fn fillers_exclude_gated_ability() {
        let profile = specs::load_by_key("SHAMAN/Enhancement").unwrap();
        let window = Window {
            trigger: Trigger { timestamp_ms: 0, spell_id: 114051, kind: TriggerKind::Cast },
            casts: vec![cast(0, 115356), cast(1, 60103), cast(2, 17364), cast(3, 60103), cast(4, 115356)],
            extra_damage: 0,
            start_ms: 0,
            end_ms: 5,
            haste_adjusted_waste_ms: 0.0,
        };
        let f = fillers(&window, &profile);
        assert_eq!(f.len(), 2);
        assert_eq!(f[0], FillerCount { spell_id: 60103, spell_name: "Lava Lash".into(), casts: 2 });
        assert_eq!(f[1].spell_id, 17364);
    }

    #[test]
    fn uptime_sums_window_durations() {
        let window = |start_ms, end_ms| Window {
            trigger: Trigger { timestamp_ms: start_ms, spell_id: 114051, kind: TriggerKind::BuffApply },
            casts: Vec::new(),
            extra_damage: 0,
            start_ms,
            end_ms,
            haste_adjusted_waste_ms: 0.0,
        };
        let windows = [window(0, 15_000), window(60_000, 75_000)];
        assert_eq!(buff_uptime(&windows, 120_000), Some(0.25));
        assert_eq!(buff_uptime(&[], 120_000), Some(0.0));
        assert_eq!(buff_uptime(&windows, 0), None);
    }

    #[test]
    fn window_report_combines_items() {
        let profile = specs::load_by_key("SHAMAN/Enhancement").unwrap();
        let window = Window {
            trigger: Trigger { timestamp_ms: 0, spell_id: 114051, kind: TriggerKind::Cast },
            casts: vec![cast(0, 115356), cast(3000, 115356)],
            extra_damage: 0,
            start_ms: 0,
            end_ms: 5000,
            haste_adjusted_waste_ms: 0.0,
        };
        let mut damage = DamageIndex::default();
        damage.record(DamageHit { timestamp_ms: 10, spell_id: 188196, target_guid: "a".into(), amount: 5 });

        // Second Windstrike had no linked bolt: Perfect usage, Ok overall.
        let report = window_report(&window, &profile, ActivationMode::Cast, &damage);
        assert_eq!(report.checklist.len(), 2);
        assert_eq!(report.checklist[0].grade, Grade::Perfect);
        assert_eq!(report.grade, Grade::Ok);
        assert_eq!(report.label, "Ok Usage");

        let report = window_report(&window, &profile, ActivationMode::Proc, &damage);
        assert_eq!(report.grade, Grade::Perfect);
        assert_eq!(report.label, "Perfect Usage");
        assert!(report.fillers.is_empty());
    }
}
