/// Grades how many gated casts were made against how many were possible.
///
///   missed == 0          → Perfect
///   actual / max >= 0.8  → Good
///   actual / max >= 0.6  → Ok
///   otherwise            → Fail
///
/// The summary sets the bar at 85% of the maximum, rounded down.
use super::{item, ChecklistItem, Grade, RuleContext};
use crate::opportunity::Opportunity;

pub const KEY: &str = "gated-usage";
const GOOD_RATIO: f64 = 0.8;
const OK_RATIO:   f64 = 0.6;
const TARGET_SHARE: f64 = 0.85;

pub fn grade(opportunity: &Opportunity) -> Grade {
    if opportunity.missed == 0 {
        return Grade::Perfect;
    }
    match opportunity.ratio() {
        Some(r) if r >= GOOD_RATIO => Grade::Good,
        Some(r) if r >= OK_RATIO   => Grade::Ok,
        _                          => Grade::Fail,
    }
}

pub fn evaluate(ctx: &RuleContext) -> ChecklistItem {
    let gated = &ctx.profile.gated;
    let opportunity = Opportunity::for_window(ctx.window, gated.spell_id, gated.base_cooldown_ms);
    let grade = grade(&opportunity);

    let target = (opportunity.max_possible as f64 * TARGET_SHARE).floor() as u32;
    let summary = format!("Cast {}+ {}(s) during window", target, gated.name);
    let details = if opportunity.missed == 0 {
        format!("You cast {} {}(s).", opportunity.actual, gated.name)
    } else {
        format!(
            "You cast {} {}(s) when you could have cast {}",
            opportunity.actual, gated.name, opportunity.max_possible
        )
    };

    item(
        KEY,
        ctx.window.trigger.timestamp_ms,
        grade,
        summary,
        details,
        vec![
            ("casts".to_owned(),        opportunity.actual.to_string()),
            ("missed".to_owned(),       opportunity.missed.to_string()),
            ("max_possible".to_owned(), opportunity.max_possible.to_string()),
        ],
    )
}
