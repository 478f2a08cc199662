pub mod gated_usage;
pub mod linked_effects;

use crate::{config::ActivationMode, links::DamageHit, specs::SpecProfile, state::Window};
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Grades
// ---------------------------------------------------------------------------

/// Qualitative grade, ordered worst to best.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Grade {
    Fail,
    Ok,
    Good,
    Perfect,
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Grade::Fail    => "Fail",
            Grade::Ok      => "Ok",
            Grade::Good    => "Good",
            Grade::Perfect => "Perfect",
        };
        f.write_str(s)
    }
}

/// A window is only as good as its worst check. No checks = nothing wrong.
pub fn combine<I: IntoIterator<Item = Grade>>(grades: I) -> Grade {
    grades.into_iter().min().unwrap_or(Grade::Perfect)
}

/// "<Grade> Usage", except that a failed window reads "Bad Usage".
pub fn usage_label(grade: Grade) -> String {
    match grade {
        Grade::Fail => "Bad Usage".to_owned(),
        other       => format!("{} Usage", other),
    }
}

// ---------------------------------------------------------------------------
// Checklist items
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChecklistItem {
    pub check:        String,
    pub timestamp_ms: u64,
    pub grade:        Grade,
    pub summary:      String,
    pub details:      String,
    pub kv:           Vec<(String, String)>,
}

/// Read-only context passed to every rule.
pub struct RuleContext<'a> {
    pub window:  &'a Window,
    pub profile: &'a SpecProfile,
    pub mode:    ActivationMode,
}

/// Rules return zero or more checklist items.
pub type RuleOutput = Vec<ChecklistItem>;

/// Convenience constructor so rules don't repeat boilerplate.
pub fn item(
    check:        &str,
    timestamp_ms: u64,
    grade:        Grade,
    summary:      String,
    details:      String,
    kv:           Vec<(String, String)>,
) -> ChecklistItem {
    ChecklistItem {
        check: check.to_owned(),
        timestamp_ms,
        grade,
        summary,
        details,
        kv,
    }
}

/// Run every rule against a closed window.
///
/// `links` holds one entry per gated cast in the window, in cast order.
pub fn evaluate(ctx: &RuleContext, links: &[Option<Vec<DamageHit>>]) -> RuleOutput {
    let mut items = vec![gated_usage::evaluate(ctx)];
    if let Some(rule) = ctx.profile.link.as_ref() {
        items.extend(linked_effects::evaluate(ctx, rule, links));
    }
    items
}
