/// Secondary checks on the linked effect of each gated cast.
///
/// Both are graded Ok at worst; they flag small losses, not failed windows.
///
///   no-resource: a gated cast produced no linked effect. Only meaningful for
///                the cast build, which spends the resource on every gated cast;
///                the proc build presses the ability regardless.
///   single-hit:  the fan-out linked effect struck only one target.
use super::{item, Grade, RuleContext, RuleOutput};
use crate::{config::ActivationMode, links::{DamageHit, LinkRule}};

pub fn evaluate(ctx: &RuleContext, rule: &LinkRule, links: &[Option<Vec<DamageHit>>]) -> RuleOutput {
    let mut out = Vec::new();
    let gated = &ctx.profile.gated.name;
    let ts = ctx.window.trigger.timestamp_ms;

    let no_resource = match ctx.mode {
        ActivationMode::Cast => links.iter().filter(|l| l.is_none()).count(),
        ActivationMode::Proc => 0,
    };
    if no_resource > 0 {
        out.push(item(
            &rule.relation,
            ts,
            Grade::Ok,
            format!("You cast {} with no {} {} time(s).", gated, rule.resource_name, no_resource),
            format!(
                "{} has significantly lower priority when you have no stacks of {}",
                gated, rule.resource_name
            ),
            vec![("no_resource_casts".to_owned(), no_resource.to_string())],
        ));
    }

    let single_hits = links
        .iter()
        .flatten()
        .filter(|hits| rule.single_target_fan_out(hits))
        .count();
    if single_hits > 0 {
        let fan_out = rule
            .fan_out_spell_id
            .map(|id| ctx.profile.spell_name(id))
            .unwrap_or_default();
        out.push(item(
            &rule.relation,
            ts,
            Grade::Ok,
            format!("{} was primed with {}", rule.name, fan_out),
            format!("{} cast {} {} time(s) only hitting one target.", rule.name, fan_out, single_hits),
            vec![("single_target_casts".to_owned(), single_hits.to_string())],
        ));
    }

    out
}
