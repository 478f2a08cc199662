/// Linked-effect correlation.
///
/// Some gated casts fire a follow-up spell for free (e.g. Windstrike releasing
/// a Thorim's Invocation Lightning Bolt or Chain Lightning). The log has no
/// explicit cause/effect link, so it is reconstructed here from timing:
///
///   hit h is linked to gated cast c  iff
///     h.spell_id ∈ rule.linked_spell_ids
///     c.ts <= h.ts <= c.ts + rule.max_delay_ms
///     h.ts <  ts of the next gated cast
///
/// so each hit belongs to at most one cast: the latest one at or before it.
/// All hits in the index are the coached player's own (the dispatcher has
/// already filtered by actor).
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DamageHit {
    pub timestamp_ms: u64,
    pub spell_id:     u32,
    pub target_guid:  String,
    pub amount:       u64,
}

/// Every damage hit of the fight, keyed by timestamp.
#[derive(Debug, Default)]
pub struct DamageIndex {
    by_time: BTreeMap<u64, Vec<DamageHit>>,
}

impl DamageIndex {
    pub fn record(&mut self, hit: DamageHit) {
        self.by_time.entry(hit.timestamp_ms).or_default().push(hit);
    }

    /// Hits with `from_ms <= ts <= to_ms`, in time order.
    pub fn between(&self, from_ms: u64, to_ms: u64) -> impl Iterator<Item = &DamageHit> {
        self.by_time.range(from_ms..=to_ms).flat_map(|(_, hits)| hits.iter())
    }

    pub fn len(&self) -> usize {
        self.by_time.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_time.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkRule {
    /// Relation tag reported with each link, e.g. "thorims-invocation".
    pub relation:         String,
    pub name:             String,
    pub trigger_spell_id: u32,
    pub linked_spell_ids: Vec<u32>,
    /// Linked spell that is expected to hit several targets.
    pub fan_out_spell_id: Option<u32>,
    pub max_delay_ms:     u64,
    /// Resource that must be present for the trigger to produce a link.
    pub resource_name:    String,
}

impl LinkRule {
    /// Correlate each gated cast timestamp with its linked hits.
    ///
    /// `cast_timestamps` must be in non-decreasing order. The output has one
    /// entry per cast: `None` when the cast produced no linked effect.
    pub fn correlate(&self, cast_timestamps: &[u64], index: &DamageIndex) -> Vec<Option<Vec<DamageHit>>> {
        cast_timestamps
            .iter()
            .enumerate()
            .map(|(i, &cast_ts)| {
                let bound = cast_ts.saturating_add(self.max_delay_ms);
                let next_cast = cast_timestamps.get(i + 1).copied();
                let hits: Vec<DamageHit> = index
                    .between(cast_ts, bound)
                    .filter(|h| next_cast.map_or(true, |next| h.timestamp_ms < next))
                    .filter(|h| self.linked_spell_ids.contains(&h.spell_id))
                    .cloned()
                    .collect();
                (!hits.is_empty()).then_some(hits)
            })
            .collect()
    }

    /// True when a fan-out effect struck exactly one target.
    pub fn single_target_fan_out(&self, hits: &[DamageHit]) -> bool {
        match self.fan_out_spell_id {
            Some(id) => hits.iter().filter(|h| h.spell_id == id).count() == 1,
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIGHTNING_BOLT: u32 = 188196;
    const CHAIN_LIGHTNING: u32 = 188443;

    fn rule() -> LinkRule {
        LinkRule {
            relation:         "thorims-invocation".into(),
            name:             "Thorim's Invocation".into(),
            trigger_spell_id: 115356,
            linked_spell_ids: vec![LIGHTNING_BOLT, CHAIN_LIGHTNING],
            fan_out_spell_id: Some(CHAIN_LIGHTNING),
            max_delay_ms:     250,
            resource_name:    "Maelstrom Weapon".into(),
        }
    }

    fn hit(ts: u64, spell_id: u32, target: &str) -> DamageHit {
        DamageHit { timestamp_ms: ts, spell_id, target_guid: target.into(), amount: 100 }
    }

    #[test]
    fn links_hits_inside_delay_bound() {
        let mut index = DamageIndex::default();
        index.record(hit(1_010, LIGHTNING_BOLT, "a"));
        index.record(hit(1_400, LIGHTNING_BOLT, "a")); // too late
        index.record(hit(1_020, 17364, "a"));          // not a linked spell

        let links = rule().correlate(&[1_000], &index);
        assert_eq!(links.len(), 1);
        let hits = links[0].as_ref().expect("linked");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].timestamp_ms, 1_010);
    }

    #[test]
    fn cast_without_hits_has_no_link() {
        let index = DamageIndex::default();
        assert_eq!(rule().correlate(&[1_000, 4_000], &index), vec![None, None]);
    }

    #[test]
    fn hit_belongs_to_latest_cast_only() {
        let mut index = DamageIndex::default();
        index.record(hit(1_150, CHAIN_LIGHTNING, "a"));
        // Second cast at 1_100: the hit at 1_150 is within both bounds but
        // belongs to the later cast.
        let links = rule().correlate(&[1_000, 1_100], &index);
        assert_eq!(links[0], None);
        assert_eq!(links[1].as_ref().map(Vec::len), Some(1));
    }

    #[test]
    fn detects_single_target_chain_lightning() {
        let r = rule();
        assert!(r.single_target_fan_out(&[hit(0, CHAIN_LIGHTNING, "a")]));
        assert!(!r.single_target_fan_out(&[hit(0, CHAIN_LIGHTNING, "a"), hit(0, CHAIN_LIGHTNING, "b")]));
        assert!(!r.single_target_fan_out(&[hit(0, LIGHTNING_BOLT, "a")]));
    }

    #[test]
    fn index_counts_hits() {
        let mut index = DamageIndex::default();
        assert!(index.is_empty());
        index.record(hit(5, LIGHTNING_BOLT, "a"));
        index.record(hit(5, CHAIN_LIGHTNING, "b"));
        assert_eq!(index.len(), 2);
        assert_eq!(index.between(0, 4).count(), 0);
        assert_eq!(index.between(5, 5).count(), 2);
    }
}
