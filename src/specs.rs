/// Spec profile library, embedded at compile time from `data/specs/*.toml`.
///
/// A profile describes one empowerment window: which buff opens and closes it,
/// the gated ability whose casts are counted inside it, the abilities whose
/// GCDs are not counted as waste, the proc counter used by the proc build and
/// the optional linked-effect rule graded by the secondary checklist items.
///
/// Embedding the files means no runtime path resolution is needed. A profile
/// can also be loaded from an arbitrary TOML file (`AppConfig.profile_path`).
use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use thiserror::Error;

use crate::abilities::AbilityDeclaration;
use crate::links::LinkRule;

// ---------------------------------------------------------------------------
// Embedded TOML data
// ---------------------------------------------------------------------------

const SHAMAN_ENHANCEMENT: &str = include_str!("../data/specs/shaman_enhancement.toml");

static ALL_SPEC_DATA: &[&str] = &[SHAMAN_ENHANCEMENT];

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("profile TOML is malformed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("could not read profile file {path}: {source}")]
    Io {
        path:   String,
        #[source]
        source: std::io::Error,
    },

    #[error("unknown profile '{0}'")]
    Unknown(String),

    #[error("'{0}' is not a spell id")]
    InvalidSpellId(String),

    #[error("{field} must be {expected}, got {value}")]
    OutOfRange {
        field:    &'static str,
        expected: &'static str,
        value:    f64,
    },
}

// ---------------------------------------------------------------------------
// TOML deserialization structs (private)
// ---------------------------------------------------------------------------
// Unknown keys are rejected; a misspelt optional key is a parse error.

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlFile {
    spec: TomlSpecMeta,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlSpecMeta {
    class:             String,
    spec:              String,
    role:              String,
    #[serde(default)]
    description:       String,
    #[serde(default)]
    off_gcd_spell_ids: Vec<u32>,
    window:            TomlWindow,
    gated:             TomlGated,
    procs:             Option<TomlProcs>,
    link:              Option<TomlLink>,
    #[serde(default)]
    names:             BTreeMap<String, String>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlWindow {
    name:                 String,
    trigger_spell_id:     u32,
    buff_spell_id:        u32,
    #[serde(default)]
    non_missed_spell_ids: Vec<u32>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlGated {
    spell_id:               u32,
    name:                   String,
    base_cooldown_ms:       u64,
    #[serde(default)]
    gcd_base_ms:            u64,
    recommended_efficiency: f64,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlProcs {
    name:                     String,
    eligible_spell_ids:       Vec<u32>,
    benchmark_casts_per_proc: f64,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlLink {
    relation:         String,
    name:             String,
    linked_spell_ids: Vec<u32>,
    fan_out_spell_id: Option<u32>,
    max_delay_ms:     u64,
    #[serde(default)]
    resource_name:    String,
}

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// The buff that defines the window and the ability that starts it.
#[derive(Debug, Clone)]
pub struct WindowSpec {
    pub name:             String,
    pub trigger_spell_id: u32,
    pub buff_spell_id:    u32,
    /// GCDs spent on these abilities are not counted as wasted gated-ability time.
    pub non_missed:       HashSet<u32>,
}

/// Inter-proc counter settings (proc activation only).
#[derive(Debug, Clone)]
pub struct ProcSpec {
    pub name:                     String,
    pub eligible_spell_ids:       Vec<u32>,
    /// Simulated median number of eligible casts per proc.
    pub benchmark_casts_per_proc: f64,
}

/// A fully-parsed spec profile used by the analyzer.
#[derive(Debug, Clone)]
pub struct SpecProfile {
    pub class:       String,
    pub spec_name:   String,
    pub role:        String,
    pub description: String,
    pub off_gcd:     HashSet<u32>,
    pub window:      WindowSpec,
    pub gated:       AbilityDeclaration,
    pub procs:       Option<ProcSpec>,
    pub link:        Option<LinkRule>,
    pub names:       BTreeMap<u32, String>,
}

impl SpecProfile {
    /// Canonical "CLASS/Spec" key used for config storage and display.
    pub fn key(&self) -> String {
        format!("{}/{}", self.class, self.spec_name)
    }

    /// Display name for a spell, falling back to the numeric id.
    pub fn spell_name(&self, spell_id: u32) -> String {
        self.names
            .get(&spell_id)
            .cloned()
            .unwrap_or_else(|| format!("#{}", spell_id))
    }
}

/// Lightweight spec descriptor for `--list-profiles`.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SpecInfo {
    pub key:    String,
    pub class:  String,
    pub spec:   String,
    pub role:   String,
    pub window: String,
}

// ---------------------------------------------------------------------------
// Parsing helpers
// ---------------------------------------------------------------------------

fn positive(field: &'static str, value: f64) -> Result<f64, ProfileError> {
    if value > 0.0 && value.is_finite() {
        Ok(value)
    } else {
        Err(ProfileError::OutOfRange { field, expected: "positive", value })
    }
}

/// Parse a single profile from TOML text and validate its constants.
pub fn from_toml_str(toml_str: &str) -> Result<SpecProfile, ProfileError> {
    let file: TomlFile = toml::from_str(toml_str)?;
    let meta = file.spec;

    positive("gated.base_cooldown_ms", meta.gated.base_cooldown_ms as f64)?;
    let efficiency = meta.gated.recommended_efficiency;
    if !(efficiency > 0.0 && efficiency <= 1.0) {
        return Err(ProfileError::OutOfRange {
            field:    "gated.recommended_efficiency",
            expected: "in (0, 1]",
            value:    efficiency,
        });
    }

    let procs = match meta.procs {
        Some(p) => Some(ProcSpec {
            name:                     p.name,
            eligible_spell_ids:       p.eligible_spell_ids,
            benchmark_casts_per_proc: positive(
                "procs.benchmark_casts_per_proc",
                p.benchmark_casts_per_proc,
            )?,
        }),
        None => None,
    };

    let names = meta
        .names
        .into_iter()
        .map(|(id, name)| {
            id.trim()
                .parse::<u32>()
                .map(|id| (id, name))
                .map_err(|_| ProfileError::InvalidSpellId(id))
        })
        .collect::<Result<BTreeMap<_, _>, _>>()?;

    Ok(SpecProfile {
        class:       meta.class,
        spec_name:   meta.spec,
        role:        meta.role,
        description: meta.description,
        off_gcd:     meta.off_gcd_spell_ids.into_iter().collect(),
        window: WindowSpec {
            name:             meta.window.name,
            trigger_spell_id: meta.window.trigger_spell_id,
            buff_spell_id:    meta.window.buff_spell_id,
            non_missed:       meta.window.non_missed_spell_ids.into_iter().collect(),
        },
        gated: AbilityDeclaration {
            spell_id:               meta.gated.spell_id,
            name:                   meta.gated.name,
            base_cooldown_ms:       meta.gated.base_cooldown_ms,
            gcd_base_ms:            meta.gated.gcd_base_ms,
            recommended_efficiency: efficiency,
        },
        procs,
        link: meta.link.map(|l| LinkRule {
            relation:         l.relation,
            name:             l.name,
            trigger_spell_id: meta.gated.spell_id,
            linked_spell_ids: l.linked_spell_ids,
            fan_out_spell_id: l.fan_out_spell_id,
            max_delay_ms:     l.max_delay_ms,
            resource_name:    l.resource_name,
        }),
        names,
    })
}

fn parse_all() -> Vec<SpecProfile> {
    ALL_SPEC_DATA
        .iter()
        .filter_map(|toml_str| {
            from_toml_str(toml_str)
                .map_err(|e| tracing::warn!("Failed to parse spec TOML: {}", e))
                .ok()
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Return display info for all embedded spec profiles.
pub fn list_all() -> Vec<SpecInfo> {
    parse_all()
        .into_iter()
        .map(|p| SpecInfo {
            key:    p.key(),
            class:  p.class,
            spec:   p.spec_name,
            role:   p.role,
            window: p.window.name,
        })
        .collect()
}

/// Load a spec profile by class and spec name (case-insensitive).
///
/// Returns `None` if no embedded profile matches.
pub fn load_spec(class: &str, spec_name: &str) -> Option<SpecProfile> {
    parse_all().into_iter().find(|p| {
        p.class.eq_ignore_ascii_case(class) && p.spec_name.eq_ignore_ascii_case(spec_name)
    })
}

/// Load a spec profile by its canonical "CLASS/Spec" key.
pub fn load_by_key(key: &str) -> Option<SpecProfile> {
    let (class, spec) = key.split_once('/')?;
    load_spec(class, spec)
}

/// Load a profile from a TOML file on disk.
pub fn load_file(path: &Path) -> Result<SpecProfile, ProfileError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ProfileError::Io {
        path: path.display().to_string(),
        source,
    })?;
    from_toml_str(&raw)
}

/// Resolve the profile named by the config: an explicit file wins over the key.
pub fn resolve(key: &str, path: Option<&Path>) -> Result<SpecProfile, ProfileError> {
    match path {
        Some(p) => load_file(p),
        None => load_by_key(key).ok_or_else(|| ProfileError::Unknown(key.to_owned())),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_embedded_specs() {
        let specs = list_all();
        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0].key, "SHAMAN/Enhancement");
        assert_eq!(specs[0].window, "Ascendance");
    }

    #[test]
    fn loads_enhancement() {
        let p = load_spec("SHAMAN", "Enhancement").expect("should load");
        assert_eq!(p.window.trigger_spell_id, 114051);
        assert_eq!(p.gated.spell_id, 115356);        // Windstrike
        assert_eq!(p.gated.base_cooldown_ms, 3000);
        assert!(p.window.non_missed.contains(&197214)); // Sundering
        assert!(p.off_gcd.contains(&57994));           // Wind Shear
        let procs = p.procs.expect("proc counter configured");
        assert_eq!(procs.benchmark_casts_per_proc, 13.0);
        let link = p.link.expect("link rule configured");
        assert_eq!(link.trigger_spell_id, 115356);
        assert_eq!(link.fan_out_spell_id, Some(188443));
    }

    #[test]
    fn case_insensitive_lookup() {
        assert!(load_spec("shaman", "enhancement").is_some());
        assert!(load_by_key("shaman/enhancement").is_some());
    }

    #[test]
    fn returns_none_for_unknown() {
        assert!(load_spec("MAGE", "Fire").is_none());
        assert!(load_by_key("no-slash").is_none());
        assert!(matches!(resolve("MAGE/Fire", None), Err(ProfileError::Unknown(_))));
    }

    #[test]
    fn spell_names_fall_back_to_id() {
        let p = load_by_key("SHAMAN/Enhancement").unwrap();
        assert_eq!(p.spell_name(17364), "Stormstrike");
        assert_eq!(p.spell_name(1), "#1");
    }

    #[test]
    fn rejects_bad_constants() {
        let bad = SHAMAN_ENHANCEMENT.replace("recommended_efficiency = 0.8", "recommended_efficiency = 1.5");
        assert!(matches!(from_toml_str(&bad), Err(ProfileError::OutOfRange { .. })));

        let bad = SHAMAN_ENHANCEMENT.replace("benchmark_casts_per_proc = 13.0", "benchmark_casts_per_proc = 0.0");
        assert!(matches!(from_toml_str(&bad), Err(ProfileError::OutOfRange { .. })));

        let bad = SHAMAN_ENHANCEMENT.replace("\"60103\"", "\"lava\"");
        assert!(matches!(from_toml_str(&bad), Err(ProfileError::InvalidSpellId(_))));
    }

    #[test]
    fn rejects_misspelt_keys() {
        let bad = SHAMAN_ENHANCEMENT.replace("non_missed_spell_ids", "non_missed_spell_id");
        assert!(matches!(from_toml_str(&bad), Err(ProfileError::Toml(_))));

        let bad = SHAMAN_ENHANCEMENT.replace("max_delay_ms", "max_delay");
        assert!(matches!(from_toml_str(&bad), Err(ProfileError::Toml(_))));

        let bad = SHAMAN_ENHANCEMENT.replace("[spec.procs]", "[spec.proc]");
        assert!(matches!(from_toml_str(&bad), Err(ProfileError::Toml(_))));
    }

    #[test]
    fn loads_profile_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(&path, SHAMAN_ENHANCEMENT.replace("SHAMAN", "CUSTOM")).unwrap();
        let p = resolve("ignored/key", Some(&path)).unwrap();
        assert_eq!(p.key(), "CUSTOM/Enhancement");
        assert!(matches!(
            load_file(&dir.path().join("missing.toml")),
            Err(ProfileError::Io { .. })
        ));
    }
}
