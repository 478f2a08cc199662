/// Window state machine. The engine owns it and calls its hooks as events arrive.
///
/// All state lives in a single `WindowTracker`, and nothing else touches it
/// while a stream is replayed. No locking is needed because the engine is
/// single-threaded.
///
///   Closed --trigger--> Open --buff removed / stream end--> Closed
///
/// While open, every on-GCD cast flushes the haste-adjusted time since the last
/// check into the window's waste total, unless the cast is allow-listed.
use crate::haste::{haste_adjusted_elapsed, RateProvider};
use crate::procs::ProcCounter;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

// ---------------------------------------------------------------------------
// Window records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerKind {
    Cast,
    BuffApply,
    BuffRefresh,
}

/// The event that opened a window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trigger {
    pub timestamp_ms: u64,
    pub spell_id:     u32,
    pub kind:         TriggerKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CastRecord {
    pub timestamp_ms: u64,
    pub spell_id:     u32,
    pub spell_name:   String,
}

/// One empowerment interval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Window {
    pub trigger:                 Trigger,
    /// On-GCD casts observed while open, in order.
    pub casts:                   Vec<CastRecord>,
    pub extra_damage:            u64,
    pub start_ms:                u64,
    pub end_ms:                  u64,
    pub haste_adjusted_waste_ms: f64,
}

impl Window {
    fn open(trigger: Trigger) -> Self {
        Self {
            start_ms: trigger.timestamp_ms,
            end_ms: trigger.timestamp_ms,
            trigger,
            casts: Vec::new(),
            extra_damage: 0,
            haste_adjusted_waste_ms: 0.0,
        }
    }

    pub fn duration_ms(&self) -> u64 {
        self.end_ms.saturating_sub(self.start_ms)
    }

    pub fn casts_of(&self, spell_id: u32) -> usize {
        self.casts.iter().filter(|c| c.spell_id == spell_id).count()
    }
}

// ---------------------------------------------------------------------------
// Gated-ability cooldown watch
// ---------------------------------------------------------------------------

/// Tracks whether the gated ability is on cooldown. Independent of window state.
#[derive(Debug)]
pub struct CooldownWatch {
    pub on_cooldown:  bool,
    /// Timestamp of the most recent cooldown end.
    pub last_end_ms:  Option<u64>,
}

impl Default for CooldownWatch {
    fn default() -> Self {
        // Unknown until the first transition; assume busy so nothing is credited early.
        Self { on_cooldown: true, last_end_ms: None }
    }
}

impl CooldownWatch {
    pub fn begin(&mut self) {
        self.on_cooldown = true;
    }

    pub fn end(&mut self, timestamp_ms: u64) {
        self.on_cooldown = false;
        self.last_end_ms = Some(timestamp_ms);
    }
}

// ---------------------------------------------------------------------------
// WindowTracker
// ---------------------------------------------------------------------------

/// Static inputs to the tracker, taken from the spec profile.
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// The empowering ability; its own casts are never window casts.
    pub trigger_spell_id: u32,
    /// Abilities whose GCDs are not wasted gated-ability time.
    pub non_missed:       HashSet<u32>,
}

#[derive(Debug)]
pub struct WindowTracker {
    config:               TrackerConfig,
    current:              Option<Window>,
    last_waste_check_ms:  u64,
    pub cooldown:         CooldownWatch,
    pub procs:            ProcCounter,
}

impl WindowTracker {
    pub fn new(config: TrackerConfig) -> Self {
        Self {
            config,
            current:             None,
            last_waste_check_ms: 0,
            cooldown:            CooldownWatch::default(),
            procs:               ProcCounter::default(),
        }
    }

    pub fn is_open(&self) -> bool {
        self.current.is_some()
    }

    pub fn current(&self) -> Option<&Window> {
        self.current.as_ref()
    }

    pub fn last_waste_check_ms(&self) -> u64 {
        self.last_waste_check_ms
    }

    /// Open a window. A trigger while a window is already open closes that
    /// window at the trigger timestamp first; the closed window is returned.
    pub fn on_trigger(&mut self, trigger: Trigger, rate: &dyn RateProvider) -> Option<Window> {
        let replaced = self.close(trigger.timestamp_ms, rate);
        self.procs.seal();
        self.last_waste_check_ms = trigger.timestamp_ms;
        tracing::debug!("Window opened at {}ms by {:?}", trigger.timestamp_ms, trigger.kind);
        self.current = Some(Window::open(trigger));
        replaced
    }

    pub fn on_cast(&mut self, cast: CastRecord, global_cooldown: bool, rate: &dyn RateProvider) {
        let Some(window) = self.current.as_mut() else {
            return;
        };
        if !global_cooldown || cast.spell_id == self.config.trigger_spell_id {
            return;
        }
        if !self.config.non_missed.contains(&cast.spell_id) {
            window.haste_adjusted_waste_ms +=
                haste_adjusted_elapsed(self.last_waste_check_ms, cast.timestamp_ms, rate.current());
        }
        self.last_waste_check_ms = cast.timestamp_ms;
        window.casts.push(cast);
    }

    pub fn on_damage(&mut self, amount: u64) {
        if let Some(window) = self.current.as_mut() {
            window.extra_damage += amount;
        }
    }

    /// Empowering buff removed.
    pub fn on_window_end(&mut self, timestamp_ms: u64, rate: &dyn RateProvider) -> Option<Window> {
        self.close(timestamp_ms, rate)
    }

    /// End of stream: flag the running proc count and force-close any window.
    pub fn on_stream_end(&mut self, timestamp_ms: u64, rate: &dyn RateProvider) -> Option<Window> {
        self.procs.seal_at_end();
        self.close(timestamp_ms, rate)
    }

    pub fn on_cooldown_begin(&mut self) {
        self.cooldown.begin();
    }

    /// The gated ability came off cooldown: waste is measured from here.
    pub fn on_cooldown_end(&mut self, timestamp_ms: u64) {
        self.cooldown.end(timestamp_ms);
        self.last_waste_check_ms = timestamp_ms;
    }

    pub fn on_eligible_cast(&mut self) {
        self.procs.increment();
    }

    fn close(&mut self, timestamp_ms: u64, rate: &dyn RateProvider) -> Option<Window> {
        let mut window = self.current.take()?;
        window.end_ms = timestamp_ms.max(window.start_ms);
        window.haste_adjusted_waste_ms +=
            haste_adjusted_elapsed(self.last_waste_check_ms, window.end_ms, rate.current());
        tracing::debug!(
            "Window closed at {}ms ({} casts, {:.0}ms wasted)",
            window.end_ms,
            window.casts.len(),
            window.haste_adjusted_waste_ms
        );
        Some(window)
    }
}
