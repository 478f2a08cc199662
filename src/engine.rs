/// Window analyzer: the "brain" of the pipeline.
///
/// Receives typed LogEvents over a channel, routes each through a fixed
/// dispatch table into the `WindowTracker`, records linked-effect damage hits
/// for link correlation, and builds the `AnalysisReport` once the channel closes.
///
/// Routes (built once per analyzer, evaluated in order, all matches fire):
///   cast build:  Cast(trigger)                       → trigger
///   proc build:  BuffApply/BuffRefresh(buff)         → trigger
///                Cast(eligible)                      → eligible cast
///   always:      Cast(*)                             → general cast
///                Damage(*)                           → damage (linked ids indexed)
///                BuffRemove(buff)                    → window end
///                CooldownStateChange(gated)          → cooldown watch
///                FightEnd                            → stream end
use crate::{
    abilities::{AbilityRegistry, CastEfficiency},
    config::ActivationMode,
    haste::RateProvider,
    identity::PlayerIdentity,
    links::{DamageHit, DamageIndex},
    parser::{CooldownChange, EventKind, LogEvent},
    report::{self, AnalysisReport},
    specs::SpecProfile,
    state::{CastRecord, TrackerConfig, Trigger, TriggerKind, Window, WindowTracker},
};
use anyhow::Result;
use tokio::sync::mpsc::Receiver;

// ---------------------------------------------------------------------------
// Dispatch table
// ---------------------------------------------------------------------------

type Handler = fn(&mut Analyzer, &LogEvent, &dyn RateProvider);

#[derive(Clone, Copy)]
struct Route {
    kind:    EventKind,
    /// `None` matches any ability.
    spell:   Option<u32>,
    handler: Handler,
}

impl Route {
    fn matches(&self, event: &LogEvent) -> bool {
        self.kind == event.kind() && self.spell.map_or(true, |id| event.spell_id() == Some(id))
    }
}

fn build_routes(profile: &SpecProfile, mode: ActivationMode) -> Vec<Route> {
    let route = |kind, spell, handler: Handler| Route { kind, spell, handler };
    let window = &profile.window;
    let mut routes = Vec::new();

    match mode {
        ActivationMode::Cast => {
            routes.push(route(EventKind::Cast, Some(window.trigger_spell_id), Analyzer::on_trigger));
        }
        ActivationMode::Proc => {
            routes.push(route(EventKind::BuffApply, Some(window.buff_spell_id), Analyzer::on_trigger));
            routes.push(route(EventKind::BuffRefresh, Some(window.buff_spell_id), Analyzer::on_trigger));
            for &id in profile.procs.iter().flat_map(|p| p.eligible_spell_ids.iter()) {
                routes.push(route(EventKind::Cast, Some(id), Analyzer::on_eligible_cast));
            }
        }
    }

    routes.push(route(EventKind::Cast, None, Analyzer::on_general_cast));
    routes.push(route(EventKind::Damage, None, Analyzer::on_damage));
    routes.push(route(EventKind::BuffRemove, Some(window.buff_spell_id), Analyzer::on_window_end));
    routes.push(route(EventKind::CooldownStateChange, Some(profile.gated.spell_id), Analyzer::on_cooldown_change));
    routes.push(route(EventKind::FightEnd, None, Analyzer::on_fight_end));
    routes
}

// ---------------------------------------------------------------------------
// Analyzer
// ---------------------------------------------------------------------------

pub struct Analyzer {
    profile:   SpecProfile,
    mode:      ActivationMode,
    routes:    Vec<Route>,
    tracker:   WindowTracker,
    damage:    DamageIndex,
    windows:   Vec<Window>,
    identity:  PlayerIdentity,
    events:    u64,
    last_ms:   u64,
    /// First event from the reviewed player.
    first_ms:  Option<u64>,
    /// Latest FightEnd timestamp.
    fight_end: Option<u64>,
    /// Events seen since the last stream end.
    pending:   bool,
}

impl Analyzer {
    pub fn new(profile: SpecProfile, mode: ActivationMode, identity: PlayerIdentity) -> Self {
        let routes = build_routes(&profile, mode);
        let tracker = WindowTracker::new(TrackerConfig {
            trigger_spell_id: profile.window.trigger_spell_id,
            non_missed:       profile.window.non_missed.clone(),
        });
        tracing::debug!("{} routes for {} ({:?} build)", routes.len(), profile.key(), mode);
        Self {
            profile,
            mode,
            routes,
            tracker,
            damage:    DamageIndex::default(),
            windows:   Vec::new(),
            identity,
            events:    0,
            last_ms:   0,
            first_ms:  None,
            fight_end: None,
            pending:   false,
        }
    }

    /// Declare the gated ability to a cast-efficiency host.
    pub fn register_abilities(&self, registry: &mut impl AbilityRegistry) {
        registry.add(self.profile.gated.clone());
    }

    pub fn windows(&self) -> &[Window] {
        &self.windows
    }

    pub fn tracker(&self) -> &WindowTracker {
        &self.tracker
    }

    /// Feed one event through the dispatch table.
    pub fn dispatch(&mut self, event: &LogEvent, rate: &dyn RateProvider) {
        self.events += 1;
        self.last_ms = self.last_ms.max(event.timestamp_ms());
        self.identity.observe(event);
        if !self.identity.is_self(event) {
            return;
        }
        self.first_ms.get_or_insert(event.timestamp_ms());
        for i in 0..self.routes.len() {
            let route = self.routes[i];
            if route.matches(event) {
                (route.handler)(self, event, rate);
            }
        }
    }

    /// Close anything still open and build the report.
    pub fn finish(mut self, rate: &dyn RateProvider) -> AnalysisReport {
        if self.pending {
            tracing::debug!("No fight end after last event; ending stream at {}ms", self.last_ms);
            self.end_stream(self.last_ms, rate);
        }

        let windows: Vec<_> = self
            .windows
            .iter()
            .map(|w| report::window_report(w, &self.profile, self.mode, &self.damage))
            .collect();

        let cast_efficiency = CastEfficiency {
            spell_id:    self.profile.gated.spell_id,
            casts:       windows.iter().map(|w| w.opportunity.actual).sum(),
            max_casts:   windows.iter().map(|w| w.opportunity.max_possible).sum(),
            recommended: self.profile.gated.recommended_efficiency,
        };

        let procs = match (self.mode, self.profile.procs.as_ref()) {
            (ActivationMode::Proc, Some(spec)) => {
                Some(self.tracker.procs.statistics(spec.benchmark_casts_per_proc))
            }
            _ => None,
        };

        let fight_duration_ms = self.fight_duration_ms();
        let buff_uptime = report::buff_uptime(&self.windows, fight_duration_ms);

        tracing::info!(
            "Analysis complete: {} events, {} windows, {} linked hits, uptime {:?}",
            self.events,
            windows.len(),
            self.damage.len(),
            buff_uptime
        );

        AnalysisReport {
            profile: self.profile.key(),
            activation: self.mode,
            windows,
            cast_efficiency,
            procs,
            fight_duration_ms,
            buff_uptime,
        }
    }

    // -----------------------------------------------------------------------
    // Handlers
    // -----------------------------------------------------------------------

    fn on_trigger(&mut self, event: &LogEvent, rate: &dyn RateProvider) {
        let kind = match event.kind() {
            EventKind::BuffApply   => TriggerKind::BuffApply,
            EventKind::BuffRefresh => TriggerKind::BuffRefresh,
            _                      => TriggerKind::Cast,
        };
        let trigger = Trigger {
            timestamp_ms: event.timestamp_ms(),
            spell_id:     event.spell_id().unwrap_or(self.profile.window.trigger_spell_id),
            kind,
        };
        self.pending = true;
        tracing::info!("{} window opened at {}ms", self.profile.window.name, trigger.timestamp_ms);
        if let Some(replaced) = self.tracker.on_trigger(trigger, rate) {
            tracing::debug!("Re-trigger closed the open window at {}ms", replaced.end_ms);
            self.windows.push(replaced);
        }
    }

    fn on_general_cast(&mut self, event: &LogEvent, rate: &dyn RateProvider) {
        if let LogEvent::Cast { timestamp_ms, spell_id, spell_name, global_cooldown, .. } = event {
            self.pending = true;
            let cast = CastRecord {
                timestamp_ms: *timestamp_ms,
                spell_id:     *spell_id,
                spell_name:   spell_name.clone(),
            };
            self.tracker.on_cast(cast, *global_cooldown, rate);
        }
    }

    fn on_eligible_cast(&mut self, _event: &LogEvent, _rate: &dyn RateProvider) {
        self.tracker.on_eligible_cast();
    }

    fn on_damage(&mut self, event: &LogEvent, _rate: &dyn RateProvider) {
        if let LogEvent::Damage { timestamp_ms, dest_guid, spell_id, amount, .. } = event {
            self.pending = true;
            let linked = self
                .profile
                .link
                .as_ref()
                .is_some_and(|rule| rule.linked_spell_ids.contains(spell_id));
            if linked {
                self.damage.record(DamageHit {
                    timestamp_ms: *timestamp_ms,
                    spell_id:     *spell_id,
                    target_guid:  dest_guid.clone(),
                    amount:       *amount,
                });
            }
            self.tracker.on_damage(*amount);
        }
    }

    fn on_window_end(&mut self, event: &LogEvent, rate: &dyn RateProvider) {
        if let Some(window) = self.tracker.on_window_end(event.timestamp_ms(), rate) {
            tracing::info!(
                "{} window closed at {}ms ({} casts)",
                self.profile.window.name,
                window.end_ms,
                window.casts.len()
            );
            self.windows.push(window);
        }
    }

    fn on_cooldown_change(&mut self, event: &LogEvent, _rate: &dyn RateProvider) {
        if let LogEvent::CooldownStateChange { timestamp_ms, change, .. } = event {
            match change {
                CooldownChange::Begin => self.tracker.on_cooldown_begin(),
                CooldownChange::End   => self.tracker.on_cooldown_end(*timestamp_ms),
            }
        }
    }

    fn on_fight_end(&mut self, event: &LogEvent, rate: &dyn RateProvider) {
        self.fight_end = Some(event.timestamp_ms());
        self.end_stream(event.timestamp_ms(), rate);
    }

    /// First reviewed event to the last FightEnd, or to the last timestamp
    /// when no fight end was logged.
    fn fight_duration_ms(&self) -> u64 {
        let Some(first) = self.first_ms else {
            return 0;
        };
        let last_window = self.windows.iter().map(|w| w.end_ms).max().unwrap_or(0);
        let end = self.fight_end.unwrap_or(self.last_ms).max(last_window);
        end.saturating_sub(first)
    }

    fn end_stream(&mut self, timestamp_ms: u64, rate: &dyn RateProvider) {
        self.pending = false;
        if let Some(window) = self.tracker.on_stream_end(timestamp_ms, rate) {
            tracing::info!("{} window force-closed at {}ms", self.profile.window.name, window.end_ms);
            self.windows.push(window);
        }
    }
}

// ---------------------------------------------------------------------------
// Pipeline task
// ---------------------------------------------------------------------------

/// Drain the event channel into the analyzer; returns the report when the
/// sender side closes.
pub async fn run(
    mut event_rx: Receiver<LogEvent>,
    mut analyzer: Analyzer,
    rate:         impl RateProvider,
) -> Result<AnalysisReport> {
    while let Some(event) = event_rx.recv().await {
        analyzer.dispatch(&event, &rate);
    }
    Ok(analyzer.finish(&rate))
}
