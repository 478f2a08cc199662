/// Parses raw WoW combat log lines into typed `LogEvent` values.
///
/// WoW combat log format (The War Within / Midnight, 11.x+):
///
///   M/D/YYYY HH:MM:SS.ffff-N  SUBEVENT,HIDECASTER,SOURCEGUID,SOURCENAME,SOURCEFLAGS,SOURCERAIDFLAGS,
///              DESTGUID,DESTNAME,DESTFLAGS,DESTROAIDFLAGS,[subevent-specific fields...]
///
/// Field indices (0-based after splitting on comma):
///   [0]  subevent name (e.g. "SPELL_DAMAGE")
///   [2]  source GUID
///   [3]  source name (quoted)
///   [6]  dest GUID
///   [10] spell ID       (prefix fields for SPELL_* events)
///   [11] spell name     (quoted)
///   [13+] subevent-specific
///
/// ENCOUNTER_END has no unit prefix and maps to `FightEnd`.
///
/// The log does not say whether a cast triggered the global cooldown, so the
/// parser marks every cast as on-GCD except the profile's off-GCD list.
/// Cooldown state transitions never appear in the log; they are only produced
/// by callers that track spell availability themselves.
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tokio::sync::mpsc::{Receiver, Sender};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CooldownChange {
    Begin,
    End,
}

/// Typed combat events the window analyzer consumes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum LogEvent {
    Cast {
        timestamp_ms:    u64,
        source_guid:     String,
        source_name:     String,
        spell_id:        u32,
        spell_name:      String,
        global_cooldown: bool,
    },
    BuffApply {
        timestamp_ms: u64,
        source_guid:  String,
        spell_id:     u32,
    },
    BuffRefresh {
        timestamp_ms: u64,
        source_guid:  String,
        spell_id:     u32,
    },
    BuffRemove {
        timestamp_ms: u64,
        source_guid:  String,
        spell_id:     u32,
    },
    Damage {
        timestamp_ms: u64,
        source_guid:  String,
        dest_guid:    String,
        spell_id:     u32,
        amount:       u64,
    },
    CooldownStateChange {
        timestamp_ms: u64,
        source_guid:  String,
        spell_id:     u32,
        change:       CooldownChange,
    },
    FightEnd {
        timestamp_ms: u64,
    },
}

/// Discriminant of `LogEvent`, used as the dispatch table key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Cast,
    BuffApply,
    BuffRefresh,
    BuffRemove,
    Damage,
    CooldownStateChange,
    FightEnd,
}

impl LogEvent {
    pub fn timestamp_ms(&self) -> u64 {
        match self {
            Self::Cast                { timestamp_ms, .. } => *timestamp_ms,
            Self::BuffApply           { timestamp_ms, .. } => *timestamp_ms,
            Self::BuffRefresh         { timestamp_ms, .. } => *timestamp_ms,
            Self::BuffRemove          { timestamp_ms, .. } => *timestamp_ms,
            Self::Damage              { timestamp_ms, .. } => *timestamp_ms,
            Self::CooldownStateChange { timestamp_ms, .. } => *timestamp_ms,
            Self::FightEnd            { timestamp_ms }     => *timestamp_ms,
        }
    }

    pub fn kind(&self) -> EventKind {
        match self {
            Self::Cast { .. }                => EventKind::Cast,
            Self::BuffApply { .. }           => EventKind::BuffApply,
            Self::BuffRefresh { .. }         => EventKind::BuffRefresh,
            Self::BuffRemove { .. }          => EventKind::BuffRemove,
            Self::Damage { .. }              => EventKind::Damage,
            Self::CooldownStateChange { .. } => EventKind::CooldownStateChange,
            Self::FightEnd { .. }            => EventKind::FightEnd,
        }
    }

    /// Ability identifier, if the event is tied to one.
    pub fn spell_id(&self) -> Option<u32> {
        match self {
            Self::Cast                { spell_id, .. } => Some(*spell_id),
            Self::BuffApply           { spell_id, .. } => Some(*spell_id),
            Self::BuffRefresh         { spell_id, .. } => Some(*spell_id),
            Self::BuffRemove          { spell_id, .. } => Some(*spell_id),
            Self::Damage              { spell_id, .. } => Some(*spell_id),
            Self::CooldownStateChange { spell_id, .. } => Some(*spell_id),
            Self::FightEnd { .. }                      => None,
        }
    }

    /// GUID of the entity that caused this event, if any.
    pub fn source_guid(&self) -> Option<&str> {
        match self {
            Self::Cast                { source_guid, .. } => Some(source_guid),
            Self::BuffApply           { source_guid, .. } => Some(source_guid),
            Self::BuffRefresh         { source_guid, .. } => Some(source_guid),
            Self::BuffRemove          { source_guid, .. } => Some(source_guid),
            Self::Damage              { source_guid, .. } => Some(source_guid),
            Self::CooldownStateChange { source_guid, .. } => Some(source_guid),
            Self::FightEnd { .. }                         => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Parsing helpers
// ---------------------------------------------------------------------------

const MS_PER_DAY: u64 = 86_400_000;

/// Parse the WoW log timestamp prefix into milliseconds.
///
/// Accepts "M/D/YYYY HH:MM:SS.ffff-N" (11.x+, with a timezone offset suffix)
/// as well as the older "M/D HH:MM:SS.mmm". The date is folded in as
/// `(year * 12 + month) * 31 + day` days so values stay monotonic across
/// midnight, month ends and new year. They are only compared with each
/// other, so no epoch is attached.
fn parse_timestamp(date_time: &str) -> Option<u64> {
    let (date, time) = date_time.trim().split_once(' ')?;

    let mut date_parts = date.split('/');
    let month: u64 = date_parts.next()?.parse().ok()?;
    let day:   u64 = date_parts.next()?.parse().ok()?;
    let year:  u64 = match date_parts.next() {
        Some(y) => y.parse().ok()?,
        None => 0,
    };

    // "20:14:34.0100-4": the offset is constant within a log.
    let time = match time.find(['+', '-']) {
        Some(i) => &time[..i],
        None => time,
    };

    let mut time_parts = time.splitn(3, ':');
    let h:  u64 = time_parts.next()?.parse().ok()?;
    let m:  u64 = time_parts.next()?.parse().ok()?;
    let sm: &str = time_parts.next()?;

    let (s_str, frac) = sm.split_once('.').unwrap_or((sm, ""));
    let s:  u64 = s_str.parse().ok()?;
    let ms: u64 = fraction_ms(frac)?;

    let days = (year * 12 + month) * 31 + day;
    Some(days * MS_PER_DAY + (h * 3_600 + m * 60 + s) * 1_000 + ms)
}

/// Milliseconds in a fractional-second string of any length ("1" is 100,
/// "0100" is 10). Digits past the third are truncated.
fn fraction_ms(frac: &str) -> Option<u64> {
    if !frac.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let mut ms = 0u64;
    for i in 0..3 {
        let digit = frac.as_bytes().get(i).map_or(0, |b| u64::from(b - b'0'));
        ms = ms * 10 + digit;
    }
    Some(ms)
}

#[inline]
fn unquote(s: &str) -> &str {
    s.trim_matches('"')
}

/// Split a raw log line into (timestamp_ms, fields[]).
///
/// Lines look like:
///   "5/21 20:14:33.123  SPELL_DAMAGE,0,..."
///                      ^^  (two spaces between timestamp and payload)
fn split_line(raw: &str) -> Option<(u64, Vec<&str>)> {
    let sep     = raw.find("  ")?;
    let ts_ms   = parse_timestamp(&raw[..sep])?;
    let payload = raw[sep + 2..].trim_end();

    // Quoted commas in names are not handled; none of the fields read here
    // sit after a player-controlled name.
    let fields: Vec<&str> = payload.splitn(25, ',').collect();
    Some((ts_ms, fields))
}

/// Source GUID and spell id shared by every SPELL_* subevent.
fn spell_prefix<'a>(f: &[&'a str]) -> Option<(&'a str, u32)> {
    let src = unquote(f.get(2)?);
    let spell_id = f.get(10)?.parse().ok()?;
    Some((src, spell_id))
}

/// Turns log lines into events. Holds the off-GCD table from the profile.
#[derive(Debug, Clone, Default)]
pub struct LineParser {
    off_gcd: HashSet<u32>,
}

impl LineParser {
    pub fn new(off_gcd: HashSet<u32>) -> Self {
        Self { off_gcd }
    }

    pub fn parse(&self, raw: &str) -> Option<LogEvent> {
        let (ts, f) = split_line(raw)?;

        match *f.first()? {
            "SPELL_CAST_SUCCESS" => {
                let (src, spell_id) = spell_prefix(&f)?;
                Some(LogEvent::Cast {
                    timestamp_ms:    ts,
                    source_guid:     src.to_owned(),
                    source_name:     unquote(f.get(3)?).to_owned(),
                    spell_id,
                    spell_name:      unquote(f.get(11)?).to_owned(),
                    global_cooldown: !self.off_gcd.contains(&spell_id),
                })
            }
            "SPELL_AURA_APPLIED" => {
                let (src, spell_id) = spell_prefix(&f)?;
                Some(LogEvent::BuffApply { timestamp_ms: ts, source_guid: src.to_owned(), spell_id })
            }
            "SPELL_AURA_REFRESH" => {
                let (src, spell_id) = spell_prefix(&f)?;
                Some(LogEvent::BuffRefresh { timestamp_ms: ts, source_guid: src.to_owned(), spell_id })
            }
            "SPELL_AURA_REMOVED" => {
                let (src, spell_id) = spell_prefix(&f)?;
                Some(LogEvent::BuffRemove { timestamp_ms: ts, source_guid: src.to_owned(), spell_id })
            }
            "SPELL_DAMAGE" | "SPELL_PERIODIC_DAMAGE" | "RANGE_DAMAGE" => {
                let (src, spell_id) = spell_prefix(&f)?;
                // Field layout after school [12]: [13]=missType, [14]=amount, [15]=overkill, ...
                let amount: u64 = f.get(14)?.parse().ok()?;
                Some(LogEvent::Damage {
                    timestamp_ms: ts,
                    source_guid:  src.to_owned(),
                    dest_guid:    unquote(f.get(6)?).to_owned(),
                    spell_id,
                    amount,
                })
            }
            "ENCOUNTER_END" => Some(LogEvent::FightEnd { timestamp_ms: ts }),
            _ => None, // unrecognised subevent
        }
    }
}

/// Async pipeline task: receive raw lines, parse, forward typed events.
pub async fn run(mut rx: Receiver<String>, tx: Sender<LogEvent>, parser: LineParser) -> Result<()> {
    let mut skipped = 0u64;
    while let Some(line) = rx.recv().await {
        match parser.parse(&line) {
            Some(event) => {
                if tx.send(event).await.is_err() {
                    break;
                }
            }
            None => skipped += 1,
        }
    }
    tracing::debug!("Parser finished ({} lines skipped)", skipped);
    Ok(())
}
