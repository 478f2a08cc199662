/// Identity of the player under review.
///
/// Only events caused by this player reach the window tracker. The GUID comes
/// from config when known; otherwise it is discovered from the first cast
/// whose source name matches the configured player name. Until then, events
/// are dropped. With neither GUID nor name configured every event is accepted
/// (the log is assumed to be pre-filtered).
use crate::parser::LogEvent;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlayerIdentity {
    pub guid: String,
    pub name: String,
}

impl PlayerIdentity {
    pub fn new(guid: impl Into<String>, name: impl Into<String>) -> Self {
        Self { guid: guid.into(), name: name.into() }
    }

    pub fn unknown() -> Self {
        Self::default()
    }

    pub fn is_known(&self) -> bool {
        !self.guid.is_empty()
    }

    fn accepts_everyone(&self) -> bool {
        self.guid.is_empty() && self.name.is_empty()
    }

    /// Learn the GUID from a cast by the named player. No-op once resolved.
    pub fn observe(&mut self, event: &LogEvent) {
        if self.is_known() || self.name.is_empty() {
            return;
        }
        if let LogEvent::Cast { source_guid, source_name, .. } = event {
            // Log names carry the realm ("Name-Realm"); config may not.
            let bare = source_name.split('-').next().unwrap_or(source_name.as_str());
            if source_name.eq_ignore_ascii_case(&self.name) || bare.eq_ignore_ascii_case(&self.name) {
                self.guid = source_guid.clone();
                tracing::info!("Identity resolved: {} → {}", self.name, self.guid);
            }
        }
    }

    /// Whether the event was caused by the reviewed player.
    pub fn is_self(&self, event: &LogEvent) -> bool {
        if self.accepts_everyone() {
            return true;
        }
        match event.source_guid() {
            Some(guid) => self.is_known() && guid == self.guid,
            None => true,
        }
    }
}
