//! Health ecosystem link, persisted under [`HEALTH_LINK_KEY`] as the bare
//! ecosystem id (`healthkit` / `googlefit`).

use crate::storage::{KeyValueStore, HEALTH_LINK_KEY};
use crate::Ecosystem;
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LinkStatus {
    Disconnected,
    Connected(Ecosystem),
}

impl fmt::Display for LinkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkStatus::Disconnected => f.write_str("Disconnected"),
            LinkStatus::Connected(eco) => write!(f, "Connected to {}", eco.display_name()),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HealthLink {
    ecosystem: Option<Ecosystem>,
}

impl HealthLink {
    /// Read the persisted link. Missing, unreadable or unknown values mean
    /// disconnected.
    pub fn load<S: KeyValueStore + ?Sized>(store: &S) -> Self {
        let ecosystem = match store.get(HEALTH_LINK_KEY) {
            Ok(Some(raw)) => {
                let id = raw.trim().trim_matches('"');
                match id.parse::<Ecosystem>() {
                    Ok(eco) => Some(eco),
                    Err(e) => {
                        tracing::warn!("Ignoring stored health link: {}", e);
                        None
                    }
                }
            }
            Ok(None) => None,
            Err(e) => {
                tracing::warn!("Failed to load health link: {}", e);
                None
            }
        };
        Self { ecosystem }
    }

    pub fn status(&self) -> LinkStatus {
        match self.ecosystem {
            Some(eco) => LinkStatus::Connected(eco),
            None => LinkStatus::Disconnected,
        }
    }

    pub fn ecosystem(&self) -> Option<Ecosystem> {
        self.ecosystem
    }

    pub fn is_connected(&self) -> bool {
        self.ecosystem.is_some()
    }

    /// Link an ecosystem. The in-memory link changes even if the write fails.
    pub fn connect<S: KeyValueStore + ?Sized>(&mut self, store: &mut S, ecosystem: Ecosystem) {
        self.ecosystem = Some(ecosystem);
        match store.set(HEALTH_LINK_KEY, ecosystem.as_str()) {
            Ok(()) => tracing::info!("Linked {}", ecosystem.display_name()),
            Err(e) => tracing::warn!("Failed to persist health link: {}", e),
        }
    }

    pub fn disconnect<S: KeyValueStore + ?Sized>(&mut self, store: &mut S) {
        self.ecosystem = None;
        match store.remove(HEALTH_LINK_KEY) {
            Ok(()) => tracing::info!("Health link removed"),
            Err(e) => tracing::warn!("Failed to remove health link: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{FileStore, MemoryStore};

    #[test]
    fn test_default_is_disconnected() {
        let link = HealthLink::load(&MemoryStore::new());
        assert_eq!(link.status(), LinkStatus::Disconnected);
        assert!(!link.is_connected());
    }

    #[test]
    fn test_connect_persists_bare_id() {
        let mut store = MemoryStore::new();
        let mut link = HealthLink::load(&store);
        link.connect(&mut store, Ecosystem::GoogleFit);

        assert_eq!(link.status(), LinkStatus::Connected(Ecosystem::GoogleFit));
        assert_eq!(store.get(HEALTH_LINK_KEY).unwrap().as_deref(), Some("googlefit"));
        assert_eq!(HealthLink::load(&store).ecosystem(), Some(Ecosystem::GoogleFit));
    }

    #[test]
    fn test_disconnect() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::new(temp_dir.path());
        let mut link = HealthLink::default();
        link.connect(&mut store, Ecosystem::HealthKit);
        link.disconnect(&mut store);

        assert_eq!(link.status(), LinkStatus::Disconnected);
        assert_eq!(HealthLink::load(&store).status(), LinkStatus::Disconnected);
    }

    #[test]
    fn test_unknown_or_quoted_values() {
        let mut store = MemoryStore::new();
        store.set(HEALTH_LINK_KEY, "fitbit").unwrap();
        assert!(!HealthLink::load(&store).is_connected());

        store.set(HEALTH_LINK_KEY, "\"healthkit\"").unwrap();
        assert_eq!(HealthLink::load(&store).ecosystem(), Some(Ecosystem::HealthKit));
    }

    #[test]
    fn test_write_failure_keeps_memory_state() {
        let mut store = MemoryStore::new();
        store.set_unavailable(true);
        let mut link = HealthLink::load(&store);
        link.connect(&mut store, Ecosystem::HealthKit);
        assert!(link.is_connected());
    }

    #[test]
    fn test_status_display() {
        assert_eq!(
            LinkStatus::Connected(Ecosystem::GoogleFit).to_string(),
            "Connected to Google Fit"
        );
        assert_eq!(LinkStatus::Disconnected.to_string(), "Disconnected");
    }
}
