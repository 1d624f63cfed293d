//! User agent seam: navigation, notices and the small store that survives a
//! login redirect.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

/// What the session manager needs from the environment hosting the UI.
pub trait UserAgent: Send + Sync {
    /// Current in-app location (path, query and fragment).
    fn current_location(&self) -> String;

    /// In-app navigation to `path`.
    fn navigate(&self, path: &str);

    /// Leave the app for an external URL.
    fn redirect(&self, url: &str);

    /// Show a message to the user.
    fn notify(&self, message: &str);

    fn store_item(&self, key: &str, value: &str);
    fn load_item(&self, key: &str) -> Option<String>;
    fn remove_item(&self, key: &str);
}

/// Something a [`HeadlessAgent`] was asked to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentEvent {
    Navigated(String),
    Redirected(String),
    Notified(String),
}

/// In-memory [`UserAgent`] that records every navigation, redirect and notice.
#[derive(Debug)]
pub struct HeadlessAgent {
    location: Mutex<String>,
    events: Mutex<Vec<AgentEvent>>,
    storage: Mutex<HashMap<String, String>>,
}

impl Default for HeadlessAgent {
    fn default() -> Self {
        Self::new("/")
    }
}

impl HeadlessAgent {
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            location: Mutex::new(location.into()),
            events: Mutex::new(Vec::new()),
            storage: Mutex::new(HashMap::new()),
        }
    }

    pub fn events(&self) -> Vec<AgentEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Most recent external redirect, if any.
    pub fn last_redirect(&self) -> Option<String> {
        self.events().into_iter().rev().find_map(|e| match e {
            AgentEvent::Redirected(url) => Some(url),
            _ => None,
        })
    }

    pub fn notices(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                AgentEvent::Notified(message) => Some(message),
                _ => None,
            })
            .collect()
    }

    fn record(&self, event: AgentEvent) {
        tracing::debug!(?event, "User agent");
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}

impl UserAgent for HeadlessAgent {
    fn current_location(&self) -> String {
        self.location
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn navigate(&self, path: &str) {
        *self.location.lock().unwrap_or_else(PoisonError::into_inner) = path.to_string();
        self.record(AgentEvent::Navigated(path.to_string()));
    }

    fn redirect(&self, url: &str) {
        self.record(AgentEvent::Redirected(url.to_string()));
    }

    fn notify(&self, message: &str) {
        self.record(AgentEvent::Notified(message.to_string()));
    }

    fn store_item(&self, key: &str, value: &str) {
        self.storage
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
    }

    fn load_item(&self, key: &str) -> Option<String> {
        self.storage
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn remove_item(&self, key: &str) {
        self.storage
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headless_agent_records() {
        let agent = HeadlessAgent::new("/courses?page=2");
        assert_eq!(agent.current_location(), "/courses?page=2");

        agent.redirect("https://tenant.example.com/authorize");
        agent.notify("hello");
        agent.navigate("/profile");

        assert_eq!(agent.current_location(), "/profile");
        assert_eq!(
            agent.last_redirect().as_deref(),
            Some("https://tenant.example.com/authorize")
        );
        assert_eq!(agent.notices(), vec!["hello".to_string()]);
        assert_eq!(agent.events().len(), 3);
    }

    #[test]
    fn test_storage() {
        let agent = HeadlessAgent::default();
        assert!(agent.load_item("k").is_none());
        agent.store_item("k", "v");
        assert_eq!(agent.load_item("k").as_deref(), Some("v"));
        agent.remove_item("k");
        assert!(agent.load_item("k").is_none());
    }
}
