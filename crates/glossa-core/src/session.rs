//! Per-page session state shared by triggers and widgets.

use std::cell::RefCell;

use smol_str::SmolStr;

/// State that lives as long as the reader stays on one page.
///
/// Navigation tears it down. Requests already in flight are not cancelled;
/// they finish against whatever state they captured.
#[derive(Debug, Default)]
pub struct Session {
    topic: RefCell<Option<SmolStr>>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current topic, if one was entered.
    pub fn topic(&self) -> Option<SmolStr> {
        self.topic.borrow().clone()
    }

    /// Set the topic. Blank input clears it.
    pub fn set_topic(&self, topic: impl Into<SmolStr>) {
        let topic: SmolStr = topic.into();
        let topic = Some(topic).filter(|t| !t.trim().is_empty());
        tracing::debug!(topic = ?topic, "topic set");
        *self.topic.borrow_mut() = topic;
    }

    /// Page navigation: drop everything tied to the current page.
    pub fn on_navigation(&self) {
        if self.topic.borrow_mut().take().is_some() {
            tracing::debug!("session cleared on navigation");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topic_lifecycle() {
        let session = Session::new();
        assert_eq!(session.topic(), None);
        session.set_topic("kubernetes");
        assert_eq!(session.topic().as_deref(), Some("kubernetes"));
        session.set_topic("   ");
        assert_eq!(session.topic(), None);
        session.set_topic("rust");
        session.on_navigation();
        assert_eq!(session.topic(), None);
    }
}
