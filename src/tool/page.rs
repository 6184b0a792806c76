//! The hosting page: its query string and user-visible alerts.

use std::cell::RefCell;
use std::rc::Rc;

/// What the tool needs from the page hosting it.
pub trait HostPage {
    /// Current query string (with or without a leading `?`).
    fn query(&self) -> String;
    /// Replace the query string without reloading or adding history.
    fn replace_query(&mut self, query: &str);
    /// Show an error to the user.
    fn alert(&mut self, message: &str);
}

#[derive(Debug, Default)]
struct PageState {
    query: String,
    alerts: Vec<String>,
}

/// In-memory page. Clones share state, so a caller can keep a handle to
/// inspect what the tool wrote.
#[derive(Debug, Clone, Default)]
pub struct MemoryPage {
    state: Rc<RefCell<PageState>>,
}

impl MemoryPage {
    /// A page opened with `query`.
    #[must_use]
    pub fn new(query: &str) -> Self {
        let page = Self::default();
        query.clone_into(&mut page.state.borrow_mut().query);
        page
    }

    /// Alerts shown so far.
    #[must_use]
    pub fn alerts(&self) -> Vec<String> {
        self.state.borrow().alerts.clone()
    }

    /// Current query string.
    #[must_use]
    pub fn current_query(&self) -> String {
        self.state.borrow().query.clone()
    }
}

impl HostPage for MemoryPage {
    fn query(&self) -> String {
        self.current_query()
    }

    fn replace_query(&mut self, query: &str) {
        query.clone_into(&mut self.state.borrow_mut().query);
    }

    fn alert(&mut self, message: &str) {
        log::warn!("alert: {message}");
        self.state.borrow_mut().alerts.push(message.to_owned());
    }
}
