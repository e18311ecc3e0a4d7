//! Tag selector: free-text tag entry with debounced remote suggestions.
//!
//! The selected tags belong to the embedding form and are handed in as a
//! [`SelectedTags`] handle. The selector owns the input text, the suggestion
//! list and a single-slot debounce timer.
//!
//! Every input change re-arms the timer; only the text that survives a full
//! quiet window is looked up. Lookups run detached and are never cancelled
//! once issued. Each one carries an increasing id and a response older than
//! the last one applied (or issued before the last commit/clear) is dropped.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;
use tokio::task::JoinHandle;

use crate::models::{SelectedTags, Tag, TagLabel};
use crate::remote::DocumentApi;
use crate::session::Session;

/// Quiet window before a lookup fires.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

/// Keys the selector reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Enter,
    Comma,
    Backspace,
    Other,
}

impl Key {
    /// Map a DOM-style key name onto a [`Key`].
    pub fn from_name(name: &str) -> Self {
        match name {
            "Enter" => Key::Enter,
            "," => Key::Comma,
            "Backspace" => Key::Backspace,
            _ => Key::Other,
        }
    }
}

/// Suggestion state shared with in-flight lookups.
#[derive(Debug, Default)]
struct Suggestions {
    items: Vec<Tag>,
    in_flight: usize,
    /// Id of the most recently issued lookup
    issued: u64,
    /// Responses with an id at or below this are stale
    floor: u64,
}

impl Suggestions {
    /// Drop the list and everything currently in flight.
    fn invalidate(&mut self) {
        self.items.clear();
        self.floor = self.issued;
    }
}

type SharedSuggestions = Arc<Mutex<Suggestions>>;

fn lock(shared: &SharedSuggestions) -> MutexGuard<'_, Suggestions> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Serializable view of a tag selector.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TagInputView {
    pub input: String,
    pub selected: Vec<Tag>,
    pub suggestions: Vec<Tag>,
    pub loading: bool,
    pub open: bool,
}

/// Everything a detached lookup needs.
#[derive(Clone)]
struct Lookup {
    api: Arc<dyn DocumentApi>,
    session: Session,
    selected: SelectedTags,
    shared: SharedSuggestions,
}

impl Lookup {
    /// Issue a lookup for `term` on its own task.
    fn issue(self, term: String) {
        let Some(token) = self.session.token() else {
            lock(&self.shared).invalidate();
            return;
        };

        let id = {
            let mut state = lock(&self.shared);
            state.issued += 1;
            state.in_flight += 1;
            state.issued
        };

        tokio::spawn(async move {
            let result = self.api.document_tags(&term, &token).await;

            let mut state = lock(&self.shared);
            state.in_flight = state.in_flight.saturating_sub(1);

            if id <= state.floor {
                tracing::debug!(id, term = %term, "Discarding stale tag suggestions");
                return;
            }
            state.floor = id;

            state.items = match result {
                Ok(labels) => self.filter(labels),
                Err(e) => {
                    tracing::debug!(term = %term, "Tag lookup failed: {}", e);
                    Vec::new()
                }
            };
        });
    }

    fn filter(&self, labels: Vec<TagLabel>) -> Vec<Tag> {
        let mut tags: Vec<Tag> = Vec::with_capacity(labels.len());
        for tag in labels.iter().filter_map(|l| Tag::new(&l.label)) {
            if !self.selected.contains(tag.as_str()) && !tags.contains(&tag) {
                tags.push(tag);
            }
        }
        tags
    }
}

/// Tag entry with debounced suggestions.
///
/// Input changes spawn tokio tasks, so the selector must be driven from within
/// a tokio runtime.
pub struct TagSelector {
    lookup: Lookup,
    input: String,
    open: bool,
    debounce: Duration,
    pending: Option<JoinHandle<()>>,
}

impl TagSelector {
    pub fn new(api: Arc<dyn DocumentApi>, session: Session, selected: SelectedTags) -> Self {
        Self {
            lookup: Lookup {
                api,
                session,
                selected,
                shared: SharedSuggestions::default(),
            },
            input: String::new(),
            open: false,
            debounce: DEFAULT_DEBOUNCE,
            pending: None,
        }
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn selected(&self) -> &SelectedTags {
        &self.lookup.selected
    }

    /// Latest applied suggestions.
    pub fn suggestions(&self) -> Vec<Tag> {
        lock(&self.lookup.shared).items.clone()
    }

    /// Suggestions that still match the current input.
    pub fn visible_suggestions(&self) -> Vec<Tag> {
        let needle = self.input.to_lowercase();
        lock(&self.lookup.shared)
            .items
            .iter()
            .filter(|t| t.as_str().contains(&needle))
            .cloned()
            .collect()
    }

    pub fn is_loading(&self) -> bool {
        lock(&self.lookup.shared).in_flight > 0
    }

    pub fn focus(&mut self) {
        self.open = true;
    }

    pub fn blur(&mut self) {
        self.open = false;
    }

    /// Store new input text and re-arm the debounce timer.
    pub fn on_input_change(&mut self, text: impl Into<String>) {
        self.input = text.into();
        self.open = true;
        self.schedule_lookup();
    }

    /// Normalize and append a tag, then clear input and suggestions.
    ///
    /// Returns true when the selection grew.
    pub fn commit_tag(&mut self, text: &str) -> bool {
        let added = match Tag::new(text) {
            Some(tag) => self.lookup.selected.add(tag),
            None => false,
        };

        self.input.clear();
        self.cancel_pending();
        lock(&self.lookup.shared).invalidate();
        added
    }

    /// Commit a suggestion picked directly from the list.
    pub fn select_suggestion(&mut self, tag: &str) -> bool {
        self.commit_tag(tag)
    }

    /// Remove the exact tag if it is selected.
    pub fn remove_tag(&mut self, tag: &str) -> bool {
        let removed = self.lookup.selected.remove(tag);
        if removed {
            self.refresh_after_removal();
        }
        removed
    }

    /// React to a key press. Returns true when the key's default effect
    /// should be suppressed.
    pub fn handle_key(&mut self, key: Key) -> bool {
        match key {
            Key::Enter | Key::Comma => {
                let first = if self.open {
                    lock(&self.lookup.shared).items.first().cloned()
                } else {
                    None
                };
                match first {
                    Some(tag) => self.commit_tag(tag.as_str()),
                    None => {
                        let raw = std::mem::take(&mut self.input);
                        self.commit_tag(&raw)
                    }
                };
                true
            }
            Key::Backspace if self.input.is_empty() => {
                if self.lookup.selected.pop().is_some() {
                    self.refresh_after_removal();
                }
                false
            }
            _ => false,
        }
    }

    /// Clear input and suggestions and disarm the timer.
    pub fn reset(&mut self) {
        self.input.clear();
        self.open = false;
        self.cancel_pending();
        lock(&self.lookup.shared).invalidate();
    }

    pub fn view(&self) -> TagInputView {
        TagInputView {
            input: self.input.clone(),
            selected: self.lookup.selected.snapshot(),
            suggestions: self.visible_suggestions(),
            loading: self.is_loading(),
            open: self.open,
        }
    }

    /// Cancel any pending timer and arm a new one for the current input.
    /// Blank input or a missing credential clears the suggestions instead.
    fn schedule_lookup(&mut self) {
        self.cancel_pending();

        if self.input.trim().is_empty() || self.lookup.session.token().is_none() {
            lock(&self.lookup.shared).invalidate();
            return;
        }

        let lookup = self.lookup.clone();
        let term = self.input.clone();
        let delay = self.debounce;
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            lookup.issue(term);
        }));
    }

    /// A removed tag may match the current input again.
    fn refresh_after_removal(&mut self) {
        if !self.input.trim().is_empty() {
            self.schedule_lookup();
        }
    }

    fn cancel_pending(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }
}

impl Drop for TagSelector {
    fn drop(&mut self) {
        self.cancel_pending();
    }
}
