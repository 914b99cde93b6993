//! Interaction producer and element labelling.
//!
//! The host describes the element an input event targeted as an
//! [`ElementInfo`]; the tracker resolves it to a short, human-meaningful id
//! and emits an [`Interaction`].

use crate::collector::handle::{Listener, TrackerHandle};
use crate::collector::types::Interaction;
use crate::core::clock::SharedClock;
use std::collections::BTreeMap;

/// Event types tracked when none are configured.
pub const DEFAULT_INTERACTION_EVENTS: [&str; 3] = ["click", "input", "submit"];

/// Explicit label attribute, looked up on the element and its ancestors.
pub const ID_ATTRIBUTE: &str = "data-rpm-id";

/// Group label attribute, looked up on the element and its ancestors.
pub const GROUP_ATTRIBUTE: &str = "data-rpm-group";

/// Longest label derived from free text.
pub const MAX_LABEL_LENGTH: usize = 30;

/// Label used when an event has no element target.
pub const UNKNOWN_TARGET: &str = "unknown";

/// Description of a UI element, with its ancestor chain.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ElementInfo {
    pub tag_name: String,
    pub attributes: BTreeMap<String, String>,
    pub text_content: Option<String>,
    pub parent: Option<Box<ElementInfo>>,
}

impl ElementInfo {
    pub fn new(tag_name: impl Into<String>) -> Self {
        Self {
            tag_name: tag_name.into(),
            ..Self::default()
        }
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text_content = Some(text.into());
        self
    }

    pub fn with_parent(mut self, parent: ElementInfo) -> Self {
        self.parent = Some(Box::new(parent));
        self
    }

    /// Attribute value, trimmed, if present and not blank.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .get(name)
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
    }

    /// Attribute value from this element or the nearest ancestor carrying it.
    pub fn closest_attr(&self, name: &str) -> Option<&str> {
        let mut current = Some(self);
        while let Some(element) = current {
            if let Some(value) = element.attributes.get(name) {
                return Some(value.as_str()).filter(|value| !value.is_empty());
            }
            current = element.parent.as_deref();
        }
        None
    }

    fn is_tag(&self, tags: &[&str]) -> bool {
        tags.iter().any(|tag| self.tag_name.eq_ignore_ascii_case(tag))
    }

    fn is_labeled_control(&self) -> bool {
        let role = self.attributes.get("role").map(String::as_str);
        self.is_tag(&["button", "a"]) || matches!(role, Some("button" | "menuitem" | "tab"))
    }
}

/// Resolve a non-empty label for the element an interaction targeted.
///
/// The first match wins: explicit id attribute, group attribute, element id,
/// ARIA label, placeholder (text inputs), test id, form control name, the
/// text of a button-like control, then the lowercase tag name.
pub fn resolve_interaction_id(target: Option<&ElementInfo>) -> String {
    let Some(element) = target else {
        return UNKNOWN_TARGET.to_string();
    };

    if let Some(id) = element.closest_attr(ID_ATTRIBUTE) {
        return id.to_string();
    }
    if let Some(group) = element.closest_attr(GROUP_ATTRIBUTE) {
        return group.to_string();
    }
    if let Some(id) = element.attributes.get("id").filter(|id| !id.is_empty()) {
        return id.clone();
    }
    if let Some(label) = element.attr("aria-label") {
        return truncate_label(label);
    }
    if element.is_tag(&["input", "textarea"]) {
        if let Some(placeholder) = element.attr("placeholder") {
            return truncate_label(placeholder);
        }
    }
    if let Some(test_id) = element.attr("data-testid") {
        return truncate_label(test_id);
    }
    if element.is_tag(&["input", "select", "textarea"]) {
        if let Some(name) = element.attr("name") {
            return truncate_label(name);
        }
    }
    if element.is_labeled_control() {
        if let Some(text) = element
            .text_content
            .as_deref()
            .map(str::trim)
            .filter(|text| !text.is_empty())
        {
            return truncate_label(text);
        }
    }

    let tag = element.tag_name.trim().to_lowercase();
    if tag.is_empty() {
        UNKNOWN_TARGET.to_string()
    } else {
        tag
    }
}

/// Trim, cut to [`MAX_LABEL_LENGTH`] characters, and collapse whitespace runs.
fn truncate_label(value: &str) -> String {
    let mut label = String::with_capacity(MAX_LABEL_LENGTH);
    let mut in_whitespace = false;
    for c in value.trim().chars().take(MAX_LABEL_LENGTH) {
        if c.is_whitespace() {
            if !in_whitespace {
                label.push(' ');
            }
            in_whitespace = true;
        } else {
            label.push(c);
            in_whitespace = false;
        }
    }
    label
}

/// Options for [`InteractionTracker`].
#[derive(Debug, Clone)]
pub struct InteractionTrackerOptions {
    /// Event types that count as interactions
    pub events: Vec<String>,
}

impl Default for InteractionTrackerOptions {
    fn default() -> Self {
        Self {
            events: DEFAULT_INTERACTION_EVENTS.iter().map(|e| e.to_string()).collect(),
        }
    }
}

/// Emits an [`Interaction`] for each tracked input event.
pub struct InteractionTracker {
    listener: Listener<Interaction>,
    events: Vec<String>,
    clock: SharedClock,
    handle: TrackerHandle,
}

impl InteractionTracker {
    pub fn new(
        listener: Listener<Interaction>,
        options: InteractionTrackerOptions,
        clock: SharedClock,
    ) -> Self {
        Self {
            listener,
            events: options.events,
            clock,
            handle: TrackerHandle::new(),
        }
    }

    pub fn handle(&self) -> TrackerHandle {
        self.handle.clone()
    }

    pub fn tracks(&self, event_type: &str) -> bool {
        self.events.iter().any(|e| e == event_type)
    }

    /// Record an input event. Returns the emitted interaction, or `None` if
    /// the event type is not tracked or the tracker was stopped.
    pub fn record(&self, event_type: &str, target: Option<&ElementInfo>) -> Option<Interaction> {
        if !self.handle.is_running() || !self.tracks(event_type) {
            return None;
        }

        let interaction = Interaction::new(
            resolve_interaction_id(target),
            event_type,
            self.clock.now_ms(),
        );
        (self.listener)(interaction.clone());
        Some(interaction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::handle::listener;
    use crate::core::clock::ManualClock;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_explicit_id_on_ancestor_wins() {
        let form = ElementInfo::new("FORM").with_attr(ID_ATTRIBUTE, "signup");
        let button = ElementInfo::new("BUTTON")
            .with_attr("id", "submit-btn")
            .with_text("Create account")
            .with_parent(form);

        assert_eq!(resolve_interaction_id(Some(&button)), "signup");
    }

    #[test]
    fn test_group_before_element_id() {
        let list = ElementInfo::new("UL").with_attr(GROUP_ATTRIBUTE, "todo-list");
        let item = ElementInfo::new("LI").with_attr("id", "todo-3").with_parent(list);

        assert_eq!(resolve_interaction_id(Some(&item)), "todo-list");
    }

    #[test]
    fn test_fallback_chain_order() {
        let aria = ElementInfo::new("DIV").with_attr("aria-label", "  Close dialog ");
        assert_eq!(resolve_interaction_id(Some(&aria)), "Close dialog");

        let input = ElementInfo::new("INPUT")
            .with_attr("placeholder", "Search users")
            .with_attr("name", "q");
        assert_eq!(resolve_interaction_id(Some(&input)), "Search users");

        let div_with_placeholder = ElementInfo::new("DIV")
            .with_attr("placeholder", "ignored")
            .with_attr("data-testid", "card");
        assert_eq!(resolve_interaction_id(Some(&div_with_placeholder)), "card");

        let select = ElementInfo::new("SELECT").with_attr("name", "country");
        assert_eq!(resolve_interaction_id(Some(&select)), "country");
    }

    #[test]
    fn test_button_text_is_truncated_and_collapsed() {
        let button = ElementInfo::new("BUTTON")
            .with_text("  Save   all of the pending changes to the server  ");
        let label = resolve_interaction_id(Some(&button));

        assert_eq!(label, "Save all of the pending chan");
        assert!(label.chars().count() <= MAX_LABEL_LENGTH);
    }

    #[test]
    fn test_role_button_uses_text() {
        let tab = ElementInfo::new("DIV").with_attr("role", "tab").with_text("Settings");
        assert_eq!(resolve_interaction_id(Some(&tab)), "Settings");

        let plain = ElementInfo::new("DIV").with_text("Settings");
        assert_eq!(resolve_interaction_id(Some(&plain)), "div");
    }

    #[test]
    fn test_never_empty() {
        assert_eq!(resolve_interaction_id(None), UNKNOWN_TARGET);
        assert_eq!(resolve_interaction_id(Some(&ElementInfo::new(""))), UNKNOWN_TARGET);
        assert_eq!(
            resolve_interaction_id(Some(&ElementInfo::new("SPAN").with_attr("aria-label", "  "))),
            "span"
        );
    }

    #[test]
    fn test_tracker_emits_tracked_events_only() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let clock = ManualClock::new(125.0);
        let tracker = InteractionTracker::new(
            listener(move |interaction: Interaction| sink.lock().unwrap().push(interaction)),
            InteractionTrackerOptions::default(),
            Arc::new(clock),
        );
        let button = ElementInfo::new("BUTTON").with_attr("id", "save");

        assert!(tracker.record("mousemove", Some(&button)).is_none());
        let interaction = tracker.record("click", Some(&button)).unwrap();

        assert_eq!(interaction.id, "save");
        assert_eq!(interaction.kind, "click");
        assert_eq!(interaction.start_time, 125.0);
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_stopped_tracker_is_silent() {
        let tracker = InteractionTracker::new(
            listener(|_: Interaction| panic!("should not emit")),
            InteractionTrackerOptions::default(),
            Arc::new(ManualClock::new(0.0)),
        );
        let handle = tracker.handle();
        handle.stop();
        handle.stop();

        assert!(tracker.record("click", None).is_none());
    }
}
