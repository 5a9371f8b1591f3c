//! Option selection state for multi-valued template variables
//!
//! Each variable opened for editing gets a `VariableOptionState`. The state is
//! never mutated in place: every transition returns a new value, and the
//! `VariableStateMap` holding all variables of one editing session is replaced
//! as a whole on every update. Collapsing the other variables when one is
//! touched therefore happens in the new map, never in a state another caller
//! may still hold.
//!
//! # Transitions
//!
//! ```text
//!             request_expand
//! collapsed ─────────────────▶ expanded
//!     ▲                           │
//!     └───────────────────────────┘
//!   request_collapse, or any selection change on a single-valued variable
//! ```

use crate::templating::resolver::VariableSource;
use crate::templating::scanner::scan_variables;
use crate::types::{QueryTarget, TemplateVariable, VariableOption, ALL_VARIABLE_VALUE};

/// Selection state of one template variable during an editing session
#[derive(Debug, Clone, PartialEq)]
pub struct VariableOptionState {
    /// Variable id, empty for names with no declared variable
    pub id: String,
    /// Candidate options; `selected` flags mirror `selected_values`
    pub options: Vec<VariableOption>,
    /// Selected options in selection order
    pub selected_values: Vec<VariableOption>,
    /// Search filter text, or raw input for undeclared variables
    pub query_value: String,
    /// Highlighted row, -1 for none
    pub highlight_index: i32,
    /// Whether multiple selections are permitted
    pub multi: bool,
    /// Whether the option list is expanded
    pub show_option: bool,
}

impl Default for VariableOptionState {
    fn default() -> Self {
        Self {
            id: String::new(),
            options: Vec::new(),
            selected_values: Vec::new(),
            query_value: String::new(),
            highlight_index: -1,
            multi: false,
            show_option: false,
        }
    }
}

impl VariableOptionState {
    /// Initial state for a declared variable, seeded from its current value
    pub fn from_variable(variable: &TemplateVariable) -> Self {
        let selected_values = variable
            .current_values()
            .into_iter()
            .map(|value| {
                variable
                    .options
                    .iter()
                    .find(|o| o.value == value)
                    .map(VariableOption::as_selected)
                    .unwrap_or_else(|| VariableOption {
                        text: value.clone(),
                        value,
                        selected: true,
                    })
            })
            .collect();

        Self {
            id: variable.id.clone(),
            options: variable.options.clone(),
            selected_values,
            multi: variable.multi,
            ..Self::default()
        }
        .update_options()
    }

    /// Initial state for a name with no declared variable
    pub fn unbound() -> Self {
        Self::default()
    }

    /// Open the option list
    pub fn request_expand(&self) -> Self {
        Self {
            show_option: true,
            ..self.clone()
        }
    }

    /// Close the option list (dismiss or click outside)
    pub fn request_collapse(&self) -> Self {
        Self {
            show_option: false,
            ..self.clone()
        }
    }

    /// Update the search filter; the selection is untouched
    pub fn filter_options(&self, query: impl Into<String>) -> Self {
        Self {
            query_value: query.into(),
            ..self.clone()
        }
    }

    /// Toggle one option
    ///
    /// The "All" option, single-valued variables and `clear_others` replace
    /// the whole selection. Otherwise the option is appended or removed,
    /// matching on the `(value, text)` pair.
    pub fn toggle_option(&self, option: &VariableOption, clear_others: bool) -> Self {
        let mut next = self.clone();
        let already_selected = self.is_selected(option);

        if option.is_all() || !self.multi || clear_others {
            next.selected_values = if already_selected {
                Vec::new()
            } else {
                vec![option.as_selected()]
            };
        } else if already_selected {
            next.selected_values.retain(|o| !o.same_as(option));
        } else {
            next.selected_values.push(option.as_selected());
        }

        next.after_selection_change()
    }

    /// Drop every selected option
    pub fn clear_selection(&self) -> Self {
        Self {
            selected_values: Vec::new(),
            ..self.clone()
        }
        .after_selection_change()
    }

    /// Cycle the select-all control
    ///
    /// 1. "All" configured, not selected, something else selected: select only "All".
    /// 2. "All" is the only selection: select every concrete option.
    /// 3. No "All" configured and something selected: clear.
    /// 4. Nothing selected: select every concrete option.
    pub fn toggle_all_options(&self) -> Self {
        let all_configured = self.options.iter().find(|o| o.is_all());
        let all_selected = self.selected_values.iter().any(|o| o.is_all());
        let mut next = self.clone();

        next.selected_values = match all_configured {
            Some(all) if !self.selected_values.is_empty() && !all_selected => {
                let text = if all.text.is_empty() { "All" } else { all.text.as_str() };
                vec![VariableOption {
                    text: text.to_string(),
                    value: all.value.clone(),
                    selected: true,
                }]
            }
            _ if all_selected && self.selected_values.len() == 1 => self.all_concrete_selected(),
            None if !self.selected_values.is_empty() => Vec::new(),
            _ => self.all_concrete_selected(),
        };

        let mut next = next.update_options();
        next.show_option = self.multi;
        next
    }

    /// Options matching the search filter, case-insensitive on text or value
    pub fn visible_options(&self) -> Vec<&VariableOption> {
        let needle = self.query_value.to_lowercase();
        self.options
            .iter()
            .filter(|o| {
                o.text.to_lowercase().contains(&needle) || o.value.to_lowercase().contains(&needle)
            })
            .collect()
    }

    /// True if `option` is in the selection
    pub fn is_selected(&self, option: &VariableOption) -> bool {
        self.selected_values.iter().any(|o| o.same_as(option))
    }

    /// True if the "All" sentinel is selected
    pub fn is_all_selected(&self) -> bool {
        self.selected_values.iter().any(|o| o.value == ALL_VARIABLE_VALUE)
    }

    /// Selected values in selection order
    pub fn selected_value_list(&self) -> Vec<String> {
        self.selected_values.iter().map(|o| o.value.clone()).collect()
    }

    /// Text shown on the collapsed picker
    pub fn display_text(&self, variable: &TemplateVariable) -> String {
        if !self.selected_values.is_empty() {
            return self
                .selected_values
                .iter()
                .map(|o| o.text.as_str())
                .collect::<Vec<_>>()
                .join("+");
        }
        variable
            .current_values()
            .iter()
            .map(|v| variable.text_for(v))
            .collect::<Vec<_>>()
            .join("+")
    }

    fn all_concrete_selected(&self) -> Vec<VariableOption> {
        self.options
            .iter()
            .filter(|o| !o.is_all())
            .map(VariableOption::as_selected)
            .collect()
    }

    fn after_selection_change(self) -> Self {
        let multi = self.multi;
        let mut next = self
            .update_default_selection()
            .update_all_selection()
            .update_options();
        next.show_option = multi;
        next
    }

    /// Empty selection falls back to "All" when it is the first option
    fn update_default_selection(mut self) -> Self {
        if self.selected_values.is_empty() {
            if let Some(first) = self.options.first().filter(|o| o.is_all()) {
                self.selected_values = vec![first.as_selected()];
            }
        }
        self
    }

    /// "All" never coexists with other selections
    fn update_all_selection(mut self) -> Self {
        if self.selected_values.len() > 1 {
            self.selected_values.retain(|o| !o.is_all());
        }
        self
    }

    fn update_options(mut self) -> Self {
        let selected: Vec<String> = self.selected_value_list();
        for option in &mut self.options {
            option.selected = selected.contains(&option.value);
        }
        self
    }
}

/// Option states of every variable referenced by one target being edited
///
/// Entries keep first-seen order. Updates return a new map.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VariableStateMap {
    entries: Vec<(String, VariableOptionState)>,
}

impl VariableStateMap {
    /// Empty map
    pub fn new() -> Self {
        Self::default()
    }

    /// Build states for every variable referenced by the strategy view of `target`
    pub fn for_target(target: &QueryTarget, source: &dyn VariableSource) -> Self {
        let view = target.strategy_view().to_string();
        let entries = scan_variables(&view)
            .into_iter()
            .map(|name| {
                let state = match source.template_variable(&name) {
                    Some(variable) => VariableOptionState::from_variable(&variable),
                    None => VariableOptionState::unbound(),
                };
                (name, state)
            })
            .collect();
        Self { entries }
    }

    /// State of `name`
    pub fn get(&self, name: &str) -> Option<&VariableOptionState> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, s)| s)
    }

    /// Variable names in first-seen order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    /// Iterate over `(name, state)` pairs
    pub fn iter(&self) -> impl Iterator<Item = (&str, &VariableOptionState)> {
        self.entries.iter().map(|(n, s)| (n.as_str(), s))
    }

    /// Number of variables
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no variable is referenced
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// New map with `state` stored under `name` and every other list collapsed
    pub fn with_state(&self, name: &str, state: VariableOptionState) -> Self {
        let mut entries: Vec<(String, VariableOptionState)> = self
            .entries
            .iter()
            .map(|(n, s)| {
                if n == name {
                    (n.clone(), state.clone())
                } else {
                    (n.clone(), s.request_collapse())
                }
            })
            .collect();
        if !entries.iter().any(|(n, _)| n == name) {
            entries.push((name.to_string(), state));
        }
        Self { entries }
    }

    /// Apply a transition to the state of `name`; unknown names start unbound
    pub fn update<F>(&self, name: &str, transition: F) -> Self
    where
        F: FnOnce(&VariableOptionState) -> VariableOptionState,
    {
        let current = self.get(name).cloned().unwrap_or_default();
        self.with_state(name, transition(&current))
    }

    /// Record raw inline input for a variable with no declared options
    pub fn set_raw_input(&self, name: &str, text: impl Into<String>) -> Self {
        let text = text.into();
        self.update(name, |state| state.filter_options(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CurrentValue;

    fn variable(multi: bool, with_all: bool) -> TemplateVariable {
        let mut options = Vec::new();
        if with_all {
            options.push(VariableOption::all());
        }
        options.push(VariableOption::new("web-01", "web-01"));
        options.push(VariableOption::new("web-02", "web-02"));
        options.push(VariableOption::new("db-01", "db-01"));
        TemplateVariable {
            id: "host".to_string(),
            current: CurrentValue::Multi(Vec::new()),
            options,
            multi,
            all_value: None,
        }
    }

    fn empty_state(multi: bool, with_all: bool) -> VariableOptionState {
        let mut state = VariableOptionState::from_variable(&variable(multi, with_all));
        state.selected_values.clear();
        state
    }

    #[test]
    fn test_seed_from_current_value() {
        let mut var = variable(true, false);
        var.current = CurrentValue::Single("web-02".to_string());
        let state = VariableOptionState::from_variable(&var);
        assert_eq!(state.selected_value_list(), vec!["web-02"]);
        assert!(state.options[1].selected);
        assert!(!state.options[0].selected);
        assert_eq!(state.highlight_index, -1);
        assert!(!state.show_option);
    }

    #[test]
    fn test_multi_toggle_appends_and_removes() {
        let state = empty_state(true, false);
        let a = VariableOption::new("web-01", "web-01");
        let b = VariableOption::new("db-01", "db-01");

        let state = state.toggle_option(&b, false).toggle_option(&a, false);
        assert_eq!(state.selected_value_list(), vec!["db-01", "web-01"]);
        assert!(state.show_option);

        let state = state.toggle_option(&b, false);
        assert_eq!(state.selected_value_list(), vec!["web-01"]);
    }

    #[test]
    fn test_remove_matches_value_and_text_pair() {
        let mut state = empty_state(true, false);
        state.selected_values = vec![
            VariableOption::new("A", "x").as_selected(),
            VariableOption::new("B", "x").as_selected(),
        ];
        let state = state.toggle_option(&VariableOption::new("A", "x"), false);
        assert_eq!(state.selected_values.len(), 1);
        assert_eq!(state.selected_values[0].text, "B");
    }

    #[test]
    fn test_single_valued_replaces_and_collapses() {
        let state = empty_state(false, false).request_expand();
        let a = VariableOption::new("web-01", "web-01");
        let b = VariableOption::new("web-02", "web-02");

        let state = state.toggle_option(&a, false).toggle_option(&b, false);
        assert_eq!(state.selected_value_list(), vec!["web-02"]);
        assert!(!state.show_option);

        let state = state.toggle_option(&b, false);
        assert!(state.selected_values.is_empty());
    }

    #[test]
    fn test_clear_others_replaces_selection() {
        let state = empty_state(true, false);
        let a = VariableOption::new("web-01", "web-01");
        let b = VariableOption::new("web-02", "web-02");
        let state = state.toggle_option(&a, false).toggle_option(&b, true);
        assert_eq!(state.selected_value_list(), vec!["web-02"]);
    }

    #[test]
    fn test_selecting_other_option_drops_all() {
        let state = empty_state(true, true).toggle_option(&VariableOption::all(), false);
        assert!(state.is_all_selected());
        let state = state.toggle_option(&VariableOption::new("web-01", "web-01"), false);
        assert_eq!(state.selected_value_list(), vec!["web-01"]);
    }

    #[test]
    fn test_empty_selection_defaults_to_leading_all() {
        let state = empty_state(true, true);
        let a = VariableOption::new("web-01", "web-01");
        let state = state.toggle_option(&a, false).toggle_option(&a, false);
        assert_eq!(state.selected_value_list(), vec![ALL_VARIABLE_VALUE]);
    }

    #[test]
    fn test_toggle_all_cycle_with_all_option() {
        let state = empty_state(true, true);
        // Nothing selected: every concrete option
        let state = state.toggle_all_options();
        assert_eq!(state.selected_value_list(), vec!["web-01", "web-02", "db-01"]);
        // Something selected, "All" configured: only "All"
        let state = state.toggle_all_options();
        assert_eq!(state.selected_value_list(), vec![ALL_VARIABLE_VALUE]);
        assert_eq!(state.selected_values[0].text, "All");
        // Only "All": every concrete option again
        let state = state.toggle_all_options();
        assert_eq!(state.selected_values.len(), 3);
        assert!(!state.is_all_selected());
    }

    #[test]
    fn test_toggle_all_without_all_option_clears() {
        let state = empty_state(true, false).toggle_all_options();
        assert_eq!(state.selected_values.len(), 3);
        let state = state.toggle_all_options();
        assert!(state.selected_values.is_empty());
        assert!(state.options.iter().all(|o| !o.selected));
    }

    #[test]
    fn test_filter_does_not_touch_selection() {
        let state = empty_state(true, false)
            .toggle_option(&VariableOption::new("db-01", "db-01"), false)
            .filter_options("WEB");
        assert_eq!(state.selected_value_list(), vec!["db-01"]);
        let visible: Vec<_> = state.visible_options().iter().map(|o| o.value.as_str()).collect();
        assert_eq!(visible, vec!["web-01", "web-02"]);
    }

    #[test]
    fn test_display_text() {
        let var = variable(true, false);
        let state = empty_state(true, false)
            .toggle_option(&VariableOption::new("web-01", "web-01"), false)
            .toggle_option(&VariableOption::new("db-01", "db-01"), false);
        assert_eq!(state.display_text(&var), "web-01+db-01");
    }

    #[test]
    fn test_map_update_collapses_others_without_touching_old_map() {
        let map = VariableStateMap::new()
            .with_state("host", empty_state(true, false).request_expand())
            .with_state("zone", empty_state(true, false));
        assert!(!map.get("host").unwrap().show_option);

        let expanded = map.update("host", VariableOptionState::request_expand);
        let updated = expanded.update("zone", VariableOptionState::request_expand);
        assert!(expanded.get("host").unwrap().show_option);
        assert!(!updated.get("host").unwrap().show_option);
        assert!(updated.get("zone").unwrap().show_option);
        assert_eq!(updated.names().collect::<Vec<_>>(), vec!["host", "zone"]);
    }

    #[test]
    fn test_raw_input_for_unbound_name() {
        let map = VariableStateMap::new().set_raw_input("custom", "abc");
        let state = map.get("custom").unwrap();
        assert_eq!(state.query_value, "abc");
        assert!(state.options.is_empty());
    }
}
