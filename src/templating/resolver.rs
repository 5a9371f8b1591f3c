//! Variable value resolution
//!
//! Turns a variable name into the text that replaces its placeholder. Two
//! emission modes exist because where-clause values are structured while
//! raw query text is not:
//!
//! - **List** (where-clause values): a multi-selection expands into several
//!   list entries, values are never escaped.
//! - **Text** (raw query language): one value substitutes as-is; several
//!   values are joined for the requested syntax.
//!
//! ```text
//! selection [x, y]   regex  ->  (x|y)
//! selection [x, y]   glob   ->  x|y
//! selection [a.b]    any    ->  a.b
//! ```
//!
//! Values come from the editing session's `VariableStateMap` when present,
//! otherwise from the variable's current value. A name with neither is an
//! unknown variable and its placeholder stays as written.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tracing::debug;

use crate::error::{Error, Result};
use crate::templating::options::VariableStateMap;
use crate::templating::scanner::{replace_placeholders, scan_variables};
use crate::types::{TemplateVariable, VariableOption, ALL_VARIABLE_VALUE};

// ============================================================================
// Variable Source
// ============================================================================

/// Source of declared template variables
pub trait VariableSource {
    /// Look up a variable by name
    fn template_variable(&self, name: &str) -> Option<TemplateVariable>;
}

impl VariableSource for HashMap<String, TemplateVariable> {
    fn template_variable(&self, name: &str) -> Option<TemplateVariable> {
        self.get(name).cloned()
    }
}

impl VariableSource for [TemplateVariable] {
    fn template_variable(&self, name: &str) -> Option<TemplateVariable> {
        self.iter().find(|v| v.id == name).cloned()
    }
}

impl VariableSource for Vec<TemplateVariable> {
    fn template_variable(&self, name: &str) -> Option<TemplateVariable> {
        self.as_slice().template_variable(name)
    }
}

impl<T: VariableSource + ?Sized> VariableSource for &T {
    fn template_variable(&self, name: &str) -> Option<TemplateVariable> {
        (**self).template_variable(name)
    }
}

// ============================================================================
// Emission
// ============================================================================

/// Target syntax when several values replace one placeholder in text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Syntax {
    /// Escaped values in a regex alternation group: `(a|b)`
    Regex,
    /// Plain values joined with `|`
    #[default]
    Glob,
    /// Plain values joined with `,`
    Csv,
}

impl Syntax {
    /// Syntax named by a placeholder format specifier
    pub fn from_format(format: &str) -> Option<Self> {
        match format {
            "regex" => Some(Syntax::Regex),
            "glob" | "pipe" => Some(Syntax::Glob),
            "csv" => Some(Syntax::Csv),
            _ => None,
        }
    }
}

impl fmt::Display for Syntax {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Syntax::Regex => write!(f, "regex"),
            Syntax::Glob => write!(f, "glob"),
            Syntax::Csv => write!(f, "csv"),
        }
    }
}

/// How a resolved variable is emitted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmissionMode {
    /// Flattened list of values for where-clauses
    List,
    /// Single string for raw query text
    Text(Syntax),
}

/// Result of resolving one variable
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved {
    /// List-mode values
    List(Vec<String>),
    /// Text-mode replacement
    Text(String),
}

/// Selection of one variable after "All" handling
#[derive(Debug, Clone, PartialEq, Eq)]
enum Selection {
    /// Concrete values
    Values(Vec<String>),
    /// Custom all-value, substituted verbatim
    Custom(String),
}

/// Characters with special meaning in regex syntax
const REGEX_RESERVED: &[char] = &[
    '\\', '^', '$', '*', '+', '?', '.', '(', ')', '|', '[', ']', '{', '}', '/',
];

/// Escape regex-reserved characters so the value matches literally
pub fn escape_regex(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 4);
    for c in value.chars() {
        if REGEX_RESERVED.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Escape for embedding inside a double-quoted query literal
fn escape_string_literal(value: &str) -> String {
    match serde_json::to_string(value) {
        Ok(quoted) => quoted[1..quoted.len() - 1].to_string(),
        Err(_) => value.to_string(),
    }
}

/// Join selected values into one replacement string
///
/// A single value substitutes directly. Regex syntax escapes each value and
/// wraps the alternation in a group.
pub fn format_values(values: &[String], syntax: Syntax) -> String {
    match values {
        [] => String::new(),
        [single] => single.clone(),
        _ => match syntax {
            Syntax::Regex => {
                let alternation = values
                    .iter()
                    .map(|v| escape_string_literal(&escape_regex(v)))
                    .collect::<Vec<_>>()
                    .join("|");
                format!("({})", alternation)
            }
            Syntax::Glob => values.join("|"),
            Syntax::Csv => values.join(","),
        },
    }
}

/// Regex formatting that escapes a single value as well
fn format_values_escaped(values: &[String]) -> String {
    match values {
        [single] => escape_string_literal(&escape_regex(single)),
        _ => format_values(values, Syntax::Regex),
    }
}

// ============================================================================
// Resolver
// ============================================================================

/// Resolves placeholders against declared variables and session selections
pub struct VariableResolver<'a> {
    source: &'a dyn VariableSource,
    states: Option<&'a VariableStateMap>,
}

impl<'a> VariableResolver<'a> {
    /// Resolver reading current values from `source`
    pub fn new(source: &'a dyn VariableSource) -> Self {
        Self {
            source,
            states: None,
        }
    }

    /// Prefer selections made in an editing session
    pub fn with_states(mut self, states: &'a VariableStateMap) -> Self {
        self.states = Some(states);
        self
    }

    /// Resolve `name` for the given emission mode
    pub fn resolve(&self, name: &str, mode: EmissionMode) -> Result<Resolved> {
        let selection = self.selection(name)?;
        Ok(match (selection, mode) {
            (Selection::Values(values), EmissionMode::List) => Resolved::List(values),
            (Selection::Custom(value), EmissionMode::List) => Resolved::List(vec![value]),
            (Selection::Values(values), EmissionMode::Text(syntax)) => {
                Resolved::Text(format_values(&values, syntax))
            }
            (Selection::Custom(value), EmissionMode::Text(_)) => Resolved::Text(value),
        })
    }

    /// Expand where-clause values
    ///
    /// Values not starting with `$` pass through. Variable-bearing values are
    /// replaced by every selected value of the variables they reference, or
    /// kept as written when nothing resolves.
    pub fn resolve_list(&self, values: &[String]) -> Vec<String> {
        let mut out = Vec::with_capacity(values.len());
        for value in values {
            if !value.starts_with('$') {
                out.push(value.clone());
                continue;
            }
            let mut expanded = Vec::new();
            for name in scan_variables(value) {
                if let Ok(Resolved::List(vs)) = self.resolve(&name, EmissionMode::List) {
                    expanded.extend(vs);
                }
            }
            if expanded.is_empty() {
                debug!(value = %value, "where value left unresolved");
                out.push(value.clone());
            } else {
                out.extend(expanded);
            }
        }
        out
    }

    /// Substitute every placeholder in `text`
    ///
    /// A format specifier on the placeholder (`${x:regex}`) overrides
    /// `syntax`. An explicit `regex` format escapes a lone value too.
    /// Unknown variables and empty selections keep their text.
    pub fn interpolate(&self, text: &str, syntax: Syntax) -> String {
        replace_placeholders(text, |placeholder| {
            let explicit = placeholder.format.and_then(Syntax::from_format);
            let resolved = match explicit {
                Some(Syntax::Regex) => self.selection(placeholder.name).map(|selection| match selection {
                    Selection::Values(values) => format_values_escaped(&values),
                    Selection::Custom(value) => value,
                }),
                _ => self
                    .resolve(placeholder.name, EmissionMode::Text(explicit.unwrap_or(syntax)))
                    .map(|resolved| match resolved {
                        Resolved::Text(value) => value,
                        Resolved::List(_) => String::new(),
                    }),
            };
            match resolved {
                Ok(value) if !value.is_empty() => Some(value),
                Ok(_) => None,
                Err(e) => {
                    debug!(error = %e, "placeholder left as written");
                    None
                }
            }
        })
    }

    fn selection(&self, name: &str) -> Result<Selection> {
        let variable = self.source.template_variable(name);
        let state = self.states.and_then(|m| m.get(name));

        if let Some(state) = state {
            if !state.selected_values.is_empty() {
                return Ok(expand_all(
                    state.selected_value_list(),
                    &state.options,
                    variable.as_ref(),
                ));
            }
            if variable.is_none() && !state.query_value.is_empty() {
                return Ok(Selection::Values(vec![state.query_value.clone()]));
            }
        }

        match variable {
            Some(variable) => {
                let values = variable.current_values();
                Ok(expand_all(values, &variable.options, Some(&variable)))
            }
            None => Err(Error::unknown_variable(name)),
        }
    }
}

/// Replace an "All" selection by the custom all-value or every concrete option
fn expand_all(
    values: Vec<String>,
    options: &[VariableOption],
    variable: Option<&TemplateVariable>,
) -> Selection {
    if !values.iter().any(|v| v == ALL_VARIABLE_VALUE) {
        return Selection::Values(values);
    }
    if let Some(custom) = variable.and_then(|v| v.all_value.clone()) {
        return Selection::Custom(custom);
    }
    let options = if options.is_empty() {
        variable.map(|v| v.options.as_slice()).unwrap_or_default()
    } else {
        options
    };
    Selection::Values(
        options
            .iter()
            .filter(|o| !o.is_all())
            .map(|o| o.value.clone())
            .collect(),
    )
}
