//! Template-variable handling
//!
//! - `scanner`: finds `$name`, `[[name]]` and `${name}` placeholders
//! - `resolver`: formats selected values for where-clauses or raw query text
//! - `options`: selection state machine of the variable pickers
//!
//! # Example
//!
//! ```rust
//! use target_templating::templating::{scan_variables, Syntax, VariableResolver};
//! use target_templating::types::{CurrentValue, TemplateVariable};
//!
//! let vars = vec![TemplateVariable {
//!     id: "host".to_string(),
//!     current: CurrentValue::Multi(vec!["a".to_string(), "b".to_string()]),
//!     multi: true,
//!     ..Default::default()
//! }];
//! assert_eq!(scan_variables("up{host=~\"$host\"}"), vec!["host"]);
//!
//! let resolver = VariableResolver::new(&vars);
//! assert_eq!(resolver.interpolate("up{host=~\"$host\"}", Syntax::Regex), "up{host=~\"(a|b)\"}");
//! ```

pub mod options;
pub mod resolver;
pub mod scanner;

pub use options::{VariableOptionState, VariableStateMap};
pub use resolver::{
    escape_regex, format_values, EmissionMode, Resolved, Syntax, VariableResolver, VariableSource,
};
pub use scanner::{
    contains_placeholder, placeholders, replace_placeholders, scan_variables, Placeholder,
    PlaceholderSyntax,
};
