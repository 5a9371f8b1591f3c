//! Core data types shared by the templating and target modules
//!
//! # Key Types
//!
//! - **`QueryTarget`**: canonical query target attached to a panel
//! - **`QueryConfig`**: one concrete metric query inside a target
//! - **`ConditionItem`** / **`FunctionItem`**: where-clause entries and functions
//! - **`TemplateVariable`** / **`VariableOption`**: dashboard variables and their candidates
//! - **`IntervalSpec`** / **`Interval`**: raw and normalized aggregation intervals
//!
//! All types deserialize leniently: missing or `null` lists are read as empty,
//! since hand-authored panel JSON frequently omits optional fields.
//!
//! # Example
//!
//! ```rust
//! use target_templating::types::{QueryTarget, QueryMode};
//!
//! let target: QueryTarget = serde_json::from_value(serde_json::json!({
//!     "refId": "A",
//!     "mode": "code",
//!     "source": "sum(rate(requests_total{host=\"$host\"}[1m]))"
//! }))
//! .unwrap();
//! assert_eq!(target.mode, QueryMode::Code);
//! assert!(target.query_configs.is_empty());
//! ```

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

/// Reserved option value standing for "every option"
pub const ALL_VARIABLE_VALUE: &str = "$__all";

/// Function ids that only exist as UI post-processing
pub const RANKING_FUNCTIONS: [&str; 2] = ["top", "bottom"];

// ============================================================================
// Query Target
// ============================================================================

/// Editing mode of a query target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryMode {
    /// Raw query-language text in `source` is authoritative
    Code,
    /// Structured `query_configs` are authoritative
    #[default]
    Ui,
}

impl QueryMode {
    /// Derive the mode from the raw `mode` string and the `only_promql` flag
    pub fn from_flags(mode: Option<&str>, only_promql: bool) -> Self {
        if mode == Some("code") || only_promql {
            QueryMode::Code
        } else {
            QueryMode::Ui
        }
    }
}

impl<'de> Deserialize<'de> for QueryMode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(QueryMode::from_flags(raw.as_deref(), false))
    }
}

impl fmt::Display for QueryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryMode::Code => write!(f, "code"),
            QueryMode::Ui => write!(f, "ui"),
        }
    }
}

/// Canonical query target
///
/// `alias`, `display` and `expression` are optional because normalization
/// folds them into `expression_list` and drops the scalar form.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct QueryTarget {
    /// Stable reference id of the sub-query
    #[serde(rename = "refId", default, deserialize_with = "null_default")]
    pub ref_id: String,

    /// Editing mode
    #[serde(default)]
    pub mode: QueryMode,

    /// Expression combining sub-queries
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expression: Option<String>,

    /// Alias of the expression result
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,

    /// Whether the expression result is shown
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display: Option<bool>,

    /// Structured metric queries, used in ui mode
    #[serde(default, deserialize_with = "null_default")]
    pub query_configs: Vec<QueryConfig>,

    /// Raw query-language text, used in code mode
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    /// Derived expressions
    #[serde(
        rename = "expressionList",
        default,
        deserialize_with = "null_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub expression_list: Vec<ExpressionItem>,

    /// Host target selectors
    #[serde(default, deserialize_with = "null_default")]
    pub host: Vec<TargetItem>,

    /// Module target selectors
    #[serde(default, deserialize_with = "null_default")]
    pub module: Vec<TargetItem>,

    /// Cluster target selectors
    #[serde(default, deserialize_with = "null_default")]
    pub cluster: Vec<TargetItem>,

    /// Legacy flag forcing code mode
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub only_promql: Option<bool>,
}

impl QueryTarget {
    /// Raw source text, if any was written
    pub fn source_text(&self) -> Option<&str> {
        self.source.as_deref().filter(|s| !s.is_empty())
    }

    /// True when the target has something to query
    ///
    /// Code-mode source text or any query config counts.
    pub fn has_query(&self) -> bool {
        (self.mode == QueryMode::Code && self.source_text().is_some())
            || !self.query_configs.is_empty()
    }

    /// Projection handed to strategy creation
    ///
    /// Code mode keeps only `source`. Ui mode keeps displayed query configs
    /// and active expressions, with their aliases cleared.
    pub fn strategy_view(&self) -> Value {
        match self.mode {
            QueryMode::Code => serde_json::json!({ "source": self.source }),
            QueryMode::Ui => {
                let configs: Vec<QueryConfig> = self
                    .query_configs
                    .iter()
                    .filter(|c| c.display != Some(false))
                    .map(|c| QueryConfig {
                        alias: Some(String::new()),
                        ..c.clone()
                    })
                    .collect();
                let expressions: Vec<ExpressionItem> = self
                    .expression_list
                    .iter()
                    .filter(|e| e.active)
                    .map(|e| ExpressionItem {
                        alias: String::new(),
                        ..e.clone()
                    })
                    .collect();
                serde_json::json!({
                    "query_configs": configs,
                    "expressionList": expressions,
                })
            }
        }
    }
}

/// Target selector entry (legacy-compatibility field)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TargetItem {
    /// Host selector with display label
    Labeled {
        /// Display label
        label: String,
        /// Selector value
        value: String,
    },
    /// Service instance selector
    ServiceInstance {
        /// Service instance id
        bk_target_service_instance_id: String,
    },
    /// Any other selector shape, carried through untouched
    Other(Value),
}

/// Expression combining sub-query results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpressionItem {
    /// Expression text, e.g. `a + b`
    #[serde(default, deserialize_with = "null_default")]
    pub expression: String,
    /// Functions applied to the expression result
    #[serde(default, deserialize_with = "null_default")]
    pub functions: Vec<FunctionItem>,
    /// Result alias
    #[serde(default, deserialize_with = "null_default")]
    pub alias: String,
    /// Whether the expression is active
    #[serde(default = "default_true")]
    pub active: bool,
}

// ============================================================================
// Query Config
// ============================================================================

/// One concrete metric query
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct QueryConfig {
    /// Data source label, e.g. `bk_monitor`
    #[serde(default, deserialize_with = "null_default")]
    pub data_source_label: String,

    /// Data type label, e.g. `time_series`
    #[serde(default, deserialize_with = "null_default")]
    pub data_type_label: String,

    /// Data label
    #[serde(default, deserialize_with = "null_default")]
    pub data_label: String,

    /// Result table id
    #[serde(default, deserialize_with = "null_default")]
    pub result_table_id: String,

    /// Monitor object of the result table
    #[serde(default, deserialize_with = "null_default")]
    pub result_table_label: String,

    /// Metric field name
    #[serde(default, deserialize_with = "null_default")]
    pub metric_field: String,

    /// Aggregation method
    #[serde(default, deserialize_with = "null_default")]
    pub method: String,

    /// Aggregation interval, `None` when never set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval: Option<IntervalSpec>,

    /// Unit of `interval`; always `s` after normalization
    #[serde(default = "default_interval_unit", deserialize_with = "unit_or_seconds")]
    pub interval_unit: String,

    /// Dimensions to group by
    #[serde(default, deserialize_with = "null_default")]
    pub group_by: Vec<String>,

    /// Filter conditions; each joins the previous with its own `condition`
    #[serde(rename = "where", default, deserialize_with = "null_default")]
    pub r#where: Vec<ConditionItem>,

    /// Functions applied left to right
    #[serde(default, deserialize_with = "null_default")]
    pub functions: Vec<FunctionItem>,

    /// Log index set, only for `bk_log_search`
    #[serde(
        default,
        deserialize_with = "optional_scalar_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub index_set_id: Option<String>,

    /// Result alias
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,

    /// Reference id of this config inside the target
    #[serde(rename = "refId", default, skip_serializing_if = "Option::is_none")]
    pub ref_id: Option<String>,

    /// Whether the config result is shown
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display: Option<bool>,

    /// Time field of the result table
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_field: Option<String>,

    /// Raw query string for log sources
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_string: Option<String>,

    /// Legacy filter dictionary
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter_dict: Option<Value>,
}

/// Raw aggregation interval as stored on a panel
///
/// Numbers are counts in `interval_unit`; text may be `auto`, a duration
/// such as `5m`, or a variable placeholder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IntervalSpec {
    /// Numeric count
    Number(serde_json::Number),
    /// Textual expression
    Text(String),
}

/// Normalized aggregation interval
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interval {
    /// Let the destination pick the interval
    Auto,
    /// Positive count of seconds
    Seconds(u64),
}

impl From<Interval> for IntervalSpec {
    fn from(interval: Interval) -> Self {
        match interval {
            Interval::Auto => IntervalSpec::Text("auto".to_string()),
            Interval::Seconds(secs) => IntervalSpec::Number(secs.into()),
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Interval::Auto => write!(f, "auto"),
            Interval::Seconds(secs) => write!(f, "{} s", secs),
        }
    }
}

/// Where-clause entry
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ConditionItem {
    /// Dimension key
    #[serde(default, deserialize_with = "null_default")]
    pub key: String,

    /// Comparison operator code
    #[serde(default, deserialize_with = "null_default")]
    pub method: String,

    /// Values; may hold variable placeholders before resolution
    #[serde(default, deserialize_with = "string_list")]
    pub value: Vec<String>,

    /// Logical joiner applied before this item when it is not the first
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
}

impl ConditionItem {
    /// Display symbol of the comparison operator
    pub fn method_symbol(&self) -> &str {
        match self.method.as_str() {
            "eq" => "=",
            "gt" => ">",
            "gte" => ">=",
            "lt" => "<",
            "lte" => "<=",
            "neq" => "!=",
            "include" => "include",
            "exclude" => "exclude",
            "reg" => "regex",
            "nreg" => "nregex",
            other => other,
        }
    }
}

/// Function applied to a query
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FunctionItem {
    /// Function id, e.g. `rate` or `time_shift`
    #[serde(default, deserialize_with = "null_default")]
    pub id: String,

    /// Display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Ordered parameters
    #[serde(default, deserialize_with = "null_default")]
    pub params: Vec<FunctionParam>,
}

impl FunctionItem {
    /// Ranking functions are UI post-processing and never reach a destination
    pub fn is_ranking(&self) -> bool {
        RANKING_FUNCTIONS.contains(&self.id.as_str())
    }
}

/// Function parameter
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FunctionParam {
    /// Parameter id
    #[serde(default, deserialize_with = "null_default")]
    pub id: String,

    /// Parameter value
    #[serde(default)]
    pub value: ParamValue,
}

/// Function parameter value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    /// Numeric value
    Number(serde_json::Number),
    /// Text value, possibly holding a variable placeholder
    Text(String),
    /// Any other JSON value, carried through untouched
    Other(Value),
}

impl Default for ParamValue {
    fn default() -> Self {
        ParamValue::Text(String::new())
    }
}

impl ParamValue {
    /// Build from a loose JSON scalar; `null` becomes empty text
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Number(n) => ParamValue::Number(n.clone()),
            Value::String(s) => ParamValue::Text(s.clone()),
            Value::Null => ParamValue::default(),
            other => ParamValue::Other(other.clone()),
        }
    }
}

// ============================================================================
// Template Variables
// ============================================================================

/// Dashboard template variable
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TemplateVariable {
    /// Variable id, also its name in placeholders
    pub id: String,

    /// Current value
    #[serde(default)]
    pub current: CurrentValue,

    /// Candidate options in display order
    #[serde(default, deserialize_with = "null_default")]
    pub options: Vec<VariableOption>,

    /// Whether multiple selections are permitted
    #[serde(default)]
    pub multi: bool,

    /// Custom value substituted for the "All" option
    #[serde(rename = "allValue", default, skip_serializing_if = "Option::is_none")]
    pub all_value: Option<String>,
}

impl TemplateVariable {
    /// Every option except the "All" sentinel
    pub fn concrete_options(&self) -> impl Iterator<Item = &VariableOption> {
        self.options.iter().filter(|o| !o.is_all())
    }

    /// Current value as an ordered list
    pub fn current_values(&self) -> Vec<String> {
        self.current.values()
    }

    /// Text shown for a value, falling back to the value itself
    pub fn text_for(&self, value: &str) -> String {
        self.options
            .iter()
            .find(|o| o.value == value)
            .map(|o| o.text.clone())
            .unwrap_or_else(|| value.to_string())
    }
}

/// Current value of a template variable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CurrentValue {
    /// Single value
    Single(String),
    /// Ordered list of values
    Multi(Vec<String>),
}

impl Default for CurrentValue {
    fn default() -> Self {
        CurrentValue::Multi(Vec::new())
    }
}

impl CurrentValue {
    /// Values as an ordered list
    pub fn values(&self) -> Vec<String> {
        match self {
            CurrentValue::Single(v) => vec![v.clone()],
            CurrentValue::Multi(vs) => vs.clone(),
        }
    }
}

/// Candidate option of a template variable
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VariableOption {
    /// Display text
    #[serde(default, deserialize_with = "null_default")]
    pub text: String,
    /// Substituted value
    #[serde(default, deserialize_with = "null_default")]
    pub value: String,
    /// Selection flag as rendered
    #[serde(default)]
    pub selected: bool,
}

impl VariableOption {
    /// Create an unselected option
    pub fn new(text: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            value: value.into(),
            selected: false,
        }
    }

    /// The "All" pseudo-option
    pub fn all() -> Self {
        Self::new("All", ALL_VARIABLE_VALUE)
    }

    /// True for the "All" sentinel
    pub fn is_all(&self) -> bool {
        self.value == ALL_VARIABLE_VALUE
    }

    /// Same option identity, ignoring the selection flag
    pub fn same_as(&self, other: &VariableOption) -> bool {
        self.value == other.value && self.text == other.text
    }

    /// Copy with the selection flag set
    pub fn as_selected(&self) -> Self {
        Self {
            selected: true,
            ..self.clone()
        }
    }
}

// ============================================================================
// Lenient deserializers
// ============================================================================

fn default_true() -> bool {
    true
}

fn default_interval_unit() -> String {
    "s".to_string()
}

/// Treat explicit `null` like a missing field
pub(crate) fn null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn unit_or_seconds<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?
        .filter(|u| !u.is_empty())
        .unwrap_or_else(default_interval_unit))
}

/// Render a JSON scalar as plain text (strings without quotes)
pub(crate) fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn optional_scalar_string<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(raw.as_ref().and_then(scalar_to_string))
}

/// Accept a single scalar or a list of scalars
pub(crate) fn string_list<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Vec<String>, D::Error> {
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(match raw {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items.iter().filter_map(scalar_to_string).collect(),
        Some(other) => scalar_to_string(&other).into_iter().collect(),
    })
}
