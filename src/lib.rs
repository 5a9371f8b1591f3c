//! Target Templating - template-variable resolution and query-target normalization
//!
//! This library turns the raw query targets stored on a dashboard panel into
//! canonical, fully substituted targets:
//! - `$name`, `[[name]]` and `${name}` placeholder scanning
//! - Selection-aware value emission for where-clauses and raw query text
//! - Migration of the legacy composite `metric.id` target shape
//! - Interval normalization to seconds
//! - Metric identifier derivation for alert correlation
//! - Option picker state machine for template variables
//!
//! # Example
//!
//! ```rust
//! use serde_json::json;
//! use target_templating::{EngineConfig, TargetNormalizationPipeline, TemplateVariable};
//! use target_templating::types::CurrentValue;
//!
//! let vars = vec![TemplateVariable {
//!     id: "host".to_string(),
//!     current: CurrentValue::Single("web-01".to_string()),
//!     ..Default::default()
//! }];
//! let pipeline = TargetNormalizationPipeline::new(&EngineConfig::default(), &vars);
//!
//! let raw = json!({
//!     "refId": "A",
//!     "query_configs": [{
//!         "data_source_label": "bk_monitor",
//!         "data_type_label": "time_series",
//!         "result_table_id": "system.cpu_summary",
//!         "metric_field": "usage",
//!         "interval": "5m",
//!         "where": [{"key": "ip", "method": "eq", "value": ["$host"]}]
//!     }]
//! });
//! let out = pipeline.normalize(&[raw], true);
//! assert_eq!(out.targets[0].query_configs[0].r#where[0].value, vec!["web-01"]);
//! assert_eq!(out.metric_id_query, "指标ID : bk_monitor.system.cpu_summary.usage");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod types;

/// Configuration management with TOML support
pub mod config;

/// Tracing subscriber setup for hosts without one
pub mod logging;

/// Placeholder scanning, value resolution and option selection state
pub mod templating;

/// Legacy migration, interval and metric identifier normalization, links
pub mod target;

// Re-export main types
pub use config::{EngineConfig, Language, LinkConfig, LoggingConfig};
pub use error::{Error, Result};
pub use target::{
    DestinationLinks, NormalizedTargets, RetrievalRoute, TargetFailure, TargetNormalizationPipeline,
};
pub use templating::{Syntax, VariableOptionState, VariableResolver, VariableSource, VariableStateMap};
pub use types::{QueryConfig, QueryMode, QueryTarget, TemplateVariable};
