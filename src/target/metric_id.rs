//! Metric identifier derivation
//!
//! Maps a query config to the dotted identifier the alerting side uses to
//! correlate events with metrics. The table is keyed on
//! `data_source_label|data_type_label` and matched first-entry-wins:
//!
//! | key                                                        | identifier                          |
//! |------------------------------------------------------------|-------------------------------------|
//! | `bk_monitor\|time_series` `custom\|time_series` `bk_data\|time_series` | `source.table.field`    |
//! | `bk_monitor\|event`                                        | `source.field`                      |
//! | `bk_monitor\|log`                                          | `source.type.table`                 |
//! | `bk_monitor\|alert`                                        | `source.type.(strategy_id\|field)`  |
//! | `custom\|event`                                            | `source.type.table.*`               |
//! | `bk_log_search\|log`                                       | `source.index_set.{id}`             |
//! | `bk_fta\|alert` `bk_fta\|event`                            | `source.type.(alert_name\|field)`   |
//!
//! Any other key yields an empty identifier.

use crate::types::QueryConfig;

/// Second format historically declared for `bk_log_search|log`
///
/// Shadowed by the first entry and never produced. Kept for reference until
/// the intended shape of log-search identifiers is settled.
pub const SHADOWED_LOG_SEARCH_FORMAT: &str = "{source}.index_set.{id}.{field}";

/// Inputs of the metric identifier table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricIdentifier<'a> {
    /// Data source label
    pub data_source_label: &'a str,
    /// Data type label
    pub data_type_label: &'a str,
    /// Metric field
    pub metric_field: &'a str,
    /// Result table id
    pub result_table_id: &'a str,
    /// Log index set id
    pub index_set_id: Option<&'a str>,
    /// Monitoring strategy id, for alert sources
    pub strategy_id: Option<&'a str>,
    /// Custom event name
    pub custom_event_name: Option<&'a str>,
    /// Alert name, for fault-tolerance sources
    pub alert_name: Option<&'a str>,
}

impl<'a> MetricIdentifier<'a> {
    /// Identifier inputs for the four always-present fields
    pub fn new(
        data_source_label: &'a str,
        data_type_label: &'a str,
        metric_field: &'a str,
        result_table_id: &'a str,
    ) -> Self {
        Self {
            data_source_label,
            data_type_label,
            metric_field,
            result_table_id,
            ..Self::default()
        }
    }

    /// Identifier inputs taken from a query config
    pub fn from_config(config: &'a QueryConfig) -> Self {
        Self {
            index_set_id: config.index_set_id.as_deref(),
            ..Self::new(
                &config.data_source_label,
                &config.data_type_label,
                &config.metric_field,
                &config.result_table_id,
            )
        }
    }

    /// Table key, `data_source_label|data_type_label`
    pub fn key(&self) -> String {
        format!("{}|{}", self.data_source_label, self.data_type_label)
    }

    /// Dotted identifier, or an empty string for unmapped keys
    pub fn build(&self) -> String {
        let source = self.data_source_label;
        let kind = self.data_type_label;
        match (source, kind) {
            ("bk_monitor", "time_series") | ("custom", "time_series") | ("bk_data", "time_series") => {
                [source, self.result_table_id, self.metric_field].join(".")
            }
            ("bk_monitor", "event") => [source, self.metric_field].join("."),
            ("bk_monitor", "log") => [source, kind, self.result_table_id].join("."),
            ("bk_monitor", "alert") => {
                [source, kind, self.strategy_id.unwrap_or(self.metric_field)].join(".")
            }
            ("custom", "event") => [source, kind, self.result_table_id, "*"].join("."),
            ("bk_log_search", "log") => {
                format!("{}.index_set.{}", source, self.index_set_id.unwrap_or_default())
            }
            ("bk_fta", "alert") | ("bk_fta", "event") => {
                [source, kind, self.alert_name.unwrap_or(self.metric_field)].join(".")
            }
            _ => String::new(),
        }
    }
}

/// Shorthand for [`MetricIdentifier::build`] on the four core fields
pub fn metric_identifier(
    data_source_label: &str,
    data_type_label: &str,
    metric_field: &str,
    result_table_id: &str,
) -> String {
    MetricIdentifier::new(data_source_label, data_type_label, metric_field, result_table_id).build()
}
