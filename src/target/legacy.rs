//! Legacy target migration
//!
//! Old panels stored one metric per target under a composite id:
//!
//! ```text
//! metric.id = [source_type_label, index_set_id, result_table_id, metric_field]
//!              "bk_monitor_time_series", "", "system.cpu_summary", "usage"
//! ```
//!
//! plus `period`, `method`, `dimensions`, grouped `conditions`, a rank
//! descriptor and an offset. Detection happens once at the boundary:
//! `RawTarget::classify` tags a raw JSON target as legacy or canonical and
//! `into_canonical` yields the single `QueryTarget` shape used downstream.
//! A migrated target no longer carries `metric.id`, so migrating it again is
//! a no-op.

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::types::{
    scalar_to_string, ConditionItem, FunctionItem, FunctionParam, IntervalSpec, ParamValue,
    QueryConfig, QueryMode, QueryTarget, TargetItem,
};

lazy_static! {
    static ref TYPE_SUFFIX: Regex =
        Regex::new(r"(_|\.)(log|event|time_series)$").expect("type suffix pattern is valid");
}

/// Minimum length of a composite legacy metric id
const LEGACY_ID_MIN_LEN: usize = 4;

/// Ref id given to migrated targets and their single query config
const LEGACY_REF_ID: &str = "a";

/// Raw panel target tagged by shape
#[derive(Debug, Clone, PartialEq)]
pub enum RawTarget {
    /// Pre-normalization shape with a composite `metric.id`
    Legacy {
        /// Outer target object, source of `mode` and `refId`
        envelope: Value,
        /// Object holding the legacy fields (`envelope.data` or the envelope itself)
        payload: Value,
    },
    /// Structured `query_configs` / `source` shape
    Canonical(Value),
}

impl RawTarget {
    /// Tag a raw target by its shape
    pub fn classify(value: Value) -> Self {
        if let Some(data) = value.get("data").filter(|d| has_composite_metric_id(d)) {
            let payload = data.clone();
            return RawTarget::Legacy {
                envelope: value,
                payload,
            };
        }
        if has_composite_metric_id(&value) {
            return RawTarget::Legacy {
                payload: value.clone(),
                envelope: value,
            };
        }
        RawTarget::Canonical(value)
    }

    /// True for the legacy shape
    pub fn is_legacy(&self) -> bool {
        matches!(self, RawTarget::Legacy { .. })
    }

    /// Convert into the canonical target
    pub fn into_canonical(self) -> Result<QueryTarget> {
        match self {
            RawTarget::Canonical(value) => {
                let only_promql = value.get("only_promql").and_then(Value::as_bool) == Some(true);
                let mut target: QueryTarget = serde_json::from_value(value)?;
                if only_promql {
                    target.mode = QueryMode::Code;
                }
                Ok(target)
            }
            RawTarget::Legacy { envelope, payload } => {
                let mut target = migrate_legacy(&payload)?;
                if envelope != payload {
                    target.mode = QueryMode::from_flags(
                        envelope.get("mode").and_then(Value::as_str),
                        truthy(envelope.get("only_promql")),
                    );
                }
                if let Some(ref_id) = envelope
                    .get("refId")
                    .and_then(Value::as_str)
                    .filter(|r| !r.is_empty())
                {
                    target.ref_id = ref_id.to_string();
                }
                debug!(ref_id = %target.ref_id, "migrated legacy target");
                Ok(target)
            }
        }
    }
}

/// True if `value` carries a composite legacy metric id
pub fn has_composite_metric_id(value: &Value) -> bool {
    value
        .pointer("/metric/id")
        .and_then(Value::as_array)
        .map_or(false, |id| id.len() >= LEGACY_ID_MIN_LEN)
}

/// Rewrite a legacy payload into a canonical target with one query config
pub fn migrate_legacy(payload: &Value) -> Result<QueryTarget> {
    let id = payload
        .pointer("/metric/id")
        .and_then(Value::as_array)
        .filter(|id| id.len() >= LEGACY_ID_MIN_LEN)
        .ok_or_else(|| Error::malformed("metric.id must hold at least four entries"))?;

    let source_type_label = id_part(id, 0, "source type label")?;
    let index_set_id = scalar_to_string(&id[1]).filter(|s| !s.is_empty());
    let result_table_id = id_part(id, 2, "result table id")?;
    let metric_field = id_part(id, 3, "metric field")?;
    if source_type_label.is_empty() {
        return Err(Error::malformed("metric.id[0] is empty"));
    }

    let data_source_label = TYPE_SUFFIX.replace(&source_type_label, "").into_owned();
    let data_type_label = strip_source_prefix(&source_type_label, &data_source_label);

    let config = QueryConfig {
        index_set_id: (data_source_label == "bk_log_search")
            .then_some(index_set_id)
            .flatten(),
        data_source_label,
        data_type_label,
        result_table_label: payload
            .pointer("/monitorObject/id")
            .and_then(scalar_to_string)
            .unwrap_or_default(),
        result_table_id,
        metric_field,
        filter_dict: Some(Value::Object(Map::new())),
        functions: migrate_functions(payload),
        group_by: string_list(payload.get("dimensions")),
        interval: payload.get("period").and_then(interval_spec),
        interval_unit: "s".to_string(),
        method: payload
            .get("method")
            .and_then(scalar_to_string)
            .unwrap_or_default(),
        ref_id: Some(LEGACY_REF_ID.to_string()),
        alias: payload.get("alias").and_then(scalar_to_string),
        display: Some(true),
        time_field: Some(String::new()),
        r#where: migrate_conditions(payload.get("conditions")),
        ..QueryConfig::default()
    };

    let (host, module, cluster) = migrate_target_selectors(payload);

    Ok(QueryTarget {
        ref_id: LEGACY_REF_ID.to_string(),
        mode: QueryMode::from_flags(
            payload.get("mode").and_then(Value::as_str),
            truthy(payload.get("only_promql")),
        ),
        expression: Some(String::new()),
        alias: Some(String::new()),
        display: Some(false),
        query_configs: vec![config],
        host,
        module,
        cluster,
        ..QueryTarget::default()
    })
}

fn id_part(id: &[Value], index: usize, what: &str) -> Result<String> {
    scalar_to_string(&id[index])
        .filter(|_| !id[index].is_object() && !id[index].is_array())
        .ok_or_else(|| Error::malformed(format!("metric.id[{}] ({}) is missing", index, what)))
}

/// `bk_monitor_time_series` with source `bk_monitor` gives `time_series`
fn strip_source_prefix(source_type_label: &str, data_source_label: &str) -> String {
    match source_type_label.strip_prefix(data_source_label) {
        Some(rest) if !rest.is_empty() => {
            let mut chars = rest.chars();
            chars.next();
            chars.as_str().to_string()
        }
        _ => source_type_label.to_string(),
    }
}

/// Grouped `[{type, value}, ...]` conditions into where items
fn migrate_conditions(conditions: Option<&Value>) -> Vec<ConditionItem> {
    let Some(groups) = conditions.and_then(Value::as_array) else {
        return Vec::new();
    };
    let mut items = Vec::with_capacity(groups.len());
    for group in groups {
        let Some(entries) = group.as_array() else {
            warn!(?group, "skipping legacy condition that is not a list");
            continue;
        };
        let mut item = ConditionItem::default();
        for entry in entries {
            let value = entry.get("value").filter(|v| truthy(Some(v)));
            match entry.get("type").and_then(Value::as_str) {
                Some("key") => item.key = value.and_then(scalar_to_string).unwrap_or_default(),
                Some("method") => {
                    item.method = value.and_then(scalar_to_string).unwrap_or_default()
                }
                Some("value") => item.value = string_list(value),
                Some("condition") => item.condition = value.and_then(scalar_to_string),
                _ => {}
            }
        }
        items.push(item);
    }
    items
}

/// Rank descriptor becomes `top`/`bottom`, offset becomes `time_shift`
fn migrate_functions(payload: &Value) -> Vec<FunctionItem> {
    let mut functions = Vec::new();
    if let Some(sort) = payload
        .pointer("/func/rank/sort")
        .filter(|s| truthy(Some(s)))
    {
        let id = if sort.as_str() == Some("desc") { "top" } else { "bottom" };
        functions.push(FunctionItem {
            id: id.to_string(),
            name: None,
            params: vec![FunctionParam {
                id: "n".to_string(),
                value: ParamValue::from_json(
                    payload.pointer("/func/rank/limit").unwrap_or(&Value::Null),
                ),
            }],
        });
    }
    if let Some(offset) = payload.get("offset").filter(|o| truthy(Some(o))) {
        functions.push(FunctionItem {
            id: "time_shift".to_string(),
            name: None,
            params: vec![FunctionParam {
                id: "n".to_string(),
                value: ParamValue::from_json(offset),
            }],
        });
    }
    functions
}

/// Oldest shape first: `target.realValues`, then `host`/`module`/`cluster` lists
fn migrate_target_selectors(payload: &Value) -> (Vec<TargetItem>, Vec<TargetItem>, Vec<TargetItem>) {
    if let Some(target) = payload.get("target").filter(|t| truthy(Some(t))) {
        let by_host = payload.pointer("/monitorObject/groupId").and_then(Value::as_str) == Some("hosts");
        let host = target
            .get("realValues")
            .and_then(Value::as_array)
            .map(|values| {
                values
                    .iter()
                    .filter_map(scalar_to_string)
                    .map(|set| {
                        if by_host {
                            TargetItem::Labeled {
                                label: set.split('-').nth(1).unwrap_or_default().to_string(),
                                value: set,
                            }
                        } else {
                            TargetItem::ServiceInstance {
                                bk_target_service_instance_id: set,
                            }
                        }
                    })
                    .collect()
            })
            .unwrap_or_default();
        return (host, Vec::new(), Vec::new());
    }

    let selector_list = |field: &str| -> Vec<TargetItem> {
        payload
            .get(field)
            .and_then(|f| f.get("list"))
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .map(|item| {
                        serde_json::from_value(item.clone())
                            .unwrap_or_else(|_| TargetItem::Other(item.clone()))
                    })
                    .collect()
            })
            .unwrap_or_default()
    };
    (selector_list("host"), selector_list("module"), selector_list("cluster"))
}

fn interval_spec(period: &Value) -> Option<IntervalSpec> {
    match period {
        Value::Number(n) => Some(IntervalSpec::Number(n.clone())),
        Value::String(s) => Some(IntervalSpec::Text(s.clone())),
        _ => None,
    }
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items.iter().filter_map(scalar_to_string).collect(),
        Some(Value::Null) | None => Vec::new(),
        Some(other) => scalar_to_string(other).into_iter().collect(),
    }
}

/// Loose truthiness of optional JSON: null, false, 0 and "" are false
fn truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().map_or(false, |f| f != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
    }
}
