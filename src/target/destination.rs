//! Destination links for normalized targets
//!
//! Builds the monitoring-side URLs a panel menu opens:
//!
//! ```text
//! {base}/?bizId={biz}#/{route}?targets=[{"data": target}, ...]
//! {base}/?bizId={biz}#/event-center?queryString=..&promql=..&from=..&to=..
//! ```
//!
//! Every query component is URL-encoded. Targets are expected to be
//! normalized already; nothing here resolves variables.

use std::fmt;

use chrono::NaiveDateTime;
use serde_json::{json, Value};
use url::form_urlencoded::byte_serialize;

use crate::config::LinkConfig;
use crate::error::Result;
use crate::types::{QueryMode, QueryTarget};

/// Format of absolute times in alert links
pub const LINK_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// ============================================================================
// Routing
// ============================================================================

/// Retrieval page a target opens in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetrievalRoute {
    /// Metric retrieval
    Data,
    /// Event retrieval
    Event,
    /// Log retrieval
    Log,
}

impl RetrievalRoute {
    /// Route chosen from the target's mode and its first query config
    pub fn for_target(target: &QueryTarget) -> Self {
        let Some(config) = target.query_configs.first() else {
            return RetrievalRoute::Data;
        };
        let kind = config.data_type_label.as_str();
        if target.mode == QueryMode::Code || kind == "time_series" {
            RetrievalRoute::Data
        } else if kind == "event" || (kind == "log" && config.data_source_label == "bk_monitor") {
            RetrievalRoute::Event
        } else if kind == "log" {
            RetrievalRoute::Log
        } else {
            RetrievalRoute::Data
        }
    }

    /// Path segment of the route
    pub fn path(&self) -> &'static str {
        match self {
            RetrievalRoute::Data => "data-retrieval",
            RetrievalRoute::Event => "event-retrieval",
            RetrievalRoute::Log => "log-retrieval",
        }
    }
}

impl fmt::Display for RetrievalRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

// ============================================================================
// Time range
// ============================================================================

/// One end of a dashboard time range
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimePoint {
    /// Fixed instant
    Absolute(NaiveDateTime),
    /// Relative expression such as `now-1h`, passed through as written
    Relative(String),
}

impl fmt::Display for TimePoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimePoint::Absolute(at) => write!(f, "{}", at.format(LINK_TIME_FORMAT)),
            TimePoint::Relative(expr) => f.write_str(expr),
        }
    }
}

/// Dashboard time range
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeRange {
    /// Start
    pub from: TimePoint,
    /// End
    pub to: TimePoint,
}

impl TimeRange {
    /// Relative range, e.g. `("now-1h", "now")`
    pub fn relative(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: TimePoint::Relative(from.into()),
            to: TimePoint::Relative(to.into()),
        }
    }
}

/// Provider of the dashboard's current time range
pub trait TimeRangeSource {
    /// Current range
    fn current_time_range(&self) -> TimeRange;
}

impl TimeRangeSource for TimeRange {
    fn current_time_range(&self) -> TimeRange {
        self.clone()
    }
}

// ============================================================================
// Links
// ============================================================================

/// Builds destination URLs under one monitoring base URL and business id
#[derive(Debug, Clone)]
pub struct DestinationLinks {
    base_url: String,
    biz_id: String,
}

impl DestinationLinks {
    /// Links rooted at `base_url` for business `biz_id`
    pub fn new(base_url: impl Into<String>, biz_id: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            biz_id: biz_id.into(),
        }
    }

    /// Links from configuration
    pub fn from_config(config: &LinkConfig) -> Self {
        Self::new(config.base_url.as_str(), config.biz_id.as_str())
    }

    fn root(&self) -> String {
        format!("{}/?bizId={}", self.base_url, encode(&self.biz_id))
    }

    /// Retrieval URL for `targets`, routed by the first target
    ///
    /// Returns `None` for an empty list.
    pub fn data_retrieval_url(&self, targets: &[QueryTarget]) -> Result<Option<String>> {
        let Some(first) = targets.first() else {
            return Ok(None);
        };
        let wrapped: Vec<Value> = targets
            .iter()
            .map(|t| Ok(json!({ "data": serde_json::to_value(t)? })))
            .collect::<Result<_>>()?;
        let payload = serde_json::to_string(&wrapped)?;
        Ok(Some(format!(
            "{}#/{}?targets={}",
            self.root(),
            RetrievalRoute::for_target(first),
            encode(&payload)
        )))
    }

    /// Related-alert URL for one target
    ///
    /// `promql` carries the target's source text only in code mode.
    pub fn related_alert_url(
        &self,
        target: &QueryTarget,
        metric_id_query: &str,
        time: &dyn TimeRangeSource,
    ) -> String {
        let promql = match (target.mode, target.source_text()) {
            (QueryMode::Code, Some(source)) => encode(source),
            _ => String::new(),
        };
        let range = time.current_time_range();
        format!(
            "{}#/event-center?queryString={}&promql={}&from={}&to={}",
            self.root(),
            encode(metric_id_query),
            promql,
            encode(&range.from.to_string()),
            encode(&range.to.to_string()),
        )
    }
}

/// JSON payload handed to the strategy editor for one target
pub fn strategy_payload(target: &QueryTarget) -> Result<Value> {
    Ok(serde_json::to_value(target)?)
}

fn encode(component: &str) -> String {
    byte_serialize(component.as_bytes()).collect()
}
