//! Query target normalization
//!
//! Turns the raw targets stored on a panel into canonical, fully resolved
//! `QueryTarget`s:
//!
//! - `legacy`: detection and migration of the composite `metric.id` shape
//! - `interval`: aggregation interval to seconds
//! - `metric_id`: metric identifier table used for alert correlation
//! - `pipeline`: per-target orchestration and the aggregated identifier query
//! - `destination`: retrieval and related-alert URLs for normalized targets

pub mod destination;
pub mod interval;
pub mod legacy;
pub mod metric_id;
pub mod pipeline;

pub use destination::{
    strategy_payload, DestinationLinks, RetrievalRoute, TimePoint, TimeRange, TimeRangeSource,
};
pub use interval::{default_interval, normalize_interval, parse_interval_text, CANONICAL_UNIT};
pub use legacy::{has_composite_metric_id, migrate_legacy, RawTarget};
pub use metric_id::{metric_identifier, MetricIdentifier};
pub use pipeline::{NormalizedTargets, TargetFailure, TargetNormalizationPipeline, SUPPORTED_DATASOURCE_TYPES};
