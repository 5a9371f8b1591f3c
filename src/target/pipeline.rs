//! Target normalization pipeline
//!
//! ```text
//! raw panel targets (JSON)
//!      │
//!      ▼
//! ┌──────────────┐
//! │  Classify    │  legacy (composite metric.id) vs canonical
//! └──────────────┘
//!      │
//!      ▼
//! ┌──────────────┐
//! │  Migrate     │  legacy → one QueryConfig
//! └──────────────┘
//!      │
//!      ▼
//! ┌──────────────┐
//! │  Resolve     │  where values (list mode), function params and
//! └──────────────┘  source (text mode), interval → seconds
//!      │
//!      ▼
//! ┌──────────────┐
//! │  Identify    │  deduplicated metric identifiers → query string
//! └──────────────┘
//! ```
//!
//! Inputs are borrowed and never modified. A target that fails to migrate is
//! reported in `failures`; the rest of the batch still normalizes.

use serde_json::Value;
use tracing::{debug, warn};

use crate::config::EngineConfig;
use crate::error::Error;
use crate::target::interval::{normalize_interval, CANONICAL_UNIT};
use crate::target::legacy::RawTarget;
use crate::target::metric_id::MetricIdentifier;
use crate::templating::{Syntax, VariableResolver, VariableSource, VariableStateMap};
use crate::types::{ExpressionItem, ParamValue, QueryConfig, QueryMode, QueryTarget};

/// Datasource types whose targets a panel hands to this engine
pub const SUPPORTED_DATASOURCE_TYPES: &[&str] =
    &["bkmonitor-timeseries-datasource", "bkmonitor-event-datasource"];

/// True unless the target names a datasource type outside [`SUPPORTED_DATASOURCE_TYPES`]
fn is_supported_datasource(raw: &Value) -> bool {
    match raw.pointer("/datasource/type").and_then(Value::as_str) {
        Some(kind) if !kind.is_empty() => SUPPORTED_DATASOURCE_TYPES.contains(&kind),
        _ => true,
    }
}

/// One target that could not be normalized
#[derive(Debug)]
pub struct TargetFailure {
    /// Position in the input list
    pub index: usize,
    /// `refId` of the raw target, when it had one
    pub ref_id: Option<String>,
    /// Why normalization failed
    pub error: Error,
}

/// Output of one pipeline run
#[derive(Debug, Default)]
pub struct NormalizedTargets {
    /// Normalized targets in input order
    pub targets: Vec<QueryTarget>,
    /// Aggregated metric identifier query, empty when not requested or none mapped
    pub metric_id_query: String,
    /// Targets that failed, in input order
    pub failures: Vec<TargetFailure>,
}

impl NormalizedTargets {
    /// True if every input target normalized
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Normalizes raw panel targets against the current variable selection
pub struct TargetNormalizationPipeline<'a> {
    resolver: VariableResolver<'a>,
    source_syntax: Syntax,
    metric_id_label: String,
}

impl<'a> TargetNormalizationPipeline<'a> {
    /// Normalizer reading variables from `source`
    pub fn new(config: &EngineConfig, source: &'a dyn VariableSource) -> Self {
        Self {
            resolver: VariableResolver::new(source),
            source_syntax: config.default_syntax,
            metric_id_label: config.metric_id_label(),
        }
    }

    /// Prefer selections from an editing session over current values
    pub fn with_states(mut self, states: &'a VariableStateMap) -> Self {
        self.resolver = self.resolver.with_states(states);
        self
    }

    /// Resolver used for substitution
    pub fn resolver(&self) -> &VariableResolver<'a> {
        &self.resolver
    }

    /// Normalize every target, optionally building the metric identifier query
    pub fn normalize(&self, raw_targets: &[Value], include_metric_ids: bool) -> NormalizedTargets {
        self.normalize_indexed(raw_targets.iter().enumerate(), include_metric_ids, false)
    }

    /// Normalize the queryable targets of a panel
    ///
    /// Skips `hide: true` targets and targets bound to a datasource type this
    /// engine does not serve. Targets left with nothing to query are dropped.
    /// Failure indices refer to positions in `raw_targets`.
    pub fn normalize_panel(&self, raw_targets: &[Value], include_metric_ids: bool) -> NormalizedTargets {
        let visible = raw_targets
            .iter()
            .enumerate()
            .filter(|(_, t)| t.get("hide").and_then(Value::as_bool) != Some(true))
            .filter(|(_, t)| is_supported_datasource(t));
        self.normalize_indexed(visible, include_metric_ids, true)
    }

    fn normalize_indexed<'v>(
        &self,
        raw_targets: impl Iterator<Item = (usize, &'v Value)>,
        include_metric_ids: bool,
        require_query: bool,
    ) -> NormalizedTargets {
        let mut output = NormalizedTargets::default();
        let mut metric_ids: Vec<String> = Vec::new();

        for (index, raw) in raw_targets {
            match self.normalize_one(raw) {
                Ok(target) => {
                    if require_query && !target.has_query() {
                        debug!(index, ref_id = ?target.ref_id, "target has nothing to query");
                        continue;
                    }
                    if include_metric_ids && target.mode == QueryMode::Ui {
                        for config in &target.query_configs {
                            let id = MetricIdentifier::from_config(config).build();
                            if !id.is_empty() && !metric_ids.contains(&id) {
                                metric_ids.push(id);
                            }
                        }
                    }
                    output.targets.push(target);
                }
                Err(error) => {
                    let ref_id = raw.get("refId").and_then(Value::as_str).map(str::to_string);
                    warn!(index, ?ref_id, error = %error, "target normalization failed");
                    output.failures.push(TargetFailure {
                        index,
                        ref_id,
                        error,
                    });
                }
            }
        }

        if !metric_ids.is_empty() {
            output.metric_id_query = format!("{} : {}", self.metric_id_label, metric_ids.join(" or "));
        }
        debug!(
            targets = output.targets.len(),
            failures = output.failures.len(),
            "normalized panel targets"
        );
        output
    }

    /// Normalize one raw target
    pub fn normalize_one(&self, raw: &Value) -> Result<QueryTarget, Error> {
        let mut target = RawTarget::classify(raw.clone()).into_canonical()?;

        for config in &mut target.query_configs {
            self.normalize_config(config);
        }

        if let Some(expression) = target.expression.take().filter(|e| !e.is_empty()) {
            let alias = target.alias.take().unwrap_or_default();
            let active = target.display.take().unwrap_or(true);
            if !target.expression_list.iter().any(|e| e.expression == expression) {
                target.expression_list.push(ExpressionItem {
                    expression,
                    functions: Vec::new(),
                    alias,
                    active,
                });
            }
        } else {
            target.expression = None;
            target.alias = None;
            target.display = None;
        }

        if let Some(source) = target.source_text() {
            target.source = Some(self.resolver.interpolate(source, self.source_syntax));
        }

        Ok(target)
    }

    fn normalize_config(&self, config: &mut QueryConfig) {
        for condition in &mut config.r#where {
            condition.value = self.resolver.resolve_list(&condition.value);
        }

        config.functions.retain(|f| !f.is_ranking());
        for function in &mut config.functions {
            for param in &mut function.params {
                if let ParamValue::Text(text) = &param.value {
                    param.value = ParamValue::Text(self.resolver.interpolate(text, Syntax::Glob));
                }
            }
        }

        let interval = normalize_interval(config.interval.as_ref(), &config.interval_unit, Some(&self.resolver));
        config.interval = Some(interval.into());
        config.interval_unit = CANONICAL_UNIT.to_string();
    }
}
