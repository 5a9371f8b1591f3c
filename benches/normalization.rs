use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use serde_json::{json, Value};
use target_templating::templating::{scan_variables, Syntax, VariableResolver};
use target_templating::types::{CurrentValue, TemplateVariable, VariableOption};
use target_templating::{EngineConfig, TargetNormalizationPipeline};

fn create_variables() -> Vec<TemplateVariable> {
    let hosts: Vec<String> = (0..50).map(|i| format!("web-{:02}", i)).collect();
    vec![
        TemplateVariable {
            id: "host".to_string(),
            current: CurrentValue::Multi(hosts[..10].to_vec()),
            options: hosts.iter().map(|h| VariableOption::new(h.as_str(), h.as_str())).collect(),
            multi: true,
            all_value: None,
        },
        TemplateVariable {
            id: "interval".to_string(),
            current: CurrentValue::Single("1m".to_string()),
            ..Default::default()
        },
    ]
}

fn create_targets(count: usize) -> Vec<Value> {
    (0..count)
        .map(|i| {
            if i % 3 == 0 {
                json!({
                    "refId": format!("L{}", i),
                    "data": {
                        "metric": {"id": ["bk_monitor_time_series", "", "system.mem", format!("m{}", i)]},
                        "period": 1,
                        "method": "AVG",
                        "conditions": [[
                            {"type": "key", "value": "ip"},
                            {"type": "method", "value": "eq"},
                            {"type": "value", "value": ["$host"]}
                        ]]
                    }
                })
            } else {
                json!({
                    "refId": format!("T{}", i),
                    "query_configs": [{
                        "data_source_label": "bk_monitor",
                        "data_type_label": "time_series",
                        "result_table_id": "system.cpu_summary",
                        "metric_field": format!("f{}", i % 7),
                        "interval": "$interval",
                        "where": [{"key": "ip", "method": "eq", "value": ["$host"]}],
                        "functions": [{"id": "top", "params": [{"id": "n", "value": 5}]}]
                    }]
                })
            }
        })
        .collect()
}

fn bench_pipeline(c: &mut Criterion) {
    let vars = create_variables();
    let config = EngineConfig::default();
    let pipeline = TargetNormalizationPipeline::new(&config, &vars);

    let mut group = c.benchmark_group("normalize");

    for size in [1, 10, 100].iter() {
        let targets = create_targets(*size);

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| black_box(pipeline.normalize(&targets, true)));
        });
    }

    group.finish();
}

fn bench_interpolate(c: &mut Criterion) {
    let vars = create_variables();
    let resolver = VariableResolver::new(&vars);
    let source = "sum by (ip) (rate(cpu{ip=~\"$host\", job=\"[[job]]\"}[$interval])) / ${host:csv}";

    c.bench_function("scan_variables", |b| b.iter(|| black_box(scan_variables(black_box(source)))));

    c.bench_function("interpolate_regex", |b| {
        b.iter(|| black_box(resolver.interpolate(black_box(source), Syntax::Regex)))
    });
}

criterion_group!(benches, bench_pipeline, bench_interpolate);
criterion_main!(benches);
