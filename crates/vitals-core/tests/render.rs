use std::{
    fmt,
    sync::{
        Arc, Mutex,
        atomic::{AtomicU64, Ordering},
    },
    thread,
};

use tracing::{
    Event, Level, Subscriber,
    field::{Field, Visit},
};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};
use vitals_core::{
    CallbackValue, FAILED_RENDER_PREFIX, Registry, RenderError, RenderMetric, ResourceError,
    ResourceSnapshot, ResourceUsage,
};

/// Collects `(metric, error)` fields of every ERROR event.
#[derive(Clone, Default)]
struct ErrorEvents(Arc<Mutex<Vec<(String, String)>>>);

#[derive(Default)]
struct ErrorFields {
    metric: String,
    error: String,
}

impl Visit for ErrorFields {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        match field.name() {
            "metric" => self.metric = format!("{value:?}"),
            "error" => self.error = format!("{value:?}"),
            _ => {}
        }
    }
}

impl<S: Subscriber> Layer<S> for ErrorEvents {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if *event.metadata().level() != Level::ERROR {
            return;
        }
        let mut fields = ErrorFields::default();
        event.record(&mut fields);
        self.0.lock().unwrap().push((fields.metric, fields.error));
    }
}

#[test]
fn renders_all_kinds_in_name_order() {
    let registry = Registry::without_process_metrics();
    let ns = registry.namespace_for("synapse.http");

    let requests = ns.register_counter("requests", &["method"]).unwrap();
    requests.inc(&["GET"]).unwrap();
    requests.inc(&["PUT"]).unwrap();

    let timing = ns.register_distribution("request_time", &[]).unwrap();
    timing.inc_by(40, &[]).unwrap();

    let cache = ns.register_cache("cache", || 12).unwrap();
    cache.inc_hits();
    cache.inc_misses();

    ns.register_callback("connections", &[], || Ok(3.0.into()))
        .unwrap();

    let expected = "\
synapse_http_cache:hits 1
synapse_http_cache:total 2
synapse_http_cache:size 12
synapse_http_connections 3
synapse_http_request_time:count 1
synapse_http_request_time:total 40
synapse_http_requests{method=\"GET\"} 1
synapse_http_requests{method=\"PUT\"} 1
";
    assert_eq!(registry.render_all().unwrap(), expected);
}

#[test]
fn every_failure_gets_one_marker_and_nothing_is_truncated() {
    let registry = Registry::without_process_metrics();
    let ns = registry.namespace_for("app");

    ns.register_callback("a_broken", &[], || Err(RenderError::Callback("db down".into())))
        .unwrap();
    ns.register_callback("b_ok", &[], || Ok(1.0.into())).unwrap();
    ns.register_callback("c_bad_labels", &["room"], || {
        Ok(CallbackValue::Labelled(vec![(vec![], 1.0)]))
    })
    .unwrap();
    ns.register_counter("d_ok", &[]).unwrap();

    let out = registry.render_all().unwrap();
    let lines: Vec<&str> = out.lines().collect();

    assert_eq!(
        lines,
        vec![
            format!("{FAILED_RENDER_PREFIX}app_a_broken").as_str(),
            "app_b_ok 1",
            "# FAILED to render app_c_bad_labels",
            "app_d_ok 0",
        ]
    );
    assert!(out.ends_with('\n'));
    assert!(!out.ends_with("\n\n"));
}

#[test]
fn output_is_stable_without_state_changes() {
    let registry = Registry::without_process_metrics();
    let ns = registry.namespace_for("app");
    ns.register_counter("events", &[]).unwrap().inc(&[]).unwrap();
    ns.register_cache("cache", || 1).unwrap();

    assert_eq!(registry.render_all().unwrap(), registry.render_all().unwrap());
}

#[test]
fn callbacks_read_state_at_render_time() {
    let registry = Registry::without_process_metrics();
    let depth = Arc::new(AtomicU64::new(0));

    let seen = depth.clone();
    registry
        .namespace_for("queue")
        .register_callback("depth", &[], move || Ok(seen.load(Ordering::Relaxed).into()))
        .unwrap();

    assert_eq!(registry.render_all().unwrap(), "queue_depth 0\n");
    depth.store(9, Ordering::Relaxed);
    assert_eq!(registry.render_all().unwrap(), "queue_depth 9\n");
}

#[test]
fn resource_metrics_are_always_present() {
    let registry = Registry::new();
    registry
        .namespace_for("app")
        .register_counter("events", &[])
        .unwrap();

    let out = registry.render_all().unwrap();
    let names: Vec<&str> = out
        .lines()
        .filter_map(|l| l.split_whitespace().next())
        .collect();

    assert_eq!(
        names,
        vec![
            "app_events",
            "process_resource_maxrss",
            "process_resource_stime",
            "process_resource_utime",
        ]
    );
}

#[test]
fn concurrent_registration_and_render() {
    let registry = Registry::new();

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let registry = registry.clone();
            thread::spawn(move || {
                let ns = registry.namespace_for(&format!("worker.{i}"));
                let counter = ns.register_counter("jobs", &[]).unwrap();
                for _ in 0..100 {
                    counter.inc(&[]).unwrap();
                    registry.render_all().unwrap();
                }
            })
        })
        .collect();

    for h in handles {
        h.join().unwrap();
    }

    let out = registry.render_all().unwrap();
    for i in 0..4 {
        assert!(out.contains(&format!("worker_{i}_jobs 100\n")));
    }
    assert_eq!(registry.len(), 7);
}

#[test]
fn registered_handle_reports_its_full_name() {
    let registry = Registry::without_process_metrics();
    let metric = registry
        .namespace_for("a.b.c")
        .register_distribution("sizes", &["kind"])
        .unwrap();

    assert_eq!(metric.name(), "a_b_c_sizes");
    assert_eq!(registry.names(), vec!["a_b_c_sizes"]);
    // Labelled distribution without samples contributes no lines.
    assert_eq!(registry.render_all().unwrap(), "\n");
}

#[test]
fn failed_render_emits_one_error_record_per_metric() {
    let registry = Registry::without_process_metrics();
    let ns = registry.namespace_for("app");
    ns.register_callback("a", &[], || Ok(1.0.into())).unwrap();
    ns.register_callback("b", &[], || Err(RenderError::Callback("boom".into())))
        .unwrap();
    ns.register_callback("c", &[], || Ok(3.0.into())).unwrap();

    let events = ErrorEvents::default();
    let subscriber = tracing_subscriber::registry().with(events.clone());
    let out = tracing::subscriber::with_default(subscriber, || registry.render_all()).unwrap();

    assert!(out.contains("# FAILED to render app_b\n"));
    let recorded = events.0.lock().unwrap().clone();
    assert_eq!(recorded.len(), 1, "unexpected error events: {recorded:?}");
    assert_eq!(recorded[0].0, "app_b");
    assert!(recorded[0].1.contains("boom"));
}

fn failing_getrusage() -> Result<ResourceUsage, ResourceError> {
    Err(ResourceError::Getrusage(std::io::Error::other("getrusage unavailable")))
}

#[test]
fn failed_resource_query_aborts_the_pass() {
    let snapshot = Arc::new(ResourceSnapshot::with_source(4096, failing_getrusage));
    let registry = Registry::with_snapshot(snapshot.clone());
    let events = registry
        .namespace_for("app")
        .register_counter("events", &[])
        .unwrap();
    events.inc(&[]).unwrap();

    let err = registry.render_all().unwrap_err();
    assert!(matches!(err, ResourceError::Getrusage(_)));
    assert!(snapshot.latest().is_none());
}
