mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{commands, devices, run_config, Behavior, MockInference, MockTransport};
use netsentinel_core::analysis::AnalysisPipeline;
use netsentinel_core::collector::FleetCollector;
use netsentinel_core::error::DeviceError;
use netsentinel_core::executor::{FixedRetry, StageContext};
use netsentinel_core::record::{RawCaptureResult, ResultStatus};
use tokio::time::Instant;

const L: Duration = Duration::from_millis(400);

fn collector(transport: &Arc<MockTransport>, concurrency: usize) -> FleetCollector {
    let cfg = run_config(concurrency, 1);
    FleetCollector::from_options(transport.clone(), &cfg.collector)
}

#[tokio::test(start_paused = true)]
async fn collector_returns_one_result_per_device_in_inventory_order() {
    for n in [0usize, 1, 2, 7] {
        let ids: Vec<String> = (0..n).map(|i| format!("sw{i}")).collect();
        let refs: Vec<&str> = ids.iter().map(String::as_str).collect();

        // Later devices finish first.
        let mut transport = MockTransport::new();
        for (i, id) in refs.iter().enumerate() {
            transport = transport.with_device_latency(id, L * (n - i) as u32);
        }
        let transport = Arc::new(transport);

        let captures = collector(&transport, 3)
            .collect(&devices(&refs), &commands(), &StageContext::default(), None)
            .await;

        assert_eq!(captures.len(), n);
        for (capture, id) in captures.iter().zip(&refs) {
            assert_eq!(&capture.device_id, id);
            assert!(capture.is_success());
        }
    }
}

#[tokio::test(start_paused = true)]
async fn collection_time_follows_concurrency_bound() {
    let transport = Arc::new(MockTransport::new().with_latency(L));
    let fleet = devices(&["a", "b", "c", "d", "e"]);

    let started = Instant::now();
    let captures = collector(&transport, 2)
        .collect(&fleet, &commands(), &StageContext::default(), None)
        .await;
    let elapsed = started.elapsed();

    assert!(captures.iter().all(|c| c.is_success()));
    assert!(elapsed >= L * 3, "elapsed {elapsed:?}");
    assert!(elapsed < L * 4, "elapsed {elapsed:?}");
    assert_eq!(transport.peak_in_flight(), 2);
    assert_eq!(transport.closes(), 5);
}

#[tokio::test(start_paused = true)]
async fn hanging_device_is_bounded_by_command_timeout() {
    let transport = Arc::new(
        MockTransport::new()
            .with_latency(L)
            .with_behavior("b", Behavior::Hang),
    );
    let cfg = run_config(3, 1);
    let fleet = devices(&["a", "b", "c"]);

    let started = Instant::now();
    let captures = FleetCollector::from_options(transport.clone(), &cfg.collector)
        .collect(&fleet, &commands(), &StageContext::default(), None)
        .await;
    let elapsed = started.elapsed();

    assert!(captures[0].is_success());
    assert!(captures[2].is_success());
    assert_eq!(
        captures[1].error,
        Some(DeviceError::CommandTimeout {
            command: "display version".to_string(),
            timeout_ms: 10_000,
        })
    );
    assert!(elapsed <= cfg.collector.command_timeout + L + Duration::from_millis(50));
    assert_eq!(transport.closes(), 3, "hung session must still be closed");
}

#[tokio::test(start_paused = true)]
async fn transient_failures_are_retried_but_auth_failures_are_not() {
    let transport = Arc::new(
        MockTransport::new()
            .with_behavior("flaky", Behavior::RefuseTimes(1))
            .with_behavior("locked", Behavior::Deny)
            .with_behavior("down", Behavior::Refuse),
    );
    let mut cfg = run_config(3, 1);
    cfg.collector.retry = Arc::new(FixedRetry {
        retries: 2,
        delay: Duration::from_millis(100),
    });

    let captures = FleetCollector::from_options(transport.clone(), &cfg.collector)
        .collect(
            &devices(&["flaky", "locked", "down"]),
            &commands(),
            &StageContext::default(),
            None,
        )
        .await;

    assert!(captures[0].is_success());
    assert_eq!(captures[0].attempts, 2);

    assert!(matches!(captures[1].error, Some(DeviceError::Authentication(_))));
    assert_eq!(captures[1].attempts, 1);
    assert_eq!(transport.opens("locked"), 1);

    assert!(matches!(captures[2].error, Some(DeviceError::Connection(_))));
    assert_eq!(captures[2].attempts, 3);
}

#[tokio::test(start_paused = true)]
async fn failed_capture_is_mirrored_without_inference() {
    let transport = Arc::new(MockTransport::new().with_behavior("b", Behavior::Refuse));
    let backend = Arc::new(MockInference::new());
    let cfg = run_config(3, 2);
    let ctx = StageContext::default();

    let captures = FleetCollector::from_options(transport, &cfg.collector)
        .collect(&devices(&["a", "b", "c"]), &commands(), &ctx, None)
        .await;
    let analyses = AnalysisPipeline::from_options(backend.clone(), "mock-model", &cfg.analysis)
        .analyze_all(&captures, &ctx)
        .await;

    assert_eq!(analyses.len(), 3);
    assert_eq!(analyses[1].status, ResultStatus::Failed);
    assert_eq!(analyses[1].error, captures[1].error);
    assert_eq!(analyses[1].attempts, 0);
    assert_eq!(backend.calls_for("b"), 0);

    for i in [0, 2] {
        assert!(analyses[i].is_success());
        assert!(analyses[i].report_text.contains(&captures[i].device_id));
    }
    assert_eq!(backend.total_calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn inference_unavailable_is_retried_then_fails() {
    let backend = Arc::new(MockInference::new().unavailable_for("a"));
    let mut cfg = run_config(1, 1);
    cfg.analysis.retry = Arc::new(FixedRetry {
        retries: 2,
        delay: Duration::from_millis(10),
    });
    let ctx = StageContext::default();
    let transport = Arc::new(MockTransport::new());

    let captures = FleetCollector::from_options(transport, &cfg.collector)
        .collect(&devices(&["a"]), &commands(), &ctx, None)
        .await;
    let analyses = AnalysisPipeline::from_options(backend.clone(), "mock-model", &cfg.analysis)
        .analyze_all(&captures, &ctx)
        .await;

    assert!(matches!(
        analyses[0].error,
        Some(DeviceError::InferenceUnavailable(_))
    ));
    assert_eq!(analyses[0].attempts, 3);
    assert_eq!(backend.calls_for("a"), 3);
}

#[tokio::test(start_paused = true)]
async fn analysis_starts_before_collection_finishes() {
    let transport = Arc::new(
        MockTransport::new()
            .with_device_latency("fast", L)
            .with_device_latency("slow", L * 10),
    );
    let backend = Arc::new(MockInference::new().with_latency(L * 2));
    let cfg = run_config(2, 1);
    let ctx = StageContext::default();
    let fleet = devices(&["fast", "slow"]);
    let commands = commands();

    let collector = FleetCollector::from_options(transport, &cfg.collector);
    let pipeline = AnalysisPipeline::from_options(backend.clone(), "mock-model", &cfg.analysis);
    let (tx, rx) = tokio::sync::mpsc::channel(fleet.len());

    let started = Instant::now();
    let (captures, analyses) = tokio::join!(
        collector.collect(&fleet, &commands, &ctx, Some(tx)),
        pipeline.analyze_stream(rx, fleet.len(), &ctx)
    );
    let elapsed = started.elapsed();

    assert_eq!(captures.len(), 2);
    let analyses: Vec<_> = analyses.into_iter().map(Option::unwrap).collect();
    assert_eq!(analyses[0].device_id, "fast");
    assert_eq!(analyses[1].device_id, "slow");
    // fast is analysed while slow is still being collected.
    assert!(elapsed < L * 13, "elapsed {elapsed:?}");
}

#[tokio::test(start_paused = true)]
async fn streamed_analysis_follows_concurrency_bound() {
    let backend = Arc::new(MockInference::new().with_latency(L));
    let cfg = run_config(1, 2);
    let pipeline = AnalysisPipeline::from_options(backend.clone(), "mock-model", &cfg.analysis);
    let ids = ["a", "b", "c", "d", "e"];

    let (tx, rx) = tokio::sync::mpsc::channel(ids.len());
    for (index, id) in ids.iter().enumerate() {
        let raw = format!("=== Device: {id} (10.0.0.{}) ===\n[Command: display version]\nok", index + 1);
        tx.send((index, RawCaptureResult::success(*id, raw)))
            .await
            .unwrap();
    }
    drop(tx);

    let started = Instant::now();
    let analyses = pipeline
        .analyze_stream(rx, ids.len(), &StageContext::default())
        .await;
    let elapsed = started.elapsed();

    assert_eq!(backend.total_calls(), 5);
    assert_eq!(backend.peak_in_flight(), 2);
    assert!(elapsed >= L * 3, "elapsed {elapsed:?}");
    assert!(elapsed < L * 4, "elapsed {elapsed:?}");
    for (analysis, id) in analyses.into_iter().zip(ids) {
        let analysis = analysis.unwrap();
        assert_eq!(analysis.device_id, id);
        assert!(analysis.is_success());
    }
}
