#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use netsentinel_core::config::RunConfig;
use netsentinel_core::error::{ArchiveError, InferenceError, SessionError};
use netsentinel_core::executor::NoRetry;
use netsentinel_core::record::{RunRecord, RunSummary};
use netsentinel_core::{ArchiveStore, CommandSet, DeviceSpec, InferenceBackend, RemoteSession, SessionTransport};

/// How a mock device answers.
#[derive(Debug, Clone, Default)]
pub enum Behavior {
    #[default]
    Ok,
    /// Connection refused on every attempt.
    Refuse,
    /// Bad credentials.
    Deny,
    /// Connects, then never answers a command.
    Hang,
    /// Refuses the first `n` connection attempts, then behaves.
    RefuseTimes(usize),
}

/// Current and highest number of overlapping calls.
#[derive(Default)]
struct InFlight {
    now: AtomicUsize,
    peak: AtomicUsize,
}

impl InFlight {
    fn enter(&self) {
        let now = self.now.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
    }

    fn leave(&self) {
        self.now.fetch_sub(1, Ordering::SeqCst);
    }

    fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[derive(Default)]
struct TransportStats {
    opens: Mutex<HashMap<String, usize>>,
    sessions: InFlight,
    closes: AtomicUsize,
}

/// Session transport with per-device latency and failure behaviour.
#[derive(Default)]
pub struct MockTransport {
    latency: Duration,
    latency_for: HashMap<String, Duration>,
    behaviors: HashMap<String, Behavior>,
    stats: Arc<TransportStats>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn with_device_latency(mut self, id: &str, latency: Duration) -> Self {
        self.latency_for.insert(id.to_string(), latency);
        self
    }

    pub fn with_behavior(mut self, id: &str, behavior: Behavior) -> Self {
        self.behaviors.insert(id.to_string(), behavior);
        self
    }

    pub fn opens(&self, id: &str) -> usize {
        self.stats.opens.lock().unwrap().get(id).copied().unwrap_or(0)
    }

    pub fn peak_in_flight(&self) -> usize {
        self.stats.sessions.peak()
    }

    pub fn closes(&self) -> usize {
        self.stats.closes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionTransport for MockTransport {
    fn name(&self) -> &str {
        "mock"
    }

    async fn open(&self, device: &DeviceSpec) -> Result<Box<dyn RemoteSession>, SessionError> {
        let attempt = {
            let mut opens = self.stats.opens.lock().unwrap();
            let n = opens.entry(device.id.clone()).or_insert(0);
            *n += 1;
            *n
        };

        self.stats.sessions.enter();
        let latency = self
            .latency_for
            .get(&device.id)
            .copied()
            .unwrap_or(self.latency);
        tokio::time::sleep(latency).await;

        let behavior = self.behaviors.get(&device.id).cloned().unwrap_or_default();
        let refused = match behavior {
            Behavior::Refuse => true,
            Behavior::RefuseTimes(n) => attempt <= n,
            _ => false,
        };
        if refused {
            self.stats.sessions.leave();
            return Err(SessionError::Connection(format!(
                "connect to {} port {}: Connection refused",
                device.host, device.port
            )));
        }
        if matches!(behavior, Behavior::Deny) {
            self.stats.sessions.leave();
            return Err(SessionError::Authentication("Permission denied".to_string()));
        }

        Ok(Box::new(MockSession {
            device_id: device.id.clone(),
            hang: matches!(behavior, Behavior::Hang),
            stats: self.stats.clone(),
            open: true,
        }))
    }
}

struct MockSession {
    device_id: String,
    hang: bool,
    stats: Arc<TransportStats>,
    open: bool,
}

#[async_trait]
impl RemoteSession for MockSession {
    async fn run(&mut self, command: &str) -> Result<String, SessionError> {
        if self.hang {
            std::future::pending::<()>().await;
        }
        Ok(format!("{} answered '{}'", self.device_id, command))
    }

    async fn close(&mut self) {
        if self.open {
            self.open = false;
            self.stats.closes.fetch_add(1, Ordering::SeqCst);
            self.stats.sessions.leave();
        }
    }
}

/// Inference backend that answers deterministically and counts calls per device.
#[derive(Default)]
pub struct MockInference {
    latency: Duration,
    unavailable_for: Vec<String>,
    calls: Mutex<Vec<String>>,
    generating: InFlight,
}

impl MockInference {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn unavailable_for(mut self, id: &str) -> Self {
        self.unavailable_for.push(id.to_string());
        self
    }

    pub fn calls_for(&self, id: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|d| d.as_str() == id)
            .count()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn peak_in_flight(&self) -> usize {
        self.generating.peak()
    }
}

/// Device id from the first `=== Device: <id> (` header in a prompt.
fn device_in(prompt: &str) -> String {
    prompt
        .split("=== Device: ")
        .nth(1)
        .and_then(|rest| rest.split(" (").next())
        .unwrap_or("unknown")
        .to_string()
}

#[async_trait]
impl InferenceBackend for MockInference {
    fn name(&self) -> &str {
        "mock"
    }

    async fn generate(&self, _model: &str, prompt: &str) -> Result<String, InferenceError> {
        let device = device_in(prompt);
        self.calls.lock().unwrap().push(device.clone());
        self.generating.enter();
        tokio::time::sleep(self.latency).await;
        self.generating.leave();

        if self.unavailable_for.contains(&device) {
            return Err(InferenceError::Unavailable("connection refused".to_string()));
        }
        Ok(format!("### Health\nAnalysis of {device}: no obvious anomalies."))
    }

    async fn is_available(&self) -> bool {
        true
    }

    async fn list_models(&self) -> Result<Vec<String>, InferenceError> {
        Ok(vec!["mock-model".to_string()])
    }
}

/// Archive that refuses every write.
pub struct BrokenArchive;

#[async_trait]
impl ArchiveStore for BrokenArchive {
    fn name(&self) -> &str {
        "broken"
    }

    async fn persist(&self, _record: &RunRecord) -> Result<(), ArchiveError> {
        Err(ArchiveError::Io(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "read-only filesystem",
        )))
    }

    async fn list(&self) -> Result<Vec<RunSummary>, ArchiveError> {
        Ok(Vec::new())
    }

    async fn get(&self, run_id: &str) -> Result<RunRecord, ArchiveError> {
        Err(ArchiveError::NotFound(run_id.to_string()))
    }
}

pub fn devices(ids: &[&str]) -> Vec<DeviceSpec> {
    ids.iter()
        .enumerate()
        .map(|(i, id)| DeviceSpec::new(*id, format!("10.0.0.{}", i + 1), "admin"))
        .collect()
}

pub fn commands() -> CommandSet {
    CommandSet::new(["display version", "display cpu-usage"])
}

/// Run config with no retries and short, distinct timeouts.
pub fn run_config(collect: usize, analyze: usize) -> RunConfig {
    let mut cfg = RunConfig::default()
        .with_model("mock-model")
        .with_commands(commands());
    cfg.collector.concurrency = collect;
    cfg.collector.connect_timeout = Duration::from_secs(5);
    cfg.collector.command_timeout = Duration::from_secs(10);
    cfg.collector.retry = Arc::new(NoRetry);
    cfg.analysis.concurrency = analyze;
    cfg.analysis.inference_timeout = Duration::from_secs(60);
    cfg.analysis.retry = Arc::new(NoRetry);
    cfg.analysis.prompt_template = "Inspect {device}.\n{capture}".to_string();
    cfg
}

/// Drop the lines that carry timestamps or the run id.
pub fn strip_volatile(report: &str) -> String {
    report
        .lines()
        .filter(|l| {
            !(l.starts_with("| Run ID")
                || l.starts_with("| Started")
                || l.starts_with("| Finished")
                || l.starts_with("_Captured at:"))
        })
        .collect::<Vec<_>>()
        .join("\n")
}
