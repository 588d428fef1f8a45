//! Scriptable source adapter

use async_trait::async_trait;
use ecoscan_orchestrator::types::{
    AiAssessment, ProductQuery, ProviderError, ProviderPayload, ScoreRole, SourceAdapter,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub enum Behavior {
    /// Live success with this partial score
    Score(f64),
    /// Live failure (HTTP 503)
    Fail,
    /// Never returns
    Hang,
    /// Live success after a delay
    Slow(Duration, f64),
}

pub struct ScriptedSource {
    name: String,
    role: ScoreRole,
    behavior: Behavior,
    estimate: Option<f64>,
    calls: AtomicUsize,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

impl ScriptedSource {
    pub fn new(name: &str, role: ScoreRole, behavior: Behavior) -> Self {
        Self {
            name: name.to_string(),
            role,
            behavior,
            estimate: None,
            calls: AtomicUsize::new(0),
            in_flight: Arc::new(AtomicUsize::new(0)),
            max_in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn arc(name: &str, role: ScoreRole, behavior: Behavior) -> Arc<Self> {
        Arc::new(Self::new(name, role, behavior))
    }

    /// Fallback estimator returns this score
    pub fn with_estimate(mut self, score: f64) -> Self {
        self.estimate = Some(score);
        self
    }

    /// Share an in-flight gauge across several sources
    pub fn with_gauge(mut self, in_flight: Arc<AtomicUsize>, max: Arc<AtomicUsize>) -> Self {
        self.in_flight = in_flight;
        self.max_in_flight = max;
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

fn payload(score: f64) -> ProviderPayload {
    ProviderPayload::Ai(AiAssessment {
        score: Some(score),
        summary: "scripted".to_string(),
        certifications: Vec::new(),
    })
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl SourceAdapter for ScriptedSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn role(&self) -> ScoreRole {
        self.role
    }

    async fn fetch_live(&self, _query: &ProductQuery) -> Result<ProviderPayload, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let _guard = InFlight(&self.in_flight);

        match self.behavior {
            Behavior::Score(score) => Ok(payload(score)),
            Behavior::Fail => Err(ProviderError::Http(503)),
            Behavior::Hang => {
                std::future::pending::<()>().await;
                Err(ProviderError::Unavailable("unreachable".to_string()))
            }
            Behavior::Slow(delay, score) => {
                tokio::time::sleep(delay).await;
                Ok(payload(score))
            }
        }
    }

    fn estimate(&self, _query: &ProductQuery) -> Option<ProviderPayload> {
        self.estimate.map(payload)
    }
}
