//! Fetch Coordinator - parallel fan-out over all applicable sources
//!
//! **Settlement of one source:**
//! 1. Wait for a permit on the shared [`CallGate`] (FIFO, so sources
//!    launched first acquire first)
//! 2. Race the live call against the source's `timeout_ms` and the outer
//!    query deadline
//! 3. On failure, take the outcome of each `fallback_chain` alternate's live
//!    call (own permit, own timeout, same deadline)
//! 4. Chain exhausted: the adapter's fallback estimator
//!
//! Each source is called live at most once per query: a source that is both
//! planned and named in another source's chain shares one call.
//!
//! Every launched source settles; the coordinator itself never fails.

use crate::adapters::{RegisteredSource, SourceRegistry};
use crate::gate::{CallGate, QueryDeadline};
use crate::types::{ProductQuery, ProviderError, ProviderPayload, ProviderResult};
use futures::future::{join_all, BoxFuture, FutureExt, Shared};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// One source's live call, awaited by its own slot and by any chain naming it
type LiveCall<'a> = Shared<BoxFuture<'a, Result<ProviderPayload, ProviderError>>>;

/// Parallel fetch over the source registry
pub struct FetchCoordinator {
    registry: Arc<SourceRegistry>,
    /// Shared across concurrent queries: caps outbound calls process-wide
    gate: CallGate,
    query_deadline: Duration,
}

impl FetchCoordinator {
    pub fn new(registry: Arc<SourceRegistry>, concurrency_cap: usize, query_deadline: Duration) -> Self {
        Self {
            registry,
            gate: CallGate::new(concurrency_cap),
            query_deadline,
        }
    }

    pub fn registry(&self) -> &Arc<SourceRegistry> {
        &self.registry
    }

    pub fn gate(&self) -> &CallGate {
        &self.gate
    }

    /// Start the outer deadline for one query
    pub fn arm_deadline(&self, parent: &CancellationToken) -> QueryDeadline {
        QueryDeadline::arm(parent, self.query_deadline)
    }

    /// Enabled, applicable sources, highest priority first (ties by name)
    pub fn plan(&self, query: &ProductQuery) -> Vec<&RegisteredSource> {
        let mut plan: Vec<&RegisteredSource> = self
            .registry
            .iter()
            .filter(|s| s.config.enabled && s.adapter.applies_to(query))
            .collect();
        plan.sort_by(|a, b| {
            b.config
                .priority
                .cmp(&a.config.priority)
                .then_with(|| a.config.source_name.cmp(&b.config.source_name))
        });
        plan
    }

    /// Fetch from every applicable source
    ///
    /// Returns one result per planned source, sorted by source name.
    pub async fn fetch_all(&self, query: &ProductQuery) -> Vec<ProviderResult> {
        self.fetch_all_with_cancel(query, &CancellationToken::new()).await
    }

    /// [`fetch_all`](Self::fetch_all) that also stops early when `cancel`
    /// fires; unsettled sources then resolve through their fallbacks
    pub async fn fetch_all_with_cancel(
        &self,
        query: &ProductQuery,
        cancel: &CancellationToken,
    ) -> Vec<ProviderResult> {
        let deadline = self.arm_deadline(cancel);
        self.fetch_within(query, deadline.token()).await
    }

    /// Fan out under an already armed deadline
    pub async fn fetch_within(&self, query: &ProductQuery, deadline: &CancellationToken) -> Vec<ProviderResult> {
        let plan = self.plan(query);
        if plan.is_empty() {
            warn!(query = %query.cache_key(), "No applicable sources");
            return Vec::new();
        }

        // Lazy: standbys nobody falls back to are never called
        let calls: HashMap<&str, LiveCall<'_>> = self
            .registry
            .iter()
            .filter(|s| s.adapter.applies_to(query))
            .map(|s| {
                let call = self.call_live(s, query, deadline).boxed().shared();
                (s.config.source_name.as_str(), call)
            })
            .collect();

        let started = Instant::now();
        let planned = plan.len();
        let mut results = join_all(plan.into_iter().map(|source| self.settle(source, query, deadline, &calls))).await;

        results.sort_by(|a, b| a.source_name.cmp(&b.source_name));
        let live = results.iter().filter(|r| r.is_live()).count();
        info!(
            query = %query.cache_key(),
            sources = planned,
            live,
            deadline_hit = deadline.is_cancelled(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Fan-out settled"
        );
        results
    }

    /// Drive one source to a settled result
    async fn settle(
        &self,
        source: &RegisteredSource,
        query: &ProductQuery,
        deadline: &CancellationToken,
        calls: &HashMap<&str, LiveCall<'_>>,
    ) -> ProviderResult {
        let started = Instant::now();
        let name = source.config.source_name.as_str();
        let role = source.adapter.role();

        let outcome = match calls.get(name) {
            Some(call) => call.clone().await,
            None => self.call_live(source, query, deadline).await,
        };
        let result = match outcome {
            Ok(payload) => ProviderResult::live(name, role, payload),
            Err(err) => {
                warn!(source = name, error = %err, "Live fetch failed");
                match self.walk_chain(source, deadline, calls).await {
                    Some(result) => result,
                    None => source.adapter.fallback(query, err.status()),
                }
            }
        };

        debug!(
            source = name,
            status = %result.status,
            served_by = result.served_by.as_deref().unwrap_or("-"),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Source settled"
        );
        result
    }

    /// One live call through the gate
    async fn call_live(
        &self,
        source: &RegisteredSource,
        query: &ProductQuery,
        deadline: &CancellationToken,
    ) -> Result<ProviderPayload, ProviderError> {
        let timeout = Duration::from_millis(source.config.timeout_ms);
        self.gate.run(timeout, deadline, source.adapter.fetch_live(query)).await
    }

    /// Try the primary's fallback chain in order
    ///
    /// Unregistered and inapplicable alternates are skipped. A live alternate
    /// answer is labelled with the primary's name and role.
    async fn walk_chain(
        &self,
        primary: &RegisteredSource,
        deadline: &CancellationToken,
        calls: &HashMap<&str, LiveCall<'_>>,
    ) -> Option<ProviderResult> {
        let primary_name = primary.config.source_name.as_str();
        let mut tried: HashSet<&str> = HashSet::from([primary_name]);

        for alternate_name in &primary.config.fallback_chain {
            if deadline.is_cancelled() {
                break;
            }
            if !tried.insert(alternate_name.as_str()) {
                continue;
            }
            let Some(call) = calls.get(alternate_name.as_str()) else {
                debug!(source = primary_name, alternate = %alternate_name, "Alternate not registered or not applicable");
                continue;
            };

            match call.clone().await {
                Ok(payload) => {
                    info!(source = primary_name, alternate = %alternate_name, "Served by fallback chain");
                    return Some(
                        ProviderResult::live(primary_name, primary.adapter.role(), payload)
                            .served_by(alternate_name.as_str()),
                    );
                }
                Err(err) => {
                    warn!(source = primary_name, alternate = %alternate_name, error = %err, "Alternate failed");
                }
            }
        }
        None
    }
}
