//! Collector that turns one fetch of the members route into Prometheus metrics.
//!
//! Every call to [`ClusterCollector::collect`] runs a full cycle under a single
//! async mutex: reset, fetch, decode, count, encode. Concurrent scrapes queue
//! on that mutex, so none of them sees a half-updated registry.

use std::sync::Arc;
use std::time::Instant;

use akka_cluster_common::{MembershipSnapshot, StatusCounts};
use parking_lot::RwLock;
use prometheus_client::encoding::text::encode;
use prometheus_client::registry::Registry;
use tokio::sync::Mutex;
use tracing::{debug, error, warn};

use crate::config::ExporterConfig;
use crate::fetcher::{FetchError, Fetcher, HttpFetcher};
use crate::mapping::{ClusterMetrics, ExporterMetrics, register_build_info};

/// Result of one collection cycle.
#[derive(Debug, Clone)]
pub struct Scrape {
    /// Whether the members route answered with a 2xx status.
    pub up: bool,
    /// Member counts published by this cycle.
    pub counts: StatusCounts,
    /// Encoded exposition text.
    pub body: String,
}

/// Lightweight summary of the last completed cycle.
#[derive(Debug, Clone, Copy)]
pub struct ScrapeSummary {
    /// Whether the members route answered with a 2xx status.
    pub up: bool,
    /// Members counted under one of the known statuses.
    pub members: u64,
    /// When the cycle finished.
    pub completed_at: Instant,
}

/// Collector statistics.
#[derive(Debug, Clone, Default)]
pub struct CollectorStats {
    /// Collection cycles run.
    pub scrapes: u64,
    /// Cycles whose fetch failed.
    pub fetch_failures: u64,
    /// Cycles whose payload could not be read or decoded.
    pub parse_failures: u64,
}

/// State guarded by the cycle lock.
struct CollectorState {
    registry: Registry,
    cluster: ClusterMetrics,
}

/// Collects Akka cluster membership on demand.
pub struct ClusterCollector {
    fetcher: Box<dyn Fetcher>,
    state: Mutex<CollectorState>,
    exporter: ExporterMetrics,
    last_scrape: RwLock<Option<ScrapeSummary>>,
}

impl ClusterCollector {
    /// Create a collector that fetches through `fetcher` and publishes under `namespace`.
    pub fn new(fetcher: impl Fetcher + 'static, namespace: &str) -> Self {
        let mut registry = Registry::default();
        let cluster = ClusterMetrics::register(&mut registry, namespace);
        let exporter = ExporterMetrics::register(&mut registry, namespace);
        register_build_info(&mut registry);

        Self {
            fetcher: Box::new(fetcher),
            state: Mutex::new(CollectorState { registry, cluster }),
            exporter,
            last_scrape: RwLock::new(None),
        }
    }

    /// Create an HTTP-backed collector from configuration.
    ///
    /// Fails if the scrape URI is invalid or uses an unsupported scheme.
    pub fn from_config(config: &ExporterConfig) -> Result<Self, FetchError> {
        let fetcher = HttpFetcher::new(&config.akka.scrape_uri, config.akka.timeout())?;
        Ok(Self::new(fetcher, &config.prometheus.namespace))
    }

    /// The URI this collector fetches.
    pub fn uri(&self) -> &str {
        self.fetcher.uri()
    }

    /// Run one collection cycle and return what it published.
    ///
    /// Never fails: an unreachable endpoint is reported as `up == 0` and a
    /// malformed payload as zero counts.
    pub async fn collect(&self) -> Scrape {
        let state = self.state.lock().await;

        state.cluster.reset();
        self.exporter.scrapes.inc();

        let (up, counts) = self.scrape().await;
        state.cluster.set(up, &counts);

        let mut body = String::new();
        if let Err(e) = encode(&mut body, &state.registry) {
            error!(error = %e, "Failed to encode metrics");
        }

        *self.last_scrape.write() = Some(ScrapeSummary {
            up,
            members: counts.total(),
            completed_at: Instant::now(),
        });

        Scrape { up, counts, body }
    }

    /// Fetch and count. Returns the liveness flag and the counts for this cycle.
    async fn scrape(&self) -> (bool, StatusCounts) {
        let mut body = match self.fetcher.fetch().await {
            Ok(body) => body,
            Err(e) => {
                self.exporter.fetch_failures.inc();
                warn!(
                    uri = %self.fetcher.uri(),
                    error = %e,
                    "Can't scrape akka http management endpoint"
                );
                return (false, StatusCounts::default());
            }
        };

        let bytes = body.read_all().await;
        drop(body);

        let snapshot = match bytes
            .map_err(|e| e.to_string())
            .and_then(|b| MembershipSnapshot::from_slice(&b).map_err(|e| e.to_string()))
        {
            Ok(snapshot) => snapshot,
            Err(e) => {
                self.exporter.parse_failures.inc();
                warn!(
                    uri = %self.fetcher.uri(),
                    error = %e,
                    "Can't decode akka cluster members"
                );
                return (true, StatusCounts::default());
            }
        };

        let counts = snapshot.status_counts();
        debug!(
            members = snapshot.members.len(),
            counted = counts.total(),
            leader = %snapshot.leader,
            "Collected cluster membership"
        );

        (true, counts)
    }

    /// Summary of the last completed cycle, without waiting for a running one.
    pub fn last_scrape(&self) -> Option<ScrapeSummary> {
        *self.last_scrape.read()
    }

    /// Get collector statistics.
    pub fn stats(&self) -> CollectorStats {
        CollectorStats {
            scrapes: self.exporter.scrapes.get(),
            fetch_failures: self.exporter.fetch_failures.get(),
            parse_failures: self.exporter.parse_failures.get(),
        }
    }
}

/// Create a shareable collector handle.
pub type SharedCollector = Arc<ClusterCollector>;
