//! Prometheus metric definitions for Akka cluster membership.
//!
//! Every metric the exporter publishes is declared here and registered on a
//! `prometheus-client` [`Registry`]. With the default `akka` namespace the
//! exposition looks like:
//!
//! ```text
//! akka_up 1
//! akka_current_members{status="Up"} 3
//! akka_current_members{status="Down"} 0
//! ...
//! ```

use akka_cluster_common::{MemberStatus, StatusCounts};
use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::metrics::info::Info;
use prometheus_client::registry::Registry;

/// Liveness gauge name (without namespace).
pub const UP_METRIC: &str = "up";

/// Per-status member gauge name (without namespace).
pub const MEMBERS_METRIC: &str = "current_members";

/// Build info metric name. The encoder appends `_info`.
pub const BUILD_INFO_METRIC: &str = "akka_cluster_http_management_exporter_build";

/// Label carrying the member status.
pub const STATUS_LABEL: &str = "status";

/// Check that a namespace is usable as a metric name prefix.
///
/// Namespaces must match `[a-zA-Z_][a-zA-Z0-9_]*`.
pub fn is_valid_namespace(namespace: &str) -> bool {
    let mut chars = namespace.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Build a full Prometheus metric name from a namespace and a name.
///
/// Format: `{namespace}_{name}`
pub fn build_metric_name(namespace: &str, name: &str) -> String {
    if namespace.is_empty() {
        name.to_string()
    } else {
        format!("{}_{}", namespace, name)
    }
}

/// Label set of the per-status member gauge.
#[derive(Debug, Clone, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct StatusLabels {
    pub status: String,
}

impl From<MemberStatus> for StatusLabels {
    fn from(status: MemberStatus) -> Self {
        Self {
            status: status.as_str().to_string(),
        }
    }
}

/// Metrics describing the cluster as seen by the last collection cycle.
///
/// Only mutated by the collector while it holds its cycle lock.
#[derive(Debug, Clone, Default)]
pub struct ClusterMetrics {
    up: Gauge,
    members: Family<StatusLabels, Gauge>,
}

impl ClusterMetrics {
    /// Register the cluster metrics under `namespace`.
    pub fn register(registry: &mut Registry, namespace: &str) -> Self {
        let metrics = Self::default();
        registry.register(
            build_metric_name(namespace, UP_METRIC),
            "Was the last scrape of akka http management endpoint successful",
            metrics.up.clone(),
        );
        registry.register(
            build_metric_name(namespace, MEMBERS_METRIC),
            "Current number of members of the akka cluster",
            metrics.members.clone(),
        );
        metrics
    }

    /// Zero every status series.
    pub fn reset(&self) {
        for status in MemberStatus::ALL {
            self.members.get_or_create(&status.into()).set(0);
        }
    }

    /// Publish the outcome of one cycle. All six status series are written.
    pub fn set(&self, up: bool, counts: &StatusCounts) {
        self.up.set(i64::from(up));
        for (status, count) in counts.iter() {
            self.members
                .get_or_create(&status.into())
                .set(i64::try_from(count).unwrap_or(i64::MAX));
        }
    }

    /// Current value of the liveness gauge.
    #[cfg(test)]
    pub fn up(&self) -> i64 {
        self.up.get()
    }

    /// Current value of one status series.
    #[cfg(test)]
    pub fn members(&self, status: MemberStatus) -> i64 {
        self.members.get_or_create(&status.into()).get()
    }
}

/// Counters describing the exporter itself.
#[derive(Debug, Clone, Default)]
pub struct ExporterMetrics {
    pub scrapes: Counter,
    pub fetch_failures: Counter,
    pub parse_failures: Counter,
}

impl ExporterMetrics {
    /// Register the exporter counters under `namespace`.
    ///
    /// The encoder appends `_total` to each name.
    pub fn register(registry: &mut Registry, namespace: &str) -> Self {
        let metrics = Self::default();
        registry.register(
            build_metric_name(namespace, "exporter_scrapes"),
            "Number of collection cycles run against the akka http management endpoint",
            metrics.scrapes.clone(),
        );
        registry.register(
            build_metric_name(namespace, "exporter_fetch_failures"),
            "Number of collection cycles whose fetch failed",
            metrics.fetch_failures.clone(),
        );
        registry.register(
            build_metric_name(namespace, "exporter_parse_failures"),
            "Number of collection cycles whose members payload could not be read or decoded",
            metrics.parse_failures.clone(),
        );
        metrics
    }
}

/// Register the exporter build info metric.
pub fn register_build_info(registry: &mut Registry) {
    let info = Info::new(vec![(
        "version".to_string(),
        env!("CARGO_PKG_VERSION").to_string(),
    )]);
    registry.register(
        BUILD_INFO_METRIC,
        "A metric with a constant '1' value labeled by the exporter version",
        info,
    );
}
