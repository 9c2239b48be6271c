//! Prometheus exporter for Akka Cluster HTTP Management.
//!
//! This crate polls the cluster `/members` route of Akka Management on every
//! Prometheus scrape and exposes member counts per status via an HTTP
//! `/metrics` endpoint.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌─────────────────┐     ┌─────────────────┐
//! │ Akka Management │<────│    Collector    │<────│   HTTP Server   │
//! │   (/members)    │     │  (aggregation)  │     │   (/metrics)    │
//! └─────────────────┘     └─────────────────┘     └─────────────────┘
//! ```
//!
//! Each request to `/metrics` runs exactly one fetch. Cycles are serialized by
//! the collector; an unreachable cluster is reported as `akka_up 0` rather than
//! as a failed scrape.
//!
//! # Usage
//!
//! ```bash
//! akka-cluster-exporter --scrape-uri http://localhost:19999/members
//! akka-cluster-exporter --config config.json5
//! ```
//!
//! # Configuration
//!
//! See [`config::ExporterConfig`] for configuration options.

pub mod collector;
pub mod config;
pub mod fetcher;
pub mod http;
pub mod mapping;

pub use collector::{ClusterCollector, CollectorStats, Scrape, SharedCollector};
pub use config::ExporterConfig;
pub use fetcher::{FetchError, Fetcher, HttpFetcher};
pub use http::HttpServer;
