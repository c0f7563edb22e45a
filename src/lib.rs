//! Flare Multi-Source Discovery
//!
//! Aggregates several named service-discovery watchers (etcd, DNS, static lists)
//! behind a pluggable resolver, with best-effort lifecycle management and a single
//! revision counter for change notifications.

pub mod config;
pub mod discovery;
pub mod error;
pub mod metrics;
pub mod runtime;

// Re-exports
pub use config::ServiceConfig;
pub use discovery::{
    Backend, BaseResolver, ChangeNotifier, ChildDiscoveryConfig, ChildWatcher, DiscoveryConfig,
    GeneratorConfig, MultiWatcher, Resolver, ResolverBuilder, ResolverConfig, ResolverFactory,
    ResolverMethod, WatcherBuilder, WatcherFactory, WatcherMethod, WatcherSet, WatcherState,
};
pub use error::{
    ComponentFailure, DiscoveryError, ErrorBuilder, ErrorCategory, ErrorCode, LifecyclePhase,
    LifecycleReport, Result,
};
pub use metrics::{Metrics, WatcherMetrics};
pub use runtime::{LifecycleConfig, ServiceContext};
