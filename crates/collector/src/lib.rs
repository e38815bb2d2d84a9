//! `vitals-collector` library crate.
//!
//! Batches Core Web Vitals observations from a page context and delivers
//! them to the ingestion service. The daemon entrypoint lives in `main.rs`.

pub mod collector;
pub mod config;
pub mod environment;
pub mod lifecycle;
pub mod source;
pub mod transport;

pub use collector::{configure, Collector, CollectorSession, CollectorState, FlushOutcome};
pub use config::{CollectorConfig, HostConfig};
pub use environment::PageEnvironment;
pub use lifecycle::{LifecycleEvent, PageLifecycle};
pub use source::{ChannelSource, Observation, StdinSource, VitalsSource};
pub use transport::{HttpTransport, Transport, TransportError};
