// crates/epe-store/src/lib.rs
//
// epe-store: Witness/annotation store backends for the Edition Production Environment.
//
// Provides the reqwest client for the REST store, an in-memory store with the
// same observable behaviour (offline use and tests), and the per-action
// in-flight registry used to supersede stale remote requests.

pub mod http;
pub mod inflight;
pub mod memory;

// Re-export key types for ergonomic access from downstream crates.
pub use http::HttpEditionStore;
pub use inflight::InFlightRegistry;
pub use memory::InMemoryEditionStore;
