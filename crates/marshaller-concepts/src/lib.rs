//! Concept Repository for the semantic marshaller.
//!
//! Holds concepts, characteristics, functions and aspects fetched from the
//! device/concept registry and answers membership and ancestry queries from
//! an in-memory snapshot that is rebuilt on a fixed timer.
//!
//! ```text
//! RegistryClient ──load()──▶ ConceptSnapshot ──swap──▶ ConceptRepository
//!   (HTTP / in-memory)        (built off-lock)          (RwLock<Arc<_>>)
//! ```

pub mod builtin;
pub mod client;
pub mod fixtures;
pub mod memory;
pub mod repository;
pub mod snapshot;

pub use client::{HttpRegistryClient, RegistryClient};
pub use memory::InMemoryRegistry;
pub use repository::ConceptRepository;
pub use snapshot::{ConceptSnapshot, SnapshotStats};
