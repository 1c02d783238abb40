//! Correlation of snapshot lifecycle events into per-container layer timelines.
//!
//! containerd reports the start (`/snapshot/prepare`) and the end (`/snapshot/commit`) of
//! every layer it unpacks, keyed by an ephemeral key. Once committed, a layer is known by
//! its name, and later preparations reference it as their parent. When a container is
//! created, its rootfs preparation (keyed by the container id) points at the topmost layer
//! of its image, from which the chain is walked down to the base layer.
//!
//! # Key Components
//!
//! - [`CorrelationStore`] — in-flight and completed preparations.
//! - [`Correlator`] — classifies events, updates the store and reports timelines.
//! - [`reconstruct`] — walks the parent chain of a container's rootfs preparation.
mod correlator;
mod store;
mod timeline;

pub use correlator::Correlator;
pub use store::{
    CompletedPreparation, CorrelationStore, Eviction, PreparationRecord, RetentionPolicy,
};
pub use timeline::{ImageTimeline, LayerTiming, image_label, reconstruct};

#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    #[error("parent chain of container `{container_id}` revisits layer `{name}`")]
    Cycle { container_id: String, name: String },
}
