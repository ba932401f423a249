pub mod config;
pub mod error;
pub mod logging;
pub mod types;

pub use config::{RegistryConfig, Retention, SnapshotConfig, SnapshotMode};
pub use error::{Error, Result};
pub use types::{
    format_ref, is_ref_string, BoundingBox, PageInfo, RefInfo, SnapshotMetadata, SnapshotQuality,
    SnapshotResult, Viewport, EMPTY_SNAPSHOT_MARKER, REF_PREFIX,
};
