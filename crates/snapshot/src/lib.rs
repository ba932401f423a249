//! DomLens snapshot engine.
//!
//! Turns a live document tree into a compact text snapshot with stable
//! `@ref:<n>` handles, and resolves those handles (or structural selectors)
//! back to elements for command dispatch. See `domlens-dom` for the tree
//! the engine walks and `domlens-core` for configuration and result types.

pub mod builder;
pub mod registry;
pub mod resolver;
pub mod roles;
pub mod session;
pub mod visibility;
pub mod wait;

pub use builder::{build_snapshot, build_snapshot_from};
pub use registry::RefRegistry;
pub use resolver::resolve;
pub use session::SnapshotSession;
pub use visibility::{StyleVisibility, VisibilityProbe};
pub use wait::{wait_for, WaitConfig, WaitOutcome};
