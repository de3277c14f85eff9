//! `winecap` runtime library.
//!
//! A capsule pairs a read-only game bundle with a sibling `<bundle>.home/`
//! state directory holding the Wine prefix, shader caches, and a metadata
//! document. This crate holds the parts with real decisions in them:
//! host provisioning (`winecap-setup`) and capsule launching (`winecap-run`).
//! Bundling, compression, and the drag-and-drop GUI live elsewhere.
//!
//! Invariants:
//! - the home directory name is derived deterministically from the bundle
//!   file name, and the two always share a parent directory
//! - capsule initialization happens at most once and is permanent
//! - runtime package selection is order-preserving and tier-ordered, never
//!   fuzzy
//! - the child's exit code is returned unchanged

pub mod capsule;
pub mod error;
pub mod feed;
pub mod fetch;
pub mod host;
pub mod launch;
pub mod lock;
pub mod pm;
pub mod provision;
pub mod resolve;
