//! Encode/decode pipeline coordinators
//!
//! The encode side buffers chunks and drives the QR generator and video
//! encoder with capacity and ordering guarantees; the decode side reverses
//! the pipeline with best-effort per-frame recovery.

pub mod decode;
pub mod encode;

pub use decode::DecodeCoordinator;
pub use encode::{BuildReport, CoordinatorStats, EncodeCoordinator, EncodeState};
