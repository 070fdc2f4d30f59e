//! Agent daemon: drives a multi-step agent task to completion and
//! streams every intermediate step to live observers over WebSocket.
//!
//! The reasoning backend is an external collaborator behind the
//! [`runner::TaskRunner`] seam; this crate owns the run lifecycle,
//! ordering, fan-out, and reset semantics.

pub mod api;
pub mod broadcast;
pub mod callbacks;
pub mod config;
pub mod listen;
pub mod orchestrator;
pub mod runner;
