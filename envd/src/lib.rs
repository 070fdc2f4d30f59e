//! Environment daemon: a process-wide action registry served over HTTP,
//! plus the client used by agents to discover and invoke actions
//! remotely.

pub mod api;
pub mod client;
pub mod config;
pub mod registry;
pub mod std_actions;
