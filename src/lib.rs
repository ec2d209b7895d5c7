//! Queuedesk — a real-time, multi-tenant service queue engine for small
//! businesses. The core is the queue scheduling and mutation engine
//! (`engine`): enqueue, the action/undo state machine, the FCFS
//! Balancer restructure, break/resume, and read projections, running
//! over a transactional Store under a per-business mutex.

pub mod common;
pub mod config;
pub mod engine;
pub mod kernel;
pub mod server;
pub mod store;

pub use config::Config;
