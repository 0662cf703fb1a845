//! Core service modules
//!
//! Contains the transmit pipeline, timeout registry, and interrupt
//! dispatch, plus the configuration and concurrency primitives they
//! share.

pub mod config;
pub mod critical;
pub mod dispatch;
pub mod error;
pub mod ring;
pub mod serial;
pub mod timeout;
pub mod types;
