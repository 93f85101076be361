//! Core domain types
//!
//! This module contains the domain structures used across dealscope crates.
//! They are shared between the server (which produces them) and the CLI
//! (which renders them).

pub mod deal;
pub mod job;
pub mod report;
