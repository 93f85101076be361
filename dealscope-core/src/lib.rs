//! Dealscope Core
//!
//! Core types shared by the dealscope services.
//!
//! This crate contains:
//! - Domain types: deals, custom field values, job progress, report rows
//! - DTOs: request/response bodies exchanged between the server and its clients
//! - The aggregator that turns per-deal custom fields into report rows

pub mod aggregate;
pub mod domain;
pub mod dto;

pub use aggregate::aggregate_results;
