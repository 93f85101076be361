//! Repository Module
//!
//! Seams between the services and the upstream CRM.

pub mod crm;

pub use crm::{CrmRepository, HttpCrmRepository};
