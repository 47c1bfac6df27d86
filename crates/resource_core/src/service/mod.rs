//! Resource use-case services.
//!
//! # Responsibility
//! - Declare the site catalog and resolve table names to descriptors.
//! - Orchestrate repository calls into request-level APIs.

pub mod catalog;
pub mod registry;
pub mod resource_service;
