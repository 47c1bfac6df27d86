//! Adapter data model.
//!
//! # Responsibility
//! - Define scalar values, static table declarations and generic records.
//! - Keep trusted declarations (`TableDescriptor`) separate from untrusted
//!   per-call inputs (`FilterMap`, `Payload`).
//!
//! # Invariants
//! - Descriptors are validated once and never built from request input.
//! - Records only expose the primary key and declared columns.

pub mod descriptor;
pub mod record;
pub mod value;
