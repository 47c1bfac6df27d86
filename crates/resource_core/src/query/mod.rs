//! Statement construction from untrusted request shapes.
//!
//! # Responsibility
//! - Whitelist identifiers against a descriptor (`ident`).
//! - Translate filter maps into bound predicates (`filter`).
//! - Coerce sort/page requests (`page`).
//! - Assemble parameterized statements (`builder`).
//!
//! # Invariants
//! - Nothing here touches a store; every failure is a `ValidationError`
//!   raised before a statement exists.

pub mod builder;
pub mod filter;
pub mod ident;
pub mod page;
