//! Reference-data domain model for countries and cities.
//!
//! # Responsibility
//! - Define canonical data structures used by import and edit flows.
//! - Own the natural-key rules both write paths share.
//!
//! # Invariants
//! - Every persisted record is identified by a store-assigned integer id.
//! - Natural-key equality is defined only in [`natural_key`].

pub mod city;
pub mod coordinate;
pub mod country;
pub mod natural_key;
pub mod validation;
