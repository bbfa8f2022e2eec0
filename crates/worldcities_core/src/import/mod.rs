//! Bulk import of the countries/cities dataset.
//!
//! # Responsibility
//! - Accept pre-parsed source rows (the file format is the driver's concern).
//! - Reconcile them against the store, inserting only genuinely new records.
//!
//! # Invariants
//! - Indexes live only for the duration of one run.
//! - Countries commit before cities; a city phase failure never rolls back
//!   committed countries.

pub mod index;
pub mod reconcile;
pub mod source;
