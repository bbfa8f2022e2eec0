//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Keep edit front-ends decoupled from storage details.

pub mod city_service;
pub mod country_service;
pub mod duplicate_service;
