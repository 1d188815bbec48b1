// crates/milestone-config/src/lib.rs
// ============================================================================
// Module: Milestone Config Library
// Description: Configuration model and validation for milestone.toml.
// Purpose: Single source of truth for milestone.toml semantics.
// Dependencies: milestone-core, milestone-store-sqlite, serde, toml
// ============================================================================

//! ## Overview
//! `milestone-config` defines the configuration model for the milestone grid
//! services. It provides strict, fail-closed validation and converts the
//! validated sections into the runtime configs used by `milestone-core` and
//! `milestone-store-sqlite`.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
