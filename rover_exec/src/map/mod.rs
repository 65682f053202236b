//! # Map
//!
//! This module implements the [`WorldMap`], the persistent grid of terrain evidence built up by
//! perception over the whole run.

// ------------------------------------------------------------------------------------------------
// MODS
// ------------------------------------------------------------------------------------------------

/// Implements the [`WorldMap`] type
mod world_map;

// ------------------------------------------------------------------------------------------------
// EXPORTS
// ------------------------------------------------------------------------------------------------

pub use world_map::{AttitudeGate, Fidelity, MapError, MapLayer, MapStats, WorldMap};
