//! # Rover library.
//!
//! Perception and decision core of the sample return rover. Each control cycle the executable
//! passes a camera frame and the [`state::RoverState`] through [`per::PerMgr`], then the state
//! through [`decision::DecisionMgr`], and acts on the demands left in the state.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Decision module - picks the driving mode and drive demands from the perceived terrain
pub mod decision;

/// Map module - accumulates terrain evidence into the world map
pub mod map;

/// Perception module - converts camera images into terrain evidence
pub mod per;

/// Rover state shared between the perception and decision modules
pub mod state;
