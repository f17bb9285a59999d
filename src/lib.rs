//! This is a plugin for Bevy game engine to setup and handle the logic for grid-based pathfinding and steering of mobile agents
//!

pub mod navgrid;
pub mod pathing;
pub mod steering;
pub mod bundle;
pub mod plugin;

pub mod prelude;
