//! `use bevy_nav_grid_plugin::prelude::*;` to import common structures and methods
//!

#[doc(hidden)]
pub use crate::navgrid::{
	cell::*,
	cell_matrix::*,
	height::{dictionary::*, quadtree::*, *},
	portal::*,
	utilities::*,
	*,
};

#[doc(hidden)]
pub use crate::pathing::{
	engine::*, jump_point::*, open_set::*, path::*, providers::*, queue::*, smoothing::*,
};

#[doc(hidden)]
pub use crate::steering::{
	arrival::*, avoidance::*, orientation::*, processors::*, terrain::*, waypoints::*, *,
};

#[doc(hidden)]
pub use crate::{
	bundle::*,
	plugin::{request_layer::*, steer_layer::*, *},
};
