//! Seek-with-arrival: accelerate towards the active target at full speed
//! until the remaining distance to the destination drops inside the
//! slowing distance, then bleed speed off so the agent coasts to rest on
//! the spot instead of orbiting it.
//!
//! The slowing distance is not a tunable: it falls out of the kinematics,
//! `v^2 = u^2 + 2ad`, as the distance needed to shed the current speed at
//! maximum deceleration.
//!

use crate::prelude::*;
use bevy::prelude::*;

/// An agent closer to its destination than this has arrived, roughly a
/// centimetre
pub const ARRIVAL_EPSILON: f32 = 0.01;

/// Shape of the deceleration ramp inside the slowing distance
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum DecelerationCurve {
	/// Speed proportional to remaining distance
	#[default]
	Linear,
	/// Speed falls away logarithmically, braking harder early and easing
	/// into the stop
	Logarithmic,
}

/// Steers towards the active target, decelerating over the auto-derived
/// slowing distance as the destination nears
#[derive(Clone, Copy, Debug, Default)]
pub struct Arrival {
	/// Ramp shape
	curve: DecelerationCurve,
}

impl Arrival {
	/// Create a new instance of [Arrival] with a given ramp shape
	pub fn new(curve: DecelerationCurve) -> Self {
		Arrival { curve }
	}
	/// Desired speed inside the slowing distance
	fn ramp_speed(&self, max_speed: f32, distance: f32, slowing_distance: f32) -> f32 {
		match self.curve {
			DecelerationCurve::Linear => max_speed * (distance / slowing_distance),
			DecelerationCurve::Logarithmic => {
				max_speed * ((1.0 + distance).ln() / (1.0 + slowing_distance).ln())
			}
		}
	}
}

impl SteeringBehavior for Arrival {
	fn desired_steering(&mut self, input: &SteeringInput) -> SteeringOutput {
		let Some(destination) = input.destination else {
			return SteeringOutput::default();
		};
		let params = input.params;
		let dt = input.delta_time.max(f32::EPSILON);
		let to_destination = (destination - input.position).with_y(0.0);
		let distance = to_destination.length();
		if distance <= ARRIVAL_EPSILON {
			// at the spot: pure deceleration to rest, no further forward drive
			let braking = (-input.velocity.with_y(0.0) / dt)
				.clamp_length_max(params.max_deceleration);
			return SteeringOutput {
				acceleration: braking,
				angular_acceleration: 0.0,
				has_arrived: true,
			};
		}
		// steer at the active target, which may be a path node well short
		// of the destination
		let target = input.target.unwrap_or(destination);
		let to_target = (target - input.position).with_y(0.0);
		let direction = if to_target.length_squared() > f32::EPSILON {
			to_target.normalize()
		} else {
			return SteeringOutput::default();
		};
		let speed = input.velocity.with_y(0.0).length();
		// distance needed to shed the current speed at maximum deceleration
		let slowing_distance = (speed * speed) / (2.0 * params.max_deceleration);
		let desired_speed = if distance < slowing_distance && slowing_distance > f32::EPSILON {
			self.ramp_speed(params.max_speed, distance, slowing_distance)
		} else {
			params.max_speed
		};
		let desired_velocity = direction * desired_speed.min(params.max_speed);
		let acceleration = ((desired_velocity - input.velocity.with_y(0.0)) / dt)
			.clamp_length_max(params.max_acceleration.max(params.max_deceleration));
		SteeringOutput {
			acceleration,
			angular_acceleration: 0.0,
			has_arrived: false,
		}
	}
}
