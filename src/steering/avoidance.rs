//! Local avoidance of other moving agents. Each sensed neighbour inside
//! the field-of-view cone (or inside the omni-aware radius, facing be
//! damned) is extrapolated a short way into the future and contributes a
//! repulsion falling off with the square of the distance. The combined
//! push is a blend of the average and the single strongest repulsion - a
//! plain sum would send an agent wildly sideways the moment a crowd of
//! distant neighbours appeared, while the blend keeps the response
//! dominated by whoever is actually about to be collided with.
//!

use crate::prelude::*;
use bevy::prelude::*;

/// Blend factor between the average repulsion and the strongest single
/// repulsion, `1.0` being strongest-only
const STRONGEST_REPULSION_BIAS: f32 = 0.5;

/// A nearby mobile agent as sensed this tick
#[derive(Clone, Copy, Debug)]
pub struct NeighbourAgent {
	/// Where the neighbour is
	pub position: Vec3,
	/// How the neighbour is moving
	pub velocity: Vec3,
	/// The neighbour's body radius
	pub radius: f32,
}

/// Steers away from sensed neighbours on a short prediction horizon
#[derive(Clone, Copy, Debug, Default)]
pub struct NeighbourAvoidance;

impl SteeringBehavior for NeighbourAvoidance {
	fn desired_steering(&mut self, input: &SteeringInput) -> SteeringOutput {
		let params = input.params;
		let speed = input.velocity.with_y(0.0).length();
		let facing = if speed > f32::EPSILON {
			input.velocity.with_y(0.0) / speed
		} else {
			Vec3::new(input.yaw.sin(), 0.0, input.yaw.cos())
		};
		let fov_cos = params.fov_half_angle.cos();
		let mut sum = Vec3::ZERO;
		let mut strongest = Vec3::ZERO;
		let mut strongest_magnitude = 0.0;
		let mut count = 0;
		for neighbour in input.neighbours.iter() {
			let offset = (neighbour.position - input.position).with_y(0.0);
			let distance = offset.length();
			if distance <= f32::EPSILON || distance > params.avoidance_radius {
				continue;
			}
			let in_cone = facing.dot(offset / distance) >= fov_cos;
			let omni_aware = distance <= params.omni_radius;
			if !in_cone && !omni_aware {
				continue;
			}
			// predict a little way ahead: time to cover half the gap at the
			// current closing speed, capped so distant neighbours aren't
			// extrapolated into fiction
			let horizon = if speed > f32::EPSILON {
				(distance / speed * 0.5).min(params.avoidance_horizon)
			} else {
				0.0
			};
			let future = neighbour.position + neighbour.velocity * horizon;
			let away = (input.position - future).with_y(0.0);
			let gap = (away.length() - neighbour.radius).max(ARRIVAL_EPSILON);
			if away.length_squared() <= f32::EPSILON {
				continue;
			}
			let repulsion = away.normalize() / (gap * gap);
			let magnitude = repulsion.length();
			if magnitude > strongest_magnitude {
				strongest_magnitude = magnitude;
				strongest = repulsion;
			}
			sum += repulsion;
			count += 1;
		}
		if count == 0 {
			return SteeringOutput::default();
		}
		let average = sum / count as f32;
		let blended = average.lerp(strongest, STRONGEST_REPULSION_BIAS);
		let acceleration = (blended * params.max_acceleration)
			.clamp_length_max(params.max_acceleration);
		SteeringOutput {
			acceleration,
			angular_acceleration: 0.0,
			has_arrived: false,
		}
	}
}
