//! Facing control, kept separate from translation so a strafing agent can
//! watch a look-at target while its velocity points elsewhere. The output
//! is a clamped angular acceleration about the vertical axis driving the
//! yaw towards either the explicit look target or the direction of travel.
//!

use crate::prelude::*;
use bevy::prelude::*;

/// Spring stiffness pulling the yaw onto the desired heading
const ANGULAR_STIFFNESS: f32 = 12.0;
/// Damping on the yaw rate
const ANGULAR_DAMPING: f32 = 5.0;

/// Wrap an angle into `(-PI, PI]`
pub fn wrap_angle(angle: f32) -> f32 {
	let mut wrapped = angle % std::f32::consts::TAU;
	if wrapped > std::f32::consts::PI {
		wrapped -= std::f32::consts::TAU;
	} else if wrapped <= -std::f32::consts::PI {
		wrapped += std::f32::consts::TAU;
	}
	wrapped
}

/// Aligns facing with the look target, or the velocity when no target is
/// set
#[derive(Clone, Copy, Debug, Default)]
pub struct Orientation;

impl SteeringBehavior for Orientation {
	fn desired_steering(&mut self, input: &SteeringInput) -> SteeringOutput {
		let heading = match input.look_target {
			Some(look) => {
				let to_look = (look - input.position).with_y(0.0);
				if to_look.length_squared() > f32::EPSILON {
					Some(to_look)
				} else {
					None
				}
			}
			None => {
				let planar = input.velocity.with_y(0.0);
				if planar.length_squared() > f32::EPSILON {
					Some(planar)
				} else {
					None
				}
			}
		};
		let Some(heading) = heading else {
			return SteeringOutput::default();
		};
		let desired_yaw = heading.x.atan2(heading.z);
		let error = wrap_angle(desired_yaw - input.yaw);
		let angular_acceleration = (error * ANGULAR_STIFFNESS
			- input.angular_velocity * ANGULAR_DAMPING)
			.clamp(
				-input.params.max_angular_acceleration,
				input.params.max_angular_acceleration,
			);
		SteeringOutput {
			acceleration: Vec3::ZERO,
			angular_acceleration,
			has_arrived: false,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn input<'a>(
		params: &'a NavAgentParams,
		velocity: Vec3,
		yaw: f32,
		look_target: Option<Vec3>,
	) -> SteeringInput<'a> {
		SteeringInput {
			position: Vec3::ZERO,
			velocity,
			yaw,
			angular_velocity: 0.0,
			delta_time: 0.1,
			params,
			target: None,
			destination: None,
			look_target,
			neighbours: &[],
			terrain: None,
		}
	}
	#[test]
	fn aligns_with_velocity() {
		let params = NavAgentParams::default();
		let mut orientation = Orientation;
		// facing +z, moving +x, expect a positive turn
		let out = orientation.desired_steering(&input(&params, Vec3::new(3.0, 0.0, 0.0), 0.0, None));
		assert!(out.angular_acceleration > 0.0);
	}
	#[test]
	fn look_target_overrides_velocity() {
		let params = NavAgentParams::default();
		let mut orientation = Orientation;
		// moving +x but watching a target on -x
		let out = orientation.desired_steering(&input(
			&params,
			Vec3::new(3.0, 0.0, 0.0),
			0.0,
			Some(Vec3::new(-5.0, 0.0, 0.0)),
		));
		assert!(out.angular_acceleration < 0.0);
	}
	#[test]
	fn stationary_without_look_target_holds_facing() {
		let params = NavAgentParams::default();
		let mut orientation = Orientation;
		let out = orientation.desired_steering(&input(&params, Vec3::ZERO, 1.2, None));
		assert_eq!(0.0, out.angular_acceleration);
	}
	#[test]
	fn clamped_to_max_angular_acceleration() {
		let params = NavAgentParams {
			max_angular_acceleration: 2.0,
			..Default::default()
		};
		let mut orientation = Orientation;
		// a half-turn error wants far more than the clamp allows
		let out = orientation.desired_steering(&input(
			&params,
			Vec3::new(0.0, 0.0, -3.0),
			0.0,
			None,
		));
		assert!(out.angular_acceleration.abs() <= 2.0);
	}
	#[test]
	fn wrap_angle_stays_in_range() {
		for multiple in -3..=3 {
			let angle = multiple as f32 * 2.3;
			let wrapped = wrap_angle(angle);
			assert!(wrapped > -std::f32::consts::PI - f32::EPSILON);
			assert!(wrapped <= std::f32::consts::PI + f32::EPSILON);
		}
	}
}
