//! Systems driving [NavAgent] entities each tick: issuing and replanning
//! requests, consuming routes, running the steering pipeline and posting
//! navigation events. Transforms are never written here - the host reads
//! [DesiredMotion] and integrates it into its own motion state.
//!

use std::time::Duration;

use crate::prelude::*;
use bevy::prelude::*;

/// How long near-zero progress is tolerated while following before the
/// agent is reported stuck
const STUCK_TIMEOUT: Duration = Duration::from_secs(2);
/// Fraction of top speed below which an agent counts as making no progress
const STUCK_SPEED_FRACTION: f32 = 0.05;

/// Host-owned motion state mirrored onto the agent entity every tick.
/// The plugin reads it, never writes it
#[derive(Component, Default, Clone, Copy)]
pub struct AgentMotion {
	/// Current velocity
	pub velocity: Vec3,
	/// Current yaw about the vertical axis
	pub yaw: f32,
	/// Current yaw rate
	pub angular_velocity: f32,
	/// Body radius used when other agents sense this one
	pub radius: f32,
}

/// The steering pipeline's output for the host to integrate
#[derive(Component, Default, Clone, Copy)]
pub struct DesiredMotion {
	/// Commanded linear acceleration
	pub acceleration: Vec3,
	/// Commanded angular acceleration
	pub angular_acceleration: f32,
	/// Whether the agent has arrived and the command is pure braking
	pub has_arrived: bool,
}

/// Issue path requests for agents that need one: freshly ordered journeys,
/// scheduled retries and replans triggered by terrain changes or cadence
pub fn issue_path_requests(
	nav_q: Query<(&NavWorld, &PathRequestQueue)>,
	mut agent_q: Query<(Entity, &Transform, &mut NavAgent)>,
	time: Res<Time>,
) {
	let Ok((world, queue)) = nav_q.single() else {
		return;
	};
	let now = time.elapsed();
	for (entity, transform, mut agent) in agent_q.iter_mut() {
		let Some(leg_target) = agent.current_leg_target() else {
			continue;
		};
		let position = transform.translation;
		let wants_request = match agent.get_state() {
			SteeringState::Planning => {
				// fresh order, or a retry whose backoff has elapsed
				agent.get_pending().is_none()
					&& agent.get_retry_at().is_none_or(|at| now >= at)
			}
			SteeringState::Following => {
				let min_elapsed =
					now.saturating_sub(agent.get_last_plan()) >= agent.get_min_replan_interval();
				min_elapsed
					&& match agent.get_replan() {
						ReplanMode::Disabled => false,
						ReplanMode::FixedInterval(interval) => {
							now.saturating_sub(agent.get_last_plan()) >= interval
						}
						ReplanMode::Dynamic => world
							.find_cell_at(position)
							.and_then(|(grid_id, _)| world.get_grid(grid_id))
							.is_some_and(|grid| {
								grid.get_matrix()
									.has_sections_changed_since(position, agent.get_last_plan())
							}),
					}
			}
			_ => false,
		};
		if !wants_request {
			continue;
		}
		agent.set_retry_at(None);
		let options = agent.build_request_options();
		let request = PathRequest::new(
			position,
			leg_target,
			RequesterId::new(entity.to_bits()),
			options,
			now,
		);
		trace!("Issuing path request for {:?} to {:?}", entity, leg_target);
		let handle = queue.queue_request(request);
		agent.begin_planning(handle, now);
	}
}

/// Stop agents whose pending request decayed on its own - deadline passed
/// with no supersession and no retry scheduled
pub fn detect_decayed_requests(
	mut agent_q: Query<(Entity, &mut NavAgent)>,
	mut events: EventWriter<EventNavigation>,
	time: Res<Time>,
) {
	let now = time.elapsed();
	for (entity, mut agent) in agent_q.iter_mut() {
		if agent.get_state() != SteeringState::Planning {
			continue;
		}
		let decayed = agent
			.get_pending()
			.is_some_and(|pending| pending.check_decay_deadline(now));
		if decayed {
			debug!("Request for {:?} decayed unanswered", entity);
			agent.clear_journey();
			events.write(EventNavigation::new(entity, NavEventCode::StoppedRequestDecayed));
		}
	}
}

/// A neighbour snapshot taken before the mutable steering pass
struct SensedAgent {
	/// The sensed entity
	entity: Entity,
	/// Its sensed state
	neighbour: NeighbourAgent,
}

/// The per-tick steering pass: consume route nodes, run the pipeline,
/// write [DesiredMotion] and post navigation events
#[allow(clippy::type_complexity)]
pub fn steer_agents(
	nav_q: Query<(&NavWorld, &PathRequestQueue)>,
	mut agent_q: Query<(
		Entity,
		&Transform,
		&AgentMotion,
		&mut NavAgent,
		&mut DesiredMotion,
	)>,
	mut nav_events: EventWriter<EventNavigation>,
	mut portal_events: EventWriter<EventPortalTransit>,
	time: Res<Time>,
) {
	let Ok((world, _queue)) = nav_q.single() else {
		return;
	};
	let now = time.elapsed();
	let dt = time.delta_secs().max(f32::EPSILON);
	// snapshot every agent before mutating any, avoidance needs to see all
	// of them
	let sensed: Vec<SensedAgent> = agent_q
		.iter()
		.map(|(entity, transform, motion, _, _)| SensedAgent {
			entity,
			neighbour: NeighbourAgent {
				position: transform.translation,
				velocity: motion.velocity,
				radius: motion.radius,
			},
		})
		.collect();
	for (entity, transform, motion, mut agent, mut desired) in agent_q.iter_mut() {
		let position = transform.translation;
		if agent.take_stop_request() {
			agent.clear_journey();
			*desired = DesiredMotion {
				acceleration: (-motion.velocity / dt)
					.clamp_length_max(agent.get_params().max_deceleration),
				..Default::default()
			};
			nav_events.write(EventNavigation::new(entity, NavEventCode::StoppedByRequest));
			continue;
		}
		match agent.get_state() {
			SteeringState::Stopped => {
				*desired = DesiredMotion::default();
				continue;
			}
			SteeringState::Planning => {
				// hold position while the route is computed
				*desired = DesiredMotion {
					acceleration: (-motion.velocity / dt)
						.clamp_length_max(agent.get_params().max_deceleration),
					..Default::default()
				};
				continue;
			}
			SteeringState::Portaling => {
				if agent.portal_transit_done(now) {
					agent.end_portal_transit();
				}
				*desired = DesiredMotion::default();
				continue;
			}
			SteeringState::Following | SteeringState::Arriving => {}
		}
		// an agent knocked off every grid cannot navigate at all
		if world.find_cell_at(position).is_none() {
			warn!("Agent {:?} is outside every grid, stopping it", entity);
			agent.clear_journey();
			*desired = DesiredMotion::default();
			nav_events.write(EventNavigation::new(
				entity,
				NavEventCode::StoppedUnitOutsideGrid,
			));
			continue;
		}
		// consume route nodes the agent has reached
		let node_reached_distance = agent.get_params().arrival_distance.max(0.25);
		loop {
			let Some(front) = agent.get_path().and_then(|path| path.front().copied()) else {
				break;
			};
			if front
				.get_position()
				.with_y(position.y)
				.distance(position) > node_reached_distance
			{
				break;
			}
			let reached = agent
				.get_path_mut()
				.and_then(|path| path.pop_front())
				.expect("Front node existed a moment ago");
			nav_events.write(EventNavigation::new(entity, NavEventCode::NodeReached));
			// a portal node at the new front means the node just reached
			// anchors the transition
			let portal_front = agent
				.get_path()
				.and_then(|path| path.front().copied())
				.filter(|next| next.is_portal());
			if let Some(portal_node) = portal_front {
				let transition = world
					.get_grid(reached.get_grid())
					.and_then(|grid| {
						grid.get_portals().get_portal_from_cell(reached.get_cell())
					})
					.map(|portal| portal.get_transition())
					.unwrap_or_default();
				let until = match transition {
					PortalTransition::Instant => now,
					PortalTransition::Timed(duration) => now + duration,
				};
				// step past the portal node, the transition delivers the
				// agent onto it
				let _ = agent.get_path_mut().and_then(|path| path.pop_front());
				agent.begin_portal_transit(until);
				portal_events.write(EventPortalTransit::new(
					entity,
					portal_node.get_position(),
					transition,
				));
				break;
			}
		}
		if agent.get_state() == SteeringState::Portaling {
			*desired = DesiredMotion::default();
			continue;
		}
		// an exhausted route either resolves the next via-point or enters
		// the final approach
		if agent.get_path().is_some_and(|path| path.is_exhausted()) {
			if agent.get_waypoints().active().is_some() {
				agent.get_waypoints_mut().advance();
				nav_events.write(EventNavigation::new(entity, NavEventCode::WaypointReached));
				agent.set_state(SteeringState::Planning);
				agent.clear_path();
				*desired = DesiredMotion::default();
				continue;
			}
		}
		let destination = agent.get_destination();
		if let Some(destination) = destination {
			let remaining = (destination - position).with_y(0.0).length();
			if remaining <= agent.get_params().arrival_distance {
				agent.set_state(SteeringState::Arriving);
			}
		}
		// assemble the tick input and run the pipeline
		let params = *agent.get_params();
		let target = agent
			.get_path()
			.and_then(|path| path.front())
			.map(|node| node.get_position())
			.or(destination);
		let neighbours: Vec<NeighbourAgent> = sensed
			.iter()
			.filter(|other| other.entity != entity)
			.filter(|other| {
				other.neighbour.position.distance(position) <= params.avoidance_radius
			})
			.map(|other| other.neighbour)
			.collect();
		let grid = world
			.find_cell_at(position)
			.and_then(|(grid_id, _)| world.get_grid(grid_id));
		let terrain_source = grid.map(GridHeightSource::new);
		let look_target = agent.get_look_target();
		let input = SteeringInput {
			position,
			velocity: motion.velocity,
			yaw: motion.yaw,
			angular_velocity: motion.angular_velocity,
			delta_time: dt,
			params: &params,
			target,
			destination,
			look_target,
			neighbours: &neighbours,
			terrain: terrain_source
				.as_ref()
				.map(|source| source as &dyn TerrainSource),
		};
		let output = agent.compute_steering(&input);
		*desired = DesiredMotion {
			acceleration: output.acceleration,
			angular_acceleration: output.angular_acceleration,
			has_arrived: output.has_arrived,
		};
		if output.has_arrived {
			agent.clear_journey();
			nav_events.write(EventNavigation::new(entity, NavEventCode::DestinationReached));
			continue;
		}
		// stuck watchdog: following yet barely moving
		if agent.get_state() == SteeringState::Following
			&& motion.velocity.with_y(0.0).length() < params.max_speed * STUCK_SPEED_FRACTION
		{
			match agent.get_stuck_since() {
				None => agent.set_stuck_since(Some(now)),
				Some(since) if now.saturating_sub(since) >= STUCK_TIMEOUT => {
					nav_events.write(EventNavigation::new(entity, NavEventCode::Stuck));
					agent.set_stuck_since(Some(now));
				}
				Some(_) => {}
			}
		} else {
			agent.set_stuck_since(None);
		}
	}
}
