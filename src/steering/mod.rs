//! Per-tick conversion of a planned route plus local sensing into bounded
//! acceleration commands. Behaviours are small single-purpose values
//! implementing [SteeringBehavior] and composed in an ordered
//! [SteeringPipeline] - arrival drives along the route, avoidance shoves
//! away from other agents, terrain following rides the ground, orientation
//! turns the body - and their outputs are summed and clamped into one
//! command.
//!
//! The pipeline never writes a transform. It produces desired linear and
//! angular acceleration for the host's own integration to apply.
//!

pub mod arrival;
pub mod avoidance;
pub mod orientation;
pub mod processors;
pub mod terrain;
pub mod waypoints;

use std::sync::Arc;
use std::time::Duration;

use crate::prelude::*;
use bevy::prelude::*;

/// Motion capabilities and sensing envelope of an agent
#[derive(Clone, Copy, Debug)]
pub struct NavAgentParams {
	/// Movement classes the agent can traverse
	pub capabilities: AttributeMask,
	/// Clearance radius the agent needs to occupy a cell
	pub clearance: f32,
	/// Top speed, world units per second
	pub max_speed: f32,
	/// Strongest forward/lateral acceleration
	pub max_acceleration: f32,
	/// Strongest braking deceleration
	pub max_deceleration: f32,
	/// Strongest turn acceleration, radians per second squared
	pub max_angular_acceleration: f32,
	/// Distance from the destination at which the agent is considered to be
	/// arriving and stops issuing replans
	pub arrival_distance: f32,
	/// Steepest grade the agent will follow, radians
	pub max_climb_angle: f32,
	/// Rise the agent steps over without treating it as a grade at all
	pub step_height: f32,
	/// Half-angle of the forward sensing cone, radians
	pub fov_half_angle: f32,
	/// Neighbours closer than this register regardless of facing
	pub omni_radius: f32,
	/// Neighbours beyond this are not sensed at all
	pub avoidance_radius: f32,
	/// Cap on how far ahead a neighbour's motion is extrapolated, seconds
	pub avoidance_horizon: f32,
}

impl Default for NavAgentParams {
	fn default() -> Self {
		NavAgentParams {
			capabilities: AttributeMask::GROUND,
			clearance: 0.5,
			max_speed: 4.0,
			max_acceleration: 8.0,
			max_deceleration: 12.0,
			max_angular_acceleration: 10.0,
			arrival_distance: 0.5,
			max_climb_angle: std::f32::consts::FRAC_PI_4,
			step_height: 0.4,
			fov_half_angle: std::f32::consts::FRAC_PI_3,
			omni_radius: 1.5,
			avoidance_radius: 8.0,
			avoidance_horizon: 1.0,
		}
	}
}

/// Everything a behaviour may consult in one tick. Assembled by the caller,
/// never stored - behaviours hold only their own private state between
/// ticks
pub struct SteeringInput<'a> {
	/// Agent position
	pub position: Vec3,
	/// Agent velocity
	pub velocity: Vec3,
	/// Agent yaw about the vertical axis
	pub yaw: f32,
	/// Agent yaw rate
	pub angular_velocity: f32,
	/// Tick length in seconds
	pub delta_time: f32,
	/// The agent's capabilities and sensing envelope
	pub params: &'a NavAgentParams,
	/// The route node or waypoint currently steered at
	pub target: Option<Vec3>,
	/// The final destination of the whole journey
	pub destination: Option<Vec3>,
	/// Explicit facing target overriding velocity alignment
	pub look_target: Option<Vec3>,
	/// Mobile agents sensed nearby this tick
	pub neighbours: &'a [NeighbourAgent],
	/// Height source for terrain following, [None] on flat worlds
	pub terrain: Option<&'a dyn TerrainSource>,
}

/// One behaviour's desired contribution to the tick
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SteeringOutput {
	/// Desired linear acceleration
	pub acceleration: Vec3,
	/// Desired angular acceleration about the vertical axis
	pub angular_acceleration: f32,
	/// Raised by arrival when the agent is on its destination
	pub has_arrived: bool,
}

/// A single composable steering concern
pub trait SteeringBehavior: Send + Sync {
	/// Compute this behaviour's desired contribution for the tick
	fn desired_steering(&mut self, input: &SteeringInput) -> SteeringOutput;
}

/// An ordered list of behaviours whose contributions are summed and
/// clamped into one bounded command
pub struct SteeringPipeline {
	/// The behaviours in evaluation order
	behaviours: Vec<Box<dyn SteeringBehavior>>,
}

impl Default for SteeringPipeline {
	fn default() -> Self {
		SteeringPipeline {
			behaviours: vec![
				Box::new(Arrival::default()),
				Box::new(NeighbourAvoidance),
				Box::new(TerrainFollowing::default()),
				Box::new(Orientation),
			],
		}
	}
}

impl SteeringPipeline {
	/// Create an empty pipeline to compose by hand
	pub fn empty() -> Self {
		SteeringPipeline {
			behaviours: Vec::new(),
		}
	}
	/// Append a behaviour to the evaluation order
	pub fn with(mut self, behaviour: Box<dyn SteeringBehavior>) -> Self {
		self.behaviours.push(behaviour);
		self
	}
	/// Number of composed behaviours
	pub fn len(&self) -> usize {
		self.behaviours.len()
	}
	/// Whether no behaviour is composed
	pub fn is_empty(&self) -> bool {
		self.behaviours.is_empty()
	}
	/// Run every behaviour and fold the contributions into one bounded
	/// command
	pub fn compute(&mut self, input: &SteeringInput) -> SteeringOutput {
		let mut combined = SteeringOutput::default();
		for behaviour in self.behaviours.iter_mut() {
			let output = behaviour.desired_steering(input);
			combined.acceleration += output.acceleration;
			combined.angular_acceleration += output.angular_acceleration;
			combined.has_arrived |= output.has_arrived;
		}
		let params = input.params;
		let bound = params.max_acceleration.max(params.max_deceleration);
		let vertical = combined.acceleration.y;
		let planar = combined
			.acceleration
			.with_y(0.0)
			.clamp_length_max(bound);
		combined.acceleration = planar.with_y(vertical.clamp(-bound, bound));
		combined.angular_acceleration = combined.angular_acceleration.clamp(
			-params.max_angular_acceleration,
			params.max_angular_acceleration,
		);
		combined
	}
}

/// Lifecycle of a steering-driven agent
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum SteeringState {
	/// No route, no pending request
	#[default]
	Stopped,
	/// A request is in flight
	Planning,
	/// Consuming a route
	Following,
	/// Within arrival distance, coasting to rest
	Arriving,
	/// Paused mid-route while a portal transition executes
	Portaling,
}

/// The steering-driven agent: route state, waypoints, pipeline and the
/// request currently in flight. The component the plugin systems drive
#[derive(Component)]
pub struct NavAgent {
	/// Capabilities and sensing envelope
	params: NavAgentParams,
	/// The composed behaviours
	pipeline: SteeringPipeline,
	/// Lifecycle state
	state: SteeringState,
	/// The one in-flight request, superseded on any new order
	pending: Option<Arc<PathRequest>>,
	/// The route being consumed
	path: Option<Path>,
	/// Via-points not yet resolved into routes
	waypoints: WaypointList,
	/// Final destination of the current journey
	destination: Option<Vec3>,
	/// Explicit facing target
	look_target: Option<Vec3>,
	/// Template for the requests issued on the agent's behalf; capabilities,
	/// clearance and replan mode are overwritten from the agent itself
	request_options: PathRequestOptions,
	/// Replan cadence
	replan: ReplanMode,
	/// Floor on time between replans
	min_replan_interval: Duration,
	/// When the current route was requested
	last_plan: Duration,
	/// Set by a caller asking the agent to halt; consumed by the steering
	/// tick
	stop_requested: bool,
	/// When near-zero progress was first observed while following
	stuck_since: Option<Duration>,
	/// When the in-progress portal transition completes
	portal_until: Option<Duration>,
	/// Earliest time a retry processor may issue a fresh request
	retry_at: Option<Duration>,
	/// Requests re-issued by result processors for the current journey
	retries: u8,
}

impl NavAgent {
	/// Create a new instance of [NavAgent] with the default pipeline
	pub fn new(params: NavAgentParams) -> Self {
		NavAgent {
			params,
			pipeline: SteeringPipeline::default(),
			state: SteeringState::Stopped,
			pending: None,
			path: None,
			waypoints: WaypointList::default(),
			destination: None,
			look_target: None,
			request_options: PathRequestOptions::default(),
			replan: ReplanMode::default(),
			min_replan_interval: Duration::from_millis(500),
			last_plan: Duration::ZERO,
			stop_requested: false,
			stuck_since: None,
			portal_until: None,
			retry_at: None,
			retries: 0,
		}
	}
	/// Replace the composed pipeline
	pub fn with_pipeline(mut self, pipeline: SteeringPipeline) -> Self {
		self.pipeline = pipeline;
		self
	}
	/// Set the replan cadence
	pub fn with_replan(mut self, replan: ReplanMode, min_interval: Duration) -> Self {
		self.replan = replan;
		self.min_replan_interval = min_interval;
		self
	}
	/// Set the request template used when issuing searches for this agent
	pub fn with_request_options(mut self, options: PathRequestOptions) -> Self {
		self.request_options = options;
		self
	}
	/// The options the next request issued for this agent should carry,
	/// with the agent's own capabilities, clearance and replan mode applied
	pub fn build_request_options(&self) -> PathRequestOptions {
		PathRequestOptions {
			capabilities: self.params.capabilities,
			clearance: self.params.clearance,
			replan: self.replan,
			..self.request_options
		}
	}
	/// Get the capabilities and sensing envelope
	pub fn get_params(&self) -> &NavAgentParams {
		&self.params
	}
	/// Get the lifecycle state
	pub fn get_state(&self) -> SteeringState {
		self.state
	}
	/// Set the lifecycle state
	pub fn set_state(&mut self, state: SteeringState) {
		self.state = state;
	}
	/// Get the pipeline
	pub fn get_pipeline_mut(&mut self) -> &mut SteeringPipeline {
		&mut self.pipeline
	}
	/// Get the in-flight request
	pub fn get_pending(&self) -> Option<&Arc<PathRequest>> {
		self.pending.as_ref()
	}
	/// Get the route being consumed
	pub fn get_path(&self) -> Option<&Path> {
		self.path.as_ref()
	}
	/// Get a mutable route
	pub fn get_path_mut(&mut self) -> Option<&mut Path> {
		self.path.as_mut()
	}
	/// Get the via-points
	pub fn get_waypoints(&self) -> &WaypointList {
		&self.waypoints
	}
	/// Get mutable via-points
	pub fn get_waypoints_mut(&mut self) -> &mut WaypointList {
		&mut self.waypoints
	}
	/// Get the journey destination
	pub fn get_destination(&self) -> Option<Vec3> {
		self.destination
	}
	/// Get the facing target
	pub fn get_look_target(&self) -> Option<Vec3> {
		self.look_target
	}
	/// Set or clear the facing target
	pub fn set_look_target(&mut self, look_target: Option<Vec3>) {
		self.look_target = look_target;
	}
	/// Get the replan cadence
	pub fn get_replan(&self) -> ReplanMode {
		self.replan
	}
	/// Get the floor on time between replans
	pub fn get_min_replan_interval(&self) -> Duration {
		self.min_replan_interval
	}
	/// When the current route was requested
	pub fn get_last_plan(&self) -> Duration {
		self.last_plan
	}
	/// Order a journey to a destination through optional via-points. Any
	/// existing journey is dropped and its in-flight request decayed
	pub fn order_move(&mut self, destination: Vec3, via: Vec<Vec3>) {
		self.decay_pending();
		self.path = None;
		self.waypoints.clear();
		for waypoint in via {
			self.waypoints.push(waypoint);
		}
		self.destination = Some(destination);
		self.retries = 0;
		self.retry_at = None;
		self.stuck_since = None;
		self.portal_until = None;
		self.state = SteeringState::Planning;
	}
	/// Ask the agent to halt. Consumed by the next steering tick
	pub fn request_stop(&mut self) {
		self.stop_requested = true;
	}
	/// Whether a halt was requested, clearing the flag
	pub fn take_stop_request(&mut self) -> bool {
		let requested = self.stop_requested;
		self.stop_requested = false;
		requested
	}
	/// The point the next leg of the journey should path to: the active
	/// via-point, or the destination once every via-point is consumed
	pub fn current_leg_target(&self) -> Option<Vec3> {
		self.waypoints.active().or(self.destination)
	}
	/// Mark the previous request decayed so in-flight work on it is
	/// abandoned, keeping at most one live request per agent
	pub fn decay_pending(&mut self) {
		if let Some(previous) = self.pending.take() {
			previous.mark_decayed();
		}
	}
	/// Install the request just issued for this agent, decaying any
	/// predecessor first. An agent still holding a route keeps following
	/// it while the replacement is computed
	pub fn begin_planning(&mut self, request: Arc<PathRequest>, now: Duration) {
		self.decay_pending();
		self.pending = Some(request);
		self.last_plan = now;
		if self.path.is_none() {
			self.state = SteeringState::Planning;
		}
	}
	/// Accept a computed route and start following it
	pub fn install_path(&mut self, path: Path) {
		self.pending = None;
		self.path = Some(path);
		self.stuck_since = None;
		self.state = SteeringState::Following;
	}
	/// Drop the consumed route while keeping the journey alive, ready for
	/// the next leg to be requested
	pub fn clear_path(&mut self) {
		self.path = None;
	}
	/// Drop all journey state, leaving the agent stopped
	pub fn clear_journey(&mut self) {
		self.decay_pending();
		self.path = None;
		self.waypoints.clear();
		self.destination = None;
		self.retries = 0;
		self.retry_at = None;
		self.stuck_since = None;
		self.portal_until = None;
		self.state = SteeringState::Stopped;
	}
	/// Begin a portal transition lasting until `until`
	pub fn begin_portal_transit(&mut self, until: Duration) {
		self.portal_until = Some(until);
		self.state = SteeringState::Portaling;
	}
	/// Whether the in-progress portal transition has finished
	pub fn portal_transit_done(&self, now: Duration) -> bool {
		self.portal_until.is_some_and(|until| now >= until)
	}
	/// Clear the finished portal transition and resume following
	pub fn end_portal_transit(&mut self) {
		self.portal_until = None;
		self.state = SteeringState::Following;
	}
	/// Record when lack of progress was first seen, [None] to reset
	pub fn set_stuck_since(&mut self, since: Option<Duration>) {
		self.stuck_since = since;
	}
	/// When lack of progress was first seen
	pub fn get_stuck_since(&self) -> Option<Duration> {
		self.stuck_since
	}
	/// Count of processor-driven retries this journey
	pub fn get_retries(&self) -> u8 {
		self.retries
	}
	/// Bump the processor-driven retry count
	pub fn bump_retries(&mut self) {
		self.retries = self.retries.saturating_add(1);
	}
	/// Earliest time a retry processor may issue a fresh request
	pub fn get_retry_at(&self) -> Option<Duration> {
		self.retry_at
	}
	/// Schedule or clear the retry time
	pub fn set_retry_at(&mut self, retry_at: Option<Duration>) {
		self.retry_at = retry_at;
	}
	/// Run the composed pipeline for one tick
	pub fn compute_steering(&mut self, input: &SteeringInput) -> SteeringOutput {
		self.pipeline.compute(input)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	#[test]
	fn pipeline_sums_and_clamps() {
		struct FixedPush(Vec3);
		impl SteeringBehavior for FixedPush {
			fn desired_steering(&mut self, _input: &SteeringInput) -> SteeringOutput {
				SteeringOutput {
					acceleration: self.0,
					angular_acceleration: 0.0,
					has_arrived: false,
				}
			}
		}
		let mut pipeline = SteeringPipeline::empty()
			.with(Box::new(FixedPush(Vec3::new(100.0, 0.0, 0.0))))
			.with(Box::new(FixedPush(Vec3::new(0.0, 0.0, 100.0))));
		let params = NavAgentParams::default();
		let input = SteeringInput {
			position: Vec3::ZERO,
			velocity: Vec3::ZERO,
			yaw: 0.0,
			angular_velocity: 0.0,
			delta_time: 0.1,
			params: &params,
			target: None,
			destination: None,
			look_target: None,
			neighbours: &[],
			terrain: None,
		};
		let out = pipeline.compute(&input);
		let bound = params.max_acceleration.max(params.max_deceleration);
		assert!(out.acceleration.length() <= bound + f32::EPSILON);
		// direction of the sum is preserved under the clamp
		assert!((out.acceleration.x - out.acceleration.z).abs() < 0.001);
	}
	#[test]
	fn order_move_supersedes_pending_request() {
		let mut agent = NavAgent::new(NavAgentParams::default());
		let request = Arc::new(PathRequest::new(
			Vec3::ZERO,
			Vec3::ONE,
			RequesterId::new(1),
			PathRequestOptions::default(),
			Duration::ZERO,
		));
		agent.begin_planning(Arc::clone(&request), Duration::ZERO);
		agent.order_move(Vec3::new(9.0, 0.0, 9.0), Vec::new());
		assert!(request.has_decayed());
		assert_eq!(SteeringState::Planning, agent.get_state());
	}
	#[test]
	fn begin_planning_decays_predecessor() {
		let mut agent = NavAgent::new(NavAgentParams::default());
		let first = Arc::new(PathRequest::new(
			Vec3::ZERO,
			Vec3::ONE,
			RequesterId::new(1),
			PathRequestOptions::default(),
			Duration::ZERO,
		));
		let second = Arc::new(PathRequest::new(
			Vec3::ZERO,
			Vec3::ONE,
			RequesterId::new(1),
			PathRequestOptions::default(),
			Duration::ZERO,
		));
		agent.begin_planning(Arc::clone(&first), Duration::ZERO);
		agent.begin_planning(Arc::clone(&second), Duration::from_secs(1));
		assert!(first.has_decayed());
		assert!(!second.has_decayed());
	}
	#[test]
	fn leg_target_prefers_active_waypoint() {
		let mut agent = NavAgent::new(NavAgentParams::default());
		agent.order_move(Vec3::new(10.0, 0.0, 0.0), vec![Vec3::new(5.0, 0.0, 0.0)]);
		assert_eq!(Some(Vec3::new(5.0, 0.0, 0.0)), agent.current_leg_target());
		agent.get_waypoints_mut().advance();
		assert_eq!(Some(Vec3::new(10.0, 0.0, 0.0)), agent.current_leg_target());
	}
	#[test]
	fn portal_transit_lifecycle() {
		let mut agent = NavAgent::new(NavAgentParams::default());
		agent.begin_portal_transit(Duration::from_secs(2));
		assert_eq!(SteeringState::Portaling, agent.get_state());
		assert!(!agent.portal_transit_done(Duration::from_secs(1)));
		assert!(agent.portal_transit_done(Duration::from_secs(2)));
		agent.end_portal_transit();
		assert_eq!(SteeringState::Following, agent.get_state());
	}
	#[test]
	fn stop_request_consumed_once() {
		let mut agent = NavAgent::new(NavAgentParams::default());
		agent.request_stop();
		assert!(agent.take_stop_request());
		assert!(!agent.take_stop_request());
	}
}
