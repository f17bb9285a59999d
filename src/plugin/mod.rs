//! Defines the Bevy [Plugin] wiring the navigation systems into the app
//! schedule and the events the host observes them through
//!

use crate::prelude::*;
use bevy::prelude::*;

pub mod request_layer;
pub mod steer_layer;

/// Codes describing what happened to a navigating agent
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum NavEventCode {
	/// The journey's destination was reached
	DestinationReached,
	/// A via-point was reached, the next leg is being planned
	WaypointReached,
	/// A route node was consumed
	NodeReached,
	/// Stopped: destination blocked with no reachable substitute
	StoppedDestinationBlocked,
	/// Stopped: no route exists
	StoppedNoRouteExists,
	/// Stopped: the pending request decayed unanswered
	StoppedRequestDecayed,
	/// Stopped: a caller asked for a halt
	StoppedByRequest,
	/// Stopped: the agent is outside every grid
	StoppedUnitOutsideGrid,
	/// Following a route but making no progress
	Stuck,
}

/// A navigation happening on some agent, posted to the host's event bus
#[derive(Event)]
pub struct EventNavigation {
	/// The agent concerned
	entity: Entity,
	/// What happened
	code: NavEventCode,
}

impl EventNavigation {
	/// Create a new instance of [EventNavigation]
	pub fn new(entity: Entity, code: NavEventCode) -> Self {
		EventNavigation { entity, code }
	}
	/// The agent concerned
	pub fn get_entity(&self) -> Entity {
		self.entity
	}
	/// What happened
	pub fn get_code(&self) -> NavEventCode {
		self.code
	}
}

/// A portal transition the host must execute: reposition the entity at the
/// destination once the transition completes
#[derive(Event)]
pub struct EventPortalTransit {
	/// The agent crossing
	entity: Entity,
	/// Where the agent emerges
	destination: Vec3,
	/// How the crossing plays out
	transition: PortalTransition,
}

impl EventPortalTransit {
	/// Create a new instance of [EventPortalTransit]
	pub fn new(entity: Entity, destination: Vec3, transition: PortalTransition) -> Self {
		EventPortalTransit {
			entity,
			destination,
			transition,
		}
	}
	/// The agent crossing
	pub fn get_entity(&self) -> Entity {
		self.entity
	}
	/// Where the agent emerges
	pub fn get_destination(&self) -> Vec3 {
		self.destination
	}
	/// How the crossing plays out
	pub fn get_transition(&self) -> PortalTransition {
		self.transition
	}
}

/// Ordered phases of the navigation schedule
#[derive(SystemSet, Debug, Hash, PartialEq, Eq, Clone)]
pub enum OrderingSet {
	/// Cleanup of stale results and decayed requests
	Tidy,
	/// Request issuing, search slicing and result delivery
	Calculate,
	/// The per-agent steering tick
	Steer,
}

/// Adds grid navigation to a Bevy app: spawn a
/// [crate::prelude::NavWorldBundle] for the world and a
/// [crate::prelude::NavAgentBundle] per mobile agent
pub struct NavGridPlugin;

impl Plugin for NavGridPlugin {
	#[cfg(not(tarpaulin_include))]
	fn build(&self, app: &mut App) {
		app.register_type::<GridId>()
			.register_type::<CellIndex>()
			.register_type::<AttributeMask>()
			.init_resource::<request_layer::SearchBudget>()
			.init_resource::<request_layer::ActiveSearches>()
			.add_event::<EventNavigation>()
			.add_event::<EventPortalTransit>()
			.configure_sets(
				Update,
				(
					OrderingSet::Tidy,
					OrderingSet::Calculate,
					OrderingSet::Steer,
				)
					.chain(),
			)
			.add_systems(
				Update,
				(
					(
						request_layer::purge_stale_results,
						steer_layer::detect_decayed_requests,
					)
						.in_set(OrderingSet::Tidy),
					(
						steer_layer::issue_path_requests,
						request_layer::dispatch_queued_requests,
						request_layer::deliver_results,
					)
						.chain()
						.in_set(OrderingSet::Calculate),
					(steer_layer::steer_agents,).in_set(OrderingSet::Steer),
				),
			);
	}
}
