//! Result processors: an ordered strategy chain inspecting every
//! [PathResult] before the default handling accepts or rejects it. The
//! first processor to report the result handled short-circuits the rest,
//! which keeps corrective policy - reroutes, retries, backoff - out of the
//! engine entirely. The engine computes, processors decide what a refusal
//! means for this particular agent.
//!

use std::time::Duration;

use crate::prelude::*;
use bevy::prelude::*;

/// What a processor may reach during result handling
pub struct ResultContext<'a> {
	/// The navigable world
	pub world: &'a NavWorld,
	/// The queue fresh corrective requests go into
	pub queue: &'a PathRequestQueue,
	/// Elapsed time since app start
	pub now: Duration,
}

/// A link in the result-processing chain
pub trait PathResultProcessor: Send + Sync {
	/// Inspect a result for an agent. Return `true` when handled, which
	/// short-circuits the remaining chain and the default handling
	fn process(
		&mut self,
		result: &PathResult,
		agent: &mut NavAgent,
		ctx: &ResultContext,
	) -> bool;
}

/// Intercepts refusals - a blocked destination with no substitute, or no
/// route at all - and retries towards the nearest cell the agent could
/// actually occupy, searching a wider ring than the engine's default
pub struct RerouteToNearestProcessor {
	/// Ring-search bound for the corrective reroute
	pub max_cell_radius: usize,
	/// Reroutes allowed per journey before giving up
	pub max_reroutes: u8,
}

impl Default for RerouteToNearestProcessor {
	fn default() -> Self {
		RerouteToNearestProcessor {
			max_cell_radius: 8,
			max_reroutes: 2,
		}
	}
}

impl PathResultProcessor for RerouteToNearestProcessor {
	fn process(
		&mut self,
		result: &PathResult,
		agent: &mut NavAgent,
		ctx: &ResultContext,
	) -> bool {
		let refused = matches!(
			result.get_status(),
			PathResultStatus::NoRouteExists | PathResultStatus::DestinationBlocked
		) && result.get_path().is_none();
		if !refused || agent.get_retries() >= self.max_reroutes {
			return false;
		}
		let request = result.get_request();
		let to = request.get_to();
		let Some((grid_id, _)) = ctx.world.find_cell_at(to) else {
			return false;
		};
		let Some(grid) = ctx.world.get_grid(grid_id) else {
			return false;
		};
		let options = *request.get_options();
		let Some(substitute) = grid.get_matrix().get_nearest_walkable_cell(
			to,
			request.get_from(),
			true,
			self.max_cell_radius,
			options.capabilities,
			options.clearance,
		) else {
			return false;
		};
		let corrected_to = grid.get_matrix().get_cell_at(substitute).get_position();
		if corrected_to.distance_squared(to) <= ARRIVAL_EPSILON * ARRIVAL_EPSILON {
			// the substitute is the refused destination itself, nothing to
			// gain by asking again
			return false;
		}
		debug!(
			"Rerouting {:?} to nearest occupiable cell {:?}",
			request.get_requester(),
			substitute
		);
		let corrective = PathRequest::new(
			request.get_from(),
			corrected_to,
			request.get_requester(),
			options,
			ctx.now,
		);
		let handle = ctx.queue.queue_request(corrective);
		agent.bump_retries();
		agent.begin_planning(handle, ctx.now);
		true
	}
}

/// Intercepts engine failures and schedules a bounded number of retries,
/// each backed off from the last
pub struct RetryWithBackoffProcessor {
	/// Retries allowed per journey
	pub max_retries: u8,
	/// Delay before each retry
	pub backoff: Duration,
}

impl Default for RetryWithBackoffProcessor {
	fn default() -> Self {
		RetryWithBackoffProcessor {
			max_retries: 3,
			backoff: Duration::from_secs(1),
		}
	}
}

impl PathResultProcessor for RetryWithBackoffProcessor {
	fn process(
		&mut self,
		result: &PathResult,
		agent: &mut NavAgent,
		ctx: &ResultContext,
	) -> bool {
		if result.get_status() != PathResultStatus::Failed {
			return false;
		}
		if agent.get_retries() >= self.max_retries {
			return false;
		}
		if let Some(error) = result.get_error() {
			warn!(
				"Search for {:?} failed ({}), retrying after backoff",
				result.get_request().get_requester(),
				error
			);
		}
		agent.bump_retries();
		// release the dead request so the next issue isn't blocked on it
		agent.decay_pending();
		agent.set_retry_at(Some(ctx.now + self.backoff));
		agent.set_state(SteeringState::Planning);
		true
	}
}

/// The chain itself, carried as a component beside the queue so hosts can
/// compose their own policies
#[derive(Component, Default)]
pub struct ResultProcessors(Vec<Box<dyn PathResultProcessor>>);

impl ResultProcessors {
	/// The stock chain: reroute refusals, retry failures
	pub fn standard() -> Self {
		ResultProcessors(vec![
			Box::new(RerouteToNearestProcessor::default()),
			Box::new(RetryWithBackoffProcessor::default()),
		])
	}
	/// Append a processor to the end of the chain
	pub fn push(&mut self, processor: Box<dyn PathResultProcessor>) {
		self.0.push(processor);
	}
	/// Run the chain. Returns `true` when some processor handled the result
	pub fn run(
		&mut self,
		result: &PathResult,
		agent: &mut NavAgent,
		ctx: &ResultContext,
	) -> bool {
		for processor in self.0.iter_mut() {
			if processor.process(result, agent, ctx) {
				return true;
			}
		}
		false
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::Arc;

	fn blocked_corner_world() -> NavWorld {
		let mut matrix = CellMatrix::new(Vec3::ZERO, 1.0, 10, 10);
		// seal the destination corner entirely
		for column in 7..10 {
			for row in 7..10 {
				matrix.set_cell_passable(
					CellIndex::new(column, row),
					AttributeMask::NONE,
					Duration::ZERO,
				);
			}
		}
		let mut world = NavWorld::default();
		world.insert_grid(GridId::new(0), NavGrid::new(matrix));
		world
	}
	fn refusal(world: &NavWorld, queue: &PathRequestQueue) -> PathResult {
		let options = PathRequestOptions {
			nearest_radius: 1,
			..Default::default()
		};
		let request = queue.queue_request(PathRequest::new(
			Vec3::new(0.5, 0.0, 0.5),
			Vec3::new(8.5, 0.0, 8.5),
			RequesterId::new(1),
			options,
			Duration::ZERO,
		));
		let mut search = PathSearch::new(world, Arc::clone(&request));
		search.run_to_completion(world)
	}
	#[test]
	fn reroute_issues_corrective_request() {
		let world = blocked_corner_world();
		let queue = PathRequestQueue::default();
		let result = refusal(&world, &queue);
		assert_eq!(PathResultStatus::DestinationBlocked, result.get_status());
		assert!(result.get_path().is_none());
		// drain the original request out of the queue
		queue.take_next(Duration::ZERO);

		let mut agent = NavAgent::new(NavAgentParams::default());
		let mut chain = ResultProcessors::standard();
		let ctx = ResultContext {
			world: &world,
			queue: &queue,
			now: Duration::from_secs(1),
		};
		let handled = chain.run(&result, &mut agent, &ctx);
		assert!(handled);
		assert_eq!(1, queue.pending_len());
		assert_eq!(SteeringState::Planning, agent.get_state());
		assert_eq!(1, agent.get_retries());
		// the corrective request targets an occupiable cell
		let corrective = queue.take_next(Duration::ZERO).unwrap();
		let (grid_id, cell) = world.find_cell_at(corrective.get_to()).unwrap();
		let grid = world.get_grid(grid_id).unwrap();
		assert!(grid
			.get_matrix()
			.get_cell_at(cell)
			.is_walkable(AttributeMask::GROUND));
	}
	#[test]
	fn reroute_gives_up_after_bound() {
		let world = blocked_corner_world();
		let queue = PathRequestQueue::default();
		let result = refusal(&world, &queue);
		let mut agent = NavAgent::new(NavAgentParams::default());
		let mut processor = RerouteToNearestProcessor {
			max_cell_radius: 8,
			max_reroutes: 0,
		};
		let ctx = ResultContext {
			world: &world,
			queue: &queue,
			now: Duration::ZERO,
		};
		assert!(!processor.process(&result, &mut agent, &ctx));
	}
	#[test]
	fn retry_schedules_backoff_for_failures() {
		let world = NavWorld::default();
		let queue = PathRequestQueue::default();
		let request = Arc::new(PathRequest::new(
			Vec3::ZERO,
			Vec3::ONE,
			RequesterId::new(3),
			PathRequestOptions::default(),
			Duration::ZERO,
		));
		let result = PathResult::new(
			PathResultStatus::Failed,
			None,
			request,
			Some(String::from("corrupt grid")),
		);
		let mut agent = NavAgent::new(NavAgentParams::default());
		let mut processor = RetryWithBackoffProcessor {
			max_retries: 1,
			backoff: Duration::from_secs(2),
		};
		let ctx = ResultContext {
			world: &world,
			queue: &queue,
			now: Duration::from_secs(10),
		};
		assert!(processor.process(&result, &mut agent, &ctx));
		assert_eq!(Some(Duration::from_secs(12)), agent.get_retry_at());
		agent.bump_retries();
		// the bound is respected on the next failure
		assert!(!processor.process(&result, &mut agent, &ctx));
	}
	#[test]
	fn chain_ignores_successful_results() {
		let world = NavWorld::default();
		let queue = PathRequestQueue::default();
		let request = Arc::new(PathRequest::new(
			Vec3::ZERO,
			Vec3::ONE,
			RequesterId::new(3),
			PathRequestOptions::default(),
			Duration::ZERO,
		));
		let result = PathResult::new(PathResultStatus::Complete, Some(Path::default()), request, None);
		let mut agent = NavAgent::new(NavAgentParams::default());
		let mut chain = ResultProcessors::standard();
		let ctx = ResultContext {
			world: &world,
			queue: &queue,
			now: Duration::ZERO,
		};
		assert!(!chain.run(&result, &mut agent, &ctx));
	}
}
