//! Systems serving the request queue. Searches are sliced across frames
//! under a shared expansion budget so one enormous request cannot stall a
//! tick, and finished results flow back through the processor chain before
//! the default accept/refuse handling runs.
//!

use std::time::Duration;

use crate::prelude::*;
use bevy::prelude::*;

/// Results nobody collected within this window are purged
const RESULT_MAX_AGE: Duration = Duration::from_secs(900);

/// Cap on node expansions across all in-flight searches per tick
#[derive(Resource, Clone, Copy)]
pub struct SearchBudget {
	/// Expansions spent per tick
	pub expansions_per_tick: usize,
	/// Searches sliced concurrently; further requests wait in the queue
	pub max_active_searches: usize,
}

impl Default for SearchBudget {
	fn default() -> Self {
		SearchBudget {
			expansions_per_tick: 4096,
			max_active_searches: 8,
		}
	}
}

/// The searches currently being sliced across frames
#[derive(Resource, Default)]
pub struct ActiveSearches(Vec<PathSearch>);

impl ActiveSearches {
	/// Number of in-flight searches
	pub fn len(&self) -> usize {
		self.0.len()
	}
	/// Whether no search is in flight
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}

/// Admit queued requests into the active set and spend the tick's
/// expansion budget across them round-robin, publishing whatever settles
pub fn dispatch_queued_requests(
	nav_q: Query<(&NavWorld, &PathRequestQueue)>,
	mut active: ResMut<ActiveSearches>,
	budget: Res<SearchBudget>,
	time: Res<Time>,
) {
	let Ok((world, queue)) = nav_q.single() else {
		return;
	};
	let now = time.elapsed();
	while active.0.len() < budget.max_active_searches {
		match queue.take_next(now) {
			Some(request) => {
				active.0.push(PathSearch::new(world, request));
			}
			None => break,
		}
	}
	if active.0.is_empty() {
		return;
	}
	let mut remaining = budget.expansions_per_tick;
	while remaining > 0 {
		let mut any_expanding = false;
		for search in active.0.iter_mut() {
			if remaining == 0 {
				break;
			}
			if let SearchStatus::Expanding = search.get_status() {
				search.step_once(world);
				remaining -= 1;
				any_expanding = true;
			}
		}
		if !any_expanding {
			break;
		}
	}
	// publish and drop everything that settled this tick
	let mut index = 0;
	while index < active.0.len() {
		if let SearchStatus::Settled(_) = active.0[index].get_status() {
			let mut search = active.0.swap_remove(index);
			queue.push_result(search.to_result());
		} else {
			index += 1;
		}
	}
}

/// Drain finished results to their requesters: discard stale ones, offer
/// the rest to the processor chain, then apply the default accept/refuse
/// handling
pub fn deliver_results(
	nav_q: Query<(&NavWorld, &PathRequestQueue)>,
	mut processors_q: Query<&mut ResultProcessors>,
	mut agent_q: Query<&mut NavAgent>,
	mut events: EventWriter<EventNavigation>,
	time: Res<Time>,
) {
	let Ok((world, queue)) = nav_q.single() else {
		return;
	};
	let now = time.elapsed();
	for mut result in queue.drain_results() {
		let requester = result.get_request().get_requester();
		let entity = Entity::from_bits(requester.get());
		let Ok(mut agent) = agent_q.get_mut(entity) else {
			trace!("Requester {:?} no longer exists, dropping result", entity);
			continue;
		};
		// supersession: only the result answering the agent's live request
		// is consumed, anything else is silently discarded
		let is_current = agent
			.get_pending()
			.is_some_and(|pending| result.answers(pending));
		if !is_current {
			trace!("Discarding stale result for {:?}", entity);
			continue;
		}
		let ctx = ResultContext {
			world,
			queue,
			now,
		};
		let handled = processors_q
			.single_mut()
			.map(|mut chain| chain.run(&result, &mut agent, &ctx))
			.unwrap_or(false);
		if handled {
			continue;
		}
		match result.get_status() {
			PathResultStatus::Complete | PathResultStatus::CompletePartial => {
				if let Some(path) = result.take_path() {
					agent.install_path(path);
				} else {
					agent.clear_journey();
				}
			}
			PathResultStatus::DestinationBlocked => match result.take_path() {
				// the engine found an escape route to a substitute cell
				Some(path) => agent.install_path(path),
				None => {
					agent.clear_journey();
					events.write(EventNavigation::new(
						entity,
						NavEventCode::StoppedDestinationBlocked,
					));
				}
			},
			PathResultStatus::NoRouteExists => {
				agent.clear_journey();
				events.write(EventNavigation::new(
					entity,
					NavEventCode::StoppedNoRouteExists,
				));
			}
			PathResultStatus::StartOutsideGrid | PathResultStatus::EndOutsideGrid => {
				agent.clear_journey();
				events.write(EventNavigation::new(
					entity,
					NavEventCode::StoppedUnitOutsideGrid,
				));
			}
			PathResultStatus::Failed => {
				error!(
					"Search for {:?} failed: {}",
					entity,
					result
						.get_error()
						.map_or("no diagnostic", |text| text.as_str())
				);
				agent.clear_journey();
			}
			// never published, dropped at the queue boundary
			PathResultStatus::Decayed => {}
		}
	}
}

/// Purge results nobody collected, the queue-side sibling of the route
/// cleanup an agent does for itself
pub fn purge_stale_results(nav_q: Query<&PathRequestQueue>, time: Res<Time>) {
	let now = time.elapsed();
	for queue in nav_q.iter() {
		queue.purge_stale_results(now, RESULT_MAX_AGE);
	}
}
