//! The boundary between the agents asking for routes and the engine
//! computing them. Requests are plain data plus one shared decay flag;
//! results are plain data plus a reference to the originating request so a
//! consumer can recognise a stale delivery by pointer identity.
//!
//! The queue itself is a mutex-guarded priority structure ordered by
//! `(priority, enqueue order)` - equal priorities are served first in,
//! first out. Handles are cheap clones sharing the same inner state, which
//! is what allows the main thread to enqueue and consume while a worker
//! thread (or a budgeted main-thread slicer) serves searches.
//!

use std::collections::{BinaryHeap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::prelude::*;
use bevy::prelude::*;

/// Identity of the party that issued a request, opaque to the engine. The
/// plugin layer packs an [Entity] into it
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Default, Hash)]
pub struct RequesterId(u64);

impl RequesterId {
	/// Create a new instance of [RequesterId]
	pub fn new(id: u64) -> Self {
		RequesterId(id)
	}
	/// Get the raw ID
	pub fn get(&self) -> u64 {
		self.0
	}
}

/// When an agent following a route should ask for a fresh one
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum ReplanMode {
	/// Replan when the grid sections around the agent changed after the
	/// route was computed
	#[default]
	Dynamic,
	/// Replan on a fixed cadence
	FixedInterval(Duration),
	/// Never replan
	Disabled,
}

/// Per-request tuning knobs
#[derive(Clone, Copy, Debug)]
pub struct PathRequestOptions {
	/// Which expansion strategy to run
	pub algorithm: SearchAlgorithm,
	/// Which distance estimate to drive the open set with
	pub heuristic: HeuristicKind,
	/// Whether diagonal steps are permitted
	pub allow_diagonal: bool,
	/// Whether to run the string-pulling pass over the finished route
	pub smooth: bool,
	/// Whether a route to the expanded node nearest the goal is acceptable
	/// when the goal itself cannot be reached
	pub allow_partial: bool,
	/// Whether a blocked destination should be substituted with the nearest
	/// walkable cell
	pub navigate_to_nearest_if_blocked: bool,
	/// Ring-search bound for the blocked-destination substitution
	pub nearest_radius: usize,
	/// Movement classes of the requester
	pub capabilities: AttributeMask,
	/// Clearance radius the requester needs
	pub clearance: f32,
	/// Replan cadence the steering layer should apply to the route
	pub replan: ReplanMode,
	/// Queue priority, higher served first
	pub priority: u8,
}

impl Default for PathRequestOptions {
	fn default() -> Self {
		PathRequestOptions {
			algorithm: SearchAlgorithm::AStar,
			heuristic: HeuristicKind::Diagonal,
			allow_diagonal: true,
			smooth: true,
			allow_partial: false,
			navigate_to_nearest_if_blocked: true,
			nearest_radius: 3,
			capabilities: AttributeMask::GROUND,
			clearance: 0.0,
			replan: ReplanMode::Dynamic,
			priority: 0,
		}
	}
}

/// A route request from one agent. Created once, wrapped in an [Arc] by the
/// queue and shared - the same allocation is referenced by the queue, the
/// engine and the requester, so the decay flag is observed by all three
#[derive(Debug)]
pub struct PathRequest {
	/// Where the route starts
	from: Vec3,
	/// Where the route should end
	to: Vec3,
	/// Via-points to visit on the way, in order
	via: Vec<Vec3>,
	/// Who asked
	requester: RequesterId,
	/// Tuning knobs
	options: PathRequestOptions,
	/// When the request was issued, elapsed time since app start
	issued_at: Duration,
	/// Time after which the request decays on its own even if never
	/// superseded
	decays_at: Option<Duration>,
	/// Set when the request has been superseded or timed out. The engine
	/// polls this every expansion step and abandons the search
	decayed: AtomicBool,
}

impl PathRequest {
	/// Create a new instance of [PathRequest]
	pub fn new(
		from: Vec3,
		to: Vec3,
		requester: RequesterId,
		options: PathRequestOptions,
		issued_at: Duration,
	) -> Self {
		PathRequest {
			from,
			to,
			via: Vec::new(),
			requester,
			options,
			issued_at,
			decays_at: None,
			decayed: AtomicBool::new(false),
		}
	}
	/// Add via-points to visit before the destination
	pub fn with_via(mut self, via: Vec<Vec3>) -> Self {
		self.via = via;
		self
	}
	/// Set a time after which the request decays on its own
	pub fn with_decay_deadline(mut self, decays_at: Duration) -> Self {
		self.decays_at = Some(decays_at);
		self
	}
	/// Get the start position
	pub fn get_from(&self) -> Vec3 {
		self.from
	}
	/// Get the destination
	pub fn get_to(&self) -> Vec3 {
		self.to
	}
	/// Get the via-points
	pub fn get_via(&self) -> &Vec<Vec3> {
		&self.via
	}
	/// Get the requester identity
	pub fn get_requester(&self) -> RequesterId {
		self.requester
	}
	/// Get the tuning knobs
	pub fn get_options(&self) -> &PathRequestOptions {
		&self.options
	}
	/// Get the issue time
	pub fn get_issued_at(&self) -> Duration {
		self.issued_at
	}
	/// Mark the request obsolete so in-flight work on it is abandoned
	pub fn mark_decayed(&self) {
		self.decayed.store(true, Ordering::SeqCst);
	}
	/// Whether the request has been marked obsolete, directly or by passing
	/// its decay deadline
	pub fn has_decayed(&self) -> bool {
		self.decayed.load(Ordering::SeqCst)
	}
	/// Check the decay deadline against the clock, latching the decay flag
	/// when it has passed
	pub fn check_decay_deadline(&self, now: Duration) -> bool {
		if let Some(deadline) = self.decays_at {
			if now > deadline {
				self.mark_decayed();
			}
		}
		self.has_decayed()
	}
}

/// Outcome classification of a served request
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PathResultStatus {
	/// A route to the requested destination was found
	Complete,
	/// The goal could not be reached, the route ends at the expanded node
	/// nearest to it
	CompletePartial,
	/// The open set drained without touching the goal
	NoRouteExists,
	/// The destination cell is blocked. The route, when present, ends at a
	/// substituted nearby cell
	DestinationBlocked,
	/// The start position lies outside every grid
	StartOutsideGrid,
	/// The destination position lies outside every grid
	EndOutsideGrid,
	/// The request decayed before the search finished
	Decayed,
	/// Malformed input or corrupt grid data, see the error text
	Failed,
}

/// The engine's answer to a [PathRequest]
#[derive(Debug)]
pub struct PathResult {
	/// Outcome classification
	status: PathResultStatus,
	/// The computed route when one exists
	path: Option<Path>,
	/// The request this result answers, compared by pointer identity to
	/// detect staleness
	request: Arc<PathRequest>,
	/// Accumulated cost of the full route
	total_cost: i32,
	/// Diagnostic text accompanying [PathResultStatus::Failed]
	error: Option<String>,
}

impl PathResult {
	/// Create a new instance of [PathResult]
	pub fn new(
		status: PathResultStatus,
		path: Option<Path>,
		request: Arc<PathRequest>,
		error: Option<String>,
	) -> Self {
		let total_cost = path.as_ref().map_or(0, |p| p.get_total_cost());
		PathResult {
			status,
			path,
			request,
			total_cost,
			error,
		}
	}
	/// Get the outcome classification
	pub fn get_status(&self) -> PathResultStatus {
		self.status
	}
	/// Get the route
	pub fn get_path(&self) -> Option<&Path> {
		self.path.as_ref()
	}
	/// Take ownership of the route, the result is spent afterwards
	pub fn take_path(&mut self) -> Option<Path> {
		self.path.take()
	}
	/// Get the originating request
	pub fn get_request(&self) -> &Arc<PathRequest> {
		&self.request
	}
	/// Get the total route cost
	pub fn get_total_cost(&self) -> i32 {
		self.total_cost
	}
	/// Get the diagnostic text
	pub fn get_error(&self) -> Option<&String> {
		self.error.as_ref()
	}
	/// Whether this result answers the given pending request. A mismatch
	/// means the requester superseded the request and the result is stale
	pub fn answers(&self, pending: &Arc<PathRequest>) -> bool {
		Arc::ptr_eq(&self.request, pending)
	}
}

/// A queued request with its ordering keys
struct QueuedEntry {
	/// Higher priorities are served first
	priority: u8,
	/// Enqueue counter, lower is older
	sequence: u64,
	/// The request itself
	request: Arc<PathRequest>,
}

impl PartialEq for QueuedEntry {
	fn eq(&self, other: &Self) -> bool {
		self.priority == other.priority && self.sequence == other.sequence
	}
}
impl Eq for QueuedEntry {}

// max-heap on priority, FIFO among equals
impl Ord for QueuedEntry {
	fn cmp(&self, other: &Self) -> std::cmp::Ordering {
		self.priority
			.cmp(&other.priority)
			.then_with(|| other.sequence.cmp(&self.sequence))
	}
}

impl PartialOrd for QueuedEntry {
	fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
		Some(self.cmp(other))
	}
}

/// Shared state behind every queue handle
#[derive(Default)]
struct QueueInner {
	/// Enqueue counter feeding the FIFO tie-break
	sequence: u64,
	/// Requests waiting to be served
	pending: BinaryHeap<QueuedEntry>,
	/// Results waiting to be consumed
	results: VecDeque<PathResult>,
}

/// Thread-safe request/result hand-off between agents and the search
/// engine. Cloning produces another handle onto the same queue
#[derive(Component, Clone, Default)]
pub struct PathRequestQueue {
	/// The guarded queue state
	inner: Arc<Mutex<QueueInner>>,
}

impl PathRequestQueue {
	/// Enqueue a request, returning the shared handle the requester should
	/// retain for supersession and staleness checks
	pub fn queue_request(&self, request: PathRequest) -> Arc<PathRequest> {
		let priority = request.get_options().priority;
		let request = Arc::new(request);
		let mut inner = self.inner.lock().expect("Path request queue lock poisoned");
		let sequence = inner.sequence;
		inner.sequence += 1;
		inner.pending.push(QueuedEntry {
			priority,
			sequence,
			request: Arc::clone(&request),
		});
		request
	}
	/// Pop the next live request to serve. Requests found decayed are
	/// dropped on the floor - a decayed request produces no result delivery
	/// at all
	pub fn take_next(&self, now: Duration) -> Option<Arc<PathRequest>> {
		let mut inner = self.inner.lock().expect("Path request queue lock poisoned");
		while let Some(entry) = inner.pending.pop() {
			if entry.request.check_decay_deadline(now) {
				trace!("Dropping decayed request from {:?}", entry.request.get_requester());
				continue;
			}
			return Some(entry.request);
		}
		None
	}
	/// Publish a finished result for the requester to consume. Decayed
	/// outcomes are dropped silently, a superseded request delivers nothing
	pub fn push_result(&self, result: PathResult) {
		if result.get_status() == PathResultStatus::Decayed {
			trace!(
				"Dropping decayed result for {:?}",
				result.get_request().get_requester()
			);
			return;
		}
		let mut inner = self.inner.lock().expect("Path request queue lock poisoned");
		inner.results.push_back(result);
	}
	/// Drain every published result. Each result is handed out exactly once
	pub fn drain_results(&self) -> Vec<PathResult> {
		let mut inner = self.inner.lock().expect("Path request queue lock poisoned");
		inner.results.drain(..).collect()
	}
	/// Drop published results older than `max_age`, keeping the result
	/// buffer from accumulating answers nobody collects
	pub fn purge_stale_results(&self, now: Duration, max_age: Duration) {
		let mut inner = self.inner.lock().expect("Path request queue lock poisoned");
		inner
			.results
			.retain(|result| now.saturating_sub(result.get_request().get_issued_at()) <= max_age);
	}
	/// Number of requests waiting to be served
	pub fn pending_len(&self) -> usize {
		let inner = self.inner.lock().expect("Path request queue lock poisoned");
		inner.pending.len()
	}
	/// Number of results waiting to be consumed
	pub fn results_len(&self) -> usize {
		let inner = self.inner.lock().expect("Path request queue lock poisoned");
		inner.results.len()
	}
	/// Serve every pending request to completion against a world snapshot,
	/// publishing the results. This is the worker-side loop of the
	/// producer/consumer split, equally callable from a spawned thread
	pub fn serve_all(&self, world: &NavWorld, now: Duration) -> usize {
		let mut served = 0;
		while let Some(request) = self.take_next(now) {
			let mut search = PathSearch::new(world, request);
			let result = search.run_to_completion(world);
			self.push_result(result);
			served += 1;
		}
		served
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	fn request_at(priority: u8) -> PathRequest {
		let options = PathRequestOptions {
			priority,
			..Default::default()
		};
		PathRequest::new(
			Vec3::ZERO,
			Vec3::new(5.0, 0.0, 5.0),
			RequesterId::new(7),
			options,
			Duration::ZERO,
		)
	}
	#[test]
	fn higher_priority_served_first() {
		let queue = PathRequestQueue::default();
		queue.queue_request(request_at(0));
		let urgent = queue.queue_request(request_at(9));
		let next = queue.take_next(Duration::ZERO).unwrap();
		assert!(Arc::ptr_eq(&urgent, &next));
	}
	#[test]
	fn equal_priority_is_fifo() {
		let queue = PathRequestQueue::default();
		let first = queue.queue_request(request_at(3));
		let second = queue.queue_request(request_at(3));
		let next = queue.take_next(Duration::ZERO).unwrap();
		assert!(Arc::ptr_eq(&first, &next));
		let next = queue.take_next(Duration::ZERO).unwrap();
		assert!(Arc::ptr_eq(&second, &next));
	}
	#[test]
	fn decayed_request_never_served() {
		let queue = PathRequestQueue::default();
		let stale = queue.queue_request(request_at(0));
		stale.mark_decayed();
		queue.queue_request(request_at(0));
		// the decayed entry is skipped entirely, only the live one emerges
		let next = queue.take_next(Duration::ZERO).unwrap();
		assert!(!Arc::ptr_eq(&stale, &next));
		assert!(queue.take_next(Duration::ZERO).is_none());
	}
	#[test]
	fn decay_deadline_latches_flag() {
		let request = request_at(0).with_decay_deadline(Duration::from_secs(2));
		assert!(!request.check_decay_deadline(Duration::from_secs(1)));
		assert!(request.check_decay_deadline(Duration::from_secs(3)));
		assert!(request.has_decayed());
	}
	#[test]
	fn results_drain_exactly_once() {
		let queue = PathRequestQueue::default();
		let request = queue.queue_request(request_at(0));
		queue.push_result(PathResult::new(
			PathResultStatus::Complete,
			Some(Path::default()),
			request,
			None,
		));
		assert_eq!(1, queue.drain_results().len());
		assert_eq!(0, queue.drain_results().len());
	}
	#[test]
	fn stale_result_identified_by_pointer_identity() {
		let queue = PathRequestQueue::default();
		let old = queue.queue_request(request_at(0));
		old.mark_decayed();
		let new = queue.queue_request(request_at(0));
		let result = PathResult::new(PathResultStatus::Complete, None, Arc::clone(&old), None);
		assert!(result.answers(&old));
		assert!(!result.answers(&new));
	}
	#[test]
	fn handles_share_state() {
		let queue = PathRequestQueue::default();
		let handle = queue.clone();
		handle.queue_request(request_at(0));
		assert_eq!(1, queue.pending_len());
	}
}
