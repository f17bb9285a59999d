//! Ring buffer of an agent's via-points. Three cursors partition the
//! buffer: everything before `current` has been visited, `current` is the
//! waypoint being travelled towards and everything up to `head` is queued
//! and not yet resolved into a route. Pushing and consuming are O(1) and
//! allocation-free once the buffer has reached its working size.
//!

use bevy::prelude::*;

/// Starting slot count of a [WaypointList]
const DEFAULT_WAYPOINT_CAPACITY: usize = 8;

/// Circular buffer of pending via-points with consumed/active/queued
/// partitions
#[derive(Clone, Debug)]
pub struct WaypointList {
	/// Slot storage, indexed modulo its length
	buffer: Vec<Vec3>,
	/// Monotonic index one past the newest queued waypoint
	head: usize,
	/// Monotonic index of the active waypoint
	current: usize,
	/// Monotonic index of the oldest retained (visited) waypoint
	tail: usize,
}

impl Default for WaypointList {
	fn default() -> Self {
		WaypointList {
			buffer: vec![Vec3::ZERO; DEFAULT_WAYPOINT_CAPACITY],
			head: 0,
			current: 0,
			tail: 0,
		}
	}
}

impl WaypointList {
	/// Create a new instance of [WaypointList] with a given slot count
	pub fn with_capacity(capacity: usize) -> Self {
		if capacity == 0 {
			panic!("A WaypointList requires at least one slot");
		}
		WaypointList {
			buffer: vec![Vec3::ZERO; capacity],
			head: 0,
			current: 0,
			tail: 0,
		}
	}
	/// Append a waypoint to the queued partition. Visited slots are
	/// reclaimed first; only a buffer genuinely full of live waypoints
	/// grows
	pub fn push(&mut self, waypoint: Vec3) {
		if self.head - self.tail == self.buffer.len() {
			if self.visited_len() > 0 {
				self.drop_visited();
			} else {
				self.grow();
			}
		}
		let capacity = self.buffer.len();
		self.buffer[self.head % capacity] = waypoint;
		self.head += 1;
	}
	/// The waypoint currently travelled towards
	pub fn active(&self) -> Option<Vec3> {
		if self.current < self.head {
			Some(self.buffer[self.current % self.buffer.len()])
		} else {
			None
		}
	}
	/// Mark the active waypoint visited and step to the next queued one,
	/// returning the waypoint just consumed
	pub fn advance(&mut self) -> Option<Vec3> {
		let active = self.active()?;
		self.current += 1;
		Some(active)
	}
	/// Look `ahead` waypoints past the active one without consuming,
	/// `peek(0)` being the active waypoint itself
	pub fn peek(&self, ahead: usize) -> Option<Vec3> {
		let index = self.current + ahead;
		if index < self.head {
			Some(self.buffer[index % self.buffer.len()])
		} else {
			None
		}
	}
	/// Number of waypoints queued, the active one included
	pub fn queued_len(&self) -> usize {
		self.head - self.current
	}
	/// Number of visited waypoints still retained
	pub fn visited_len(&self) -> usize {
		self.current - self.tail
	}
	/// Whether no waypoint remains to travel towards
	pub fn is_empty(&self) -> bool {
		self.queued_len() == 0
	}
	/// Release the visited partition so its slots can be reused
	pub fn drop_visited(&mut self) {
		self.tail = self.current;
	}
	/// Discard everything
	pub fn clear(&mut self) {
		self.head = 0;
		self.current = 0;
		self.tail = 0;
	}
	/// Double the slot count, compacting live waypoints to the front
	fn grow(&mut self) {
		let capacity = self.buffer.len();
		let live: Vec<Vec3> = (self.tail..self.head)
			.map(|index| self.buffer[index % capacity])
			.collect();
		let mut buffer = vec![Vec3::ZERO; capacity * 2];
		buffer[..live.len()].copy_from_slice(&live);
		self.current -= self.tail;
		self.head -= self.tail;
		self.tail = 0;
		self.buffer = buffer;
	}
}
