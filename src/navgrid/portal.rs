//! Portals are the only edges along which a route may leave a grid. Each is
//! a directed link from a cell of one grid to a cell of another (or the
//! same) grid together with a transition describing how an agent actually
//! makes the hop - instantly for a teleporter pad, over a duration for a
//! lift or a ladder.
//!
//! The search engine treats a portal cell as a forced waypoint: the path
//! node recorded for the destination side is flagged so the steering layer
//! knows to pause ordinary steering and run the transition before resuming
//! along the rest of the path.
//!

use std::time::Duration;

use crate::prelude::*;

/// How an agent crosses a [Portal]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Clone, Copy, PartialEq, Debug, Default)]
pub enum PortalTransition {
	/// The agent is repositioned at the destination immediately
	#[default]
	Instant,
	/// The agent is held for the duration before appearing at the
	/// destination, e.g. riding a lift
	Timed(Duration),
}

/// A directed link from a cell of the owning grid to a cell of a
/// destination grid
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Clone, Copy, Debug)]
pub struct Portal {
	/// Cell of the owning grid the portal is entered from
	source: CellIndex,
	/// Grid the portal leads to
	target_grid: GridId,
	/// Cell of the target grid the agent emerges at
	target_cell: CellIndex,
	/// The transition executed when an agent crosses
	transition: PortalTransition,
	/// Disabled portals are invisible to the search
	enabled: bool,
}

impl Portal {
	/// Create a new enabled instance of [Portal]
	pub fn new(
		source: CellIndex,
		target_grid: GridId,
		target_cell: CellIndex,
		transition: PortalTransition,
	) -> Self {
		Portal {
			source,
			target_grid,
			target_cell,
			transition,
			enabled: true,
		}
	}
	/// Get the source cell
	pub fn get_source(&self) -> CellIndex {
		self.source
	}
	/// Get the destination grid
	pub fn get_target_grid(&self) -> GridId {
		self.target_grid
	}
	/// Get the destination cell
	pub fn get_target_cell(&self) -> CellIndex {
		self.target_cell
	}
	/// Get the transition
	pub fn get_transition(&self) -> PortalTransition {
		self.transition
	}
	/// Whether the portal is usable
	pub fn is_enabled(&self) -> bool {
		self.enabled
	}
	/// Enable or disable the portal
	pub fn set_enabled(&mut self, enabled: bool) {
		self.enabled = enabled;
	}
}

/// The portals anchored in a single grid
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Clone, Default, Debug)]
pub struct Portals(Vec<Portal>);

impl Portals {
	/// Get the list of portals
	pub fn get(&self) -> &Vec<Portal> {
		&self.0
	}
	/// Register a portal. Panics if the source cell already carries one, a
	/// cell can anchor at most a single portal
	pub fn add(&mut self, portal: Portal) {
		if self.0.iter().any(|p| p.get_source() == portal.get_source()) {
			panic!(
				"Cell {:?} already anchors a portal, a cell can anchor at most one",
				portal.get_source()
			);
		}
		self.0.push(portal);
	}
	/// Get the enabled portal anchored at a cell, if any
	pub fn get_portal_from_cell(&self, cell: CellIndex) -> Option<&Portal> {
		self.0
			.iter()
			.find(|p| p.get_source() == cell && p.is_enabled())
	}
	/// Get a mutable portal by its source cell regardless of enablement
	pub fn get_portal_from_cell_mut(&mut self, cell: CellIndex) -> Option<&mut Portal> {
		self.0.iter_mut().find(|p| p.get_source() == cell)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	#[test]
	fn lookup_by_source_cell() {
		let mut portals = Portals::default();
		portals.add(Portal::new(
			CellIndex::new(9, 4),
			GridId::new(1),
			CellIndex::new(0, 4),
			PortalTransition::Instant,
		));
		let result = portals.get_portal_from_cell(CellIndex::new(9, 4));
		assert!(result.is_some());
		assert_eq!(GridId::new(1), result.unwrap().get_target_grid());
	}
	#[test]
	fn disabled_portal_hidden() {
		let mut portals = Portals::default();
		portals.add(Portal::new(
			CellIndex::new(9, 4),
			GridId::new(1),
			CellIndex::new(0, 4),
			PortalTransition::Instant,
		));
		portals
			.get_portal_from_cell_mut(CellIndex::new(9, 4))
			.unwrap()
			.set_enabled(false);
		assert!(portals.get_portal_from_cell(CellIndex::new(9, 4)).is_none());
	}
	#[test]
	#[should_panic]
	fn duplicate_anchor_cell() {
		let mut portals = Portals::default();
		let portal = Portal::new(
			CellIndex::new(2, 2),
			GridId::new(1),
			CellIndex::new(0, 0),
			PortalTransition::Instant,
		);
		portals.add(portal);
		portals.add(portal);
	}
}
