//! Path calculation over the cell matrices of a [crate::prelude::NavWorld].
//!
//! A request names a start and goal in world space. The engine resolves
//! both to cells, then runs A* (or Jump Point Search on uniform ground)
//! over the owning grid, hopping to other grids only through portal edges,
//! and hands back an ordered node sequence for the steering layer to
//! consume.
//!
//! The engine is an explicit resumable object: callers decide whether to
//! drive a search to completion in one go, slice it across frames with a
//! step budget, or serve it from a dedicated worker thread through the
//! request queue. A request can be marked decayed at any moment and the
//! engine abandons it at its next expansion step, so superseded requests
//! never burn a full search worth of work.
//!

pub mod engine;
pub mod jump_point;
pub mod open_set;
pub mod path;
pub mod providers;
pub mod queue;
pub mod smoothing;
