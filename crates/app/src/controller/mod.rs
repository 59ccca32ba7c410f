//! Screen controllers.
//!
//! Controllers own observable state for a presentation layer and report
//! navigation events to weakly held delegates (their coordinators).

mod detail;
mod list;

pub use detail::{DetailController, DetailDelegate, DetailState};
pub use list::{ListController, ListDelegate, ListState, SlotId};
