//! Navigation flow and screen controllers for rebrowse.
//!
//! The [`coordinator`] tree decides which screen is presented on the shared
//! [`navigation::NavigationSurface`]; [`controller`]s hold the observable
//! state each screen renders and load images through the shared cache.

pub mod controller;
pub mod coordinator;
pub mod navigation;

pub use controller::{DetailController, DetailState, ListController, ListState, SlotId};
pub use coordinator::{AppCoordinator, Coordinator, CoordinatorNode, NodeId, Services};
pub use navigation::{NavigationSurface, Screen, ScreenEntry};
