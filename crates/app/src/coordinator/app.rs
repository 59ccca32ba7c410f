//! Root coordinator.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

use super::{Coordinator, CoordinatorNode, ListCoordinator, Services};
use crate::controller::ListController;
use crate::navigation::NavigationSurface;

/// Root of the coordinator tree. Starts the list flow.
pub struct AppCoordinator {
    node: CoordinatorNode,
    services: Services,
    started: AtomicBool,
    list: Mutex<Weak<ListCoordinator>>,
}

impl AppCoordinator {
    pub fn new(surface: NavigationSurface, services: Services) -> Arc<Self> {
        Arc::new_cyclic(|me: &Weak<AppCoordinator>| AppCoordinator {
            node: CoordinatorNode::new(surface, me.clone()),
            services,
            started: AtomicBool::new(false),
            list: Mutex::new(Weak::new()),
        })
    }

    /// The list flow, while it is alive.
    pub fn list(&self) -> Option<Arc<ListCoordinator>> {
        self.list.lock().unwrap_or_else(PoisonError::into_inner).upgrade()
    }

    pub fn list_controller(&self) -> Option<Arc<ListController>> {
        self.list().and_then(|list| list.controller())
    }
}

impl Coordinator for AppCoordinator {
    fn node(&self) -> &CoordinatorNode {
        &self.node
    }

    /// Push the list flow. Later calls do nothing.
    fn start(&self) {
        if self.started.swap(true, Ordering::SeqCst) {
            tracing::debug!(node = %self.node.id(), "root already started");
            return;
        }

        let list = ListCoordinator::new(self.node.surface().clone(), self.services.clone());
        *self.list.lock().unwrap_or_else(PoisonError::into_inner) = Arc::downgrade(&list);
        if self.node.add_child(list.clone()).is_ok() {
            list.start();
        }
    }
}
