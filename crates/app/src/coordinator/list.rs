//! List flow coordinator.

use std::sync::{Arc, OnceLock, Weak};

use rebrowse_core::ResultRecord;

use super::{Coordinator, CoordinatorNode, DetailCoordinator, DetailParams, Services};
use crate::controller::{ListController, ListDelegate};
use crate::navigation::{NavigationSurface, Screen};

/// Presents the result list and spawns a detail flow per selection.
pub struct ListCoordinator {
    node: CoordinatorNode,
    me: Weak<ListCoordinator>,
    services: Services,
    controller: OnceLock<Arc<ListController>>,
}

impl ListCoordinator {
    pub fn new(surface: NavigationSurface, services: Services) -> Arc<Self> {
        Arc::new_cyclic(|me: &Weak<ListCoordinator>| ListCoordinator {
            node: CoordinatorNode::new(surface, me.clone()),
            me: me.clone(),
            services,
            controller: OnceLock::new(),
        })
    }

    pub fn controller(&self) -> Option<Arc<ListController>> {
        self.controller.get().cloned()
    }
}

impl Coordinator for ListCoordinator {
    fn node(&self) -> &CoordinatorNode {
        &self.node
    }

    fn start(&self) {
        if self.controller.get().is_some() {
            tracing::warn!(node = %self.node.id(), "list flow already started");
            return;
        }

        let delegate: Weak<dyn ListDelegate> = self.me.clone();
        let controller =
            Arc::new(ListController::new(self.services.query.clone(), self.services.images.clone(), delegate));
        let _ = self.controller.set(controller.clone());
        self.node.surface().push(self.node.id(), Screen::List(controller));
    }
}

impl ListDelegate for ListCoordinator {
    fn show_detail(&self, record: ResultRecord) {
        tracing::debug!(node = %self.node.id(), "show detail for {}", record.full_name);
        let params = DetailParams { record, images: self.services.images.clone() };
        let child = DetailCoordinator::new(self.node.surface().clone(), params);
        if self.node.add_child(child.clone()).is_ok() {
            child.start();
        }
    }
}
