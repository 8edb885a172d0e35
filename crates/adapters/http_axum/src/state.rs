//! Shared application state for axum handlers.

use std::sync::Arc;

use medinfra_app::ports::{AuditSink, Store};
use medinfra_app::services::location_service::LocationService;
use medinfra_app::services::policy_service::PolicyService;
use medinfra_app::services::registry_service::RegistryService;
use medinfra_app::services::resource_service::ResourceService;
use medinfra_app::services::scheduling_service::SchedulingService;

/// Application state shared across all axum handlers.
///
/// Generic over the store and the audit sink to avoid dynamic dispatch.
/// `Clone` is implemented manually so the underlying types themselves do not
/// need to be `Clone`; only the `Arc` wrappers are cloned.
pub struct AppState<S, A> {
    /// Temporal location hierarchy.
    pub locations: Arc<LocationService<S, Arc<A>>>,
    /// Departments, unit types, units, rooms and resources.
    pub registry: Arc<RegistryService<S, Arc<A>>>,
    /// Resource state machine.
    pub resources: Arc<ResourceService<S, Arc<A>>>,
    /// Procedure bookings.
    pub scheduling: Arc<SchedulingService<S, Arc<A>>>,
    /// Per-branch policy.
    pub policy: Arc<PolicyService<S, Arc<A>>>,
}

impl<S, A> Clone for AppState<S, A> {
    fn clone(&self) -> Self {
        Self {
            locations: Arc::clone(&self.locations),
            registry: Arc::clone(&self.registry),
            resources: Arc::clone(&self.resources),
            scheduling: Arc::clone(&self.scheduling),
            policy: Arc::clone(&self.policy),
        }
    }
}

impl<S, A> AppState<S, A>
where
    S: Store,
    A: AuditSink + Send + Sync + 'static,
{
    /// Build every service over one store and one shared audit sink.
    ///
    /// `max_tree_nodes` caps the rows a reconstruction may load.
    pub fn new(store: S, audit: Arc<A>, max_tree_nodes: usize) -> Self {
        Self {
            locations: Arc::new(
                LocationService::new(store.clone(), Arc::clone(&audit))
                    .with_max_tree_nodes(max_tree_nodes),
            ),
            registry: Arc::new(RegistryService::new(store.clone(), Arc::clone(&audit))),
            resources: Arc::new(ResourceService::new(store.clone(), Arc::clone(&audit))),
            scheduling: Arc::new(SchedulingService::new(store.clone(), Arc::clone(&audit))),
            policy: Arc::new(PolicyService::new(store, audit)),
        }
    }
}
