//! Route group doubles.

use axum::Router;

use crate::capabilities::Capability;
use crate::routes::{AppState, RegistrationError, RouteContext, RouteGroup};

/// Group that always fails to register.
#[derive(Debug, Clone, Copy)]
pub struct FailingRouteGroup {
    capability: Capability,
    mount_path: &'static str,
}

impl FailingRouteGroup {
    pub fn new(capability: Capability, mount_path: &'static str) -> Self {
        Self {
            capability,
            mount_path,
        }
    }
}

impl RouteGroup for FailingRouteGroup {
    fn capability(&self) -> Capability {
        self.capability
    }

    fn mount_path(&self) -> &'static str {
        self.mount_path
    }

    fn register(&self, _context: &RouteContext<'_>) -> Result<Router<AppState>, RegistrationError> {
        Err(RegistrationError::new(
            self.capability,
            "intentional test failure",
        ))
    }
}
