//! Service container for dependency injection
//!
//! Wires the values service to the loaded settings.

use std::sync::Arc;

use crate::application::services::ValuesService;
use crate::config::Settings;

/// Container holding all application services.
pub struct ServiceContainer {
    /// Application settings
    pub settings: Arc<Settings>,

    /// Get/set engine with the configured base options
    pub values: ValuesService,
}

impl ServiceContainer {
    /// Create a new service container from loaded settings.
    pub fn new(settings: Settings) -> Self {
        let values = ValuesService::new(settings.base_options());
        Self::with_deps(settings, values)
    }

    /// Create a service container with a custom values service (for testing).
    pub fn with_deps(settings: Settings, values: ValuesService) -> Self {
        Self {
            settings: Arc::new(settings),
            values,
        }
    }
}
