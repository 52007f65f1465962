use std::sync::Arc;

use voice_core::capability_registry::CapabilityRegistry;
use voice_core::config::AppConfig;
use voice_core::SessionRegistry;

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<SessionRegistry>,
    pub capability_registry: Arc<CapabilityRegistry>,
    pub app_config: Arc<AppConfig>,
}
