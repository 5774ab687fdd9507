mod turn_id;

use std::sync::Arc;

use uuid::Uuid;

use crate::config::AppConfig;
use crate::observability::{EventRecorder, TracingRecorder};
use crate::transport::HttpTransport;

use turn_id::TurnIdGenerator;

/// Shared application state accessible to all handlers.
pub struct AppState {
    pub config: AppConfig,
    pub transport: HttpTransport,
    recorder: Arc<dyn EventRecorder>,
    turn_ids: TurnIdGenerator,
}

impl AppState {
    /// State that reports turn events through `tracing`.
    #[must_use]
    pub fn new(config: AppConfig, transport: HttpTransport) -> Self {
        Self::with_recorder(config, transport, Arc::new(TracingRecorder))
    }

    #[must_use]
    pub fn with_recorder(
        config: AppConfig,
        transport: HttpTransport,
        recorder: Arc<dyn EventRecorder>,
    ) -> Self {
        Self {
            config,
            transport,
            recorder,
            turn_ids: TurnIdGenerator::new(),
        }
    }

    #[must_use]
    pub fn next_turn_id(&self) -> Uuid {
        self.turn_ids.next_turn_id()
    }

    #[must_use]
    pub fn recorder(&self) -> Arc<dyn EventRecorder> {
        Arc::clone(&self.recorder)
    }

    /// Provider credential, if one is configured and non-blank.
    #[must_use]
    pub fn api_key(&self) -> Option<&str> {
        self.config
            .upstream
            .api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
    }
}
