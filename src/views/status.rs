use async_trait::async_trait;
use std::sync::Arc;

use super::{ViewKind, ViewSource};
use crate::engine::BotController;
use crate::error::DashboardResult;
use crate::types::BotStatus;

/// Polls bot status through the controller so the held status stays the single source.
pub struct StatusSource {
    controller: Arc<BotController>,
}

impl StatusSource {
    pub fn new(controller: Arc<BotController>) -> Self {
        Self { controller }
    }
}

#[async_trait]
impl ViewSource for StatusSource {
    type Data = BotStatus;

    fn kind(&self) -> ViewKind {
        ViewKind::Status
    }

    async fn load(&self) -> DashboardResult<BotStatus> {
        self.controller.refresh_status().await
    }
}
