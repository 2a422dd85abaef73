use async_trait::async_trait;
use std::sync::Arc;

use super::{ViewKind, ViewSource};
use crate::error::DashboardResult;
use crate::gateway::AccountGateway;
use crate::types::SystemStatus;

/// Gateway-side connectivity to the upstream price API.
pub struct SystemSource {
    gateway: Arc<dyn AccountGateway>,
}

impl SystemSource {
    pub fn new(gateway: Arc<dyn AccountGateway>) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl ViewSource for SystemSource {
    type Data = SystemStatus;

    fn kind(&self) -> ViewKind {
        ViewKind::System
    }

    async fn load(&self) -> DashboardResult<SystemStatus> {
        self.gateway.system_status().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DashboardError;
    use crate::gateway::MockAccountGateway;

    #[tokio::test]
    async fn test_unreachable_gateway_is_view_error() {
        let mut gateway = MockAccountGateway::new();
        gateway
            .expect_system_status()
            .returning(|| Err(DashboardError::Transport("connection refused".to_string())));

        let source = SystemSource::new(Arc::new(gateway));
        assert_eq!(source.kind(), ViewKind::System);
        assert!(matches!(source.load().await, Err(DashboardError::Transport(_))));
    }
}
