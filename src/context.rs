//! Shared server context
//!
//! Built once at startup and handed to every transport and tool call
//! behind an `Arc`.

use crate::config::BridgeConfig;
use crate::metacognition::KnowledgeStore;
use crate::services::{KnowledgeService, ProjectService, ServiceClient};
use crate::transport::sessions::SessionManager;
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{info, warn};

/// Overall health classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthState {
    Healthy,
    Degraded,
    Unhealthy,
}

/// Latest health check result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: HealthState,
    pub api_service: bool,
    pub agents_service: bool,
    pub last_health_check: Option<String>,
}

impl Default for HealthStatus {
    fn default() -> Self {
        Self {
            status: HealthState::Healthy,
            api_service: false,
            agents_service: false,
            last_health_check: None,
        }
    }
}

pub struct ServerContext {
    pub config: BridgeConfig,
    pub knowledge: Arc<dyn KnowledgeService>,
    pub projects: Arc<dyn ProjectService>,
    pub sessions: SessionManager,
    pub store: KnowledgeStore,
    health: RwLock<HealthStatus>,
    started_at: Instant,
}

impl ServerContext {
    pub fn new(
        config: BridgeConfig,
        knowledge: Arc<dyn KnowledgeService>,
        projects: Arc<dyn ProjectService>,
    ) -> Self {
        let sessions =
            SessionManager::new(Duration::from_secs(config.server.session_timeout_secs));
        let store = KnowledgeStore::new(&config.storage.knowledge_dir);
        Self {
            config,
            knowledge,
            projects,
            sessions,
            store,
            health: RwLock::new(HealthStatus::default()),
            started_at: Instant::now(),
        }
    }

    /// Context backed by the process-wide HTTP service client
    pub fn from_config(config: BridgeConfig) -> Self {
        let client = ServiceClient::shared(&config.services);
        Self::new(config, client.clone(), client)
    }

    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }

    pub async fn health(&self) -> HealthStatus {
        self.health.read().await.clone()
    }

    /// Probe the dependent services and record the result.
    ///
    /// Healthy when the API service answers, degraded when it does not,
    /// unhealthy when the probe itself could not run.
    pub async fn perform_health_checks(&self) -> HealthStatus {
        let outcome = self.knowledge.health_check().await;
        let mut health = self.health.write().await;

        match outcome {
            Ok(services) => {
                health.api_service = services.api_service;
                health.agents_service = services.agents_service;
                health.status = if services.api_service {
                    HealthState::Healthy
                } else {
                    HealthState::Degraded
                };
                if services.api_service {
                    info!("Health check passed - dependent services healthy");
                } else {
                    warn!("Health check failed: {:?}", *health);
                }
            }
            Err(e) => {
                warn!("Health check error: {}", e);
                health.status = HealthState::Unhealthy;
            }
        }
        health.last_health_check = Some(Local::now().to_rfc3339());
        health.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BridgeError;
    use crate::services::{MockKnowledgeService, MockProjectService, ServiceHealth};

    fn context_with(knowledge: MockKnowledgeService) -> ServerContext {
        ServerContext::new(
            BridgeConfig::default(),
            Arc::new(knowledge),
            Arc::new(MockProjectService::new()),
        )
    }

    #[tokio::test]
    async fn test_healthy_when_api_reachable() {
        let mut knowledge = MockKnowledgeService::new();
        knowledge.expect_health_check().returning(|| {
            Ok(ServiceHealth {
                api_service: true,
                agents_service: false,
            })
        });
        let ctx = context_with(knowledge);

        let health = ctx.perform_health_checks().await;
        assert_eq!(health.status, HealthState::Healthy);
        assert!(!health.agents_service);
        assert!(health.last_health_check.is_some());
        assert_eq!(ctx.health().await, health);
    }

    #[tokio::test]
    async fn test_degraded_and_unhealthy() {
        let mut knowledge = MockKnowledgeService::new();
        let mut calls = 0;
        knowledge.expect_health_check().times(2).returning(move || {
            calls += 1;
            if calls == 1 {
                Ok(ServiceHealth {
                    api_service: false,
                    agents_service: true,
                })
            } else {
                Err(BridgeError::Other("client unavailable".into()))
            }
        });
        let ctx = context_with(knowledge);

        assert_eq!(
            ctx.perform_health_checks().await.status,
            HealthState::Degraded
        );
        assert_eq!(
            ctx.perform_health_checks().await.status,
            HealthState::Unhealthy
        );
    }

    #[test]
    fn test_health_state_serializes_lowercase() {
        let value = serde_json::to_value(HealthStatus::default()).unwrap();
        assert_eq!(value["status"], "healthy");
        assert!(value["last_health_check"].is_null());
    }
}
