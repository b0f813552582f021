use std::sync::Arc;

use db::DBService;
use services::services::{
    billing::BillingService,
    contracts::ContractService,
    crm::{CrmClient, CrmProvider, PipelineService},
    esign::{ESignClient, SignatureProvider},
    events::EventService,
    payment_gateway::{PaymentGateway, PaymentGatewayClient},
    storage::LocalStorage,
};
use tracing::{info, warn};

use crate::{config::ServerConfig, error::ApiError};

/// Provider clients; each is absent when its credentials are not configured.
#[derive(Clone, Default)]
pub struct Integrations {
    pub payment_gateway: Option<Arc<dyn PaymentGateway>>,
    pub signature: Option<Arc<dyn SignatureProvider>>,
    pub crm: Option<Arc<dyn CrmProvider>>,
}

impl Integrations {
    pub fn from_env() -> Self {
        let payment_gateway = PaymentGatewayClient::from_env()
            .map(|c| Arc::new(c) as Arc<dyn PaymentGateway>)
            .inspect_err(|e| warn!("Payment gateway disabled: {e}"))
            .ok();
        let signature = ESignClient::from_env()
            .map(|c| Arc::new(c) as Arc<dyn SignatureProvider>)
            .inspect_err(|e| warn!("E-signature disabled: {e}"))
            .ok();
        let crm = CrmClient::from_env()
            .map(|c| Arc::new(c) as Arc<dyn CrmProvider>)
            .inspect_err(|e| warn!("CRM pipeline disabled: {e}"))
            .ok();

        info!(
            payment_gateway = payment_gateway.is_some(),
            signature = signature.is_some(),
            crm = crm.is_some(),
            "Integrations configured"
        );
        Self {
            payment_gateway,
            signature,
            crm,
        }
    }
}

#[derive(Clone)]
pub struct LocalDeployment {
    db: DBService,
    config: Arc<ServerConfig>,
    events: EventService,
    storage: LocalStorage,
    integrations: Integrations,
}

impl LocalDeployment {
    pub fn new(
        db: DBService,
        config: ServerConfig,
        storage: LocalStorage,
        integrations: Integrations,
    ) -> Self {
        Self {
            db,
            config: Arc::new(config),
            events: EventService::new(),
            storage,
            integrations,
        }
    }

    pub fn db(&self) -> &DBService {
        &self.db
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn events(&self) -> &EventService {
        &self.events
    }

    pub fn storage(&self) -> &LocalStorage {
        &self.storage
    }

    pub fn integrations(&self) -> &Integrations {
        &self.integrations
    }

    pub fn billing(&self) -> Result<BillingService, ApiError> {
        let gateway = self
            .integrations
            .payment_gateway
            .clone()
            .ok_or(ApiError::NotConfigured("payment gateway"))?;
        Ok(BillingService::new(self.db.pool.clone(), gateway))
    }

    pub fn contracts(&self) -> Result<ContractService, ApiError> {
        let provider = self
            .integrations
            .signature
            .clone()
            .ok_or(ApiError::NotConfigured("e-signature"))?;
        Ok(ContractService::new(self.db.pool.clone(), provider))
    }

    pub fn pipeline(&self) -> Result<PipelineService, ApiError> {
        let provider = self
            .integrations
            .crm
            .clone()
            .ok_or(ApiError::NotConfigured("CRM"))?;
        Ok(PipelineService::new(provider))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::path::Path;

    use super::*;

    pub(crate) async fn test_deployment(storage_root: &Path) -> LocalDeployment {
        let config = ServerConfig {
            host: [127, 0, 0, 1].into(),
            port: ServerConfig::DEFAULT_PORT,
            public_base_url: "http://localhost:3001".parse().unwrap(),
        };
        LocalDeployment::new(
            DBService::new_in_memory().await.unwrap(),
            config,
            LocalStorage::new(storage_root, "http://localhost:3001"),
            Integrations::default(),
        )
    }

    #[tokio::test]
    async fn test_missing_integrations_are_not_configured() {
        let dir = tempfile::tempdir().unwrap();
        let deployment = test_deployment(dir.path()).await;
        assert!(matches!(
            deployment.billing(),
            Err(ApiError::NotConfigured("payment gateway"))
        ));
        assert!(matches!(
            deployment.contracts(),
            Err(ApiError::NotConfigured("e-signature"))
        ));
        assert!(matches!(deployment.pipeline(), Err(ApiError::NotConfigured("CRM"))));
    }
}
