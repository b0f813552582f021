use std::sync::Arc;

use db::models::{
    child::Child,
    contract::{Contract, ContractStatus, CreateContract},
    validation::ValidationError,
};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use super::{
    contract_text,
    esign::{ESignError, NewDocument, NewSigner, SignatureProvider},
};

#[derive(Debug, Error)]
pub enum ContractError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("e-signature error: {0}")]
    ESign(#[from] ESignError),
    #[error("contract not found")]
    NotFound,
    #[error("child not found")]
    ChildNotFound,
    #[error("contract is {0}; only drafts can be sent for signature")]
    NotDraft(ContractStatus),
    #[error("contract has not been sent for signature")]
    NotSent,
}

pub struct ContractService {
    pool: SqlitePool,
    provider: Arc<dyn SignatureProvider>,
}

impl ContractService {
    pub fn new(pool: SqlitePool, provider: Arc<dyn SignatureProvider>) -> Self {
        Self { pool, provider }
    }

    pub async fn create(pool: &SqlitePool, data: &CreateContract) -> Result<Contract, ContractError> {
        data.validate()?;
        if Child::find_by_id(pool, data.child_id).await?.is_none() {
            return Err(ContractError::ChildNotFound);
        }
        Ok(Contract::create(pool, data, Uuid::new_v4()).await?)
    }

    /// Render the contract text and open a signature request for the guardian.
    pub async fn send_for_signature(&self, contract_id: Uuid) -> Result<Contract, ContractError> {
        let contract = Contract::find_by_id(&self.pool, contract_id)
            .await?
            .ok_or(ContractError::NotFound)?;
        if contract.status != ContractStatus::Draft {
            return Err(ContractError::NotDraft(contract.status));
        }
        let child = Child::find_by_id(&self.pool, contract.child_id)
            .await?
            .ok_or(ContractError::ChildNotFound)?;

        let body = contract_text::render(&contract, &child);
        let document = self
            .provider
            .create_document(&NewDocument {
                name: contract.title.clone(),
                markdown_text: body.clone(),
                external_id: Some(contract.id.to_string()),
                lang: "pt-br",
                signers: vec![NewSigner {
                    name: child.guardian_name.clone(),
                    email: child.guardian_email.clone(),
                    phone_number: child.guardian_phone.clone(),
                }],
            })
            .await?;

        info!(
            contract_id = %contract.id,
            document_token = %document.token,
            "Contract sent for signature"
        );
        Contract::mark_sent(
            &self.pool,
            contract.id,
            &body,
            &document.token,
            document.sign_url(),
        )
        .await?
        .ok_or(ContractError::NotFound)
    }

    /// Mirror the provider's document status onto the contract.
    pub async fn refresh_status(&self, contract_id: Uuid) -> Result<Contract, ContractError> {
        let contract = Contract::find_by_id(&self.pool, contract_id)
            .await?
            .ok_or(ContractError::NotFound)?;
        let token = contract
            .document_token
            .as_deref()
            .ok_or(ContractError::NotSent)?;

        let document = self.provider.get_document(token).await?;
        let status = document.status.contract_status();
        if status == contract.status || contract.status == ContractStatus::Cancelled {
            return Ok(contract);
        }
        info!(
            contract_id = %contract.id,
            from = %contract.status,
            to = %status,
            "Contract status changed at e-signature provider"
        );
        Contract::update_status(&self.pool, contract.id, status)
            .await?
            .ok_or(ContractError::NotFound)
    }
}
