//! Mail account management.

use chrono::Utc;

use outreach_types::error::{MailError, RepositoryError};
use outreach_types::mail::{MailAccount, MailAccountId, SaveMailAccountRequest};

use crate::mail::{BoxMailTransport, TransportFactory};
use crate::repository::mail_account::MailAccountRepository;

fn storage(e: RepositoryError) -> MailError {
    match e {
        RepositoryError::NotFound => MailError::AccountNotFound,
        other => MailError::StorageError(other.to_string()),
    }
}

pub struct MailAccountService<M: MailAccountRepository, F: TransportFactory> {
    repo: M,
    factory: F,
}

impl<M: MailAccountRepository, F: TransportFactory> MailAccountService<M, F> {
    pub fn new(repo: M, factory: F) -> Self {
        Self { repo, factory }
    }

    /// Create an account, or replace the one with `id`.
    pub async fn save_account(
        &self,
        id: Option<&MailAccountId>,
        request: SaveMailAccountRequest,
    ) -> Result<MailAccount, MailError> {
        let account_name = request.account_name.trim().to_string();
        if account_name.is_empty() {
            return Err(MailError::NotConfigured(
                "account name is required".to_string(),
            ));
        }
        if request.smtp.host.trim().is_empty() {
            return Err(MailError::NotConfigured("SMTP host is required".to_string()));
        }
        if !request.from_email.contains('@') {
            return Err(MailError::InvalidAddress(request.from_email));
        }

        let now = Utc::now();
        let (id, created_at) = match id {
            Some(id) => {
                let existing = self.get_account(id).await?;
                (existing.id, existing.created_at)
            }
            None => (MailAccountId::new(), now),
        };

        let account = MailAccount {
            id,
            account_name,
            smtp: request.smtp,
            imap: request.imap,
            from_email: request.from_email.trim().to_string(),
            created_at,
            updated_at: now,
        };
        let account = self.repo.save(&account).await.map_err(storage)?;
        tracing::info!(account_id = %account.id, name = %account.account_name, "mail account saved");
        Ok(account)
    }

    pub async fn get_account(&self, id: &MailAccountId) -> Result<MailAccount, MailError> {
        self.repo
            .get_by_id(id)
            .await
            .map_err(storage)?
            .ok_or(MailError::AccountNotFound)
    }

    pub async fn list_accounts(&self) -> Result<Vec<MailAccount>, MailError> {
        self.repo.list().await.map_err(storage)
    }

    pub async fn delete_account(&self, id: &MailAccountId) -> Result<(), MailError> {
        self.repo.delete(id).await.map_err(storage)
    }

    /// A transport that sends through this account.
    pub async fn transport_for(&self, id: &MailAccountId) -> Result<BoxMailTransport, MailError> {
        let account = self.get_account(id).await?;
        self.factory.for_account(&account)
    }

    /// Connect to the account's SMTP server and authenticate, sending nothing.
    pub async fn test_connection(&self, id: &MailAccountId) -> Result<(), MailError> {
        let transport = self.transport_for(id).await?;
        match transport.verify().await {
            Ok(()) => {
                tracing::info!(account_id = %id, "mail account connection verified");
                Ok(())
            }
            Err(e) => {
                tracing::warn!(account_id = %id, error = %e, "mail account connection failed");
                Err(e)
            }
        }
    }
}
