//! Mail account repository trait definition.

use outreach_types::error::RepositoryError;
use outreach_types::mail::{MailAccount, MailAccountId};

pub trait MailAccountRepository: Send + Sync {
    /// Insert or replace by id.
    fn save(
        &self,
        account: &MailAccount,
    ) -> impl std::future::Future<Output = Result<MailAccount, RepositoryError>> + Send;

    fn get_by_id(
        &self,
        id: &MailAccountId,
    ) -> impl std::future::Future<Output = Result<Option<MailAccount>, RepositoryError>> + Send;

    /// All accounts ordered by name.
    fn list(&self) -> impl std::future::Future<Output = Result<Vec<MailAccount>, RepositoryError>> + Send;

    fn delete(
        &self,
        id: &MailAccountId,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;
}
