//! Lead repository trait definition.

use outreach_types::error::RepositoryError;
use outreach_types::lead::{Lead, LeadId};

use super::SortOrder;

/// Filter criteria for listing leads.
#[derive(Debug, Clone, Default)]
pub struct LeadFilter {
    pub industry: Option<String>,
    pub region: Option<String>,
    pub tag: Option<String>,
    /// Substring match on email, names and company.
    pub search: Option<String>,
    pub sort_order: Option<SortOrder>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Repository trait for lead persistence.
///
/// Email is unique (stored normalized); inserting an existing email yields
/// `RepositoryError::Conflict`.
pub trait LeadRepository: Send + Sync {
    fn create(
        &self,
        lead: &Lead,
    ) -> impl std::future::Future<Output = Result<Lead, RepositoryError>> + Send;

    /// Insert many leads in a single transaction. Returns the number inserted.
    fn insert_many(
        &self,
        leads: &[Lead],
    ) -> impl std::future::Future<Output = Result<u64, RepositoryError>> + Send;

    fn get_by_id(
        &self,
        id: &LeadId,
    ) -> impl std::future::Future<Output = Result<Option<Lead>, RepositoryError>> + Send;

    /// Leads whose normalized email is in `emails`.
    fn find_by_emails(
        &self,
        emails: &[String],
    ) -> impl std::future::Future<Output = Result<Vec<Lead>, RepositoryError>> + Send;

    fn list(
        &self,
        filter: Option<LeadFilter>,
    ) -> impl std::future::Future<Output = Result<Vec<Lead>, RepositoryError>> + Send;

    fn count(&self) -> impl std::future::Future<Output = Result<i64, RepositoryError>> + Send;

    fn delete(
        &self,
        id: &LeadId,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Delete several leads. Returns how many existed.
    fn delete_many(
        &self,
        ids: &[LeadId],
    ) -> impl std::future::Future<Output = Result<u64, RepositoryError>> + Send;
}
