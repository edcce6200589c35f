//! Lead management and import service.

use std::collections::HashMap;

use outreach_types::campaign::CampaignId;
use outreach_types::error::{LeadError, RepositoryError};
use outreach_types::import::{ColumnMapping, ImportSummary, ParsedSheet};
use outreach_types::lead::{CreateLeadRequest, Lead, LeadId, is_plausible_email, normalize_email};

use crate::import::{self, map_rows, split_tags};
use crate::repository::campaign::CampaignRepository;
use crate::repository::lead::{LeadFilter, LeadRepository};

fn storage(e: RepositoryError) -> LeadError {
    match e {
        RepositoryError::NotFound => LeadError::NotFound,
        RepositoryError::Conflict(email) => LeadError::DuplicateEmail(email),
        other => LeadError::StorageError(other.to_string()),
    }
}

/// Service for adding, importing, listing and deleting leads.
pub struct LeadService<L: LeadRepository, C: CampaignRepository> {
    leads: L,
    campaigns: C,
}

impl<L: LeadRepository, C: CampaignRepository> LeadService<L, C> {
    pub fn new(leads: L, campaigns: C) -> Self {
        Self { leads, campaigns }
    }

    /// Import every row of `sheet` as a lead.
    ///
    /// Rows are deduplicated against each other and against stored leads by
    /// normalized email; only new emails are inserted. When `campaign` is
    /// given, every valid row's lead (new or already stored) is attached to
    /// it, in file order.
    pub async fn import_sheet(
        &self,
        sheet: &ParsedSheet,
        mapping: &ColumnMapping,
        campaign: Option<&CampaignId>,
    ) -> Result<ImportSummary, LeadError> {
        if let Some(campaign_id) = campaign {
            self.campaigns
                .get_by_id(campaign_id)
                .await
                .map_err(storage)?
                .ok_or(LeadError::CampaignNotFound)?;
        }

        let mapped = map_rows(sheet, mapping)?;
        let (unique, in_file_duplicates) = Self::detect_duplicates(mapped.leads);

        let emails: Vec<String> = unique.iter().map(|l| l.email.clone()).collect();
        let existing: HashMap<String, LeadId> = self
            .leads
            .find_by_emails(&emails)
            .await
            .map_err(storage)?
            .into_iter()
            .map(|l| (l.email, l.id))
            .collect();

        let mut attach = Vec::with_capacity(unique.len());
        let mut fresh = Vec::new();
        for lead in unique {
            match existing.get(&lead.email) {
                Some(id) => attach.push(id.clone()),
                None => {
                    attach.push(lead.id.clone());
                    fresh.push(lead);
                }
            }
        }

        let imported = self.leads.insert_many(&fresh).await.map_err(storage)?;

        if let Some(campaign_id) = campaign {
            let added = self
                .campaigns
                .add_leads(campaign_id, &attach)
                .await
                .map_err(storage)?;
            tracing::debug!(campaign_id = %campaign_id, added, "attached imported leads");
        }

        let summary = ImportSummary {
            total_rows: sheet.rows.len(),
            imported: imported as usize,
            duplicates: in_file_duplicates + existing.len(),
            invalid: mapped.issues.len(),
            errors: mapped.issues,
        };
        tracing::info!(
            total = summary.total_rows,
            imported = summary.imported,
            duplicates = summary.duplicates,
            invalid = summary.invalid,
            "lead import finished"
        );
        Ok(summary)
    }

    /// Add a single lead by hand.
    pub async fn add_lead(&self, request: CreateLeadRequest) -> Result<Lead, LeadError> {
        if !is_plausible_email(&request.email) {
            return Err(LeadError::InvalidEmail(request.email));
        }
        let email = normalize_email(&request.email);
        if !self
            .leads
            .find_by_emails(std::slice::from_ref(&email))
            .await
            .map_err(storage)?
            .is_empty()
        {
            return Err(LeadError::DuplicateEmail(email));
        }

        let mut lead = Lead::new(&email);
        if let Some(name) = request.name.as_deref() {
            lead.set_full_name(name);
        }
        lead.first_name = request.first_name.or(lead.first_name);
        lead.last_name = request.last_name.or(lead.last_name);
        lead.company = request.company;
        lead.job_title = request.job_title;
        lead.phone = request.phone;
        lead.industry = request.industry;
        lead.region = request.region;
        lead.tags = request
            .tags
            .unwrap_or_default()
            .iter()
            .flat_map(|t| split_tags(t))
            .collect();

        self.leads.create(&lead).await.map_err(storage)
    }

    pub async fn get_lead(&self, id: &LeadId) -> Result<Lead, LeadError> {
        self.leads
            .get_by_id(id)
            .await
            .map_err(storage)?
            .ok_or(LeadError::NotFound)
    }

    /// Drop later leads whose normalized email was already seen; returns
    /// the survivors in order and how many were dropped.
    pub fn detect_duplicates(leads: Vec<Lead>) -> (Vec<Lead>, usize) {
        import::detect_duplicates(leads)
    }

    pub async fn list_leads(&self, filter: Option<LeadFilter>) -> Result<Vec<Lead>, LeadError> {
        self.leads.list(filter).await.map_err(storage)
    }

    pub async fn count_leads(&self) -> Result<i64, LeadError> {
        self.leads.count().await.map_err(storage)
    }

    pub async fn delete_lead(&self, id: &LeadId) -> Result<(), LeadError> {
        self.leads.delete(id).await.map_err(storage)
    }

    /// Delete several leads; returns how many were removed.
    pub async fn delete_leads(&self, ids: &[LeadId]) -> Result<u64, LeadError> {
        self.leads.delete_many(ids).await.map_err(storage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MemoryRepo, sample_campaign};
    use outreach_types::error::ImportError;
    use outreach_types::lead::LeadField;

    fn service(repo: &MemoryRepo) -> LeadService<MemoryRepo, MemoryRepo> {
        LeadService::new(repo.clone(), repo.clone())
    }

    #[test]
    fn test_detect_duplicates_keeps_first_occurrence() {
        let leads = vec![
            Lead::new("a@corp.io"),
            Lead::new("b@corp.io"),
            Lead::new(" A@Corp.io "),
        ];
        let (unique, dropped) =
            LeadService::<MemoryRepo, MemoryRepo>::detect_duplicates(leads);
        assert_eq!(dropped, 1);
        let emails: Vec<&str> = unique.iter().map(|l| l.email.as_str()).collect();
        assert_eq!(emails, vec!["a@corp.io", "b@corp.io"]);
    }

    fn sheet(rows: &[[&str; 2]]) -> ParsedSheet {
        ParsedSheet {
            columns: vec!["Email".to_string(), "Name".to_string()],
            rows: rows
                .iter()
                .map(|r| r.iter().map(|s| s.to_string()).collect())
                .collect(),
        }
    }

    fn mapping() -> ColumnMapping {
        ColumnMapping::new()
            .with(LeadField::Email, "Email")
            .with(LeadField::Name, "Name")
    }

    #[tokio::test]
    async fn test_import_skips_emails_already_stored() {
        let repo = MemoryRepo::new();
        let svc = service(&repo);
        svc.add_lead(CreateLeadRequest {
            email: "known@corp.io".to_string(),
            ..Default::default()
        })
        .await
        .unwrap();

        // N = 4 valid rows, M = 1 already stored.
        let sheet = sheet(&[
            ["a@corp.io", "A"],
            ["KNOWN@corp.io", "Known"],
            ["b@corp.io", "B"],
            ["c@corp.io", "C"],
        ]);
        let summary = svc.import_sheet(&sheet, &mapping(), None).await.unwrap();

        assert_eq!(summary.total_rows, 4);
        assert_eq!(summary.imported, 3);
        assert_eq!(summary.duplicates, 1);
        assert_eq!(summary.invalid, 0);
        assert_eq!(repo.lead_total(), 4);
    }

    #[tokio::test]
    async fn test_import_counts_in_file_duplicates_and_invalid_rows() {
        let repo = MemoryRepo::new();
        let svc = service(&repo);

        let sheet = sheet(&[
            ["a@corp.io", "A"],
            ["a@corp.io ", "A again"],
            ["", "Nobody"],
            ["b@corp.io", "B"],
        ]);
        let summary = svc.import_sheet(&sheet, &mapping(), None).await.unwrap();

        assert_eq!(summary.imported, 2);
        assert_eq!(summary.duplicates, 1);
        assert_eq!(summary.invalid, 1);
        assert_eq!(summary.errors[0].row, 4);
    }

    #[tokio::test]
    async fn test_import_attaches_new_and_existing_leads_to_campaign() {
        let repo = MemoryRepo::new();
        let campaign = repo.seed(sample_campaign(1), vec![]);
        let svc = service(&repo);
        svc.add_lead(CreateLeadRequest {
            email: "old@corp.io".to_string(),
            ..Default::default()
        })
        .await
        .unwrap();

        let sheet = sheet(&[["new@corp.io", "New"], ["old@corp.io", "Old"]]);
        svc.import_sheet(&sheet, &mapping(), Some(&campaign.id))
            .await
            .unwrap();

        let attached = repo.campaign(&campaign.id).unwrap();
        assert_eq!(attached.lead_count, 2);
    }

    #[tokio::test]
    async fn test_import_into_missing_campaign_fails() {
        let svc = service(&MemoryRepo::new());
        let err = svc
            .import_sheet(&sheet(&[["a@b.co", "A"]]), &mapping(), Some(&CampaignId::new()))
            .await
            .unwrap_err();
        assert!(matches!(err, LeadError::CampaignNotFound));
    }

    #[tokio::test]
    async fn test_import_without_email_mapping_fails() {
        let svc = service(&MemoryRepo::new());
        let err = svc
            .import_sheet(
                &sheet(&[["a@b.co", "A"]]),
                &ColumnMapping::new().with(LeadField::Name, "Name"),
                None,
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LeadError::Import(ImportError::MissingEmailMapping)
        ));
    }

    #[tokio::test]
    async fn test_add_lead_validates_and_rejects_duplicates() {
        let svc = service(&MemoryRepo::new());

        let err = svc
            .add_lead(CreateLeadRequest {
                email: "nope".to_string(),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, LeadError::InvalidEmail(_)));

        let lead = svc
            .add_lead(CreateLeadRequest {
                email: " Ada@Example.com".to_string(),
                name: Some("Ada Lovelace".to_string()),
                tags: Some(vec!["vip, math".to_string()]),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(lead.email, "ada@example.com");
        assert_eq!(lead.last_name.as_deref(), Some("Lovelace"));
        assert_eq!(lead.tags, vec!["vip", "math"]);

        let err = svc
            .add_lead(CreateLeadRequest {
                email: "ADA@example.com".to_string(),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, LeadError::DuplicateEmail(e) if e == "ada@example.com"));
    }

    #[tokio::test]
    async fn test_list_filters_by_tag_and_deletes() {
        let repo = MemoryRepo::new();
        let svc = service(&repo);
        let vip = svc
            .add_lead(CreateLeadRequest {
                email: "vip@corp.io".to_string(),
                tags: Some(vec!["vip".to_string()]),
                ..Default::default()
            })
            .await
            .unwrap();
        svc.add_lead(CreateLeadRequest {
            email: "plain@corp.io".to_string(),
            ..Default::default()
        })
        .await
        .unwrap();

        let tagged = svc
            .list_leads(Some(LeadFilter {
                tag: Some("vip".to_string()),
                ..Default::default()
            }))
            .await
            .unwrap();
        assert_eq!(tagged.len(), 1);
        assert_eq!(tagged[0].id, vip.id);

        svc.delete_lead(&vip.id).await.unwrap();
        assert!(matches!(
            svc.get_lead(&vip.id).await.unwrap_err(),
            LeadError::NotFound
        ));
        assert_eq!(svc.count_leads().await.unwrap(), 1);
    }
}
