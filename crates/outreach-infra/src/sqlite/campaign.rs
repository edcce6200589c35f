//! SQLite campaign repository implementation.

use outreach_core::repository::SortOrder;
use outreach_core::repository::campaign::{CampaignFilter, CampaignRepository};
use outreach_types::campaign::{Campaign, CampaignId, CampaignStatus};
use outreach_types::error::RepositoryError;
use outreach_types::lead::{Lead, LeadId};
use sqlx::Row;

use super::lead::rows_to_leads;
use super::pool::DatabasePool;
use super::{format_datetime, from_json, parse_datetime, query_err, to_json};

const SELECT_CAMPAIGN: &str = "SELECT c.*,
        (SELECT COUNT(*) FROM campaign_leads cl WHERE cl.campaign_id = c.id) AS lead_count
     FROM campaigns c";

pub struct SqliteCampaignRepository {
    pool: DatabasePool,
}

impl SqliteCampaignRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    async fn fetch(&self, id: &CampaignId) -> Result<Option<Campaign>, RepositoryError> {
        let sql = format!("{SELECT_CAMPAIGN} WHERE c.id = ?");
        let row = sqlx::query(&sql)
            .bind(id.to_string())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(query_err)?;

        match row {
            Some(row) => Ok(Some(
                CampaignRow::from_row(&row).map_err(query_err)?.into_campaign()?,
            )),
            None => Ok(None),
        }
    }
}

/// Internal row type for mapping SQLite rows to domain Campaign.
struct CampaignRow {
    id: String,
    name: String,
    status: String,
    sender: String,
    reply_to: Option<String>,
    steps: String,
    ab_test: Option<String>,
    schedule: String,
    follow_up_rules: String,
    tracking: String,
    metrics: String,
    progress: i64,
    lead_count: i64,
    created_at: String,
    updated_at: String,
}

impl CampaignRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            status: row.try_get("status")?,
            sender: row.try_get("sender")?,
            reply_to: row.try_get("reply_to")?,
            steps: row.try_get("steps")?,
            ab_test: row.try_get("ab_test")?,
            schedule: row.try_get("schedule")?,
            follow_up_rules: row.try_get("follow_up_rules")?,
            tracking: row.try_get("tracking")?,
            metrics: row.try_get("metrics")?,
            progress: row.try_get("progress")?,
            lead_count: row.try_get("lead_count")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn into_campaign(self) -> Result<Campaign, RepositoryError> {
        let id = self
            .id
            .parse::<CampaignId>()
            .map_err(|e| RepositoryError::Query(format!("invalid campaign id: {e}")))?;
        let status = self
            .status
            .parse::<CampaignStatus>()
            .map_err(RepositoryError::Query)?;
        let ab_test = match self.ab_test.as_deref() {
            Some(raw) => Some(from_json("ab_test", raw)?),
            None => None,
        };

        Ok(Campaign {
            id,
            name: self.name,
            status,
            sender: from_json("sender", &self.sender)?,
            reply_to: self.reply_to,
            steps: from_json("steps", &self.steps)?,
            ab_test,
            schedule: from_json("schedule", &self.schedule)?,
            follow_up_rules: from_json("follow_up_rules", &self.follow_up_rules)?,
            tracking: from_json("tracking", &self.tracking)?,
            metrics: from_json("metrics", &self.metrics)?,
            progress: self.progress.clamp(0, 100) as u8,
            lead_count: self.lead_count,
            created_at: parse_datetime(&self.created_at)?,
            updated_at: parse_datetime(&self.updated_at)?,
        })
    }
}

fn ab_test_json(campaign: &Campaign) -> Result<Option<String>, RepositoryError> {
    campaign.ab_test.as_ref().map(to_json).transpose()
}

impl CampaignRepository for SqliteCampaignRepository {
    async fn create(&self, campaign: &Campaign) -> Result<Campaign, RepositoryError> {
        sqlx::query(
            "INSERT INTO campaigns (id, name, status, sender, reply_to, steps, ab_test, schedule, follow_up_rules, tracking, metrics, progress, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(campaign.id.to_string())
        .bind(&campaign.name)
        .bind(campaign.status.to_string())
        .bind(to_json(&campaign.sender)?)
        .bind(&campaign.reply_to)
        .bind(to_json(&campaign.steps)?)
        .bind(ab_test_json(campaign)?)
        .bind(to_json(&campaign.schedule)?)
        .bind(to_json(&campaign.follow_up_rules)?)
        .bind(to_json(&campaign.tracking)?)
        .bind(to_json(&campaign.metrics)?)
        .bind(i64::from(campaign.progress))
        .bind(format_datetime(&campaign.created_at))
        .bind(format_datetime(&campaign.updated_at))
        .execute(&self.pool.writer)
        .await
        .map_err(query_err)?;

        let mut created = campaign.clone();
        created.lead_count = 0;
        Ok(created)
    }

    async fn get_by_id(&self, id: &CampaignId) -> Result<Option<Campaign>, RepositoryError> {
        self.fetch(id).await
    }

    async fn list(&self, filter: Option<CampaignFilter>) -> Result<Vec<Campaign>, RepositoryError> {
        let filter = filter.unwrap_or_default();
        let mut sql = String::from(SELECT_CAMPAIGN);

        if filter.status.is_some() {
            sql.push_str(" WHERE c.status = ?");
        }

        let order = match filter.sort_order.unwrap_or_default() {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        };
        sql.push_str(&format!(" ORDER BY c.created_at {order}"));

        if let Some(limit) = filter.limit {
            sql.push_str(&format!(" LIMIT {limit}"));
            if let Some(offset) = filter.offset {
                sql.push_str(&format!(" OFFSET {offset}"));
            }
        }

        let mut query = sqlx::query(&sql);
        if let Some(status) = &filter.status {
            query = query.bind(status.to_string());
        }

        let rows = query
            .fetch_all(&self.pool.reader)
            .await
            .map_err(query_err)?;

        rows.iter()
            .map(|row| CampaignRow::from_row(row).map_err(query_err)?.into_campaign())
            .collect()
    }

    async fn update(&self, campaign: &Campaign) -> Result<Campaign, RepositoryError> {
        let result = sqlx::query(
            "UPDATE campaigns SET name = ?, status = ?, sender = ?, reply_to = ?, steps = ?, ab_test = ?,
                 schedule = ?, follow_up_rules = ?, tracking = ?, metrics = ?, progress = ?, updated_at = ?
             WHERE id = ?",
        )
        .bind(&campaign.name)
        .bind(campaign.status.to_string())
        .bind(to_json(&campaign.sender)?)
        .bind(&campaign.reply_to)
        .bind(to_json(&campaign.steps)?)
        .bind(ab_test_json(campaign)?)
        .bind(to_json(&campaign.schedule)?)
        .bind(to_json(&campaign.follow_up_rules)?)
        .bind(to_json(&campaign.tracking)?)
        .bind(to_json(&campaign.metrics)?)
        .bind(i64::from(campaign.progress))
        .bind(format_datetime(&campaign.updated_at))
        .bind(campaign.id.to_string())
        .execute(&self.pool.writer)
        .await
        .map_err(query_err)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        self.fetch(&campaign.id)
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    async fn delete(&self, id: &CampaignId) -> Result<(), RepositoryError> {
        // campaign_leads rows go with it via ON DELETE CASCADE.
        let result = sqlx::query("DELETE FROM campaigns WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool.writer)
            .await
            .map_err(query_err)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn set_leads(&self, id: &CampaignId, lead_ids: &[LeadId]) -> Result<(), RepositoryError> {
        let mut tx = self.pool.writer.begin().await.map_err(query_err)?;

        sqlx::query("DELETE FROM campaign_leads WHERE campaign_id = ?")
            .bind(id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(query_err)?;

        for (position, lead_id) in lead_ids.iter().enumerate() {
            sqlx::query(
                "INSERT OR IGNORE INTO campaign_leads (campaign_id, lead_id, position) VALUES (?, ?, ?)",
            )
            .bind(id.to_string())
            .bind(lead_id.to_string())
            .bind(position as i64)
            .execute(&mut *tx)
            .await
            .map_err(query_err)?;
        }

        tx.commit().await.map_err(query_err)?;
        tracing::debug!(campaign_id = %id, leads = lead_ids.len(), "campaign recipients replaced");
        Ok(())
    }

    async fn add_leads(&self, id: &CampaignId, lead_ids: &[LeadId]) -> Result<u64, RepositoryError> {
        if lead_ids.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.writer.begin().await.map_err(query_err)?;

        let (last,): (i64,) = sqlx::query_as(
            "SELECT COALESCE(MAX(position), -1) FROM campaign_leads WHERE campaign_id = ?",
        )
        .bind(id.to_string())
        .fetch_one(&mut *tx)
        .await
        .map_err(query_err)?;

        let mut next = last + 1;
        let mut added = 0;
        for lead_id in lead_ids {
            let result = sqlx::query(
                "INSERT OR IGNORE INTO campaign_leads (campaign_id, lead_id, position) VALUES (?, ?, ?)",
            )
            .bind(id.to_string())
            .bind(lead_id.to_string())
            .bind(next)
            .execute(&mut *tx)
            .await
            .map_err(query_err)?;

            if result.rows_affected() > 0 {
                added += 1;
                next += 1;
            }
        }

        tx.commit().await.map_err(query_err)?;
        Ok(added)
    }

    async fn list_leads(&self, id: &CampaignId) -> Result<Vec<Lead>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT l.* FROM leads l
             JOIN campaign_leads cl ON cl.lead_id = l.id
             WHERE cl.campaign_id = ?
             ORDER BY cl.position ASC",
        )
        .bind(id.to_string())
        .fetch_all(&self.pool.reader)
        .await
        .map_err(query_err)?;

        rows_to_leads(&rows)
    }
}
