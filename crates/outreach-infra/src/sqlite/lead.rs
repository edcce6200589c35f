//! SQLite lead repository implementation.

use outreach_core::repository::SortOrder;
use outreach_core::repository::lead::{LeadFilter, LeadRepository};
use outreach_types::error::RepositoryError;
use outreach_types::lead::{Lead, LeadId};
use sqlx::Row;

use super::pool::DatabasePool;
use super::{format_datetime, from_json, is_unique_violation, parse_datetime, query_err, to_json};

/// SQLite caps bound parameters per statement; IN lists are chunked below it.
const IN_CHUNK: usize = 500;

pub struct SqliteLeadRepository {
    pool: DatabasePool,
}

impl SqliteLeadRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

/// Internal row type for mapping SQLite rows to domain Lead.
pub(crate) struct LeadRow {
    id: String,
    email: String,
    first_name: Option<String>,
    last_name: Option<String>,
    company: Option<String>,
    job_title: Option<String>,
    phone: Option<String>,
    industry: Option<String>,
    region: Option<String>,
    tags: String,
    custom_fields: String,
    engagement: String,
    created_at: String,
}

impl LeadRow {
    pub(crate) fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            email: row.try_get("email")?,
            first_name: row.try_get("first_name")?,
            last_name: row.try_get("last_name")?,
            company: row.try_get("company")?,
            job_title: row.try_get("job_title")?,
            phone: row.try_get("phone")?,
            industry: row.try_get("industry")?,
            region: row.try_get("region")?,
            tags: row.try_get("tags")?,
            custom_fields: row.try_get("custom_fields")?,
            engagement: row.try_get("engagement")?,
            created_at: row.try_get("created_at")?,
        })
    }

    pub(crate) fn into_lead(self) -> Result<Lead, RepositoryError> {
        let id = self
            .id
            .parse::<LeadId>()
            .map_err(|e| RepositoryError::Query(format!("invalid lead id: {e}")))?;

        Ok(Lead {
            id,
            email: self.email,
            first_name: self.first_name,
            last_name: self.last_name,
            company: self.company,
            job_title: self.job_title,
            phone: self.phone,
            industry: self.industry,
            region: self.region,
            tags: from_json("tags", &self.tags)?,
            custom_fields: from_json("custom_fields", &self.custom_fields)?,
            engagement: from_json("engagement", &self.engagement)?,
            created_at: parse_datetime(&self.created_at)?,
        })
    }
}

pub(crate) fn rows_to_leads(rows: &[sqlx::sqlite::SqliteRow]) -> Result<Vec<Lead>, RepositoryError> {
    rows.iter()
        .map(|row| LeadRow::from_row(row).map_err(query_err)?.into_lead())
        .collect()
}

const INSERT_LEAD: &str = "INSERT INTO leads (id, email, first_name, last_name, company, job_title, phone, industry, region, tags, custom_fields, engagement, created_at)
     VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)";

fn bind_lead<'q>(
    query: sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>>,
    lead: &'q Lead,
) -> Result<sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>>, RepositoryError> {
    Ok(query
        .bind(lead.id.to_string())
        .bind(&lead.email)
        .bind(&lead.first_name)
        .bind(&lead.last_name)
        .bind(&lead.company)
        .bind(&lead.job_title)
        .bind(&lead.phone)
        .bind(&lead.industry)
        .bind(&lead.region)
        .bind(to_json(&lead.tags)?)
        .bind(to_json(&lead.custom_fields)?)
        .bind(to_json(&lead.engagement)?)
        .bind(format_datetime(&lead.created_at)))
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

impl LeadRepository for SqliteLeadRepository {
    async fn create(&self, lead: &Lead) -> Result<Lead, RepositoryError> {
        let result = bind_lead(sqlx::query(INSERT_LEAD), lead)?
            .execute(&self.pool.writer)
            .await;

        match result {
            Ok(_) => Ok(lead.clone()),
            Err(e) if is_unique_violation(&e) => Err(RepositoryError::Conflict(lead.email.clone())),
            Err(e) => Err(query_err(e)),
        }
    }

    async fn insert_many(&self, leads: &[Lead]) -> Result<u64, RepositoryError> {
        if leads.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.writer.begin().await.map_err(query_err)?;
        let mut inserted = 0;
        for lead in leads {
            let result = bind_lead(sqlx::query(INSERT_LEAD), lead)?
                .execute(&mut *tx)
                .await;
            match result {
                Ok(r) => inserted += r.rows_affected(),
                Err(e) if is_unique_violation(&e) => {
                    // Dropping the transaction rolls it back.
                    return Err(RepositoryError::Conflict(lead.email.clone()));
                }
                Err(e) => return Err(query_err(e)),
            }
        }
        tx.commit().await.map_err(query_err)?;

        tracing::debug!(inserted, "bulk lead insert committed");
        Ok(inserted)
    }

    async fn get_by_id(&self, id: &LeadId) -> Result<Option<Lead>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM leads WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(query_err)?;

        match row {
            Some(row) => Ok(Some(
                LeadRow::from_row(&row).map_err(query_err)?.into_lead()?,
            )),
            None => Ok(None),
        }
    }

    async fn find_by_emails(&self, emails: &[String]) -> Result<Vec<Lead>, RepositoryError> {
        let mut found = Vec::new();
        for chunk in emails.chunks(IN_CHUNK) {
            let sql = format!(
                "SELECT * FROM leads WHERE email IN ({})",
                placeholders(chunk.len())
            );
            let mut query = sqlx::query(&sql);
            for email in chunk {
                query = query.bind(email);
            }
            let rows = query
                .fetch_all(&self.pool.reader)
                .await
                .map_err(query_err)?;
            found.extend(rows_to_leads(&rows)?);
        }
        Ok(found)
    }

    async fn list(&self, filter: Option<LeadFilter>) -> Result<Vec<Lead>, RepositoryError> {
        let filter = filter.unwrap_or_default();
        let mut sql = String::from("SELECT * FROM leads");
        let mut conditions: Vec<&str> = Vec::new();
        let mut binds: Vec<String> = Vec::new();

        if let Some(industry) = filter.industry {
            conditions.push("industry = ? COLLATE NOCASE");
            binds.push(industry);
        }
        if let Some(region) = filter.region {
            conditions.push("region = ? COLLATE NOCASE");
            binds.push(region);
        }
        if let Some(tag) = filter.tag {
            conditions.push("EXISTS (SELECT 1 FROM json_each(leads.tags) WHERE json_each.value = ?)");
            binds.push(tag);
        }
        if let Some(search) = filter.search {
            conditions.push(
                "(email LIKE ? OR first_name LIKE ? OR last_name LIKE ? OR company LIKE ?)",
            );
            let pattern = format!("%{search}%");
            binds.extend(std::iter::repeat_n(pattern, 4));
        }

        if !conditions.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&conditions.join(" AND "));
        }

        let order = match filter.sort_order.unwrap_or_default() {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        };
        sql.push_str(&format!(" ORDER BY created_at {order}, id {order}"));

        if let Some(limit) = filter.limit {
            sql.push_str(&format!(" LIMIT {limit}"));
            if let Some(offset) = filter.offset {
                sql.push_str(&format!(" OFFSET {offset}"));
            }
        }

        let mut query = sqlx::query(&sql);
        for value in &binds {
            query = query.bind(value);
        }
        let rows = query
            .fetch_all(&self.pool.reader)
            .await
            .map_err(query_err)?;
        rows_to_leads(&rows)
    }

    async fn count(&self) -> Result<i64, RepositoryError> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM leads")
            .fetch_one(&self.pool.reader)
            .await
            .map_err(query_err)?;
        Ok(row.0)
    }

    async fn delete(&self, id: &LeadId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM leads WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool.writer)
            .await
            .map_err(query_err)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn delete_many(&self, ids: &[LeadId]) -> Result<u64, RepositoryError> {
        let mut tx = self.pool.writer.begin().await.map_err(query_err)?;
        let mut deleted = 0;
        for chunk in ids.chunks(IN_CHUNK) {
            let sql = format!(
                "DELETE FROM leads WHERE id IN ({})",
                placeholders(chunk.len())
            );
            let mut query = sqlx::query(&sql);
            for id in chunk {
                query = query.bind(id.to_string());
            }
            deleted += query
                .execute(&mut *tx)
                .await
                .map_err(query_err)?
                .rows_affected();
        }
        tx.commit().await.map_err(query_err)?;
        Ok(deleted)
    }
}
