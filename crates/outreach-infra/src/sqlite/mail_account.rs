//! SQLite mail account repository implementation.

use outreach_core::repository::mail_account::MailAccountRepository;
use outreach_types::error::RepositoryError;
use outreach_types::mail::{MailAccount, MailAccountId};
use sqlx::Row;

use super::pool::DatabasePool;
use super::{format_datetime, from_json, parse_datetime, query_err, to_json};

pub struct SqliteMailAccountRepository {
    pool: DatabasePool,
}

impl SqliteMailAccountRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

struct MailAccountRow {
    id: String,
    account_name: String,
    smtp: String,
    imap: Option<String>,
    from_email: String,
    created_at: String,
    updated_at: String,
}

impl MailAccountRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            account_name: row.try_get("account_name")?,
            smtp: row.try_get("smtp")?,
            imap: row.try_get("imap")?,
            from_email: row.try_get("from_email")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn into_account(self) -> Result<MailAccount, RepositoryError> {
        let id = self
            .id
            .parse::<MailAccountId>()
            .map_err(|e| RepositoryError::Query(format!("invalid mail account id: {e}")))?;
        let imap = match self.imap.as_deref() {
            Some(raw) => Some(from_json("imap", raw)?),
            None => None,
        };

        Ok(MailAccount {
            id,
            account_name: self.account_name,
            smtp: from_json("smtp", &self.smtp)?,
            imap,
            from_email: self.from_email,
            created_at: parse_datetime(&self.created_at)?,
            updated_at: parse_datetime(&self.updated_at)?,
        })
    }
}

impl MailAccountRepository for SqliteMailAccountRepository {
    async fn save(&self, account: &MailAccount) -> Result<MailAccount, RepositoryError> {
        let imap = account.imap.as_ref().map(to_json).transpose()?;

        sqlx::query(
            "INSERT INTO mail_accounts (id, account_name, smtp, imap, from_email, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 account_name = excluded.account_name,
                 smtp = excluded.smtp,
                 imap = excluded.imap,
                 from_email = excluded.from_email,
                 updated_at = excluded.updated_at",
        )
        .bind(account.id.to_string())
        .bind(&account.account_name)
        .bind(to_json(&account.smtp)?)
        .bind(imap)
        .bind(&account.from_email)
        .bind(format_datetime(&account.created_at))
        .bind(format_datetime(&account.updated_at))
        .execute(&self.pool.writer)
        .await
        .map_err(query_err)?;

        Ok(account.clone())
    }

    async fn get_by_id(&self, id: &MailAccountId) -> Result<Option<MailAccount>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM mail_accounts WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(query_err)?;

        match row {
            Some(row) => Ok(Some(
                MailAccountRow::from_row(&row)
                    .map_err(query_err)?
                    .into_account()?,
            )),
            None => Ok(None),
        }
    }

    async fn list(&self) -> Result<Vec<MailAccount>, RepositoryError> {
        let rows = sqlx::query("SELECT * FROM mail_accounts ORDER BY account_name ASC")
            .fetch_all(&self.pool.reader)
            .await
            .map_err(query_err)?;

        rows.iter()
            .map(|row| MailAccountRow::from_row(row).map_err(query_err)?.into_account())
            .collect()
    }

    async fn delete(&self, id: &MailAccountId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM mail_accounts WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool.writer)
            .await
            .map_err(query_err)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sqlite::pool::test_pool;
    use chrono::Utc;
    use outreach_types::mail::{ImapSettings, SmtpSettings};

    fn account(name: &str) -> MailAccount {
        let now = Utc::now();
        MailAccount {
            id: MailAccountId::new(),
            account_name: name.to_string(),
            smtp: SmtpSettings {
                host: "smtp.corp.io".to_string(),
                port: 587,
                secure: false,
                username: "me".to_string(),
                password: "pw".to_string(),
            },
            imap: None,
            from_email: "me@corp.io".to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_save_is_upsert() {
        let repo = SqliteMailAccountRepository::new(test_pool().await);
        let mut acc = account("Work");
        repo.save(&acc).await.unwrap();

        acc.account_name = "Work (primary)".to_string();
        acc.imap = Some(ImapSettings {
            host: "imap.corp.io".to_string(),
            port: 993,
            username: "me".to_string(),
            password: "pw".to_string(),
        });
        repo.save(&acc).await.unwrap();

        let all = repo.list().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].account_name, "Work (primary)");
        assert_eq!(all[0].imap.as_ref().map(|i| i.port), Some(993));
        assert_eq!(all[0].smtp.password, "pw");
    }

    #[tokio::test]
    async fn test_list_orders_by_name() {
        let repo = SqliteMailAccountRepository::new(test_pool().await);
        repo.save(&account("Zeta")).await.unwrap();
        repo.save(&account("Alpha")).await.unwrap();

        let names: Vec<String> = repo
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|a| a.account_name)
            .collect();
        assert_eq!(names, vec!["Alpha", "Zeta"]);
    }

    #[tokio::test]
    async fn test_get_and_delete() {
        let repo = SqliteMailAccountRepository::new(test_pool().await);
        let acc = account("Work");
        repo.save(&acc).await.unwrap();

        assert_eq!(repo.get_by_id(&acc.id).await.unwrap().unwrap(), acc);
        repo.delete(&acc.id).await.unwrap();
        assert!(repo.get_by_id(&acc.id).await.unwrap().is_none());
        assert!(matches!(
            repo.delete(&acc.id).await.unwrap_err(),
            RepositoryError::NotFound
        ));
    }
}
