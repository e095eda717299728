use async_trait::async_trait;
use detour_core::error::{Result, StorageError};
use detour_core::rule::{NormalizedRule, RedirectRule, RuleId};
use detour_core::store::{ReadRuleStore, RuleStore, RuleTransaction};
use jiff::Timestamp;
use sqlx::mysql::MySqlRow;
use sqlx::{MySql, MySqlConnection, MySqlPool, Row, Transaction};
use tracing::trace;

const SELECT_BY_ID: &str = r#"
    SELECT id, source_path, destination, external, status, revision, created_at, updated_at
    FROM redirect_rules
    WHERE id = ?
    "#;

const SELECT_BY_SOURCE: &str = r#"
    SELECT id, source_path, destination, external, status, revision, created_at, updated_at
    FROM redirect_rules
    WHERE source_path = ?
    ORDER BY id
    "#;

const SELECT_BY_DESTINATION: &str = r#"
    SELECT id, source_path, destination, external, status, revision, created_at, updated_at
    FROM redirect_rules
    WHERE destination = ?
    ORDER BY id
    "#;

/// MySQL implementation of the rule store.
///
/// `source_path` and `destination` use a binary, no-pad collation so lookups
/// are byte-exact. Write transactions serialize on the single row of
/// `redirect_write_lock`, which also carries the revision counter.
#[derive(Debug, Clone)]
pub struct MySqlRuleStore {
    pool: MySqlPool,
}

impl MySqlRuleStore {
    /// Creates a store from an existing MySQL connection pool.
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Creates a store by opening a new MySQL connection pool.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = MySqlPool::connect(database_url)
            .await
            .map_err(map_sqlx_error)?;
        Ok(Self::new(pool))
    }

    /// Returns a reference to the underlying pool.
    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }

    /// Applies the embedded schema migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StorageError::Operation(format!("migration failed: {e}")))
    }
}

fn now_unix_millis() -> i64 {
    Timestamp::now().as_millisecond()
}

fn parse_timestamp(column: &str, millis: i64) -> Result<Timestamp> {
    Timestamp::from_millisecond(millis).map_err(|e| {
        StorageError::InvalidData(format!("invalid {column} timestamp '{millis}': {e}"))
    })
}

fn rule_from_row(row: &MySqlRow) -> Result<RedirectRule> {
    let id: u64 = row.try_get("id").map_err(map_sqlx_error)?;
    let created_at: i64 = row.try_get("created_at").map_err(map_sqlx_error)?;
    let updated_at: i64 = row.try_get("updated_at").map_err(map_sqlx_error)?;

    Ok(RedirectRule {
        id: RuleId::new(id),
        source: row.try_get("source_path").map_err(map_sqlx_error)?,
        destination: row.try_get("destination").map_err(map_sqlx_error)?,
        external: row.try_get("external").map_err(map_sqlx_error)?,
        status: row.try_get("status").map_err(map_sqlx_error)?,
        revision: row.try_get("revision").map_err(map_sqlx_error)?,
        created_at: parse_timestamp("created_at", created_at)?,
        updated_at: parse_timestamp("updated_at", updated_at)?,
    })
}

fn rules_from_rows(rows: &[MySqlRow]) -> Result<Vec<RedirectRule>> {
    rows.iter().map(rule_from_row).collect()
}

fn map_sqlx_error(err: sqlx::Error) -> StorageError {
    let message = err.to_string();

    match err {
        sqlx::Error::PoolTimedOut => StorageError::Timeout(message),
        sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_) => StorageError::Unavailable(message),
        sqlx::Error::ColumnIndexOutOfBounds { .. }
        | sqlx::Error::ColumnNotFound(_)
        | sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::TypeNotFound { .. }
        | sqlx::Error::Decode(_)
        | sqlx::Error::RowNotFound => StorageError::InvalidData(message),
        _ => StorageError::Query(message),
    }
}

async fn fetch_rule(conn: &mut MySqlConnection, id: RuleId) -> Result<Option<RedirectRule>> {
    let row = sqlx::query(SELECT_BY_ID)
        .bind(id.get())
        .fetch_optional(conn)
        .await
        .map_err(map_sqlx_error)?;

    row.as_ref().map(rule_from_row).transpose()
}

#[async_trait]
impl ReadRuleStore for MySqlRuleStore {
    async fn get(&self, id: RuleId) -> Result<Option<RedirectRule>> {
        let row = sqlx::query(SELECT_BY_ID)
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        row.as_ref().map(rule_from_row).transpose()
    }

    async fn find_by_source(&self, source: &str) -> Result<Vec<RedirectRule>> {
        let rows = sqlx::query(SELECT_BY_SOURCE)
            .bind(source)
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        rules_from_rows(&rows)
    }
}

#[async_trait]
impl RuleStore for MySqlRuleStore {
    async fn begin(&self) -> Result<Box<dyn RuleTransaction>> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        let row = sqlx::query("SELECT revision FROM redirect_write_lock WHERE id = 1 FOR UPDATE")
            .fetch_optional(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        let Some(row) = row else {
            return Err(StorageError::InvalidData(
                "redirect_write_lock row is missing, run migrations first".to_string(),
            ));
        };
        let revision: u64 = row.try_get("revision").map_err(map_sqlx_error)?;

        trace!(revision, "acquired redirect write lock");
        Ok(Box::new(MySqlTransaction { tx, revision }))
    }
}

struct MySqlTransaction {
    tx: Transaction<'static, MySql>,
    revision: u64,
}

#[async_trait]
impl RuleTransaction for MySqlTransaction {
    async fn get(&mut self, id: RuleId) -> Result<Option<RedirectRule>> {
        fetch_rule(&mut *self.tx, id).await
    }

    async fn find_by_source(&mut self, source: &str) -> Result<Vec<RedirectRule>> {
        let rows = sqlx::query(SELECT_BY_SOURCE)
            .bind(source)
            .fetch_all(&mut *self.tx)
            .await
            .map_err(map_sqlx_error)?;

        rules_from_rows(&rows)
    }

    async fn find_by_destination(&mut self, destination: &str) -> Result<Vec<RedirectRule>> {
        let rows = sqlx::query(SELECT_BY_DESTINATION)
            .bind(destination)
            .fetch_all(&mut *self.tx)
            .await
            .map_err(map_sqlx_error)?;

        rules_from_rows(&rows)
    }

    async fn insert_or_update(
        &mut self,
        id: Option<RuleId>,
        rule: &NormalizedRule,
    ) -> Result<RedirectRule> {
        let now = now_unix_millis();
        let revision = self.revision + 1;

        let id = match id {
            None => {
                let result = sqlx::query(
                    r#"
                    INSERT INTO redirect_rules
                        (source_path, destination, external, status, revision, created_at, updated_at)
                    VALUES (?, ?, ?, ?, ?, ?, ?)
                    "#,
                )
                .bind(&rule.source)
                .bind(&rule.destination)
                .bind(rule.external)
                .bind(rule.status)
                .bind(revision)
                .bind(now)
                .bind(now)
                .execute(&mut *self.tx)
                .await
                .map_err(map_sqlx_error)?;

                RuleId::new(result.last_insert_id())
            }
            Some(id) => {
                let result = sqlx::query(
                    r#"
                    UPDATE redirect_rules
                    SET source_path = ?, destination = ?, external = ?, status = ?,
                        revision = ?, updated_at = ?
                    WHERE id = ?
                    "#,
                )
                .bind(&rule.source)
                .bind(&rule.destination)
                .bind(rule.external)
                .bind(rule.status)
                .bind(revision)
                .bind(now)
                .bind(id.get())
                .execute(&mut *self.tx)
                .await
                .map_err(map_sqlx_error)?;

                if result.rows_affected() == 0 {
                    return Err(StorageError::InvalidData(format!(
                        "cannot update missing rule {id}"
                    )));
                }
                id
            }
        };

        self.revision = revision;

        fetch_rule(&mut *self.tx, id).await?.ok_or_else(|| {
            StorageError::InvalidData(format!("rule {id} vanished inside its own transaction"))
        })
    }

    async fn repoint(&mut self, id: RuleId, destination: &str, external: bool) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE redirect_rules
            SET destination = ?, external = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(destination)
        .bind(external)
        .bind(now_unix_millis())
        .bind(id.get())
        .execute(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete(&mut self, id: RuleId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM redirect_rules WHERE id = ?")
            .bind(id.get())
            .execute(&mut *self.tx)
            .await
            .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let MySqlTransaction { mut tx, revision } = *self;

        sqlx::query("UPDATE redirect_write_lock SET revision = ? WHERE id = 1")
            .bind(revision)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        tx.commit().await.map_err(map_sqlx_error)
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        let MySqlTransaction { tx, .. } = *self;
        tx.rollback().await.map_err(map_sqlx_error)
    }
}
