use crate::config::database::DbConfig;
use crate::domain::model::{AreaKey, Business, SlugSet};
use crate::domain::ports::ServiceAreaStore;
use crate::utils::error::{EtlError, Result};
use serde_json::Value;
use tokio::task::JoinHandle;
use tokio_postgres::{Client, NoTls};

const SELECT_BUSINESSES: &str =
    "SELECT slug, service_areas::jsonb AS service_areas FROM businesses ORDER BY slug";

// zip 可能是 NULL，用 IS NOT DISTINCT FROM 讓 NULL 也能比對到同一列
const SELECT_SLUGS: &str = "SELECT business_slugs::jsonb AS business_slugs FROM service_areas \
     WHERE city = $1 AND state = $2 AND zip IS NOT DISTINCT FROM $3 FOR UPDATE";

const INSERT_ENTRY: &str =
    "INSERT INTO service_areas (city, state, zip, business_slugs) VALUES ($1, $2, $3, $4)";

const UPDATE_SLUGS: &str = "UPDATE service_areas SET business_slugs = $4 \
     WHERE city = $1 AND state = $2 AND zip IS NOT DISTINCT FROM $3";

/// PostgreSQL 上的 `businesses` / `service_areas` 表
pub struct PgStore {
    client: Client,
    connection: JoinHandle<()>,
    in_transaction: bool,
}

impl PgStore {
    pub async fn connect(config: &DbConfig) -> Result<Self> {
        let pg_config = config.to_pg_config()?;
        tracing::debug!("Connecting to {}", config.describe());

        let (client, connection) = pg_config.connect(NoTls).await?;
        let connection = tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::error!("❌ Database connection error: {}", e);
            }
        });

        Ok(Self {
            client,
            connection,
            in_transaction: false,
        })
    }

    /// 關閉連線並等待背景連線工作結束。未提交的交易由伺服器丟棄。
    pub async fn close(self) {
        let PgStore {
            client, connection, ..
        } = self;
        drop(client);
        if let Err(e) = connection.await {
            tracing::warn!("⚠️ Database connection task ended abnormally: {}", e);
        }
    }

    fn ensure_transaction(&self) -> Result<()> {
        if self.in_transaction {
            Ok(())
        } else {
            Err(EtlError::processing(
                "service_areas writes must happen inside a transaction",
            ))
        }
    }
}

/// 唯一索引不會擋下重複的 NULL zip 列，遇到時指出是哪個鍵
fn ensure_single_entry(key: &AreaKey, rows: usize) -> Result<()> {
    if rows > 1 {
        return Err(EtlError::processing(format!(
            "service_areas has {} rows for {}; merge the duplicates into one row before rerunning",
            rows, key
        )));
    }
    Ok(())
}

impl ServiceAreaStore for PgStore {
    async fn fetch_businesses(&mut self) -> Result<Vec<Business>> {
        let rows = self.client.query(SELECT_BUSINESSES, &[]).await?;

        let mut businesses = Vec::with_capacity(rows.len());
        for row in rows {
            let slug: String = row.try_get("slug")?;
            let service_areas: Option<Value> = row.try_get("service_areas")?;
            businesses.push(Business::new(slug, service_areas));
        }
        Ok(businesses)
    }

    async fn begin(&mut self) -> Result<()> {
        self.client.batch_execute("BEGIN").await?;
        self.in_transaction = true;
        Ok(())
    }

    async fn find_slugs(&mut self, key: &AreaKey) -> Result<Option<SlugSet>> {
        let rows = self
            .client
            .query(SELECT_SLUGS, &[&key.city, &key.state, &key.zip])
            .await?;
        ensure_single_entry(key, rows.len())?;

        match rows.into_iter().next() {
            Some(row) => {
                let raw: Option<Value> = row.try_get("business_slugs")?;
                let slugs = SlugSet::from_json(raw.unwrap_or(Value::Null)).map_err(|reason| {
                    EtlError::processing(format!("service_areas row {}: {}", key, reason))
                })?;
                Ok(Some(slugs))
            }
            None => Ok(None),
        }
    }

    async fn insert_entry(&mut self, key: &AreaKey, slugs: &SlugSet) -> Result<()> {
        self.ensure_transaction()?;
        let payload = slugs.to_json();
        self.client
            .execute(INSERT_ENTRY, &[&key.city, &key.state, &key.zip, &payload])
            .await?;
        Ok(())
    }

    async fn update_slugs(&mut self, key: &AreaKey, slugs: &SlugSet) -> Result<()> {
        self.ensure_transaction()?;
        let payload = slugs.to_json();
        let updated = self
            .client
            .execute(UPDATE_SLUGS, &[&key.city, &key.state, &key.zip, &payload])
            .await?;
        if updated == 0 {
            return Err(EtlError::processing(format!(
                "service_areas row {} disappeared during update",
                key
            )));
        }
        Ok(())
    }

    async fn commit(&mut self) -> Result<()> {
        self.ensure_transaction()?;
        self.client.batch_execute("COMMIT").await?;
        self.in_transaction = false;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<()> {
        if !self.in_transaction {
            return Ok(());
        }
        self.in_transaction = false;
        self.client.batch_execute("ROLLBACK").await?;
        Ok(())
    }
}
