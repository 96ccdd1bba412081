mod seed;

use std::sync::Arc;

use anyhow::{Context, Result};
use farm_core::{
    Crop, FaqEntry, FarmUser, HarvestRecord, StoreStats, Supplier, Transaction,
};
use parking_lot::RwLock;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Row, Sqlite, SqlitePool};
use tracing::info;

pub use seed::{SeedData, SeedReport};

/// Read side of the knowledge store used by the chat router. Crop names are
/// matched case-insensitively; multi-row lookups return the first row in
/// insertion order.
pub trait KnowledgeRepository: Send + Sync {
    async fn list_crop_names(&self) -> Result<Vec<String>>;
    async fn crop_by_name(&self, name: &str) -> Result<Option<Crop>>;
    async fn harvest_date(&self, crop_name: &str) -> Result<Option<String>>;
    async fn supplier_for_crop(&self, crop_name: &str) -> Result<Option<Supplier>>;
    async fn count_transactions(&self, status: Option<&str>) -> Result<i64>;
    async fn faq_answer(&self, question: &str) -> Result<Option<String>>;
    async fn stats(&self) -> Result<StoreStats>;
}

#[derive(Debug, Default)]
struct Tables {
    users: Vec<FarmUser>,
    crops: Vec<Crop>,
    harvests: Vec<HarvestRecord>,
    suppliers: Vec<Supplier>,
    faqs: Vec<FaqEntry>,
    transactions: Vec<Transaction>,
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, data: &SeedData) -> SeedReport {
        let mut tables = self.tables.write();
        SeedReport {
            users: fill_if_empty(&mut tables.users, &data.users),
            crops: fill_if_empty(&mut tables.crops, &data.crops),
            harvests: fill_if_empty(&mut tables.harvests, &data.harvests),
            suppliers: fill_if_empty(&mut tables.suppliers, &data.suppliers),
            faqs: fill_if_empty(&mut tables.faqs, &data.faqs),
            transactions: fill_if_empty(&mut tables.transactions, &data.transactions),
        }
    }
}

fn fill_if_empty<T: Clone>(table: &mut Vec<T>, rows: &[T]) -> bool {
    if !table.is_empty() || rows.is_empty() {
        return false;
    }
    table.extend_from_slice(rows);
    true
}

/// Crop names and FAQ questions are folded in Rust on both backends;
/// SQLite's `lower()` only folds ASCII.
fn same_name(lhs: &str, rhs: &str) -> bool {
    lhs.to_lowercase() == rhs.to_lowercase()
}

fn same_question(stored: &str, asked: &str) -> bool {
    same_name(stored.trim(), asked.trim())
}

impl KnowledgeRepository for MemoryStore {
    async fn list_crop_names(&self) -> Result<Vec<String>> {
        Ok(self
            .tables
            .read()
            .crops
            .iter()
            .map(|crop| crop.name.clone())
            .collect())
    }

    async fn crop_by_name(&self, name: &str) -> Result<Option<Crop>> {
        Ok(self
            .tables
            .read()
            .crops
            .iter()
            .find(|crop| same_name(&crop.name, name))
            .cloned())
    }

    async fn harvest_date(&self, crop_name: &str) -> Result<Option<String>> {
        Ok(self
            .tables
            .read()
            .harvests
            .iter()
            .find(|row| same_name(&row.crop_name, crop_name))
            .map(|row| row.harvest_date.clone()))
    }

    async fn supplier_for_crop(&self, crop_name: &str) -> Result<Option<Supplier>> {
        Ok(self
            .tables
            .read()
            .suppliers
            .iter()
            .find(|row| same_name(&row.crop_name, crop_name))
            .cloned())
    }

    async fn count_transactions(&self, status: Option<&str>) -> Result<i64> {
        let tables = self.tables.read();
        let count = match status {
            Some(status) => tables
                .transactions
                .iter()
                .filter(|row| row.status.as_deref() == Some(status))
                .count(),
            None => tables.transactions.len(),
        };
        Ok(count as i64)
    }

    async fn faq_answer(&self, question: &str) -> Result<Option<String>> {
        Ok(self
            .tables
            .read()
            .faqs
            .iter()
            .find(|row| same_question(&row.question, question))
            .map(|row| row.answer.clone()))
    }

    async fn stats(&self) -> Result<StoreStats> {
        let tables = self.tables.read();
        Ok(StoreStats {
            users: tables.users.len() as i64,
            crops: tables.crops.len() as i64,
            harvests: tables.harvests.len() as i64,
            suppliers: tables.suppliers.len() as i64,
            faqs: tables.faqs.len() as i64,
            transactions: tables.transactions.len() as i64,
        })
    }
}

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS users (
      id INTEGER PRIMARY KEY AUTOINCREMENT,
      name TEXT NOT NULL,
      location TEXT,
      contact TEXT
    );
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS crops (
      id INTEGER PRIMARY KEY AUTOINCREMENT,
      name TEXT NOT NULL UNIQUE,
      season TEXT,
      fertilizer TEXT,
      water_requirement TEXT
    );
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS faq (
      id INTEGER PRIMARY KEY AUTOINCREMENT,
      question TEXT NOT NULL,
      answer TEXT NOT NULL
    );
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS harvest_info (
      id INTEGER PRIMARY KEY AUTOINCREMENT,
      crop_name TEXT NOT NULL,
      harvest_date TEXT NOT NULL
    );
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS suppliers (
      id INTEGER PRIMARY KEY AUTOINCREMENT,
      crop_name TEXT NOT NULL,
      supplier_name TEXT NOT NULL,
      location TEXT,
      contact TEXT
    );
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS transactions (
      id INTEGER PRIMARY KEY AUTOINCREMENT,
      crop_name TEXT,
      status TEXT,
      details TEXT
    );
    "#,
];

#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub async fn connect(database_url: &str) -> Result<Self> {
        // Every connection to `:memory:` opens a fresh database, so in-memory
        // URLs are pinned to a single connection.
        let max_connections = if database_url.contains(":memory:") { 1 } else { 5 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .with_context(|| format!("failed connecting to sqlite at {}", database_url))?;

        let store = Self { pool };
        store.ensure_schema().await?;
        Ok(store)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn ensure_schema(&self) -> Result<()> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    pub async fn seed(&self, data: &SeedData) -> Result<SeedReport> {
        let mut tx = self.pool.begin().await?;
        let mut report = SeedReport::default();

        if table_is_empty(&mut tx, "users").await? && !data.users.is_empty() {
            for row in &data.users {
                sqlx::query("INSERT INTO users (name, location, contact) VALUES (?1, ?2, ?3)")
                    .bind(&row.name)
                    .bind(&row.location)
                    .bind(&row.contact)
                    .execute(&mut *tx)
                    .await?;
            }
            report.users = true;
        }

        if table_is_empty(&mut tx, "crops").await? && !data.crops.is_empty() {
            for row in &data.crops {
                sqlx::query(
                    r#"
                    INSERT INTO crops (name, season, fertilizer, water_requirement)
                    VALUES (?1, ?2, ?3, ?4)
                    "#,
                )
                .bind(&row.name)
                .bind(&row.season)
                .bind(&row.fertilizer)
                .bind(&row.water_requirement)
                .execute(&mut *tx)
                .await?;
            }
            report.crops = true;
        }

        if table_is_empty(&mut tx, "harvest_info").await? && !data.harvests.is_empty() {
            for row in &data.harvests {
                sqlx::query("INSERT INTO harvest_info (crop_name, harvest_date) VALUES (?1, ?2)")
                    .bind(&row.crop_name)
                    .bind(&row.harvest_date)
                    .execute(&mut *tx)
                    .await?;
            }
            report.harvests = true;
        }

        if table_is_empty(&mut tx, "suppliers").await? && !data.suppliers.is_empty() {
            for row in &data.suppliers {
                sqlx::query(
                    r#"
                    INSERT INTO suppliers (crop_name, supplier_name, location, contact)
                    VALUES (?1, ?2, ?3, ?4)
                    "#,
                )
                .bind(&row.crop_name)
                .bind(&row.supplier_name)
                .bind(&row.location)
                .bind(&row.contact)
                .execute(&mut *tx)
                .await?;
            }
            report.suppliers = true;
        }

        if table_is_empty(&mut tx, "faq").await? && !data.faqs.is_empty() {
            for row in &data.faqs {
                sqlx::query("INSERT INTO faq (question, answer) VALUES (?1, ?2)")
                    .bind(&row.question)
                    .bind(&row.answer)
                    .execute(&mut *tx)
                    .await?;
            }
            report.faqs = true;
        }

        if table_is_empty(&mut tx, "transactions").await? && !data.transactions.is_empty() {
            for row in &data.transactions {
                sqlx::query(
                    "INSERT INTO transactions (crop_name, status, details) VALUES (?1, ?2, ?3)",
                )
                .bind(&row.crop_name)
                .bind(&row.status)
                .bind(&row.details)
                .execute(&mut *tx)
                .await?;
            }
            report.transactions = true;
        }

        tx.commit().await.context("failed committing seed data")?;
        Ok(report)
    }

    async fn count_rows(&self, table: &str) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

async fn table_is_empty(tx: &mut sqlx::Transaction<'_, Sqlite>, table: &str) -> Result<bool> {
    let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(&mut **tx)
        .await?;
    Ok(count == 0)
}

impl KnowledgeRepository for SqliteStore {
    async fn list_crop_names(&self) -> Result<Vec<String>> {
        let names = sqlx::query_scalar("SELECT name FROM crops ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(names)
    }

    async fn crop_by_name(&self, name: &str) -> Result<Option<Crop>> {
        let rows = sqlx::query(
            "SELECT name, season, fertilizer, water_requirement FROM crops ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| Crop {
                name: row.get("name"),
                season: row.get("season"),
                fertilizer: row.get("fertilizer"),
                water_requirement: row.get("water_requirement"),
            })
            .find(|crop| same_name(&crop.name, name)))
    }

    async fn harvest_date(&self, crop_name: &str) -> Result<Option<String>> {
        let rows: Vec<(String, String)> =
            sqlx::query_as("SELECT crop_name, harvest_date FROM harvest_info ORDER BY id")
                .fetch_all(&self.pool)
                .await?;

        Ok(rows
            .into_iter()
            .find(|(name, _)| same_name(name, crop_name))
            .map(|(_, date)| date))
    }

    async fn supplier_for_crop(&self, crop_name: &str) -> Result<Option<Supplier>> {
        let rows = sqlx::query(
            "SELECT crop_name, supplier_name, location, contact FROM suppliers ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| Supplier {
                crop_name: row.get("crop_name"),
                supplier_name: row.get("supplier_name"),
                location: row.get("location"),
                contact: row.get("contact"),
            })
            .find(|supplier| same_name(&supplier.crop_name, crop_name)))
    }

    async fn count_transactions(&self, status: Option<&str>) -> Result<i64> {
        let count: i64 = match status {
            Some(status) => {
                sqlx::query_scalar("SELECT COUNT(*) FROM transactions WHERE status = ?1")
                    .bind(status)
                    .fetch_one(&self.pool)
                    .await?
            }
            None => self.count_rows("transactions").await?,
        };
        Ok(count)
    }

    async fn faq_answer(&self, question: &str) -> Result<Option<String>> {
        let rows: Vec<(String, String)> =
            sqlx::query_as("SELECT question, answer FROM faq ORDER BY id")
                .fetch_all(&self.pool)
                .await?;

        Ok(rows
            .into_iter()
            .find(|(stored, _)| same_question(stored, question))
            .map(|(_, answer)| answer))
    }

    async fn stats(&self) -> Result<StoreStats> {
        Ok(StoreStats {
            users: self.count_rows("users").await?,
            crops: self.count_rows("crops").await?,
            harvests: self.count_rows("harvest_info").await?,
            suppliers: self.count_rows("suppliers").await?,
            faqs: self.count_rows("faq").await?,
            transactions: self.count_rows("transactions").await?,
        })
    }
}

#[derive(Clone)]
pub enum Store {
    Memory(MemoryStore),
    Sqlite(SqliteStore),
}

impl Store {
    pub fn memory() -> Self {
        Self::Memory(MemoryStore::new())
    }

    pub async fn sqlite(database_url: &str) -> Result<Self> {
        let sqlite = SqliteStore::connect(database_url).await?;
        Ok(Self::Sqlite(sqlite))
    }

    /// Opens the store named by `database_url` (or an in-memory store when
    /// absent) and applies the default seed. Called once before serving.
    pub async fn open_seeded(database_url: Option<&str>) -> Result<Self> {
        let store = match database_url {
            Some(url) => Self::sqlite(url).await?,
            None => Self::memory(),
        };
        let report = store.seed(&SeedData::defaults()).await?;
        info!(seeded = report.any(), backend = store.backend_name(), "knowledge store ready");
        Ok(store)
    }

    pub async fn seed(&self, data: &SeedData) -> Result<SeedReport> {
        match self {
            Store::Memory(store) => Ok(store.seed(data)),
            Store::Sqlite(store) => store.seed(data).await,
        }
    }

    pub fn backend_name(&self) -> &'static str {
        match self {
            Store::Memory(_) => "memory",
            Store::Sqlite(_) => "sqlite",
        }
    }
}

impl KnowledgeRepository for Store {
    async fn list_crop_names(&self) -> Result<Vec<String>> {
        match self {
            Store::Memory(store) => store.list_crop_names().await,
            Store::Sqlite(store) => store.list_crop_names().await,
        }
    }

    async fn crop_by_name(&self, name: &str) -> Result<Option<Crop>> {
        match self {
            Store::Memory(store) => store.crop_by_name(name).await,
            Store::Sqlite(store) => store.crop_by_name(name).await,
        }
    }

    async fn harvest_date(&self, crop_name: &str) -> Result<Option<String>> {
        match self {
            Store::Memory(store) => store.harvest_date(crop_name).await,
            Store::Sqlite(store) => store.harvest_date(crop_name).await,
        }
    }

    async fn supplier_for_crop(&self, crop_name: &str) -> Result<Option<Supplier>> {
        match self {
            Store::Memory(store) => store.supplier_for_crop(crop_name).await,
            Store::Sqlite(store) => store.supplier_for_crop(crop_name).await,
        }
    }

    async fn count_transactions(&self, status: Option<&str>) -> Result<i64> {
        match self {
            Store::Memory(store) => store.count_transactions(status).await,
            Store::Sqlite(store) => store.count_transactions(status).await,
        }
    }

    async fn faq_answer(&self, question: &str) -> Result<Option<String>> {
        match self {
            Store::Memory(store) => store.faq_answer(question).await,
            Store::Sqlite(store) => store.faq_answer(question).await,
        }
    }

    async fn stats(&self) -> Result<StoreStats> {
        match self {
            Store::Memory(store) => store.stats().await,
            Store::Sqlite(store) => store.stats().await,
        }
    }
}
