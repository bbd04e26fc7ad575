use async_trait::async_trait;
use shared::week::WeekId;
use sqlx::PgPool;
use std::fmt;
use std::sync::Arc;
use time::OffsetDateTime;
use tracing::warn;
use uuid::Uuid;

/// One awarded weekly prize. Created once, never mutated, never deleted.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PrizeRecord {
    pub id: Uuid,
    pub week_id: String,
    pub user_id: Uuid,
    pub won_at: OffsetDateTime,
}

#[derive(Debug)]
pub enum LedgerError {
    Database(sqlx::Error),
}

impl fmt::Display for LedgerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Database(e) => write!(f, "Database error: {}", e),
        }
    }
}

impl std::error::Error for LedgerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Database(e) => Some(e),
        }
    }
}

impl From<sqlx::Error> for LedgerError {
    fn from(err: sqlx::Error) -> Self {
        Self::Database(err)
    }
}

#[derive(Debug)]
pub enum RecordWinError {
    /// Another spin recorded this week's prize first.
    RaceLost,
    Ledger(LedgerError),
}

impl fmt::Display for RecordWinError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RaceLost => write!(f, "the week's prize was already claimed"),
            Self::Ledger(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for RecordWinError {}

/// Persistence seam for prize records. The production store is Postgres;
/// tests substitute in-memory implementations.
#[async_trait]
pub trait PrizeStore: Send + Sync {
    async fn find_record(&self, week_id: &WeekId) -> Result<Option<PrizeRecord>, LedgerError>;

    /// Inserts unless a record for the same week already exists. Returns
    /// `false` when the insert lost to an existing record.
    async fn insert_record(&self, record: &PrizeRecord) -> Result<bool, LedgerError>;
}

pub struct PgPrizeStore {
    pool: PgPool,
}

impl PgPrizeStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PrizeStore for PgPrizeStore {
    async fn find_record(&self, week_id: &WeekId) -> Result<Option<PrizeRecord>, LedgerError> {
        let record = sqlx::query_as::<_, PrizeRecord>(
            "SELECT id, week_id, user_id, won_at FROM prize_records WHERE week_id = $1",
        )
        .bind(week_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    async fn insert_record(&self, record: &PrizeRecord) -> Result<bool, LedgerError> {
        // Conflict on the week_id uniqueness constraint means somebody else
        // already won this week; the caller decides what to do with that.
        let result = sqlx::query(
            "INSERT INTO prize_records (id, week_id, user_id, won_at) \
             VALUES ($1, $2, $3, $4) ON CONFLICT (week_id) DO NOTHING",
        )
        .bind(record.id)
        .bind(&record.week_id)
        .bind(record.user_id)
        .bind(record.won_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}

/// Append-only ledger of weekly prize wins.
#[derive(Clone)]
pub struct PrizeLedger {
    store: Arc<dyn PrizeStore>,
}

impl PrizeLedger {
    pub fn new(store: Arc<dyn PrizeStore>) -> Self {
        Self { store }
    }

    /// Whether the given week already has a winner. On any storage fault this
    /// answers `true`: withholding a prize is recoverable, double-granting
    /// one is not.
    pub async fn has_winner(&self, week_id: &WeekId) -> bool {
        match self.store.find_record(week_id).await {
            Ok(record) => record.is_some(),
            Err(e) => {
                warn!("prize ledger lookup failed for {}, assuming the week is won: {}", week_id, e);
                true
            }
        }
    }

    pub async fn record_win(
        &self,
        week_id: &WeekId,
        user_id: Uuid,
        at: OffsetDateTime,
    ) -> Result<PrizeRecord, RecordWinError> {
        let record = PrizeRecord {
            id: Uuid::new_v4(),
            week_id: week_id.as_str().to_string(),
            user_id,
            won_at: at,
        };

        match self.store.insert_record(&record).await {
            Ok(true) => Ok(record),
            Ok(false) => Err(RecordWinError::RaceLost),
            Err(e) => Err(RecordWinError::Ledger(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct MemoryPrizeStore {
        records: Mutex<HashMap<String, PrizeRecord>>,
    }

    #[async_trait]
    impl PrizeStore for MemoryPrizeStore {
        async fn find_record(&self, week_id: &WeekId) -> Result<Option<PrizeRecord>, LedgerError> {
            Ok(self.records.lock().unwrap().get(week_id.as_str()).cloned())
        }

        async fn insert_record(&self, record: &PrizeRecord) -> Result<bool, LedgerError> {
            let mut records = self.records.lock().unwrap();
            if records.contains_key(&record.week_id) {
                return Ok(false);
            }
            records.insert(record.week_id.clone(), record.clone());
            Ok(true)
        }
    }

    struct FailingPrizeStore;

    #[async_trait]
    impl PrizeStore for FailingPrizeStore {
        async fn find_record(&self, _week_id: &WeekId) -> Result<Option<PrizeRecord>, LedgerError> {
            Err(LedgerError::Database(sqlx::Error::PoolTimedOut))
        }

        async fn insert_record(&self, _record: &PrizeRecord) -> Result<bool, LedgerError> {
            Err(LedgerError::Database(sqlx::Error::PoolTimedOut))
        }
    }

    fn week() -> WeekId {
        WeekId::from("2024-W10".to_string())
    }

    #[tokio::test]
    async fn test_has_winner_reflects_records() {
        let ledger = PrizeLedger::new(Arc::new(MemoryPrizeStore::default()));
        assert!(!ledger.has_winner(&week()).await);

        ledger
            .record_win(&week(), Uuid::new_v4(), OffsetDateTime::now_utc())
            .await
            .unwrap();
        assert!(ledger.has_winner(&week()).await);
    }

    #[tokio::test]
    async fn test_has_winner_fails_safe() {
        let ledger = PrizeLedger::new(Arc::new(FailingPrizeStore));
        assert!(ledger.has_winner(&week()).await);
    }

    #[tokio::test]
    async fn test_second_win_loses_the_race() {
        let ledger = PrizeLedger::new(Arc::new(MemoryPrizeStore::default()));
        let first = ledger
            .record_win(&week(), Uuid::new_v4(), OffsetDateTime::now_utc())
            .await;
        let second = ledger
            .record_win(&week(), Uuid::new_v4(), OffsetDateTime::now_utc())
            .await;

        assert!(first.is_ok());
        assert!(matches!(second, Err(RecordWinError::RaceLost)));
    }

    #[tokio::test]
    async fn test_different_weeks_award_independently() {
        let ledger = PrizeLedger::new(Arc::new(MemoryPrizeStore::default()));
        let other = WeekId::from("2024-W11".to_string());

        ledger
            .record_win(&week(), Uuid::new_v4(), OffsetDateTime::now_utc())
            .await
            .unwrap();
        ledger
            .record_win(&other, Uuid::new_v4(), OffsetDateTime::now_utc())
            .await
            .unwrap();
    }
}
