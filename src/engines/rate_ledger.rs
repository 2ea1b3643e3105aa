//! Rate Ledger — per-resource rolling-24h cap enforcement with atomic
//! reserve-then-consume (spec §4.2).
//!
//! The rolling window is approximated with hourly buckets summed over the
//! last 24 (spec §4.2): `reserve` sums the buckets in range then increments
//! the current hour, all inside one `BEGIN IMMEDIATE` transaction so the
//! reserve is atomic across concurrent scheduler instances — SQLite's
//! single-writer lock serializes the competing transactions for us. Writes
//! are funneled through a single-writer actor task, mirroring the teacher's
//! memory-engine split (reads concurrent via the pool, writes serialized
//! through one task reached over a bounded `mpsc` channel).

use chrono::{DateTime, Duration, Utc};
use sqlx::SqlitePool;
use tokio::sync::{mpsc, oneshot};
use tracing::error;

use crate::types::ids::ResourceId;

/// Bounded channel depth for the writer actor; generous enough that a
/// scheduler batch of `scheduler_batch_size` candidates never blocks on it.
const WRITER_CHANNEL_CAPACITY: usize = 256;

/// Outcome of a reserve attempt (spec §4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReserveOutcome {
    /// Reservation succeeded; `remaining` is the cap headroom after this
    /// reservation.
    Ok { remaining: u32 },
    /// The resource's rolling-24h cap has been reached.
    Exhausted,
}

#[derive(Debug)]
enum LedgerOp {
    Reserve {
        resource_id: ResourceId,
        cap: u32,
        now: DateTime<Utc>,
        reply: oneshot::Sender<Result<ReserveOutcome, sqlx::Error>>,
    },
    Release {
        resource_id: ResourceId,
        now: DateTime<Utc>,
    },
}

fn hour_bucket(ts: DateTime<Utc>) -> String {
    ts.format("%Y-%m-%dT%H").to_string()
}

async fn run_writer(db: SqlitePool, mut rx: mpsc::Receiver<LedgerOp>) {
    while let Some(op) = rx.recv().await {
        match op {
            LedgerOp::Reserve { resource_id, cap, now, reply } => {
                let outcome = do_reserve(&db, resource_id, cap, now).await;
                if let Err(ref err) = outcome {
                    error!(%resource_id, error = %err, "rate ledger reserve failed");
                }
                let _ = reply.send(outcome);
            }
            LedgerOp::Release { resource_id, now } => {
                if let Err(err) = do_release(&db, resource_id, now).await {
                    error!(%resource_id, error = %err, "rate ledger release failed");
                }
            }
        }
    }
}

async fn do_reserve(
    db: &SqlitePool,
    resource_id: ResourceId,
    cap: u32,
    now: DateTime<Utc>,
) -> Result<ReserveOutcome, sqlx::Error> {
    let mut tx = db.begin().await?;
    let window_start = now - Duration::hours(24);
    let id = resource_id.to_string();

    let used: i64 = sqlx::query_scalar(
        "SELECT COALESCE(SUM(count), 0) FROM rate_ledger_buckets \
         WHERE resource_id = ?1 AND hour_bucket >= ?2 AND hour_bucket <= ?3",
    )
    .bind(&id)
    .bind(hour_bucket(window_start))
    .bind(hour_bucket(now))
    .fetch_one(&mut *tx)
    .await?;

    #[allow(clippy::cast_sign_loss)]
    let used = used.max(0) as u32;

    if used >= cap {
        tx.rollback().await?;
        return Ok(ReserveOutcome::Exhausted);
    }

    sqlx::query(
        "INSERT INTO rate_ledger_buckets (resource_id, hour_bucket, count) VALUES (?1, ?2, 1) \
         ON CONFLICT(resource_id, hour_bucket) DO UPDATE SET count = count + 1",
    )
    .bind(&id)
    .bind(hour_bucket(now))
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(ReserveOutcome::Ok { remaining: cap.saturating_sub(used).saturating_sub(1) })
}

async fn do_release(
    db: &SqlitePool,
    resource_id: ResourceId,
    now: DateTime<Utc>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE rate_ledger_buckets SET count = MAX(count - 1, 0) \
         WHERE resource_id = ?1 AND hour_bucket = ?2",
    )
    .bind(resource_id.to_string())
    .bind(hour_bucket(now))
    .execute(db)
    .await?;
    Ok(())
}

/// Handle to the Rate Ledger (spec §4.2). Cheap to clone; reads go straight
/// through the pool, writes funnel through the single-writer actor.
#[derive(Clone)]
pub struct RateLedger {
    db: SqlitePool,
    tx: mpsc::Sender<LedgerOp>,
}

impl RateLedger {
    /// Spawns the single-writer actor and returns a handle to it.
    pub fn new(db: SqlitePool) -> Self {
        let (tx, rx) = mpsc::channel(WRITER_CHANNEL_CAPACITY);
        tokio::spawn(run_writer(db.clone(), rx));
        Self { db, tx }
    }

    /// Atomically checks and reserves one unit of the resource's rolling-24h
    /// quota (spec §4.2 `try_reserve`).
    ///
    /// # Errors
    ///
    /// Returns an error if the writer actor has stopped or the underlying
    /// transaction fails.
    pub async fn try_reserve(
        &self,
        resource_id: ResourceId,
        cap: u32,
        now: DateTime<Utc>,
    ) -> Result<ReserveOutcome, sqlx::Error> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(LedgerOp::Reserve { resource_id, cap, now, reply })
            .await
            .map_err(|_| sqlx::Error::PoolClosed)?;
        rx.await.map_err(|_| sqlx::Error::PoolClosed)?
    }

    /// Releases a previously reserved unit back to the resource's quota
    /// (spec §4.2 `release`); called when a send fails before the driver
    /// completes.
    pub async fn release(&self, resource_id: ResourceId, now: DateTime<Utc>) {
        let _ = self.tx.send(LedgerOp::Release { resource_id, now }).await;
    }

    /// Current rolling-24h usage for a resource (spec §4.2 `current_usage`).
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn current_usage(
        &self,
        resource_id: ResourceId,
        now: DateTime<Utc>,
    ) -> Result<u32, sqlx::Error> {
        let window_start = now - Duration::hours(24);
        let used: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(count), 0) FROM rate_ledger_buckets \
             WHERE resource_id = ?1 AND hour_bucket >= ?2 AND hour_bucket <= ?3",
        )
        .bind(resource_id.to_string())
        .bind(hour_bucket(window_start))
        .bind(hour_bucket(now))
        .fetch_one(&self.db)
        .await?;
        #[allow(clippy::cast_sign_loss)]
        Ok(used.max(0) as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hour_bucket_truncates_to_the_hour() {
        let ts = "2026-07-30T14:35:12Z".parse::<DateTime<Utc>>().expect("valid timestamp");
        assert_eq!(hour_bucket(ts), "2026-07-30T14");
    }
}
