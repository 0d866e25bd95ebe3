use super::PointsStore;
use crate::{
    error::{PointsError, PointsResult},
    model::structures::{
        distribution_parameters::DistributionParameters,
        filter_update::{FilterTiers, FilterUpdate, LeaderboardUpdate},
        leaderboard::{LeaderboardRecord, LeaderboardSnapshot},
        leaderboard_kind::LeaderboardKind,
        tier::Tier
    }
};
use itertools::Itertools;
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};
use tokio_postgres::{Client, Error, NoTls, Row, Transaction};
use tracing::{debug, error, warn};

/// Clones share one connection. A commit holds it for the whole
/// transaction, so queries from other clones wait instead of joining it.
#[derive(Clone)]
pub struct DbClient {
    client: Arc<Mutex<Client>>
}

impl DbClient {
    // Connect to the database and return a DbClient instance
    pub async fn connect(connection_str: &str) -> Result<Self, Error> {
        let (client, connection) = tokio_postgres::connect(connection_str, NoTls).await?;

        // Spawn the connection object to run in the background
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                error!("connection error: {}", e);
            }
        });

        Ok(DbClient {
            client: Arc::new(Mutex::new(client))
        })
    }

    pub async fn client(&self) -> MutexGuard<'_, Client> {
        self.client.lock().await
    }

    async fn write_leaderboard(
        transaction: &Transaction<'_>,
        filter_id: i32,
        leaderboard: &LeaderboardUpdate
    ) -> Result<(), Error> {
        let record_ids = leaderboard.scores.iter().map(|s| s.record_id).collect_vec();
        let points = leaderboard.scores.iter().map(|s| s.points).collect_vec();

        let query = format!(
            "UPDATE {} AS r SET points = u.points
             FROM UNNEST($1::BIGINT[], $2::DOUBLE PRECISION[]) AS u(record_id, points)
             WHERE r.record_id = u.record_id AND r.filter_id = $3",
            records_table(leaderboard.kind)
        );
        let updated = transaction
            .execute(query.as_str(), &[&record_ids, &points, &filter_id])
            .await?;

        if updated as usize != record_ids.len() {
            warn!(
                filter_id,
                kind = %leaderboard.kind,
                expected = record_ids.len(),
                updated,
                "Some records disappeared during the refit"
            );
        }

        if let Some(p) = &leaderboard.parameters {
            transaction
                .execute(
                    "INSERT INTO point_distribution_data (filter_id, is_pro_leaderboard, a, b, loc, scale, top_scale)
                     VALUES ($1, $2, $3, $4, $5, $6, $7)
                     ON CONFLICT (filter_id, is_pro_leaderboard) DO UPDATE
                     SET a = EXCLUDED.a, b = EXCLUDED.b, loc = EXCLUDED.loc,
                         scale = EXCLUDED.scale, top_scale = EXCLUDED.top_scale",
                    &[
                        &filter_id,
                        &leaderboard.kind.is_pro(),
                        &p.a,
                        &p.b,
                        &p.loc,
                        &p.scale,
                        &p.top_scale
                    ]
                )
                .await?;
        }

        Ok(())
    }

    async fn write_update(transaction: &Transaction<'_>, update: &FilterUpdate) -> Result<(), Error> {
        for leaderboard in update.leaderboards() {
            Self::write_leaderboard(transaction, update.filter_id, leaderboard).await?;
        }

        Ok(())
    }

    fn record_from_row(row: &Row) -> LeaderboardRecord {
        LeaderboardRecord {
            record_id: row.get("record_id"),
            time: row.get("time"),
            points: row.get("points")
        }
    }

    fn parameters_from_row(row: &Row) -> DistributionParameters {
        DistributionParameters {
            a: row.get("a"),
            b: row.get("b"),
            loc: row.get("loc"),
            scale: row.get("scale"),
            top_scale: row.get("top_scale")
        }
    }
}

fn records_table(kind: LeaderboardKind) -> &'static str {
    match kind {
        LeaderboardKind::Nub => "best_nub_records",
        LeaderboardKind::Pro => "best_pro_records"
    }
}

impl PointsStore for DbClient {
    async fn fetch_tiers(&self, filter_id: i32) -> PointsResult<Option<FilterTiers>> {
        let row = self
            .client()
            .await
            .query_opt(
                "SELECT nub_tier, pro_tier FROM course_filters WHERE id = $1",
                &[&filter_id]
            )
            .await?;

        match row {
            Some(row) => Ok(Some(FilterTiers {
                nub: Tier::try_from(row.get::<_, i16>("nub_tier") as i64)?,
                pro: Tier::try_from(row.get::<_, i16>("pro_tier") as i64)?
            })),
            None => Ok(None)
        }
    }

    async fn fetch_snapshot(&self, filter_id: i32, kind: LeaderboardKind) -> PointsResult<LeaderboardSnapshot> {
        let query = format!(
            "SELECT record_id, time, points FROM {} WHERE filter_id = $1 ORDER BY time ASC",
            records_table(kind)
        );
        let rows = self.client().await.query(query.as_str(), &[&filter_id]).await?;

        debug!(filter_id, %kind, n = rows.len(), "Fetched leaderboard");
        Ok(LeaderboardSnapshot::new(
            rows.iter().map(Self::record_from_row).collect_vec()
        ))
    }

    async fn fetch_parameters(
        &self,
        filter_id: i32,
        kind: LeaderboardKind
    ) -> PointsResult<Option<DistributionParameters>> {
        let row = self
            .client()
            .await
            .query_opt(
                "SELECT a, b, loc, scale, top_scale FROM point_distribution_data
                 WHERE filter_id = $1 AND is_pro_leaderboard = $2",
                &[&filter_id, &kind.is_pro()]
            )
            .await?;

        Ok(row.as_ref().map(Self::parameters_from_row))
    }

    async fn commit(&self, update: &FilterUpdate) -> PointsResult<()> {
        let mut client = self.client().await;
        let transaction = client.transaction().await?;

        match Self::write_update(&transaction, update).await {
            Ok(()) => {
                transaction.commit().await?;
                Ok(())
            }
            Err(e) => {
                error!(filter_id = update.filter_id, "Failed to write refit, rolling back: {}", e);
                if let Err(rollback) = transaction.rollback().await {
                    error!("Rollback failed: {}", rollback);
                }

                Err(PointsError::UpstreamUnavailable(e))
            }
        }
    }
}
