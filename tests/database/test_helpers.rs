use kz_points::model::structures::leaderboard_kind::LeaderboardKind;
use lazy_static::lazy_static;
use std::sync::Arc;
use testcontainers::{clients::Cli, Container};
use testcontainers_modules::postgres::Postgres;
use tokio_postgres::{Client, NoTls};

pub struct TestDatabase {
    pub connection_string: String,
    _container: Container<'static, Postgres>
}

impl TestDatabase {
    pub async fn new() -> Result<Self, Box<dyn std::error::Error>> {
        // Create a static CLI instance
        lazy_static! {
            static ref DOCKER: Arc<Cli> = Arc::new(Cli::default());
        }

        // Start PostgreSQL container
        let container = DOCKER.run(Postgres::default());
        let port = container.get_host_port_ipv4(5432);

        let connection_string = format!(
            "host=localhost port={} user=postgres password=postgres dbname=postgres",
            port
        );

        let client = connect(&connection_string).await?;
        client.batch_execute(include_str!("schema.sql")).await?;

        Ok(TestDatabase {
            connection_string,
            _container: container
        })
    }

    pub async fn get_client(&self) -> Result<Client, Box<dyn std::error::Error>> {
        Ok(connect(&self.connection_string).await?)
    }

    pub async fn seed_filter(&self, filter_id: i32, nub_tier: i16, pro_tier: i16) -> Result<(), Box<dyn std::error::Error>> {
        let client = self.get_client().await?;
        client
            .execute(
                "INSERT INTO course_filters (id, nub_tier, pro_tier) VALUES ($1, $2, $3)",
                &[&filter_id, &nub_tier, &pro_tier]
            )
            .await?;

        Ok(())
    }

    /// Inserts one record per time with ids `first_id..`
    pub async fn seed_records(
        &self,
        filter_id: i32,
        kind: LeaderboardKind,
        first_id: i64,
        times: &[f64]
    ) -> Result<(), Box<dyn std::error::Error>> {
        let client = self.get_client().await?;
        let ids: Vec<i64> = (first_id..first_id + times.len() as i64).collect();
        let times = times.to_vec();

        client
            .execute(
                format!(
                    "INSERT INTO {} (record_id, filter_id, time, points)
                     SELECT u.record_id, $3::INTEGER, u.time, 0 FROM UNNEST($1::BIGINT[], $2::DOUBLE PRECISION[]) AS u(record_id, time)",
                    table(kind)
                )
                .as_str(),
                &[&ids, &times, &filter_id]
            )
            .await?;

        Ok(())
    }

    /// `(record_id, points)` of every record of the leaderboard, fastest first
    pub async fn points(&self, filter_id: i32, kind: LeaderboardKind) -> Result<Vec<(i64, f64)>, Box<dyn std::error::Error>> {
        let client = self.get_client().await?;
        let rows = client
            .query(
                format!(
                    "SELECT record_id, points FROM {} WHERE filter_id = $1 ORDER BY time ASC, record_id ASC",
                    table(kind)
                )
                .as_str(),
                &[&filter_id]
            )
            .await?;

        Ok(rows.iter().map(|row| (row.get(0), row.get(1))).collect())
    }
}

fn table(kind: LeaderboardKind) -> &'static str {
    match kind {
        LeaderboardKind::Nub => "best_nub_records",
        LeaderboardKind::Pro => "best_pro_records"
    }
}

async fn connect(connection_string: &str) -> Result<Client, tokio_postgres::Error> {
    let (client, connection) = tokio_postgres::connect(connection_string, NoTls).await?;

    tokio::spawn(async move {
        if let Err(e) = connection.await {
            eprintln!("Database connection error: {}", e);
        }
    });

    Ok(client)
}
