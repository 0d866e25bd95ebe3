use kz_points::{
    database::{db::DbClient, PointsStore},
    error::PointsError,
    model::structures::{
        distribution_parameters::DistributionParameters,
        filter_update::{FilterUpdate, LeaderboardUpdate, RecordScore},
        leaderboard_kind::LeaderboardKind
    }
};
use serial_test::serial;

use crate::{common::init_test_env, test_helpers::TestDatabase};

fn scores(ids: &[i64], points: f64) -> Vec<RecordScore> {
    ids.iter().map(|&record_id| RecordScore { record_id, points }).collect()
}

#[tokio::test]
#[serial]
async fn test_failed_commit_rolls_back_everything() {
    init_test_env();
    let test_db = TestDatabase::new().await.expect("Failed to create test database");
    test_db.seed_filter(8, 1, 1).await.unwrap();
    test_db
        .seed_records(8, LeaderboardKind::Nub, 1, &[10.0, 12.0])
        .await
        .unwrap();
    test_db
        .seed_records(8, LeaderboardKind::Pro, 10, &[11.0])
        .await
        .unwrap();

    let db_client = DbClient::connect(&test_db.connection_string)
        .await
        .expect("Failed to connect");

    // The pro parameters violate the top_scale check after the nub scores were written
    let update = FilterUpdate {
        filter_id: 8,
        nub: LeaderboardUpdate {
            kind: LeaderboardKind::Nub,
            scores: scores(&[1, 2], 0.5),
            parameters: None
        },
        pro: Some(LeaderboardUpdate {
            kind: LeaderboardKind::Pro,
            scores: scores(&[10], 0.5),
            parameters: Some(DistributionParameters {
                a: 2.0,
                b: 1.0,
                loc: 10.0,
                scale: 1.0,
                top_scale: 2.0
            })
        })
    };

    let err = db_client.commit(&update).await.unwrap_err();
    assert!(matches!(err, PointsError::UpstreamUnavailable(_)));
    assert!(err.to_record()["error"].as_str().unwrap().starts_with("Database error: "));

    assert_eq!(
        test_db.points(8, LeaderboardKind::Nub).await.unwrap(),
        vec![(1, 0.0), (2, 0.0)]
    );
    assert_eq!(test_db.points(8, LeaderboardKind::Pro).await.unwrap(), vec![(10, 0.0)]);

    // The connection is usable again after the rollback
    let update = FilterUpdate { pro: None, ..update };
    db_client.commit(&update).await.unwrap();
    assert_eq!(
        test_db.points(8, LeaderboardKind::Nub).await.unwrap(),
        vec![(1, 0.5), (2, 0.5)]
    );
}

#[tokio::test]
#[serial]
async fn test_unreachable_database_is_upstream_error() {
    init_test_env();
    let result = DbClient::connect("host=localhost port=1 user=postgres password=postgres dbname=postgres").await;

    let err: PointsError = result.err().expect("connection should fail").into();
    assert!(err.is_retryable());
}

#[tokio::test]
#[serial]
async fn test_concurrent_commits_on_shared_client_are_isolated() {
    init_test_env();
    let test_db = TestDatabase::new().await.expect("Failed to create test database");
    test_db.seed_filter(1, 1, 1).await.unwrap();
    test_db.seed_filter(2, 1, 1).await.unwrap();
    test_db
        .seed_records(1, LeaderboardKind::Nub, 1, &[10.0, 12.0])
        .await
        .unwrap();
    test_db
        .seed_records(2, LeaderboardKind::Nub, 10, &[20.0, 21.0])
        .await
        .unwrap();

    let db_client = DbClient::connect(&test_db.connection_string)
        .await
        .expect("Failed to connect");
    let other = db_client.clone();

    let failing = FilterUpdate {
        filter_id: 1,
        nub: LeaderboardUpdate {
            kind: LeaderboardKind::Nub,
            scores: scores(&[1, 2], 0.5),
            parameters: Some(DistributionParameters {
                a: 2.0,
                b: 1.0,
                loc: 10.0,
                scale: 1.0,
                top_scale: 2.0
            })
        },
        pro: None
    };
    let succeeding = FilterUpdate {
        filter_id: 2,
        nub: LeaderboardUpdate {
            kind: LeaderboardKind::Nub,
            scores: scores(&[10, 11], 0.75),
            parameters: None
        },
        pro: None
    };

    let (failed, succeeded) = tokio::join!(db_client.commit(&failing), other.commit(&succeeding));

    assert!(matches!(failed, Err(PointsError::UpstreamUnavailable(_))));
    succeeded.unwrap();
    assert_eq!(
        test_db.points(1, LeaderboardKind::Nub).await.unwrap(),
        vec![(1, 0.0), (2, 0.0)]
    );
    assert_eq!(
        test_db.points(2, LeaderboardKind::Nub).await.unwrap(),
        vec![(10, 0.75), (11, 0.75)]
    );
}
