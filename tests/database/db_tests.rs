use kz_points::{
    database::{db::DbClient, PointsStore},
    model::{
        fitter::DistributionFitter,
        recalculator::BatchRecalculator,
        scoring::LeaderboardModel,
        structures::{
            distribution_parameters::{DistributionParameters, NigShape},
            filter_update::{FilterUpdate, LeaderboardUpdate, RecordScore},
            leaderboard_kind::LeaderboardKind
        }
    },
    utils::test_utils::generate_nig_times
};
use serial_test::serial;

use crate::{common::init_test_env, test_helpers::TestDatabase};

fn nub_shape() -> NigShape {
    NigShape {
        a: 2.0,
        b: 1.5,
        loc: 40.0,
        scale: 5.0
    }
}

#[tokio::test]
#[serial]
async fn test_fetch_tiers() {
    init_test_env();
    let test_db = TestDatabase::new().await.expect("Failed to create test database");
    test_db.seed_filter(74, 2, 5).await.expect("Failed to seed filter");

    let db_client = DbClient::connect(&test_db.connection_string)
        .await
        .expect("Failed to connect");

    let tiers = db_client.fetch_tiers(74).await.unwrap().unwrap();
    assert_eq!(tiers.nub.value(), 2);
    assert_eq!(tiers.pro.value(), 5);

    assert_eq!(db_client.fetch_tiers(75).await.unwrap(), None);
}

#[tokio::test]
#[serial]
async fn test_fetch_snapshot_sorted() {
    init_test_env();
    let test_db = TestDatabase::new().await.expect("Failed to create test database");
    test_db.seed_filter(1, 1, 1).await.unwrap();
    test_db
        .seed_records(1, LeaderboardKind::Nub, 100, &[9.5, 7.25, 8.0])
        .await
        .unwrap();

    let db_client = DbClient::connect(&test_db.connection_string)
        .await
        .expect("Failed to connect");

    let nub = db_client.fetch_snapshot(1, LeaderboardKind::Nub).await.unwrap();
    assert_eq!(nub.times(), vec![7.25, 8.0, 9.5]);
    assert_eq!(nub.records()[0].record_id, 101);

    let pro = db_client.fetch_snapshot(1, LeaderboardKind::Pro).await.unwrap();
    assert!(pro.is_empty());
}

#[tokio::test]
#[serial]
async fn test_commit_round_trip() {
    init_test_env();
    let test_db = TestDatabase::new().await.expect("Failed to create test database");
    test_db.seed_filter(3, 1, 1).await.unwrap();
    test_db
        .seed_records(3, LeaderboardKind::Nub, 1, &[10.0, 11.0])
        .await
        .unwrap();

    let db_client = DbClient::connect(&test_db.connection_string)
        .await
        .expect("Failed to connect");

    let parameters = DistributionParameters {
        a: 33.53900289787477,
        b: 33.52140111667502,
        loc: 6.3663207368487065,
        scale: 0.4480388195262859,
        top_scale: 0.9979285278452101
    };
    let update = FilterUpdate {
        filter_id: 3,
        nub: LeaderboardUpdate {
            kind: LeaderboardKind::Nub,
            scores: vec![
                RecordScore {
                    record_id: 1,
                    points: 1.0
                },
                RecordScore {
                    record_id: 2,
                    points: 0.75
                },
            ],
            parameters: Some(parameters)
        },
        pro: None
    };

    db_client.commit(&update).await.unwrap();

    assert_eq!(
        test_db.points(3, LeaderboardKind::Nub).await.unwrap(),
        vec![(1, 1.0), (2, 0.75)]
    );
    assert_eq!(
        db_client.fetch_parameters(3, LeaderboardKind::Nub).await.unwrap(),
        Some(parameters)
    );
    assert_eq!(db_client.fetch_parameters(3, LeaderboardKind::Pro).await.unwrap(), None);

    // Second commit replaces the parameters
    let replaced = DistributionParameters {
        top_scale: 0.5,
        ..parameters
    };
    let update = FilterUpdate {
        nub: LeaderboardUpdate {
            parameters: Some(replaced),
            ..update.nub
        },
        ..update
    };
    db_client.commit(&update).await.unwrap();

    assert_eq!(
        db_client.fetch_parameters(3, LeaderboardKind::Nub).await.unwrap(),
        Some(replaced)
    );
}

#[tokio::test]
#[serial]
async fn test_full_refit() {
    init_test_env();
    let test_db = TestDatabase::new().await.expect("Failed to create test database");
    test_db.seed_filter(20, 2, 4).await.unwrap();

    let nub_times = generate_nig_times(&nub_shape(), 80, 1);
    let pro_times: Vec<f64> = nub_times.iter().step_by(4).copied().collect();
    test_db
        .seed_records(20, LeaderboardKind::Nub, 1, &nub_times)
        .await
        .unwrap();
    test_db
        .seed_records(20, LeaderboardKind::Pro, 1000, &pro_times)
        .await
        .unwrap();

    let db_client = DbClient::connect(&test_db.connection_string)
        .await
        .expect("Failed to connect");
    let recalculator = BatchRecalculator::new(db_client.clone(), DistributionFitter::default());

    let timings = recalculator.recalculate(20).await.unwrap();
    assert_eq!(timings.total_ms, timings.stages_total());

    let nub_parameters = db_client
        .fetch_parameters(20, LeaderboardKind::Nub)
        .await
        .unwrap()
        .expect("nub leaderboard should have been fitted");
    assert!(nub_parameters.is_valid());
    assert_eq!(db_client.fetch_parameters(20, LeaderboardKind::Pro).await.unwrap(), None);

    let nub_points = test_db.points(20, LeaderboardKind::Nub).await.unwrap();
    assert_eq!(nub_points[0].1, 1.0);

    let nub_model = LeaderboardModel::parametric(nub_times[0], &nub_parameters).unwrap();
    let pro_points = test_db.points(20, LeaderboardKind::Pro).await.unwrap();
    assert_eq!(pro_points.len(), pro_times.len());
    for ((_, points), time) in pro_points.iter().zip(&pro_times) {
        assert!(*points >= nub_model.score(*time).unwrap());
    }
}
