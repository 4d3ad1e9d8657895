//! Metrics aggregation tests

mod support;

use iothub_manager::deploy::metrics::{targeted_twins_query, MetricsAggregator};
use iothub_manager::errors::ManagerError;
use iothub_manager::models::deployment::{DeploymentType, DeviceDeploymentState};
use openapi_client::{Configuration, Twin};
use serde_json::json;
use tokio_test::{assert_err, assert_ok};

use support::{edge_twin, with_targeted_count, FakeTwins};

#[tokio::test]
async fn test_snapshot_counts_states() {
    let twins = FakeTwins::new(vec![
        edge_twin("dev-1", 5, Some((5, 200))),
        edge_twin("dev-2", 5, Some((5, 200))),
        edge_twin("dev-3", 5, Some((5, 406))),
        edge_twin("dev-4", 5, Some((4, 200))),
        edge_twin("dev-5", 5, None),
    ]);
    let aggregator = MetricsAggregator::new(twins.clone());

    let metrics = assert_ok!(aggregator.snapshot(&Configuration::new("cfg-1"), DeploymentType::EdgeManifest).await);

    assert_eq!(metrics.applied, 2);
    assert_eq!(metrics.failed, 1);
    assert_eq!(metrics.pending, 2);
    assert_eq!(metrics.device_statuses["dev-1"], DeviceDeploymentState::Applied);
    assert_eq!(metrics.device_statuses["dev-3"], DeviceDeploymentState::Failed);
    assert_eq!(metrics.device_statuses["dev-5"], DeviceDeploymentState::Pending);
    assert_eq!(
        twins.queries(),
        vec![targeted_twins_query("cfg-1", DeploymentType::EdgeManifest)]
    );
}

#[tokio::test]
async fn test_snapshot_no_devices() {
    let aggregator = MetricsAggregator::new(FakeTwins::new(vec![]));

    let metrics = assert_ok!(aggregator.snapshot(&Configuration::new("cfg-1"), DeploymentType::EdgeManifest).await);
    assert_eq!(metrics.total(), 0);
    assert!(metrics.device_statuses.is_empty());
}

#[tokio::test]
async fn test_snapshot_device_configuration_queries_device_twins() {
    let twin: Twin = serde_json::from_value(json!({
        "deviceId": "sensor-7",
        "properties": {
            "desired": {"$version": 9},
            "reported": {"lastDesiredVersion": 9, "lastDesiredStatus": {"code": 200}}
        }
    }))
    .unwrap();
    let twins = FakeTwins::new(vec![twin]);
    let aggregator = MetricsAggregator::new(twins.clone());

    let metrics = assert_ok!(
        aggregator
            .snapshot(&Configuration::new("cfg-9"), DeploymentType::DeviceConfiguration)
            .await
    );

    assert_eq!(metrics.applied, 1);
    assert_eq!(
        twins.queries()[0],
        targeted_twins_query("cfg-9", DeploymentType::DeviceConfiguration)
    );
    assert!(twins.queries()[0].starts_with("SELECT * FROM devices WHERE"));
}

#[tokio::test]
async fn test_snapshot_counts_each_device_once() {
    let twins = FakeTwins::new(vec![
        edge_twin("dev-1", 2, Some((1, 200))),
        edge_twin("dev-1", 2, Some((2, 200))),
    ]);
    let aggregator = MetricsAggregator::new(twins);

    let metrics = assert_ok!(aggregator.snapshot(&Configuration::new("cfg-1"), DeploymentType::EdgeManifest).await);
    assert_eq!(metrics.total(), 1);
    assert_eq!(metrics.device_statuses["dev-1"], DeviceDeploymentState::Applied);
}

#[tokio::test]
async fn test_snapshot_query_failure_is_external() {
    let twins = FakeTwins::new(vec![]);
    twins.fail_next(ManagerError::AuthError("expired".to_string()));
    let aggregator = MetricsAggregator::new(twins);

    let err = assert_err!(aggregator.snapshot(&Configuration::new("cfg-1"), DeploymentType::EdgeManifest).await);
    assert!(matches!(err, ManagerError::ExternalService(_)));
}

#[tokio::test]
async fn test_snapshot_counts_targeted_devices_as_pending() {
    let aggregator = MetricsAggregator::new(FakeTwins::new(vec![]));
    let configuration = with_targeted_count(Configuration::new("cfg-1"), 3);

    let metrics = assert_ok!(aggregator.snapshot(&configuration, DeploymentType::EdgeManifest).await);
    assert_eq!((metrics.applied, metrics.pending, metrics.failed), (0, 3, 0));
}

#[tokio::test]
async fn test_snapshot_targeted_count_covers_reported_devices() {
    let twins = FakeTwins::new(vec![
        edge_twin("dev-1", 2, Some((2, 200))),
        edge_twin("dev-2", 2, Some((2, 500))),
    ]);
    let aggregator = MetricsAggregator::new(twins);
    let configuration = with_targeted_count(Configuration::new("cfg-1"), 5);

    let metrics = assert_ok!(aggregator.snapshot(&configuration, DeploymentType::EdgeManifest).await);
    assert_eq!((metrics.applied, metrics.pending, metrics.failed), (1, 3, 1));
    assert_eq!(metrics.device_statuses.len(), 2);

    // a stale count never drives pending below what the twins report
    let aggregator = MetricsAggregator::new(FakeTwins::new(vec![
        edge_twin("dev-1", 2, Some((2, 200))),
        edge_twin("dev-2", 2, None),
    ]));
    let configuration = with_targeted_count(Configuration::new("cfg-1"), 1);
    let metrics = assert_ok!(aggregator.snapshot(&configuration, DeploymentType::EdgeManifest).await);
    assert_eq!((metrics.applied, metrics.pending), (1, 1));
}

#[tokio::test]
async fn test_snapshot_targeted_twin_is_pending() {
    let twin: Twin = serde_json::from_value(json!({
        "deviceId": "sensor-1",
        "properties": {
            "desired": {"$version": 3},
            "reported": {"lastDesiredVersion": 3, "lastDesiredStatus": {"code": 200}}
        },
        "configurations": {"cfg-1": {"status": "Targeted"}}
    }))
    .unwrap();
    let aggregator = MetricsAggregator::new(FakeTwins::new(vec![twin]));

    let metrics = assert_ok!(
        aggregator
            .snapshot(&Configuration::new("cfg-1"), DeploymentType::DeviceConfiguration)
            .await
    );
    assert_eq!(metrics.pending, 1);
    assert_eq!(metrics.device_statuses["sensor-1"], DeviceDeploymentState::Pending);
}
