//! Deployment manager tests

mod support;

use iothub_manager::deploy::ownership::OwnershipTag;
use iothub_manager::deploy::{DeploymentOptions, Deployments, MAX_DEPLOYMENTS};
use iothub_manager::errors::ManagerError;
use iothub_manager::models::deployment::{DeploymentRequest, DeploymentType, DeviceDeploymentState};
use serde_json::json;
use tokio_test::{assert_err, assert_ok};

use support::{
    edge_request, edge_twin, manager, tagged, untagged, with_targeted_count, FakeRegistry, FakeTwins,
    MANIFEST,
};

// ================================= CREATE ===================================== //

#[tokio::test]
async fn test_create_returns_registry_id() {
    let registry = FakeRegistry::new();
    registry.set_next_id(123);
    let deployments = manager(&registry, &FakeTwins::new(vec![]));

    let request = DeploymentRequest::new(
        "depA",
        "g1",
        "tag=edge",
        MANIFEST,
        10,
        DeploymentType::EdgeManifest,
    );
    let model = assert_ok!(deployments.create(request).await);

    assert_eq!(model.id, "cfg-123");
    assert_eq!(model.name, "depA");
    assert_eq!(model.device_group_id, "g1");
    assert_eq!(model.priority, 10);
    assert_eq!(model.etag.as_deref(), Some("MQ=="));
    assert!(model.date_created.is_some());

    let submitted = registry.submitted_ids();
    assert_eq!(submitted.len(), 1);
    assert!(!submitted[0].is_empty());
    assert_ne!(model.id, submitted[0]);
}

#[tokio::test]
async fn test_create_keeps_request_fields() {
    let registry = FakeRegistry::new();
    let deployments = manager(&registry, &FakeTwins::new(vec![]));

    for (name, priority) in [("alpha", 0), ("beta", 7), ("gamma rollout", 1000)] {
        let request = edge_request(name, priority);
        let model = assert_ok!(deployments.create(request.clone()).await);

        assert_ne!(model.id, request.name);
        assert_ne!(model.id, request.device_group_id);
        assert_ne!(model.id, request.device_group_query);
        assert_eq!(model.name, request.name);
        assert_eq!(model.device_group_id, request.device_group_id);
        assert_eq!(model.priority, request.priority);
        assert_eq!(model.package_content, request.package_content);
    }

    let submitted = registry.submitted_ids();
    assert_eq!(submitted.len(), 3);
    for (placeholder, stored) in submitted.iter().zip(registry.stored()) {
        assert_ne!(*placeholder, stored.id);
    }
}

#[tokio::test]
async fn test_create_from_configuration_document() {
    // (name, group id, group query, with content, priority, rejected)
    let rows = [
        ("depname", "dvcgroupid", "dvcGroupQuery", true, 10, false),
        ("", "dvcgroupid", "dvcGroupQuery", true, 10, true),
        ("depname", "", "dvcGroupQuery", true, 10, true),
        ("depname", "dvcgroupid", "", true, 10, true),
        ("depname", "dvcgroupid", "dvcGroupQuery", false, 10, true),
        ("depname", "dvcgroupid", "dvcGroupQuery", true, -1, true),
    ];

    for (name, group, query, with_content, priority, rejected) in rows {
        let package_content = if with_content {
            json!({
                "id": "test-config",
                "labels": {"Name": name, "DeviceGroupId": group, "RMDeployment": "true"},
                "priority": priority,
                "content": {"modulesContent": {"$edgeAgent": {"properties.desired": {"schemaVersion": "1.0"}}}}
            })
            .to_string()
        } else {
            String::new()
        };
        let request = DeploymentRequest::new(
            name,
            group,
            query,
            package_content,
            priority,
            DeploymentType::EdgeManifest,
        );

        let registry = FakeRegistry::new();
        registry.set_next_id(7);
        let deployments = manager(&registry, &FakeTwins::new(vec![]));
        let result = deployments.create(request).await;

        if rejected {
            let err = assert_err!(result);
            assert!(matches!(err, ManagerError::InvalidInput(_)), "got {:?}", err);
            assert!(registry.calls().is_empty());
        } else {
            let model = assert_ok!(result);
            assert_eq!(model.id, "cfg-7");
            assert_eq!(model.name, name);
            assert_eq!(model.device_group_id, group);
            assert_eq!(model.priority, priority);

            let stored = registry.stored();
            let content = stored[0].content.sections().unwrap();
            assert!(content.modules_content.unwrap().contains_key("$edgeAgent"));
        }
    }
}

#[tokio::test]
async fn test_create_stamps_document() {
    let registry = FakeRegistry::new();
    let deployments = manager(&registry, &FakeTwins::new(vec![]));

    assert_ok!(deployments.create(edge_request("depA", 10)).await);

    let stored = registry.stored();
    assert_eq!(stored.len(), 1);
    let document = &stored[0];
    assert_eq!(document.label("RMDeployment"), Some("true"));
    assert_eq!(document.label("Name"), Some("depA"));
    assert_eq!(document.label("DeviceGroupId"), Some("dvcgroupid"));
    assert_eq!(document.label("Type"), Some("edgeManifest"));
    assert_eq!(document.target_condition.as_deref(), Some("tags.building = '43'"));
    assert_eq!(document.priority, 10);
    assert_eq!(document.schema_version.as_deref(), Some("1.0"));
    assert!(document.content.sections().unwrap().modules_content.is_some());
}

#[tokio::test]
async fn test_create_invalid_requests_never_reach_registry() {
    let invalid = [
        edge_request("", 10),
        DeploymentRequest::new("depA", "", "*", MANIFEST, 10, DeploymentType::EdgeManifest),
        DeploymentRequest::new("depA", "g1", " ", MANIFEST, 10, DeploymentType::EdgeManifest),
        DeploymentRequest::new("depA", "g1", "*", "", 10, DeploymentType::EdgeManifest),
        edge_request("depA", -1),
    ];

    for request in invalid {
        let registry = FakeRegistry::new();
        let deployments = manager(&registry, &FakeTwins::new(vec![]));

        let err = assert_err!(deployments.create(request).await);
        assert!(matches!(err, ManagerError::InvalidInput(_)), "got {:?}", err);
        assert!(registry.calls().is_empty());
    }
}

#[tokio::test]
async fn test_create_existing_deployment() {
    let registry = FakeRegistry::new();
    registry.fail_next(ManagerError::DeploymentAlreadyExists("cfg-1".to_string()));
    let deployments = manager(&registry, &FakeTwins::new(vec![]));

    let err = assert_err!(deployments.create(edge_request("depA", 1)).await);
    assert!(matches!(err, ManagerError::DeploymentAlreadyExists(_)));
}

#[tokio::test]
async fn test_create_registry_failure_is_external() {
    let registry = FakeRegistry::new();
    registry.fail_next(ManagerError::AuthError("token rejected".to_string()));
    let deployments = manager(&registry, &FakeTwins::new(vec![]));

    let err = assert_err!(deployments.create(edge_request("depA", 1)).await);
    match err {
        ManagerError::ExternalService(msg) => assert!(msg.contains("token rejected")),
        other => panic!("expected ExternalService, got {:?}", other),
    }
}

// ================================== LIST ====================================== //

#[tokio::test]
async fn test_list_only_owned_sorted_by_name() {
    let registry = FakeRegistry::with_configurations(vec![
        tagged("id-4", "d4"),
        untagged("id-1", "d1"),
        tagged("id-0", "d0"),
        untagged("id-3", "d3"),
        tagged("id-2", "d2"),
    ]);
    let deployments = manager(&registry, &FakeTwins::new(vec![]));

    let list = assert_ok!(deployments.list(false).await);
    let names: Vec<_> = list.items.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(names, vec!["d0", "d2", "d4"]);
    assert!(list.items.iter().all(|d| d.metrics.is_none()));
}

#[tokio::test]
async fn test_list_empty_registry() {
    let registry = FakeRegistry::new();
    let deployments = manager(&registry, &FakeTwins::new(vec![]));

    let list = assert_ok!(deployments.list(false).await);
    assert!(list.is_empty());
}

#[tokio::test]
async fn test_list_fetches_capped_count() {
    let registry = FakeRegistry::new();
    let deployments = manager(&registry, &FakeTwins::new(vec![]));

    assert_eq!(MAX_DEPLOYMENTS, 20);
    assert_ok!(deployments.list(false).await);
    assert_eq!(registry.calls(), vec!["get_configurations:20".to_string()]);
}

#[tokio::test]
async fn test_list_registry_failure() {
    let registry = FakeRegistry::new();
    registry.fail_next(ManagerError::ExternalService("503".to_string()));
    let deployments = manager(&registry, &FakeTwins::new(vec![]));

    let err = assert_err!(deployments.list(false).await);
    assert!(matches!(err, ManagerError::ExternalService(_)));
}

#[tokio::test]
async fn test_list_with_device_status() {
    let registry = FakeRegistry::with_configurations(vec![tagged("id-1", "b"), tagged("id-2", "a")]);
    let twins = FakeTwins::new(vec![
        edge_twin("dev-1", 3, Some((3, 200))),
        edge_twin("dev-2", 3, Some((2, 200))),
    ]);
    let deployments = manager(&registry, &twins);

    let list = assert_ok!(deployments.list(true).await);
    assert_eq!(list.len(), 2);
    for item in &list.items {
        let metrics = item.metrics.as_ref().unwrap();
        assert_eq!(metrics.applied, 1);
        assert_eq!(metrics.pending, 1);
        assert_eq!(metrics.device_statuses["dev-2"], DeviceDeploymentState::Pending);
    }
    assert_eq!(twins.queries().len(), 2);
}

#[tokio::test]
async fn test_list_with_custom_ownership_tag() {
    let mut foreign = untagged("id-1", "other");
    foreign
        .labels
        .as_mut()
        .unwrap()
        .insert("CreatedBy".to_string(), "console".to_string());
    let registry = FakeRegistry::with_configurations(vec![tagged("id-0", "ours"), foreign]);

    let deployments = Deployments::with_options(
        registry.clone(),
        FakeTwins::new(vec![]),
        DeploymentOptions {
            ownership: OwnershipTag::new("CreatedBy", "console"),
            ..Default::default()
        },
    );

    let list = assert_ok!(deployments.list(false).await);
    assert_eq!(list.len(), 1);
    assert_eq!(list.items[0].name, "other");
}

// ================================ GET/DELETE =================================== //

#[tokio::test]
async fn test_get_round_trip() {
    let registry = FakeRegistry::new();
    let deployments = manager(&registry, &FakeTwins::new(vec![]));

    let request = edge_request("depA", 10);
    let created = assert_ok!(deployments.create(request.clone()).await);
    let fetched = assert_ok!(deployments.get(&created.id, false).await);

    assert_eq!(fetched.id, created.id);
    assert_eq!(fetched.name, request.name);
    assert_eq!(fetched.device_group_id, request.device_group_id);
    assert_eq!(fetched.device_group_query, request.device_group_query);
    assert_eq!(fetched.priority, request.priority);
    assert_eq!(fetched.package_content, request.package_content);
    assert_eq!(fetched.deployment_type, DeploymentType::EdgeManifest);
    assert_eq!(fetched.date_created, created.date_created);
}

#[tokio::test]
async fn test_get_round_trip_keeps_package_content() {
    let registry = FakeRegistry::new();
    let deployments = manager(&registry, &FakeTwins::new(vec![]));

    let manifest = "{\n  \"modulesContent\": {\n    \"$edgeHub\": {},\n    \"$edgeAgent\": {\"x\": 1}\n  },\n  \"schemaVersion\": \"1.0\"\n}";
    let request = DeploymentRequest::new("depA", "g1", "*", manifest, 3, DeploymentType::EdgeManifest);
    let created = assert_ok!(deployments.create(request).await);
    let fetched = assert_ok!(deployments.get(&created.id, false).await);

    assert_eq!(created.package_content, manifest);
    assert_eq!(fetched.package_content, manifest);
}

#[tokio::test]
async fn test_get_foreign_or_missing_is_not_found() {
    let registry = FakeRegistry::with_configurations(vec![untagged("id-1", "foreign")]);
    let deployments = manager(&registry, &FakeTwins::new(vec![]));

    for id in ["id-1", "id-404", ""] {
        let err = assert_err!(deployments.get(id, false).await);
        assert!(matches!(err, ManagerError::NotFound(_)), "got {:?}", err);
    }
}

#[tokio::test]
async fn test_get_with_device_status() {
    let registry = FakeRegistry::with_configurations(vec![tagged("id-1", "depA")]);
    let twins = FakeTwins::new(vec![
        edge_twin("dev-1", 2, Some((2, 200))),
        edge_twin("dev-2", 2, Some((2, 500))),
        edge_twin("dev-3", 2, None),
    ]);
    let deployments = manager(&registry, &twins);

    let model = assert_ok!(deployments.get("id-1", true).await);
    let metrics = model.metrics.unwrap();
    assert_eq!((metrics.applied, metrics.failed, metrics.pending), (1, 1, 1));
    assert_eq!(metrics.total(), 3);
    assert!(twins.queries()[0].contains("configurations.[[id-1]].status = 'Targeted'"));
    assert!(twins.queries()[0].contains("configurations.[[id-1]].status = 'Applied'"));
}

#[tokio::test]
async fn test_get_new_deployment_is_pending_on_targeted_devices() {
    let registry =
        FakeRegistry::with_configurations(vec![with_targeted_count(tagged("id-1", "depA"), 3)]);
    let deployments = manager(&registry, &FakeTwins::new(vec![]));

    let model = assert_ok!(deployments.get("id-1", true).await);
    let metrics = model.metrics.unwrap();
    assert_eq!((metrics.applied, metrics.pending, metrics.failed), (0, 3, 0));
}

#[tokio::test]
async fn test_delete_owned() {
    let registry = FakeRegistry::with_configurations(vec![tagged("id-1", "depA")]);
    let deployments = manager(&registry, &FakeTwins::new(vec![]));

    assert_ok!(deployments.delete("id-1").await);
    assert!(registry.stored().is_empty());
    assert!(registry.calls().contains(&"remove_configuration:id-1".to_string()));
}

#[tokio::test]
async fn test_delete_foreign_is_not_found() {
    let registry = FakeRegistry::with_configurations(vec![untagged("id-1", "foreign")]);
    let deployments = manager(&registry, &FakeTwins::new(vec![]));

    let err = assert_err!(deployments.delete("id-1").await);
    assert!(matches!(err, ManagerError::NotFound(_)));
    assert_eq!(registry.stored().len(), 1);
    assert!(!registry.calls().iter().any(|c| c.starts_with("remove_configuration")));
}
