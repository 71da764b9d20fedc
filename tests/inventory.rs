// ABOUTME: Integration tests for inventory queries over the in-memory engine.
// ABOUTME: Covers filtering, dependent lookup, and unavailable-engine reporting.

mod support;

use dregs::engine::{ContainerStatus, ImageFilter};
use dregs::inventory::{Inventory, InventoryError, select};
use dregs::types::{ContainerId, ImageId};
use support::{Call, FakeEngine};

fn engine() -> FakeEngine {
    FakeEngine::new()
        .image("base", &["base:1"])
        .child("layer", "base")
        .image("loose", &[])
        .container("web", "base", ContainerStatus::Running)
        .container("job", "base", ContainerStatus::Stopped)
}

#[tokio::test]
async fn dangling_filter_excludes_tagged_images() {
    let engine = engine();
    let images = Inventory::new(&engine)
        .list_images(ImageFilter::Dangling)
        .await
        .unwrap();
    let ids: Vec<_> = images.into_iter().map(|img| img.id).collect();
    assert_eq!(ids, vec![ImageId::new("layer"), ImageId::new("loose")]);
}

#[tokio::test]
async fn all_filter_lists_everything_in_engine_order() {
    let engine = engine();
    let images = Inventory::new(&engine)
        .list_images(ImageFilter::All)
        .await
        .unwrap();
    assert_eq!(images.len(), 3);
    assert_eq!(images[0].display_name(), "base:1");
}

#[tokio::test]
async fn dependents_include_stopped_containers_and_children() {
    support::init_tracing();
    let engine = engine();
    let dependents = Inventory::new(&engine)
        .dependents(&ImageId::new("base"))
        .await
        .unwrap();

    let containers: Vec<_> = dependents.containers.iter().map(|c| c.id.clone()).collect();
    assert_eq!(containers, vec![ContainerId::new("web"), ContainerId::new("job")]);
    assert_eq!(dependents.children.len(), 1);
    assert_eq!(dependents.children[0].id, ImageId::new("layer"));

    assert!(engine.calls().contains(&Call::ListContainers {
        ancestor: Some(ImageId::new("base"))
    }));
}

#[tokio::test]
async fn containers_of_child_images_are_not_dependents() {
    let engine = engine().container("api", "layer", ContainerStatus::Running);
    let dependents = Inventory::new(&engine)
        .dependents(&ImageId::new("base"))
        .await
        .unwrap();

    let containers: Vec<_> = dependents.containers.iter().map(|c| c.id.clone()).collect();
    assert_eq!(containers, vec![ContainerId::new("web"), ContainerId::new("job")]);

    let on_layer = Inventory::new(&engine)
        .dependents(&ImageId::new("layer"))
        .await
        .unwrap();
    assert_eq!(on_layer.containers.len(), 1);
    assert_eq!(on_layer.containers[0].id, ContainerId::new("api"));
}

#[tokio::test]
async fn image_without_users_has_no_dependents() {
    let engine = engine();
    let dependents = Inventory::new(&engine)
        .dependents(&ImageId::new("loose"))
        .await
        .unwrap();
    assert!(dependents.is_empty());
}

#[tokio::test]
async fn unreachable_engine_is_reported_as_unavailable() {
    let engine = engine();
    engine.set_unavailable(true);
    let inventory = Inventory::new(&engine);

    assert!(matches!(
        inventory.list_images(ImageFilter::All).await,
        Err(InventoryError::EngineUnavailable(_))
    ));
    assert!(matches!(
        inventory.dependents(&ImageId::new("base")).await,
        Err(InventoryError::EngineUnavailable(_))
    ));
}

#[tokio::test]
async fn listings_never_modify_the_engine() {
    let engine = engine();
    let inventory = Inventory::new(&engine);
    inventory.list_images(ImageFilter::All).await.unwrap();
    inventory.dependents(&ImageId::new("base")).await.unwrap();
    assert_eq!(engine.removal_attempts(), 0);
}

#[tokio::test]
async fn select_resolves_operator_references() {
    let engine = FakeEngine::new()
        .image("4f4fb700ef54", &["app:latest", "app:1.0"])
        .image("4f4b00000000", &[])
        .image("9c1d", &["db:16"]);
    let images = Inventory::new(&engine)
        .list_images(ImageFilter::All)
        .await
        .unwrap();

    let ids = |reference: &str| -> Vec<ImageId> {
        select(&images, reference)
            .into_iter()
            .map(|img| img.id.clone())
            .collect()
    };

    assert_eq!(ids("app"), vec![ImageId::new("4f4fb700ef54")]);
    assert_eq!(ids("db:16"), vec![ImageId::new("9c1d")]);
    assert_eq!(ids("4f4f"), vec![ImageId::new("4f4fb700ef54")]);
    assert_eq!(ids("4f4").len(), 2);
    assert_eq!(ids("sha256:9c1d"), vec![ImageId::new("9c1d")]);
    assert!(ids("redis").is_empty());
    assert!(ids("  ").is_empty());
}
