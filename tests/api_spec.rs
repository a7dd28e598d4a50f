use std::sync::Arc;

use axum::http::StatusCode;
use axum_test::TestServer;
use gearset_tracker::api::{create_router, LoginInput, SelectPlanInput, SessionInfo, SetActiveInput};
use gearset_tracker::config::TrackerConfig;
use gearset_tracker::inventory::{MemoryCatalog, MemoryInventory};
use gearset_tracker::models::*;
use gearset_tracker::Tracker;
use serde_json::json;

const ROBE: ItemId = 100;
const TOKEN: ItemId = 200;
const COFFER: ItemId = 300;
const CRIT_MATERIA: ItemId = 5000;

fn setup() -> TestServer {
    setup_with(TrackerConfig::default())
}

fn setup_with(config: TrackerConfig) -> TestServer {
    let inventory = Arc::new(MemoryInventory::new());
    let catalog = MemoryCatalog::new(
        [ROBE, TOKEN, COFFER, CRIT_MATERIA],
        vec![Materia {
            item_id: CRIT_MATERIA,
            stat: "crit".to_string(),
            tier: 10,
        }],
    );
    let tracker = Tracker::builder(config)
        .inventory(inventory.clone())
        .catalog(Arc::new(catalog))
        .start();
    let app = create_router(tracker, inventory);
    TestServer::new(app).expect("Failed to create test server")
}

fn robe_definition(name: &str) -> GearsetDefinition {
    GearsetDefinition {
        name: name.to_string(),
        job: "WHM".to_string(),
        is_active: None,
        pieces: vec![GearpieceDefinition {
            slot: EquipSlot::Body,
            item_id: ROBE,
            name: "Augmented Robe".to_string(),
            prerequisites: Some(PrerequisiteNode::one_of(vec![
                PrerequisiteNode::atom(ROBE, 1),
                PrerequisiteNode::all_of(vec![
                    PrerequisiteNode::atom(TOKEN, 1),
                    PrerequisiteNode::atom(COFFER, 1),
                ]),
            ])),
            melds: vec![
                MeldSlot {
                    stat: "crit".to_string(),
                    tier: 10,
                    max_tier: None,
                },
                MeldSlot {
                    stat: "crit".to_string(),
                    tier: 10,
                    max_tier: None,
                },
            ],
        }],
    }
}

async fn import(server: &TestServer, name: &str) -> Gearset {
    server
        .post("/api/v1/gearsets")
        .json(&robe_definition(name))
        .await
        .json::<Gearset>()
}

async fn put_bag(server: &TestServer, items: serde_json::Value) {
    server
        .put("/api/v1/inventory/inventory1")
        .json(&items)
        .await
        .assert_status(StatusCode::NO_CONTENT);
}

/// Drain the update queue: a rescan runs after everything queued before it.
async fn rescan(server: &TestServer) {
    server
        .post("/api/v1/rescan")
        .await
        .assert_status(StatusCode::NO_CONTENT);
}

mod health {
    use super::*;

    #[tokio::test]
    async fn reports_ok() {
        let server = setup();
        let response = server.get("/api/v1/health").await;
        response.assert_status_ok();
        response.assert_json(&json!({ "status": "ok" }));
    }
}

mod session {
    use super::*;

    #[tokio::test]
    async fn starts_logged_out() {
        let server = setup();
        let session: SessionInfo = server.get("/api/v1/session").await.json();
        assert!(session.player_id.is_none());
    }

    #[tokio::test]
    async fn login_sets_the_player() {
        let server = setup();
        server
            .post("/api/v1/session/login")
            .json(&LoginInput { player_id: 42 })
            .await
            .assert_status_ok();

        let session: SessionInfo = server.get("/api/v1/session").await.json();
        assert_eq!(session.player_id, Some(42));
    }

    #[tokio::test]
    async fn logout_clears_gearsets() {
        let server = setup();
        server
            .post("/api/v1/session/login")
            .json(&LoginInput { player_id: 42 })
            .await;
        import(&server, "Healer BiS").await;

        server.post("/api/v1/session/logout").await.assert_status_ok();

        let gearsets: Vec<Gearset> = server.get("/api/v1/gearsets").await.json();
        assert!(gearsets.is_empty());
    }
}

mod gearsets {
    use super::*;

    #[tokio::test]
    async fn import_returns_created_gearset() {
        let server = setup();
        let response = server
            .post("/api/v1/gearsets")
            .json(&robe_definition("Healer BiS"))
            .await;

        response.assert_status(StatusCode::CREATED);
        let gearset: Gearset = response.json();
        assert_eq!(gearset.name, "Healer BiS");
        assert!(gearset.is_active);
        assert_eq!(gearset.pieces.len(), 1);
        assert!(!gearset.pieces[0].collected);
    }

    #[tokio::test]
    async fn import_resolves_against_current_inventory() {
        let server = setup();
        put_bag(&server, json!({ "100": 1 })).await;

        let gearset = import(&server, "Healer BiS").await;
        assert!(gearset.pieces[0].collected);
        assert!(gearset.pieces[0].root.collected);
    }

    #[tokio::test]
    async fn import_rejects_empty_group() {
        let server = setup();
        let mut definition = robe_definition("Broken");
        definition.pieces[0].prerequisites = Some(PrerequisiteNode::all_of(vec![]));

        let response = server.post("/api/v1/gearsets").json(&definition).await;
        response.assert_status(StatusCode::BAD_REQUEST);

        let gearsets: Vec<Gearset> = server.get("/api/v1/gearsets").await.json();
        assert!(gearsets.is_empty());
    }

    #[tokio::test]
    async fn import_rejects_unknown_items() {
        let server = setup();
        let mut definition = robe_definition("Unknown");
        definition.pieces[0].prerequisites = Some(PrerequisiteNode::atom(999_999, 1));

        let response = server.post("/api/v1/gearsets").json(&definition).await;
        response.assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn import_rejects_past_the_limit() {
        let server = setup_with(TrackerConfig {
            max_gearsets: 1,
            ..TrackerConfig::default()
        });
        import(&server, "First").await;

        let response = server
            .post("/api/v1/gearsets")
            .json(&robe_definition("Second"))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn lists_in_creation_order() {
        let server = setup();
        import(&server, "Zebra").await;
        import(&server, "Alpha").await;

        let gearsets: Vec<Gearset> = server.get("/api/v1/gearsets").await.json();
        let names: Vec<_> = gearsets.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["Zebra", "Alpha"]);
    }

    #[tokio::test]
    async fn get_returns_404_for_missing_gearset() {
        let server = setup();
        let response = server
            .get(&format!("/api/v1/gearsets/{}", uuid::Uuid::new_v4()))
            .await;
        response.assert_status_not_found();
    }

    #[tokio::test]
    async fn delete_removes_the_gearset() {
        let server = setup();
        let gearset = import(&server, "Doomed").await;

        server
            .delete(&format!("/api/v1/gearsets/{}", gearset.id))
            .await
            .assert_status(StatusCode::NO_CONTENT);

        server
            .delete(&format!("/api/v1/gearsets/{}", gearset.id))
            .await
            .assert_status_not_found();
    }

    #[tokio::test]
    async fn set_active_toggles_activation() {
        let server = setup();
        let gearset = import(&server, "Healer BiS").await;

        let updated: Gearset = server
            .put(&format!("/api/v1/gearsets/{}/active", gearset.id))
            .json(&SetActiveInput { is_active: false })
            .await
            .json();
        assert!(!updated.is_active);
    }

    #[tokio::test]
    async fn progress_counts_the_active_path() {
        let server = setup();
        put_bag(&server, json!({ "200": 1 })).await;
        let gearset = import(&server, "Healer BiS").await;

        let response = server
            .get(&format!("/api/v1/gearsets/{}/progress", gearset.id))
            .await;
        response.assert_status_ok();
        let progress: GearsetProgress = response.json();
        assert!(!progress.collected);
        assert_eq!(progress.progress, Progress { collected: 1, total: 2 });
    }
}

mod locks {
    use super::*;

    #[tokio::test]
    async fn locked_node_keeps_manual_state_through_rescans() {
        let server = setup();
        let gearset = import(&server, "Healer BiS").await;

        server
            .put(&format!("/api/v1/gearsets/{}/pieces/body/lock", gearset.id))
            .json(&SetLockInput {
                path: Some(vec![1, 0]),
                locked: true,
                collected: Some(true),
            })
            .await
            .assert_status_ok();
        rescan(&server).await;

        let gearset: Gearset = server
            .get(&format!("/api/v1/gearsets/{}", gearset.id))
            .await
            .json();
        let token = gearset.pieces[0].root.node(&[1, 0]).expect("token node");
        assert!(token.collected);
        assert!(token.locked);
        assert!(!gearset.pieces[0].collected);
    }

    #[tokio::test]
    async fn unknown_path_is_404() {
        let server = setup();
        let gearset = import(&server, "Healer BiS").await;

        server
            .put(&format!("/api/v1/gearsets/{}/pieces/body/lock", gearset.id))
            .json(&SetLockInput {
                path: Some(vec![7]),
                locked: true,
                collected: None,
            })
            .await
            .assert_status_not_found();
    }

    #[tokio::test]
    async fn missing_slot_is_404() {
        let server = setup();
        let gearset = import(&server, "Healer BiS").await;

        server
            .put(&format!("/api/v1/gearsets/{}/pieces/head/lock", gearset.id))
            .json(&SetLockInput {
                path: None,
                locked: true,
                collected: None,
            })
            .await
            .assert_status_not_found();
    }
}

mod inventory_events {
    use super::*;

    #[tokio::test]
    async fn relevant_addition_recomputes() {
        let server = setup();
        let gearset = import(&server, "Healer BiS").await;

        put_bag(&server, json!({ "100": 1 })).await;
        let response = server
            .post("/api/v1/events")
            .json(&InventoryEvent::Added {
                container: ContainerKind::Inventory1,
                item_id: ROBE,
                quantity: 1,
            })
            .await;
        response.assert_status(StatusCode::ACCEPTED);
        response.assert_json(&json!({ "routing": "recompute" }));

        rescan(&server).await;
        let gearset: Gearset = server
            .get(&format!("/api/v1/gearsets/{}", gearset.id))
            .await
            .json();
        assert!(gearset.pieces[0].collected);
    }

    #[tokio::test]
    async fn unrelated_item_is_irrelevant() {
        let server = setup();
        import(&server, "Healer BiS").await;

        let response = server
            .post("/api/v1/events")
            .json(&InventoryEvent::Added {
                container: ContainerKind::Inventory1,
                item_id: 12345,
                quantity: 1,
            })
            .await;
        response.assert_json(&json!({ "routing": "irrelevant" }));
    }

    #[tokio::test]
    async fn untracked_container_is_ignored() {
        let server = setup();
        import(&server, "Healer BiS").await;

        let response = server
            .post("/api/v1/events")
            .json(&InventoryEvent::Added {
                container: ContainerKind::Retainer,
                item_id: ROBE,
                quantity: 1,
            })
            .await;
        response.assert_json(&json!({ "routing": "untracked" }));
    }

    #[tokio::test]
    async fn disabled_auto_scan_skips_events() {
        let server = setup_with(TrackerConfig {
            auto_scan: false,
            ..TrackerConfig::default()
        });
        import(&server, "Healer BiS").await;

        let response = server
            .post("/api/v1/events")
            .json(&InventoryEvent::Added {
                container: ContainerKind::Inventory1,
                item_id: ROBE,
                quantity: 1,
            })
            .await;
        response.assert_json(&json!({ "routing": "disabled" }));
    }
}

mod needed {
    use super::*;

    #[tokio::test]
    async fn lists_outstanding_items_of_the_active_path() {
        let server = setup();
        import(&server, "Healer BiS").await;

        let needed: Vec<NeededItem> = server.get("/api/v1/needed").await.json();
        assert!(!needed.is_empty());
        assert!(needed.iter().all(|n| n.required > n.owned));
    }

    #[tokio::test]
    async fn empty_once_collected() {
        let server = setup();
        put_bag(&server, json!({ "100": 1 })).await;
        import(&server, "Healer BiS").await;

        let needed: Vec<NeededItem> = server.get("/api/v1/needed").await.json();
        assert!(needed.is_empty());
    }
}

mod melds {
    use super::*;

    #[tokio::test]
    async fn plans_from_owned_materia() {
        let server = setup();
        put_bag(&server, json!({ "5000": 1 })).await;
        let gearset = import(&server, "Healer BiS").await;

        let response = server
            .get(&format!("/api/v1/gearsets/{}/melds", gearset.id))
            .await;
        response.assert_status_ok();
        let list: MeldPlanList = response.json();

        // Exact and overmeld coincide without a higher slot ceiling.
        assert_eq!(list.plans.len(), 1);
        assert_eq!(list.selected, 0);
        let plan = &list.plans[0].pieces[0];
        assert_eq!(plan.slot_count, 2);
        assert_eq!(plan.assignments.len(), 1);
        assert_eq!(plan.assignments[0].materia.item_id, CRIT_MATERIA);
        assert!(!plan.is_complete());
    }

    #[tokio::test]
    async fn selection_is_clamped() {
        let server = setup();
        let gearset = import(&server, "Healer BiS").await;

        let list: MeldPlanList = server
            .put(&format!("/api/v1/gearsets/{}/melds/selected", gearset.id))
            .json(&SelectPlanInput { index: 9 })
            .await
            .json();
        assert_eq!(list.selected, list.plans.len() - 1);
    }

    #[tokio::test]
    async fn missing_gearset_is_404() {
        let server = setup();
        server
            .get(&format!("/api/v1/gearsets/{}/melds", uuid::Uuid::new_v4()))
            .await
            .assert_status_not_found();
    }
}
