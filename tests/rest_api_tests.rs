//! End-to-end tests of the REST exposure
//!
//! These tests drive the full flow from HTTP request to response: order
//! creation, status changes, notes, the board, reports and catalog lookups.

mod common;

use axum::http::StatusCode;
use axum_test::TestServer;
use common::*;
use pedidos::prelude::*;
use serde_json::{Value, json};

async fn create_test_server() -> (TestServer, Seeded) {
    let seeded = seeded_store();
    let app = ServerBuilder::new()
        .with_shared_store(Arc::new(seeded.store.clone()))
        .build()
        .await
        .expect("Failed to build router");
    let server = TestServer::new(app).expect("Failed to create test server");
    (server, seeded)
}

async fn create_order(server: &TestServer, seeded: &Seeded) -> Value {
    let response = server
        .post("/orders")
        .json(&json!({
            "advisor_id": seeded.ana.id,
            "client_id": seeded.sol.id,
            "channel": "WhatsApp",
            "items": [
                {"description": "Funda", "quantity": 2, "unitCost": 5},
                {"description": "", "quantity": 1, "unitCost": 100}
            ]
        }))
        .await;
    response.assert_status(StatusCode::CREATED);
    response.json()
}

mod health_tests {
    use super::*;

    #[tokio::test]
    async fn test_health_endpoints() {
        let (server, _) = create_test_server().await;

        for path in ["/health", "/healthz"] {
            let response = server.get(path).await;
            response.assert_status_ok();
            let body: Value = response.json();
            assert_eq!(body["status"], "ok");
            assert_eq!(body["service"], "pedidos-board");
        }
    }
}

mod order_tests {
    use super::*;

    #[tokio::test]
    async fn test_create_order() {
        let (server, seeded) = create_test_server().await;
        let body = create_order(&server, &seeded).await;

        assert_eq!(body["status"], "Creado");
        assert_eq!(body["customer"], "Tienda Sol");
        assert_eq!(body["asesora"]["id"], seeded.ana.id.to_string());
        assert_eq!(body["items"].as_array().unwrap().len(), 1);
        assert_eq!(body["total"], 10.0);
        assert_eq!(body["canal"], "WhatsApp");

        let transitions = body["available_transitions"].as_array().unwrap();
        assert_eq!(transitions.len(), 1);
        assert_eq!(transitions[0]["to"], "En Revisión");
        assert_eq!(transitions[0]["action"], "send_to_review");
        assert_eq!(transitions[0]["requires_reason"], false);

        assert_eq!(seeded.store.count(tables::ORDERS), 1);
    }

    #[tokio::test]
    async fn test_create_incomplete_order_lists_issues() {
        let (server, seeded) = create_test_server().await;

        let response = server
            .post("/orders")
            .json(&json!({ "items": [] }))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["code"], "VALIDATION_ERROR");
        assert_eq!(
            body["details"]["issues"],
            json!(["missing_advisor", "missing_client", "missing_items"])
        );
        assert_eq!(seeded.store.count(tables::ORDERS), 0);
    }

    #[tokio::test]
    async fn test_create_order_with_foreign_client_is_rejected() {
        let (server, seeded) = create_test_server().await;

        let response = server
            .post("/orders")
            .json(&json!({
                "advisor_id": seeded.ana.id,
                "client_id": seeded.luna.id,
                "items": [{"description": "Funda", "quantity": 1, "unitCost": 5}]
            }))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);

        let response = server
            .post("/orders")
            .json(&json!({
                "advisor_id": Uuid::new_v4(),
                "items": [{"description": "Funda", "quantity": 1, "unitCost": 5}]
            }))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert!(body["message"].as_str().unwrap().contains("advisor_id"));
    }

    #[tokio::test]
    async fn test_create_order_for_inactive_advisor_is_rejected() {
        let (server, seeded) = create_test_server().await;
        let mut retired = advisor("Carla Rivas");
        retired.active = false;
        let shop = client_of(&retired, "Bodega Mar");
        seeded.store.seed(tables::ADVISORS, std::slice::from_ref(&retired)).unwrap();
        seeded.store.seed(tables::CLIENTS, std::slice::from_ref(&shop)).unwrap();

        let response = server
            .post("/orders")
            .json(&json!({
                "advisor_id": retired.id,
                "client_id": shop.id,
                "items": [{"description": "Funda", "quantity": 1, "unitCost": 5}]
            }))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["code"], "VALIDATION_ERROR");
        assert!(body["message"].as_str().unwrap().contains("inactive"));
        assert_eq!(seeded.store.count(tables::ORDERS), 0);
    }

    #[tokio::test]
    async fn test_get_order() {
        let (server, seeded) = create_test_server().await;
        let created = create_order(&server, &seeded).await;
        let id = created["id"].as_str().unwrap();

        let response = server.get(&format!("/orders/{}", id)).await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["id"], id);

        let response = server.get("/orders").await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_get_nonexistent_order() {
        let (server, _) = create_test_server().await;

        let response = server.get(&format!("/orders/{}", Uuid::new_v4())).await;
        response.assert_status(StatusCode::NOT_FOUND);
        let body: Value = response.json();
        assert_eq!(body["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_invalid_uuid_in_path() {
        let (server, _) = create_test_server().await;

        let response = server.get("/orders/not-a-uuid").await;
        assert!(response.status_code().is_client_error());
    }
}

mod transition_tests {
    use super::*;

    #[tokio::test]
    async fn test_transition_flow() {
        let (server, seeded) = create_test_server().await;
        let created = create_order(&server, &seeded).await;
        let id = created["id"].as_str().unwrap();
        let path = format!("/orders/{}/transitions", id);

        let response = server.post(&path).json(&json!({"to": "En Revisión"})).await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["status"], "En Revisión");
        assert_eq!(body["history"][0]["previous_status"], "Creado");

        let response = server.get(&path).await;
        response.assert_status_ok();
        let targets: Vec<Value> = response
            .json::<Vec<Value>>()
            .into_iter()
            .map(|t| t["to"].clone())
            .collect();
        assert_eq!(targets, vec![json!("Creado"), json!("Facturado")]);

        let response = server.post(&path).json(&json!({"to": "Creado"})).await;
        response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
        let body: Value = response.json();
        assert_eq!(body["code"], "MISSING_REASON");

        let response = server
            .post(&path)
            .json(&json!({"to": "Creado", "reason": "precio incorrecto"}))
            .await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["status"], "Creado");
        assert_eq!(body["history"].as_array().unwrap().len(), 2);
        assert_eq!(body["history"][0]["reason"], "precio incorrecto");
    }

    #[tokio::test]
    async fn test_invalid_transition_is_conflict() {
        let (server, seeded) = create_test_server().await;
        let created = create_order(&server, &seeded).await;
        let id = created["id"].as_str().unwrap();

        let response = server
            .post(&format!("/orders/{}/transitions", id))
            .json(&json!({"to": "Finalizado"}))
            .await;
        response.assert_status(StatusCode::CONFLICT);
        let body: Value = response.json();
        assert_eq!(body["code"], "INVALID_TRANSITION");
        assert_eq!(body["details"]["from"], "Creado");
        assert_eq!(body["details"]["to"], "Finalizado");
    }

    #[tokio::test]
    async fn test_notes() {
        let (server, seeded) = create_test_server().await;
        let created = create_order(&server, &seeded).await;
        let path = format!("/orders/{}/notes", created["id"].as_str().unwrap());

        let response = server.post(&path).json(&json!({"content": "   "})).await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["code"], "EMPTY_NOTE");

        server
            .post(&path)
            .json(&json!({"content": "llamar mañana"}))
            .await
            .assert_status_ok();
        let response = server
            .post(&path)
            .json(&json!({"content": "confirmado", "author": "Ana"}))
            .await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["notes"][0]["content"], "confirmado");
        assert_eq!(body["notes"][0]["created_by"], "Ana");
        assert_eq!(body["notes"][1]["created_by"], "Usuario Actual");
    }
}

mod board_tests {
    use super::*;

    #[tokio::test]
    async fn test_board_columns() {
        let (server, seeded) = create_test_server().await;
        let first = create_order(&server, &seeded).await;
        create_order(&server, &seeded).await;

        server
            .post(&format!("/orders/{}/transitions", first["id"].as_str().unwrap()))
            .json(&json!({"to": "En Revisión"}))
            .await
            .assert_status_ok();

        let response = server.get("/board").await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["grouped"], false);
        let columns = body["columns"].as_array().unwrap();
        assert_eq!(columns.len(), 4);
        assert_eq!(columns[0]["status"], "Creado");
        assert_eq!(columns[0]["count"], 1);
        assert_eq!(columns[1]["status"], "En Revisión");
        assert_eq!(columns[1]["orders"][0]["id"], first["id"]);

        let response = server.get("/board?grouped=true").await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["grouped"], true);
        let creado = &body["columns"][0];
        assert_eq!(creado["groups"][0]["order_type"], "Accesorios");
        assert_eq!(creado["groups"][0]["advisors"][0]["advisor"], "Ana Duarte");
    }
}

mod report_tests {
    use super::*;

    #[tokio::test]
    async fn test_weekly_report_endpoints() {
        let (server, seeded) = create_test_server().await;
        create_order(&server, &seeded).await;
        let week = IsoWeek::containing(chrono::Utc::now().date_naive());

        let response = server.get(&format!("/reports/weekly/{}", week)).await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["week"], week.to_string());
        assert_eq!(body["orderCount"], 1);
        assert_eq!(body["advisors"][0]["name"], "Ana Duarte");
        assert_eq!(body["topClients"][0]["name"], "Tienda Sol");

        let response = server.get(&format!("/reports/weekly/{}/html", week)).await;
        response.assert_status_ok();
        let content_type = response.header("content-type");
        assert!(content_type.to_str().unwrap().starts_with("text/html"));
        assert!(response.text().contains("Tienda Sol"));
    }

    async fn create_server_signed_in(role: Option<Role>) -> TestServer {
        let seeded = seeded_store();
        let me = principal("vendedora@pedidos.local");
        if let Some(role) = role {
            seeded
                .store
                .seed(tables::PROFILES, &[profile(&me, role)])
                .unwrap();
        }
        let app = ServerBuilder::new()
            .with_shared_store(Arc::new(seeded.store.clone()))
            .with_identity(InMemoryIdentityProvider::signed_in(me))
            .build()
            .await
            .expect("Failed to build router");
        TestServer::new(app).expect("Failed to create test server")
    }

    #[tokio::test]
    async fn test_weekly_report_requires_admin() {
        let week = IsoWeek::containing(chrono::Utc::now().date_naive());

        for role in [None, Some(Role::User)] {
            let server = create_server_signed_in(role).await;
            for path in [
                format!("/reports/weekly/{}", week),
                format!("/reports/weekly/{}/html", week),
            ] {
                let response = server.get(&path).await;
                response.assert_status(StatusCode::FORBIDDEN);
                let body: Value = response.json();
                assert_eq!(body["code"], "FORBIDDEN");
            }
        }

        let server = create_server_signed_in(Some(Role::Admin)).await;
        server
            .get(&format!("/reports/weekly/{}", week))
            .await
            .assert_status_ok();
        server
            .get(&format!("/reports/weekly/{}/html", week))
            .await
            .assert_status_ok();
    }

    #[tokio::test]
    async fn test_malformed_week_is_rejected() {
        let (server, _) = create_test_server().await;

        for week in ["2024-01", "2023-W53", "next-week"] {
            let response = server.get(&format!("/reports/weekly/{}", week)).await;
            response.assert_status(StatusCode::BAD_REQUEST);
        }
    }
}

mod catalog_tests {
    use super::*;

    #[tokio::test]
    async fn test_catalog_endpoints() {
        let (server, seeded) = create_test_server().await;

        let response = server.get("/advisors").await;
        response.assert_status_ok();
        let advisors: Vec<Value> = response.json();
        assert_eq!(advisors.len(), 2);
        assert_eq!(advisors[0]["name"], "Ana Duarte");

        let response = server
            .get(&format!("/advisors/{}/clients", seeded.bea.id))
            .await;
        response.assert_status_ok();
        let clients: Vec<Value> = response.json();
        assert_eq!(clients.len(), 1);
        assert_eq!(clients[0]["client_name"], "Kiosco Luna");

        let response = server.get("/products?q=cable").await;
        response.assert_status_ok();
        let products: Vec<Value> = response.json();
        assert_eq!(products.len(), 1);
        assert_eq!(products[0]["codigo"], "CAB-01");

        let response = server.get("/products").await;
        response.assert_status_ok();
        let products: Vec<Value> = response.json();
        assert!(products.is_empty());
    }
}
