//! Order board server over a seeded in-memory store
//!
//! Run with `cargo run --example board_server [config.yaml]`.

use anyhow::Result;
use pedidos::prelude::*;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,pedidos=debug")),
        )
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => AppConfig::from_yaml_file(&path)?,
        None => AppConfig::default(),
    };

    let store = InMemoryDataStore::new();
    seed(&store)?;

    let me = Principal {
        id: Uuid::new_v4(),
        email: "admin@pedidos.local".to_string(),
    };
    store.seed(
        tables::PROFILES,
        &[Profile {
            id: me.id,
            role: Role::Admin,
            cedula: None,
            first_name: Some("Admin".to_string()),
            last_name: None,
            email: Some(me.email.clone()),
            created_at: chrono::Utc::now(),
        }],
    )?;

    println!("🚀 Pedidos board on http://{}", config.server.bind);
    println!("\n📚 Routes:");
    println!("    GET    /orders                          - List orders, newest first");
    println!("    POST   /orders                          - Create an order");
    println!("    GET    /orders/{{id}}                     - Order with available transitions");
    println!("    POST   /orders/{{id}}/transitions         - Change status");
    println!("    POST   /orders/{{id}}/notes               - Add a note");
    println!("    GET    /board?grouped=true              - Kanban columns");
    println!("    GET    /reports/weekly/{{week}}[/html]    - Weekly report, e.g. 2024-W01");
    println!("    GET    /advisors, /products?q=          - Catalog lookups");

    let bind = config.server.bind.clone();
    ServerBuilder::new()
        .with_config(config)
        .with_store(store)
        .with_identity(InMemoryIdentityProvider::signed_in(me))
        .serve(&bind)
        .await
}

fn seed(store: &InMemoryDataStore) -> Result<()> {
    let advisors: Vec<Advisor> = ["Alexandra Duarte", "Brigith Ortiz", "Dimayir Pérez"]
        .into_iter()
        .map(|name| Advisor {
            id: Uuid::new_v4(),
            name: name.to_string(),
            active: true,
        })
        .collect();

    let clients: Vec<Client> = advisors
        .iter()
        .zip(["Tienda Sol", "Kiosco Luna", "Papelería Central"])
        .map(|(advisor, name)| Client {
            id: Uuid::new_v4(),
            advisor_id: advisor.id,
            display_name: name.to_string(),
            business_name: None,
            tax_id: None,
            phone: None,
            address: None,
        })
        .collect();

    let products = [
        ("FUN-01", "Funda silicona"),
        ("CAB-01", "Cable USB-C 1 m"),
        ("PRO-01", "Protector de pantalla"),
        ("CAR-01", "Cargador 20 W"),
    ]
    .map(|(code, description)| Product {
        code: code.to_string(),
        description: description.to_string(),
    });

    store.seed(tables::ADVISORS, &advisors)?;
    store.seed(tables::CLIENTS, &clients)?;
    store.seed(tables::PRODUCTS, &products)?;
    tracing::info!(
        advisors = advisors.len(),
        clients = clients.len(),
        products = products.len(),
        "Demo data seeded"
    );
    Ok(())
}
