mod common;

use axum::http::StatusCode;
use common::{admin_token, body_json, get_request, multipart_csv_request, test_app, test_state_and_db};
use peptide_ops_api::app;
use sea_orm::ConnectionTrait;
use tower::ServiceExt;

const FULL_HEADER: &str = "sku,name,price_dollars,description,category,initial_stock,low_stock_threshold,weight_grams,min_order_qty,max_order_qty,active,requires_coa,tags";

#[tokio::test]
async fn import_requires_authentication() {
    let (app, _state) = test_app().await;

    let request = multipart_csv_request("/api/v1/imports/products", "", "p.csv", "sku,name\nA,B");
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn minimal_valid_row_creates_product_and_inventory() {
    let (app, state) = test_app().await;
    let token = admin_token(&state).await;

    let csv = format!(
        "{FULL_HEADER}\nBPC-157-5MG,BPC-157 5mg,24.99,Body Protection Compound,Peptides,100,10,5,1,,true,false,peptide;research"
    );
    let response = app
        .oneshot(multipart_csv_request(
            "/api/v1/imports/products",
            &token,
            "products.csv",
            &csv,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let payload = body_json(response).await;
    assert_eq!(payload["summary"]["total"], 1);
    assert_eq!(payload["summary"]["created"], 1);
    assert_eq!(payload["summary"]["failed"], 0);
    assert_eq!(payload["results"][0]["row"], 2);
    assert_eq!(payload["results"][0]["sku"], "BPC-157-5MG");
    assert_eq!(payload["results"][0]["success"], true);

    let product = state
        .services
        .catalog
        .get_product_by_sku("BPC-157-5MG")
        .await
        .unwrap();
    assert_eq!(product.price_cents, 2499);
    assert_eq!(product.category.as_deref(), Some("Peptides"));
    assert_eq!(product.tags.as_deref(), Some("peptide;research"));
    assert!(product.is_active);
    assert!(!product.requires_coa);

    let stock = state
        .services
        .inventory
        .get_for_product(product.id)
        .await
        .unwrap();
    assert_eq!(stock.on_hand, 100);
    assert_eq!(stock.reorder_point, 10);
    assert_eq!(stock.reserved, 0);
}

#[tokio::test]
async fn invalid_sku_is_reported_per_row_without_aborting() {
    let (app, state) = test_app().await;
    let token = admin_token(&state).await;

    let csv = "sku,name,price_dollars\nBAD SKU!,Widget,9.99";
    let response = app
        .oneshot(multipart_csv_request(
            "/api/v1/imports/products",
            &token,
            "products.csv",
            csv,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let payload = body_json(response).await;
    assert_eq!(payload["summary"]["total"], 1);
    assert_eq!(payload["summary"]["created"], 0);
    assert_eq!(payload["summary"]["failed"], 1);
    assert_eq!(payload["results"][0]["row"], 2);
    assert_eq!(payload["results"][0]["sku"], "BAD SKU!");
    assert_eq!(payload["results"][0]["success"], false);
    assert!(payload["results"][0]["error"]
        .as_str()
        .unwrap()
        .contains("letters, numbers, hyphens"));
}

#[tokio::test]
async fn mixed_batch_preserves_order_and_counts() {
    let (app, state) = test_app().await;
    let token = admin_token(&state).await;

    let csv = "sku,name,price_dollars\n\
               GOOD-1,First,1.00\n\
               ,Missing Sku,2.00\n\
               GOOD-2,Third,3.00";
    let response = app
        .oneshot(multipart_csv_request(
            "/api/v1/imports/products",
            &token,
            "products.csv",
            csv,
        ))
        .await
        .unwrap();

    let payload = body_json(response).await;
    assert_eq!(payload["summary"]["total"], 3);
    assert_eq!(payload["summary"]["created"], 2);
    assert_eq!(payload["summary"]["failed"], 1);

    let results = payload["results"].as_array().unwrap();
    assert_eq!(results.len(), 3);
    assert_eq!(results[0]["row"], 2);
    assert_eq!(results[1]["row"], 3);
    assert_eq!(results[1]["sku"], "?");
    assert_eq!(results[2]["row"], 4);
    assert_eq!(results[2]["success"], true);
}

#[tokio::test]
async fn empty_csv_is_rejected_flat() {
    let (app, state) = test_app().await;
    let token = admin_token(&state).await;

    let response = app
        .oneshot(multipart_csv_request(
            "/api/v1/imports/products",
            &token,
            "products.csv",
            "sku,name,price_dollars\n",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let payload = body_json(response).await;
    assert_eq!(payload, serde_json::json!({ "error": "CSV file is empty" }));
}

#[tokio::test]
async fn missing_required_columns_are_rejected() {
    let (app, state) = test_app().await;
    let token = admin_token(&state).await;

    let response = app
        .oneshot(multipart_csv_request(
            "/api/v1/imports/products",
            &token,
            "products.csv",
            "price_dollars,category\n1.00,Misc",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let payload = body_json(response).await;
    let message = payload["error"].as_str().unwrap();
    assert!(message.contains("missing required columns"));
    assert!(message.contains("sku"));
    assert!(message.contains("name"));
}

#[tokio::test]
async fn non_csv_uploads_are_rejected() {
    let (app, state) = test_app().await;
    let token = admin_token(&state).await;

    let response = app
        .oneshot(multipart_csv_request(
            "/api/v1/imports/products",
            &token,
            "products.xlsx",
            "sku,name,price\nA-1,Widget,1.00",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let payload = body_json(response).await;
    assert!(payload["error"].as_str().unwrap().contains(".csv"));
}

fn bulk_csv(rows: usize) -> String {
    let mut csv = String::from("sku,name,price_dollars\n");
    for i in 0..rows {
        csv.push_str(&format!("SKU-{i},Product {i},1.50\n"));
    }
    csv
}

#[tokio::test]
async fn exactly_five_hundred_rows_are_accepted() {
    let (app, state) = test_app().await;
    let token = admin_token(&state).await;

    let response = app
        .oneshot(multipart_csv_request(
            "/api/v1/imports/products",
            &token,
            "bulk.csv",
            &bulk_csv(500),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let payload = body_json(response).await;
    assert_eq!(payload["summary"]["total"], 500);
    assert_eq!(payload["summary"]["created"], 500);
}

#[tokio::test]
async fn five_hundred_one_rows_are_rejected_wholesale() {
    let (app, state) = test_app().await;
    let token = admin_token(&state).await;

    let response = app
        .oneshot(multipart_csv_request(
            "/api/v1/imports/products",
            &token,
            "bulk.csv",
            &bulk_csv(501),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Nothing was processed.
    let (products, total) = state
        .services
        .catalog
        .list_products(1, 10, false, None)
        .await
        .unwrap();
    assert_eq!(total, 0);
    assert!(products.is_empty());
}

#[tokio::test]
async fn reimport_upserts_by_case_insensitive_sku() {
    let (app, state) = test_app().await;
    let token = admin_token(&state).await;

    let first = multipart_csv_request(
        "/api/v1/imports/products",
        &token,
        "products.csv",
        "sku,name,price_dollars\nbpc-157,Original Name,10.00",
    );
    let response = app.clone().oneshot(first).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let second = multipart_csv_request(
        "/api/v1/imports/products",
        &token,
        "products.csv",
        "sku,name,price_dollars\nBPC-157,Updated Name,12.50",
    );
    let response = app.oneshot(second).await.unwrap();
    let payload = body_json(response).await;
    // Upsert semantics: the second pass still counts as created.
    assert_eq!(payload["summary"]["created"], 1);

    let (_, total) = state
        .services
        .catalog
        .list_products(1, 10, false, None)
        .await
        .unwrap();
    assert_eq!(total, 1);

    let product = state
        .services
        .catalog
        .get_product_by_sku("bpc-157")
        .await
        .unwrap();
    assert_eq!(product.sku, "BPC-157");
    assert_eq!(product.name, "Updated Name");
    assert_eq!(product.price_cents, 1250);
}

#[tokio::test]
async fn quoted_fields_and_price_aliases_are_honored() {
    let (app, state) = test_app().await;
    let token = admin_token(&state).await;

    let csv = "sku,name,cost,description\n\
               TB-500,\"Thymosin, Beta 4\",45.00,\"says \"\"for research\"\"\"";
    let response = app
        .oneshot(multipart_csv_request(
            "/api/v1/imports/products",
            &token,
            "products.csv",
            csv,
        ))
        .await
        .unwrap();
    let payload = body_json(response).await;
    assert_eq!(payload["summary"]["created"], 1);

    let product = state
        .services
        .catalog
        .get_product_by_sku("TB-500")
        .await
        .unwrap();
    assert_eq!(product.name, "Thymosin, Beta 4");
    assert_eq!(product.price_cents, 4500);
    assert_eq!(product.description.as_deref(), Some("says \"for research\""));
}

#[tokio::test]
async fn persistence_failure_is_a_per_row_error_with_the_underlying_cause() {
    let (state, db) = test_state_and_db(|_| {}).await;
    let app = app(state.clone());
    let token = admin_token(&state).await;

    // Knock out the stock table so every row fails at the inventory upsert.
    db.execute_unprepared("DROP TABLE inventory_records")
        .await
        .unwrap();

    let csv = "sku,name,price_dollars\nPER-1,First,1.00\nPER-2,Second,2.00";
    let response = app
        .oneshot(multipart_csv_request(
            "/api/v1/imports/products",
            &token,
            "products.csv",
            csv,
        ))
        .await
        .unwrap();
    // The batch itself succeeds; the failures ride in the report.
    assert_eq!(response.status(), StatusCode::OK);

    let payload = body_json(response).await;
    assert_eq!(payload["summary"]["total"], 2);
    assert_eq!(payload["summary"]["created"], 0);
    assert_eq!(payload["summary"]["failed"], 2);

    let results = payload["results"].as_array().unwrap();
    assert_eq!(results.len(), 2);
    for (i, result) in results.iter().enumerate() {
        assert_eq!(result["row"], (i + 2) as u64);
        assert_eq!(result["success"], false);
        // The error carries the concrete cause, not a generic placeholder.
        let error = result["error"].as_str().unwrap();
        assert_ne!(error, "Database error");
        assert!(error.contains("inventory_records"), "error was: {error}");
    }
}

#[tokio::test]
async fn import_writes_a_summary_audit_event() {
    let (app, state) = test_app().await;
    let token = admin_token(&state).await;

    let response = app
        .oneshot(multipart_csv_request(
            "/api/v1/imports/products",
            &token,
            "audited.csv",
            "sku,name,price_dollars\nAUD-1,Widget,2.00",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let (events, total) = state
        .services
        .audit
        .list(1, 10, Some("products.import".to_string()))
        .await
        .unwrap();
    assert_eq!(total, 1);
    let detail: serde_json::Value =
        serde_json::from_str(events[0].detail.as_deref().unwrap()).unwrap();
    assert_eq!(detail["file_name"], "audited.csv");
    assert_eq!(detail["created"], 1);
}

#[tokio::test]
async fn imported_product_is_visible_through_the_catalog_api() {
    let (app, state) = test_app().await;
    let token = admin_token(&state).await;

    let response = app
        .clone()
        .oneshot(multipart_csv_request(
            "/api/v1/imports/products",
            &token,
            "products.csv",
            "sku,name,price_dollars\nVIS-1,Visible,3.00",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(get_request("/api/v1/products/by-sku/VIS-1", Some(&token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let payload = body_json(response).await;
    assert_eq!(payload["name"], "Visible");
    assert_eq!(payload["price_cents"], 300);
}
