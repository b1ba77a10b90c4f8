use base64::Engine;
use bigdecimal::BigDecimal;
use httpmock::prelude::*;
use serde_json::json;
use std::str::FromStr;

use delivery_invoicing::clients::{DocumentConfig, Invoicer, VendusClient};
use delivery_invoicing::error::IntegrationError;
use delivery_invoicing::models::{ClientQuery, InvoiceRequest, NewClient, StackedInvoiceLine};

fn client(server: &MockServer) -> VendusClient {
    VendusClient::new_with_base_url(
        "test-key".to_string(),
        server.base_url(),
        DocumentConfig {
            document_type: "FR".to_string(),
            payment_id: "94305968".to_string(),
            register_id: 94305980,
        },
    )
}

#[tokio::test]
async fn creates_invoice_document() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/documents/")
                .query_param("api_key", "test-key")
                .json_body_partial(
                    r#"{
                        "type": "FR",
                        "register_id": 94305980,
                        "payments": [{"id": "94305968"}],
                        "client": {"id": 42},
                        "items": [
                            {"reference": "BURGER", "qty": 1, "gross_price": "11.50", "text": "1x CHEESE"},
                            {"reference": "WATER", "qty": 2, "gross_price": "1.15"}
                        ],
                        "external_reference": "ABC123",
                        "notes": "Ana (glovo)"
                    }"#,
                );
            then.status(201)
                .json_body(json!({"id": 1234, "amount_gross": "13.80", "number": "FR 01P2024/7"}));
        })
        .await;

    let request = InvoiceRequest {
        lines: vec![
            StackedInvoiceLine {
                reference: "BURGER".to_string(),
                price: BigDecimal::from_str("11.50").unwrap(),
                quantity: 1,
                note: Some("1x CHEESE".to_string()),
            },
            // not exact in binary floating point
            StackedInvoiceLine {
                reference: "WATER".to_string(),
                price: BigDecimal::from_str("1.15").unwrap(),
                quantity: 2,
                note: None,
            },
        ],
        client_id: Some(42),
        external_reference: "ABC123".to_string(),
        notes: Some("Ana (glovo)".to_string()),
    };

    let created = client(&server).create_invoice(&request).await.unwrap();

    mock.assert_async().await;
    assert_eq!(created.id, 1234);
    assert_eq!(created.amount_gross, BigDecimal::from_str("13.8").unwrap());
}

#[tokio::test]
async fn rejected_document_is_http_error() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/documents/");
            then.status(400).body(r#"{"errors":[{"message":"invalid"}]}"#);
        })
        .await;

    let request = InvoiceRequest {
        lines: Vec::new(),
        client_id: None,
        external_reference: "X".to_string(),
        notes: None,
    };

    match client(&server).create_invoice(&request).await {
        Err(IntegrationError::Http { status, body }) => {
            assert_eq!(status, 400);
            assert!(body.contains("invalid"));
        }
        other => panic!("expected http error, got {:?}", other),
    }
}

#[tokio::test]
async fn fetches_and_decodes_receipt() {
    let server = MockServer::start_async().await;
    let payload = b"\x1b@RECEIPT\n".to_vec();
    let encoded = base64::engine::general_purpose::STANDARD.encode(&payload);
    let mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/documents/1234")
                .query_param("api_key", "test-key")
                .query_param("output", "escpos");
            then.status(200).json_body(json!({"id": 1234, "output": encoded}));
        })
        .await;

    let receipt = client(&server).get_receipt(1234).await.unwrap();

    mock.assert_async().await;
    assert_eq!(receipt, payload);
}

#[tokio::test]
async fn client_search_not_found_is_empty() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/clients/")
                .query_param("fiscal_id", "123456789");
            then.status(404).json_body(json!({"errors": [{"message": "No data"}]}));
        })
        .await;

    let found = client(&server)
        .search_clients(&ClientQuery::FiscalId("123456789".to_string()))
        .await
        .unwrap();

    assert!(found.is_empty());
}

#[tokio::test]
async fn searches_clients_by_external_reference() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/clients/")
                .query_param("external_reference", "+351910000000");
            then.status(200).json_body(json!([
                {"id": 7, "name": "Ana", "mobile": "+351910000000", "external_reference": "+351910000000"}
            ]));
        })
        .await;

    let found = client(&server)
        .search_clients(&ClientQuery::ExternalReference("+351910000000".to_string()))
        .await
        .unwrap();

    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, 7);
}

#[tokio::test]
async fn creates_client_with_placeholder_address() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/clients/")
                .json_body_partial(r#"{"name": "Ana", "address": "Address"}"#);
            then.status(201).json_body(json!({"id": 99, "name": "Ana"}));
        })
        .await;

    let created = client(&server)
        .create_client(&NewClient {
            name: Some("Ana".to_string()),
            address: Some("Address".to_string()),
            ..NewClient::default()
        })
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(created.id, 99);
}

#[tokio::test]
async fn lists_documents() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/documents/");
            then.status(200).json_body(json!([
                {"id": 1, "date": "2024-05-01", "number": "FR 01P2024/1", "external_reference": "ABC123", "amount_gross": "12.00"},
                {"id": 2, "date": "2024-05-01", "number": "FR 01P2024/2", "external_reference": "", "amount_gross": 3.2, "local_time": "12:00:00"}
            ]));
        })
        .await;

    let listed = client(&server).list_invoices().await.unwrap();

    assert_eq!(listed.len(), 2);
    assert!(listed[0].is_delivery());
    assert!(!listed[1].is_delivery());
}
