//! Integration scenarios for the items ledger: service rules, the HTTP router, and the
//! client talking to a live instance of that router.

mod common {
    use std::sync::Mutex;

    use chrono::Utc;
    use cost_ledger::items::{Item, ItemRepository, MergeKey, RepositoryError, StoredItem};

    #[derive(Default, Clone)]
    struct Rows {
        rows: Vec<StoredItem>,
        next_id: i64,
    }

    #[derive(Default)]
    pub(super) struct MemoryRepository {
        state: Mutex<Rows>,
    }

    impl MemoryRepository {
        pub(super) fn quantities(&self) -> Vec<(String, i64)> {
            let state = self.state.lock().unwrap();
            state
                .rows
                .iter()
                .map(|row| (row.name.clone(), row.quantity))
                .collect()
        }
    }

    impl ItemRepository for MemoryRepository {
        fn insert_batch(&self, items: &[Item]) -> Result<(), RepositoryError> {
            let mut state = self.state.lock().unwrap();
            let mut staged = state.clone();
            for item in items {
                let key = MergeKey::of(&item.name, item.price);
                if let Some(row) = staged
                    .rows
                    .iter_mut()
                    .find(|row| MergeKey::of(&row.name, row.price) == key)
                {
                    row.quantity = row
                        .quantity
                        .checked_add(item.quantity)
                        .ok_or(RepositoryError::QuantityOverflow)?;
                    continue;
                }
                staged.next_id += 1;
                let id = staged.next_id;
                staged.rows.push(StoredItem {
                    id,
                    name: item.name.clone(),
                    price: item.price,
                    quantity: item.quantity,
                    created_at: Utc::now(),
                });
            }
            *state = staged;
            Ok(())
        }

        fn list(&self, limit: usize) -> Result<Vec<StoredItem>, RepositoryError> {
            let state = self.state.lock().unwrap();
            Ok(state.rows.iter().rev().take(limit).cloned().collect())
        }

        fn fetch(&self, id: i64) -> Result<Option<StoredItem>, RepositoryError> {
            let state = self.state.lock().unwrap();
            Ok(state.rows.iter().find(|row| row.id == id).cloned())
        }

        fn update(&self, id: i64, item: &Item) -> Result<(StoredItem, bool), RepositoryError> {
            let mut state = self.state.lock().unwrap();
            let source = state
                .rows
                .iter()
                .position(|row| row.id == id)
                .ok_or(RepositoryError::NotFound)?;
            let key = MergeKey::of(&item.name, item.price);
            let target = state
                .rows
                .iter()
                .position(|row| row.id != id && MergeKey::of(&row.name, row.price) == key);

            match target {
                Some(target) => {
                    let quantity = state.rows[target]
                        .quantity
                        .checked_add(item.quantity)
                        .ok_or(RepositoryError::QuantityOverflow)?;
                    state.rows[target].quantity = quantity;
                    let merged = state.rows[target].clone();
                    state.rows.remove(source);
                    Ok((merged, true))
                }
                None => {
                    let row = &mut state.rows[source];
                    row.name = item.name.clone();
                    row.price = item.price;
                    row.quantity = item.quantity;
                    Ok((row.clone(), false))
                }
            }
        }

        fn delete(&self, id: i64) -> Result<(), RepositoryError> {
            let mut state = self.state.lock().unwrap();
            let before = state.rows.len();
            state.rows.retain(|row| row.id != id);
            if state.rows.len() == before {
                return Err(RepositoryError::NotFound);
            }
            Ok(())
        }

        fn delete_all(&self) -> Result<(), RepositoryError> {
            self.state.lock().unwrap().rows.clear();
            Ok(())
        }

        fn all(&self) -> Result<Vec<StoredItem>, RepositoryError> {
            Ok(self.state.lock().unwrap().rows.clone())
        }
    }
}

mod service {
    use std::sync::Arc;

    use cost_ledger::items::{
        Item, ItemLedgerService, ItemRejection, ItemRepository, ItemServiceError,
        RepositoryError,
    };

    use super::common::MemoryRepository;

    fn build_service() -> (ItemLedgerService<MemoryRepository>, Arc<MemoryRepository>) {
        let repository = Arc::new(MemoryRepository::default());
        (ItemLedgerService::new(repository.clone()), repository)
    }

    #[test]
    fn bulk_save_reports_batch_and_cumulative_stats() {
        let (service, _) = build_service();
        let first = service
            .bulk_save(vec![Item::new("Pen", 10.0, 2), Item::new("Book", 25.5, 1)])
            .expect("first batch stored");
        assert_eq!(first.batch.total_cost, 45.5);
        assert_eq!(first.global, first.batch);

        let second = service
            .bulk_save(vec![Item::new("Lamp", 40.0, 1)])
            .expect("second batch stored");
        assert_eq!(second.batch.line_item_count, 1);
        assert_eq!(second.batch.total_cost, 40.0);
        assert_eq!(second.global.line_item_count, 3);
        assert_eq!(second.global.total_quantity, 4);
        assert_eq!(second.global.total_cost, 85.5);
        assert_eq!(second.message, "saved");
    }

    #[test]
    fn same_name_and_price_merge_into_one_row() {
        let (service, repository) = build_service();
        service
            .bulk_save(vec![Item::new("Pen", 10.0, 2)])
            .expect("stored");
        let outcome = service
            .bulk_save(vec![Item::new("  pen ", 10.0, 3), Item::new("Pen", 12.0, 1)])
            .expect("stored");

        assert_eq!(
            repository.quantities(),
            vec![("Pen".to_string(), 5), ("Pen".to_string(), 1)]
        );
        assert_eq!(outcome.global.line_item_count, 2);
        assert_eq!(outcome.global.total_quantity, 6);
    }

    #[test]
    fn one_bad_item_rejects_the_whole_batch() {
        let (service, repository) = build_service();
        let err = service
            .bulk_save(vec![Item::new("Pen", 10.0, 2), Item::new("   ", 1.0, 1)])
            .expect_err("blank name rejected");
        match err {
            ItemServiceError::Rejected { index, reason } => {
                assert_eq!(index, 1);
                assert_eq!(reason, ItemRejection::EmptyName);
            }
            other => panic!("expected rejection, got {other:?}"),
        }
        assert!(repository.all().expect("rows").is_empty());

        assert!(matches!(
            service.bulk_save(Vec::new()),
            Err(ItemServiceError::EmptyBatch)
        ));
    }

    #[test]
    fn oversized_merge_is_refused_and_the_ledger_keeps_working() {
        let (service, repository) = build_service();
        let err = service
            .bulk_save(vec![
                Item::new("Pen", 1.0, i64::MAX),
                Item::new("pen", 1.0, 1),
            ])
            .expect_err("merged quantity overflows");
        assert!(matches!(
            err,
            ItemServiceError::Repository(RepositoryError::QuantityOverflow)
        ));
        assert!(repository.all().expect("rows").is_empty());

        let outcome = service
            .bulk_save(vec![Item::new("Book", 2.0, 1)])
            .expect("next batch stored");
        assert_eq!(outcome.global.line_item_count, 1);
    }

    #[test]
    fn huge_quantities_still_produce_stats() {
        let (service, _) = build_service();
        let outcome = service
            .bulk_save(vec![
                Item::new("a", 0.0, i64::MAX),
                Item::new("b", 0.0, i64::MAX),
                Item::new("c", 0.0, i64::MAX),
            ])
            .expect("stored");
        assert_eq!(outcome.batch.total_quantity, u64::MAX);

        let global = service.global_stats().expect("stats");
        assert_eq!(global.line_item_count, 3);
        assert_eq!(global.total_quantity, u64::MAX);
        service
            .bulk_save(vec![Item::new("d", 1.0, 1)])
            .expect("later batches still stored");
    }

    #[test]
    fn prices_are_stored_rounded_to_cents() {
        let (service, repository) = build_service();
        service
            .bulk_save(vec![Item::new("Tape", 1.005_01, 1)])
            .expect("stored");
        assert_eq!(repository.all().expect("rows")[0].price, 1.01);
    }

    #[test]
    fn preview_counts_only_valid_items_and_stores_nothing() {
        let (service, repository) = build_service();
        let stats = service.preview(vec![
            Item::new("Pen", 10.0, 2),
            Item::new("Broken", -3.0, 1),
        ]);
        assert_eq!(stats.line_item_count, 1);
        assert_eq!(stats.total_cost, 20.0);
        assert!(repository.all().expect("rows").is_empty());
    }

    #[test]
    fn update_merges_into_an_existing_row() {
        let (service, _) = build_service();
        service
            .bulk_save(vec![Item::new("Pen", 10.0, 2), Item::new("Pencil", 2.0, 5)])
            .expect("stored");
        let pencil = service
            .list(None)
            .expect("list")
            .into_iter()
            .find(|row| row.name == "Pencil")
            .expect("pencil stored");

        let (row, merged) = service
            .update(pencil.id, Item::new("PEN", 10.0, 1))
            .expect("update succeeds");
        assert!(merged);
        assert_eq!(row.name, "Pen");
        assert_eq!(row.quantity, 3);
        assert_eq!(service.list(None).expect("list").len(), 1);

        let (row, merged) = service
            .update(row.id, Item::new("Pen", 11.0, 4))
            .expect("plain update");
        assert!(!merged);
        assert_eq!(row.price, 11.0);
    }

    #[test]
    fn update_and_delete_report_missing_rows() {
        let (service, _) = build_service();
        assert!(matches!(
            service.fetch(99),
            Err(ItemServiceError::Repository(RepositoryError::NotFound))
        ));
        assert!(matches!(
            service.update(99, Item::new("Pen", 1.0, 1)),
            Err(ItemServiceError::Repository(RepositoryError::NotFound))
        ));
        assert!(matches!(
            service.update(99, Item::new("Pen", 1.0, 0)),
            Err(ItemServiceError::Invalid(ItemRejection::InvalidQuantity))
        ));
        assert!(matches!(
            service.delete(99),
            Err(ItemServiceError::Repository(RepositoryError::NotFound))
        ));
    }

    #[test]
    fn list_is_newest_first_and_clamped() {
        let (service, _) = build_service();
        service
            .bulk_save(vec![
                Item::new("a", 1.0, 1),
                Item::new("b", 1.0, 1),
                Item::new("c", 1.0, 1),
            ])
            .expect("stored");
        let names: Vec<String> = service
            .list(Some(2))
            .expect("list")
            .into_iter()
            .map(|row| row.name)
            .collect();
        assert_eq!(names, vec!["c".to_string(), "b".to_string()]);
        assert_eq!(service.list(Some(0)).expect("list").len(), 1);

        service.delete_all().expect("cleared");
        assert_eq!(service.global_stats().expect("stats").line_item_count, 0);
    }
}

mod http {
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use cost_ledger::items::{items_router, Item, ItemLedgerService};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::common::MemoryRepository;

    const ORIGIN: &str = "http://localhost:5173";

    fn router() -> axum::Router {
        let repository = Arc::new(MemoryRepository::default());
        items_router(Arc::new(ItemLedgerService::new(repository)), ORIGIN)
    }

    fn post_json(uri: &str, payload: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(payload.to_string()))
            .expect("request")
    }

    async fn read_json(response: axum::response::Response) -> Value {
        let body = to_bytes(response.into_body(), 1024 * 1024)
            .await
            .expect("body");
        serde_json::from_slice(&body).expect("json")
    }

    #[tokio::test]
    async fn bulk_endpoint_returns_top_level_stats() {
        let response = router()
            .oneshot(post_json(
                "/api/items/bulk",
                json!({ "items": [
                    { "name": "Pen", "price": 10, "quantity": 2 },
                    { "name": "Book", "price": 25.5, "quantity": 1 },
                ]}),
            ))
            .await
            .expect("router dispatch");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response
                .headers()
                .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .and_then(|value| value.to_str().ok()),
            Some(ORIGIN)
        );

        let payload = read_json(response).await;
        assert_eq!(payload["message"], json!("saved"));
        assert_eq!(payload["batch"]["totalQuantity"], json!(3));
        assert_eq!(payload["batch"]["avgUnitPrice"], json!(15.17));
        assert_eq!(payload["global"]["avgLineCost"], json!(22.75));
    }

    #[tokio::test]
    async fn invalid_items_are_a_bad_request() {
        let response = router()
            .oneshot(post_json(
                "/api/items/bulk",
                json!({ "items": [{ "name": "Pen", "price": -1, "quantity": 1 }] }),
            ))
            .await
            .expect("router dispatch");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let payload = read_json(response).await;
        assert_eq!(
            payload["error"],
            json!("item 0: price must be valid and >= 0")
        );
    }

    #[tokio::test]
    async fn preflight_is_answered_without_routing() {
        let response = router()
            .oneshot(
                Request::builder()
                    .method("OPTIONS")
                    .uri("/api/items/bulk")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("router dispatch");

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_METHODS)
            .is_some());
    }

    #[tokio::test]
    async fn preflight_on_any_path_gets_no_content() {
        let response = router()
            .oneshot(
                Request::builder()
                    .method("OPTIONS")
                    .uri("/")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("router dispatch");

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(
            response
                .headers()
                .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .and_then(|value| value.to_str().ok()),
            Some(ORIGIN)
        );

        let response = router()
            .oneshot(
                Request::builder()
                    .uri("/api/unknown")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("router dispatch");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .is_some());
    }

    #[tokio::test]
    async fn oversized_quantities_are_a_bad_request_not_a_crash() {
        let app = router();
        let response = app
            .clone()
            .oneshot(post_json(
                "/api/items/bulk",
                json!({ "items": [
                    { "name": "Pen", "price": 1, "quantity": i64::MAX },
                    { "name": "pen", "price": 1, "quantity": 1 },
                ]}),
            ))
            .await
            .expect("router dispatch");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            read_json(response).await["error"],
            json!("merged quantity is too large")
        );

        let response = app
            .oneshot(post_json(
                "/api/items/bulk",
                json!({ "items": [{ "name": "Book", "price": 2, "quantity": 1 }] }),
            ))
            .await
            .expect("router dispatch");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(read_json(response).await["global"]["lineItemCount"], json!(1));
    }

    #[tokio::test]
    async fn list_update_and_delete_round() {
        let app = router();
        app.clone()
            .oneshot(post_json(
                "/api/items/bulk",
                json!({ "items": [{ "name": "Pen", "price": 10, "quantity": 2 }] }),
            ))
            .await
            .expect("router dispatch");

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/api/items?limit=5")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("router dispatch");
        assert_eq!(response.status(), StatusCode::OK);
        let rows = read_json(response).await;
        let id = rows[0]["id"].as_i64().expect("id");
        assert!(rows[0]["createdAt"].is_string());

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri(format!("/api/items/{id}"))
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("router dispatch");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(read_json(response).await["name"], json!("Pen"));

        let update = serde_json::to_value(Item::new("Pen", 9.5, 4)).expect("item json");
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("PUT")
                    .uri(format!("/api/items/{id}"))
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(update.to_string()))
                    .expect("request"),
            )
            .await
            .expect("router dispatch");
        assert_eq!(response.status(), StatusCode::OK);
        let payload = read_json(response).await;
        assert_eq!(payload["merged"], json!(false));
        assert_eq!(payload["item"]["quantity"], json!(4));

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/api/stats")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("router dispatch");
        assert_eq!(read_json(response).await["totalCost"], json!(38.0));

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri(format!("/api/items/{id}"))
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("router dispatch");
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri(format!("/api/items/{id}"))
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("router dispatch");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = app
            .oneshot(
                Request::builder()
                    .uri(format!("/api/items/{id}"))
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("router dispatch");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}

mod live {
    use std::sync::Arc;

    use cost_ledger::items::{
        items_router, DraftItem, DraftSession, ItemLedgerService, ItemsClient,
    };

    use super::common::MemoryRepository;

    #[tokio::test]
    async fn draft_submits_through_the_client_to_a_running_ledger() {
        let repository = Arc::new(MemoryRepository::default());
        let app = items_router(
            Arc::new(ItemLedgerService::new(repository)),
            "http://localhost:5173",
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind ephemeral port");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("server runs");
        });

        let client = ItemsClient::new(&format!("http://{addr}")).expect("client builds");
        let mut session = DraftSession::with_rows(vec![
            DraftItem::new(" Pen ", "10", 2_i64),
            DraftItem::new("Book", 25.5, 1_i64),
            DraftItem::new("", 3.0, 1_i64),
        ]);

        let outcome = session.submit(&client).await.expect("submit succeeds");
        assert_eq!(outcome.batch.total_quantity, 3);
        assert_eq!(outcome.batch.total_cost, 45.5);
        assert_eq!(session.global(), Some(&outcome.global));

        let rows = client.list_items(10).await.expect("listing succeeds");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].name, "Book");
    }
}
