//! End-to-end coding pipeline tests against mock transform/algorithm
//! services on ephemeral ports.

use axum::{routing::post, Router};
use serde_json::json;
use vax_cc::config::{AlgorithmSettings, CodingConfig};
use vax_cc::db;
use vax_cc::error::{CodingError, ServiceHop};
use vax_cc::models::BatchState;
use vax_cc::services::coding_pipeline::run_coding_algorithms;

fn test_settings() -> AlgorithmSettings {
    AlgorithmSettings {
        hiv: "h".to_string(),
        malaria: "l".to_string(),
        groupcode: "True".to_string(),
        api: "True".to_string(),
    }
}

/// Serve a router on an ephemeral port, returning its base URL
async fn spawn_mock(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

/// Transform mock: echoes back three rows in the algorithm input schema
fn transform_router() -> Router {
    Router::new().route(
        "/transform",
        post(|body: String| async move {
            // The request must be the prefixed-column CSV with the index column
            assert!(body.starts_with(','), "expected blank-named index column");
            assert!(body.contains("-Id10023"), "expected prefixed field names");
            ",-symptom1\n0,1.0\n1,0.0\n2,1.0\n".to_string()
        }),
    )
}

/// Algorithm mock: returns results in permuted order plus one error issue
fn algorithm_router() -> Router {
    Router::new().route(
        "/interva5",
        post(|body: String| async move {
            let payload: serde_json::Value = serde_json::from_str(&body).unwrap();
            assert_eq!(payload["HIV"], "h");
            assert_eq!(payload["Input"].as_array().unwrap().len(), 3);
            // The transform output's binary sentinels must arrive remapped
            assert_eq!(payload["Input"][0]["-symptom1"], "y");
            assert_eq!(payload["Input"][1]["-symptom1"], ".");

            json!({
                "results": {"VA5": [
                    {"ID": ["2"], "CAUSE1": ["Stroke"], "LIK1": ["61"], "INDET": [0]},
                    {"ID": ["0"], "CAUSE1": [""], "LIK1": [""], "INDET": [100]},
                    {"ID": ["1"], "CAUSE1": ["Sepsis"], "LIK1": ["48"], "INDET": [0]},
                ]},
                "errors": ["0  field Id10024: duplicate date of death"],
                "warnings": [],
            })
            .to_string()
        }),
    )
}

async fn insert_va(pool: &sqlx::SqlitePool, date: &str) -> i64 {
    let fields = json!({"Id10023": date, "ageInYears": "60"});
    db::verbal_autopsies::create(pool, fields.as_object().unwrap(), "worker1", "adult", None)
        .await
        .unwrap()
}

#[tokio::test]
async fn successful_batch_persists_causes_and_issues_transactionally() {
    let pool = db::init_memory_pool().await.unwrap();
    let va1 = insert_va(&pool, "2021-01-01").await;
    let va2 = insert_va(&pool, "2021-02-02").await;
    let va3 = insert_va(&pool, "2021-03-03").await;

    let config = CodingConfig {
        pycross_host: spawn_mock(transform_router()).await,
        interva_host: spawn_mock(algorithm_router()).await,
        settings: test_settings(),
    };

    let outcome = run_coding_algorithms(&pool, &config).await.unwrap();

    assert_eq!(outcome.verbal_autopsies.len(), 3);
    assert_eq!(outcome.causes.len(), 3);
    assert_eq!(outcome.issues.len(), 1);

    // Permuted response identifiers still land on their own records
    let causes1 = db::causes::load_for_va(&pool, va1).await.unwrap();
    assert_eq!(causes1.len(), 1);
    assert_eq!(causes1[0].cause, "Indeterminate");

    let causes2 = db::causes::load_for_va(&pool, va2).await.unwrap();
    assert_eq!(causes2[0].cause, "Sepsis");

    let causes3 = db::causes::load_for_va(&pool, va3).await.unwrap();
    assert_eq!(causes3[0].cause, "Stroke");
    assert_eq!(causes3[0].algorithm, "InterVA5");
    assert!(causes3[0].settings.contains("\"HIV\":\"h\""));

    let issues1 = db::issues::load_for_va(&pool, va1).await.unwrap();
    assert_eq!(issues1.len(), 1);
    assert_eq!(issues1[0].text, "field Id10024: duplicate date of death");
    assert_eq!(issues1[0].algorithm, "InterVA5");

    let batch = db::batches::load(&pool, outcome.batch_id).await.unwrap().unwrap();
    assert_eq!(batch.state, BatchState::Finished);
}

#[tokio::test]
async fn coded_records_are_excluded_from_the_next_batch() {
    let pool = db::init_memory_pool().await.unwrap();
    insert_va(&pool, "2021-01-01").await;
    insert_va(&pool, "2021-02-02").await;
    insert_va(&pool, "2021-03-03").await;

    let config = CodingConfig {
        pycross_host: spawn_mock(transform_router()).await,
        interva_host: spawn_mock(algorithm_router()).await,
        settings: test_settings(),
    };

    let first = run_coding_algorithms(&pool, &config).await.unwrap();
    assert_eq!(first.causes.len(), 3);

    // Every record now has a cause; the selection predicate finds nothing
    let second = run_coding_algorithms(&pool, &config).await.unwrap();
    assert!(second.verbal_autopsies.is_empty());
    assert!(second.causes.is_empty());

    let batch = db::batches::load(&pool, second.batch_id).await.unwrap().unwrap();
    assert_eq!(batch.state, BatchState::Finished);
}

#[tokio::test]
async fn algorithm_hop_failure_leaves_batch_failed_with_zero_rows() {
    let pool = db::init_memory_pool().await.unwrap();
    for date in ["2021-01-01", "2021-02-02", "2021-03-03"] {
        insert_va(&pool, date).await;
    }

    let config = CodingConfig {
        pycross_host: spawn_mock(transform_router()).await,
        // Nothing listens here; the second hop fails
        interva_host: "http://127.0.0.1:1".to_string(),
        settings: test_settings(),
    };

    let err = run_coding_algorithms(&pool, &config).await.unwrap_err();
    match err {
        CodingError::Service { hop, .. } => assert_eq!(hop, ServiceHop::Algorithm),
        other => panic!("expected algorithm hop failure, got {other:?}"),
    }

    assert_eq!(db::causes::count(&pool).await.unwrap(), 0);
    assert_eq!(db::issues::count(&pool).await.unwrap(), 0);

    // The failed batch is recorded as failed, never finished
    let batch = db::batches::load(&pool, 1).await.unwrap().unwrap();
    assert_eq!(batch.state, BatchState::Failed);
}

#[tokio::test]
async fn transform_hop_failure_is_tagged_as_the_transform_hop() {
    let pool = db::init_memory_pool().await.unwrap();
    insert_va(&pool, "2021-01-01").await;

    let config = CodingConfig {
        pycross_host: "http://127.0.0.1:1".to_string(),
        interva_host: "http://127.0.0.1:1".to_string(),
        settings: test_settings(),
    };

    let err = run_coding_algorithms(&pool, &config).await.unwrap_err();
    assert!(matches!(
        err,
        CodingError::Service { hop: ServiceHop::Transform, .. }
    ));

    assert_eq!(db::causes::count(&pool).await.unwrap(), 0);
}

#[tokio::test]
async fn desynchronized_response_fails_the_batch_with_no_writes() {
    let pool = db::init_memory_pool().await.unwrap();
    insert_va(&pool, "2021-01-01").await;

    // Algorithm answers with an identifier for a record we never sent
    let algorithm = Router::new().route(
        "/interva5",
        post(|| async {
            json!({
                "results": {"VA5": [
                    {"ID": ["41"], "CAUSE1": ["Stroke"], "LIK1": ["61"], "INDET": [0]},
                ]},
                "errors": [],
                "warnings": [],
            })
            .to_string()
        }),
    );
    let transform = Router::new().route(
        "/transform",
        post(|| async { ",-symptom1\n0,1.0\n".to_string() }),
    );

    let config = CodingConfig {
        pycross_host: spawn_mock(transform).await,
        interva_host: spawn_mock(algorithm).await,
        settings: test_settings(),
    };

    let err = run_coding_algorithms(&pool, &config).await.unwrap_err();
    assert!(matches!(err, CodingError::Correlation { .. }));

    assert_eq!(db::causes::count(&pool).await.unwrap(), 0);
    let batch = db::batches::load(&pool, 1).await.unwrap().unwrap();
    assert_eq!(batch.state, BatchState::Failed);
}
