//! Router tests driving the HTTP surface in-process.

use crate::sim::{test_address, ChainSim};
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use sia_api::{ApiError, AppState, Syncer, TransactionPool};
use sia_explorer::{Explorer, FileHashStore, IndexStore};
use sia_types::{Currency, SiacoinOutput, Transaction};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

struct StubSyncer;

impl Syncer for StubSyncer {
    fn peers(&self) -> Vec<String> {
        vec!["1.2.3.4:9981".to_string()]
    }

    fn connect(&self, _addr: &str) -> Result<(), ApiError> {
        Ok(())
    }

    fn broadcast_transaction(&self, _txn: &Transaction, _depends_on: &[Transaction]) {}
}

struct StubTxPool;

impl TransactionPool for StubTxPool {
    fn transactions(&self) -> Vec<Transaction> {
        Vec::new()
    }

    fn add_transaction(&self, _txn: Transaction) -> Result<(), ApiError> {
        Err(ApiError::Unavailable("pool rejected transaction".into()))
    }
}

struct TestApi {
    router: Router,
    sim: ChainSim,
    _hash_dir: TempDir,
}

fn test_api(password: Option<&str>) -> TestApi {
    let mut sim = ChainSim::new();
    let hash_dir = TempDir::new().unwrap();
    let explorer = Explorer::new(
        sim.genesis_update().state.clone(),
        Box::new(IndexStore::in_memory()),
        Box::new(FileHashStore::open(hash_dir.path()).unwrap()),
    );
    explorer.apply(&sim.genesis_update(), true).unwrap();

    // one funded address for the queries below
    let cau = sim.mine_block_with_siacoin_outputs(vec![SiacoinOutput {
        value: Currency::siacoins(100),
        address: test_address(1),
    }]);
    explorer.apply(&cau, true).unwrap();

    let mut state = AppState::new(Arc::new(explorer), Arc::new(StubSyncer), Arc::new(StubTxPool));
    if let Some(password) = password {
        state = state.with_password(password);
    }
    TestApi {
        router: sia_api::create_router(state),
        sim,
        _hash_dir: hash_dir,
    }
}

async fn get(router: &Router, uri: &str) -> (StatusCode, Vec<u8>) {
    let response = router
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, body.to_vec())
}

async fn get_json(router: &Router, uri: &str) -> serde_json::Value {
    let (status, body) = get(router, uri).await;
    assert_eq!(status, StatusCode::OK, "{uri}");
    serde_json::from_slice(&body).unwrap()
}

async fn post_json(router: &Router, uri: &str, body: serde_json::Value) -> (StatusCode, Vec<u8>) {
    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&body).unwrap()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, body.to_vec())
}

#[tokio::test]
async fn basic_auth_guards_every_route() {
    let api = test_api(Some("secret"));

    let (status, _) = get(&api.router, "/chain/tip").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // wrong password
    let bad = Request::builder()
        .uri("/chain/tip")
        .header(header::AUTHORIZATION, "Basic bm90Ondyb25n")
        .body(Body::empty())
        .unwrap();
    let response = api.router.clone().oneshot(bad).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // correct password, any username ("x:secret")
    let good = Request::builder()
        .uri("/chain/tip")
        .header(header::AUTHORIZATION, "Basic eDpzZWNyZXQ=")
        .body(Body::empty())
        .unwrap();
    let response = api.router.clone().oneshot(good).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn chain_tip_serves_cached_stats() {
    let api = test_api(None);
    let stats = get_json(&api.router, "/chain/tip").await;
    assert_eq!(stats["active_contract_count"], 10);
    assert_eq!(
        stats["active_contract_cost"],
        Currency::siacoins(825).to_string()
    );

    // the same row is addressable by its chain index
    let index = api.sim.tip_state().index.to_string();
    let by_index = get_json(&api.router, &format!("/chain/{index}")).await;
    assert_eq!(by_index, stats);

    let state = get_json(&api.router, &format!("/chain/{index}/state")).await;
    assert_eq!(state["index"]["height"], 1);
}

#[tokio::test]
async fn element_lookup_and_search() {
    let api = test_api(None);
    let address = test_address(1);

    let ids = get_json(&api.router, &format!("/address/{address}/siacoins")).await;
    let id = ids[0].as_str().unwrap().to_string();

    let elem = get_json(&api.router, &format!("/element/siacoin/{id}")).await;
    assert_eq!(elem["siacoin_output"]["address"], address.to_string());

    let search = get_json(&api.router, &format!("/element/search/{id}")).await;
    assert_eq!(search["type"], "siacoin");
    assert!(search.get("siacoin_element").is_some());

    // a contract id search tags "contract"
    let contract_id = api.sim.genesis_update().new_file_contracts[0].id();
    let search = get_json(&api.router, &format!("/element/search/{contract_id}")).await;
    assert_eq!(search["type"], "contract");

    // unknown ids and malformed ids are both 400
    let (status, _) = get(
        &api.router,
        "/element/siacoin/0000000000000000000000000000000000000000000000000000000000000000:0",
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = get(&api.router, "/element/siacoin/garbage").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn address_queries() {
    let api = test_api(None);
    let address = test_address(1);

    let balance = get_json(&api.router, &format!("/address/{address}/balance")).await;
    assert_eq!(balance["siacoins"], Currency::siacoins(100).to_string());
    assert_eq!(balance["siafunds"], 0);

    // path addresses may arrive JSON-encoded
    let quoted = get_json(&api.router, &format!("/address/%22{address}%22/balance")).await;
    assert_eq!(quoted, balance);

    let txns = get_json(
        &api.router,
        &format!("/address/{address}/transactions?amount=10&offset=0"),
    )
    .await;
    assert_eq!(txns.as_array().unwrap().len(), 1);

    // missing pagination parameters are a client error
    let (status, _) = get(&api.router, &format!("/address/{address}/transactions")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn batch_queries() {
    let api = test_api(None);
    let funded = test_address(1);
    let empty = test_address(2);

    let (status, body) = post_json(
        &api.router,
        "/batch/addresses/balance",
        serde_json::json!([funded.to_string(), empty.to_string()]),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let balances: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(balances[0]["siacoins"], Currency::siacoins(100).to_string());
    assert_eq!(balances[1]["siacoins"], "0");

    let (status, body) = post_json(
        &api.router,
        "/batch/addresses/siacoins",
        serde_json::json!([funded.to_string()]),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let elems: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(elems[0].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn external_collaborators() {
    let api = test_api(None);

    let peers = get_json(&api.router, "/syncer/peers").await;
    assert_eq!(peers[0]["net_address"], "1.2.3.4:9981");

    let pool = get_json(&api.router, "/txpool/transactions").await;
    assert!(pool.as_array().unwrap().is_empty());

    // the stub pool rejects everything; the error surfaces as 400
    let (status, body) = post_json(
        &api.router,
        "/txpool/broadcast",
        serde_json::json!({ "transaction": Transaction::default() }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(String::from_utf8(body).unwrap().contains("rejected"));
}
