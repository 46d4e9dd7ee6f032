#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use neural_core::Error;
use neural_inference::{
    InferenceClient, InferenceService, MockInferenceClient, ModelOutput, ModelTensor,
    RetryingClient,
};
use neural_query::{
    BoolQuery, EmbeddingQuery, KnnQuery, QueryNode, Rewrite, RewriteConfig, RewriteContext,
    RewriteDriver, RewriteState,
};
use proptest::prelude::*;
use serde_json::json;

fn driver_for(client: &MockInferenceClient) -> RewriteDriver {
    RewriteDriver::new(InferenceService::new(Arc::new(client.clone())))
}

fn red_shoes() -> QueryNode {
    QueryNode::from_json(&json!({
        "neural": {
            "doc": "red shoes",
            "model_id": "m1",
            "knn_vector_field": "embedding",
            "k": 5
        }
    }))
    .unwrap()
}

#[tokio::test]
async fn red_shoes_resolves_to_knn() {
    let client = MockInferenceClient::new().with_embedding("red shoes", vec![0.1, 0.2, 0.3]);

    let result = driver_for(&client).rewrite(red_shoes()).await.unwrap();

    assert_eq!(
        result,
        QueryNode::Knn(KnnQuery::new("embedding", vec![0.1, 0.2, 0.3], 5))
    );
    let calls = client.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].model_id, "m1");
    assert_eq!(calls[0].request.text_docs, vec!["red shoes".to_string()]);
    assert_eq!(
        calls[0].request.filter.target_response,
        Some(vec!["sentence_embedding".to_string()])
    );
}

#[test]
fn missing_model_id_fails_before_any_pass() {
    let err = QueryNode::from_json(&json!({
        "neural": {"doc": "red shoes", "knn_vector_field": "embedding", "k": 5}
    }))
    .unwrap_err();

    assert!(matches!(
        err,
        Error::MissingField {
            field: "model_id",
            ..
        }
    ));
    assert_eq!(err.to_string(), "[neural] requires 'model_id' field");
}

#[tokio::test(start_paused = true)]
async fn slow_model_is_called_once() {
    let client = MockInferenceClient::deterministic(8).with_latency(Duration::from_secs(2));

    let result = driver_for(&client).rewrite(red_shoes()).await.unwrap();

    assert!(result.is_fully_resolved());
    assert_eq!(client.call_count(), 1);
}

#[test]
fn unsettled_lineage_stays_pending() {
    let mut ctx = RewriteContext::new();
    let pending = red_shoes().rewrite(&mut ctx).unwrap();
    assert_eq!(ctx.pending_actions(), 1);

    let mut node = pending.clone();
    for _ in 0..5 {
        node = node.rewrite(&mut ctx).unwrap();
        assert_eq!(node, pending);
    }
    assert_eq!(ctx.pending_actions(), 1);

    match node {
        QueryNode::Embedding(q) => assert_eq!(q.state(), RewriteState::Pending),
        other => panic!("expected pending embedding, got {other:?}"),
    }
}

#[tokio::test]
async fn missing_embedding_tensor_is_no_vector() {
    let client = MockInferenceClient::new().with_output(
        "red shoes",
        ModelOutput::single(vec![ModelTensor::new("token_embeddings", vec![1.0, 2.0])]),
    );
    let service = InferenceService::new(Arc::new(client));

    let mut ctx = RewriteContext::new();
    let pending = red_shoes().rewrite(&mut ctx).unwrap();
    let err = ctx.execute_async_actions(&service).await.unwrap_err();

    assert!(matches!(err, Error::NoVectorProduced { .. }));
    match pending {
        QueryNode::Embedding(q) => {
            assert_eq!(q.state(), RewriteState::Pending);
            assert!(q.vector().is_none());
        }
        other => panic!("expected pending embedding, got {other:?}"),
    }
}

#[tokio::test]
async fn non_finite_embedding_is_no_vector() {
    let client = MockInferenceClient::new().with_output(
        "red shoes",
        ModelOutput::single(vec![ModelTensor::new(
            "sentence_embedding",
            vec![0.1, f64::NAN],
        )]),
    );

    let err = driver_for(&client).rewrite(red_shoes()).await.unwrap_err();

    assert!(matches!(err, Error::NoVectorProduced { .. }));
    assert!(err.to_string().contains("non-finite"));
    assert_eq!(client.call_count(), 1);
}

#[tokio::test]
async fn nan_vector_from_the_wire_settles() {
    let query: QueryNode = KnnQuery::new("embedding", vec![f32::NAN, 1.0], 3).into();
    let decoded = QueryNode::from_bytes(&query.to_bytes().unwrap()).unwrap();

    let client = MockInferenceClient::new();
    let result = driver_for(&client).rewrite(decoded).await.unwrap();

    assert_eq!(result, query);
    assert_eq!(client.call_count(), 0);
}

#[tokio::test]
async fn driver_surfaces_inference_failure() {
    let client = MockInferenceClient::new().with_failure("model m1 is not deployed");

    let err = driver_for(&client).rewrite(red_shoes()).await.unwrap_err();

    assert!(err.is_inference_failure());
    assert!(err.to_string().contains("model m1 is not deployed"));
}

#[tokio::test]
async fn pending_node_crosses_the_wire_unresolved() {
    let client = MockInferenceClient::new().with_embedding("red shoes", vec![0.5, 0.5]);

    let mut ctx = RewriteContext::new();
    let pending = red_shoes().rewrite(&mut ctx).unwrap();
    let decoded = QueryNode::from_bytes(&pending.to_bytes().unwrap()).unwrap();

    assert_eq!(decoded, red_shoes());
    match &decoded {
        QueryNode::Embedding(q) => assert_eq!(q.state(), RewriteState::Unresolved),
        other => panic!("expected embedding, got {other:?}"),
    }

    let result = driver_for(&client).rewrite(decoded).await.unwrap();
    assert_eq!(
        result,
        QueryNode::Knn(KnnQuery::new("embedding", vec![0.5, 0.5], 5))
    );
}

#[tokio::test]
async fn bool_tree_resolves_every_clause() {
    let client = MockInferenceClient::new()
        .with_embedding("red shoes", vec![1.0, 0.0])
        .with_embedding("blue hat", vec![0.0, 1.0]);
    let query = QueryNode::from_json(&json!({
        "bool": {
            "must": {"neural": {"doc": "red shoes", "model_id": "m1", "knn_vector_field": "a"}},
            "should": [
                {"neural": {"doc": "blue hat", "model_id": "m1", "knn_vector_field": "b", "k": 2}},
                {"knn": {"c": {"vector": [0.3], "k": 1}}}
            ]
        }
    }))
    .unwrap();

    let result = driver_for(&client).rewrite(query).await.unwrap();

    let expected: QueryNode = BoolQuery::new()
        .must(KnnQuery::new("a", vec![1.0, 0.0], 10))
        .should(KnnQuery::new("b", vec![0.0, 1.0], 2))
        .should(KnnQuery::new("c", vec![0.3], 1))
        .into();
    assert_eq!(result, expected);
    assert_eq!(client.call_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn retrying_client_recovers_from_transient_failures() {
    let mock = MockInferenceClient::deterministic(4).with_transient_failures(2);
    let client: Arc<dyn InferenceClient> = Arc::new(
        RetryingClient::new(Arc::new(mock.clone()))
            .with_max_attempts(3)
            .with_initial_delay(Duration::from_millis(10)),
    );

    let driver = RewriteDriver::from_config(client, RewriteConfig::default()).unwrap();
    let result = driver.rewrite(red_shoes()).await.unwrap();

    assert!(result.is_fully_resolved());
    assert_eq!(mock.call_count(), 3);
}

#[tokio::test]
async fn positional_extraction_from_config() {
    let mock = MockInferenceClient::new().with_output(
        "red shoes",
        ModelOutput::single(vec![
            ModelTensor::unnamed(vec![9.0]),
            ModelTensor::unnamed(vec![0.25, 0.75]),
        ]),
    );
    let config = RewriteConfig {
        tensor_position: Some(1),
        ..Default::default()
    };

    let driver = RewriteDriver::from_config(Arc::new(mock.clone()), config).unwrap();
    let result = driver.rewrite(red_shoes()).await.unwrap();

    assert_eq!(
        result,
        QueryNode::Knn(KnnQuery::new("embedding", vec![0.25, 0.75], 5))
    );
    assert!(mock.calls()[0].request.filter.target_response_positions.is_none());
}

#[tokio::test]
async fn presupplied_vector_skips_inference() {
    let client = MockInferenceClient::new();
    let query = EmbeddingQuery::new("red shoes", "m1", "embedding").with_vector(vec![0.9]);

    let result = driver_for(&client).rewrite(query.into()).await.unwrap();

    assert_eq!(
        result,
        QueryNode::Knn(KnnQuery::new("embedding", vec![0.9], 10))
    );
    assert_eq!(client.call_count(), 0);
}

#[test]
fn oversized_doc_is_refused_at_encode() {
    let limit = neural_query::wire::MAX_ITEM_LEN as usize;

    let fits: QueryNode = EmbeddingQuery::new("d".repeat(limit), "m1", "embedding").into();
    let decoded = QueryNode::from_bytes(&fits.to_bytes().unwrap()).unwrap();
    assert_eq!(decoded, fits);

    let too_big: QueryNode = EmbeddingQuery::new("d".repeat(limit + 1), "m1", "embedding").into();
    let err = too_big.to_bytes().unwrap_err();
    assert!(matches!(err, Error::Wire(_)));
}

proptest! {
    #[test]
    fn embedding_query_wire_roundtrip(
        doc in ".*",
        model_id in "[a-zA-Z0-9_-]{1,32}",
        field in "[a-z_]{1,16}",
        k in 1u32..=u32::MAX,
    ) {
        let query: QueryNode = EmbeddingQuery::new(doc, model_id, field)
            .with_k(i64::from(k))
            .unwrap()
            .into();
        let decoded = QueryNode::from_bytes(&query.to_bytes().unwrap()).unwrap();
        prop_assert_eq!(decoded, query);
    }
}
