//! Integration tests: drive `SignerProvider` against a recording transport.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::sync::oneshot;

use crate::pipeline::NonceTag;
use crate::provider::{
    Capabilities, CapabilitiesBuilder, ProviderOptions, SignerProvider, TransactionObject,
};
use crate::rpc::envelope::{JsonRpcError, Request};
use crate::tests::mock::MockTransport;
use crate::utils::errors::{CapabilityError, PipelineStage, ProviderError};

fn signer_ok() -> CapabilitiesBuilder {
    Capabilities::builder().sign_transaction(|_| async { Ok("0xsigned".to_string()) })
}

fn provider_with(transport: &Arc<MockTransport>, caps: CapabilitiesBuilder) -> SignerProvider {
    SignerProvider::new(transport.clone(), ProviderOptions::new(caps.build().unwrap()))
}

/// Signer that records every transaction object it is asked to sign.
fn recording_signer(seen: Arc<Mutex<Vec<TransactionObject>>>) -> CapabilitiesBuilder {
    Capabilities::builder().sign_transaction(move |tx| {
        let seen = seen.clone();
        async move {
            let nonce = tx["nonce"].clone();
            seen.lock().push(tx);
            Ok(format!("0xsigned-{}", nonce.as_str().unwrap_or_default()))
        }
    })
}

#[tokio::test]
async fn test_unknown_method_is_forwarded_verbatim() {
    let transport = Arc::new(MockTransport::new());
    transport.respond("eth_blockNumber", json!("0x10"));
    let provider = provider_with(&transport, signer_ok());

    let req = Request {
        id: Some(json!("req-7")),
        jsonrpc: "2.0".into(),
        method: "eth_blockNumber".into(),
        params: json!({"odd": "shape"}),
    };
    let resp = provider.handle(req.clone()).await.unwrap();

    assert_eq!(transport.requests(), vec![req]);
    assert_eq!(resp.id, json!("req-7"));
    assert_eq!(resp.result, Some(json!("0x10")));
}

#[tokio::test]
async fn test_notification_is_forwarded_without_id() {
    let transport = Arc::new(MockTransport::new());
    transport.respond("eth_subscribe", json!("0xsub"));
    let provider = provider_with(&transport, signer_ok());

    let raw = json!({"jsonrpc": "2.0", "method": "eth_subscribe", "params": ["newHeads"]});
    provider.handle(serde_json::from_value(raw.clone()).unwrap()).await.unwrap();

    let sent = transport.requests();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].id, None);
    assert_eq!(serde_json::to_value(&sent[0]).unwrap(), raw);
}

#[tokio::test]
async fn test_upstream_error_member_is_relayed_unmodified() {
    let transport = Arc::new(MockTransport::new());
    let provider = provider_with(&transport, signer_ok());

    let resp = provider.handle(Request::new(3, "debug_traceCall", vec![])).await.unwrap();
    assert_eq!(resp.error, Some(JsonRpcError::new(-32601, "method not found")));
    assert_eq!(resp.result, None);
}

#[tokio::test]
async fn test_transport_failure_surfaces_as_error() {
    let transport = Arc::new(MockTransport::new());
    transport.break_method("eth_chainId");
    let provider = provider_with(&transport, signer_ok());

    let err = provider.handle(Request::new(1, "eth_chainId", vec![])).await.unwrap_err();
    assert!(matches!(err, ProviderError::Transport(_)));
}

#[tokio::test]
async fn test_accounts_resolved_locally() {
    let transport = Arc::new(MockTransport::new());
    let caps = signer_ok().static_accounts(vec!["0xabc".into(), "0xdef".into()]);
    let provider = provider_with(&transport, caps);

    let resp = provider.handle(Request::new(1, "eth_accounts", vec![])).await.unwrap();
    assert_eq!(resp.result, Some(json!(["0xabc", "0xdef"])));
    assert!(transport.requests().is_empty());
}

#[tokio::test]
async fn test_accounts_forwarded_without_capability() {
    let transport = Arc::new(MockTransport::new());
    transport.respond("eth_accounts", json!(["0x999"]));
    let provider = provider_with(&transport, signer_ok());

    let resp = provider.handle(Request::new(1, "eth_accounts", vec![])).await.unwrap();
    assert_eq!(resp.result, Some(json!(["0x999"])));
    assert_eq!(transport.requests().len(), 1);
}

#[tokio::test]
async fn test_transaction_count_override() {
    let transport = Arc::new(MockTransport::new());
    let seen = Arc::new(Mutex::new(Vec::new()));
    let seen_in = seen.clone();
    let caps = signer_ok().get_transaction_count(move |params| {
        seen_in.lock().push(params);
        async { Ok(json!("0x2a")) }
    });
    let provider = provider_with(&transport, caps);

    let resp = provider
        .handle(Request::new(1, "eth_getTransactionCount", vec![json!("0xabc"), json!("pending")]))
        .await
        .unwrap();

    assert_eq!(
        serde_json::to_value(&resp).unwrap(),
        json!({"id": 1, "jsonrpc": "2.0", "result": "0x2a"})
    );
    assert_eq!(seen.lock().clone(), vec![vec![json!("0xabc"), json!("pending")]]);
    assert!(transport.requests().is_empty());
}

#[tokio::test]
async fn test_gas_price_static_and_dynamic() {
    let transport = Arc::new(MockTransport::new());
    let fixed = provider_with(&transport, signer_ok().static_gas_price("0x4a817c800"));
    let resp = fixed.handle(Request::new(1, "eth_gasPrice", vec![])).await.unwrap();
    assert_eq!(resp.result, Some(json!("0x4a817c800")));

    let dynamic =
        provider_with(&transport, signer_ok().gas_price(|| async { Ok(json!("0x3b9aca00")) }));
    let resp = dynamic.handle(Request::new(2, "eth_gasPrice", vec![])).await.unwrap();
    assert_eq!(resp.result, Some(json!("0x3b9aca00")));

    assert!(transport.requests().is_empty());
}

#[tokio::test]
async fn test_signing_methods_receive_positional_params() {
    let transport = Arc::new(MockTransport::new());
    let calls = Arc::new(Mutex::new(Vec::<(String, Vec<Value>)>::new()));
    let (c1, c2, c3, c4) = (calls.clone(), calls.clone(), calls.clone(), calls.clone());
    let caps = signer_ok()
        .sign_typed_data(move |data| {
            c1.lock().push(("typed".into(), vec![data]));
            async { Ok("0xsig-typed".to_string()) }
        })
        .sign_typed_data_v3(move |a, b| {
            c2.lock().push(("typed_v3".into(), vec![a, b]));
            async { Ok("0xsig-v3".to_string()) }
        })
        .sign_message(move |a, b| {
            c3.lock().push(("sign".into(), vec![a, b]));
            async { Ok("0xsig-eth".to_string()) }
        })
        .sign_personal_message(move |a, b| {
            c4.lock().push(("personal".into(), vec![a, b]));
            async { Ok("0xsig-personal".to_string()) }
        });
    let provider = provider_with(&transport, caps);

    let cases = [
        (
            "eth_signTypedData",
            vec![json!([{"type": "string", "name": "m", "value": "hi"}])],
            "0xsig-typed",
        ),
        ("eth_signTypedData_v3", vec![json!("0xabc"), json!("{\"types\":{}}")], "0xsig-v3"),
        ("eth_sign", vec![json!("0xabc"), json!("0xdeadbeef")], "0xsig-eth"),
        ("personal_sign", vec![json!("0xdeadbeef"), json!("0xabc")], "0xsig-personal"),
    ];
    for (i, (method, params, sig)) in cases.iter().enumerate() {
        let resp = provider.handle(Request::new(i as u64, *method, params.clone())).await.unwrap();
        assert_eq!(resp.result, Some(json!(sig)), "{}", method);
    }

    let calls = calls.lock();
    assert_eq!(calls[0].1, vec![json!([{"type": "string", "name": "m", "value": "hi"}])]);
    assert_eq!(calls[1].1, vec![json!("0xabc"), json!("{\"types\":{}}")]);
    assert_eq!(calls[3], ("personal".to_string(), vec![json!("0xdeadbeef"), json!("0xabc")]));
    assert!(transport.requests().is_empty());
}

#[tokio::test]
async fn test_signing_methods_forwarded_without_capability() {
    let transport = Arc::new(MockTransport::new());
    transport.respond("personal_sign", json!("0xnode-sig"));
    let provider = provider_with(&transport, signer_ok());

    let resp = provider
        .handle(Request::new(1, "personal_sign", vec![json!("0xdeadbeef"), json!("0xabc")]))
        .await
        .unwrap();
    assert_eq!(resp.result, Some(json!("0xnode-sig")));
}

#[tokio::test]
async fn test_missing_signing_param_is_invalid_request() {
    let transport = Arc::new(MockTransport::new());
    let caps = signer_ok().sign_message(|_, _| async { Ok("0xsig".to_string()) });
    let provider = provider_with(&transport, caps);

    let err = provider.handle(Request::new(1, "eth_sign", vec![json!("0xabc")])).await.unwrap_err();
    assert!(matches!(err, ProviderError::InvalidRequest(ref m) if m.contains("params[1]")));
    assert!(transport.requests().is_empty());
}

#[tokio::test]
async fn test_capability_failures_are_contained() {
    let transport = Arc::new(MockTransport::new());
    let caps = signer_ok()
        .accounts(|| async { Err(anyhow::anyhow!("keystore locked")) })
        .sign_typed_data(|_| -> futures::future::Ready<anyhow::Result<String>> {
            panic!("bad typed data")
        });
    let provider = provider_with(&transport, caps);

    let err = provider.handle(Request::new(1, "eth_accounts", vec![])).await.unwrap_err();
    assert!(matches!(
        err,
        ProviderError::Capability(CapabilityError::Rejected { capability: "accounts", .. })
    ));

    let err =
        provider.handle(Request::new(2, "eth_signTypedData", vec![json!({})])).await.unwrap_err();
    assert!(matches!(
        err,
        ProviderError::Capability(CapabilityError::Panicked { capability: "sign_typed_data" })
    ));

    // still serving
    transport.respond("net_version", json!("1"));
    let resp = provider.handle(Request::new(3, "net_version", vec![])).await.unwrap();
    assert_eq!(resp.result, Some(json!("1")));
}

#[tokio::test]
async fn test_send_transaction_resolves_and_relays() {
    let transport = Arc::new(MockTransport::new());
    transport.respond("eth_estimateGas", json!(21000));
    let seen = Arc::new(Mutex::new(Vec::new()));
    let seen_in = seen.clone();
    let caps = Capabilities::builder()
        .get_transaction_count(|_| async { Ok(json!(5)) })
        .static_gas_price(20)
        .sign_transaction(move |tx| {
            let seen = seen_in.clone();
            async move {
                seen.lock().push(tx);
                Ok("0xf86b05".to_string())
            }
        });
    let provider = provider_with(&transport, caps);

    let resp = provider
        .handle(Request::new(
            2,
            "eth_sendTransaction",
            vec![json!({"from": "0xabc", "to": "0xdef", "value": "0x1"})],
        ))
        .await
        .unwrap();

    assert_eq!(
        Value::Object(seen.lock()[0].clone()),
        json!({
            "from": "0xabc",
            "to": "0xdef",
            "value": "0x1",
            "nonce": 5,
            "gasPrice": 20,
            "gasLimit": 21000
        })
    );

    let estimate = transport.requests_for("eth_estimateGas");
    assert_eq!(estimate.len(), 1);
    assert_eq!(estimate[0].params, json!([{"from": "0xabc", "to": "0xdef", "value": "0x1"}]));

    let raw = transport.requests_for("eth_sendRawTransaction");
    assert_eq!(raw.len(), 1);
    assert_eq!(raw[0].id, Some(json!(2)));
    assert_eq!(raw[0].params, json!(["0xf86b05"]));
    assert_eq!(resp.id, json!(2));
    assert_eq!(resp.result, Some(json!("0xhash0")));

    // nonce and gas price came from local overrides
    assert!(transport.requests_for("eth_getTransactionCount").is_empty());
    assert!(transport.requests_for("eth_gasPrice").is_empty());
}

#[tokio::test]
async fn test_concurrent_submissions_get_distinct_nonces() {
    let transport = Arc::new(MockTransport::with_delay(Duration::from_millis(5)));
    transport.respond("eth_gasPrice", json!("0x1"));
    transport.respond("eth_estimateGas", json!("0x5208"));
    let seen = Arc::new(Mutex::new(Vec::new()));
    let provider = provider_with(&transport, recording_signer(seen.clone()));

    let requests = (1..=3u64).map(|i| {
        let provider = provider.clone();
        let tx = json!({"from": "0xabc", "to": "0xdef"});
        async move { provider.handle(Request::new(i * 100, "eth_sendTransaction", vec![tx])).await }
    });
    for outcome in join_all(requests).await {
        outcome.unwrap();
    }

    let nonces: Vec<Value> = seen.lock().iter().map(|tx| tx["nonce"].clone()).collect();
    assert_eq!(nonces, vec![json!("0x0"), json!("0x1"), json!("0x2")]);

    let counts = transport.requests_for("eth_getTransactionCount");
    assert_eq!(counts.len(), 3);
    assert!(counts.iter().all(|r| r.params[1] == json!("pending")));

    // every nonce lookup follows the previous job's relay
    let order: Vec<String> = transport
        .requests()
        .into_iter()
        .filter(|r| r.method == "eth_getTransactionCount" || r.method == "eth_sendRawTransaction")
        .map(|r| r.method)
        .collect();
    assert_eq!(order, ["eth_getTransactionCount", "eth_sendRawTransaction"].repeat(3));
    assert_eq!(provider.queued_transactions(), 0);
}

#[tokio::test]
async fn test_rejected_signature_does_not_stall_queue() {
    let transport = Arc::new(MockTransport::new());
    transport.respond("eth_gasPrice", json!("0x1"));
    transport.respond("eth_estimateGas", json!("0x5208"));
    let caps = Capabilities::builder().sign_transaction(|tx| async move {
        if tx["to"] == json!("0xblocked") {
            anyhow::bail!("user rejected transaction");
        }
        Ok("0xok".to_string())
    });
    let provider = provider_with(&transport, caps);

    let tx = |to: &str| json!({"from": "0xabc", "to": to});
    let first = provider.handle(Request::new(1, "eth_sendTransaction", vec![tx("0xblocked")]));
    let second = provider.handle(Request::new(2, "eth_sendTransaction", vec![tx("0xdef")]));
    let (first, second) = tokio::join!(first, second);

    match first.unwrap_err() {
        ProviderError::Pipeline(p) => assert_eq!(p.stage, PipelineStage::Signing),
        other => panic!("expected signing failure, got {:?}", other),
    }
    assert_eq!(second.unwrap().result, Some(json!("0xhash0")));
    assert_eq!(transport.requests_for("eth_sendRawTransaction").len(), 1);
}

#[tokio::test]
async fn test_nonce_lookup_failure_fails_job_only() {
    let transport = Arc::new(MockTransport::new());
    transport
        .respond_error("eth_getTransactionCount", JsonRpcError::new(-32000, "header not found"));
    let provider = provider_with(&transport, signer_ok());

    let err = provider
        .handle(Request::new(1, "eth_sendTransaction", vec![json!({"from": "0xabc"})]))
        .await
        .unwrap_err();
    match &err {
        ProviderError::Pipeline(p) => assert_eq!(p.stage, PipelineStage::Nonce),
        other => panic!("expected nonce failure, got {:?}", other),
    }
    // the upstream error code survives for the HTTP surface
    assert_eq!(err.to_rpc_error().message, "header not found");
    assert!(transport.requests_for("eth_sendRawTransaction").is_empty());
}

#[tokio::test]
async fn test_relay_error_member_returned_as_response() {
    let transport = Arc::new(MockTransport::new());
    transport.respond("eth_gasPrice", json!("0x1"));
    transport.respond("eth_estimateGas", json!("0x5208"));
    transport.respond_error("eth_sendRawTransaction", JsonRpcError::new(-32000, "nonce too low"));
    let provider = provider_with(&transport, signer_ok());

    let resp = provider
        .handle(Request::new(9, "eth_sendTransaction", vec![json!({"from": "0xabc"})]))
        .await
        .unwrap();
    assert_eq!(resp.id, json!(9));
    assert_eq!(resp.error.unwrap().message, "nonce too low");
}

#[tokio::test]
async fn test_latest_nonce_tag() {
    let transport = Arc::new(MockTransport::new());
    transport.respond("eth_gasPrice", json!("0x1"));
    transport.respond("eth_estimateGas", json!("0x5208"));
    let options =
        ProviderOptions::new(signer_ok().build().unwrap()).with_nonce_tag(NonceTag::Latest);
    let provider = SignerProvider::new(transport.clone(), options);

    provider
        .handle(Request::new(1, "eth_sendTransaction", vec![json!({"from": "0xabc"})]))
        .await
        .unwrap();
    let counts = transport.requests_for("eth_getTransactionCount");
    assert_eq!(counts[0].params, json!(["0xabc", "latest"]));
    assert_eq!(counts[0].id, Some(json!(2)));
}

#[tokio::test]
async fn test_send_async_invokes_callback_once() {
    let transport = Arc::new(MockTransport::new());
    let provider = provider_with(&transport, signer_ok().static_accounts(vec!["0xabc".into()]));

    let (tx, rx) = oneshot::channel();
    provider.send_async(Request::new(4, "eth_accounts", vec![]), move |outcome| {
        let _ = tx.send(outcome);
    });
    let resp = rx.await.unwrap().unwrap();
    assert_eq!(resp.id, json!(4));
    assert_eq!(resp.result, Some(json!(["0xabc"])));
}

#[test]
fn test_send_async_outside_runtime_reports_error() {
    let transport = Arc::new(MockTransport::new());
    let provider = provider_with(&transport, signer_ok().static_accounts(vec!["0xabc".into()]));

    let (tx, rx) = std::sync::mpsc::channel();
    provider.send_async(Request::new(5, "eth_accounts", vec![]), move |outcome| {
        tx.send(outcome).unwrap();
    });
    let outcome = rx.try_recv().expect("callback runs before send_async returns");
    assert!(matches!(outcome, Err(ProviderError::Internal(_))));
    assert!(rx.try_recv().is_err());
}

#[test]
fn test_send_async_on_explicit_runtime() {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let transport = Arc::new(MockTransport::new());
    let provider = provider_with(&transport, signer_ok().static_accounts(vec!["0xabc".into()]));

    let (tx, rx) = oneshot::channel();
    let request = Request::new(6, "eth_accounts", vec![]);
    provider.send_async_on(runtime.handle(), request, move |outcome| {
        let _ = tx.send(outcome);
    });
    let resp = runtime.block_on(rx).unwrap().unwrap();
    assert_eq!(resp.id, json!(6));
    assert_eq!(resp.result, Some(json!(["0xabc"])));
}
