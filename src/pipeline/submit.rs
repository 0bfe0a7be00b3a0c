//! One transaction job: resolve the missing fields, sign, relay.
//!
//! Field policy:
//! - `nonce` is always the freshly resolved transaction count
//! - `gasPrice` is resolved only when the caller gave neither `gasPrice` nor `maxFeePerGas`
//! - `gasLimit` is resolved only when the caller gave neither `gasLimit` nor `gas`;
//!   a caller `gas` is mirrored into `gasLimit`

use serde_json::Value;
use tracing::debug;

use crate::pipeline::PipelineDeps;
use crate::provider::capabilities::TransactionObject;
use crate::rpc::envelope::{Request, Response};
use crate::utils::errors::{PipelineError, PipelineStage, ProviderError};

pub const GET_TRANSACTION_COUNT: &str = "eth_getTransactionCount";
pub const GAS_PRICE: &str = "eth_gasPrice";
pub const ESTIMATE_GAS: &str = "eth_estimateGas";
pub const SEND_RAW_TRANSACTION: &str = "eth_sendRawTransaction";

/// Run the whole pipeline for one `eth_sendTransaction` request.
pub async fn process<D: PipelineDeps>(
    deps: &D,
    request: &Request,
) -> Result<Response, ProviderError> {
    let tx = transaction_object(request)?;
    let from = tx
        .get("from")
        .cloned()
        .ok_or_else(|| ProviderError::InvalidRequest("transaction object has no `from`".into()))?;

    let nonce = resolve_nonce(deps, request, from).await?;
    debug!(id = %request.id_or_null(), nonce = %nonce, "nonce resolved");

    let (gas_price, gas_limit) =
        futures::try_join!(resolve_gas_price(deps, request, &tx), resolve_gas_limit(deps, &tx))?;
    debug!(id = %request.id_or_null(), ?gas_price, ?gas_limit, "gas resolved");

    let tx = merge(tx, nonce, gas_price, gas_limit);
    let signed = deps
        .sign_transaction(tx)
        .await
        .map_err(|e| PipelineError::new(PipelineStage::Signing, e))?;

    let raw = Request {
        id: request.id.clone(),
        jsonrpc: request.jsonrpc.clone(),
        method: SEND_RAW_TRANSACTION.to_string(),
        params: Value::Array(vec![Value::String(signed)]),
    };
    let response = deps
        .relay(raw)
        .await
        .map_err(|e| PipelineError::new(PipelineStage::Relay, e))?;
    Ok(response)
}

fn transaction_object(request: &Request) -> Result<TransactionObject, ProviderError> {
    match request.param(0) {
        Some(Value::Object(tx)) => Ok(tx.clone()),
        Some(_) => {
            Err(ProviderError::InvalidRequest("params[0] must be a transaction object".into()))
        }
        None => Err(ProviderError::InvalidRequest("missing params[0]".into())),
    }
}

async fn resolve_nonce<D: PipelineDeps>(
    deps: &D,
    request: &Request,
    from: Value,
) -> Result<Value, PipelineError> {
    let stage = |e: ProviderError| PipelineError::new(PipelineStage::Nonce, e);
    let tag = Value::String(deps.nonce_tag().as_str().to_string());
    let sub = request.sub_request(GET_TRANSACTION_COUNT, vec![from, tag]);
    let response = deps.dispatch(sub).await.map_err(stage)?;
    response.into_result().map_err(|e| stage(e.into()))
}

async fn resolve_gas_price<D: PipelineDeps>(
    deps: &D,
    request: &Request,
    tx: &TransactionObject,
) -> Result<Option<Value>, PipelineError> {
    if tx.contains_key("gasPrice") || tx.contains_key("maxFeePerGas") {
        return Ok(None);
    }
    let stage = |e: ProviderError| PipelineError::new(PipelineStage::GasPrice, e);
    let response = deps.dispatch(request.sub_request(GAS_PRICE, vec![])).await.map_err(stage)?;
    response.into_result().map(Some).map_err(|e| stage(e.into()))
}

async fn resolve_gas_limit<D: PipelineDeps>(
    deps: &D,
    tx: &TransactionObject,
) -> Result<Option<Value>, PipelineError> {
    if tx.contains_key("gasLimit") || tx.contains_key("gas") {
        return Ok(None);
    }
    deps.call_upstream(ESTIMATE_GAS, vec![Value::Object(tx.clone())])
        .await
        .map(Some)
        .map_err(|e| PipelineError::new(PipelineStage::GasEstimate, e))
}

fn merge(
    mut tx: TransactionObject,
    nonce: Value,
    gas_price: Option<Value>,
    gas_limit: Option<Value>,
) -> TransactionObject {
    tx.insert("nonce".into(), nonce);
    if let Some(price) = gas_price {
        tx.insert("gasPrice".into(), price);
    }
    match gas_limit {
        Some(limit) => {
            tx.insert("gasLimit".into(), limit);
        }
        None => {
            if let (false, Some(gas)) = (tx.contains_key("gasLimit"), tx.get("gas").cloned()) {
                tx.insert("gasLimit".into(), gas);
            }
        }
    }
    tx
}
