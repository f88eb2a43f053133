// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Minimal JSON-RPC-shaped HTTP surface over the [`Simulator`] façade.
//! This is operator and test tooling, not a Lotus-compatible JSON-RPC
//! endpoint: addresses, CIDs, and big integers cross the wire as their
//! string representations, and every route is a plain `POST`/`GET`
//! rather than a batched `method`/`params` envelope.

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use address::Address;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chain::{FileRef, RetrievalOrder, StartDealParams};
use cid::Cid;
use crypto::SignatureType;
use message::{Message, SignedMessage};
use num_bigint::BigInt;
use serde::{Deserialize, Serialize};

use crate::engine::{MessageSendSpec, Simulator};
use crate::Error;

pub fn router(sim: Arc<Simulator>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/v0/push", post(push))
        .route("/v0/push_signed", post(push_signed))
        .route("/v0/mine", post(mine))
        .route("/v0/deals", post(start_deal))
        .route("/v0/deals/query_offer/:cid", get(query_offer))
        .route("/v0/deals/retrieve", post(retrieve))
        .route("/v0/objects/:cid", get(has_local))
        .route("/v0/tipset/latest", get(latest_tipset))
        .route("/v0/tipset/genesis", get(genesis_tipset))
        .with_state(sim)
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = match &self {
            Error::NotReady => StatusCode::SERVICE_UNAVAILABLE,
            Error::Pool(_)
            | Error::Chain(_)
            | Error::Blocks(_)
            | Error::Encoding(_)
            | Error::Message(_)
            | Error::Crypto(_)
            | Error::KeyManagement(_)
            | Error::Address(_)
            | Error::MissingWallet => StatusCode::BAD_REQUEST,
            Error::Io(_) | Error::Store(_) | Error::Config(_) | Error::Other(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, Json(ErrorBody { error: self.to_string() })).into_response()
    }
}

fn parse_address(s: &str) -> Result<Address, Error> {
    Ok(Address::from_str(s)?)
}

fn parse_bigint(s: &str) -> Result<BigInt, Error> {
    BigInt::from_str(s).map_err(|e| Error::Other(format!("invalid integer {s:?}: {e}")))
}

fn parse_cid(s: &str) -> Result<Cid, Error> {
    Cid::from_str(s).map_err(|e| Error::Other(format!("invalid cid {s:?}: {e}")))
}

async fn healthz() -> &'static str {
    "ok"
}

#[derive(Debug, Deserialize)]
struct PushMessageRequest {
    from: String,
    to: String,
    value: String,
    #[serde(default)]
    method: u64,
    gas_limit: u64,
    gas_fee_cap: String,
    gas_premium: String,
}

impl PushMessageRequest {
    fn into_message(self) -> Result<Message, Error> {
        Ok(Message {
            from: parse_address(&self.from)?,
            to: parse_address(&self.to)?,
            nonce: 0,
            value: parse_bigint(&self.value)?,
            method: self.method,
            gas_limit: self.gas_limit,
            gas_fee_cap: parse_bigint(&self.gas_fee_cap)?,
            gas_premium: parse_bigint(&self.gas_premium)?,
        })
    }
}

#[derive(Debug, Serialize)]
struct SignedMessageResponse {
    cid: String,
    from: String,
    to: String,
    nonce: u64,
    value: String,
    method: u64,
    gas_limit: u64,
    gas_fee_cap: String,
    gas_premium: String,
    signature_type: &'static str,
    signature: String,
}

impl SignedMessageResponse {
    fn from_signed(msg: &SignedMessage) -> Result<Self, Error> {
        Ok(Self {
            cid: msg.cid()?.to_string(),
            from: msg.from().to_string(),
            to: msg.to().to_string(),
            nonce: msg.nonce(),
            value: msg.value().to_string(),
            method: msg.method(),
            gas_limit: msg.gas_limit(),
            gas_fee_cap: msg.gas_fee_cap().to_string(),
            gas_premium: msg.gas_premium().to_string(),
            signature_type: match msg.signature().signature_type() {
                SignatureType::Secp256k1 => "secp256k1",
                SignatureType::BLS => "bls",
            },
            signature: hex::encode(msg.signature().bytes()),
        })
    }
}

async fn push(
    State(sim): State<Arc<Simulator>>,
    Json(req): Json<PushMessageRequest>,
) -> Result<Json<SignedMessageResponse>, Error> {
    let message = req.into_message()?;
    let signed = sim.push(message, MessageSendSpec::default()).await?;
    Ok(Json(SignedMessageResponse::from_signed(&signed)?))
}

#[derive(Debug, Deserialize)]
struct PushSignedRequest {
    #[serde(flatten)]
    message: PushMessageRequest,
    nonce: u64,
    signature_type: String,
    signature: String,
    #[serde(default = "default_acquire_lock")]
    acquire_lock: bool,
}

fn default_acquire_lock() -> bool {
    true
}

#[derive(Debug, Serialize)]
struct CidResponse {
    cid: String,
}

async fn push_signed(
    State(sim): State<Arc<Simulator>>,
    Json(req): Json<PushSignedRequest>,
) -> Result<Json<CidResponse>, Error> {
    let mut message = req.message.into_message()?;
    message.nonce = req.nonce;

    let sig_bytes = hex::decode(&req.signature)
        .map_err(|e| Error::Other(format!("invalid signature hex: {e}")))?;
    let signature = match req.signature_type.as_str() {
        "secp256k1" => crypto::Signature::new_secp256k1(sig_bytes),
        "bls" => crypto::Signature::new_bls(sig_bytes),
        other => return Err(Error::Other(format!("unknown signature type {other:?}"))),
    };

    let signed = SignedMessage::new_unchecked(message, signature);
    let cid = sim.push_signed(signed, req.acquire_lock).await?;
    Ok(Json(CidResponse { cid: cid.to_string() }))
}

#[derive(Debug, Deserialize)]
struct MineRequest {
    #[serde(default = "default_mine_count")]
    count: u64,
}

fn default_mine_count() -> u64 {
    1
}

#[derive(Debug, Serialize)]
struct TipsetResponse {
    height: i64,
    weight: String,
    cids: Vec<String>,
}

impl From<&blocks::Tipset> for TipsetResponse {
    fn from(tipset: &blocks::Tipset) -> Self {
        Self {
            height: tipset.epoch(),
            weight: tipset.weight().to_string(),
            cids: tipset.cids().iter().map(Cid::to_string).collect(),
        }
    }
}

async fn mine(
    State(sim): State<Arc<Simulator>>,
    Json(req): Json<MineRequest>,
) -> Result<Json<TipsetResponse>, Error> {
    let tipset = sim.mine_tipset(req.count).await?;
    Ok(Json(TipsetResponse::from(&tipset)))
}

#[derive(Debug, Deserialize)]
struct StartDealRequest {
    wallet: String,
    miner: String,
    data_root: String,
    price_per_epoch: String,
    duration: u64,
}

async fn start_deal(
    State(sim): State<Arc<Simulator>>,
    Json(req): Json<StartDealRequest>,
) -> Result<Json<CidResponse>, Error> {
    let params = StartDealParams {
        wallet: parse_address(&req.wallet)?,
        miner: parse_address(&req.miner)?,
        data_root: parse_cid(&req.data_root)?,
        price_per_epoch: parse_bigint(&req.price_per_epoch)?,
        duration: req.duration,
    };
    let cid = sim.start_deal(params).await?;
    Ok(Json(CidResponse { cid: cid.to_string() }))
}

#[derive(Debug, Serialize)]
struct QueryOfferResponse {
    root: String,
    size: u64,
    min_price: String,
    miner: String,
}

async fn query_offer(
    State(sim): State<Arc<Simulator>>,
    Path(cid): Path<String>,
) -> Result<Json<QueryOfferResponse>, Error> {
    let root = parse_cid(&cid)?;
    let offer = sim.create_query_offer(root).await?;
    Ok(Json(QueryOfferResponse {
        root: offer.root.to_string(),
        size: offer.size,
        min_price: offer.min_price.to_string(),
        miner: offer.miner.to_string(),
    }))
}

#[derive(Debug, Deserialize)]
struct RetrieveRequest {
    client: String,
    miner: String,
    total: String,
    root: String,
    path: String,
}

async fn retrieve(
    State(sim): State<Arc<Simulator>>,
    Json(req): Json<RetrieveRequest>,
) -> Result<StatusCode, Error> {
    let order = RetrievalOrder {
        client: parse_address(&req.client)?,
        miner: parse_address(&req.miner)?,
        total: parse_bigint(&req.total)?,
        root: parse_cid(&req.root)?,
    };
    let file_ref = FileRef { path: PathBuf::from(req.path) };
    sim.retrieve(order, file_ref).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Serialize)]
struct HasLocalResponse {
    present: bool,
}

async fn has_local(
    State(sim): State<Arc<Simulator>>,
    Path(cid): Path<String>,
) -> Result<Json<HasLocalResponse>, Error> {
    let cid = parse_cid(&cid)?;
    Ok(Json(HasLocalResponse { present: sim.has_local(&cid).await }))
}

async fn latest_tipset(State(sim): State<Arc<Simulator>>) -> Result<Json<Option<TipsetResponse>>, Error> {
    let tipset = sim.latest_tipset().await?;
    Ok(Json(tipset.as_ref().map(TipsetResponse::from)))
}

async fn genesis_tipset(State(sim): State<Arc<Simulator>>) -> Result<Json<Option<TipsetResponse>>, Error> {
    let tipset = sim.genesis_tipset().await?;
    Ok(Json(tipset.as_ref().map(TipsetResponse::from)))
}
