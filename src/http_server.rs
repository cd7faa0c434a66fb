//! Read endpoint for the latest observed prices.
//!
//! `GET /prices?fst=ETH&snd=REN` answers `{"price": 0.00024, "nonce": 1531233126}`, where nonce is
//! the unix time the price was observed at. Missing parameters and never observed pairs are a 404,
//! malformed symbols a 400.
use std::{net::SocketAddr, sync::Arc};

use axum::{
    extract::{Query, State},
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use eyre::{Result, WrapErr};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};

use crate::{pair::CurrencyPair, price_store::PriceStore};

#[derive(Debug, Deserialize)]
struct PriceQuery {
    fst: Option<String>,
    snd: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct PriceResponse {
    pub price: f64,
    pub nonce: i64,
}

pub fn router(price_store: Arc<PriceStore>) -> Router {
    Router::new()
        .route("/prices", get(get_price))
        .route("/prices/", get(get_price))
        .with_state(price_store)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET]),
        )
}

async fn get_price(
    Query(query): Query<PriceQuery>,
    State(price_store): State<Arc<PriceStore>>,
) -> Response {
    let (Some(fst), Some(snd)) = (query.fst, query.snd) else {
        return (StatusCode::NOT_FOUND, "expected fst and snd query parameters").into_response();
    };
    let pair = match CurrencyPair::new(&fst, &snd) {
        Ok(pair) => pair,
        Err(e) => return (StatusCode::BAD_REQUEST, e.to_string()).into_response(),
    };

    match price_store.get(&pair) {
        Some(observation) => Json(PriceResponse {
            price: observation.price,
            nonce: observation.observed_at.timestamp(),
        })
        .into_response(),
        None => (StatusCode::NOT_FOUND, format!("no price for pair {}", pair)).into_response(),
    }
}

pub async fn serve(price_store: Arc<PriceStore>, port: u16) -> Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .wrap_err_with(|| format!("cannot listen on port {}", port))?;
    log::info!("listening on port {}...", port);
    axum::serve(listener, router(price_store))
        .await
        .wrap_err("http server stopped")
}
