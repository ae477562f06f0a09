/// Axum HTTP handlers for the Horizon subset, federation and the directory
use axum::{
    extract::{Path, Query, RawQuery, State},
    http::{header::HOST, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Form, Json,
};

use crate::state::MockLedger;
use crate::types::*;

/// Errors render as problem documents, the way Horizon does
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Unavailable(String),
    Rejected(Problem),
}

impl ApiError {
    fn problem(status: StatusCode, title: &str, detail: String) -> Problem {
        Problem {
            kind: format!(
                "https://stellar.org/horizon-errors/{}",
                title.to_lowercase().replace(' ', "_")
            ),
            title: title.to_string(),
            status: status.as_u16(),
            detail,
            extras: None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let problem = match self {
            ApiError::NotFound(detail) => {
                Self::problem(StatusCode::NOT_FOUND, "Resource Missing", detail)
            }
            ApiError::BadRequest(detail) => {
                Self::problem(StatusCode::BAD_REQUEST, "Bad Request", detail)
            }
            ApiError::Unavailable(detail) => {
                Self::problem(StatusCode::SERVICE_UNAVAILABLE, "Service Unavailable", detail)
            }
            ApiError::Rejected(problem) => problem,
        };
        let status =
            StatusCode::from_u16(problem.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(problem)).into_response()
    }
}

const MAX_LIMIT: usize = 200;

fn page_limit(limit: Option<usize>) -> usize {
    limit.unwrap_or(10).clamp(1, MAX_LIMIT)
}

/// GET /accounts/:id
pub async fn get_account(
    State(ledger): State<MockLedger>,
    Path(id): Path<String>,
) -> Result<Json<AccountJson>, ApiError> {
    ledger
        .account(&id)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("account {} does not exist", id)))
}

/// GET /accounts/:id/payments
pub async fn get_payments(
    State(ledger): State<MockLedger>,
    Path(id): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<Json<CollectionJson<PaymentJson>>, ApiError> {
    if query.order.as_deref().is_some_and(|o| o != "desc") {
        return Err(ApiError::BadRequest("only order=desc is served".to_string()));
    }
    let records = ledger
        .payments_page(&id, query.cursor.as_deref(), page_limit(query.limit))
        .await
        .ok_or_else(|| ApiError::NotFound(format!("account {} does not exist", id)))?;
    Ok(Json(CollectionJson::new(records)))
}

/// GET /accounts/:id/operations
pub async fn get_operations(
    State(ledger): State<MockLedger>,
    Path(id): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<Json<CollectionJson<OperationJson>>, ApiError> {
    let records = ledger
        .payments_page(&id, query.cursor.as_deref(), page_limit(query.limit))
        .await
        .ok_or_else(|| ApiError::NotFound(format!("account {} does not exist", id)))?;
    Ok(Json(CollectionJson::new(
        records.iter().map(OperationJson::from).collect(),
    )))
}

/// GET /claimable_balances?claimant=
pub async fn get_claimable_balances(
    State(ledger): State<MockLedger>,
    Query(query): Query<ClaimantQuery>,
) -> Json<CollectionJson<ClaimableBalanceJson>> {
    let records = ledger
        .claimable_for(&query.claimant, page_limit(query.limit))
        .await;
    Json(CollectionJson::new(records))
}

/// GET /fee_stats
pub async fn get_fee_stats(State(ledger): State<MockLedger>) -> Json<FeeStatsJson> {
    Json(ledger.fee_stats().await)
}

/// POST /transactions, form field `tx` holds the base64 envelope
pub async fn submit_transaction(
    State(ledger): State<MockLedger>,
    Form(form): Form<SubmitForm>,
) -> Result<Json<SubmitResponse>, ApiError> {
    match ledger.submit(&form.tx).await {
        Ok(response) => {
            log::info!("Accepted transaction {}", response.hash);
            Ok(Json(response))
        }
        Err(problem) => {
            log::info!("Rejected transaction: {}", problem.title);
            Err(ApiError::Rejected(problem))
        }
    }
}

/// GET /.well-known/stellar.toml
///
/// Points FEDERATION_SERVER back at this server using the request's Host header.
pub async fn get_stellar_toml(headers: HeaderMap) -> Result<String, ApiError> {
    let host = headers
        .get(HOST)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| ApiError::BadRequest("missing Host header".to_string()))?;
    Ok(format!(
        "NETWORK_PASSPHRASE = \"Test SDF Network ; September 2015\"\nFEDERATION_SERVER = \"http://{}/federation\"\n",
        host
    ))
}

/// GET /federation?q=name*domain&type=name
pub async fn get_federation(
    State(ledger): State<MockLedger>,
    Query(query): Query<FederationQuery>,
) -> Result<Json<FederationJson>, ApiError> {
    if query.kind != "name" {
        return Err(ApiError::BadRequest(format!(
            "unsupported query type '{}'",
            query.kind
        )));
    }
    ledger
        .federation(&query.q)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("{} is not known", query.q)))
}

/// GET /explorer/directory?tag[]=..&limit=
///
/// Repeated `tag[]` keys do not fit a typed query, so the raw string is split here.
pub async fn get_directory(
    State(ledger): State<MockLedger>,
    RawQuery(raw): RawQuery,
) -> Result<Json<CollectionJson<DirectoryRecord>>, ApiError> {
    let mut tags = Vec::new();
    let mut limit = None;
    for pair in raw.as_deref().unwrap_or_default().split('&') {
        let Some((key, value)) = pair.split_once('=') else {
            continue;
        };
        match key {
            "tag[]" | "tag%5B%5D" | "tag%5b%5d" => tags.push(value.replace("%2D", "-")),
            "limit" => limit = value.parse().ok(),
            _ => {}
        }
    }

    ledger
        .directory(&tags, page_limit(limit))
        .await
        .map(|records| Json(CollectionJson::new(records)))
        .ok_or_else(|| ApiError::Unavailable("directory is offline".to_string()))
}

/// GET /health
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
