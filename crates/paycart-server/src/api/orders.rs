use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use paycart_core::{OrderStatus, PhysicalAddress, Recipient, WalletAddress};
use paycart_db::{NewOrder, OrderRow};
use paycart_fulfillment::CreateOrderRequest;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::middleware::RequestId;
use crate::paywall::{
    decode_payment_header, encode_settlement, PaymentRequiredBody, SettleResponse,
    PAYMENT_HEADER, PAYMENT_RESPONSE_HEADER,
};

use super::locators::map_locator_error;
use super::{map_db_error, normalize_limit, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Deserialize)]
pub(super) struct ShippingAddressInput {
    pub name: String,
    pub line1: String,
    #[serde(default)]
    pub line2: Option<String>,
    pub city: String,
    #[serde(default)]
    pub state: Option<String>,
    pub postal_code: String,
    pub country: String,
}

#[derive(Debug, Deserialize)]
pub(super) struct CreateOrderBody {
    pub product_url: String,
    pub wallet_address: String,
    pub email: String,
    pub shipping_address: ShippingAddressInput,
}

impl CreateOrderBody {
    fn recipient(self) -> Recipient {
        let a = self.shipping_address;
        Recipient {
            email: self.email,
            physical_address: PhysicalAddress {
                name: a.name,
                line1: a.line1,
                line2: a.line2,
                city: a.city,
                state: a.state,
                postal_code: a.postal_code,
                country: a.country,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct WalletOrdersQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub(super) struct OrderItem {
    order_id: Uuid,
    wallet_address: String,
    product_url: String,
    locator: String,
    status: String,
    provider_order_id: Option<String>,
    payment_reference: Option<String>,
    quote_total: Option<Decimal>,
    quote_currency: Option<String>,
    error_message: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<OrderRow> for OrderItem {
    fn from(row: OrderRow) -> Self {
        Self {
            order_id: row.public_id,
            wallet_address: row.wallet_address,
            product_url: row.product_url,
            locator: row.locator,
            status: row.status,
            provider_order_id: row.provider_order_id,
            payment_reference: row.payment_reference,
            quote_total: row.quote_total,
            quote_currency: row.quote_currency,
            error_message: row.error_message,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Failure of the paywalled order endpoint: either a regular API error or a
/// fresh x402 challenge.
#[derive(Debug)]
pub(super) enum CreateOrderError {
    Api(ApiError),
    PaymentRequired(PaymentRequiredBody),
}

impl From<ApiError> for CreateOrderError {
    fn from(error: ApiError) -> Self {
        Self::Api(error)
    }
}

impl IntoResponse for CreateOrderError {
    fn into_response(self) -> Response {
        match self {
            Self::Api(error) => error.into_response(),
            Self::PaymentRequired(body) => {
                (StatusCode::PAYMENT_REQUIRED, Json(body)).into_response()
            }
        }
    }
}

/// `POST /api/v1/orders`.
///
/// The payment is verified before the body is looked at, and settled only
/// once the fulfillment provider has accepted the order.
#[allow(clippy::too_many_lines)]
pub(super) async fn create_order(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, CreateOrderError> {
    let paywall = &state.paywall;
    let challenge =
        |error: &str| CreateOrderError::PaymentRequired(paywall.payment_required_body(error));

    let Some(raw_payment) = headers.get(PAYMENT_HEADER) else {
        return Err(challenge("X-PAYMENT header is required"));
    };
    let payment = raw_payment
        .to_str()
        .map_err(|e| e.to_string())
        .and_then(decode_payment_header)
        .map_err(|reason| {
            tracing::warn!(error = %reason, "invalid payment header");
            challenge("invalid payment header")
        })?;

    let verdict = paywall.verify(&payment).await.map_err(|e| {
        tracing::error!(error = %e, "payment verification failed");
        ApiError::new(
            req_id.0.clone(),
            "facilitator_error",
            "payment facilitator unavailable",
        )
    })?;
    if !verdict.is_valid {
        let reason = verdict
            .invalid_reason
            .unwrap_or_else(|| "payment rejected".to_owned());
        tracing::info!(payer = ?verdict.payer, reason = %reason, "payment rejected by facilitator");
        return Err(challenge(&reason));
    }

    let validation =
        |message: String| ApiError::new(req_id.0.clone(), "validation_error", message);
    let request: CreateOrderBody = serde_json::from_slice(&body)
        .map_err(|e| validation(format!("invalid request body: {e}")))?;
    let wallet =
        WalletAddress::parse(&request.wallet_address).map_err(|e| validation(e.to_string()))?;
    let product_url = request.product_url.trim().to_owned();
    let recipient = request
        .recipient()
        .normalized()
        .map_err(|e| validation(e.to_string()))?;

    let locator = state
        .resolver
        .resolve(&product_url)
        .await
        .map_err(|e| map_locator_error(req_id.0.clone(), &e))?;

    let order_request = CreateOrderRequest::single_item(
        recipient.clone(),
        &locator,
        &state.payment.method,
        &state.payment.currency,
        wallet.as_str(),
    );
    let provider_order = state
        .fulfillment
        .create_order(&order_request)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, locator = %locator, "fulfillment order creation failed");
            ApiError::new(req_id.0.clone(), "fulfillment_error", e.to_string())
        })?;

    let settlement = match paywall.settle(&payment).await {
        Ok(s) if s.success => Ok(s),
        Ok(s) => Err(s
            .error_reason
            .unwrap_or_else(|| "settlement rejected".to_owned())),
        Err(e) => {
            tracing::error!(error = %e, "payment settlement failed");
            Err("settlement failed".to_owned())
        }
    };

    let wallet_row = paycart_db::upsert_wallet(&state.pool, &wallet)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;
    let shipping_address = serde_json::to_value(&recipient.physical_address).map_err(|e| {
        tracing::error!(error = %e, "failed to serialize shipping address");
        ApiError::new(req_id.0.clone(), "internal_error", "failed to record order")
    })?;
    let total = provider_order.total_price();
    let (status, payment_reference, error_message) = match &settlement {
        Ok(receipt) => (OrderStatus::Submitted, receipt.transaction.as_deref(), None),
        Err(reason) => (OrderStatus::Failed, None, Some(reason.as_str())),
    };

    let row = paycart_db::insert_order(
        &state.pool,
        &NewOrder {
            wallet_id: wallet_row.id,
            product_url: &product_url,
            locator: locator.as_str(),
            recipient_email: &recipient.email,
            shipping_address,
            status,
            provider_order_id: Some(&provider_order.order_id),
            payment_reference,
            quote_total: total.map(|p| p.amount),
            quote_currency: total.map(|p| p.currency.as_str()),
            error_message,
        },
    )
    .await
    .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    match settlement {
        Ok(receipt) => {
            tracing::info!(
                order_id = %row.public_id,
                provider_order_id = %provider_order.order_id,
                wallet = %wallet,
                "order submitted"
            );
            Ok(created_response(req_id.0, row, &receipt))
        }
        Err(reason) => {
            tracing::warn!(
                order_id = %row.public_id,
                reason = %reason,
                "payment settlement failed; order recorded as failed"
            );
            Err(challenge(&reason))
        }
    }
}

fn created_response(request_id: String, row: OrderRow, receipt: &SettleResponse) -> Response {
    let mut response = (
        StatusCode::CREATED,
        Json(ApiResponse {
            data: OrderItem::from(row),
            meta: ResponseMeta::new(request_id),
        }),
    )
        .into_response();

    match encode_settlement(receipt).map(|v| HeaderValue::from_str(&v)) {
        Ok(Ok(value)) => {
            response.headers_mut().insert(PAYMENT_RESPONSE_HEADER, value);
        }
        Ok(Err(e)) => tracing::warn!(error = %e, "settlement receipt is not a valid header"),
        Err(e) => tracing::warn!(error = %e, "failed to encode settlement receipt"),
    }
    response
}

/// `GET /api/v1/orders/{public_id}`.
pub(super) async fn get_order(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(public_id): Path<String>,
) -> Result<Json<ApiResponse<OrderItem>>, ApiError> {
    let public_id = Uuid::parse_str(&public_id).map_err(|_| {
        ApiError::new(req_id.0.clone(), "bad_request", "order id must be a UUID")
    })?;

    let row = paycart_db::get_order_by_public_id(&state.pool, public_id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: OrderItem::from(row),
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// `GET /api/v1/wallets/{address}/orders`.
pub(super) async fn list_wallet_orders(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(address): Path<String>,
    Query(query): Query<WalletOrdersQuery>,
) -> Result<Json<ApiResponse<Vec<OrderItem>>>, ApiError> {
    let wallet = WalletAddress::parse(&address)
        .map_err(|e| ApiError::new(req_id.0.clone(), "validation_error", e.to_string()))?;

    let rows = paycart_db::list_orders_for_wallet(
        &state.pool,
        wallet.as_str(),
        normalize_limit(query.limit),
    )
    .await
    .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: rows.into_iter().map(OrderItem::from).collect(),
        meta: ResponseMeta::new(req_id.0),
    }))
}

#[cfg(test)]
#[path = "orders_test.rs"]
mod tests;
