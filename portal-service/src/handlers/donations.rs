//! Donations through the payment gateway.

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use service_core::error::AppError;

use crate::dtos::donations::{
    DonationRequest, DonationResponse, PaymentListParams, PaymentResponse, VerifyDonationRequest,
};
use crate::dtos::Paginated;
use crate::models::{Payment, Subscription};
use crate::services::donations::{new_reference, settle, DONATION_PREFIX};
use crate::services::payments::paystack::SIGNATURE_HEADER;
use crate::services::payments::{CheckoutRequest, Transaction};
use crate::services::{ListFilter, PageRequest, PaystackClient};
use crate::utils::ValidatedJson;
use crate::AppState;

/// Starts a checkout. A recurring donation also records a pending
/// subscription, activated once the first charge settles.
pub async fn create_donation(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<DonationRequest>,
) -> Result<(StatusCode, Json<DonationResponse>), AppError> {
    let currency = state.config.paystack.currency.clone();
    let reference = new_reference(DONATION_PREFIX);

    let subscription_id = match payload.interval {
        Some(interval) => {
            let subscription = Subscription::pending(
                &payload.email,
                payload.name.clone(),
                payload.amount,
                &currency,
                interval,
            );
            state.repos.subscriptions.insert(&subscription).await?;
            Some(subscription.id)
        }
        None => None,
    };

    let checkout = state
        .payments
        .initialize(&CheckoutRequest {
            email: payload.email.trim().to_lowercase(),
            amount: payload.amount,
            currency: currency.clone(),
            reference: reference.clone(),
            callback_url: state.config.paystack.callback_url.clone(),
        })
        .await?;

    let payment = Payment::pending(
        reference,
        &payload.email,
        payload.name,
        payload.amount,
        &currency,
        subscription_id.clone(),
    );
    state.repos.payments.insert(&payment).await?;

    tracing::info!(
        reference = %payment.reference,
        amount = payment.amount,
        recurring = subscription_id.is_some(),
        "Donation initialized"
    );

    Ok((
        StatusCode::CREATED,
        Json(DonationResponse {
            reference: payment.reference,
            authorization_url: checkout.authorization_url,
            subscription_id,
        }),
    ))
}

/// Confirms a checkout with the gateway after the donor is redirected back.
pub async fn verify_donation(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<VerifyDonationRequest>,
) -> Result<Json<PaymentResponse>, AppError> {
    let transaction = state.payments.verify(payload.reference.trim()).await?;
    let payment = settle(&state.repos, &transaction).await?;
    Ok(Json(payment.into()))
}

/// Gateway webhook. Deliveries must carry a valid signature over the raw
/// body; accepted deliveries are always acknowledged with 200.
pub async fn webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, AppError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            tracing::warn!("Webhook delivery without signature");
            AppError::Unauthorized("Missing webhook signature".to_string())
        })?;

    if !state.payments.verify_webhook(&body, signature) {
        tracing::warn!("Webhook delivery with invalid signature");
        return Err(AppError::Unauthorized(
            "Invalid webhook signature".to_string(),
        ));
    }

    let event = PaystackClient::parse_webhook(&body)?;
    tracing::info!(event_type = %event.event, reference = %event.data.reference, "Processing webhook");

    match event.event.as_str() {
        "charge.success" => {
            let transaction = Transaction::from(event.data);
            if let Err(e) = settle(&state.repos, &transaction).await {
                tracing::error!(
                    error = %e,
                    reference = %transaction.reference,
                    "Failed to settle payment from webhook"
                );
            }
        }
        other => {
            tracing::debug!(event_type = %other, "Unhandled webhook event type");
        }
    }

    Ok(StatusCode::OK)
}

pub async fn list_payments(
    State(state): State<AppState>,
    Query(params): Query<PaymentListParams>,
) -> Result<Json<Paginated<PaymentResponse>>, AppError> {
    let page = PageRequest::new(params.page, params.limit);
    let filter = ListFilter::new().eq_opt("status", params.status.map(|s| s.as_str()));
    let result = state.repos.payments.list(&filter, page).await?;
    Ok(Json(Paginated::from_page(result, page)))
}
