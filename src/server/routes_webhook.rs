use crate::classifier::format;
use crate::emby::types::UNKNOWN;
use crate::emby::WebhookPayload;
use crate::server::AppContext;
use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
};
use serde::Deserialize;

/// Form-encoded webhook bodies wrap the JSON document under a `data` key.
#[derive(Deserialize)]
struct FormEnvelope {
    data: String,
}

/// Entry point for Emby's webhook plugin.
///
/// Replies 200 as soon as the payload is understood; the actual
/// classification runs in a spawned task so Emby never waits on Telegram
/// or on metadata polling.
pub async fn handle_webhook(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let payload = parse_payload(&headers, &body)?;

    if payload.is_test_notification() {
        let server_name = payload
            .server
            .as_ref()
            .and_then(|s| s.name.as_deref())
            .unwrap_or(UNKNOWN);
        let version = payload
            .server
            .as_ref()
            .and_then(|s| s.version.as_deref())
            .unwrap_or(UNKNOWN);

        let message = format::test_message(server_name, version);
        if let Err(e) = ctx.notifier.send(&message, None).await {
            tracing::error!("Failed to send test notification: {}", e);
        }

        return Ok("OK");
    }

    let item_id = payload
        .item
        .as_ref()
        .and_then(|item| item.id.clone())
        .ok_or_else(|| {
            (
                StatusCode::BAD_REQUEST,
                "Missing Item.Id in payload".to_string(),
            )
        })?;

    if !ctx.in_flight.try_begin(&item_id) {
        tracing::info!("Item {} is already being processed", item_id);
        return Ok("OK");
    }

    let classifier = ctx.classifier.clone();
    let in_flight = ctx.in_flight.clone();
    tokio::spawn(async move {
        match classifier.classify(&item_id).await {
            Ok(outcome) => tracing::info!("Item {}: {}", item_id, outcome),
            Err(e) => tracing::error!("Failed to classify item {}: {}", item_id, e),
        }
        in_flight.finish(&item_id);
    });

    Ok("OK")
}

/// Decode either webhook body shape into a payload.
///
/// Emby sends `application/x-www-form-urlencoded` with the JSON under
/// `data` from its plugin, and raw JSON from newer server builds.
fn parse_payload(
    headers: &HeaderMap,
    body: &Bytes,
) -> Result<WebhookPayload, (StatusCode, String)> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    if content_type.starts_with("application/x-www-form-urlencoded") {
        let form: FormEnvelope = serde_urlencoded::from_bytes(body)
            .map_err(|e| (StatusCode::BAD_REQUEST, format!("Invalid form payload: {}", e)))?;

        serde_json::from_str(&form.data)
            .map_err(|e| (StatusCode::BAD_REQUEST, format!("Invalid JSON payload: {}", e)))
    } else {
        serde_json::from_slice(body)
            .map_err(|e| (StatusCode::BAD_REQUEST, format!("Invalid JSON payload: {}", e)))
    }
}
