use async_trait::async_trait;
use derive_new::new;
use kernel::{
    model::{id::ReservationId, notification::Notification},
    notifier::Notifier,
};
use reqwest::Client;
use serde::Serialize;
use shared::error::{AppError, AppResult};

/// Writes notifications to the log. Used when no delivery endpoint is set.
#[derive(Default)]
pub struct TracingNotifier;

#[async_trait]
impl Notifier for TracingNotifier {
    async fn notify(&self, reservation_id: ReservationId, notification: Notification) {
        tracing::info!(
            %reservation_id,
            kind = ?notification.kind,
            recipient = %notification.recipient,
            entry_time = %notification.entry_time,
            message = %notification.message,
            "notification issued"
        );
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WebhookPayload<'a> {
    reservation_id: ReservationId,
    #[serde(flatten)]
    notification: &'a Notification,
}

/// Posts each notification as JSON to a delivery service. Failures are
/// logged and never reach the caller.
#[derive(new)]
pub struct WebhookNotifier {
    client: Client,
    url: String,
}

impl WebhookNotifier {
    async fn send(&self, reservation_id: ReservationId, notification: &Notification) -> AppResult<()> {
        let res = self
            .client
            .post(&self.url)
            .json(&WebhookPayload {
                reservation_id,
                notification,
            })
            .send()
            .await
            .map_err(|e| AppError::ExternalServiceError(e.to_string()))?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(AppError::ExternalServiceError(format!(
                "notification endpoint answered {status}: {body}"
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, reservation_id: ReservationId, notification: Notification) {
        match self.send(reservation_id, &notification).await {
            Ok(()) => tracing::info!(
                %reservation_id,
                kind = ?notification.kind,
                "notification delivered"
            ),
            Err(e) => tracing::warn!(
                %reservation_id,
                kind = ?notification.kind,
                error.message = %e,
                "notification delivery failed"
            ),
        }
    }
}
