//! Time-driven transitions. Each pass is one scan of the store followed by
//! independent compare-and-set writes, so a pass cut short leaves every row
//! either fully transitioned or untouched, and repeating a pass at the same
//! instant changes nothing.

use crate::{
    model::{
        notification::Notification,
        reservation::{status::StatusTransition, Reservation},
    },
    notifier::Notifier,
    repository::reservation::ReservationRepository,
    service::{lifecycle::apply_transition, waitlist::WaitlistPromoter},
};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use derive_new::new;
use shared::error::{AppError, AppResult};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcilePolicy {
    /// How far ahead of the entry time visitors are asked to confirm.
    pub notify_ahead: Duration,
    /// How long a notified visitor has to confirm.
    pub confirmation_window: Duration,
}

impl Default for ReconcilePolicy {
    fn default() -> Self {
        Self {
            notify_ahead: Duration::hours(24),
            confirmation_window: Duration::hours(2),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub transitioned: usize,
    /// Rows that moved on between the scan and the write.
    pub conflicts: usize,
    pub failures: usize,
}

impl TickReport {
    fn record(&mut self, result: AppResult<bool>, reservation: &Reservation, pass: &str) {
        match result {
            Ok(true) => self.transitioned += 1,
            Ok(false) | Err(AppError::StateConflict(_)) => self.conflicts += 1,
            Err(e) => {
                self.failures += 1;
                tracing::error!(
                    pass,
                    reservation_id = %reservation.reservation_id,
                    error.cause_chain = ?e,
                    error.message = %e,
                    "reconciliation of a reservation failed"
                );
            }
        }
    }
}

#[async_trait]
pub trait ReconcilePass: Send + Sync {
    fn name(&self) -> &'static str;
    async fn run_once(&self, now: DateTime<Utc>) -> AppResult<TickReport>;
}

/// `WaitNotify` → `Notified` once the entry time is within `notify_ahead`.
#[derive(new, Clone)]
pub struct PreVisitNotifier {
    reservations: Arc<dyn ReservationRepository>,
    notifier: Arc<dyn Notifier>,
    policy: ReconcilePolicy,
}

#[async_trait]
impl ReconcilePass for PreVisitNotifier {
    fn name(&self) -> &'static str {
        "pre_visit_notifier"
    }

    async fn run_once(&self, now: DateTime<Utc>) -> AppResult<TickReport> {
        let due = self
            .reservations
            .list_pending_notification(now, now + self.policy.notify_ahead)
            .await?;

        let mut report = TickReport::default();
        for reservation in due {
            let result = apply_transition(
                self.reservations.as_ref(),
                &reservation,
                StatusTransition::Notify,
                now,
            )
            .await
            .map(|next| next.is_some());
            if matches!(result, Ok(true)) {
                self.notifier
                    .notify(
                        reservation.reservation_id,
                        Notification::visit_reminder(&reservation),
                    )
                    .await;
            }
            report.record(result, &reservation, self.name());
        }
        Ok(report)
    }
}

/// Cancels notifications left unconfirmed past the confirmation window and
/// offers the freed capacity to the waitlist.
#[derive(new, Clone)]
pub struct NotificationExpirer {
    reservations: Arc<dyn ReservationRepository>,
    promoter: WaitlistPromoter,
    policy: ReconcilePolicy,
}

#[async_trait]
impl ReconcilePass for NotificationExpirer {
    fn name(&self) -> &'static str {
        "notification_expirer"
    }

    async fn run_once(&self, now: DateTime<Utc>) -> AppResult<TickReport> {
        let notified_before = now - self.policy.confirmation_window;
        // A Notified reservation is cancelled only once its entry is within
        // 22h *and* its notification is at least 2h old, so a booking made at
        // short notice still gets the full confirmation window.
        let mut expired = self
            .reservations
            .list_expired_notified(
                now + self.policy.notify_ahead - self.policy.confirmation_window,
                notified_before,
            )
            .await?;
        expired.extend(
            self.reservations
                .list_expired_waitlist_notifications(notified_before)
                .await?,
        );

        let mut report = TickReport::default();
        for reservation in expired {
            let result = apply_transition(
                self.reservations.as_ref(),
                &reservation,
                StatusTransition::ExpireNotification,
                now,
            )
            .await
            .map(|next| next.is_some());
            if matches!(result, Ok(true)) {
                tracing::info!(
                    reservation_id = %reservation.reservation_id,
                    status = %reservation.status,
                    "unconfirmed reservation cancelled"
                );
                if let Err(e) = self.promoter.promote_vacated(&reservation, now).await {
                    tracing::warn!(
                        reservation_id = %reservation.reservation_id,
                        error.cause_chain = ?e,
                        error.message = %e,
                        "waitlist promotion after expiry failed"
                    );
                }
            }
            report.record(result, &reservation, self.name());
        }
        Ok(report)
    }
}

/// Dead-letters waitlist entries whose hour has come, and lapses confirmed
/// visits whose window ended without a check-in. Nothing is promoted.
#[derive(new, Clone)]
pub struct StaleWaitlistExpirer {
    reservations: Arc<dyn ReservationRepository>,
}

#[async_trait]
impl ReconcilePass for StaleWaitlistExpirer {
    fn name(&self) -> &'static str {
        "stale_waitlist_expirer"
    }

    async fn run_once(&self, now: DateTime<Utc>) -> AppResult<TickReport> {
        let stale = self.reservations.list_expired_waitlist(now).await?;
        let lapsed = self.reservations.list_lapsed(now).await?;

        let mut report = TickReport::default();
        let work = stale
            .into_iter()
            .map(|r| (r, StatusTransition::Discard))
            .chain(lapsed.into_iter().map(|r| (r, StatusTransition::Lapse)));
        for (reservation, transition) in work {
            let result = apply_transition(self.reservations.as_ref(), &reservation, transition, now)
                .await
                .map(|next| next.is_some());
            report.record(result, &reservation, self.name());
        }
        Ok(report)
    }
}
