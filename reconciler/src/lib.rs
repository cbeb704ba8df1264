//! Runs the reconciliation passes in the background, one ticker per pass.

use chrono::Utc;
use kernel::service::reconcile::ReconcilePass;
use registry::AppRegistry;
use std::{sync::Arc, time::Duration};
use tokio::{
    task::JoinHandle,
    time::{interval, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

pub struct ReconcilerSupervisor {
    token: CancellationToken,
    handles: Vec<JoinHandle<()>>,
}

impl ReconcilerSupervisor {
    pub fn start(registry: &AppRegistry) -> Self {
        Self::spawn(
            registry.reconcile_passes(),
            registry.reconciler_config().tick_interval,
        )
    }

    pub fn spawn(passes: Vec<Arc<dyn ReconcilePass>>, tick_interval: Duration) -> Self {
        let token = CancellationToken::new();
        let handles = passes
            .into_iter()
            .map(|pass| tokio::spawn(run_pass(pass, tick_interval, token.child_token())))
            .collect();
        tracing::info!(?tick_interval, "reconciler started");
        Self { token, handles }
    }

    /// Stops every loop and waits for ticks already underway to finish.
    pub async fn shutdown(self) {
        self.token.cancel();
        for handle in self.handles {
            if let Err(e) = handle.await {
                tracing::error!(error.message = %e, "reconcile loop ended abnormally");
            }
        }
        tracing::info!("reconciler stopped");
    }
}

async fn run_pass(pass: Arc<dyn ReconcilePass>, period: Duration, token: CancellationToken) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => break,
            _ = ticker.tick() => {}
        }

        match pass.run_once(Utc::now()).await {
            Ok(report) if report.transitioned > 0 || report.failures > 0 => tracing::info!(
                pass = pass.name(),
                transitioned = report.transitioned,
                conflicts = report.conflicts,
                failures = report.failures,
                "reconcile tick finished"
            ),
            Ok(report) => tracing::debug!(
                pass = pass.name(),
                conflicts = report.conflicts,
                "reconcile tick finished"
            ),
            Err(e) => tracing::error!(
                pass = pass.name(),
                error.cause_chain = ?e,
                error.message = %e,
                "reconcile tick failed"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{DateTime, Duration as ChronoDuration};
    use kernel::{
        model::{
            id::{ParkId, ReservationId},
            park::Park,
            reservation::{
                price::VisitorType, status::ReservationStatus, Reservation, Visitor,
            },
        },
        notifier::MockNotifier,
        repository::memory::InMemoryStore,
        service::reconcile::TickReport,
    };
    use shared::error::{AppError, AppResult};
    use std::sync::atomic::{AtomicUsize, Ordering};

    const TICK: Duration = Duration::from_secs(30);

    #[derive(Default)]
    struct CountingPass {
        runs: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl ReconcilePass for CountingPass {
        fn name(&self) -> &'static str {
            "counting"
        }

        async fn run_once(&self, _now: DateTime<Utc>) -> AppResult<TickReport> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(AppError::ExternalServiceError("store unavailable".into()));
            }
            Ok(TickReport::default())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn each_pass_runs_once_per_tick_until_shutdown() {
        let a = Arc::new(CountingPass::default());
        let b = Arc::new(CountingPass::default());
        let supervisor = ReconcilerSupervisor::spawn(vec![a.clone(), b.clone()], TICK);

        tokio::time::sleep(TICK * 2 + Duration::from_secs(1)).await;
        supervisor.shutdown().await;

        assert_eq!(a.runs.load(Ordering::SeqCst), 3);
        assert_eq!(b.runs.load(Ordering::SeqCst), 3);

        tokio::time::sleep(TICK * 4).await;
        assert_eq!(a.runs.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn a_failing_tick_does_not_stop_the_loop() {
        let failing = Arc::new(CountingPass {
            runs: AtomicUsize::new(0),
            fail: true,
        });
        let supervisor = ReconcilerSupervisor::spawn(vec![failing.clone()], TICK);

        tokio::time::sleep(TICK * 3 + Duration::from_secs(1)).await;
        supervisor.shutdown().await;

        assert_eq!(failing.runs.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn registry_passes_sweep_elapsed_waitlist_entries() {
        let store = InMemoryStore::new();
        let park = Park {
            park_id: ParkId::new(),
            park_name: "Banias".into(),
            max_capacity: 10,
            reserved_capacity: 0,
            estimated_stay_hours: 1,
            current_visitors: 0,
            unit_price: 3_000,
        };
        store.add_park(park.clone()).await;
        let hour_ago = Utc::now() - ChronoDuration::hours(1);
        let stale = Reservation {
            reservation_id: ReservationId::new(),
            park_id: park.park_id,
            visitor: Visitor {
                visitor_id: "visitor-1".into(),
                email: "visitor@example.com".into(),
                phone: None,
            },
            visitor_type: VisitorType::Individual,
            party_size: 2,
            entry_time: hour_ago,
            exit_time: hour_ago + ChronoDuration::hours(1),
            price: 5_100,
            paid: false,
            status: ReservationStatus::InWaitlist,
            status_changed_at: hour_ago - ChronoDuration::days(1),
            created_at: hour_ago - ChronoDuration::days(1),
        };
        store.seed(stale.clone(), Some(stale.created_at)).await;

        let registry = AppRegistry::from_parts(
            Arc::new(kernel::repository::health::MockHealthCheckRepository::new()),
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Arc::new(MockNotifier::new()),
        );
        let supervisor = ReconcilerSupervisor::start(&registry);
        // The first tick of every ticker fires immediately.
        for _ in 0..50 {
            if store.reservation(stale.reservation_id).await.map(|r| r.status)
                == Some(ReservationStatus::Irrelevant)
            {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        supervisor.shutdown().await;

        assert_eq!(
            store.reservation(stale.reservation_id).await.unwrap().status,
            ReservationStatus::Irrelevant
        );
    }
}
