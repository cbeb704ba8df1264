use std::{sync::Arc, time::Duration};

use adapter::{
    database::ConnectionPool,
    notification::{TracingNotifier, WebhookNotifier},
    repository::{
        health::HealthCheckRepositoryImpl, park::ParkRepositoryImpl,
        reservation::ReservationRepositoryImpl,
    },
};
use kernel::{
    notifier::Notifier,
    repository::{
        health::HealthCheckRepository, park::ParkRepository,
        reservation::ReservationRepository,
    },
    service::{
        admission::AdmissionController,
        lifecycle::LifecycleService,
        occupancy::CapacityOracle,
        reconcile::{
            NotificationExpirer, PreVisitNotifier, ReconcilePass, ReconcilePolicy,
            StaleWaitlistExpirer,
        },
        waitlist::WaitlistPromoter,
    },
};
use shared::config::{AdmissionConfig, AppConfig, NotificationConfig, ReconcilerConfig};

const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone)]
pub struct AppRegistry {
    health_check_repository: Arc<dyn HealthCheckRepository>,
    park_repository: Arc<dyn ParkRepository>,
    reservation_repository: Arc<dyn ReservationRepository>,
    notifier: Arc<dyn Notifier>,
    admission_config: AdmissionConfig,
    reconciler_config: ReconcilerConfig,
}

impl AppRegistry {
    pub fn new(pool: ConnectionPool, app_config: AppConfig) -> Self {
        let health_check_repository = Arc::new(HealthCheckRepositoryImpl::new(pool.clone()));
        let park_repository = Arc::new(ParkRepositoryImpl::new(pool.clone()));
        let reservation_repository = Arc::new(ReservationRepositoryImpl::new(pool.clone()));
        let notifier = build_notifier(&app_config.notification);
        Self {
            health_check_repository,
            park_repository,
            reservation_repository,
            notifier,
            admission_config: app_config.admission,
            reconciler_config: app_config.reconciler,
        }
    }

    /// Wires the services over caller-supplied stores, with default settings.
    pub fn from_parts(
        health_check_repository: Arc<dyn HealthCheckRepository>,
        park_repository: Arc<dyn ParkRepository>,
        reservation_repository: Arc<dyn ReservationRepository>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            health_check_repository,
            park_repository,
            reservation_repository,
            notifier,
            admission_config: AdmissionConfig::default(),
            reconciler_config: ReconcilerConfig::default(),
        }
    }

    pub fn health_check_repository(&self) -> Arc<dyn HealthCheckRepository> {
        self.health_check_repository.clone()
    }

    pub fn capacity_oracle(&self) -> CapacityOracle {
        CapacityOracle::new(
            self.park_repository.clone(),
            self.reservation_repository.clone(),
        )
    }

    pub fn waitlist_promoter(&self) -> WaitlistPromoter {
        WaitlistPromoter::new(
            self.park_repository.clone(),
            self.reservation_repository.clone(),
            self.notifier.clone(),
        )
    }

    pub fn admission_controller(&self) -> AdmissionController {
        AdmissionController::new(
            self.park_repository.clone(),
            self.reservation_repository.clone(),
            self.waitlist_promoter(),
        )
    }

    pub fn lifecycle_service(&self) -> LifecycleService {
        LifecycleService::new(
            self.park_repository.clone(),
            self.reservation_repository.clone(),
            self.waitlist_promoter(),
        )
    }

    pub fn reconcile_passes(&self) -> Vec<Arc<dyn ReconcilePass>> {
        let policy = ReconcilePolicy::default();
        vec![
            Arc::new(PreVisitNotifier::new(
                self.reservation_repository.clone(),
                self.notifier.clone(),
                policy,
            )),
            Arc::new(NotificationExpirer::new(
                self.reservation_repository.clone(),
                self.waitlist_promoter(),
                policy,
            )),
            Arc::new(StaleWaitlistExpirer::new(self.reservation_repository.clone())),
        ]
    }

    pub fn admission_config(&self) -> &AdmissionConfig {
        &self.admission_config
    }

    pub fn reconciler_config(&self) -> &ReconcilerConfig {
        &self.reconciler_config
    }
}

fn build_notifier(config: &NotificationConfig) -> Arc<dyn Notifier> {
    let Some(url) = config.webhook_url.clone() else {
        return Arc::new(TracingNotifier);
    };
    match reqwest::Client::builder().timeout(WEBHOOK_TIMEOUT).build() {
        Ok(client) => Arc::new(WebhookNotifier::new(client, url)),
        Err(e) => {
            tracing::warn!(
                error.message = %e,
                "could not build the notification client, falling back to logging"
            );
            Arc::new(TracingNotifier)
        }
    }
}
