use crate::adapters::auth::Authenticator;
use crate::adapters::credentials::{load_service_account, resolve_project_id};
use crate::adapters::firestore::FirestoreClient;
use crate::adapters::http::HttpFetcher;
use crate::adapters::realtime_db::RealtimeDbClient;
use crate::config::SourceSettings;
use crate::domain::model::{
    BatteryReading, Collection, HealthRecord, LocationFix, MotionSample, SourceFailure,
    TelemetrySnapshot, UltrasonicReading,
};
use crate::domain::ports::TelemetrySource;
use crate::utils::error::Result;
use async_trait::async_trait;

/// Pulls the Hat's telemetry from the Realtime Database and Firestore.
#[derive(Debug, Clone)]
pub struct FirebaseSource {
    realtime_db: RealtimeDbClient,
    firestore: FirestoreClient,
}

impl FirebaseSource {
    pub fn new(realtime_db: RealtimeDbClient, firestore: FirestoreClient) -> Self {
        Self {
            realtime_db,
            firestore,
        }
    }

    /// Resolves credentials and builds both clients. Fails when no project
    /// can be determined or the service account key cannot sign.
    pub fn connect(settings: &SourceSettings) -> Result<Self> {
        let account = load_service_account(&settings.credentials_env);
        let project_id = resolve_project_id(settings.project_id.as_deref(), account.as_ref())?;

        let fetcher = HttpFetcher::new(settings)?;
        let auth = Authenticator::select(settings.resolved_auth_token(), account.as_ref(), &fetcher)?;
        if matches!(auth, Authenticator::Anonymous) {
            tracing::warn!("No Firebase credentials configured, relying on open security rules");
        }

        let realtime_db =
            RealtimeDbClient::new(fetcher.clone(), &settings.database_url, auth.clone());
        let firestore = FirestoreClient::new(
            fetcher,
            &settings.firestore_base_url,
            &project_id,
            auth.clone(),
            settings.fetch_page_size,
        );

        tracing::info!(
            "Connected to Firebase project {} ({}, auth: {})",
            project_id,
            settings.database_url,
            auth.describe()
        );
        Ok(Self::new(realtime_db, firestore))
    }
}

fn settle<T>(
    collection: Collection,
    result: Result<Vec<T>>,
    failures: &mut Vec<SourceFailure>,
) -> Vec<T> {
    match result {
        Ok(records) => {
            tracing::debug!("Fetched {} records from {}", records.len(), collection);
            records
        }
        Err(e) => {
            tracing::warn!("Failed to fetch {}: {}", collection, e);
            failures.push(SourceFailure {
                collection,
                message: e.to_string(),
            });
            Vec::new()
        }
    }
}

#[async_trait]
impl TelemetrySource for FirebaseSource {
    async fn fetch_snapshot(&self) -> Result<TelemetrySnapshot> {
        let (detections, locations, ultrasonic, battery, motion, system_health) = tokio::join!(
            self.realtime_db
                .fetch_detections(Collection::Detections.remote_name()),
            self.firestore
                .fetch_collection::<LocationFix>(Collection::Locations.remote_name()),
            self.firestore
                .fetch_collection::<UltrasonicReading>(Collection::Ultrasonic.remote_name()),
            self.firestore
                .fetch_collection::<BatteryReading>(Collection::Battery.remote_name()),
            self.firestore
                .fetch_collection::<MotionSample>(Collection::Motion.remote_name()),
            self.firestore
                .fetch_collection::<HealthRecord>(Collection::SystemHealth.remote_name()),
        );

        let mut failures = Vec::new();
        let mut snapshot = TelemetrySnapshot {
            connected: true,
            detections: settle(Collection::Detections, detections, &mut failures),
            locations: settle(Collection::Locations, locations, &mut failures),
            ultrasonic: settle(Collection::Ultrasonic, ultrasonic, &mut failures),
            battery: settle(Collection::Battery, battery, &mut failures),
            motion: settle(Collection::Motion, motion, &mut failures),
            system_health: settle(Collection::SystemHealth, system_health, &mut failures),
            failures: Vec::new(),
        };
        snapshot.failures = failures;
        snapshot.sort_chronologically();

        Ok(snapshot)
    }

    fn is_connected(&self) -> bool {
        true
    }
}

/// Stand-in used when credentials could not be loaded; always empty.
#[derive(Debug, Clone, Default)]
pub struct DisconnectedSource;

#[async_trait]
impl TelemetrySource for DisconnectedSource {
    async fn fetch_snapshot(&self) -> Result<TelemetrySnapshot> {
        Ok(TelemetrySnapshot::disconnected())
    }

    fn is_connected(&self) -> bool {
        false
    }
}

/// Connects to Firebase, falling back to a [`DisconnectedSource`] so the
/// dashboard keeps serving its empty state.
pub fn connect_or_disconnected(settings: &SourceSettings) -> Box<dyn TelemetrySource> {
    match FirebaseSource::connect(settings) {
        Ok(source) => Box::new(source),
        Err(e) => {
            tracing::error!("Error initializing Firebase: {}", e);
            tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
            Box::new(DisconnectedSource)
        }
    }
}

#[async_trait]
impl<T: TelemetrySource + ?Sized> TelemetrySource for Box<T> {
    async fn fetch_snapshot(&self) -> Result<TelemetrySnapshot> {
        (**self).fetch_snapshot().await
    }

    fn is_connected(&self) -> bool {
        (**self).is_connected()
    }
}
