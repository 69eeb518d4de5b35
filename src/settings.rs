use crate::error::{Result, SentryError};
use crate::server::AppState;
use crate::storage::JsonFileStore;
use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info};

/// Persisted notification settings document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationSettings {
    #[serde(default)]
    pub notifications_enabled: bool,
}

/// In-memory notification flag backed by a JSON file.
///
/// The debouncer reads the flag at dispatch time through
/// [`SettingsStore::enabled_fn`], so changes apply to already pending
/// messages as well.
pub struct SettingsStore {
    enabled: Arc<AtomicBool>,
    file: JsonFileStore,
}

impl SettingsStore {
    /// Load settings from `file`, defaulting to disabled.
    pub fn load(file: JsonFileStore) -> Self {
        let settings: NotificationSettings = file.load_or_default();
        info!(
            enabled = settings.notifications_enabled,
            "Notification settings loaded"
        );
        Self {
            enabled: Arc::new(AtomicBool::new(settings.notifications_enabled)),
            file,
        }
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// Change the flag and persist it.
    ///
    /// The in-memory flag changes even when persistence fails.
    ///
    /// # Errors
    ///
    /// Returns `SentryError::Persistence` if the settings file cannot be written
    pub fn set_enabled(&self, enabled: bool) -> Result<()> {
        self.enabled.store(enabled, Ordering::SeqCst);
        self.file.write(&NotificationSettings {
            notifications_enabled: enabled,
        })
    }

    /// Predicate for [`crate::notifier::Debouncer`].
    #[must_use]
    pub fn enabled_fn(&self) -> crate::notifier::EnabledFn {
        let enabled = Arc::clone(&self.enabled);
        Arc::new(move || enabled.load(Ordering::SeqCst))
    }
}

/// Body returned by both notification endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct NotificationToggle {
    pub enabled: bool,
}

/// `GET /notifications`
pub async fn get_notifications(State(state): State<Arc<AppState>>) -> Json<NotificationToggle> {
    Json(NotificationToggle {
        enabled: state.settings.is_enabled(),
    })
}

/// `POST /notifications` with `{"enabled": bool}`
///
/// # Errors
///
/// Returns `SentryError::Validation` (400) when the body is not JSON or
/// `enabled` is missing or not a boolean
pub async fn set_notifications(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<Value>, JsonRejection>,
) -> Result<Json<NotificationToggle>> {
    let enabled = match payload {
        Ok(Json(body)) => body.get("enabled").and_then(Value::as_bool),
        Err(rejection) => {
            debug!("Rejected notification settings body: {rejection}");
            None
        }
    };
    let Some(enabled) = enabled else {
        return Err(SentryError::Validation(
            "enabled must be a boolean value.".to_string(),
        ));
    };

    if let Err(e) = state.settings.set_enabled(enabled) {
        error!("Failed to save notification settings: {e}");
    }
    info!(enabled, "Notifications toggled");

    Ok(Json(NotificationToggle {
        enabled: state.settings.is_enabled(),
    }))
}
