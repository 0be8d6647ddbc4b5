//! Store-backed notification service.
//!
//! The layer between the reservation backend's triggers ("a route opened
//! for booking", "admin sent a test alert") and the push fan-out. It owns
//! the store interaction the fan-out itself deliberately avoids: reading
//! subscribed users, and clearing the subscriptions the relay declared
//! dead.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::notifications::payload::NotificationPayload;
use crate::notifications::push::{BroadcastSummary, PushSubscription, WebPushClient};
use crate::store::{Record, RecordStore};

/// Table holding user records, including the `push_subscription` and
/// `notification_enabled` columns.
const USERS_TABLE: &str = "users";

/// The route fields announced when booking opens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteInfo {
    /// Display name of the route.
    pub route_name: String,
    /// Departure time as shown to riders.
    pub departure_time: String,
    /// Seats still available when booking opened.
    pub available_seats: u32,
}

/// Fans notifications out to subscribed users and prunes dead
/// subscriptions from the store.
pub struct NotificationService {
    store: Arc<dyn RecordStore>,
    push: WebPushClient,
}

impl NotificationService {
    /// Build the service over a record store and a push client.
    pub fn new(store: Arc<dyn RecordStore>, push: WebPushClient) -> Self {
        Self { store, push }
    }

    /// Notify every user with notifications enabled and a stored push
    /// subscription.
    ///
    /// With no signing key configured this is a no-op returning a zero
    /// summary — booking flows must not fail because push is unconfigured.
    /// After the fan-out, the `push_subscription` column of every stale
    /// recipient is cleared. Partial delivery failure is reported in the
    /// summary, never as an error.
    pub async fn notify_all_users(
        &self,
        title: &str,
        body: &str,
        data: Option<HashMap<String, String>>,
    ) -> Result<BroadcastSummary> {
        if !self.push.signer().is_available() {
            log::warn!("[Notify] push delivery disabled (no VAPID private key); skipping broadcast");
            return Ok(BroadcastSummary::default());
        }

        let users = self
            .store
            .filter_equals(USERS_TABLE, "notification_enabled", &Value::Bool(true))
            .await
            .context("querying notification-enabled users")?;

        let mut subscriptions = Vec::new();
        let mut student_ids = Vec::new();
        for user in &users {
            let Some(student_id) = user.get("student_id").and_then(Value::as_str) else {
                continue;
            };
            if let Some(subscription) = parse_subscription(user.get("push_subscription")) {
                subscriptions.push(subscription);
                student_ids.push(student_id.to_string());
            }
        }

        if subscriptions.is_empty() {
            log::info!("[Notify] no subscribed users to notify");
            return Ok(BroadcastSummary::default());
        }

        log::info!("[Notify] sending \"{title}\" to {} subscribers", subscriptions.len());
        let summary = self
            .push
            .broadcast(&subscriptions, title, body, data)
            .await
            .context("push broadcast failed")?;

        // The fan-out only reports stale indices; clearing them is ours
        for &index in &summary.stale_indices {
            let student_id = &student_ids[index];
            let mut patch = Record::new();
            patch.insert("push_subscription".to_string(), Value::Null);
            match self.store.update_by_key(USERS_TABLE, student_id, patch).await {
                Ok(()) => log::info!("[Notify] cleared stale subscription for {student_id}"),
                Err(e) => {
                    log::error!("[Notify] failed to clear stale subscription for {student_id}: {e}");
                }
            }
        }

        Ok(summary)
    }

    /// Announce that a route has opened for booking.
    pub async fn announce_route_open(&self, route: &RouteInfo) -> Result<BroadcastSummary> {
        let body = format!(
            "{} is open for booking! Departure: {}, seats left: {}",
            route.route_name, route.departure_time, route.available_seats
        );
        let mut data = HashMap::new();
        data.insert("route_name".to_string(), route.route_name.clone());
        data.insert("departure_time".to_string(), route.departure_time.clone());
        self.notify_all_users("Shuttle booking open!", &body, Some(data)).await
    }

    /// Store a user's push subscription and enable notifications.
    pub async fn register_subscription(
        &self,
        student_id: &str,
        subscription: &PushSubscription,
    ) -> Result<()> {
        let mut patch = Record::new();
        patch.insert(
            "push_subscription".to_string(),
            Value::String(
                serde_json::to_string(subscription).context("serializing subscription")?,
            ),
        );
        patch.insert("notification_enabled".to_string(), Value::Bool(true));
        self.store
            .update_by_key(USERS_TABLE, student_id, patch)
            .await
            .with_context(|| format!("registering subscription for {student_id}"))?;
        log::info!("[Notify] subscription registered for {student_id}");
        Ok(())
    }

    /// Clear a user's push subscription and disable notifications.
    pub async fn unregister_subscription(&self, student_id: &str) -> Result<()> {
        let mut patch = Record::new();
        patch.insert("push_subscription".to_string(), Value::Null);
        patch.insert("notification_enabled".to_string(), Value::Bool(false));
        self.store
            .update_by_key(USERS_TABLE, student_id, patch)
            .await
            .with_context(|| format!("unregistering subscription for {student_id}"))?;
        log::info!("[Notify] subscription removed for {student_id}");
        Ok(())
    }

    /// Send a test notification to one user's stored subscription.
    pub async fn send_test_notification(
        &self,
        student_id: &str,
        title: &str,
        body: &str,
    ) -> Result<()> {
        let user = self
            .store
            .get_by_key(USERS_TABLE, student_id)
            .await
            .context("loading user record")?
            .ok_or_else(|| anyhow!("user {student_id} not found"))?;

        let subscription = parse_subscription(user.get("push_subscription"))
            .ok_or_else(|| anyhow!("user {student_id} has no push subscription"))?;

        let payload = NotificationPayload::new(title, body, None);
        self.push
            .send_one(&subscription, &payload)
            .await
            .with_context(|| format!("test notification to {student_id}"))
    }
}

impl fmt::Debug for NotificationService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotificationService")
            .field("push", &self.push)
            .finish_non_exhaustive()
    }
}

/// Parse the `push_subscription` column, which holds either a JSON string
/// (how the CRUD layer writes it) or an already-structured object.
fn parse_subscription(value: Option<&Value>) -> Option<PushSubscription> {
    let parsed = match value? {
        Value::String(text) => serde_json::from_str(text),
        object @ Value::Object(_) => serde_json::from_value(object.clone()),
        _ => return None,
    };
    match parsed {
        Ok(subscription) => Some(subscription),
        Err(e) => {
            log::error!("[Notify] unparseable push subscription: {e}");
            None
        }
    }
}
