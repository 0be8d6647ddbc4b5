//! Shuttlebus backend core — web push notification delivery.
//!
//! This crate is the notification heart of the campus shuttle reservation
//! backend: when a route opens for booking, it encrypts a payload per
//! subscriber, signs a VAPID token per relay, dispatches the messages,
//! and tells the caller which subscriptions are dead.
//!
//! # Architecture
//!
//! - **`notifications`** — the delivery pipeline: VAPID keys and token
//!   signing, RFC 8291 content encryption, relay dispatch, fan-out
//! - **`service`** — the store-owning caller: picks subscribed users,
//!   triggers the fan-out, prunes stale subscriptions
//! - **`store`** — capability interface over the external record store
//! - **`config`** — environment configuration; missing key material
//!   degrades to send-disabled, never crashes
//!
//! The CRUD handlers for routes, users, and bookings live in a separate
//! service and talk to this core through [`NotificationService`].

pub mod config;
pub mod notifications;
pub mod service;
pub mod store;

// Re-export commonly used types
pub use config::Config;
pub use notifications::error::PushError;
pub use notifications::payload::NotificationPayload;
pub use notifications::push::{
    BroadcastSummary, DeliveryOutcome, PushSubscription, SubscriptionKeys, WebPushClient,
};
pub use notifications::vapid::{VapidKeys, VapidSigner};
pub use service::{NotificationService, RouteInfo};
pub use store::{MemoryStore, Record, RecordStore, StoreError};
