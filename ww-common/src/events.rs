//! Event system for WasteWise
//!
//! Provides the marketplace event definitions and the EventBus that carries
//! them to SSE subscribers. The bus doubles as the process-wide channel on
//! which failed optimistic writes are reported.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Marketplace events
///
/// Emitted when a write is issued (optimistically), not when it lands.
/// A later `WriteFailed` for the same path means the assumed state never
/// reached the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum MarketEvent {
    /// Seller submitted a device for collection
    DeviceSubmitted {
        device_id: String,
        user_id: String,
        timestamp: DateTime<Utc>,
    },

    /// Delivery partner accepted a pending device
    CollectionAccepted {
        request_id: String,
        device_id: String,
        delivery_partner_id: String,
        timestamp: DateTime<Utc>,
    },

    /// Device picked up; request and device both collected
    DeviceCollected {
        request_id: String,
        device_id: String,
        timestamp: DateTime<Utc>,
    },

    /// Recycling agency listed a salvaged part
    PartListed {
        part_id: String,
        recycling_agency_id: String,
        price: f64,
        timestamp: DateTime<Utc>,
    },

    /// Buyer purchased a part
    PartPurchased {
        sale_id: String,
        part_id: String,
        buyer_id: String,
        sale_price: f64,
        commission_amount: f64,
        timestamp: DateTime<Utc>,
    },

    /// Partner took a sale out for delivery
    DeliveryAccepted {
        sale_id: String,
        delivery_partner_id: String,
        timestamp: DateTime<Utc>,
    },

    /// Partner completed a delivery
    PartDelivered {
        sale_id: String,
        delivery_partner_id: String,
        timestamp: DateTime<Utc>,
    },

    /// An optimistic write was rejected by the store
    WriteFailed {
        path: String,
        message: String,
        timestamp: DateTime<Utc>,
    },
}

impl MarketEvent {
    /// SSE event name
    pub fn event_type(&self) -> &'static str {
        match self {
            MarketEvent::DeviceSubmitted { .. } => "DeviceSubmitted",
            MarketEvent::CollectionAccepted { .. } => "CollectionAccepted",
            MarketEvent::DeviceCollected { .. } => "DeviceCollected",
            MarketEvent::PartListed { .. } => "PartListed",
            MarketEvent::PartPurchased { .. } => "PartPurchased",
            MarketEvent::DeliveryAccepted { .. } => "DeliveryAccepted",
            MarketEvent::PartDelivered { .. } => "PartDelivered",
            MarketEvent::WriteFailed { .. } => "WriteFailed",
        }
    }
}

// ========================================
// EventBus Implementation
// ========================================

/// Central event distribution bus for application-wide events
///
/// The EventBus uses tokio::broadcast internally, providing:
/// - Non-blocking publish (slow subscribers don't block producers)
/// - Multiple concurrent subscribers
/// - Lagged message detection for slow subscribers
///
/// # Examples
///
/// ```
/// use ww_common::events::{EventBus, MarketEvent};
///
/// let event_bus = EventBus::new(100);
/// let mut rx = event_bus.subscribe();
///
/// event_bus.emit_lossy(MarketEvent::WriteFailed {
///     path: "part_sales/s1".to_string(),
///     message: "database is locked".to_string(),
///     timestamp: chrono::Utc::now(),
/// });
///
/// assert!(rx.try_recv().is_ok());
/// ```
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<MarketEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus buffering up to `capacity` events per subscriber
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<MarketEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)`, or `Err` if nobody is listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: MarketEvent,
    ) -> Result<usize, broadcast::error::SendError<MarketEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: MarketEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
