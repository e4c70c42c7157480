//! Device and part status state machine
//!
//! Pure planning functions: given an actor, the current entity snapshot and
//! an action, produce the next entity state plus the writes that carry it to
//! the document store. Nothing here touches the store; ids and timestamps
//! are supplied by the caller so every plan is deterministic.
//!
//! Transitions:
//!
//! | Entity            | From                  | Action             | To                     |
//! |-------------------|-----------------------|--------------------|------------------------|
//! | DeviceSubmission  | (none)                | seller submits     | pending                |
//! | DeviceSubmission  | (none)/pending        | partner accepts    | collection-in-progress |
//! | CollectionRequest | accepted              | partner collects   | collected (+ device)   |
//! | RecycledPart      | (none)                | agency lists       | -                      |
//! | PartSale          | (none)                | buyer purchases    | purchased              |
//! | PartSale          | purchased             | partner accepts    | out-for-delivery       |
//! | PartSale          | out-for-delivery      | partner delivers   | delivered              |
//!
//! There is no locking: two partners accepting the same pending device both
//! get a valid plan and the last write wins on the device status.

use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use thiserror::Error;

use crate::image::DataUri;
use crate::models::{
    CollectionRequest, CollectionStatus, DeliveryPartnerTransaction, DeviceStatus,
    DeviceSubmission, Entity, Fields, PartSale, RecycledPart, SaleStatus,
};
use crate::paths::{self, DocPath};

/// Fixed marketplace commission on every part sale
pub const COMMISSION_RATE: f64 = 0.10;

/// Ledger entry type recorded when a partner accepts a collection
pub const SERVICE_FEE_TRANSACTION: &str = "service-fee";

/// Reasons an action is rejected before any write is attempted
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransitionError {
    #[error("Authentication required")]
    Unauthenticated,

    /// Selected item (device, request, part, sale) is absent
    #[error("Referenced {0} not found")]
    MissingReference(&'static str),

    /// Entity is not in the state the action starts from
    #[error("Cannot {action} a {entity} in status '{status}'")]
    InvalidState {
        entity: &'static str,
        action: &'static str,
        status: &'static str,
    },

    /// Action reserved for the partner the work was assigned to
    #[error("{0} is assigned to another delivery partner")]
    NotAssigned(&'static str),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Could not encode document: {0}")]
    Encoding(String),
}

/// Fee amounts applied when a partner accepts a collection
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeeSchedule {
    /// `paymentAmount` recorded on the collection request
    pub collection_payment: f64,
    /// Service fee charged to the partner's ledger
    pub service_fee: f64,
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self {
            collection_payment: 500.0,
            service_fee: 20.0,
        }
    }
}

/// Commission charged on a sale, fixed at creation
pub fn commission_for(sale_price: f64) -> f64 {
    sale_price * COMMISSION_RATE
}

/// A single store write produced by a plan
#[derive(Debug, Clone, PartialEq)]
pub enum PlannedWrite {
    /// Create a document with the given fields
    Create { path: DocPath, fields: Fields },
    /// Merge fields into an existing document
    Update { path: DocPath, fields: Fields },
}

impl PlannedWrite {
    pub fn path(&self) -> &DocPath {
        match self {
            PlannedWrite::Create { path, .. } | PlannedWrite::Update { path, .. } => path,
        }
    }
}

/// Independent, unordered writes. No multi-document atomicity.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Plan {
    pub writes: Vec<PlannedWrite>,
}

impl Plan {
    fn create(mut self, path: DocPath, entity: &impl Entity) -> Result<Self, TransitionError> {
        let fields = entity
            .to_fields()
            .map_err(|e| TransitionError::Encoding(e.to_string()))?;
        self.writes.push(PlannedWrite::Create { path, fields });
        Ok(self)
    }

    fn update(mut self, path: DocPath, fields: Value) -> Self {
        let fields = match fields {
            Value::Object(map) => map,
            _ => Fields::new(),
        };
        self.writes.push(PlannedWrite::Update { path, fields });
        self
    }
}

/// Who is acting, and when
#[derive(Debug, Clone, Copy)]
pub struct ActionContext<'a> {
    pub actor: Option<&'a str>,
    pub now: DateTime<Utc>,
}

impl<'a> ActionContext<'a> {
    pub fn new(actor: Option<&'a str>, now: DateTime<Utc>) -> Self {
        Self { actor, now }
    }

    fn require_actor(&self) -> Result<&'a str, TransitionError> {
        match self.actor {
            Some(actor) if !actor.is_empty() => Ok(actor),
            _ => Err(TransitionError::Unauthenticated),
        }
    }
}

fn path_error(e: crate::Error) -> TransitionError {
    TransitionError::Validation(e.to_string())
}

/// Seller input for a device submission
#[derive(Debug, Clone)]
pub struct DeviceDraft {
    pub photo: Option<DataUri>,
    pub device_details: String,
}

/// Agency input for a part listing
#[derive(Debug, Clone)]
pub struct PartDraft {
    pub photo: Option<DataUri>,
    pub name: String,
    pub details: String,
    pub price: Option<f64>,
}

/// Result of planning an action that creates an entity
#[derive(Debug, Clone)]
pub struct Planned<T> {
    pub entity: T,
    pub plan: Plan,
}

/// Result of a partner accepting a device for collection
#[derive(Debug, Clone)]
pub struct AcceptedCollection {
    pub request: CollectionRequest,
    pub transaction: DeliveryPartnerTransaction,
    pub device: DeviceSubmission,
    pub plan: Plan,
}

// ========================================
// Device collection
// ========================================

/// Seller submits a device; it starts `pending`
pub fn submit_device(
    ctx: ActionContext<'_>,
    draft: DeviceDraft,
    device_id: &str,
) -> Result<Planned<DeviceSubmission>, TransitionError> {
    let seller = ctx.require_actor()?;
    let photo = draft
        .photo
        .ok_or_else(|| TransitionError::Validation("a device photo is required".to_string()))?;
    let details = draft.device_details.trim();
    if details.is_empty() {
        return Err(TransitionError::Validation(
            "device details are required".to_string(),
        ));
    }

    let device = DeviceSubmission {
        id: device_id.to_string(),
        user_id: seller.to_string(),
        upload_date: ctx.now,
        photo_url: photo.to_string(),
        device_details: details.to_string(),
        status: Some(DeviceStatus::Pending),
    };
    let path = paths::device(seller, device_id).map_err(path_error)?;
    let plan = Plan::default().create(path, &device)?;
    Ok(Planned { entity: device, plan })
}

/// Partner accepts a pending device for collection.
///
/// Creates an `accepted` collection request and a service-fee ledger entry,
/// and moves the device to `collection-in-progress`.
pub fn accept_collection(
    ctx: ActionContext<'_>,
    device: Option<&DeviceSubmission>,
    fees: &FeeSchedule,
    request_id: &str,
    transaction_id: &str,
) -> Result<AcceptedCollection, TransitionError> {
    let partner = ctx.require_actor()?;
    let device = device.ok_or(TransitionError::MissingReference("device"))?;

    let status = device.effective_status();
    if status != DeviceStatus::Pending {
        return Err(TransitionError::InvalidState {
            entity: "device",
            action: "accept",
            status: status.as_str(),
        });
    }

    let request = CollectionRequest {
        id: request_id.to_string(),
        device_id: device.id.clone(),
        user_id: device.user_id.clone(),
        delivery_partner_id: partner.to_string(),
        request_date: ctx.now,
        status: CollectionStatus::Accepted,
        payment_amount: fees.collection_payment,
    };
    let transaction = DeliveryPartnerTransaction {
        id: transaction_id.to_string(),
        delivery_partner_id: partner.to_string(),
        transaction_date: ctx.now,
        transaction_type: SERVICE_FEE_TRANSACTION.to_string(),
        amount: fees.service_fee,
        collection_request_id: request_id.to_string(),
    };

    let device_path = paths::device(&device.user_id, &device.id).map_err(path_error)?;
    let request_path = paths::collection_requests()
        .doc(request_id)
        .map_err(path_error)?;
    let transaction_path = paths::delivery_partner_transactions()
        .doc(transaction_id)
        .map_err(path_error)?;

    let plan = Plan::default()
        .create(request_path, &request)?
        .update(
            device_path,
            json!({ "status": DeviceStatus::CollectionInProgress.as_str() }),
        )
        .create(transaction_path, &transaction)?;

    let mut device = device.clone();
    device.status = Some(DeviceStatus::CollectionInProgress);

    Ok(AcceptedCollection {
        request,
        transaction,
        device,
        plan,
    })
}

/// Assigned partner marks an accepted request collected; the referenced
/// device moves to `collected` as well.
pub fn mark_collected(
    ctx: ActionContext<'_>,
    request: Option<&CollectionRequest>,
) -> Result<Planned<CollectionRequest>, TransitionError> {
    let partner = ctx.require_actor()?;
    let request = request.ok_or(TransitionError::MissingReference("collection request"))?;

    if request.status != CollectionStatus::Accepted {
        return Err(TransitionError::InvalidState {
            entity: "collection request",
            action: "collect",
            status: request.status.as_str(),
        });
    }
    if request.delivery_partner_id != partner {
        return Err(TransitionError::NotAssigned("collection request"));
    }

    let device_path = paths::device(&request.user_id, &request.device_id).map_err(path_error)?;
    let request_path = paths::collection_requests()
        .doc(&request.id)
        .map_err(path_error)?;

    let plan = Plan::default()
        .update(
            device_path,
            json!({ "status": DeviceStatus::Collected.as_str() }),
        )
        .update(
            request_path,
            json!({ "status": CollectionStatus::Collected.as_str() }),
        );

    let mut request = request.clone();
    request.status = CollectionStatus::Collected;
    Ok(Planned {
        entity: request,
        plan,
    })
}

// ========================================
// Part listing and sales
// ========================================

/// Agency lists a salvaged part on the marketplace
pub fn list_part(
    ctx: ActionContext<'_>,
    draft: PartDraft,
    part_id: &str,
) -> Result<Planned<RecycledPart>, TransitionError> {
    let agency = ctx.require_actor()?;
    let photo = draft
        .photo
        .ok_or_else(|| TransitionError::Validation("a part photo is required".to_string()))?;
    let price = match draft.price {
        Some(price) if price.is_finite() && price > 0.0 => price,
        Some(price) => {
            return Err(TransitionError::Validation(format!(
                "price must be a positive amount, got {}",
                price
            )))
        }
        None => return Err(TransitionError::Validation("a price is required".to_string())),
    };
    let name = draft.name.trim();
    if name.is_empty() {
        return Err(TransitionError::Validation("part details are required".to_string()));
    }
    let details = match draft.details.trim() {
        "" => name,
        details => details,
    };

    let part = RecycledPart {
        id: part_id.to_string(),
        recycling_agency_id: agency.to_string(),
        upload_date: ctx.now,
        photo_url: photo.to_string(),
        name: name.to_string(),
        details: details.to_string(),
        price,
        qr_code: format!("QR_CODE_FOR_{}", ctx.now.timestamp_millis()),
    };
    let path = paths::recycled_parts().doc(part_id).map_err(path_error)?;
    let plan = Plan::default().create(path, &part)?;
    Ok(Planned { entity: part, plan })
}

/// Buyer purchases a listed part at its list price
pub fn purchase_part(
    ctx: ActionContext<'_>,
    part: Option<&RecycledPart>,
    sale_id: &str,
) -> Result<Planned<PartSale>, TransitionError> {
    let buyer = ctx.require_actor()?;
    let part = part.ok_or(TransitionError::MissingReference("recycled part"))?;
    if !(part.price.is_finite() && part.price > 0.0) {
        return Err(TransitionError::Validation(format!(
            "part {} has no valid price",
            part.id
        )));
    }

    let sale = PartSale {
        id: sale_id.to_string(),
        recycled_part_id: part.id.clone(),
        buyer_id: buyer.to_string(),
        sale_date: ctx.now,
        sale_price: part.price,
        commission_amount: commission_for(part.price),
        delivery_partner_id: None,
        status: SaleStatus::Purchased,
    };
    let path = paths::part_sales().doc(sale_id).map_err(path_error)?;
    let plan = Plan::default().create(path, &sale)?;
    Ok(Planned { entity: sale, plan })
}

/// Partner takes a purchased sale out for delivery
pub fn accept_delivery(
    ctx: ActionContext<'_>,
    sale: Option<&PartSale>,
) -> Result<Planned<PartSale>, TransitionError> {
    let partner = ctx.require_actor()?;
    let sale = sale.ok_or(TransitionError::MissingReference("part sale"))?;

    if sale.status != SaleStatus::Purchased {
        return Err(TransitionError::InvalidState {
            entity: "part sale",
            action: "accept delivery of",
            status: sale.status.as_str(),
        });
    }

    let path = paths::part_sales().doc(&sale.id).map_err(path_error)?;
    let plan = Plan::default().update(
        path,
        json!({
            "deliveryPartnerId": partner,
            "status": SaleStatus::OutForDelivery.as_str(),
        }),
    );

    let mut sale = sale.clone();
    sale.delivery_partner_id = Some(partner.to_string());
    sale.status = SaleStatus::OutForDelivery;
    Ok(Planned { entity: sale, plan })
}

/// Assigned partner completes a delivery
pub fn mark_delivered(
    ctx: ActionContext<'_>,
    sale: Option<&PartSale>,
) -> Result<Planned<PartSale>, TransitionError> {
    let partner = ctx.require_actor()?;
    let sale = sale.ok_or(TransitionError::MissingReference("part sale"))?;

    if sale.status != SaleStatus::OutForDelivery {
        return Err(TransitionError::InvalidState {
            entity: "part sale",
            action: "deliver",
            status: sale.status.as_str(),
        });
    }
    if sale.delivery_partner_id.as_deref() != Some(partner) {
        return Err(TransitionError::NotAssigned("part sale"));
    }

    let path = paths::part_sales().doc(&sale.id).map_err(path_error)?;
    let plan = Plan::default().update(
        path,
        json!({ "status": SaleStatus::Delivered.as_str() }),
    );

    let mut sale = sale.clone();
    sale.status = SaleStatus::Delivered;
    Ok(Planned { entity: sale, plan })
}
