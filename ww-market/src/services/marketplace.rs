//! Marketplace actions and read models
//!
//! Each action reads the entity it starts from, plans the transition in
//! `ww_common::status`, issues the writes optimistically and publishes the
//! matching `MarketEvent`. The returned entity is the assumed-successful
//! state; awaiting the attached batch tells whether it actually landed.

use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;
use ww_common::image::{DataUri, ImageError};
use ww_common::models::{
    CollectionRequest, CollectionStatus, DeliveryPartnerTransaction, DeviceStatus,
    DeviceSubmission, Entity, PartSale, RecycledPart, SaleStatus,
};
use ww_common::paths::{self, DocPath};
use ww_common::payment::{Payee, PaymentRequest};
use ww_common::status::{
    self, ActionContext, DeviceDraft, FeeSchedule, PartDraft, TransitionError,
};
use ww_common::{EventBus, MarketEvent};

use crate::store::{DocumentStore, Filter};
use crate::writes::{OptimisticWriter, PendingBatch, WriteFailure};

#[derive(Debug, Error)]
pub enum MarketError {
    #[error(transparent)]
    Transition(#[from] TransitionError),

    #[error(transparent)]
    Image(#[from] ImageError),

    #[error(transparent)]
    Store(#[from] ww_common::Error),

    #[error(transparent)]
    Write(#[from] WriteFailure),
}

pub type MarketResult<T> = Result<T, MarketError>;

/// Assumed-successful entity plus the writes carrying it to the store
#[derive(Debug)]
pub struct Issued<T> {
    pub entity: T,
    pub writes: PendingBatch,
}

impl<T> Issued<T> {
    /// Wait for every write; the entity is only returned if all landed
    pub async fn settle(self) -> MarketResult<T> {
        self.writes.settle().await?;
        Ok(self.entity)
    }
}

/// Outcome of a partner accepting a device
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionAcceptance {
    pub request: CollectionRequest,
    pub transaction: DeliveryPartnerTransaction,
    pub device: DeviceSubmission,
}

/// A partner's collection request with the device it refers to
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionView {
    #[serde(flatten)]
    pub request: CollectionRequest,
    pub device: DeviceSubmission,
}

/// Seller input for `submit_device`
#[derive(Debug, Clone, Default)]
pub struct DeviceInput {
    pub photo_data_uri: Option<String>,
    pub device_details: String,
}

/// Agency input for `list_part`
#[derive(Debug, Clone, Default)]
pub struct PartInput {
    pub photo_data_uri: Option<String>,
    pub name: String,
    pub details: String,
    pub price: Option<f64>,
}

#[derive(Clone)]
pub struct Marketplace {
    store: Arc<dyn DocumentStore>,
    writer: OptimisticWriter,
    events: EventBus,
    fees: FeeSchedule,
    payee: Payee,
}

fn context(actor: Option<&str>) -> MarketResult<ActionContext<'_>> {
    match actor {
        Some(actor) if !actor.is_empty() => Ok(ActionContext::new(Some(actor), Utc::now())),
        _ => Err(TransitionError::Unauthenticated.into()),
    }
}

fn parse_photo(photo: Option<&str>) -> MarketResult<Option<DataUri>> {
    match photo.map(str::trim) {
        None | Some("") => Ok(None),
        Some(uri) => Ok(Some(uri.parse()?)),
    }
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

impl Marketplace {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        events: EventBus,
        fees: FeeSchedule,
        payee: Payee,
    ) -> Self {
        let writer = OptimisticWriter::new(Arc::clone(&store), events.clone());
        Self {
            store,
            writer,
            events,
            fees,
            payee,
        }
    }

    pub fn fees(&self) -> &FeeSchedule {
        &self.fees
    }

    async fn load<T: Entity>(&self, path: &DocPath) -> MarketResult<Option<T>> {
        match self.store.get(path).await? {
            Some(doc) => Ok(Some(doc.into_entity()?)),
            None => Ok(None),
        }
    }

    async fn load_all<T: Entity>(
        &self,
        collection: &paths::CollectionPath,
        filters: &[Filter],
    ) -> MarketResult<Vec<T>> {
        self.store
            .query(collection, filters)
            .await?
            .into_iter()
            .map(|doc| doc.into_entity().map_err(MarketError::from))
            .collect()
    }

    // ========================================
    // Device collection
    // ========================================

    pub async fn submit_device(
        &self,
        actor: Option<&str>,
        input: DeviceInput,
    ) -> MarketResult<Issued<DeviceSubmission>> {
        let ctx = context(actor)?;
        let draft = DeviceDraft {
            photo: parse_photo(input.photo_data_uri.as_deref())?,
            device_details: input.device_details,
        };
        let planned = status::submit_device(ctx, draft, &new_id())?;
        let device = planned.entity;

        let writes = self.writer.apply(planned.plan);
        info!(device_id = %device.id, user_id = %device.user_id, "Device submitted");
        self.events.emit_lossy(MarketEvent::DeviceSubmitted {
            device_id: device.id.clone(),
            user_id: device.user_id.clone(),
            timestamp: ctx.now,
        });
        Ok(Issued {
            entity: device,
            writes,
        })
    }

    /// Partner accepts the device at `users/{owner_id}/devices/{device_id}`
    pub async fn accept_collection(
        &self,
        actor: Option<&str>,
        owner_id: &str,
        device_id: &str,
    ) -> MarketResult<Issued<CollectionAcceptance>> {
        let ctx = context(actor)?;
        let device: Option<DeviceSubmission> = self
            .load(&paths::device(owner_id, device_id)?)
            .await?;

        let accepted = status::accept_collection(
            ctx,
            device.as_ref(),
            &self.fees,
            &new_id(),
            &new_id(),
        )?;

        let writes = self.writer.apply(accepted.plan);
        info!(
            request_id = %accepted.request.id,
            device_id = %accepted.device.id,
            delivery_partner_id = %accepted.request.delivery_partner_id,
            service_fee = accepted.transaction.amount,
            "Collection accepted"
        );
        self.events.emit_lossy(MarketEvent::CollectionAccepted {
            request_id: accepted.request.id.clone(),
            device_id: accepted.device.id.clone(),
            delivery_partner_id: accepted.request.delivery_partner_id.clone(),
            timestamp: ctx.now,
        });
        Ok(Issued {
            entity: CollectionAcceptance {
                request: accepted.request,
                transaction: accepted.transaction,
                device: accepted.device,
            },
            writes,
        })
    }

    pub async fn mark_collected(
        &self,
        actor: Option<&str>,
        request_id: &str,
    ) -> MarketResult<Issued<CollectionRequest>> {
        let ctx = context(actor)?;
        let request: Option<CollectionRequest> = self
            .load(&paths::collection_requests().doc(request_id)?)
            .await?;

        let planned = status::mark_collected(ctx, request.as_ref())?;
        let request = planned.entity;
        let writes = self.writer.apply(planned.plan);

        info!(request_id = %request.id, device_id = %request.device_id, "Device collected");
        self.events.emit_lossy(MarketEvent::DeviceCollected {
            request_id: request.id.clone(),
            device_id: request.device_id.clone(),
            timestamp: ctx.now,
        });
        Ok(Issued {
            entity: request,
            writes,
        })
    }

    // ========================================
    // Parts and sales
    // ========================================

    pub async fn list_part(
        &self,
        actor: Option<&str>,
        input: PartInput,
    ) -> MarketResult<Issued<RecycledPart>> {
        let ctx = context(actor)?;
        let draft = PartDraft {
            photo: parse_photo(input.photo_data_uri.as_deref())?,
            name: input.name,
            details: input.details,
            price: input.price,
        };
        let planned = status::list_part(ctx, draft, &new_id())?;
        let part = planned.entity;
        let writes = self.writer.apply(planned.plan);

        info!(part_id = %part.id, price = part.price, "Part listed");
        self.events.emit_lossy(MarketEvent::PartListed {
            part_id: part.id.clone(),
            recycling_agency_id: part.recycling_agency_id.clone(),
            price: part.price,
            timestamp: ctx.now,
        });
        Ok(Issued {
            entity: part,
            writes,
        })
    }

    pub async fn purchase_part(
        &self,
        actor: Option<&str>,
        part_id: &str,
    ) -> MarketResult<Issued<PartSale>> {
        let ctx = context(actor)?;
        let part: Option<RecycledPart> =
            self.load(&paths::recycled_parts().doc(part_id)?).await?;

        let planned = status::purchase_part(ctx, part.as_ref(), &new_id())?;
        let sale = planned.entity;
        let writes = self.writer.apply(planned.plan);

        info!(
            sale_id = %sale.id,
            part_id = %sale.recycled_part_id,
            sale_price = sale.sale_price,
            commission = sale.commission_amount,
            "Part purchased"
        );
        self.events.emit_lossy(MarketEvent::PartPurchased {
            sale_id: sale.id.clone(),
            part_id: sale.recycled_part_id.clone(),
            buyer_id: sale.buyer_id.clone(),
            sale_price: sale.sale_price,
            commission_amount: sale.commission_amount,
            timestamp: ctx.now,
        });
        Ok(Issued {
            entity: sale,
            writes,
        })
    }

    pub async fn accept_delivery(
        &self,
        actor: Option<&str>,
        sale_id: &str,
    ) -> MarketResult<Issued<PartSale>> {
        let ctx = context(actor)?;
        let sale: Option<PartSale> = self.load(&paths::part_sales().doc(sale_id)?).await?;

        let planned = status::accept_delivery(ctx, sale.as_ref())?;
        let sale = planned.entity;
        let writes = self.writer.apply(planned.plan);

        let partner = sale.delivery_partner_id.clone().unwrap_or_default();
        info!(sale_id = %sale.id, delivery_partner_id = %partner, "Delivery accepted");
        self.events.emit_lossy(MarketEvent::DeliveryAccepted {
            sale_id: sale.id.clone(),
            delivery_partner_id: partner,
            timestamp: ctx.now,
        });
        Ok(Issued {
            entity: sale,
            writes,
        })
    }

    pub async fn mark_delivered(
        &self,
        actor: Option<&str>,
        sale_id: &str,
    ) -> MarketResult<Issued<PartSale>> {
        let ctx = context(actor)?;
        let sale: Option<PartSale> = self.load(&paths::part_sales().doc(sale_id)?).await?;

        let planned = status::mark_delivered(ctx, sale.as_ref())?;
        let sale = planned.entity;
        let writes = self.writer.apply(planned.plan);

        let partner = sale.delivery_partner_id.clone().unwrap_or_default();
        info!(sale_id = %sale.id, delivery_partner_id = %partner, "Part delivered");
        self.events.emit_lossy(MarketEvent::PartDelivered {
            sale_id: sale.id.clone(),
            delivery_partner_id: partner,
            timestamp: ctx.now,
        });
        Ok(Issued {
            entity: sale,
            writes,
        })
    }

    // ========================================
    // Read models
    // ========================================

    pub async fn my_devices(&self, user_id: &str) -> MarketResult<Vec<DeviceSubmission>> {
        self.load_all(&paths::user_devices(user_id)?, &[]).await
    }

    /// Devices of every seller that are waiting for a partner
    pub async fn available_collections(&self) -> MarketResult<Vec<DeviceSubmission>> {
        // Devices written without a status are pending too, so the filter
        // runs here rather than in the store query.
        let docs = self
            .store
            .collection_group(paths::DEVICES, &[])
            .await?;
        let mut devices = Vec::with_capacity(docs.len());
        for doc in docs {
            let device: DeviceSubmission = doc.into_entity()?;
            if device.effective_status() == DeviceStatus::Pending {
                devices.push(device);
            }
        }
        Ok(devices)
    }

    /// A partner's collection requests joined with their devices,
    /// optionally narrowed to one request status
    ///
    /// Requests whose device can no longer be read are left out.
    pub async fn my_collections(
        &self,
        partner_id: &str,
        status: Option<CollectionStatus>,
    ) -> MarketResult<Vec<CollectionView>> {
        let mut filters = vec![Filter::eq("deliveryPartnerId", partner_id)];
        if let Some(status) = status {
            filters.push(Filter::eq("status", status.as_str()));
        }
        let requests: Vec<CollectionRequest> = self
            .load_all(&paths::collection_requests(), &filters)
            .await?;

        let mut views = Vec::with_capacity(requests.len());
        for request in requests {
            let path = paths::device(&request.user_id, &request.device_id)?;
            match self.load::<DeviceSubmission>(&path).await? {
                Some(device) => views.push(CollectionView { request, device }),
                None => warn!(
                    request_id = %request.id,
                    device_id = %request.device_id,
                    "Collection request references a missing device"
                ),
            }
        }
        Ok(views)
    }

    pub async fn my_transactions(
        &self,
        partner_id: &str,
    ) -> MarketResult<Vec<DeliveryPartnerTransaction>> {
        self.load_all(
            &paths::delivery_partner_transactions(),
            &[Filter::eq("deliveryPartnerId", partner_id)],
        )
        .await
    }

    /// Every listed part, optionally narrowed by a case-insensitive search
    /// on name and details
    pub async fn browse_parts(&self, search: Option<&str>) -> MarketResult<Vec<RecycledPart>> {
        let parts: Vec<RecycledPart> = self.load_all(&paths::recycled_parts(), &[]).await?;
        let needle = search.map(|s| s.trim().to_lowercase()).unwrap_or_default();
        if needle.is_empty() {
            return Ok(parts);
        }
        Ok(parts
            .into_iter()
            .filter(|part| {
                part.name.to_lowercase().contains(&needle)
                    || part.details.to_lowercase().contains(&needle)
            })
            .collect())
    }

    /// Payment request for a part at its list price
    pub async fn payment_request(&self, part_id: &str) -> MarketResult<PaymentRequest> {
        let part: RecycledPart = self
            .load(&paths::recycled_parts().doc(part_id)?)
            .await?
            .ok_or(TransitionError::MissingReference("recycled part"))?;

        let request =
            PaymentRequest::new(self.payee.clone(), part.price, Some(part.name.clone()))?;
        Ok(request)
    }

    pub async fn my_purchases(&self, buyer_id: &str) -> MarketResult<Vec<PartSale>> {
        self.load_all(&paths::part_sales(), &[Filter::eq("buyerId", buyer_id)])
            .await
    }

    /// Sales waiting for a delivery partner
    pub async fn available_deliveries(&self) -> MarketResult<Vec<PartSale>> {
        self.load_all(
            &paths::part_sales(),
            &[Filter::eq("status", SaleStatus::Purchased.as_str())],
        )
        .await
    }

    pub async fn my_deliveries(&self, partner_id: &str) -> MarketResult<Vec<PartSale>> {
        self.load_all(
            &paths::part_sales(),
            &[Filter::eq("deliveryPartnerId", partner_id)],
        )
        .await
    }
}
