//! Marketplace domain models
//!
//! Every entity is a document in the document store. Field names are
//! camelCase and status values kebab-case, exactly as stored.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{Error, Result};

/// Raw document fields as held by the store
pub type Fields = Map<String, Value>;

/// Device submission lifecycle. An absent status reads as `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeviceStatus {
    Pending,
    CollectionInProgress,
    Collected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CollectionStatus {
    Accepted,
    Collected,
}

/// Part sale lifecycle, forward only
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SaleStatus {
    Purchased,
    OutForDelivery,
    Delivered,
}

impl DeviceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceStatus::Pending => "pending",
            DeviceStatus::CollectionInProgress => "collection-in-progress",
            DeviceStatus::Collected => "collected",
        }
    }
}

impl CollectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CollectionStatus::Accepted => "accepted",
            CollectionStatus::Collected => "collected",
        }
    }
}

impl SaleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SaleStatus::Purchased => "purchased",
            SaleStatus::OutForDelivery => "out-for-delivery",
            SaleStatus::Delivered => "delivered",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceSubmission {
    pub id: String,
    pub user_id: String,
    pub upload_date: DateTime<Utc>,
    pub photo_url: String,
    pub device_details: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<DeviceStatus>,
}

impl DeviceSubmission {
    /// Status every reader must use: a missing field means `pending`
    pub fn effective_status(&self) -> DeviceStatus {
        self.status.unwrap_or(DeviceStatus::Pending)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionRequest {
    pub id: String,
    pub device_id: String,
    pub user_id: String,
    pub delivery_partner_id: String,
    pub request_date: DateTime<Utc>,
    pub status: CollectionStatus,
    pub payment_amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecycledPart {
    pub id: String,
    pub recycling_agency_id: String,
    pub upload_date: DateTime<Utc>,
    pub photo_url: String,
    pub name: String,
    #[serde(default)]
    pub details: String,
    pub price: f64,
    pub qr_code: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartSale {
    pub id: String,
    pub recycled_part_id: String,
    pub buyer_id: String,
    pub sale_date: DateTime<Utc>,
    pub sale_price: f64,
    pub commission_amount: f64,
    /// Null until a partner accepts the delivery
    #[serde(default)]
    pub delivery_partner_id: Option<String>,
    pub status: SaleStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryPartnerTransaction {
    pub id: String,
    pub delivery_partner_id: String,
    pub transaction_date: DateTime<Utc>,
    pub transaction_type: String,
    pub amount: f64,
    pub collection_request_id: String,
}

/// Conversion between typed entities and stored document fields.
///
/// The document id lives in the path, not in the stored fields.
pub trait Entity: Serialize + DeserializeOwned {
    fn from_document(id: &str, fields: Fields) -> Result<Self> {
        let mut fields = fields;
        fields.insert("id".to_string(), Value::String(id.to_string()));
        Ok(serde_json::from_value(Value::Object(fields))?)
    }

    fn to_fields(&self) -> Result<Fields> {
        match serde_json::to_value(self)? {
            Value::Object(mut fields) => {
                fields.remove("id");
                Ok(fields)
            }
            other => Err(Error::Internal(format!(
                "Entity serialized to non-object: {}",
                other
            ))),
        }
    }
}

impl Entity for DeviceSubmission {}
impl Entity for CollectionRequest {}
impl Entity for RecycledPart {}
impl Entity for PartSale {}
impl Entity for DeliveryPartnerTransaction {}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn device_fields(status: Option<&str>) -> Fields {
        let mut value = json!({
            "userId": "seller-1",
            "uploadDate": "2025-01-01T00:00:00Z",
            "photoUrl": "data:image/png;base64,AAAA",
            "deviceDetails": "iPhone 12, cracked screen",
        });
        if let Some(status) = status {
            value["status"] = json!(status);
        }
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_missing_status_reads_as_pending() {
        let device = DeviceSubmission::from_document("d1", device_fields(None)).unwrap();
        assert_eq!(device.status, None);
        assert_eq!(device.effective_status(), DeviceStatus::Pending);
    }

    #[test]
    fn test_status_strings_are_kebab_case() {
        let device =
            DeviceSubmission::from_document("d1", device_fields(Some("collection-in-progress")))
                .unwrap();
        assert_eq!(device.effective_status(), DeviceStatus::CollectionInProgress);
        assert_eq!(
            serde_json::to_value(SaleStatus::OutForDelivery).unwrap(),
            json!("out-for-delivery")
        );
        assert_eq!(SaleStatus::OutForDelivery.as_str(), "out-for-delivery");
    }

    #[test]
    fn test_to_fields_drops_id_and_uses_camel_case() {
        let device = DeviceSubmission::from_document("d1", device_fields(Some("pending"))).unwrap();
        let fields = device.to_fields().unwrap();
        assert!(!fields.contains_key("id"));
        assert_eq!(fields["deviceDetails"], json!("iPhone 12, cracked screen"));
        assert_eq!(fields["status"], json!("pending"));
    }

    #[test]
    fn test_sale_serializes_null_partner() {
        let sale = PartSale {
            id: "s1".to_string(),
            recycled_part_id: "p1".to_string(),
            buyer_id: "b1".to_string(),
            sale_date: Utc::now(),
            sale_price: 45.99,
            commission_amount: 45.99 * 0.10,
            delivery_partner_id: None,
            status: SaleStatus::Purchased,
        };
        let fields = sale.to_fields().unwrap();
        assert_eq!(fields["deliveryPartnerId"], Value::Null);
        assert_eq!(fields["status"], json!("purchased"));
    }

    #[test]
    fn test_sale_statuses_are_ordered_forward() {
        assert!(SaleStatus::Purchased < SaleStatus::OutForDelivery);
        assert!(SaleStatus::OutForDelivery < SaleStatus::Delivered);
    }
}
