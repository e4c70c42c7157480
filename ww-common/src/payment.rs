//! Payment request strings
//!
//! The buyer scans a UPI payment request rendered as a QR code and then
//! acknowledges payment manually; there is no confirmation callback.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::{Error, Result};

/// Payee details, taken from marketplace configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payee {
    pub id: String,
    pub name: String,
    pub currency: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PaymentRequest {
    pub payee: Payee,
    pub amount: f64,
    pub note: Option<String>,
}

impl PaymentRequest {
    pub fn new(payee: Payee, amount: f64, note: Option<String>) -> Result<Self> {
        if payee.id.trim().is_empty() {
            return Err(Error::InvalidInput("payee id is required".to_string()));
        }
        if payee.currency.trim().is_empty() {
            return Err(Error::InvalidInput("currency is required".to_string()));
        }
        if !(amount.is_finite() && amount > 0.0) {
            return Err(Error::InvalidInput(format!(
                "payment amount must be positive, got {}",
                amount
            )));
        }
        Ok(Self {
            payee,
            amount,
            note,
        })
    }

    /// `upi://pay?pa=..&pn=..&am=..&cu=..[&tn=..]`
    pub fn to_uri(&self) -> Result<String> {
        let mut url = Url::parse("upi://pay")
            .map_err(|e| Error::Internal(format!("UPI base URL: {}", e)))?;
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("pa", &self.payee.id)
                .append_pair("pn", &self.payee.name)
                .append_pair("am", &format!("{:.2}", self.amount))
                .append_pair("cu", &self.payee.currency);
            if let Some(note) = &self.note {
                query.append_pair("tn", note);
            }
        }
        Ok(url.to_string())
    }
}
