//! # WasteWise Common Library
//!
//! Shared code for the WasteWise services including:
//! - Domain models and document paths
//! - The device/part status state machine
//! - Event types (MarketEvent enum) and the EventBus
//! - Configuration loading
//! - Image data URIs, waste categories and payment requests

pub mod config;
pub mod error;
pub mod events;
pub mod image;
pub mod models;
pub mod paths;
pub mod payment;
pub mod sse;
pub mod status;
pub mod waste_info;

pub use error::{Error, Result};
pub use events::{EventBus, MarketEvent};
