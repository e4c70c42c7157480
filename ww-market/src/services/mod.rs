//! Service layer: marketplace actions, read models and accounts

pub mod accounts;
pub mod marketplace;

pub use accounts::{AccountError, Accounts, Session};
pub use marketplace::{
    CollectionAcceptance, CollectionView, DeviceInput, Issued, MarketError, MarketResult,
    Marketplace, PartInput,
};
