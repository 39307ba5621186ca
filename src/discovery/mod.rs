//! mDNS service discovery/advertisement for the `_raop._tcp` service

pub mod advertiser;

pub use advertiser::{AdvertiserConfig, AdvertiserError, AsyncRaopAdvertiser, RaopAdvertiser};
