pub mod callback;
pub mod client;

pub use client::{DarajaClient, DarajaSettings, GatewayError, StkPushResponse};
