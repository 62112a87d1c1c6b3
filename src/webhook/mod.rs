pub mod client;
pub mod payload;
pub mod signer;

pub use client::{Delivery, DeliveryReceipt, WebhookClient};
pub use payload::{Deployment, IncidentPayload};
pub use signer::{sign, verify, SIGNATURE_HEADER, TIMESTAMP_HEADER};
