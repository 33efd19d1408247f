//! Signed webhook delivery with bounded retries and exponential backoff.
//!
//! [`outbound::webhook::DeliveryService`] is the entry point: it signs a
//! canonical payload once, POSTs it through a [`domain::ports::DeliveryTransport`],
//! backs off between failures and hands every attempt and the final outcome to
//! a [`domain::ports::DeliveryRecorder`].

pub mod config;
pub mod domain;
pub mod outbound;
pub mod server;
pub mod telemetry;
