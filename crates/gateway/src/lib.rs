//! Messaging gateway implementations.
//!
//! `consult-core` defines the [`consult_core::NotificationGateway`] seam;
//! this crate provides the concrete deliveries: the WhatsApp Cloud API
//! client used in production and a dry-run gateway for development and
//! demos.

mod whatsapp;

pub use whatsapp::{DryRunGateway, WhatsAppConfig, WhatsAppError, WhatsAppGateway, DEFAULT_API_BASE};
