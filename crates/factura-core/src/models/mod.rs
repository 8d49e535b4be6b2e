//! Data models for invoices, pricing and configuration.

pub mod config;
pub mod invoice;
pub mod pricing;
