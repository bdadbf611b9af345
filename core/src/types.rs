//! Domain DTOs for the fiscal device API.
//!
//! # Design
//! These types mirror the mock-server's schema but are defined independently.
//! Integration tests catch any schema drift between the two crates. JSON
//! field names are camelCase through serde attributes, so wire format
//! configuration travels with the types instead of living in a process-wide
//! serializer setting.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::enums::{InvoiceType, PaymentType, TransactionType};

/// Device status returned by `GET /status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceStatus {
    pub device_serial_number: String,
    pub software_version: String,
    pub device_time: DateTime<Utc>,
    pub pin_required: bool,
    pub audit_required: bool,
    #[serde(default)]
    pub last_invoice_number: Option<String>,
}

/// An invoice submitted for fiscalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    pub invoice_type: InvoiceType,
    pub transaction_type: TransactionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cashier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buyer_id: Option<String>,
    pub items: Vec<InvoiceItem>,
    pub payments: Vec<Payment>,
}

/// One line item on an invoice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceItem {
    pub name: String,
    pub quantity: f64,
    pub unit_price: f64,
    pub total_amount: f64,
}

/// One means of payment on an invoice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub payment_type: PaymentType,
    pub amount: f64,
}

/// A final invoice closing an earlier proforma or advance invoice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalInvoice {
    /// Number of the document being closed.
    pub reference_number: String,
    #[serde(flatten)]
    pub invoice: Invoice,
}

/// The device's answer to a fiscalized invoice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceResponse {
    pub invoice_number: String,
    pub invoice_counter: u64,
    pub issued_at: DateTime<Utc>,
    pub total_amount: f64,
    pub signature: String,
    #[serde(default)]
    pub verification_url: Option<String>,
}

/// Rendered contents of a stored invoice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceContents {
    pub invoice_number: String,
    /// Receipt text in the requested layout.
    pub journal: String,
    /// Base64 image in the requested format, when the device rendered one.
    #[serde(default)]
    pub image: Option<String>,
}

/// Filters for `POST /invoices/search`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceSearchQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invoice_type: Option<InvoiceType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cashier: Option<String>,
}

/// Number of comma-separated fields in one search result line.
const SEARCH_RECORD_FIELDS: usize = 6;

/// One row of the search response. The device answers with newline-separated
/// lines of six comma-separated fields; all fields are kept as the strings
/// the device sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvoiceSearchRecord {
    pub invoice_number: String,
    pub issued_at: String,
    pub invoice_type: String,
    pub transaction_type: String,
    pub total_amount: String,
    pub cashier: String,
}

impl InvoiceSearchRecord {
    /// Parse one response line by field position. A line with the wrong
    /// field count fails for that line only — callers skip it and keep the
    /// rest of the batch.
    pub fn from_line(line: &str) -> Option<Self> {
        let fields: Vec<&str> = line.split(',').collect();
        if fields.len() != SEARCH_RECORD_FIELDS {
            return None;
        }
        Some(InvoiceSearchRecord {
            invoice_number: fields[0].to_string(),
            issued_at: fields[1].to_string(),
            invoice_type: fields[2].to_string(),
            transaction_type: fields[3].to_string(),
            total_amount: fields[4].to_string(),
            cashier: fields[5].to_string(),
        })
    }
}
