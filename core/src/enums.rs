//! Wire string tables for the device's enum-valued fields.
//!
//! JSON-carried enums get their wire names through serde rename attributes;
//! `wire_name` exposes the same strings for query-string and line-record use.
//! `SecureElementStatus::from_wire` is total — a token this crate does not
//! know yet decodes to `Unrecognized` instead of failing, so a new device
//! firmware value never turns into a hard error.

use serde::{Deserialize, Serialize};

/// State of the device's secure element, decoded from the unlock response
/// token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecureElementStatus {
    Unlocked,
    Locked,
    PinRejected,
    NotPresent,
    /// A token not in this crate's table; the original string is kept.
    Unrecognized(String),
}

impl SecureElementStatus {
    /// Decode a 4-character status token. Total: unknown tokens map to
    /// `Unrecognized`.
    pub fn from_wire(token: &str) -> Self {
        match token {
            "UNLK" => SecureElementStatus::Unlocked,
            "LOCK" => SecureElementStatus::Locked,
            "PINX" => SecureElementStatus::PinRejected,
            "NOSE" => SecureElementStatus::NotPresent,
            other => SecureElementStatus::Unrecognized(other.to_string()),
        }
    }

    pub fn wire_name(&self) -> &str {
        match self {
            SecureElementStatus::Unlocked => "UNLK",
            SecureElementStatus::Locked => "LOCK",
            SecureElementStatus::PinRejected => "PINX",
            SecureElementStatus::NotPresent => "NOSE",
            SecureElementStatus::Unrecognized(token) => token,
        }
    }
}

/// Kind of invoice being issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum InvoiceType {
    Normal,
    Proforma,
    Copy,
    Training,
    Advance,
}

impl InvoiceType {
    pub fn wire_name(&self) -> &'static str {
        match self {
            InvoiceType::Normal => "Normal",
            InvoiceType::Proforma => "Proforma",
            InvoiceType::Copy => "Copy",
            InvoiceType::Training => "Training",
            InvoiceType::Advance => "Advance",
        }
    }
}

/// Direction of the fiscal transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum TransactionType {
    Sale,
    Refund,
}

impl TransactionType {
    pub fn wire_name(&self) -> &'static str {
        match self {
            TransactionType::Sale => "Sale",
            TransactionType::Refund => "Refund",
        }
    }
}

/// Means of payment attached to an invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum PaymentType {
    Cash,
    Card,
    WireTransfer,
    Voucher,
    Other,
}

/// Layout requested when fetching rendered invoice contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiptLayout {
    Slip,
    A4,
}

impl ReceiptLayout {
    pub fn wire_name(&self) -> &'static str {
        match self {
            ReceiptLayout::Slip => "Slip",
            ReceiptLayout::A4 => "A4",
        }
    }
}

/// Image format requested when fetching rendered invoice contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiptImageFormat {
    Png,
    Pdf,
}

impl ReceiptImageFormat {
    pub fn wire_name(&self) -> &'static str {
        match self {
            ReceiptImageFormat::Png => "Png",
            ReceiptImageFormat::Pdf => "Pdf",
        }
    }
}
