//! Synchronous API client core for a fiscal invoicing device.
//!
//! # Overview
//! Builds `HttpRequest` values and parses `HttpResponse` values without
//! touching the network (host-does-IO pattern). The caller executes the
//! actual HTTP round-trip, making the core fully deterministic and testable.
//!
//! # Design
//! - `FiscalClient` is stateless — it holds only `base_url`.
//! - Each operation is split into `build_*` (produces request) and `parse_*`
//!   (consumes response), so the I/O boundary is explicit. Transport errors
//!   therefore never reach this crate; they stay with the host.
//! - Every `parse_*` method returns a `FiscalResult` envelope. Non-success
//!   statuses, malformed payloads, and structured failure bodies are all
//!   absorbed into the envelope rather than surfaced as `Err`.
//! - DTOs are defined independently from the mock-server crate; integration
//!   tests catch schema drift.

pub mod client;
pub mod enums;
pub mod error;
pub mod http;
pub mod result;
pub mod types;

pub use client::{validate_request_id, FiscalClient, MAX_REQUEST_ID_LENGTH, REQUEST_ID_HEADER};
pub use enums::{
    InvoiceType, PaymentType, ReceiptImageFormat, ReceiptLayout, SecureElementStatus,
    TransactionType,
};
pub use error::{ApiError, RequestIdViolation};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use result::{FiscalResult, Outcome};
pub use types::{
    DeviceStatus, FinalInvoice, Invoice, InvoiceContents, InvoiceItem, InvoiceResponse,
    InvoiceSearchQuery, InvoiceSearchRecord, Payment,
};
