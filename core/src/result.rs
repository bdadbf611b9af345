//! Success/failure envelope returned from every client operation.
//!
//! # Design
//! `FiscalResult<T>` pairs a tagged outcome with the verbatim response body.
//! The outcome is a sum type rather than a `succeeded` flag next to nullable
//! fields: a success cannot carry an error message, and a failure may still
//! carry a partially processed payload (the device sometimes assigns an
//! invoice a number and then rejects it downstream — dropping that partial
//! result would force the caller to re-query).
//!
//! The struct's fields are private, so the only construction paths are
//! `success`, `fail`, and `fail_with_partial`. Every parse strategy in
//! `client` routes through one of them.
//!
//! `from_json_response` implements the classification protocol for JSON
//! payloads: a 2xx status decodes the body as the positive payload, anything
//! else goes through structured error extraction with a reason-phrase
//! fallback.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::http::HttpResponse;

/// Failure-body field holding the service's error description. The device
/// has been observed emitting it in varying capitalizations, so the lookup
/// is case-insensitive.
const ERROR_MESSAGE_FIELD: &str = "message";

/// Failure-body field holding a partially processed invoice response.
const EMBEDDED_RESPONSE_FIELD: &str = "invoiceResponse";

/// Outcome of a single HTTP round-trip.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    /// Decoded positive payload.
    Success(T),
    /// Failure, optionally carrying a partially processed payload extracted
    /// from the failure body.
    Failure { message: String, partial: Option<T> },
}

/// Envelope returned from every `FiscalClient::parse_*` method.
///
/// Immutable once constructed; the raw response body is always retained so
/// callers can log or inspect exactly what the device sent.
#[derive(Debug, Clone, PartialEq)]
pub struct FiscalResult<T> {
    outcome: Outcome<T>,
    raw_body: String,
}

impl<T> FiscalResult<T> {
    /// A successful round-trip with a decoded payload.
    pub fn success(value: T, raw_body: impl Into<String>) -> Self {
        FiscalResult {
            outcome: Outcome::Success(value),
            raw_body: raw_body.into(),
        }
    }

    /// A failed round-trip with no usable payload.
    pub fn fail(message: impl Into<String>, raw_body: impl Into<String>) -> Self {
        FiscalResult {
            outcome: Outcome::Failure {
                message: message.into(),
                partial: None,
            },
            raw_body: raw_body.into(),
        }
    }

    /// A failed round-trip that still produced a partially processed payload.
    pub fn fail_with_partial(
        message: impl Into<String>,
        raw_body: impl Into<String>,
        partial: T,
    ) -> Self {
        FiscalResult {
            outcome: Outcome::Failure {
                message: message.into(),
                partial: Some(partial),
            },
            raw_body: raw_body.into(),
        }
    }

    pub fn succeeded(&self) -> bool {
        matches!(self.outcome, Outcome::Success(_))
    }

    pub fn outcome(&self) -> &Outcome<T> {
        &self.outcome
    }

    /// The decoded payload, present on success and on partial failures.
    pub fn value(&self) -> Option<&T> {
        match &self.outcome {
            Outcome::Success(value) => Some(value),
            Outcome::Failure { partial, .. } => partial.as_ref(),
        }
    }

    pub fn into_value(self) -> Option<T> {
        match self.outcome {
            Outcome::Success(value) => Some(value),
            Outcome::Failure { partial, .. } => partial,
        }
    }

    /// The failure message. `None` on success; may be empty on failures
    /// whose body carried no message field.
    pub fn error_message(&self) -> Option<&str> {
        match &self.outcome {
            Outcome::Success(_) => None,
            Outcome::Failure { message, .. } => Some(message),
        }
    }

    /// The response body exactly as the device sent it.
    pub fn raw_body(&self) -> &str {
        &self.raw_body
    }
}

impl<T: DeserializeOwned> FiscalResult<T> {
    /// Classify a response whose positive payload is JSON.
    ///
    /// 2xx responses decode the body into `T`; a body that does not match
    /// the expected shape becomes a failure carrying the deserializer's
    /// description, never a silent coercion. Non-2xx responses go through
    /// structured error extraction.
    pub fn from_json_response(response: HttpResponse) -> Self {
        let success = response.is_success();
        let HttpResponse { reason, body, .. } = response;

        if success {
            return match serde_json::from_str::<T>(&body) {
                Ok(value) => FiscalResult::success(value, body),
                Err(err) => FiscalResult::fail(err.to_string(), body),
            };
        }

        Self::from_error_body(reason, body)
    }

    /// Extract an error message and optional embedded payload from a failure
    /// body.
    ///
    /// The body is expected to be a flat JSON object. A `message` field
    /// (matched case-insensitively) supplies the error message; an
    /// `invoiceResponse` field is decoded into `T` and attached as the
    /// partial value. A body that is not a JSON object, or an embedded
    /// payload that does not decode, falls back to the HTTP reason phrase
    /// with no partial value.
    fn from_error_body(reason: String, body: String) -> Self {
        let fields: serde_json::Map<String, Value> = match serde_json::from_str(&body) {
            Ok(fields) => fields,
            Err(_) => return FiscalResult::fail(reason, body),
        };

        let message = fields
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(ERROR_MESSAGE_FIELD))
            .map(|(_, value)| field_as_string(value))
            .unwrap_or_default();

        if let Some(embedded) = fields.get(EMBEDDED_RESPONSE_FIELD) {
            return match serde_json::from_value::<T>(embedded.clone()) {
                Ok(partial) => FiscalResult::fail_with_partial(message, body, partial),
                Err(_) => FiscalResult::fail(reason, body),
            };
        }

        FiscalResult::fail(message, body)
    }
}

/// Render a JSON field for use as an error message: strings as-is, anything
/// else in its JSON form.
fn field_as_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
