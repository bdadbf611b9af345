//! Stateless HTTP request builder and response parser for the fiscal device
//! API.
//!
//! # Design
//! `FiscalClient` holds only a `base_url` and carries no mutable state
//! between calls. Each operation is split into a `build_*` method that
//! produces an `HttpRequest` and a `parse_*` method that consumes an
//! `HttpResponse` and returns a `FiscalResult`. The caller executes the
//! actual HTTP round-trip, keeping the core deterministic and free of I/O
//! dependencies.
//!
//! Three parse strategies cover every operation: JSON classification
//! (`FiscalResult::from_json_response`), the fixed-format unlock token, and
//! the line-oriented search records. Each strategy routes its outcome
//! through the envelope's constructors and nothing else.

use serde::Serialize;

use crate::enums::{ReceiptImageFormat, ReceiptLayout, SecureElementStatus};
use crate::error::{ApiError, RequestIdViolation};
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::result::FiscalResult;
use crate::types::{
    DeviceStatus, FinalInvoice, Invoice, InvoiceContents, InvoiceResponse, InvoiceSearchQuery,
    InvoiceSearchRecord,
};

/// Header carrying the caller-supplied idempotency token on invoice
/// submissions.
pub const REQUEST_ID_HEADER: &str = "RequestId";

/// Maximum accepted request-id length, in characters.
pub const MAX_REQUEST_ID_LENGTH: usize = 32;

/// Length of a well-formed unlock response body: a 4-character status token
/// wrapped in JSON string quotes.
const UNLOCK_BODY_LENGTH: usize = 6;

/// Synchronous, stateless client for the fiscal device API.
///
/// Builds `HttpRequest` values and parses `HttpResponse` values without
/// touching the network. The caller is responsible for executing the HTTP
/// round-trip between `build_*` and `parse_*`.
#[derive(Debug, Clone)]
pub struct FiscalClient {
    base_url: String,
}

impl FiscalClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    // --- device status ---

    pub fn build_status(&self) -> HttpRequest {
        self.get(format!("{}/status", self.base_url))
    }

    pub fn parse_status(&self, response: HttpResponse) -> FiscalResult<DeviceStatus> {
        FiscalResult::from_json_response(response)
    }

    // --- secure element unlock ---

    pub fn build_unlock_secure_element(&self, pin: &str) -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Post,
            path: format!("{}/pin", self.base_url),
            headers: vec![("content-type".to_string(), "text/plain".to_string())],
            body: Some(pin.to_string()),
        }
    }

    /// Decode the unlock response's fixed-format body.
    ///
    /// A body of any length other than exactly six characters is a failure
    /// regardless of HTTP status. Otherwise the middle four characters are
    /// the status token, decoded independently of the status code: a non-2xx
    /// response with a well-formed body still yields the decoded status as
    /// the failure's partial value.
    pub fn parse_unlock_secure_element(
        &self,
        response: HttpResponse,
    ) -> FiscalResult<SecureElementStatus> {
        let token = match extract_status_token(&response.body) {
            Some(token) => token,
            None => return FiscalResult::fail(response.reason, response.body),
        };

        let status = SecureElementStatus::from_wire(&token);
        if response.is_success() {
            FiscalResult::success(status, response.body)
        } else {
            FiscalResult::fail_with_partial(response.reason, response.body, status)
        }
    }

    // --- invoice issuance ---

    pub fn build_issue_invoice(
        &self,
        invoice: &Invoice,
        request_id: Option<&str>,
    ) -> Result<HttpRequest, ApiError> {
        self.build_submission("invoices", invoice, request_id)
    }

    pub fn parse_issue_invoice(&self, response: HttpResponse) -> FiscalResult<InvoiceResponse> {
        FiscalResult::from_json_response(response)
    }

    pub fn build_issue_final_invoice(
        &self,
        final_invoice: &FinalInvoice,
        request_id: Option<&str>,
    ) -> Result<HttpRequest, ApiError> {
        self.build_submission("invoices/final", final_invoice, request_id)
    }

    pub fn parse_issue_final_invoice(
        &self,
        response: HttpResponse,
    ) -> FiscalResult<InvoiceResponse> {
        FiscalResult::from_json_response(response)
    }

    // --- invoice lookup ---

    pub fn build_invoice_contents(
        &self,
        invoice_number: &str,
        layout: ReceiptLayout,
        image_format: ReceiptImageFormat,
        include_header_and_footer: bool,
    ) -> HttpRequest {
        self.get(format!(
            "{}/invoices/{invoice_number}?{}",
            self.base_url,
            contents_query(layout, image_format, include_header_and_footer),
        ))
    }

    pub fn parse_invoice_contents(&self, response: HttpResponse) -> FiscalResult<InvoiceContents> {
        FiscalResult::from_json_response(response)
    }

    pub fn build_last_invoice_contents(
        &self,
        layout: ReceiptLayout,
        image_format: ReceiptImageFormat,
        include_header_and_footer: bool,
    ) -> HttpRequest {
        self.get(format!(
            "{}/invoices/last?{}",
            self.base_url,
            contents_query(layout, image_format, include_header_and_footer),
        ))
    }

    pub fn parse_last_invoice_contents(
        &self,
        response: HttpResponse,
    ) -> FiscalResult<InvoiceContents> {
        FiscalResult::from_json_response(response)
    }

    pub fn build_invoice_by_request_id(&self, request_id: &str) -> HttpRequest {
        self.get(format!("{}/invoices/request/{request_id}", self.base_url))
    }

    pub fn parse_invoice_by_request_id(
        &self,
        response: HttpResponse,
    ) -> FiscalResult<InvoiceResponse> {
        FiscalResult::from_json_response(response)
    }

    // --- invoice search ---

    pub fn build_search_invoices(
        &self,
        query: &InvoiceSearchQuery,
    ) -> Result<HttpRequest, ApiError> {
        let body = serde_json::to_string(query)
            .map_err(|e| ApiError::SerializationError(e.to_string()))?;
        Ok(HttpRequest {
            method: HttpMethod::Post,
            path: format!("{}/invoices/search", self.base_url),
            headers: vec![("content-type".to_string(), "application/json".to_string())],
            body: Some(body),
        })
    }

    /// Decode the newline-separated search response.
    ///
    /// An empty or whitespace-only body on a successful response is a
    /// success with zero records. Lines that do not split into the expected
    /// field count are skipped; the rest of the batch still succeeds.
    pub fn parse_search_invoices(
        &self,
        response: HttpResponse,
    ) -> FiscalResult<Vec<InvoiceSearchRecord>> {
        if !response.is_success() {
            return FiscalResult::fail(response.reason, response.body);
        }
        if response.body.trim().is_empty() {
            return FiscalResult::success(Vec::new(), response.body);
        }

        let records: Vec<InvoiceSearchRecord> = response
            .body
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(InvoiceSearchRecord::from_line)
            .collect();
        FiscalResult::success(records, response.body)
    }

    // --- helpers ---

    fn get(&self, path: String) -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Get,
            path,
            headers: Vec::new(),
            body: None,
        }
    }

    /// Build a JSON submission, attaching a validated `RequestId` header
    /// when the caller supplied a non-blank id.
    fn build_submission<T: Serialize>(
        &self,
        path: &str,
        payload: &T,
        request_id: Option<&str>,
    ) -> Result<HttpRequest, ApiError> {
        let body = serde_json::to_string(payload)
            .map_err(|e| ApiError::SerializationError(e.to_string()))?;

        let mut headers = vec![("content-type".to_string(), "application/json".to_string())];
        if let Some(id) = request_id.filter(|id| !id.trim().is_empty()) {
            validate_request_id(id).map_err(ApiError::InvalidRequestId)?;
            headers.push((REQUEST_ID_HEADER.to_string(), id.to_string()));
        }

        Ok(HttpRequest {
            method: HttpMethod::Post,
            path: format!("{}/{path}", self.base_url),
            headers,
            body: Some(body),
        })
    }
}

/// Validate a caller-supplied request id before it is attached to a request.
///
/// Both rules are checked unconditionally, so an id that is too long *and*
/// contains an illegal character reports both violations.
pub fn validate_request_id(id: &str) -> Result<(), Vec<RequestIdViolation>> {
    let mut violations = Vec::new();

    let length = id.chars().count();
    if length > MAX_REQUEST_ID_LENGTH {
        violations.push(RequestIdViolation::TooLong { length });
    }

    if let Some((position, character)) = id.char_indices().find(|(_, c)| !c.is_alphanumeric()) {
        violations.push(RequestIdViolation::InvalidCharacter {
            character,
            position,
        });
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(violations)
    }
}

/// Extract the 4-character status token from an unlock response body.
///
/// The device wraps the token in JSON string quotes, so a well-formed body
/// is exactly six characters; the quotes are dropped, not parsed.
fn extract_status_token(body: &str) -> Option<String> {
    let chars: Vec<char> = body.chars().collect();
    if chars.len() != UNLOCK_BODY_LENGTH {
        return None;
    }
    Some(chars[1..5].iter().collect())
}

/// Query string for the invoice-contents operations. Values are fixed enum
/// wire names and booleans, so no percent-encoding is needed.
fn contents_query(
    layout: ReceiptLayout,
    image_format: ReceiptImageFormat,
    include_header_and_footer: bool,
) -> String {
    format!(
        "receiptLayout={}&receiptImageFormat={}&includeHeaderAndFooter={}",
        layout.wire_name(),
        image_format.wire_name(),
        include_header_and_footer,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enums::{InvoiceType, PaymentType, TransactionType};
    use crate::types::{InvoiceItem, Payment};

    fn client() -> FiscalClient {
        FiscalClient::new("http://localhost:3566")
    }

    fn response(status: u16, reason: &str, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            reason: reason.to_string(),
            headers: Vec::new(),
            body: body.to_string(),
        }
    }

    fn sample_invoice() -> Invoice {
        Invoice {
            invoice_type: InvoiceType::Normal,
            transaction_type: TransactionType::Sale,
            cashier: Some("ana".to_string()),
            buyer_id: None,
            items: vec![InvoiceItem {
                name: "Coffee".to_string(),
                quantity: 2.0,
                unit_price: 1.5,
                total_amount: 3.0,
            }],
            payments: vec![Payment {
                payment_type: PaymentType::Cash,
                amount: 3.0,
            }],
        }
    }

    // --- request building ---

    #[test]
    fn build_status_produces_correct_request() {
        let req = client().build_status();
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(req.path, "http://localhost:3566/status");
        assert!(req.body.is_none());
        assert!(req.headers.is_empty());
    }

    #[test]
    fn trailing_slash_is_stripped() {
        let client = FiscalClient::new("http://localhost:3566/");
        let req = client.build_status();
        assert_eq!(req.path, "http://localhost:3566/status");
    }

    #[test]
    fn build_unlock_sends_pin_as_plain_text() {
        let req = client().build_unlock_secure_element("4321");
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.path, "http://localhost:3566/pin");
        assert_eq!(
            req.headers,
            vec![("content-type".to_string(), "text/plain".to_string())]
        );
        assert_eq!(req.body.as_deref(), Some("4321"));
    }

    #[test]
    fn build_issue_invoice_without_request_id() {
        let req = client().build_issue_invoice(&sample_invoice(), None).unwrap();
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.path, "http://localhost:3566/invoices");
        assert_eq!(
            req.headers,
            vec![("content-type".to_string(), "application/json".to_string())]
        );
        let body: serde_json::Value = serde_json::from_str(req.body.as_deref().unwrap()).unwrap();
        assert_eq!(body["invoiceType"], "Normal");
        assert_eq!(body["items"][0]["totalAmount"], 3.0);
    }

    #[test]
    fn build_issue_invoice_attaches_validated_request_id() {
        let req = client()
            .build_issue_invoice(&sample_invoice(), Some("Abc123"))
            .unwrap();
        assert!(req
            .headers
            .contains(&(REQUEST_ID_HEADER.to_string(), "Abc123".to_string())));
    }

    #[test]
    fn blank_request_id_is_neither_validated_nor_attached() {
        let req = client()
            .build_issue_invoice(&sample_invoice(), Some("   "))
            .unwrap();
        assert!(!req.headers.iter().any(|(name, _)| name == REQUEST_ID_HEADER));
    }

    #[test]
    fn build_issue_final_invoice_targets_the_final_path() {
        let final_invoice = FinalInvoice {
            reference_number: "N-3".to_string(),
            invoice: sample_invoice(),
        };
        let req = client()
            .build_issue_final_invoice(&final_invoice, None)
            .unwrap();
        assert_eq!(req.path, "http://localhost:3566/invoices/final");
        let body: serde_json::Value = serde_json::from_str(req.body.as_deref().unwrap()).unwrap();
        assert_eq!(body["referenceNumber"], "N-3");
    }

    #[test]
    fn build_invoice_contents_encodes_query_parameters() {
        let req = client().build_invoice_contents(
            "N-7",
            ReceiptLayout::Slip,
            ReceiptImageFormat::Png,
            true,
        );
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(
            req.path,
            "http://localhost:3566/invoices/N-7?receiptLayout=Slip&receiptImageFormat=Png&includeHeaderAndFooter=true"
        );
    }

    #[test]
    fn build_last_invoice_contents_targets_the_last_path() {
        let req = client().build_last_invoice_contents(
            ReceiptLayout::A4,
            ReceiptImageFormat::Pdf,
            false,
        );
        assert_eq!(
            req.path,
            "http://localhost:3566/invoices/last?receiptLayout=A4&receiptImageFormat=Pdf&includeHeaderAndFooter=false"
        );
    }

    #[test]
    fn build_invoice_by_request_id_produces_correct_request() {
        let req = client().build_invoice_by_request_id("Abc123");
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(req.path, "http://localhost:3566/invoices/request/Abc123");
    }

    #[test]
    fn build_search_invoices_serializes_the_query() {
        let query = InvoiceSearchQuery {
            cashier: Some("ana".to_string()),
            ..InvoiceSearchQuery::default()
        };
        let req = client().build_search_invoices(&query).unwrap();
        assert_eq!(req.path, "http://localhost:3566/invoices/search");
        let body: serde_json::Value = serde_json::from_str(req.body.as_deref().unwrap()).unwrap();
        assert_eq!(body, serde_json::json!({"cashier": "ana"}));
    }

    // --- request id validation ---

    #[test]
    fn request_id_at_the_length_limit_passes() {
        assert!(validate_request_id(&"a".repeat(32)).is_ok());
        assert!(validate_request_id("Abc123").is_ok());
    }

    #[test]
    fn request_id_over_the_limit_fails_length_check() {
        let violations = validate_request_id(&"a".repeat(33)).unwrap_err();
        assert_eq!(violations, vec![RequestIdViolation::TooLong { length: 33 }]);
    }

    #[test]
    fn request_id_with_symbol_fails_character_check() {
        let violations = validate_request_id("abc!23").unwrap_err();
        assert_eq!(
            violations,
            vec![RequestIdViolation::InvalidCharacter {
                character: '!',
                position: 3,
            }]
        );
    }

    #[test]
    fn request_id_breaking_both_rules_reports_both_violations() {
        let id = format!("{}!", "a".repeat(33));
        let violations = validate_request_id(&id).unwrap_err();
        assert_eq!(violations.len(), 2);
        assert!(matches!(violations[0], RequestIdViolation::TooLong { length: 34 }));
        assert!(matches!(
            violations[1],
            RequestIdViolation::InvalidCharacter {
                character: '!',
                position: 33,
            }
        ));
    }

    #[test]
    fn invalid_request_id_aborts_the_build() {
        let err = client()
            .build_issue_invoice(&sample_invoice(), Some(&"a".repeat(33)))
            .unwrap_err();
        assert!(matches!(err, ApiError::InvalidRequestId(_)));
    }

    // --- unlock parsing ---

    #[test]
    fn unlock_decodes_the_middle_four_characters() {
        let result = client().parse_unlock_secure_element(response(200, "OK", "1UNLK2"));
        assert!(result.succeeded());
        assert_eq!(result.value(), Some(&SecureElementStatus::Unlocked));
        assert_eq!(result.raw_body(), "1UNLK2");
    }

    #[test]
    fn unlock_with_quoted_token_body() {
        let result = client().parse_unlock_secure_element(response(200, "OK", "\"UNLK\""));
        assert_eq!(result.value(), Some(&SecureElementStatus::Unlocked));
    }

    #[test]
    fn unlock_failure_status_still_decodes_the_token() {
        let result =
            client().parse_unlock_secure_element(response(401, "Unauthorized", "\"PINX\""));
        assert!(!result.succeeded());
        assert_eq!(result.error_message(), Some("Unauthorized"));
        assert_eq!(result.value(), Some(&SecureElementStatus::PinRejected));
    }

    #[test]
    fn unlock_unknown_token_decodes_to_unrecognized() {
        let result = client().parse_unlock_secure_element(response(200, "OK", "\"WARM\""));
        assert_eq!(
            result.value(),
            Some(&SecureElementStatus::Unrecognized("WARM".to_string()))
        );
    }

    #[test]
    fn unlock_wrong_length_body_always_fails() {
        for body in ["", "UNLK", "\"UNLCK\"", "12345"] {
            let ok = client().parse_unlock_secure_element(response(200, "OK", body));
            assert!(!ok.succeeded(), "body {body:?} on 200");
            assert_eq!(ok.value(), None, "body {body:?} on 200");
            assert_eq!(ok.raw_body(), body);

            let failed = client().parse_unlock_secure_element(response(423, "Locked", body));
            assert!(!failed.succeeded(), "body {body:?} on 423");
            assert_eq!(failed.error_message(), Some("Locked"));
        }
    }

    // --- search parsing ---

    #[test]
    fn search_failure_status_short_circuits() {
        let result = client().parse_search_invoices(response(500, "Internal Server Error", "x"));
        assert!(!result.succeeded());
        assert_eq!(result.error_message(), Some("Internal Server Error"));
        assert_eq!(result.raw_body(), "x");
    }

    #[test]
    fn search_empty_body_is_zero_records() {
        for body in ["", "  \n "] {
            let result = client().parse_search_invoices(response(200, "OK", body));
            assert!(result.succeeded());
            assert_eq!(result.value().unwrap().len(), 0);
        }
    }

    #[test]
    fn search_parses_lines_in_order() {
        let body = "N-1,t1,Normal,Sale,1.0,ana\nN-2,t2,Normal,Sale,2.0,ana\nN-3,t3,Proforma,Sale,3.0,zoe";
        let result = client().parse_search_invoices(response(200, "OK", body));
        let records = result.value().unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].invoice_number, "N-1");
        assert_eq!(records[1].invoice_number, "N-2");
        assert_eq!(records[2].invoice_number, "N-3");
        assert_eq!(records[2].cashier, "zoe");
    }

    #[test]
    fn search_skips_malformed_lines() {
        let body = "N-1,t1,Normal,Sale,1.0,ana\ngarbage line\nN-3,t3,Normal,Sale,3.0,ana";
        let result = client().parse_search_invoices(response(200, "OK", body));
        let records = result.value().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].invoice_number, "N-1");
        assert_eq!(records[1].invoice_number, "N-3");
    }

    #[test]
    fn search_handles_crlf_and_trailing_newline() {
        let body = "N-1,t1,Normal,Sale,1.0,ana\r\nN-2,t2,Normal,Sale,2.0,ana\n";
        let result = client().parse_search_invoices(response(200, "OK", body));
        let records = result.value().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].cashier, "ana");
    }
}
