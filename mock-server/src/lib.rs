//! In-memory implementation of the fiscal device HTTP API, used by the core
//! crate's integration tests and as a standalone dev tool.
//!
//! The device starts locked; `POST /pin` with the configured PIN unlocks it.
//! Issued invoices are kept in memory in issue order. Refunds without a
//! buyer id are assigned a number but declined, which is the device behavior
//! the core's partial-failure extraction exists for.

use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

/// PIN accepted by `POST /pin`.
pub const PIN: &str = "4321";

/// Serial baked into every invoice number.
pub const DEVICE_SERIAL: &str = "MK4R7D2Q";

const SOFTWARE_VERSION: &str = "1.3.0";

/// Base64 placeholders standing in for rendered receipt images.
const PNG_IMAGE: &str = "bW9jay1wbmctcmVjZWlwdA==";
const PDF_IMAGE: &str = "bW9jay1wZGYtcmVjZWlwdA==";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    pub invoice_type: String,
    pub transaction_type: String,
    #[serde(default)]
    pub cashier: Option<String>,
    #[serde(default)]
    pub buyer_id: Option<String>,
    pub items: Vec<InvoiceItem>,
    pub payments: Vec<Payment>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceItem {
    pub name: String,
    pub quantity: f64,
    pub unit_price: f64,
    pub total_amount: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub payment_type: String,
    pub amount: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalInvoice {
    pub reference_number: String,
    #[serde(flatten)]
    pub invoice: Invoice,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceResponse {
    pub invoice_number: String,
    pub invoice_counter: u64,
    pub issued_at: DateTime<Utc>,
    pub total_amount: f64,
    pub signature: String,
    pub verification_url: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceStatus {
    pub device_serial_number: String,
    pub software_version: String,
    pub device_time: DateTime<Utc>,
    pub pin_required: bool,
    pub audit_required: bool,
    pub last_invoice_number: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceContents {
    pub invoice_number: String,
    pub journal: String,
    pub image: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchQuery {
    #[serde(default)]
    pub from_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub to_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub invoice_type: Option<String>,
    #[serde(default)]
    pub cashier: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentsQuery {
    pub receipt_layout: String,
    pub receipt_image_format: String,
    pub include_header_and_footer: bool,
}

#[derive(Debug, Clone)]
struct StoredInvoice {
    response: InvoiceResponse,
    invoice_type: String,
    transaction_type: String,
    cashier: String,
}

#[derive(Default)]
pub struct DeviceState {
    unlocked: bool,
    counter: u64,
    invoices: Vec<StoredInvoice>,
    by_request_id: HashMap<String, InvoiceResponse>,
}

pub type Db = Arc<RwLock<DeviceState>>;

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(DeviceState::default()));
    Router::new()
        .route("/status", get(status))
        .route("/pin", post(unlock))
        .route("/invoices", post(issue_invoice))
        .route("/invoices/final", post(issue_final_invoice))
        .route("/invoices/last", get(last_invoice_contents))
        .route("/invoices/search", post(search_invoices))
        .route("/invoices/{number}", get(invoice_contents))
        .route("/invoices/request/{request_id}", get(invoice_by_request_id))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn status(State(db): State<Db>) -> Json<DeviceStatus> {
    let state = db.read().await;
    Json(DeviceStatus {
        device_serial_number: DEVICE_SERIAL.to_string(),
        software_version: SOFTWARE_VERSION.to_string(),
        device_time: Utc::now(),
        pin_required: !state.unlocked,
        audit_required: false,
        last_invoice_number: state
            .invoices
            .last()
            .map(|inv| inv.response.invoice_number.clone()),
    })
}

/// The unlock response body is the 4-character status token in JSON string
/// form, quotes included.
async fn unlock(State(db): State<Db>, pin: String) -> (StatusCode, String) {
    if pin == PIN {
        db.write().await.unlocked = true;
        (StatusCode::OK, "\"UNLK\"".to_string())
    } else {
        (StatusCode::UNAUTHORIZED, "\"PINX\"".to_string())
    }
}

async fn issue_invoice(
    State(db): State<Db>,
    headers: HeaderMap,
    Json(invoice): Json<Invoice>,
) -> Result<Json<InvoiceResponse>, (StatusCode, Json<Value>)> {
    fiscalize(&db, &headers, invoice).await
}

async fn issue_final_invoice(
    State(db): State<Db>,
    headers: HeaderMap,
    Json(final_invoice): Json<FinalInvoice>,
) -> Result<Json<InvoiceResponse>, (StatusCode, Json<Value>)> {
    let known_reference = db
        .read()
        .await
        .invoices
        .iter()
        .any(|inv| inv.response.invoice_number == final_invoice.reference_number);
    if !known_reference {
        return Err(failure(StatusCode::BAD_REQUEST, "unknown reference document"));
    }
    fiscalize(&db, &headers, final_invoice.invoice).await
}

async fn fiscalize(
    db: &Db,
    headers: &HeaderMap,
    invoice: Invoice,
) -> Result<Json<InvoiceResponse>, (StatusCode, Json<Value>)> {
    let mut state = db.write().await;

    if !state.unlocked {
        return Err(failure(StatusCode::CONFLICT, "secure element is locked"));
    }

    let request_id = headers
        .get("RequestId")
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    if let Some(id) = &request_id {
        if let Some(replay) = state.by_request_id.get(id) {
            return Ok(Json(replay.clone()));
        }
    }

    if invoice.items.is_empty() {
        return Err(failure(StatusCode::BAD_REQUEST, "invoice has no items"));
    }
    let item_total: f64 = invoice.items.iter().map(|item| item.total_amount).sum();
    let payment_total: f64 = invoice.payments.iter().map(|payment| payment.amount).sum();
    if (item_total - payment_total).abs() > 0.005 {
        return Err(failure(
            StatusCode::BAD_REQUEST,
            "payment total does not match item total",
        ));
    }

    state.counter += 1;
    let invoice_number = format!("{DEVICE_SERIAL}-{DEVICE_SERIAL}-{}", state.counter);
    let response = InvoiceResponse {
        invoice_number: invoice_number.clone(),
        invoice_counter: state.counter,
        issued_at: Utc::now(),
        total_amount: item_total,
        signature: Uuid::new_v4().simple().to_string(),
        verification_url: Some(format!("https://verify.example/{invoice_number}")),
    };
    state.invoices.push(StoredInvoice {
        response: response.clone(),
        invoice_type: invoice.invoice_type.clone(),
        transaction_type: invoice.transaction_type.clone(),
        cashier: invoice.cashier.clone().unwrap_or_default(),
    });
    if let Some(id) = request_id {
        state.by_request_id.insert(id, response.clone());
    }

    // Refunds without an identified buyer are assigned a number and then
    // declined; the assigned response rides along in the failure body.
    if invoice.transaction_type == "Refund" && invoice.buyer_id.is_none() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(json!({
                "message": "refund requires a buyer id",
                "invoiceResponse": response,
            })),
        ));
    }

    Ok(Json(response))
}

async fn invoice_contents(
    State(db): State<Db>,
    Path(number): Path<String>,
    Query(query): Query<ContentsQuery>,
) -> Result<Json<InvoiceContents>, (StatusCode, String)> {
    let state = db.read().await;
    let stored = state
        .invoices
        .iter()
        .find(|inv| inv.response.invoice_number == number)
        .ok_or((StatusCode::NOT_FOUND, "unknown invoice number".to_string()))?;
    Ok(Json(render_contents(stored, &query)))
}

async fn last_invoice_contents(
    State(db): State<Db>,
    Query(query): Query<ContentsQuery>,
) -> Result<Json<InvoiceContents>, (StatusCode, String)> {
    let state = db.read().await;
    let stored = state
        .invoices
        .last()
        .ok_or((StatusCode::NOT_FOUND, "no invoices issued".to_string()))?;
    Ok(Json(render_contents(stored, &query)))
}

async fn invoice_by_request_id(
    State(db): State<Db>,
    Path(request_id): Path<String>,
) -> Result<Json<InvoiceResponse>, (StatusCode, String)> {
    let state = db.read().await;
    state
        .by_request_id
        .get(&request_id)
        .cloned()
        .map(Json)
        .ok_or((StatusCode::NOT_FOUND, "unknown request id".to_string()))
}

/// Search results are newline-separated lines of six comma-separated fields.
async fn search_invoices(State(db): State<Db>, Json(query): Json<SearchQuery>) -> String {
    let state = db.read().await;
    state
        .invoices
        .iter()
        .filter(|inv| matches_query(inv, &query))
        .map(|inv| {
            format!(
                "{},{},{},{},{},{}",
                inv.response.invoice_number,
                inv.response.issued_at.to_rfc3339(),
                inv.invoice_type,
                inv.transaction_type,
                inv.response.total_amount,
                inv.cashier,
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn matches_query(stored: &StoredInvoice, query: &SearchQuery) -> bool {
    if let Some(from) = query.from_date {
        if stored.response.issued_at < from {
            return false;
        }
    }
    if let Some(to) = query.to_date {
        if stored.response.issued_at > to {
            return false;
        }
    }
    if let Some(invoice_type) = &query.invoice_type {
        if &stored.invoice_type != invoice_type {
            return false;
        }
    }
    if let Some(cashier) = &query.cashier {
        if &stored.cashier != cashier {
            return false;
        }
    }
    true
}

fn render_contents(stored: &StoredInvoice, query: &ContentsQuery) -> InvoiceContents {
    let image = match query.receipt_image_format.as_str() {
        "Pdf" => PDF_IMAGE,
        _ => PNG_IMAGE,
    };
    InvoiceContents {
        invoice_number: stored.response.invoice_number.clone(),
        journal: render_journal(stored, query),
        image: Some(image.to_string()),
    }
}

fn render_journal(stored: &StoredInvoice, query: &ContentsQuery) -> String {
    let width = if query.receipt_layout == "A4" { 64 } else { 32 };
    let rule = "=".repeat(width);

    let mut lines = Vec::new();
    if query.include_header_and_footer {
        lines.push(rule.clone());
        lines.push("FISCAL RECEIPT".to_string());
    }
    lines.push(format!("number: {}", stored.response.invoice_number));
    lines.push(format!("issued: {}", stored.response.issued_at.to_rfc3339()));
    lines.push(format!("total: {:.2}", stored.response.total_amount));
    if !stored.cashier.is_empty() {
        lines.push(format!("cashier: {}", stored.cashier));
    }
    if query.include_header_and_footer {
        lines.push(format!("signature: {}", stored.response.signature));
        lines.push(rule);
    }
    lines.join("\n")
}

fn failure(status: StatusCode, message: &str) -> (StatusCode, Json<Value>) {
    (status, Json(json!({ "message": message })))
}
