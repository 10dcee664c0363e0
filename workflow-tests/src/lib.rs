//! End-to-end checkout workflow tests library.
//!
//! Provides a simulated sales backend and gateway widget so complete operator
//! journeys run through the real engine wiring: compose a draft, confirm it,
//! charge through the gateway, verify, record, and complete later payments.
//!
//! The backend keeps per-sale state between calls, so a payment recorded by
//! one step is visible to the next the way the real API behaves.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Once};

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use serde_json::json;
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

use checkout_core::config::{ApiSettings, GatewaySettings, ReconciliationSettings, Settings};
use checkout_core::dtos::{
    CreateSaleRequest, CreateSaleResponse, CreatedSale, CustomerSummary, PaymentData,
    RecordPaymentRequest, SaleHeader, SaleViewResponse,
};
use checkout_core::models::{
    Customer, PaymentInfo, PaymentMethod, PaymentPlan, PaymentStatus, ProductLine,
    ProductParameters,
};
use checkout_core::services::{
    CheckoutOutcome, CheckoutWidget, GatewayCallback, MemoryNotifier, WidgetConfig, WidgetError,
};
use checkout_core::CheckoutEngine;

static INIT: Once = Once::new();

/// Initialize tracing for tests (only once).
pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter("info,workflow_tests=debug,checkout_core=debug")
            .with_test_writer()
            .try_init()
            .ok();
    });
}

pub fn dec(s: &str) -> Decimal {
    s.parse().expect("Failed to parse decimal literal")
}

#[derive(Default)]
struct BackendState {
    counter: u32,
    sales: HashMap<String, SaleRecord>,
    last_verified: Option<String>,
}

struct SaleRecord {
    header: SaleHeader,
    customer: CustomerSummary,
    primary_reference: String,
    payments: Vec<PaymentInfo>,
}

impl SaleRecord {
    fn view(&self) -> SaleViewResponse {
        SaleViewResponse {
            sale: self.header.clone(),
            payment_info: self.payments.clone(),
            customer: self.customer.clone(),
        }
    }
}

/// In-process stand-in for the sales backend.
///
/// Sales minted by `POST /v1/sales/create` get sequential ids and references
/// and a PENDING payment row for the server-computed total. Recording a
/// payment updates the matching row, or appends one when the reference is new
/// to the sale (online completions mint fresh references).
pub struct SimulatedBackend {
    pub server: MockServer,
    state: Arc<Mutex<BackendState>>,
}

impl SimulatedBackend {
    pub async fn start() -> Self {
        let server = MockServer::start().await;
        let state = Arc::new(Mutex::new(BackendState::default()));

        Mock::given(method("POST"))
            .and(path("/v1/sales/create"))
            .respond_with(CreateSaleResponder {
                state: Arc::clone(&state),
            })
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/v1/payment/verify/callback"))
            .respond_with(VerifyResponder {
                state: Arc::clone(&state),
            })
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/v1/sales/record-cash-payment"))
            .respond_with(RecordPaymentResponder {
                state: Arc::clone(&state),
            })
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path_regex(r"^/v1/sales/single/.+$"))
            .respond_with(FetchSaleResponder {
                state: Arc::clone(&state),
            })
            .mount(&server)
            .await;

        Self { server, state }
    }

    pub fn base_url(&self) -> String {
        self.server.uri()
    }

    pub fn sale_count(&self) -> usize {
        self.state.lock().unwrap().sales.len()
    }

    /// Rows held for one sale as (reference, amount, status) triples.
    pub fn payments(&self, sale_id: &str) -> Vec<(String, Decimal, PaymentStatus)> {
        self.state
            .lock()
            .unwrap()
            .sales
            .get(sale_id)
            .map(|sale| {
                sale.payments
                    .iter()
                    .map(|p| (p.transaction_ref.clone(), p.amount, p.status))
                    .collect()
            })
            .unwrap_or_default()
    }
}

struct CreateSaleResponder {
    state: Arc<Mutex<BackendState>>,
}

impl Respond for CreateSaleResponder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let parsed: CreateSaleRequest = match serde_json::from_slice(&request.body) {
            Ok(parsed) => parsed,
            Err(_) => {
                return ResponseTemplate::new(400)
                    .set_body_json(json!({ "message": "Malformed sale payload" }))
            }
        };

        let total: Decimal = parsed.products.iter().map(ProductLine::line_total).sum();
        let plan = if parsed
            .products
            .iter()
            .any(|p| p.parameters.payment_plan == PaymentPlan::Installment)
        {
            PaymentPlan::Installment
        } else {
            PaymentPlan::OneOff
        };
        let installments = parsed
            .products
            .iter()
            .filter_map(|p| p.parameters.number_of_installments)
            .max();

        let mut state = self.state.lock().unwrap();
        state.counter += 1;
        let sale_id = format!("sale-{}", state.counter);
        let reference = format!("TXREF-{}", state.counter);

        let record = SaleRecord {
            header: SaleHeader {
                id: sale_id.clone(),
                total_amount: total,
                payment_plan: plan,
                total_installments: installments,
            },
            customer: CustomerSummary {
                name: parsed.customer.name.clone(),
                email: parsed.customer.email.clone(),
                phone_number: Some(parsed.customer.phone_number.clone()),
            },
            primary_reference: reference.clone(),
            payments: vec![PaymentInfo {
                id: format!("{}-pay-1", sale_id),
                transaction_ref: reference.clone(),
                amount: total,
                status: PaymentStatus::Pending,
                payment_method: Some(parsed.payment_method),
                created_at: Utc::now(),
            }],
        };
        state.sales.insert(sale_id.clone(), record);

        tracing::debug!(sale_id = %sale_id, total = %total, "Simulated sale created");

        ResponseTemplate::new(200).set_body_json(CreateSaleResponse {
            sale: CreatedSale { id: sale_id },
            payment_data: PaymentData {
                amount: total,
                transaction_ref: reference,
            },
        })
    }
}

struct VerifyResponder {
    state: Arc<Mutex<BackendState>>,
}

impl Respond for VerifyResponder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let reference = request
            .url
            .query_pairs()
            .find(|(key, _)| key == "txref")
            .map(|(_, value)| value.into_owned());

        match reference {
            Some(reference) => {
                tracing::debug!(reference = %reference, "Simulated verification");
                self.state.lock().unwrap().last_verified = Some(reference);
                ResponseTemplate::new(200).set_body_json(json!({
                    "data": { "status": "success" }
                }))
            }
            None => ResponseTemplate::new(400)
                .set_body_json(json!({ "message": "Missing transaction reference" })),
        }
    }
}

struct RecordPaymentResponder {
    state: Arc<Mutex<BackendState>>,
}

impl Respond for RecordPaymentResponder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let parsed: RecordPaymentRequest = match serde_json::from_slice(&request.body) {
            Ok(parsed) => parsed,
            Err(_) => {
                return ResponseTemplate::new(400)
                    .set_body_json(json!({ "message": "Malformed payment payload" }))
            }
        };

        let mut state = self.state.lock().unwrap();
        let last_verified = state.last_verified.clone();
        let sale = match state.sales.get_mut(&parsed.sale_id) {
            Some(sale) => sale,
            None => {
                return ResponseTemplate::new(404)
                    .set_body_json(json!({ "message": "Sale not found" }))
            }
        };

        // Online records settle against the reference the gateway verified;
        // cash records settle against the sale's own reference.
        let reference = match parsed.payment_method {
            PaymentMethod::Online => {
                last_verified.unwrap_or_else(|| sale.primary_reference.clone())
            }
            PaymentMethod::Cash => sale.primary_reference.clone(),
        };

        match sale
            .payments
            .iter_mut()
            .find(|p| p.transaction_ref == reference)
        {
            Some(row) => {
                row.amount = parsed.amount;
                row.status = parsed.status;
                row.payment_method = Some(parsed.payment_method);
            }
            None => {
                let id = format!("{}-pay-{}", parsed.sale_id, sale.payments.len() + 1);
                sale.payments.push(PaymentInfo {
                    id,
                    transaction_ref: reference.clone(),
                    amount: parsed.amount,
                    status: parsed.status,
                    payment_method: Some(parsed.payment_method),
                    created_at: Utc::now(),
                });
            }
        }

        tracing::debug!(
            sale_id = %parsed.sale_id,
            reference = %reference,
            amount = %parsed.amount,
            status = %parsed.status,
            "Simulated payment recorded"
        );

        ResponseTemplate::new(200).set_body_json(json!({
            "message": "Payment recorded successfully"
        }))
    }
}

struct FetchSaleResponder {
    state: Arc<Mutex<BackendState>>,
}

impl Respond for FetchSaleResponder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let sale_id = request
            .url
            .path()
            .rsplit('/')
            .next()
            .unwrap_or_default()
            .to_string();

        let state = self.state.lock().unwrap();
        match state.sales.get(&sale_id) {
            Some(sale) => ResponseTemplate::new(200).set_body_json(sale.view()),
            None => {
                ResponseTemplate::new(404).set_body_json(json!({ "error": "Sale not found" }))
            }
        }
    }
}

/// Scripted outcome for the next widget open. The default approves the
/// charge, echoing the configured reference back in the callback.
#[derive(Debug, Clone)]
pub enum WidgetScript {
    Approve,
    Cancel,
    Decline(String),
}

/// Hosted-widget double for full journeys.
pub struct SimWidget {
    attached: AtomicBool,
    scripts: Mutex<VecDeque<WidgetScript>>,
    opened: Mutex<Vec<WidgetConfig>>,
}

impl SimWidget {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            attached: AtomicBool::new(true),
            scripts: Mutex::new(VecDeque::new()),
            opened: Mutex::new(Vec::new()),
        })
    }

    pub fn detached() -> Arc<Self> {
        let widget = Self::new();
        widget.attached.store(false, Ordering::SeqCst);
        widget
    }

    pub fn attach(&self) {
        self.attached.store(true, Ordering::SeqCst);
    }

    pub fn detach(&self) {
        self.attached.store(false, Ordering::SeqCst);
    }

    /// Queue a non-default outcome for the next open.
    pub fn script_next(&self, script: WidgetScript) {
        self.scripts.lock().unwrap().push_back(script);
    }

    pub fn opened(&self) -> Vec<WidgetConfig> {
        self.opened.lock().unwrap().clone()
    }

    pub fn open_count(&self) -> usize {
        self.opened.lock().unwrap().len()
    }
}

#[async_trait]
impl CheckoutWidget for SimWidget {
    fn is_attached(&self) -> bool {
        self.attached.load(Ordering::SeqCst)
    }

    async fn open(&self, config: WidgetConfig) -> Result<CheckoutOutcome, WidgetError> {
        self.opened.lock().unwrap().push(config.clone());
        let script = self
            .scripts
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(WidgetScript::Approve);

        match script {
            WidgetScript::Approve => Ok(CheckoutOutcome::Completed(GatewayCallback {
                status: "success".to_string(),
                reference: config.reference.clone(),
                transaction: Some(format!("trx-{}", config.reference)),
                redirect_url: None,
            })),
            WidgetScript::Cancel => Ok(CheckoutOutcome::Cancelled),
            WidgetScript::Decline(status) => Ok(CheckoutOutcome::Completed(GatewayCallback {
                status,
                reference: config.reference,
                transaction: None,
                redirect_url: None,
            })),
        }
    }
}

/// Settings wired at the simulated backend with tight poll budgets.
pub fn test_settings(base_url: &str) -> Settings {
    Settings {
        api: ApiSettings {
            base_url: base_url.to_string(),
        },
        gateway: GatewaySettings {
            public_key: "pk_test_0123456789abcdef0123".to_string(),
            currency: "NGN".to_string(),
            channels: vec!["card".to_string(), "bank".to_string()],
            readiness_max_attempts: 3,
            readiness_interval_ms: 10,
        },
        reconciliation: ReconciliationSettings {
            poll_max_attempts: 3,
            poll_interval_ms: 10,
            completion_floor: dec("1000"),
        },
    }
}

/// One engine wired against a fresh simulated backend.
pub struct WorkflowHarness {
    pub backend: SimulatedBackend,
    pub widget: Arc<SimWidget>,
    pub notifier: Arc<MemoryNotifier>,
    pub engine: CheckoutEngine,
}

impl WorkflowHarness {
    pub async fn spawn() -> Self {
        Self::spawn_with(SimWidget::new()).await
    }

    pub async fn spawn_with(widget: Arc<SimWidget>) -> Self {
        init_tracing();
        let backend = SimulatedBackend::start().await;
        let notifier = MemoryNotifier::new();
        let engine = CheckoutEngine::build(
            test_settings(&backend.base_url()),
            widget.clone(),
            notifier.clone(),
        );

        Self {
            backend,
            widget,
            notifier,
            engine,
        }
    }
}

pub fn customer() -> Customer {
    Customer {
        name: "Ada Obi".to_string(),
        email: "ada@example.com".to_string(),
        phone_number: "+2348000000000".to_string(),
        address: None,
    }
}

pub fn product(product_id: &str, price: &str, quantity: u32) -> ProductLine {
    ProductLine {
        product_id: product_id.to_string(),
        name: format!("Product {}", product_id),
        unit_price: dec(price),
        quantity,
        parameters: ProductParameters::default(),
        recipient: None,
        miscellaneous: vec![],
    }
}

pub fn installment_product(product_id: &str, price: &str, installments: u32) -> ProductLine {
    let mut line = product(product_id, price, 1);
    line.parameters.payment_plan = PaymentPlan::Installment;
    line.parameters.number_of_installments = Some(installments);
    line
}
