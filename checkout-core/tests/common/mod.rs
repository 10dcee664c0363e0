#![allow(dead_code)]

//! Shared harness for the integration tests: a scriptable widget, a mock
//! backend, and builders for the domain types.

use std::collections::VecDeque;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, Once};

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde_json::{json, Value};
use wiremock::MockServer;

use checkout_core::config::{ApiSettings, GatewaySettings, ReconciliationSettings, Settings};
use checkout_core::models::{Customer, PaymentPlan, ProductLine, ProductParameters};
use checkout_core::services::{
    CheckoutOutcome, CheckoutWidget, GatewayCallback, MemoryNotifier, WidgetConfig, WidgetError,
};
use checkout_core::CheckoutEngine;

static INIT: Once = Once::new();

/// Initialize tracing for tests (only once).
pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter("info,checkout_core=debug")
            .with_test_writer()
            .try_init()
            .ok();
    });
}

pub fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

/// Widget double. Scripted outcomes come back in push order; every probe
/// and every opened config is recorded for assertions.
pub struct ScriptedWidget {
    attached: AtomicBool,
    attach_after_probes: AtomicU32,
    probes: AtomicU32,
    outcomes: Mutex<VecDeque<Result<CheckoutOutcome, WidgetError>>>,
    opened: Mutex<Vec<WidgetConfig>>,
}

impl ScriptedWidget {
    fn with_attached(attached: bool) -> Arc<Self> {
        Arc::new(Self {
            attached: AtomicBool::new(attached),
            attach_after_probes: AtomicU32::new(0),
            probes: AtomicU32::new(0),
            outcomes: Mutex::new(VecDeque::new()),
            opened: Mutex::new(Vec::new()),
        })
    }

    pub fn attached() -> Arc<Self> {
        Self::with_attached(true)
    }

    pub fn detached() -> Arc<Self> {
        Self::with_attached(false)
    }

    /// Starts detached and reports attached on the nth probe.
    pub fn attaching_after(probes: u32) -> Arc<Self> {
        let widget = Self::with_attached(false);
        widget.attach_after_probes.store(probes, Ordering::SeqCst);
        widget
    }

    pub fn attach(&self) {
        self.attached.store(true, Ordering::SeqCst);
    }

    pub fn detach(&self) {
        self.attached.store(false, Ordering::SeqCst);
    }

    pub fn push_success(&self, reference: &str) {
        self.outcomes
            .lock()
            .unwrap()
            .push_back(Ok(CheckoutOutcome::Completed(GatewayCallback {
                status: "success".to_string(),
                reference: reference.to_string(),
                transaction: Some(format!("trx-{}", reference)),
                redirect_url: None,
            })));
    }

    pub fn push_declined(&self, reference: &str, status: &str) {
        self.outcomes
            .lock()
            .unwrap()
            .push_back(Ok(CheckoutOutcome::Completed(GatewayCallback {
                status: status.to_string(),
                reference: reference.to_string(),
                transaction: None,
                redirect_url: None,
            })));
    }

    pub fn push_cancelled(&self) {
        self.outcomes
            .lock()
            .unwrap()
            .push_back(Ok(CheckoutOutcome::Cancelled));
    }

    pub fn push_failure(&self, error: WidgetError) {
        self.outcomes.lock().unwrap().push_back(Err(error));
    }

    /// Configs the adapter handed over, in call order.
    pub fn opened(&self) -> Vec<WidgetConfig> {
        self.opened.lock().unwrap().clone()
    }

    pub fn open_count(&self) -> usize {
        self.opened.lock().unwrap().len()
    }

    pub fn probe_count(&self) -> u32 {
        self.probes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CheckoutWidget for ScriptedWidget {
    fn is_attached(&self) -> bool {
        self.probes.fetch_add(1, Ordering::SeqCst);
        if self.attached.load(Ordering::SeqCst) {
            return true;
        }
        let remaining = self.attach_after_probes.load(Ordering::SeqCst);
        if remaining > 0 {
            self.attach_after_probes
                .store(remaining - 1, Ordering::SeqCst);
            if remaining == 1 {
                self.attached.store(true, Ordering::SeqCst);
                return true;
            }
        }
        false
    }

    async fn open(&self, config: WidgetConfig) -> Result<CheckoutOutcome, WidgetError> {
        self.opened.lock().unwrap().push(config);
        self.outcomes
            .lock()
            .unwrap()
            .pop_front()
            .expect("no scripted widget outcome left")
    }
}

/// Gateway settings with a small polling budget so tests stay fast.
pub fn test_gateway_settings() -> GatewaySettings {
    GatewaySettings {
        public_key: "pk_test_0123456789abcdef0123".to_string(),
        currency: "NGN".to_string(),
        channels: vec!["card".to_string(), "bank".to_string()],
        readiness_max_attempts: 3,
        readiness_interval_ms: 10,
    }
}

pub fn test_settings(base_url: &str) -> Settings {
    Settings {
        api: ApiSettings {
            base_url: base_url.to_string(),
        },
        gateway: test_gateway_settings(),
        reconciliation: ReconciliationSettings {
            poll_max_attempts: 3,
            poll_interval_ms: 10,
            completion_floor: Decimal::from(1000),
        },
    }
}

/// Engine wired to a mock backend and a scripted widget.
pub struct TestCheckout {
    pub server: MockServer,
    pub engine: CheckoutEngine,
    pub widget: Arc<ScriptedWidget>,
    pub notifier: Arc<MemoryNotifier>,
}

impl TestCheckout {
    pub async fn spawn() -> Self {
        Self::spawn_with(ScriptedWidget::attached()).await
    }

    pub async fn spawn_with(widget: Arc<ScriptedWidget>) -> Self {
        init_tracing();

        let server = MockServer::start().await;
        let notifier = MemoryNotifier::new();
        let engine = CheckoutEngine::build(
            test_settings(&server.uri()),
            widget.clone(),
            notifier.clone(),
        );

        TestCheckout {
            server,
            engine,
            widget,
            notifier,
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
        name: "Solar Panel 450W".to_string(),
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

/// JSON payment record row for mock sale views.
pub fn payment_row(id: &str, reference: &str, amount: &str, status: &str) -> Value {
    json!({
        "id": id,
        "transactionRef": reference,
        "amount": amount,
        "status": status,
        "paymentMethod": "ONLINE",
        "createdAt": "2026-08-20T10:00:00Z"
    })
}

/// JSON body for `GET /v1/sales/single/:id`.
pub fn sale_view_body(
    sale_id: &str,
    total: &str,
    plan: &str,
    installments: Option<u32>,
    payments: &[Value],
) -> Value {
    json!({
        "sale": {
            "id": sale_id,
            "totalAmount": total,
            "paymentPlan": plan,
            "totalInstallments": installments,
        },
        "paymentInfo": payments,
        "customer": {
            "name": "Ada Obi",
            "email": "ada@example.com",
            "phoneNumber": "+2348000000000"
        }
    })
}
