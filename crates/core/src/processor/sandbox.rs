//! In-memory processor used for local runs and tests.
//!
//! Mirrors the subset of processor behaviour the workflow relies on: setup
//! intents are single-use, payment methods belong to at most one customer and
//! a detached default method clears the customer's default. Test card tokens
//! follow the processor's `pm_card_*` naming.

use std::{collections::HashMap, time::Duration};

use chrono::Datelike;
use indexmap::IndexMap;
use parking_lot::Mutex;
use payment_methods_types::{
    BillingDetails, Card, CardBrand, CardElement, CardSetup, DefaultPaymentMethod, SetupIntent,
    StripeCustomer,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{NewCustomer, PaymentProcessor};
use crate::error::{ProcessorError, Result};

/// Token that always fails confirmation with `card_declined`
pub const DECLINED_CARD_TOKEN: &str = "pm_card_chargeDeclined";

/// Generate a processor-style id such as `cus_1a2b3c...`
pub fn generate_stripe_id(prefix: &str) -> String {
    let uuid_str = uuid::Uuid::new_v4().to_string().replace("-", "");
    format!("{}_{}", prefix, &uuid_str[..24])
}

/// A processor call, as recorded by the sandbox
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProcessorCall {
    CreateSetupIntent,
    ConfirmCardSetup,
    CreateCustomer,
    AttachPaymentMethod,
    SetDefaultPaymentMethod,
    ReplaceDefaultPaymentMethod,
    DetachPaymentMethod,
    FetchCustomer,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SandboxCustomer {
    pub id: String,
    pub user_id: String,
    pub email: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_payment_method: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SandboxPaymentMethod {
    pub id: String,
    pub card: Card,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub billing_details: Option<BillingDetails>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SandboxSetupIntent {
    pub id: String,
    pub client_secret: String,
    /// Set once the intent has been confirmed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<String>,
}

/// Persistable sandbox contents
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SandboxState {
    #[serde(default)]
    pub customers: IndexMap<String, SandboxCustomer>,
    #[serde(default)]
    pub payment_methods: IndexMap<String, SandboxPaymentMethod>,
    #[serde(default)]
    pub setup_intents: IndexMap<String, SandboxSetupIntent>,
}

fn missing(kind: &str, id: &str) -> ProcessorError {
    ProcessorError::api("resource_missing", format!("No such {}: '{}'", kind, id))
}

/// Build the card behind a `pm_card_*` test token
fn test_card(token: &str) -> Result<Card> {
    let (brand, last4) = match token {
        "pm_card_visa" => (CardBrand::Visa, "4242"),
        "pm_card_visa_debit" => (CardBrand::Visa, "5556"),
        "pm_card_mastercard" => (CardBrand::Mastercard, "4444"),
        "pm_card_amex" => (CardBrand::Amex, "8431"),
        "pm_card_discover" => (CardBrand::Discover, "1117"),
        DECLINED_CARD_TOKEN => {
            return Err(ProcessorError::api("card_declined", "Your card was declined."));
        }
        _ => {
            return Err(ProcessorError::api(
                "resource_missing",
                format!("No such PaymentMethod: '{}'", token),
            ));
        }
    };

    Ok(Card {
        brand,
        expiration_month: 12,
        expiration_year: chrono::Utc::now().year() + 3,
        last4_digits: last4.to_string(),
    })
}

/// In-memory [`PaymentProcessor`] with call recording and failure injection
#[derive(Debug, Default)]
pub struct SandboxProcessor {
    state: Mutex<SandboxState>,
    calls: Mutex<Vec<ProcessorCall>>,
    failures: Mutex<HashMap<ProcessorCall, ProcessorError>>,
    latency: Option<Duration>,
}

impl SandboxProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resume from previously persisted contents
    pub fn from_state(state: SandboxState) -> Self {
        Self {
            state: Mutex::new(state),
            ..Self::default()
        }
    }

    /// Delay every call, so concurrent invocations overlap
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Make the next call of `call` fail with `error`
    pub fn fail_next(&self, call: ProcessorCall, error: ProcessorError) {
        self.failures.lock().insert(call, error);
    }

    pub fn snapshot(&self) -> SandboxState {
        self.state.lock().clone()
    }

    /// Every call received so far, in order
    pub fn calls(&self) -> Vec<ProcessorCall> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self, call: ProcessorCall) -> usize {
        self.calls.lock().iter().filter(|c| **c == call).count()
    }

    /// Seed a customer with an attached default card, bypassing the workflow
    pub fn seed_customer(&self, user_id: &str, email: &str, token: &str) -> Result<StripeCustomer> {
        let card = test_card(token)?;
        let mut state = self.state.lock();
        let customer_id = generate_stripe_id("cus");
        let payment_method_id = generate_stripe_id("pm");

        state.payment_methods.insert(
            payment_method_id.clone(),
            SandboxPaymentMethod {
                id: payment_method_id.clone(),
                card,
                customer: Some(customer_id.clone()),
                billing_details: None,
            },
        );
        state.customers.insert(
            customer_id.clone(),
            SandboxCustomer {
                id: customer_id.clone(),
                user_id: user_id.to_string(),
                email: email.to_string(),
                name: String::new(),
                default_payment_method: Some(payment_method_id),
            },
        );

        customer_view(&state, &customer_id)
    }

    async fn enter(&self, call: ProcessorCall) -> Result<()> {
        self.calls.lock().push(call);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        match self.failures.lock().remove(&call) {
            Some(error) => {
                debug!(?call, %error, "Sandbox injected failure");
                Err(error)
            }
            None => Ok(()),
        }
    }
}

fn customer_view(state: &SandboxState, customer_id: &str) -> Result<StripeCustomer> {
    let customer = state
        .customers
        .get(customer_id)
        .ok_or_else(|| missing("customer", customer_id))?;

    let default_payment_method = customer
        .default_payment_method
        .as_ref()
        .and_then(|id| state.payment_methods.get(id))
        .map(|pm| DefaultPaymentMethod {
            id: pm.id.clone(),
            stripe_payment_method_id: pm.id.clone(),
            card: pm.card.clone(),
        });

    Ok(StripeCustomer {
        stripe_customer_id: customer.id.clone(),
        default_payment_method,
    })
}

fn attach(state: &mut SandboxState, customer_id: &str, payment_method_id: &str) -> Result<()> {
    if !state.customers.contains_key(customer_id) {
        return Err(missing("customer", customer_id));
    }
    let pm = state
        .payment_methods
        .get_mut(payment_method_id)
        .ok_or_else(|| missing("payment_method", payment_method_id))?;

    match pm.customer.as_deref() {
        Some(owner) if owner != customer_id => Err(ProcessorError::api(
            "payment_method_unexpected_state",
            "The payment method is already attached to another customer.",
        )),
        _ => {
            pm.customer = Some(customer_id.to_string());
            Ok(())
        }
    }
}

fn set_default(state: &mut SandboxState, customer_id: &str, payment_method_id: &str) -> Result<()> {
    let attached = state
        .payment_methods
        .get(payment_method_id)
        .is_some_and(|pm| pm.customer.as_deref() == Some(customer_id));
    if !attached {
        return Err(ProcessorError::api(
            "invalid_request_error",
            "The payment method must be attached to the customer.",
        ));
    }
    let customer = state
        .customers
        .get_mut(customer_id)
        .ok_or_else(|| missing("customer", customer_id))?;
    customer.default_payment_method = Some(payment_method_id.to_string());
    Ok(())
}

fn detach(state: &mut SandboxState, payment_method_id: &str) -> Result<()> {
    let pm = state
        .payment_methods
        .get_mut(payment_method_id)
        .ok_or_else(|| missing("payment_method", payment_method_id))?;
    let customer_id = pm.customer.take().ok_or_else(|| {
        ProcessorError::api(
            "payment_method_unexpected_state",
            "The payment method is not attached to a customer.",
        )
    })?;

    if let Some(customer) = state.customers.get_mut(&customer_id) {
        if customer.default_payment_method.as_deref() == Some(payment_method_id) {
            customer.default_payment_method = None;
        }
    }
    Ok(())
}

impl PaymentProcessor for SandboxProcessor {
    async fn create_setup_intent(&self) -> Result<SetupIntent> {
        self.enter(ProcessorCall::CreateSetupIntent).await?;

        let id = generate_stripe_id("seti");
        let client_secret = format!("{}_secret_{}", id, generate_stripe_id("s"));
        self.state.lock().setup_intents.insert(
            id.clone(),
            SandboxSetupIntent {
                id: id.clone(),
                client_secret: client_secret.clone(),
                payment_method: None,
            },
        );

        Ok(SetupIntent { id, client_secret })
    }

    async fn confirm_card_setup(
        &self,
        client_secret: &str,
        card: &CardElement,
        billing_details: &BillingDetails,
    ) -> Result<CardSetup> {
        self.enter(ProcessorCall::ConfirmCardSetup).await?;

        let intent_id = SetupIntent::id_from_client_secret(client_secret).ok_or_else(|| {
            ProcessorError::InvalidRequest("malformed setup intent client secret".to_string())
        })?;

        let mut state = self.state.lock();
        let intent = state
            .setup_intents
            .get(intent_id)
            .filter(|intent| intent.client_secret == client_secret)
            .ok_or_else(|| missing("setup_intent", intent_id))?;
        if intent.payment_method.is_some() {
            return Err(ProcessorError::api(
                "setup_intent_unexpected_state",
                "This SetupIntent has already been confirmed.",
            ));
        }

        let confirmed_card = test_card(card.token())?;
        let payment_method_id = generate_stripe_id("pm");
        state.payment_methods.insert(
            payment_method_id.clone(),
            SandboxPaymentMethod {
                id: payment_method_id.clone(),
                card: confirmed_card,
                customer: None,
                billing_details: Some(billing_details.clone()),
            },
        );
        if let Some(intent) = state.setup_intents.get_mut(intent_id) {
            intent.payment_method = Some(payment_method_id.clone());
        }

        Ok(CardSetup {
            setup_intent_id: intent_id.to_string(),
            payment_method_id,
        })
    }

    async fn create_customer(&self, customer: NewCustomer<'_>) -> Result<String> {
        self.enter(ProcessorCall::CreateCustomer).await?;

        let mut state = self.state.lock();
        if !state.payment_methods.contains_key(customer.payment_method_id) {
            return Err(missing("payment_method", customer.payment_method_id));
        }

        let customer_id = generate_stripe_id("cus");
        state.customers.insert(
            customer_id.clone(),
            SandboxCustomer {
                id: customer_id.clone(),
                user_id: customer.user_id.to_string(),
                email: customer.email.to_string(),
                name: customer.name.to_string(),
                default_payment_method: None,
            },
        );
        attach(&mut state, &customer_id, customer.payment_method_id)?;
        set_default(&mut state, &customer_id, customer.payment_method_id)?;

        Ok(customer_id)
    }

    async fn attach_payment_method(
        &self,
        customer_id: &str,
        payment_method_id: &str,
    ) -> Result<()> {
        self.enter(ProcessorCall::AttachPaymentMethod).await?;
        attach(&mut self.state.lock(), customer_id, payment_method_id)
    }

    async fn set_default_payment_method(
        &self,
        customer_id: &str,
        payment_method_id: &str,
    ) -> Result<()> {
        self.enter(ProcessorCall::SetDefaultPaymentMethod).await?;
        set_default(&mut self.state.lock(), customer_id, payment_method_id)
    }

    async fn replace_default_payment_method(
        &self,
        customer_id: &str,
        previous_payment_method_id: &str,
        payment_method_id: &str,
    ) -> Result<()> {
        self.enter(ProcessorCall::ReplaceDefaultPaymentMethod)
            .await?;

        let mut state = self.state.lock();
        attach(&mut state, customer_id, payment_method_id)?;
        set_default(&mut state, customer_id, payment_method_id)?;
        if previous_payment_method_id != payment_method_id {
            detach(&mut state, previous_payment_method_id)?;
        }
        Ok(())
    }

    async fn detach_payment_method(&self, payment_method_id: &str) -> Result<()> {
        self.enter(ProcessorCall::DetachPaymentMethod).await?;
        detach(&mut self.state.lock(), payment_method_id)
    }

    async fn fetch_customer(&self, customer_id: &str) -> Result<StripeCustomer> {
        self.enter(ProcessorCall::FetchCustomer).await?;
        customer_view(&self.state.lock(), customer_id)
    }
}
