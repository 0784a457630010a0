use std::{collections::HashMap, str::FromStr};

use payment_methods_core::{NewCustomer, PaymentProcessor, ProcessorError, error::Result};
use payment_methods_types::{
    BillingDetails, Card, CardBrand, CardElement, CardSetup, DefaultPaymentMethod, SetupIntent,
    StripeCustomer,
};
use serde_json::Value;
use tracing::{debug, info};

pub mod rest;

use rest::{DEFAULT_API_BASE, RestClient, SetupIntentObject, billing_form, card_setup_from_intent};

/// Metadata key linking a processor customer to the marketplace user
pub const USER_ID_METADATA_KEY: &str = "user_id";

/// Whether `api_key` belongs to a test mode account
pub fn is_test_key(api_key: &str) -> bool {
    api_key.starts_with("sk_test_") || api_key.starts_with("rk_test_")
}

fn parse_id<T: FromStr>(id: &str, kind: &str) -> Result<T> {
    id.parse()
        .map_err(|_| ProcessorError::InvalidRequest(format!("Invalid {} id: '{}'", kind, id)))
}

fn map_stripe_error(error: stripe::StripeError) -> ProcessorError {
    match error {
        stripe::StripeError::Stripe(request_error) => {
            let code = request_error
                .code
                .as_ref()
                .map(|c| format!("{:?}", c))
                .unwrap_or_else(|| request_error.http_status.to_string());
            let message = request_error
                .message
                .unwrap_or_else(|| "Unknown error".to_string());
            ProcessorError::Api { code, message }
        }
        stripe::StripeError::Timeout => ProcessorError::Transport("Request timed out".to_string()),
        other => ProcessorError::Transport(other.to_string()),
    }
}

fn convert_card(card: &stripe::CardDetails) -> Card {
    Card {
        brand: CardBrand::from_processor(&card.brand.to_string()),
        expiration_month: card.exp_month as u32,
        expiration_year: card.exp_year as i32,
        last4_digits: card.last4.clone(),
    }
}

fn convert_payment_method(pm: &stripe::PaymentMethod) -> Option<DefaultPaymentMethod> {
    let card = pm.card.as_ref()?;
    Some(DefaultPaymentMethod {
        id: pm.id.to_string(),
        stripe_payment_method_id: pm.id.to_string(),
        card: convert_card(card),
    })
}

/// [`PaymentProcessor`] backed by the Stripe API
pub struct StripeProcessor {
    client: stripe::Client,
    rest: RestClient,
    is_test: bool,
}

impl StripeProcessor {
    pub fn new(api_key: &str) -> Self {
        Self::with_api_base(api_key, DEFAULT_API_BASE)
    }

    /// Point both clients at another API host, e.g. a local mock server
    pub fn with_api_base(api_key: &str, api_base: &str) -> Self {
        let client = if api_base == DEFAULT_API_BASE {
            stripe::Client::new(api_key)
        } else {
            stripe::Client::from_url(api_base, api_key)
        };
        Self {
            client,
            rest: RestClient::new(api_base, api_key),
            is_test: is_test_key(api_key),
        }
    }

    pub fn is_test_mode(&self) -> bool {
        self.is_test
    }
}

impl PaymentProcessor for StripeProcessor {
    async fn create_setup_intent(&self) -> Result<SetupIntent> {
        let form = vec![
            ("usage".to_string(), "off_session".to_string()),
            ("payment_method_types[]".to_string(), "card".to_string()),
        ];
        let intent: SetupIntentObject = self.rest.post_form("/v1/setup_intents", &form).await?;
        let client_secret = intent.client_secret.ok_or_else(|| {
            ProcessorError::Decode("setup intent without client secret".to_string())
        })?;
        debug!(setup_intent = %intent.id, "Created setup intent");

        Ok(SetupIntent {
            id: intent.id,
            client_secret,
        })
    }

    async fn confirm_card_setup(
        &self,
        client_secret: &str,
        card: &CardElement,
        billing_details: &BillingDetails,
    ) -> Result<CardSetup> {
        let intent_id = SetupIntent::id_from_client_secret(client_secret).ok_or_else(|| {
            ProcessorError::InvalidRequest("malformed setup intent client secret".to_string())
        })?;

        let form = vec![("payment_method".to_string(), card.token().to_string())];
        let intent: SetupIntentObject = self
            .rest
            .post_form(&format!("/v1/setup_intents/{}/confirm", intent_id), &form)
            .await?;
        let setup = card_setup_from_intent(intent)?;

        let _: Value = self
            .rest
            .post_form(
                &format!("/v1/payment_methods/{}", setup.payment_method_id),
                &billing_form(billing_details),
            )
            .await?;

        Ok(setup)
    }

    async fn create_customer(&self, customer: NewCustomer<'_>) -> Result<String> {
        let payment_method_id: stripe::PaymentMethodId =
            parse_id(customer.payment_method_id, "payment method")?;

        let mut metadata = HashMap::new();
        metadata.insert(
            USER_ID_METADATA_KEY.to_string(),
            customer.user_id.to_string(),
        );

        let mut params = stripe::CreateCustomer::new();
        params.email = Some(customer.email);
        if !customer.name.is_empty() {
            params.name = Some(customer.name);
        }
        params.payment_method = Some(payment_method_id);
        params.invoice_settings = Some(stripe::CustomerInvoiceSettings {
            default_payment_method: Some(customer.payment_method_id.to_string()),
            ..Default::default()
        });
        params.metadata = Some(metadata);

        let created = stripe::Customer::create(&self.client, params)
            .await
            .map_err(map_stripe_error)?;
        info!(customer_id = %created.id, "Created Stripe customer");
        Ok(created.id.to_string())
    }

    async fn attach_payment_method(
        &self,
        customer_id: &str,
        payment_method_id: &str,
    ) -> Result<()> {
        let customer: stripe::CustomerId = parse_id(customer_id, "customer")?;
        let pm_id: stripe::PaymentMethodId = parse_id(payment_method_id, "payment method")?;

        stripe::PaymentMethod::attach(
            &self.client,
            &pm_id,
            stripe::AttachPaymentMethod { customer },
        )
        .await
        .map_err(map_stripe_error)?;
        Ok(())
    }

    async fn set_default_payment_method(
        &self,
        customer_id: &str,
        payment_method_id: &str,
    ) -> Result<()> {
        let customer: stripe::CustomerId = parse_id(customer_id, "customer")?;

        let mut params = stripe::UpdateCustomer::new();
        params.invoice_settings = Some(stripe::CustomerInvoiceSettings {
            default_payment_method: Some(payment_method_id.to_string()),
            ..Default::default()
        });

        stripe::Customer::update(&self.client, &customer, params)
            .await
            .map_err(map_stripe_error)?;
        Ok(())
    }

    async fn detach_payment_method(&self, payment_method_id: &str) -> Result<()> {
        let pm_id: stripe::PaymentMethodId = parse_id(payment_method_id, "payment method")?;

        stripe::PaymentMethod::detach(&self.client, &pm_id)
            .await
            .map_err(map_stripe_error)?;
        Ok(())
    }

    async fn fetch_customer(&self, customer_id: &str) -> Result<StripeCustomer> {
        let id: stripe::CustomerId = parse_id(customer_id, "customer")?;

        let customer = stripe::Customer::retrieve(
            &self.client,
            &id,
            &["invoice_settings.default_payment_method"],
        )
        .await
        .map_err(map_stripe_error)?;
        if customer.deleted {
            return Err(ProcessorError::api(
                "resource_missing",
                format!("No such customer: '{}'", customer_id),
            ));
        }

        let default_payment_method = match customer
            .invoice_settings
            .and_then(|settings| settings.default_payment_method)
        {
            Some(stripe::Expandable::Object(pm)) => convert_payment_method(&pm),
            Some(stripe::Expandable::Id(pm_id)) => {
                let pm = stripe::PaymentMethod::retrieve(&self.client, &pm_id, &[])
                    .await
                    .map_err(map_stripe_error)?;
                convert_payment_method(&pm)
            }
            None => None,
        };

        Ok(StripeCustomer {
            stripe_customer_id: customer.id.to_string(),
            default_payment_method,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_test_key() {
        assert!(is_test_key("sk_test_51Hx"));
        assert!(is_test_key("rk_test_51Hx"));
        assert!(!is_test_key("sk_live_51Hx"));
        assert!(!is_test_key(""));
    }

    #[test]
    fn test_processor_mode_follows_key() {
        assert!(StripeProcessor::new("sk_test_51Hx").is_test_mode());
        assert!(!StripeProcessor::new("sk_live_51Hx").is_test_mode());
    }

    #[test]
    fn test_parse_id_rejects_wrong_prefix() {
        let parsed: Result<stripe::CustomerId> = parse_id("pm_123", "customer");
        assert!(matches!(parsed, Err(ProcessorError::InvalidRequest(_))));

        let parsed: Result<stripe::CustomerId> = parse_id("cus_123", "customer");
        assert!(parsed.is_ok());
    }

    #[tokio::test]
    async fn test_malformed_client_secret_is_rejected_locally() {
        let processor = StripeProcessor::with_api_base("sk_test_51Hx", "http://127.0.0.1:9");
        let err = processor
            .confirm_card_setup(
                "not-a-secret",
                &CardElement::new("pm_card_visa"),
                &BillingDetails {
                    name: "Joe Dunphy".to_string(),
                    email: "joe@example.com".to_string(),
                    address: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ProcessorError::InvalidRequest(_)));
    }
}
