use payment_methods_types::{BillingDetails, CardElement, CardSetup, SetupIntent, StripeCustomer};

use crate::error::Result;

pub mod sandbox;

pub use sandbox::{ProcessorCall, SandboxProcessor, SandboxState};

/// Customer to create around a freshly confirmed payment method
#[derive(Debug, Clone, Copy)]
pub struct NewCustomer<'a> {
    /// Marketplace user the customer is linked to
    pub user_id: &'a str,
    pub email: &'a str,
    pub name: &'a str,
    /// Becomes the customer's default payment method
    pub payment_method_id: &'a str,
}

/// Operations the payment method workflow needs from a payment processor.
#[allow(async_fn_in_trait)]
pub trait PaymentProcessor: Send + Sync {
    /// Issue a setup intent for one card confirmation attempt.
    async fn create_setup_intent(&self) -> Result<SetupIntent>;

    /// Confirm the card against a setup intent, attaching billing details to
    /// the resulting payment method.
    async fn confirm_card_setup(
        &self,
        client_secret: &str,
        card: &CardElement,
        billing_details: &BillingDetails,
    ) -> Result<CardSetup>;

    /// Create a customer with the payment method set as default. Returns the
    /// processor customer id.
    async fn create_customer(&self, customer: NewCustomer<'_>) -> Result<String>;

    async fn attach_payment_method(&self, customer_id: &str, payment_method_id: &str)
    -> Result<()>;

    async fn set_default_payment_method(
        &self,
        customer_id: &str,
        payment_method_id: &str,
    ) -> Result<()>;

    /// Replace the customer's default payment method in one operation.
    ///
    /// The default implementation attaches the new method, makes it the
    /// default and then detaches the previous one.
    async fn replace_default_payment_method(
        &self,
        customer_id: &str,
        previous_payment_method_id: &str,
        payment_method_id: &str,
    ) -> Result<()> {
        self.attach_payment_method(customer_id, payment_method_id)
            .await?;
        self.set_default_payment_method(customer_id, payment_method_id)
            .await?;
        if previous_payment_method_id != payment_method_id {
            self.detach_payment_method(previous_payment_method_id)
                .await?;
        }
        Ok(())
    }

    async fn detach_payment_method(&self, payment_method_id: &str) -> Result<()>;

    /// Load the customer together with its default payment method.
    async fn fetch_customer(&self, customer_id: &str) -> Result<StripeCustomer>;
}
