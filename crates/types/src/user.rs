use serde::{Deserialize, Serialize};

use crate::card::Card;

/// Default payment method linked to a processor customer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DefaultPaymentMethod {
    /// Marketplace-side id of the link; empty when the link is not resolvable
    pub id: String,
    pub stripe_payment_method_id: String,
    pub card: Card,
}

/// Processor customer record attached to the current user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StripeCustomer {
    pub stripe_customer_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_payment_method: Option<DefaultPaymentMethod>,
}

impl StripeCustomer {
    pub fn new(stripe_customer_id: impl Into<String>) -> Self {
        Self {
            stripe_customer_id: stripe_customer_id.into(),
            default_payment_method: None,
        }
    }

    pub fn with_default_payment_method(mut self, method: DefaultPaymentMethod) -> Self {
        self.default_payment_method = Some(method);
        self
    }

    /// The default payment method, if both sides of the link are present
    pub fn resolvable_default_payment_method(&self) -> Option<&DefaultPaymentMethod> {
        if self.stripe_customer_id.is_empty() {
            return None;
        }
        self.default_payment_method
            .as_ref()
            .filter(|method| !method.id.is_empty())
    }
}

/// The signed-in marketplace user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentUser {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stripe_customer: Option<StripeCustomer>,
}

impl CurrentUser {
    /// "First Last", used to prefill the cardholder name
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }

    pub fn is_loaded(&self) -> bool {
        !self.id.is_empty()
    }

    pub fn stripe_customer_id(&self) -> Option<&str> {
        self.stripe_customer
            .as_ref()
            .map(|customer| customer.stripe_customer_id.as_str())
            .filter(|id| !id.is_empty())
    }
}

/// What the page knows about the user's saved payment method.
///
/// Derived from the current user on every request and never stored.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PaymentMethodState {
    pub has_stripe_customer: bool,
    pub has_default_payment_method: bool,
    pub card: Option<Card>,
}

impl PaymentMethodState {
    pub fn from_user(user: Option<&CurrentUser>) -> Self {
        let customer = user.and_then(|u| u.stripe_customer.as_ref());
        let has_stripe_customer = customer.is_some();
        let default_method = customer.and_then(|c| c.resolvable_default_payment_method());

        Self {
            has_stripe_customer,
            has_default_payment_method: default_method.is_some(),
            card: default_method.map(|m| m.card.clone()),
        }
    }
}
