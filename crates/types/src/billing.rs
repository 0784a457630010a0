use serde::{Deserialize, Serialize};

/// Country preselected in the payment form
pub const DEFAULT_COUNTRY: &str = "FI";

/// Postal address sent along with a card confirmation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Address {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    pub line1: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line2: Option<String>,
    pub postal_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

/// Billing details attached to the payment method on confirmation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingDetails {
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
}

/// Values collected by the payment-entry form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PaymentFormValues {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub address_line1: Option<String>,
    #[serde(default)]
    pub address_line2: Option<String>,
    #[serde(default)]
    pub postal: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

impl PaymentFormValues {
    /// The address block, present only when both line 1 and postal code are
    /// filled in. Partial addresses are dropped entirely.
    pub fn address(&self) -> Option<Address> {
        let line1 = non_empty(&self.address_line1)?;
        let postal_code = non_empty(&self.postal)?;

        Some(Address {
            city: non_empty(&self.city),
            country: non_empty(&self.country),
            line1,
            line2: non_empty(&self.address_line2),
            postal_code,
            state: non_empty(&self.state),
        })
    }

    pub fn billing_details(&self, email: &str) -> BillingDetails {
        BillingDetails {
            name: self.name.clone(),
            email: email.to_string(),
            address: self.address(),
        }
    }
}

/// Opaque handle to the card the user typed in.
///
/// The processor tokenizes card numbers client-side; the workflow only ever
/// sees the resulting payment method token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardElement(pub String);

impl CardElement {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn token(&self) -> &str {
        &self.0
    }
}

/// Submission of the payment-entry form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardFormInput {
    pub card: CardElement,
    pub form_values: PaymentFormValues,
}

/// Initial values used to prefill the payment-entry form
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentFormInitialValues {
    pub name: Option<String>,
    pub country: String,
}
