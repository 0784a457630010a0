//! Setup intent endpoints, called over plain HTTP with form-encoded bodies.

use payment_methods_core::ProcessorError;
use payment_methods_types::{BillingDetails, CardSetup};
use serde::{Deserialize, de::DeserializeOwned};
use tracing::debug;

pub const DEFAULT_API_BASE: &str = "https://api.stripe.com";

#[derive(Debug, Clone, Deserialize)]
pub struct SetupIntentObject {
    pub id: String,
    #[serde(default)]
    pub client_secret: Option<String>,
    pub status: String,
    #[serde(default)]
    pub payment_method: Option<String>,
    #[serde(default)]
    pub last_setup_error: Option<ApiErrorBody>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ApiErrorBody,
}

impl ApiErrorBody {
    fn into_error(self, status: u16) -> ProcessorError {
        let code = self
            .code
            .or(self.kind)
            .unwrap_or_else(|| status.to_string());
        let message = self
            .message
            .unwrap_or_else(|| format!("Request failed with status {}", status));
        ProcessorError::api(code, message)
    }
}

/// Turn an error response into a [`ProcessorError`]
pub fn parse_error(status: u16, body: &str) -> ProcessorError {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => envelope.error.into_error(status),
        Err(_) if body.trim().is_empty() => ProcessorError::api(
            status.to_string(),
            format!("Request failed with status {}", status),
        ),
        Err(_) => ProcessorError::api(status.to_string(), body.trim()),
    }
}

/// Form fields setting `details` on a payment method
pub fn billing_form(details: &BillingDetails) -> Vec<(String, String)> {
    let mut form = vec![
        ("billing_details[name]".to_string(), details.name.clone()),
        ("billing_details[email]".to_string(), details.email.clone()),
    ];

    if let Some(address) = &details.address {
        let fields = [
            ("line1", Some(&address.line1)),
            ("line2", address.line2.as_ref()),
            ("postal_code", Some(&address.postal_code)),
            ("city", address.city.as_ref()),
            ("state", address.state.as_ref()),
            ("country", address.country.as_ref()),
        ];
        for (key, value) in fields {
            if let Some(value) = value {
                form.push((format!("billing_details[address][{}]", key), value.clone()));
            }
        }
    }
    form
}

/// Read the confirmed card out of a setup intent returned by a confirmation
pub fn card_setup_from_intent(intent: SetupIntentObject) -> Result<CardSetup, ProcessorError> {
    match (intent.status.as_str(), intent.payment_method) {
        ("succeeded", Some(payment_method_id)) => Ok(CardSetup {
            setup_intent_id: intent.id,
            payment_method_id,
        }),
        ("requires_action", _) => Err(ProcessorError::api(
            "authentication_required",
            "The card requires additional authentication.",
        )),
        (status, _) => Err(match intent.last_setup_error {
            Some(error) => error.into_error(402),
            None => ProcessorError::api(
                "setup_intent_unexpected_state",
                format!("Setup intent ended in status '{}'", status),
            ),
        }),
    }
}

/// Minimal form-posting client for endpoints used outside of async-stripe
#[derive(Debug, Clone)]
pub struct RestClient {
    http: reqwest::Client,
    api_base: String,
    api_key: String,
}

impl RestClient {
    pub fn new(api_base: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    pub async fn post_form<T: DeserializeOwned>(
        &self,
        path: &str,
        form: &[(String, String)],
    ) -> Result<T, ProcessorError> {
        let url = format!("{}{}", self.api_base, path);
        debug!(%url, "POST");

        let response = self
            .http
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .form(form)
            .send()
            .await
            .map_err(|e| ProcessorError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ProcessorError::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(parse_error(status.as_u16(), &body));
        }

        serde_json::from_str(&body).map_err(|e| ProcessorError::Decode(e.to_string()))
    }
}
