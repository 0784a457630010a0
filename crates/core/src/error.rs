use std::time::Duration;

use thiserror::Error;

/// Errors returned by a payment processor call
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProcessorError {
    /// The processor rejected the request
    #[error("{message} ({code})")]
    Api { code: String, message: String },

    /// The request never got a usable response
    #[error("Transport error: {0}")]
    Transport(String),

    /// The response could not be decoded
    #[error("Decode error: {0}")]
    Decode(String),

    /// The call did not resolve within the configured timeout
    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    /// The request was rejected before reaching the processor
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl ProcessorError {
    pub fn api(code: impl Into<String>, message: impl Into<String>) -> Self {
        ProcessorError::Api {
            code: code.into(),
            message: message.into(),
        }
    }
}

/// Errors surfaced by the payment method workflow, one variant per stage.
///
/// These are display-only: they are stored in the page's error slots and
/// never retried or rolled back.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorkflowError {
    #[error("Failed to create setup intent: {0}")]
    SetupIntent(ProcessorError),

    #[error("Card setup failed: {0}")]
    CardConfirmation(ProcessorError),

    #[error("Failed to create customer: {0}")]
    CustomerCreation(ProcessorError),

    #[error("Failed to save payment method: {0}")]
    PaymentMethodMutation(ProcessorError),

    #[error("Failed to delete payment method: {0}")]
    PaymentMethodDeletion(ProcessorError),

    #[error("Failed to fetch customer: {0}")]
    CustomerFetch(ProcessorError),

    /// Another submit or remove is still running
    #[error("A payment method operation is already in progress")]
    InProgress,

    #[error("Current user is not loaded")]
    MissingUser,
}

impl WorkflowError {
    /// The processor error behind a stage failure
    pub fn reason(&self) -> Option<&ProcessorError> {
        match self {
            WorkflowError::SetupIntent(e)
            | WorkflowError::CardConfirmation(e)
            | WorkflowError::CustomerCreation(e)
            | WorkflowError::PaymentMethodMutation(e)
            | WorkflowError::PaymentMethodDeletion(e)
            | WorkflowError::CustomerFetch(e) => Some(e),
            WorkflowError::InProgress | WorkflowError::MissingUser => None,
        }
    }
}

pub type Result<T, E = ProcessorError> = std::result::Result<T, E>;
