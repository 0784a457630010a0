//! Payment method lifecycle: add, replace and delete the user's saved card.
//!
//! A submission runs four dependent processor calls strictly in sequence:
//!
//! 1. create a setup intent
//! 2. confirm the card against it
//! 3. create the customer, add the method, or replace the default method,
//!    depending on what the user already has
//! 4. refresh the customer record
//!
//! Nothing is retried and nothing is rolled back; each failure is reported as
//! the [`WorkflowError`] of the stage that failed. At most one submission or
//! removal runs at a time per workflow.

use std::{future::Future, sync::Arc, time::Duration};

use parking_lot::RwLock;
use payment_methods_types::{CardFormInput, CurrentUser, PaymentMethodState, StripeCustomer};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::{
    error::{ProcessorError, WorkflowError},
    processor::{NewCustomer, PaymentProcessor},
};

/// Tunables for [`PaymentMethodWorkflow`]
#[derive(Debug, Clone, Default)]
pub struct WorkflowConfig {
    /// Upper bound for each individual processor call
    pub call_timeout: Option<Duration>,
}

impl WorkflowConfig {
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = Some(timeout);
        self
    }
}

/// How a confirmed card is stored, picked from the user's current state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveBranch {
    /// No processor customer yet
    CreateCustomer,
    /// Customer without a default payment method
    AddPaymentMethod,
    /// Customer with a default payment method that gets replaced
    UpdatePaymentMethod,
}

impl SaveBranch {
    pub fn for_state(state: &PaymentMethodState) -> Self {
        if !state.has_stripe_customer {
            SaveBranch::CreateCustomer
        } else if !state.has_default_payment_method {
            SaveBranch::AddPaymentMethod
        } else {
            SaveBranch::UpdatePaymentMethod
        }
    }
}

/// Terminal result of a submission or removal
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowResult {
    CustomerCreated,
    PaymentMethodAdded,
    PaymentMethodUpdated,
    PaymentMethodDeleted,
    Failed(WorkflowError),
}

impl WorkflowResult {
    pub fn is_success(&self) -> bool {
        !matches!(self, WorkflowResult::Failed(_))
    }

    pub fn error(&self) -> Option<&WorkflowError> {
        match self {
            WorkflowResult::Failed(e) => Some(e),
            _ => None,
        }
    }
}

/// Where the workflow currently is. Advanced once per completed stage.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum WorkflowStage {
    #[default]
    Idle,
    CreatingSetupIntent,
    ConfirmingCardSetup,
    SavingPaymentMethod(SaveBranch),
    DeletingPaymentMethod,
    RefreshingCustomer,
    Finished(WorkflowResult),
}

/// Read-only view of the user taken when an operation starts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowSnapshot {
    pub user_id: String,
    pub email: String,
    pub display_name: String,
    pub state: PaymentMethodState,
    pub stripe_customer_id: Option<String>,
    pub default_payment_method_id: Option<String>,
}

impl WorkflowSnapshot {
    pub fn from_user(user: &CurrentUser) -> Self {
        let default_payment_method_id = user
            .stripe_customer
            .as_ref()
            .and_then(|c| c.resolvable_default_payment_method())
            .map(|m| m.stripe_payment_method_id.clone());

        Self {
            user_id: user.id.clone(),
            email: user.email.clone(),
            display_name: user.display_name(),
            state: PaymentMethodState::from_user(Some(user)),
            stripe_customer_id: user.stripe_customer_id().map(str::to_string),
            default_payment_method_id,
        }
    }
}

/// Everything a caller needs to update its state after an operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowOutcome {
    pub result: WorkflowResult,
    /// Branch taken by a submission, once the card was confirmed
    pub branch: Option<SaveBranch>,
    /// Processor customer of the user once the operation ended, including one
    /// created by this submission
    pub customer_id: Option<String>,
    /// Customer record reloaded after the mutation
    pub customer: Option<StripeCustomer>,
    /// Set when the final refresh failed
    pub refresh_error: Option<WorkflowError>,
}

impl WorkflowOutcome {
    fn failed(error: WorkflowError) -> Self {
        Self {
            result: WorkflowResult::Failed(error),
            branch: None,
            customer_id: None,
            customer: None,
            refresh_error: None,
        }
    }
}

pub struct PaymentMethodWorkflow<P> {
    processor: Arc<P>,
    config: WorkflowConfig,
    in_flight: Mutex<()>,
    stage: RwLock<WorkflowStage>,
}

impl<P: PaymentProcessor> PaymentMethodWorkflow<P> {
    pub fn new(processor: Arc<P>) -> Self {
        Self::with_config(processor, WorkflowConfig::default())
    }

    pub fn with_config(processor: Arc<P>, config: WorkflowConfig) -> Self {
        Self {
            processor,
            config,
            in_flight: Mutex::new(()),
            stage: RwLock::new(WorkflowStage::Idle),
        }
    }

    pub fn processor(&self) -> &Arc<P> {
        &self.processor
    }

    pub fn stage(&self) -> WorkflowStage {
        self.stage.read().clone()
    }

    /// Whether a submission or removal is currently running
    pub fn is_busy(&self) -> bool {
        self.in_flight.try_lock().is_err()
    }

    fn set_stage(&self, stage: WorkflowStage) {
        debug!(?stage, "Payment method workflow stage");
        *self.stage.write() = stage;
    }

    fn finish(&self, outcome: WorkflowOutcome) -> WorkflowOutcome {
        self.set_stage(WorkflowStage::Finished(outcome.result.clone()));
        outcome
    }

    async fn call<T>(
        &self,
        request: impl Future<Output = Result<T, ProcessorError>>,
    ) -> Result<T, ProcessorError> {
        match self.config.call_timeout {
            Some(timeout) => tokio::time::timeout(timeout, request)
                .await
                .map_err(|_| ProcessorError::Timeout(timeout))?,
            None => request.await,
        }
    }

    /// Save the card entered in the payment form as the user's default
    /// payment method.
    ///
    /// Returns `Err` only when the operation could not start; stage failures
    /// are reported through [`WorkflowResult::Failed`].
    pub async fn submit(
        &self,
        snapshot: &WorkflowSnapshot,
        input: &CardFormInput,
    ) -> Result<WorkflowOutcome, WorkflowError> {
        let _guard = self
            .in_flight
            .try_lock()
            .map_err(|_| WorkflowError::InProgress)?;

        self.set_stage(WorkflowStage::CreatingSetupIntent);
        let setup_intent = match self.call(self.processor.create_setup_intent()).await {
            Ok(intent) => intent,
            Err(e) => {
                warn!(error = %e, "Failed to create setup intent");
                return Ok(self.finish(WorkflowOutcome::failed(WorkflowError::SetupIntent(e))));
            }
        };

        self.set_stage(WorkflowStage::ConfirmingCardSetup);
        let billing_details = input.form_values.billing_details(&snapshot.email);
        let card_setup = match self
            .call(self.processor.confirm_card_setup(
                &setup_intent.client_secret,
                &input.card,
                &billing_details,
            ))
            .await
        {
            Ok(setup) => setup,
            Err(e) => {
                warn!(setup_intent = %setup_intent.id, error = %e, "Card setup failed");
                return Ok(self.finish(WorkflowOutcome::failed(
                    WorkflowError::CardConfirmation(e),
                )));
            }
        };
        let payment_method_id = card_setup.payment_method_id.as_str();

        let branch = SaveBranch::for_state(&snapshot.state);
        self.set_stage(WorkflowStage::SavingPaymentMethod(branch));

        let (result, customer_id) = match (
            branch,
            snapshot.stripe_customer_id.as_deref(),
            snapshot.default_payment_method_id.as_deref(),
        ) {
            (SaveBranch::CreateCustomer, _, _) => {
                let request = self.processor.create_customer(NewCustomer {
                    user_id: &snapshot.user_id,
                    email: &snapshot.email,
                    name: &billing_details.name,
                    payment_method_id,
                });
                match self.call(request).await {
                    Ok(customer_id) => {
                        info!(customer_id = %customer_id, "Created processor customer");
                        (WorkflowResult::CustomerCreated, Some(customer_id))
                    }
                    Err(e) => (
                        WorkflowResult::Failed(WorkflowError::CustomerCreation(e)),
                        None,
                    ),
                }
            }
            (SaveBranch::AddPaymentMethod, Some(customer_id), _) => {
                let result = self
                    .add_payment_method(customer_id, payment_method_id)
                    .await;
                (result, Some(customer_id.to_string()))
            }
            (SaveBranch::UpdatePaymentMethod, Some(customer_id), Some(previous)) => {
                let request = self.processor.replace_default_payment_method(
                    customer_id,
                    previous,
                    payment_method_id,
                );
                let result = match self.call(request).await {
                    Ok(()) => {
                        info!(customer_id = %customer_id, "Replaced default payment method");
                        WorkflowResult::PaymentMethodUpdated
                    }
                    Err(e) => WorkflowResult::Failed(WorkflowError::PaymentMethodMutation(e)),
                };
                (result, Some(customer_id.to_string()))
            }
            (_, customer_id, _) => (
                WorkflowResult::Failed(WorkflowError::PaymentMethodMutation(
                    ProcessorError::InvalidRequest(
                        "customer state changed while saving the card".to_string(),
                    ),
                )),
                customer_id.map(str::to_string),
            ),
        };

        if let Some(error) = result.error() {
            warn!(?branch, error = %error, "Failed to store payment method");
        }

        let (customer, refresh_error) = match customer_id.as_deref() {
            Some(customer_id) => self.refresh(customer_id).await,
            None => (None, None),
        };

        Ok(self.finish(WorkflowOutcome {
            result,
            branch: Some(branch),
            customer_id,
            customer,
            refresh_error,
        }))
    }

    async fn add_payment_method(
        &self,
        customer_id: &str,
        payment_method_id: &str,
    ) -> WorkflowResult {
        let attached = self
            .call(
                self.processor
                    .attach_payment_method(customer_id, payment_method_id),
            )
            .await;
        let saved = match attached {
            Ok(()) => {
                self.call(
                    self.processor
                        .set_default_payment_method(customer_id, payment_method_id),
                )
                .await
            }
            Err(e) => Err(e),
        };

        match saved {
            Ok(()) => {
                info!(customer_id = %customer_id, "Added default payment method");
                WorkflowResult::PaymentMethodAdded
            }
            Err(e) => WorkflowResult::Failed(WorkflowError::PaymentMethodMutation(e)),
        }
    }

    /// Delete the user's default payment method, then reload the customer.
    ///
    /// Confirmation is the caller's job; this assumes it already happened.
    pub async fn remove(
        &self,
        snapshot: &WorkflowSnapshot,
    ) -> Result<WorkflowOutcome, WorkflowError> {
        let _guard = self
            .in_flight
            .try_lock()
            .map_err(|_| WorkflowError::InProgress)?;

        let (Some(customer_id), Some(payment_method_id)) = (
            snapshot.stripe_customer_id.as_deref(),
            snapshot.default_payment_method_id.as_deref(),
        ) else {
            return Ok(self.finish(WorkflowOutcome::failed(
                WorkflowError::PaymentMethodDeletion(ProcessorError::InvalidRequest(
                    "no default payment method to delete".to_string(),
                )),
            )));
        };

        self.set_stage(WorkflowStage::DeletingPaymentMethod);
        let result = match self
            .call(self.processor.detach_payment_method(payment_method_id))
            .await
        {
            Ok(()) => {
                info!(customer_id = %customer_id, "Deleted default payment method");
                WorkflowResult::PaymentMethodDeleted
            }
            Err(e) => {
                warn!(customer_id = %customer_id, error = %e, "Failed to delete payment method");
                WorkflowResult::Failed(WorkflowError::PaymentMethodDeletion(e))
            }
        };

        let (customer, refresh_error) = self.refresh(customer_id).await;

        Ok(self.finish(WorkflowOutcome {
            result,
            branch: None,
            customer_id: Some(customer_id.to_string()),
            customer,
            refresh_error,
        }))
    }

    /// Reload the customer record outside of a submission or removal
    pub async fn refresh_customer(
        &self,
        customer_id: &str,
    ) -> Result<StripeCustomer, WorkflowError> {
        self.call(self.processor.fetch_customer(customer_id))
            .await
            .map_err(WorkflowError::CustomerFetch)
    }

    async fn refresh(&self, customer_id: &str) -> (Option<StripeCustomer>, Option<WorkflowError>) {
        self.set_stage(WorkflowStage::RefreshingCustomer);
        match self.refresh_customer(customer_id).await {
            Ok(customer) => (Some(customer), None),
            Err(e) => {
                warn!(customer_id = %customer_id, error = %e, "Failed to refresh customer");
                (None, Some(e))
            }
        }
    }
}
