//! The payment methods page: shows the saved card when there is one, the
//! payment form otherwise, and turns user actions into workflow runs and
//! store updates.

use std::sync::Arc;

use chrono::{Datelike, Utc};
use parking_lot::Mutex;
use payment_methods_types::{
    CardFormInput, DEFAULT_COUNTRY, PaymentFormInitialValues, PaymentMethodState,
};
use tracing::info;

use crate::{
    error::WorkflowError,
    processor::PaymentProcessor,
    store::{Action, AppState, Operation, Store, WorkflowKind},
    ui::{CardMenuItem, SavedCardProps, SavedCardRender, SavedCardView, ViewIntent},
    workflow::{
        PaymentMethodWorkflow, SaveBranch, WorkflowOutcome, WorkflowResult, WorkflowSnapshot,
    },
};

/// Props handed to the payment-entry form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentFormProps {
    pub form_id: &'static str,
    pub initial_values: PaymentFormInitialValues,
    pub has_default_payment_method: bool,
    pub in_progress: bool,
    pub add_payment_method_error: Option<WorkflowError>,
    pub delete_payment_method_error: Option<WorkflowError>,
    pub create_stripe_customer_error: Option<WorkflowError>,
    pub handle_card_setup_error: Option<WorkflowError>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageView {
    SavedCard(SavedCardRender),
    PaymentForm(PaymentFormProps),
}

fn form_props(state: &AppState, payment_state: &PaymentMethodState) -> PaymentFormProps {
    let name = state
        .user
        .current_user
        .as_ref()
        .filter(|user| user.is_loaded())
        .map(|user| user.display_name());

    PaymentFormProps {
        form_id: "PaymentMethodsForm",
        initial_values: PaymentFormInitialValues {
            name,
            country: DEFAULT_COUNTRY.to_string(),
        },
        has_default_payment_method: payment_state.has_default_payment_method,
        in_progress: state.ui.submit_in_progress,
        add_payment_method_error: state.payment_methods.add_payment_method_error.clone(),
        delete_payment_method_error: state.payment_methods.delete_payment_method_error.clone(),
        create_stripe_customer_error: state.payment_methods.create_stripe_customer_error.clone(),
        handle_card_setup_error: state.stripe.handle_card_setup_error.clone(),
    }
}

fn save_operation(branch: SaveBranch) -> Operation {
    match branch {
        SaveBranch::CreateCustomer => Operation::CreateStripeCustomer,
        SaveBranch::AddPaymentMethod => Operation::AddPaymentMethod,
        SaveBranch::UpdatePaymentMethod => Operation::UpdatePaymentMethod,
    }
}

/// Store updates describing a finished submission or removal
pub fn outcome_actions(kind: WorkflowKind, outcome: &WorkflowOutcome) -> Vec<Action> {
    let mut actions = Vec::new();

    let operation = match (kind, outcome.branch) {
        (WorkflowKind::Remove, _) => Operation::DeletePaymentMethod,
        // the card was confirmed, the save step ran
        (WorkflowKind::Submit, Some(branch)) => {
            actions.push(Action::Success(Operation::HandleCardSetup));
            actions.push(Action::Request(save_operation(branch)));
            save_operation(branch)
        }
        (WorkflowKind::Submit, None) => match outcome.result.error() {
            Some(WorkflowError::SetupIntent(_)) => Operation::CreateSetupIntent,
            _ => Operation::HandleCardSetup,
        },
    };

    actions.push(match outcome.result.error() {
        Some(e) => Action::Error(operation, e.clone()),
        None => Action::Success(operation),
    });

    match (&outcome.customer, &outcome.customer_id) {
        (Some(customer), _) => actions.push(Action::StripeCustomerFetched(customer.clone())),
        (None, Some(customer_id)) => {
            actions.push(Action::StripeCustomerLinked(customer_id.clone()))
        }
        (None, None) => {}
    }
    if let Some(e) = &outcome.refresh_error {
        actions.push(Action::Error(Operation::FetchStripeCustomer, e.clone()));
    }

    actions.push(Action::WorkflowFinished(kind));
    actions
}

pub struct PaymentMethodsPage<P> {
    store: Store,
    workflow: PaymentMethodWorkflow<P>,
    saved_card: Mutex<SavedCardView>,
}

impl<P: PaymentProcessor> PaymentMethodsPage<P> {
    pub fn new(store: Store, workflow: PaymentMethodWorkflow<P>) -> Self {
        let saved_card = SavedCardView::new(SavedCardProps::default(), Arc::new(store.clone()));
        Self {
            store,
            workflow,
            saved_card: Mutex::new(saved_card),
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn workflow(&self) -> &PaymentMethodWorkflow<P> {
        &self.workflow
    }

    pub fn scrolling_disabled(&self) -> bool {
        self.store.is_scrolling_disabled()
    }

    fn sync_saved_card(&self, view: &mut SavedCardView) {
        let (card, delete_in_progress) = self.store.select(|s| {
            let state = PaymentMethodState::from_user(s.user.current_user.as_ref());
            (state.card, s.ui.remove_in_progress)
        });
        view.set_props(SavedCardProps {
            card,
            deletable: true,
            notify_change: true,
            delete_in_progress,
        });
    }

    pub fn view(&self) -> PageView {
        self.view_at(&Utc::now())
    }

    pub fn view_at(&self, now: &impl Datelike) -> PageView {
        let mut saved_card = self.saved_card.lock();
        self.sync_saved_card(&mut saved_card);

        if let Some(render) = saved_card.render(now) {
            return PageView::SavedCard(render);
        }

        let state = self.store.state();
        let payment_state = PaymentMethodState::from_user(state.user.current_user.as_ref());
        PageView::PaymentForm(form_props(&state, &payment_state))
    }

    /// Reload the processor customer of the current user, if there is one
    pub async fn load_data(&self) -> Result<(), WorkflowError> {
        let Some(customer_id) = self
            .store
            .current_user()
            .and_then(|user| user.stripe_customer_id().map(str::to_string))
        else {
            return Ok(());
        };

        self.store
            .dispatch(Action::Request(Operation::FetchStripeCustomer));
        match self.workflow.refresh_customer(&customer_id).await {
            Ok(customer) => {
                self.store.dispatch(Action::StripeCustomerFetched(customer));
                Ok(())
            }
            Err(e) => {
                self.store
                    .dispatch(Action::Error(Operation::FetchStripeCustomer, e.clone()));
                Err(e)
            }
        }
    }

    fn snapshot(&self) -> Result<WorkflowSnapshot, WorkflowError> {
        self.store
            .select(|s| s.user.current_user.as_ref().map(WorkflowSnapshot::from_user))
            .ok_or(WorkflowError::MissingUser)
    }

    /// Payment form submission
    pub async fn handle_submit(
        &self,
        input: CardFormInput,
    ) -> Result<WorkflowResult, WorkflowError> {
        let snapshot = self.snapshot()?;
        if !self.store.try_begin(WorkflowKind::Submit) {
            return Err(WorkflowError::InProgress);
        }

        self.store
            .dispatch(Action::Request(Operation::HandleCardSetup));

        match self.workflow.submit(&snapshot, &input).await {
            Ok(outcome) => {
                info!(result = ?outcome.result, "Payment method submission finished");
                self.store
                    .dispatch_all(outcome_actions(WorkflowKind::Submit, &outcome));
                Ok(outcome.result)
            }
            Err(e) => {
                self.store
                    .dispatch(Action::WorkflowFinished(WorkflowKind::Submit));
                Err(e)
            }
        }
    }

    pub fn toggle_menu(&self, is_open: bool) {
        self.saved_card.lock().toggle_menu(is_open);
    }

    pub fn select_card(&self, item: CardMenuItem) -> Option<ViewIntent> {
        self.saved_card.lock().select(item)
    }

    /// Delete button: opens the confirmation dialog
    pub fn request_delete(&self) -> bool {
        let mut saved_card = self.saved_card.lock();
        self.sync_saved_card(&mut saved_card);
        saved_card.click_delete()
    }

    pub fn cancel_delete(&self) {
        self.saved_card.lock().cancel_delete();
    }

    /// Confirm button of the delete dialog.
    ///
    /// Returns `None` when there was nothing to confirm. The dialog closes
    /// after a successful delete and stays open after a failed one.
    pub async fn confirm_delete(&self) -> Option<Result<WorkflowResult, WorkflowError>> {
        let confirmed = {
            let mut saved_card = self.saved_card.lock();
            self.sync_saved_card(&mut saved_card);
            matches!(saved_card.confirm_delete(), Some(ViewIntent::DeleteCard(_)))
        };
        if !confirmed {
            return None;
        }
        Some(self.handle_remove().await)
    }

    async fn handle_remove(&self) -> Result<WorkflowResult, WorkflowError> {
        let snapshot = self.snapshot()?;
        if !self.store.try_begin(WorkflowKind::Remove) {
            return Err(WorkflowError::InProgress);
        }
        self.store
            .dispatch(Action::Request(Operation::DeletePaymentMethod));

        let result = match self.workflow.remove(&snapshot).await {
            Ok(outcome) => {
                info!(result = ?outcome.result, "Payment method removal finished");
                self.store
                    .dispatch_all(outcome_actions(WorkflowKind::Remove, &outcome));
                Ok(outcome.result)
            }
            Err(e) => {
                self.store
                    .dispatch(Action::WorkflowFinished(WorkflowKind::Remove));
                Err(e)
            }
        };

        if matches!(result, Ok(WorkflowResult::PaymentMethodDeleted)) {
            self.saved_card.lock().close_dialog();
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::NaiveDate;
    use payment_methods_types::{CardElement, CurrentUser, PaymentFormValues, StripeCustomer};

    use super::*;
    use crate::{
        error::ProcessorError,
        processor::{ProcessorCall, SandboxProcessor, sandbox::DECLINED_CARD_TOKEN},
    };

    fn user(stripe_customer: Option<StripeCustomer>) -> CurrentUser {
        CurrentUser {
            id: "user-1".to_string(),
            email: "joe@example.com".to_string(),
            first_name: "Joe".to_string(),
            last_name: "Dunphy".to_string(),
            stripe_customer,
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 15).unwrap()
    }

    fn page(sandbox: SandboxProcessor, user: CurrentUser) -> PaymentMethodsPage<SandboxProcessor> {
        PaymentMethodsPage::new(
            Store::with_user(user),
            PaymentMethodWorkflow::new(Arc::new(sandbox)),
        )
    }

    fn input(token: &str) -> CardFormInput {
        CardFormInput {
            card: CardElement::new(token),
            form_values: PaymentFormValues {
                name: "Joe Dunphy".to_string(),
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_form_shown_without_default_method() {
        let page = page(SandboxProcessor::new(), user(None));

        match page.view_at(&today()) {
            PageView::PaymentForm(props) => {
                assert_eq!(props.initial_values.name.as_deref(), Some("Joe Dunphy"));
                assert_eq!(props.initial_values.country, "FI");
                assert!(!props.has_default_payment_method);
            }
            other => panic!("Expected payment form, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_submit_then_saved_card_is_shown() {
        let page = page(SandboxProcessor::new(), user(None));

        let result = page.handle_submit(input("pm_card_visa")).await.unwrap();
        assert_eq!(result, WorkflowResult::CustomerCreated);

        let state = page.store().state();
        assert!(!state.ui.submit_in_progress);
        assert!(!state.payment_methods.create_stripe_customer_in_progress);
        match page.view_at(&today()) {
            PageView::SavedCard(render) => {
                assert!(render.delete.is_some());
                assert!(!render.show_expired_warning);
            }
            other => panic!("Expected saved card, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_declined_card_fills_card_setup_slot() {
        let page = page(SandboxProcessor::new(), user(None));

        let result = page
            .handle_submit(input(DECLINED_CARD_TOKEN))
            .await
            .unwrap();
        assert!(!result.is_success());

        match page.view_at(&today()) {
            PageView::PaymentForm(props) => {
                assert!(matches!(
                    props.handle_card_setup_error,
                    Some(WorkflowError::CardConfirmation(_))
                ));
                assert_eq!(props.create_stripe_customer_error, None);
                assert!(!props.in_progress);
            }
            other => panic!("Expected payment form, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_delete_flow() {
        let sandbox = SandboxProcessor::new();
        let customer = sandbox
            .seed_customer("user-1", "joe@example.com", "pm_card_visa")
            .unwrap();
        let page = page(sandbox, user(Some(customer)));
        assert!(matches!(page.view_at(&today()), PageView::SavedCard(_)));

        // confirm without opening the dialog does nothing
        assert!(page.confirm_delete().await.is_none());
        assert_eq!(
            page.workflow()
                .processor()
                .call_count(ProcessorCall::DetachPaymentMethod),
            0
        );

        assert!(page.request_delete());
        assert!(page.scrolling_disabled());

        let result = page.confirm_delete().await.unwrap().unwrap();
        assert_eq!(result, WorkflowResult::PaymentMethodDeleted);
        assert_eq!(
            page.workflow()
                .processor()
                .call_count(ProcessorCall::DetachPaymentMethod),
            1
        );
        assert!(!page.scrolling_disabled());
        assert!(matches!(page.view_at(&today()), PageView::PaymentForm(_)));
    }

    #[tokio::test]
    async fn test_failed_delete_keeps_dialog_open() {
        let sandbox = SandboxProcessor::new();
        let customer = sandbox
            .seed_customer("user-1", "joe@example.com", "pm_card_visa")
            .unwrap();
        sandbox.fail_next(
            ProcessorCall::DetachPaymentMethod,
            ProcessorError::Transport("connection reset".to_string()),
        );
        let page = page(sandbox, user(Some(customer)));

        page.request_delete();
        let result = page.confirm_delete().await.unwrap().unwrap();
        assert!(!result.is_success());

        let state = page.store().state();
        assert!(matches!(
            state.payment_methods.delete_payment_method_error,
            Some(WorkflowError::PaymentMethodDeletion(_))
        ));
        match page.view_at(&today()) {
            PageView::SavedCard(render) => assert!(render.dialog.is_open),
            other => panic!("Expected saved card, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_load_data_refreshes_customer() {
        let sandbox = SandboxProcessor::new();
        let customer = sandbox
            .seed_customer("user-1", "joe@example.com", "pm_card_amex")
            .unwrap();
        let page = page(
            sandbox,
            user(Some(StripeCustomer::new(&customer.stripe_customer_id))),
        );
        assert!(matches!(page.view_at(&today()), PageView::PaymentForm(_)));

        page.load_data().await.unwrap();

        assert!(matches!(page.view_at(&today()), PageView::SavedCard(_)));
    }

    #[tokio::test]
    async fn test_submit_without_user() {
        let page = PaymentMethodsPage::new(
            Store::default(),
            PaymentMethodWorkflow::new(Arc::new(SandboxProcessor::new())),
        );
        let err = page.handle_submit(input("pm_card_visa")).await.unwrap_err();
        assert_eq!(err, WorkflowError::MissingUser);
    }

    #[tokio::test]
    async fn test_created_customer_survives_failed_refresh() {
        let sandbox = SandboxProcessor::new();
        sandbox.fail_next(
            ProcessorCall::FetchCustomer,
            ProcessorError::Transport("connection reset".to_string()),
        );
        let page = page(sandbox, user(None));

        let first = page.handle_submit(input("pm_card_visa")).await.unwrap();
        assert_eq!(first, WorkflowResult::CustomerCreated);
        let state = page.store().state();
        assert!(matches!(
            state.stripe.fetch_stripe_customer_error,
            Some(WorkflowError::CustomerFetch(_))
        ));
        let customer_id = state
            .user
            .current_user
            .as_ref()
            .and_then(|user| user.stripe_customer_id().map(str::to_string))
            .unwrap();

        // the customer has a default method, but its record was never loaded
        let second = page.handle_submit(input("pm_card_amex")).await.unwrap();
        assert_eq!(second, WorkflowResult::PaymentMethodAdded);

        let sandbox = page.workflow().processor();
        assert_eq!(sandbox.call_count(ProcessorCall::CreateCustomer), 1);
        assert_eq!(sandbox.snapshot().customers.len(), 1);
        assert_eq!(
            page.store().current_user().unwrap().stripe_customer_id(),
            Some(customer_id.as_str())
        );
    }

    #[tokio::test]
    async fn test_submit_during_delete_leaves_store_clean() {
        let sandbox = SandboxProcessor::new().with_latency(Duration::from_millis(30));
        let customer = sandbox
            .seed_customer("user-1", "joe@example.com", "pm_card_visa")
            .unwrap();
        let page = page(sandbox, user(Some(customer)));
        assert!(page.request_delete());

        let (removed, submitted) = tokio::join!(
            page.confirm_delete(),
            page.handle_submit(input("pm_card_mastercard"))
        );

        assert_eq!(
            removed.unwrap().unwrap(),
            WorkflowResult::PaymentMethodDeleted
        );
        assert_eq!(submitted.unwrap_err(), WorkflowError::InProgress);

        let state = page.store().state();
        assert!(!state.stripe.handle_card_setup_in_progress);
        assert!(!state.ui.submit_in_progress);
        assert!(!state.ui.remove_in_progress);
        assert_eq!(
            page.workflow()
                .processor()
                .call_count(ProcessorCall::CreateSetupIntent),
            0
        );
    }

    #[test]
    fn test_outcome_actions_for_update_failure() {
        let error = WorkflowError::PaymentMethodMutation(ProcessorError::api("api_error", "boom"));
        let outcome = WorkflowOutcome {
            result: WorkflowResult::Failed(error.clone()),
            branch: Some(SaveBranch::UpdatePaymentMethod),
            customer_id: None,
            customer: None,
            refresh_error: None,
        };

        let actions = outcome_actions(WorkflowKind::Submit, &outcome);
        assert_eq!(
            actions,
            vec![
                Action::Success(Operation::HandleCardSetup),
                Action::Request(Operation::UpdatePaymentMethod),
                Action::Error(Operation::UpdatePaymentMethod, error),
                Action::WorkflowFinished(WorkflowKind::Submit),
            ]
        );
    }
}
