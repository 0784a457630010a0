//! Application state container for the payment methods page.
//!
//! State is only ever changed by dispatching an [`Action`]; [`reduce`] is the
//! single place that knows how each action lands in the state tree.

use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;
use payment_methods_types::{CurrentUser, StripeCustomer};
use tracing::debug;

use crate::{error::WorkflowError, ui::ScrollLock};

/// Processor-facing operations whose progress is tracked in the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    CreateSetupIntent,
    HandleCardSetup,
    CreateStripeCustomer,
    AddPaymentMethod,
    UpdatePaymentMethod,
    DeletePaymentMethod,
    FetchStripeCustomer,
}

/// Long-running page operations, tracked for in-progress indicators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkflowKind {
    Submit,
    Remove,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    CurrentUserLoaded(Option<CurrentUser>),
    StripeCustomerFetched(StripeCustomer),
    /// The user is known to own this processor customer, without its record
    StripeCustomerLinked(String),
    Request(Operation),
    Success(Operation),
    Error(Operation, WorkflowError),
    WorkflowStarted(WorkflowKind),
    WorkflowFinished(WorkflowKind),
    ManageDisableScrolling { component_id: String, disable: bool },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserState {
    pub current_user: Option<CurrentUser>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaymentMethodsState {
    pub add_payment_method_in_progress: bool,
    pub add_payment_method_error: Option<WorkflowError>,
    pub delete_payment_method_in_progress: bool,
    pub delete_payment_method_error: Option<WorkflowError>,
    pub create_stripe_customer_in_progress: bool,
    pub create_stripe_customer_error: Option<WorkflowError>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StripeState {
    pub handle_card_setup_in_progress: bool,
    pub handle_card_setup_error: Option<WorkflowError>,
    pub fetch_stripe_customer_in_progress: bool,
    pub fetch_stripe_customer_error: Option<WorkflowError>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UiState {
    /// Components currently asking for the page scroll to be locked
    pub disable_scrolling: IndexMap<String, bool>,
    pub submit_in_progress: bool,
    pub remove_in_progress: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppState {
    pub user: UserState,
    pub payment_methods: PaymentMethodsState,
    pub stripe: StripeState,
    pub ui: UiState,
}

impl AppState {
    pub fn is_scrolling_disabled(&self) -> bool {
        self.ui.disable_scrolling.values().any(|disabled| *disabled)
    }

    pub fn is_in_progress(&self, kind: WorkflowKind) -> bool {
        match kind {
            WorkflowKind::Submit => self.ui.submit_in_progress,
            WorkflowKind::Remove => self.ui.remove_in_progress,
        }
    }

    /// Whether a submission or removal is running
    pub fn is_busy(&self) -> bool {
        self.ui.submit_in_progress || self.ui.remove_in_progress
    }

    fn slots(&mut self, operation: Operation) -> (&mut bool, &mut Option<WorkflowError>) {
        let pm = &mut self.payment_methods;
        let stripe = &mut self.stripe;
        match operation {
            // Setup intents share the card setup slot: both surface as a
            // failure to set up the card.
            Operation::CreateSetupIntent | Operation::HandleCardSetup => (
                &mut stripe.handle_card_setup_in_progress,
                &mut stripe.handle_card_setup_error,
            ),
            Operation::CreateStripeCustomer => (
                &mut pm.create_stripe_customer_in_progress,
                &mut pm.create_stripe_customer_error,
            ),
            Operation::AddPaymentMethod | Operation::UpdatePaymentMethod => (
                &mut pm.add_payment_method_in_progress,
                &mut pm.add_payment_method_error,
            ),
            Operation::DeletePaymentMethod => (
                &mut pm.delete_payment_method_in_progress,
                &mut pm.delete_payment_method_error,
            ),
            Operation::FetchStripeCustomer => (
                &mut stripe.fetch_stripe_customer_in_progress,
                &mut stripe.fetch_stripe_customer_error,
            ),
        }
    }
}

pub fn reduce(state: &mut AppState, action: Action) {
    match action {
        Action::CurrentUserLoaded(user) => state.user.current_user = user,
        Action::StripeCustomerFetched(customer) => {
            if let Some(user) = state.user.current_user.as_mut() {
                user.stripe_customer = Some(customer);
            }
            let (in_progress, error) = state.slots(Operation::FetchStripeCustomer);
            *in_progress = false;
            *error = None;
        }
        Action::StripeCustomerLinked(customer_id) => {
            if let Some(user) = state.user.current_user.as_mut() {
                let linked = user.stripe_customer_id() == Some(customer_id.as_str());
                if !linked {
                    user.stripe_customer = Some(StripeCustomer::new(customer_id));
                }
            }
        }
        Action::Request(operation) => {
            let (in_progress, error) = state.slots(operation);
            *in_progress = true;
            *error = None;
        }
        Action::Success(operation) => {
            let (in_progress, _) = state.slots(operation);
            *in_progress = false;
        }
        Action::Error(operation, e) => {
            let (in_progress, error) = state.slots(operation);
            *in_progress = false;
            *error = Some(e);
        }
        // a new run starts from clean error slots
        Action::WorkflowStarted(kind) => match kind {
            WorkflowKind::Submit => {
                state.ui.submit_in_progress = true;
                state.stripe.handle_card_setup_error = None;
                state.payment_methods.create_stripe_customer_error = None;
                state.payment_methods.add_payment_method_error = None;
            }
            WorkflowKind::Remove => {
                state.ui.remove_in_progress = true;
                state.payment_methods.delete_payment_method_error = None;
            }
        },
        Action::WorkflowFinished(kind) => match kind {
            WorkflowKind::Submit => state.ui.submit_in_progress = false,
            WorkflowKind::Remove => state.ui.remove_in_progress = false,
        },
        Action::ManageDisableScrolling {
            component_id,
            disable,
        } => {
            state.ui.disable_scrolling.insert(component_id, disable);
        }
    }
}

/// Shared handle to the application state
#[derive(Debug, Clone, Default)]
pub struct Store {
    state: Arc<RwLock<AppState>>,
}

impl Store {
    pub fn new(state: AppState) -> Self {
        Self {
            state: Arc::new(RwLock::new(state)),
        }
    }

    pub fn with_user(user: CurrentUser) -> Self {
        let store = Self::default();
        store.dispatch(Action::CurrentUserLoaded(Some(user)));
        store
    }

    pub fn dispatch(&self, action: Action) {
        debug!(?action, "Dispatching action");
        reduce(&mut self.state.write(), action);
    }

    pub fn dispatch_all(&self, actions: impl IntoIterator<Item = Action>) {
        for action in actions {
            self.dispatch(action);
        }
    }

    pub fn state(&self) -> AppState {
        self.state.read().clone()
    }

    /// Read a part of the state without cloning the whole tree
    pub fn select<T>(&self, selector: impl FnOnce(&AppState) -> T) -> T {
        selector(&self.state.read())
    }

    pub fn current_user(&self) -> Option<CurrentUser> {
        self.select(|s| s.user.current_user.clone())
    }

    pub fn is_scrolling_disabled(&self) -> bool {
        self.select(AppState::is_scrolling_disabled)
    }

    /// Mark `kind` as running. Returns false when a submission or removal
    /// already is, leaving the state untouched.
    pub fn try_begin(&self, kind: WorkflowKind) -> bool {
        let mut state = self.state.write();
        if state.is_busy() {
            return false;
        }
        reduce(&mut state, Action::WorkflowStarted(kind));
        true
    }
}

impl ScrollLock for Store {
    fn manage_disable_scrolling(&self, component_id: &str, disable: bool) {
        self.dispatch(Action::ManageDisableScrolling {
            component_id: component_id.to_string(),
            disable,
        });
    }
}

#[cfg(test)]
mod tests {
    use payment_methods_types::{Card, CardBrand, DefaultPaymentMethod};

    use super::*;
    use crate::error::ProcessorError;

    fn declined() -> WorkflowError {
        WorkflowError::CardConfirmation(ProcessorError::api("card_declined", "declined"))
    }

    #[test]
    fn test_error_slots() {
        let mut state = AppState::default();

        reduce(&mut state, Action::Request(Operation::HandleCardSetup));
        assert!(state.stripe.handle_card_setup_in_progress);

        reduce(
            &mut state,
            Action::Error(Operation::HandleCardSetup, declined()),
        );
        assert!(!state.stripe.handle_card_setup_in_progress);
        assert_eq!(state.stripe.handle_card_setup_error, Some(declined()));

        // a new request clears the stale error
        reduce(&mut state, Action::Request(Operation::HandleCardSetup));
        assert_eq!(state.stripe.handle_card_setup_error, None);
    }

    #[test]
    fn test_update_errors_use_add_slot() {
        let mut state = AppState::default();
        let err = WorkflowError::PaymentMethodMutation(ProcessorError::Transport("reset".into()));
        reduce(
            &mut state,
            Action::Error(Operation::UpdatePaymentMethod, err.clone()),
        );
        assert_eq!(state.payment_methods.add_payment_method_error, Some(err));
        assert_eq!(state.payment_methods.delete_payment_method_error, None);
    }

    #[test]
    fn test_scroll_lock_counts_any_component() {
        let store = Store::default();
        store.manage_disable_scrolling("VerifyDeletingPaymentMethod", true);
        store.manage_disable_scrolling("Topbar", false);
        assert!(store.is_scrolling_disabled());

        store.manage_disable_scrolling("VerifyDeletingPaymentMethod", false);
        assert!(!store.is_scrolling_disabled());
    }

    #[test]
    fn test_fetched_customer_lands_on_current_user() {
        let store = Store::with_user(CurrentUser {
            id: "user-1".to_string(),
            email: "joe@example.com".to_string(),
            first_name: "Joe".to_string(),
            last_name: "Dunphy".to_string(),
            stripe_customer: None,
        });

        store.dispatch(Action::StripeCustomerFetched(StripeCustomer::new("cus_123")));

        let user = store.current_user().unwrap();
        assert_eq!(user.stripe_customer_id(), Some("cus_123"));
    }

    #[test]
    fn test_submit_start_clears_stale_errors() {
        let mut state = AppState::default();
        let err = WorkflowError::CustomerCreation(ProcessorError::Transport("reset".into()));
        reduce(
            &mut state,
            Action::Error(Operation::CreateStripeCustomer, err.clone()),
        );
        reduce(
            &mut state,
            Action::Error(Operation::DeletePaymentMethod, err.clone()),
        );

        reduce(&mut state, Action::WorkflowStarted(WorkflowKind::Submit));
        assert_eq!(state.payment_methods.create_stripe_customer_error, None);
        // unrelated slot untouched
        assert_eq!(state.payment_methods.delete_payment_method_error, Some(err));
    }

    #[test]
    fn test_try_begin_is_exclusive() {
        let store = Store::default();
        assert!(store.try_begin(WorkflowKind::Submit));
        assert!(!store.try_begin(WorkflowKind::Submit));
        assert!(!store.try_begin(WorkflowKind::Remove));

        store.dispatch(Action::WorkflowFinished(WorkflowKind::Submit));
        assert!(store.try_begin(WorkflowKind::Remove));
        assert!(!store.try_begin(WorkflowKind::Submit));
        assert!(!store.state().ui.submit_in_progress);
    }

    #[test]
    fn test_customer_link_keeps_fetched_record() {
        let mut state = AppState::default();
        state.user.current_user = Some(CurrentUser {
            id: "user-1".to_string(),
            email: "joe@example.com".to_string(),
            first_name: "Joe".to_string(),
            last_name: "Dunphy".to_string(),
            stripe_customer: None,
        });

        reduce(&mut state, Action::StripeCustomerLinked("cus_123".to_string()));
        let user = state.user.current_user.as_ref().unwrap();
        assert_eq!(user.stripe_customer_id(), Some("cus_123"));

        let fetched = StripeCustomer::new("cus_123").with_default_payment_method(
            DefaultPaymentMethod {
                id: "pm-link-1".to_string(),
                stripe_payment_method_id: "pm_123".to_string(),
                card: Card {
                    brand: CardBrand::Visa,
                    expiration_month: 12,
                    expiration_year: 2030,
                    last4_digits: "4242".to_string(),
                },
            },
        );
        reduce(&mut state, Action::StripeCustomerFetched(fetched.clone()));
        reduce(&mut state, Action::StripeCustomerLinked("cus_123".to_string()));
        let user = state.user.current_user.as_ref().unwrap();
        assert_eq!(user.stripe_customer.as_ref(), Some(&fetched));
    }
}
