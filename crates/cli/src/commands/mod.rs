use std::sync::Arc;

use console::style;
use payment_methods_core::{
    PaymentMethodWorkflow, PaymentMethodsPage, PaymentProcessor, SandboxProcessor, Store,
    WorkflowConfig,
};
use payment_methods_driver_stripe::StripeProcessor;
use payment_methods_types::{CurrentUser, StripeCustomer};
use tracing::info;

use crate::{Context, session::SessionState};

pub mod add;
pub mod remove;
pub mod show;

pub use add::AddCommand;
pub use remove::RemoveCommand;
pub use show::ShowCommand;

/// A command driving the payment methods page
#[allow(async_fn_in_trait)]
pub trait PageCommand {
    async fn run<P: PaymentProcessor>(&self, page: &PaymentMethodsPage<P>) -> Result<(), String>;
}

fn build_page<P: PaymentProcessor>(
    processor: Arc<P>,
    user: CurrentUser,
    config: WorkflowConfig,
) -> PaymentMethodsPage<P> {
    PaymentMethodsPage::new(
        Store::with_user(user),
        PaymentMethodWorkflow::with_config(processor, config),
    )
}

fn linked_customer<P: PaymentProcessor>(page: &PaymentMethodsPage<P>) -> Option<StripeCustomer> {
    page.store()
        .current_user()
        .and_then(|user| user.stripe_customer)
}

/// Run `command` against the configured processor, persisting the session
/// afterwards even when the command failed.
pub async fn execute<C: PageCommand>(command: &C, ctx: &Context) -> Result<(), String> {
    let state_path = ctx.manifest.state_path(&ctx.manifest_dir);
    let mut session = SessionState::load(&state_path).map_err(|e| e.to_string())?;

    let user = ctx
        .manifest
        .user
        .to_current_user(session.customer(ctx.use_sandbox).cloned());
    let config = WorkflowConfig {
        call_timeout: ctx.manifest.call_timeout(),
    };

    let outcome = if ctx.use_sandbox {
        eprintln!("{} Using the sandbox processor", style("ℹ").cyan());
        let processor = Arc::new(SandboxProcessor::from_state(session.sandbox.clone()));
        let page = build_page(processor.clone(), user, config);
        let outcome = command.run(&page).await;
        session.sandbox = processor.snapshot();
        session.set_customer(true, linked_customer(&page));
        outcome
    } else {
        let api_key = ctx.api_key.as_deref().ok_or_else(|| {
            "Stripe API key not found. Pass --api-key or set STRIPE_SECRET_KEY.".to_string()
        })?;
        let processor = Arc::new(StripeProcessor::new(api_key));
        if processor.is_test_mode() {
            info!("Using a Stripe test mode key");
        }
        let page = build_page(processor, user, config);
        let outcome = command.run(&page).await;
        session.set_customer(false, linked_customer(&page));
        outcome
    };

    session.save(&state_path).map_err(|e| e.to_string())?;
    outcome
}

#[cfg(test)]
mod tests {
    use std::{fs, path::Path};

    use payment_methods_types::{DEFAULT_COUNTRY, MANIFEST_FILE_NAME};

    use super::*;
    use crate::manifest::Manifest;

    fn sandbox_context(dir: &Path) -> Context {
        let manifest_path = dir.join(MANIFEST_FILE_NAME);
        fs::write(
            &manifest_path,
            "user:\n  id: user-1\n  email: joe@example.com\n  first_name: Joe\n  last_name: Dunphy\nprocessor:\n  provider: sandbox\n",
        )
        .unwrap();
        let manifest = Manifest::load(&manifest_path).unwrap();
        Context {
            manifest_dir: dir.to_path_buf(),
            use_sandbox: manifest.use_sandbox(false),
            manifest,
            api_key: None,
        }
    }

    fn add(card: &str) -> AddCommand {
        AddCommand {
            card: card.to_string(),
            name: None,
            address_line1: None,
            address_line2: None,
            postal: None,
            city: None,
            state: None,
            country: DEFAULT_COUNTRY.to_string(),
        }
    }

    fn session(ctx: &Context) -> SessionState {
        SessionState::load(&ctx.manifest.state_path(&ctx.manifest_dir)).unwrap()
    }

    #[tokio::test]
    async fn test_add_replace_and_remove_in_sandbox() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = sandbox_context(dir.path());

        execute(&add("pm_card_visa"), &ctx).await.unwrap();
        let customer = session(&ctx).sandbox_customer.unwrap();
        let card = customer.default_payment_method.unwrap().card;
        assert_eq!(card.last4_digits, "4242");

        execute(&add("pm_card_mastercard"), &ctx).await.unwrap();
        let state = session(&ctx);
        let replaced = state.sandbox_customer.clone().unwrap();
        assert_eq!(replaced.stripe_customer_id, customer.stripe_customer_id);
        assert_eq!(
            replaced.default_payment_method.unwrap().card.last4_digits,
            "4444"
        );
        assert_eq!(state.sandbox.customers.len(), 1);

        execute(&RemoveCommand { yes: true }, &ctx).await.unwrap();
        let removed = session(&ctx).sandbox_customer.unwrap();
        assert!(removed.default_payment_method.is_none());

        let err = execute(&RemoveCommand { yes: true }, &ctx)
            .await
            .unwrap_err();
        assert!(err.contains("No saved card"));
    }

    #[tokio::test]
    async fn test_declined_card_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = sandbox_context(dir.path());

        let err = execute(&add("pm_card_chargeDeclined"), &ctx)
            .await
            .unwrap_err();
        assert!(err.contains("declined"));
        assert!(session(&ctx).sandbox_customer.is_none());
    }

    #[tokio::test]
    async fn test_live_mode_requires_api_key() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = sandbox_context(dir.path());
        ctx.use_sandbox = false;

        let err = execute(&ShowCommand { json: false }, &ctx)
            .await
            .unwrap_err();
        assert!(err.contains("STRIPE_SECRET_KEY"));
    }
}
