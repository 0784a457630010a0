use clap::Parser;
use console::style;
use payment_methods_core::{PageView, PaymentMethodsPage, PaymentProcessor, WorkflowResult};
use payment_methods_types::{CardElement, CardFormInput, DEFAULT_COUNTRY, PaymentFormValues};

use super::PageCommand;
use crate::output::{print_view, result_message};

#[derive(Parser, PartialEq, Clone, Debug)]
pub struct AddCommand {
    /// Card token produced by the card element, e.g. pm_card_visa
    #[arg(long = "card", short = 'c')]
    pub card: String,

    /// Cardholder name (default: the user's name)
    #[arg(long = "name")]
    pub name: Option<String>,

    #[arg(long = "address-line1")]
    pub address_line1: Option<String>,

    #[arg(long = "address-line2")]
    pub address_line2: Option<String>,

    #[arg(long = "postal")]
    pub postal: Option<String>,

    #[arg(long = "city")]
    pub city: Option<String>,

    #[arg(long = "state")]
    pub state: Option<String>,

    #[arg(long = "country", default_value = DEFAULT_COUNTRY)]
    pub country: String,
}

impl AddCommand {
    fn form_input(&self, default_name: Option<String>) -> CardFormInput {
        CardFormInput {
            card: CardElement::new(&self.card),
            form_values: PaymentFormValues {
                name: self.name.clone().or(default_name).unwrap_or_default(),
                address_line1: self.address_line1.clone(),
                address_line2: self.address_line2.clone(),
                postal: self.postal.clone(),
                state: self.state.clone(),
                city: self.city.clone(),
                country: Some(self.country.clone()),
            },
        }
    }
}

impl PageCommand for AddCommand {
    async fn run<P: PaymentProcessor>(&self, page: &PaymentMethodsPage<P>) -> Result<(), String> {
        page.load_data().await.map_err(|e| e.to_string())?;

        let default_name = match page.view() {
            PageView::PaymentForm(props) => props.initial_values.name,
            PageView::SavedCard(_) => page.store().current_user().map(|u| u.display_name()),
        };

        match page
            .handle_submit(self.form_input(default_name))
            .await
            .map_err(|e| e.to_string())?
        {
            WorkflowResult::Failed(e) => Err(e.to_string()),
            result => {
                println!("{} {}", style("✔").green(), result_message(&result));
                print_view(&page.view());
                Ok(())
            }
        }
    }
}
