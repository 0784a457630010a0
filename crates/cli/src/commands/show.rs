use clap::Parser;
use console::style;
use payment_methods_core::{PaymentMethodsPage, PaymentProcessor};

use super::PageCommand;
use crate::output::print_view;

#[derive(Parser, PartialEq, Clone, Debug)]
pub struct ShowCommand {
    /// Print the customer record as JSON
    #[arg(long = "json")]
    pub json: bool,
}

impl PageCommand for ShowCommand {
    async fn run<P: PaymentProcessor>(&self, page: &PaymentMethodsPage<P>) -> Result<(), String> {
        if let Err(e) = page.load_data().await {
            eprintln!("{} {}", style("⚠").yellow(), e);
        }

        if self.json {
            let customer = page
                .store()
                .current_user()
                .and_then(|user| user.stripe_customer);
            let json = serde_json::to_string_pretty(&customer)
                .map_err(|e| format!("Failed to serialize customer: {}", e))?;
            println!("{}", json);
        } else {
            print_view(&page.view());
        }
        Ok(())
    }
}
