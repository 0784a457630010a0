use clap::Parser;
use console::style;
use dialoguer::{Confirm, theme::ColorfulTheme};
use payment_methods_core::{
    PageView, PaymentMethodsPage, PaymentProcessor, WorkflowResult, ui::MenuLabel,
};

use super::PageCommand;
use crate::output::{card_line, print_view, result_message};

#[derive(Parser, PartialEq, Clone, Debug)]
pub struct RemoveCommand {
    /// Skip the confirmation prompt
    #[arg(long = "yes", short = 'y')]
    pub yes: bool,
}

impl PageCommand for RemoveCommand {
    async fn run<P: PaymentProcessor>(&self, page: &PaymentMethodsPage<P>) -> Result<(), String> {
        page.load_data().await.map_err(|e| e.to_string())?;

        let PageView::SavedCard(render) = page.view() else {
            return Err("No saved card to remove".to_string());
        };
        let card = match &render.label {
            MenuLabel::Card(summary) => card_line(summary),
            MenuLabel::ReplaceCard => "the saved card".to_string(),
        };

        if !page.request_delete() {
            return Err("Deleting the saved card is not available".to_string());
        }

        let confirmed = self.yes
            || Confirm::with_theme(&ColorfulTheme::default())
                .with_prompt(format!("Delete {}?", card))
                .default(false)
                .interact()
                .map_err(|e| format!("Failed to read confirmation: {}", e))?;
        if !confirmed {
            page.cancel_delete();
            println!("{}", style("Cancelled").dim());
            return Ok(());
        }

        match page.confirm_delete().await {
            None => Err("Delete was not confirmed".to_string()),
            Some(Err(e)) => Err(e.to_string()),
            Some(Ok(WorkflowResult::Failed(e))) => Err(e.to_string()),
            Some(Ok(result)) => {
                println!("{} {}", style("✔").green(), result_message(&result));
                print_view(&page.view());
                Ok(())
            }
        }
    }
}
