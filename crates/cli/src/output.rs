use console::style;
use payment_methods_core::{
    PageView, PaymentFormProps, WorkflowError, WorkflowResult,
    ui::{CardSummary, MenuLabel},
};

pub fn card_line(summary: &CardSummary) -> String {
    format!(
        "{} {}  expires {}",
        summary.brand, summary.masked_number, summary.expiry
    )
}

pub fn result_message(result: &WorkflowResult) -> String {
    match result {
        WorkflowResult::CustomerCreated => "Created customer and saved card".to_string(),
        WorkflowResult::PaymentMethodAdded => "Saved card".to_string(),
        WorkflowResult::PaymentMethodUpdated => "Replaced saved card".to_string(),
        WorkflowResult::PaymentMethodDeleted => "Deleted saved card".to_string(),
        WorkflowResult::Failed(e) => e.to_string(),
    }
}

fn form_errors(props: &PaymentFormProps) -> Vec<&WorkflowError> {
    [
        props.handle_card_setup_error.as_ref(),
        props.create_stripe_customer_error.as_ref(),
        props.add_payment_method_error.as_ref(),
        props.delete_payment_method_error.as_ref(),
    ]
    .into_iter()
    .flatten()
    .collect()
}

pub fn print_view(view: &PageView) {
    match view {
        PageView::SavedCard(render) => {
            if let MenuLabel::Card(summary) = &render.label {
                let line = card_line(summary);
                if render.label_expired_style {
                    println!("{} {}", style("Default card:").bold(), style(line).red());
                } else {
                    println!("{} {}", style("Default card:").bold(), line);
                }
            }
            if render.show_expired_warning {
                println!(
                    "{} This card has expired. Replace it with `paymethods add --card <token>`.",
                    style("⚠").yellow()
                );
            }
        }
        PageView::PaymentForm(props) => {
            println!("{}", style("No saved card.").dim());
            for error in form_errors(props) {
                println!("{} {}", style("✗").red(), error);
            }
            println!(
                "Add one with `paymethods add --card <token>`{}",
                props
                    .initial_values
                    .name
                    .as_ref()
                    .map(|name| format!(" (cardholder: {})", name))
                    .unwrap_or_default()
            );
        }
    }
}
