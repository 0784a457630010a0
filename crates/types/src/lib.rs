pub mod billing;
pub mod card;
pub mod stripe;
pub mod user;

pub use billing::{
    Address, BillingDetails, CardElement, CardFormInput, DEFAULT_COUNTRY,
    PaymentFormInitialValues, PaymentFormValues,
};
pub use card::{Card, CardBrand};
pub use stripe::{CardSetup, SetupIntent};
pub use user::{CurrentUser, DefaultPaymentMethod, PaymentMethodState, StripeCustomer};

/// Name of the configuration file read by the CLI
pub const MANIFEST_FILE_NAME: &str = "payments.yaml";
