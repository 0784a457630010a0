pub mod error;
pub mod expiry;
pub mod page;
pub mod processor;
pub mod store;
pub mod ui;
pub mod workflow;

pub use error::{ProcessorError, WorkflowError};
pub use page::{PageView, PaymentFormProps, PaymentMethodsPage};
pub use processor::{NewCustomer, PaymentProcessor, SandboxProcessor, SandboxState};
pub use store::{Action, AppState, Operation, Store, WorkflowKind};
pub use workflow::{
    PaymentMethodWorkflow, SaveBranch, WorkflowConfig, WorkflowOutcome, WorkflowResult,
    WorkflowSnapshot, WorkflowStage,
};
