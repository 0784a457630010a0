//! View state for the payment methods page.
//!
//! Components here own their local UI state (open/closed flags, active menu
//! item) and describe what they would draw through plain render structs.
//! Actions with side effects are handed back to the caller as intents.

pub mod menu;
pub mod modal;
pub mod saved_card;

pub use menu::DropdownMenu;
pub use modal::{DeleteConfirmation, DeleteConfirmationDialog, DialogRender};
pub use saved_card::{
    CardMenuItem, CardSummary, DeleteAffordance, MenuLabel, SavedCardProps, SavedCardRender,
    SavedCardView, ViewIntent,
};

/// Locks page scrolling while overlays are open
pub trait ScrollLock: Send + Sync {
    fn manage_disable_scrolling(&self, component_id: &str, disable: bool);
}
