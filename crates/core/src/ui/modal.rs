use tracing::debug;

use super::ScrollLock;

/// Modal id, also used as the scroll-lock component id
pub const DELETE_DIALOG_ID: &str = "VerifyDeletingPaymentMethod";

/// Proof that the user explicitly confirmed the destructive action.
///
/// Only [`DeleteConfirmationDialog::confirm`] can create one.
#[derive(Debug, PartialEq, Eq)]
pub struct DeleteConfirmation(());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DialogRender {
    pub id: &'static str,
    pub is_open: bool,
    /// Disables the confirm button while the delete call runs
    pub confirm_in_progress: bool,
}

/// Confirmation step in front of deleting the saved card.
///
/// Confirming does not close the dialog; the caller closes it once the
/// delete call has resolved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteConfirmationDialog {
    open: bool,
}

impl DeleteConfirmationDialog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn open(&mut self, scroll_lock: &dyn ScrollLock) {
        if !self.open {
            self.open = true;
            scroll_lock.manage_disable_scrolling(DELETE_DIALOG_ID, true);
        }
    }

    pub fn close(&mut self, scroll_lock: &dyn ScrollLock) {
        if self.open {
            self.open = false;
            scroll_lock.manage_disable_scrolling(DELETE_DIALOG_ID, false);
        }
    }

    /// "Cancel": close without side effects
    pub fn cancel(&mut self, scroll_lock: &dyn ScrollLock) {
        self.close(scroll_lock);
    }

    /// "Confirm": yields a confirmation only when the dialog is open and no
    /// delete is already running.
    pub fn confirm(&self, in_progress: bool) -> Option<DeleteConfirmation> {
        if !self.open {
            debug!("Ignoring delete confirmation, dialog is closed");
            return None;
        }
        if in_progress {
            debug!("Ignoring delete confirmation, delete already in progress");
            return None;
        }
        Some(DeleteConfirmation(()))
    }

    pub fn render(&self, in_progress: bool) -> DialogRender {
        DialogRender {
            id: DELETE_DIALOG_ID,
            is_open: self.open,
            confirm_in_progress: in_progress,
        }
    }
}

#[cfg(test)]
mod tests {
    use parking_lot::Mutex;

    use super::*;

    #[derive(Default)]
    struct RecordingLock(Mutex<Vec<(String, bool)>>);

    impl ScrollLock for RecordingLock {
        fn manage_disable_scrolling(&self, component_id: &str, disable: bool) {
            self.0.lock().push((component_id.to_string(), disable));
        }
    }

    #[test]
    fn test_confirm_requires_open_dialog() {
        let dialog = DeleteConfirmationDialog::new();
        assert_eq!(dialog.confirm(false), None);
    }

    #[test]
    fn test_confirm_does_not_close() {
        let lock = RecordingLock::default();
        let mut dialog = DeleteConfirmationDialog::new();
        dialog.open(&lock);

        assert!(dialog.confirm(false).is_some());
        assert!(dialog.is_open());
        // refused while the delete runs
        assert!(dialog.confirm(true).is_none());
    }

    #[test]
    fn test_cancel_releases_scroll_lock() {
        let lock = RecordingLock::default();
        let mut dialog = DeleteConfirmationDialog::new();
        dialog.open(&lock);
        dialog.open(&lock);
        dialog.cancel(&lock);

        assert!(!dialog.is_open());
        assert_eq!(
            *lock.0.lock(),
            vec![
                (DELETE_DIALOG_ID.to_string(), true),
                (DELETE_DIALOG_ID.to_string(), false)
            ]
        );
    }
}
