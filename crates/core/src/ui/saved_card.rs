use std::sync::Arc;

use chrono::Datelike;
use payment_methods_types::{Card, CardBrand};

use super::{
    DropdownMenu, ScrollLock,
    modal::{DeleteConfirmation, DeleteConfirmationDialog, DialogRender},
};
use crate::expiry::{card_is_expired, format_expiry};

/// Entries of the saved card menu
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardMenuItem {
    DefaultCard,
    ReplaceCard,
}

/// Inputs supplied by the page on every render
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SavedCardProps {
    pub card: Option<Card>,
    /// Whether the page handles deletes; hides the delete affordance when false
    pub deletable: bool,
    /// Whether the page wants to hear about menu selections
    pub notify_change: bool,
    pub delete_in_progress: bool,
}

/// Side effects requested by the view
#[derive(Debug, PartialEq, Eq)]
pub enum ViewIntent {
    CardSelectionChanged(CardMenuItem),
    DeleteCard(DeleteConfirmation),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardSummary {
    pub brand: CardBrand,
    pub masked_number: String,
    pub expiry: String,
    pub expired: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuLabel {
    Card(CardSummary),
    /// Generic card icon with the "replace card" text
    ReplaceCard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteAffordance {
    pub disabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedCardRender {
    pub label: MenuLabel,
    pub label_expired_style: bool,
    pub arrow_rotation: u32,
    pub show_expired_warning: bool,
    pub menu_open: bool,
    pub menu_items: Vec<(CardMenuItem, MenuLabel)>,
    pub delete: Option<DeleteAffordance>,
    pub dialog: DialogRender,
}

/// Saved card summary with a replace-card menu and a guarded delete
pub struct SavedCardView {
    props: SavedCardProps,
    menu: DropdownMenu<CardMenuItem>,
    dialog: DeleteConfirmationDialog,
    scroll_lock: Arc<dyn ScrollLock>,
}

impl SavedCardView {
    pub fn new(props: SavedCardProps, scroll_lock: Arc<dyn ScrollLock>) -> Self {
        Self {
            props,
            menu: DropdownMenu::new(CardMenuItem::DefaultCard),
            dialog: DeleteConfirmationDialog::new(),
            scroll_lock,
        }
    }

    pub fn props(&self) -> &SavedCardProps {
        &self.props
    }

    pub fn set_props(&mut self, props: SavedCardProps) {
        self.props = props;
    }

    pub fn active_item(&self) -> CardMenuItem {
        self.menu.active()
    }

    pub fn is_dialog_open(&self) -> bool {
        self.dialog.is_open()
    }

    pub fn toggle_menu(&mut self, is_open: bool) {
        self.menu.toggle(is_open);
    }

    pub fn select(&mut self, item: CardMenuItem) -> Option<ViewIntent> {
        self.menu.select(item);
        self.props
            .notify_change
            .then_some(ViewIntent::CardSelectionChanged(item))
    }

    /// Open the confirmation dialog. Does nothing without a delete handler.
    pub fn click_delete(&mut self) -> bool {
        if !self.props.deletable {
            return false;
        }
        self.dialog.open(self.scroll_lock.as_ref());
        true
    }

    pub fn cancel_delete(&mut self) {
        self.dialog.cancel(self.scroll_lock.as_ref());
    }

    pub fn confirm_delete(&mut self) -> Option<ViewIntent> {
        if !self.props.deletable {
            return None;
        }
        self.dialog
            .confirm(self.props.delete_in_progress)
            .map(ViewIntent::DeleteCard)
    }

    pub fn close_dialog(&mut self) {
        self.dialog.close(self.scroll_lock.as_ref());
    }

    /// Describe the view; `None` without a card to show.
    pub fn render(&self, now: &impl Datelike) -> Option<SavedCardRender> {
        let card = self.props.card.as_ref()?;
        let expired = card_is_expired(card, now);
        let summary = CardSummary {
            brand: card.brand,
            masked_number: card.masked_number(),
            expiry: format_expiry(card.expiration_month, card.expiration_year),
            expired,
        };

        let active = self.menu.active();
        let show_expired = expired && active == CardMenuItem::DefaultCard;
        let label = match active {
            CardMenuItem::DefaultCard => MenuLabel::Card(summary.clone()),
            CardMenuItem::ReplaceCard => MenuLabel::ReplaceCard,
        };

        Some(SavedCardRender {
            label,
            label_expired_style: show_expired,
            arrow_rotation: self.menu.arrow_rotation(),
            show_expired_warning: show_expired && !self.menu.is_open(),
            menu_open: self.menu.is_open(),
            menu_items: vec![
                (CardMenuItem::DefaultCard, MenuLabel::Card(summary)),
                (CardMenuItem::ReplaceCard, MenuLabel::ReplaceCard),
            ],
            delete: self.props.deletable.then_some(DeleteAffordance {
                disabled: self.props.delete_in_progress,
            }),
            dialog: self.dialog.render(self.props.delete_in_progress),
        })
    }
}
