//! Card expiry checks.
//!
//! Months are compared as 1-indexed calendar months on both sides, so a card
//! stays valid through the last day of its expiration month.

use chrono::Datelike;
use payment_methods_types::Card;

/// Whether `month`/`year` lies strictly before the month of `now`
pub fn is_expired(month: u32, year: i32, now: &impl Datelike) -> bool {
    if year < now.year() {
        return true;
    }
    year == now.year() && month < now.month()
}

/// Expiry check for a saved card. Cards with an unknown (zero) month or year
/// are never reported as expired.
pub fn card_is_expired(card: &Card, now: &impl Datelike) -> bool {
    card.expiration_month != 0
        && card.expiration_year != 0
        && is_expired(card.expiration_month, card.expiration_year, now)
}

/// `M/YY`, as printed on the card
pub fn format_expiry(month: u32, year: i32) -> String {
    format!("{}/{:02}", month, year.rem_euclid(100))
}
