use std::fmt;

use serde::{Deserialize, Serialize};

/// Card network reported by the processor.
///
/// Unknown networks deserialize to [`CardBrand::Unknown`] so a new brand on the
/// processor side never breaks loading the current user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CardBrand {
    Visa,
    Mastercard,
    Amex,
    Discover,
    Diners,
    Jcb,
    Unionpay,
    /// Placeholder icon, used for the "replace card" menu entry
    None,
    #[default]
    #[serde(other)]
    Unknown,
}

impl CardBrand {
    pub fn as_str(&self) -> &'static str {
        match self {
            CardBrand::Visa => "visa",
            CardBrand::Mastercard => "mastercard",
            CardBrand::Amex => "amex",
            CardBrand::Discover => "discover",
            CardBrand::Diners => "diners",
            CardBrand::Jcb => "jcb",
            CardBrand::Unionpay => "unionpay",
            CardBrand::None => "none",
            CardBrand::Unknown => "unknown",
        }
    }

    /// Parse a processor brand string, case-insensitively
    pub fn from_processor(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "visa" => CardBrand::Visa,
            "mastercard" => CardBrand::Mastercard,
            "amex" | "american express" | "american_express" => CardBrand::Amex,
            "discover" => CardBrand::Discover,
            "diners" | "diners club" => CardBrand::Diners,
            "jcb" => CardBrand::Jcb,
            "unionpay" => CardBrand::Unionpay,
            "none" => CardBrand::None,
            _ => CardBrand::Unknown,
        }
    }
}

impl fmt::Display for CardBrand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of a card as returned by the processor at setup-confirmation time.
///
/// Never edited locally: the only way a card changes is a new confirmation
/// followed by a customer refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub brand: CardBrand,
    /// 1-indexed calendar month
    pub expiration_month: u32,
    pub expiration_year: i32,
    pub last4_digits: String,
}

impl Card {
    /// Placeholder text shown for a saved card, e.g. `•••• 4242`
    pub fn masked_number(&self) -> String {
        format!("•••• {}", self.last4_digits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_card_from_json() {
        let json = r#"{
            "brand": "visa",
            "expirationMonth": 10,
            "expirationYear": 2020,
            "last4Digits": "3220"
        }"#;

        let card: Card = serde_json::from_str(json).unwrap();
        assert_eq!(card.brand, CardBrand::Visa);
        assert_eq!(card.expiration_month, 10);
        assert_eq!(card.expiration_year, 2020);
        assert_eq!(card.masked_number(), "•••• 3220");
    }

    #[test]
    fn test_unknown_brand_does_not_fail() {
        let json = r#"{
            "brand": "cartes_bancaires",
            "expirationMonth": 1,
            "expirationYear": 2030,
            "last4Digits": "0005"
        }"#;

        let card: Card = serde_json::from_str(json).unwrap();
        assert_eq!(card.brand, CardBrand::Unknown);
    }

    #[test]
    fn test_brand_from_processor() {
        assert_eq!(CardBrand::from_processor("Visa"), CardBrand::Visa);
        assert_eq!(
            CardBrand::from_processor("American Express"),
            CardBrand::Amex
        );
        assert_eq!(CardBrand::from_processor("elo"), CardBrand::Unknown);
        assert_eq!(CardBrand::Mastercard.to_string(), "mastercard");
    }
}
