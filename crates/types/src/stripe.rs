//! Processor-side objects exchanged during card setup

use serde::{Deserialize, Serialize};

/// Setup intent issued by the processor for a single confirmation attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetupIntent {
    pub id: String,
    pub client_secret: String,
}

impl SetupIntent {
    /// Recover the intent id from a client secret (`seti_xxx_secret_yyy`)
    pub fn id_from_client_secret(client_secret: &str) -> Option<&str> {
        client_secret
            .split_once("_secret_")
            .map(|(id, _)| id)
            .filter(|id| id.starts_with("seti_"))
    }
}

/// Result of a successful card confirmation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardSetup {
    pub setup_intent_id: String,
    pub payment_method_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_from_client_secret() {
        assert_eq!(
            SetupIntent::id_from_client_secret("seti_1Abc_secret_Xyz"),
            Some("seti_1Abc")
        );
        assert_eq!(SetupIntent::id_from_client_secret("pi_1Abc_secret_Xyz"), None);
        assert_eq!(SetupIntent::id_from_client_secret("garbage"), None);
    }
}
