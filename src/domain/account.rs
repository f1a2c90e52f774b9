use rand::Rng;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use utoipa::ToSchema;

/// Upper bound (exclusive) for generated account numbers.
pub const ACCOUNT_NUMBER_BOUND: i64 = 10_000_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    /// Assigned by the storage layer, `0` until the account has been persisted.
    pub id: i32,
    pub first_name: String,
    pub last_name: String,
    pub account_number: i64,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub balance: Decimal,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Account {
    /// Create a new, not yet persisted account with a random account number, a zero balance and
    /// the current UTC time as creation timestamp.
    ///
    /// Account numbers are not checked for uniqueness.
    pub fn new(first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        Self {
            id: 0,
            first_name: first_name.into(),
            last_name: last_name.into(),
            account_number: rand::thread_rng().gen_range(0..ACCOUNT_NUMBER_BOUND),
            balance: Decimal::ZERO,
            created_at: OffsetDateTime::now_utc(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_new() {
        let before = OffsetDateTime::now_utc();
        let account = Account::new("Heiko", "Seeberger");

        assert_eq!(account.id, 0);
        assert_eq!(account.first_name, "Heiko");
        assert_eq!(account.last_name, "Seeberger");
        assert!((0..ACCOUNT_NUMBER_BOUND).contains(&account.account_number));
        assert_eq!(account.balance, Decimal::ZERO);
        assert!(account.created_at >= before);
        assert_eq!(account.created_at.offset(), time::UtcOffset::UTC);
    }

    #[test]
    fn test_json() {
        let mut account = Account::new("Ada", "Lovelace");
        account.id = 42;

        let value = serde_json::to_value(&account).unwrap();
        assert_eq!(value["id"], json!(42));
        assert_eq!(value["firstName"], json!("Ada"));
        assert_eq!(value["lastName"], json!("Lovelace"));
        assert_eq!(value["accountNumber"], json!(account.account_number));
        assert_eq!(value["balance"], json!(0.0));
        assert!(value["createdAt"].is_string());

        let decoded = serde_json::from_value::<Account>(value).unwrap();
        assert_eq!(decoded, account);
    }
}
