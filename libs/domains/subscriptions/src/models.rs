use serde::{Deserialize, Serialize};

/// The user a subscription belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscriber {
    pub id: i64,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

impl Subscriber {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

/// A plan a subscriber can sign up for. Prices are kept in cents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    pub id: i64,
    pub name: String,
    pub amount_cents: i64,
}

impl Plan {
    /// Price as shown to customers, e.g. `$10.00`.
    pub fn amount_formatted(&self) -> String {
        let sign = if self.amount_cents < 0 { "-" } else { "" };
        let cents = self.amount_cents.unsigned_abs();
        format!("{sign}${}.{:02}", cents / 100, cents % 100)
    }

    /// Invoice text sent to the subscriber.
    pub fn invoice_text(&self) -> String {
        self.amount_formatted()
    }
}
