use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::naming::display_name;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: String,
    /// Last-seen cache, bumped whenever an action is recorded for the user.
    pub active_ts: DateTime<Utc>,
}

impl User {
    pub fn new(
        first_name: Option<&str>,
        last_name: Option<&str>,
        email: &str,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            first_name: first_name.map(str::to_string),
            last_name: last_name.map(str::to_string),
            email: email.to_string(),
            active_ts: now,
        }
    }

    pub fn display_name(&self) -> String {
        display_name(
            self.first_name.as_deref(),
            self.last_name.as_deref(),
            &self.email,
        )
    }
}

/// What a logged action was for. Stored as snake_case strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    ReserveTickets,
    BuyTickets,
    CancelReservedTickets,
}

impl ActionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::ReserveTickets => "reserve_tickets",
            ActionType::BuyTickets => "buy_tickets",
            ActionType::CancelReservedTickets => "cancel_reserved_tickets",
        }
    }
}

/// Append-only audit entry. Inserting one bumps the user's `active_ts`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Action {
    pub id: Uuid,
    pub user_id: Uuid,
    pub action_type: ActionType,
    pub ts: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_display_name() {
        let now = Utc::now();
        let user = User::new(Some("Jo"), Some("Smith"), "jo@example.com", now);
        assert_eq!(user.display_name(), "Jo Smith");
        assert_eq!(user.active_ts, now);

        let anonymous = User::new(None, None, "a@b.com", now);
        assert_eq!(anonymous.display_name(), "a@b.com");
    }

    #[test]
    fn test_action_type_strings() {
        assert_eq!(ActionType::ReserveTickets.as_str(), "reserve_tickets");
        assert_eq!(ActionType::BuyTickets.as_str(), "buy_tickets");
        assert_eq!(
            ActionType::CancelReservedTickets.as_str(),
            "cancel_reserved_tickets"
        );
    }
}
