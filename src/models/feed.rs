use serde::{Deserialize, Serialize};

use super::UserId;

/// Kind of entity a feed event refers to
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    Like,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Like => "LIKE",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Operation {
    Add,
    Remove,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Add => "ADD",
            Operation::Remove => "REMOVE",
        }
    }
}

/// Entry of a user's activity feed
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserEvent {
    pub event_id: i64,
    pub user_id: UserId,
    pub event_type: EventType,
    pub operation: Operation,
    /// Film id for like events
    pub entity_id: i64,
    /// Epoch milliseconds
    pub timestamp: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization() {
        let event = UserEvent {
            event_id: 1,
            user_id: UserId(4),
            event_type: EventType::Like,
            operation: Operation::Remove,
            entity_id: 9,
            timestamp: 1_700_000_000_000,
        };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["eventType"], "LIKE");
        assert_eq!(json["operation"], "REMOVE");
        assert_eq!(json["userId"], 4);
        assert_eq!(json["entityId"], 9);
    }

    #[test]
    fn test_as_str_matches_serde() {
        assert_eq!(
            serde_json::to_string(&Operation::Add).unwrap(),
            format!("\"{}\"", Operation::Add.as_str())
        );
        assert_eq!(
            serde_json::to_string(&EventType::Like).unwrap(),
            format!("\"{}\"", EventType::Like.as_str())
        );
    }
}
