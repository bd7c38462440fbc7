use std::fmt;

use serde::{Deserialize, Serialize};

// =============================================================================
// Intent
// =============================================================================

/// What the guest is trying to do in the current turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    /// See open time slots for a date and party size.
    CheckAvailability,
    /// Make a new reservation.
    CreateBooking,
    /// Look up an existing reservation.
    GetBooking,
    /// Change date, time, party size or requests on a reservation.
    UpdateBooking,
    /// Cancel a reservation.
    CancelBooking,
    /// Greeting, help, small talk or anything unrecognized.
    Conversation,
}

impl Intent {
    /// Map a model-emitted label to an intent.
    ///
    /// Matching is case-insensitive and ignores surrounding whitespace and
    /// square brackets. An empty label yields `None`; any non-empty label
    /// outside the five booking operations is `Conversation`.
    pub fn from_label(label: &str) -> Option<Intent> {
        let normalized = label
            .trim()
            .trim_matches(|c| c == '[' || c == ']')
            .trim()
            .to_lowercase();
        if normalized.is_empty() {
            return None;
        }
        Some(match normalized.as_str() {
            "check_availability" => Intent::CheckAvailability,
            "create_booking" => Intent::CreateBooking,
            "get_booking" => Intent::GetBooking,
            "update_booking" => Intent::UpdateBooking,
            "cancel_booking" => Intent::CancelBooking,
            _ => Intent::Conversation,
        })
    }

    /// Snake-case label, identical to the serialized form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::CheckAvailability => "check_availability",
            Intent::CreateBooking => "create_booking",
            Intent::GetBooking => "get_booking",
            Intent::UpdateBooking => "update_booking",
            Intent::CancelBooking => "cancel_booking",
            Intent::Conversation => "conversation",
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Entities
// =============================================================================

/// Recognized entity keys, in the order they are listed to the model.
pub static ENTITY_KEYS: [&str; 8] = [
    "date",
    "time",
    "party_size",
    "booking_reference",
    "special_requests",
    "customer_name",
    "customer_email",
    "customer_phone",
];

/// Entities extracted from one utterance.
///
/// One optional field per recognized key. Values are raw strings as the
/// model produced them; dates, times and party sizes are normalized later
/// by the booking layer.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entities {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub party_size: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub booking_reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub special_requests: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_phone: Option<String>,
}

impl Entities {
    /// Set a field by its key name.
    ///
    /// Returns `false` (and changes nothing) for unrecognized keys.
    /// Blank values clear the field.
    pub fn set(&mut self, key: &str, value: &str) -> bool {
        let value = value.trim();
        let value = if value.is_empty() {
            None
        } else {
            Some(value.to_string())
        };
        match self.slot_mut(key) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    /// Get a field by its key name.
    pub fn get(&self, key: &str) -> Option<&str> {
        let slot = match key {
            "date" => &self.date,
            "time" => &self.time,
            "party_size" => &self.party_size,
            "booking_reference" => &self.booking_reference,
            "special_requests" => &self.special_requests,
            "customer_name" => &self.customer_name,
            "customer_email" => &self.customer_email,
            "customer_phone" => &self.customer_phone,
            _ => return None,
        };
        slot.as_deref()
    }

    /// Copy every present field of `other` over this record.
    pub fn merge(&mut self, other: &Entities) {
        for (key, value) in other.iter() {
            self.set(key, value);
        }
    }

    /// Present fields as `(key, value)` pairs in [`ENTITY_KEYS`] order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> + '_ {
        ENTITY_KEYS
            .iter()
            .filter_map(move |key| self.get(key).map(|value| (*key, value)))
    }

    /// True when no field is present.
    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }

    fn slot_mut(&mut self, key: &str) -> Option<&mut Option<String>> {
        match key {
            "date" => Some(&mut self.date),
            "time" => Some(&mut self.time),
            "party_size" => Some(&mut self.party_size),
            "booking_reference" => Some(&mut self.booking_reference),
            "special_requests" => Some(&mut self.special_requests),
            "customer_name" => Some(&mut self.customer_name),
            "customer_email" => Some(&mut self.customer_email),
            "customer_phone" => Some(&mut self.customer_phone),
            _ => None,
        }
    }
}

impl fmt::Display for Entities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .iter()
            .map(|(key, value)| format!("{}: {}", key, value))
            .collect();
        write!(f, "{{{}}}", parts.join(", "))
    }
}

// =============================================================================
// Messages
// =============================================================================

/// Author of a conversation message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One role-tagged message in a conversation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnMessage {
    pub role: Role,
    pub content: String,
}

impl TurnMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }
}
