//! Request and response shapes for the reservation API, plus the uniform
//! operation envelope returned by the booking facade.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// =============================================================================
// API responses
// =============================================================================

/// One slot returned by an availability search.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimeSlot {
    /// Slot start as `HH:MM:SS`.
    #[serde(default)]
    pub time: String,
    #[serde(default)]
    pub available: bool,
}

/// Body of a successful availability search.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AvailabilityResponse {
    #[serde(default)]
    pub available_slots: Vec<TimeSlot>,
}

impl AvailabilityResponse {
    /// Number of slots flagged as available.
    pub fn open_slot_count(&self) -> usize {
        self.available_slots.iter().filter(|s| s.available).count()
    }
}

/// Customer block nested in booking details.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub surname: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub mobile: Option<String>,
}

impl Customer {
    /// "First Surname", or `None` when both parts are missing or blank.
    pub fn full_name(&self) -> Option<String> {
        let name = format!(
            "{} {}",
            self.first_name.as_deref().unwrap_or(""),
            self.surname.as_deref().unwrap_or("")
        );
        let name = name.trim();
        if name.is_empty() {
            None
        } else {
            Some(name.to_string())
        }
    }
}

/// A booking as returned by create and read.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BookingDetails {
    #[serde(default)]
    pub booking_reference: Option<String>,
    #[serde(default)]
    pub visit_date: Option<String>,
    #[serde(default)]
    pub visit_time: Option<String>,
    #[serde(default)]
    pub party_size: Option<u32>,
    #[serde(default)]
    pub special_requests: Option<String>,
    #[serde(default)]
    pub customer: Option<Customer>,
}

/// Body of a successful update.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateResponse {
    /// Changed fields as reported by the API.
    #[serde(default)]
    pub updates: Map<String, Value>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Body of a successful cancellation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CancelResponse {
    #[serde(default)]
    pub message: Option<String>,
}

// =============================================================================
// API requests
// =============================================================================

/// Guest contact details attached to a new booking.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CustomerInfo {
    pub first_name: Option<String>,
    pub surname: Option<String>,
    pub email: Option<String>,
    pub mobile: Option<String>,
}

impl CustomerInfo {
    /// Build from the chat entities. The name is split on whitespace into
    /// first name and surname.
    pub fn from_parts(name: Option<&str>, email: Option<&str>, phone: Option<&str>) -> Self {
        let (first_name, surname) = match name {
            Some(name) => {
                let mut parts = name.split_whitespace();
                let first = parts.next().map(str::to_string);
                let rest: Vec<&str> = parts.collect();
                let surname = if rest.is_empty() {
                    None
                } else {
                    Some(rest.join(" "))
                };
                (first, surname)
            }
            None => (None, None),
        };
        Self {
            first_name,
            surname,
            email: email.map(str::to_string),
            mobile: phone.map(str::to_string),
        }
    }

    /// Non-empty fields as `(API field name, value)` pairs.
    pub fn fields(&self) -> Vec<(&'static str, &str)> {
        [
            ("FirstName", &self.first_name),
            ("Surname", &self.surname),
            ("Email", &self.email),
            ("Mobile", &self.mobile),
        ]
        .into_iter()
        .filter_map(|(key, value)| match value.as_deref() {
            Some(v) if !v.is_empty() => Some((key, v)),
            _ => None,
        })
        .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.fields().is_empty()
    }
}

/// Parameters for creating a booking. Date and time are already normalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBooking {
    /// `YYYY-MM-DD`.
    pub visit_date: String,
    /// `HH:MM:SS`.
    pub visit_time: String,
    pub party_size: u32,
    pub special_requests: Option<String>,
    pub customer: CustomerInfo,
}

/// Fields to change on an existing booking. Only present fields are sent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookingChanges {
    pub visit_date: Option<String>,
    pub visit_time: Option<String>,
    pub party_size: Option<u32>,
    pub special_requests: Option<String>,
}

impl BookingChanges {
    pub fn is_empty(&self) -> bool {
        self.visit_date.is_none()
            && self.visit_time.is_none()
            && self.party_size.is_none()
            && self.special_requests.is_none()
    }

    /// Form fields for the PATCH body.
    pub fn form_fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = Vec::new();
        if let Some(ref date) = self.visit_date {
            fields.push(("VisitDate", date.clone()));
        }
        if let Some(ref time) = self.visit_time {
            fields.push(("VisitTime", time.clone()));
        }
        if let Some(size) = self.party_size {
            fields.push(("PartySize", size.to_string()));
        }
        if let Some(ref requests) = self.special_requests {
            fields.push(("SpecialRequests", requests.clone()));
        }
        fields
    }
}

/// Reason codes accepted by the cancel endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancellationReason {
    #[default]
    CustomerRequest,
    RestaurantClosure,
    Weather,
    Emergency,
    NoShow,
}

impl CancellationReason {
    /// Look up a free-text reason. Unrecognized text maps to
    /// `CustomerRequest`.
    pub fn from_text(text: &str) -> Self {
        match text.trim().to_lowercase().as_str() {
            "customer request" => CancellationReason::CustomerRequest,
            "restaurant closure" => CancellationReason::RestaurantClosure,
            "weather" => CancellationReason::Weather,
            "emergency" => CancellationReason::Emergency,
            "no show" => CancellationReason::NoShow,
            _ => CancellationReason::CustomerRequest,
        }
    }

    /// Numeric `cancellationReasonId` (1-5).
    pub fn id(&self) -> u8 {
        match self {
            CancellationReason::CustomerRequest => 1,
            CancellationReason::RestaurantClosure => 2,
            CancellationReason::Weather => 3,
            CancellationReason::Emergency => 4,
            CancellationReason::NoShow => 5,
        }
    }
}

// =============================================================================
// Operation envelope
// =============================================================================

/// Operation-specific payload carried by a successful envelope.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "operation", rename_all = "snake_case")]
pub enum OperationDetails {
    Availability {
        date: String,
        party_size: u32,
        formatted_slots: String,
        raw_slots: Vec<TimeSlot>,
    },
    Created {
        booking_reference: Option<String>,
        booking_details: BookingDetails,
    },
    Found {
        booking_details: BookingDetails,
        formatted_details: String,
    },
    Updated {
        booking_reference: String,
        updates: Map<String, Value>,
    },
    Cancelled {
        booking_reference: String,
    },
}

/// Uniform result of every booking operation.
///
/// Built only through [`OperationEnvelope::succeeded`] and
/// [`OperationEnvelope::failed`]: a failure always has a non-empty message
/// and a success never carries an error.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OperationEnvelope {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(flatten)]
    pub details: Option<OperationDetails>,
}

const GENERIC_FAILURE: &str = "The booking operation failed";

impl OperationEnvelope {
    pub fn succeeded(message: impl Into<String>, details: OperationDetails) -> Self {
        Self {
            success: true,
            message: message.into(),
            error: None,
            details: Some(details),
        }
    }

    pub fn failed(message: impl Into<String>, error: Option<String>) -> Self {
        let message = message.into();
        let message = if message.trim().is_empty() {
            GENERIC_FAILURE.to_string()
        } else {
            message
        };
        Self {
            success: false,
            message,
            error,
            details: None,
        }
    }

    /// Reference of the booking this envelope is about, if any.
    pub fn booking_reference(&self) -> Option<&str> {
        match self.details.as_ref()? {
            OperationDetails::Created {
                booking_reference, ..
            } => booking_reference.as_deref(),
            OperationDetails::Found {
                booking_details, ..
            } => booking_details.booking_reference.as_deref(),
            OperationDetails::Updated {
                booking_reference, ..
            }
            | OperationDetails::Cancelled { booking_reference } => Some(booking_reference.as_str()),
            OperationDetails::Availability { .. } => None,
        }
    }
}
