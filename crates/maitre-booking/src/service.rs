//! Booking facade: the five operations the chat layer invokes.
//!
//! Inputs are the raw strings the guest gave. Dates and times are
//! normalized here, and every outcome, success or failure, comes back as an
//! [`OperationEnvelope`]. Nothing in this module returns `Err`.

use std::sync::Arc;

use chrono::{Local, NaiveDate};
use tracing::{debug, warn};

use crate::error::{BookingError, GatewayError};
use crate::format::{format_availability_slots, format_booking_details};
use crate::gateway::ReservationApi;
use crate::models::{
    BookingChanges, CancellationReason, CustomerInfo, NewBooking, OperationDetails,
    OperationEnvelope,
};
use crate::normalize::{normalize_date_on, normalize_time};

/// Facade over a [`ReservationApi`].
#[derive(Clone)]
pub struct BookingService {
    api: Arc<dyn ReservationApi>,
    reference_date: Option<NaiveDate>,
}

impl BookingService {
    pub fn new(api: Arc<dyn ReservationApi>) -> Self {
        Self {
            api,
            reference_date: None,
        }
    }

    /// Resolve relative dates against a fixed day instead of the local clock.
    pub fn with_reference_date(mut self, today: NaiveDate) -> Self {
        self.reference_date = Some(today);
        self
    }

    fn today(&self) -> NaiveDate {
        self.reference_date
            .unwrap_or_else(|| Local::now().date_naive())
    }

    fn date(&self, text: &str) -> String {
        normalize_date_on(text, self.today())
    }

    /// Search open slots for a date phrase and party size.
    pub async fn check_availability(&self, date_text: &str, party_size: u32) -> OperationEnvelope {
        let date = self.date(date_text);
        debug!(input = %date_text, date = %date, party_size, "Checking availability");

        match self.api.search_availability(&date, party_size).await {
            Ok(resp) => OperationEnvelope::succeeded(
                format!("Found {} available slots", resp.open_slot_count()),
                OperationDetails::Availability {
                    date,
                    party_size,
                    formatted_slots: format_availability_slots(&resp.available_slots),
                    raw_slots: resp.available_slots,
                },
            ),
            Err(e) => failure("Failed to check availability", e),
        }
    }

    /// Create a booking from date and time phrases plus guest details.
    pub async fn create_booking(
        &self,
        date_text: &str,
        time_text: &str,
        party_size: u32,
        customer: CustomerInfo,
        special_requests: Option<&str>,
    ) -> OperationEnvelope {
        let booking = NewBooking {
            visit_date: self.date(date_text),
            visit_time: normalize_time(time_text),
            party_size,
            special_requests: special_requests
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            customer,
        };
        debug!(
            date = %booking.visit_date,
            time = %booking.visit_time,
            party_size,
            "Creating booking"
        );

        match self.api.create_booking(&booking).await {
            Ok(details) => {
                let reference = details.booking_reference.clone();
                OperationEnvelope::succeeded(
                    format!(
                        "Booking confirmed with reference: {}",
                        reference.as_deref().unwrap_or("unknown")
                    ),
                    OperationDetails::Created {
                        booking_reference: reference,
                        booking_details: details,
                    },
                )
            }
            Err(e) => failure("Failed to create booking", e),
        }
    }

    /// Look up a booking by reference.
    pub async fn get_booking(&self, reference: &str) -> OperationEnvelope {
        match self.api.get_booking(reference).await {
            Ok(Some(details)) => {
                let formatted_details = format_booking_details(&details);
                OperationEnvelope::succeeded(
                    "Booking found",
                    OperationDetails::Found {
                        booking_details: details,
                        formatted_details,
                    },
                )
            }
            Ok(None) => OperationEnvelope::failed(
                format!("No booking found with reference: {}", reference),
                None,
            ),
            Err(e) => failure("Failed to retrieve booking", e),
        }
    }

    /// Change date, time, party size or special requests on a booking.
    ///
    /// Only supplied fields are sent. With none supplied the envelope is a
    /// success carrying an empty update set.
    pub async fn update_booking(
        &self,
        reference: &str,
        date_text: Option<&str>,
        time_text: Option<&str>,
        party_size: Option<u32>,
        special_requests: Option<&str>,
    ) -> OperationEnvelope {
        let changes = BookingChanges {
            visit_date: date_text.map(|d| self.date(d)),
            visit_time: time_text.map(normalize_time),
            party_size,
            special_requests: special_requests.map(str::to_string),
        };

        match self.api.update_booking(reference, &changes).await {
            Ok(resp) => {
                let message = if resp.updates.is_empty() {
                    "No updates provided".to_string()
                } else {
                    format!("Booking {} has been updated", reference)
                };
                OperationEnvelope::succeeded(
                    message,
                    OperationDetails::Updated {
                        booking_reference: reference.to_string(),
                        updates: resp.updates,
                    },
                )
            }
            Err(e) => failure("Failed to update booking", e),
        }
    }

    /// Cancel a booking. The free-text reason maps to a reason code,
    /// defaulting to a customer request.
    pub async fn cancel_booking(&self, reference: &str, reason_text: &str) -> OperationEnvelope {
        let reason = CancellationReason::from_text(reason_text);
        match self.api.cancel_booking(reference, reason).await {
            Ok(_) => OperationEnvelope::succeeded(
                format!("Booking {} has been cancelled", reference),
                OperationDetails::Cancelled {
                    booking_reference: reference.to_string(),
                },
            ),
            Err(e) => failure("Failed to cancel booking", e),
        }
    }

    /// Report an input problem caught before the API is called.
    pub fn rejected(&self, err: BookingError) -> OperationEnvelope {
        warn!(error = %err, "Booking operation rejected");
        OperationEnvelope::failed(err.to_string(), Some(err.to_string()))
    }
}

fn failure(message: &str, err: GatewayError) -> OperationEnvelope {
    warn!(error = %err, "{}", message);
    OperationEnvelope::failed(message, Some(err.to_string()))
}
