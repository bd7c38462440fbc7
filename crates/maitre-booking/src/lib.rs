//! Reservation layer for maitre.
//!
//! Wraps the external booking API behind the [`ReservationApi`] trait,
//! normalizes free-text dates and times, and exposes the five booking
//! operations as a facade that always answers with an [`OperationEnvelope`].

pub mod error;
pub mod format;
pub mod gateway;
pub mod models;
pub mod normalize;
pub mod service;

pub use error::{BookingError, GatewayError};
pub use gateway::{HttpReservationClient, MockReservationApi, ReservationApi};
pub use models::{
    AvailabilityResponse, BookingChanges, BookingDetails, CancelResponse, CancellationReason,
    Customer, CustomerInfo, NewBooking, OperationDetails, OperationEnvelope, TimeSlot,
    UpdateResponse,
};
pub use format::{format_availability_slots, format_booking_details, format_updates};
pub use normalize::{normalize_date, normalize_date_on, normalize_time, parse_party_size};
pub use service::BookingService;
