//! Gateway to the external reservation API.
//!
//! [`ReservationApi`] is the seam the rest of the system depends on.
//! [`HttpReservationClient`] talks to the real service with form-encoded
//! requests and bearer authentication; [`MockReservationApi`] keeps
//! bookings in memory for tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{error, info, warn};

use maitre_core::config::BookingApiConfig;

use crate::error::GatewayError;
use crate::models::{
    AvailabilityResponse, BookingChanges, BookingDetails, CancelResponse, CancellationReason,
    Customer, NewBooking, TimeSlot, UpdateResponse,
};

const NO_UPDATES: &str = "No updates provided";

/// Operations offered by the reservation service.
#[async_trait]
pub trait ReservationApi: Send + Sync {
    /// Search open slots for a `YYYY-MM-DD` date and party size.
    async fn search_availability(
        &self,
        visit_date: &str,
        party_size: u32,
    ) -> Result<AvailabilityResponse, GatewayError>;

    /// Create a booking.
    async fn create_booking(&self, booking: &NewBooking) -> Result<BookingDetails, GatewayError>;

    /// Fetch a booking. A 404 is `Ok(None)`, not an error.
    async fn get_booking(&self, reference: &str) -> Result<Option<BookingDetails>, GatewayError>;

    /// Apply changes to a booking. Empty changes return a "No updates
    /// provided" response without contacting the service.
    async fn update_booking(
        &self,
        reference: &str,
        changes: &BookingChanges,
    ) -> Result<UpdateResponse, GatewayError>;

    /// Cancel a booking.
    async fn cancel_booking(
        &self,
        reference: &str,
        reason: CancellationReason,
    ) -> Result<CancelResponse, GatewayError>;
}

// =============================================================================
// HTTP client
// =============================================================================

/// Reservation API client over HTTP.
#[derive(Clone)]
pub struct HttpReservationClient {
    client: Client,
    config: BookingApiConfig,
}

impl HttpReservationClient {
    pub fn new(config: BookingApiConfig) -> Result<Self, GatewayError> {
        let mut builder = Client::builder();
        if config.timeout_secs > 0 {
            builder = builder.timeout(Duration::from_secs(config.timeout_secs));
        }
        let client = builder.build()?;
        Ok(Self { client, config })
    }

    /// `{base_url}{api_prefix}/Restaurant/{name}`.
    fn restaurant_url(&self) -> String {
        format!(
            "{}{}/Restaurant/{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.api_prefix,
            self.config.restaurant_name
        )
    }

    fn booking_url(&self, reference: &str) -> String {
        format!("{}/Booking/{}", self.restaurant_url(), reference)
    }

    /// Send a form-encoded request with bearer auth and decode the JSON reply.
    async fn send_form<T, F>(&self, method: Method, url: &str, form: &F) -> Result<T, GatewayError>
    where
        T: DeserializeOwned,
        F: Serialize + ?Sized,
    {
        let response = self
            .client
            .request(method, url)
            .bearer_auth(&self.config.bearer_token)
            .form(form)
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, GatewayError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Status {
                status: status.as_u16(),
                body,
            });
        }
        response
            .json::<T>()
            .await
            .map_err(|e| GatewayError::Decode(e.to_string()))
    }
}

#[async_trait]
impl ReservationApi for HttpReservationClient {
    async fn search_availability(
        &self,
        visit_date: &str,
        party_size: u32,
    ) -> Result<AvailabilityResponse, GatewayError> {
        let url = format!("{}/AvailabilitySearch", self.restaurant_url());
        let party = party_size.to_string();
        let form = [
            ("VisitDate", visit_date),
            ("PartySize", party.as_str()),
            ("ChannelCode", self.config.channel_code.as_str()),
        ];

        let result: Result<AvailabilityResponse, GatewayError> =
            self.send_form(Method::POST, &url, &form).await;

        match &result {
            Ok(resp) => info!(
                date = %visit_date,
                party_size,
                slots = resp.available_slots.len(),
                "Availability search succeeded"
            ),
            Err(e) => error!(date = %visit_date, party_size, error = %e, "Availability search failed"),
        }
        result
    }

    async fn create_booking(&self, booking: &NewBooking) -> Result<BookingDetails, GatewayError> {
        let url = format!("{}/BookingWithStripeToken", self.restaurant_url());

        let mut form: Vec<(String, String)> = vec![
            ("VisitDate".into(), booking.visit_date.clone()),
            ("VisitTime".into(), booking.visit_time.clone()),
            ("PartySize".into(), booking.party_size.to_string()),
            ("ChannelCode".into(), self.config.channel_code.clone()),
        ];
        if let Some(ref requests) = booking.special_requests {
            form.push(("SpecialRequests".into(), requests.clone()));
        }
        for (field, value) in booking.customer.fields() {
            form.push((format!("Customer[{}]", field), value.to_string()));
        }

        let result: Result<BookingDetails, GatewayError> =
            self.send_form(Method::POST, &url, &form).await;

        match &result {
            Ok(details) => info!(
                reference = details.booking_reference.as_deref().unwrap_or("unknown"),
                date = %booking.visit_date,
                time = %booking.visit_time,
                "Booking created"
            ),
            Err(e) => error!(date = %booking.visit_date, error = %e, "Booking creation failed"),
        }
        result
    }

    async fn get_booking(&self, reference: &str) -> Result<Option<BookingDetails>, GatewayError> {
        let url = self.booking_url(reference);

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.config.bearer_token)
            .send()
            .await
            .map_err(|e| {
                error!(reference, error = %e, "Booking lookup failed");
                GatewayError::from(e)
            })?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            warn!(reference, "Booking not found");
            return Ok(None);
        }

        match Self::decode::<BookingDetails>(response).await {
            Ok(details) => {
                info!(reference, "Booking retrieved");
                Ok(Some(details))
            }
            Err(e) => {
                error!(reference, error = %e, "Booking lookup failed");
                Err(e)
            }
        }
    }

    async fn update_booking(
        &self,
        reference: &str,
        changes: &BookingChanges,
    ) -> Result<UpdateResponse, GatewayError> {
        if changes.is_empty() {
            warn!(reference, "Update requested with no changes");
            return Ok(UpdateResponse {
                updates: Map::new(),
                message: Some(NO_UPDATES.to_string()),
            });
        }

        let url = self.booking_url(reference);
        let form = changes.form_fields();

        let result: Result<UpdateResponse, GatewayError> =
            self.send_form(Method::PATCH, &url, &form).await;

        match &result {
            Ok(resp) => info!(reference, fields = resp.updates.len(), "Booking updated"),
            Err(e) => error!(reference, error = %e, "Booking update failed"),
        }
        result
    }

    async fn cancel_booking(
        &self,
        reference: &str,
        reason: CancellationReason,
    ) -> Result<CancelResponse, GatewayError> {
        let url = format!("{}/Cancel", self.booking_url(reference));
        let reason_id = reason.id().to_string();
        let form = [
            ("micrositeName", self.config.restaurant_name.as_str()),
            ("bookingReference", reference),
            ("cancellationReasonId", reason_id.as_str()),
        ];

        let result: Result<CancelResponse, GatewayError> =
            self.send_form(Method::POST, &url, &form).await;

        match &result {
            Ok(_) => info!(reference, reason_id = reason.id(), "Booking cancelled"),
            Err(e) => error!(reference, error = %e, "Booking cancellation failed"),
        }
        result
    }
}

// =============================================================================
// Mock implementation
// =============================================================================

/// In-memory reservation service for tests.
///
/// Bookings created through it can be read back, updated and cancelled.
/// Every call is recorded by name. [`MockReservationApi::fail_with`] makes
/// all subsequent calls return a status error.
#[derive(Debug, Default)]
pub struct MockReservationApi {
    slots: Mutex<Vec<TimeSlot>>,
    bookings: Mutex<HashMap<String, BookingDetails>>,
    failure: Mutex<Option<u16>>,
    calls: Mutex<Vec<String>>,
}

impl MockReservationApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Slots returned by every availability search.
    pub fn with_slots(self, slots: Vec<TimeSlot>) -> Self {
        *lock(&self.slots) = slots;
        self
    }

    /// Seed a booking under its reference.
    pub fn with_booking(self, details: BookingDetails) -> Self {
        let reference = details.booking_reference.clone().unwrap_or_default();
        lock(&self.bookings).insert(reference, details);
        self
    }

    /// Make every subsequent call fail with the given HTTP status.
    pub fn fail_with(&self, status: u16) {
        *lock(&self.failure) = Some(status);
    }

    /// Names of the operations called so far, in order.
    pub fn calls(&self) -> Vec<String> {
        lock(&self.calls).clone()
    }

    pub fn booking(&self, reference: &str) -> Option<BookingDetails> {
        lock(&self.bookings).get(reference).cloned()
    }

    fn record(&self, call: &str) -> Result<(), GatewayError> {
        lock(&self.calls).push(call.to_string());
        match *lock(&self.failure) {
            Some(status) => Err(GatewayError::Status {
                status,
                body: "mock failure".to_string(),
            }),
            None => Ok(()),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn not_found(reference: &str) -> GatewayError {
    GatewayError::Status {
        status: 404,
        body: format!("Booking {} not found", reference),
    }
}

#[async_trait]
impl ReservationApi for MockReservationApi {
    async fn search_availability(
        &self,
        _visit_date: &str,
        _party_size: u32,
    ) -> Result<AvailabilityResponse, GatewayError> {
        self.record("search_availability")?;
        Ok(AvailabilityResponse {
            available_slots: lock(&self.slots).clone(),
        })
    }

    async fn create_booking(&self, booking: &NewBooking) -> Result<BookingDetails, GatewayError> {
        self.record("create_booking")?;
        let mut bookings = lock(&self.bookings);
        let reference = format!("MOCK{:04}", bookings.len() + 1);
        let customer = &booking.customer;
        let details = BookingDetails {
            booking_reference: Some(reference.clone()),
            visit_date: Some(booking.visit_date.clone()),
            visit_time: Some(booking.visit_time.clone()),
            party_size: Some(booking.party_size),
            special_requests: booking.special_requests.clone(),
            customer: (!customer.is_empty()).then(|| Customer {
                first_name: customer.first_name.clone(),
                surname: customer.surname.clone(),
                email: customer.email.clone(),
                mobile: customer.mobile.clone(),
            }),
        };
        bookings.insert(reference, details.clone());
        Ok(details)
    }

    async fn get_booking(&self, reference: &str) -> Result<Option<BookingDetails>, GatewayError> {
        self.record("get_booking")?;
        Ok(self.booking(reference))
    }

    async fn update_booking(
        &self,
        reference: &str,
        changes: &BookingChanges,
    ) -> Result<UpdateResponse, GatewayError> {
        if changes.is_empty() {
            return Ok(UpdateResponse {
                updates: Map::new(),
                message: Some(NO_UPDATES.to_string()),
            });
        }
        self.record("update_booking")?;

        let mut bookings = lock(&self.bookings);
        let details = bookings.get_mut(reference).ok_or_else(|| not_found(reference))?;
        let mut updates = Map::new();
        if let Some(ref date) = changes.visit_date {
            details.visit_date = Some(date.clone());
            updates.insert("visit_date".into(), Value::from(date.as_str()));
        }
        if let Some(ref time) = changes.visit_time {
            details.visit_time = Some(time.clone());
            updates.insert("visit_time".into(), Value::from(time.as_str()));
        }
        if let Some(size) = changes.party_size {
            details.party_size = Some(size);
            updates.insert("party_size".into(), Value::from(size));
        }
        if let Some(ref requests) = changes.special_requests {
            details.special_requests = Some(requests.clone());
            updates.insert("special_requests".into(), Value::from(requests.as_str()));
        }
        Ok(UpdateResponse {
            updates,
            message: Some(format!("Booking {} updated", reference)),
        })
    }

    async fn cancel_booking(
        &self,
        reference: &str,
        _reason: CancellationReason,
    ) -> Result<CancelResponse, GatewayError> {
        self.record("cancel_booking")?;
        lock(&self.bookings)
            .remove(reference)
            .ok_or_else(|| not_found(reference))?;
        Ok(CancelResponse {
            message: Some(format!("Booking {} cancelled", reference)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CustomerInfo;

    fn config() -> BookingApiConfig {
        BookingApiConfig {
            base_url: "http://localhost:8547/".to_string(),
            ..BookingApiConfig::default()
        }
    }

    fn new_booking() -> NewBooking {
        NewBooking {
            visit_date: "2024-03-15".into(),
            visit_time: "19:00:00".into(),
            party_size: 4,
            special_requests: None,
            customer: CustomerInfo::from_parts(Some("Ada Lovelace"), None, None),
        }
    }

    // ---- URLs ----

    #[test]
    fn test_restaurant_url() {
        let client = HttpReservationClient::new(config()).unwrap();
        assert_eq!(
            client.restaurant_url(),
            "http://localhost:8547/api/ConsumerApi/v1/Restaurant/TheHungryUnicorn"
        );
        assert_eq!(
            client.booking_url("ABC1234"),
            "http://localhost:8547/api/ConsumerApi/v1/Restaurant/TheHungryUnicorn/Booking/ABC1234"
        );
    }

    #[tokio::test]
    async fn test_http_empty_update_short_circuits() {
        // Unroutable base URL: any network attempt would fail.
        let client = HttpReservationClient::new(BookingApiConfig {
            base_url: "http://127.0.0.1:1".to_string(),
            ..BookingApiConfig::default()
        })
        .unwrap();
        let resp = client
            .update_booking("ABC1234", &BookingChanges::default())
            .await
            .unwrap();
        assert!(resp.updates.is_empty());
        assert_eq!(resp.message.as_deref(), Some("No updates provided"));
    }

    // ---- Mock ----

    #[tokio::test]
    async fn test_mock_create_then_get() {
        let api = MockReservationApi::new();
        let created = api.create_booking(&new_booking()).await.unwrap();
        let reference = created.booking_reference.clone().unwrap();
        assert_eq!(reference, "MOCK0001");

        let fetched = api.get_booking(&reference).await.unwrap().unwrap();
        assert_eq!(fetched.party_size, Some(4));
        assert_eq!(
            fetched.customer.unwrap().full_name().as_deref(),
            Some("Ada Lovelace")
        );
        assert_eq!(api.calls(), vec!["create_booking", "get_booking"]);
    }

    #[tokio::test]
    async fn test_mock_get_missing_is_none() {
        let api = MockReservationApi::new();
        assert!(api.get_booking("NOPE").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_mock_update_and_cancel() {
        let api = MockReservationApi::new();
        let reference = api
            .create_booking(&new_booking())
            .await
            .unwrap()
            .booking_reference
            .unwrap();

        let changes = BookingChanges {
            party_size: Some(6),
            ..BookingChanges::default()
        };
        let resp = api.update_booking(&reference, &changes).await.unwrap();
        assert_eq!(resp.updates.get("party_size"), Some(&Value::from(6)));
        assert_eq!(api.booking(&reference).unwrap().party_size, Some(6));

        api.cancel_booking(&reference, CancellationReason::default())
            .await
            .unwrap();
        assert!(api.booking(&reference).is_none());

        let err = api
            .cancel_booking(&reference, CancellationReason::default())
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(404));
    }

    #[tokio::test]
    async fn test_mock_failure_mode() {
        let api = MockReservationApi::new();
        api.fail_with(503);
        let err = api.search_availability("2024-03-15", 2).await.unwrap_err();
        assert_eq!(err.status(), Some(503));
        assert_eq!(api.calls(), vec!["search_availability"]);
    }
}
