//! Runs one conversation turn.
//!
//! A turn appends the user message, extracts intent and entities, routes,
//! runs at most one booking operation or open-conversation reply, and
//! finishes with exactly one new assistant message. Step failures are
//! recorded on the state and become an apology in the final phase; a
//! failure of the turn sequencing itself discards the turn's changes and
//! appends the fallback apology to the pre-turn state.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tracing::{error, info, warn};

use maitre_booking::{
    format_updates, parse_party_size, BookingError, BookingService, CustomerInfo,
    OperationDetails, OperationEnvelope,
};
use maitre_core::types::{Entities, TurnMessage};

use crate::error::ChatError;
use crate::extractor::IntentExtractor;
use crate::llm::LanguageModel;
use crate::prompts;
use crate::router::{route_turn, NextStep};
use crate::state::ConversationState;
use crate::turn::{TurnCursor, TurnPhase};

const DEFAULT_CANCEL_REASON: &str = "customer request";

pub struct TurnExecutor {
    extractor: Arc<dyn IntentExtractor>,
    llm: Arc<dyn LanguageModel>,
    booking: BookingService,
    restaurant: String,
    system_prompt: String,
}

impl TurnExecutor {
    pub fn new(
        extractor: Arc<dyn IntentExtractor>,
        llm: Arc<dyn LanguageModel>,
        booking: BookingService,
        restaurant: impl Into<String>,
    ) -> Self {
        let restaurant = restaurant.into();
        Self {
            extractor,
            llm,
            booking,
            system_prompt: prompts::system_prompt(&restaurant),
            restaurant,
        }
    }

    /// Process one user message against `state` (a fresh state when `None`)
    /// and return the updated state.
    pub async fn process_message(
        &self,
        message: &str,
        session_id: &str,
        state: Option<ConversationState>,
    ) -> ConversationState {
        let mut state = state.unwrap_or_else(|| ConversationState::new(session_id));
        let snapshot = state.clone();

        let outcome = AssertUnwindSafe(self.run_turn(&mut state, message))
            .catch_unwind()
            .await;
        match outcome {
            Ok(Ok(())) => state,
            Ok(Err(e)) => {
                error!(session_id, error = %e, "Turn failed");
                fallback_state(snapshot, message)
            }
            Err(_) => {
                error!(session_id, "Turn panicked");
                fallback_state(snapshot, message)
            }
        }
    }

    async fn run_turn(&self, state: &mut ConversationState, message: &str) -> Result<(), ChatError> {
        let mut cursor = TurnCursor::new();
        state.messages.push(TurnMessage::user(message));

        cursor.advance(TurnPhase::ExtractIntent)?;
        self.extract_intent(state, message).await;

        cursor.advance(TurnPhase::Route)?;
        let step = route_turn(state);

        match step {
            NextStep::Respond => {}
            NextStep::Conversation => {
                cursor.advance(TurnPhase::OpenConversation)?;
                self.open_conversation(state).await;
            }
            operation => {
                cursor.advance(TurnPhase::Operation)?;
                let result = self.run_operation(state, operation).await;
                if let Err(e) = result {
                    warn!(session_id = %state.session_id, error = %e, "Booking step failed");
                    state.error = Some(e.to_string());
                }
            }
        }

        cursor.advance(TurnPhase::Finalize)?;
        self.finalize(state).await;
        Ok(())
    }

    // =========================================================================
    // Nodes
    // =========================================================================

    async fn extract_intent(&self, state: &mut ConversationState, message: &str) {
        match self.extractor.extract(message).await {
            Ok(extraction) => {
                state.intent = extraction.intent;
                state.entities = extraction.entities;
            }
            Err(e) => {
                error!(session_id = %state.session_id, error = %e, "Error processing input");
                state.intent = None;
                state.entities = Entities::default();
                state.error = Some(e.to_string());
            }
        }
    }

    async fn run_operation(
        &self,
        state: &mut ConversationState,
        step: NextStep,
    ) -> Result<(), ChatError> {
        match step {
            NextStep::CheckAvailability => self.check_availability(state).await,
            NextStep::CreateBooking => self.create_booking(state).await,
            NextStep::GetBooking => self.get_booking(state).await,
            NextStep::UpdateBooking => self.update_booking(state).await,
            NextStep::CancelBooking => self.cancel_booking(state).await,
            NextStep::Respond | NextStep::Conversation => Ok(()),
        }
    }

    async fn check_availability(&self, state: &mut ConversationState) -> Result<(), ChatError> {
        let (date, party_size) = match availability_inputs(&state.entities) {
            Ok(inputs) => inputs,
            Err(e) => return self.reject(state, e),
        };

        let result = self.booking.check_availability(&date, party_size).await;
        let reply = match &result.details {
            Some(OperationDetails::Availability {
                date,
                party_size,
                formatted_slots,
                raw_slots,
            }) => Some(if raw_slots.iter().any(|s| s.available) {
                prompts::availability_results(date, *party_size, formatted_slots)
            } else {
                prompts::no_availability(date, *party_size)
            }),
            _ => None,
        };
        self.settle(state, result, reply)
    }

    async fn create_booking(&self, state: &mut ConversationState) -> Result<(), ChatError> {
        let entities = state.entities.clone();
        let (date, time, party_size) = match create_inputs(&entities) {
            Ok(inputs) => inputs,
            Err(e) => return self.reject(state, e),
        };
        let customer = CustomerInfo::from_parts(
            entities.customer_name.as_deref(),
            entities.customer_email.as_deref(),
            entities.customer_phone.as_deref(),
        );

        let result = self
            .booking
            .create_booking(
                &date,
                &time,
                party_size,
                customer,
                entities.special_requests.as_deref(),
            )
            .await;

        let reply = match &result.details {
            Some(OperationDetails::Created {
                booking_details, ..
            }) => {
                let reference = result.booking_reference();
                if let Some(reference) = reference {
                    info!(session_id = %state.session_id, reference = %reference, "Booking created");
                    state.current_booking_reference = Some(reference.to_string());
                }
                state.pending_booking = Entities::default();
                Some(prompts::booking_created(
                    &self.restaurant,
                    reference.unwrap_or("unknown"),
                    booking_details,
                ))
            }
            _ => None,
        };
        self.settle(state, result, reply)
    }

    async fn get_booking(&self, state: &mut ConversationState) -> Result<(), ChatError> {
        let reference = match booking_reference(state) {
            Ok(reference) => reference,
            Err(e) => return self.reject(state, e),
        };
        let result = self.booking.get_booking(&reference).await;

        // A miss carries no error: tell the guest instead of apologizing.
        if !result.success && result.error.is_none() {
            state.push_reply(prompts::booking_not_found(&reference));
            state.last_operation = Some(result);
            return Ok(());
        }

        let reply = match &result.details {
            Some(OperationDetails::Found {
                formatted_details, ..
            }) => Some(prompts::booking_details(formatted_details)),
            _ => None,
        };
        self.settle(state, result, reply)
    }

    async fn update_booking(&self, state: &mut ConversationState) -> Result<(), ChatError> {
        let entities = state.entities.clone();
        let inputs = booking_reference(state).and_then(|reference| {
            let party_size = entities.party_size.as_deref().map(parse_size).transpose()?;
            Ok((reference, party_size))
        });
        let (reference, party_size) = match inputs {
            Ok(inputs) => inputs,
            Err(e) => return self.reject(state, e),
        };

        let result = self
            .booking
            .update_booking(
                &reference,
                entities.date.as_deref(),
                entities.time.as_deref(),
                party_size,
                entities.special_requests.as_deref(),
            )
            .await;

        let reply = match &result.details {
            Some(OperationDetails::Updated { updates, .. }) if updates.is_empty() => {
                Some(prompts::update_needs_changes(&reference))
            }
            Some(OperationDetails::Updated { updates, .. }) => {
                Some(prompts::booking_updated(&reference, &format_updates(updates)))
            }
            _ => None,
        };
        self.settle(state, result, reply)
    }

    async fn cancel_booking(&self, state: &mut ConversationState) -> Result<(), ChatError> {
        let reference = match booking_reference(state) {
            Ok(reference) => reference,
            Err(e) => return self.reject(state, e),
        };
        let result = self
            .booking
            .cancel_booking(&reference, DEFAULT_CANCEL_REASON)
            .await;

        let reply = if result.success {
            info!(session_id = %state.session_id, reference = %reference, "Booking cancelled");
            state.current_booking_reference = None;
            Some(prompts::booking_cancelled(&reference))
        } else {
            None
        };
        self.settle(state, result, reply)
    }

    async fn open_conversation(&self, state: &mut ConversationState) {
        let mut messages = Vec::with_capacity(state.messages.len() + 2);
        messages.push(TurnMessage::system(self.system_prompt.as_str()));
        messages.extend(state.messages.iter().cloned());
        if !state.pending_booking.is_empty() {
            messages.push(TurnMessage::system(prompts::pending_booking_context(
                &state.pending_booking,
            )));
        }

        match self.llm.complete(&messages).await {
            Ok(reply) => state.push_reply(reply),
            Err(e) => {
                error!(session_id = %state.session_id, error = %e, "Error in conversation");
                state.error = Some(e.to_string());
            }
        }
    }

    /// Final phase: turn a recorded error into an apology, or generate a
    /// reply when no step produced one.
    async fn finalize(&self, state: &mut ConversationState) {
        if let Some(err) = state.error.take() {
            warn!(session_id = %state.session_id, error = %err, "Turn completed with error");
            state.push_reply(prompts::TURN_APOLOGY);
            return;
        }
        if state.ends_with_reply() {
            return;
        }

        let mut messages = Vec::with_capacity(state.messages.len() + 1);
        messages.push(TurnMessage::system(self.system_prompt.as_str()));
        messages.extend(state.messages.iter().cloned());
        match self.llm.complete(&messages).await {
            Ok(reply) => state.push_reply(reply),
            Err(e) => {
                error!(session_id = %state.session_id, error = %e, "Error generating reply");
                state.push_reply(prompts::FALLBACK_APOLOGY);
            }
        }
    }

    /// Record an operation result: append the reply on success, or record
    /// the failure for the final phase.
    fn settle(
        &self,
        state: &mut ConversationState,
        result: OperationEnvelope,
        reply: Option<String>,
    ) -> Result<(), ChatError> {
        let outcome = match (result.success, reply) {
            (true, Some(text)) => {
                state.push_reply(text);
                Ok(())
            }
            (true, None) => Ok(()),
            (false, _) => Err(ChatError::Booking(
                result
                    .error
                    .clone()
                    .unwrap_or_else(|| result.message.clone()),
            )),
        };
        state.last_operation = Some(result);
        outcome
    }

    /// Record input that failed validation before any API call.
    fn reject(&self, state: &mut ConversationState, err: BookingError) -> Result<(), ChatError> {
        let result = self.booking.rejected(err);
        self.settle(state, result, None)
    }
}

/// The pre-turn state plus the user message and the fallback apology.
fn fallback_state(mut snapshot: ConversationState, message: &str) -> ConversationState {
    snapshot.messages.push(TurnMessage::user(message));
    snapshot.push_reply(prompts::FALLBACK_APOLOGY);
    snapshot
}

fn required(value: Option<&str>, field: &'static str) -> Result<String, BookingError> {
    value
        .map(str::to_string)
        .ok_or(BookingError::MissingField(field))
}

fn availability_inputs(entities: &Entities) -> Result<(String, u32), BookingError> {
    Ok((
        required(entities.date.as_deref(), "date")?,
        party_size(entities.party_size.as_deref())?,
    ))
}

fn create_inputs(entities: &Entities) -> Result<(String, String, u32), BookingError> {
    Ok((
        required(entities.date.as_deref(), "date")?,
        required(entities.time.as_deref(), "time")?,
        party_size(entities.party_size.as_deref())?,
    ))
}

fn party_size(value: Option<&str>) -> Result<u32, BookingError> {
    parse_size(value.ok_or(BookingError::MissingField("party_size"))?)
}

fn parse_size(text: &str) -> Result<u32, BookingError> {
    parse_party_size(text).ok_or_else(|| BookingError::InvalidPartySize(text.to_string()))
}

/// The turn's reference, else the session's current one.
fn booking_reference(state: &ConversationState) -> Result<String, BookingError> {
    state
        .entities
        .booking_reference
        .clone()
        .or_else(|| state.current_booking_reference.clone())
        .ok_or(BookingError::MissingReference)
}
