//! Per-turn routing decision.
//!
//! A pure function of the extracted intent, the extracted entities and the
//! session's current booking reference. Whenever an operation lacks its
//! required fields the turn falls back to open conversation so the model can
//! ask for them.

use maitre_core::types::{Entities, Intent};

use crate::state::ConversationState;

/// What the turn does after routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextStep {
    /// No intent: go straight to the final reply.
    Respond,
    CheckAvailability,
    CreateBooking,
    GetBooking,
    UpdateBooking,
    CancelBooking,
    /// Open-ended model reply.
    Conversation,
}

/// Routing outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Route {
    pub step: NextStep,
    /// Merge this turn's entities into the pending booking.
    pub collect_pending: bool,
}

impl Route {
    fn to(step: NextStep) -> Self {
        Self {
            step,
            collect_pending: false,
        }
    }
}

/// Decide the next step for a turn.
pub fn route(intent: Option<Intent>, entities: &Entities, state: &ConversationState) -> Route {
    let Some(intent) = intent else {
        return Route::to(NextStep::Respond);
    };
    let has_reference =
        entities.booking_reference.is_some() || state.current_booking_reference.is_some();

    match intent {
        Intent::CheckAvailability => {
            if entities.date.is_some() && entities.party_size.is_some() {
                Route::to(NextStep::CheckAvailability)
            } else {
                Route::to(NextStep::Conversation)
            }
        }
        Intent::CreateBooking => {
            if entities.date.is_some() && entities.time.is_some() && entities.party_size.is_some()
            {
                Route::to(NextStep::CreateBooking)
            } else {
                Route {
                    step: NextStep::Conversation,
                    collect_pending: entities.date.is_some() || entities.party_size.is_some(),
                }
            }
        }
        Intent::GetBooking if has_reference => Route::to(NextStep::GetBooking),
        Intent::UpdateBooking if has_reference => Route::to(NextStep::UpdateBooking),
        Intent::CancelBooking if has_reference => Route::to(NextStep::CancelBooking),
        Intent::GetBooking | Intent::UpdateBooking | Intent::CancelBooking => {
            Route::to(NextStep::Conversation)
        }
        Intent::Conversation => Route::to(NextStep::Conversation),
    }
}

/// Route the state's latest extraction and apply the pending-booking merge.
pub fn route_turn(state: &mut ConversationState) -> NextStep {
    let decision = route(state.intent, &state.entities, state);
    if decision.collect_pending {
        let entities = state.entities.clone();
        state.pending_booking.merge(&entities);
    }
    tracing::debug!(
        session_id = %state.session_id,
        intent = state.intent.map(|i| i.as_str()).unwrap_or("none"),
        step = ?decision.step,
        "Routed turn"
    );
    decision.step
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_entities(pairs: &[(&str, &str)]) -> Entities {
        let mut entities = Entities::default();
        for (key, value) in pairs {
            assert!(entities.set(key, value));
        }
        entities
    }

    fn make_state() -> ConversationState {
        ConversationState::new("test-session")
    }

    fn step(intent: Option<Intent>, pairs: &[(&str, &str)]) -> NextStep {
        route(intent, &make_entities(pairs), &make_state()).step
    }

    // ---- No intent ----

    #[test]
    fn test_no_intent_responds() {
        assert_eq!(step(None, &[("date", "today")]), NextStep::Respond);
    }

    // ---- check_availability ----

    #[test]
    fn test_availability_needs_date_and_party_size() {
        let intent = Some(Intent::CheckAvailability);
        assert_eq!(
            step(intent, &[("date", "today"), ("party_size", "2")]),
            NextStep::CheckAvailability
        );
        assert_eq!(step(intent, &[("date", "today")]), NextStep::Conversation);
        assert_eq!(step(intent, &[("party_size", "2")]), NextStep::Conversation);
        assert_eq!(step(intent, &[("time", "7pm")]), NextStep::Conversation);
        assert_eq!(step(intent, &[]), NextStep::Conversation);
    }

    // ---- create_booking ----

    #[test]
    fn test_create_with_all_three() {
        let r = route(
            Some(Intent::CreateBooking),
            &make_entities(&[("date", "tomorrow"), ("time", "7pm"), ("party_size", "4")]),
            &make_state(),
        );
        assert_eq!(r.step, NextStep::CreateBooking);
        assert!(!r.collect_pending);
    }

    #[test]
    fn test_create_partial_collects_pending() {
        let r = route(
            Some(Intent::CreateBooking),
            &make_entities(&[("date", "tomorrow"), ("party_size", "4")]),
            &make_state(),
        );
        assert_eq!(r.step, NextStep::Conversation);
        assert!(r.collect_pending);

        let r = route(
            Some(Intent::CreateBooking),
            &make_entities(&[("party_size", "4")]),
            &make_state(),
        );
        assert!(r.collect_pending);
    }

    #[test]
    fn test_create_without_date_or_size_does_not_collect() {
        let r = route(
            Some(Intent::CreateBooking),
            &make_entities(&[("time", "7pm"), ("customer_name", "Ada")]),
            &make_state(),
        );
        assert_eq!(r.step, NextStep::Conversation);
        assert!(!r.collect_pending);
    }

    #[test]
    fn test_route_turn_merges_pending() {
        let mut state = make_state();
        state.intent = Some(Intent::CreateBooking);
        state.entities = make_entities(&[("date", "2024-03-15"), ("party_size", "2")]);

        assert_eq!(route_turn(&mut state), NextStep::Conversation);
        assert_eq!(state.pending_booking.date.as_deref(), Some("2024-03-15"));
        assert_eq!(state.pending_booking.party_size.as_deref(), Some("2"));
        assert!(state.pending_booking.time.is_none());
    }

    #[test]
    fn test_pending_not_used_for_routing() {
        let mut state = make_state();
        state.pending_booking = make_entities(&[("date", "2024-03-15"), ("party_size", "2")]);
        let r = route(
            Some(Intent::CreateBooking),
            &make_entities(&[("time", "7pm")]),
            &state,
        );
        assert_eq!(r.step, NextStep::Conversation);
    }

    // ---- get / update / cancel ----

    #[test]
    fn test_reference_from_entities() {
        let pairs = [("booking_reference", "ABC1234")];
        assert_eq!(step(Some(Intent::GetBooking), &pairs), NextStep::GetBooking);
        assert_eq!(
            step(Some(Intent::UpdateBooking), &pairs),
            NextStep::UpdateBooking
        );
        assert_eq!(
            step(Some(Intent::CancelBooking), &pairs),
            NextStep::CancelBooking
        );
    }

    #[test]
    fn test_reference_from_session() {
        let mut state = make_state();
        state.current_booking_reference = Some("ABC1234".into());
        let none = Entities::default();
        assert_eq!(
            route(Some(Intent::CancelBooking), &none, &state).step,
            NextStep::CancelBooking
        );
        assert_eq!(
            route(Some(Intent::GetBooking), &none, &state).step,
            NextStep::GetBooking
        );
    }

    #[test]
    fn test_no_reference_goes_to_conversation() {
        for intent in [Intent::GetBooking, Intent::UpdateBooking, Intent::CancelBooking] {
            assert_eq!(
                step(Some(intent), &[("date", "today")]),
                NextStep::Conversation
            );
        }
    }

    // ---- Placeholder values from the model ----

    #[test]
    fn test_placeholder_date_keeps_availability_in_conversation() {
        let extraction = crate::extractor::parse_extraction(
            "Intent: check_availability\nEntities:\n- date: None\n- party_size: 4",
        );
        let decision = route(extraction.intent, &extraction.entities, &make_state());
        assert_eq!(decision.step, NextStep::Conversation);
    }

    #[test]
    fn test_placeholder_reference_not_used() {
        let extraction =
            crate::extractor::parse_extraction("Intent: cancel_booking\n- booking_reference: N/A");
        let decision = route(extraction.intent, &extraction.entities, &make_state());
        assert_eq!(decision.step, NextStep::Conversation);
    }

    // ---- Everything else ----

    #[test]
    fn test_conversation_intent() {
        assert_eq!(
            step(Some(Intent::Conversation), &[("date", "today"), ("party_size", "2")]),
            NextStep::Conversation
        );
    }
}
