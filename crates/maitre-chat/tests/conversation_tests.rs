//! End-to-end conversations through the orchestrator, with the model and the
//! reservation service replaced by scripted mocks.

use std::sync::Arc;

use chrono::NaiveDate;

use maitre_booking::{BookingService, MockReservationApi, TimeSlot};
use maitre_chat::{
    ChatError, ChatOrchestrator, InMemorySessionStore, LlmIntentExtractor, MockLanguageModel,
    TurnExecutor,
};
use maitre_core::types::{Intent, Role};

struct Fixture {
    orchestrator: ChatOrchestrator,
    llm: Arc<MockLanguageModel>,
    api: Arc<MockReservationApi>,
}

fn make_fixture() -> Fixture {
    let llm = Arc::new(MockLanguageModel::new());
    let api = Arc::new(MockReservationApi::new().with_slots(vec![
        TimeSlot {
            time: "18:30:00".into(),
            available: true,
        },
        TimeSlot {
            time: "19:00:00".into(),
            available: true,
        },
        TimeSlot {
            time: "21:00:00".into(),
            available: false,
        },
    ]));

    let booking = BookingService::new(api.clone())
        .with_reference_date(NaiveDate::from_ymd_opt(2024, 3, 14).unwrap());
    let extractor = Arc::new(LlmIntentExtractor::new(llm.clone(), "TheHungryUnicorn"));
    let executor = TurnExecutor::new(extractor, llm.clone(), booking, "TheHungryUnicorn");
    let orchestrator = ChatOrchestrator::new(executor, Arc::new(InMemorySessionStore::new()), 1000);

    Fixture {
        orchestrator,
        llm,
        api,
    }
}

#[tokio::test]
async fn test_full_booking_conversation() {
    let f = make_fixture();
    let session = "guest-1";

    // Greeting: extraction, then an open reply.
    f.llm.push_reply("Intent: greeting\nEntities:");
    f.llm.push_reply("Welcome to TheHungryUnicorn! How can I help?");
    let reply = f.orchestrator.handle_message("hi", session).await.unwrap();
    assert_eq!(reply.response, "Welcome to TheHungryUnicorn! How can I help?");

    // Availability goes straight to the service; no second model call.
    f.llm
        .push_reply("Intent: check_availability\nEntities:\n- date: tomorrow\n- party_size: 4");
    let reply = f
        .orchestrator
        .handle_message("anything for 4 people tomorrow?", session)
        .await
        .unwrap();
    assert!(reply.response.contains("• 18:30 - Available"));
    assert!(reply.response.contains("• 19:00 - Available"));
    assert!(!reply.response.contains("21:00"));

    f.llm.push_reply(
        "Intent: create_booking\nEntities:\n- date: tomorrow\n- time: 7pm\n- party_size: 4\n- customer_name: Ada Lovelace",
    );
    let reply = f
        .orchestrator
        .handle_message("book 7pm please, name is Ada Lovelace", session)
        .await
        .unwrap();
    assert!(reply.response.contains("📝 Booking reference: MOCK0001"));
    assert!(reply.response.contains("📅 Date: 2024-03-15"));

    let stored = f.api.booking("MOCK0001").unwrap();
    assert_eq!(stored.visit_time.as_deref(), Some("19:00:00"));
    assert_eq!(stored.party_size, Some(4));

    // Follow-ups use the session's booking reference.
    f.llm.push_reply("Intent: cancel_booking\nEntities:");
    let reply = f
        .orchestrator
        .handle_message("actually, cancel it", session)
        .await
        .unwrap();
    assert!(reply.response.contains("MOCK0001 has been successfully cancelled"));
    assert!(f.api.booking("MOCK0001").is_none());

    let state = f.orchestrator.session(session).await.unwrap();
    assert_eq!(state.intent, Some(Intent::CancelBooking));
    assert!(state.current_booking_reference.is_none());
    assert_eq!(state.messages.len(), 8);
    assert!(state
        .messages
        .iter()
        .step_by(2)
        .all(|m| m.role == Role::User));
    assert_eq!(
        f.api.calls(),
        vec!["search_availability", "create_booking", "cancel_booking"]
    );
}

#[tokio::test]
async fn test_partial_booking_collects_details() {
    let f = make_fixture();

    f.llm
        .push_reply("Intent: create_booking\nEntities:\n- date: tomorrow\n- party_size: 2");
    f.llm.push_reply("What time would you like?");
    let reply = f
        .orchestrator
        .handle_message("table for 2 tomorrow", "guest-2")
        .await
        .unwrap();
    assert_eq!(reply.response, "What time would you like?");

    let state = f.orchestrator.session("guest-2").await.unwrap();
    assert_eq!(state.pending_booking.date.as_deref(), Some("tomorrow"));
    assert_eq!(state.pending_booking.party_size.as_deref(), Some("2"));
    assert!(f.api.calls().is_empty());
}

#[tokio::test]
async fn test_model_outage_still_replies() {
    let f = make_fixture();
    f.llm.push_error("connection refused");

    let reply = f.orchestrator.handle_message("hello?", "guest-3").await.unwrap();
    assert!(reply.response.starts_with("I apologize"));

    let state = f.orchestrator.session("guest-3").await.unwrap();
    assert_eq!(state.messages.len(), 2);
    assert!(state.intent.is_none());
}

#[tokio::test]
async fn test_sessions_are_isolated() {
    let f = make_fixture();
    f.llm.push_reply(
        "Intent: create_booking\n- date: today\n- time: 18:30\n- party_size: 2",
    );
    f.orchestrator.handle_message("book", "a").await.unwrap();

    f.llm.push_reply("Intent: cancel_booking");
    f.llm.push_reply("Which booking should I cancel?");
    let reply = f.orchestrator.handle_message("cancel", "b").await.unwrap();
    assert_eq!(reply.response, "Which booking should I cancel?");

    let a = f.orchestrator.session("a").await.unwrap();
    assert_eq!(a.current_booking_reference.as_deref(), Some("MOCK0001"));
    assert!(f.api.booking("MOCK0001").is_some());

    f.orchestrator.delete_session("a").await.unwrap();
    assert!(matches!(
        f.orchestrator.delete_session("a").await,
        Err(ChatError::SessionNotFound(_))
    ));
    assert_eq!(f.orchestrator.session_count().await, 1);
}
