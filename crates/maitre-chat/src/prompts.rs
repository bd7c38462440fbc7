//! Prompt text and reply templates.

use maitre_booking::BookingDetails;
use maitre_core::types::{Entities, ENTITY_KEYS};

/// Appended when the turn machinery itself fails or the model cannot
/// produce a reply.
pub const FALLBACK_APOLOGY: &str =
    "I apologize, but I'm having trouble processing your request. Please try again.";

/// Appended when an extraction or operation step fails. Never carries the
/// underlying error text.
pub const TURN_APOLOGY: &str =
    "I apologize, but I ran into a problem with that request. Please try again or let me know how I can help.";

/// Returned to REST clients when a turn produced no assistant message.
pub const NO_REPLY: &str = "I'm sorry, I couldn't process that.";

/// System prompt describing the assistant and the restaurant.
pub fn system_prompt(restaurant: &str) -> String {
    format!(
        "You are a helpful restaurant booking assistant for {restaurant} restaurant.
Your role is to help customers:
1. Check availability for specific dates and times
2. Make new bookings
3. Check their existing booking details
4. Modify existing bookings (change date, time, or party size)
5. Cancel bookings when needed

Important guidelines:
- Be friendly, professional, and conversational
- Ask for clarification when information is unclear or missing
- Confirm details before making bookings
- Provide booking references clearly
- Handle errors gracefully and suggest alternatives
- Format dates as YYYY-MM-DD and times as HH:MM:SS

Restaurant Information:
- Name: {restaurant}
- Available times: Lunch (12:00-14:00) and Dinner (19:00-21:00)
- Accepts bookings for parties of 1-8 people
- Bookings can be made up to 30 days in advance

When users ask about availability or want to make a booking:
1. Identify the date they want (if not specified, ask)
2. Identify the party size (if not specified, ask)
3. Check availability and present options
4. Collect any additional information needed
5. Confirm the booking and provide the reference"
    )
}

/// Instruction asking the model to label an utterance.
///
/// The reply format is parsed by [`crate::extractor::parse_extraction`].
pub fn extraction_prompt(utterance: &str) -> String {
    let descriptions = [
        "Booking date (convert to YYYY-MM-DD format)",
        "Booking time (convert to HH:MM:SS format)",
        "Number of people",
        "Existing booking reference",
        "Any special requirements",
        "Customer's name",
        "Customer's email",
        "Customer's phone number",
    ];
    let entity_lines: Vec<String> = ENTITY_KEYS
        .iter()
        .zip(descriptions)
        .map(|(key, description)| format!("- {}: {}", key, description))
        .collect();

    format!(
        "Based on the user's message, identify their intent and extract relevant entities.

User message: {utterance}

Possible intents:
- check_availability: User wants to see available times
- create_booking: User wants to make a reservation
- get_booking: User wants to check their booking details
- update_booking: User wants to modify their reservation
- cancel_booking: User wants to cancel their reservation
- greeting: User is greeting or starting conversation
- help: User needs assistance or information
- other: Anything else

Extract these entities if present:
{entities}

Respond in this format:
Intent: [intent]
Entities:
- [entity]: [value]

If an entity is not present, don't include it.",
        entities = entity_lines.join("\n")
    )
}

/// Extra system context listing booking details gathered over earlier turns.
pub fn pending_booking_context(pending: &Entities) -> String {
    format!("Pending booking details collected so far: {}", pending)
}

pub fn availability_results(date: &str, party_size: u32, slots: &str) -> String {
    format!(
        "Here are the available times for {date} (party of {party_size}):

{slots}

Would you like to book any of these times?"
    )
}

pub fn no_availability(date: &str, party_size: u32) -> String {
    format!(
        "I'm sorry, but there are no available slots for {date} for a party of {party_size}. Would you like to check another date?"
    )
}

pub fn booking_created(restaurant: &str, reference: &str, details: &BookingDetails) -> String {
    let party_size = details.party_size.unwrap_or(0);
    let people = if party_size == 1 { "person" } else { "people" };
    let special = details
        .special_requests
        .as_deref()
        .filter(|s| !s.is_empty())
        .map(|s| format!("\n💬 Special requests: {}", s))
        .unwrap_or_default();

    format!(
        "Great! I've successfully made your booking:

📍 Restaurant: {restaurant}
📅 Date: {date}
⏰ Time: {time}
👥 Party size: {party_size} {people}
📝 Booking reference: {reference}{special}

Please save your booking reference. You'll need it to check or modify your reservation.",
        date = details.visit_date.as_deref().unwrap_or("N/A"),
        time = details.visit_time.as_deref().unwrap_or("N/A"),
    )
}

pub fn booking_details(formatted: &str) -> String {
    format!("Here are your booking details:\n\n{}", formatted)
}

pub fn booking_not_found(reference: &str) -> String {
    format!(
        "I couldn't find a booking with reference {reference}. Please double-check the reference or provide more details."
    )
}

pub fn booking_updated(reference: &str, updates: &str) -> String {
    format!(
        "Your booking has been successfully updated:

📝 Booking reference: {reference}
Updated details:
{updates}

Is there anything else you'd like to change?"
    )
}

/// Asked when an update turn named a booking but no fields to change.
pub fn update_needs_changes(reference: &str) -> String {
    format!(
        "What would you like to change about booking {reference}? I can update the date, time, party size or special requests."
    )
}

pub fn booking_cancelled(reference: &str) -> String {
    format!(
        "Your booking {reference} has been successfully cancelled.

We're sorry to see you go! Feel free to make a new booking anytime."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_prompt_names_restaurant() {
        let prompt = system_prompt("TheSleepyDragon");
        assert!(prompt.starts_with(
            "You are a helpful restaurant booking assistant for TheSleepyDragon"
        ));
        assert!(prompt.contains("- Name: TheSleepyDragon"));
        assert!(prompt.contains("parties of 1-8 people"));
    }

    #[test]
    fn test_extraction_prompt_lists_keys_and_format() {
        let prompt = extraction_prompt("table for two tomorrow");
        assert!(prompt.contains("User message: table for two tomorrow"));
        for key in ENTITY_KEYS {
            assert!(prompt.contains(&format!("- {}: ", key)), "missing {}", key);
        }
        assert!(prompt.contains("Intent: [intent]"));
        assert!(prompt.contains("- cancel_booking: User wants to cancel"));
    }

    #[test]
    fn test_booking_created_singular_and_requests() {
        let details = BookingDetails {
            visit_date: Some("2024-03-15".into()),
            visit_time: Some("19:00:00".into()),
            party_size: Some(1),
            special_requests: Some("Quiet table".into()),
            ..BookingDetails::default()
        };
        let text = booking_created("TheHungryUnicorn", "ABC1234", &details);
        assert!(text.contains("👥 Party size: 1 person"));
        assert!(text.contains("📝 Booking reference: ABC1234"));
        assert!(text.contains("💬 Special requests: Quiet table"));
    }

    #[test]
    fn test_booking_created_plural_without_requests() {
        let details = BookingDetails {
            party_size: Some(4),
            ..BookingDetails::default()
        };
        let text = booking_created("TheHungryUnicorn", "XYZ", &details);
        assert!(text.contains("4 people"));
        assert!(!text.contains("Special requests"));
    }

    #[test]
    fn test_pending_context() {
        let pending = Entities {
            date: Some("friday".into()),
            ..Entities::default()
        };
        assert_eq!(
            pending_booking_context(&pending),
            "Pending booking details collected so far: {date: friday}"
        );
    }

    #[test]
    fn test_user_facing_messages() {
        assert!(no_availability("2024-03-15", 4).contains("for 2024-03-15 for a party of 4"));
        assert!(booking_not_found("ZZZ").contains("reference ZZZ"));
        assert!(booking_cancelled("ABC").starts_with("Your booking ABC has been"));
        assert!(!TURN_APOLOGY.contains("error"));
    }
}
