//! Human-readable renderings of API results for chat replies.

use serde_json::{Map, Value};

use crate::models::{BookingDetails, TimeSlot};

/// List the open slots as bullet lines, or "No available slots".
pub fn format_availability_slots(slots: &[TimeSlot]) -> String {
    let lines: Vec<String> = slots
        .iter()
        .filter(|slot| slot.available)
        .map(|slot| format!("• {} - Available", short_time(&slot.time)))
        .collect();

    if lines.is_empty() {
        "No available slots".to_string()
    } else {
        lines.join("\n")
    }
}

/// Multi-line summary of a booking.
pub fn format_booking_details(details: &BookingDetails) -> String {
    let mut lines = vec![
        format!(
            "📋 Reference: {}",
            details.booking_reference.as_deref().unwrap_or("N/A")
        ),
        format!("📅 Date: {}", details.visit_date.as_deref().unwrap_or("N/A")),
        format!(
            "🕐 Time: {}",
            details.visit_time.as_deref().map(short_time).unwrap_or("N/A")
        ),
        format!(
            "👥 Party size: {}",
            details
                .party_size
                .map(|n| n.to_string())
                .unwrap_or_else(|| "N/A".to_string())
        ),
    ];

    if let Some(requests) = details.special_requests.as_deref().filter(|r| !r.is_empty()) {
        lines.push(format!("📝 Special requests: {}", requests));
    }
    if let Some(name) = details.customer.as_ref().and_then(|c| c.full_name()) {
        lines.push(format!("👤 Name: {}", name));
    }

    lines.join("\n")
}

/// "• field: value" lines for an update result. String values are unquoted.
pub fn format_updates(updates: &Map<String, Value>) -> String {
    updates
        .iter()
        .map(|(field, value)| match value {
            Value::String(s) => format!("• {}: {}", field, s),
            other => format!("• {}: {}", field, other),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// `HH:MM:SS` -> `HH:MM`; anything else is returned unchanged.
fn short_time(time: &str) -> &str {
    match time.get(..5) {
        Some(prefix) if time.len() == 8 && time.as_bytes()[5] == b':' => prefix,
        _ => time,
    }
}
