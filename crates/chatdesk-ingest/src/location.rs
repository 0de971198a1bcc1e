// SPDX-FileCopyrightText: 2026 Chatdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Location message rendering.
//!
//! A location body is stored as `<thumbnail data url>|<map url>|<label>` so
//! clients can split on `|`.

use chatdesk_core::Location;

/// Builds the composite body from the thumbnail the transport put in the
/// event body.
pub fn location_body(thumbnail: &str, location: &Location, map_language: &str) -> String {
    let map_url = format!(
        "https://maps.google.com/maps?q={}%2C{}&z=17&hl={map_language}",
        location.latitude, location.longitude
    );
    let label = match location.description.as_deref() {
        Some(d) if !d.is_empty() => d.to_string(),
        _ => format!("{}, {}", location.latitude, location.longitude),
    };
    format!("data:image/png;base64,{thumbnail}|{map_url}|{label}")
}

/// Ticket preview text for a location.
pub fn location_preview(location: &Location) -> String {
    match location.description.as_deref().and_then(first_line) {
        Some(line) => format!("Localization - {line}"),
        None => "Localization".to_string(),
    }
}

// Descriptions arrive with either real newlines or escaped `\n` sequences.
fn first_line(description: &str) -> Option<&str> {
    description
        .split("\\n")
        .next()
        .and_then(|s| s.lines().next())
        .filter(|s| !s.is_empty())
}
