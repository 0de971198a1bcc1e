// SPDX-FileCopyrightText: 2026 Chatdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `{{placeholder}}` substitution for greetings and farewells.

use std::sync::LazyLock;

use chatdesk_core::Contact;
use regex::{Captures, Regex};

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{\s*([A-Za-z_]+)\s*\}\}").unwrap());

/// Renders a template for a contact. Known placeholders are `name` and
/// `number`; unknown ones render empty.
pub fn render(template: &str, contact: &Contact) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &Captures<'_>| match &caps[1] {
            "name" => contact.name.clone(),
            "number" => contact.number.clone(),
            _ => String::new(),
        })
        .into_owned()
}
