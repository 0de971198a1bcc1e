// SPDX-FileCopyrightText: 2026 Chatdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Contact-card parsing.

use chatdesk_core::NewContact;

/// Extracts phone numbers and the formatted name from a vCard body.
///
/// Every `:`-separated field containing `+` counts as a number; the field
/// after an `FN` field is the name. Numbers keep digits only, and entries
/// with no digits are skipped.
pub fn parse_vcard(body: &str) -> Vec<NewContact> {
    let mut name = String::new();
    let mut numbers = Vec::new();

    for line in body.lines() {
        let fields: Vec<&str> = line.split(':').collect();
        for (i, field) in fields.iter().enumerate() {
            if field.contains('+') {
                numbers.push(*field);
            }
            if field.contains("FN") {
                if let Some(next) = fields.get(i + 1) {
                    name = next.trim().to_string();
                }
            }
        }
    }

    numbers
        .into_iter()
        .map(|raw| raw.chars().filter(char::is_ascii_digit).collect::<String>())
        .filter(|digits| !digits.is_empty())
        .map(|number| NewContact {
            name: if name.is_empty() {
                number.clone()
            } else {
                name.clone()
            },
            number,
            profile_pic_url: None,
            is_group: false,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const CARD: &str = "BEGIN:VCARD\nVERSION:3.0\nN:;Maria;;;\nFN:Maria Souza\n\
                        TEL;type=CELL;waid=5511988887777:+55 11 98888-7777\nEND:VCARD";

    #[test]
    fn parses_name_and_number() {
        let contacts = parse_vcard(CARD);
        assert_eq!(contacts.len(), 1);
        assert_eq!(contacts[0].name, "Maria Souza");
        assert_eq!(contacts[0].number, "5511988887777");
    }

    #[test]
    fn multiple_numbers_share_the_name() {
        let card = format!("{CARD}\nTEL;type=HOME:+55 11 3333-4444");
        let numbers: Vec<String> = parse_vcard(&card).into_iter().map(|c| c.number).collect();
        assert_eq!(numbers, vec!["5511988887777", "551133334444"]);
    }

    #[test]
    fn garbage_yields_nothing() {
        assert!(parse_vcard("not a card at all").is_empty());
        assert!(parse_vcard("TEL:+").is_empty());
    }
}
