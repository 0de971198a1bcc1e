// SPDX-FileCopyrightText: 2026 Chatdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Naming of downloaded media.

use rand::Rng;
use rand::distributions::Alphanumeric;

const SUFFIX_LEN: usize = 5;

/// Builds a collision-resistant file name for a download.
///
/// A named file keeps its stem and extension with a random segment inserted
/// between them (`photo.Xy3kQ.jpg`). An unnamed one becomes
/// `<random>-<unix millis>.<subtype>` from its mime type.
pub fn unique_filename<R: Rng + ?Sized>(
    original: Option<&str>,
    mimetype: &str,
    now_millis: i64,
    rng: &mut R,
) -> String {
    let suffix: String = (0..SUFFIX_LEN)
        .map(|_| char::from(rng.sample(Alphanumeric)))
        .collect();

    match original.filter(|name| !name.is_empty()) {
        Some(name) => match name.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => format!("{stem}.{suffix}.{ext}"),
            _ => format!("{name}.{suffix}"),
        },
        None => format!("{suffix}-{now_millis}.{}", mime_subtype(mimetype)),
    }
}

/// `image/jpeg; q=1` -> `image`.
pub fn media_type(mimetype: &str) -> String {
    mimetype
        .split('/')
        .next()
        .unwrap_or_default()
        .trim()
        .to_string()
}

fn mime_subtype(mimetype: &str) -> &str {
    mimetype
        .split('/')
        .nth(1)
        .and_then(|rest| rest.split(';').next())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or("bin")
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    #[test]
    fn named_file_keeps_extension() {
        let mut rng = StdRng::seed_from_u64(7);
        let name = unique_filename(Some("invoice.final.pdf"), "application/pdf", 0, &mut rng);
        assert!(name.starts_with("invoice.final."));
        assert!(name.ends_with(".pdf"));
        assert_eq!(name.len(), "invoice.final.".len() + SUFFIX_LEN + ".pdf".len());
    }

    #[test]
    fn unnamed_file_uses_mime_subtype_and_time() {
        let mut rng = StdRng::seed_from_u64(7);
        let name = unique_filename(None, "audio/ogg; codecs=opus", 1_700_000_000_000, &mut rng);
        assert!(name.ends_with("-1700000000000.ogg"), "{name}");
    }

    #[test]
    fn extensionless_name_gets_suffix_appended() {
        let mut rng = StdRng::seed_from_u64(1);
        let name = unique_filename(Some("README"), "text/plain", 0, &mut rng);
        assert!(name.starts_with("README."));
    }

    #[test]
    fn two_downloads_of_the_same_file_differ() {
        let mut rng = StdRng::seed_from_u64(42);
        let a = unique_filename(Some("a.jpg"), "image/jpeg", 0, &mut rng);
        let b = unique_filename(Some("a.jpg"), "image/jpeg", 0, &mut rng);
        assert_ne!(a, b);
    }

    #[test]
    fn media_type_is_top_level() {
        assert_eq!(media_type("image/jpeg"), "image");
        assert_eq!(media_type("video/mp4; codecs=avc1"), "video");
    }
}
