//! URL slug derivation for marketplace products.

use std::sync::LazyLock;

use regex::Regex;

/// Any run of characters that are not ASCII letters, digits, or underscore.
/// Applied after lowercasing, so upper-case letters never reach it.
static NON_WORD_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9_]+").expect("valid regex"));

/// Derives a URL-safe slug from a product title.
///
/// Lowercases the title, replaces each run of non-word characters
/// (punctuation, whitespace, hyphens, anything outside ASCII) with a single
/// `-`, and trims hyphens from both ends. `"Men's T-Shirt (V2)!"` becomes
/// `"men-s-t-shirt-v2"`.
///
/// May return an empty string when the title has no word characters.
#[must_use]
pub fn slugify(title: &str) -> String {
    let lowered = title.to_lowercase();
    NON_WORD_RUN
        .replace_all(&lowered, "-")
        .trim_matches('-')
        .to_string()
}
