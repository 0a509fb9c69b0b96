use std::sync::LazyLock;

use regex::Regex;

static ID_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9a-fA-F]{24}$").expect("valid id pattern"));

static NAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z]+(?: [A-Za-z]+)*$").expect("valid name pattern"));

/// Returns true when `s` is a 24 character hexadecimal entity key.
pub fn is_valid_id(s: &str) -> bool {
    ID_PATTERN.is_match(s)
}

/// Letters only, words separated by exactly one space, no surrounding whitespace.
pub fn is_valid_name(s: &str) -> bool {
    NAME_PATTERN.is_match(s)
}

/// Title-cases every space separated word: `"jOHN doe"` becomes `"John Doe"`.
///
/// Only meaningful for input accepted by [`is_valid_name`].
pub fn to_proper_name(s: &str) -> String {
    s.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
