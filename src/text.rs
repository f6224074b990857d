//! Input checks and sanitizing for user-supplied text

/// Longest chat or room message accepted, in characters
pub const MAX_MESSAGE_CHARS: usize = 2000;
/// Longest suggestion context accepted, in characters
pub const MAX_CONTEXT_CHARS: usize = 5000;
/// Longest room name, in characters
pub const MAX_ROOM_NAME_CHARS: usize = 100;
/// Longest room description, in characters
pub const MAX_DESCRIPTION_CHARS: usize = 500;

/// Non-blank and at most `max` characters (measured before trimming)
pub fn is_present(value: &str, max: usize) -> bool {
    !value.trim().is_empty() && value.chars().count() <= max
}

/// At most `max` characters
pub fn within(value: &str, max: usize) -> bool {
    value.chars().count() <= max
}

/// Remove every `<` and `>`, then trim. Tags are not parsed.
pub fn sanitize(text: &str) -> String {
    text.chars()
        .filter(|c| *c != '<' && *c != '>')
        .collect::<String>()
        .trim()
        .to_string()
}
