//! Identifier casing for generated code.

/// Rust keywords that cannot be used as plain identifiers.
const RUST_KEYWORDS: &[&str] = &[
    "as", "async", "await", "break", "const", "continue", "crate", "dyn", "else", "enum",
    "extern", "false", "fn", "for", "if", "impl", "in", "let", "loop", "match", "mod", "move",
    "mut", "pub", "ref", "return", "self", "Self", "static", "struct", "super", "trait", "true",
    "type", "unsafe", "use", "where", "while", "abstract", "become", "box", "do", "final",
    "macro", "override", "priv", "try", "typeof", "unsized", "virtual", "yield",
];

/// Converts a schema name to PascalCase.
///
/// Names with underscores are split into words. Fully upper case names keep
/// only their first letter upper case. Otherwise only the first letter is
/// raised and the rest is preserved, so `messageHeader` becomes `MessageHeader`.
pub fn to_pascal_case(s: &str) -> String {
    fn capitalize(word: &str, lower_rest: bool) -> String {
        let mut chars = word.chars();
        match chars.next() {
            None => String::new(),
            Some(first) if lower_rest => {
                first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
            }
            Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        }
    }

    if s.contains('_') {
        s.split('_')
            .filter(|word| !word.is_empty())
            .map(|word| capitalize(word, word == word.to_uppercase()))
            .collect()
    } else {
        capitalize(s, s == s.to_uppercase())
    }
}

/// Converts a schema name to snake_case.
///
/// Consecutive upper case letters stay together as an acronym, so
/// `sessionID` becomes `session_id`.
pub fn to_snake_case(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut snake = String::with_capacity(s.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() {
            if i > 0 {
                let prev = chars[i - 1];
                let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
                if prev.is_lowercase()
                    || prev.is_ascii_digit()
                    || (prev.is_uppercase() && next_is_lower)
                {
                    snake.push('_');
                }
            }
            snake.extend(c.to_lowercase());
        } else {
            snake.push(c);
        }
    }
    snake
}

/// Suffixes Rust keywords with an underscore.
pub fn escape_rust_keyword(s: &str) -> String {
    if RUST_KEYWORDS.contains(&s) {
        format!("{s}_")
    } else {
        s.to_string()
    }
}

/// Name of a generated struct or enum
pub fn struct_name(name: &str) -> String {
    to_pascal_case(name)
}

/// Name of a generated method
pub fn function_name(name: &str) -> String {
    escape_rust_keyword(&to_snake_case(name))
}

/// Module holding the codecs of a message or composite
pub fn codec_module_name(name: &str) -> String {
    format!("{}_codec", to_snake_case(name))
}

/// Module holding an enum or bit set
pub fn type_module_name(name: &str) -> String {
    escape_rust_keyword(&to_snake_case(name))
}

/// Returns true if `s` is a plain lower case identifier usable as a file stem.
pub fn is_module_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) if first.is_ascii_lowercase() || first == '_' => chars
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_'),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_pascal_case() {
        assert_eq!(to_pascal_case("messageHeader"), "MessageHeader");
        assert_eq!(to_pascal_case("group_size_encoding"), "GroupSizeEncoding");
        assert_eq!(to_pascal_case("SIGNAL"), "Signal");
        assert_eq!(to_pascal_case("Car"), "Car");
    }

    #[test]
    fn test_to_snake_case() {
        assert_eq!(to_snake_case("someNumbers"), "some_numbers");
        assert_eq!(to_snake_case("sessionID"), "session_id");
        assert_eq!(to_snake_case("MessageHeader"), "message_header");
        assert_eq!(to_snake_case("numInGroup"), "num_in_group");
        assert_eq!(to_snake_case("uk.co.Baseline"), "uk.co.baseline");
        assert_eq!(to_snake_case("HTTPRequest"), "http_request");
    }

    #[test]
    fn test_function_name_escapes_keywords() {
        assert_eq!(function_name("type"), "type_");
        assert_eq!(function_name("modelYear"), "model_year");
        assert_eq!(codec_module_name("Car"), "car_codec");
    }

    #[test]
    fn test_is_module_identifier() {
        assert!(is_module_identifier("car_codec"));
        assert!(is_module_identifier("lib"));
        assert!(!is_module_identifier("../lib"));
        assert!(!is_module_identifier("Car"));
        assert!(!is_module_identifier(""));
        assert!(!is_module_identifier("1st"));
    }
}
