//! Minimal HTML text helpers shared by the transformer and the live fragment.

/// Escape text for use as element content.
pub fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// Escape text for use inside a double-quoted attribute value. Line breaks are
/// folded to spaces.
pub fn escape_attribute(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '"' => escaped.push_str("&quot;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '\n' | '\r' | '\t' => escaped.push(' '),
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// Decode the character references that appear in serialised text content.
///
/// Handles the named references emitted by common serialisers plus decimal and
/// hexadecimal numeric references. Unknown references are kept verbatim.
pub fn decode_entities(value: &str) -> String {
    let mut decoded = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(start) = rest.find('&') {
        decoded.push_str(&rest[..start]);
        let candidate = &rest[start..];
        match candidate.find(';') {
            Some(end) if end > 1 && end <= 10 => {
                let name = &candidate[1..end];
                match decode_reference(name) {
                    Some(ch) => {
                        decoded.push(ch);
                        rest = &candidate[end + 1..];
                    }
                    None => {
                        decoded.push('&');
                        rest = &candidate[1..];
                    }
                }
            }
            _ => {
                decoded.push('&');
                rest = &candidate[1..];
            }
        }
    }

    decoded.push_str(rest);
    decoded
}

fn decode_reference(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{a0}'),
        _ => {
            let numeric = name.strip_prefix('#')?;
            let code = match numeric.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => numeric.parse::<u32>().ok()?,
            };
            char::from_u32(code)
        }
    }
}

/// Collapse whitespace runs to single spaces and trim the ends.
pub fn normalize_whitespace(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_then_decode_restores_text() {
        let source = "if a < b && c > \"d\" { 'e' }";
        assert_eq!(decode_entities(&escape_html(source)), source);
    }

    #[test]
    fn decode_handles_numeric_references() {
        assert_eq!(decode_entities("&#60;tag&#x3E;"), "<tag>");
        assert_eq!(decode_entities("&#X41;"), "A");
    }

    #[test]
    fn decode_keeps_unknown_or_unterminated_references() {
        assert_eq!(decode_entities("fish & chips"), "fish & chips");
        assert_eq!(decode_entities("&bogus; &amp"), "&bogus; &amp");
    }

    #[test]
    fn escape_attribute_folds_line_breaks() {
        assert_eq!(escape_attribute("a\"b\nc"), "a&quot;b c");
    }
}
