use std::borrow::Cow;

const ESC: char = '\u{1b}';
const BEL: char = '\u{07}';

/// Decode a feed-supplied text field for storage and display.
///
/// HTML entities are decoded once (`"A &amp; B"` becomes `"A & B"`, while
/// `"&amp;amp;"` becomes `"&amp;"`), then anything that could drive the
/// terminal is removed with [`strip_terminal_escapes`]. Surrounding
/// whitespace is trimmed.
pub fn decode_feed_text(raw: &str) -> String {
    let decoded = html_escape::decode_html_entities(raw);
    strip_terminal_escapes(&decoded).trim().to_string()
}

/// Remove ANSI escape sequences and C0/DEL control characters.
///
/// CSI (`ESC [ ... final`) and OSC (`ESC ] ... BEL` or `ESC ] ... ESC \`)
/// sequences are dropped whole, a lone `ESC` is dropped with the character
/// after it. Tab, newline and carriage return survive.
pub fn strip_terminal_escapes(s: &str) -> Cow<'_, str> {
    if !s.chars().any(is_unwanted) {
        return Cow::Borrowed(s);
    }

    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c != ESC {
            if !is_unwanted(c) {
                out.push(c);
            }
            continue;
        }

        match chars.next() {
            // CSI: parameters until a final byte in '@'..='~'
            Some('[') => {
                for next in chars.by_ref() {
                    if ('@'..='~').contains(&next) {
                        break;
                    }
                }
            }
            // OSC: until BEL or ST
            Some(']') => {
                while let Some(next) = chars.next() {
                    if next == BEL {
                        break;
                    }
                    if next == ESC && chars.peek() == Some(&'\\') {
                        chars.next();
                        break;
                    }
                }
            }
            _ => {}
        }
    }

    Cow::Owned(out)
}

fn is_unwanted(c: char) -> bool {
    matches!(c, '\u{00}'..='\u{08}' | '\u{0b}' | '\u{0c}' | '\u{0e}'..='\u{1f}' | '\u{7f}')
}
