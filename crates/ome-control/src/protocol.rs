//! Directive line encoding.
//!
//! A directive travels as one line of whitespace-separated tokens. A
//! double-quoted span keeps its whitespace; the quotes themselves are not
//! part of the token. Tokens containing double quotes are not representable.

/// Split a line into tokens, honoring double-quoted spans.
///
/// An unterminated quote runs to the end of the input and whatever was
/// collected is kept.
pub fn tokenize(line: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    // A pair of quotes produces a token even when it encloses nothing.
    let mut pending = false;

    for ch in line.chars() {
        match ch {
            '"' => {
                in_quotes = !in_quotes;
                pending = true;
            }
            c if c.is_whitespace() && !in_quotes => {
                if pending {
                    tokens.push(std::mem::take(&mut current));
                    pending = false;
                }
            }
            c => {
                current.push(c);
                pending = true;
            }
        }
    }
    if pending {
        tokens.push(current);
    }
    tokens
}

/// Join tokens with single spaces, quoting any token that contains
/// whitespace or is empty.
pub fn serialize<S: AsRef<str>>(tokens: &[S]) -> String {
    tokens
        .iter()
        .map(|t| {
            let t = t.as_ref();
            if t.is_empty() || t.contains(char::is_whitespace) {
                format!("\"{}\"", t)
            } else {
                t.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
