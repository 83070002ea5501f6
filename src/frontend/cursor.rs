//! Character consumers.
//!
//! Every consumer takes a [`Cursor`] by value and, on success, hands back a
//! [`Scanned`] holding the consumed text and a new cursor positioned after
//! it. On failure the caller still owns its original cursor, so a failed
//! attempt never moves the parent position.

use thiserror::Error;

/// Failure of a single consumer.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScanError {
    #[error("not enough data to consume: expected at least {min}, found {found}")]
    NotEnough { min: usize, found: usize },

    #[error("too much data to consume: expected at most {max}, found {found}")]
    TooMany { max: usize, found: usize },

    #[error("unable to recognize as boolean constant: {0}")]
    NotBoolean(String),

    #[error("unable to parse as a number: {0}")]
    NotNumber(String),

    #[error("unterminated string constant")]
    UnterminatedString,
}

/// Read position within one line of text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor<'a> {
    text: &'a str,
    pos: usize,
}

/// Successful consumer result.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scanned<'a, T> {
    pub value: T,
    /// Number of characters consumed.
    pub count: usize,
    pub rest: Cursor<'a>,
}

pub type Scan<'a, T> = Result<Scanned<'a, T>, ScanError>;

impl<'a> Cursor<'a> {
    pub fn new(text: &'a str) -> Self {
        Cursor { text, pos: 0 }
    }

    pub fn remaining(&self) -> &'a str {
        &self.text[self.pos..]
    }

    pub fn is_at_end(&self) -> bool {
        self.pos >= self.text.len()
    }

    /// Text between `start` and this cursor. Both must share a line.
    fn since(&self, start: Cursor<'a>) -> &'a str {
        &self.text[start.pos..self.pos]
    }
}

impl<'a, T> Scanned<'a, T> {
    fn map<U>(self, f: impl FnOnce(T) -> U) -> Scanned<'a, U> {
        Scanned {
            value: f(self.value),
            count: self.count,
            rest: self.rest,
        }
    }
}

pub fn is_id_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

pub fn is_id_body(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Consume the longest run of characters matching `pred`.
///
/// The run must be between `min` and `max` characters long; a longer run is
/// a failure, not a truncated match.
pub fn consume_chars<'a>(
    cursor: Cursor<'a>,
    pred: impl Fn(char) -> bool,
    min: usize,
    max: usize,
) -> Scan<'a, &'a str> {
    debug_assert!(min <= max, "invalid count constraint: min={min}; max={max}");

    let rest = cursor.remaining();
    let mut count = 0;
    let mut len = 0;
    for c in rest.chars() {
        if !pred(c) {
            break;
        }
        count += 1;
        len += c.len_utf8();
    }

    if count < min {
        return Err(ScanError::NotEnough { min, found: count });
    }
    if count > max {
        return Err(ScanError::TooMany { max, found: count });
    }

    Ok(Scanned {
        value: &rest[..len],
        count,
        rest: Cursor {
            text: cursor.text,
            pos: cursor.pos + len,
        },
    })
}

/// Consume exactly one occurrence of `ch` (and fail on a run of them).
fn consume_char(cursor: Cursor<'_>, ch: char) -> Scan<'_, &str> {
    consume_chars(cursor, |c| c == ch, 1, 1)
}

/// Consume any leading whitespace. Never fails.
pub fn skip_whitespace(cursor: Cursor<'_>) -> Cursor<'_> {
    match consume_chars(cursor, char::is_whitespace, 0, usize::MAX) {
        Ok(scanned) => scanned.rest,
        Err(_) => cursor,
    }
}

pub fn consume_non_whitespace(cursor: Cursor<'_>) -> Scan<'_, &str> {
    consume_chars(cursor, |c| !c.is_whitespace(), 1, usize::MAX)
}

/// `//` comment running to the end of the line.
pub fn consume_comment(cursor: Cursor<'_>) -> Scan<'_, &str> {
    let slashes = consume_chars(cursor, |c| c == '/', 2, usize::MAX)?;
    let body = consume_chars(slashes.rest, |_| true, 0, usize::MAX)?;
    Ok(Scanned {
        value: body.rest.since(cursor),
        count: slashes.count + body.count,
        rest: body.rest,
    })
}

/// `[A-Za-z_][A-Za-z0-9_]*`
pub fn consume_identifier(cursor: Cursor<'_>) -> Scan<'_, &str> {
    let head = take_one(cursor, is_id_start)?;
    let body = consume_chars(head.rest, is_id_body, 0, usize::MAX)?;
    Ok(Scanned {
        value: body.rest.since(cursor),
        count: head.count + body.count,
        rest: body.rest,
    })
}

/// Instruction mnemonic: a letter followed by letters and digits.
pub fn consume_mnemonic(cursor: Cursor<'_>) -> Scan<'_, &str> {
    let head = take_one(cursor, |c| c.is_ascii_alphabetic())?;
    let body = consume_chars(head.rest, |c| c.is_ascii_alphanumeric(), 0, usize::MAX)?;
    Ok(Scanned {
        value: body.rest.since(cursor),
        count: head.count + body.count,
        rest: body.rest,
    })
}

/// Label declaration: an identifier immediately followed by `:`.
///
/// The returned value is the label name without the colon.
pub fn consume_label_decl(cursor: Cursor<'_>) -> Scan<'_, &str> {
    let name = consume_identifier(cursor)?;
    let colon = consume_char(name.rest, ':')?;
    Ok(Scanned {
        value: name.value,
        count: name.count + colon.count,
        rest: colon.rest,
    })
}

/// Register reference: `$` followed by an identifier. Yields the bare name.
pub fn consume_register(cursor: Cursor<'_>) -> Scan<'_, &str> {
    let sigil = consume_char(cursor, '$')?;
    let name = consume_identifier(sigil.rest)?;
    Ok(Scanned {
        value: name.value,
        count: sigil.count + name.count,
        rest: name.rest,
    })
}

pub fn consume_immediate_prefix(cursor: Cursor<'_>) -> Scan<'_, ()> {
    consume_char(cursor, '#').map(|s| s.map(|_| ()))
}

pub fn consume_operand_separator(cursor: Cursor<'_>) -> Scan<'_, ()> {
    consume_char(cursor, ',').map(|s| s.map(|_| ()))
}

/// `true` or `false`, case-insensitive.
pub fn consume_boolean(cursor: Cursor<'_>) -> Scan<'_, bool> {
    let word = consume_chars(cursor, |c| c.is_ascii_alphabetic(), 0, usize::MAX)?;
    if word.value.eq_ignore_ascii_case("true") {
        Ok(word.map(|_| true))
    } else if word.value.eq_ignore_ascii_case("false") {
        Ok(word.map(|_| false))
    } else {
        Err(ScanError::NotBoolean(word.value.to_string()))
    }
}

/// `-?[0-9]+(\.[0-9]*)?`, parsed as an `f64`.
pub fn consume_number(cursor: Cursor<'_>) -> Scan<'_, f64> {
    let sign = consume_chars(cursor, |c| c == '-', 0, 1)?;
    let int = consume_chars(sign.rest, |c| c.is_ascii_digit(), 1, usize::MAX)?;
    let dot = consume_chars(int.rest, |c| c == '.', 0, 1)?;
    let frac = consume_chars(dot.rest, |c| c.is_ascii_digit(), 0, usize::MAX)?;

    let text = frac.rest.since(cursor);
    let value: f64 = text
        .parse()
        .map_err(|_| ScanError::NotNumber(text.to_string()))?;

    Ok(Scanned {
        value,
        count: sign.count + int.count + dot.count + frac.count,
        rest: frac.rest,
    })
}

/// Exactly one leading character matching `pred`, whatever follows it.
///
/// Unlike `consume_chars(.., 1, 1)` this does not look at the rest of the
/// run, so it suits word heads and delimiters.
fn take_one(cursor: Cursor<'_>, pred: impl Fn(char) -> bool) -> Scan<'_, &str> {
    let rest = cursor.remaining();
    let Some(c) = rest.chars().next().filter(|&c| pred(c)) else {
        return Err(ScanError::NotEnough { min: 1, found: 0 });
    };
    let len = c.len_utf8();
    Ok(Scanned {
        value: &rest[..len],
        count: 1,
        rest: Cursor {
            text: cursor.text,
            pos: cursor.pos + len,
        },
    })
}

/// Double-quoted string with no escapes. Yields the contents.
pub fn consume_string(cursor: Cursor<'_>) -> Scan<'_, &str> {
    let open = take_one(cursor, |c| c == '"')?;
    let body = consume_chars(open.rest, |c| c != '"', 0, usize::MAX)?;
    let close = take_one(body.rest, |c| c == '"').map_err(|_| ScanError::UnterminatedString)?;
    Ok(Scanned {
        value: body.value,
        count: open.count + body.count + close.count,
        rest: close.rest,
    })
}
