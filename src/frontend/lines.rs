/// A single line of script text with its 1-based physical line number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLine<'a> {
    pub number: usize,
    pub text: &'a str,
}

/// Splits script text on CR/LF, skipping lines that are empty.
///
/// `\r\n`, a lone `\r` and a lone `\n` each terminate exactly one line, so
/// line numbers match what an editor shows.
pub struct LineScanner<'a> {
    rest: &'a str,
    number: usize,
}

impl<'a> LineScanner<'a> {
    pub fn new(text: &'a str) -> Self {
        LineScanner {
            rest: text,
            number: 0,
        }
    }
}

impl<'a> Iterator for LineScanner<'a> {
    type Item = SourceLine<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.rest.is_empty() {
            self.number += 1;

            let (text, tail) = match self.rest.find(['\r', '\n']) {
                Some(end) => {
                    let brk = if self.rest[end..].starts_with("\r\n") {
                        2
                    } else {
                        1
                    };
                    (&self.rest[..end], &self.rest[end + brk..])
                }
                None => (self.rest, ""),
            };
            self.rest = tail;

            if !text.is_empty() {
                return Some(SourceLine {
                    number: self.number,
                    text,
                });
            }
        }
        None
    }
}
