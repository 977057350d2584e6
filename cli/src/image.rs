//! Plain-text memory images.
//!
//! One word per line: an octal address and an octal value separated
//! by whitespace.  `;` starts a comment, which may follow a word or
//! fill a whole line; blank lines are ignored.  Words load in file
//! order, so a later line may overwrite an earlier one.
use std::fmt::{self, Display, Formatter};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use base::word::FMASK;

/// A line the loader could not turn into a word.
#[derive(Debug, PartialEq, Eq)]
pub struct ImageError {
    pub line: usize,
    pub problem: String,
}

impl Display for ImageError {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        write!(f, "line {}: {}", self.line, self.problem)
    }
}

impl std::error::Error for ImageError {}

fn bad(line: usize, problem: String) -> ImageError {
    ImageError { line, problem }
}

/// Parse an image into (address, value) pairs, in file order.
pub fn load(reader: impl BufRead) -> Result<Vec<(u64, u64)>, ImageError> {
    let mut words = Vec::new();
    for (n, line) in reader.lines().enumerate() {
        let n = n + 1;
        let line = line.map_err(|e| bad(n, e.to_string()))?;
        let text = match line.split_once(';') {
            Some((before, _)) => before,
            None => line.as_str(),
        };
        let mut fields = text.split_whitespace();
        let addr = match fields.next() {
            Some(s) => u64::from_str_radix(s, 8)
                .map_err(|_| bad(n, format!("bad octal address {s:?}")))?,
            None => continue,
        };
        let value = match fields.next() {
            Some(s) => u64::from_str_radix(s, 8)
                .map_err(|_| bad(n, format!("bad octal value {s:?}")))?,
            None => return Err(bad(n, "address with no value".to_string())),
        };
        if let Some(extra) = fields.next() {
            return Err(bad(n, format!("unexpected trailing field {extra:?}")));
        }
        if value > FMASK {
            return Err(bad(n, format!("{value:o} does not fit in 36 bits")));
        }
        words.push((addr, value));
    }
    Ok(words)
}

pub fn load_file(path: &Path) -> Result<Vec<(u64, u64)>, Box<dyn std::error::Error>> {
    let file = File::open(path)
        .map_err(|e| format!("cannot open image {}: {e}", path.display()))?;
    Ok(load(BufReader::new(file))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn parse(text: &str) -> Result<Vec<(u64, u64)>, ImageError> {
        load(Cursor::new(text))
    }

    #[test]
    fn test_words_comments_and_blanks() {
        let words = parse(
            "; a whole-line comment\n\
             1000 254200001000  ; HALT\n\
             \n\
             1001 000000000042\n",
        )
        .expect("image is well formed");
        assert_eq!(
            words,
            vec![(0o1000, 0o254_200_001_000), (0o1001, 0o42)]
        );
    }

    #[test]
    fn test_empty_image() {
        assert_eq!(parse(""), Ok(vec![]));
        assert_eq!(parse("; nothing\n\n"), Ok(vec![]));
    }

    #[test]
    fn test_bad_lines_name_the_line() {
        assert_eq!(parse("1000\n").unwrap_err().line, 1);
        assert!(parse("1000 9\n").is_err());
        assert!(parse("xyzzy 0\n").is_err());
        assert_eq!(parse("0 0\n1000 1 2\n").unwrap_err().line, 2);
    }

    #[test]
    fn test_oversize_value_refused() {
        assert!(parse("1000 1000000000000\n").is_err());
        assert!(parse("1000 777777777777\n").is_ok());
    }
}
