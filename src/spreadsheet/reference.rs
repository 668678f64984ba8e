//! Conversions between A1-style cell references and zero-based indexes.
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

/// Column letters followed by a one-based row number, `$` anchors allowed.
static REFERENCE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\$?([A-Za-z]{1,3})\$?([1-9][0-9]*)$").expect("Hardcode regex pattern"));

#[derive(Error, Debug, PartialEq)]
pub enum ReferenceError {
    #[error("Invalid cell reference '{0}'")]
    FormatError(String),
}

/// Converts column letters ("A", "AB") to a zero-based column index.
pub fn col_to_index(letters: &str) -> Option<usize> {
    if letters.is_empty() {
        return None;
    }
    letters
        .chars()
        .try_fold(0usize, |index, letter| {
            letter
                .is_ascii_alphabetic()
                .then(|| index * 26 + (letter.to_ascii_uppercase() as usize - 'A' as usize + 1))
        })
        .map(|index| index - 1)
}

/// Converts a one-based row number ("1", "42") to a zero-based row index.
pub fn row_to_index(digits: &str) -> Option<usize> {
    digits.parse::<usize>().ok().filter(|row| *row > 0).map(|row| row - 1)
}

/// Converts a zero-based column index to column letters.
pub fn index_to_col(col: usize) -> String {
    let mut column = col + 1;
    let mut letters = String::new();
    while column > 0 {
        column -= 1;
        letters.insert(0, char::from(b'A' + (column % 26) as u8));
        column /= 26;
    }
    letters
}

/// Formats zero-based (row, col) as an A1-style reference.
pub fn index_to_reference(row: usize, col: usize) -> String {
    format!("{}{}", index_to_col(col), row + 1)
}

/// Parses an A1-style reference into zero-based (row, col).
pub fn reference_to_index(reference: &str) -> Option<(usize, usize)> {
    let captures = REFERENCE_PATTERN.captures(reference)?;
    let col = col_to_index(captures.get(1)?.as_str())?;
    let row = row_to_index(captures.get(2)?.as_str())?;
    Some((row, col))
}

/// Like [`reference_to_index`] but reports the malformed reference.
pub fn parse_reference(reference: &str) -> Result<(usize, usize), ReferenceError> {
    reference_to_index(reference).ok_or_else(|| ReferenceError::FormatError(reference.to_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_letters() {
        assert_eq!(col_to_index("A"), Some(0));
        assert_eq!(col_to_index("z"), Some(25));
        assert_eq!(col_to_index("AA"), Some(26));
        assert_eq!(col_to_index("XFD"), Some(16_383));
        assert_eq!(col_to_index(""), None);
        assert_eq!(col_to_index("A1"), None);

        assert_eq!(index_to_col(0), "A");
        assert_eq!(index_to_col(25), "Z");
        assert_eq!(index_to_col(26), "AA");
        assert_eq!(index_to_col(16_383), "XFD");
    }

    #[test]
    fn row_numbers() {
        assert_eq!(row_to_index("1"), Some(0));
        assert_eq!(row_to_index("1048576"), Some(1_048_575));
        assert_eq!(row_to_index("0"), None);
        assert_eq!(row_to_index(""), None);
    }

    #[test]
    fn references() {
        assert_eq!(reference_to_index("A1"), Some((0, 0)));
        assert_eq!(reference_to_index("d3"), Some((2, 3)));
        assert_eq!(reference_to_index("$AB$12"), Some((11, 27)));
        assert_eq!(reference_to_index("1A"), None);
        assert_eq!(reference_to_index("A0"), None);
        assert_eq!(reference_to_index("B2:C5"), None);

        assert_eq!(index_to_reference(0, 0), "A1");
        assert_eq!(index_to_reference(11, 27), "AB12");
    }

    #[test]
    fn parse_reference_reports_input() {
        assert_eq!(parse_reference("C2"), Ok((1, 2)));
        assert_eq!(parse_reference("??"), Err(ReferenceError::FormatError("??".to_owned())));
    }
}
