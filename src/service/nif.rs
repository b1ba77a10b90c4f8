//! Fiscal id (NIF) extraction from free-text customer notes.

const NIF_LEN: usize = 9;
const VALID_PREFIXES: [u32; 6] = [1, 2, 5, 6, 8, 9];

/// Type prefix and mod-11 check digit.
pub fn check(candidate: &str) -> bool {
    let digits: Vec<u32> = match candidate.chars().map(|c| c.to_digit(10)).collect() {
        Some(d) => d,
        None => return false,
    };

    if digits.len() != NIF_LEN || !VALID_PREFIXES.contains(&digits[0]) {
        return false;
    }

    let sum: u32 = digits[..NIF_LEN - 1]
        .iter()
        .enumerate()
        .map(|(pos, d)| d * (9 - pos as u32))
        .sum();

    let control = match sum % 11 {
        0 => 0,
        r => (11 - r) % 10,
    };

    control == digits[NIF_LEN - 1]
}

/// All valid NIFs found in `text`, in order of appearance.
///
/// Candidates are maximal runs of digits and parentheses, so a number glued
/// to a phone prefix such as `(351)` is not mistaken for a NIF.
pub fn search(text: &str) -> Vec<String> {
    text.split(|c: char| !(c.is_ascii_digit() || c == '(' || c == ')'))
        .filter(|run| !run.is_empty() && check(run))
        .map(str::to_string)
        .collect()
}

/// First valid NIF in an optional note.
pub fn find(note: Option<&str>) -> Option<String> {
    search(note.unwrap_or_default()).into_iter().next()
}
