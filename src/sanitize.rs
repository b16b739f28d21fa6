//! Normalise extracted strings for flat tabular storage.
//!
//! The CSV sink cannot safely round-trip typographic glyphs, embedded line
//! breaks or arbitrary non-ASCII text: one stray character corrupts every row
//! after it in spreadsheet tools that guess encodings. [`sanitize`] therefore
//! reduces any string to printable ASCII plus a short allow-list of Latin-1
//! symbols, with single-space separation and no leading or trailing blanks.
//!
//! The transform is idempotent: `sanitize(&sanitize(x)) == sanitize(x)`.

/// Latin-1 symbols that survive sanitisation: degree, plus-minus,
/// superscript two and three, micro.
pub const ALLOWED_SYMBOLS: [char; 5] = ['°', '±', '²', '³', 'µ'];

/// Map typographic glyphs and layout whitespace to plain ASCII.
fn replacement(c: char) -> Option<char> {
    match c {
        // Bullets
        '\u{2022}' | '\u{25CF}' | '\u{25E6}' | '\u{25AA}' | '\u{25AB}' | '\u{2023}'
        | '\u{2043}' | '\u{2219}' => Some('-'),
        // En dash, em dash
        '\u{2013}' | '\u{2014}' => Some('-'),
        // Smart double quotes
        '\u{201C}' | '\u{201D}' => Some('"'),
        // Smart single quotes
        '\u{2018}' | '\u{2019}' => Some('\''),
        '\n' | '\r' | '\t' => Some(' '),
        _ => None,
    }
}

fn is_kept(c: char) -> bool {
    matches!(c, ' '..='~') || ALLOWED_SYMBOLS.contains(&c)
}

/// Sanitise a string for tabular storage. Pure and total.
pub fn sanitize(text: &str) -> String {
    let cleaned: String = text
        .chars()
        .map(|c| replacement(c).unwrap_or(c))
        .map(|c| if is_kept(c) { c } else { ' ' })
        .collect();

    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}
