//! Text normalization for cross-document comparison.
//!
//! Recognized text arrives with mixed casing, Latin diacritics and OCR
//! punctuation noise. Every comparison in the crate goes through one of the
//! two normal forms below so that "N'Guessan", "NGUESSAN" and "N GUESSAN"
//! land on common ground.

/// Latin diacritics and ligatures folded to base ASCII.
///
/// Covers the characters that actually occur on passports and civil
/// documents from the covered region (French, Amharic transliterations,
/// Portuguese). Anything outside this table passes through unchanged and is
/// dropped later by the character filters.
const ACCENT_FOLD: &[(char, &str)] = &[
    ('À', "A"), ('Á', "A"), ('Â', "A"), ('Ã', "A"), ('Ä', "A"), ('Å', "A"),
    ('Æ', "AE"), ('Ç', "C"), ('È', "E"), ('É', "E"), ('Ê', "E"), ('Ë', "E"),
    ('Ì', "I"), ('Í', "I"), ('Î', "I"), ('Ï', "I"), ('Ð', "D"), ('Ñ', "N"),
    ('Ò', "O"), ('Ó', "O"), ('Ô', "O"), ('Õ', "O"), ('Ö', "O"), ('Ø', "O"),
    ('Ù', "U"), ('Ú', "U"), ('Û', "U"), ('Ü', "U"), ('Ý', "Y"), ('Þ', "TH"),
    ('ß', "SS"),
    ('à', "a"), ('á', "a"), ('â', "a"), ('ã', "a"), ('ä', "a"), ('å', "a"),
    ('æ', "ae"), ('ç', "c"), ('è', "e"), ('é', "e"), ('ê', "e"), ('ë', "e"),
    ('ì', "i"), ('í', "i"), ('î', "i"), ('ï', "i"), ('ð', "d"), ('ñ', "n"),
    ('ò', "o"), ('ó', "o"), ('ô', "o"), ('õ', "o"), ('ö', "o"), ('ø', "o"),
    ('ù', "u"), ('ú', "u"), ('û', "u"), ('ü', "u"), ('ý', "y"), ('þ', "th"),
    ('ÿ', "y"), ('Œ', "OE"), ('œ', "oe"), ('Š', "S"), ('š', "s"),
    ('Ž', "Z"), ('ž', "z"),
];

/// Replace known accented Latin characters with their ASCII base form.
pub fn remove_accents(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    'chars: for c in input.chars() {
        for (accented, base) in ACCENT_FOLD {
            if c == *accented {
                out.push_str(base);
                continue 'chars;
            }
        }
        out.push(c);
    }
    out
}

/// Normal form for identifier-like values (passport numbers, references,
/// airport codes): accents folded, uppercased, everything outside `[A-Z0-9]`
/// dropped.
pub fn normalize_for_comparison(input: &str) -> String {
    remove_accents(input)
        .to_uppercase()
        .chars()
        .filter(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
        .collect()
}

/// Normal form for human names: accents folded, uppercased, every
/// non-letter replaced by a space, whitespace runs collapsed, ends trimmed.
///
/// Word boundaries survive — `names_match` compares per word.
pub fn normalize_name(input: &str) -> String {
    let folded = remove_accents(input).to_uppercase();
    let mut out = String::with_capacity(folded.len());
    let mut last_was_space = true;
    for c in folded.chars() {
        if c.is_ascii_uppercase() {
            out.push(c);
            last_was_space = false;
        } else if !last_was_space {
            out.push(' ');
            last_was_space = true;
        }
    }
    while out.ends_with(' ') {
        out.pop();
    }
    out
}

/// First letter of each word of the normalized name.
pub fn initials(name: &str) -> String {
    normalize_name(name)
        .split(' ')
        .filter_map(|w| w.chars().next())
        .collect()
}
