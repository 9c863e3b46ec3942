use std::borrow::Cow;

/// Returns `true` for characters XML 1.0 does not allow anywhere in a document.
///
/// Allowed: `#x9 | #xA | #xD | [#x20-#xD7FF] | [#xE000-#xFFFD] | [#x10000-#x10FFFF]`.
/// Surrogates cannot occur in a Rust `char`, so only C0 controls and the two
/// noncharacters `U+FFFE`/`U+FFFF` need rejecting.
fn is_invalid_xml_char(c: char) -> bool {
    matches!(c, '\u{0}'..='\u{8}' | '\u{b}' | '\u{c}' | '\u{e}'..='\u{1f}' | '\u{fffe}' | '\u{ffff}')
}

/// Strips characters that would make an XML 1.0 document unparseable.
///
/// Feed text is attacker-controlled; a single stray NUL or ESC byte copied
/// into a regenerated document is enough for every downstream parser to
/// reject the whole feed. Escaping cannot help here (`&#0;` is just as
/// illegal), so these characters are dropped.
///
/// Returns `Cow::Borrowed` when nothing needs stripping (the common case).
///
/// # Examples
///
/// ```
/// use feedsift::util::strip_invalid_xml_chars;
///
/// assert_eq!(strip_invalid_xml_chars("clean\ttext"), "clean\ttext");
/// assert_eq!(strip_invalid_xml_chars("bell\x07ring"), "bellring");
/// ```
pub fn strip_invalid_xml_chars(s: &str) -> Cow<'_, str> {
    // Fast path: scan for any char that needs stripping
    if !s.chars().any(is_invalid_xml_char) {
        return Cow::Borrowed(s);
    }

    Cow::Owned(s.chars().filter(|&c| !is_invalid_xml_char(c)).collect())
}
