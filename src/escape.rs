//! Character-level helpers shared by every parsing layer.
//!
//! Annotation text recognizes four escape sequences: `\{`, `\}`, `\@` and `\\`.
//! An escaped character never counts as grammar: escaped braces do not change
//! brace depth and an escaped `@` never starts an annotation.

const BACKSLASH_PLACEHOLDER: &str = "\x00BS\x00";
const AT_PLACEHOLDER: &str = "\x00AT\x00";

/// Returns true if `b` may follow a backslash to form an escape sequence.
fn is_escapable(b: u8) -> bool {
    matches!(b, b'{' | b'}' | b'@' | b'\\')
}

/// Replaces the escape sequences in `s` with the characters they stand for.
///
/// The escaped backslash is protected first, so `\\{` reads as a literal
/// backslash followed by a real brace rather than as an escaped brace.
///
/// # Example
///
/// ```
/// use openapi_from_comments::escape::unescape;
///
/// assert_eq!(unescape(r"^[A-Z]\{2\}$"), "^[A-Z]{2}$");
/// assert_eq!(unescape(r"user\@example.com"), "user@example.com");
/// ```
pub fn unescape(s: &str) -> String {
    s.replace("\\\\", BACKSLASH_PLACEHOLDER)
        .replace("\\{", "{")
        .replace("\\}", "}")
        .replace("\\@", "@")
        .replace(BACKSLASH_PLACEHOLDER, "\\")
}

/// Computes the brace depth of `s`, ignoring escaped braces.
///
/// # Returns
///
/// The final depth and whether it is exactly zero.
pub fn brace_depth(s: &str) -> (i32, bool) {
    let depth = count_braces_from(s, 0);
    (depth, depth == 0)
}

/// Counts unescaped braces starting at byte offset `start`.
///
/// The offset is expected to point at a character boundary; an out-of-range
/// offset counts nothing.
pub fn count_braces_from(s: &str, start: usize) -> i32 {
    let bytes = s.as_bytes();
    let mut depth = 0;
    let mut i = start;

    while i < bytes.len() {
        if bytes[i] == b'\\' && i + 1 < bytes.len() && is_escapable(bytes[i + 1]) {
            i += 2;
            continue;
        }
        match bytes[i] {
            b'{' => depth += 1,
            b'}' => depth -= 1,
            _ => {}
        }
        i += 1;
    }

    depth
}

/// Returns true if `s` contains a `{` or `}` that is not escaped.
pub fn contains_unescaped_brace(s: &str) -> bool {
    let bytes = s.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'\\' && i + 1 < bytes.len() && is_escapable(bytes[i + 1]) {
            i += 2;
            continue;
        }
        if bytes[i] == b'{' || bytes[i] == b'}' {
            return true;
        }
        i += 1;
    }

    false
}

/// Counts the `@` characters in `s` that are not escaped.
pub fn count_unescaped_at(s: &str) -> usize {
    let bytes = s.as_bytes();
    let mut count = 0;
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'\\' && i + 1 < bytes.len() && is_escapable(bytes[i + 1]) {
            i += 2;
            continue;
        }
        if bytes[i] == b'@' {
            count += 1;
        }
        i += 1;
    }

    count
}

/// Returns true if the trimmed line starts with an `@` that is not escaped.
pub fn starts_with_unescaped_at(line: &str) -> bool {
    line.trim_start().starts_with('@')
}

/// Hides escaped `@` characters behind a placeholder so a line can be split on `@`.
///
/// Use [`restore_escaped_at`] on every piece after splitting.
pub fn protect_escaped_at(s: &str) -> String {
    s.replace("\\\\", BACKSLASH_PLACEHOLDER)
        .replace("\\@", AT_PLACEHOLDER)
        .replace(BACKSLASH_PLACEHOLDER, "\\\\")
}

/// Reverses [`protect_escaped_at`], turning placeholders back into `\@`.
pub fn restore_escaped_at(s: &str) -> String {
    s.replace(AT_PLACEHOLDER, "\\@")
}

/// Finds the `{` that opens a block on `line`.
///
/// A block opener is a `{` directly preceded by a space or tab. Path templates
/// such as `/users/{id}` never have whitespace before their brace, which is how
/// the two are told apart. Escaped braces are skipped.
///
/// # Returns
///
/// The byte index of the opening brace, or `None` if the line opens no block.
///
/// # Example
///
/// ```
/// use openapi_from_comments::escape::find_block_opener;
///
/// let line = "@endpoint GET /users/{id} {";
/// assert_eq!(find_block_opener(line), Some(line.len() - 1));
/// assert_eq!(find_block_opener("@endpoint GET /users/{id}"), None);
/// ```
pub fn find_block_opener(line: &str) -> Option<usize> {
    let bytes = line.as_bytes();
    let mut i = 0;

    while i + 1 < bytes.len() {
        if bytes[i] == b'\\' && is_escapable(bytes[i + 1]) {
            i += 2;
            continue;
        }
        if (bytes[i] == b' ' || bytes[i] == b'\t') && bytes[i + 1] == b'{' {
            return Some(i + 1);
        }
        i += 1;
    }

    None
}
