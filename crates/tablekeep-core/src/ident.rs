//! Identifier handling: sanitizing free text into table/column names, quoting
//! for SQL, and token-level matching of identifiers inside SQL text.

/// Longest identifier [`sanitize_identifier`] will produce.
pub const MAX_IDENTIFIER_LEN: usize = 64;

/// Turn arbitrary text into a safe lowercase identifier.
///
/// Lowercases, collapses every run of characters outside `[a-z0-9_]` into a
/// single `_`, trims leading and trailing `_`, and caps the length at
/// [`MAX_IDENTIFIER_LEN`]. Returns `fallback` when nothing is left.
pub fn sanitize_identifier(input: &str, fallback: &str) -> String {
  let mut out = String::with_capacity(input.len());
  let mut pending_sep = false;

  for ch in input.chars().flat_map(char::to_lowercase) {
    if ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '_' {
      if pending_sep {
        out.push('_');
        pending_sep = false;
      }
      out.push(ch);
    } else {
      pending_sep = true;
    }
  }

  let trimmed = out.trim_matches('_');
  let capped: String = trimmed.chars().take(MAX_IDENTIFIER_LEN).collect();
  let capped = capped.trim_end_matches('_');

  if capped.is_empty() {
    fallback.to_string()
  } else {
    capped.to_string()
  }
}

/// Loose form used when a key does not sanitize to an exact column match:
/// lowercase ASCII alphanumerics only.
pub fn relaxed_key(input: &str) -> String {
  input
    .chars()
    .filter(char::is_ascii_alphanumeric)
    .map(|c| c.to_ascii_lowercase())
    .collect()
}

/// Quote an identifier for SQLite, doubling embedded quotes.
pub fn quote_ident(name: &str) -> String {
  format!("\"{}\"", name.replace('"', "\"\""))
}

/// Whether `sql` mentions `ident` as a whole identifier token.
///
/// Case-insensitive. A token is a maximal run of alphanumerics, `_` and `$`,
/// so `status` does not match inside `order_status`, while quoted forms such
/// as `"status"` or `[status]` do match.
pub fn mentions_identifier(sql: &str, ident: &str) -> bool {
  if ident.is_empty() {
    return false;
  }
  sql
    .split(|c: char| !(c.is_alphanumeric() || c == '_' || c == '$'))
    .any(|token| token.eq_ignore_ascii_case(ident))
}
