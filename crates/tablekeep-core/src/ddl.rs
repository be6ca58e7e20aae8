//! Reads the parts of a `CREATE TABLE` statement that SQLite's pragma
//! functions do not report: column collations, `CHECK` constraints,
//! generated column expressions, `AUTOINCREMENT` and table options.
//!
//! This is a token scanner, not a SQL parser. Clauses are located at the
//! top nesting level of each column or constraint definition and returned as
//! verbatim slices of the original text.

use crate::{Error, Result};

// ─── Output ──────────────────────────────────────────────────────────────────

/// What the statement says about one column beyond `pragma_table_xinfo`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedColumn {
  pub name:          String,
  pub collation:     Option<String>,
  /// Each entry is a full `CHECK (…)` clause.
  pub checks:        Vec<String>,
  /// Expression between the parentheses of `AS (…)`, and whether `STORED`.
  pub generated:     Option<(String, bool)>,
  pub autoincrement: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedTable {
  pub columns: Vec<ParsedColumn>,
  /// Table-level `[CONSTRAINT name] CHECK (…)` definitions.
  pub checks:  Vec<String>,
  /// Whatever follows the closing parenthesis, e.g. `WITHOUT ROWID`.
  pub options: String,
}

impl ParsedTable {
  pub fn column(&self, name: &str) -> Option<&ParsedColumn> {
    self.columns.iter().find(|c| c.name.eq_ignore_ascii_case(name))
  }
}

// ─── Tokens ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
  Word,
  QuotedIdent,
  StringLit,
  Open,
  Close,
  Comma,
  Punct,
}

#[derive(Debug, Clone, Copy)]
struct Token {
  kind:  Kind,
  start: usize,
  end:   usize,
}

fn tokenize(sql: &str) -> Result<Vec<Token>> {
  let bytes = sql.as_bytes();
  let mut tokens = Vec::new();
  let mut i = 0;

  let unterminated = |what: &str| Error::Unsupported {
    table:  String::new(),
    reason: format!("unterminated {what} in table definition"),
  };

  while i < bytes.len() {
    let c = bytes[i];
    let start = i;
    let kind = match c {
      b if b.is_ascii_whitespace() => {
        i += 1;
        continue;
      }
      b'-' if bytes.get(i + 1) == Some(&b'-') => {
        i = sql[i..].find('\n').map_or(bytes.len(), |n| i + n);
        continue;
      }
      b'/' if bytes.get(i + 1) == Some(&b'*') => {
        i = sql[i + 2..]
          .find("*/")
          .map(|n| i + 2 + n + 2)
          .ok_or_else(|| unterminated("comment"))?;
        continue;
      }
      b'\'' | b'"' | b'`' => {
        // A doubled delimiter is an escaped one.
        let mut j = i + 1;
        loop {
          match bytes.get(j) {
            None => return Err(unterminated("quoted text")),
            Some(&q) if q == c && bytes.get(j + 1) == Some(&c) => j += 2,
            Some(&q) if q == c => break,
            Some(_) => j += 1,
          }
        }
        i = j + 1;
        if c == b'\'' { Kind::StringLit } else { Kind::QuotedIdent }
      }
      b'[' => {
        i = sql[i..].find(']').map(|n| i + n + 1).ok_or_else(|| unterminated("identifier"))?;
        Kind::QuotedIdent
      }
      b'(' => {
        i += 1;
        Kind::Open
      }
      b')' => {
        i += 1;
        Kind::Close
      }
      b',' => {
        i += 1;
        Kind::Comma
      }
      b if b.is_ascii_alphanumeric() || b == b'_' || b == b'$' || b >= 0x80 => {
        while i < bytes.len()
          && (bytes[i].is_ascii_alphanumeric()
            || bytes[i] == b'_'
            || bytes[i] == b'$'
            || bytes[i] >= 0x80)
        {
          i += 1;
        }
        Kind::Word
      }
      _ => {
        i += 1;
        Kind::Punct
      }
    };
    tokens.push(Token { kind, start, end: i });
  }

  Ok(tokens)
}

/// A run of tokens plus the source text, with keyword helpers.
struct Cursor<'a> {
  sql:    &'a str,
  tokens: &'a [Token],
}

impl<'a> Cursor<'a> {
  fn text(&self, at: usize) -> &'a str {
    let t = self.tokens[at];
    &self.sql[t.start..t.end]
  }

  fn is_word(&self, at: usize, keyword: &str) -> bool {
    self
      .tokens
      .get(at)
      .is_some_and(|t| t.kind == Kind::Word && self.text(at).eq_ignore_ascii_case(keyword))
  }

  /// Index of the `)` matching the `(` at `open`.
  fn matching_close(&self, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (at, t) in self.tokens.iter().enumerate().skip(open) {
      match t.kind {
        Kind::Open => depth += 1,
        Kind::Close => {
          depth -= 1;
          if depth == 0 {
            return Some(at);
          }
        }
        _ => {}
      }
    }
    None
  }

  /// Source text covering tokens `from..=to`.
  fn span(&self, from: usize, to: usize) -> &'a str {
    &self.sql[self.tokens[from].start..self.tokens[to].end]
  }

  /// Split `from..to` on commas at nesting depth zero.
  fn split_top_level(&self, from: usize, to: usize) -> Vec<(usize, usize)> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut begin = from;
    for at in from..to {
      match self.tokens[at].kind {
        Kind::Open => depth += 1,
        Kind::Close => depth = depth.saturating_sub(1),
        Kind::Comma if depth == 0 => {
          parts.push((begin, at));
          begin = at + 1;
        }
        _ => {}
      }
    }
    parts.push((begin, to));
    parts.into_iter().filter(|(a, b)| a < b).collect()
  }
}

/// The name an identifier token stands for, without its quotes.
fn unquote(raw: &str) -> String {
  let bytes = raw.as_bytes();
  match bytes.first() {
    Some(b'"') => raw[1..raw.len() - 1].replace("\"\"", "\""),
    Some(b'`') => raw[1..raw.len() - 1].replace("``", "`"),
    Some(b'[') => raw[1..raw.len() - 1].to_string(),
    Some(b'\'') => raw[1..raw.len() - 1].replace("''", "'"),
    _ => raw.to_string(),
  }
}

// ─── Parsing ─────────────────────────────────────────────────────────────────

const TABLE_CONSTRAINT_KEYWORDS: [&str; 5] = ["CONSTRAINT", "PRIMARY", "UNIQUE", "CHECK", "FOREIGN"];

/// Scan the `CREATE TABLE` statement stored in `sqlite_master.sql`.
pub fn parse_create_table(sql: &str) -> Result<ParsedTable> {
  let tokens = tokenize(sql)?;
  let cur = Cursor { sql, tokens: &tokens };

  let malformed = |reason: &str| Error::Unsupported {
    table:  String::new(),
    reason: reason.to_string(),
  };

  let open = tokens
    .iter()
    .position(|t| t.kind == Kind::Open)
    .ok_or_else(|| malformed("table definition has no column list"))?;
  let close = cur
    .matching_close(open)
    .ok_or_else(|| malformed("unbalanced parentheses in table definition"))?;

  let mut table = ParsedTable {
    options: sql[tokens[close].end..].trim().trim_end_matches(';').trim().to_string(),
    ..Default::default()
  };

  for (from, to) in cur.split_top_level(open + 1, close) {
    if TABLE_CONSTRAINT_KEYWORDS.iter().any(|k| cur.is_word(from, k)) {
      let check_at = if cur.is_word(from, "CONSTRAINT") { from + 2 } else { from };
      if cur.is_word(check_at, "CHECK") {
        table.checks.push(cur.span(from, to - 1).to_string());
      }
      continue;
    }
    table.columns.push(parse_column(&cur, from, to));
  }

  Ok(table)
}

fn parse_column(cur: &Cursor<'_>, from: usize, to: usize) -> ParsedColumn {
  let mut column = ParsedColumn { name: unquote(cur.text(from)), ..Default::default() };

  let mut at = from + 1;
  while at < to {
    match cur.tokens[at].kind {
      Kind::Open => {
        at = cur.matching_close(at).map_or(to, |c| c + 1);
        continue;
      }
      Kind::Word => {}
      _ => {
        at += 1;
        continue;
      }
    }

    if cur.is_word(at, "COLLATE") && at + 1 < to {
      column.collation = Some(unquote(cur.text(at + 1)));
      at += 2;
    } else if cur.is_word(at, "CHECK") && at + 1 < to && cur.tokens[at + 1].kind == Kind::Open {
      let end = cur.matching_close(at + 1).unwrap_or(to - 1).min(to - 1);
      column.checks.push(cur.span(at, end).to_string());
      at = end + 1;
    } else if cur.is_word(at, "AS") && at + 1 < to && cur.tokens[at + 1].kind == Kind::Open {
      let end = cur.matching_close(at + 1).unwrap_or(to - 1).min(to - 1);
      let expression = if end > at + 2 { cur.span(at + 2, end - 1) } else { "" };
      let stored = end + 1 < to && cur.is_word(end + 1, "STORED");
      column.generated = Some((expression.to_string(), stored));
      at = end + 1;
    } else {
      if cur.is_word(at, "AUTOINCREMENT") {
        column.autoincrement = true;
      }
      at += 1;
    }
  }

  column
}
