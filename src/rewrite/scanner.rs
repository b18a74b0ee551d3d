use std::borrow::Cow;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TokenKind {
    /// `@name` placeholder; carries the name without the prefix
    Named(String),
    /// bare `?` placeholder
    Positional,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PlaceholderToken {
    pub kind: TokenKind,
    pub start: usize,
    pub end: usize,
}

#[derive(Clone)]
enum State {
    Normal,
    SingleQuoted,
    DoubleQuoted,
    BracketQuoted,
    LineComment,
    BlockComment(u32),
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Find placeholder tokens in `sql`, skipping string literals, quoted and
/// bracket-quoted identifiers, line comments, nested block comments, and
/// `@@` system variables. Tokens are whole: `@foo` never matches inside
/// `@foobar`.
pub(crate) fn scan_placeholders(sql: &str) -> Vec<PlaceholderToken> {
    let bytes = sql.as_bytes();
    let mut tokens = Vec::new();
    let mut state = State::Normal;
    let mut idx = 0;

    while idx < bytes.len() {
        let b = bytes[idx];
        match state {
            State::Normal => match b {
                b'\'' => state = State::SingleQuoted,
                b'"' => state = State::DoubleQuoted,
                b'[' => state = State::BracketQuoted,
                b'-' if bytes.get(idx + 1) == Some(&b'-') => {
                    state = State::LineComment;
                    idx += 1;
                }
                b'/' if bytes.get(idx + 1) == Some(&b'*') => {
                    state = State::BlockComment(1);
                    idx += 1;
                }
                b'@' => {
                    if bytes.get(idx + 1) == Some(&b'@') {
                        // system variable, not a parameter
                        idx += 1;
                        while idx + 1 < bytes.len() && is_ident_byte(bytes[idx + 1]) {
                            idx += 1;
                        }
                    } else if let Some((end, name)) = scan_ident(bytes, idx + 1) {
                        tokens.push(PlaceholderToken {
                            kind: TokenKind::Named(name.to_string()),
                            start: idx,
                            end,
                        });
                        idx = end - 1;
                    }
                }
                b'?' => {
                    tokens.push(PlaceholderToken {
                        kind: TokenKind::Positional,
                        start: idx,
                        end: idx + 1,
                    });
                }
                _ => {}
            },
            State::SingleQuoted => {
                if b == b'\'' {
                    if bytes.get(idx + 1) == Some(&b'\'') {
                        idx += 1; // skip escaped quote
                    } else {
                        state = State::Normal;
                    }
                }
            }
            State::DoubleQuoted => {
                if b == b'"' {
                    if bytes.get(idx + 1) == Some(&b'"') {
                        idx += 1; // skip escaped quote
                    } else {
                        state = State::Normal;
                    }
                }
            }
            State::BracketQuoted => {
                if b == b']' {
                    if bytes.get(idx + 1) == Some(&b']') {
                        idx += 1; // skip escaped bracket
                    } else {
                        state = State::Normal;
                    }
                }
            }
            State::LineComment => {
                if b == b'\n' {
                    state = State::Normal;
                }
            }
            State::BlockComment(depth) => {
                if b == b'/' && bytes.get(idx + 1) == Some(&b'*') {
                    state = State::BlockComment(depth + 1);
                    idx += 1;
                } else if b == b'*' && bytes.get(idx + 1) == Some(&b'/') {
                    if depth == 1 {
                        state = State::Normal;
                    } else {
                        state = State::BlockComment(depth - 1);
                    }
                    idx += 1;
                }
            }
        }

        idx += 1;
    }

    tokens
}

fn scan_ident(bytes: &[u8], start: usize) -> Option<(usize, &str)> {
    let mut idx = start;
    while idx < bytes.len() && is_ident_byte(bytes[idx]) {
        idx += 1;
    }
    if idx == start {
        None
    } else {
        std::str::from_utf8(&bytes[start..idx])
            .ok()
            .map(|name| (idx, name))
    }
}

/// Rewrite the placeholders of `sql` through `replace`; a token mapped to
/// `None` is left as-is. Returns a borrowed `Cow` when nothing changed.
pub(crate) fn replace_placeholders<'a, F>(sql: &'a str, mut replace: F) -> Cow<'a, str>
where
    F: FnMut(&PlaceholderToken) -> Option<String>,
{
    let mut out: Option<String> = None;
    let mut cursor = 0;

    for token in scan_placeholders(sql) {
        if let Some(replacement) = replace(&token) {
            let buf = out.get_or_insert_with(|| String::with_capacity(sql.len() + 16));
            buf.push_str(&sql[cursor..token.start]);
            buf.push_str(&replacement);
            cursor = token.end;
        }
    }

    match out {
        Some(mut buf) => {
            buf.push_str(&sql[cursor..]);
            Cow::Owned(buf)
        }
        None => Cow::Borrowed(sql),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(sql: &str) -> Vec<String> {
        scan_placeholders(sql)
            .into_iter()
            .filter_map(|t| match t.kind {
                TokenKind::Named(name) => Some(name),
                TokenKind::Positional => None,
            })
            .collect()
    }

    #[test]
    fn finds_whole_named_tokens() {
        assert_eq!(names("SELECT @foo, @foobar"), vec!["foo", "foobar"]);
    }

    #[test]
    fn finds_positional_tokens() {
        let tokens = scan_placeholders("SELECT ?, ?");
        assert_eq!(tokens.len(), 2);
        assert!(tokens.iter().all(|t| t.kind == TokenKind::Positional));
    }

    #[test]
    fn skips_literals_and_comments() {
        let sql = "SELECT '@a', \"@b\", [@c] -- @d\n/* @e /* @f */ */ @g FROM t WHERE x = '?'";
        assert_eq!(names(sql), vec!["g"]);
        assert!(
            scan_placeholders(sql)
                .iter()
                .all(|t| t.kind != TokenKind::Positional)
        );
    }

    #[test]
    fn skips_system_variables() {
        assert_eq!(names("SELECT @@ROWCOUNT, @real"), vec!["real"]);
    }

    #[test]
    fn skips_escaped_quotes() {
        assert_eq!(names("SELECT 'it''s @not', @yes"), vec!["yes"]);
    }

    #[test]
    fn replaces_only_mapped_tokens() {
        let sql = "WHERE a = @a AND b = @ab";
        let out = replace_placeholders(sql, |t| match &t.kind {
            TokenKind::Named(n) if n == "a" => Some("@a0, @a1".to_string()),
            _ => None,
        });
        assert_eq!(out, "WHERE a = @a0, @a1 AND b = @ab");
    }

    #[test]
    fn borrows_when_unchanged() {
        let sql = "SELECT 1";
        assert!(matches!(
            replace_placeholders(sql, |_| None),
            Cow::Borrowed(_)
        ));
    }
}
