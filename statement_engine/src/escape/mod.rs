//! Rewrites JDBC escape sequences (`{fn ...}`, `{d '...'}`, `{call ...}`)
//! into the server's native syntax before a statement is dispatched.

use crate::error::{Result, StatementError};

pub trait EscapeProcessor: Send + Sync {
    fn rewrite(&self, sql: &str) -> Result<String>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct JdbcEscapeProcessor;

impl JdbcEscapeProcessor {
    pub fn new() -> Self {
        Self
    }

    fn rewrite_chars(&self, chars: &[char]) -> Result<String> {
        let mut out = String::with_capacity(chars.len());
        let mut quote: Option<char> = None;
        let mut i = 0;

        while i < chars.len() {
            let c = chars[i];
            match quote {
                Some(q) => {
                    out.push(c);
                    if c == '\\' && i + 1 < chars.len() {
                        out.push(chars[i + 1]);
                        i += 2;
                        continue;
                    }
                    if c == q {
                        quote = None;
                    }
                }
                None => match c {
                    '\'' | '"' | '`' => {
                        quote = Some(c);
                        out.push(c);
                    }
                    '{' => {
                        let end = find_closing_brace(chars, i)?;
                        out.push_str(&self.translate(&chars[i + 1..end])?);
                        i = end + 1;
                        continue;
                    }
                    _ => out.push(c),
                },
            }
            i += 1;
        }

        Ok(out)
    }

    fn translate(&self, inner: &[char]) -> Result<String> {
        let text: String = inner.iter().collect();
        let body = text.trim();

        if let Some(call) = strip_return_call(body) {
            return Ok(format!("CALL {}", self.rewrite(call)?));
        }

        let (keyword, rest) = match body.find(char::is_whitespace) {
            Some(idx) => (&body[..idx], body[idx..].trim()),
            None => (body, ""),
        };

        match keyword.to_ascii_lowercase().as_str() {
            "d" | "t" | "ts" | "fn" | "oj" => self.rewrite(rest),
            "call" => Ok(format!("CALL {}", self.rewrite(rest)?)),
            "escape" => Ok(format!("ESCAPE {}", self.rewrite(rest)?)),
            _ => Ok(format!("{{{}}}", text)),
        }
    }
}

impl EscapeProcessor for JdbcEscapeProcessor {
    fn rewrite(&self, sql: &str) -> Result<String> {
        if !sql.contains('{') {
            return Ok(sql.to_string());
        }
        let chars: Vec<char> = sql.chars().collect();
        self.rewrite_chars(&chars)
    }
}

/// `?= call proc(...)` -> `proc(...)`.
fn strip_return_call(body: &str) -> Option<&str> {
    let rest = body.strip_prefix('?')?.trim_start();
    let rest = rest.strip_prefix('=')?.trim_start();
    if !rest.get(..4)?.eq_ignore_ascii_case("call") {
        return None;
    }
    Some(rest[4..].trim())
}

fn find_closing_brace(chars: &[char], open: usize) -> Result<usize> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut i = open;

    while i < chars.len() {
        let c = chars[i];
        match quote {
            Some(q) => {
                if c == '\\' {
                    i += 2;
                    continue;
                }
                if c == q {
                    quote = None;
                }
            }
            None => match c {
                '\'' | '"' | '`' => quote = Some(c),
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(i);
                    }
                }
                _ => {}
            },
        }
        i += 1;
    }

    Err(StatementError::InvalidArgument(
        "Unterminated escape sequence in SQL".to_string(),
    ))
}
