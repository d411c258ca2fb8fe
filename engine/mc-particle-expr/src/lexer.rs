//! Tokenizer for the formula language
//!
//! Produces tokens with byte offsets so every compile error can point back
//! into the source string. Unknown characters are rejected, never skipped.

use crate::error::CompileError;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TokenKind {
    Int(i64),
    Double(f64),
    Ident(String),
    /// `$N`
    Slot(usize),
    Dot,
    Comma,
    LParen,
    RParen,
    Question,
    Colon,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Bang,
    Lt,
    Le,
    Gt,
    Ge,
    EqEq,
    Ne,
    AndAnd,
    OrOr,
    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Token {
    pub kind: TokenKind,
    pub offset: usize,
    pub len: usize,
}

impl Token {
    /// Source text of this token
    pub fn text<'s>(&self, source: &'s str) -> &'s str {
        if self.kind == TokenKind::Eof {
            "<end of input>"
        } else {
            &source[self.offset..self.offset + self.len]
        }
    }
}

pub(crate) fn tokenize(source: &str) -> Result<Vec<Token>, CompileError> {
    let bytes = source.as_bytes();
    let len = bytes.len();
    let mut i = 0;
    let mut tokens = Vec::new();

    while i < len {
        let c = bytes[i];

        if c.is_ascii_whitespace() {
            i += 1;
            continue;
        }

        let start = i;

        // Number literal, including Java suffixes
        if c.is_ascii_digit() || (c == b'.' && i + 1 < len && bytes[i + 1].is_ascii_digit()) {
            let mut is_float = false;
            while i < len && bytes[i].is_ascii_digit() {
                i += 1;
            }
            if i < len && bytes[i] == b'.' && i + 1 < len && bytes[i + 1].is_ascii_digit() {
                is_float = true;
                i += 1;
                while i < len && bytes[i].is_ascii_digit() {
                    i += 1;
                }
            } else if i < len
                && bytes[i] == b'.'
                && (i + 1 == len
                    || !bytes[i + 1].is_ascii_alphabetic()
                    || bare_suffix(&bytes[i + 1..]))
            {
                // `1.` and `1.f` are doubles, `1.foo` is not a number at all
                is_float = true;
                i += 1;
            }
            if i < len && (bytes[i] == b'e' || bytes[i] == b'E') {
                is_float = true;
                i += 1;
                if i < len && (bytes[i] == b'+' || bytes[i] == b'-') {
                    i += 1;
                }
                let exp_start = i;
                while i < len && bytes[i].is_ascii_digit() {
                    i += 1;
                }
                if exp_start == i {
                    return Err(CompileError::InvalidNumber {
                        token: source[start..i].to_string(),
                        offset: start,
                    });
                }
            }
            let digits_end = i;
            let mut is_long = false;
            if i < len {
                match bytes[i] {
                    b'f' | b'F' | b'd' | b'D' => {
                        is_float = true;
                        i += 1;
                    }
                    b'l' | b'L' if !is_float => {
                        is_long = true;
                        i += 1;
                    }
                    _ => {}
                }
            }
            if i < len && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
                while i < len && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
                    i += 1;
                }
                return Err(CompileError::InvalidNumber {
                    token: source[start..i].to_string(),
                    offset: start,
                });
            }

            let digits = &source[start..digits_end];
            let kind = if is_float {
                digits.parse::<f64>().map(TokenKind::Double).ok()
            } else {
                digits.parse::<i64>().map(TokenKind::Int).ok()
            };
            let Some(kind) = kind else {
                return Err(CompileError::InvalidNumber {
                    token: source[start..i].to_string(),
                    offset: start,
                });
            };
            debug_assert!(!is_long || matches!(kind, TokenKind::Int(_)));
            tokens.push(Token {
                kind,
                offset: start,
                len: i - start,
            });
            continue;
        }

        // Indexed variable
        if c == b'$' {
            i += 1;
            while i < len && bytes[i].is_ascii_digit() {
                i += 1;
            }
            let index = source[start + 1..i].parse::<usize>().map_err(|_| {
                CompileError::UnexpectedChar {
                    token: "$".to_string(),
                    offset: start,
                }
            })?;
            tokens.push(Token {
                kind: TokenKind::Slot(index),
                offset: start,
                len: i - start,
            });
            continue;
        }

        // Identifier
        if c.is_ascii_alphabetic() || c == b'_' {
            while i < len && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
                i += 1;
            }
            tokens.push(Token {
                kind: TokenKind::Ident(source[start..i].to_string()),
                offset: start,
                len: i - start,
            });
            continue;
        }

        // Two-character operators
        let pair = if i + 1 < len {
            match (c, bytes[i + 1]) {
                (b'<', b'=') => Some(TokenKind::Le),
                (b'>', b'=') => Some(TokenKind::Ge),
                (b'=', b'=') => Some(TokenKind::EqEq),
                (b'!', b'=') => Some(TokenKind::Ne),
                (b'&', b'&') => Some(TokenKind::AndAnd),
                (b'|', b'|') => Some(TokenKind::OrOr),
                _ => None,
            }
        } else {
            None
        };
        if let Some(kind) = pair {
            tokens.push(Token {
                kind,
                offset: start,
                len: 2,
            });
            i += 2;
            continue;
        }

        let kind = match c {
            b'.' => TokenKind::Dot,
            b',' => TokenKind::Comma,
            b'(' => TokenKind::LParen,
            b')' => TokenKind::RParen,
            b'?' => TokenKind::Question,
            b':' => TokenKind::Colon,
            b'+' => TokenKind::Plus,
            b'-' => TokenKind::Minus,
            b'*' => TokenKind::Star,
            b'/' => TokenKind::Slash,
            b'%' => TokenKind::Percent,
            b'!' => TokenKind::Bang,
            b'<' => TokenKind::Lt,
            b'>' => TokenKind::Gt,
            _ => {
                let ch = source[start..].chars().next().unwrap_or('?');
                return Err(CompileError::UnexpectedChar {
                    token: ch.to_string(),
                    offset: start,
                });
            }
        };
        tokens.push(Token {
            kind,
            offset: start,
            len: 1,
        });
        i += 1;
    }

    tokens.push(Token {
        kind: TokenKind::Eof,
        offset: len,
        len: 0,
    });
    Ok(tokens)
}

/// True when `rest` starts with a lone float suffix such as the `f` of `1.f`
fn bare_suffix(rest: &[u8]) -> bool {
    matches!(rest.first(), Some(b'f' | b'F' | b'd' | b'D'))
        && !rest
            .get(1)
            .is_some_and(|b| b.is_ascii_alphanumeric() || *b == b'_')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source)
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_numbers_and_suffixes() {
        assert_eq!(
            kinds("2 0.5 1.0E-4 3F 7L .25"),
            vec![
                TokenKind::Int(2),
                TokenKind::Double(0.5),
                TokenKind::Double(1.0e-4),
                TokenKind::Double(3.0),
                TokenKind::Int(7),
                TokenKind::Double(0.25),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_suffix_after_bare_dot() {
        assert_eq!(
            kinds("1.f 2.F 3.d 4. 5.f*2"),
            vec![
                TokenKind::Double(1.0),
                TokenKind::Double(2.0),
                TokenKind::Double(3.0),
                TokenKind::Double(4.0),
                TokenKind::Double(5.0),
                TokenKind::Star,
                TokenKind::Int(2),
                TokenKind::Eof,
            ]
        );
        // Not a suffix: the dot starts an accessor
        assert_eq!(
            kinds("1.fx"),
            vec![
                TokenKind::Int(1),
                TokenKind::Dot,
                TokenKind::Ident("fx".to_string()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_slot_and_accessor() {
        assert_eq!(
            kinds("$2.getX()"),
            vec![
                TokenKind::Slot(2),
                TokenKind::Dot,
                TokenKind::Ident("getX".to_string()),
                TokenKind::LParen,
                TokenKind::RParen,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_unknown_character_is_rejected() {
        let err = tokenize("1 + #x").unwrap_err();
        assert_eq!(err.offset(), 4);
        assert_eq!(err.token(), "#");

        let err = tokenize("a = 1").unwrap_err();
        assert_eq!(err.token(), "=");
    }

    #[test]
    fn test_malformed_number() {
        let err = tokenize("12abc").unwrap_err();
        assert!(matches!(err, CompileError::InvalidNumber { offset: 0, .. }));
        assert!(tokenize("1e").is_err());
    }

    #[test]
    fn test_bare_dollar_is_rejected() {
        assert!(tokenize("$ + 1").is_err());
    }
}
