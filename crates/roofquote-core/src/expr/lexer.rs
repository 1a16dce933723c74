//! Tokenizer for the expression language.

use super::ExprError;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TokenKind {
    Number(f64),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
    Lt,
    Le,
    Gt,
    Ge,
    EqEq,
    NotEq,
    And,
    Or,
}

impl TokenKind {
    /// How the token is shown in syntax errors.
    pub(crate) fn describe(&self) -> String {
        match self {
            TokenKind::Number(n) => format!("number {}", n),
            TokenKind::Ident(name) => format!("identifier '{}'", name),
            TokenKind::Plus => "'+'".to_string(),
            TokenKind::Minus => "'-'".to_string(),
            TokenKind::Star => "'*'".to_string(),
            TokenKind::Slash => "'/'".to_string(),
            TokenKind::LParen => "'('".to_string(),
            TokenKind::RParen => "')'".to_string(),
            TokenKind::Lt => "'<'".to_string(),
            TokenKind::Le => "'<='".to_string(),
            TokenKind::Gt => "'>'".to_string(),
            TokenKind::Ge => "'>='".to_string(),
            TokenKind::EqEq => "'=='".to_string(),
            TokenKind::NotEq => "'!='".to_string(),
            TokenKind::And => "'and'".to_string(),
            TokenKind::Or => "'or'".to_string(),
        }
    }
}

/// A token and the byte offset it starts at.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Token {
    pub kind: TokenKind,
    pub offset: usize,
}

pub(crate) fn tokenize(source: &str) -> Result<Vec<Token>, ExprError> {
    let bytes = source.as_bytes();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        let c = bytes[pos];
        let start = pos;

        if c.is_ascii_whitespace() {
            pos += 1;
            continue;
        }

        if c.is_ascii_digit() || (c == b'.' && bytes.get(pos + 1).is_some_and(u8::is_ascii_digit)) {
            while pos < bytes.len() && (bytes[pos].is_ascii_digit() || bytes[pos] == b'.') {
                pos += 1;
            }
            let text = &source[start..pos];
            let value: f64 = text.parse().map_err(|_| {
                ExprError::invalid(format!("malformed number '{}' at offset {}", text, start))
            })?;
            tokens.push(Token {
                kind: TokenKind::Number(value),
                offset: start,
            });
            continue;
        }

        if c.is_ascii_alphabetic() || c == b'_' {
            while pos < bytes.len() && (bytes[pos].is_ascii_alphanumeric() || bytes[pos] == b'_') {
                pos += 1;
            }
            let kind = match &source[start..pos] {
                "and" => TokenKind::And,
                "or" => TokenKind::Or,
                name => TokenKind::Ident(name.to_string()),
            };
            tokens.push(Token { kind, offset: start });
            continue;
        }

        let next = bytes.get(pos + 1).copied();
        let (kind, width) = match (c, next) {
            (b'<', Some(b'=')) => (TokenKind::Le, 2),
            (b'>', Some(b'=')) => (TokenKind::Ge, 2),
            (b'=', Some(b'=')) => (TokenKind::EqEq, 2),
            (b'!', Some(b'=')) => (TokenKind::NotEq, 2),
            (b'<', _) => (TokenKind::Lt, 1),
            (b'>', _) => (TokenKind::Gt, 1),
            (b'+', _) => (TokenKind::Plus, 1),
            (b'-', _) => (TokenKind::Minus, 1),
            (b'*', _) => (TokenKind::Star, 1),
            (b'/', _) => (TokenKind::Slash, 1),
            (b'(', _) => (TokenKind::LParen, 1),
            (b')', _) => (TokenKind::RParen, 1),
            (b'=', _) => {
                return Err(ExprError::invalid(format!(
                    "'=' is not an operator at offset {} (did you mean '=='?)",
                    start
                )))
            }
            _ => {
                let shown = source[start..].chars().next().unwrap_or('?');
                return Err(ExprError::invalid(format!(
                    "unexpected character '{}' at offset {}",
                    shown, start
                )));
            }
        };

        tokens.push(Token { kind, offset: start });
        pos += width;
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_operators_and_keywords() {
        assert_eq!(
            kinds("a<=b and c!=0 or d>=.5"),
            vec![
                TokenKind::Ident("a".into()),
                TokenKind::Le,
                TokenKind::Ident("b".into()),
                TokenKind::And,
                TokenKind::Ident("c".into()),
                TokenKind::NotEq,
                TokenKind::Number(0.0),
                TokenKind::Or,
                TokenKind::Ident("d".into()),
                TokenKind::Ge,
                TokenKind::Number(0.5),
            ]
        );
    }

    #[test]
    fn test_keywords_need_word_boundary() {
        assert_eq!(kinds("android"), vec![TokenKind::Ident("android".into())]);
        assert_eq!(kinds("orders"), vec![TokenKind::Ident("orders".into())]);
    }

    #[test]
    fn test_offsets() {
        let tokens = tokenize("  x + 10").unwrap();
        let offsets: Vec<usize> = tokens.iter().map(|t| t.offset).collect();
        assert_eq!(offsets, vec![2, 4, 6]);
    }

    #[test]
    fn test_rejects_unknown_characters() {
        assert!(tokenize("x % 2").is_err());
        assert!(tokenize("x = 2").is_err());
        assert!(tokenize("1.2.3").is_err());
        assert!(tokenize("__import__('os')").is_err());
    }
}
