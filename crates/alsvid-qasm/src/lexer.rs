//! Lexer for the `OpenQASM` 2.0 subset.

use logos::Logos;

use crate::error::{QasmError, QasmResult};

/// Tokens of the `OpenQASM` 2.0 grammar subset this crate accepts.
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n]+")]
#[logos(skip r"//[^\n]*")]
pub enum Token {
    // Keywords
    #[token("OPENQASM")]
    OpenQasm,
    #[token("include")]
    Include,
    #[token("qreg")]
    Qreg,
    #[token("creg")]
    Creg,
    #[token("gate")]
    Gate,
    #[token("opaque")]
    Opaque,
    #[token("if")]
    If,
    #[token("measure")]
    Measure,
    #[token("reset")]
    Reset,
    #[token("barrier")]
    Barrier,
    #[token("pi")]
    Pi,

    // Literals
    #[regex(r"\d+\.\d*([eE][+-]?\d+)?", |lex| lex.slice().parse::<f64>().ok())]
    #[regex(r"\d+[eE][+-]?\d+", |lex| lex.slice().parse::<f64>().ok())]
    FloatLiteral(f64),
    #[regex(r"\d+", |lex| lex.slice().parse::<u64>().ok())]
    IntLiteral(u64),
    #[regex(r#""[^"]*""#, |lex| {
        let s = lex.slice();
        Some(s[1..s.len()-1].to_string())
    })]
    StringLiteral(String),

    // Identifiers
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*", |lex| lex.slice().to_string())]
    Identifier(String),

    // Operators and punctuation
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("==")]
    EqEq,
    #[token("->")]
    Arrow,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token(";")]
    Semicolon,
    #[token(",")]
    Comma,
}

impl Token {
    /// The fixed spelling of a keyword or punctuation token.
    fn fixed_spelling(&self) -> &'static str {
        match self {
            Token::OpenQasm => "OPENQASM",
            Token::Include => "include",
            Token::Qreg => "qreg",
            Token::Creg => "creg",
            Token::Gate => "gate",
            Token::Opaque => "opaque",
            Token::If => "if",
            Token::Measure => "measure",
            Token::Reset => "reset",
            Token::Barrier => "barrier",
            Token::Pi => "pi",
            Token::Plus => "+",
            Token::Minus => "-",
            Token::Star => "*",
            Token::Slash => "/",
            Token::EqEq => "==",
            Token::Arrow => "->",
            Token::LParen => "(",
            Token::RParen => ")",
            Token::LBracket => "[",
            Token::RBracket => "]",
            Token::LBrace => "{",
            Token::RBrace => "}",
            Token::Semicolon => ";",
            Token::Comma => ",",
            Token::FloatLiteral(_)
            | Token::IntLiteral(_)
            | Token::StringLiteral(_)
            | Token::Identifier(_) => "",
        }
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::FloatLiteral(v) => write!(f, "{v}"),
            Token::IntLiteral(v) => write!(f, "{v}"),
            Token::StringLiteral(s) => write!(f, "\"{s}\""),
            Token::Identifier(s) => f.write_str(s),
            fixed => f.write_str(fixed.fixed_spelling()),
        }
    }
}

/// A token with its byte span in the source.
#[derive(Debug, Clone)]
pub struct SpannedToken {
    /// The token.
    pub token: Token,
    /// Byte range in the source.
    pub span: std::ops::Range<usize>,
}

/// Tokenize a QASM source string, failing on the first invalid token.
pub fn tokenize(source: &str) -> QasmResult<Vec<SpannedToken>> {
    let mut lexer = Token::lexer(source);
    let mut tokens = Vec::new();

    while let Some(result) = lexer.next() {
        let span = lexer.span();
        match result {
            Ok(token) => tokens.push(SpannedToken { token, span }),
            Err(()) => {
                return Err(QasmError::LexerError {
                    position: span.start,
                    message: format!("invalid token '{}'", &source[span]),
                });
            }
        }
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(source: &str) -> Vec<Token> {
        tokenize(source)
            .unwrap()
            .into_iter()
            .map(|t| t.token)
            .collect()
    }

    #[test]
    fn test_header() {
        let tokens = tokens("OPENQASM 2.0;");
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[0], Token::OpenQasm);
        assert!(matches!(tokens[1], Token::FloatLiteral(v) if (v - 2.0).abs() < 0.001));
        assert_eq!(tokens[2], Token::Semicolon);
    }

    #[test]
    fn test_register_declaration() {
        let tokens = tokens("qreg q[2];");
        assert_eq!(tokens[0], Token::Qreg);
        assert!(matches!(tokens[1], Token::Identifier(ref s) if s == "q"));
        assert_eq!(tokens[2], Token::LBracket);
        assert!(matches!(tokens[3], Token::IntLiteral(2)));
    }

    #[test]
    fn test_measure_arrow() {
        let tokens = tokens("measure q[0] -> c[0];");
        assert_eq!(tokens[0], Token::Measure);
        assert!(tokens.contains(&Token::Arrow));
    }

    #[test]
    fn test_condition() {
        let tokens = tokens("if (c==3) x q[0];");
        assert_eq!(tokens[0], Token::If);
        assert!(tokens.contains(&Token::EqEq));
    }

    #[test]
    fn test_parameterized_call() {
        let tokens = tokens("rx(pi/2) q[0];");
        assert!(matches!(tokens[0], Token::Identifier(ref s) if s == "rx"));
        assert_eq!(tokens[2], Token::Pi);
        assert_eq!(tokens[3], Token::Slash);
    }

    #[test]
    fn test_keyword_prefix_stays_identifier() {
        let tokens = tokens("pivot q[0];");
        assert!(matches!(tokens[0], Token::Identifier(ref s) if s == "pivot"));
    }

    #[test]
    fn test_comments_skipped() {
        let tokens = tokens("// header\nqreg q[1]; // trailing\n");
        assert_eq!(tokens.len(), 6);
    }

    #[test]
    fn test_invalid_token_reports_position() {
        let err = tokenize("qreg q[1]; @").unwrap_err();
        assert!(matches!(err, QasmError::LexerError { position: 11, .. }));
    }
}
