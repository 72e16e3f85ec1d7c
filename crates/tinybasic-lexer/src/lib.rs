use std::fmt;

use logos::Logos;
use thiserror::Error;
use tinybasic_common::Span;

#[derive(Error, Debug, Clone)]
#[error("{message}")]
pub struct LexError {
    pub span: Span,
    pub message: String,
}

/// A lexeme with its source span and 1-based line/column position.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
    pub line: usize,
    pub column: usize,
}

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\f]+")]
#[logos(skip r"[Rr][Ee][Mm]([ \t][^\r\n]*)?")]
pub enum TokenKind {
    // Keywords
    #[token("PRINT", ignore(ascii_case))]
    Print,
    #[token("LET", ignore(ascii_case))]
    Let,
    #[token("IF", ignore(ascii_case))]
    If,
    #[token("THEN", ignore(ascii_case))]
    Then,
    #[token("ELSE", ignore(ascii_case))]
    Else,
    #[token("GOTO", ignore(ascii_case))]
    Goto,
    #[token("GOSUB", ignore(ascii_case))]
    Gosub,
    #[token("RETURN", ignore(ascii_case))]
    Return,
    #[token("INPUT", ignore(ascii_case))]
    Input,
    #[token("END", ignore(ascii_case))]
    End,

    // Literals
    #[regex(r"[0-9]+(\.[0-9]*)?", |lex| lex.slice().parse::<f64>().ok())]
    Number(f64),
    #[regex(r#""[^"\r\n]*""#, |lex| {
        let s = lex.slice();
        s[1..s.len() - 1].to_string()
    })]
    StringLiteral(String),

    // Identifiers are case-insensitive and stored upper-cased
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*", |lex| lex.slice().to_ascii_uppercase())]
    Ident(String),

    // Arithmetic
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,

    // Relational
    #[token("=")]
    Eq,
    #[token("<>")]
    #[token("><")]
    Neq,
    #[token("<")]
    Lt,
    #[token("<=")]
    Le,
    #[token(">")]
    Gt,
    #[token(">=")]
    Ge,

    // Punctuation
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token(",")]
    Comma,

    #[regex(r"\r?\n")]
    Newline,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Print => write!(f, "PRINT"),
            TokenKind::Let => write!(f, "LET"),
            TokenKind::If => write!(f, "IF"),
            TokenKind::Then => write!(f, "THEN"),
            TokenKind::Else => write!(f, "ELSE"),
            TokenKind::Goto => write!(f, "GOTO"),
            TokenKind::Gosub => write!(f, "GOSUB"),
            TokenKind::Return => write!(f, "RETURN"),
            TokenKind::Input => write!(f, "INPUT"),
            TokenKind::End => write!(f, "END"),
            TokenKind::Number(n) => write!(f, "number {n}"),
            TokenKind::StringLiteral(s) => write!(f, "string \"{s}\""),
            TokenKind::Ident(name) => write!(f, "identifier {name}"),
            TokenKind::Plus => write!(f, "'+'"),
            TokenKind::Minus => write!(f, "'-'"),
            TokenKind::Star => write!(f, "'*'"),
            TokenKind::Slash => write!(f, "'/'"),
            TokenKind::Eq => write!(f, "'='"),
            TokenKind::Neq => write!(f, "'<>'"),
            TokenKind::Lt => write!(f, "'<'"),
            TokenKind::Le => write!(f, "'<='"),
            TokenKind::Gt => write!(f, "'>'"),
            TokenKind::Ge => write!(f, "'>='"),
            TokenKind::LParen => write!(f, "'('"),
            TokenKind::RParen => write!(f, "')'"),
            TokenKind::Comma => write!(f, "','"),
            TokenKind::Newline => write!(f, "end of line"),
        }
    }
}

impl Token {
    /// Render the token in `<KIND,lexeme>` form, as printed by `tinybasic tokens`.
    pub fn describe(&self) -> String {
        match &self.kind {
            TokenKind::Newline => "<CR>".to_string(),
            TokenKind::Ident(name) => format!("<ID,{name}>"),
            TokenKind::Number(n) => format!("<NUM,{n}>"),
            TokenKind::StringLiteral(s) => format!("<STRING,\"{s}\">"),
            TokenKind::Plus | TokenKind::Minus | TokenKind::Star | TokenKind::Slash => {
                format!("<OP,{}>", self.kind.to_string().trim_matches('\''))
            }
            TokenKind::Eq
            | TokenKind::Neq
            | TokenKind::Lt
            | TokenKind::Le
            | TokenKind::Gt
            | TokenKind::Ge => format!("<RELOP,{}>", self.kind.to_string().trim_matches('\'')),
            other => format!("<{}>", other.to_string().trim_matches('\'')),
        }
    }
}

/// Split TinyBasic source into tokens. Whitespace and `REM` comments are
/// dropped; every line break becomes a `Newline` token.
pub fn tokenize(source: &str) -> Result<Vec<Token>, LexError> {
    let mut tokens = Vec::new();
    let mut lexer = TokenKind::lexer(source);
    let mut line = 1;
    let mut line_start = 0;

    while let Some(result) = lexer.next() {
        let range = lexer.span();
        let span = Span::from(range.clone());
        let kind = match result {
            Ok(kind) => kind,
            Err(()) => {
                return Err(LexError {
                    span,
                    message: format!(
                        "unexpected character '{}' at {line}:{}",
                        lexer.slice(),
                        range.start - line_start + 1
                    ),
                })
            }
        };

        let is_newline = kind == TokenKind::Newline;
        tokens.push(Token {
            kind,
            span,
            line,
            column: range.start - line_start + 1,
        });
        if is_newline {
            line += 1;
            line_start = range.end;
        }
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        tokenize(input)
            .expect("lex error")
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_let_statement() {
        assert_eq!(
            kinds("10 LET A = 1 + 2"),
            vec![
                TokenKind::Number(10.0),
                TokenKind::Let,
                TokenKind::Ident("A".into()),
                TokenKind::Eq,
                TokenKind::Number(1.0),
                TokenKind::Plus,
                TokenKind::Number(2.0),
            ]
        );
    }

    #[test]
    fn test_keywords_are_case_insensitive() {
        assert_eq!(
            kinds("print x"),
            vec![TokenKind::Print, TokenKind::Ident("X".into())]
        );
    }

    #[test]
    fn test_relational_operators() {
        assert_eq!(
            kinds("< <= > >= = <> ><"),
            vec![
                TokenKind::Lt,
                TokenKind::Le,
                TokenKind::Gt,
                TokenKind::Ge,
                TokenKind::Eq,
                TokenKind::Neq,
                TokenKind::Neq,
            ]
        );
    }

    #[test]
    fn test_string_literal() {
        assert_eq!(
            kinds("PRINT \"Hello, world\""),
            vec![TokenKind::Print, TokenKind::StringLiteral("Hello, world".into())]
        );
    }

    #[test]
    fn test_rem_comment_skipped() {
        assert_eq!(
            kinds("10 REM anything goes here\n20 END"),
            vec![
                TokenKind::Number(10.0),
                TokenKind::Newline,
                TokenKind::Number(20.0),
                TokenKind::End,
            ]
        );
    }

    #[test]
    fn test_rem_prefix_is_identifier() {
        assert_eq!(kinds("REMAINDER"), vec![TokenKind::Ident("REMAINDER".into())]);
    }

    #[test]
    fn test_line_and_column() {
        let tokens = tokenize("10 PRINT A\r\n20 END").unwrap();
        let end = tokens.last().unwrap();
        assert_eq!(end.kind, TokenKind::End);
        assert_eq!((end.line, end.column), (2, 4));
        let print = &tokens[1];
        assert_eq!((print.line, print.column), (1, 4));
    }

    #[test]
    fn test_unexpected_character() {
        let err = tokenize("10 PRINT #").unwrap_err();
        assert_eq!(err.span.start, 9);
        assert!(err.message.contains("unexpected character '#'"));
    }

    #[test]
    fn test_describe() {
        let tokens = tokenize("10 IF A <> 1 THEN PRINT \"X\"\n").unwrap();
        let described: Vec<_> = tokens.iter().map(Token::describe).collect();
        insta::assert_snapshot!(
            described.join(" "),
            @r#"<NUM,10> <IF> <ID,A> <RELOP,<>> <NUM,1> <THEN> <PRINT> <STRING,"X"> <CR>"#
        );
    }
}
