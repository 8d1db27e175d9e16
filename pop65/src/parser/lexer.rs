//! Lexer and line splitter for assembly source lines

use std::fmt;
use std::iter::Peekable;
use std::str::CharIndices;

use super::number::{NumberFormat, NumberParser};
use crate::error::{AsmError, ErrorKind, Result};
use crate::opcodes;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Token {
    Ident(String),
    /// Pseudo-op keyword, lowercased, including the leading dot.
    Directive(String),
    Number(u16),
    Str(String),
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Less,
    Greater,
    LessEq,
    GreaterEq,
    Equal,
    NotEqual,
    Hash,
    Comma,
    Colon,
    LParen,
    RParen,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Ident(s) | Token::Directive(s) => f.write_str(s),
            Token::Number(n) => write!(f, "${:X}", n),
            Token::Str(s) => write!(f, "\"{}\"", s),
            Token::Plus => f.write_str("+"),
            Token::Minus => f.write_str("-"),
            Token::Star => f.write_str("*"),
            Token::Slash => f.write_str("/"),
            Token::Percent => f.write_str("%"),
            Token::Less => f.write_str("<"),
            Token::Greater => f.write_str(">"),
            Token::LessEq => f.write_str("<="),
            Token::GreaterEq => f.write_str(">="),
            Token::Equal => f.write_str("="),
            Token::NotEqual => f.write_str("<>"),
            Token::Hash => f.write_str("#"),
            Token::Comma => f.write_str(","),
            Token::Colon => f.write_str(":"),
            Token::LParen => f.write_str("("),
            Token::RParen => f.write_str(")"),
        }
    }
}

/// What a line asks the assembler to do.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Operation {
    /// A pseudo-op such as `.org`, lowercased.
    Directive(String),
    /// `name = expr`
    Assign,
    /// A 6502 mnemonic, uppercased.
    Instruction(String),
}

/// One source line split into its fields.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SourceLine {
    pub label: Option<String>,
    pub operation: Option<Operation>,
    pub operands: Vec<Token>,
    pub comment: Option<String>,
}

impl SourceLine {
    pub fn is_blank(&self) -> bool {
        self.label.is_none() && self.operation.is_none() && self.comment.is_none()
    }

    pub fn is_comment_only(&self) -> bool {
        self.label.is_none() && self.operation.is_none() && self.comment.is_some()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Conditional {
    If,
    Else,
    Endif,
}

/// Split a line at its first `;` outside of quotes.
pub fn split_comment(text: &str) -> (&str, Option<&str>) {
    let mut quote: Option<char> = None;
    for (i, c) in text.char_indices() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None => match c {
                '\'' | '"' => quote = Some(c),
                ';' => return (&text[..i], Some(text[i + 1..].trim())),
                _ => {}
            },
        }
    }
    (text, None)
}

/// Parse a single line into label, operation, operand tokens and comment.
pub fn parse_line(text: &str) -> Result<SourceLine> {
    let (code, comment) = split_comment(text);
    let tokens = tokenize(code)?;

    let mut rest: &[Token] = &tokens;
    let mut label = None;
    match rest {
        [Token::Ident(name), Token::Colon, tail @ ..] => {
            label = Some(name.clone());
            rest = tail;
        }
        [Token::Ident(name), tail @ ..] if !opcodes::is_mnemonic(name) => {
            label = Some(name.clone());
            rest = tail;
        }
        _ => {}
    }

    let operation = match rest.split_first() {
        None => None,
        Some((Token::Directive(name), tail)) => {
            rest = tail;
            Some(Operation::Directive(name.clone()))
        }
        Some((Token::Equal, tail)) => {
            rest = tail;
            Some(Operation::Assign)
        }
        Some((Token::Ident(name), tail)) if opcodes::is_mnemonic(name) => {
            rest = tail;
            Some(Operation::Instruction(name.to_ascii_uppercase()))
        }
        Some((Token::Ident(name), _)) => {
            return Err(AsmError::syntax(format!("unknown instruction '{}'", name)));
        }
        Some((tok, _)) => {
            return Err(AsmError::syntax(format!("unexpected '{}'", tok)));
        }
    };

    Ok(SourceLine {
        label,
        operation,
        operands: rest.to_vec(),
        comment: comment.map(str::to_string),
    })
}

/// Recognise `.if`/`.else`/`.endif` without tokenizing. Used for lines
/// inside a skipped conditional block, which may not even lex.
pub fn conditional_keyword(text: &str) -> Option<Conditional> {
    let (code, _) = split_comment(text);
    let mut words = code.split_whitespace();
    let mut word = words.next()?;
    if !word.starts_with('.') {
        word = words.next()?;
    }
    let name = word.strip_prefix('.')?;
    let end = name
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .unwrap_or(name.len());
    match name[..end].to_ascii_lowercase().as_str() {
        "if" => Some(Conditional::If),
        "else" => Some(Conditional::Else),
        "endif" => Some(Conditional::Endif),
        _ => None,
    }
}

/// Tokenize the code part of a line (comment already removed).
pub fn tokenize(code: &str) -> Result<Vec<Token>> {
    let mut tokens: Vec<Token> = Vec::new();
    let mut chars = code.char_indices().peekable();

    while let Some(&(_, c)) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }
        let token = match c {
            '\'' | '"' => {
                chars.next();
                let mut s = String::new();
                loop {
                    match chars.next() {
                        Some((_, q)) if q == c => break,
                        Some((_, ch)) => s.push(ch),
                        None => {
                            return Err(AsmError::new(
                                ErrorKind::Lex,
                                format!("unterminated string, missing closing {}", c),
                            ));
                        }
                    }
                }
                Token::Str(s)
            }
            '$' | '@' => {
                chars.next();
                let format = NumberFormat::from_prefix(c).unwrap_or(NumberFormat::Decimal);
                let digits = take_word(&mut chars);
                Token::Number(NumberParser::parse_digits(&digits, format)?)
            }
            '%' if expects_operand(&tokens) && binary_follows(code, &mut chars) => {
                chars.next();
                let digits = take_word(&mut chars);
                Token::Number(NumberParser::parse_digits(&digits, NumberFormat::Binary)?)
            }
            '0'..='9' => {
                let digits = take_word(&mut chars);
                Token::Number(NumberParser::parse_digits(&digits, NumberFormat::Decimal)?)
            }
            '.' => {
                chars.next();
                let word = take_word(&mut chars);
                if word.is_empty() {
                    return Err(AsmError::new(ErrorKind::Lex, "stray '.'"));
                }
                Token::Directive(format!(".{}", word.to_ascii_lowercase()))
            }
            c if c.is_ascii_alphabetic() || c == '_' => Token::Ident(take_word(&mut chars)),
            '<' => {
                chars.next();
                match chars.peek().map(|&(_, c)| c) {
                    Some('=') => {
                        chars.next();
                        Token::LessEq
                    }
                    Some('>') => {
                        chars.next();
                        Token::NotEqual
                    }
                    _ => Token::Less,
                }
            }
            '>' => {
                chars.next();
                match chars.peek().map(|&(_, c)| c) {
                    Some('=') => {
                        chars.next();
                        Token::GreaterEq
                    }
                    Some('<') => {
                        chars.next();
                        Token::NotEqual
                    }
                    _ => Token::Greater,
                }
            }
            _ => {
                chars.next();
                match c {
                    '+' => Token::Plus,
                    '-' => Token::Minus,
                    '*' => Token::Star,
                    '/' => Token::Slash,
                    '%' => Token::Percent,
                    '=' => Token::Equal,
                    '#' => Token::Hash,
                    ',' => Token::Comma,
                    ':' => Token::Colon,
                    '(' => Token::LParen,
                    ')' => Token::RParen,
                    other => {
                        return Err(AsmError::new(
                            ErrorKind::Lex,
                            format!("unexpected character '{}'", other),
                        ));
                    }
                }
            }
        };
        tokens.push(token);
    }
    Ok(tokens)
}

fn take_word(chars: &mut Peekable<CharIndices<'_>>) -> String {
    let mut word = String::new();
    while let Some(&(_, c)) = chars.peek() {
        if c.is_ascii_alphanumeric() || c == '_' {
            word.push(c);
            chars.next();
        } else {
            break;
        }
    }
    word
}

/// True when the `%` under the cursor is followed by a binary digit.
fn binary_follows(code: &str, chars: &mut Peekable<CharIndices<'_>>) -> bool {
    chars
        .peek()
        .and_then(|&(i, _)| code[i + 1..].chars().next())
        .is_some_and(|c| c == '0' || c == '1')
}

/// Whether the next token starts an operand rather than continuing one.
fn expects_operand(tokens: &[Token]) -> bool {
    match tokens.last() {
        None => true,
        Some(Token::Number(_) | Token::Str(_) | Token::RParen) => false,
        Some(Token::Ident(name)) => opcodes::is_mnemonic(name),
        Some(_) => true,
    }
}
