use crate::script::ast::Position;
use crate::script::error::FragmentError;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    Number(f64),
    StringLit(String),
    Ident(String),
    True,
    False,

    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Eq,     // =
    EqEq,   // ==
    BangEq, // !=
    Gt,
    Lt,
    GtEq,
    LtEq,
    AmpAmp,   // &&
    PipePipe, // ||
    Bang,
    Question,
    Colon,
    Comma,
    LParen,
    RParen,

    /// End of a statement: a line break or `;`.
    End,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Spanned {
    pub token: Token,
    pub position: Position,
}

pub(crate) fn tokenize(source: &str) -> Result<Vec<Spanned>, FragmentError> {
    let chars: Vec<char> = source.chars().collect();
    let len = chars.len();
    let mut tokens = Vec::new();
    let mut i = 0;
    let mut line = 1;
    let mut line_start = 0;

    while i < len {
        let c = chars[i];
        let position = Position::new(line, i - line_start + 1);
        let mut push = |token: Token| tokens.push(Spanned { token, position });

        match c {
            '\n' => {
                push(Token::End);
                i += 1;
                line += 1;
                line_start = i;
            }
            ';' => {
                push(Token::End);
                i += 1;
            }
            ' ' | '\t' | '\r' => i += 1,

            '#' => {
                while i < len && chars[i] != '\n' {
                    i += 1;
                }
            }

            '"' => {
                i += 1;
                let mut s = String::new();
                loop {
                    match chars.get(i) {
                        None | Some('\n') => {
                            return Err(FragmentError::syntax("unterminated string", position));
                        }
                        Some('"') => {
                            i += 1;
                            break;
                        }
                        Some('\\') => {
                            let escaped = match chars.get(i + 1) {
                                Some('n') => '\n',
                                Some('t') => '\t',
                                Some('"') => '"',
                                Some('\\') => '\\',
                                other => {
                                    return Err(FragmentError::syntax(
                                        format!("unknown escape: \\{}", other.copied().unwrap_or(' ')),
                                        Position::new(line, i - line_start + 1),
                                    ));
                                }
                            };
                            s.push(escaped);
                            i += 2;
                        }
                        Some(&other) => {
                            s.push(other);
                            i += 1;
                        }
                    }
                }
                push(Token::StringLit(s));
            }

            '0'..='9' => {
                let start = i;
                while i < len && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let num_str: String = chars[start..i].iter().collect();
                match num_str.parse::<f64>() {
                    Ok(n) => push(Token::Number(n)),
                    Err(_) => {
                        return Err(FragmentError::syntax(
                            format!("malformed number: {}", num_str),
                            position,
                        ));
                    }
                }
            }

            'a'..='z' | 'A'..='Z' | '_' => {
                let start = i;
                while i < len && (chars[i].is_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                let ident: String = chars[start..i].iter().collect();
                match ident.as_str() {
                    "true" => push(Token::True),
                    "false" => push(Token::False),
                    _ => push(Token::Ident(ident)),
                }
            }

            _ => {
                let next = chars.get(i + 1).copied();
                let (token, width) = match (c, next) {
                    ('=', Some('=')) => (Token::EqEq, 2),
                    ('!', Some('=')) => (Token::BangEq, 2),
                    ('>', Some('=')) => (Token::GtEq, 2),
                    ('<', Some('=')) => (Token::LtEq, 2),
                    ('&', Some('&')) => (Token::AmpAmp, 2),
                    ('|', Some('|')) => (Token::PipePipe, 2),
                    ('=', _) => (Token::Eq, 1),
                    ('!', _) => (Token::Bang, 1),
                    ('>', _) => (Token::Gt, 1),
                    ('<', _) => (Token::Lt, 1),
                    ('+', _) => (Token::Plus, 1),
                    ('-', _) => (Token::Minus, 1),
                    ('*', _) => (Token::Star, 1),
                    ('/', _) => (Token::Slash, 1),
                    ('%', _) => (Token::Percent, 1),
                    ('?', _) => (Token::Question, 1),
                    (':', _) => (Token::Colon, 1),
                    (',', _) => (Token::Comma, 1),
                    ('(', _) => (Token::LParen, 1),
                    (')', _) => (Token::RParen, 1),
                    _ => {
                        return Err(FragmentError::syntax(
                            format!("unexpected character: {:?}", c),
                            position,
                        ));
                    }
                };
                push(token);
                i += width;
            }
        }
    }

    Ok(tokens)
}
