use crate::script::ast::{BinaryOperator, Expr, Position, Statement, UnaryOperator};
use crate::script::error::FragmentError;
use crate::script::lexer::{Spanned, Token, tokenize};

/// Parse a whole fragment into its statements.
pub fn parse_fragment(source: &str) -> Result<Vec<Statement>, FragmentError> {
    let tokens = tokenize(source)?;
    let mut statements = Vec::new();
    for group in tokens.split(|spanned| spanned.token == Token::End) {
        if group.is_empty() {
            continue;
        }
        statements.push(parse_statement(group)?);
    }
    Ok(statements)
}

fn parse_statement(tokens: &[Spanned]) -> Result<Statement, FragmentError> {
    let position = tokens[0].position;
    let mut parser = ExprParser::new(tokens, position);

    if parser.is_assignment() {
        let variable = parser.expect_ident()?;
        parser.expect(Token::Eq)?;
        let value = parser.parse_expr(0)?;
        parser.expect_end("assignment")?;
        Ok(Statement::Assignment {
            variable,
            value,
            position,
        })
    } else {
        let value = parser.parse_expr(0)?;
        parser.expect_end("expression")?;
        Ok(Statement::Expression { value, position })
    }
}

// ---------------------------------------------------------------------------
// Pratt parser
// ---------------------------------------------------------------------------

struct ExprParser<'t> {
    tokens: &'t [Spanned],
    pos: usize,
    /// Where the statement starts; used when running off the end.
    start: Position,
}

// Binding powers (precedence). Higher = tighter binding.
// Left bp, right bp. For left-assoc: right = left + 1. For right-assoc: right = left.
const BP_CONDITIONAL: u8 = 2; // ? :
const BP_OR: u8 = 4; // ||
const BP_AND: u8 = 6; // &&
const BP_EQUALITY: u8 = 8; // == !=
const BP_COMPARISON: u8 = 10; // < > <= >=
const BP_ADDITIVE: u8 = 12; // + -
const BP_MULTIPLICATIVE: u8 = 14; // * / %
const BP_UNARY: u8 = 16; // ! -

impl<'t> ExprParser<'t> {
    fn new(tokens: &'t [Spanned], start: Position) -> Self {
        ExprParser {
            tokens,
            pos: 0,
            start,
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|spanned| &spanned.token)
    }

    fn position(&self) -> Position {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map(|spanned| spanned.position)
            .unwrap_or(self.start)
    }

    fn advance(&mut self) -> Option<&'t Spanned> {
        let spanned = self.tokens.get(self.pos)?;
        self.pos += 1;
        Some(spanned)
    }

    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn error(&self, msg: impl Into<String>) -> FragmentError {
        FragmentError::syntax(msg, self.position())
    }

    fn expect_ident(&mut self) -> Result<String, FragmentError> {
        match self.advance() {
            Some(Spanned {
                token: Token::Ident(name),
                ..
            }) => Ok(name.clone()),
            _ => Err(self.error("expected identifier")),
        }
    }

    fn expect(&mut self, token: Token) -> Result<(), FragmentError> {
        if self.peek() == Some(&token) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error(format!("expected {:?}", token)))
        }
    }

    fn expect_end(&self, what: &str) -> Result<(), FragmentError> {
        if self.at_end() {
            Ok(())
        } else {
            Err(self.error(format!("unexpected tokens after {}", what)))
        }
    }

    /// ident followed by a single `=`, not `==`.
    fn is_assignment(&self) -> bool {
        if self.tokens.len() < 3 {
            return false;
        }
        matches!(
            (&self.tokens[0].token, &self.tokens[1].token),
            (Token::Ident(_), Token::Eq)
        )
    }

    fn parse_expr(&mut self, min_bp: u8) -> Result<Expr, FragmentError> {
        let mut left = self.parse_prefix()?;

        loop {
            let Some(token) = self.peek() else { break };
            let Some((l_bp, r_bp)) = infix_bp(token) else {
                break;
            };
            if l_bp < min_bp {
                break;
            }

            if *token == Token::Question {
                self.pos += 1;
                let true_branch = self.parse_expr(0)?;
                self.expect(Token::Colon)?;
                let false_branch = self.parse_expr(r_bp)?;
                left = Expr::Conditional {
                    condition: Box::new(left),
                    true_branch: Box::new(true_branch),
                    false_branch: Box::new(false_branch),
                };
                continue;
            }

            let operator = match token {
                Token::Plus => BinaryOperator::Addition,
                Token::Minus => BinaryOperator::Subtraction,
                Token::Star => BinaryOperator::Multiplication,
                Token::Slash => BinaryOperator::Division,
                Token::Percent => BinaryOperator::Modulo,
                Token::EqEq => BinaryOperator::Equality,
                Token::BangEq => BinaryOperator::Inequality,
                Token::Gt => BinaryOperator::GreaterThan,
                Token::Lt => BinaryOperator::LessThan,
                Token::GtEq => BinaryOperator::GreaterThanOrEqual,
                Token::LtEq => BinaryOperator::LessThanOrEqual,
                Token::AmpAmp => BinaryOperator::LogicalAnd,
                Token::PipePipe => BinaryOperator::LogicalOr,
                _ => return Err(self.error("unexpected infix operator")),
            };
            self.pos += 1;
            let right = self.parse_expr(r_bp)?;

            left = Expr::BinaryOperation {
                operator,
                left: Box::new(left),
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn parse_prefix(&mut self) -> Result<Expr, FragmentError> {
        let Some(spanned) = self.advance() else {
            return Err(self.error("unexpected end of expression"));
        };
        let position = spanned.position;

        match &spanned.token {
            Token::Number(n) => Ok(Expr::NumberLiteral(*n)),
            Token::StringLit(s) => Ok(Expr::StringLiteral(s.clone())),
            Token::True => Ok(Expr::BooleanLiteral(true)),
            Token::False => Ok(Expr::BooleanLiteral(false)),

            Token::Ident(name) => {
                if self.peek() == Some(&Token::LParen) {
                    self.pos += 1;
                    let arguments = self.parse_arguments()?;
                    Ok(Expr::Call {
                        function: name.clone(),
                        arguments,
                        position,
                    })
                } else {
                    Ok(Expr::Variable(name.clone(), position))
                }
            }

            Token::Bang => {
                let operand = self.parse_expr(BP_UNARY)?;
                Ok(Expr::UnaryOperation {
                    operator: UnaryOperator::LogicalNot,
                    operand: Box::new(operand),
                })
            }
            Token::Minus => {
                let operand = self.parse_expr(BP_UNARY)?;
                Ok(Expr::UnaryOperation {
                    operator: UnaryOperator::Negation,
                    operand: Box::new(operand),
                })
            }

            Token::LParen => {
                if self.peek() == Some(&Token::RParen) {
                    self.pos += 1;
                    return Ok(Expr::UnitLiteral);
                }
                let expr = self.parse_expr(0)?;
                self.expect(Token::RParen)?;
                Ok(expr)
            }

            other => Err(FragmentError::syntax(
                format!("unexpected token: {:?}", other),
                position,
            )),
        }
    }

    /// Arguments after an opening parenthesis, through the closing one.
    fn parse_arguments(&mut self) -> Result<Vec<Expr>, FragmentError> {
        let mut arguments = Vec::new();
        if self.peek() == Some(&Token::RParen) {
            self.pos += 1;
            return Ok(arguments);
        }
        loop {
            arguments.push(self.parse_expr(0)?);
            match self.peek() {
                Some(Token::Comma) => self.pos += 1,
                Some(Token::RParen) => {
                    self.pos += 1;
                    return Ok(arguments);
                }
                _ => return Err(self.error("expected ',' or ')' in argument list")),
            }
        }
    }
}

/// Infix binding powers: returns (left_bp, right_bp) or None if not infix.
fn infix_bp(token: &Token) -> Option<(u8, u8)> {
    match token {
        Token::Question => Some((BP_CONDITIONAL, BP_CONDITIONAL)),
        Token::PipePipe => Some((BP_OR, BP_OR + 1)),
        Token::AmpAmp => Some((BP_AND, BP_AND + 1)),
        Token::EqEq | Token::BangEq => Some((BP_EQUALITY, BP_EQUALITY + 1)),
        Token::Gt | Token::Lt | Token::GtEq | Token::LtEq => {
            Some((BP_COMPARISON, BP_COMPARISON + 1))
        }
        Token::Plus | Token::Minus => Some((BP_ADDITIVE, BP_ADDITIVE + 1)),
        Token::Star | Token::Slash | Token::Percent => {
            Some((BP_MULTIPLICATIVE, BP_MULTIPLICATIVE + 1))
        }
        _ => None,
    }
}
