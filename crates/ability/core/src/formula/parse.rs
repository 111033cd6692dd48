//! Tokenizer and recursive-descent parser.

use super::{BinaryOp, Formula, FormulaError};

/// Parentheses and unary minus signs that may enclose one operand.
pub(super) const MAX_NESTING: usize = 64;

#[derive(Clone, Debug, PartialEq)]
enum Token {
    Number(f32),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Token::Number(value) => value.to_string(),
            Token::Ident(name) => name.clone(),
            Token::Plus => "+".into(),
            Token::Minus => "-".into(),
            Token::Star => "*".into(),
            Token::Slash => "/".into(),
            Token::LParen => "(".into(),
            Token::RParen => ")".into(),
        }
    }
}

fn tokenize(text: &str) -> Result<Vec<(usize, Token)>, FormulaError> {
    let mut tokens = Vec::new();
    let mut chars = text.char_indices().peekable();

    while let Some(&(offset, ch)) = chars.peek() {
        let token = match ch {
            c if c.is_whitespace() => {
                chars.next();
                continue;
            }
            '+' => Token::Plus,
            '-' => Token::Minus,
            '*' => Token::Star,
            '/' => Token::Slash,
            '(' => Token::LParen,
            ')' => Token::RParen,
            c if c.is_ascii_digit() || c == '.' => {
                let mut literal = String::new();
                while let Some(&(_, c)) = chars.peek() {
                    if c.is_ascii_digit() || c == '.' {
                        literal.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let value = literal
                    .parse::<f32>()
                    .map_err(|_| FormulaError::InvalidNumber(literal.clone()))?;
                tokens.push((offset, Token::Number(value)));
                continue;
            }
            c if c.is_alphabetic() || c == '_' => {
                let mut name = String::new();
                while let Some(&(_, c)) = chars.peek() {
                    if c.is_alphanumeric() || c == '_' || c == '.' {
                        name.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push((offset, Token::Ident(name)));
                continue;
            }
            other => return Err(FormulaError::UnexpectedChar { ch: other, offset }),
        };
        tokens.push((offset, token));
        chars.next();
    }

    Ok(tokens)
}

pub(super) struct Parser<'a> {
    text: &'a str,
    tokens: Vec<(usize, Token)>,
    pos: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    pub(super) fn new(text: &'a str) -> Self {
        Self {
            text,
            tokens: Vec::new(),
            pos: 0,
            depth: 0,
        }
    }

    pub(super) fn parse(mut self) -> Result<Formula, FormulaError> {
        self.tokens = tokenize(self.text)?;
        let formula = self.expr()?;
        match self.tokens.get(self.pos) {
            None => Ok(formula),
            Some((offset, token)) => Err(FormulaError::UnexpectedToken {
                found: token.describe(),
                offset: *offset,
            }),
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(_, token)| token)
    }

    fn advance(&mut self) -> Option<(usize, Token)> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn enter(&mut self) -> Result<(), FormulaError> {
        if self.depth >= MAX_NESTING {
            return Err(FormulaError::TooDeep { limit: MAX_NESTING });
        }
        self.depth += 1;
        Ok(())
    }

    fn expr(&mut self) -> Result<Formula, FormulaError> {
        let mut lhs = self.term()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Sub,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.term()?;
            lhs = Formula::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
    }

    fn term(&mut self) -> Result<Formula, FormulaError> {
        let mut lhs = self.unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinaryOp::Mul,
                Some(Token::Slash) => BinaryOp::Div,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.unary()?;
            lhs = Formula::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
    }

    fn unary(&mut self) -> Result<Formula, FormulaError> {
        if self.peek() == Some(&Token::Minus) {
            self.pos += 1;
            self.enter()?;
            let inner = self.unary()?;
            self.depth -= 1;
            return Ok(match inner {
                Formula::Number(value) => Formula::Number(-value),
                other => Formula::Neg(Box::new(other)),
            });
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<Formula, FormulaError> {
        match self.advance() {
            Some((_, Token::Number(value))) => Ok(Formula::Number(value)),
            Some((_, Token::Ident(name))) => Ok(Formula::Variable(name)),
            Some((_, Token::LParen)) => {
                self.enter()?;
                let inner = self.expr()?;
                self.depth -= 1;
                match self.advance() {
                    Some((_, Token::RParen)) => Ok(inner),
                    Some((offset, token)) => Err(FormulaError::UnexpectedToken {
                        found: token.describe(),
                        offset,
                    }),
                    None => Err(FormulaError::UnexpectedEnd),
                }
            }
            Some((offset, token)) => Err(FormulaError::UnexpectedToken {
                found: token.describe(),
                offset,
            }),
            None => Err(FormulaError::UnexpectedEnd),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Result<Formula, FormulaError> {
        Parser::new(text).parse()
    }

    #[test]
    fn precedence_binds_multiplication_tighter() {
        let formula = parse("1 + 2 * 3").unwrap();
        assert_eq!(
            formula,
            Formula::Binary {
                op: BinaryOp::Add,
                lhs: Box::new(Formula::Number(1.0)),
                rhs: Box::new(Formula::Binary {
                    op: BinaryOp::Mul,
                    lhs: Box::new(Formula::Number(2.0)),
                    rhs: Box::new(Formula::Number(3.0)),
                }),
            }
        );
    }

    #[test]
    fn negative_literal_folds() {
        assert_eq!(parse("-30").unwrap(), Formula::Number(-30.0));
        assert_eq!(parse("2").unwrap().as_constant(), Some(2.0));
    }

    #[test]
    fn dotted_and_unicode_identifiers() {
        let formula = parse("Caster.Attack * 火球术系数").unwrap();
        assert_eq!(formula.variables(), vec!["Caster.Attack", "火球术系数"]);
    }

    #[test]
    fn nesting_is_bounded() {
        let nested = |levels: usize| format!("{}1{}", "(".repeat(levels), ")".repeat(levels));
        assert_eq!(parse(&nested(MAX_NESTING)).unwrap(), Formula::Number(1.0));
        assert_eq!(
            parse(&nested(100_000)),
            Err(FormulaError::TooDeep { limit: MAX_NESTING })
        );
        assert_eq!(
            parse(&"-".repeat(MAX_NESTING + 1)),
            Err(FormulaError::TooDeep { limit: MAX_NESTING })
        );
    }

    #[test]
    fn syntax_errors_are_reported() {
        assert_eq!(parse("1 +"), Err(FormulaError::UnexpectedEnd));
        assert!(matches!(parse("(1 + 2"), Err(FormulaError::UnexpectedEnd)));
        assert!(matches!(parse("1 2"), Err(FormulaError::UnexpectedToken { .. })));
        assert!(matches!(parse("1 % 2"), Err(FormulaError::UnexpectedChar { ch: '%', .. })));
        assert!(matches!(parse("1.2.3"), Err(FormulaError::InvalidNumber(_))));
        assert_eq!(parse(""), Err(FormulaError::UnexpectedEnd));
    }
}
