//! Arithmetic formulas over sibling fields: `$price * $quantity + 5`.

use super::EvalError;
use crate::row::Row;

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Field(String),
    Op(char),
    Open,
    Close,
}

fn tokenize(input: &str) -> Result<Vec<Token>, String> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        match c {
            ' ' | '\t' | '\n' => i += 1,
            '+' | '-' | '*' | '/' | '%' => {
                tokens.push(Token::Op(c));
                i += 1;
            }
            '(' => {
                tokens.push(Token::Open);
                i += 1;
            }
            ')' => {
                tokens.push(Token::Close);
                i += 1;
            }
            '$' => {
                let start = i + 1;
                let mut end = start;
                while end < chars.len() && (chars[end].is_alphanumeric() || chars[end] == '_') {
                    end += 1;
                }
                if end == start {
                    return Err(format!("empty field reference at position {i}"));
                }
                tokens.push(Token::Field(chars[start..end].iter().collect()));
                i = end;
            }
            c if c.is_ascii_digit() || c == '.' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let literal: String = chars[start..i].iter().collect();
                let number = literal
                    .parse::<f64>()
                    .map_err(|_| format!("invalid number '{literal}'"))?;
                tokens.push(Token::Number(number));
            }
            other => return Err(format!("unexpected character '{other}'")),
        }
    }
    Ok(tokens)
}

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Number(f64),
    Field(String),
    Neg(Box<Expr>),
    Binary(char, Box<Expr>, Box<Expr>),
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn expr(&mut self) -> Result<Expr, String> {
        let mut left = self.term()?;
        while let Some(Token::Op(op @ ('+' | '-'))) = self.peek() {
            let op = *op;
            self.pos += 1;
            let right = self.term()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn term(&mut self) -> Result<Expr, String> {
        let mut left = self.factor()?;
        while let Some(Token::Op(op @ ('*' | '/' | '%'))) = self.peek() {
            let op = *op;
            self.pos += 1;
            let right = self.factor()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn factor(&mut self) -> Result<Expr, String> {
        match self.next() {
            Some(Token::Number(n)) => Ok(Expr::Number(n)),
            Some(Token::Field(name)) => Ok(Expr::Field(name)),
            Some(Token::Op('-')) => Ok(Expr::Neg(Box::new(self.factor()?))),
            Some(Token::Op('+')) => self.factor(),
            Some(Token::Open) => {
                let inner = self.expr()?;
                match self.next() {
                    Some(Token::Close) => Ok(inner),
                    _ => Err("missing ')'".to_string()),
                }
            }
            Some(other) => Err(format!("unexpected token {other:?}")),
            None => Err("unexpected end of formula".to_string()),
        }
    }
}

/// A parsed formula.
#[derive(Debug, Clone, PartialEq)]
pub struct Formula {
    expr: Expr,
    fields: Vec<String>,
}

impl Formula {
    pub fn parse(input: &str) -> Result<Self, String> {
        let tokens = tokenize(input)?;
        let fields = tokens
            .iter()
            .filter_map(|t| match t {
                Token::Field(name) => Some(name.clone()),
                _ => None,
            })
            .collect();
        let mut parser = Parser { tokens, pos: 0 };
        let expr = parser.expr()?;
        if parser.pos < parser.tokens.len() {
            return Err(format!(
                "unexpected trailing input at token {}",
                parser.pos + 1
            ));
        }
        Ok(Self { expr, fields })
    }

    pub fn references(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(String::as_str)
    }

    pub fn evaluate(&self, row: &Row) -> Result<f64, EvalError> {
        eval(&self.expr, row)
    }

    /// Evaluate and render: integral results print without a fraction.
    pub fn evaluate_to_string(&self, row: &Row) -> Result<String, EvalError> {
        let value = self.evaluate(row)?;
        if value.fract() == 0.0 && value.abs() < 1e15 {
            Ok(format!("{}", value as i64))
        } else {
            Ok(value.to_string())
        }
    }
}

fn eval(expr: &Expr, row: &Row) -> Result<f64, EvalError> {
    match expr {
        Expr::Number(n) => Ok(*n),
        Expr::Field(name) => {
            let value = row
                .get(name)
                .ok_or_else(|| EvalError::MissingValue(name.clone()))?;
            value.as_f64().ok_or_else(|| EvalError::NotNumeric {
                field: name.clone(),
                value: value.render(),
            })
        }
        Expr::Neg(inner) => Ok(-eval(inner, row)?),
        Expr::Binary(op, left, right) => {
            let l = eval(left, row)?;
            let r = eval(right, row)?;
            match op {
                '+' => Ok(l + r),
                '-' => Ok(l - r),
                '*' => Ok(l * r),
                '/' | '%' if r == 0.0 => Err(EvalError::DivisionByZero),
                '/' => Ok(l / r),
                _ => Ok(l % r),
            }
        }
    }
}
