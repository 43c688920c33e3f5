//! Recursive-descent expansion of AND/OR search expressions.

use crate::error::{QueryError, Result};
use regex::Regex;
use std::sync::OnceLock;

/// Parsed search expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpressionNode {
    /// One or more words searched together verbatim
    Term(String),
    /// Every combination of one alternative from each child
    And(Vec<ExpressionNode>),
    /// Alternatives from every child
    Or(Vec<ExpressionNode>),
}

impl ExpressionNode {
    /// Enumerate concrete search strings, unsorted and possibly repeated.
    ///
    /// AND is a Cartesian product joined with a single space, left before
    /// right; OR concatenates.
    #[must_use]
    pub fn terms(&self) -> Vec<String> {
        match self {
            Self::Term(term) => vec![term.clone()],
            Self::Or(children) => children.iter().flat_map(Self::terms).collect(),
            Self::And(children) => {
                let mut product = vec![String::new()];
                for child in children {
                    let right = child.terms();
                    product = product
                        .iter()
                        .flat_map(|left| {
                            right.iter().map(move |r| {
                                if left.is_empty() {
                                    r.clone()
                                } else {
                                    format!("{left} {r}")
                                }
                            })
                        })
                        .collect();
                }
                product
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operator {
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token<'a> {
    Open,
    Close,
    Word(&'a str),
}

fn operator(word: &str) -> Option<Operator> {
    match word {
        "E" | "AND" => Some(Operator::And),
        "OU" | "OR" => Some(Operator::Or),
        _ => None,
    }
}

/// Collapse every whitespace run (newlines included) to one space.
fn normalize(expression: &str) -> String {
    static WHITESPACE: OnceLock<Regex> = OnceLock::new();
    let re = WHITESPACE.get_or_init(|| Regex::new(r"\s+").expect("valid regex"));
    re.replace_all(expression, " ").trim().to_string()
}

fn tokenize(expression: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut word_start: Option<usize> = None;

    for (i, c) in expression.char_indices() {
        if c == '(' || c == ')' || c == ' ' {
            if let Some(start) = word_start.take() {
                tokens.push(Token::Word(&expression[start..i]));
            }
            match c {
                '(' => tokens.push(Token::Open),
                ')' => tokens.push(Token::Close),
                _ => {}
            }
        } else if word_start.is_none() {
            word_start = Some(i);
        }
    }
    if let Some(start) = word_start {
        tokens.push(Token::Word(&expression[start..]));
    }
    tokens
}

struct Parser<'a> {
    expression: &'a str,
    tokens: Vec<Token<'a>>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<Token<'a>> {
        self.tokens.get(self.pos).copied()
    }

    fn peek_operator(&self) -> Option<Operator> {
        match self.peek() {
            Some(Token::Word(word)) => operator(word),
            _ => None,
        }
    }

    fn error(&self, reason: impl Into<String>) -> QueryError {
        QueryError::syntax(self.expression, reason)
    }

    fn parse_or(&mut self) -> Result<ExpressionNode> {
        let mut children = vec![self.parse_and()?];
        while self.peek_operator() == Some(Operator::Or) {
            self.pos += 1;
            children.push(self.parse_and()?);
        }
        Ok(collapse(children, ExpressionNode::Or))
    }

    fn parse_and(&mut self) -> Result<ExpressionNode> {
        let mut children = vec![self.parse_primary()?];
        while self.peek_operator() == Some(Operator::And) {
            self.pos += 1;
            children.push(self.parse_primary()?);
        }
        Ok(collapse(children, ExpressionNode::And))
    }

    fn parse_primary(&mut self) -> Result<ExpressionNode> {
        match self.peek() {
            Some(Token::Open) => {
                self.pos += 1;
                let inner = self.parse_or()?;
                if self.peek() != Some(Token::Close) {
                    return Err(self.error("missing closing parenthesis"));
                }
                self.pos += 1;
                Ok(inner)
            }
            Some(Token::Close) => Err(self.error("unexpected ')' where a term was expected")),
            Some(Token::Word(word)) if operator(word).is_some() => {
                Err(self.error(format!("operator '{word}' is missing its left operand")))
            }
            Some(Token::Word(_)) => {
                let mut words = Vec::new();
                while let Some(Token::Word(word)) = self.peek() {
                    if operator(word).is_some() {
                        break;
                    }
                    words.push(word);
                    self.pos += 1;
                }
                Ok(ExpressionNode::Term(words.join(" ")))
            }
            None => Err(self.error("expression ends where a term was expected")),
        }
    }
}

fn collapse(
    mut children: Vec<ExpressionNode>,
    wrap: fn(Vec<ExpressionNode>) -> ExpressionNode,
) -> ExpressionNode {
    if children.len() == 1 {
        children.remove(0)
    } else {
        wrap(children)
    }
}

/// Parse an expression into its tree.
///
/// # Errors
/// Returns [`QueryError::Syntax`] for empty input, `()`, unbalanced
/// parentheses, dangling operators or trailing tokens.
pub fn parse(expression: &str) -> Result<ExpressionNode> {
    let normalized = normalize(expression);

    if normalized.is_empty() {
        return Err(QueryError::syntax(&normalized, "empty expression"));
    }
    if normalized.contains("()") {
        return Err(QueryError::syntax(&normalized, "empty parentheses are not allowed"));
    }
    if normalized.matches('(').count() != normalized.matches(')').count() {
        return Err(QueryError::syntax(&normalized, "unbalanced parentheses"));
    }

    let mut parser = Parser {
        expression: &normalized,
        tokens: tokenize(&normalized),
        pos: 0,
    };
    let tree = parser.parse_or()?;

    if let Some(token) = parser.peek() {
        let found = match token {
            Token::Open => "(".to_string(),
            Token::Close => ")".to_string(),
            Token::Word(word) => word.to_string(),
        };
        return Err(parser.error(format!("unexpected '{found}' after complete expression")));
    }

    tracing::trace!(expression = %normalized, ?tree, "Parsed search expression");
    Ok(tree)
}

/// Expand a boolean search expression into sorted, distinct search strings.
///
/// # Errors
/// Returns [`QueryError::Syntax`] when the expression is malformed.
pub fn expand(expression: &str) -> Result<Vec<String>> {
    let mut terms = parse(expression)?.terms();
    terms.sort();
    terms.dedup();
    Ok(terms)
}
