//! # Content Expressions
//!
//! Every non-leaf node type declares which children it accepts with a small
//! expression language:
//!
//! ```text
//! block+                 one or more nodes of group "block"
//! inline*                any number of inline nodes
//! heading paragraph*     a heading followed by paragraphs
//! (paragraph | list)+    alternation inside a group
//! list_item{1,3}         bounded repetition
//! ```
//!
//! Names resolve to either a node type or a group. Resolution is supplied
//! by the caller (the schema), so this module knows nothing about types.

use crate::error::ContentExprError;
use logos::Logos;
use std::collections::BTreeSet;
use std::fmt;

/// Tokens of the content expression language
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\n\r]+")]
pub enum Token<'src> {
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_-]*", |lex| lex.slice())]
    Name(&'src str),

    #[regex(r"[0-9]+", |lex| lex.slice().parse::<usize>().ok())]
    Number(usize),

    #[token("(")]
    LParen,

    #[token(")")]
    RParen,

    #[token("|")]
    Pipe,

    #[token("*")]
    Star,

    #[token("+")]
    Plus,

    #[token("?")]
    Question,

    #[token("{")]
    LBrace,

    #[token("}")]
    RBrace,

    #[token(",")]
    Comma,
}

impl<'src> fmt::Display for Token<'src> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Name(n) => write!(f, "name '{}'", n),
            Token::Number(n) => write!(f, "number {}", n),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::Pipe => write!(f, "|"),
            Token::Star => write!(f, "*"),
            Token::Plus => write!(f, "+"),
            Token::Question => write!(f, "?"),
            Token::LBrace => write!(f, "{{"),
            Token::RBrace => write!(f, "}}"),
            Token::Comma => write!(f, ","),
        }
    }
}

/// Tokenize a content expression, failing on the first unrecognized input
pub fn tokenize(source: &str) -> Result<Vec<(Token<'_>, std::ops::Range<usize>)>, ContentExprError> {
    let mut tokens = Vec::new();
    for (result, span) in Token::lexer(source).spanned() {
        match result {
            Ok(token) => tokens.push((token, span)),
            Err(()) => {
                return Err(ContentExprError::unexpected_token(
                    source,
                    span.start,
                    format!("'{}'", &source[span]),
                ))
            }
        }
    }
    Ok(tokens)
}

/// Parsed content expression
#[derive(Debug, Clone, PartialEq)]
pub enum ContentExpr {
    /// A node type or group name
    Name(String),

    /// Terms that must appear in order
    Seq(Vec<ContentExpr>),

    /// Any one of the alternatives
    Choice(Vec<ContentExpr>),

    /// Repetition with inclusive bounds (`max: None` is unbounded)
    Repeat {
        expr: Box<ContentExpr>,
        min: usize,
        max: Option<usize>,
    },
}

impl ContentExpr {
    /// Parse an expression. An empty (or all-whitespace) expression accepts no children.
    pub fn parse(source: &str) -> Result<Self, ContentExprError> {
        let tokens = tokenize(source)?;
        if tokens.is_empty() {
            return Ok(ContentExpr::Seq(Vec::new()));
        }

        let mut parser = Parser {
            source,
            tokens,
            pos: 0,
        };
        let expr = parser.parse_expr()?;

        if let Some((token, span)) = parser.peek() {
            return Err(ContentExprError::unexpected_token(source, span.start, token.to_string()));
        }

        Ok(expr)
    }

    /// All type/group names referenced by the expression
    pub fn names(&self) -> BTreeSet<&str> {
        let mut out = BTreeSet::new();
        self.collect_names(&mut out);
        out
    }

    fn collect_names<'a>(&'a self, out: &mut BTreeSet<&'a str>) {
        match self {
            ContentExpr::Name(name) => {
                out.insert(name.as_str());
            }
            ContentExpr::Seq(items) | ContentExpr::Choice(items) => {
                for item in items {
                    item.collect_names(out);
                }
            }
            ContentExpr::Repeat { expr, .. } => expr.collect_names(out),
        }
    }

    /// Check whether `children` (type names, in order) satisfy the expression.
    ///
    /// `is_match(pattern, type_name)` decides whether a referenced name
    /// accepts a concrete type.
    pub fn matches<F>(&self, children: &[&str], is_match: &F) -> bool
    where
        F: Fn(&str, &str) -> bool,
    {
        self.ends(children, 0, is_match).contains(&children.len())
    }

    /// Every position the expression can finish at when starting from `start`
    fn ends<F>(&self, children: &[&str], start: usize, is_match: &F) -> BTreeSet<usize>
    where
        F: Fn(&str, &str) -> bool,
    {
        match self {
            ContentExpr::Name(name) => {
                let mut out = BTreeSet::new();
                if start < children.len() && is_match(name, children[start]) {
                    out.insert(start + 1);
                }
                out
            }
            ContentExpr::Seq(items) => {
                let mut current = BTreeSet::from([start]);
                for item in items {
                    current = current
                        .iter()
                        .flat_map(|&s| item.ends(children, s, is_match))
                        .collect();
                    if current.is_empty() {
                        break;
                    }
                }
                current
            }
            ContentExpr::Choice(options) => options
                .iter()
                .flat_map(|option| option.ends(children, start, is_match))
                .collect(),
            ContentExpr::Repeat { expr, min, max } => {
                let mut results = BTreeSet::new();
                let mut frontier = BTreeSet::from([start]);
                let mut count = 0usize;

                loop {
                    if count >= *min {
                        // Only positions reached for the first time keep expanding,
                        // so expressions that can match nothing still terminate.
                        frontier.retain(|p| results.insert(*p));
                    }
                    if frontier.is_empty() || max.is_some_and(|m| count >= m) {
                        break;
                    }
                    frontier = frontier
                        .iter()
                        .flat_map(|&s| expr.ends(children, s, is_match))
                        .collect();
                    count += 1;
                }

                results
            }
        }
    }

    /// Minimal sequence of concrete type names that satisfies the expression.
    ///
    /// `pick(pattern)` returns a type that can be created without input for
    /// a referenced name, or `None` when no such type exists.
    pub fn fill<F>(&self, pick: &F) -> Option<Vec<String>>
    where
        F: Fn(&str) -> Option<String>,
    {
        match self {
            ContentExpr::Name(name) => pick(name).map(|t| vec![t]),
            ContentExpr::Seq(items) => {
                let mut out = Vec::new();
                for item in items {
                    out.extend(item.fill(pick)?);
                }
                Some(out)
            }
            ContentExpr::Choice(options) => options.iter().find_map(|option| option.fill(pick)),
            ContentExpr::Repeat { expr, min, .. } => {
                if *min == 0 {
                    return Some(Vec::new());
                }
                let once = expr.fill(pick)?;
                Some(once.iter().cloned().cycle().take(once.len() * min).collect())
            }
        }
    }
}

/// Recursive-descent parser over the token list
struct Parser<'src> {
    source: &'src str,
    tokens: Vec<(Token<'src>, std::ops::Range<usize>)>,
    pos: usize,
}

impl<'src> Parser<'src> {
    fn peek(&self) -> Option<&(Token<'src>, std::ops::Range<usize>)> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token<'src>> {
        let token = self.tokens.get(self.pos).map(|(t, _)| t.clone());
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn match_token(&mut self, expected: &Token<'src>) -> bool {
        if matches!(self.peek(), Some((t, _)) if t == expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: Token<'src>) -> Result<(), ContentExprError> {
        match self.peek() {
            Some((token, _)) if *token == expected => {
                self.pos += 1;
                Ok(())
            }
            Some((token, span)) => Err(ContentExprError::unexpected_token(
                self.source,
                span.start,
                token.to_string(),
            )),
            None => Err(ContentExprError::unexpected_end(self.source)),
        }
    }

    fn expect_number(&mut self) -> Result<usize, ContentExprError> {
        match self.peek() {
            Some((Token::Number(n), _)) => {
                let n = *n;
                self.pos += 1;
                Ok(n)
            }
            Some((token, span)) => Err(ContentExprError::unexpected_token(
                self.source,
                span.start,
                token.to_string(),
            )),
            None => Err(ContentExprError::unexpected_end(self.source)),
        }
    }

    /// expr := seq ('|' seq)*
    fn parse_expr(&mut self) -> Result<ContentExpr, ContentExprError> {
        let mut options = vec![self.parse_seq()?];
        while self.match_token(&Token::Pipe) {
            options.push(self.parse_seq()?);
        }

        Ok(if options.len() == 1 {
            options.remove(0)
        } else {
            ContentExpr::Choice(options)
        })
    }

    /// seq := term+
    fn parse_seq(&mut self) -> Result<ContentExpr, ContentExprError> {
        let mut terms = Vec::new();
        while matches!(self.peek(), Some((Token::Name(_) | Token::LParen, _))) {
            terms.push(self.parse_term()?);
        }

        match terms.len() {
            0 => match self.peek() {
                Some((token, span)) => Err(ContentExprError::unexpected_token(
                    self.source,
                    span.start,
                    token.to_string(),
                )),
                None => Err(ContentExprError::unexpected_end(self.source)),
            },
            1 => Ok(terms.remove(0)),
            _ => Ok(ContentExpr::Seq(terms)),
        }
    }

    /// term := atom ('*' | '+' | '?' | '{n}' | '{n,}' | '{n,m}')?
    fn parse_term(&mut self) -> Result<ContentExpr, ContentExprError> {
        let atom = self.parse_atom()?;

        let (min, max) = if self.match_token(&Token::Star) {
            (0, None)
        } else if self.match_token(&Token::Plus) {
            (1, None)
        } else if self.match_token(&Token::Question) {
            (0, Some(1))
        } else if self.match_token(&Token::LBrace) {
            let min = self.expect_number()?;
            let max = if self.match_token(&Token::Comma) {
                if matches!(self.peek(), Some((Token::Number(_), _))) {
                    Some(self.expect_number()?)
                } else {
                    None
                }
            } else {
                Some(min)
            };
            self.expect(Token::RBrace)?;

            if let Some(max) = max {
                if max < min {
                    return Err(ContentExprError::InvalidRange {
                        expr: self.source.to_string(),
                        min,
                        max,
                    });
                }
            }
            (min, max)
        } else {
            return Ok(atom);
        };

        Ok(ContentExpr::Repeat {
            expr: Box::new(atom),
            min,
            max,
        })
    }

    /// atom := name | '(' expr ')'
    fn parse_atom(&mut self) -> Result<ContentExpr, ContentExprError> {
        match self.advance() {
            Some(Token::Name(name)) => Ok(ContentExpr::Name(name.to_string())),
            Some(Token::LParen) => {
                let expr = self.parse_expr()?;
                self.expect(Token::RParen)?;
                Ok(expr)
            }
            Some(token) => {
                let start = self.tokens[self.pos - 1].1.start;
                Err(ContentExprError::unexpected_token(self.source, start, token.to_string()))
            }
            None => Err(ContentExprError::unexpected_end(self.source)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exact(pattern: &str, type_name: &str) -> bool {
        pattern == type_name || (pattern == "block" && matches!(type_name, "paragraph" | "heading"))
    }

    #[test]
    fn test_tokenize_symbols() {
        let tokens = tokenize("(paragraph | heading)+ list{1,3}").unwrap();
        let kinds: Vec<_> = tokens.into_iter().map(|(t, _)| t).collect();

        assert_eq!(kinds[0], Token::LParen);
        assert_eq!(kinds[1], Token::Name("paragraph"));
        assert_eq!(kinds[2], Token::Pipe);
        assert_eq!(kinds[5], Token::Plus);
        assert_eq!(kinds[7], Token::LBrace);
        assert_eq!(kinds[8], Token::Number(1));
    }

    #[test]
    fn test_tokenize_rejects_unknown_characters() {
        let err = tokenize("block+ %").unwrap_err();
        assert!(matches!(err, ContentExprError::UnexpectedToken { pos: 7, .. }));
    }

    #[test]
    fn test_parse_repeat_forms() {
        assert_eq!(
            ContentExpr::parse("block+").unwrap(),
            ContentExpr::Repeat {
                expr: Box::new(ContentExpr::Name("block".into())),
                min: 1,
                max: None
            }
        );
        assert_eq!(
            ContentExpr::parse("item{2,}").unwrap(),
            ContentExpr::Repeat {
                expr: Box::new(ContentExpr::Name("item".into())),
                min: 2,
                max: None
            }
        );
        assert!(matches!(
            ContentExpr::parse("item{3,1}"),
            Err(ContentExprError::InvalidRange { min: 3, max: 1, .. })
        ));
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            ContentExpr::parse("(paragraph"),
            Err(ContentExprError::UnexpectedEnd { .. })
        ));
        assert!(matches!(
            ContentExpr::parse("paragraph )"),
            Err(ContentExprError::UnexpectedToken { .. })
        ));
        assert!(matches!(ContentExpr::parse("| a"), Err(ContentExprError::UnexpectedToken { .. })));
    }

    #[test]
    fn test_empty_expression_accepts_nothing() {
        let expr = ContentExpr::parse("  ").unwrap();
        assert!(expr.matches(&[], &exact));
        assert!(!expr.matches(&["paragraph"], &exact));
    }

    #[test]
    fn test_matching_sequences_and_groups() {
        let expr = ContentExpr::parse("heading paragraph*").unwrap();
        assert!(expr.matches(&["heading"], &exact));
        assert!(expr.matches(&["heading", "paragraph", "paragraph"], &exact));
        assert!(!expr.matches(&["paragraph"], &exact));

        let blocks = ContentExpr::parse("block+").unwrap();
        assert!(blocks.matches(&["paragraph", "heading"], &exact));
        assert!(!blocks.matches(&[], &exact));
        assert!(!blocks.matches(&["text"], &exact));
    }

    #[test]
    fn test_matching_needs_backtracking() {
        // The greedy reading of `paragraph*` would swallow the final paragraph.
        let expr = ContentExpr::parse("paragraph* paragraph").unwrap();
        assert!(expr.matches(&["paragraph", "paragraph"], &exact));
        assert!(!expr.matches(&[], &exact));
    }

    #[test]
    fn test_nested_empty_repeat_terminates() {
        let expr = ContentExpr::parse("(paragraph*)*").unwrap();
        assert!(expr.matches(&[], &exact));
        assert!(expr.matches(&["paragraph", "paragraph"], &exact));
    }

    #[test]
    fn test_bounded_repeat() {
        let expr = ContentExpr::parse("paragraph{1,2}").unwrap();
        assert!(expr.matches(&["paragraph"], &exact));
        assert!(expr.matches(&["paragraph", "paragraph"], &exact));
        assert!(!expr.matches(&["paragraph", "paragraph", "paragraph"], &exact));
    }

    #[test]
    fn test_fill_picks_minimal_sequence() {
        let pick = |name: &str| match name {
            "block" => Some("paragraph".to_string()),
            "heading" => Some("heading".to_string()),
            _ => None,
        };

        let expr = ContentExpr::parse("heading block+ block*").unwrap();
        assert_eq!(expr.fill(&pick), Some(vec!["heading".to_string(), "paragraph".to_string()]));

        let expr = ContentExpr::parse("item+").unwrap();
        assert_eq!(expr.fill(&pick), None);

        let expr = ContentExpr::parse("(item | block){2}").unwrap();
        assert_eq!(expr.fill(&pick), Some(vec!["paragraph".to_string(), "paragraph".to_string()]));
    }

    #[test]
    fn test_names() {
        let expr = ContentExpr::parse("heading (block | list)*").unwrap();
        let names: Vec<_> = expr.names().into_iter().collect();
        assert_eq!(names, vec!["block", "heading", "list"]);
    }
}
