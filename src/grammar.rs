//! Turns fact and pattern text into term sequences.
//!
//! The grammar itself lives in `fact.pest`. On top of the raw parser this
//! module offers a bounded [`ParseCache`] and hole filling through
//! [`Template`] and [`materialize`].

use pest::Parser;
use pest::iterators::Pair;
use pest_derive::Parser;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::error::{Result, RoomError};
use crate::term::{IntoTerm, Literal, Term};

// fast hashing for the cache keys
use core::hash::BuildHasherDefault;
use seahash::SeaHasher;

pub type OtherHasher = BuildHasherDefault<SeaHasher>;

pub const DEFAULT_PARSE_CACHE_CAPACITY: usize = 1000;

#[derive(Parser)]
#[grammar = "fact.pest"]
struct FactParser;

/// Parses a fact or pattern.
pub fn parse(text: &str) -> Result<Vec<Term>> {
    parse_rule(text, Rule::fact_or_pattern)
}

/// Parses the whitespace-trimmed `text` with the given entry rule.
pub fn parse_rule(text: &str, rule: Rule) -> Result<Vec<Term>> {
    let parse_error = |message: String| RoomError::Parse {
        rule: format!("{:?}", rule),
        input: text.to_string(),
        message,
    };
    let mut pairs = FactParser::parse(rule, text.trim()).map_err(|e| parse_error(e.to_string()))?;
    let top = pairs
        .next()
        .ok_or_else(|| parse_error("empty parse".to_string()))?;
    let mut terms = Vec::new();
    for pair in top.into_inner() {
        if pair.as_rule() == Rule::EOI {
            continue;
        }
        terms.push(build_term(pair).map_err(parse_error)?);
    }
    Ok(terms)
}

fn build_term(pair: Pair<Rule>) -> std::result::Result<Term, String> {
    let term = match pair.as_rule() {
        Rule::identifier => Term::Identifier(inner_text(pair)),
        Rule::variable => Term::Variable(inner_text(pair)),
        Rule::wildcard => Term::Wildcard,
        Rule::hole => Term::Hole,
        Rule::true_literal => Term::Literal(Literal::Bool(true)),
        Rule::false_literal => Term::Literal(Literal::Bool(false)),
        Rule::null_literal => Term::Literal(Literal::Null),
        Rule::number => {
            let n = pair
                .as_str()
                .parse::<f64>()
                .map_err(|e| format!("bad number {}: {}", pair.as_str(), e))?;
            if !n.is_finite() {
                return Err(format!("number out of range: {}", pair.as_str()));
            }
            Term::number(n)
        }
        Rule::string => Term::string(unescape(&inner_text(pair))),
        Rule::space => Term::word(" "),
        Rule::word => Term::word(pair.as_str()),
        other => return Err(format!("unexpected {:?}", other)),
    };
    Ok(term)
}

fn inner_text(pair: Pair<Rule>) -> String {
    pair.into_inner()
        .next()
        .map(|inner| inner.as_str().to_string())
        .unwrap_or_default()
}

// Only \n and \t are escapes, any other backslash is kept as written.
fn unescape(body: &str) -> String {
    let mut unescaped = String::with_capacity(body.len());
    let mut chars = body.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.peek() {
                Some('n') => {
                    chars.next();
                    unescaped.push('\n');
                }
                Some('t') => {
                    chars.next();
                    unescaped.push('\t');
                }
                _ => unescaped.push(c),
            }
        } else {
            unescaped.push(c);
        }
    }
    unescaped
}

// ------------- ParseCache -------------
/// Remembers parsed term sequences by source text. Sequences are handed out
/// as shared immutable slices, so filling holes never touches a cached entry.
/// Once the cache grows past its capacity it is cleared wholesale.
#[derive(Debug)]
pub struct ParseCache {
    kept: HashMap<String, Arc<[Term]>, OtherHasher>,
    capacity: usize,
}
impl ParseCache {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_PARSE_CACHE_CAPACITY)
    }
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            kept: HashMap::default(),
            capacity,
        }
    }
    pub fn parse(&mut self, text: &str) -> Result<Arc<[Term]>> {
        if let Some(terms) = self.kept.get(text) {
            return Ok(Arc::clone(terms));
        }
        if self.kept.len() > self.capacity {
            debug!(entries = self.kept.len(), "parse cache full, clearing");
            self.clear();
        }
        let terms: Arc<[Term]> = parse(text)?.into();
        self.kept.insert(text.to_string(), Arc::clone(&terms));
        Ok(terms)
    }
    pub fn clear(&mut self) {
        self.kept.clear();
    }
    pub fn len(&self) -> usize {
        self.kept.len()
    }
    pub fn is_empty(&self) -> bool {
        self.kept.is_empty()
    }
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
impl Default for ParseCache {
    fn default() -> Self {
        Self::new()
    }
}

// ------------- Template -------------
/// Fact or pattern text together with the values that fill its holes, left to right.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    text: String,
    fillers: Vec<Term>,
}
impl Template {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            fillers: Vec::new(),
        }
    }
    pub fn fill(mut self, value: impl IntoTerm) -> Self {
        self.fillers.push(value.into_term());
        self
    }
    pub fn text(&self) -> &str {
        &self.text
    }
    pub fn fillers(&self) -> &[Term] {
        &self.fillers
    }
}
impl From<&str> for Template {
    fn from(text: &str) -> Self {
        Template::new(text)
    }
}
impl From<String> for Template {
    fn from(text: String) -> Self {
        Template::new(text)
    }
}
impl From<&String> for Template {
    fn from(text: &String) -> Self {
        Template::new(text.as_str())
    }
}
impl From<&Template> for Template {
    fn from(template: &Template) -> Self {
        template.clone()
    }
}

/// Parses the template and replaces every hole, in order, with the next filler.
/// The number of fillers must match the number of holes exactly.
pub fn materialize(cache: &mut ParseCache, template: &Template) -> Result<Vec<Term>> {
    let parsed = cache.parse(template.text())?;
    let holes = parsed.iter().filter(|term| term.is_hole()).count();
    if holes != template.fillers().len() {
        return Err(RoomError::Arity {
            holes,
            fillers: template.fillers().len(),
        });
    }
    let mut fillers = template.fillers().iter();
    let terms = parsed
        .iter()
        .map(|term| match term {
            Term::Hole => fillers.next().cloned().unwrap_or(Term::Hole),
            other => other.clone(),
        })
        .collect();
    Ok(terms)
}
