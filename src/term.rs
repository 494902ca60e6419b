// ------------- Term -------------
// A fact is a flat sequence of terms. Facts that sit in the store only hold
// identifiers, words, literals and blob references; variables and wildcards
// show up in patterns, and holes only live inside templates until filled.

// used to print out the canonical text of a term
use std::fmt;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::{Result, RoomError};

// ------------- Literal -------------
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Bool(bool),
    Number(f64),
    String(String),
    Null,
}

impl Literal {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Literal::Number(n) => Some(*n),
            _ => None,
        }
    }
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Literal::String(s) => Some(s),
            _ => None,
        }
    }
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Literal::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Literal::Bool(b) => write!(f, "{}", b),
            // -0 and 0 are the same number and must share a key
            Literal::Number(n) if *n == 0.0 => f.write_str("0"),
            Literal::Number(n) => write!(f, "{}", n),
            // only the escapes the grammar reads back
            Literal::String(s) => write!(f, "\"{}\"", s.replace('\n', "\\n").replace('\t', "\\t")),
            Literal::Null => write!(f, "null"),
        }
    }
}

// ------------- Term -------------
#[derive(Debug, Clone, PartialEq)]
pub enum Term {
    Identifier(String),
    Word(String),
    Literal(Literal),
    BlobRef(String),
    Variable(String),
    Wildcard,
    Hole,
}

impl Term {
    pub fn identifier(name: impl Into<String>) -> Self {
        Term::Identifier(name.into())
    }
    pub fn word(text: impl Into<String>) -> Self {
        Term::Word(text.into())
    }
    pub fn variable(name: impl Into<String>) -> Self {
        Term::Variable(name.into())
    }
    pub fn number(n: f64) -> Self {
        Term::Literal(Literal::Number(n))
    }
    pub fn string(s: impl Into<String>) -> Self {
        Term::Literal(Literal::String(s.into()))
    }
    pub fn is_hole(&self) -> bool {
        matches!(self, Term::Hole)
    }
    pub fn is_variable_or_wildcard(&self) -> bool {
        matches!(self, Term::Variable(_) | Term::Wildcard)
    }
    /// Ground terms are the only ones allowed in a stored fact.
    pub fn is_ground(&self) -> bool {
        !matches!(self, Term::Variable(_) | Term::Wildcard | Term::Hole)
    }

    /// Unwraps literals; identifiers, words and blob references come back as
    /// themselves. Variables, wildcards and holes never belong in a solution.
    pub fn to_raw_value(&self) -> Result<RawValue> {
        match self {
            Term::Identifier(name) => Ok(RawValue::Identifier(name.clone())),
            Term::Word(text) => Ok(RawValue::Word(text.clone())),
            Term::Literal(value) => Ok(RawValue::Literal(value.clone())),
            Term::BlobRef(id) => Ok(RawValue::BlobRef(id.clone())),
            Term::Variable(name) => Err(RoomError::MatchFault(format!(
                "variable ${} should never show up in a solution",
                name
            ))),
            Term::Wildcard => Err(RoomError::MatchFault(
                "wildcards should never show up in a solution".into(),
            )),
            Term::Hole => Err(RoomError::MatchFault(
                "holes should never show up in a solution".into(),
            )),
        }
    }

    pub fn to_wire(&self) -> Value {
        let (key, value) = match self {
            Term::Identifier(name) => ("id", Value::String(name.clone())),
            Term::Word(text) => ("word", Value::String(text.clone())),
            Term::Literal(literal) => ("value", literal_to_json(literal)),
            Term::BlobRef(id) => ("blobRef", Value::String(id.clone())),
            Term::Variable(name) => ("variable", Value::String(name.clone())),
            Term::Wildcard => ("wildcard", Value::Bool(true)),
            Term::Hole => ("hole", Value::Bool(true)),
        };
        let mut object = Map::new();
        object.insert(key.to_string(), value);
        Value::Object(object)
    }

    /// Picks the variant by the first recognized key, in the same precedence
    /// the encoder uses.
    pub fn from_wire(json: &Value) -> Result<Term> {
        let unknown = || RoomError::UnknownWireTerm(json.to_string());
        let object = json.as_object().ok_or_else(unknown)?;
        let text = |v: &Value| v.as_str().map(String::from).ok_or_else(unknown);
        if let Some(v) = object.get("id") {
            Ok(Term::Identifier(text(v)?))
        } else if let Some(v) = object.get("word") {
            Ok(Term::Word(text(v)?))
        } else if let Some(v) = object.get("value") {
            Ok(Term::Literal(literal_from_json(v).ok_or_else(unknown)?))
        } else if let Some(v) = object.get("blobRef") {
            Ok(Term::BlobRef(text(v)?))
        } else if let Some(v) = object.get("variable") {
            Ok(Term::Variable(text(v)?))
        } else if object.contains_key("wildcard") {
            Ok(Term::Wildcard)
        } else if object.contains_key("hole") {
            Ok(Term::Hole)
        } else {
            Err(unknown())
        }
    }
}

fn literal_to_json(literal: &Literal) -> Value {
    match literal {
        Literal::Bool(b) => Value::Bool(*b),
        Literal::Number(n) => serde_json::Number::from_f64(*n)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        Literal::String(s) => Value::String(s.clone()),
        Literal::Null => Value::Null,
    }
}

fn literal_from_json(json: &Value) -> Option<Literal> {
    match json {
        Value::Bool(b) => Some(Literal::Bool(*b)),
        Value::Number(n) => n.as_f64().map(Literal::Number),
        Value::String(s) => Some(Literal::String(s.clone())),
        Value::Null => Some(Literal::Null),
        _ => None,
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Term::Identifier(name) => write!(f, "#{}", name),
            Term::Word(text) => f.write_str(text),
            Term::Literal(literal) => write!(f, "{}", literal),
            Term::BlobRef(id) => write!(f, "@{}", id),
            Term::Variable(name) => write!(f, "${}", name),
            Term::Wildcard => f.write_str("$"),
            Term::Hole => f.write_str("_"),
        }
    }
}

impl Serialize for Term {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_wire().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Term {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let json = Value::deserialize(deserializer)?;
        Term::from_wire(&json).map_err(D::Error::custom)
    }
}

/// Renders a term sequence by concatenating each term's text.
pub fn render(terms: &[Term]) -> String {
    terms.iter().map(|term| term.to_string()).collect()
}

// ------------- RawValue -------------
/// What a caller sees for a bound variable once a solution leaves the store.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Identifier(String),
    Word(String),
    Literal(Literal),
    BlobRef(String),
}

impl RawValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            RawValue::Literal(literal) => literal.as_number(),
            _ => None,
        }
    }
    pub fn as_str(&self) -> Option<&str> {
        match self {
            RawValue::Literal(literal) => literal.as_str(),
            _ => None,
        }
    }
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            RawValue::Literal(literal) => literal.as_bool(),
            _ => None,
        }
    }
}

impl PartialEq<f64> for RawValue {
    fn eq(&self, other: &f64) -> bool {
        self.as_number() == Some(*other)
    }
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RawValue::Identifier(name) => write!(f, "#{}", name),
            RawValue::Word(text) => f.write_str(text),
            RawValue::Literal(literal) => write!(f, "{}", literal),
            RawValue::BlobRef(id) => write!(f, "@{}", id),
        }
    }
}

// ------------- Filling holes -------------
/// Converts a filler value into the term that replaces a hole.
/// Terms pass through, booleans, numbers and strings become literals,
/// and anything else becomes an opaque blob reference.
pub trait IntoTerm {
    fn into_term(self) -> Term;
}

impl IntoTerm for Term {
    fn into_term(self) -> Term { self }
}
impl IntoTerm for bool {
    fn into_term(self) -> Term { Term::Literal(Literal::Bool(self)) }
}
// NaN and the infinities have no literal form, so they are kept as blobs.
impl IntoTerm for f64 {
    fn into_term(self) -> Term {
        if self.is_finite() {
            Term::number(self)
        } else {
            blob_ref(&self.to_string())
        }
    }
}
impl IntoTerm for f32 {
    fn into_term(self) -> Term { (self as f64).into_term() }
}
impl IntoTerm for i32 {
    fn into_term(self) -> Term { Term::number(self as f64) }
}
impl IntoTerm for i64 {
    fn into_term(self) -> Term { Term::number(self as f64) }
}
impl IntoTerm for u32 {
    fn into_term(self) -> Term { Term::number(self as f64) }
}
impl IntoTerm for usize {
    fn into_term(self) -> Term { Term::number(self as f64) }
}
impl IntoTerm for &str {
    fn into_term(self) -> Term { Term::string(self) }
}
impl IntoTerm for String {
    fn into_term(self) -> Term { Term::string(self) }
}
impl IntoTerm for Value {
    fn into_term(self) -> Term {
        match self {
            Value::Bool(b) => b.into_term(),
            Value::String(s) => s.into_term(),
            Value::Number(n) => match n.as_f64() {
                Some(f) => f.into_term(),
                None => blob_ref(&n.to_string()),
            },
            other => blob_ref(&other.to_string()),
        }
    }
}

// Opaque values are identified by the hash of their text.
fn blob_ref(text: &str) -> Term {
    Term::BlobRef(blake3::hash(text.as_bytes()).to_hex().to_string())
}
