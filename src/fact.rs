// --------------- Fact ----------------
use std::fmt;
use std::sync::Arc;

use crate::term::{Term, render};

/// A ground term sequence as it sits in the store, together with the client
/// that asserted it and the stored facts it cites as evidence.
#[derive(Debug, Clone, PartialEq)]
pub struct Fact {
    terms: Vec<Term>,
    asserter: String,
    evidence: Vec<Arc<Fact>>,
}
impl Fact {
    pub fn new(terms: Vec<Term>, asserter: impl Into<String>) -> Self {
        Self {
            terms,
            asserter: asserter.into(),
            evidence: Vec::new(),
        }
    }
    // Facts are never edited once stored, attaching evidence yields a new fact.
    pub fn with_evidence(&self, evidence: Vec<Arc<Fact>>) -> Self {
        Self {
            terms: self.terms.clone(),
            asserter: self.asserter.clone(),
            evidence,
        }
    }
    pub fn terms(&self) -> &[Term] {
        &self.terms
    }
    pub fn asserter(&self) -> &str {
        &self.asserter
    }
    pub fn evidence(&self) -> &[Arc<Fact>] {
        &self.evidence
    }
    /// The store key: each term's text, concatenated.
    pub fn canonical_text(&self) -> String {
        render(&self.terms)
    }
    pub fn mentions(&self, name: &str) -> bool {
        self.terms
            .iter()
            .any(|term| matches!(term, Term::Identifier(n) if n == name))
    }
}
impl fmt::Display for Fact {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.canonical_text())
    }
}

pub fn has_variables_or_wildcards(terms: &[Term]) -> bool {
    terms.iter().any(Term::is_variable_or_wildcard)
}

pub fn has_holes(terms: &[Term]) -> bool {
    terms.iter().any(Term::is_hole)
}

pub fn is_ground(terms: &[Term]) -> bool {
    terms.iter().all(Term::is_ground)
}
