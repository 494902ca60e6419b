// ------------- Unification -------------
// Matching a pattern term against a fact term threads an environment of
// variable bindings. Environments are persistent: binding a variable yields
// a new environment that shares its parent, so backtracking can retry a
// sibling branch against the untouched parent.

use indexmap::IndexMap;
use std::sync::Arc;

use crate::error::{Result, RoomError};
use crate::term::Term;

/// Variable name to bound term, in the order the variables were first bound.
pub type Bindings = IndexMap<String, Term>;

#[derive(Debug)]
struct Frame {
    name: String,
    term: Term,
    parent: Option<Arc<Frame>>,
}

#[derive(Debug, Clone, Default)]
pub struct Env {
    head: Option<Arc<Frame>>,
}

impl Env {
    pub fn new() -> Self {
        Self { head: None }
    }
    pub fn lookup(&self, name: &str) -> Option<&Term> {
        let mut frame = self.head.as_deref();
        while let Some(f) = frame {
            if f.name == name {
                return Some(&f.term);
            }
            frame = f.parent.as_deref();
        }
        None
    }
    pub fn bind(&self, name: &str, term: Term) -> Env {
        Env {
            head: Some(Arc::new(Frame {
                name: name.to_string(),
                term,
                parent: self.head.clone(),
            })),
        }
    }
    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }
    pub fn bindings(&self) -> Bindings {
        let mut frames = Vec::new();
        let mut frame = self.head.as_deref();
        while let Some(f) = frame {
            frames.push(f);
            frame = f.parent.as_deref();
        }
        frames
            .into_iter()
            .rev()
            .map(|f| (f.name.clone(), f.term.clone()))
            .collect()
    }
}

/// Matches one pattern term against one fact term. `Ok(None)` is a plain
/// mismatch; a hole on either side is a fault.
pub fn match_term(pattern: &Term, fact: &Term, env: &Env) -> Result<Option<Env>> {
    let matched = match (pattern, fact) {
        (Term::Hole, _) | (_, Term::Hole) => {
            return Err(RoomError::MatchFault(
                "holes should never show up in a query pattern".into(),
            ));
        }
        (Term::Wildcard, _) => true,
        (Term::Variable(name), _) => {
            return match env.lookup(name) {
                None => Ok(Some(env.bind(name, fact.clone()))),
                Some(bound) => match_term(bound, fact, env),
            };
        }
        (Term::Identifier(a), Term::Identifier(b)) => a == b,
        (Term::Word(a), Term::Word(b)) => a == b,
        (Term::Literal(a), Term::Literal(b)) => a == b,
        (Term::BlobRef(a), Term::BlobRef(b)) => a == b,
        _ => false,
    };
    Ok(matched.then(|| env.clone()))
}

/// Matches term by term, stopping at the first failure. Sequences of
/// different length never match.
pub fn match_terms(pattern: &[Term], fact: &[Term], env: &Env) -> Result<Option<Env>> {
    if pattern.len() != fact.len() {
        return Ok(None);
    }
    let mut env = env.clone();
    for (p, f) in pattern.iter().zip(fact) {
        match match_term(p, f, &env)? {
            Some(extended) => env = extended,
            None => return Ok(None),
        }
    }
    Ok(Some(env))
}
