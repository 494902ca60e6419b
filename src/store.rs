//! The fact store and its query engine.
//!
//! [`FactStore`] is a set of ground facts keyed by canonical text and kept in
//! insertion order. Reads go through [`FactStore::select`], a backtracking
//! nested-loop join that tries every stored fact for each pattern in the order
//! the patterns were given. There is no reordering and no indexing.

use indexmap::IndexMap;
use std::fmt;
use std::ops::Index;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::{Result, RoomError};
use crate::fact::{Fact, has_holes, has_variables_or_wildcards, is_ground};
use crate::grammar::OtherHasher;
use crate::term::{RawValue, Term, render};
use crate::unify::{Bindings, Env, match_terms};

// ------------- Solution -------------
/// One answer to a select: variable name to raw value, in binding order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Solution {
    values: IndexMap<String, RawValue>,
}
impl Solution {
    pub fn from_bindings(bindings: &Bindings) -> Result<Self> {
        let values = bindings
            .iter()
            .map(|(name, term)| Ok((name.clone(), term.to_raw_value()?)))
            .collect::<Result<_>>()?;
        Ok(Self { values })
    }
    pub fn get(&self, name: &str) -> Option<&RawValue> {
        self.values.get(name)
    }
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }
    pub fn iter(&self) -> impl Iterator<Item = (&str, &RawValue)> {
        self.values.iter().map(|(name, value)| (name.as_str(), value))
    }
    pub fn len(&self) -> usize {
        self.values.len()
    }
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
/// # Panics
/// Panics if `name` is not bound in this solution; use [`Solution::get`] to check.
impl Index<&str> for Solution {
    type Output = RawValue;
    fn index(&self, name: &str) -> &RawValue {
        &self.values[name]
    }
}

/// Counts from applying one batch of buffered mutations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FlushOutcome {
    pub retracted: usize,
    pub asserted: usize,
}

// ------------- FactStore -------------
#[derive(Debug, Default)]
pub struct FactStore {
    facts: IndexMap<String, Arc<Fact>, OtherHasher>,
}

impl FactStore {
    pub fn new() -> Self {
        Self {
            facts: IndexMap::default(),
        }
    }
    pub fn len(&self) -> usize {
        self.facts.len()
    }
    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }
    pub fn facts(&self) -> impl Iterator<Item = &Arc<Fact>> {
        self.facts.values()
    }
    pub fn get(&self, canonical_text: &str) -> Option<&Arc<Fact>> {
        self.facts.get(canonical_text)
    }
    /// Canonical text of every stored fact, in store order.
    pub fn all_facts(&self) -> Vec<String> {
        self.facts.keys().cloned().collect()
    }

    /// Joins the patterns against the store and returns raw solutions.
    pub fn select(&self, patterns: &[Vec<Term>]) -> Result<Vec<Solution>> {
        self.select_bindings(patterns)?
            .iter()
            .map(Solution::from_bindings)
            .collect()
    }

    /// Like [`FactStore::select`] but keeps the bound terms, which is what
    /// travels over the wire.
    pub fn select_bindings(&self, patterns: &[Vec<Term>]) -> Result<Vec<Bindings>> {
        let mut solutions = Vec::new();
        self.collect_solutions(patterns, &Env::new(), &mut solutions)?;
        Ok(solutions.iter().map(Env::bindings).collect())
    }

    fn collect_solutions(&self, patterns: &[Vec<Term>], env: &Env, solutions: &mut Vec<Env>) -> Result<()> {
        let Some((pattern, rest)) = patterns.split_first() else {
            solutions.push(env.clone());
            return Ok(());
        };
        for fact in self.facts.values() {
            if let Some(extended) = match_terms(pattern, fact.terms(), env)? {
                self.collect_solutions(rest, &extended, solutions)?;
            }
        }
        Ok(())
    }

    /// Stores a ground fact under its canonical text. An identical fact that
    /// is already stored keeps its position but takes the new asserter and
    /// loses its evidence.
    pub fn assert(&mut self, asserter: &str, terms: Vec<Term>) -> Result<Assertion<'_>> {
        if !is_ground(&terms) {
            return Err(RoomError::UngroundedAssert(render(&terms)));
        }
        let fact = Fact::new(terms, asserter);
        let key = fact.canonical_text();
        debug!(asserter, fact = %key, "assert");
        self.facts.insert(key.clone(), Arc::new(fact));
        Ok(Assertion { store: self, key })
    }

    /// Removes the exact fact for a ground pattern, or every matching fact
    /// when the pattern has variables or wildcards. Returns the number removed.
    pub fn retract(&mut self, pattern: &[Term]) -> Result<usize> {
        if has_holes(pattern) {
            return Err(RoomError::MatchFault(format!(
                "holes should never show up in a retraction: {}",
                render(pattern)
            )));
        }
        if !has_variables_or_wildcards(pattern) {
            let removed = self.facts.shift_remove(&render(pattern)).is_some();
            debug!(pattern = %render(pattern), removed, "retract");
            return Ok(usize::from(removed));
        }
        let mut doomed = Vec::new();
        for (key, fact) in &self.facts {
            if match_terms(pattern, fact.terms(), &Env::new())?.is_some() {
                doomed.push(key.clone());
            }
        }
        debug!(pattern = %render(pattern), removed = doomed.len(), "retract");
        Ok(self.remove_all(&doomed))
    }

    /// Removes every fact that mentions the identifier `name` anywhere.
    pub fn retract_everything_about(&mut self, name: &str) -> usize {
        let doomed: Vec<String> = self
            .facts
            .iter()
            .filter(|(_, fact)| fact.mentions(name))
            .map(|(key, _)| key.clone())
            .collect();
        debug!(name, removed = doomed.len(), "retract everything about");
        self.remove_all(&doomed)
    }

    pub fn retract_everything_asserted_by(&mut self, asserter: &str) -> usize {
        let doomed: Vec<String> = self
            .facts
            .iter()
            .filter(|(_, fact)| fact.asserter() == asserter)
            .map(|(key, _)| key.clone())
            .collect();
        debug!(asserter, removed = doomed.len(), "retract everything asserted by");
        self.remove_all(&doomed)
    }

    /// Applies a batch the way a flush does: retractions first, then
    /// assertions. The whole batch is validated before anything changes.
    pub fn apply(&mut self, asserter: &str, retractions: &[Vec<Term>], assertions: Vec<Vec<Term>>) -> Result<FlushOutcome> {
        if let Some(pattern) = retractions.iter().find(|pattern| has_holes(pattern)) {
            return Err(RoomError::MatchFault(format!(
                "holes should never show up in a retraction: {}",
                render(pattern)
            )));
        }
        if let Some(fact) = assertions.iter().find(|fact| !is_ground(fact)) {
            return Err(RoomError::UngroundedAssert(render(fact)));
        }
        let mut outcome = FlushOutcome::default();
        for pattern in retractions {
            outcome.retracted += self.retract(pattern)?;
        }
        for fact in assertions {
            self.assert(asserter, fact)?;
            outcome.asserted += 1;
        }
        Ok(outcome)
    }

    fn remove_all(&mut self, keys: &[String]) -> usize {
        keys.iter()
            .filter(|key| self.facts.shift_remove(key.as_str()).is_some())
            .count()
    }
}

impl fmt::Display for FactStore {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let lines: Vec<String> = self
            .facts
            .values()
            .map(|fact| format!("<{}> {}", fact.asserter(), fact))
            .collect();
        write!(f, "{}", lines.join("\n"))
    }
}

// ------------- Assertion -------------
/// Returned by [`FactStore::assert`] so evidence can be attached to the fact
/// that was just stored.
pub struct Assertion<'s> {
    store: &'s mut FactStore,
    key: String,
}
impl Assertion<'_> {
    pub fn key(&self) -> &str {
        &self.key
    }
    pub fn fact(&self) -> Option<&Arc<Fact>> {
        self.store.get(&self.key)
    }
    /// Replaces the fact's evidence. Every item must be ground and already
    /// stored; otherwise nothing changes and all offending items are reported.
    pub fn with_evidence(self, evidence: Vec<Vec<Term>>) -> Result<Arc<Fact>> {
        let with_variables: Vec<String> = evidence
            .iter()
            .filter(|terms| !is_ground(terms))
            .map(|terms| render(terms))
            .collect();
        let missing: Vec<String> = evidence
            .iter()
            .filter(|terms| is_ground(terms))
            .map(|terms| render(terms))
            .filter(|text| !self.store.facts.contains_key(text))
            .collect();
        if !with_variables.is_empty() || !missing.is_empty() {
            warn!(fact = %self.key, ?with_variables, ?missing, "rejected evidence");
            return Err(RoomError::InvalidEvidence { with_variables, missing });
        }
        let cited: Vec<Arc<Fact>> = evidence
            .iter()
            .filter_map(|terms| self.store.facts.get(&render(terms)).cloned())
            .collect();
        let fact = self
            .store
            .facts
            .get(&self.key)
            .ok_or_else(|| RoomError::MatchFault(format!("asserted fact {} vanished", self.key)))?;
        let updated = Arc::new(fact.with_evidence(cited));
        self.store.facts.insert(self.key.clone(), Arc::clone(&updated));
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::parse;

    fn store_with(facts: &[&str]) -> FactStore {
        let mut store = FactStore::new();
        for fact in facts {
            store.assert("tester", parse(fact).unwrap()).unwrap();
        }
        store
    }

    fn patterns(texts: &[&str]) -> Vec<Vec<Term>> {
        texts.iter().map(|text| parse(text).unwrap()).collect()
    }

    #[test]
    fn assert_is_idempotent_by_canonical_text() {
        let mut store = store_with(&["#a is red", "#b is blue"]);
        store.assert("other", parse("#a  is   red").unwrap()).unwrap();
        assert_eq!(store.all_facts(), vec!["#a is red", "#b is blue"]);
        assert_eq!(store.get("#a is red").unwrap().asserter(), "other");
    }

    #[test]
    fn assert_rejects_variables_and_wildcards() {
        let mut store = FactStore::new();
        for text in ["$x is red", "$ is red"] {
            let err = store.assert("tester", parse(text).unwrap()).err().unwrap();
            assert!(matches!(err, RoomError::UngroundedAssert(_)));
        }
        assert!(store.is_empty());
    }

    #[test]
    fn exact_retract_of_absent_fact_is_a_no_op() {
        let mut store = store_with(&["#a is red"]);
        assert_eq!(store.retract(&parse("#a is blue").unwrap()).unwrap(), 0);
        assert_eq!(store.all_facts(), vec!["#a is red"]);
        assert_eq!(store.retract(&parse("#a is red").unwrap()).unwrap(), 1);
        assert!(store.is_empty());
    }

    #[test]
    fn pattern_retract_removes_every_match() {
        let mut store = store_with(&["1 is a number", "#x is a thing", "2 is a number", "3 is a number"]);
        assert_eq!(store.retract(&parse("$n is a number").unwrap()).unwrap(), 3);
        assert_eq!(store.all_facts(), vec!["#x is a thing"]);
    }

    #[test]
    fn select_joins_in_pattern_order() {
        let store = store_with(&[
            "#a is at 1",
            "#b is at 2",
            "#a is red",
            "#b is red",
            "#c is red",
        ]);
        let solutions = store
            .select(&patterns(&["$o is red", "$o is at $p"]))
            .unwrap();
        assert_eq!(solutions.len(), 2);
        assert_eq!(solutions[0]["o"], RawValue::Identifier("a".into()));
        assert_eq!(solutions[0]["p"], 1.0);
        assert_eq!(solutions[1]["o"], RawValue::Identifier("b".into()));
        assert_eq!(solutions[1]["p"], 2.0);
    }

    #[test]
    fn select_enumerates_the_cross_product() {
        let store = store_with(&["1 is a number", "2 is a number"]);
        let solutions = store
            .select(&patterns(&["$x is a number", "$y is a number"]))
            .unwrap();
        let pairs: Vec<(f64, f64)> = solutions
            .iter()
            .map(|s| (s["x"].as_number().unwrap(), s["y"].as_number().unwrap()))
            .collect();
        assert_eq!(pairs, vec![(1.0, 1.0), (1.0, 2.0), (2.0, 1.0), (2.0, 2.0)]);
    }

    #[test]
    fn select_without_patterns_has_one_empty_solution() {
        let store = store_with(&["#a is red"]);
        let solutions = store.select(&[]).unwrap();
        assert_eq!(solutions.len(), 1);
        assert!(solutions[0].is_empty());
    }

    #[test]
    fn wildcards_stay_out_of_solutions() {
        let store = store_with(&["#a is at 1"]);
        let solutions = store.select(&patterns(&["$ is at $where"])).unwrap();
        assert_eq!(solutions.len(), 1);
        assert_eq!(solutions[0].names().collect::<Vec<_>>(), vec!["where"]);
    }

    #[test]
    fn unfilled_hole_in_select_is_a_fault() {
        let store = store_with(&["#a is at 1"]);
        let err = store.select(&patterns(&["_ is at 1"])).unwrap_err();
        assert!(matches!(err, RoomError::MatchFault(_)));
    }

    #[test]
    fn retract_everything_about_an_identifier() {
        let mut store = store_with(&["#a likes #b", "#b likes #c", "#c is alone", "a is a word"]);
        assert_eq!(store.retract_everything_about("b"), 2);
        assert_eq!(store.all_facts(), vec!["#c is alone", "a is a word"]);
        assert_eq!(store.retract_everything_about("nobody"), 0);
    }

    #[test]
    fn retract_everything_asserted_by_a_client() {
        let mut store = FactStore::new();
        store.assert("lola", parse("#a is red").unwrap()).unwrap();
        store.assert("remoto", parse("#b is red").unwrap()).unwrap();
        store.assert("lola", parse("#c is red").unwrap()).unwrap();
        assert_eq!(store.retract_everything_asserted_by("lola"), 2);
        assert_eq!(store.all_facts(), vec!["#b is red"]);
    }

    #[test]
    fn evidence_must_be_stored_and_ground() {
        let mut store = store_with(&["#a saw #b"]);
        let err = store
            .assert("tester", parse("#b was seen").unwrap())
            .unwrap()
            .with_evidence(patterns(&["#a saw #b", "#c saw #b", "$x saw #b"]))
            .unwrap_err();
        match err {
            RoomError::InvalidEvidence { with_variables, missing } => {
                assert_eq!(with_variables, vec!["$x saw #b"]);
                assert_eq!(missing, vec!["#c saw #b"]);
            }
            other => panic!("unexpected error {other}"),
        }
        // the fact stays, without evidence
        assert!(store.get("#b was seen").unwrap().evidence().is_empty());

        let fact = store
            .assert("tester", parse("#b was seen").unwrap())
            .unwrap()
            .with_evidence(patterns(&["#a saw #b"]))
            .unwrap();
        assert_eq!(fact.evidence().len(), 1);
        assert_eq!(fact.evidence()[0].canonical_text(), "#a saw #b");
        assert_eq!(store.get("#b was seen").unwrap().evidence().len(), 1);
    }

    #[test]
    fn reassert_resets_evidence_and_keeps_position() {
        let mut store = store_with(&["#a saw #b", "#b was seen", "#z is last"]);
        store
            .assert("tester", parse("#b was seen").unwrap())
            .unwrap()
            .with_evidence(patterns(&["#a saw #b"]))
            .unwrap();
        store.assert("again", parse("#b was seen").unwrap()).unwrap();
        let fact = store.get("#b was seen").unwrap();
        assert!(fact.evidence().is_empty());
        assert_eq!(fact.asserter(), "again");
        assert_eq!(store.all_facts(), vec!["#a saw #b", "#b was seen", "#z is last"]);
    }

    #[test]
    fn apply_retracts_before_asserting() {
        let mut store = store_with(&["#gorog is at 40, 50"]);
        let outcome = store
            .apply(
                "tester",
                &patterns(&["#gorog is at 40, 50"]),
                patterns(&["#gorog is at 40, 50"]),
            )
            .unwrap();
        assert_eq!(outcome, FlushOutcome { retracted: 1, asserted: 1 });
        assert_eq!(store.all_facts(), vec!["#gorog is at 40, 50"]);
    }

    #[test]
    fn apply_validates_the_whole_batch_first() {
        let mut store = store_with(&["#a is red"]);
        let err = store
            .apply("tester", &patterns(&["#a is red"]), patterns(&["#b is blue", "$c is green"]))
            .unwrap_err();
        assert!(matches!(err, RoomError::UngroundedAssert(_)));
        assert_eq!(store.all_facts(), vec!["#a is red"]);
    }

    #[test]
    fn display_lists_asserters() {
        let mut store = FactStore::new();
        store.assert("Lola", parse("the answer is 42").unwrap()).unwrap();
        store.assert("MrRemoto", parse("blah blah").unwrap()).unwrap();
        assert_eq!(store.to_string(), "<Lola> the answer is 42\n<MrRemoto> blah blah");
    }
}
