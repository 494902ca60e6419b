//! Clients buffer mutations and apply them in one flush.
//!
//! `assert` and `retract` parse and fill their templates right away but only
//! record the result in a [`MutationBuffer`]. Nothing reaches the store until
//! [`Client::flush_changes`], which applies every pending retraction and then
//! every pending assertion. A retract and an assert of the same fact in one
//! batch therefore leave the fact in place.
//!
//! [`LocalClient`] talks to an in-process [`Database`]; the remote variant
//! lives in [`crate::remote`].

use std::fmt;
use std::sync::Arc;
use tracing::debug;

use crate::database::Database;
use crate::error::{Result, RoomError};
use crate::fact::{Fact, has_holes, is_ground};
use crate::grammar::{ParseCache, Template, materialize};
use crate::store::{FlushOutcome, Solution};
use crate::term::{Term, render};

// ------------- MutationBuffer -------------
#[derive(Debug)]
pub struct MutationBuffer {
    parse_cache: ParseCache,
    asserts: Vec<Vec<Term>>,
    retracts: Vec<Vec<Term>>,
}
impl MutationBuffer {
    pub fn new(parse_cache_capacity: usize) -> Self {
        Self {
            parse_cache: ParseCache::with_capacity(parse_cache_capacity),
            asserts: Vec::new(),
            retracts: Vec::new(),
        }
    }
    pub fn materialize(&mut self, template: &Template) -> Result<Vec<Term>> {
        materialize(&mut self.parse_cache, template)
    }
    pub fn materialize_all<I>(&mut self, templates: I) -> Result<Vec<Vec<Term>>>
    where
        I: IntoIterator,
        I::Item: Into<Template>,
    {
        templates
            .into_iter()
            .map(|template| self.materialize(&template.into()))
            .collect()
    }
    /// Buffers a fact; it must be ground once its holes are filled.
    pub fn push_assert(&mut self, template: &Template) -> Result<()> {
        let fact = self.materialize(template)?;
        if !is_ground(&fact) {
            return Err(RoomError::UngroundedAssert(render(&fact)));
        }
        self.asserts.push(fact);
        Ok(())
    }
    /// Materializes a pattern for retraction or select. A hole left in it,
    /// for instance one filled with `Term::Hole`, is refused here.
    pub fn materialize_pattern(&mut self, template: &Template) -> Result<Vec<Term>> {
        let pattern = self.materialize(template)?;
        if has_holes(&pattern) {
            return Err(RoomError::MatchFault(format!(
                "holes should never show up in a pattern: {}",
                render(&pattern)
            )));
        }
        Ok(pattern)
    }
    pub fn materialize_patterns<I>(&mut self, templates: I) -> Result<Vec<Vec<Term>>>
    where
        I: IntoIterator,
        I::Item: Into<Template>,
    {
        templates
            .into_iter()
            .map(|template| self.materialize_pattern(&template.into()))
            .collect()
    }
    pub fn push_retract(&mut self, template: &Template) -> Result<()> {
        let pattern = self.materialize_pattern(template)?;
        self.retracts.push(pattern);
        Ok(())
    }
    pub fn pending_asserts(&self) -> &[Vec<Term>] {
        &self.asserts
    }
    pub fn pending_retracts(&self) -> &[Vec<Term>] {
        &self.retracts
    }
    pub fn has_pending(&self) -> bool {
        !self.asserts.is_empty() || !self.retracts.is_empty()
    }
    /// Drops both pending lists. Called only once a flush went through.
    pub fn clear(&mut self) {
        self.asserts.clear();
        self.retracts.clear();
    }
    pub fn parse_cache(&self) -> &ParseCache {
        &self.parse_cache
    }
    pub fn clear_parse_cache(&mut self) {
        self.parse_cache.clear();
    }
}

// ------------- Selection -------------
/// The solutions of one select, in discovery order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Selection {
    solutions: Vec<Solution>,
}
impl Selection {
    pub fn new(solutions: Vec<Solution>) -> Self {
        Self { solutions }
    }
    pub fn count(&self) -> usize {
        self.solutions.len()
    }
    pub fn is_empty(&self) -> bool {
        self.solutions.is_empty()
    }
    pub fn is_not_empty(&self) -> bool {
        !self.solutions.is_empty()
    }
    pub fn iter(&self) -> std::slice::Iter<'_, Solution> {
        self.solutions.iter()
    }
    pub fn solutions(&self) -> &[Solution] {
        &self.solutions
    }
}
impl IntoIterator for Selection {
    type Item = Solution;
    type IntoIter = std::vec::IntoIter<Solution>;
    fn into_iter(self) -> Self::IntoIter {
        self.solutions.into_iter()
    }
}
impl<'a> IntoIterator for &'a Selection {
    type Item = &'a Solution;
    type IntoIter = std::slice::Iter<'a, Solution>;
    fn into_iter(self) -> Self::IntoIter {
        self.solutions.iter()
    }
}

// ------------- Client -------------
#[allow(async_fn_in_trait)]
pub trait Client {
    fn id(&self) -> &str;
    fn buffer(&self) -> &MutationBuffer;
    fn buffer_mut(&mut self) -> &mut MutationBuffer;

    /// Buffers an assertion. Nothing changes until the next flush.
    fn assert(&mut self, fact: impl Into<Template>) -> Result<&mut Self> {
        self.buffer_mut().push_assert(&fact.into())?;
        Ok(self)
    }

    /// Buffers a retraction. Nothing changes until the next flush.
    fn retract(&mut self, pattern: impl Into<Template>) -> Result<&mut Self> {
        self.buffer_mut().push_retract(&pattern.into())?;
        Ok(self)
    }

    /// Applies pending retractions, then pending assertions, and clears the
    /// buffer once they are applied.
    async fn flush_changes(&mut self) -> Result<FlushOutcome>;

    async fn immediately_assert(&mut self, fact: impl Into<Template>) -> Result<FlushOutcome> {
        self.assert(fact)?;
        self.flush_changes().await
    }

    async fn immediately_retract(&mut self, pattern: impl Into<Template>) -> Result<FlushOutcome> {
        self.retract(pattern)?;
        self.flush_changes().await
    }

    async fn immediately_retract_everything_about(&mut self, name: &str) -> Result<usize>;

    async fn immediately_retract_everything_asserted_by_me(&mut self) -> Result<usize>;

    async fn select<I>(&mut self, patterns: I) -> Result<Selection>
    where
        I: IntoIterator,
        I::Item: Into<Template>;

    async fn get_all_facts(&mut self) -> Result<Vec<String>>;

    fn clear_parse_cache(&mut self) -> &mut Self {
        self.buffer_mut().clear_parse_cache();
        self
    }
}

// ------------- LocalClient -------------
pub struct LocalClient {
    db: Database,
    id: String,
    buffer: MutationBuffer,
}

impl LocalClient {
    pub(crate) fn new(db: Database, id: String, parse_cache_capacity: usize) -> Self {
        Self {
            db,
            id,
            buffer: MutationBuffer::new(parse_cache_capacity),
        }
    }

    /// Asserts a fact right away, bypassing the buffer, and cites the given
    /// stored facts as its evidence. If the evidence is rejected the fact
    /// stays asserted without evidence.
    pub fn assert_with_evidence<I>(&mut self, fact: impl Into<Template>, evidence: I) -> Result<Arc<Fact>>
    where
        I: IntoIterator,
        I::Item: Into<Template>,
    {
        let fact = self.buffer.materialize(&fact.into())?;
        let evidence = self.buffer.materialize_all(evidence)?;
        let mut store = self.db.store()?;
        store.assert(&self.id, fact)?.with_evidence(evidence)
    }

    /// Gives the id back to the database.
    pub fn disconnect(self) -> Result<bool> {
        self.db.disconnect(&self.id)
    }
}

impl Client for LocalClient {
    fn id(&self) -> &str {
        &self.id
    }
    fn buffer(&self) -> &MutationBuffer {
        &self.buffer
    }
    fn buffer_mut(&mut self) -> &mut MutationBuffer {
        &mut self.buffer
    }

    async fn flush_changes(&mut self) -> Result<FlushOutcome> {
        if !self.buffer.has_pending() {
            return Ok(FlushOutcome::default());
        }
        let outcome = self.db.apply(
            &self.id,
            self.buffer.pending_retracts(),
            self.buffer.pending_asserts().to_vec(),
        )?;
        debug!(client = %self.id, retracted = outcome.retracted, asserted = outcome.asserted, "flushed");
        self.buffer.clear();
        Ok(outcome)
    }

    async fn immediately_retract_everything_about(&mut self, name: &str) -> Result<usize> {
        self.db.retract_everything_about(name)
    }

    async fn immediately_retract_everything_asserted_by_me(&mut self) -> Result<usize> {
        self.db.retract_everything_asserted_by(&self.id)
    }

    async fn select<I>(&mut self, patterns: I) -> Result<Selection>
    where
        I: IntoIterator,
        I::Item: Into<Template>,
    {
        let patterns = self.buffer.materialize_patterns(patterns)?;
        Ok(Selection::new(self.db.select(&patterns)?))
    }

    async fn get_all_facts(&mut self) -> Result<Vec<String>> {
        self.db.all_facts()
    }
}

impl fmt::Display for LocalClient {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "[LocalClient {}]", self.id)
    }
}
