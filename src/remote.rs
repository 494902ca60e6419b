//! A client for a store served over HTTP by [`crate::server`].
//!
//! The remote client buffers exactly like the local one. A flush ships the
//! whole buffer in one `PUT /facts` and clears it only after the server has
//! confirmed the batch, so a failed round trip leaves the mutations pending
//! for the next flush.

use reqwest::Response;
use serde::de::DeserializeOwned;
use std::fmt;
use tracing::debug;

use crate::client::{Client, MutationBuffer, Selection};
use crate::error::{Result, RoomError};
use crate::grammar::{DEFAULT_PARSE_CACHE_CAPACITY, Template};
use crate::store::{FlushOutcome, Solution};
use crate::wire::{ErrorResponse, FlushRequest, FlushResponse, ForgetParams, ForgetResponse, SelectParams, WireSolution};

pub struct RemoteClient {
    http: reqwest::Client,
    base_url: String,
    id: String,
    buffer: MutationBuffer,
}

impl RemoteClient {
    pub fn new(address: &str, port: u16, id: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: format!("http://{}:{}", address, port),
            id: id.into(),
            buffer: MutationBuffer::new(DEFAULT_PARSE_CACHE_CAPACITY),
        }
    }
    pub fn with_parse_cache_capacity(mut self, capacity: usize) -> Self {
        self.buffer = MutationBuffer::new(capacity);
        self
    }
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
    fn facts_url(&self) -> String {
        format!("{}/facts", self.base_url)
    }
    async fn forget(&self, name: Option<&str>) -> Result<usize> {
        let params = ForgetParams {
            client_id: self.id.clone(),
            name: name.map(String::from),
        };
        let response = self.http.delete(self.facts_url()).query(&params).send().await?;
        let body: ForgetResponse = decode(response).await?;
        Ok(body.retracted)
    }
}

// Non-2xx answers carry an `ErrorResponse` body when the server produced them.
async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json::<T>().await?);
    }
    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorResponse>(&text)
        .map(|body| body.error)
        .unwrap_or(text);
    Err(RoomError::Transport(format!("{}: {}", status, message)))
}

impl Client for RemoteClient {
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
        let request = FlushRequest {
            client_id: self.id.clone(),
            retractions: self.buffer.pending_retracts().to_vec(),
            assertions: self.buffer.pending_asserts().to_vec(),
        };
        let response = self.http.put(self.facts_url()).json(&request).send().await?;
        let body: FlushResponse = decode(response).await?;
        debug!(client = %self.id, retracted = body.retracted, asserted = body.asserted, "flushed remotely");
        self.buffer.clear();
        Ok(body.into())
    }

    async fn immediately_retract_everything_about(&mut self, name: &str) -> Result<usize> {
        self.forget(Some(name)).await
    }

    async fn immediately_retract_everything_asserted_by_me(&mut self) -> Result<usize> {
        self.forget(None).await
    }

    async fn select<I>(&mut self, patterns: I) -> Result<Selection>
    where
        I: IntoIterator,
        I::Item: Into<Template>,
    {
        let patterns = self.buffer.materialize_patterns(patterns)?;
        let params = SelectParams {
            query: serde_json::to_string(&patterns).map_err(|e| RoomError::Transport(e.to_string()))?,
        };
        let response = self.http.get(self.facts_url()).query(&params).send().await?;
        let solutions: Vec<WireSolution> = decode(response).await?;
        let solutions = solutions
            .iter()
            .map(Solution::from_bindings)
            .collect::<Result<Vec<_>>>()?;
        Ok(Selection::new(solutions))
    }

    async fn get_all_facts(&mut self) -> Result<Vec<String>> {
        let response = self.http.get(format!("{}/all", self.facts_url())).send().await?;
        decode(response).await
    }
}

impl fmt::Display for RemoteClient {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "[RemoteClient {}, {}]", self.base_url, self.id)
    }
}
