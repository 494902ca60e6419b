//! RoomDB – an in-memory store of facts written as short sentences.
//!
//! A fact is a sequence of terms parsed from text such as
//! `#gorilla is a "big" animal`:
//! * identifiers (`#gorilla`) name things and are what retraction by name looks for,
//! * words (`is a`, `animal`) are the free text in between,
//! * literals are numbers, strings, `true`, `false` and `null`,
//! * blob references (`@…`) stand in for structured values kept by id.
//!
//! Patterns add variables (`$who`), the wildcard (`$`), and holes (`_`), which
//! are filled positionally with host values before a pattern is used.
//!
//! ## Modules
//! * [`term`] – The term model, its text form and its JSON wire form.
//! * [`grammar`] – The pest grammar (`fact.pest`), the parse cache and hole filling.
//! * [`unify`] – Matching a pattern against a fact under a persistent environment.
//! * [`fact`] – Stored facts with their asserter and evidence.
//! * [`store`] – The [`store::FactStore`]: assert, retract and the backtracking select.
//! * [`database`] – A shareable, locked store plus the registry of connected clients.
//! * [`client`] – The [`client::Client`] trait, its mutation buffer and the local client.
//! * [`remote`] – A client for a store served over HTTP.
//! * [`server`] – The HTTP routes (`axum`) that serve a [`database::Database`].
//! * [`settings`] – Layered configuration for the server binary.
//!
//! ## Flushing
//! Clients buffer `assert` and `retract`. Nothing reaches the store until
//! `flush_changes`, which applies every pending retraction before every
//! pending assertion.
//!
//! ## Quick Start
//! ```
//! use roomdb::{grammar::parse, store::FactStore};
//! let mut store = FactStore::new();
//! store.assert("me", parse("#gorilla is a big animal").unwrap()).unwrap();
//! store.assert("me", parse("#gazelle is a fast animal").unwrap()).unwrap();
//! let solutions = store.select(&[parse("$who is a $kind animal").unwrap()]).unwrap();
//! assert_eq!(solutions.len(), 2);
//! assert_eq!(solutions[0]["who"].to_string(), "#gorilla");
//! assert_eq!(solutions[1]["kind"].to_string(), "fast");
//! ```

pub mod error;
pub mod term;
pub mod grammar;
pub mod unify;
pub mod fact;
pub mod store;
pub mod database;
pub mod client;
pub mod remote;
pub mod wire;
pub mod server;
pub mod settings;

pub use client::{Client, LocalClient, MutationBuffer, Selection};
pub use database::Database;
pub use error::{Result, RoomError};
pub use fact::Fact;
pub use grammar::Template;
pub use remote::RemoteClient;
pub use store::{FactStore, FlushOutcome, Solution};
pub use term::{IntoTerm, Literal, RawValue, Term};
