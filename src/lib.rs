//! Lexrag - Retrieval-Augmented Legal Q&A Core
//!
//! Indexes a corpus of legal documents into an exact vector index, answers
//! questions by combining semantic retrieval with lexical re-ranking and a
//! hosted language model, classifies each exchange into a practice area,
//! and ranks matching professionals for the user.

pub mod category;
pub mod chat;
pub mod chunker;
pub mod cli;
pub mod config;
pub mod embedding;
pub mod error;
pub mod extract;
pub mod index;
pub mod llm;
pub mod matcher;
pub mod retrieval;

pub use error::{LexragError, Result};
