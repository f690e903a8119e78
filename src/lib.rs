//! LawDecoder - grounded answers to legal questions
//!
//! A retrieval-augmented service that answers plain-language legal
//! questions from a corpus of statute sections.
//!
//! # Overview
//!
//! For each question LawDecoder:
//! - Embeds the question with a local sentence-embedding model
//! - Ranks every statute section by cosine similarity and keeps the top K
//! - Builds a grounded prompt from those sections
//! - Asks a remote chat model for an answer, rotating through a priority list
//!   of models and a pool of API credentials until one succeeds
//!
//! When every model fails the retrieved sections are still returned, flagged
//! as degraded.
//!
//! # Architecture
//!
//! - `config` - Configuration and prompt templates
//! - `corpus` - Loading and building the statute vector file
//! - `embedding` - Embedding generation
//! - `retrieval` - Similarity ranking
//! - `completion` - Model/credential failover for chat completions
//! - `rag` - The answer pipeline
//! - `feedback` - Append-only user feedback log
//! - `orchestrator` - Startup wiring
//!
//! # Example
//!
//! ```rust,no_run
//! use lawdecoder::config::Settings;
//! use lawdecoder::orchestrator::Orchestrator;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let orchestrator = Orchestrator::new(settings)?;
//!
//!     let answer = orchestrator
//!         .pipeline()
//!         .answer("My phone was stolen, what do I do?", 5, &CancellationToken::new())
//!         .await?;
//!     println!("{}", answer.text);
//!
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod completion;
pub mod config;
pub mod corpus;
pub mod embedding;
pub mod error;
pub mod feedback;
pub mod orchestrator;
pub mod rag;
pub mod retrieval;

pub use error::{LawDecoderError, Result};
