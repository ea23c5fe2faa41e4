//! Chunking, indexing, and retrieval pipeline for knowledge-base documents.
//!
//! This crate turns free-form document text into offset-addressable chunks,
//! embeds and stores those chunks in a vector index, and retrieves the most
//! relevant chunks for a natural-language query. It is a library invoked by a
//! surrounding service: the HTTP layer, authentication, and document CRUD live
//! elsewhere and talk to this crate through the ports in [`services`] and
//! [`store`].
//!
//! Write path: content → [`services::TextChunkPlanner`] →
//! [`services::materialize`] → embedding → [`services::VectorStoreSynchronizer`].
//!
//! Read path: query → [`services::QueryExpander`] →
//! [`services::MultiQueryRetriever`] → [`services::build_snippet`].

pub mod error;
pub mod models;
pub mod services;
pub mod store;
pub mod utils;

pub use error::{ChunkPlanError, IngestError, ReindexError, SearchError, SyncError};
pub use models::{ChunkBoundary, ChunkMaterial, Config, RetrievalMatch, StoredChunk};
pub use services::{IndexPipeline, ReindexOrchestrator, SearchPipeline};
