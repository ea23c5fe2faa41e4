pub mod completion;
pub mod embedding;
pub mod expander;
pub mod materializer;
pub mod pipeline;
pub mod planner;
pub mod reindex;
pub mod retriever;
pub mod snippet;
pub mod splitter;
pub mod sync;
pub mod vector_store;

pub use completion::{ChatCompleter, HttpCompletionClient};
pub use embedding::{EmbeddingProvider, HttpEmbeddingClient, InstructionType};
pub use expander::QueryExpander;
pub use materializer::materialize;
pub use pipeline::{IndexPipeline, SearchPipeline};
pub use planner::TextChunkPlanner;
pub use reindex::{ReindexOrchestrator, ReindexReport};
pub use retriever::{MultiQueryRetriever, RetrievalOutcome};
pub use snippet::{build_snippet, extract_keywords};
pub use sync::VectorStoreSynchronizer;
pub use vector_store::{create_backend, VectorStore};
