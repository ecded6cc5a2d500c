//! Document ingestion: parse uploads, chunk them, embed and index the chunks

mod chunker;
mod parser;
mod processor;

pub use chunker::TextChunker;
pub use parser::{FileParser, ParsedDocument};
pub use processor::IngestPipeline;
