pub mod chunker;
pub mod reader;

pub use chunker::{Chunk, Chunker};
pub use reader::{read_document, DocumentFormat, DocumentMetadata, ParsedDocument};
