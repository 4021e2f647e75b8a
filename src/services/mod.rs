//! Service layer for schemals
//!
//! Document storage, the decoder seam and its built-in implementation, and
//! the engine-to-protocol converters.

pub mod converters;
pub mod decoder;
pub mod documents;
pub mod schema;
pub mod schema_decoder;

pub use decoder::{Decoder, DecoderFinder};
pub use documents::{Document, DocumentStore, InMemoryDocumentStore};
pub use schema::Schema;
pub use schema_decoder::{CoreSchema, SchemaDecoder, SchemaDecoderFinder};
