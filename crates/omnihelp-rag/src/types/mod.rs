//! Core types for the query pipeline

pub mod chunk;
pub mod document;
pub mod order;
pub mod query;
pub mod response;
pub mod routing;

pub use chunk::{Context, RetrievedChunk};
pub use document::{DocumentInfo, DocumentType, DocumentUploadResponse};
pub use order::{Customer, CustomerCreate, Order, OrderCreate, OrderItem};
pub use query::{ChatRequest, Filters, Query, QueryRequest};
pub use response::{Answer, ChatResponse, Metadata, QueryResponse, Row, StructuredQueryResult};
pub use routing::{Intent, Route, RoutingDecision, SearchStrategy};
