//! Retrieval coordinator: picks semantic or keyword scoring per query,
//! ranks the index and shapes the answer for the API layer.

pub mod context;
pub mod rank;
pub mod response;
pub mod retriever;

pub use context::RetrievalContext;
pub use rank::rank;
pub use response::{HealthReport, QueryResponse, ResponseStatus, ResultItem};
pub use retriever::{Retrieval, Retriever};
