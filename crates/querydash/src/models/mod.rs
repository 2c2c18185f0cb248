pub mod query_envelope;
pub mod table;

pub use query_envelope::{
    FailureNotice, Notice, QUERY_ENVELOPE_SCHEMA_VERSION, QueryEnvelope,
    QueryEnvelopeCommandFailure,
};
pub use table::QueryResult;
