//! HTTP Header Multimap.
//!
//! Names compare case-insensitively and are stored in canonical lowercase.
//! Known names resolve to a fixed identifier with a per-field rule table
//! driving validation; unknown names live in a parallel partition. Insertion
//! order of field occurrences is preserved within each partition.
mod name;
mod value;
mod map;

pub mod error;

pub use error::{HeaderError, InvalidHeaderName, InvalidHeaderValue, Severity};
pub use map::{AsHeaderName, HeaderMap, MessageKind};
pub use name::{HeaderName, standard};
pub use value::HeaderValue;
