//! Hazard sources - where the hazard zone set comes from.
//!
//! Every backend implements [`HazardSource`]; [`SourceChain`] tries several
//! in priority order so a dead backend degrades to the next one.

pub mod api;
pub mod chain;
pub mod file;
pub mod http;
pub mod records;
pub mod source;

pub use api::ApiSource;
pub use chain::SourceChain;
pub use file::FileSource;
pub use records::RecordsSource;
pub use source::{HazardSource, StaticSource};
