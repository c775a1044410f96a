pub mod probe;
pub mod resolver;
pub mod state;

pub use probe::{HttpStreamProbe, StreamProbe};
pub use resolver::SourceResolver;
pub use state::{SourceState, SourceStatus, UriTier};
