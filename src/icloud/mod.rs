//! Public shared-album access: token partitioning, the two-call shared
//! streams protocol, and best-derivative selection.

pub mod assets;
pub mod error;
pub mod partition;
pub mod responses;
pub mod stream;
pub mod transport;

pub use assets::CandidateSet;
pub use error::StreamError;
pub use partition::ShareToken;
pub use stream::SharedStreamClient;
pub use transport::StreamTransport;
