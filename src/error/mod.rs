pub mod cinwiki;

pub use cinwiki::{
    ClientError, ConfigError, FetchError, FrameError, LoggingError, MalformedResponse, QueryError,
    ServerError,
};
