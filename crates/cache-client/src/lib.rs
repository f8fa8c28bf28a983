//! Executes GraphQL operations through a [`normalized_cache::Cache`].
//!
//! Every execution computes and marshals its variables, consults the cache according to its
//! [`CachePolicy`], goes to the network when it has to and writes the response back. Its
//! settlements arrive in order on a [`QueryStream`].

mod client;
mod error;
mod execution;
mod options;
mod response;

pub use cache_config::CachePolicy;
pub use client::{Client, ClientBuilder, QueryStream};
pub use error::{ClientError, ErrorCode, GraphqlError};
pub use options::{ExecuteOptions, Variables};
pub use response::{QueryResult, ResultSource};

#[cfg(test)]
mod tests {
    use async_trait as _;
    use bytes as _;
    use futures_util as _;
    use pretty_assertions as _;
}
