//! Upstream API clients used by tools

pub mod graphql;

pub use graphql::GraphqlClient;
