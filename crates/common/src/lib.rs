//! Pieces shared by the storage server, its binary and its clients:
//! wire types, logging setup, startup checks, the admin listener and the
//! typed storage client.

pub mod types;
pub mod utils;
pub mod env;
pub mod admin_http;
pub mod client;
