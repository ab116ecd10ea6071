//! Pack optimizer over TCP.
//!
//! A line protocol in the style of memcached: `pack <quantity>`, `sizes`,
//! `set_sizes <size>...` and `quit`, each terminated by CRLF. Pack sizes are
//! kept by a [`provider::CatalogProvider`] and orders are planned with
//! [`pack_engine`].

mod connection;
mod protocol;
pub mod provider;
pub mod server;
pub mod service;
