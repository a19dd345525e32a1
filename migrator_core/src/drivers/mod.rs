//! Per-dialect implementations of [`crate::connection::Connection`] and
//! [`crate::connection::AsyncConnection`] (§4.9 "driver/connection factory").
//!
//! Each submodule is gated behind the Cargo feature of the same name; the
//! orchestrator only ever sees the two traits, never these concrete types.

#[cfg(feature = "postgres")]
pub mod postgres;

#[cfg(feature = "rusqlite")]
pub mod sqlite;

#[cfg(feature = "mssql")]
pub mod mssql;
