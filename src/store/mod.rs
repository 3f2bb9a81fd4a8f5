//! Persistence layer: the `TrendDao` abstraction and its Postgres impl.

pub mod dao;
pub mod dao_impl;
pub mod models;
