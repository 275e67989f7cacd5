pub mod actions;
pub mod db;
pub mod dispatcher;
pub mod error;
pub mod result;
pub mod session;
pub mod sql;
pub mod storage;
pub mod types;
