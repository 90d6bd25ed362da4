pub mod cleaner;
pub mod config;
pub mod error;
pub mod logging;
pub mod storage;
pub mod table;
