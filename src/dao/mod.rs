/// League table storage backends.
pub mod league_store;
/// Typed league records and the row codec.
pub mod models;
/// Storage abstraction layer errors.
pub mod storage;
/// Table names, cells and rectangular table data.
pub mod table;
