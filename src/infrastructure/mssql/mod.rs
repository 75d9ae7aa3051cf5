pub mod bcp_extraction_adapter;
#[cfg(feature = "odbc")]
pub mod odbc_extraction_adapter;
