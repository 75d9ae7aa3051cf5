pub mod confirm_port;
pub mod extraction_port;
pub mod lakehouse_port;
pub mod table_writer_port;
