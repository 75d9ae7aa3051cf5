pub mod delta_table_writer;
