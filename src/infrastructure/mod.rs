pub mod delta;
pub mod mssql;
pub mod onelake;
pub mod terminal;
