pub mod entities;
pub mod errors;
pub mod naming;
pub mod paths;
