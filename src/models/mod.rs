pub mod records;
pub mod rows;

pub use records::*;
pub use rows::*;
