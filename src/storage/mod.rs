pub mod object_store;
pub mod table_writer;

pub use object_store::*;
pub use table_writer::*;
