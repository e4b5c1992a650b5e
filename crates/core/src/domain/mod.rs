mod call_record;
mod customer;

pub use call_record::*;
pub use customer::*;
