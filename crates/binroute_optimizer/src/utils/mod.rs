pub mod cancellation;
pub mod newtype_index;
pub mod time;
