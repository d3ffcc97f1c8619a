pub mod error;
pub mod json;
pub mod problem;
pub mod routing;
pub mod solver;
mod utils;

pub use utils::cancellation::CancellationToken;

#[cfg(test)]
pub(crate) mod test_utils;
