pub mod cache;
pub mod cost_matrix;
pub mod distance_matrix_api;
pub mod error;
pub mod geodesic;
pub mod travel_matrix_client;
pub mod travel_matrix_provider;
