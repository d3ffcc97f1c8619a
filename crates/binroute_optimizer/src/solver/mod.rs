pub mod construction;
pub mod extract;
pub mod guided_local_search;
pub mod ls;
pub mod score;
pub mod solution;
pub mod solver;
pub mod solver_manager;
pub mod solver_params;
