pub mod amount;
pub mod location;
pub mod vehicle;
pub mod vehicle_routing_problem;
