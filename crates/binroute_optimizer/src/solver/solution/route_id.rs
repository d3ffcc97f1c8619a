use crate::{
    define_index_newtype, problem::vehicle::VehicleIdx, solver::solution::route::SolutionRoute,
};

define_index_newtype!(RouteIdx, SolutionRoute);

// Routes are created one per vehicle, in fleet order
impl From<VehicleIdx> for RouteIdx {
    fn from(vehicle_id: VehicleIdx) -> Self {
        RouteIdx(vehicle_id.get())
    }
}

impl From<RouteIdx> for VehicleIdx {
    fn from(route_id: RouteIdx) -> Self {
        VehicleIdx::new(route_id.get())
    }
}
