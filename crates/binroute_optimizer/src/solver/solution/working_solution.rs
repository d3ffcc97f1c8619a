use std::sync::Arc;

use binroute_matrix_providers::cost_matrix::Cost;
use fixedbitset::FixedBitSet;

use crate::{
    problem::{
        location::LocationIdx, vehicle::VehicleIdx,
        vehicle_routing_problem::VehicleRoutingProblem,
    },
    solver::{
        score::Score,
        solution::{route::SolutionRoute, route_id::RouteIdx},
    },
};

/// One route per vehicle plus the set of pickups no route visits.
#[derive(Clone)]
pub struct WorkingSolution {
    problem: Arc<VehicleRoutingProblem>,
    routes: Vec<SolutionRoute>,
    /// Indexed by location, the depot bit is never set
    unassigned: FixedBitSet,
}

impl WorkingSolution {
    pub fn new(problem: Arc<VehicleRoutingProblem>) -> Self {
        let routes = VehicleIdx::range(problem.vehicles().len())
            .map(|vehicle_id| SolutionRoute::empty(&problem, vehicle_id))
            .collect();

        let mut unassigned = FixedBitSet::with_capacity(problem.num_locations());
        unassigned.insert_range(1..problem.num_locations());

        WorkingSolution {
            problem,
            routes,
            unassigned,
        }
    }

    pub fn problem(&self) -> &VehicleRoutingProblem {
        &self.problem
    }

    pub fn shared_problem(&self) -> &Arc<VehicleRoutingProblem> {
        &self.problem
    }

    pub fn routes(&self) -> &[SolutionRoute] {
        &self.routes
    }

    pub fn route(&self, route_id: RouteIdx) -> &SolutionRoute {
        &self.routes[route_id]
    }

    pub fn non_empty_routes_iter(&self) -> impl Iterator<Item = &SolutionRoute> {
        self.routes.iter().filter(|route| !route.is_empty())
    }

    pub fn unassigned_iter(&self) -> impl Iterator<Item = LocationIdx> + '_ {
        self.unassigned.ones().map(LocationIdx::new)
    }

    pub fn unassigned_count(&self) -> usize {
        self.unassigned.count_ones(..)
    }

    pub fn has_unassigned(&self) -> bool {
        !self.unassigned.is_clear()
    }

    pub fn is_unassigned(&self, location_id: LocationIdx) -> bool {
        self.unassigned.contains(location_id.get())
    }

    pub fn total_cost(&self) -> Cost {
        self.routes.iter().map(|route| route.cost()).sum()
    }

    pub fn score(&self) -> Score {
        Score::new(self.unassigned_count(), self.total_cost())
    }

    pub fn is_empty(&self) -> bool {
        self.routes.iter().all(|route| route.is_empty())
    }

    /// Inserts an unassigned pickup into a route.
    pub(crate) fn insert(&mut self, route_id: RouteIdx, position: usize, location_id: LocationIdx) {
        debug_assert!(self.is_unassigned(location_id));

        self.routes[route_id].insert(&self.problem, position, location_id);
        self.unassigned.set(location_id.get(), false);
    }

    /// Appends an unassigned pickup at the end of a route.
    pub(crate) fn push(&mut self, route_id: RouteIdx, location_id: LocationIdx) {
        let position = self.routes[route_id].len();
        self.insert(route_id, position, location_id);
    }

    /// Runs `f` against a route with access to the problem.
    pub(crate) fn update_route<F, R>(&mut self, route_id: RouteIdx, f: F) -> R
    where
        F: FnOnce(&VehicleRoutingProblem, &mut SolutionRoute) -> R,
    {
        f(&self.problem, &mut self.routes[route_id])
    }

    /// Runs `f` against two distinct routes with access to the problem.
    pub(crate) fn update_route_pair<F, R>(&mut self, (r1, r2): (RouteIdx, RouteIdx), f: F) -> R
    where
        F: FnOnce(&VehicleRoutingProblem, &mut SolutionRoute, &mut SolutionRoute) -> R,
    {
        assert_ne!(r1, r2, "route pair must reference two routes");

        let (first, second) = if r1 < r2 {
            let (left, right) = self.routes.split_at_mut(r2.get());
            (&mut left[r1.get()], &mut right[0])
        } else {
            let (left, right) = self.routes.split_at_mut(r1.get());
            (&mut right[0], &mut left[r2.get()])
        };

        f(&self.problem, first, second)
    }
}
