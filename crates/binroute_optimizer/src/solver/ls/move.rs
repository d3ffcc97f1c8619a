use binroute_matrix_providers::cost_matrix::Cost;

use crate::{
    problem::{location::LocationIdx, vehicle_routing_problem::VehicleRoutingProblem},
    solver::{
        ls::{
            insert_unassigned::InsertUnassignedOperator, inter_relocate::InterRelocateOperator,
            inter_swap::InterSwapOperator, relocate::RelocateOperator, two_opt::TwoOptOperator,
        },
        solution::{route_id::RouteIdx, working_solution::WorkingSolution},
    },
};

/// Cost of traversing an arc as seen by the search.
///
/// The problem itself gives the real travel cost, guided local search adds its penalties on top.
pub trait ArcCost: Sync {
    fn arc_cost(&self, from: LocationIdx, to: LocationIdx) -> Cost;

    /// `arc_cost(a, b) == arc_cost(b, a)` for every pair of locations.
    fn is_symmetric(&self) -> bool;
}

impl ArcCost for VehicleRoutingProblem {
    #[inline(always)]
    fn arc_cost(&self, from: LocationIdx, to: LocationIdx) -> Cost {
        self.travel_cost(from, to)
    }

    fn is_symmetric(&self) -> bool {
        VehicleRoutingProblem::is_symmetric(self)
    }
}

pub trait LocalSearchOperator: Sized {
    /// Calls `consumer` with every move of this kind between the two routes.
    /// `r1 == r2` for intra-route moves.
    fn generate_moves<C>(solution: &WorkingSolution, routes: (RouteIdx, RouteIdx), consumer: C)
    where
        C: FnMut(Self);

    fn cost_delta<A>(&self, solution: &WorkingSolution, costs: &A) -> Cost
    where
        A: ArcCost + ?Sized;

    /// Capacity check, must hold before `apply` is called.
    fn is_valid(&self, solution: &WorkingSolution) -> bool;

    fn apply(&self, solution: &mut WorkingSolution);

    fn updated_routes(&self) -> Vec<RouteIdx>;
}

#[derive(Debug)]
pub enum LocalSearchMove {
    /// Moves a stop to another position of the same route.
    Relocate(RelocateOperator),

    /// Reverses a segment of a route.
    TwoOpt(TwoOptOperator),

    /// Moves a stop from one route to another.
    InterRelocate(InterRelocateOperator),

    /// Exchanges two stops between two routes.
    InterSwap(InterSwapOperator),

    /// Serves a pickup that no route visits yet.
    InsertUnassigned(InsertUnassignedOperator),
}

impl LocalSearchMove {
    pub fn operator_name(&self) -> &'static str {
        match self {
            LocalSearchMove::Relocate(_) => "Relocate",
            LocalSearchMove::TwoOpt(_) => "Two-Opt",
            LocalSearchMove::InterRelocate(_) => "Inter-Relocate",
            LocalSearchMove::InterSwap(_) => "Inter-Swap",
            LocalSearchMove::InsertUnassigned(_) => "Insert-Unassigned",
        }
    }

    pub fn cost_delta<A>(&self, solution: &WorkingSolution, costs: &A) -> Cost
    where
        A: ArcCost + ?Sized,
    {
        match self {
            LocalSearchMove::Relocate(op) => op.cost_delta(solution, costs),
            LocalSearchMove::TwoOpt(op) => op.cost_delta(solution, costs),
            LocalSearchMove::InterRelocate(op) => op.cost_delta(solution, costs),
            LocalSearchMove::InterSwap(op) => op.cost_delta(solution, costs),
            LocalSearchMove::InsertUnassigned(op) => op.cost_delta(solution, costs),
        }
    }

    pub fn is_valid(&self, solution: &WorkingSolution) -> bool {
        match self {
            LocalSearchMove::Relocate(op) => op.is_valid(solution),
            LocalSearchMove::TwoOpt(op) => op.is_valid(solution),
            LocalSearchMove::InterRelocate(op) => op.is_valid(solution),
            LocalSearchMove::InterSwap(op) => op.is_valid(solution),
            LocalSearchMove::InsertUnassigned(op) => op.is_valid(solution),
        }
    }

    pub fn apply(&self, solution: &mut WorkingSolution) {
        match self {
            LocalSearchMove::Relocate(op) => op.apply(solution),
            LocalSearchMove::TwoOpt(op) => op.apply(solution),
            LocalSearchMove::InterRelocate(op) => op.apply(solution),
            LocalSearchMove::InterSwap(op) => op.apply(solution),
            LocalSearchMove::InsertUnassigned(op) => op.apply(solution),
        }
    }

    pub fn updated_routes(&self) -> Vec<RouteIdx> {
        match self {
            LocalSearchMove::Relocate(op) => op.updated_routes(),
            LocalSearchMove::TwoOpt(op) => op.updated_routes(),
            LocalSearchMove::InterRelocate(op) => op.updated_routes(),
            LocalSearchMove::InterSwap(op) => op.updated_routes(),
            LocalSearchMove::InsertUnassigned(op) => op.updated_routes(),
        }
    }

    pub fn is_insertion(&self) -> bool {
        matches!(self, LocalSearchMove::InsertUnassigned(_))
    }
}
