use binroute_matrix_providers::cost_matrix::Cost;

use crate::problem::{
    amount::Amount,
    location::{DEPOT, LocationIdx},
    vehicle::VehicleIdx,
    vehicle_routing_problem::VehicleRoutingProblem,
};

/// Ordered stops of one vehicle. The depot is implicit at both ends and never stored.
#[derive(Clone, Debug)]
pub struct SolutionRoute {
    vehicle_id: VehicleIdx,
    capacity: Amount,
    stops: Vec<LocationIdx>,

    /// Sum of the stop demands, recomputed after every mutation
    load: Amount,

    /// Travel cost including both depot legs
    cost: Cost,
}

impl SolutionRoute {
    pub fn empty(problem: &VehicleRoutingProblem, vehicle_id: VehicleIdx) -> Self {
        SolutionRoute {
            vehicle_id,
            capacity: problem.vehicle(vehicle_id).capacity(),
            stops: Vec::new(),
            load: Amount::ZERO,
            cost: 0,
        }
    }

    pub fn vehicle_id(&self) -> VehicleIdx {
        self.vehicle_id
    }

    pub fn len(&self) -> usize {
        self.stops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stops.is_empty()
    }

    pub fn stops(&self) -> &[LocationIdx] {
        &self.stops
    }

    pub fn stop(&self, position: usize) -> LocationIdx {
        self.stops[position]
    }

    pub fn load(&self) -> Amount {
        self.load
    }

    pub fn capacity(&self) -> Amount {
        self.capacity
    }

    pub fn cost(&self) -> Cost {
        self.cost
    }

    /// Whether `demand` more fits in the vehicle.
    pub fn can_carry(&self, demand: Amount) -> bool {
        (self.load + demand).fits_within(self.capacity)
    }

    /// Location visited before the stop at `position`, the depot for the first stop.
    pub fn previous_location(&self, position: usize) -> LocationIdx {
        if position == 0 {
            DEPOT
        } else {
            self.stops[position - 1]
        }
    }

    /// Location visited after the stop at `position`, the depot for the last stop.
    pub fn next_location(&self, position: usize) -> LocationIdx {
        self.stops.get(position + 1).copied().unwrap_or(DEPOT)
    }

    /// Location currently at `position`, the depot when `position == len()`.
    pub fn location_or_depot(&self, position: usize) -> LocationIdx {
        self.stops.get(position).copied().unwrap_or(DEPOT)
    }

    pub fn last_location(&self) -> LocationIdx {
        self.stops.last().copied().unwrap_or(DEPOT)
    }

    /// Every traversed arc, depot legs included.
    pub fn arcs(&self) -> impl Iterator<Item = (LocationIdx, LocationIdx)> + '_ {
        let legs = if self.stops.is_empty() {
            0
        } else {
            self.stops.len() + 1
        };

        (0..legs).map(|leg| (self.previous_location(leg), self.location_or_depot(leg)))
    }

    pub(crate) fn push(&mut self, problem: &VehicleRoutingProblem, location_id: LocationIdx) {
        self.stops.push(location_id);
        self.update(problem);
    }

    pub(crate) fn insert(
        &mut self,
        problem: &VehicleRoutingProblem,
        position: usize,
        location_id: LocationIdx,
    ) {
        self.stops.insert(position, location_id);
        self.update(problem);
    }

    pub(crate) fn remove(
        &mut self,
        problem: &VehicleRoutingProblem,
        position: usize,
    ) -> LocationIdx {
        let location_id = self.stops.remove(position);
        self.update(problem);
        location_id
    }

    pub(crate) fn replace(
        &mut self,
        problem: &VehicleRoutingProblem,
        position: usize,
        location_id: LocationIdx,
    ) -> LocationIdx {
        let previous = std::mem::replace(&mut self.stops[position], location_id);
        self.update(problem);
        previous
    }

    /// Moves the stop at `from` so that it ends up at index `to` of the resulting route.
    pub(crate) fn relocate(&mut self, problem: &VehicleRoutingProblem, from: usize, to: usize) {
        let location_id = self.stops.remove(from);
        self.stops.insert(to, location_id);
        self.update(problem);
    }

    /// Reverses the stops in `start..=end`.
    pub(crate) fn reverse(&mut self, problem: &VehicleRoutingProblem, start: usize, end: usize) {
        self.stops[start..=end].reverse();
        self.update(problem);
    }

    fn update(&mut self, problem: &VehicleRoutingProblem) {
        self.load = self
            .stops
            .iter()
            .map(|&location_id| problem.demand(location_id))
            .sum();
        self.cost = problem.route_cost(&self.stops);
    }
}
