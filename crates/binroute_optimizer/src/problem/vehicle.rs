use serde::Serialize;

use crate::{define_index_newtype, problem::amount::Amount};

define_index_newtype!(VehicleIdx, Vehicle);

#[derive(Serialize, Debug, Clone)]
pub struct Vehicle {
    external_id: String,
    capacity: Amount,
}

impl Vehicle {
    pub fn new(external_id: String, capacity: Amount) -> Self {
        Self {
            external_id,
            capacity,
        }
    }

    pub fn external_id(&self) -> &str {
        &self.external_id
    }

    pub fn capacity(&self) -> Amount {
        self.capacity
    }
}
