use schemars::schema_for;

use crate::json::types;

pub fn generate_request_schema() -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&schema_for!(types::JsonRoutingRequest))
}

pub fn generate_response_schema() -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&schema_for!(types::JsonRoutingResponse))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schemas_name_the_contract_fields() {
        let request = generate_request_schema().unwrap();
        assert!(request.contains("time_budget_seconds"));
        assert!(request.contains("pickups"));

        let response = generate_response_schema().unwrap();
        assert!(response.contains("success_no_pickups"));
        assert!(response.contains("total_distance_km"));
    }
}
