use std::{
    fs::File,
    io::{BufReader, BufWriter, Write},
    path::Path,
};

use anyhow::Context;
use serde::{Serialize, de::DeserializeOwned};

pub fn read_json<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let value = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse {}", path.display()))?;

    Ok(value)
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> anyhow::Result<()> {
    let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.flush()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use binroute_optimizer::json::types::{JsonRoutingRequest, JsonRoutingResponse, RoutingStatus};

    use super::*;

    #[test]
    fn test_write_then_read_response() {
        let path = std::env::temp_dir().join(format!("binroute-response-{}.json", std::process::id()));

        write_json(&path, &JsonRoutingResponse::no_pickups()).unwrap();
        let response: JsonRoutingResponse = read_json(&path).unwrap();
        assert_eq!(response.status, RoutingStatus::SuccessNoPickups);

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_read_invalid_request() {
        let path = std::env::temp_dir().join(format!("binroute-request-{}.json", std::process::id()));
        std::fs::write(&path, r#"{ "pickups": [] }"#).unwrap();

        let error = read_json::<JsonRoutingRequest>(&path).unwrap_err();
        assert!(error.to_string().contains("Failed to parse"));

        std::fs::remove_file(&path).unwrap();
    }
}
