fn main() {
    println!("Run `cargo test -p wire-compat` to execute wire compatibility tests.");
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    /// Returns the path to the fixtures directory.
    fn fixtures_dir() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures")
    }

    /// Loads a fixture JSON file and returns it as a `serde_json::Value`.
    fn load_fixture(name: &str) -> serde_json::Value {
        let path = fixtures_dir().join(name);
        let data = fs::read_to_string(&path)
            .unwrap_or_else(|e| panic!("failed to read fixture {}: {e}", path.display()));
        serde_json::from_str(&data)
            .unwrap_or_else(|e| panic!("failed to parse fixture {}: {e}", path.display()))
    }

    /// Normalizes JSON values so that integer-valued floats compare equal.
    ///
    /// The backend serializes a whole-number score as `1`, Rust serializes
    /// `f64` as `1.0`. Both are semantically identical, so numbers are
    /// compared as f64.
    fn normalize_value(v: &serde_json::Value) -> serde_json::Value {
        match v {
            serde_json::Value::Number(n) => {
                if let Some(f) = n.as_f64() {
                    serde_json::json!(f)
                } else {
                    v.clone()
                }
            }
            serde_json::Value::Object(map) => {
                let normalized: serde_json::Map<String, serde_json::Value> = map
                    .iter()
                    .map(|(k, v)| (k.clone(), normalize_value(v)))
                    .collect();
                serde_json::Value::Object(normalized)
            }
            serde_json::Value::Array(arr) => {
                serde_json::Value::Array(arr.iter().map(normalize_value).collect())
            }
            _ => v.clone(),
        }
    }

    /// Deserializes a fixture into a Rust type, re-serializes it, and compares
    /// the JSON values (order-independent, float-normalized comparison).
    ///
    /// Fixtures are captured from the backend's actual request/response
    /// bodies and committed, so a mismatch means the client drifted from the
    /// wire contract.
    fn roundtrip_test<T>(name: &str)
    where
        T: serde::de::DeserializeOwned + serde::Serialize,
    {
        let fixture = load_fixture(name);
        let parsed: T = serde_json::from_value(fixture.clone())
            .unwrap_or_else(|e| panic!("failed to deserialize {name}: {e}"));
        let reserialized = serde_json::to_value(&parsed)
            .unwrap_or_else(|e| panic!("failed to re-serialize {name}: {e}"));

        let norm_fixture = normalize_value(&fixture);
        let norm_reserialized = normalize_value(&reserialized);
        assert_eq!(
            norm_fixture, norm_reserialized,
            "roundtrip mismatch for {name}:\n  backend: {fixture}\n  client:  {reserialized}"
        );
    }

    // --- Request payloads ---

    #[test]
    fn fixture_duplicate_check_request() {
        roundtrip_test::<campusvault_protocol::messages::DuplicateCheckRequest>(
            "duplicate_check_request.json",
        );
    }

    #[test]
    fn fixture_generate_metadata_request() {
        roundtrip_test::<campusvault_protocol::messages::GenerateMetadataRequest>(
            "generate_metadata_request.json",
        );
    }

    #[test]
    fn fixture_initiate_upload_request() {
        roundtrip_test::<campusvault_protocol::messages::InitiateUploadRequest>(
            "initiate_upload_request.json",
        );
    }

    #[test]
    fn fixture_finalize_upload_request() {
        roundtrip_test::<campusvault_protocol::messages::FinalizeUploadRequest>(
            "finalize_upload_request.json",
        );
    }

    // --- Response payloads ---

    #[test]
    fn fixture_duplicate_check_response_clear() {
        roundtrip_test::<campusvault_protocol::messages::DuplicateCheckResponse>(
            "duplicate_check_response_clear.json",
        );
    }

    #[test]
    fn fixture_duplicate_check_response_duplicate() {
        roundtrip_test::<campusvault_protocol::messages::DuplicateCheckResponse>(
            "duplicate_check_response_duplicate.json",
        );
    }

    #[test]
    fn fixture_generate_metadata_response() {
        roundtrip_test::<campusvault_protocol::messages::GenerateMetadataResponse>(
            "generate_metadata_response.json",
        );
    }

    #[test]
    fn fixture_initiate_upload_response() {
        roundtrip_test::<campusvault_protocol::messages::InitiateUploadResponse>(
            "initiate_upload_response.json",
        );
    }

    #[test]
    fn fixture_stored_blob() {
        roundtrip_test::<campusvault_protocol::types::StoredBlob>("stored_blob.json");
    }

    #[test]
    fn fixture_resource_record() {
        roundtrip_test::<campusvault_protocol::types::ResourceRecord>("resource_record.json");
    }

    // --- Semantic checks beyond the roundtrip ---

    #[test]
    fn duplicate_response_exposes_existing_resource() {
        let fixture = load_fixture("duplicate_check_response_duplicate.json");
        let parsed: campusvault_protocol::messages::DuplicateCheckResponse =
            serde_json::from_value(fixture).unwrap();
        assert!(parsed.duplicate);
        let existing = parsed.existing.expect("duplicate carries existing resource");
        assert_eq!(existing.id, 42);
        assert_eq!(existing.course_unit_code, "CS2040");
    }

    #[test]
    fn clear_response_has_no_existing_resource() {
        let fixture = load_fixture("duplicate_check_response_clear.json");
        let parsed: campusvault_protocol::messages::DuplicateCheckResponse =
            serde_json::from_value(fixture).unwrap();
        assert!(!parsed.duplicate);
        assert!(parsed.existing.is_none());
        assert!(parsed.similarity_score.is_none());
    }

    #[test]
    fn resource_type_uses_snake_case_on_the_wire() {
        let fixture = load_fixture("finalize_upload_request.json");
        assert_eq!(fixture["resource_type"], "past_paper");
    }
}
