#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing
)]
//! Manifest policy tests for the Ishy client.
//!
//! These tests verify that Cargo.toml keeps the agreed lint levels, feature
//! layout, and packaging rules. If any test fails, the manifest has drifted
//! from project policy.
//!
//! All checks are synchronous filesystem reads; no network access or async
//! runtime needed.

use std::path::PathBuf;

/// Returns the project root directory (where Cargo.toml lives).
fn project_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
}

/// Reads a file relative to the project root and returns its contents.
fn read_project_file(relative_path: &str) -> String {
    let path = project_root().join(relative_path);
    std::fs::read_to_string(&path).unwrap_or_else(|e| {
        panic!(
            "Failed to read '{}': {}. This file is required by project policy.",
            path.display(),
            e
        )
    })
}

fn cargo_manifest() -> toml::Table {
    toml::from_str(&read_project_file("Cargo.toml"))
        .expect("Cargo.toml must be valid TOML")
}

// ─────────────────────────────────────────────────────────────────────────────
// Module: panic_policy
// ─────────────────────────────────────────────────────────────────────────────

mod panic_policy {
    use super::*;

    const REQUIRED_DENY_LINTS: &[&str] = &[
        "unwrap_used",
        "expect_used",
        "panic",
        "todo",
        "unimplemented",
        "indexing_slicing",
    ];

    #[test]
    fn cargo_toml_has_all_panic_free_lints() {
        let manifest = cargo_manifest();
        let clippy = manifest["lints"]["clippy"]
            .as_table()
            .expect("Cargo.toml is missing [lints.clippy]");

        for lint in REQUIRED_DENY_LINTS {
            assert_eq!(
                clippy.get(*lint).and_then(toml::Value::as_str),
                Some("deny"),
                "Cargo.toml must set `{lint} = \"deny\"` in [lints.clippy]. \
                 All panic-prone lints are denied in library code."
            );
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Module: feature_policy
// ─────────────────────────────────────────────────────────────────────────────

mod feature_policy {
    use super::*;

    #[test]
    fn http_transport_is_default_and_optional() {
        let manifest = cargo_manifest();
        let features = manifest["features"].as_table().expect("[features]");

        let default: Vec<&str> = features["default"]
            .as_array()
            .expect("default feature list")
            .iter()
            .filter_map(toml::Value::as_str)
            .collect();
        assert!(default.contains(&"transport-http"));

        let reqwest = &manifest["dependencies"]["reqwest"];
        assert_eq!(
            reqwest.get("optional").and_then(toml::Value::as_bool),
            Some(true),
            "reqwest must stay optional so custom transports avoid the HTTP stack"
        );
    }

    #[test]
    fn reqwest_uses_rustls_without_default_features() {
        let manifest = cargo_manifest();
        let reqwest = &manifest["dependencies"]["reqwest"];
        assert_eq!(
            reqwest.get("default-features").and_then(toml::Value::as_bool),
            Some(false)
        );
        let features: Vec<&str> = reqwest["features"]
            .as_array()
            .expect("reqwest features")
            .iter()
            .filter_map(toml::Value::as_str)
            .collect();
        assert!(features.contains(&"rustls-tls"));
        // Bodies are encoded and decoded with serde_json directly.
        assert!(!features.contains(&"json"), "unused reqwest feature: json");
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Module: packaging_policy
// ─────────────────────────────────────────────────────────────────────────────

mod packaging_policy {
    use super::*;

    #[test]
    fn rust_version_is_declared() {
        let manifest = cargo_manifest();
        let msrv = manifest["package"]["rust-version"]
            .as_str()
            .expect("package.rust-version must be set");
        assert!(
            msrv.split('.').count() >= 2,
            "rust-version should be a semver-like version, got {msrv}"
        );
    }

    #[test]
    fn every_declared_example_exists() {
        let manifest = cargo_manifest();
        let examples = manifest["example"].as_array().expect("[[example]] entries");
        assert!(!examples.is_empty());
        for example in examples {
            let path = example["path"].as_str().expect("example path");
            assert!(
                project_root().join(path).is_file(),
                "declared example '{path}' does not exist"
            );
        }
    }

    #[test]
    fn readme_is_packaged() {
        let manifest = cargo_manifest();
        let include: Vec<&str> = manifest["package"]["include"]
            .as_array()
            .expect("package.include")
            .iter()
            .filter_map(toml::Value::as_str)
            .map(|entry| entry.trim_start_matches('/'))
            .collect();
        assert!(include.contains(&"README.md"));
        assert!(project_root().join("README.md").is_file());
    }
}
