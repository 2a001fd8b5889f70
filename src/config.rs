//! Configuration for the constancia workflow.
//!
//! Everything that used to be an ambient constant (ledger path, validation
//! URL, signature metadata) lives in an explicit config value handed to the
//! workflow, so two workflows with different ledgers can coexist in one
//! process.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Workflow-wide settings. `Default` matches the production deployment the
/// system was written for; a config file can override any field.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    /// Append-only JSON ledger of validation records.
    pub ledger_path: PathBuf,
    /// Subdirectory (sibling to the original document) for constancia files.
    pub constancia_dir: String,
    /// Base URL the QR payload is built from; the code is appended verbatim.
    pub validation_base_url: String,
    /// Signature reason embedded in the signed document.
    pub reason: String,
    /// Signature location embedded in the signed document.
    pub location: String,
    /// Name of the (invisible) signature field.
    pub field_name: String,
    /// Lower-left corner of the QR stamp, in page points from bottom-left.
    pub qr_position: (f32, f32),
    /// Side length of the QR stamp in page points.
    pub qr_size: f32,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            ledger_path: PathBuf::from("validaciones.json"),
            constancia_dir: "constancias".into(),
            validation_base_url: "https://intranet-demo/validar?codigo=".into(),
            reason: "Firma de conformidad".into(),
            location: "Resistencia, Chaco, Argentina".into(),
            field_name: "Signature1".into(),
            qr_position: (50.0, 50.0),
            qr_size: 100.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_deployment_constants() {
        let config = WorkflowConfig::default();
        assert_eq!(config.ledger_path, PathBuf::from("validaciones.json"));
        assert_eq!(config.field_name, "Signature1");
        assert_eq!(config.qr_size, 100.0);
    }

    #[test]
    fn partial_json_overrides_defaults() {
        let config: WorkflowConfig =
            serde_json::from_str(r#"{ "qr_size": 80.0, "constancia_dir": "firmas" }"#).unwrap();
        assert_eq!(config.qr_size, 80.0);
        assert_eq!(config.constancia_dir, "firmas");
        assert_eq!(config.field_name, "Signature1");
    }
}
