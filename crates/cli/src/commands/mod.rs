pub mod config;
pub mod doctor;
pub mod migrate;
pub mod report;
pub mod seed;

use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_class: Option<String>,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Value>,
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        Self::envelope(command, "ok", None, message.into(), None, 0)
    }

    /// Success carrying a structured payload next to the human-readable
    /// message, e.g. the migration names a `migrate` run applied.
    pub fn success_with_details(
        command: &str,
        message: impl Into<String>,
        details: Value,
    ) -> Self {
        Self::envelope(command, "ok", None, message.into(), Some(details), 0)
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        Self::envelope(
            command,
            "error",
            Some(error_class.to_string()),
            message.into(),
            None,
            exit_code,
        )
    }

    fn envelope(
        command: &str,
        status: &str,
        error_class: Option<String>,
        message: String,
        details: Option<Value>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: status.to_string(),
            error_class,
            message,
            details,
        };
        Self { exit_code, output: serialize_payload(payload) }
    }
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}

#[cfg(test)]
mod tests {
    use super::CommandResult;

    #[test]
    fn success_envelope_omits_error_and_details_fields() {
        let result = CommandResult::success("migrate", "done");
        assert_eq!(result.exit_code, 0);
        assert!(result.output.contains("\"status\":\"ok\""));
        assert!(!result.output.contains("error_class"));
        assert!(!result.output.contains("details"));
    }

    #[test]
    fn failure_envelope_carries_class_and_exit_code() {
        let result = CommandResult::failure("seed", "seed_verify", "missing rows", 6);
        assert_eq!(result.exit_code, 6);
        assert!(result.output.contains("\"error_class\":\"seed_verify\""));
        assert!(result.output.contains("\"message\":\"missing rows\""));
    }

    #[test]
    fn details_payload_is_embedded_as_json() {
        let result = CommandResult::success_with_details(
            "migrate",
            "applied 1 migration(s)",
            serde_json::json!({ "applied": ["0001_initial"] }),
        );
        assert!(result.output.contains("\"applied\":[\"0001_initial\"]"));
    }
}
