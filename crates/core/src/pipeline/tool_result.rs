use serde::Serialize;

use super::highlight_error::HighlightError;

/// Envelope returned by every highlight tool.
///
/// Failures carry a stable `error_code`; a success may still be `degraded`
/// when a scoring signal was unavailable.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResult<T> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<&'static str>,
    pub degraded: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ToolResult<T> {
    pub fn ok(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            error_code: None,
            degraded: false,
            warnings: Vec::new(),
            data: Some(data),
        }
    }

    /// Success with warnings; `degraded` is set when `degraded` is true.
    pub fn with_warnings(mut self, warnings: Vec<String>, degraded: bool) -> Self {
        self.warnings = warnings;
        self.degraded = degraded;
        self
    }

    pub fn failure(error: &HighlightError) -> Self {
        Self {
            success: false,
            message: error.to_string(),
            error_code: Some(error.code()),
            degraded: false,
            warnings: Vec::new(),
            data: None,
        }
    }

    pub fn from_result(result: Result<Self, HighlightError>) -> Self {
        result.unwrap_or_else(|e| {
            log::warn!("Highlight tool failed [{}]: {e}", e.code());
            Self::failure(&e)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_carries_code() {
        let result: ToolResult<()> = ToolResult::failure(&HighlightError::PlanStale);
        assert!(!result.success);
        assert_eq!(result.error_code, Some("PLAN_STALE"));
        assert!(result.data.is_none());
    }

    #[test]
    fn test_degraded_success_serializes() {
        let result = ToolResult::ok(3, "scored").with_warnings(vec!["llm down".into()], true);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["degraded"], true);
        assert_eq!(json["warnings"][0], "llm down");
        assert!(json.get("errorCode").is_none());
    }
}
