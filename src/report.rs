use serde::Serialize;
use serde_json::Value;

use crate::b2::GatewayError;

/// Result envelope printed for every command
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// Failure that only means there was nothing to do
    #[serde(skip)]
    pub benign: bool,
    /// Troubleshooting text for the terminal
    #[serde(skip)]
    pub hint: Option<String>,
}

impl Report {
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            message: Some(message.into()),
            body: None,
            data: None,
            benign: false,
            hint: None,
        }
    }

    pub fn ok(message: impl Into<String>) -> Self {
        Self::new(200, message)
    }

    pub fn with_data(mut self, data: impl Serialize) -> Self {
        self.data = Some(serde_json::to_value(data).unwrap_or(Value::Null));
        self
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Process exit code: 0 for success or a benign empty result
    pub fn exit_code(&self) -> i32 {
        if self.is_success() || self.benign {
            0
        } else {
            1
        }
    }

    pub fn render(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| {
            format!("{{\"status\": {}}}", self.status)
        })
    }
}

impl From<&GatewayError> for Report {
    fn from(err: &GatewayError) -> Self {
        let message = err.to_string();
        let hint = err.user_message();
        Self {
            status: err.status(),
            body: err.body(),
            benign: err.is_benign(),
            hint: (hint != message).then_some(hint),
            ..Self::new(err.status(), message)
        }
    }
}
