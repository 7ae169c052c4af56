use std::fmt;

use serde::{Deserialize, Serialize};

/// Código de salida, ordenado por severidad creciente.
///
/// El orden de declaración define la severidad: al combinar dos estados se
/// conserva el más severo (`Failed` domina sobre `Completed`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExitCode {
    Executing,
    Completed,
    Noop,
    Stopped,
    Failed,
    Unknown,
}

impl ExitCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ExitCode::Executing => "EXECUTING",
            ExitCode::Completed => "COMPLETED",
            ExitCode::Noop => "NOOP",
            ExitCode::Stopped => "STOPPED",
            ExitCode::Failed => "FAILED",
            ExitCode::Unknown => "UNKNOWN",
        }
    }

    pub fn parse(code: &str) -> Self {
        match code {
            "EXECUTING" => ExitCode::Executing,
            "COMPLETED" => ExitCode::Completed,
            "NOOP" => ExitCode::Noop,
            "STOPPED" => ExitCode::Stopped,
            "FAILED" => ExitCode::Failed,
            _ => ExitCode::Unknown,
        }
    }
}

/// Estado de salida: código + descripción legible de la causa.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExitStatus {
    pub code: ExitCode,
    pub description: String,
}

impl ExitStatus {
    pub fn new(code: ExitCode) -> Self {
        Self { code,
               description: String::new() }
    }

    pub fn executing() -> Self {
        Self::new(ExitCode::Executing)
    }

    pub fn completed() -> Self {
        Self::new(ExitCode::Completed)
    }

    pub fn failed() -> Self {
        Self::new(ExitCode::Failed)
    }

    pub fn stopped() -> Self {
        Self::new(ExitCode::Stopped)
    }

    /// Agrega una descripción (se concatena con `; ` si ya había una).
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        let description = description.into();
        if description.is_empty() {
            return self;
        }
        if self.description.is_empty() {
            self.description = description;
        } else if !self.description.contains(&description) {
            self.description = format!("{}; {}", self.description, description);
        }
        self
    }

    pub fn is_failed(&self) -> bool {
        self.code == ExitCode::Failed
    }

    /// Combina dos estados quedándose con el código más severo y ambas
    /// descripciones.
    pub fn and(self, other: ExitStatus) -> ExitStatus {
        let code = self.code.max(other.code);
        ExitStatus { code,
                     description: self.description }.with_description(other.description)
    }
}

impl Default for ExitStatus {
    fn default() -> Self {
        Self::executing()
    }
}

impl fmt::Display for ExitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.description.is_empty() {
            write!(f, "{}", self.code.as_str())
        } else {
            write!(f, "{}: {}", self.code.as_str(), self.description)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn and_keeps_most_severe_code() {
        let merged = ExitStatus::completed().and(ExitStatus::failed().with_description("boom"));
        assert_eq!(merged.code, ExitCode::Failed);
        assert_eq!(merged.description, "boom");
        let merged = ExitStatus::executing().and(ExitStatus::completed());
        assert_eq!(merged.code, ExitCode::Completed);
    }

    #[test]
    fn descriptions_are_concatenated_once() {
        let status = ExitStatus::failed().with_description("a").with_description("b").with_description("a");
        assert_eq!(status.description, "a; b");
        assert_eq!(status.to_string(), "FAILED: a; b");
    }

    #[test]
    fn code_round_trips_through_text() {
        for code in [ExitCode::Executing, ExitCode::Completed, ExitCode::Failed, ExitCode::Stopped] {
            assert_eq!(ExitCode::parse(code.as_str()), code);
        }
        assert_eq!(ExitCode::parse("???"), ExitCode::Unknown);
    }
}
