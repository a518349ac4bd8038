use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use validator::Validate;

use crate::error::{SolverError, SolverResult};

pub const DEFAULT_FEDERATION: &str = "FED1";

/// How the solver decides whether an ntuple needs clarification.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClarificationMode {
    /// Dispatch everything as is
    #[default]
    Never,
    /// Ask the UI whenever the ntuple carries `*`-marked slots
    MarkedSlots,
}

/// Configuration for one problem-solver process
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct SolverConfig {
    /// Federation prefix shared by every agent in the pipeline
    #[validate(length(min = 1))]
    pub federation: String,
    /// Complexity level of the surrounding process (1, 2 or 3). Not used by routing.
    #[validate(range(min = 1, max = 3))]
    pub complexity: u8,
    /// Log each ntuple after it is solved
    pub verbose: bool,
    /// Optional `parameter_templates.json`
    pub templates_path: Option<PathBuf>,
    /// Handlers slower than this are logged at warn level
    pub slow_handler_warn_ms: u64,
    pub clarification: ClarificationMode,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            federation: DEFAULT_FEDERATION.to_string(),
            complexity: 1,
            verbose: false,
            templates_path: None,
            slow_handler_warn_ms: 500,
            clarification: ClarificationMode::Never,
        }
    }
}

impl SolverConfig {
    /// Address the solver subscribes on; also the `tag` of its UI messages.
    pub fn address(&self) -> String {
        format!("{}_{}", self.federation, "ProblemSolver")
    }

    pub fn ui_address(&self) -> String {
        format!("{}_{}", self.federation, "AgentUI")
    }

    pub fn validate_config(&self) -> SolverResult<()> {
        self.validate().map_err(|errors| {
            let fields = errors
                .field_errors()
                .keys()
                .map(|k| k.to_string())
                .collect::<Vec<_>>()
                .join(", ");
            SolverError::Config(format!("invalid solver configuration ({})", fields))
        })
    }
}

/// Parses and checks a complexity level.
pub fn check_complexity(n: &str) -> Result<u8, String> {
    let invalid = || {
        format!(
            "{} is an invalid entry for the complexity level. Should be 1, 2, or 3.",
            n
        )
    };
    let level: u8 = n.trim().parse().map_err(|_| invalid())?;
    if (1..=3).contains(&level) {
        Ok(level)
    } else {
        Err(invalid())
    }
}

/// Loads a solver configuration from TOML, or JSON when the file ends in `.json`.
pub fn load_solver_config(path: impl AsRef<Path>) -> SolverResult<SolverConfig> {
    let path = path.as_ref();
    let data = std::fs::read_to_string(path).map_err(|e| {
        SolverError::Config(format!("failed to read '{}': {}", path.display(), e))
    })?;
    let config: SolverConfig = if path.extension().and_then(|e| e.to_str()) == Some("json") {
        serde_json::from_str(&data)?
    } else {
        toml::from_str(&data)
            .map_err(|e| SolverError::Config(format!("invalid TOML in '{}': {}", path.display(), e)))?
    };
    config.validate_config()?;
    Ok(config)
}
