//! Configuration system

pub use serde::{Serialize, Deserialize};

/// Configuration trait
pub trait Config: Serialize + for<'de> Deserialize<'de> + Default {
    /// Load configuration from file
    fn load_from_file(path: &str) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(ConfigError::Io)?;
        
        // Try different formats
        if path.ends_with(".toml") {
            toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
        } else if path.ends_with(".ron") {
            ron::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
        } else {
            Err(ConfigError::UnsupportedFormat(path.to_string()))
        }
    }
    
    /// Save configuration to file
    fn save_to_file(&self, path: &str) -> Result<(), ConfigError> {
        let contents = if path.ends_with(".toml") {
            toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?
        } else if path.ends_with(".ron") {
            ron::ser::to_string_pretty(self, Default::default())
                .map_err(|e| ConfigError::Serialize(e.to_string()))?
        } else {
            return Err(ConfigError::UnsupportedFormat(path.to_string()));
        };
        
        std::fs::write(path, contents).map_err(ConfigError::Io)
    }
}

/// Configuration errors
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialize(String),

    /// Unsupported format
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}

/// Configuration for a pipeline's frame clock and builtin phase set.
///
/// Lets an embedder override the target frame rate and the declaration
/// order of the builtin phases from a `.toml`/`.ron` file without touching
/// code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Target frames per second. `None` disables the `frame_end` sleep.
    pub target_fps: Option<f32>,

    /// Builtin phases in declaration (= rank) order.
    pub phases: Vec<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            target_fps: None,
            phases: vec![
                "PreFrame".to_string(),
                "OnLoad".to_string(),
                "PostLoad".to_string(),
                "PreUpdate".to_string(),
                "OnUpdate".to_string(),
                "OnValidate".to_string(),
                "PostUpdate".to_string(),
                "PreStore".to_string(),
                "OnStore".to_string(),
                "PostFrame".to_string(),
            ],
        }
    }
}

impl Config for PipelineConfig {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_phases_are_in_declaration_order() {
        let config = PipelineConfig::default();
        assert_eq!(
            config.phases,
            vec![
                "PreFrame", "OnLoad", "PostLoad", "PreUpdate", "OnUpdate",
                "OnValidate", "PostUpdate", "PreStore", "OnStore", "PostFrame",
            ]
        );
        assert!(config.target_fps.is_none());
    }
}
