use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::collections::HashMap;

use crate::error::{StackmarkError, Result};

/// Locale-specific tokens the runtime writes into a serialized stack trace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkerTokens {
    /// Line separating an inner exception's frames from the outer exception's frames
    pub inner_boundary: String,

    /// Line marking a re-throw of the same exception
    pub rethrow_boundary: String,

    /// "at"-equivalent word leading every frame line (any word when unset)
    pub lead_in: Option<String>,

    /// File/line suffix template, e.g. "in {0}:line {1}"
    pub file_line_template: Option<String>,
}

impl Default for MarkerTokens {
    fn default() -> Self {
        Self {
            inner_boundary: "--- End of inner exception stack trace ---".to_string(),
            rethrow_boundary:
                "--- End of stack trace from previous location where exception was thrown ---"
                    .to_string(),
            lead_in: None,
            file_line_template: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Emit each chained exception header right before its own frames
    pub separate_stack_traces: bool,

    /// Fully-qualified `Type.Method` of the frame that follows a re-throw boundary
    pub rethrow_helper: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            separate_stack_traces: true,
            rethrow_helper: "System.Runtime.ExceptionServices.ExceptionDispatchInfo.Throw"
                .to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SymbolsConfig {
    /// Directories scanned recursively for module manifests
    pub manifest_dirs: Vec<PathBuf>,

    /// Modules loaded into the symbol cache at startup
    pub entry_modules: Vec<String>,
}

impl Default for SymbolsConfig {
    fn default() -> Self {
        Self {
            manifest_dirs: vec![PathBuf::from("symbols")],
            entry_modules: vec![],
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Wrap rendered markup into a complete HTML page
    pub standalone: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Rendering behaviour
    pub render: RenderConfig,

    /// Default marker tokens
    pub markers: MarkerTokens,

    /// Per-culture marker tokens, keyed by culture name ("de-DE", "fr", ...)
    pub locales: HashMap<String, MarkerTokens>,

    /// Symbol resolution settings
    pub symbols: SymbolsConfig,

    /// Output settings
    pub output: OutputConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            render: RenderConfig::default(),
            markers: MarkerTokens::default(),
            locales: HashMap::new(),
            symbols: SymbolsConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| StackmarkError::Config(e.to_string()))?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| StackmarkError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load configuration with fallback to default
    pub fn load_or_default<P: AsRef<Path>>(path: Option<P>) -> Result<Self> {
        match path {
            Some(p) => {
                if p.as_ref().exists() {
                    Self::load(p)
                } else {
                    Ok(Self::default())
                }
            }
            None => {
                let candidates = [
                    "Stackmark.toml",
                    "stackmark.toml",
                    ".stackmark.toml",
                ];

                for candidate in &candidates {
                    if Path::new(candidate).exists() {
                        return Self::load(candidate);
                    }
                }

                Ok(Self::default())
            }
        }
    }

    /// Marker tokens for a culture: exact match, then neutral language, then defaults
    pub fn markers_for(&self, culture: Option<&str>) -> &MarkerTokens {
        let Some(culture) = culture.filter(|c| !c.is_empty()) else {
            return &self.markers;
        };

        if let Some(markers) = self.locales.get(culture) {
            return markers;
        }

        culture
            .split(['-', '_'])
            .next()
            .and_then(|language| self.locales.get(language))
            .unwrap_or(&self.markers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("stackmark.toml");

        let mut config = Config::default();
        config.render.separate_stack_traces = false;
        config.locales.insert("de".to_string(), MarkerTokens {
            inner_boundary: "--- Ende der internen Ausnahmestapelüberwachung ---".to_string(),
            ..MarkerTokens::default()
        });
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert!(!loaded.render.separate_stack_traces);
        assert_eq!(loaded.locales.len(), 1);
        assert_eq!(loaded.markers, MarkerTokens::default());
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let config = Config::load_or_default(Some("/definitely/not/here.toml")).unwrap();
        assert!(config.render.separate_stack_traces);
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "[render\nseparate_stack_traces = ").unwrap();

        assert!(matches!(Config::load(&path), Err(StackmarkError::Config(_))));
    }

    #[test]
    fn test_partial_sections_fall_back_to_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("partial.toml");
        std::fs::write(
            &path,
            r#"
[render]
separate_stack_traces = false

[markers]
lead_in = "at"

[locales.de]
lead_in = "bei"

[symbols]
entry_modules = ["MyApp"]

[output]
"#,
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert!(!config.render.separate_stack_traces);
        assert_eq!(config.render.rethrow_helper, RenderConfig::default().rethrow_helper);
        assert_eq!(config.markers.lead_in.as_deref(), Some("at"));
        assert_eq!(config.markers.inner_boundary, MarkerTokens::default().inner_boundary);
        assert_eq!(config.locales["de"].lead_in.as_deref(), Some("bei"));
        assert_eq!(config.locales["de"].rethrow_boundary, MarkerTokens::default().rethrow_boundary);
        assert_eq!(config.symbols.entry_modules, vec!["MyApp".to_string()]);
        assert_eq!(config.symbols.manifest_dirs, vec![PathBuf::from("symbols")]);
        assert!(!config.output.standalone);
    }

    #[test]
    fn test_markers_for_culture_fallbacks() {
        let mut config = Config::default();
        let german = MarkerTokens {
            inner_boundary: "--- Ende ---".to_string(),
            ..MarkerTokens::default()
        };
        let swiss = MarkerTokens {
            inner_boundary: "--- Schluss ---".to_string(),
            ..MarkerTokens::default()
        };
        config.locales.insert("de".to_string(), german.clone());
        config.locales.insert("de-CH".to_string(), swiss.clone());

        assert_eq!(config.markers_for(Some("de-CH")), &swiss);
        assert_eq!(config.markers_for(Some("de-DE")), &german);
        assert_eq!(config.markers_for(Some("fr-FR")), &MarkerTokens::default());
        assert_eq!(config.markers_for(Some("")), &MarkerTokens::default());
        assert_eq!(config.markers_for(None), &MarkerTokens::default());
    }
}
