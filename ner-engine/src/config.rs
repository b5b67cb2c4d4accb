//! # Configuração do Motor
//!
//! Substitui o antigo "library path" global por uma struct explícita passada
//! ao [`crate::registry::Engine`]. Pode ser montada em código ou lida de um
//! arquivo JSON:
//!
//! ```json
//! { "library_path": "/opt/models", "gazetteer_policy": "authoritative", "parallel_threshold": 16 }
//! ```
//!
//! Todos os campos são opcionais.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{NerError, Result};
use crate::gazetteer::GazetteerPolicy;

/// Número mínimo de sentenças para o reconhecimento em lote usar o rayon.
pub const DEFAULT_PARALLEL_THRESHOLD: usize = 8;

/// Configuração do motor NER.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Diretório base para nomes de modelo relativos.
    pub library_path: Option<PathBuf>,
    /// Sobrescreve a política de gazetteer gravada nos modelos carregados.
    pub gazetteer_policy: Option<GazetteerPolicy>,
    /// Ver [`DEFAULT_PARALLEL_THRESHOLD`].
    pub parallel_threshold: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            library_path: None,
            gazetteer_policy: None,
            parallel_threshold: DEFAULT_PARALLEL_THRESHOLD,
        }
    }
}

impl EngineConfig {
    /// Lê a configuração de um arquivo JSON.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| NerError::config(format!("{}: {e}", path.display())))?;
        serde_json::from_str(&content)
            .map_err(|e| NerError::config(format!("{}: {e}", path.display())))
    }

    pub fn with_library_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.library_path = Some(path.into());
        self
    }

    pub fn with_gazetteer_policy(mut self, policy: GazetteerPolicy) -> Self {
        self.gazetteer_policy = Some(policy);
        self
    }

    /// Caminho efetivo de um modelo: nomes relativos são resolvidos contra
    /// `library_path`, quando configurado.
    pub fn resolve_source(&self, source: impl AsRef<Path>) -> PathBuf {
        let source = source.as_ref();
        match &self.library_path {
            Some(base) if source.is_relative() => base.join(source),
            _ => source.to_path_buf(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.library_path, None);
        assert_eq!(config.gazetteer_policy, None);
        assert_eq!(config.parallel_threshold, DEFAULT_PARALLEL_THRESHOLD);
    }

    #[test]
    fn test_resolve_source() {
        let config = EngineConfig::default().with_library_path("/opt/models");
        assert_eq!(
            config.resolve_source("english.json"),
            PathBuf::from("/opt/models/english.json")
        );
        assert_eq!(
            config.resolve_source("/tmp/other.json"),
            PathBuf::from("/tmp/other.json")
        );
        assert_eq!(
            EngineConfig::default().resolve_source("english.json"),
            PathBuf::from("english.json")
        );
    }

    #[test]
    fn test_from_file_partial() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"gazetteer_policy": "authoritative"}}"#).unwrap();
        file.flush().unwrap();

        let config = EngineConfig::from_file(file.path()).unwrap();
        assert_eq!(config.gazetteer_policy, Some(GazetteerPolicy::Authoritative));
        assert_eq!(config.parallel_threshold, DEFAULT_PARALLEL_THRESHOLD);
    }

    #[test]
    fn test_from_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = EngineConfig::from_file(dir.path().join("nada.json"));
        assert!(matches!(missing, Err(NerError::Config(_))));

        let path = dir.path().join("ruim.json");
        fs::write(&path, "{ parallel_threshold: }").unwrap();
        let invalid = EngineConfig::from_file(&path).unwrap_err();
        assert!(matches!(invalid, NerError::Config(_)));
        assert!(!invalid.is_load_failure());
    }
}
