//! # Erros do motor NER
//!
//! Todas as falhas recuperáveis do motor acontecem no carregamento (modelo ou
//! configuração) ou no uso de handles inválidos no [`crate::registry`].
//! Reconhecimento e tokenização são totais: nunca retornam erro.

use std::path::PathBuf;

use thiserror::Error;

/// Tipo `Result` usado em todo o crate.
pub type Result<T> = std::result::Result<T, NerError>;

/// Erros do motor NER.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum NerError {
    /// Falha de leitura/escrita (arquivo inexistente, permissão, etc.)
    #[error("erro de I/O em {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// O conteúdo não é um documento válido (JSON truncado ou corrompido).
    #[error("modelo malformado: {0}")]
    Malformed(#[from] serde_json::Error),

    /// O documento é JSON válido mas não é um modelo deste motor.
    #[error("formato desconhecido: esperado \"{expected}\", encontrado \"{found}\"")]
    Format { expected: &'static str, found: String },

    /// Versão do formato fora do intervalo suportado.
    #[error("versão de modelo {found} incompatível (suportadas: 1..={supported})")]
    IncompatibleVersion { found: u32, supported: u32 },

    /// O modelo é sintaticamente correto mas viola alguma regra de consistência.
    #[error("modelo inválido: {0}")]
    InvalidModel(String),

    /// Arquivo de configuração inválido.
    #[error("configuração inválida: {0}")]
    Config(String),

    /// Handle desconhecido ou já liberado.
    #[error("handle inválido: {0}")]
    InvalidHandle(u64),
}

impl NerError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        NerError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn invalid_model(msg: impl Into<String>) -> Self {
        NerError::InvalidModel(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        NerError::Config(msg.into())
    }

    /// Indica se o erro aconteceu ao carregar um modelo.
    pub fn is_load_failure(&self) -> bool {
        matches!(
            self,
            NerError::Io { .. }
                | NerError::Malformed(_)
                | NerError::Format { .. }
                | NerError::IncompatibleVersion { .. }
                | NerError::InvalidModel(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_failure_classification() {
        let err = NerError::invalid_model("tipo duplicado");
        assert!(err.is_load_failure());
        assert!(!NerError::InvalidHandle(3).is_load_failure());
        assert!(!NerError::config("x").is_load_failure());
    }

    #[test]
    fn test_messages_include_context() {
        let err = NerError::IncompatibleVersion {
            found: 9,
            supported: 1,
        };
        assert!(err.to_string().contains('9'));

        let err = NerError::io(
            "/nao/existe.json",
            std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        );
        assert!(err.to_string().contains("/nao/existe.json"));
    }
}
