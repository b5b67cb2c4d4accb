//! # Registro de Handles
//!
//! Camada para hosts que não falam Rust (bindings C, Python, Java...): em vez
//! de ponteiros, o host recebe handles opacos (`u64`) e os libera
//! explicitamente. Internamente os modelos ficam em `Arc<NerModel>` e os
//! tokenizadores são possuídos pelo [`Engine`].
//!
//! - Ids nunca são reutilizados, nem entre tipos de handle.
//! - Usar um handle liberado ou desconhecido retorna [`NerError::InvalidHandle`].
//! - Liberar um modelo não invalida tokenizadores criados a partir dele:
//!   tokenizadores não referenciam o modelo.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use crate::config::EngineConfig;
use crate::error::{NerError, Result};
use crate::model::NerModel;
use crate::tagger::NamedEntity;
use crate::tokenizer::{Sentence, Tokenizer};

/// Handle opaco de um modelo carregado.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ModelHandle(u64);

/// Handle opaco de um tokenizador.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TokenizerHandle(u64);

impl ModelHandle {
    pub fn id(&self) -> u64 {
        self.0
    }
}

impl TokenizerHandle {
    pub fn id(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ModelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "model#{}", self.0)
    }
}

impl fmt::Display for TokenizerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tokenizer#{}", self.0)
    }
}

/// Dono de todos os modelos e tokenizadores entregues a um host.
#[derive(Debug, Default)]
pub struct Engine {
    config: EngineConfig,
    models: HashMap<u64, Arc<NerModel>>,
    tokenizers: HashMap<u64, Tokenizer>,
    next_id: u64,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            models: HashMap::new(),
            tokenizers: HashMap::new(),
            next_id: 1,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Carrega um modelo. Nomes relativos são resolvidos contra
    /// `library_path` da configuração.
    pub fn load_model(&mut self, source: impl AsRef<Path>) -> Result<ModelHandle> {
        let path = self.config.resolve_source(source);
        let model = NerModel::load(&path)?;
        let handle = self.insert_model(model);
        debug!(%handle, path = %path.display(), "modelo registrado");
        Ok(handle)
    }

    /// Registra um modelo já construído, aplicando a configuração do motor.
    pub fn insert_model(&mut self, model: NerModel) -> ModelHandle {
        let mut model = model.with_parallel_threshold(self.config.parallel_threshold);
        if let Some(policy) = self.config.gazetteer_policy {
            model = model.with_policy(policy);
        }
        let id = self.allocate();
        self.models.insert(id, Arc::new(model));
        ModelHandle(id)
    }

    /// Referência compartilhada ao modelo; continua válida após `release_model`.
    pub fn model(&self, handle: ModelHandle) -> Result<Arc<NerModel>> {
        self.models
            .get(&handle.0)
            .cloned()
            .ok_or(NerError::InvalidHandle(handle.0))
    }

    pub fn release_model(&mut self, handle: ModelHandle) -> Result<()> {
        self.models
            .remove(&handle.0)
            .ok_or(NerError::InvalidHandle(handle.0))?;
        debug!(%handle, "modelo liberado");
        Ok(())
    }

    /// Tokenizador da variante configurada no modelo.
    pub fn new_tokenizer(&mut self, model: ModelHandle) -> Result<TokenizerHandle> {
        let tokenizer = self.get_model(model)?.new_tokenizer();
        Ok(self.insert_tokenizer(tokenizer))
    }

    /// Tokenizador vertical, independente de modelo.
    pub fn new_vertical_tokenizer(&mut self) -> TokenizerHandle {
        self.insert_tokenizer(Tokenizer::new_vertical())
    }

    pub fn release_tokenizer(&mut self, handle: TokenizerHandle) -> Result<()> {
        self.tokenizers
            .remove(&handle.0)
            .map(|_| ())
            .ok_or(NerError::InvalidHandle(handle.0))
    }

    pub fn set_text(&mut self, handle: TokenizerHandle, text: &str) -> Result<()> {
        self.get_tokenizer(handle)?.set_text(text);
        Ok(())
    }

    /// Próxima sentença; `Ok(None)` quando o texto acabou.
    pub fn next_sentence(&mut self, handle: TokenizerHandle) -> Result<Option<Sentence>> {
        Ok(self.get_tokenizer(handle)?.next_sentence())
    }

    pub fn recognize(&self, model: ModelHandle, forms: &[String]) -> Result<Vec<NamedEntity>> {
        Ok(self.get_model(model)?.recognize(forms))
    }

    pub fn entity_types(&self, model: ModelHandle) -> Result<Vec<String>> {
        Ok(self.get_model(model)?.entity_types().to_vec())
    }

    pub fn gazetteers(&self, model: ModelHandle) -> Result<(Vec<String>, Vec<usize>)> {
        Ok(self.get_model(model)?.gazetteers())
    }

    fn allocate(&mut self) -> u64 {
        // `Default` deixa o contador em 0; o id 0 nunca é entregue
        self.next_id = self.next_id.max(1);
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn insert_tokenizer(&mut self, tokenizer: Tokenizer) -> TokenizerHandle {
        let id = self.allocate();
        self.tokenizers.insert(id, tokenizer);
        TokenizerHandle(id)
    }

    fn get_model(&self, handle: ModelHandle) -> Result<&NerModel> {
        self.models
            .get(&handle.0)
            .map(Arc::as_ref)
            .ok_or(NerError::InvalidHandle(handle.0))
    }

    fn get_tokenizer(&mut self, handle: TokenizerHandle) -> Result<&mut Tokenizer> {
        self.tokenizers
            .get_mut(&handle.0)
            .ok_or(NerError::InvalidHandle(handle.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gazetteer::{Gazetteer, GazetteerPolicy};
    use crate::model::ModelBuilder;
    use crate::tokenizer::TokenizerKind;

    fn model() -> NerModel {
        ModelBuilder::new(["person", "organization", "location"])
            .gazetteer(Gazetteer::new("empresas", "organization").with_entry("Acme Corp"))
            .gazetteer(Gazetteer::new("lugares", "location").with_entry("Globex"))
            .emission("bias", "O", 1.0)
            .emission("cap_bigram_next", "B-person", 2.0)
            .emission("cap_bigram_prev", "I-person", 2.0)
            .emission("gaz_begin=organization", "B-organization", 5.0)
            .emission("gaz_end=organization", "I-organization", 5.0)
            .build()
            .unwrap()
    }

    #[test]
    fn test_tokenize_and_recognize_through_handles() {
        let mut engine = Engine::new(EngineConfig::default());
        let model = engine.insert_model(model());
        let tokenizer = engine.new_tokenizer(model).unwrap();

        engine
            .set_text(tokenizer, "John Smith works at Acme Corp. It rains.")
            .unwrap();

        let first = engine.next_sentence(tokenizer).unwrap().unwrap();
        let entities = engine.recognize(model, &first.forms).unwrap();
        assert_eq!(
            entities,
            vec![
                NamedEntity::new(0, 2, "person"),
                NamedEntity::new(4, 2, "organization"),
            ]
        );

        assert!(engine.next_sentence(tokenizer).unwrap().is_some());
        assert!(engine.next_sentence(tokenizer).unwrap().is_none());

        assert_eq!(
            engine.entity_types(model).unwrap(),
            vec!["person", "organization", "location"]
        );
        let (entries, types) = engine.gazetteers(model).unwrap();
        assert_eq!(entries, vec!["Acme Corp", "Globex"]);
        assert_eq!(types, vec![1, 2]);
    }

    #[test]
    fn test_released_handles_are_invalid_and_never_reused() {
        let mut engine = Engine::new(EngineConfig::default());
        let model = engine.insert_model(model());
        let tokenizer = engine.new_tokenizer(model).unwrap();

        engine.release_model(model).unwrap();
        assert!(matches!(
            engine.recognize(model, &[]),
            Err(NerError::InvalidHandle(id)) if id == model.id()
        ));
        assert!(engine.release_model(model).is_err());

        // O tokenizador sobrevive ao modelo
        engine.set_text(tokenizer, "Olá mundo.").unwrap();
        assert!(engine.next_sentence(tokenizer).unwrap().is_some());

        engine.release_tokenizer(tokenizer).unwrap();
        assert!(matches!(
            engine.set_text(tokenizer, "x"),
            Err(NerError::InvalidHandle(_))
        ));

        let again = engine.insert_model(self::model());
        assert_ne!(again.id(), model.id());
        assert_ne!(again.id(), tokenizer.id());
    }

    #[test]
    fn test_config_policy_override() {
        let config = EngineConfig::default().with_gazetteer_policy(GazetteerPolicy::Authoritative);
        let mut engine = Engine::new(config);
        let model = engine.insert_model(model());

        assert_eq!(
            engine.model(model).unwrap().gazetteer_policy(),
            GazetteerPolicy::Authoritative
        );
        let forms: Vec<String> = ["at", "Globex", "."].iter().map(|s| s.to_string()).collect();
        assert_eq!(
            engine.recognize(model, &forms).unwrap(),
            vec![NamedEntity::new(1, 1, "location")]
        );
    }

    #[test]
    fn test_load_model_resolves_library_path() {
        let dir = tempfile::tempdir().unwrap();
        model().save(dir.path().join("modelo.json")).unwrap();

        let mut engine = Engine::new(EngineConfig::default().with_library_path(dir.path()));
        let handle = engine.load_model("modelo.json").unwrap();
        assert_eq!(engine.entity_types(handle).unwrap().len(), 3);

        let err = engine.load_model("inexistente.json").unwrap_err();
        assert!(err.is_load_failure());
    }

    #[test]
    fn test_vertical_tokenizer_handle() {
        let mut engine = Engine::default();
        let tokenizer = engine.new_vertical_tokenizer();
        assert_ne!(tokenizer.id(), 0);

        engine.set_text(tokenizer, "John\nSmith\n\nAcme\n").unwrap();
        let first = engine.next_sentence(tokenizer).unwrap().unwrap();
        assert_eq!(first.forms, vec!["John", "Smith"]);
        let second = engine.next_sentence(tokenizer).unwrap().unwrap();
        assert_eq!(second.forms, vec!["Acme"]);
        assert!(engine.next_sentence(tokenizer).unwrap().is_none());

        let model = engine.insert_model(model());
        let kind = engine.model(model).unwrap().tokenizer_kind();
        assert_eq!(kind, TokenizerKind::Linguistic);
    }
}
