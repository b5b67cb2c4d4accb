//! # ner-engine — Motor de Reconhecimento de Entidades Nomeadas (NER)
//!
//! Dado um texto bruto, o motor o segmenta em sentenças e tokens e atribui a
//! cada trecho um tipo de entidade (pessoa, organização, local, ...) usando um
//! modelo previamente treinado e listas auxiliares (gazetteers).
//!
//! ## Arquitetura
//!
//! O dado flui em um pipeline linear:
//!
//! 1.  **Tokenização** ([`tokenizer`]): texto → sentenças de (forma, range em chars).
//!     Variantes vertical (um token por linha) e linguística.
//! 2.  **Gazetteers** ([`gazetteer`]): ocorrências de listas conhecidas, resolvidas
//!     sem sobreposição.
//! 3.  **Extração de Features** ([`features`]): cada token vira um vetor de
//!     características de contexto (forma, capitalização, vizinhos, gazetteer).
//! 4.  **Pontuação CRF** ([`crf`]) e **Decodificação Viterbi** ([`viterbi`]):
//!     a sequência BIO ([`tagger`]) de maior score, com transições inválidas proibidas.
//! 5.  **Saída**: [`NamedEntity`] em índices de token, ou [`EntityMention`] em
//!     offsets do texto via [`NerPipeline`].
//!
//! O [`NerModel`] é carregado uma vez, validado e compartilhado somente-leitura
//! entre threads. Hosts que precisam de handles opacos usam o [`Engine`].
//!
//! ## Exemplo de Uso
//!
//! ```rust
//! use ner_engine::{Gazetteer, ModelBuilder};
//!
//! // Em produção: NerModel::load("modelo.json")
//! let model = ModelBuilder::new(["person", "organization"])
//!     .gazetteer(Gazetteer::new("empresas", "organization").with_entry("Acme Corp"))
//!     .emission("bias", "O", 1.0)
//!     .emission("cap_bigram_next", "B-person", 2.0)
//!     .emission("cap_bigram_prev", "I-person", 2.0)
//!     .emission("gaz_begin=organization", "B-organization", 5.0)
//!     .emission("gaz_end=organization", "I-organization", 5.0)
//!     .build()
//!     .unwrap();
//!
//! let mut tokenizer = model.new_tokenizer();
//! tokenizer.set_text("John Smith works at Acme Corp.");
//! while let Some(sentence) = tokenizer.next_sentence() {
//!     for entity in model.recognize(&sentence.forms) {
//!         println!("{} -> {:?}", entity, &sentence.forms[entity.start..entity.end()]);
//!     }
//! }
//! ```
//!
//! ## Módulos Principais
//!
//! - [`model`]: formato de arquivo, carregamento/validação e reconhecimento.
//! - [`pipeline`]: texto → entidades com offsets de caractere, em lote.
//! - [`registry`]: handles opacos para bindings.
//! - [`config`]: [`EngineConfig`].

pub mod config;
pub mod crf;
pub mod error;
pub mod features;
pub mod gazetteer;
pub mod model;
pub mod pipeline;
pub mod registry;
pub mod tagger;
pub mod tokenizer;
pub mod version;
pub mod viterbi;

pub use config::EngineConfig;
pub use error::{NerError, Result};
pub use gazetteer::{Gazetteer, GazetteerPolicy};
pub use model::{ModelBuilder, NerModel, Recognizer, MODEL_FORMAT, MODEL_FORMAT_VERSION};
pub use pipeline::{AnalyzedSentence, EntityMention, NerPipeline};
pub use registry::{Engine, ModelHandle, TokenizerHandle};
pub use tagger::{NamedEntity, Tag};
pub use tokenizer::{tokenize, Sentence, TokenRange, Tokenizer, TokenizerKind};
pub use version::Version;
