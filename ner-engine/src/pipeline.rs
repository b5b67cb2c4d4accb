//! # Pipeline NER — do Texto Bruto às Entidades
//!
//! Conveniência sobre [`NerModel`] para hosts que trabalham com texto em vez
//! de sentenças tokenizadas:
//!
//! 1. Tokenização com a variante do modelo (sentença a sentença)
//! 2. Reconhecimento de cada sentença ([`NerModel::recognize_batch`])
//! 3. Projeção das entidades (índices de token) de volta para o texto:
//!    [`EntityMention`] com offset em caracteres e o trecho original
//!
//! `analyze_documents` processa vários documentos em paralelo com o rayon,
//! preservando a ordem de entrada.

use std::iter;
use std::sync::Arc;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::model::NerModel;
use crate::tagger::NamedEntity;
use crate::tokenizer::{Sentence, TokenRange};

/// Uma entidade localizada no texto original.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityMention {
    /// Offset do primeiro caractere (em chars, não bytes).
    pub start: usize,
    /// Comprimento em chars, do início do primeiro token ao fim do último.
    pub length: usize,
    pub entity_type: String,
    /// Trecho do texto original coberto pela entidade.
    pub text: String,
}

/// Resultado de uma sentença.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyzedSentence {
    pub forms: Vec<String>,
    pub ranges: Vec<TokenRange>,
    /// Entidades em índices de token.
    pub entities: Vec<NamedEntity>,
    /// As mesmas entidades, em offsets de caractere.
    pub mentions: Vec<EntityMention>,
}

/// O pipeline NER: um modelo compartilhado + tokenização + projeção de offsets.
#[derive(Debug, Clone)]
pub struct NerPipeline {
    model: Arc<NerModel>,
}

impl NerPipeline {
    pub fn new(model: Arc<NerModel>) -> Self {
        Self { model }
    }

    pub fn model(&self) -> &NerModel {
        &self.model
    }

    /// Tokeniza e reconhece um texto inteiro.
    pub fn analyze(&self, text: &str) -> Vec<AnalyzedSentence> {
        let mut tokenizer = self.model.new_tokenizer();
        tokenizer.set_text(text);
        let sentences: Vec<Sentence> = iter::from_fn(|| tokenizer.next_sentence()).collect();
        let recognized = self.model.recognize_batch(&sentences);

        let offsets = CharOffsets::new(text);
        let analyzed: Vec<AnalyzedSentence> = sentences
            .into_iter()
            .zip(recognized)
            .map(|(sentence, entities)| {
                let mentions = entities
                    .iter()
                    .map(|entity| offsets.mention(entity, &sentence.ranges))
                    .collect();
                AnalyzedSentence {
                    forms: sentence.forms,
                    ranges: sentence.ranges,
                    entities,
                    mentions,
                }
            })
            .collect();

        debug!(
            sentences = analyzed.len(),
            entities = analyzed.iter().map(|s| s.entities.len()).sum::<usize>(),
            "texto analisado"
        );
        analyzed
    }

    /// Todas as menções do texto, na ordem em que aparecem.
    pub fn mentions(&self, text: &str) -> Vec<EntityMention> {
        self.analyze(text)
            .into_iter()
            .flat_map(|s| s.mentions)
            .collect()
    }

    /// Analisa vários documentos em paralelo; o resultado segue a ordem da entrada.
    pub fn analyze_documents(&self, documents: &[&str]) -> Vec<Vec<AnalyzedSentence>> {
        documents.par_iter().map(|text| self.analyze(text)).collect()
    }
}

/// Tabela char → byte de um texto, para recortar trechos por offset de char.
struct CharOffsets<'a> {
    text: &'a str,
    bytes: Vec<usize>,
}

impl<'a> CharOffsets<'a> {
    fn new(text: &'a str) -> Self {
        let bytes = text
            .char_indices()
            .map(|(b, _)| b)
            .chain(iter::once(text.len()))
            .collect();
        Self { text, bytes }
    }

    fn slice(&self, start: usize, end: usize) -> &'a str {
        let last = self.bytes.len() - 1;
        let from = self.bytes[start.min(last)];
        let to = self.bytes[end.min(last)];
        &self.text[from..to]
    }

    fn mention(&self, entity: &NamedEntity, ranges: &[TokenRange]) -> EntityMention {
        let start = ranges[entity.start].start;
        let end = ranges[entity.end() - 1].end();
        EntityMention {
            start,
            length: end - start,
            entity_type: entity.entity_type.clone(),
            text: self.slice(start, end).to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gazetteer::Gazetteer;
    use crate::model::ModelBuilder;
    use crate::tokenizer::TokenizerKind;

    fn builder() -> ModelBuilder {
        ModelBuilder::new(["person", "organization", "location"])
            .gazetteer(Gazetteer::new("empresas", "organization").with_entry("Acme Corp"))
            .emission("bias", "O", 1.0)
            .emission("cap_bigram_next", "B-person", 2.0)
            .emission("cap_bigram_prev", "I-person", 2.0)
            .emission("gaz_begin=organization", "B-organization", 5.0)
            .emission("gaz_end=organization", "I-organization", 5.0)
    }

    fn pipeline() -> NerPipeline {
        NerPipeline::new(Arc::new(builder().build().unwrap()))
    }

    #[test]
    fn test_pipeline_basic() {
        let text = "John Smith works at Acme Corp. It rains.";
        let sentences = pipeline().analyze(text);
        assert_eq!(sentences.len(), 2);

        let first = &sentences[0];
        assert_eq!(first.forms.len(), first.ranges.len());
        assert_eq!(
            first.mentions,
            vec![
                EntityMention {
                    start: 0,
                    length: 10,
                    entity_type: "person".into(),
                    text: "John Smith".into(),
                },
                EntityMention {
                    start: 20,
                    length: 9,
                    entity_type: "organization".into(),
                    text: "Acme Corp".into(),
                },
            ]
        );
        assert!(sentences[1].entities.is_empty());
    }

    #[test]
    fn test_mentions_use_char_offsets() {
        let text = "Então José Silva visitou a Acme Corp.";
        let mentions = pipeline().mentions(text);

        let acme = mentions
            .iter()
            .find(|m| m.entity_type == "organization")
            .unwrap();
        assert_eq!(acme.text, "Acme Corp");
        let chars: Vec<char> = text.chars().collect();
        let slice: String = chars[acme.start..acme.start + acme.length].iter().collect();
        assert_eq!(slice, "Acme Corp");
    }

    #[test]
    fn test_pipeline_empty() {
        assert!(pipeline().analyze("").is_empty());
        assert!(pipeline().analyze("   \n\n  ").is_empty());
    }

    #[test]
    fn test_vertical_model() {
        let model = builder().tokenizer(TokenizerKind::Vertical).build().unwrap();
        let pipeline = NerPipeline::new(Arc::new(model));
        let sentences = pipeline.analyze("at\nAcme\nCorp\n\nnothing\n");

        assert_eq!(sentences.len(), 2);
        assert_eq!(sentences[0].mentions[0].text, "Acme\nCorp");
        assert_eq!(sentences[0].entities, vec![NamedEntity::new(1, 2, "organization")]);
        assert_eq!(sentences[0].mentions[0].length, 9);
        assert!(sentences[1].entities.is_empty());
    }

    #[test]
    fn test_analyze_documents_preserves_order() {
        let pipeline = pipeline();
        let documents = [
            "John Smith works at Acme Corp.",
            "nothing to see here.",
            "We met at Acme Corp today.",
        ];
        let parallel = pipeline.analyze_documents(&documents);
        assert_eq!(parallel.len(), 3);
        for (text, result) in documents.iter().zip(&parallel) {
            assert_eq!(result, &pipeline.analyze(text));
        }
        assert!(parallel[1].iter().all(|s| s.entities.is_empty()));
    }
}
