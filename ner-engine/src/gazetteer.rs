//! # Gazetteers — Listas de Entidades Conhecidas
//!
//! Um gazetteer é uma lista nomeada de sequências de tokens associada a um
//! tipo de entidade (ex: lista `companies` → `organization`). No carregamento
//! do modelo todas as listas são compiladas em um [`GazetteerIndex`]: uma trie
//! sobre tokens normalizados, consultada (nunca alterada) durante o
//! reconhecimento.
//!
//! ## Resolução de sobreposições
//!
//! A busca retorna todas as ocorrências ("Acme" e "Acme Corp" podem casar ao
//! mesmo tempo). [`resolve_matches`] escolhe um subconjunto sem sobreposição
//! com precedência fixa:
//!
//! 1. ocorrência **mais longa** primeiro;
//! 2. em empate, a **mais à esquerda**.
//!
//! Uma mesma sequência presente em gazetteers de tipos diferentes gera uma
//! única ocorrência com várias dicas de tipo.

use std::borrow::Cow;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{NerError, Result};
use crate::tagger::TagSet;
use crate::tokenizer::{tokenize, TokenizerKind};

/// Uma lista nomeada de entradas com o tipo sugerido.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gazetteer {
    pub name: String,
    /// Nome do tipo de entidade (deve existir no inventário do modelo).
    pub entity_type: String,
    /// Entradas em texto livre; cada uma é tokenizada com o tokenizador do modelo.
    pub entries: Vec<String>,
}

impl Gazetteer {
    pub fn new(name: impl Into<String>, entity_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entity_type: entity_type.into(),
            entries: Vec::new(),
        }
    }

    pub fn with_entry(mut self, entry: impl Into<String>) -> Self {
        self.entries.push(entry.into());
        self
    }
}

/// Como as ocorrências de gazetteer influenciam a decodificação.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GazetteerPolicy {
    /// As ocorrências viram features (`gaz_begin=tipo`, ...) e só pesam via
    /// pesos aprendidos. O modelo pode discordar da lista.
    #[default]
    Soft,
    /// As ocorrências resolvidas restringem a decodificação: o trecho é
    /// obrigatoriamente uma entidade de um dos tipos sugeridos.
    Authoritative,
}

/// Uma ocorrência de gazetteer em uma sentença.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GazetteerMatch {
    /// Índice do primeiro token.
    pub start: usize,
    /// Número de tokens.
    pub length: usize,
    /// Índices dos tipos sugeridos, ordenados e sem repetição.
    pub hints: Vec<usize>,
}

impl GazetteerMatch {
    pub fn end(&self) -> usize {
        self.start + self.length
    }
}

#[derive(Debug, Clone, Default)]
struct TrieNode {
    children: HashMap<String, usize>,
    hints: Vec<usize>,
}

/// Trie de sequências de tokens normalizados → dicas de tipo.
#[derive(Debug, Clone)]
pub struct GazetteerIndex {
    nodes: Vec<TrieNode>,
    case_sensitive: bool,
    entries: usize,
}

impl GazetteerIndex {
    pub fn new(case_sensitive: bool) -> Self {
        Self {
            nodes: vec![TrieNode::default()],
            case_sensitive,
            entries: 0,
        }
    }

    /// Compila todas as listas, validando tipos e entradas.
    pub fn build(
        gazetteers: &[Gazetteer],
        tag_set: &TagSet,
        case_sensitive: bool,
        tokenizer: TokenizerKind,
    ) -> Result<Self> {
        let mut index = Self::new(case_sensitive);

        for gazetteer in gazetteers {
            if gazetteer.name.trim().is_empty() {
                return Err(NerError::invalid_model("gazetteer sem nome"));
            }
            let hint = tag_set.type_index(&gazetteer.entity_type).ok_or_else(|| {
                NerError::invalid_model(format!(
                    "gazetteer '{}' usa tipo desconhecido '{}'",
                    gazetteer.name, gazetteer.entity_type
                ))
            })?;

            for entry in &gazetteer.entries {
                let tokens = entry_tokens(entry, tokenizer);
                if tokens.is_empty() {
                    return Err(NerError::invalid_model(format!(
                        "gazetteer '{}' contém entrada vazia",
                        gazetteer.name
                    )));
                }
                index.insert(&tokens, hint);
            }
        }

        debug!(
            entries = index.entries,
            nodes = index.nodes.len(),
            "índice de gazetteers construído"
        );
        Ok(index)
    }

    /// Insere uma sequência de tokens com a dica de tipo `hint`.
    pub fn insert<S: AsRef<str>>(&mut self, tokens: &[S], hint: usize) {
        let mut node = 0;
        for token in tokens {
            let key = self.normalize(token.as_ref()).into_owned();
            node = match self.nodes[node].children.get(&key) {
                Some(&child) => child,
                None => {
                    let child = self.nodes.len();
                    self.nodes.push(TrieNode::default());
                    self.nodes[node].children.insert(key, child);
                    child
                }
            };
        }

        let hints = &mut self.nodes[node].hints;
        if hints.is_empty() {
            self.entries += 1;
        }
        if let Err(pos) = hints.binary_search(&hint) {
            hints.insert(pos, hint);
        }
    }

    /// Número de sequências distintas indexadas.
    pub fn len(&self) -> usize {
        self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries == 0
    }

    /// Dicas de tipo para a sequência exata, se indexada.
    pub fn lookup<S: AsRef<str>>(&self, tokens: &[S]) -> Option<&[usize]> {
        let mut node = 0;
        for token in tokens {
            node = *self.nodes[node]
                .children
                .get(self.normalize(token.as_ref()).as_ref())?;
        }
        let hints = &self.nodes[node].hints;
        (!hints.is_empty()).then_some(hints.as_slice())
    }

    /// Todas as ocorrências na sentença, ordenadas por (início, comprimento).
    pub fn find_matches<S: AsRef<str>>(&self, forms: &[S]) -> Vec<GazetteerMatch> {
        if self.is_empty() {
            return Vec::new();
        }

        let normalized: Vec<Cow<'_, str>> =
            forms.iter().map(|f| self.normalize(f.as_ref())).collect();
        let mut matches = Vec::new();

        for start in 0..normalized.len() {
            let mut node = 0;
            for (end, token) in normalized.iter().enumerate().skip(start) {
                match self.nodes[node].children.get(token.as_ref()) {
                    Some(&child) => node = child,
                    None => break,
                }
                let hints = &self.nodes[node].hints;
                if !hints.is_empty() {
                    matches.push(GazetteerMatch {
                        start,
                        length: end - start + 1,
                        hints: hints.clone(),
                    });
                }
            }
        }
        matches
    }

    fn normalize<'a>(&self, form: &'a str) -> Cow<'a, str> {
        if self.case_sensitive {
            Cow::Borrowed(form)
        } else {
            Cow::Owned(form.to_lowercase())
        }
    }
}

/// Tokeniza uma entrada de gazetteer do mesmo jeito que o texto será tokenizado.
fn entry_tokens(entry: &str, tokenizer: TokenizerKind) -> Vec<String> {
    match tokenizer {
        // No modo vertical não há regra de segmentação dentro da linha
        TokenizerKind::Vertical => entry.split_whitespace().map(str::to_string).collect(),
        TokenizerKind::Linguistic => tokenize(entry, tokenizer)
            .into_iter()
            .flat_map(|s| s.forms)
            .collect(),
    }
}

/// Seleciona ocorrências sem sobreposição: mais longa primeiro, depois a mais
/// à esquerda. O resultado sai ordenado por início.
pub fn resolve_matches(matches: &[GazetteerMatch]) -> Vec<GazetteerMatch> {
    let mut candidates: Vec<&GazetteerMatch> = matches.iter().collect();
    candidates.sort_by(|a, b| b.length.cmp(&a.length).then(a.start.cmp(&b.start)));

    let mut accepted: Vec<GazetteerMatch> = Vec::new();
    for candidate in candidates {
        let free = accepted
            .iter()
            .all(|m| candidate.end() <= m.start || m.end() <= candidate.start);
        if free {
            accepted.push(candidate.clone());
        }
    }

    accepted.sort_by_key(|m| m.start);
    accepted
}
