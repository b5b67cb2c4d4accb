//! # Modelo NER Pré-treinado
//!
//! O modelo encapsula tudo que o reconhecimento consulta:
//! - **Inventário de tipos** (`person`, `organization`, ...) e o [`TagSet`] BIO derivado
//! - **Gazetteers** compilados em um [`GazetteerIndex`]
//! - **Pesos CRF** de emissão e transição
//! - A variante de tokenizador com que o modelo foi treinado
//!
//! Um `NerModel` é imutável depois de carregado e pode ser compartilhado entre
//! threads (`&NerModel` ou `Arc<NerModel>`). Toda validação acontece no
//! carregamento; o reconhecimento nunca falha.
//!
//! ## Formato do arquivo
//!
//! Documento JSON auto-descritivo e versionado:
//!
//! ```json
//! {
//!   "format": "ner-engine-model",
//!   "version": 1,
//!   "tokenizer": "linguistic",
//!   "entity_types": ["person", "organization"],
//!   "gazetteer_policy": "soft",
//!   "case_sensitive_gazetteers": false,
//!   "gazetteers": [{ "name": "empresas", "entity_type": "organization", "entries": ["Acme Corp"] }],
//!   "emissions": [{ "feature": "bias", "label": "O", "weight": 1.0 }],
//!   "transitions": [{ "from": "B-person", "to": "I-person", "weight": 0.5 }]
//! }
//! ```
//!
//! Pesos ausentes valem zero. Este crate não treina: [`ModelBuilder`] só
//! monta e serializa modelos cujos pesos já são conhecidos.

use std::fs::{self, File};
use std::io::{BufReader, Read};
use std::path::Path;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace};

use crate::config::DEFAULT_PARALLEL_THRESHOLD;
use crate::crf::{compute_emission_scores, CrfModel};
use crate::error::{NerError, Result};
use crate::features::{extract_features, GazetteerHits};
use crate::gazetteer::{resolve_matches, Gazetteer, GazetteerIndex, GazetteerMatch, GazetteerPolicy};
use crate::tagger::{tags_to_entities, NamedEntity, Tag, TagSet};
use crate::tokenizer::{Sentence, Tokenizer, TokenizerKind};
use crate::viterbi::{viterbi_decode, TagConstraints};

/// Identificador gravado no campo `format` de todo arquivo de modelo.
pub const MODEL_FORMAT: &str = "ner-engine-model";

/// Maior versão de formato que este build sabe ler.
pub const MODEL_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct EmissionWeight {
    feature: String,
    label: String,
    weight: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct TransitionWeight {
    from: String,
    to: String,
    weight: f64,
}

/// Representação serializada de um modelo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct ModelFile {
    format: String,
    version: u32,
    #[serde(default)]
    tokenizer: TokenizerKind,
    entity_types: Vec<String>,
    #[serde(default)]
    gazetteer_policy: GazetteerPolicy,
    #[serde(default)]
    case_sensitive_gazetteers: bool,
    #[serde(default)]
    gazetteers: Vec<Gazetteer>,
    #[serde(default)]
    emissions: Vec<EmissionWeight>,
    #[serde(default)]
    transitions: Vec<TransitionWeight>,
}

impl ModelFile {
    fn new(entity_types: Vec<String>) -> Self {
        Self {
            format: MODEL_FORMAT.to_string(),
            version: MODEL_FORMAT_VERSION,
            tokenizer: TokenizerKind::default(),
            entity_types,
            gazetteer_policy: GazetteerPolicy::default(),
            case_sensitive_gazetteers: false,
            gazetteers: Vec::new(),
            emissions: Vec::new(),
            transitions: Vec::new(),
        }
    }
}

/// Capacidade de reconhecimento exposta aos hosts.
///
/// Implementada por [`NerModel`]; permite que camadas superiores (pipeline,
/// registry, bindings) trabalhem com `dyn Recognizer`.
pub trait Recognizer: Send + Sync {
    /// Entidades de uma sentença já tokenizada, em ordem e sem sobreposição.
    fn recognize(&self, forms: &[String]) -> Vec<NamedEntity>;

    /// Inventário de tipos, na ordem do modelo.
    fn entity_types(&self) -> &[String];

    /// Entradas de gazetteer e o índice do tipo de cada uma (listas paralelas).
    fn gazetteers(&self) -> (Vec<String>, Vec<usize>);

    /// Um tokenizador novo da variante configurada no modelo.
    fn new_tokenizer(&self) -> Tokenizer;
}

/// O modelo NER completo.
#[derive(Debug, Clone)]
pub struct NerModel {
    tokenizer: TokenizerKind,
    tag_set: TagSet,
    gazetteers: Vec<Gazetteer>,
    gazetteer_index: GazetteerIndex,
    policy: GazetteerPolicy,
    case_sensitive_gazetteers: bool,
    crf: CrfModel,
    parallel_threshold: usize,
}

impl NerModel {
    /// Carrega e valida um modelo a partir de um arquivo.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| NerError::io(path, e))?;
        let model = Self::from_reader(BufReader::new(file))?;

        info!(
            path = %path.display(),
            entity_types = model.tag_set.entity_types().len(),
            gazetteer_entries = model.gazetteer_index.len(),
            features = model.crf.feature_count(),
            "modelo carregado"
        );
        Ok(model)
    }

    /// Carrega e valida um modelo de qualquer fonte de bytes.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_reader(reader)?;
        check_header(&value)?;
        Self::from_model_file(serde_json::from_value(value)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Self::from_reader(json.as_bytes())
    }

    fn from_model_file(file: ModelFile) -> Result<Self> {
        validate_entity_types(&file.entity_types)?;
        let tag_set = TagSet::new(file.entity_types);

        let gazetteer_index = GazetteerIndex::build(
            &file.gazetteers,
            &tag_set,
            file.case_sensitive_gazetteers,
            file.tokenizer,
        )?;

        let mut crf = CrfModel::new(tag_set.count());
        for entry in &file.emissions {
            let tag = parse_label(&tag_set, &entry.label)?;
            check_weight(entry.weight, &entry.feature)?;
            crf.set_emission(&entry.feature, tag, entry.weight);
        }
        for entry in &file.transitions {
            let from = parse_label(&tag_set, &entry.from)?;
            let to = parse_label(&tag_set, &entry.to)?;
            check_weight(entry.weight, &format!("{} -> {}", entry.from, entry.to))?;
            crf.set_transition(from, to, entry.weight);
        }

        debug!(
            tags = tag_set.count(),
            features = crf.feature_count(),
            transitions = file.transitions.len(),
            policy = ?file.gazetteer_policy,
            "modelo validado"
        );

        Ok(Self {
            tokenizer: file.tokenizer,
            tag_set,
            gazetteers: file.gazetteers,
            gazetteer_index,
            policy: file.gazetteer_policy,
            case_sensitive_gazetteers: file.case_sensitive_gazetteers,
            crf,
            parallel_threshold: DEFAULT_PARALLEL_THRESHOLD,
        })
    }

    /// Serializa o modelo no formato de arquivo (JSON indentado).
    pub fn to_json(&self) -> Result<String> {
        let mut file = ModelFile::new(self.tag_set.entity_types().to_vec());
        file.tokenizer = self.tokenizer;
        file.gazetteer_policy = self.policy;
        file.case_sensitive_gazetteers = self.case_sensitive_gazetteers;
        file.gazetteers = self.gazetteers.clone();
        file.emissions = self
            .crf
            .emission_entries()
            .into_iter()
            .map(|(feature, tag, weight)| EmissionWeight {
                feature: feature.to_string(),
                label: self.tag_set.label(tag),
                weight,
            })
            .collect();
        file.transitions = self
            .crf
            .transition_entries()
            .into_iter()
            .map(|(from, to, weight)| TransitionWeight {
                from: self.tag_set.label(from),
                to: self.tag_set.label(to),
                weight,
            })
            .collect();

        Ok(serde_json::to_string_pretty(&file)?)
    }

    /// Grava o modelo em disco.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        fs::write(path, self.to_json()?).map_err(|e| NerError::io(path, e))
    }

    /// Substitui a política de gazetteer gravada no modelo.
    pub fn with_policy(mut self, policy: GazetteerPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Número mínimo de sentenças para [`NerModel::recognize_batch`] usar o pool do rayon.
    pub fn with_parallel_threshold(mut self, threshold: usize) -> Self {
        self.parallel_threshold = threshold;
        self
    }

    pub fn entity_types(&self) -> &[String] {
        self.tag_set.entity_types()
    }

    pub fn tag_set(&self) -> &TagSet {
        &self.tag_set
    }

    /// Todas as entradas de gazetteer (na ordem das listas e das entradas) e
    /// o índice do tipo de cada uma em [`NerModel::entity_types`].
    pub fn gazetteers(&self) -> (Vec<String>, Vec<usize>) {
        let mut entries = Vec::new();
        let mut types = Vec::new();
        for gazetteer in &self.gazetteers {
            // Tipos já validados no carregamento
            let Some(t) = self.tag_set.type_index(&gazetteer.entity_type) else {
                continue;
            };
            for entry in &gazetteer.entries {
                entries.push(entry.clone());
                types.push(t);
            }
        }
        (entries, types)
    }

    /// As listas de gazetteer como foram declaradas no modelo.
    pub fn gazetteer_lists(&self) -> &[Gazetteer] {
        &self.gazetteers
    }

    pub fn gazetteer_policy(&self) -> GazetteerPolicy {
        self.policy
    }

    pub fn tokenizer_kind(&self) -> TokenizerKind {
        self.tokenizer
    }

    pub fn new_tokenizer(&self) -> Tokenizer {
        Tokenizer::new(self.tokenizer)
    }

    /// Sequência BIO de maior score para a sentença.
    pub fn tag<S: AsRef<str>>(&self, forms: &[S]) -> Vec<Tag> {
        if forms.is_empty() {
            return Vec::new();
        }

        let raw = self.gazetteer_index.find_matches(forms);
        let resolved = resolve_matches(&raw);
        let hits = GazetteerHits::from_matches(forms.len(), &raw, &resolved);

        let features = extract_features(forms, &hits, &self.tag_set);
        let emissions = compute_emission_scores(&self.crf, &features);

        let constraints = match self.policy {
            GazetteerPolicy::Soft => None,
            GazetteerPolicy::Authoritative => Some(gazetteer_constraints(
                forms.len(),
                self.tag_set.count(),
                &resolved,
            )),
        };

        viterbi_decode(&self.crf, &emissions, constraints.as_ref()).best_sequence
    }

    /// Rótulos textuais ("B-person", "O", ...) da melhor sequência.
    pub fn labels<S: AsRef<str>>(&self, forms: &[S]) -> Vec<String> {
        self.tag(forms)
            .into_iter()
            .map(|tag| self.tag_set.label(tag))
            .collect()
    }

    /// Reconhece as entidades de uma sentença tokenizada.
    pub fn recognize<S: AsRef<str>>(&self, forms: &[S]) -> Vec<NamedEntity> {
        let entities = tags_to_entities(&self.tag(forms), &self.tag_set);
        trace!(
            tokens = forms.len(),
            entities = entities.len(),
            "sentença reconhecida"
        );
        entities
    }

    /// Reconhece várias sentenças; acima do limiar configurado usa o rayon.
    /// O resultado segue a ordem da entrada.
    pub fn recognize_batch(&self, sentences: &[Sentence]) -> Vec<Vec<NamedEntity>> {
        if sentences.len() >= self.parallel_threshold {
            sentences
                .par_iter()
                .map(|s| self.recognize(&s.forms))
                .collect()
        } else {
            sentences.iter().map(|s| self.recognize(&s.forms)).collect()
        }
    }
}

impl Recognizer for NerModel {
    fn recognize(&self, forms: &[String]) -> Vec<NamedEntity> {
        NerModel::recognize(self, forms)
    }

    fn entity_types(&self) -> &[String] {
        NerModel::entity_types(self)
    }

    fn gazetteers(&self) -> (Vec<String>, Vec<usize>) {
        NerModel::gazetteers(self)
    }

    fn new_tokenizer(&self) -> Tokenizer {
        NerModel::new_tokenizer(self)
    }
}

/// Monta um modelo em memória (pesos já conhecidos).
///
/// ```
/// use ner_engine::{Gazetteer, ModelBuilder};
///
/// let model = ModelBuilder::new(["person", "organization"])
///     .gazetteer(Gazetteer::new("empresas", "organization").with_entry("Acme Corp"))
///     .emission("bias", "O", 1.0)
///     .emission("gaz_begin=organization", "B-organization", 5.0)
///     .emission("gaz_end=organization", "I-organization", 5.0)
///     .build()
///     .unwrap();
///
/// let entities = model.recognize(&["at", "Acme", "Corp"]);
/// assert_eq!(entities[0].entity_type, "organization");
/// ```
#[derive(Debug, Clone)]
pub struct ModelBuilder {
    file: ModelFile,
}

impl ModelBuilder {
    pub fn new<I, S>(entity_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            file: ModelFile::new(entity_types.into_iter().map(Into::into).collect()),
        }
    }

    pub fn tokenizer(mut self, kind: TokenizerKind) -> Self {
        self.file.tokenizer = kind;
        self
    }

    pub fn gazetteer_policy(mut self, policy: GazetteerPolicy) -> Self {
        self.file.gazetteer_policy = policy;
        self
    }

    pub fn case_sensitive_gazetteers(mut self, case_sensitive: bool) -> Self {
        self.file.case_sensitive_gazetteers = case_sensitive;
        self
    }

    pub fn gazetteer(mut self, gazetteer: Gazetteer) -> Self {
        self.file.gazetteers.push(gazetteer);
        self
    }

    /// Peso de emissão para (feature, rótulo). O rótulo é "O", "B-tipo" ou "I-tipo".
    pub fn emission(mut self, feature: impl Into<String>, label: impl Into<String>, weight: f64) -> Self {
        self.file.emissions.push(EmissionWeight {
            feature: feature.into(),
            label: label.into(),
            weight,
        });
        self
    }

    pub fn transition(mut self, from: impl Into<String>, to: impl Into<String>, weight: f64) -> Self {
        self.file.transitions.push(TransitionWeight {
            from: from.into(),
            to: to.into(),
            weight,
        });
        self
    }

    /// Valida e constrói o modelo (mesmas regras do carregamento).
    pub fn build(self) -> Result<NerModel> {
        NerModel::from_model_file(self.file)
    }
}

fn check_header(value: &serde_json::Value) -> Result<()> {
    let format = value.get("format").and_then(serde_json::Value::as_str);
    if format != Some(MODEL_FORMAT) {
        return Err(NerError::Format {
            expected: MODEL_FORMAT,
            found: format.unwrap_or_default().to_string(),
        });
    }

    let version = value
        .get("version")
        .and_then(serde_json::Value::as_u64)
        .unwrap_or(0);
    if version == 0 || version > u64::from(MODEL_FORMAT_VERSION) {
        return Err(NerError::IncompatibleVersion {
            found: u32::try_from(version).unwrap_or(u32::MAX),
            supported: MODEL_FORMAT_VERSION,
        });
    }
    Ok(())
}

fn validate_entity_types(entity_types: &[String]) -> Result<()> {
    for (i, name) in entity_types.iter().enumerate() {
        if name.is_empty() {
            return Err(NerError::invalid_model("tipo de entidade vazio"));
        }
        if name.contains(|c: char| c.is_whitespace() || c == '|') {
            return Err(NerError::invalid_model(format!(
                "tipo de entidade '{name}' contém caractere proibido"
            )));
        }
        if entity_types[..i].contains(name) {
            return Err(NerError::invalid_model(format!(
                "tipo de entidade '{name}' duplicado"
            )));
        }
    }
    Ok(())
}

fn parse_label(tag_set: &TagSet, label: &str) -> Result<Tag> {
    tag_set
        .parse_label(label)
        .ok_or_else(|| NerError::invalid_model(format!("rótulo desconhecido '{label}'")))
}

fn check_weight(weight: f64, context: &str) -> Result<()> {
    if weight.is_finite() {
        Ok(())
    } else {
        Err(NerError::invalid_model(format!(
            "peso não finito em '{context}'"
        )))
    }
}

/// Restrições da política autoritativa: cada ocorrência resolvida vira
/// obrigatoriamente `B-t I-t*` para um de seus tipos, e o token seguinte não
/// pode estender a entidade.
fn gazetteer_constraints(
    n_tokens: usize,
    n_tags: usize,
    resolved: &[GazetteerMatch],
) -> TagConstraints {
    let mut constraints = TagConstraints::unconstrained(n_tokens, n_tags);

    for m in resolved {
        let begin: Vec<Tag> = m.hints.iter().map(|&t| Tag::Begin(t)).collect();
        let inside: Vec<Tag> = m.hints.iter().map(|&t| Tag::Inside(t)).collect();

        constraints.restrict(m.start, &begin);
        for i in m.start + 1..m.end() {
            constraints.restrict(i, &inside);
        }
        for &tag in &inside {
            constraints.forbid(m.end(), tag);
        }
    }

    constraints
}
