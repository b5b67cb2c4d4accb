//! # Engenharia de Features para NER
//!
//! Para cada token, extrai um vetor de features binárias que o CRF utiliza
//! para pontuar as tags candidatas. As features capturam informações
//! ortográficas, lexicais, contextuais e de gazetteer.
//!
//! ## Features Implementadas
//!
//! ### Token atual
//! - `bias`, `word=<minúsculas>`, `shape=<forma compacta>` (ex: "Xx", "d-d")
//! - Capitalização: `is_capitalized`, `is_all_caps`, `is_mixed_case`
//! - Prefixos e sufixos de 2, 3 e 4 caracteres
//! - `is_digit`, `has_digit`, `has_hyphen`, `has_period`, `is_punctuation`
//! - Posição: `is_first`, `is_last`
//!
//! ### Contexto (janela de 2 tokens)
//! - `prev_word`, `prev2_word`, `next_word`, `next2_word`, `bigram`
//! - `BOS` / `EOS`, `prev_is_capitalized` / `next_is_capitalized`
//! - `cap_bigram_prev` / `cap_bigram_next`: o token e o vizinho são ambos
//!   capitalizados (sinal típico de nomes próprios compostos)
//!
//! ### Gazetteer
//! - `gaz=<tipo>`: o token está coberto por alguma ocorrência do tipo
//! - `gaz_begin=<tipo>`, `gaz_inside=<tipo>`, `gaz_end=<tipo>`: posição do
//!   token dentro da ocorrência escolhida por [`crate::gazetteer::resolve_matches`]
//! - `gaz_single=<tipo>`: ocorrência resolvida de um único token

use std::collections::BTreeMap;

use crate::gazetteer::GazetteerMatch;
use crate::tagger::TagSet;

/// Features ativas de um token.
///
/// O mapa é ordenado (`BTreeMap`) para que a soma dos pesos aconteça sempre na
/// mesma ordem: o reconhecimento precisa ser reproduzível bit a bit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureVector {
    /// O mapa de features ativas. Ex: `{"is_capitalized": 1.0, "word=acme": 1.0}`.
    pub features: BTreeMap<String, f64>,
    /// Índice do token na sentença.
    pub token_index: usize,
}

impl FeatureVector {
    pub fn new(token_index: usize) -> Self {
        Self {
            features: BTreeMap::new(),
            token_index,
        }
    }

    /// Adiciona uma feature com o valor dado (1.0 para features binárias).
    pub fn insert(&mut self, key: impl Into<String>, value: f64) {
        self.features.insert(key.into(), value);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.features.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.features.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

/// Posição de um token dentro de uma ocorrência resolvida de gazetteer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GazPosition {
    Single,
    Begin,
    Inside,
    End,
}

/// Ocorrências de gazetteer projetadas sobre os tokens de uma sentença.
#[derive(Debug, Clone, Default)]
pub struct GazetteerHits {
    /// Tipos de todas as ocorrências que cobrem cada token.
    membership: Vec<Vec<usize>>,
    /// Posição e tipos da ocorrência resolvida que cobre cada token.
    resolved: Vec<Option<(GazPosition, Vec<usize>)>>,
}

impl GazetteerHits {
    /// Sem nenhuma ocorrência.
    pub fn empty(n_tokens: usize) -> Self {
        Self {
            membership: vec![Vec::new(); n_tokens],
            resolved: vec![None; n_tokens],
        }
    }

    /// `raw`: todas as ocorrências; `resolved`: subconjunto sem sobreposição.
    pub fn from_matches(n_tokens: usize, raw: &[GazetteerMatch], resolved: &[GazetteerMatch]) -> Self {
        let mut hits = Self::empty(n_tokens);

        for m in raw {
            for i in m.start..m.end().min(n_tokens) {
                for &hint in &m.hints {
                    if !hits.membership[i].contains(&hint) {
                        hits.membership[i].push(hint);
                    }
                }
            }
        }
        for types in &mut hits.membership {
            types.sort_unstable();
        }

        for m in resolved {
            for i in m.start..m.end().min(n_tokens) {
                let position = if m.length == 1 {
                    GazPosition::Single
                } else if i == m.start {
                    GazPosition::Begin
                } else if i + 1 == m.end() {
                    GazPosition::End
                } else {
                    GazPosition::Inside
                };
                hits.resolved[i] = Some((position, m.hints.clone()));
            }
        }

        hits
    }
}

/// Gera vetores de features para toda a sequência de tokens.
///
/// Retorna um `Vec<FeatureVector>` alinhado com os tokens: o índice `i` do
/// retorno corresponde ao token `i` da entrada.
///
/// # Exemplo
/// Para "at Acme Corp", com "Acme Corp" no gazetteer de `organization`, o
/// vetor do índice 1 ("Acme") contém:
/// - `word=acme`, `is_capitalized`, `prev_word=at`, `next_word=corp`
/// - `cap_bigram_next`
/// - `gaz=organization`, `gaz_begin=organization`
pub fn extract_features<S: AsRef<str>>(
    forms: &[S],
    gazetteer: &GazetteerHits,
    tag_set: &TagSet,
) -> Vec<FeatureVector> {
    let forms: Vec<&str> = forms.iter().map(|f| f.as_ref()).collect();
    (0..forms.len())
        .map(|i| extract_for_token(&forms, i, gazetteer, tag_set))
        .collect()
}

/// Extrai features para um único token em seu contexto.
pub fn extract_for_token(
    forms: &[&str],
    i: usize,
    gazetteer: &GazetteerHits,
    tag_set: &TagSet,
) -> FeatureVector {
    let mut fv = FeatureVector::new(i);
    let word = forms[i];
    let lower = word.to_lowercase();

    // === Features da palavra atual ===
    fv.insert("bias", 1.0);
    fv.insert(format!("word={lower}"), 1.0);
    fv.insert(format!("shape={}", word_shape(word)), 1.0);

    // Capitalização
    let capitalized = is_capitalized(word);
    let has_alpha = word.chars().any(char::is_alphabetic);
    let all_upper = has_alpha && word.chars().all(|c| c.is_uppercase() || !c.is_alphabetic());

    if capitalized {
        fv.insert("is_capitalized", 1.0);
    }
    if all_upper && word.chars().count() > 1 {
        fv.insert("is_all_caps", 1.0);
    }
    if word.chars().skip(1).any(char::is_uppercase) && !all_upper {
        fv.insert("is_mixed_case", 1.0);
    }

    // Prefixos e sufixos
    let chars: Vec<char> = lower.chars().collect();
    for n in 2..=4 {
        if chars.len() >= n {
            let prefix: String = chars[..n].iter().collect();
            let suffix: String = chars[chars.len() - n..].iter().collect();
            fv.insert(format!("prefix{n}={prefix}"), 1.0);
            fv.insert(format!("suffix{n}={suffix}"), 1.0);
        }
    }

    // Padrões numéricos e de pontuação
    if !word.is_empty() && word.chars().all(char::is_numeric) {
        fv.insert("is_digit", 1.0);
    } else if word.chars().any(char::is_numeric) {
        fv.insert("has_digit", 1.0);
    }
    if word.contains('-') {
        fv.insert("has_hyphen", 1.0);
    }
    if word.contains('.') {
        fv.insert("has_period", 1.0);
    }
    if !word.is_empty() && !word.chars().any(char::is_alphanumeric) {
        fv.insert("is_punctuation", 1.0);
    }

    // Posição na sequência
    if i == 0 {
        fv.insert("is_first", 1.0);
    }
    if i + 1 == forms.len() {
        fv.insert("is_last", 1.0);
    }

    // === Features de contexto ===
    if i > 0 {
        let prev = forms[i - 1];
        fv.insert(format!("prev_word={}", prev.to_lowercase()), 1.0);
        if is_capitalized(prev) {
            fv.insert("prev_is_capitalized", 1.0);
            if capitalized {
                fv.insert("cap_bigram_prev", 1.0);
            }
        }
    } else {
        fv.insert("BOS", 1.0);
    }

    if i > 1 {
        fv.insert(format!("prev2_word={}", forms[i - 2].to_lowercase()), 1.0);
    }

    if i + 1 < forms.len() {
        let next = forms[i + 1];
        fv.insert(format!("next_word={}", next.to_lowercase()), 1.0);
        if is_capitalized(next) {
            fv.insert("next_is_capitalized", 1.0);
            if capitalized {
                fv.insert("cap_bigram_next", 1.0);
            }
        }
    } else {
        fv.insert("EOS", 1.0);
    }

    if i + 2 < forms.len() {
        fv.insert(format!("next2_word={}", forms[i + 2].to_lowercase()), 1.0);
    }

    if i > 0 && i + 1 < forms.len() {
        fv.insert(
            format!(
                "bigram={}_{}",
                forms[i - 1].to_lowercase(),
                forms[i + 1].to_lowercase()
            ),
            1.0,
        );
    }

    // === Features de Gazetteer ===
    if let Some(types) = gazetteer.membership.get(i) {
        for &t in types {
            if let Some(name) = tag_set.type_name(t) {
                fv.insert(format!("gaz={name}"), 1.0);
            }
        }
    }
    if let Some(Some((position, types))) = gazetteer.resolved.get(i) {
        let prefix = match position {
            GazPosition::Single => "gaz_single",
            GazPosition::Begin => "gaz_begin",
            GazPosition::Inside => "gaz_inside",
            GazPosition::End => "gaz_end",
        };
        for &t in types {
            if let Some(name) = tag_set.type_name(t) {
                fv.insert(format!("{prefix}={name}"), 1.0);
            }
        }
    }

    fv
}

/// Primeira letra maiúscula.
pub fn is_capitalized(word: &str) -> bool {
    word.chars().next().is_some_and(char::is_uppercase)
}

/// Forma compacta da palavra: maiúscula → `X`, minúscula → `x`, dígito → `d`,
/// demais caracteres preservados; repetições consecutivas colapsadas.
///
/// "Acme" → "Xx", "COVID-19" → "X-d", "e.g." → "x.x."
pub fn word_shape(word: &str) -> String {
    let mut shape = String::new();
    let mut last: Option<char> = None;
    for c in word.chars() {
        let mapped = if c.is_uppercase() {
            'X'
        } else if c.is_lowercase() {
            'x'
        } else if c.is_numeric() {
            'd'
        } else {
            c
        };
        if last != Some(mapped) {
            shape.push(mapped);
            last = Some(mapped);
        }
    }
    shape
}
