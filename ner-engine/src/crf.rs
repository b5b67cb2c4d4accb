//! # CRF — Conditional Random Field Linear-Chain
//!
//! Parâmetros de pontuação do reconhecedor. O score de uma sequência de tags
//! `y` para os tokens `x` é:
//!
//! ```text
//! score(y, x) = Σ_i [emission(y_i, x, i) + transition(y_{i-1}, y_i)]
//! emission(t, x, i) = Σ_k w_{k,t} * f_k(x, i)
//! ```
//!
//! Os pesos vêm prontos do arquivo de modelo; este crate não treina.

use std::collections::HashMap;

use crate::features::FeatureVector;
use crate::tagger::Tag;

/// Pesos de emissão e transição para um conjunto de `n_tags` tags.
#[derive(Debug, Clone, PartialEq)]
pub struct CrfModel {
    n_tags: usize,
    /// Pesos de emissão: feature → peso por índice de tag.
    emission_weights: HashMap<String, Vec<f64>>,
    /// Pesos de transição: indexed by [prev_tag_idx][next_tag_idx]
    transition_weights: Vec<Vec<f64>>,
}

impl CrfModel {
    /// Cria um modelo com pesos zerados.
    pub fn new(n_tags: usize) -> Self {
        Self {
            n_tags,
            emission_weights: HashMap::new(),
            transition_weights: vec![vec![0.0; n_tags]; n_tags],
        }
    }

    pub fn n_tags(&self) -> usize {
        self.n_tags
    }

    /// `score = Σ_k w_{k, tag} * f_k(x, i)`
    pub fn emission_score(&self, features: &FeatureVector, tag: Tag) -> f64 {
        let t = tag.index();
        features
            .iter()
            .filter_map(|(name, value)| {
                self.emission_weights
                    .get(name)
                    .map(|weights| value * weights[t])
            })
            .sum()
    }

    /// Scores de emissão de todas as tags de uma vez (uma busca por feature).
    pub fn emission_scores(&self, features: &FeatureVector) -> Vec<f64> {
        let mut scores = vec![0.0; self.n_tags];
        for (name, value) in features.iter() {
            if let Some(weights) = self.emission_weights.get(name) {
                for (score, w) in scores.iter_mut().zip(weights) {
                    *score += value * w;
                }
            }
        }
        scores
    }

    pub fn transition_score(&self, prev: Tag, next: Tag) -> f64 {
        self.transition_weights[prev.index()][next.index()]
    }

    /// Configura um peso de emissão (substitui o valor anterior).
    pub fn set_emission(&mut self, feature: &str, tag: Tag, weight: f64) {
        let n_tags = self.n_tags;
        let weights = self
            .emission_weights
            .entry(feature.to_string())
            .or_insert_with(|| vec![0.0; n_tags]);
        weights[tag.index()] = weight;
    }

    /// Configura um peso de transição (substitui o valor anterior).
    pub fn set_transition(&mut self, from: Tag, to: Tag, weight: f64) {
        self.transition_weights[from.index()][to.index()] = weight;
    }

    /// Número de features com algum peso.
    pub fn feature_count(&self) -> usize {
        self.emission_weights.len()
    }

    /// Pesos de emissão não nulos, em ordem (feature, tag).
    pub fn emission_entries(&self) -> Vec<(&str, Tag, f64)> {
        let mut features: Vec<&String> = self.emission_weights.keys().collect();
        features.sort();
        features
            .into_iter()
            .flat_map(|name| {
                self.emission_weights[name]
                    .iter()
                    .enumerate()
                    .filter(|(_, w)| **w != 0.0)
                    .map(move |(t, w)| (name.as_str(), Tag::from_index(t), *w))
            })
            .collect()
    }

    /// Pesos de transição não nulos, em ordem (prev, next).
    pub fn transition_entries(&self) -> Vec<(Tag, Tag, f64)> {
        let mut entries = Vec::new();
        for (p, row) in self.transition_weights.iter().enumerate() {
            for (n, &w) in row.iter().enumerate() {
                if w != 0.0 {
                    entries.push((Tag::from_index(p), Tag::from_index(n), w));
                }
            }
        }
        entries
    }
}

/// Calcula os scores de emissão para todos os tokens e tags: `scores[i][t]`.
pub fn compute_emission_scores(model: &CrfModel, feature_vectors: &[FeatureVector]) -> Vec<Vec<f64>> {
    feature_vectors
        .iter()
        .map(|fv| model.emission_scores(fv))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    // Tags para dois tipos: O, B-0, I-0, B-1, I-1
    const N_TAGS: usize = 5;

    #[test]
    fn test_emission_score_positive() {
        let mut model = CrfModel::new(N_TAGS);
        model.set_emission("is_capitalized", Tag::Begin(0), 2.5);

        let mut fv = FeatureVector::new(0);
        fv.insert("is_capitalized", 1.0);
        fv.insert("desconhecida", 1.0);

        assert!((model.emission_score(&fv, Tag::Begin(0)) - 2.5).abs() < 1e-9);
        assert!(model.emission_score(&fv, Tag::Outside).abs() < 1e-9);

        let all = model.emission_scores(&fv);
        assert_eq!(all.len(), N_TAGS);
        assert!((all[Tag::Begin(0).index()] - 2.5).abs() < 1e-9);
    }

    #[test]
    fn test_transition_score() {
        let mut model = CrfModel::new(N_TAGS);
        model.set_transition(Tag::Begin(1), Tag::Inside(1), 3.0);

        assert!((model.transition_score(Tag::Begin(1), Tag::Inside(1)) - 3.0).abs() < 1e-9);
        // Transição default é 0
        assert!(model.transition_score(Tag::Outside, Tag::Begin(0)).abs() < 1e-9);
    }

    #[test]
    fn test_entries_are_sorted_and_skip_zeros() {
        let mut model = CrfModel::new(N_TAGS);
        model.set_emission("word=b", Tag::Outside, 1.0);
        model.set_emission("word=a", Tag::Inside(1), -1.0);
        model.set_emission("word=a", Tag::Begin(0), 0.5);
        model.set_transition(Tag::Inside(0), Tag::Outside, 2.0);

        let emissions = model.emission_entries();
        assert_eq!(
            emissions,
            vec![
                ("word=a", Tag::Begin(0), 0.5),
                ("word=a", Tag::Inside(1), -1.0),
                ("word=b", Tag::Outside, 1.0),
            ]
        );
        assert_eq!(model.transition_entries(), vec![(Tag::Inside(0), Tag::Outside, 2.0)]);
        assert_eq!(model.feature_count(), 2);
    }
}
