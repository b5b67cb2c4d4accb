//! # Algoritmo de Viterbi — Decodificação de Sequências CRF
//!
//! Programação dinâmica que encontra a sequência de tags de maior score
//! total em `O(N × T²)` para N tokens e T tags.
//!
//! ```text
//! Inicialização: viterbi[0][t] = emission(t, x_0)          (t não pode ser I-X)
//! Recursão:      viterbi[i][t] = max_{t'} [viterbi[i-1][t'] + transition(t', t)] + emission(t, x_i)
//! Backtracking:  reconstrói o caminho ótimo de trás pra frente
//! ```
//!
//! ## Restrições
//!
//! - Transições inválidas no esquema BIO são **proibidas** (score −∞), não
//!   apenas penalizadas: a saída é sempre uma sequência BIO bem formada.
//! - [`TagConstraints`] permite restringir as tags aceitas por token; é assim
//!   que gazetteers autoritativos são injetados na decodificação.
//!
//! ## Desempate
//!
//! Todas as comparações são estritas e percorrem as tags em ordem de índice:
//! entre caminhos de mesmo score vence o de tags com menor índice (`O` antes de
//! `B-X`, tipos na ordem do inventário). Sem evidência, o token fica `O`.

use crate::crf::CrfModel;
use crate::tagger::Tag;

/// Tags permitidas por token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagConstraints {
    allowed: Vec<Vec<bool>>,
}

impl TagConstraints {
    /// Todas as tags permitidas em todos os tokens.
    pub fn unconstrained(n_tokens: usize, n_tags: usize) -> Self {
        Self {
            allowed: vec![vec![true; n_tags]; n_tokens],
        }
    }

    /// Restringe o token `i` às tags dadas.
    pub fn restrict(&mut self, i: usize, tags: &[Tag]) {
        if let Some(row) = self.allowed.get_mut(i) {
            for (t, slot) in row.iter_mut().enumerate() {
                *slot = tags.iter().any(|tag| tag.index() == t);
            }
        }
    }

    /// Proíbe a tag no token `i`.
    pub fn forbid(&mut self, i: usize, tag: Tag) {
        if let Some(slot) = self.allowed.get_mut(i).and_then(|row| row.get_mut(tag.index())) {
            *slot = false;
        }
    }

    pub fn is_allowed(&self, i: usize, tag: Tag) -> bool {
        self.allowed
            .get(i)
            .and_then(|row| row.get(tag.index()))
            .copied()
            .unwrap_or(true)
    }
}

/// Resultado do Viterbi.
#[derive(Debug, Clone, PartialEq)]
pub struct ViterbiResult {
    /// Sequência de tags de maior score (uma por token)
    pub best_sequence: Vec<Tag>,
    /// Score (não normalizado) da melhor sequência
    pub best_score: f64,
}

/// Executa o Viterbi sobre scores de emissão pré-calculados (`emissions[i][t]`).
pub fn viterbi_decode(
    model: &CrfModel,
    emissions: &[Vec<f64>],
    constraints: Option<&TagConstraints>,
) -> ViterbiResult {
    let n_tokens = emissions.len();
    if n_tokens == 0 {
        return ViterbiResult {
            best_sequence: vec![],
            best_score: 0.0,
        };
    }

    let n_tags = model.n_tags();
    let tags: Vec<Tag> = (0..n_tags).map(Tag::from_index).collect();
    let allowed = |i: usize, tag: Tag| constraints.map_or(true, |c| c.is_allowed(i, tag));

    // viterbi[t] = melhor score acumulado terminando na tag t no token atual
    let mut viterbi = vec![f64::NEG_INFINITY; n_tags];
    // backptr[i][t] = tag anterior no melhor caminho que chega em t no token i
    let mut backptr = vec![vec![0usize; n_tags]; n_tokens];

    // === Inicialização (token 0) ===
    for (t, tag) in tags.iter().enumerate() {
        if tag.is_valid_start() && allowed(0, *tag) {
            viterbi[t] = emissions[0][t];
        }
    }

    // === Recursão (tokens 1..N-1) ===
    for i in 1..n_tokens {
        let mut next = vec![f64::NEG_INFINITY; n_tags];

        for (t, tag) in tags.iter().enumerate() {
            if !allowed(i, *tag) {
                continue;
            }

            let mut best: Option<(usize, f64)> = None;
            for (p, prev) in tags.iter().enumerate() {
                if viterbi[p] == f64::NEG_INFINITY || !Tag::is_valid_transition(prev, tag) {
                    continue;
                }
                let score = viterbi[p] + model.transition_score(*prev, *tag);
                if best.map_or(true, |(_, b)| score > b) {
                    best = Some((p, score));
                }
            }

            if let Some((p, score)) = best {
                next[t] = score + emissions[i][t];
                backptr[i][t] = p;
            }
        }

        viterbi = next;
    }

    // === Backtracking ===
    let (mut best_last, best_score) = first_max(&viterbi);
    if best_score == f64::NEG_INFINITY {
        // Restrições impossíveis de satisfazer: nenhuma entidade
        return ViterbiResult {
            best_sequence: vec![Tag::Outside; n_tokens],
            best_score,
        };
    }

    let mut best_sequence = vec![Tag::Outside; n_tokens];
    best_sequence[n_tokens - 1] = tags[best_last];
    for i in (0..n_tokens - 1).rev() {
        best_last = backptr[i + 1][best_last];
        best_sequence[i] = tags[best_last];
    }

    ViterbiResult {
        best_sequence,
        best_score,
    }
}

/// (índice, valor) do primeiro máximo; empates ficam com o menor índice.
fn first_max(scores: &[f64]) -> (usize, f64) {
    let mut best = (0, f64::NEG_INFINITY);
    for (i, &score) in scores.iter().enumerate() {
        if score > best.1 {
            best = (i, score);
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    // Um tipo (0): O, B-0, I-0
    const N_TAGS: usize = 3;

    fn emissions(rows: &[[f64; N_TAGS]]) -> Vec<Vec<f64>> {
        rows.iter().map(|r| r.to_vec()).collect()
    }

    #[test]
    fn test_viterbi_prefers_strong_emission() {
        let model = CrfModel::new(N_TAGS);
        let e = emissions(&[[0.0, 5.0, 0.0], [1.0, 0.0, 0.5]]);
        let result = viterbi_decode(&model, &e, None);
        assert_eq!(result.best_sequence, vec![Tag::Begin(0), Tag::Outside]);
        assert!((result.best_score - 6.0).abs() < 1e-9);
    }

    #[test]
    fn test_transition_links_tokens() {
        let mut model = CrfModel::new(N_TAGS);
        model.set_transition(Tag::Begin(0), Tag::Inside(0), 3.0);
        let e = emissions(&[[0.0, 2.0, 0.0], [1.0, 0.0, 0.0]]);
        let result = viterbi_decode(&model, &e, None);
        assert_eq!(result.best_sequence, vec![Tag::Begin(0), Tag::Inside(0)]);
    }

    #[test]
    fn test_inside_never_starts_or_follows_outside() {
        let model = CrfModel::new(N_TAGS);
        // I-0 tem o maior score em todos os tokens, mas é inválido após O / no início
        let e = emissions(&[[0.0, 0.0, 9.0], [0.0, 0.0, 9.0]]);
        let result = viterbi_decode(&model, &e, None);
        assert_eq!(result.best_sequence, vec![Tag::Begin(0), Tag::Inside(0)]);
    }

    #[test]
    fn test_ties_resolve_to_outside() {
        let model = CrfModel::new(N_TAGS);
        let e = emissions(&[[0.0; N_TAGS], [0.0; N_TAGS], [0.0; N_TAGS]]);
        let result = viterbi_decode(&model, &e, None);
        assert_eq!(result.best_sequence, vec![Tag::Outside; 3]);
    }

    #[test]
    fn test_constraints_force_tags() {
        let model = CrfModel::new(N_TAGS);
        let e = emissions(&[[5.0, 0.0, 0.0], [5.0, 0.0, 0.0], [0.0, 0.0, 3.0]]);

        let mut constraints = TagConstraints::unconstrained(3, N_TAGS);
        constraints.restrict(0, &[Tag::Begin(0)]);
        constraints.restrict(1, &[Tag::Inside(0)]);
        constraints.forbid(2, Tag::Inside(0));

        let result = viterbi_decode(&model, &e, Some(&constraints));
        assert_eq!(
            result.best_sequence,
            vec![Tag::Begin(0), Tag::Inside(0), Tag::Outside]
        );
    }

    #[test]
    fn test_unsatisfiable_constraints_fall_back_to_outside() {
        let model = CrfModel::new(N_TAGS);
        let e = emissions(&[[0.0; N_TAGS]]);
        let mut constraints = TagConstraints::unconstrained(1, N_TAGS);
        constraints.restrict(0, &[Tag::Inside(0)]);

        let result = viterbi_decode(&model, &e, Some(&constraints));
        assert_eq!(result.best_sequence, vec![Tag::Outside]);
    }

    #[test]
    fn test_viterbi_empty() {
        let model = CrfModel::new(N_TAGS);
        let result = viterbi_decode(&model, &[], None);
        assert!(result.best_sequence.is_empty());
    }
}
