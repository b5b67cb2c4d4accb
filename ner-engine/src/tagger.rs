//! # Esquema de Tags BIO sobre o Inventário de Tipos
//!
//! O modelo define um conjunto fechado e ordenado de tipos de entidade
//! (ex: `person`, `organization`, `location`). A partir dele derivamos as
//! tags BIO usadas na decodificação:
//!
//! | Índice    | Tag        | Significado                          |
//! |-----------|------------|--------------------------------------|
//! | 0         | `O`        | fora de entidade                     |
//! | 1 + 2k    | `B-tipo_k` | primeiro token de uma entidade       |
//! | 2 + 2k    | `I-tipo_k` | continuação da mesma entidade        |
//!
//! A ordem dos índices também é a ordem de desempate do Viterbi: em empate,
//! vence a tag de menor índice (portanto `O`).

use std::fmt;

use serde::{Deserialize, Serialize};

/// Tag BIO aplicada a um token. O `usize` é o índice do tipo no inventário.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Tag {
    /// **Outside**: o token não faz parte de nenhuma entidade.
    Outside,
    /// **Begin**: início de uma entidade do tipo indicado.
    Begin(usize),
    /// **Inside**: continuação de uma entidade do tipo indicado.
    Inside(usize),
}

impl Tag {
    /// Índice numérico da tag para matrizes de emissão/transição.
    pub fn index(&self) -> usize {
        match self {
            Tag::Outside => 0,
            Tag::Begin(t) => 1 + 2 * t,
            Tag::Inside(t) => 2 + 2 * t,
        }
    }

    /// Inverso de [`Tag::index`].
    pub fn from_index(index: usize) -> Self {
        match index {
            0 => Tag::Outside,
            i if i % 2 == 1 => Tag::Begin((i - 1) / 2),
            i => Tag::Inside((i - 2) / 2),
        }
    }

    /// Tipo da entidade (se for B- ou I-).
    pub fn entity_type(&self) -> Option<usize> {
        match self {
            Tag::Begin(t) | Tag::Inside(t) => Some(*t),
            Tag::Outside => None,
        }
    }

    /// Verifica se a transição `prev → next` é válida no esquema BIO.
    ///
    /// - `I-X` só pode seguir `B-X` ou `I-X` (mesmo tipo)
    /// - `B-X` e `O` podem seguir qualquer tag
    pub fn is_valid_transition(prev: &Tag, next: &Tag) -> bool {
        match next {
            Tag::Inside(t) => match prev {
                Tag::Begin(p) | Tag::Inside(p) => p == t,
                Tag::Outside => false,
            },
            _ => true,
        }
    }

    /// Se a tag pode abrir a sentença (`I-X` não pode).
    pub fn is_valid_start(&self) -> bool {
        !matches!(self, Tag::Inside(_))
    }
}

/// Conjunto de tags derivado do inventário de tipos de um modelo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagSet {
    entity_types: Vec<String>,
}

impl TagSet {
    pub fn new(entity_types: Vec<String>) -> Self {
        Self { entity_types }
    }

    pub fn entity_types(&self) -> &[String] {
        &self.entity_types
    }

    /// Número total de tags (`O` + B/I por tipo).
    pub fn count(&self) -> usize {
        1 + 2 * self.entity_types.len()
    }

    /// Todas as tags em ordem de índice.
    pub fn all(&self) -> Vec<Tag> {
        (0..self.count()).map(Tag::from_index).collect()
    }

    pub fn type_index(&self, name: &str) -> Option<usize> {
        self.entity_types.iter().position(|t| t == name)
    }

    pub fn type_name(&self, index: usize) -> Option<&str> {
        self.entity_types.get(index).map(String::as_str)
    }

    /// Representação textual da tag (ex: "B-person", "I-location", "O").
    pub fn label(&self, tag: Tag) -> String {
        match tag {
            Tag::Outside => "O".to_string(),
            Tag::Begin(t) => format!("B-{}", self.entity_types[t]),
            Tag::Inside(t) => format!("I-{}", self.entity_types[t]),
        }
    }

    /// Parseia um rótulo ("O", "B-tipo", "I-tipo") contra o inventário.
    pub fn parse_label(&self, label: &str) -> Option<Tag> {
        if label == "O" {
            return Some(Tag::Outside);
        }
        if let Some(name) = label.strip_prefix("B-") {
            return self.type_index(name).map(Tag::Begin);
        }
        if let Some(name) = label.strip_prefix("I-") {
            return self.type_index(name).map(Tag::Inside);
        }
        None
    }
}

/// Uma entidade reconhecida: intervalo de **tokens** da sentença e seu tipo.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NamedEntity {
    /// Índice do primeiro token.
    pub start: usize,
    /// Número de tokens (>= 1).
    pub length: usize,
    /// Nome do tipo (um dos `entity_types()` do modelo).
    #[serde(rename = "type")]
    pub entity_type: String,
}

impl NamedEntity {
    pub fn new(start: usize, length: usize, entity_type: impl Into<String>) -> Self {
        Self {
            start,
            length,
            entity_type: entity_type.into(),
        }
    }

    /// Índice logo após o último token (exclusivo).
    pub fn end(&self) -> usize {
        self.start + self.length
    }

    pub fn overlaps(&self, other: &NamedEntity) -> bool {
        self.start < other.end() && other.start < self.end()
    }
}

impl fmt::Display for NamedEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}) {}", self.start, self.end(), self.entity_type)
    }
}

/// Converte uma sequência de tags BIO em entidades.
///
/// Máquina de estados do esquema BIO:
/// - Inicia uma nova entidade ao encontrar `B-X`.
/// - Continua enquanto encontrar `I-X` do **mesmo** tipo.
/// - Um `I-X` órfão (sem `B-X` antes) é descartado; o decodificador nunca o
///   produz, mas a função é total.
///
/// # Exemplo
/// `[B-person, I-person, O, B-location]` → `[0,2) person`, `[3,4) location`
pub fn tags_to_entities(tags: &[Tag], tag_set: &TagSet) -> Vec<NamedEntity> {
    let mut entities = Vec::new();
    let mut i = 0;

    while i < tags.len() {
        if let Tag::Begin(t) = tags[i] {
            let mut j = i + 1;
            while j < tags.len() && tags[j] == Tag::Inside(t) {
                j += 1;
            }
            if let Some(name) = tag_set.type_name(t) {
                entities.push(NamedEntity::new(i, j - i, name));
            }
            i = j;
        } else {
            i += 1;
        }
    }

    entities
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tag_set() -> TagSet {
        TagSet::new(vec!["person".into(), "organization".into(), "location".into()])
    }

    #[test]
    fn test_labels_and_parse() {
        let ts = tag_set();
        assert_eq!(ts.label(Tag::Outside), "O");
        assert_eq!(ts.label(Tag::Begin(0)), "B-person");
        assert_eq!(ts.label(Tag::Inside(2)), "I-location");
        assert_eq!(ts.parse_label("I-organization"), Some(Tag::Inside(1)));
        assert_eq!(ts.parse_label("B-animal"), None);
        assert_eq!(ts.parse_label("X-person"), None);
    }

    #[test]
    fn test_index_round_trip_covers_all_tags() {
        let ts = tag_set();
        let all = ts.all();
        assert_eq!(all.len(), 7);
        for (i, tag) in all.iter().enumerate() {
            assert_eq!(tag.index(), i);
        }
    }

    #[test]
    fn test_valid_transitions() {
        assert!(Tag::is_valid_transition(&Tag::Begin(0), &Tag::Inside(0)));
        assert!(Tag::is_valid_transition(&Tag::Inside(0), &Tag::Inside(0)));
        assert!(!Tag::is_valid_transition(&Tag::Outside, &Tag::Inside(0)));
        assert!(!Tag::is_valid_transition(&Tag::Begin(1), &Tag::Inside(0)));
        assert!(Tag::is_valid_transition(&Tag::Inside(1), &Tag::Begin(1)));
        assert!(!Tag::Inside(0).is_valid_start());
    }

    #[test]
    fn test_tags_to_entities() {
        let ts = tag_set();
        let tags = [
            Tag::Begin(0),
            Tag::Inside(0),
            Tag::Outside,
            Tag::Begin(2),
            Tag::Begin(2),
            Tag::Inside(1),
        ];
        let entities = tags_to_entities(&tags, &ts);
        assert_eq!(
            entities,
            vec![
                NamedEntity::new(0, 2, "person"),
                NamedEntity::new(3, 1, "location"),
                NamedEntity::new(4, 1, "location"),
            ]
        );
    }

    #[test]
    fn test_entity_overlap() {
        let a = NamedEntity::new(0, 2, "person");
        let b = NamedEntity::new(2, 1, "person");
        let c = NamedEntity::new(1, 3, "person");
        assert!(!a.overlaps(&b));
        assert!(a.overlaps(&c));
        assert_eq!(a.to_string(), "[0, 2) person");
    }
}
