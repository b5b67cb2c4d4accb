//! # Tokenizador com Segmentação de Sentenças
//!
//! Converte texto bruto em uma sequência de sentenças, cada uma formada por
//! pares (forma, [`TokenRange`]). O tokenizador é **preguiçoso**: cada chamada a
//! [`Tokenizer::next_sentence`] produz apenas a próxima sentença, avançando um
//! cursor interno sobre o texto definido em [`Tokenizer::set_text`].
//!
//! ## Variantes
//!
//! - **Vertical**: o texto já vem segmentado. Cada linha é um token e linhas em
//!   branco separam sentenças. Nenhuma heurística linguística é aplicada.
//! - **Linguistic**: segmentação por fronteiras de palavra Unicode (UAX #29),
//!   com proteção de URLs/e-mails, junção de palavras hifenizadas ("Covid-19"),
//!   abreviações ("Dr.") e quebra de sentença em pontuação final. Linhas em
//!   branco (parágrafos) sempre encerram a sentença.
//!
//! ## Offsets
//!
//! Os offsets de [`TokenRange`] são medidos em **caracteres Unicode** (não em
//! bytes) a partir do início do texto passado a `set_text`.
//!
//! ## Exemplo de Uso
//!
//! ```rust
//! use ner_engine::tokenizer::{Tokenizer, TokenizerKind};
//!
//! let mut tokenizer = Tokenizer::new(TokenizerKind::Linguistic);
//! tokenizer.set_text("Dr. Smith chegou. Ele falou.");
//!
//! let first = tokenizer.next_sentence().unwrap();
//! assert_eq!(first.forms, vec!["Dr.", "Smith", "chegou", "."]);
//! let second = tokenizer.next_sentence().unwrap();
//! assert_eq!(second.forms, vec!["Ele", "falou", "."]);
//! assert!(tokenizer.next_sentence().is_none());
//! ```

use std::collections::VecDeque;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use unicode_segmentation::UnicodeSegmentation;

/// Posição de um token no texto original, em caracteres.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TokenRange {
    /// Offset do primeiro caractere do token.
    pub start: usize,
    /// Quantidade de caracteres do token (sempre > 0).
    pub length: usize,
}

impl TokenRange {
    pub fn new(start: usize, length: usize) -> Self {
        Self { start, length }
    }

    /// Offset logo após o último caractere (exclusivo).
    pub fn end(&self) -> usize {
        self.start + self.length
    }
}

/// Uma sentença tokenizada: formas e ranges em vetores paralelos.
///
/// Os vetores paralelos (em vez de um vetor de structs) espelham os
/// contêineres `Forms` / `TokenRanges` expostos na fronteira com hosts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sentence {
    pub forms: Vec<String>,
    pub ranges: Vec<TokenRange>,
}

impl Sentence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Constrói uma sentença a partir de formas sem posição no texto
    /// (ranges sintéticos, um caractere de espaço entre tokens).
    pub fn from_forms<S: AsRef<str>>(forms: &[S]) -> Self {
        let mut sentence = Sentence::new();
        let mut offset = 0;
        for form in forms {
            let form = form.as_ref();
            let length = form.chars().count().max(1);
            sentence.push(form.to_string(), TokenRange::new(offset, length));
            offset += length + 1;
        }
        sentence
    }

    pub fn push(&mut self, form: String, range: TokenRange) {
        self.forms.push(form);
        self.ranges.push(range);
    }

    pub fn len(&self) -> usize {
        self.forms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forms.is_empty()
    }

    /// Itera sobre pares (forma, range).
    pub fn iter(&self) -> impl Iterator<Item = (&str, TokenRange)> {
        self.forms
            .iter()
            .map(String::as_str)
            .zip(self.ranges.iter().copied())
    }
}

/// Estratégias de tokenização disponíveis.
///
/// O modelo escolhe a variante com que foi treinado; hosts também podem
/// instanciar qualquer uma diretamente.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenizerKind {
    /// **Vertical**: um token por linha, sentenças separadas por linhas em branco.
    Vertical,
    /// **Linguístico**: fronteiras de palavra Unicode + heurísticas de sentença.
    #[default]
    Linguistic,
}

/// Abreviações que absorvem o ponto seguinte e não encerram a sentença.
/// Comparação em minúsculas.
const ABBREVIATIONS: &[&str] = &[
    "mr", "mrs", "ms", "dr", "dra", "prof", "profa", "sr", "sra", "jr", "st",
    "gen", "gov", "sen", "rep", "dep", "col", "capt", "lt", "sgt", "rev",
    "mt", "ft", "vs", "etc", "e.g", "i.e", "cf", "approx", "dept", "univ",
    "jan", "feb", "mar", "apr", "jun", "jul", "aug", "sep", "sept", "oct",
    "nov", "dec", "av", "tel", "pág", "fig", "vol", "nr",
];

/// Pontuação que encerra sentença.
const TERMINATORS: &[&str] = &[".", "!", "?", "…", "。", "！", "？"];

/// Pontuação de fechamento absorvida após o terminador (`Fim."`, `(Sim!)`).
const CLOSERS: &[&str] = &["\"", "'", "”", "’", "»", ")", "]", "}"];

/// URLs e e-mails viram um único token.
static PROTECTED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?:https?://|www\.)[^\s<>"]+|[\w.+-]+@[\w-]+(?:\.[\w-]+)+"#)
        .expect("padrão de URL/e-mail válido")
});

/// Pontuação removida do final de uma URL casada ("veja http://a.com.").
const URL_TRAILING: &[char] = &['.', ',', ';', ':', '!', '?', ')', ']', '\'', '"'];

/// Um token já posicionado, aguardando ser agrupado em sentença.
#[derive(Debug, Clone)]
struct PendingToken {
    form: String,
    range: TokenRange,
}

/// Tokenizador com estado (cursor) sobre um texto.
///
/// Não é seguro para uso concorrente sem sincronização externa: todos os
/// métodos que avançam o cursor recebem `&mut self`. Cada chamador deve ter
/// sua própria instância.
#[derive(Debug, Clone)]
pub struct Tokenizer {
    kind: TokenizerKind,
    text: String,
    /// Cursor em bytes sobre `text`.
    cursor: usize,
    /// Cursor em caracteres, sempre correspondente a `cursor`.
    char_cursor: usize,
    /// Tokens do parágrafo corrente ainda não entregues (variante linguística).
    pending: VecDeque<PendingToken>,
}

impl Tokenizer {
    pub fn new(kind: TokenizerKind) -> Self {
        Self {
            kind,
            text: String::new(),
            cursor: 0,
            char_cursor: 0,
            pending: VecDeque::new(),
        }
    }

    pub fn new_vertical() -> Self {
        Self::new(TokenizerKind::Vertical)
    }

    pub fn new_linguistic() -> Self {
        Self::new(TokenizerKind::Linguistic)
    }

    pub fn kind(&self) -> TokenizerKind {
        self.kind
    }

    /// Define um novo texto e reinicia o cursor, descartando qualquer
    /// iteração em andamento.
    pub fn set_text(&mut self, text: &str) {
        self.text.clear();
        self.text.push_str(text);
        self.cursor = 0;
        self.char_cursor = 0;
        self.pending.clear();
    }

    /// Variante de [`set_text`](Self::set_text) para bytes arbitrários.
    ///
    /// Sequências UTF-8 inválidas são substituídas por U+FFFD; os offsets
    /// passam a se referir ao texto já decodificado.
    pub fn set_bytes(&mut self, bytes: &[u8]) {
        let decoded = String::from_utf8_lossy(bytes);
        self.set_text(&decoded);
    }

    /// Produz a próxima sentença ou `None` quando o texto acabou.
    pub fn next_sentence(&mut self) -> Option<Sentence> {
        match self.kind {
            TokenizerKind::Vertical => self.next_vertical_sentence(),
            TokenizerKind::Linguistic => self.next_linguistic_sentence(),
        }
    }

    /// Versão "estilo binding": preenche os vetores (limpando-os antes) e
    /// retorna `false` no fim do texto.
    pub fn next_sentence_into(
        &mut self,
        forms: &mut Vec<String>,
        ranges: &mut Vec<TokenRange>,
    ) -> bool {
        forms.clear();
        ranges.clear();
        match self.next_sentence() {
            Some(sentence) => {
                forms.extend(sentence.forms);
                ranges.extend(sentence.ranges);
                true
            }
            None => false,
        }
    }

    /// Avança o cursor até `byte`, mantendo o cursor de caracteres em sincronia.
    fn advance_to(&mut self, byte: usize) {
        if byte > self.cursor {
            self.char_cursor += self.text[self.cursor..byte].chars().count();
            self.cursor = byte;
        }
    }

    /// Pula linhas em branco a partir do cursor. Retorna `false` se o texto acabou.
    fn skip_blank_lines(&mut self) -> bool {
        while self.cursor < self.text.len() {
            let (start, end, next) = line_at(&self.text, self.cursor);
            if !self.text[start..end].trim().is_empty() {
                return true;
            }
            self.advance_to(next);
        }
        false
    }

    fn next_vertical_sentence(&mut self) -> Option<Sentence> {
        if !self.skip_blank_lines() {
            return None;
        }

        let mut sentence = Sentence::new();
        while self.cursor < self.text.len() {
            let (start, end, next) = line_at(&self.text, self.cursor);
            let line = &self.text[start..end];
            let form = line.trim();
            if form.is_empty() {
                break;
            }
            let lead = line.len() - line.trim_start().len();
            let char_start = self.char_cursor + line[..lead].chars().count();
            let length = form.chars().count();
            sentence.push(form.to_string(), TokenRange::new(char_start, length));
            self.advance_to(next);
        }
        Some(sentence)
    }

    fn next_linguistic_sentence(&mut self) -> Option<Sentence> {
        while self.pending.is_empty() {
            if !self.fill_next_paragraph() {
                return None;
            }
        }

        let mut sentence = Sentence::new();
        while let Some(token) = self.pending.pop_front() {
            let is_period = token.form == ".";
            let terminal = is_terminator(&token.form);
            sentence.push(token.form, token.range);
            if !terminal {
                continue;
            }

            // Absorve "?!", "..." e aspas/parênteses de fechamento
            while self
                .pending
                .front()
                .is_some_and(|t| is_terminator(&t.form) || CLOSERS.contains(&t.form.as_str()))
            {
                if let Some(t) = self.pending.pop_front() {
                    sentence.push(t.form, t.range);
                }
            }

            // Ponto seguido de minúscula não encerra a sentença
            let continues = is_period
                && self
                    .pending
                    .front()
                    .is_some_and(|t| starts_lowercase(&t.form));
            if !continues {
                break;
            }
        }
        Some(sentence)
    }

    /// Tokeniza o próximo parágrafo (linhas até uma linha em branco) para
    /// `pending`. Retorna `false` quando não há mais texto.
    fn fill_next_paragraph(&mut self) -> bool {
        if !self.skip_blank_lines() {
            return false;
        }

        let para_start = self.cursor;
        let mut para_end = para_start;
        let mut pos = para_start;
        while pos < self.text.len() {
            let (start, end, next) = line_at(&self.text, pos);
            if self.text[start..end].trim().is_empty() {
                break;
            }
            para_end = end;
            pos = next;
        }

        let paragraph = &self.text[para_start..para_end];
        let mut last_byte = 0;
        let mut last_char = self.char_cursor;
        let mut tokens = Vec::new();
        for (s, e) in segment_paragraph(paragraph) {
            let char_start = last_char + paragraph[last_byte..s].chars().count();
            let length = paragraph[s..e].chars().count();
            tokens.push(PendingToken {
                form: paragraph[s..e].to_string(),
                range: TokenRange::new(char_start, length),
            });
            last_byte = e;
            last_char = char_start + length;
        }

        self.pending.extend(tokens);
        self.advance_to(para_end);
        true
    }
}

/// Tokeniza um texto inteiro de uma vez.
pub fn tokenize(text: &str, kind: TokenizerKind) -> Vec<Sentence> {
    let mut tokenizer = Tokenizer::new(kind);
    tokenizer.set_text(text);
    std::iter::from_fn(|| tokenizer.next_sentence()).collect()
}

/// Linha a partir de `pos`: (início, fim sem `\n`, posição após o `\n`).
fn line_at(text: &str, pos: usize) -> (usize, usize, usize) {
    match text[pos..].find('\n') {
        Some(offset) => (pos, pos + offset, pos + offset + 1),
        None => (pos, text.len(), text.len()),
    }
}

/// Divide um parágrafo em intervalos de bytes, um por token.
fn segment_paragraph(paragraph: &str) -> Vec<(usize, usize)> {
    let mut segments = Vec::new();
    let mut pos = 0;

    for m in PROTECTED.find_iter(paragraph) {
        let kept = m.as_str().trim_end_matches(URL_TRAILING);
        let (start, end) = (m.start(), m.start() + kept.len());
        if end <= start {
            continue;
        }
        push_word_segments(paragraph, pos, start, &mut segments);
        segments.push((start, end));
        pos = end;
    }
    push_word_segments(paragraph, pos, paragraph.len(), &mut segments);

    merge_segments(paragraph, segments)
}

/// Fronteiras de palavra UAX #29 entre `from` e `to`, sem espaços.
fn push_word_segments(text: &str, from: usize, to: usize, out: &mut Vec<(usize, usize)>) {
    if from >= to {
        return;
    }
    for (offset, word) in text[from..to].split_word_bound_indices() {
        if word.chars().all(char::is_whitespace) {
            continue;
        }
        out.push((from + offset, from + offset + word.len()));
    }
}

/// Junta hífens internos ("Covid-19") e pontos de abreviação ("Dr.").
fn merge_segments(text: &str, segments: Vec<(usize, usize)>) -> Vec<(usize, usize)> {
    let mut merged: Vec<(usize, usize)> = Vec::with_capacity(segments.len());
    let mut i = 0;

    while i < segments.len() {
        let (start, end) = segments[i];
        let piece = &text[start..end];

        if let Some(last) = merged.last_mut() {
            let adjacent = last.1 == start;
            let prev = &text[last.0..last.1];

            if adjacent && piece == "-" && is_wordlike(prev) {
                if let Some(&(next_start, next_end)) = segments.get(i + 1) {
                    if next_start == end && is_wordlike(&text[next_start..next_end]) {
                        last.1 = next_end;
                        i += 2;
                        continue;
                    }
                }
            }

            if adjacent && piece == "." && is_abbreviation(prev) {
                last.1 = end;
                i += 1;
                continue;
            }
        }

        merged.push((start, end));
        i += 1;
    }
    merged
}

fn is_wordlike(s: &str) -> bool {
    let first = s.chars().next().is_some_and(char::is_alphanumeric);
    let last = s.chars().next_back().is_some_and(char::is_alphanumeric);
    first && last
}

/// Abreviação conhecida ou inicial maiúscula isolada ("J.").
fn is_abbreviation(s: &str) -> bool {
    let mut chars = s.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        if c.is_uppercase() {
            return true;
        }
    }
    ABBREVIATIONS.contains(&s.to_lowercase().as_str())
}

fn is_terminator(form: &str) -> bool {
    TERMINATORS.contains(&form)
}

fn starts_lowercase(form: &str) -> bool {
    form.chars().next().is_some_and(char::is_lowercase)
}
