//! # TSMP — Seleção de Contexto por Pontuação
//!
//! A cada turno, fontes permitidas pelo perfil propõem [`Candidate`]s
//! (trechos de texto com peso de base). O TSMP pontua cada um contra os
//! tokens da pergunta e monta um contexto limitado por quantidade (top-k)
//! e por caracteres.
//!
//! ## Fontes
//!
//! | Fonte | Conteúdo | Peso |
//! |-------|----------|------|
//! | `dictionary` | entrada do token principal do sujeito | 0.85 |
//! | `kb` | últimas 30 notas | 0.55 |
//! | `kb` | lista nomeada igual ao sujeito | 0.60 |
//! | `episodic` | últimas 20 entradas (nunca em modo estrito) | 0.35 |
//! | `subsignals` | sinais internos `estado=… ressonancia=…` | 0.40 |
//!
//! ## Pontuação
//!
//! ```text
//! T = tokens(candidato), Q = tokens(pergunta), comum = |T ∩ Q|
//!
//! comum = 0 e não-subsignals     → excluído
//! estrito e episodic             → excluído
//! senão: comum/√|T| + peso + bônus − 0.40·min(1, len/1200)
//!        bônus = 0.10 se o estado aparece no texto
//!              + clamp(ressonância·0.05, 0, 0.25)
//! ```
//!
//! Só pontuações positivas sobrevivem.
//!
//! ## Seleção
//!
//! Passada gulosa única em ordem decrescente: deduplica pelos primeiros 180
//! caracteres do trecho e **para** no primeiro candidato que estouraria o
//! orçamento. Candidatos menores depois dele não são reaproveitados.
//!
//! Um contexto só conta como **base** se alguma linha selecionada veio do
//! dicionário ou das notas ([`Selection::grounded`]). Linhas episódicas e
//! de sinais internos acompanham a base, mas nunca a substituem.

use std::collections::{BTreeMap, HashSet};

use serde_json::{Map, Value};

use crate::core::{DictionaryStore, KnowledgeNotes};
use crate::nlu::normalizer::tokenize;
use crate::profiles::{Profile, Source};
use crate::session::Session;

const DICTIONARY_WEIGHT: f64 = 0.85;
const NOTE_WEIGHT: f64 = 0.55;
const LIST_WEIGHT: f64 = 0.60;
const EPISODIC_WEIGHT: f64 = 0.35;
const SUBSIGNALS_WEIGHT: f64 = 0.40;

const NOTES_WINDOW: usize = 30;
const EPISODIC_WINDOW: usize = 20;
const LIST_ITEMS: usize = 20;
const DEDUP_PREFIX: usize = 180;

/// Unidade efêmera de pontuação.
#[derive(Clone, Debug, PartialEq)]
pub struct Candidate {
    pub source: Source,
    pub text: String,
    pub base_weight: f64,
    pub meta: BTreeMap<String, String>,
}

impl Candidate {
    pub fn new(source: Source, text: impl Into<String>, base_weight: f64) -> Self {
        Self {
            source,
            text: text.into(),
            base_weight,
            meta: BTreeMap::new(),
        }
    }

    fn with_meta(mut self, key: &str, value: &str) -> Self {
        self.meta.insert(key.to_string(), value.to_string());
        self
    }
}

/// Sinais de runtime usados no bônus e no modo estrito.
#[derive(Clone, Debug, PartialEq)]
pub struct Signals {
    pub estado: String,
    pub ressonancia: f64,
    pub strict: bool,
}

impl Signals {
    /// Sinais de base do perfil, sobrescritos pelo estado dinâmico da sessão
    /// (`estado`, `ressonancia`) quando presentes.
    pub fn resolve(profile: &Profile, dynamic: &Map<String, Value>) -> Self {
        let estado = dynamic
            .get("estado")
            .and_then(Value::as_str)
            .unwrap_or(profile.estado_base.estado)
            .to_string();
        let ressonancia = dynamic
            .get("ressonancia")
            .and_then(Value::as_f64)
            .unwrap_or(profile.estado_base.ressonancia);
        Self {
            estado,
            ressonancia,
            strict: profile.tsmp.strict,
        }
    }
}

/// Resultado da seleção: contexto montado + todas as pontuações positivas.
#[derive(Debug, Default)]
pub struct Selection {
    pub context: String,
    /// Alguma linha do contexto veio de dicionário ou notas?
    pub grounded: bool,
    pub scored: Vec<(f64, Candidate)>,
}

impl Selection {
    /// Relatório de auditoria: as `n` melhores pontuações.
    pub fn audit(&self, n: usize) -> String {
        self.scored
            .iter()
            .take(n)
            .enumerate()
            .map(|(i, (score, c))| {
                let head: String = c.text.chars().take(120).collect();
                format!("{}. score={score:.3} src={} :: {head}", i + 1, c.source)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Fontes de conhecimento consultadas num turno.
pub struct Retrieval<'a> {
    pub dictionary: &'a DictionaryStore,
    pub notes: &'a KnowledgeNotes,
    pub session: &'a Session,
}

impl Retrieval<'_> {
    /// Reúne candidatos das fontes permitidas pelo perfil.
    pub fn gather(&self, subject: &str, profile: &Profile, signals: &Signals) -> Vec<Candidate> {
        let sources = profile.tsmp.sources;
        let subject = subject.trim();
        let mut candidates = Vec::new();

        if sources.allows(Source::Dictionary) {
            if let Some(head) = subject.split_whitespace().next() {
                if let Some(entry) = self.dictionary.lookup(head) {
                    candidates.push(
                        Candidate::new(
                            Source::Dictionary,
                            format!("{} ({}): {}", entry.forma, entry.classe, entry.definicao),
                            DICTIONARY_WEIGHT,
                        )
                        .with_meta("word", head),
                    );
                }
            }
        }

        if sources.allows(Source::Kb) {
            for note in self.notes.recent_notes(NOTES_WINDOW) {
                candidates.push(Candidate::new(Source::Kb, note.as_str(), NOTE_WEIGHT));
            }
            if let Some(items) = self.notes.list(subject).filter(|_| !subject.is_empty()) {
                let shown: Vec<&str> = items.iter().take(LIST_ITEMS).map(String::as_str).collect();
                candidates.push(
                    Candidate::new(
                        Source::Kb,
                        format!("lista:{subject} -> {}", shown.join(", ")),
                        LIST_WEIGHT,
                    )
                    .with_meta("list", subject),
                );
            }
        }

        if sources.allows(Source::Episodic) && !signals.strict {
            for entry in self.session.recent_episodes(EPISODIC_WINDOW) {
                candidates.push(Candidate::new(
                    Source::Episodic,
                    format!("{}: {}", entry.role.as_str(), entry.text),
                    EPISODIC_WEIGHT,
                ));
            }
        }

        if sources.allows(Source::Subsignals) {
            candidates.push(Candidate::new(
                Source::Subsignals,
                format!("estado={} ressonancia={}", signals.estado, signals.ressonancia),
                SUBSIGNALS_WEIGHT,
            ));
        }

        tracing::debug!(count = candidates.len(), "TSMP: candidatos reunidos");
        candidates
    }
}

fn length_cost(text: &str) -> f64 {
    (text.chars().count() as f64 / 1200.0).min(1.0)
}

/// Pontua um candidato; `f64::NEG_INFINITY` significa excluído.
pub fn score(query_tokens: &HashSet<String>, candidate: &Candidate, signals: &Signals) -> f64 {
    let tokens: HashSet<String> = tokenize(&candidate.text).into_iter().collect();
    let common = tokens.intersection(query_tokens).count();

    if common == 0 && candidate.source != Source::Subsignals {
        return f64::NEG_INFINITY;
    }
    if signals.strict && candidate.source == Source::Episodic {
        return f64::NEG_INFINITY;
    }

    let similarity = if tokens.is_empty() {
        0.0
    } else {
        common as f64 / (tokens.len() as f64).sqrt()
    };

    let mut bonus = 0.0;
    let estado = signals.estado.to_lowercase();
    if !estado.is_empty() && candidate.text.to_lowercase().contains(&estado) {
        bonus += 0.10;
    }
    bonus += (signals.ressonancia * 0.05).clamp(0.0, 0.25);

    similarity + candidate.base_weight + bonus - 0.40 * length_cost(&candidate.text)
}

/// Pontua, ordena e monta o contexto dentro de `top_k` e `max_chars`.
pub fn select_top(
    candidates: Vec<Candidate>,
    query: &str,
    signals: &Signals,
    top_k: usize,
    max_chars: usize,
) -> Selection {
    let query_tokens: HashSet<String> = tokenize(query).into_iter().collect();

    let mut scored: Vec<(f64, Candidate)> = candidates
        .into_iter()
        .map(|c| (score(&query_tokens, &c, signals), c))
        .filter(|(s, _)| *s > 0.0)
        .collect();
    scored.sort_by(|a, b| b.0.total_cmp(&a.0));

    let mut lines = Vec::new();
    let mut seen = HashSet::new();
    let mut total = 0;
    let mut grounded = false;

    for (_, candidate) in &scored {
        if lines.len() >= top_k {
            break;
        }
        let snippet = candidate.text.split_whitespace().collect::<Vec<_>>().join(" ");
        let key: String = snippet.chars().take(DEDUP_PREFIX).collect::<String>().to_lowercase();
        if !seen.insert(key) {
            continue;
        }
        let line = format!("- [{}] {snippet}", candidate.source);
        let cost = line.chars().count() + 1;
        if total + cost > max_chars {
            break;
        }
        total += cost;
        grounded |= candidate.source.is_knowledge();
        lines.push(line);
    }

    tracing::debug!(
        scored = scored.len(),
        selected = lines.len(),
        chars = total,
        grounded,
        "TSMP: contexto montado"
    );
    Selection {
        context: lines.join("\n"),
        grounded,
        scored,
    }
}
