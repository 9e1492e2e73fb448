//! # Módulo Core — Stores de Conhecimento
//!
//! Tudo que a Antonia sabe mora aqui, em quatro stores persistidos como
//! JSON no diretório de dados:
//!
//! - [`DictionaryStore`]: dicionário curado `palavra → definição`
//! - [`KnowledgeGraph`]: grafo TRQ de conceitos e relações tipadas
//! - [`KnowledgeNotes`]: notas livres e listas nomeadas
//! - [`QuarantineStore`]: relações propostas aguardando validação humana
//!
//! ## Fluxo de Conhecimento
//!
//! ```text
//! /add ─────────────► DictionaryStore ──┐
//!                                       ├──► TSMP / respostas
//! /relacionar ──────► KnowledgeGraph ◄──┘
//!                          ▲
//! minerador ─► QuarantineStore ─(aceitar + /colapsar)─┘
//! ```
//!
//! Todas as chaves passam por [`normalize()`](crate::nlu::normalizer::normalize).

/// Dicionário de palavras.
pub mod dictionary;

/// Grafo TRQ: nós, arestas e ontologia de relações.
pub mod graph;

/// Notas e listas da base textual.
pub mod notes;

/// Zona de quarentena para relações mineradas.
pub mod quarantine;

pub use dictionary::{DictionaryEntry, DictionaryStore};
pub use graph::{GraphEdge, GraphNode, GraphStats, KnowledgeGraph, RelationType};
pub use notes::KnowledgeNotes;
pub use quarantine::{QuarantineStore, RelationProposal, ReviewAction};
