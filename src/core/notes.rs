//! # KnowledgeNotes — Notas Livres e Listas Nomeadas
//!
//! Base textual complementar ao grafo, lida de `knowledge_base.json`:
//!
//! ```json
//! { "listas": { "planetas": ["mercurio", "venus"] }, "notas": ["..."] }
//! ```
//!
//! As notas alimentam o TSMP como candidatos de peso médio; as listas
//! respondem intents `listar` e entram no TSMP quando o sujeito coincide
//! com o nome da lista.

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::nlu::normalizer::normalize;
use crate::persistence;

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct KnowledgeNotes {
    #[serde(default)]
    listas: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    notas: Vec<String>,
    #[serde(skip)]
    path: Option<PathBuf>,
}

impl KnowledgeNotes {
    pub fn in_memory() -> Self {
        Self::default()
    }

    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let mut notes: KnowledgeNotes = persistence::load_json_or_default(&path)?;
        tracing::info!(
            notes = notes.notas.len(),
            lists = notes.listas.len(),
            "Notas carregadas"
        );
        notes.path = Some(path);
        Ok(notes)
    }

    pub fn save(&self) -> Result<()> {
        match &self.path {
            Some(path) => persistence::write_json_atomic(path, self),
            None => Ok(()),
        }
    }

    /// Acrescenta uma nota; texto vazio ou repetido é ignorado.
    pub fn add_note(&mut self, text: &str) -> bool {
        let text = text.trim();
        if text.is_empty() || self.notas.iter().any(|n| n == text) {
            return false;
        }
        self.notas.push(text.to_string());
        true
    }

    pub fn note_count(&self) -> usize {
        self.notas.len()
    }

    /// Cria ou substitui uma lista; o nome é normalizado.
    pub fn set_list(&mut self, name: &str, items: Vec<String>) {
        self.listas.insert(normalize(name), items);
    }

    /// As últimas `n` notas, na ordem de inserção.
    pub fn recent_notes(&self, n: usize) -> &[String] {
        let start = self.notas.len().saturating_sub(n);
        &self.notas[start..]
    }

    pub fn list(&self, name: &str) -> Option<&[String]> {
        self.listas.get(&normalize(name)).map(Vec::as_slice)
    }
}
