//! # DictionaryStore — Dicionário Curado de Palavras
//!
//! Mapa `palavra normalizada → DictionaryEntry`. A chave é sempre o
//! [`normalize()`](crate::nlu::normalizer::normalize) da palavra; o campo
//! `forma` guarda a grafia original para exibição.
//!
//! ## Semântica de Escrita
//!
//! - [`add()`](DictionaryStore::add) sobrescreve incondicionalmente
//!   (último escritor vence, sem versionamento) e reescreve o arquivo;
//! - [`add_deferred()`](DictionaryStore::add_deferred) só altera a memória,
//!   para cargas em lote seguidas de um único [`save()`](DictionaryStore::save);
//! - entradas nunca são removidas.

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::nlu::normalizer::normalize;
use crate::persistence;

/// Uma entrada do dicionário, no formato do arquivo `dictionary_pt.json`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DictionaryEntry {
    /// Grafia original, usada na exibição (ex: "Energia").
    pub forma: String,
    /// Classe gramatical (ex: "substantivo").
    pub classe: String,
    /// Definição curta.
    pub definicao: String,
    /// Chaves normalizadas de conceitos relacionados.
    #[serde(default)]
    pub relacoes: Vec<String>,
}

/// Dicionário em memória com persistência opcional em JSON.
#[derive(Debug, Default)]
pub struct DictionaryStore {
    path: Option<PathBuf>,
    entries: BTreeMap<String, DictionaryEntry>,
}

impl DictionaryStore {
    /// Dicionário só em memória (sem arquivo).
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Abre o dicionário de `path`, ou vazio se o arquivo não existir.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let entries: BTreeMap<String, DictionaryEntry> = persistence::load_json_or_default(&path)?;
        tracing::info!(entries = entries.len(), path = %path.display(), "Dicionário carregado");
        Ok(Self {
            path: Some(path),
            entries,
        })
    }

    /// Busca por chave normalizada.
    pub fn lookup(&self, word: &str) -> Option<&DictionaryEntry> {
        self.entries.get(&normalize(word))
    }

    /// Registra (ou sobrescreve) uma palavra e reescreve o arquivo.
    pub fn add(
        &mut self,
        word: &str,
        classe: &str,
        definicao: &str,
        relacoes: Vec<String>,
    ) -> Result<()> {
        self.add_deferred(word, classe, definicao, relacoes);
        self.save()
    }

    /// Como [`add()`](Self::add), mas sem tocar o disco.
    pub fn add_deferred(&mut self, word: &str, classe: &str, definicao: &str, relacoes: Vec<String>) {
        let key = normalize(word);
        tracing::debug!(key = %key, "Dicionário: entrada registrada");
        self.entries.insert(
            key,
            DictionaryEntry {
                forma: word.trim().to_string(),
                classe: classe.trim().to_string(),
                definicao: definicao.trim().to_string(),
                relacoes,
            },
        );
    }

    /// Reescreve o arquivo inteiro. No-op para dicionários em memória.
    pub fn save(&self) -> Result<()> {
        match &self.path {
            Some(path) => persistence::write_json_atomic(path, &self.entries),
            None => Ok(()),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
