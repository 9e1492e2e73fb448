//! # Persistência — Leitura e Escrita de Arquivos JSON
//!
//! Todos os stores persistentes (dicionário, grafo TRQ, notas, quarentena)
//! são lidos **inteiros** para memória na construção e reescritos
//! **inteiros** a cada `save()`. Não há log de append nem lock de arquivo.
//!
//! ## Atomicidade
//!
//! A escrita usa o padrão write-rename: o JSON é gravado em
//! `<arquivo>.tmp` e depois renomeado sobre o destino. Um crash durante a
//! escrita deixa o arquivo anterior intacto. Escritores concorrentes no
//! mesmo arquivo continuam sendo um risco (último rename vence).

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Nome do arquivo do dicionário dentro do diretório de dados.
pub const DICTIONARY_FILE: &str = "dictionary_pt.json";

/// Nome do arquivo do grafo TRQ dentro do diretório de dados.
pub const GRAPH_FILE: &str = "trq_graph.json";

/// Nome do arquivo de notas/listas (base de conhecimento textual).
pub const NOTES_FILE: &str = "knowledge_base.json";

/// Subdiretório da zona de quarentena.
pub const QUARANTINE_DIR: &str = "quarentena";

/// Carrega um JSON do disco, ou `T::default()` se o arquivo não existir.
///
/// # Erros
///
/// Retorna erro se o arquivo existir mas não puder ser lido ou estiver
/// corrompido/incompatível com `T`.
pub fn load_json_or_default<T>(path: &Path) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    if !path.exists() {
        tracing::info!(path = %path.display(), "Arquivo ausente, iniciando vazio");
        return Ok(T::default());
    }
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Falha ao ler {}", path.display()))?;
    serde_json::from_str(&json)
        .with_context(|| format!("Falha ao desserializar {}", path.display()))
}

/// Carrega um JSON do disco; `None` se o arquivo não existir.
pub fn load_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Falha ao ler {}", path.display()))?;
    let value = serde_json::from_str(&json)
        .with_context(|| format!("Falha ao desserializar {}", path.display()))?;
    Ok(Some(value))
}

/// Serializa `value` como JSON pretty-printed e grava via write-rename.
///
/// Cria o diretório pai se não existir.
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Falha ao criar diretório {}", parent.display()))?;
        }
    }
    let json = serde_json::to_string_pretty(value)
        .with_context(|| format!("Falha ao serializar {}", path.display()))?;
    let tmp = tmp_path(path);
    std::fs::write(&tmp, json).with_context(|| format!("Falha ao escrever {}", tmp.display()))?;
    std::fs::rename(&tmp, path)
        .with_context(|| format!("Falha ao renomear {} → {}", tmp.display(), path.display()))?;
    Ok(())
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
