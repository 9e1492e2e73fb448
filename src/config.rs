//! Configuração lida do ambiente.
//!
//! | Variável | Padrão | Uso |
//! |----------|--------|-----|
//! | `ANTONIA_DATA_DIR` | `data` | diretório dos arquivos JSON |
//! | `ANTONIA_PROFILE` | `conversacional` | perfil da sessão inicial |
//! | `ANTONIA_SCOPE` | `local` | escopo de memória da sessão inicial |
//! | `ANTONIA_MINER_CMD` | ausente | linha de comando do minerador externo |
//!
//! O nível de log continua vindo de `RUST_LOG`.

use std::path::PathBuf;

use crate::persistence::{DICTIONARY_FILE, GRAPH_FILE, NOTES_FILE, QUARANTINE_DIR};
use crate::profiles::DEFAULT_PROFILE;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    pub data_dir: PathBuf,
    pub profile: String,
    pub scope: String,
    pub miner_command: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            profile: DEFAULT_PROFILE.to_string(),
            scope: "local".to_string(),
            miner_command: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Monta a configuração a partir de uma função de consulta; valores
    /// vazios contam como ausentes.
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();
        Self {
            data_dir: get("ANTONIA_DATA_DIR").map(PathBuf::from).unwrap_or(defaults.data_dir),
            profile: get("ANTONIA_PROFILE").unwrap_or(defaults.profile),
            scope: get("ANTONIA_SCOPE").unwrap_or(defaults.scope),
            miner_command: get("ANTONIA_MINER_CMD"),
        }
    }

    pub fn dictionary_path(&self) -> PathBuf {
        self.data_dir.join(DICTIONARY_FILE)
    }

    pub fn graph_path(&self) -> PathBuf {
        self.data_dir.join(GRAPH_FILE)
    }

    pub fn notes_path(&self) -> PathBuf {
        self.data_dir.join(NOTES_FILE)
    }

    pub fn quarantine_dir(&self) -> PathBuf {
        self.data_dir.join(QUARANTINE_DIR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_when_unset_or_blank() {
        let env: HashMap<&str, &str> = [("ANTONIA_PROFILE", "  ")].into_iter().collect();
        let config = Config::from_lookup(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(config, Config::default());
    }

    #[test]
    fn overrides_and_paths() {
        let env: HashMap<&str, &str> = [("ANTONIA_DATA_DIR", "/tmp/antonia"), ("ANTONIA_PROFILE", "debug")]
            .into_iter()
            .collect();
        let config = Config::from_lookup(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(config.profile, "debug");
        assert_eq!(config.scope, "local");
        assert_eq!(config.miner_command, None);
        assert_eq!(config.graph_path(), PathBuf::from("/tmp/antonia/trq_graph.json"));
        assert_eq!(config.quarantine_dir(), PathBuf::from("/tmp/antonia/quarentena"));
    }

    #[test]
    fn miner_command_is_read_trimmed() {
        let env: HashMap<&str, &str> = [("ANTONIA_MINER_CMD", " python3 minerar.py ")].into_iter().collect();
        let config = Config::from_lookup(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(config.miner_command.as_deref(), Some("python3 minerar.py"));
    }
}
