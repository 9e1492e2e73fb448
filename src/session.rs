//! # Sessões — Estado por Conversa
//!
//! Cada conversa tem uma [`Session`] com id UUID v4, escopo de memória,
//! perfil ativo, estado dinâmico livre (JSON) e memória episódica limitada
//! às [`EPISODIC_LIMIT`] entradas mais recentes.
//!
//! O [`SessionStore`] é o dono explícito de todas as sessões, com ciclo de
//! vida `create → get/get_mut → remove`. Nada é persistido: sessões vivem
//! enquanto o processo vive.

use std::collections::{HashMap, VecDeque};

use serde_json::{Map, Value};
use uuid::Uuid;

use crate::profiles::{Profile, DEFAULT_PROFILE};

/// Entradas mantidas na memória episódica.
pub const EPISODIC_LIMIT: usize = 80;

/// Chave do estado dinâmico que liga a inferência automática de perfil.
pub const AUTO_PROFILE_KEY: &str = "auto_profile";

/// Quem falou numa entrada episódica.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Speaker {
    User,
    Antonia,
}

impl Speaker {
    pub fn as_str(&self) -> &'static str {
        match self {
            Speaker::User => "user",
            Speaker::Antonia => "antonia",
        }
    }
}

#[derive(Clone, Debug)]
pub struct EpisodicEntry {
    pub role: Speaker,
    pub text: String,
}

#[derive(Debug)]
pub struct Session {
    pub id: Uuid,
    pub escopo_memoria: String,
    pub profile_id: String,
    /// Estado livre da sessão (ex: `auto_profile`).
    pub estado_dinamico: Map<String, Value>,
    episodic: VecDeque<EpisodicEntry>,
}

impl Session {
    fn new(escopo: &str, profile_id: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            escopo_memoria: escopo.to_string(),
            profile_id: Profile::get_or_default(profile_id).id.to_string(),
            estado_dinamico: Map::new(),
            episodic: VecDeque::new(),
        }
    }

    pub fn profile(&self) -> &'static Profile {
        Profile::get_or_default(&self.profile_id)
    }

    /// Registra pergunta e resposta, descartando as mais antigas além do limite.
    pub fn remember(&mut self, user_text: &str, response: &str) {
        self.episodic.push_back(EpisodicEntry {
            role: Speaker::User,
            text: user_text.to_string(),
        });
        self.episodic.push_back(EpisodicEntry {
            role: Speaker::Antonia,
            text: response.to_string(),
        });
        while self.episodic.len() > EPISODIC_LIMIT {
            self.episodic.pop_front();
        }
    }

    /// As `n` entradas episódicas mais recentes, em ordem cronológica.
    pub fn recent_episodes(&self, n: usize) -> impl Iterator<Item = &EpisodicEntry> {
        self.episodic.iter().skip(self.episodic.len().saturating_sub(n))
    }

    pub fn episodic_len(&self) -> usize {
        self.episodic.len()
    }

    pub fn auto_profile(&self) -> bool {
        self.estado_dinamico
            .get(AUTO_PROFILE_KEY)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    pub fn set_auto_profile(&mut self, enabled: bool) {
        self.estado_dinamico
            .insert(AUTO_PROFILE_KEY.to_string(), Value::Bool(enabled));
    }
}

/// Dono de todas as sessões do processo.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: HashMap<Uuid, Session>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cria uma sessão; perfil desconhecido vira [`DEFAULT_PROFILE`].
    pub fn create(&mut self, escopo: &str, profile_id: &str) -> Uuid {
        let session = Session::new(escopo, profile_id);
        let id = session.id;
        tracing::info!(session = %id, escopo = %escopo, profile = %session.profile_id, "Sessão criada");
        self.sessions.insert(id, session);
        id
    }

    pub fn get(&self, id: &Uuid) -> Option<&Session> {
        self.sessions.get(id)
    }

    pub fn get_mut(&mut self, id: &Uuid) -> Option<&mut Session> {
        self.sessions.get_mut(id)
    }

    /// Troca o perfil. `false` se a sessão ou o perfil não existem.
    pub fn set_profile(&mut self, id: &Uuid, profile_id: &str) -> bool {
        let Some(profile) = Profile::get(profile_id) else {
            return false;
        };
        match self.sessions.get_mut(id) {
            Some(session) => {
                session.profile_id = profile.id.to_string();
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, id: &Uuid) -> Option<Session> {
        let removed = self.sessions.remove(id);
        if removed.is_some() {
            tracing::info!(session = %id, "Sessão encerrada");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_falls_back_to_default_profile() {
        let mut store = SessionStore::new();
        let id = store.create("local", "inexistente");
        assert_eq!(store.get(&id).unwrap().profile_id, DEFAULT_PROFILE);
        let other = store.create("local", "debug");
        assert_ne!(id, other);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn set_profile_validates_both_ids() {
        let mut store = SessionStore::new();
        let id = store.create("local", DEFAULT_PROFILE);
        assert!(store.set_profile(&id, "trq_duro"));
        assert_eq!(store.get(&id).unwrap().profile().id, "trq_duro");
        assert!(!store.set_profile(&id, "nenhum"));
        assert!(!store.set_profile(&Uuid::new_v4(), "debug"));
    }

    #[test]
    fn episodic_memory_keeps_last_80() {
        let mut store = SessionStore::new();
        let id = store.create("local", DEFAULT_PROFILE);
        let session = store.get_mut(&id).unwrap();
        for i in 0..50 {
            session.remember(&format!("pergunta {i}"), &format!("resposta {i}"));
        }
        assert_eq!(session.episodic_len(), EPISODIC_LIMIT);
        let last: Vec<_> = session.recent_episodes(2).collect();
        assert_eq!(last[0].text, "pergunta 49");
        assert_eq!(last[1].role, Speaker::Antonia);
    }

    #[test]
    fn auto_profile_flag_lives_in_dynamic_state() {
        let mut store = SessionStore::new();
        let id = store.create("local", DEFAULT_PROFILE);
        let session = store.get_mut(&id).unwrap();
        assert!(!session.auto_profile());
        session.set_auto_profile(true);
        assert!(session.auto_profile());
        assert_eq!(session.estado_dinamico[AUTO_PROFILE_KEY], Value::Bool(true));
    }

    #[test]
    fn remove_tears_down() {
        let mut store = SessionStore::new();
        let id = store.create("local", DEFAULT_PROFILE);
        assert!(store.remove(&id).is_some());
        assert!(store.get(&id).is_none());
        assert!(store.is_empty());
    }
}
