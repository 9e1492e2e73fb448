//! # Quarentena — Relações Propostas Aguardando Validação Humana
//!
//! Nada que vem de um minerador automático entra direto no grafo. Cada
//! proposta é gravada num arquivo por conceito raiz,
//! `quarentena/quarentena_<conceito>.json`, e só vira aresta depois de:
//!
//! ```text
//! minerador ──► upsert() ──► [quarentena] ──► review(aceitar) ──► collapse() ──► grafo
//!                               │
//!                               └── review(rejeitar) → fica registrado, nunca colapsa
//! ```
//!
//! ## Deduplicação
//!
//! Candidatos são identificados por `(de, para, tipo)`. Um `upsert()`
//! repetido só atualiza metadados (confiança, evidência, origem) de
//! candidatos **ainda não validados**; uma decisão humana nunca é
//! sobrescrita por uma nova rodada do minerador.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::graph::{KnowledgeGraph, RelationType};
use crate::nlu::normalizer::normalize;
use crate::persistence;

/// Decisão humana registrada num candidato.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewAction {
    Aceitar,
    Rejeitar,
    /// Campos editados; ainda precisa de um `aceitar` para colapsar.
    Modificar,
}

impl ReviewAction {
    pub fn parse(raw: &str) -> Option<Self> {
        match normalize(raw).as_str() {
            "aceitar" | "aceito" | "accept" => Some(ReviewAction::Aceitar),
            "rejeitar" | "rejeito" | "reject" => Some(ReviewAction::Rejeitar),
            "modificar" | "modify" => Some(ReviewAction::Modificar),
            _ => None,
        }
    }
}

/// Estado de validação derivado de `(validado, acao)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Validation {
    Pending,
    Accepted,
    Rejected,
}

/// Proposta de relação vinda de um minerador, não confiável.
#[derive(Clone, Debug, PartialEq)]
pub struct RelationProposal {
    pub de: String,
    pub para: String,
    /// Rótulo livre; só é validado contra a ontologia no colapso.
    pub tipo: String,
    pub confianca: f64,
    pub evidencia: String,
    pub origem: String,
}

/// Candidato como gravado no arquivo de quarentena.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QuarantineCandidate {
    pub de: String,
    pub para: String,
    pub tipo: String,
    pub confianca: f64,
    #[serde(default = "default_context")]
    pub contexto: String,
    #[serde(default)]
    pub evidencia: String,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub origem: String,
    #[serde(default)]
    pub validado: bool,
    #[serde(default)]
    pub acao: Option<ReviewAction>,
}

fn default_context() -> String {
    "geral".to_string()
}

impl QuarantineCandidate {
    pub fn key(&self) -> (&str, &str, &str) {
        (&self.de, &self.para, &self.tipo)
    }

    pub fn validation(&self) -> Validation {
        match (self.validado, self.acao) {
            (true, Some(ReviewAction::Aceitar)) => Validation::Accepted,
            (true, Some(ReviewAction::Rejeitar)) => Validation::Rejected,
            _ => Validation::Pending,
        }
    }
}

/// Edição aplicada junto com [`ReviewAction::Modificar`].
#[derive(Clone, Debug, Default)]
pub struct CandidateEdit {
    pub para: Option<String>,
    pub tipo: Option<String>,
    pub confianca: Option<f64>,
}

/// Conteúdo de um arquivo `quarentena_<conceito>.json`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct QuarantineFile {
    pub conceito_raiz: String,
    pub timestamp: String,
    pub total_candidatos: usize,
    pub status: String,
    #[serde(default)]
    pub candidatos: Vec<QuarantineCandidate>,
}

impl QuarantineFile {
    fn new(conceito: &str) -> Self {
        Self {
            conceito_raiz: conceito.to_string(),
            timestamp: Utc::now().to_rfc3339(),
            total_candidatos: 0,
            status: "aguardando_validacao".to_string(),
            candidatos: Vec::new(),
        }
    }

    fn refresh_status(&mut self) {
        let total = self.candidatos.len();
        let validated = self.candidatos.iter().filter(|c| c.validado).count();
        self.total_candidatos = total;
        self.status = if total == 0 {
            "aguardando_validacao".to_string()
        } else {
            format!("validados_{validated}/{total}")
        };
        self.timestamp = Utc::now().to_rfc3339();
    }

    /// Candidatos aceitos, prontos para colapso.
    pub fn accepted(&self) -> impl Iterator<Item = &QuarantineCandidate> {
        self.candidatos
            .iter()
            .filter(|c| c.validation() == Validation::Accepted)
    }
}

/// Resultado de um [`QuarantineStore::upsert()`].
#[derive(Debug, Default, PartialEq)]
pub struct UpsertReport {
    pub added: usize,
    pub updated: usize,
    pub kept_decisions: usize,
    pub total: usize,
}

/// Resultado de um [`QuarantineStore::collapse()`].
#[derive(Debug, Default, PartialEq)]
pub struct CollapseReport {
    pub concepts: usize,
    pub added: usize,
    pub skipped_duplicates: usize,
    pub skipped_missing_nodes: usize,
    pub skipped_invalid: usize,
}

/// Diretório de arquivos de quarentena.
#[derive(Debug, Clone)]
pub struct QuarantineStore {
    dir: PathBuf,
}

impl QuarantineStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn file_for(&self, conceito: &str) -> PathBuf {
        let key = normalize(conceito).replace(' ', "_");
        self.dir.join(format!("quarentena_{key}.json"))
    }

    /// Conceitos com arquivo de quarentena, ordenados.
    pub fn list(&self) -> Result<Vec<String>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }
        let mut concepts = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let name = entry?.file_name().to_string_lossy().into_owned();
            if let Some(stem) = name
                .strip_prefix("quarentena_")
                .and_then(|rest| rest.strip_suffix(".json"))
            {
                concepts.push(stem.to_string());
            }
        }
        concepts.sort();
        Ok(concepts)
    }

    pub fn load(&self, conceito: &str) -> Result<Option<QuarantineFile>> {
        persistence::load_json(&self.file_for(conceito))
    }

    pub fn save(&self, file: &QuarantineFile) -> Result<()> {
        persistence::write_json_atomic(&self.file_for(&file.conceito_raiz), file)
    }

    /// Mescla propostas no arquivo do conceito raiz.
    pub fn upsert(
        &self,
        conceito: &str,
        contexto: &str,
        proposals: &[RelationProposal],
    ) -> Result<UpsertReport> {
        let root = normalize(conceito);
        let mut file = self.load(&root)?.unwrap_or_else(|| QuarantineFile::new(&root));
        let now = Utc::now().to_rfc3339();
        let mut report = UpsertReport::default();

        for proposal in proposals {
            let de = normalize(&proposal.de);
            let para = normalize(&proposal.para);
            let tipo = normalize(&proposal.tipo).replace(' ', "_");
            let existing = file
                .candidatos
                .iter_mut()
                .find(|c| c.key() == (de.as_str(), para.as_str(), tipo.as_str()));

            match existing {
                Some(candidate) if candidate.validado => report.kept_decisions += 1,
                Some(candidate) => {
                    candidate.confianca = proposal.confianca.clamp(0.0, 1.0);
                    candidate.contexto = contexto.to_string();
                    candidate.evidencia = proposal.evidencia.clone();
                    candidate.origem = proposal.origem.clone();
                    candidate.timestamp = now.clone();
                    report.updated += 1;
                }
                None => {
                    file.candidatos.push(QuarantineCandidate {
                        de,
                        para,
                        tipo,
                        confianca: proposal.confianca.clamp(0.0, 1.0),
                        contexto: contexto.to_string(),
                        evidencia: proposal.evidencia.clone(),
                        timestamp: now.clone(),
                        origem: proposal.origem.clone(),
                        validado: false,
                        acao: None,
                    });
                    report.added += 1;
                }
            }
        }

        file.refresh_status();
        report.total = file.total_candidatos;
        self.save(&file)?;
        tracing::info!(
            conceito = %root,
            added = report.added,
            updated = report.updated,
            total = report.total,
            "Quarentena: candidatos mesclados"
        );
        Ok(report)
    }

    /// Registra a decisão humana sobre o candidato `index`.
    ///
    /// Retorna `false` se o arquivo ou o índice não existem.
    pub fn review(
        &self,
        conceito: &str,
        index: usize,
        action: ReviewAction,
        edit: Option<CandidateEdit>,
    ) -> Result<bool> {
        let Some(mut file) = self.load(conceito)? else {
            return Ok(false);
        };
        let Some(candidate) = file.candidatos.get_mut(index) else {
            return Ok(false);
        };

        candidate.validado = true;
        candidate.acao = Some(action);
        if let (ReviewAction::Modificar, Some(edit)) = (action, edit) {
            if let Some(para) = edit.para {
                candidate.para = normalize(&para);
            }
            if let Some(tipo) = edit.tipo {
                candidate.tipo = normalize(&tipo).replace(' ', "_");
            }
            if let Some(confianca) = edit.confianca {
                candidate.confianca = confianca.clamp(0.0, 1.0);
            }
        }

        file.refresh_status();
        self.save(&file)?;
        Ok(true)
    }

    /// Colapsa candidatos aceitos no grafo.
    ///
    /// Deduplica contra as arestas existentes e entre os próprios
    /// candidatos; pula extremidades ausentes e tipos fora da ontologia.
    /// Com `only`, processa só aquele conceito. Não salva o grafo.
    pub fn collapse(&self, graph: &mut KnowledgeGraph, only: Option<&str>) -> Result<CollapseReport> {
        let concepts = match only {
            Some(c) => vec![normalize(c).replace(' ', "_")],
            None => self.list()?,
        };
        let mut report = CollapseReport::default();
        let mut seen: HashSet<(String, String, RelationType)> = HashSet::new();

        for conceito in &concepts {
            let Some(file) = self.load(conceito)? else {
                continue;
            };
            report.concepts += 1;
            for candidate in file.accepted() {
                let Some(tipo) = RelationType::parse(&candidate.tipo).filter(RelationType::is_primary)
                else {
                    report.skipped_invalid += 1;
                    continue;
                };
                let key = (candidate.de.clone(), candidate.para.clone(), tipo);
                if seen.contains(&key) || graph.has_edge(&candidate.de, &candidate.para, tipo) {
                    report.skipped_duplicates += 1;
                    continue;
                }
                if !graph.contains(&candidate.de) || !graph.contains(&candidate.para) {
                    report.skipped_missing_nodes += 1;
                    continue;
                }
                if graph.add_edge(
                    &candidate.de,
                    &candidate.para,
                    tipo,
                    candidate.confianca,
                    "quarentena_validada",
                    false,
                ) {
                    report.added += 1;
                    seen.insert(key);
                } else {
                    report.skipped_invalid += 1;
                }
            }
        }

        tracing::info!(
            added = report.added,
            duplicates = report.skipped_duplicates,
            missing = report.skipped_missing_nodes,
            "Quarentena: colapso concluído"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn proposal(de: &str, para: &str, tipo: &str, confianca: f64) -> RelationProposal {
        RelationProposal {
            de: de.into(),
            para: para.into(),
            tipo: tipo.into(),
            confianca,
            evidencia: String::new(),
            origem: "teste".into(),
        }
    }

    #[test]
    fn upsert_dedupes_by_triple() {
        let dir = tempfile::tempdir().unwrap();
        let store = QuarantineStore::new(dir.path());
        let first = store
            .upsert("energia", "fisica", &[proposal("energia", "trabalho", "definicao", 0.9)])
            .unwrap();
        assert_eq!(first.added, 1);

        let second = store
            .upsert(
                "Energia",
                "fisica",
                &[
                    proposal("ENERGIA", "trabalho", "definicao", 0.5),
                    proposal("energia", "movimento", "causa", 0.8),
                ],
            )
            .unwrap();
        assert_eq!(second.added, 1);
        assert_eq!(second.updated, 1);
        assert_eq!(second.total, 2);

        let file = store.load("energia").unwrap().unwrap();
        assert_eq!(file.candidatos[0].confianca, 0.5);
        assert_eq!(file.status, "validados_0/2");
    }

    #[test]
    fn human_decision_is_never_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let store = QuarantineStore::new(dir.path());
        store
            .upsert("energia", "fisica", &[proposal("energia", "trabalho", "definicao", 0.9)])
            .unwrap();
        assert!(store.review("energia", 0, ReviewAction::Rejeitar, None).unwrap());

        let report = store
            .upsert("energia", "fisica", &[proposal("energia", "trabalho", "definicao", 0.99)])
            .unwrap();
        assert_eq!(report.kept_decisions, 1);

        let file = store.load("energia").unwrap().unwrap();
        let candidate = &file.candidatos[0];
        assert_eq!(candidate.validation(), Validation::Rejected);
        assert_eq!(candidate.confianca, 0.9);
        assert_eq!(file.status, "validados_1/1");
    }

    #[test]
    fn review_unknown_index_or_concept_is_false() {
        let dir = tempfile::tempdir().unwrap();
        let store = QuarantineStore::new(dir.path());
        assert!(!store.review("nada", 0, ReviewAction::Aceitar, None).unwrap());
        store
            .upsert("energia", "fisica", &[proposal("energia", "trabalho", "definicao", 0.9)])
            .unwrap();
        assert!(!store.review("energia", 5, ReviewAction::Aceitar, None).unwrap());
    }

    #[test]
    fn modify_edits_but_stays_pending() {
        let dir = tempfile::tempdir().unwrap();
        let store = QuarantineStore::new(dir.path());
        store
            .upsert("energia", "fisica", &[proposal("energia", "trabalho", "definicao", 0.9)])
            .unwrap();
        let edit = CandidateEdit {
            tipo: Some("relacionado".into()),
            ..CandidateEdit::default()
        };
        assert!(store.review("energia", 0, ReviewAction::Modificar, Some(edit)).unwrap());
        let file = store.load("energia").unwrap().unwrap();
        assert_eq!(file.candidatos[0].tipo, "relacionado");
        assert_eq!(file.candidatos[0].validation(), Validation::Pending);
        assert_eq!(file.accepted().count(), 0);
    }

    #[test]
    fn list_returns_root_concepts() {
        let dir = tempfile::tempdir().unwrap();
        let store = QuarantineStore::new(dir.path().join("quarentena"));
        assert!(store.list().unwrap().is_empty());
        store.upsert("massa", "fisica", &[proposal("massa", "peso", "relacionado", 0.7)]).unwrap();
        store.upsert("energia", "fisica", &[]).unwrap();
        assert_eq!(store.list().unwrap(), vec!["energia", "massa"]);
    }

    #[test]
    fn collapse_adds_only_accepted_and_dedupes() {
        let dir = tempfile::tempdir().unwrap();
        let store = QuarantineStore::new(dir.path());
        let mut graph = KnowledgeGraph::in_memory();
        for n in ["energia", "trabalho", "movimento", "calor"] {
            graph.add_node(n, "", "fisica", "humano", 1.0, 1.0);
        }
        graph.add_edge("energia", "calor", RelationType::Relacionado, 0.8, "humano", false);

        store
            .upsert(
                "energia",
                "fisica",
                &[
                    proposal("energia", "trabalho", "definicao", 0.9),
                    proposal("energia", "movimento", "causa", 0.8),
                    proposal("energia", "calor", "relacionado", 0.7),
                    proposal("energia", "luz", "relacionado", 0.7),
                    proposal("energia", "entropia", "sinonimo", 0.7),
                ],
            )
            .unwrap();
        for i in [0, 2, 3, 4] {
            store.review("energia", i, ReviewAction::Aceitar, None).unwrap();
        }
        store.review("energia", 1, ReviewAction::Rejeitar, None).unwrap();

        let report = store.collapse(&mut graph, None).unwrap();
        assert_eq!(report.concepts, 1);
        assert_eq!(report.added, 1);
        assert_eq!(report.skipped_duplicates, 1);
        assert_eq!(report.skipped_missing_nodes, 1);
        assert_eq!(report.skipped_invalid, 1);
        assert!(graph.has_edge("energia", "trabalho", RelationType::Definicao));
        assert!(!graph.has_edge("energia", "movimento", RelationType::Causa));

        let again = store.collapse(&mut graph, Some("energia")).unwrap();
        assert_eq!(again.added, 0);
        assert_eq!(again.skipped_duplicates, 2);
    }
}
