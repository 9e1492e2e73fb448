//! # Colaboradores Externos — Verbalizador e Minerador
//!
//! Dois componentes opcionais ficam fora do núcleo simbólico e entram
//! apenas por trait:
//!
//! | Trait | Contrato | Em caso de falha |
//! |-------|----------|------------------|
//! | [`Verbalizer`] | `(texto, tom, max_tokens) → texto` reescrito, sem fatos novos | a resposta segue como composta |
//! | [`RelationMiner`] | `(conceito, domínio, máx) → propostas` não confiáveis | nenhuma proposta; nada entra no grafo |
//!
//! [`CommandMiner`] liga um programa externo (tipicamente um script que
//! consulta um LLM) pelo stdout: `programa [args...] <conceito> <domínio>
//! <máx>` deve imprimir JSON no formato aceito por [`parse_miner_output`].
//!
//! A saída do minerador **nunca** vai direto para o grafo: o orquestrador
//! a grava na [quarentena](crate::core::quarantine) e espera validação
//! humana.

use std::process::{Command, Stdio};

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::core::quarantine::RelationProposal;

/// Falhas do verbalizador. Sempre engolidas (com log) pelo orquestrador.
#[derive(Debug, Error)]
pub enum VerbalizerError {
    #[error("verbalizador indisponível: {0}")]
    Unavailable(String),

    #[error("verbalizador devolveu texto vazio")]
    EmptyOutput,
}

/// Reescreve um texto já decidido, no tom pedido.
pub trait Verbalizer {
    fn verbalize(&self, text: &str, tone: &str, max_tokens: usize) -> Result<String, VerbalizerError>;
}

/// Falhas do minerador de relações.
#[derive(Debug, Error)]
pub enum MinerError {
    #[error("minerador indisponível: {0}")]
    Unavailable(String),

    #[error("resposta do minerador não é JSON válido: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("formato inesperado na resposta do minerador: {0}")]
    UnexpectedShape(String),
}

/// Propõe relações para um conceito. A saída é não confiável.
pub trait RelationMiner {
    /// Nome gravado como `origem` nas propostas.
    fn name(&self) -> &str;

    fn mine(
        &self,
        concept: &str,
        domain: &str,
        max_relations: usize,
    ) -> Result<Vec<RelationProposal>, MinerError>;
}

/// Minerador de fixture: duas propostas fixas, sem rede nem modelo.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureMiner;

impl RelationMiner for FixtureMiner {
    fn name(&self) -> &str {
        "mock"
    }

    fn mine(
        &self,
        concept: &str,
        _domain: &str,
        max_relations: usize,
    ) -> Result<Vec<RelationProposal>, MinerError> {
        let proposals = vec![
            RelationProposal {
                de: concept.to_string(),
                para: "trabalho".to_string(),
                tipo: "definicao".to_string(),
                confianca: 0.95,
                evidencia: "Energia é a capacidade de realizar trabalho".to_string(),
                origem: self.name().to_string(),
            },
            RelationProposal {
                de: concept.to_string(),
                para: "movimento".to_string(),
                tipo: "causa".to_string(),
                confianca: 0.85,
                evidencia: "Energia pode causar movimento em sistemas físicos".to_string(),
                origem: self.name().to_string(),
            },
        ];
        Ok(proposals.into_iter().take(max_relations).collect())
    }
}

/// Minerador que roda um programa externo e lê JSON do stdout.
#[derive(Debug, Clone)]
pub struct CommandMiner {
    program: String,
    args: Vec<String>,
}

impl CommandMiner {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Monta o minerador a partir de uma linha de comando separada por
    /// espaços. `None` se a linha estiver vazia.
    pub fn from_command_line(line: &str) -> Option<Self> {
        let mut parts = line.split_whitespace().map(str::to_string);
        let program = parts.next()?;
        Some(Self::new(program, parts.collect()))
    }
}

impl RelationMiner for CommandMiner {
    fn name(&self) -> &str {
        &self.program
    }

    fn mine(
        &self,
        concept: &str,
        domain: &str,
        max_relations: usize,
    ) -> Result<Vec<RelationProposal>, MinerError> {
        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(concept)
            .arg(domain)
            .arg(max_relations.to_string())
            .stdin(Stdio::null())
            .output()
            .map_err(|e| MinerError::Unavailable(format!("{}: {e}", self.program)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(MinerError::Unavailable(format!(
                "{} saiu com {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        tracing::debug!(program = %self.program, bytes = stdout.len(), "Minerador externo respondeu");
        let mut proposals = parse_miner_output(&stdout, self.name())?;
        proposals.truncate(max_relations);
        Ok(proposals)
    }
}

const DEFAULT_CONFIDENCE: f64 = 0.7;

fn default_confidence() -> f64 {
    DEFAULT_CONFIDENCE
}

#[derive(Deserialize)]
struct RawRelation {
    de: String,
    para: String,
    tipo: String,
    #[serde(default = "default_confidence")]
    confianca: f64,
    #[serde(default)]
    evidencia: String,
}

/// Remove a cerca de código markdown (```` ```json ... ``` ````) se houver.
fn strip_code_fence(raw: &str) -> &str {
    let raw = raw.trim();
    let Some(rest) = raw.strip_prefix("```") else {
        return raw;
    };
    let body = rest.split("```").next().unwrap_or(rest);
    body.strip_prefix("json").unwrap_or(body).trim()
}

/// Interpreta a saída JSON crua de um minerador baseado em LLM.
///
/// Aceita uma lista de relações ou `{"relacoes": [...]}`, com ou sem
/// cerca markdown. `confianca` ausente vira 0.7. Itens sem `de`, `para`
/// ou `tipo` são descartados com aviso.
pub fn parse_miner_output(raw: &str, origem: &str) -> Result<Vec<RelationProposal>, MinerError> {
    let value: Value = serde_json::from_str(strip_code_fence(raw))?;
    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("relacoes") {
            Some(Value::Array(items)) => items,
            _ => return Err(MinerError::UnexpectedShape("objeto sem lista 'relacoes'".into())),
        },
        other => return Err(MinerError::UnexpectedShape(format!("{other}"))),
    };

    let mut proposals = Vec::with_capacity(items.len());
    for item in items {
        match serde_json::from_value::<RawRelation>(item) {
            Ok(rel) => proposals.push(RelationProposal {
                de: rel.de,
                para: rel.para,
                tipo: rel.tipo,
                confianca: rel.confianca,
                evidencia: rel.evidencia,
                origem: origem.to_string(),
            }),
            Err(e) => tracing::warn!(error = %e, "Minerador: item de relação descartado"),
        }
    }
    Ok(proposals)
}
