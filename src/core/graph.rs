//! # Grafo TRQ — Malha Explícita de Conceitos e Relações
//!
//! O [`KnowledgeGraph`] guarda conhecimento como **estrutura**, não como
//! texto: nós ([`GraphNode`]) são conceitos com definição curta e pesos de
//! confiança; arestas ([`GraphEdge`]) são relações tipadas e pesadas.
//!
//! ## Ontologia Mínima ([`RelationType`])
//!
//! | Tipo | Leitura | Inverso gerado |
//! |------|---------|----------------|
//! | `definicao` | X é definido por Y | `definido_por` |
//! | `parte_de` | X compõe Y | `composto_por` |
//! | `causa` | X provoca Y | `causado_por` |
//! | `relacionado` | X associa-se a Y | `relacionado` (simétrico) |
//! | `exemplo` | X é exemplo de Y | `exemplificado_por` |
//!
//! Só os cinco tipos primários são aceitos em [`add_edge()`](KnowledgeGraph::add_edge).
//! Os rótulos inversos existem apenas como produto de uma inserção
//! bidirecional e nunca podem ser pedidos diretamente.
//!
//! ## Invariantes
//!
//! - ids de nó são sempre a forma [`normalize()`]d do conceito;
//! - [`add_node()`](KnowledgeGraph::add_node) é idempotente;
//! - toda aresta liga dois nós existentes e distintos (sem laços);
//! - o grafo **não** deduplica arestas: quem precisa de "exatamente uma"
//!   consulta [`has_edge()`](KnowledgeGraph::has_edge) antes de inserir;
//! - falhas de mutação são `false`, nunca erro.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Deserializer, Serialize};

use crate::nlu::normalizer::normalize;
use crate::persistence;

/// Tipo de relação entre conceitos.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationType {
    /// "X é definido por Y"
    Definicao,
    /// "X é parte de Y"
    ParteDe,
    /// "X causa Y"
    Causa,
    /// Associação semântica genérica (simétrica).
    Relacionado,
    /// "X é exemplo de Y"
    Exemplo,
    /// Inverso de `definicao`.
    DefinidoPor,
    /// Inverso de `parte_de`.
    CompostoPor,
    /// Inverso de `causa`.
    CausadoPor,
    /// Inverso de `exemplo`.
    ExemplificadoPor,
}

impl RelationType {
    /// Os cinco tipos aceitos em inserções diretas, na ordem da ontologia.
    pub const PRIMARY: [RelationType; 5] = [
        RelationType::Definicao,
        RelationType::ParteDe,
        RelationType::Causa,
        RelationType::Relacionado,
        RelationType::Exemplo,
    ];

    /// Interpreta um rótulo (normalizado; espaços viram `_`).
    ///
    /// Aceita também os rótulos inversos; quem decide se o tipo é
    /// permitido é [`is_primary()`](Self::is_primary).
    pub fn parse(label: &str) -> Option<Self> {
        let key = normalize(label).replace(' ', "_");
        let kind = match key.as_str() {
            "definicao" => RelationType::Definicao,
            "parte_de" => RelationType::ParteDe,
            "causa" => RelationType::Causa,
            "relacionado" => RelationType::Relacionado,
            "exemplo" => RelationType::Exemplo,
            "definido_por" => RelationType::DefinidoPor,
            "composto_por" => RelationType::CompostoPor,
            "causado_por" => RelationType::CausadoPor,
            "exemplificado_por" => RelationType::ExemplificadoPor,
            _ => return None,
        };
        Some(kind)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RelationType::Definicao => "definicao",
            RelationType::ParteDe => "parte_de",
            RelationType::Causa => "causa",
            RelationType::Relacionado => "relacionado",
            RelationType::Exemplo => "exemplo",
            RelationType::DefinidoPor => "definido_por",
            RelationType::CompostoPor => "composto_por",
            RelationType::CausadoPor => "causado_por",
            RelationType::ExemplificadoPor => "exemplificado_por",
        }
    }

    /// `true` para os cinco tipos do conjunto fechado.
    pub fn is_primary(&self) -> bool {
        Self::PRIMARY.contains(self)
    }

    /// Tipo da aresta criada no sentido oposto por uma inserção bidirecional.
    pub fn inverse(&self) -> RelationType {
        match self {
            RelationType::Definicao => RelationType::DefinidoPor,
            RelationType::DefinidoPor => RelationType::Definicao,
            RelationType::ParteDe => RelationType::CompostoPor,
            RelationType::CompostoPor => RelationType::ParteDe,
            RelationType::Causa => RelationType::CausadoPor,
            RelationType::CausadoPor => RelationType::Causa,
            RelationType::Relacionado => RelationType::Relacionado,
            RelationType::Exemplo => RelationType::ExemplificadoPor,
            RelationType::ExemplificadoPor => RelationType::Exemplo,
        }
    }

    /// Leitura em PT-BR, usada nas respostas.
    pub fn label(&self) -> &'static str {
        match self {
            RelationType::Definicao => "é definido por",
            RelationType::ParteDe => "é parte de",
            RelationType::Causa => "causa",
            RelationType::Relacionado => "relaciona-se com",
            RelationType::Exemplo => "é exemplo de",
            RelationType::DefinidoPor => "define",
            RelationType::CompostoPor => "é composto por",
            RelationType::CausadoPor => "é causado por",
            RelationType::ExemplificadoPor => "tem como exemplo",
        }
    }
}

impl fmt::Display for RelationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Região semântica de um nó: `nome:campo:nivel`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub nome: String,
    pub campo: String,
    pub nivel: u32,
}

impl Region {
    /// Interpreta `nome:campo:nivel`. Partes ausentes viram `geral` / nível 1;
    /// um nível não numérico também vira 1.
    pub fn parse(raw: &str) -> Self {
        let mut parts = raw.split(':').map(str::trim);
        let nome = parts.next().filter(|p| !p.is_empty()).unwrap_or("geral");
        let campo = parts.next().filter(|p| !p.is_empty()).unwrap_or("geral");
        let nivel = parts.next().and_then(|p| p.parse().ok()).unwrap_or(1);
        Self {
            nome: nome.to_string(),
            campo: campo.to_string(),
            nivel,
        }
    }
}

impl Default for Region {
    fn default() -> Self {
        Self::parse("geral")
    }
}

/// Arquivos antigos guardam `regiao` como string simples.
fn region_from_any<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Region, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Structured(Region),
        Flat(String),
    }
    Ok(match Repr::deserialize(deserializer)? {
        Repr::Structured(region) => region,
        Repr::Flat(raw) => Region::parse(&raw),
    })
}

/// Pesos de um nó, ambos em [0, 1].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NodeWeights {
    /// Quão central/estável é o conceito.
    pub estabilidade: f64,
    /// Confiabilidade da origem.
    pub confianca: f64,
}

/// Conceito do grafo.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: String,
    pub definicao_curta: String,
    pub peso: NodeWeights,
    /// Fonte do conhecimento: `humano`, `livro`, `quarentena_validada`, ...
    pub origem: String,
    #[serde(deserialize_with = "region_from_any", default)]
    pub regiao: Region,
}

/// Relação dirigida entre dois conceitos.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub de: String,
    pub para: String,
    pub tipo: RelationType,
    pub peso: f64,
    pub origem: String,
}

impl GraphEdge {
    /// Extremidade oposta a `id`, se a aresta o toca.
    pub fn other_end(&self, id: &str) -> Option<&str> {
        if self.de == id {
            Some(&self.para)
        } else if self.para == id {
            Some(&self.de)
        } else {
            None
        }
    }
}

/// Estatísticas agregadas do grafo.
#[derive(Clone, Debug, PartialEq)]
pub struct GraphStats {
    pub node_count: usize,
    pub edge_count: usize,
    /// Nomes de região distintos, ordenados.
    pub regions: Vec<String>,
    /// Tipos de relação presentes, ordenados.
    pub relation_types: Vec<String>,
}

/// Grafo TRQ em memória, no formato do arquivo `trq_graph.json`.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct KnowledgeGraph {
    #[serde(default)]
    nodos: BTreeMap<String, GraphNode>,
    #[serde(default)]
    arestas: Vec<GraphEdge>,
    /// Caminho de persistência, não serializado.
    #[serde(skip)]
    path: Option<PathBuf>,
}

fn clamp01(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

impl KnowledgeGraph {
    /// Grafo só em memória.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Abre o grafo de `path`, ou vazio se o arquivo não existir.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let mut graph: KnowledgeGraph = persistence::load_json_or_default(&path)?;
        tracing::info!(
            nodes = graph.nodos.len(),
            edges = graph.arestas.len(),
            path = %path.display(),
            "Grafo TRQ carregado"
        );
        graph.path = Some(path);
        Ok(graph)
    }

    /// Reescreve o arquivo inteiro. No-op para grafos em memória.
    pub fn save(&self) -> Result<()> {
        match &self.path {
            Some(path) => persistence::write_json_atomic(path, self),
            None => Ok(()),
        }
    }

    /// Adiciona um nó se o id (normalizado) ainda não existe.
    ///
    /// Retorna `false`, sem alterar nada, se o nó já existia ou se o id
    /// normaliza para vazio.
    pub fn add_node(
        &mut self,
        id: &str,
        definicao: &str,
        regiao: &str,
        origem: &str,
        estabilidade: f64,
        confianca: f64,
    ) -> bool {
        let key = normalize(id);
        if key.is_empty() || self.nodos.contains_key(&key) {
            return false;
        }
        tracing::debug!(id = %key, "Grafo: nó armazenado");
        self.nodos.insert(
            key.clone(),
            GraphNode {
                id: key,
                definicao_curta: definicao.trim().to_string(),
                peso: NodeWeights {
                    estabilidade: clamp01(estabilidade),
                    confianca: clamp01(confianca),
                },
                origem: origem.to_string(),
                regiao: Region::parse(regiao),
            },
        );
        true
    }

    /// Adiciona uma aresta `de → para`.
    ///
    /// Rejeita (retorna `false`, grafo intacto):
    /// - tipos fora do conjunto primário;
    /// - extremidades inexistentes;
    /// - laços (`de == para`).
    ///
    /// Com `bidirecional`, adiciona também `para → de` com o tipo inverso.
    pub fn add_edge(
        &mut self,
        de: &str,
        para: &str,
        tipo: RelationType,
        peso: f64,
        origem: &str,
        bidirecional: bool,
    ) -> bool {
        if !tipo.is_primary() {
            tracing::debug!(tipo = %tipo, "Grafo: tipo de relação recusado");
            return false;
        }
        let (de, para) = (normalize(de), normalize(para));
        if !self.nodos.contains_key(&de) || !self.nodos.contains_key(&para) {
            tracing::debug!(de = %de, para = %para, "Grafo: extremidade ausente");
            return false;
        }
        if de == para {
            return false;
        }

        let peso = clamp01(peso);
        tracing::debug!(de = %de, para = %para, tipo = %tipo, "Grafo: aresta armazenada");
        self.arestas.push(GraphEdge {
            de: de.clone(),
            para: para.clone(),
            tipo,
            peso,
            origem: origem.to_string(),
        });
        if bidirecional {
            self.arestas.push(GraphEdge {
                de: para,
                para: de,
                tipo: tipo.inverse(),
                peso,
                origem: origem.to_string(),
            });
        }
        true
    }

    /// Nó por id (normalizado).
    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.nodos.get(&normalize(id))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodos.contains_key(&normalize(id))
    }

    /// Existe aresta exatamente `de → para` com esse tipo?
    pub fn has_edge(&self, de: &str, para: &str, tipo: RelationType) -> bool {
        let (de, para) = (normalize(de), normalize(para));
        self.arestas
            .iter()
            .any(|e| e.de == de && e.para == para && e.tipo == tipo)
    }

    /// Vizinhos não-dirigidos de um nó, opcionalmente filtrados por tipo.
    pub fn neighbors(&self, id: &str, tipo: Option<RelationType>) -> BTreeSet<String> {
        let id = normalize(id);
        self.arestas
            .iter()
            .filter(|e| tipo.map_or(true, |t| e.tipo == t))
            .filter_map(|e| e.other_end(&id))
            .map(str::to_string)
            .collect()
    }

    /// Todas as arestas entre `a` e `b`, em qualquer sentido.
    pub fn related(&self, a: &str, b: &str) -> Vec<&GraphEdge> {
        let (a, b) = (normalize(a), normalize(b));
        self.arestas
            .iter()
            .filter(|e| (e.de == a && e.para == b) || (e.de == b && e.para == a))
            .collect()
    }

    /// Todas as arestas que tocam o nó.
    pub fn edges_of(&self, id: &str) -> Vec<&GraphEdge> {
        let id = normalize(id);
        self.arestas
            .iter()
            .filter(|e| e.de == id || e.para == id)
            .collect()
    }

    /// Conceitos a exatamente dois passos de `id` (excluindo vizinhos diretos).
    pub fn two_hop(&self, id: &str) -> BTreeSet<String> {
        let id = normalize(id);
        let first = self.neighbors(&id, None);
        first
            .iter()
            .flat_map(|n| self.neighbors(n, None))
            .filter(|n| *n != id && !first.contains(n))
            .collect()
    }

    /// Ids dos nós cuja região tem esse nome.
    pub fn region_members(&self, nome: &str) -> Vec<&str> {
        self.nodos
            .values()
            .filter(|n| n.regiao.nome == nome)
            .map(|n| n.id.as_str())
            .collect()
    }

    pub fn stats(&self) -> GraphStats {
        let regions: BTreeSet<&str> = self
            .nodos
            .values()
            .map(|n| n.regiao.nome.as_str())
            .filter(|r| !r.is_empty())
            .collect();
        let relation_types: BTreeSet<&str> = self.arestas.iter().map(|e| e.tipo.as_str()).collect();
        GraphStats {
            node_count: self.nodos.len(),
            edge_count: self.arestas.len(),
            regions: regions.into_iter().map(str::to_string).collect(),
            relation_types: relation_types.into_iter().map(str::to_string).collect(),
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodos.len()
    }

    pub fn edge_count(&self) -> usize {
        self.arestas.len()
    }
}
