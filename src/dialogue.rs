//! # Estado de Diálogo — Contexto Estrutural por Sessão
//!
//! O [`DialogueState`] guarda **contexto**, não emoção: o tópico em curso,
//! quantas vezes seguidas ele foi perguntado (profundidade) e o papel
//! funcional que a resposta deve assumir.
//!
//! ## Máquina de Papéis
//!
//! | Profundidade | Papel | Efeito na resposta |
//! |--------------|-------|--------------------|
//! | 0 | [`Neutro`](Role::Neutro) | aguardando contexto |
//! | 1 | [`Definidora`](Role::Definidora) | definição objetiva |
//! | 2 | [`Explicadora`](Role::Explicadora) | + vizinhos diretos no grafo |
//! | ≥ 3 | [`Exploradora`](Role::Exploradora) | + resumo estrutural a 2 passos |
//!
//! ```text
//! advance("energia")  → profundidade 1, papel neutro (pendente)
//! adopt_role()        → definidora
//! advance("energia")  → profundidade 2 → explicadora
//! advance("trabalho") → profundidade 1, papel neutro (tópico trocado)
//! ```
//!
//! O convite final ("Quer mais detalhes...?") só aparece quando há
//! exploração em curso: ver [`needs_continuation()`](DialogueState::needs_continuation).
//!
//! ## Inferência Pragmática
//!
//! [`PragmaticInference`] classifica a **forma** da pergunta, independente
//! do papel, e decide se a resposta deve ser expandida com o grafo.

use std::collections::VecDeque;
use std::fmt;

use chrono::{DateTime, Utc};

use crate::nlu::normalizer::normalize;

/// Turnos guardados no histórico de diálogo.
pub const HISTORY_LIMIT: usize = 50;

/// Papel funcional da resposta: uma postura estrutural, não uma persona.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Role {
    #[default]
    Neutro,
    Definidora,
    Explicadora,
    Exploradora,
}

impl Role {
    /// Papel correspondente a uma profundidade de tópico.
    pub fn for_depth(depth: u32) -> Self {
        match depth {
            0 => Role::Neutro,
            1 => Role::Definidora,
            2 => Role::Explicadora,
            _ => Role::Exploradora,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Neutro => "neutro",
            Role::Definidora => "definidora",
            Role::Explicadora => "explicadora",
            Role::Exploradora => "exploradora",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Um par pergunta/resposta registrado.
#[derive(Clone, Debug)]
pub struct Turn {
    pub timestamp: DateTime<Utc>,
    pub entrada: String,
    pub saida: String,
    pub topico: Option<String>,
    pub papel: Role,
}

/// Estado conversacional vivo de uma sessão. Nunca persistido.
#[derive(Debug, Default)]
pub struct DialogueState {
    topico_atual: Option<String>,
    papel: Role,
    profundidade: u32,
    /// Campo temático corrente (ex: "fisica"), vindo da região do nó.
    area_tematica: Option<String>,
    historico: VecDeque<Turn>,
}

impl DialogueState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn topic(&self) -> Option<&str> {
        self.topico_atual.as_deref()
    }

    pub fn role(&self) -> Role {
        self.papel
    }

    pub fn depth(&self) -> u32 {
        self.profundidade
    }

    pub fn area(&self) -> Option<&str> {
        self.area_tematica.as_deref()
    }

    pub fn set_area(&mut self, area: &str) {
        self.area_tematica = Some(area.to_string());
    }

    /// Avança o estado com o tópico deste turno.
    ///
    /// Mesmo tópico → profundidade + 1. Tópico novo → substitui, profundidade
    /// 1 e papel `neutro` até o próximo [`adopt_role()`](Self::adopt_role).
    /// Tópico vazio não altera nada.
    pub fn advance(&mut self, topic: &str) {
        let topic = normalize(topic);
        if topic.is_empty() {
            return;
        }
        if self.topico_atual.as_deref() == Some(topic.as_str()) {
            self.profundidade += 1;
        } else {
            tracing::debug!(topico = %topic, "Diálogo: troca de tópico");
            self.topico_atual = Some(topic);
            self.profundidade = 1;
            self.papel = Role::Neutro;
        }
    }

    /// Papel sugerido pela profundidade atual.
    pub fn infer_role(&self) -> Role {
        Role::for_depth(self.profundidade)
    }

    /// Adota o papel inferido e o retorna.
    pub fn adopt_role(&mut self) -> Role {
        self.papel = self.infer_role();
        self.papel
    }

    /// Registra um turno com o tópico e papel correntes.
    pub fn record(&mut self, entrada: &str, saida: &str) {
        if self.historico.len() == HISTORY_LIMIT {
            self.historico.pop_front();
        }
        self.historico.push_back(Turn {
            timestamp: Utc::now(),
            entrada: entrada.to_string(),
            saida: saida.to_string(),
            topico: self.topico_atual.clone(),
            papel: self.papel,
        });
    }

    /// Há exploração em curso? (profundidade ≥ 2 e papel explicadora/exploradora)
    pub fn needs_continuation(&self) -> bool {
        self.profundidade >= 2 && matches!(self.papel, Role::Explicadora | Role::Exploradora)
    }

    /// Convite de continuação; vazio quando não há exploração em curso.
    pub fn closing_prompt(&self) -> String {
        if !self.needs_continuation() {
            return String::new();
        }
        match (self.papel, self.topico_atual.as_deref()) {
            (Role::Exploradora, Some(topic)) => format!(
                "\n\nPosso explorar mais sobre {topic} ou seguir para conceitos relacionados?"
            ),
            (Role::Exploradora, None) => {
                "\n\nPosso expandir essas conexões ou mudar o foco?".to_string()
            }
            (Role::Explicadora, _) => "\n\nQuer mais detalhes ou seguimos adiante?".to_string(),
            _ => String::new(),
        }
    }

    /// Os `n` turnos mais recentes, do mais antigo ao mais novo.
    pub fn recent(&self, n: usize) -> impl Iterator<Item = &Turn> {
        self.historico.iter().skip(self.historico.len().saturating_sub(n))
    }

    pub fn history_len(&self) -> usize {
        self.historico.len()
    }

    /// Zera tópico, papel e profundidade; mantém área e histórico.
    pub fn soft_reset(&mut self) {
        self.topico_atual = None;
        self.papel = Role::Neutro;
        self.profundidade = 0;
    }

    /// Como [`soft_reset()`](Self::soft_reset), limpando também área e histórico.
    pub fn full_reset(&mut self) {
        self.soft_reset();
        self.area_tematica = None;
        self.historico.clear();
    }
}

/// Forma superficial de uma pergunta.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QuestionShape {
    Definicao,
    Explicacao,
    Relacao,
    Continuacao,
    Comando,
    Neutra,
}

/// Detecção de padrões estruturais na entrada. Sem estado.
pub struct PragmaticInference;

impl PragmaticInference {
    /// Classifica a forma da pergunta por prefixos/substrings fixos.
    ///
    /// Texto sem `?` final que não casou nenhuma regra é `Comando`.
    pub fn classify_question_shape(text: &str) -> QuestionShape {
        let t = normalize(text);

        if ["o que e", "qual e", "defina", "define"]
            .iter()
            .any(|p| t.starts_with(p))
        {
            return QuestionShape::Definicao;
        }
        if ["como", "por que", "porque", "explica", "explique"]
            .iter()
            .any(|p| t.starts_with(p))
        {
            return QuestionShape::Explicacao;
        }
        if ["relaciona", "relacao", "ligacao", "conexao"]
            .iter()
            .any(|s| t.contains(s))
        {
            return QuestionShape::Relacao;
        }
        if ["e ", "mas ", "entao "].iter().any(|p| t.starts_with(p)) {
            return QuestionShape::Continuacao;
        }
        if !text.trim().ends_with('?') {
            return QuestionShape::Comando;
        }
        QuestionShape::Neutra
    }

    /// A resposta deve ser expandida com contexto do grafo?
    pub fn needs_expansion(shape: QuestionShape, state: &DialogueState) -> bool {
        match shape {
            QuestionShape::Definicao if state.depth() <= 1 => false,
            QuestionShape::Explicacao | QuestionShape::Relacao => true,
            QuestionShape::Continuacao if state.depth() >= 1 => true,
            QuestionShape::Comando => false,
            _ => state.depth() >= 2,
        }
    }
}
