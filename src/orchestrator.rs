//! # Orquestrador — O Ciclo de um Turno
//!
//! O [`Orchestrator`] é o **coração do sistema**: recebe a mensagem crua
//! de uma sessão e decide, em ordem fixa, o que fazer com ela.
//!
//! ## O Ciclo de um Turno
//!
//! ```text
//! Mensagem do Usuário
//!   │
//!   ├── 0. Sessão inválida? → "Sessão inválida." (nada é alterado)
//!   ├── 1. Perfil automático (se ligado na sessão) → reinfere o perfil
//!   ├── 2. IntentClassifier → Intent { kind, subject, payload }
//!   │
//!   ├── 3a. COMANDO  (/add, /relacionar, /graph, /profile, /minerar, /nota, ...)
//!   │       └── muta dicionário / grafo / notas / quarentena → mensagem de status
//!   │
//!   ├── 3b. SOCIAL   (oi, obrigado, sim, não, ...)
//!   │       └── template fixo, sem recuperação
//!   │
//!   └── 3c. PERGUNTA
//!           ├── sujeito omitido → tópico corrente (follow-up)
//!           ├── forma pragmática da pergunta
//!           ├── desconhecida curta → definição implícita (sem TSMP)
//!           ├── senão TSMP → contexto limitado (só vale se veio do dicionário/notas)
//!           ├── composição por intent + papel
//!           │     definidora: definição · explicadora: + vizinhos
//!           │     exploradora: + resumo estrutural a dois passos
//!           ├── verbalizador opcional (falhas engolidas)
//!           ├── auditoria TSMP (perfil debug)
//!           └── convite de continuação
//!   │
//!   └── 4. Registro: histórico do diálogo + memória episódica (80)
//! ```
//!
//! ## Princípio Guardião
//!
//! Conceito desconhecido recebe uma resposta explícita de "não tenho",
//! nunca conteúdo fabricado. O verbalizador só reescreve respostas com
//! base conhecida.
//!
//! ## Concorrência
//!
//! Todo turno toma `&mut self`: o borrow checker serializa o acesso às
//! sessões e aos stores, sem locks.

use std::collections::HashMap;

use uuid::Uuid;

use crate::core::quarantine::CandidateEdit;
use crate::core::{
    DictionaryEntry, DictionaryStore, KnowledgeGraph, KnowledgeNotes, QuarantineStore,
    RelationType, ReviewAction,
};
use crate::dialogue::{DialogueState, PragmaticInference, Role};
use crate::external::{RelationMiner, Verbalizer, VerbalizerError};
use crate::nlu::normalizer::{normalize, tokenize};
use crate::nlu::{Intent, IntentClassifier, IntentKind};
use crate::profiles::{infer_profile_from_prompt, Profile};
use crate::retrieval::{select_top, Retrieval, Signals};
use crate::session::SessionStore;
use crate::templates;

/// Relações listadas na expansão de 1 passo.
const MAX_NEIGHBOR_LINES: usize = 8;
/// Conceitos listados no resumo estrutural.
const MAX_STRUCTURAL_ITEMS: usize = 8;
/// Linhas da auditoria TSMP no perfil debug.
const AUDIT_LINES: usize = 8;
/// Propostas pedidas ao minerador por `/minerar`.
const MINING_MAX_RELATIONS: usize = 5;
/// Tokens máximos pedidos ao verbalizador.
const VERBALIZER_MAX_TOKENS: usize = 120;

/// Dono de todos os stores, das sessões e dos estados de diálogo.
pub struct Orchestrator {
    dictionary: DictionaryStore,
    graph: KnowledgeGraph,
    notes: KnowledgeNotes,
    quarantine: QuarantineStore,
    sessions: SessionStore,
    /// Estado de diálogo por sessão, criado no primeiro turno.
    dialogues: HashMap<Uuid, DialogueState>,
    classifier: IntentClassifier,
    verbalizer: Option<Box<dyn Verbalizer>>,
    miner: Option<Box<dyn RelationMiner>>,
}

impl Orchestrator {
    pub fn new(
        dictionary: DictionaryStore,
        graph: KnowledgeGraph,
        notes: KnowledgeNotes,
        quarantine: QuarantineStore,
    ) -> Self {
        Self {
            dictionary,
            graph,
            notes,
            quarantine,
            sessions: SessionStore::new(),
            dialogues: HashMap::new(),
            classifier: IntentClassifier::new(),
            verbalizer: None,
            miner: None,
        }
    }

    pub fn with_verbalizer(mut self, verbalizer: Box<dyn Verbalizer>) -> Self {
        self.verbalizer = Some(verbalizer);
        self
    }

    pub fn with_miner(mut self, miner: Box<dyn RelationMiner>) -> Self {
        self.miner = Some(miner);
        self
    }

    pub fn create_session(&mut self, escopo: &str, profile_id: &str) -> Uuid {
        self.sessions.create(escopo, profile_id)
    }

    /// Encerra a sessão e descarta seu estado de diálogo.
    pub fn end_session(&mut self, session_id: &Uuid) -> bool {
        self.dialogues.remove(session_id);
        self.sessions.remove(session_id).is_some()
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub fn dialogue(&self, session_id: &Uuid) -> Option<&DialogueState> {
        self.dialogues.get(session_id)
    }

    pub fn graph(&self) -> &KnowledgeGraph {
        &self.graph
    }

    pub fn dictionary(&self) -> &DictionaryStore {
        &self.dictionary
    }

    /// Processa um turno completo e devolve a resposta.
    pub fn process_message(&mut self, session_id: &Uuid, text: &str) -> String {
        let Some(session) = self.sessions.get_mut(session_id) else {
            tracing::warn!(session = %session_id, "Turno para sessão inexistente");
            return templates::invalid_session();
        };

        if session.auto_profile() && !text.trim_start().starts_with('/') {
            let inferred = infer_profile_from_prompt(text);
            if inferred != session.profile_id {
                tracing::info!(from = %session.profile_id, to = %inferred, "Perfil automático trocado");
                session.profile_id = inferred.to_string();
            }
        }

        let intent = self.classifier.classify(text);
        tracing::debug!(kind = %intent.kind, subject = %intent.subject, "Intent classificado");

        let response = if intent.kind.is_command() {
            self.handle_command(session_id, &intent)
        } else if intent.kind.is_social() {
            self.handle_social(session_id, intent.kind)
        } else {
            self.answer_question(session_id, text, intent)
        };

        self.dialogues
            .entry(*session_id)
            .or_default()
            .record(text, &response);
        if let Some(session) = self.sessions.get_mut(session_id) {
            session.remember(text, &response);
        }
        response
    }

    // ─── Fala social ─────────────────────────────────────────────

    fn handle_social(&mut self, session_id: &Uuid, kind: IntentKind) -> String {
        let state = self.dialogues.entry(*session_id).or_default();
        let topic = state.topic().map(str::to_string);
        match kind {
            IntentKind::Saudacao => templates::greeting(),
            IntentKind::Despedida => {
                state.full_reset();
                templates::farewell()
            }
            IntentKind::Agradecimento => templates::thanks(),
            IntentKind::Confirmacao => templates::confirmation(topic.as_deref()),
            IntentKind::Afirmacao => templates::affirmation(topic.as_deref()),
            IntentKind::Negacao => {
                state.soft_reset();
                templates::negation(topic.as_deref())
            }
            _ => templates::unknown_without_base(),
        }
    }

    // ─── Comandos ────────────────────────────────────────────────

    fn handle_command(&mut self, session_id: &Uuid, intent: &Intent) -> String {
        match intent.kind {
            IntentKind::Ensinar => self.cmd_teach(&intent.payload),
            IntentKind::Relacionar => self.cmd_relate(&intent.payload),
            IntentKind::Grafo => self.cmd_graph(&intent.payload),
            IntentKind::Perfil => self.cmd_profile(session_id, &intent.payload),
            IntentKind::Minerar => self.cmd_mine(&intent.payload),
            IntentKind::Quarentena => self.cmd_quarantine(&intent.payload),
            IntentKind::Validar => self.cmd_validate(&intent.payload),
            IntentKind::Colapsar => self.cmd_collapse(&intent.payload),
            IntentKind::Anotar => self.cmd_note(&intent.payload),
            IntentKind::DefinirLista => self.cmd_set_list(&intent.payload),
            _ => templates::unknown_without_base(),
        }
    }

    /// `/add palavra | classe | definicao | [rel1,rel2]`
    fn cmd_teach(&mut self, payload: &str) -> String {
        let parts = split_fields(payload);
        let [palavra, classe, definicao, rest @ ..] = parts.as_slice() else {
            return templates::teach_usage();
        };
        if palavra.is_empty() || classe.is_empty() || definicao.is_empty() {
            return templates::teach_usage();
        }
        let relacoes: Vec<String> = rest
            .first()
            .map(|raw| {
                raw.split(',')
                    .map(normalize)
                    .filter(|r| !r.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        // `add` deixa a entrada em memória mesmo quando a gravação falha;
        // o nó do grafo entra nos dois casos.
        let saved = self.dictionary.add(palavra, classe, definicao, relacoes);
        if self.graph.add_node(palavra, definicao, "geral", "humano", 1.0, 1.0) {
            self.save_graph();
        }
        if let Err(e) = saved {
            tracing::warn!(error = %e, palavra = %palavra, "Falha ao salvar dicionário");
            return templates::teach_memory_only(palavra);
        }
        tracing::info!(palavra = %palavra, "Palavra ensinada");
        templates::teach_ok(palavra)
    }

    /// `/relacionar a | b | tipo`
    fn cmd_relate(&mut self, payload: &str) -> String {
        let parts = split_fields(payload);
        let [a, b, tipo] = parts.as_slice() else {
            return templates::relate_usage();
        };
        let Some(tipo) = RelationType::parse(tipo).filter(RelationType::is_primary) else {
            return templates::relate_invalid_type(tipo);
        };
        let (de, para) = (normalize(a), normalize(b));
        if de.is_empty() || para.is_empty() {
            return templates::relate_usage();
        }
        if de == para {
            return templates::relate_self_loop(&de);
        }
        if let Some(missing) = [&de, &para].into_iter().find(|id| !self.graph.contains(id)) {
            return templates::relate_missing_endpoint(missing);
        }
        if self.graph.has_edge(&de, &para, tipo) {
            return templates::relate_exists(&de, &para, tipo.as_str());
        }

        if !self.graph.add_edge(&de, &para, tipo, 1.0, "humano", false) {
            return templates::relate_usage();
        }
        self.save_graph();
        templates::relate_ok(&de, &para, tipo.as_str())
    }

    /// `/graph stats` | `/graph ver <conceito>`
    fn cmd_graph(&self, payload: &str) -> String {
        let payload = payload.trim();
        if payload == "stats" {
            return templates::graph_stats(&self.graph.stats());
        }
        let Some(concept) = payload.strip_prefix("ver").map(str::trim).filter(|c| !c.is_empty())
        else {
            return templates::graph_usage();
        };
        match self.graph.node(concept) {
            Some(node) => templates::graph_node(node, &self.graph.edges_of(concept)),
            None => templates::graph_node_missing(&normalize(concept)),
        }
    }

    /// `/profile <id>` | `/profile auto`
    fn cmd_profile(&mut self, session_id: &Uuid, payload: &str) -> String {
        let requested = normalize(payload).replace(' ', "_");
        let Some(session) = self.sessions.get_mut(session_id) else {
            return templates::invalid_session();
        };
        if requested.is_empty() {
            return templates::profile_usage(&session.profile_id);
        }
        if requested == "auto" {
            session.set_auto_profile(true);
            return templates::profile_auto(&session.profile_id);
        }
        if !self.sessions.set_profile(session_id, &requested) {
            return templates::profile_invalid(&requested);
        }
        if let Some(session) = self.sessions.get_mut(session_id) {
            session.set_auto_profile(false);
        }
        templates::profile_ok(&requested)
    }

    /// `/minerar conceito [| dominio]`: propostas vão só para a quarentena.
    fn cmd_mine(&mut self, payload: &str) -> String {
        let parts = split_fields(payload);
        let Some(conceito) = parts.first().filter(|c| !c.is_empty()) else {
            return templates::mining_usage();
        };
        let dominio = parts.get(1).filter(|d| !d.is_empty()).map_or("geral", String::as_str);
        let Some(miner) = &self.miner else {
            return templates::no_miner();
        };

        let proposals = match miner.mine(conceito, dominio, MINING_MAX_RELATIONS) {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!(error = %e, conceito = %conceito, "Mineração falhou");
                return templates::mining_failed(conceito);
            }
        };
        match self.quarantine.upsert(conceito, dominio, &proposals) {
            Ok(report) => templates::mining_ok(&normalize(conceito), &report),
            Err(e) => {
                tracing::warn!(error = %e, "Falha ao gravar quarentena");
                templates::save_failed()
            }
        }
    }

    /// `/quarentena [conceito]`
    fn cmd_quarantine(&self, payload: &str) -> String {
        let conceito = payload.trim();
        if conceito.is_empty() {
            return match self.quarantine.list() {
                Ok(list) if list.is_empty() => templates::quarantine_empty(),
                Ok(list) => templates::quarantine_list(&list),
                Err(e) => {
                    tracing::warn!(error = %e, "Falha ao listar quarentena");
                    templates::quarantine_empty()
                }
            };
        }
        match self.quarantine.load(conceito) {
            Ok(Some(file)) => templates::quarantine_file(&file),
            Ok(None) => templates::quarantine_missing(&normalize(conceito)),
            Err(e) => {
                tracing::warn!(error = %e, "Falha ao ler quarentena");
                templates::quarantine_missing(&normalize(conceito))
            }
        }
    }

    /// `/validar conceito | indice | acao [| novo_tipo]`
    fn cmd_validate(&mut self, payload: &str) -> String {
        let parts = split_fields(payload);
        let [conceito, index, action, rest @ ..] = parts.as_slice() else {
            return templates::validate_usage();
        };
        let (Ok(index), Some(action)) = (index.parse::<usize>(), ReviewAction::parse(action)) else {
            return templates::validate_usage();
        };
        let edit = rest.first().filter(|t| !t.is_empty()).map(|tipo| CandidateEdit {
            tipo: Some(tipo.clone()),
            ..CandidateEdit::default()
        });

        match self.quarantine.review(conceito, index, action, edit) {
            Ok(true) => templates::validate_ok(&normalize(conceito), index, action),
            Ok(false) => templates::validate_missing(&normalize(conceito), index),
            Err(e) => {
                tracing::warn!(error = %e, "Falha ao validar candidato");
                templates::save_failed()
            }
        }
    }

    /// `/colapsar [conceito]`: aceitos entram no grafo.
    fn cmd_collapse(&mut self, payload: &str) -> String {
        let only = Some(payload.trim()).filter(|c| !c.is_empty());
        match self.quarantine.collapse(&mut self.graph, only) {
            Ok(report) => {
                if report.added > 0 {
                    self.save_graph();
                }
                templates::collapse_report(&report)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Falha no colapso da quarentena");
                templates::save_failed()
            }
        }
    }

    /// `/nota texto`
    fn cmd_note(&mut self, payload: &str) -> String {
        let texto = payload.trim();
        if texto.is_empty() {
            return templates::note_usage();
        }
        if !self.notes.add_note(texto) {
            return templates::note_exists();
        }
        self.save_notes();
        templates::note_ok(self.notes.note_count())
    }

    /// `/lista nome | item1, item2, ...`
    fn cmd_set_list(&mut self, payload: &str) -> String {
        let parts = split_fields(payload);
        let [nome, itens] = parts.as_slice() else {
            return templates::set_list_usage();
        };
        let itens: Vec<String> = itens
            .split(',')
            .map(str::trim)
            .filter(|i| !i.is_empty())
            .map(str::to_string)
            .collect();
        if normalize(nome).is_empty() || itens.is_empty() {
            return templates::set_list_usage();
        }
        let total = itens.len();
        self.notes.set_list(nome, itens);
        self.save_notes();
        templates::set_list_ok(&normalize(nome), total)
    }

    fn save_notes(&self) {
        if let Err(e) = self.notes.save() {
            tracing::warn!(error = %e, "Falha ao salvar notas");
        }
    }

    fn save_graph(&self) {
        if let Err(e) = self.graph.save() {
            tracing::warn!(error = %e, "Falha ao salvar grafo");
        }
    }

    // ─── Perguntas ───────────────────────────────────────────────

    fn answer_question(&mut self, session_id: &Uuid, text: &str, intent: Intent) -> String {
        let Some(session) = self.sessions.get(session_id) else {
            return templates::invalid_session();
        };
        let profile: &Profile = session.profile();
        let signals = Signals::resolve(profile, &session.estado_dinamico);

        let mut kind = intent.kind;
        let mut subject = intent.subject;

        // ─── Estado de diálogo: follow-up, tópico, papel ─────────
        let state = self.dialogues.entry(*session_id).or_default();
        let follow_up = subject.is_empty() && kind != IntentKind::Desconhecida;
        if follow_up {
            if let Some(topic) = state.topic() {
                subject = topic.to_string();
            }
        }

        let shape = PragmaticInference::classify_question_shape(text);
        let content_tokens = tokenize(&subject).len();
        let implicit = kind == IntentKind::Desconhecida && (1..=2).contains(&content_tokens);
        if implicit {
            kind = IntentKind::Definicao;
        }

        if kind != IntentKind::Desconhecida {
            state.advance(&subject);
        }
        let role = state.adopt_role();
        let expand = PragmaticInference::needs_expansion(shape, state);
        if let Some(node) = self.graph.node(&subject) {
            state.set_area(&node.regiao.campo);
        }
        tracing::debug!(role = %role, depth = state.depth(), ?shape, "Diálogo atualizado");

        // ─── TSMP ────────────────────────────────────────────────
        let selection = (!implicit).then(|| {
            let retrieval = Retrieval {
                dictionary: &self.dictionary,
                notes: &self.notes,
                session,
            };
            let candidates = retrieval.gather(&subject, profile, &signals);
            let query = if follow_up {
                format!("{text} {subject}")
            } else {
                text.to_string()
            };
            select_top(
                candidates,
                &query,
                &signals,
                profile.tsmp.top_k,
                profile.tsmp.max_chars,
            )
        });
        let context = selection
            .as_ref()
            .filter(|s| s.grounded)
            .map_or("", |s| s.context.as_str());

        // ─── Composição ──────────────────────────────────────────
        let (mut response, known) = self.compose(kind, &subject, context);

        let wants_graph = matches!(
            kind,
            IntentKind::Definicao | IntentKind::Explicacao | IntentKind::Como | IntentKind::Porque
        );
        if known && wants_graph && self.graph.contains(&subject) {
            if matches!(role, Role::Explicadora | Role::Exploradora) || expand {
                response.push_str(&neighbor_summary(&self.graph, &subject));
            }
            if role == Role::Exploradora {
                response.push_str(&structural_summary(&self.graph, &subject));
            }
        }

        if known {
            if let Some(verbalizer) = &self.verbalizer {
                match restyle(verbalizer.as_ref(), &response, profile.prompt.tom) {
                    Ok(restyled) => response = restyled,
                    Err(e) => tracing::warn!(error = %e, "Verbalizador falhou; mantendo resposta"),
                }
            }
        }

        if profile.is_debug() {
            if let Some(selection) = &selection {
                response.push_str("\n\n[DEBUG: seleção TSMP]\n");
                response.push_str(&selection.audit(AUDIT_LINES));
            }
        }

        if let Some(state) = self.dialogues.get(session_id) {
            response.push_str(&state.closing_prompt());
        }
        response
    }

    /// Compõe a resposta base. O `bool` diz se havia base conhecida.
    fn compose(&self, kind: IntentKind, subject: &str, context: &str) -> (String, bool) {
        match kind {
            IntentKind::Definicao | IntentKind::Explicacao => {
                if subject.is_empty() {
                    return (templates::ask_for_word(), false);
                }
                if let Some(entry) = lookup_entry(&self.dictionary, subject) {
                    let text =
                        templates::definition(&entry.forma, &entry.definicao, Some(&entry.classe));
                    return (text, true);
                }
                match self.graph.node(subject) {
                    Some(node) if !node.definicao_curta.is_empty() => (
                        templates::definition(&node.id, &node.definicao_curta, None),
                        true,
                    ),
                    _ => (templates::not_found(subject), false),
                }
            }
            IntentKind::Como => {
                let topic = if subject.is_empty() { "isso" } else { subject };
                if context.is_empty() {
                    (templates::how(topic, templates::HOW_WITHOUT_BASE), false)
                } else {
                    (templates::how(topic, context), true)
                }
            }
            IntentKind::Porque => {
                let topic = if subject.is_empty() { "isso" } else { subject };
                if context.is_empty() {
                    (templates::why(topic, templates::WHY_WITHOUT_BASE), false)
                } else {
                    (templates::why(topic, context), true)
                }
            }
            IntentKind::Listar => {
                let itens = self.notes.list(subject).unwrap_or_default();
                (templates::list(subject, itens), !itens.is_empty())
            }
            IntentKind::Exemplo => {
                if subject.is_empty() {
                    return (templates::ask_for_word(), false);
                }
                let exemplos = examples_of(&self.graph, subject);
                if !exemplos.is_empty() {
                    (templates::examples(subject, &exemplos), true)
                } else if self.graph.contains(subject)
                    || lookup_entry(&self.dictionary, subject).is_some()
                {
                    (templates::examples(subject, &[]), false)
                } else {
                    (templates::examples_unknown(subject), false)
                }
            }
            IntentKind::Localizacao | IntentKind::Camada => {
                if subject.is_empty() {
                    return (templates::ask_for_word(), false);
                }
                match self.graph.node(subject) {
                    Some(node) if kind == IntentKind::Localizacao => {
                        (templates::location(node), true)
                    }
                    Some(node) => (templates::layer(node), true),
                    None => (templates::graph_node_missing(&normalize(subject)), false),
                }
            }
            _ => {
                if let Some(entry) = lookup_entry(&self.dictionary, subject) {
                    let text =
                        templates::definition(&entry.forma, &entry.definicao, Some(&entry.classe));
                    (text, true)
                } else if !context.is_empty() {
                    (templates::unknown_with_base(context), true)
                } else {
                    (templates::unknown_without_base(), false)
                }
            }
        }
    }
}

/// Separa campos de comando por `|`, aparando espaços.
fn split_fields(payload: &str) -> Vec<String> {
    if payload.trim().is_empty() {
        return Vec::new();
    }
    payload.split('|').map(|p| p.trim().to_string()).collect()
}

/// Entrada do sujeito inteiro, ou do seu primeiro token de conteúdo.
fn lookup_entry<'a>(dictionary: &'a DictionaryStore, subject: &str) -> Option<&'a DictionaryEntry> {
    dictionary.lookup(subject).or_else(|| {
        tokenize(subject)
            .first()
            .and_then(|head| dictionary.lookup(head))
    })
}

/// Conceitos ligados a `subject` por `exemplo`, em qualquer sentido da aresta.
fn examples_of(graph: &KnowledgeGraph, subject: &str) -> Vec<String> {
    let mut found = graph.neighbors(subject, Some(RelationType::Exemplo));
    found.extend(graph.neighbors(subject, Some(RelationType::ExemplificadoPor)));
    found.into_iter().collect()
}

/// Passa a resposta pelo verbalizador; texto vazio conta como falha.
fn restyle(verbalizer: &dyn Verbalizer, text: &str, tone: &str) -> Result<String, VerbalizerError> {
    let restyled = verbalizer.verbalize(text, tone, VERBALIZER_MAX_TOKENS)?;
    if restyled.trim().is_empty() {
        return Err(VerbalizerError::EmptyOutput);
    }
    Ok(restyled)
}

/// Expansão de 1 passo: as relações diretas do conceito.
fn neighbor_summary(graph: &KnowledgeGraph, id: &str) -> String {
    let edges = graph.edges_of(id);
    if edges.is_empty() {
        return String::new();
    }
    let lines: Vec<String> = edges
        .iter()
        .take(MAX_NEIGHBOR_LINES)
        .map(|e| format!("- {} {} {}", e.de, e.tipo.label(), e.para))
        .collect();
    format!("\n\n**Relações no grafo:**\n{}", lines.join("\n"))
}

/// Expansão de 2 passos: conceitos a dois saltos e vizinhos de região.
fn structural_summary(graph: &KnowledgeGraph, id: &str) -> String {
    let Some(node) = graph.node(id) else {
        return String::new();
    };
    let far: Vec<String> = graph.two_hop(&node.id).into_iter().take(MAX_STRUCTURAL_ITEMS).collect();
    let region: Vec<&str> = graph
        .region_members(&node.regiao.nome)
        .into_iter()
        .filter(|m| *m != node.id)
        .take(MAX_STRUCTURAL_ITEMS)
        .collect();
    if far.is_empty() && region.is_empty() {
        return String::new();
    }

    let mut out = String::from("\n\n**Visão estrutural:**");
    if !far.is_empty() {
        out.push_str(&format!("\n- a dois passos: {}", far.join(", ")));
    }
    if !region.is_empty() {
        out.push_str(&format!(
            "\n- mesma região ({}): {}",
            node.regiao.nome,
            region.join(", ")
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::quarantine::RelationProposal;
    use crate::external::{FixtureMiner, MinerError, VerbalizerError};

    fn orchestrator_in(quarantine_dir: &std::path::Path) -> Orchestrator {
        Orchestrator::new(
            DictionaryStore::in_memory(),
            KnowledgeGraph::in_memory(),
            KnowledgeNotes::in_memory(),
            QuarantineStore::new(quarantine_dir),
        )
    }

    /// Quarentena apontando para um diretório que nunca é criado.
    fn orchestrator() -> Orchestrator {
        orchestrator_in(&std::env::temp_dir().join(format!("antonia-q-{}", Uuid::new_v4())))
    }

    fn with_session() -> (Orchestrator, Uuid) {
        let mut orch = orchestrator();
        let id = orch.create_session("teste", "conversacional");
        (orch, id)
    }

    struct FailingVerbalizer;

    impl Verbalizer for FailingVerbalizer {
        fn verbalize(&self, _: &str, _: &str, _: usize) -> Result<String, VerbalizerError> {
            Err(VerbalizerError::Unavailable("sem modelo".into()))
        }
    }

    struct ShoutingVerbalizer;

    impl Verbalizer for ShoutingVerbalizer {
        fn verbalize(&self, text: &str, _: &str, _: usize) -> Result<String, VerbalizerError> {
            Ok(text.to_uppercase())
        }
    }

    struct BrokenMiner;

    impl RelationMiner for BrokenMiner {
        fn name(&self) -> &str {
            "quebrado"
        }

        fn mine(&self, _: &str, _: &str, _: usize) -> Result<Vec<RelationProposal>, MinerError> {
            Err(MinerError::Unavailable("offline".into()))
        }
    }

    #[test]
    fn invalid_session_mutates_nothing() {
        let mut orch = orchestrator();
        let ghost = Uuid::new_v4();
        let resp = orch.process_message(&ghost, "/add energia | substantivo | algo");
        assert_eq!(resp, "Sessão inválida.");
        assert!(orch.dictionary().is_empty());
        assert!(orch.dialogue(&ghost).is_none());
    }

    #[test]
    fn teach_then_ask_definition() {
        let (mut orch, id) = with_session();
        let resp = orch.process_message(&id, "/add energia | substantivo | capacidade de realizar trabalho");
        assert_eq!(resp, "Registrado. Agora eu sei **energia**.");
        assert!(orch.graph().contains("energia"));

        let resp = orch.process_message(&id, "o que é energia?");
        assert!(resp.contains("energia"));
        assert!(resp.contains("capacidade de realizar trabalho"));
    }

    #[test]
    fn unknown_word_is_never_fabricated() {
        let (mut orch, id) = with_session();
        orch.process_message(&id, "/add energia | substantivo | capacidade de realizar trabalho");
        let resp = orch.process_message(&id, "o que é xyzqwerty?");
        assert!(resp.contains("não tenho"));
        assert!(resp.contains("xyzqwerty"));
        assert!(!resp.contains("capacidade"));
    }

    #[test]
    fn teach_usage_on_malformed_payload() {
        let (mut orch, id) = with_session();
        let resp = orch.process_message(&id, "/add energia | substantivo");
        assert!(resp.starts_with("Use: /add"));
        assert!(orch.dictionary().is_empty());
    }

    #[test]
    fn relate_then_graph_view_lists_target() {
        let (mut orch, id) = with_session();
        orch.process_message(&id, "/add energia | substantivo | capacidade de realizar trabalho");
        orch.process_message(&id, "/add trabalho | substantivo | forca ao longo de um deslocamento");
        let resp = orch.process_message(&id, "/relacionar energia | trabalho | relacionado");
        assert!(resp.starts_with("Relação registrada"));

        let resp = orch.process_message(&id, "/graph ver energia");
        assert!(resp.contains("Relações:"));
        assert!(resp.contains("trabalho"));

        let again = orch.process_message(&id, "/relacionar energia | trabalho | relacionado");
        assert!(again.contains("já existe"));
        assert_eq!(orch.graph().edge_count(), 1);
    }

    #[test]
    fn relate_rejects_bad_type_and_self_loop() {
        let (mut orch, id) = with_session();
        let resp = orch.process_message(&id, "/relacionar energia | trabalho | sinonimo");
        assert!(resp.contains("Tipo de relação inválido"));
        let resp = orch.process_message(&id, "/relacionar energia | trabalho | composto_por");
        assert!(resp.contains("Tipo de relação inválido"));
        let resp = orch.process_message(&id, "/relacionar energia | Energia | causa");
        assert!(resp.contains("consigo mesmo"));
        assert_eq!(orch.graph().node_count(), 0);
        assert_eq!(orch.graph().edge_count(), 0);
    }

    #[test]
    fn relate_requires_taught_endpoints() {
        let (mut orch, id) = with_session();
        orch.process_message(&id, "/add energia | substantivo | capacidade de realizar trabalho");

        let resp = orch.process_message(&id, "/relacionar energia | fantasma | causa");
        assert!(resp.contains("**fantasma** não está no grafo"));
        let resp = orch.process_message(&id, "/relacionar vacuo | energia | causa");
        assert!(resp.contains("**vacuo** não está no grafo"));
        assert_eq!(orch.graph().node_count(), 1);
        assert_eq!(orch.graph().edge_count(), 0);

        assert!(orch.process_message(&id, "/relacionar | energia | causa").starts_with("Use:"));
    }

    #[test]
    fn teach_keeps_stores_consistent_when_save_fails() {
        let dir = tempfile::tempdir().unwrap();
        // Um arquivo no lugar do diretório faz a gravação falhar.
        let blocker = dir.path().join("bloqueio");
        std::fs::write(&blocker, "").unwrap();
        let dictionary = DictionaryStore::open(blocker.join("dictionary_pt.json")).unwrap();
        let mut orch = Orchestrator::new(
            dictionary,
            KnowledgeGraph::in_memory(),
            KnowledgeNotes::in_memory(),
            QuarantineStore::new(dir.path().join("quarentena")),
        );
        let id = orch.create_session("teste", "conversacional");

        let resp = orch.process_message(&id, "/add energia | substantivo | capacidade de realizar trabalho");
        assert!(resp.contains("só na memória"));
        assert!(orch.dictionary().lookup("energia").is_some());
        assert!(orch.graph().contains("energia"));
        assert!(orch
            .process_message(&id, "o que é energia?")
            .contains("capacidade de realizar trabalho"));
    }

    #[test]
    fn graph_stats_and_usage() {
        let (mut orch, id) = with_session();
        orch.process_message(&id, "/add energia | substantivo | capacidade de realizar trabalho");
        orch.process_message(&id, "/add trabalho | substantivo | forca ao longo de um deslocamento");
        orch.process_message(&id, "/relacionar energia | trabalho | causa");
        let stats = orch.process_message(&id, "/graph stats");
        assert!(stats.contains("nós: 2"));
        assert!(stats.contains("arestas: 1"));
        assert!(stats.contains("causa"));
        assert!(orch.process_message(&id, "/graph").starts_with("Use: /graph"));
        assert!(orch.process_message(&id, "/graph ver nada").contains("não está no grafo"));
    }

    #[test]
    fn depth_and_roles_progress_over_same_topic() {
        let (mut orch, id) = with_session();
        orch.process_message(&id, "/add energia | substantivo | capacidade de realizar trabalho");
        orch.process_message(&id, "/add trabalho | substantivo | forca ao longo de um deslocamento");
        orch.process_message(&id, "/add forca | substantivo | agente que altera o movimento");
        orch.process_message(&id, "/relacionar energia | trabalho | relacionado");
        orch.process_message(&id, "/relacionar trabalho | forca | causa");

        let first = orch.process_message(&id, "o que é energia?");
        let state = orch.dialogue(&id).unwrap();
        assert_eq!((state.depth(), state.role()), (1, Role::Definidora));
        assert!(!first.contains("Relações no grafo"));

        let second = orch.process_message(&id, "o que é energia?");
        let state = orch.dialogue(&id).unwrap();
        assert_eq!((state.depth(), state.role()), (2, Role::Explicadora));
        assert!(second.contains("energia relaciona-se com trabalho"));
        assert!(second.ends_with("Quer mais detalhes ou seguimos adiante?"));

        let third = orch.process_message(&id, "o que é energia?");
        let state = orch.dialogue(&id).unwrap();
        assert_eq!((state.depth(), state.role()), (3, Role::Exploradora));
        assert!(third.contains("a dois passos: forca"));
        assert!(third.contains("Posso explorar mais sobre energia"));
    }

    #[test]
    fn unknown_how_and_why_never_use_internal_state() {
        let mut orch = orchestrator().with_verbalizer(Box::new(ShoutingVerbalizer));
        let id = orch.create_session("teste", "conversacional");

        let how = orch.process_message(&id, "como funciona o xyzqwerty?");
        assert!(how.contains("não tenho base"));
        assert!(!how.contains("estado="));

        // A pergunta anterior já está na memória episódica.
        let why = orch.process_message(&id, "por que xyzqwerty existe?");
        assert!(why.contains("não tenho base"));
        assert!(!why.contains("user:"));
        assert!(!why.contains("estado="));

        let other = orch.process_message(&id, "fale algo sobre o xyzqwerty inexistente agora");
        assert!(other.contains("não tenho"));
        assert!(!other.contains("estado="));
    }

    #[test]
    fn notes_ground_how_answers() {
        let (mut orch, id) = with_session();
        assert!(orch.process_message(&id, "/nota").starts_with("Use: /nota"));
        let resp = orch.process_message(&id, "/nota xyzqwerty funciona por inducao magnetica");
        assert!(resp.contains("1 nota(s)"));
        assert!(orch
            .process_message(&id, "/nota xyzqwerty funciona por inducao magnetica")
            .contains("já estava"));

        let how = orch.process_message(&id, "como funciona o xyzqwerty?");
        assert!(how.contains("xyzqwerty funciona por inducao magnetica"));
        assert!(!how.contains("não tenho base"));
    }

    #[test]
    fn set_list_then_list_question() {
        let (mut orch, id) = with_session();
        assert!(orch.process_message(&id, "/lista planetas").starts_with("Use: /lista"));
        assert!(orch.process_message(&id, "/lista planetas | , ").starts_with("Use: /lista"));
        let resp = orch.process_message(&id, "/lista Planetas | mercurio, venus , terra");
        assert!(resp.contains("**planetas**"));
        assert!(resp.contains("3 item(ns)"));

        let listed = orch.process_message(&id, "liste planetas");
        assert!(listed.contains("- mercurio"));
        assert!(listed.contains("- terra"));
    }

    #[test]
    fn examples_of_unknown_concept_are_not_invented() {
        let (mut orch, id) = with_session();
        let resp = orch.process_message(&id, "me dê um exemplo de xyzqwerty");
        assert!(resp.contains("não tenho"));
        assert!(resp.contains("/add xyzqwerty"));
        assert!(!resp.contains("Eu preciso"));

        orch.process_message(&id, "/add animal | substantivo | ser vivo que se move");
        let resp = orch.process_message(&id, "me dê um exemplo de animal");
        assert!(resp.contains("ainda não tenho exemplos"));
        assert!(resp.contains("/relacionar animal | <exemplo> | exemplo"));

        orch.process_message(&id, "/add cachorro | substantivo | mamifero domestico");
        orch.process_message(&id, "/relacionar animal | cachorro | exemplo");
        let resp = orch.process_message(&id, "me dê um exemplo de animal");
        assert!(resp.contains("- cachorro"));
    }

    #[test]
    fn topic_change_resets_depth() {
        let (mut orch, id) = with_session();
        orch.process_message(&id, "o que é energia?");
        orch.process_message(&id, "o que é energia?");
        orch.process_message(&id, "o que é trabalho?");
        let state = orch.dialogue(&id).unwrap();
        assert_eq!(state.depth(), 1);
        assert_eq!(state.topic(), Some("trabalho"));
    }

    #[test]
    fn follow_up_uses_current_topic() {
        let (mut orch, id) = with_session();
        orch.process_message(&id, "/add energia | substantivo | capacidade de realizar trabalho");
        orch.process_message(&id, "o que é energia?");
        let resp = orch.process_message(&id, "explique melhor");
        assert!(resp.contains("capacidade de realizar trabalho"));
        assert_eq!(orch.dialogue(&id).unwrap().depth(), 2);
    }

    #[test]
    fn social_short_circuits_with_topic() {
        let (mut orch, id) = with_session();
        assert!(orch.process_message(&id, "oi").starts_with("Oi!"));
        orch.process_message(&id, "o que é energia?");
        let resp = orch.process_message(&id, "ok");
        assert!(resp.contains("**energia**"));
        orch.process_message(&id, "não");
        assert_eq!(orch.dialogue(&id).unwrap().topic(), None);
    }

    #[test]
    fn profile_command_and_debug_audit() {
        let (mut orch, id) = with_session();
        assert!(orch.process_message(&id, "/profile nada").contains("desconhecido"));
        assert!(orch.process_message(&id, "/profile debug").contains("**debug**"));
        assert_eq!(orch.sessions().get(&id).unwrap().profile_id, "debug");

        orch.process_message(&id, "/add energia | substantivo | capacidade de realizar trabalho");
        let resp = orch.process_message(&id, "o que é energia?");
        assert!(resp.contains("[DEBUG: seleção TSMP]"));
        assert!(resp.contains("src=dictionary"));
    }

    #[test]
    fn auto_profile_follows_prompt_until_explicit_choice() {
        let (mut orch, id) = with_session();
        orch.process_message(&id, "/profile auto");
        orch.process_message(&id, "mostre a auditoria do tsmp para energia");
        assert_eq!(orch.sessions().get(&id).unwrap().profile_id, "debug");

        orch.process_message(&id, "/profile trq_duro");
        orch.process_message(&id, "mostre a auditoria do tsmp para energia");
        assert_eq!(orch.sessions().get(&id).unwrap().profile_id, "trq_duro");
    }

    #[test]
    fn short_unknown_is_implicit_definition() {
        let (mut orch, id) = with_session();
        orch.process_message(&id, "/add energia | substantivo | capacidade de realizar trabalho");
        let resp = orch.process_message(&id, "energia cinetica");
        assert!(resp.starts_with("**energia** (substantivo)"));
        let resp = orch.process_message(&id, "massa inercial");
        assert!(resp.contains("não tenho"));
    }

    #[test]
    fn verbalizer_failure_is_swallowed() {
        let mut orch = orchestrator().with_verbalizer(Box::new(FailingVerbalizer));
        let id = orch.create_session("teste", "conversacional");
        orch.process_message(&id, "/add energia | substantivo | capacidade de realizar trabalho");
        let resp = orch.process_message(&id, "o que é energia?");
        assert_eq!(resp, "**energia** (substantivo): capacidade de realizar trabalho");
    }

    #[test]
    fn verbalizer_never_touches_not_found() {
        let mut orch = orchestrator().with_verbalizer(Box::new(ShoutingVerbalizer));
        let id = orch.create_session("teste", "conversacional");
        orch.process_message(&id, "/add energia | substantivo | capacidade de realizar trabalho");
        assert!(orch.process_message(&id, "o que é energia?").starts_with("**ENERGIA**"));
        assert!(orch.process_message(&id, "o que é xyzqwerty?").contains("não tenho"));
    }

    #[test]
    fn mining_goes_through_quarantine_before_graph() {
        let dir = tempfile::tempdir().unwrap();
        let mut orch = orchestrator_in(dir.path()).with_miner(Box::new(FixtureMiner));
        let id = orch.create_session("teste", "conversacional");
        orch.process_message(&id, "/add energia | substantivo | capacidade de realizar trabalho");
        orch.process_message(&id, "/add calor | substantivo | energia em transito");
        orch.process_message(&id, "/relacionar energia | calor | relacionado");
        orch.process_message(&id, "/add trabalho | substantivo | forca aplicada ao longo de um deslocamento");

        let resp = orch.process_message(&id, "/minerar energia | fisica");
        assert!(resp.starts_with("2 candidato(s) novo(s)"));
        assert_eq!(orch.graph().edge_count(), 1);

        let listing = orch.process_message(&id, "/quarentena energia");
        assert!(listing.contains("[0] energia --definicao--> trabalho"));
        assert!(listing.contains("pendente"));

        assert!(orch.process_message(&id, "/validar energia | 0 | aceitar").contains("aceito"));
        assert!(orch.process_message(&id, "/validar energia | 1 | aceitar").contains("aceito"));
        assert!(orch.process_message(&id, "/validar energia | 9 | aceitar").contains("Não encontrei"));
        assert!(orch.process_message(&id, "/validar energia | x | aceitar").starts_with("Use:"));

        let report = orch.process_message(&id, "/colapsar energia");
        assert!(report.contains("1 aresta(s) adicionada(s)"));
        assert!(report.contains("1 com nó ausente"));
        assert!(orch.graph().has_edge("energia", "trabalho", RelationType::Definicao));
        assert!(!orch.graph().contains("movimento"));
    }

    #[test]
    fn miner_failure_degrades_to_message() {
        let mut orch = orchestrator().with_miner(Box::new(BrokenMiner));
        let id = orch.create_session("teste", "conversacional");
        assert!(orch.process_message(&id, "/minerar energia").contains("falhou"));
        assert!(orch.process_message(&id, "/quarentena").contains("vazia"));

        let mut bare = orchestrator();
        let id = bare.create_session("teste", "conversacional");
        assert!(bare.process_message(&id, "/minerar energia").contains("Nenhum minerador"));
    }

    #[test]
    fn episodic_memory_is_recorded_and_bounded() {
        let (mut orch, id) = with_session();
        for _ in 0..45 {
            orch.process_message(&id, "oi");
        }
        assert_eq!(orch.sessions().get(&id).unwrap().episodic_len(), 80);
        assert!(orch.end_session(&id));
        assert!(orch.dialogue(&id).is_none());
        assert_eq!(orch.process_message(&id, "oi"), "Sessão inválida.");
    }
}
