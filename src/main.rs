#![allow(dead_code)]
#![allow(rustdoc::broken_intra_doc_links)]
//! # Antonia — Agente Conversacional Simbólico
//!
//! **Ponto de entrada** do chat em terminal.
//!
//! O agente responde em português a partir de três fontes locais (dicionário,
//! grafo TRQ e notas), escolhendo o contexto de cada resposta pelo TSMP.
//! Conceito desconhecido recebe um "não tenho" explícito, nunca uma invenção.
//!
//! ## Fluxo de Inicialização
//!
//! ```text
//! main()
//!   ├── Configura tracing/logging (RUST_LOG)
//!   ├── Lê Config do ambiente (ANTONIA_DATA_DIR, ANTONIA_PROFILE, ANTONIA_SCOPE, ANTONIA_MINER_CMD)
//!   ├── Carrega dicionário, grafo e notas (ou começa vazio)
//!   ├── Cria o Orchestrator e uma sessão
//!   └── Loop stdin → process_message → stdout (até /sair)
//! ```
//!
//! ## Exemplo de Uso
//!
//! ```bash
//! cargo run
//! RUST_LOG=debug ANTONIA_PROFILE=debug cargo run
//!
//! > /add energia | substantivo | capacidade de realizar trabalho
//! > o que é energia?
//! ```

/// Configuração vinda do ambiente.
mod config;

/// Stores de conhecimento: dicionário, grafo TRQ, notas, quarentena.
mod core;

/// Estado de diálogo por sessão e inferência pragmática.
mod dialogue;

/// Colaboradores opcionais: verbalizador e minerador de relações.
mod external;

/// Normalização de texto e classificação de intenção.
mod nlu;

/// Ciclo de um turno.
mod orchestrator;

/// Leitura e escrita atômica de JSON.
mod persistence;

/// Perfis de resposta e inferência automática de perfil.
mod profiles;

/// TSMP: seleção de contexto por pontuação.
mod retrieval;

/// Sessões e memória episódica.
mod session;

/// Textos fixos de resposta.
mod templates;

use std::io::{self, BufRead, Write};
use std::path::Path;

use anyhow::Result;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::core::{DictionaryStore, KnowledgeGraph, KnowledgeNotes, QuarantineStore};
use crate::external::{CommandMiner, RelationMiner};
use crate::orchestrator::Orchestrator;

const EXIT_COMMANDS: &[&str] = &["/sair", "/exit", "/quit"];

/// Carrega um store do disco; se o arquivo estiver ilegível, avisa e
/// segue com o store vazio em memória.
fn load_or_empty<T>(
    kind: &str,
    path: &Path,
    open: impl FnOnce(&Path) -> Result<T>,
    empty: impl FnOnce() -> T,
) -> T {
    match open(path) {
        Ok(store) => store,
        Err(e) => {
            tracing::warn!(error = %e, path = %path.display(), "Falha ao carregar {kind}, iniciando vazio");
            empty()
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    tracing::info!("🌱 Antonia — Starting...");

    let config = Config::from_env();
    tracing::info!(data_dir = %config.data_dir.display(), profile = %config.profile, "Configuração carregada");

    let dictionary = load_or_empty(
        "dicionário",
        &config.dictionary_path(),
        |p| DictionaryStore::open(p),
        DictionaryStore::in_memory,
    );
    let graph = load_or_empty(
        "grafo",
        &config.graph_path(),
        |p| KnowledgeGraph::open(p),
        KnowledgeGraph::in_memory,
    );
    let notes = load_or_empty(
        "notas",
        &config.notes_path(),
        |p| KnowledgeNotes::open(p),
        KnowledgeNotes::in_memory,
    );
    tracing::info!(
        palavras = dictionary.len(),
        nos = graph.node_count(),
        arestas = graph.edge_count(),
        "Conhecimento carregado"
    );

    let mut orchestrator = Orchestrator::new(
        dictionary,
        graph,
        notes,
        QuarantineStore::new(config.quarantine_dir()),
    );
    if let Some(miner) = config.miner_command.as_deref().and_then(CommandMiner::from_command_line) {
        tracing::info!(program = %miner.name(), "Minerador externo configurado");
        orchestrator = orchestrator.with_miner(Box::new(miner));
    }
    let session = orchestrator.create_session(&config.scope, &config.profile);
    tracing::info!("✅ System ready!");

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    write!(stdout, "> ")?;
    stdout.flush()?;

    for line in stdin.lock().lines() {
        let line = line?;
        let text = line.trim();
        if EXIT_COMMANDS.contains(&text) {
            break;
        }
        if !text.is_empty() {
            let response = orchestrator.process_message(&session, text);
            writeln!(stdout, "{response}\n")?;
        }
        write!(stdout, "> ")?;
        stdout.flush()?;
    }

    orchestrator.end_session(&session);
    tracing::info!("Até mais.");
    Ok(())
}
