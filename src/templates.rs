//! Textos fixos de resposta.
//!
//! Toda fala do agente que não vem do dicionário, do grafo ou das notas
//! sai daqui. As respostas sociais aceitam o tópico corrente para não
//! perder o fio da conversa.

use crate::core::graph::{GraphEdge, GraphNode, GraphStats};
use crate::core::quarantine::{
    CollapseReport, QuarantineFile, ReviewAction, UpsertReport, Validation,
};

pub fn definition(palavra: &str, definicao: &str, classe: Option<&str>) -> String {
    match classe.filter(|c| !c.is_empty()) {
        Some(classe) => format!("**{palavra}** ({classe}): {definicao}"),
        None => format!("**{palavra}**: {definicao}"),
    }
}

pub fn not_found(palavra: &str) -> String {
    format!(
        "Eu não tenho a definição de **{palavra}** no meu dicionário ainda.\n\
         Use /add palavra | classe | definicao (e opcional: | rel1,rel2)."
    )
}

pub fn ask_for_word() -> String {
    "Diga a palavra que você quer definir.".to_string()
}

pub fn how(subject: &str, base: &str) -> String {
    format!("Sobre **{subject}**, eu posso responder assim (base):\n{base}")
}

pub fn why(subject: &str, base: &str) -> String {
    format!("Sobre **{subject}**, uma explicação possível (base):\n{base}")
}

pub const HOW_WITHOUT_BASE: &str =
    "eu ainda não tenho base suficiente no meu dicionário/conhecimento para detalhar.";

pub const WHY_WITHOUT_BASE: &str = "eu ainda não tenho base suficiente para justificar sem inventar.";

pub fn list(subject: &str, itens: &[String]) -> String {
    if itens.is_empty() {
        return format!("Eu não tenho itens cadastrados para **{subject}** ainda.");
    }
    let body: Vec<String> = itens.iter().map(|x| format!("- {x}")).collect();
    format!("**Lista:**\n{}", body.join("\n"))
}

pub fn examples(subject: &str, exemplos: &[String]) -> String {
    if exemplos.is_empty() {
        return format!(
            "Eu ainda não tenho exemplos cadastrados de **{subject}**.\n\n\
             Se quiser me ensinar: /relacionar {subject} | <exemplo> | exemplo"
        );
    }
    let body: Vec<String> = exemplos.iter().map(|x| format!("- {x}")).collect();
    format!("**Exemplos:**\n{}", body.join("\n"))
}

/// Pedido de exemplo para um conceito fora do dicionário e do grafo.
pub fn examples_unknown(subject: &str) -> String {
    format!(
        "Eu não tenho **{subject}** no dicionário nem no grafo, então não tenho exemplos para dar.\n\
         Use /add {subject} | classe | definicao e depois: /relacionar {subject} | <exemplo> | exemplo"
    )
}

pub fn unknown_with_base(base: &str) -> String {
    format!("Eu não identifiquei o tipo de pergunta, mas aqui está o que tenho de base:\n{base}")
}

pub fn unknown_without_base() -> String {
    "Eu não tenho base suficiente ainda. Se você me der uma palavra-chave, eu tento definir."
        .to_string()
}

// ─── Ensino e comandos ───

pub fn teach_ok(palavra: &str) -> String {
    format!("Registrado. Agora eu sei **{palavra}**.")
}

pub fn teach_usage() -> String {
    "Use: /add palavra | classe | definicao (opcional: | rel1,rel2)".to_string()
}

pub fn relate_usage() -> String {
    "Use: /relacionar conceito_a | conceito_b | tipo \
     (tipos: definicao, parte_de, causa, relacionado, exemplo)"
        .to_string()
}

pub fn relate_ok(de: &str, para: &str, tipo: &str) -> String {
    format!("Relação registrada: **{de}** --{tipo}--> **{para}**.")
}

pub fn relate_exists(de: &str, para: &str, tipo: &str) -> String {
    format!("A relação **{de}** --{tipo}--> **{para}** já existe.")
}

pub fn relate_invalid_type(tipo: &str) -> String {
    format!(
        "Tipo de relação inválido: **{tipo}**. \
         Use: definicao, parte_de, causa, relacionado ou exemplo."
    )
}

pub fn save_failed() -> String {
    "Não consegui gravar a alteração no disco; veja o log.".to_string()
}

pub fn teach_memory_only(palavra: &str) -> String {
    format!(
        "Aprendi **{palavra}** nesta sessão, mas não consegui gravar no disco: \
         a mudança vale só na memória até o próximo salvamento."
    )
}

pub fn relate_missing_endpoint(id: &str) -> String {
    format!(
        "O conceito **{id}** não está no grafo; ensine antes com /add {id} | classe | definicao. \
         O grafo não foi alterado."
    )
}

pub fn relate_self_loop(id: &str) -> String {
    format!("Um conceito não pode se relacionar consigo mesmo (**{id}**).")
}

pub fn note_usage() -> String {
    "Use: /nota texto da nota".to_string()
}

pub fn note_ok(total: usize) -> String {
    format!("Nota registrada. Agora tenho {total} nota(s).")
}

pub fn note_exists() -> String {
    "Essa nota já estava registrada.".to_string()
}

pub fn set_list_usage() -> String {
    "Use: /lista nome | item1, item2, ...".to_string()
}

pub fn set_list_ok(nome: &str, total: usize) -> String {
    format!("Lista **{nome}** registrada com {total} item(ns).")
}

pub fn graph_usage() -> String {
    "Use: /graph stats | /graph ver <conceito>".to_string()
}

pub fn profile_usage(current: &str) -> String {
    format!(
        "Seu profile atual é **{current}**. \
         Use: /profile conversacional | exploratorio | trq_duro | debug | auto"
    )
}

pub fn profile_ok(id: &str) -> String {
    format!("Profile alterado para **{id}**.")
}

pub fn profile_auto(current: &str) -> String {
    format!("Profile automático ligado (atual: **{current}**).")
}

pub fn profile_invalid(id: &str) -> String {
    format!("Profile desconhecido: **{id}**.")
}

pub fn invalid_session() -> String {
    "Sessão inválida.".to_string()
}

// ─── Grafo ───

pub fn graph_stats(stats: &GraphStats) -> String {
    let or_none = |items: &[String]| {
        if items.is_empty() {
            "nenhuma".to_string()
        } else {
            items.join(", ")
        }
    };
    format!(
        "**Grafo TRQ**\n- nós: {}\n- arestas: {}\n- regiões: {}\n- tipos: {}",
        stats.node_count,
        stats.edge_count,
        or_none(&stats.regions),
        or_none(&stats.relation_types)
    )
}

pub fn graph_node(node: &GraphNode, edges: &[&GraphEdge]) -> String {
    let mut out = format!(
        "**{}** [{}:{}:{}]\n{}",
        node.id,
        node.regiao.nome,
        node.regiao.campo,
        node.regiao.nivel,
        if node.definicao_curta.is_empty() {
            "(sem definição curta)"
        } else {
            node.definicao_curta.as_str()
        }
    );
    if edges.is_empty() {
        out.push_str("\nRelações: nenhuma.");
        return out;
    }
    out.push_str("\nRelações:");
    for edge in edges {
        if edge.de == node.id {
            out.push_str(&format!("\n- {} --{}--> {}", edge.de, edge.tipo, edge.para));
        } else {
            out.push_str(&format!("\n- {} <--{}-- {}", edge.para, edge.tipo, edge.de));
        }
    }
    out
}

pub fn graph_node_missing(id: &str) -> String {
    format!("O conceito **{id}** não está no grafo.")
}

pub fn location(node: &GraphNode) -> String {
    format!(
        "**{}** fica na região **{}** (campo {}).",
        node.id, node.regiao.nome, node.regiao.campo
    )
}

pub fn layer(node: &GraphNode) -> String {
    format!(
        "**{}** está no nível **{}** da região {}.",
        node.id, node.regiao.nivel, node.regiao.nome
    )
}

// ─── Mineração e quarentena ───

pub fn mining_usage() -> String {
    "Use: /minerar conceito (opcional: | dominio)".to_string()
}

pub fn no_miner() -> String {
    "Nenhum minerador configurado; nada foi proposto.".to_string()
}

pub fn mining_failed(conceito: &str) -> String {
    format!("A mineração de **{conceito}** falhou; a quarentena não foi alterada.")
}

pub fn mining_ok(conceito: &str, report: &UpsertReport) -> String {
    format!(
        "{} candidato(s) novo(s) para **{conceito}** em quarentena ({} atualizado(s), total {}).\n\
         Nada entra no grafo sem validação: /validar {conceito} | <indice> | aceitar",
        report.added, report.updated, report.total
    )
}

pub fn quarantine_empty() -> String {
    "A quarentena está vazia.".to_string()
}

pub fn quarantine_list(concepts: &[String]) -> String {
    let body: Vec<String> = concepts.iter().map(|c| format!("- {c}")).collect();
    format!("**Quarentena:**\n{}", body.join("\n"))
}

pub fn quarantine_missing(conceito: &str) -> String {
    format!("Não há quarentena para **{conceito}**.")
}

pub fn quarantine_file(file: &QuarantineFile) -> String {
    let mut out = format!("**Quarentena de {}** ({})", file.conceito_raiz, file.status);
    for (i, c) in file.candidatos.iter().enumerate() {
        let estado = match (c.validation(), c.acao) {
            (Validation::Accepted, _) => "aceito",
            (Validation::Rejected, _) => "rejeitado",
            (Validation::Pending, Some(ReviewAction::Modificar)) => "modificado",
            (Validation::Pending, _) => "pendente",
        };
        out.push_str(&format!(
            "\n[{i}] {} --{}--> {} (confiança {:.2}, {estado})",
            c.de, c.tipo, c.para, c.confianca
        ));
    }
    out
}

pub fn validate_usage() -> String {
    "Use: /validar conceito | indice | aceitar|rejeitar|modificar (opcional: | novo_tipo)"
        .to_string()
}

pub fn validate_ok(conceito: &str, index: usize, action: ReviewAction) -> String {
    let verbo = match action {
        ReviewAction::Aceitar => "aceito",
        ReviewAction::Rejeitar => "rejeitado",
        ReviewAction::Modificar => "modificado (aceite depois para colapsar)",
    };
    format!("Candidato [{index}] de **{conceito}** {verbo}.")
}

pub fn validate_missing(conceito: &str, index: usize) -> String {
    format!("Não encontrei o candidato [{index}] na quarentena de **{conceito}**.")
}

pub fn collapse_report(report: &CollapseReport) -> String {
    format!(
        "Colapso concluído: {} aresta(s) adicionada(s), {} duplicada(s), \
         {} com nó ausente, {} inválida(s).",
        report.added, report.skipped_duplicates, report.skipped_missing_nodes, report.skipped_invalid
    )
}

// ─── Fala social ───

pub fn greeting() -> String {
    "Oi! Quer seguir em TI ou Fisica agora? Se me disser o tema, eu puxo o melhor caminho."
        .to_string()
}

pub fn farewell() -> String {
    "Beleza. Ate mais.".to_string()
}

pub fn thanks() -> String {
    "De nada. Quer continuar no mesmo tema ou mudar de assunto?".to_string()
}

pub fn confirmation(topic: Option<&str>) -> String {
    match topic {
        Some(t) => format!("Certo. Quer continuar em **{t}** ou mudar de tema?"),
        None => "Certo. Quer continuar no mesmo tema ou mudar de assunto?".to_string(),
    }
}

pub fn affirmation(topic: Option<&str>) -> String {
    match topic {
        Some(t) => format!(
            "Perfeito. Sigo em **{t}**: o que voce quer ver agora (definicao, exemplos, ou relacoes)?"
        ),
        None => "Perfeito. Manda a proxima pergunta.".to_string(),
    }
}

pub fn negation(topic: Option<&str>) -> String {
    match topic {
        Some(t) => format!(
            "Beleza. Entao mudamos de rota. Quer continuar em **{t}** por outro angulo, ou trocar de tema?"
        ),
        None => "Tudo bem. O que voce quer fazer entao?".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn definition_with_and_without_class() {
        assert_eq!(definition("energia", "x", Some("substantivo")), "**energia** (substantivo): x");
        assert_eq!(definition("energia", "x", Some("")), "**energia**: x");
        assert_eq!(definition("energia", "x", None), "**energia**: x");
    }

    #[test]
    fn social_templates_mention_topic() {
        assert!(confirmation(Some("energia")).contains("**energia**"));
        assert!(!negation(None).contains("**"));
    }
}
