//! # Perfis — Pacotes Estáticos de Configuração de Resposta
//!
//! Um [`Profile`] controla quais fontes alimentam o TSMP, quanto texto
//! cabe no contexto, o tom pedido ao verbalizador e os sinais de estado
//! usados no bônus de pontuação.
//!
//! | Perfil | Estrito | top-k | Orçamento | Fontes | Tom | Estado |
//! |--------|---------|-------|-----------|--------|-----|--------|
//! | `trq_duro` | sim | 4 | 900 | dictionary, kb, subsignals | analitico | R / 0.80 |
//! | `exploratorio` | não | 8 | 1600 | + episodic | exploratorio | A / 0.60 |
//! | `conversacional` | não | 6 | 1400 | + episodic | conversacional | S / 0.50 |
//! | `debug` | não | 10 | 2000 | `*` | tecnico | N / 0.20 |
//!
//! Perfis são somente-leitura; a sessão guarda apenas o id.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::nlu::normalizer::normalize;

/// Perfil de sessões novas e de ids desconhecidos.
pub const DEFAULT_PROFILE: &str = "conversacional";

/// Fonte de candidatos do TSMP.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Source {
    Dictionary,
    Kb,
    Episodic,
    Subsignals,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Dictionary => "dictionary",
            Source::Kb => "kb",
            Source::Episodic => "episodic",
            Source::Subsignals => "subsignals",
        }
    }

    /// Fontes de conhecimento curado. Episódica e sinais internos não
    /// sustentam uma resposta sozinhos.
    pub fn is_knowledge(&self) -> bool {
        matches!(self, Source::Dictionary | Source::Kb)
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Conjunto de fontes permitidas (`*` = todas).
#[derive(Clone, Copy, Debug)]
pub enum Sources {
    All,
    Only(&'static [Source]),
}

impl Sources {
    pub fn allows(&self, source: Source) -> bool {
        match self {
            Sources::All => true,
            Sources::Only(list) => list.contains(&source),
        }
    }
}

/// Parâmetros do TSMP.
#[derive(Clone, Copy, Debug)]
pub struct TsmpSettings {
    /// Modo "TRQ duro": memória episódica nunca entra no contexto.
    pub strict: bool,
    pub top_k: usize,
    /// Orçamento de caracteres do contexto montado.
    pub max_chars: usize,
    pub sources: Sources,
}

/// Estilo pedido ao verbalizador.
#[derive(Clone, Copy, Debug)]
pub struct PromptStyle {
    pub tom: &'static str,
    pub rigor: &'static str,
    pub especulacao: &'static str,
}

/// Sinais de estado de base do perfil.
#[derive(Clone, Copy, Debug)]
pub struct BaseState {
    pub estado: &'static str,
    pub ressonancia: f64,
    pub curvatura: f64,
    pub ajuste: &'static str,
}

#[derive(Debug)]
pub struct Profile {
    pub id: &'static str,
    pub descricao: &'static str,
    pub tsmp: TsmpSettings,
    pub prompt: PromptStyle,
    pub estado_base: BaseState,
}

static PROFILES: [Profile; 4] = [
    Profile {
        id: "trq_duro",
        descricao: "Respostas curtas, rigorosas, quase só definições/base.",
        tsmp: TsmpSettings {
            strict: true,
            top_k: 4,
            max_chars: 900,
            sources: Sources::Only(&[Source::Dictionary, Source::Kb, Source::Subsignals]),
        },
        prompt: PromptStyle {
            tom: "analitico",
            rigor: "alto",
            especulacao: "baixa",
        },
        estado_base: BaseState {
            estado: "R",
            ressonancia: 0.80,
            curvatura: 1.20,
            ajuste: "rigor",
        },
    },
    Profile {
        id: "exploratorio",
        descricao: "Explica mais, dá exemplos, expande a resposta.",
        tsmp: TsmpSettings {
            strict: false,
            top_k: 8,
            max_chars: 1600,
            sources: Sources::Only(&[
                Source::Dictionary,
                Source::Kb,
                Source::Episodic,
                Source::Subsignals,
            ]),
        },
        prompt: PromptStyle {
            tom: "exploratorio",
            rigor: "medio",
            especulacao: "media",
        },
        estado_base: BaseState {
            estado: "A",
            ressonancia: 0.60,
            curvatura: 0.80,
            ajuste: "explorar",
        },
    },
    Profile {
        id: "conversacional",
        descricao: "Diálogo fluido, didático e curto.",
        tsmp: TsmpSettings {
            strict: false,
            top_k: 6,
            max_chars: 1400,
            sources: Sources::Only(&[
                Source::Dictionary,
                Source::Kb,
                Source::Episodic,
                Source::Subsignals,
            ]),
        },
        prompt: PromptStyle {
            tom: "conversacional",
            rigor: "baixo",
            especulacao: "media",
        },
        estado_base: BaseState {
            estado: "S",
            ressonancia: 0.50,
            curvatura: 0.40,
            ajuste: "dialogo",
        },
    },
    Profile {
        id: "debug",
        descricao: "Mostra como escolheu a resposta (auditoria).",
        tsmp: TsmpSettings {
            strict: false,
            top_k: 10,
            max_chars: 2000,
            sources: Sources::All,
        },
        prompt: PromptStyle {
            tom: "tecnico",
            rigor: "alto",
            especulacao: "baixa",
        },
        estado_base: BaseState {
            estado: "N",
            ressonancia: 0.20,
            curvatura: 0.00,
            ajuste: "auditoria",
        },
    },
];

impl Profile {
    pub fn get(id: &str) -> Option<&'static Profile> {
        PROFILES.iter().find(|p| p.id == id)
    }

    /// Perfil pelo id, caindo no [`DEFAULT_PROFILE`] se desconhecido.
    pub fn get_or_default(id: &str) -> &'static Profile {
        Self::get(id)
            .or_else(|| Self::get(DEFAULT_PROFILE))
            .unwrap_or(&PROFILES[2])
    }

    pub fn all() -> &'static [Profile] {
        &PROFILES
    }

    pub fn is_debug(&self) -> bool {
        self.id == "debug"
    }
}

// ─── Inferência automática de perfil ─────────────────────────────

static FORCED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:(?:modo|mode)\s*[:=]\s*|@)([a-z_]+)\b").expect("regex de modo forçado")
});
static DEBUG_STRONG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(debug|auditoria|subsignals|tsmp|traceback|exception|stacktrace)\b")
        .expect("regex de debug")
});
static DEBUG_WEAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(erro|stack|log)\b").expect("regex de debug fraco"));
static EXPLORE_STRONG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(explique|detalhe|aprofund\w*|passo a passo|com exemplos?)\b")
        .expect("regex de exploração")
});
static EXPLORE_MEDIUM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(compare|contraste|tutorial|ensine)\b").expect("regex de exploração média")
});
static EXPLORE_WEAK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(como funciona|por que|porque)\b").expect("regex de exploração fraca")
});
static ONLY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(apenas|so|somente)\b").expect("regex de restrição"));
static BRIEF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(curta|objetiva|resuma|resumo|em uma frase)\b").expect("regex de brevidade")
});
static DEFINITION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(definicao|defina|conceito)\b").expect("regex de definição"));
static TERSE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(resposta curta|direto ao ponto|em uma frase|sem exemplos?)\b")
        .expect("regex de resposta curta")
});
static FORMAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(defina|definicao formal)\b").expect("regex de definição formal"));

fn forced_alias(raw: &str) -> Option<&'static str> {
    match raw {
        "trq" | "trq_puro" | "puro" | "trq_duro" => Some("trq_duro"),
        "exploratorio" => Some("exploratorio"),
        "conversacional" => Some("conversacional"),
        "debug" => Some("debug"),
        _ => None,
    }
}

/// Escolhe um perfil pela forma da mensagem.
///
/// `modo: <id>` ou `@<id>` no início força o perfil. Sem isso:
/// pedido de auditoria/log → `debug`; pedido de definição curta e estrita
/// → `trq_duro`; pedido de detalhe/exemplos → `exploratorio`; senão
/// `conversacional`.
pub fn infer_profile_from_prompt(msg: &str) -> &'static str {
    let t = normalize(msg);
    if t.is_empty() {
        return DEFAULT_PROFILE;
    }

    // `normalize` troca ':' e '@' por espaço; o forçamento olha o texto cru.
    let lowered = msg.trim().to_lowercase();
    if let Some(forced) = FORCED
        .captures(&lowered)
        .and_then(|c| c.get(1))
        .and_then(|m| forced_alias(m.as_str()))
    {
        return forced;
    }

    let mut debug_score = 0;
    if DEBUG_STRONG.is_match(&t) {
        debug_score += 4;
    }
    if DEBUG_WEAK.is_match(&t) {
        debug_score += 1;
    }
    if msg.contains("```") || (msg.contains('{') && msg.contains('}') && msg.contains('\n')) {
        debug_score += 2;
    }

    let mut explore_score = 0;
    if EXPLORE_STRONG.is_match(&t) {
        explore_score += 3;
    }
    if EXPLORE_MEDIUM.is_match(&t) {
        explore_score += 2;
    }
    if EXPLORE_WEAK.is_match(&t) {
        explore_score += 1;
    }

    let mut strict_score = 0;
    let asks_definition = DEFINITION.is_match(&t);
    if ONLY.is_match(&t) && asks_definition {
        strict_score += 3;
    }
    if BRIEF.is_match(&t) && asks_definition {
        strict_score += 2;
    }
    if TERSE.is_match(&t) {
        strict_score += 3;
    }
    if FORMAL.is_match(&t) {
        strict_score += 2;
    }

    tracing::debug!(debug_score, explore_score, strict_score, "Perfil: pontuação de inferência");

    if debug_score >= 4 {
        "debug"
    } else if strict_score >= 3 && strict_score > explore_score {
        "trq_duro"
    } else if explore_score >= 2 {
        "exploratorio"
    } else {
        DEFAULT_PROFILE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_values() {
        let strict = Profile::get("trq_duro").unwrap();
        assert!(strict.tsmp.strict);
        assert_eq!(strict.tsmp.top_k, 4);
        assert_eq!(strict.tsmp.max_chars, 900);
        assert!(!strict.tsmp.sources.allows(Source::Episodic));
        assert_eq!(strict.estado_base.estado, "R");

        let debug = Profile::get("debug").unwrap();
        assert!(debug.is_debug());
        assert!(debug.tsmp.sources.allows(Source::Episodic));
        assert_eq!(Profile::all().len(), 4);
    }

    #[test]
    fn unknown_profile_falls_back_to_default() {
        assert!(Profile::get("nenhum").is_none());
        assert_eq!(Profile::get_or_default("nenhum").id, DEFAULT_PROFILE);
    }

    #[test]
    fn forced_prefix_wins() {
        assert_eq!(infer_profile_from_prompt("modo: debug o que e energia"), "debug");
        assert_eq!(infer_profile_from_prompt("@trq energia"), "trq_duro");
        assert_eq!(infer_profile_from_prompt("mode=exploratorio energia"), "exploratorio");
    }

    #[test]
    fn heuristics() {
        assert_eq!(infer_profile_from_prompt("mostre a auditoria do tsmp"), "debug");
        assert_eq!(
            infer_profile_from_prompt("explique energia passo a passo com exemplos"),
            "exploratorio"
        );
        assert_eq!(
            infer_profile_from_prompt("apenas a definição de energia, direto ao ponto"),
            "trq_duro"
        );
        assert_eq!(infer_profile_from_prompt("o que é energia?"), "conversacional");
        assert_eq!(infer_profile_from_prompt("   "), "conversacional");
    }
}
