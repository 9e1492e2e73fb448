//! # Classificador de Intenção (Intent) do Usuário
//!
//! O [`IntentClassifier`] transforma uma mensagem crua num [`Intent`]
//! estruturado `{kind, subject, payload}`. Não há estatística nem
//! embedding: é **casamento de padrões por prioridade fixa**.
//!
//! ## Ordem das Regras (o primeiro casamento vence)
//!
//! ```text
//! Mensagem do usuário
//!   ├── 1. Comandos (/add, /relacionar, /graph, /profile, /minerar, /nota, ...)
//!   │      → casados no texto cru; o resto vira `payload`
//!   ├── 2. Fala social (igualdade exata no texto normalizado)
//!   │      oi · tchau · obrigado · ok · sim · nao
//!   ├── 3. Remoção repetida de prefixos de continuação
//!   │      "e ", "mas ", "entao ", "e sobre ", ...
//!   ├── 4. Perguntas estruturais: localização, depois camada
//!   ├── 5. Definição · explicação · como · por que · listar
//!   ├── 6. Heurística de exemplo (token "exemplo"/"exemplos")
//!   ├── 7. Um único token de conteúdo → definição
//!   └── 8. Desconhecida (sujeito = texto normalizado)
//! ```
//!
//! Os padrões **não** recebem pontuação. Mudar a tabela exige preservar a
//! ordem, e os testes deste módulo fixam os desempates conhecidos.
//!
//! ## Sujeito
//!
//! O sujeito perde artigos iniciais ("a energia" → "energia"). Se sobrar
//! apenas preenchimento dêitico ("isso", "melhor", "mais sobre isso"), o
//! sujeito fica vazio e o orquestrador o resolve pelo tópico corrente.

use std::fmt;

use super::normalizer::{normalize, tokenize};

/// Tipo de intenção reconhecido pela tabela de regras.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum IntentKind {
    // ─── Comandos ───
    /// `/add palavra | classe | definicao | [rel1,rel2]`
    Ensinar,
    /// `/relacionar a | b | tipo`
    Relacionar,
    /// `/graph stats` ou `/graph ver <conceito>`
    Grafo,
    /// `/profile <id>`
    Perfil,
    /// `/minerar <conceito> [| dominio]`
    Minerar,
    /// `/quarentena [conceito]`
    Quarentena,
    /// `/validar <conceito> | <indice> | <acao> [| tipo]`
    Validar,
    /// `/colapsar [conceito]`
    Colapsar,
    /// `/nota texto`
    Anotar,
    /// `/lista nome | item1, item2`
    DefinirLista,

    // ─── Fala social ───
    Saudacao,
    Despedida,
    Agradecimento,
    Confirmacao,
    Afirmacao,
    Negacao,

    // ─── Perguntas ───
    /// "onde fica X": região do conceito no grafo.
    Localizacao,
    /// "em que camada X": nível do conceito no grafo.
    Camada,
    Definicao,
    Explicacao,
    Como,
    Porque,
    Listar,
    Exemplo,

    Desconhecida,
}

impl IntentKind {
    pub fn is_command(&self) -> bool {
        matches!(
            self,
            IntentKind::Ensinar
                | IntentKind::Relacionar
                | IntentKind::Grafo
                | IntentKind::Perfil
                | IntentKind::Minerar
                | IntentKind::Quarentena
                | IntentKind::Validar
                | IntentKind::Colapsar
                | IntentKind::Anotar
                | IntentKind::DefinirLista
        )
    }

    pub fn is_social(&self) -> bool {
        matches!(
            self,
            IntentKind::Saudacao
                | IntentKind::Despedida
                | IntentKind::Agradecimento
                | IntentKind::Confirmacao
                | IntentKind::Afirmacao
                | IntentKind::Negacao
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            IntentKind::Ensinar => "ensinar",
            IntentKind::Relacionar => "relacionar",
            IntentKind::Grafo => "grafo",
            IntentKind::Perfil => "perfil",
            IntentKind::Minerar => "minerar",
            IntentKind::Quarentena => "quarentena",
            IntentKind::Validar => "validar",
            IntentKind::Colapsar => "colapsar",
            IntentKind::Anotar => "anotar",
            IntentKind::DefinirLista => "definir_lista",
            IntentKind::Saudacao => "saudacao",
            IntentKind::Despedida => "despedida",
            IntentKind::Agradecimento => "agradecimento",
            IntentKind::Confirmacao => "confirmacao",
            IntentKind::Afirmacao => "afirmacao",
            IntentKind::Negacao => "negacao",
            IntentKind::Localizacao => "localizacao",
            IntentKind::Camada => "camada",
            IntentKind::Definicao => "definicao",
            IntentKind::Explicacao => "explicacao",
            IntentKind::Como => "como",
            IntentKind::Porque => "porque",
            IntentKind::Listar => "listar",
            IntentKind::Exemplo => "exemplo",
            IntentKind::Desconhecida => "desconhecida",
        }
    }
}

impl fmt::Display for IntentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Intenção classificada a partir da mensagem do usuário.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Intent {
    pub kind: IntentKind,
    /// Sujeito normalizado; vazio quando a mensagem é um follow-up.
    pub subject: String,
    /// Argumentos crus de comando (texto após o prefixo).
    pub payload: String,
}

impl Intent {
    fn new(kind: IntentKind, subject: impl Into<String>) -> Self {
        Self {
            kind,
            subject: subject.into(),
            payload: String::new(),
        }
    }

    fn command(kind: IntentKind, payload: &str) -> Self {
        Self {
            kind,
            subject: String::new(),
            payload: payload.trim().to_string(),
        }
    }
}

/// Uma linha da tabela de regras: prefixos (já normalizados) → tipo.
struct Rule {
    kind: IntentKind,
    prefixes: &'static [&'static str],
}

const COMMANDS: &[(&str, IntentKind)] = &[
    ("/add", IntentKind::Ensinar),
    ("/relacionar", IntentKind::Relacionar),
    ("/graph", IntentKind::Grafo),
    ("/grafo", IntentKind::Grafo),
    ("/profile", IntentKind::Perfil),
    ("/minerar", IntentKind::Minerar),
    ("/quarentena", IntentKind::Quarentena),
    ("/validar", IntentKind::Validar),
    ("/colapsar", IntentKind::Colapsar),
    ("/nota", IntentKind::Anotar),
    ("/lista", IntentKind::DefinirLista),
];

const SOCIAL: &[(IntentKind, &[&str])] = &[
    (
        IntentKind::Saudacao,
        &["oi", "ola", "oie", "opa", "salve", "hey", "bom dia", "boa tarde", "boa noite", "e ai", "oi tudo bem", "ola tudo bem"],
    ),
    (
        IntentKind::Despedida,
        &["tchau", "ate mais", "ate logo", "ate breve", "adeus", "falou", "fui", "bye"],
    ),
    (
        IntentKind::Agradecimento,
        &["obrigado", "obrigada", "muito obrigado", "muito obrigada", "valeu", "vlw", "brigado", "obg"],
    ),
    (
        IntentKind::Confirmacao,
        &["ok", "okay", "certo", "entendi", "entendido", "beleza", "blz", "ta bom", "ta", "combinado"],
    ),
    (
        IntentKind::Afirmacao,
        &["sim", "claro", "com certeza", "exato", "exatamente", "isso", "isso mesmo", "pode ser", "quero", "bora"],
    ),
    (
        IntentKind::Negacao,
        &["nao", "nao quero", "nao obrigado", "negativo", "nope", "nem", "de jeito nenhum"],
    ),
];

/// Aplicados repetidamente; os mais longos primeiro.
const CONTINUATIONS: &[&str] = &[
    "e quanto a ",
    "e quanto ao ",
    "e sobre ",
    "alem disso ",
    "tambem ",
    "entao ",
    "agora ",
    "mas ",
    "e ",
];

const STRUCTURAL: &[Rule] = &[
    Rule {
        kind: IntentKind::Localizacao,
        prefixes: &[
            "onde fica ",
            "onde esta ",
            "onde se encaixa ",
            "em que regiao fica ",
            "em que regiao ",
            "qual a regiao de ",
            "qual regiao de ",
        ],
    },
    Rule {
        kind: IntentKind::Camada,
        prefixes: &[
            "em que camada fica ",
            "em que camada ",
            "qual a camada de ",
            "qual camada de ",
            "qual o nivel de ",
            "qual nivel de ",
            "em que nivel ",
        ],
    },
];

const QUESTIONS: &[Rule] = &[
    Rule {
        kind: IntentKind::Definicao,
        prefixes: &[
            "o que e ",
            "oque e ",
            "o que sao ",
            "o que significa ",
            "que e ",
            "qual o significado de ",
            "significado de ",
            "definicao de ",
            "defina ",
            "define ",
        ],
    },
    Rule {
        kind: IntentKind::Explicacao,
        prefixes: &[
            "me explique ",
            "me explica ",
            "explique ",
            "explica ",
            "me fale sobre ",
            "fale mais sobre ",
            "fale sobre ",
            "fala sobre ",
            "me conte sobre ",
            "conte sobre ",
        ],
    },
    Rule {
        kind: IntentKind::Como,
        prefixes: &["como funciona ", "como fazer ", "como se faz ", "como "],
    },
    Rule {
        kind: IntentKind::Porque,
        prefixes: &["por que ", "porque ", "pq "],
    },
    Rule {
        kind: IntentKind::Listar,
        prefixes: &["liste ", "listar ", "lista de ", "quais sao os ", "quais sao as ", "quais sao "],
    },
];

const ARTICLES: &[&str] = &["o ", "a ", "os ", "as ", "um ", "uma ", "uns ", "umas "];

const FILLERS: &[&str] = &[
    "isso", "isto", "aquilo", "disso", "nisso", "melhor", "mais", "assim", "ele", "ela", "dele",
    "dela", "sobre", "detalhes", "entao",
];

/// Palavras que acompanham pedidos de exemplo sem serem o sujeito.
const EXAMPLE_NOISE: &[&str] = &[
    "exemplo", "exemplos", "mostre", "mostra", "cite", "algum", "alguns", "dar", "quero", "pode",
];

/// Casa `prefix` (terminado em espaço) contra `t`.
///
/// O prefixo sozinho também casa ("como" casa "como "), com resto vazio.
fn strip_rule_prefix<'a>(t: &'a str, prefix: &str) -> Option<&'a str> {
    if t == prefix.trim_end() {
        return Some("");
    }
    t.strip_prefix(prefix)
}

/// Limpa um sujeito: artigos iniciais fora, preenchimento vira vazio.
fn clean_subject(raw: &str) -> String {
    let mut subject = raw.trim();
    for article in ARTICLES {
        if let Some(rest) = subject.strip_prefix(article) {
            subject = rest.trim_start();
            break;
        }
    }
    if subject.split_whitespace().all(|w| FILLERS.contains(&w)) {
        return String::new();
    }
    subject.to_string()
}

/// Classificador de intenção por regras ordenadas.
///
/// Sem estado: o mesmo texto sempre produz o mesmo [`Intent`].
#[derive(Debug, Default, Clone, Copy)]
pub struct IntentClassifier;

impl IntentClassifier {
    pub fn new() -> Self {
        Self
    }

    /// Classifica uma mensagem do usuário. Sempre retorna um intent.
    pub fn classify(&self, text: &str) -> Intent {
        let raw = text.trim();

        // ─── 1. Comandos (texto cru) ─────────────────────────────
        for (prefix, kind) in COMMANDS {
            if let Some(rest) = raw.strip_prefix(prefix) {
                if rest.is_empty() || rest.starts_with(char::is_whitespace) {
                    return Intent::command(*kind, rest);
                }
            }
        }

        let normalized = normalize(raw);

        // ─── 2. Fala social (igualdade exata) ────────────────────
        for (kind, phrases) in SOCIAL {
            if phrases.contains(&normalized.as_str()) {
                return Intent::new(*kind, "");
            }
        }

        // ─── 3. Prefixos de continuação, repetidamente ───────────
        let mut t = normalized.as_str();
        'strip: loop {
            for prefix in CONTINUATIONS {
                if let Some(rest) = t.strip_prefix(prefix) {
                    if !rest.is_empty() {
                        t = rest;
                        continue 'strip;
                    }
                }
            }
            break;
        }

        // ─── 4 e 5. Estruturais, depois perguntas ────────────────
        for rule in STRUCTURAL.iter().chain(QUESTIONS) {
            for prefix in rule.prefixes {
                if let Some(rest) = strip_rule_prefix(t, prefix) {
                    return Intent::new(rule.kind, clean_subject(rest));
                }
            }
        }

        let tokens = tokenize(t);

        // ─── 6. Heurística de exemplo ────────────────────────────
        if tokens.iter().any(|tk| tk == "exemplo" || tk == "exemplos") {
            let subject: Vec<&str> = tokens
                .iter()
                .map(String::as_str)
                .filter(|tk| !EXAMPLE_NOISE.contains(tk))
                .collect();
            return Intent::new(IntentKind::Exemplo, clean_subject(&subject.join(" ")));
        }

        // ─── 7. Um único token de conteúdo ───────────────────────
        if let [only] = tokens.as_slice() {
            return Intent::new(IntentKind::Definicao, only.clone());
        }

        // ─── 8. Desconhecida ─────────────────────────────────────
        Intent::new(IntentKind::Desconhecida, t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(text: &str) -> Intent {
        IntentClassifier::new().classify(text)
    }

    #[test]
    fn commands_carry_raw_payload() {
        let intent = classify("/add Energia | substantivo | capacidade de realizar trabalho");
        assert_eq!(intent.kind, IntentKind::Ensinar);
        assert_eq!(intent.payload, "Energia | substantivo | capacidade de realizar trabalho");

        assert_eq!(classify("/relacionar a | b | causa").kind, IntentKind::Relacionar);
        assert_eq!(classify("/graph stats").payload, "stats");
        assert_eq!(classify("/profile debug").kind, IntentKind::Perfil);
        assert_eq!(classify("/colapsar").kind, IntentKind::Colapsar);
        assert_eq!(classify("/nota o sol nasce a leste").payload, "o sol nasce a leste");
        assert_eq!(classify("/lista cores | azul, verde").kind, IntentKind::DefinirLista);
        assert!(IntentKind::Anotar.is_command());
    }

    #[test]
    fn command_prefix_requires_word_boundary() {
        assert_ne!(classify("/addx foo").kind, IntentKind::Ensinar);
        assert_ne!(classify("/listar cores").kind, IntentKind::DefinirLista);
    }

    #[test]
    fn social_requires_exact_match() {
        assert_eq!(classify("Oi!").kind, IntentKind::Saudacao);
        assert_eq!(classify("Obrigado.").kind, IntentKind::Agradecimento);
        assert_eq!(classify("Não").kind, IntentKind::Negacao);
        assert_eq!(classify("sim").kind, IntentKind::Afirmacao);
        assert_eq!(classify("ok").kind, IntentKind::Confirmacao);
        // "oi" dentro de uma frase maior não é saudação
        assert_ne!(classify("oi o que e energia").kind, IntentKind::Saudacao);
    }

    #[test]
    fn definition_prefix_and_articles() {
        let intent = classify("O que é energia?");
        assert_eq!(intent.kind, IntentKind::Definicao);
        assert_eq!(intent.subject, "energia");

        let intent = classify("o que é a entropia");
        assert_eq!(intent.subject, "entropia");
    }

    #[test]
    fn continuation_prefixes_are_stripped_repeatedly() {
        let intent = classify("e entao, como funciona a energia?");
        assert_eq!(intent.kind, IntentKind::Como);
        assert_eq!(intent.subject, "energia");

        let intent = classify("E sobre o trabalho?");
        assert_eq!(intent.kind, IntentKind::Definicao);
        assert_eq!(intent.subject, "trabalho");
    }

    #[test]
    fn fillers_leave_subject_empty() {
        let intent = classify("explique melhor");
        assert_eq!(intent.kind, IntentKind::Explicacao);
        assert!(intent.subject.is_empty());

        let intent = classify("como assim?");
        assert_eq!(intent.kind, IntentKind::Como);
        assert!(intent.subject.is_empty());

        assert!(classify("fale mais sobre isso").subject.is_empty());
    }

    #[test]
    fn structural_rules_precede_question_rules() {
        let intent = classify("Onde fica energia?");
        assert_eq!(intent.kind, IntentKind::Localizacao);
        assert_eq!(intent.subject, "energia");

        let intent = classify("qual o nível de energia");
        assert_eq!(intent.kind, IntentKind::Camada);
        assert_eq!(intent.subject, "energia");
    }

    #[test]
    fn como_funciona_beats_plain_como() {
        let intent = classify("como funciona o motor");
        assert_eq!(intent.kind, IntentKind::Como);
        assert_eq!(intent.subject, "motor");
    }

    #[test]
    fn why_and_list() {
        let intent = classify("Por que o céu é azul?");
        assert_eq!(intent.kind, IntentKind::Porque);
        assert_eq!(intent.subject, "ceu e azul");

        let intent = classify("liste planetas");
        assert_eq!(intent.kind, IntentKind::Listar);
        assert_eq!(intent.subject, "planetas");
    }

    #[test]
    fn example_heuristic() {
        let intent = classify("me dê um exemplo de energia");
        assert_eq!(intent.kind, IntentKind::Exemplo);
        assert_eq!(intent.subject, "energia");
    }

    #[test]
    fn single_token_is_definition_query() {
        let intent = classify("Energia?");
        assert_eq!(intent.kind, IntentKind::Definicao);
        assert_eq!(intent.subject, "energia");
    }

    #[test]
    fn fallback_is_unknown_with_normalized_subject() {
        let intent = classify("Gosto muito de física!");
        assert_eq!(intent.kind, IntentKind::Desconhecida);
        assert_eq!(intent.subject, "gosto muito de fisica");
    }
}
