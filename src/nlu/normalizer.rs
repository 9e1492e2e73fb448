//! # Normalizador — Chave Canônica de Palavras e Conceitos
//!
//! Todo componente do sistema passa pelo [`normalize()`] antes de comparar
//! texto: o dicionário indexa por ele, o grafo usa como id de nó, o
//! classificador de intent casa prefixos sobre ele, e o TSMP tokeniza com
//! [`tokenize()`].
//!
//! ## Etapas
//!
//! ```text
//! "  Ação é ENERGIA!  "
//!   ├── 1. lowercase              → "  ação é energia!  "
//!   ├── 2. NFD + remove marcas    → "  acao e energia!  "
//!   ├── 3. [^a-z0-9\s-] → espaço  → "  acao e energia   "
//!   └── 4. colapsa espaços        → "acao e energia"
//! ```
//!
//! A função é **total**: qualquer entrada produz uma string (possivelmente
//! vazia). Duas formas de superfície normalizam para o mesmo valor se e
//! somente se denotam o mesmo conceito.

use std::sync::LazyLock;

use regex::Regex;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Stopwords em Português, já na forma normalizada (sem acentos).
///
/// Tokens nesta lista nunca contam como sobreposição no TSMP nem como
/// "palavra de conteúdo" no classificador de intent.
const STOPWORDS: &[&str] = &[
    "o", "a", "os", "as", "um", "uma", "uns", "umas", "de", "da", "do", "das", "dos", "e",
    "ser", "em", "no", "na", "nos", "nas", "por", "para", "com", "que", "qual", "quais", "como",
    "porque", "pra", "onde", "aonde", "fica", "esta", "ta", "isso", "isto", "aquele", "essa",
    "esse", "eu", "voce", "vc", "me", "te", "se", "nao",
];

/// Tudo que não é letra ASCII minúscula, dígito, espaço ou hífen.
static NON_KEY_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9\s-]").expect("regex de normalização válida"));

/// Normaliza texto para a forma canônica usada como chave.
///
/// # Exemplo
///
/// ```rust
/// assert_eq!(normalize("O que é Energia?"), "o que e energia");
/// ```
pub fn normalize(text: &str) -> String {
    let folded: String = text
        .to_lowercase()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect();
    let cleaned = NON_KEY_CHARS.replace_all(&folded, " ");
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Verifica se uma palavra (já normalizada) é stopword.
pub fn is_stopword(word: &str) -> bool {
    STOPWORDS.contains(&word)
}

/// Tokeniza texto: normaliza, separa por espaço, descarta tokens com menos
/// de 2 caracteres e stopwords.
pub fn tokenize(text: &str) -> Vec<String> {
    normalize(text)
        .split(' ')
        .filter(|t| t.chars().count() >= 2 && !is_stopword(t))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    // ─── normalize ─────────────────────────────────────────────

    #[test]
    fn case_variants_normalize_equal() {
        assert_eq!(normalize("Energia"), normalize("ENERGIA"));
        assert_eq!(normalize("ENERGIA"), normalize("energia"));
        assert_eq!(normalize("energia"), "energia");
    }

    #[test]
    fn folds_diacritics_and_cedilla() {
        assert_eq!(normalize("Ação Física"), "acao fisica");
        assert_eq!(normalize("pêndulo àquele órbita úmido"), "pendulo aquele orbita umido");
    }

    #[test]
    fn strips_punctuation_but_keeps_hyphen() {
        assert_eq!(normalize("o que é energia?!"), "o que e energia");
        assert_eq!(normalize("guarda-chuva, (novo)"), "guarda-chuva novo");
    }

    #[test]
    fn collapses_whitespace() {
        assert_eq!(normalize("  muito \t  espaço\n aqui "), "muito espaco aqui");
    }

    #[test]
    fn empty_and_symbol_only_input() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("?!...@#"), "");
    }

    // ─── tokenize ──────────────────────────────────────────────

    #[test]
    fn tokenize_drops_stopwords_and_short_tokens() {
        assert_eq!(tokenize("O que é a energia?"), vec!["energia"]);
        assert_eq!(tokenize("x y energia cinética"), vec!["energia", "cinetica"]);
    }

    #[test]
    fn tokenize_keeps_digits() {
        assert_eq!(tokenize("lei 42 de newton"), vec!["lei", "42", "newton"]);
    }
}
