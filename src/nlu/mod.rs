//! # NLU — Normalização e Classificação de Intenção
//!
//! A camada de linguagem é puramente simbólica:
//!
//! | Módulo | Responsabilidade |
//! |--------|-----------------|
//! | [`normalizer`] | chave canônica (`normalize`) e tokenização com stopwords |
//! | [`intent`] | tabela ordenada de regras → [`Intent`](intent::Intent) |
//!
//! ```text
//! "E então, como funciona a energia?"
//!   ├── normalize → "e entao como funciona a energia"
//!   └── classify  → Intent { kind: Como, subject: "energia" }
//! ```

/// Normalização de texto e tokenização.
pub mod normalizer;

/// Classificador de intenção por regras.
pub mod intent;

pub use intent::{Intent, IntentClassifier, IntentKind};
