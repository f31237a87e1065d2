//! Query language detection
//!
//! Detection is intentionally lightweight: score lowercase tokens against
//! per-language indicator lists and take the best. No external calls, total
//! over any input.

use serde::Deserialize;
use serde::Serialize;

/// Languages the answer layer can respond in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    English,
    Turkish,
    Italian,
}

const TURKISH_INDICATORS: &[&str] = &[
    "nedir",
    "nelerdir",
    "nasıl",
    "ne",
    "hangi",
    "için",
    "ile",
    "bir",
    "bu",
    "şu",
    "mı",
    "mi",
    "mu",
    "mü",
    "da",
    "de",
    "ta",
    "te",
    "la",
    "le",
    "ın",
    "in",
    "un",
    "ün",
    "hibe",
    "başvuru",
    "proje",
    "belgeler",
    "kriterler",
    "süreç",
];

const ENGLISH_INDICATORS: &[&str] = &[
    "what",
    "how",
    "which",
    "where",
    "when",
    "why",
    "is",
    "are",
    "the",
    "and",
    "or",
    "in",
    "on",
    "at",
    "for",
    "with",
    "by",
    "from",
    "to",
    "of",
    "grant",
    "application",
    "project",
    "documents",
    "criteria",
    "process",
    "requirements",
    "eligibility",
    "personnel",
    "costs",
    "budget",
    "funding",
    "can",
    "should",
    "must",
    "will",
    "this",
    "that",
    "these",
    "those",
    "do",
    "does",
    "did",
    "have",
    "has",
    "had",
];

const ITALIAN_INDICATORS: &[&str] = &[
    "che",
    "cosa",
    "come",
    "quale",
    "dove",
    "quando",
    "perché",
    "è",
    "sono",
    "il",
    "la",
    "di",
    "a",
    "da",
    "in",
    "con",
    "su",
    "per",
    "tra",
    "fra",
    "sovvenzioni",
    "domanda",
    "progetto",
    "documenti",
    "criteri",
    "processo",
];

impl Language {
    /// Detect the language of a query from its text alone.
    ///
    /// Exact token matches against the indicator lists; ties resolve
    /// Turkish over English over Italian, so an input matching nothing
    /// detects as Turkish.
    #[must_use]
    pub fn detect(text: &str) -> Self {
        let lowered = text.to_lowercase();
        let words: Vec<&str> = lowered.split_whitespace().collect();

        let tr_score = words
            .iter()
            .filter(|word| TURKISH_INDICATORS.contains(*word))
            .count();
        let en_score = words
            .iter()
            .filter(|word| ENGLISH_INDICATORS.contains(*word))
            .count();
        let it_score = words
            .iter()
            .filter(|word| ITALIAN_INDICATORS.contains(*word))
            .count();

        if tr_score >= en_score && tr_score >= it_score {
            Language::Turkish
        } else if en_score >= it_score {
            Language::English
        } else {
            Language::Italian
        }
    }

    /// The canonical answer used verbatim when no candidates exist.
    #[must_use]
    pub fn insufficient_information(&self) -> &'static str {
        match self {
            Language::English => "Insufficient information found to answer the question.",
            Language::Turkish => "Yanıtlamak için yeterli bilgi bulunamadı.",
            Language::Italian => {
                "Non sono state trovate informazioni sufficienti per rispondere alla domanda."
            }
        }
    }

    /// Heading of the citation footer.
    #[must_use]
    pub fn sources_heading(&self) -> &'static str {
        match self {
            Language::English => "Sources",
            Language::Turkish => "Kaynaklar",
            Language::Italian => "Fonti",
        }
    }

    /// The word for "page" used in citation entries and document headers.
    #[must_use]
    pub fn page_word(&self) -> &'static str {
        match self {
            Language::English => "Page",
            Language::Turkish => "Sayfa",
            Language::Italian => "Pagina",
        }
    }

    /// The word for "document" used in context-window headers.
    #[must_use]
    pub fn document_word(&self) -> &'static str {
        match self {
            Language::English => "Document",
            Language::Turkish => "Belge",
            Language::Italian => "Documento",
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::English => "english",
            Language::Turkish => "turkish",
            Language::Italian => "italian",
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
