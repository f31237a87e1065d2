//! Prompt builders for answer synthesis

use crate::pipeline::language::Language;

/// Build the synthesis prompt in the query's language.
///
/// `documents` is the pre-assembled context window; `history` is an already
/// formatted recent-turns block (may be empty).
pub fn build_answer_prompt(
    question: &str,
    documents: &str,
    history: &str,
    language: Language,
) -> String {
    match language {
        Language::English => build_english_prompt(question, documents, history),
        Language::Turkish => build_turkish_prompt(question, documents, history),
        Language::Italian => build_italian_prompt(question, documents, history),
    }
}

fn build_english_prompt(question: &str, documents: &str, history: &str) -> String {
    let history_block = if history.is_empty() {
        String::new()
    } else {
        format!("Recent conversation:\n{history}\n\n")
    };
    format!(
        r#"You are given the following information from the provided documents and a question.
Based on this information, answer the question accurately and in detail.

Given Documents:
{documents}

{history_block}Question: {question}

When answering:
1. Use only the information obtained from the given documents
2. Specify which document each piece of information comes from
3. If the answer to the question is not in the documents, clearly state this
4. Respond in English
5. Provide a detailed and clear explanation

Answer:"#
    )
}

fn build_turkish_prompt(question: &str, documents: &str, history: &str) -> String {
    let history_block = if history.is_empty() {
        String::new()
    } else {
        format!("Son konuşma:\n{history}\n\n")
    };
    format!(
        r#"Sana verilen belgelerden alınan aşağıdaki bilgiler ve bir soru veriliyor.
Bu bilgilere dayanarak soruyu doğru ve detaylı bir şekilde yanıtla.

Verilen Belgeler:
{documents}

{history_block}Soru: {question}

Yanıtlarken:
1. Sadece verilen belgelerden elde edilen bilgileri kullan
2. Her bilgi için hangi belgeden geldiğini belirt
3. Eğer sorunun cevabı belgelerde yoksa, bu durumu açıkça belirt
4. Yanıtını Türkçe ver
5. Detaylı ve anlaşılır bir açıklama yap

Yanıt:"#
    )
}

fn build_italian_prompt(question: &str, documents: &str, history: &str) -> String {
    let history_block = if history.is_empty() {
        String::new()
    } else {
        format!("Conversazione recente:\n{history}\n\n")
    };
    format!(
        r#"Ti vengono fornite le seguenti informazioni tratte dai documenti e una domanda.
Sulla base di queste informazioni, rispondi alla domanda in modo accurato e dettagliato.

Documenti Forniti:
{documents}

{history_block}Domanda: {question}

Quando rispondi:
1. Usa solo le informazioni ottenute dai documenti forniti
2. Specifica da quale documento proviene ogni informazione
3. Se la risposta alla domanda non è nei documenti, dichiaralo chiaramente
4. Rispondi in italiano
5. Fornisci una spiegazione dettagliata e chiara

Risposta:"#
    )
}
