// src/analyze/entities.rs
//! Capitalization-based proper-noun detection for headlines.
//!
//! Not a linguistic NER: a token counts as a candidate entity when, after stripping
//! everything but letters and digits, it is longer than 3 characters, starts with an
//! upper-case letter and is not a common capitalized word (days, generic government or
//! place words, newsroom boilerplate). False positives and negatives are expected.

use once_cell::sync::Lazy;
use std::collections::HashSet;

/// Upper-cased words that are capitalized in headlines but say nothing about the event.
static STOP_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        // days
        "LUNES", "MARTES", "MIÉRCOLES", "MIERCOLES", "JUEVES", "VIERNES", "SÁBADO", "SABADO",
        "DOMINGO", "MONDAY", "TUESDAY", "WEDNESDAY", "THURSDAY", "FRIDAY", "SATURDAY", "SUNDAY",
        // government / place
        "GOBIERNO", "PRESIDENTE", "PRESIDENTA", "MINISTRO", "MINISTRA", "CONGRESO", "SENADO",
        "ESTADO", "PAÍS", "PAIS", "REGIÓN", "REGION", "CIUDAD", "NACIONAL", "MUNDO", "CHILE",
        "SANTIAGO", "GOVERNMENT", "PRESIDENT", "MINISTER", "CONGRESS", "SENATE", "STATE",
        "COUNTRY", "CITY", "NATIONAL", "WORLD",
        // newsroom
        "ÚLTIMO", "ULTIMO", "ÚLTIMA", "ULTIMA", "HORA", "VIDEO", "VIDEOS", "FOTOS", "VIVO",
        "MINUTO", "OPINIÓN", "OPINION", "ANÁLISIS", "ANALISIS", "ENTREVISTA", "COLUMNA",
        "EDITORIAL", "URGENTE", "BREAKING", "NEWS", "LIVE", "UPDATE", "UPDATES", "EXCLUSIVE",
        "WATCH", "PHOTOS", "ANALYSIS", "REPORT", "ESTO", "ESTE", "ESTA", "ASÍ", "CÓMO", "COMO",
        "QUÉ", "CUÁNDO", "DÓNDE", "TRAS", "PARA", "DESDE", "THIS", "THAT", "WHAT", "WHEN",
        "WHERE", "AFTER", "WITH", "FROM",
    ]
    .into_iter()
    .collect()
});

/// Extract lower-cased candidate entities from `headline`.
pub fn extract_entities(headline: &str) -> HashSet<String> {
    headline
        .split_whitespace()
        .filter_map(|raw| {
            let token: String = raw.chars().filter(|c| c.is_alphanumeric()).collect();
            let first = token.chars().next()?;
            if token.chars().count() <= 3 || !first.is_uppercase() {
                return None;
            }
            if STOP_WORDS.contains(token.to_uppercase().as_str()) {
                return None;
            }
            Some(token.to_lowercase())
        })
        .collect()
}

/// True if the two entity sets share at least one token.
pub fn shares_entity(a: &HashSet<String>, b: &HashSet<String>) -> bool {
    let (small, large) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    small.iter().any(|e| large.contains(e))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(items: &[&str]) -> HashSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn keeps_capitalized_proper_nouns() {
        let e = extract_entities("Boric y Kast debaten en Valparaíso");
        assert_eq!(e, set(&["boric", "kast", "valparaíso"]));
    }

    #[test]
    fn strips_punctuation_before_checks() {
        let e = extract_entities("\"Codelco\", tras críticas de (Hacienda):");
        assert_eq!(e, set(&["codelco", "hacienda"]));
    }

    #[test]
    fn rejects_stop_words_days_and_short_tokens() {
        let e = extract_entities("Gobierno anuncia el Lunes plan para la ONU y Chile");
        assert!(e.is_empty(), "got {e:?}");
    }

    #[test]
    fn stop_list_matches_accented_forms() {
        let e = extract_entities("Miércoles: Último minuto sobre Codelco");
        assert_eq!(e, set(&["codelco"]));
    }

    #[test]
    fn rejects_lowercase_and_digit_led_tokens() {
        let e = extract_entities("reforma 2025Presupuesto aprobada");
        assert!(e.is_empty());
    }

    #[test]
    fn duplicates_collapse() {
        let e = extract_entities("Codelco, Codelco y CODELCO");
        assert_eq!(e, set(&["codelco"]));
    }

    #[test]
    fn overlap_check() {
        assert!(shares_entity(&set(&["a", "b"]), &set(&["c", "b"])));
        assert!(!shares_entity(&set(&["a"]), &set(&[])));
    }
}
