//! Field-name normalization for marker and allow-list comparison.
//!
//! Keys arrive in many spellings (`CPF_Cliente`, `cpfCliente`, `CPF Cliente`,
//! `NÚMERO`). Comparison happens on a canonical form: compatibility-decomposed,
//! combining marks stripped, lowercased, and reduced to `[a-z0-9]`.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Current normalization version. Changes when rules are modified.
pub const NORMALIZATION_VERSION: &str = "1.0.0";

/// Normalize a raw field name.
///
/// Total and idempotent: `normalize_field_name(normalize_field_name(x))`
/// equals `normalize_field_name(x)`, and empty input yields empty output.
pub fn normalize_field_name(raw: &str) -> String {
    raw.nfkd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        .collect()
}

/// A list of normalized markers matched by substring containment.
///
/// `"cpfcliente"` matches marker `"cpf"`. Markers that normalize to the empty
/// string are discarded, since they would match every name.
#[derive(Debug, Clone, Default)]
pub struct MarkerSet {
    markers: Vec<String>,
}

impl MarkerSet {
    /// Build a marker set from raw marker spellings.
    pub fn new<I, S>(raw: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut markers: Vec<String> = raw
            .into_iter()
            .map(|m| normalize_field_name(m.as_ref()))
            .filter(|m| !m.is_empty())
            .collect();
        markers.sort();
        markers.dedup();
        Self { markers }
    }

    /// Whether an already-normalized name contains any marker.
    pub fn matches_normalized(&self, normalized: &str) -> bool {
        !normalized.is_empty() && self.markers.iter().any(|m| normalized.contains(m.as_str()))
    }

    /// Normalize `raw` and test it against the markers.
    pub fn matches(&self, raw: &str) -> bool {
        self.matches_normalized(&normalize_field_name(raw))
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lowercase_and_strip_punctuation() {
        assert_eq!(normalize_field_name("CPF_Cliente"), "cpfcliente");
        assert_eq!(normalize_field_name("cpf-cliente"), "cpfcliente");
        assert_eq!(normalize_field_name("URL Servico"), "urlservico");
    }

    #[test]
    fn test_diacritics_removed() {
        assert_eq!(normalize_field_name("Número"), "numero");
        assert_eq!(normalize_field_name("DESCRIÇÃO"), "descricao");
        assert_eq!(normalize_field_name("endereço_cobrança"), "enderecocobranca");
    }

    #[test]
    fn test_compatibility_forms() {
        // Fullwidth digits and ligatures decompose to ASCII
        assert_eq!(normalize_field_name("ｃｐｆ１"), "cpf1");
        assert_eq!(normalize_field_name("ﬁle"), "file");
    }

    #[test]
    fn test_empty_and_symbol_only() {
        assert_eq!(normalize_field_name(""), "");
        assert_eq!(normalize_field_name("__--  "), "");
        assert_eq!(normalize_field_name("日本"), "");
    }

    #[test]
    fn test_idempotent() {
        for raw in ["CPF_Cliente", "Ação", "a.b[1]", "ｃｐｆ"] {
            let once = normalize_field_name(raw);
            assert_eq!(normalize_field_name(&once), once);
        }
    }

    #[test]
    fn test_marker_substring_containment() {
        let markers = MarkerSet::new(["CPF", "senha"]);
        assert!(markers.matches("cpfCliente"));
        assert!(markers.matches("NR_CPF"));
        assert!(markers.matches("Senha_Acesso"));
        assert!(!markers.matches("nome"));
        assert!(!markers.matches(""));
    }

    #[test]
    fn test_empty_markers_ignored() {
        let markers = MarkerSet::new(["", "--", "url"]);
        assert_eq!(markers.len(), 1);
        assert!(!markers.matches("nome"));
        assert!(markers.matches("url_retorno"));
    }
}
