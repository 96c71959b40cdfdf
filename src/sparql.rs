//! SPARQL plumbing shared by the mapping stores and the cache backends.
//!
//! Both sides speak SPARQL 1.1: the mapping stores run SELECTs against an
//! embedded oxigraph store, the cache runs SELECT/UPDATE against either an
//! embedded store or a remote endpoint. Results are flattened into
//! [`Bindings`] rows of lexical values so callers never touch RDF terms.

use std::collections::HashMap;

use oxigraph::model::Term;
use oxigraph::sparql::QueryResults;
use serde::Deserialize;

/// One solution row: variable name → lexical value.
pub type Bindings = HashMap<String, String>;

pub const RDFS_NS: &str = "http://www.w3.org/2000/01/rdf-schema#";
pub const XSD_NS: &str = "http://www.w3.org/2001/XMLSchema#";

/// Escape `value` for use inside a double-quoted SPARQL string literal.
pub fn escape_literal(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    for ch in value.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{08}' => out.push_str("\\b"),
            '\u{0C}' => out.push_str("\\f"),
            other => out.push(other),
        }
    }
    out
}

/// Render `value` as a quoted SPARQL string literal.
pub fn literal(value: &str) -> String {
    format!("\"{}\"", escape_literal(value))
}

/// Lexical form of a term: literal value or bare IRI.
fn term_value(term: &Term) -> String {
    match term {
        Term::Literal(lit) => lit.value().to_string(),
        Term::NamedNode(node) => node.as_str().to_string(),
        Term::BlankNode(node) => node.as_str().to_string(),
        #[allow(unreachable_patterns)]
        other => other.to_string(),
    }
}

/// Flatten oxigraph SELECT results into binding rows.
pub(crate) fn collect_solutions(results: QueryResults) -> Result<Vec<Bindings>, String> {
    match results {
        QueryResults::Solutions(solutions) => {
            let mut rows = Vec::new();
            for solution in solutions {
                let solution = solution.map_err(|e| format!("solution error: {e}"))?;
                let row = solution
                    .iter()
                    .map(|(var, term)| (var.as_str().to_string(), term_value(term)))
                    .collect();
                rows.push(row);
            }
            Ok(rows)
        }
        QueryResults::Boolean(_) => Err("expected SELECT solutions, got a boolean".into()),
        QueryResults::Graph(_) => Err("expected SELECT solutions, got a graph".into()),
    }
}

#[derive(Debug, Deserialize)]
struct ResultsDocument {
    results: ResultsBody,
}

#[derive(Debug, Deserialize)]
struct ResultsBody {
    bindings: Vec<HashMap<String, JsonTerm>>,
}

#[derive(Debug, Deserialize)]
struct JsonTerm {
    value: String,
}

/// Parse an `application/sparql-results+json` SELECT document.
pub fn parse_results_json(body: &str) -> Result<Vec<Bindings>, String> {
    let doc: ResultsDocument =
        serde_json::from_str(body).map_err(|e| format!("invalid SPARQL JSON results: {e}"))?;
    Ok(doc
        .results
        .bindings
        .into_iter()
        .map(|row| row.into_iter().map(|(k, v)| (k, v.value)).collect())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_quotes_backslashes_and_newlines() {
        assert_eq!(
            escape_literal("say \"hi\"\\\nbye"),
            "say \\\"hi\\\"\\\\\\nbye"
        );
        assert_eq!(literal("plain"), "\"plain\"");
    }

    #[test]
    fn injection_attempt_stays_inside_literal() {
        let hostile = "user\" ; ex:mapsToField ?x . } #";
        let lit = literal(hostile);
        // Only the outer quotes are unescaped.
        let unescaped_quotes = lit
            .char_indices()
            .filter(|&(i, c)| c == '"' && (i == 0 || !lit[..i].ends_with('\\')))
            .count();
        assert_eq!(unescaped_quotes, 2);
    }

    #[test]
    fn parses_results_json() {
        let body = r#"{
            "head": {"vars": ["a", "b"]},
            "results": {"bindings": [
                {"a": {"type": "literal", "value": "x"},
                 "b": {"type": "uri", "value": "urn:y"}},
                {"a": {"type": "literal", "value": "z"}}
            ]}
        }"#;
        let rows = parse_results_json(body).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["b"], "urn:y");
        assert!(!rows[1].contains_key("b"));
    }

    #[test]
    fn rejects_non_results_json() {
        assert!(parse_results_json("<html>oops</html>").is_err());
    }

    #[test]
    fn collects_oxigraph_solutions() {
        let store = oxigraph::store::Store::new().unwrap();
        store
            .update(r#"INSERT DATA { <urn:a> <urn:p> "v\"q" }"#)
            .unwrap();
        let results = store.query("SELECT ?s ?o WHERE { ?s <urn:p> ?o }").unwrap();
        let rows = collect_solutions(results).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["s"], "urn:a");
        assert_eq!(rows[0]["o"], "v\"q");
    }
}
