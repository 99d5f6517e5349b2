//! DOCX template rendering for technical proposals.
//!
//! The template is an ordinary Word document whose text contains
//! `{{ KEY }}` placeholders. Each proposal section is exposed under
//! `normalize_key(heading)`. Word tends to split a placeholder across several
//! runs, so runs of a paragraph that mentions `{{` are merged first.

use std::collections::HashMap;
use std::io::{Cursor, Read, Write};
use std::sync::OnceLock;

use regex::{Captures, Regex};
use thiserror::Error;
use unicode_normalization::UnicodeNormalization;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::extract::docx::{escape_xml, DOCUMENT_XML};
use crate::parsing::Sections;

pub const DOCX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("template is not a valid DOCX archive: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("I/O error while rendering: {0}")]
    Io(#[from] std::io::Error),

    #[error("template has no word/document.xml")]
    MissingDocument,
}

fn non_word_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\W+").expect("static regex"))
}

fn paragraph_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)<w:p(?:\s[^>]*[^/])?>.*?</w:p>").expect("static regex"))
}

fn text_run_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)<w:t(?:\s[^>]*)?>(.*?)</w:t>").expect("static regex"))
}

fn placeholder_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{\{\s*([A-Za-z0-9_]+)\s*\}\}").expect("static regex"))
}

/// Template key for a section heading: accents folded, non-ASCII dropped,
/// runs of non-word characters collapsed to `_`, outer `_` trimmed, uppercased.
pub fn normalize_key(heading: &str) -> String {
    let ascii: String = heading.nfkd().filter(char::is_ascii).collect();
    non_word_regex()
        .replace_all(&ascii, "_")
        .trim_matches('_')
        .to_uppercase()
}

/// Renders `sections` into the DOCX `template` and returns the new archive bytes.
///
/// Placeholders are substituted in the main document, headers and footers.
/// A placeholder with no matching section renders as an empty string.
pub fn render_template(template: &[u8], sections: &Sections) -> Result<Vec<u8>, RenderError> {
    let values: HashMap<String, String> = sections
        .iter()
        .map(|(heading, body)| {
            let body = match body {
                serde_json::Value::String(s) => s.clone(),
                serde_json::Value::Null => String::new(),
                other => other.to_string(),
            };
            (normalize_key(heading), body)
        })
        .collect();

    let mut archive = ZipArchive::new(Cursor::new(template))?;
    if archive.index_for_name(DOCUMENT_XML).is_none() {
        return Err(RenderError::MissingDocument);
    }

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for i in 0..archive.len() {
        let name = archive.by_index_raw(i)?.name().to_string();
        if is_templated_part(&name) {
            let mut xml = String::new();
            archive.by_index(i)?.read_to_string(&mut xml)?;
            writer.start_file(name, options)?;
            writer.write_all(render_xml(&xml, &values).as_bytes())?;
        } else {
            writer.raw_copy_file(archive.by_index_raw(i)?)?;
        }
    }

    Ok(writer.finish()?.into_inner())
}

fn is_templated_part(name: &str) -> bool {
    if name == DOCUMENT_XML {
        return true;
    }
    name.strip_prefix("word/")
        .filter(|rest| !rest.contains('/'))
        .is_some_and(|rest| {
            (rest.starts_with("header") || rest.starts_with("footer")) && rest.ends_with(".xml")
        })
}

fn render_xml(xml: &str, values: &HashMap<String, String>) -> String {
    let merged = paragraph_regex().replace_all(xml, |caps: &Captures| merge_runs(&caps[0]));
    placeholder_regex()
        .replace_all(&merged, |caps: &Captures| {
            values
                .get(&caps[1])
                .map(|value| xml_text(value))
                .unwrap_or_default()
        })
        .into_owned()
}

/// Moves all run text of a placeholder-bearing paragraph into its first `<w:t>`.
fn merge_runs(paragraph: &str) -> String {
    let runs: Vec<_> = text_run_regex().captures_iter(paragraph).collect();
    let joined: String = runs.iter().map(|c| &c[1]).collect();
    if !joined.contains("{{") {
        return paragraph.to_string();
    }

    let mut first = true;
    text_run_regex()
        .replace_all(paragraph, |_: &Captures| {
            if std::mem::take(&mut first) {
                format!(r#"<w:t xml:space="preserve">{joined}</w:t>"#)
            } else {
                "<w:t></w:t>".to_string()
            }
        })
        .into_owned()
}

/// Escapes a value for a `<w:t>` body; newlines become line breaks.
fn xml_text(value: &str) -> String {
    escape_xml(value).replace('\n', r#"</w:t><w:br/><w:t xml:space="preserve">"#)
}

#[cfg(test)]
mod tests {
    use serde_json::Value;

    use super::*;
    use crate::extract::docx::{self, tests::document_xml, tests::docx_bytes};

    fn sections(pairs: &[(&str, &str)]) -> Sections {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
            .collect()
    }

    fn render_to_text(template_body: &str, sections: &Sections) -> String {
        let template = docx_bytes(&document_xml(template_body));
        let rendered = render_template(&template, sections).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.docx");
        std::fs::write(&path, rendered).unwrap();
        docx::extract_text(&path).unwrap()
    }

    #[test]
    fn test_normalize_key() {
        assert_eq!(normalize_key("ESCOPO DE SERVIÇOS"), "ESCOPO_DE_SERVICOS");
        assert_eq!(normalize_key("REUNIÃO DE KICK-OFF"), "REUNIAO_DE_KICK_OFF");
        assert_eq!(normalize_key("Projeto lógico (LLD):"), "PROJETO_LOGICO_LLD");
        assert_eq!(normalize_key("  ### "), "");
    }

    #[test]
    fn test_render_replaces_placeholders() {
        let body = concat!(
            "<w:p><w:r><w:t>Cliente: {{ CLIENTE }}</w:t></w:r></w:p>",
            "<w:p><w:r><w:t>{{ESCOPO_DE_SERVICOS}}</w:t></w:r></w:p>",
        );
        let text = render_to_text(
            body,
            &sections(&[("CLIENTE", "ACME & Filhos"), ("ESCOPO DE SERVIÇOS", "Kick-off")]),
        );
        assert_eq!(text, "Cliente: ACME & Filhos\nKick-off");
    }

    #[test]
    fn test_render_merges_split_runs() {
        let body = concat!(
            "<w:p><w:r><w:t>{{ O_</w:t></w:r>",
            r#"<w:r><w:rPr><w:b/></w:rPr><w:t xml:space="preserve">PROJETO }}</w:t></w:r></w:p>"#,
        );
        let text = render_to_text(body, &sections(&[("O PROJETO", "Rede sem fio")]));
        assert_eq!(text, "Rede sem fio");
    }

    #[test]
    fn test_render_multiline_value_and_unknown_key() {
        let body = concat!(
            "<w:p><w:r><w:t>{{ PREMISSAS }}</w:t></w:r></w:p>",
            "<w:p><w:r><w:t>[{{ INEXISTENTE }}]</w:t></w:r></w:p>",
        );
        let text = render_to_text(body, &sections(&[("PREMISSAS", "- acesso\n- energia")]));
        assert_eq!(text, "- acesso\n- energia\n[]");
    }

    #[test]
    fn test_render_rejects_non_docx() {
        let err = render_template(b"plain text", &Sections::new()).unwrap_err();
        assert!(matches!(err, RenderError::Archive(_)));
    }

    #[test]
    fn test_templated_parts() {
        assert!(is_templated_part("word/document.xml"));
        assert!(is_templated_part("word/header1.xml"));
        assert!(is_templated_part("word/footer2.xml"));
        assert!(!is_templated_part("word/_rels/header1.xml.rels"));
        assert!(!is_templated_part("word/styles.xml"));
    }
}
