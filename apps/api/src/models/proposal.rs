use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;

/// `dados_json` lives in a `json` column and is selected as `dados_json::text`
/// so key order survives; see `proposals::repo`.
#[derive(Debug, Clone, FromRow)]
pub struct PropostaRecord {
    pub id: i32,
    pub rfp_id: i32,
    pub dados_json: Option<String>,
    pub arquivo_pdf: Option<String>,
    pub arquivo_docx: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Proposta {
    pub id: i32,
    pub rfp_id: i32,
    pub dados_json: Option<Value>,
    pub arquivo_pdf: Option<String>,
    pub arquivo_docx: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<PropostaRecord> for Proposta {
    type Error = serde_json::Error;

    fn try_from(record: PropostaRecord) -> Result<Self, Self::Error> {
        let dados_json = record
            .dados_json
            .as_deref()
            .map(serde_json::from_str)
            .transpose()?;
        Ok(Proposta {
            id: record.id,
            rfp_id: record.rfp_id,
            dados_json,
            arquivo_pdf: record.arquivo_pdf,
            arquivo_docx: record.arquivo_docx,
            created_at: record.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_conversion_keeps_section_order() {
        let record = PropostaRecord {
            id: 1,
            rfp_id: 7,
            dados_json: Some(r#"{"CLIENTE":"ACME","BOM":"tabela","O PROJETO":"wifi"}"#.to_string()),
            arquivo_pdf: None,
            arquivo_docx: None,
            created_at: Utc::now(),
        };
        let proposta = Proposta::try_from(record).unwrap();
        let keys: Vec<_> = proposta
            .dados_json
            .as_ref()
            .and_then(Value::as_object)
            .unwrap()
            .keys()
            .cloned()
            .collect();
        assert_eq!(keys, vec!["CLIENTE", "BOM", "O PROJETO"]);
    }

    #[test]
    fn test_record_conversion_null_data() {
        let record = PropostaRecord {
            id: 1,
            rfp_id: 7,
            dados_json: None,
            arquivo_pdf: Some("uploaded_propostas/p.pdf".to_string()),
            arquivo_docx: None,
            created_at: Utc::now(),
        };
        let proposta = Proposta::try_from(record).unwrap();
        assert!(proposta.dados_json.is_none());
        assert_eq!(proposta.arquivo_pdf.as_deref(), Some("uploaded_propostas/p.pdf"));
    }
}
