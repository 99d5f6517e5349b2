use crate::models::vendor::VendorRow;

/// BoM generation prompt. Not stored in `ai_prompts`; it lives with the pipeline.
pub fn bom_prompt(resumo_ia: &str, vendor: &VendorRow) -> String {
    format!(
        r#"
Você é um especialista em pré-vendas de tecnologia. Crie um BoM (Bill of Materials) detalhado para a RFP abaixo, considerando as melhores práticas do fabricante selecionado, equipamentos atuais, módulos e licenças recomendadas.

Resumo da RFP:
{resumo_ia}

Fabricante Selecionado:
Nome: {nome}
Tecnologias: {tecnologias}
Produtos: {produtos}
Certificações: {certificacoes}
Requisitos Atendidos: {requisitos}

Responda APENAS em JSON, lista de itens no formato:
[
  {{"descricao": <string>, "modelo": <string>, "part_number": <string>, "quantidade": <int>}},
  ...
]
Inclua módulos, licenças e equipamentos essenciais. Não adicione comentários fora do JSON.
"#,
        nome = vendor.nome,
        tecnologias = vendor.tecnologias.as_deref().unwrap_or_default(),
        produtos = vendor.produtos.as_deref().unwrap_or_default(),
        certificacoes = vendor.certificacoes.as_deref().unwrap_or_default(),
        requisitos = vendor.requisitos_atendidos.as_deref().unwrap_or_default(),
    )
}
