use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

/// Role of a column in an invoice table.
///
/// The first thirteen are the canonical fields printed by the issuer's
/// report. `Period` is derived from the issuance date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    NoteNumber,
    IssueDate,
    PayerTaxId,
    PayerName,
    ServiceDescription,
    ServiceValue,
    TaxBase,
    TaxRate,
    OwnTax,
    ThirdPartyTax,
    OperationNature,
    Incidence,
    Status,
    Period,
}

/// How values of a column are coerced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    Date,
    Money,
    Period,
}

impl Field {
    /// The canonical fields in report order.
    pub const CANONICAL: [Field; 13] = [
        Field::NoteNumber,
        Field::IssueDate,
        Field::PayerTaxId,
        Field::PayerName,
        Field::ServiceDescription,
        Field::ServiceValue,
        Field::TaxBase,
        Field::TaxRate,
        Field::OwnTax,
        Field::ThirdPartyTax,
        Field::OperationNature,
        Field::Incidence,
        Field::Status,
    ];

    /// Column label used when a table carries no header row of its own.
    pub fn default_label(self) -> &'static str {
        match self {
            Field::NoteNumber => "n° nota",
            Field::IssueDate => "dt. emissão",
            Field::PayerTaxId => "cpf/cnpj tomador",
            Field::PayerName => "tomador do serviço",
            Field::ServiceDescription => "serviço",
            Field::ServiceValue => "vlr. serviço",
            Field::TaxBase => "base de cálculo",
            Field::TaxRate => "aliq.",
            Field::OwnTax => "iss próprio",
            Field::ThirdPartyTax => "iss retido",
            Field::OperationNature => "nat. da operação",
            Field::Incidence => "incidência",
            Field::Status => "situação",
            Field::Period => "competência",
        }
    }

    pub fn kind(self) -> FieldKind {
        match self {
            Field::IssueDate => FieldKind::Date,
            Field::ServiceValue
            | Field::TaxBase
            | Field::TaxRate
            | Field::OwnTax
            | Field::ThirdPartyTax => FieldKind::Money,
            Field::Period => FieldKind::Period,
            _ => FieldKind::Text,
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.default_label())
    }
}

/// Canonicalize a column label: trim, lower-case, collapse inner whitespace.
pub fn normalize_label(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Map a raw header label to a field role.
///
/// Exact synonyms are tried first, then keyword containment in a fixed
/// priority order. Returns `None` for labels that name nothing we know.
pub fn resolve_header(raw: &str) -> Option<Field> {
    let label = normalize_label(raw);
    if label.is_empty() {
        return None;
    }
    if let Some(field) = SYNONYMS.get(label.as_str()) {
        return Some(*field);
    }
    KEYWORDS
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|kw| label.contains(kw)))
        .map(|(_, field)| *field)
}

/// Exact synonym lookup only, without keyword fallback.
pub fn lookup_synonym(raw: &str) -> Option<Field> {
    SYNONYMS.get(normalize_label(raw).as_str()).copied()
}

/// Coercion kind for a label, used for columns whose role is already taken.
pub fn infer_kind(raw: &str) -> FieldKind {
    let label = normalize_label(raw);
    if DESCRIPTION_TOKENS.iter().any(|t| label.contains(t)) {
        return FieldKind::Text;
    }
    if DATE_TOKENS.iter().any(|t| label.contains(t)) {
        return FieldKind::Date;
    }
    if MONEY_TOKENS.iter().any(|t| label.contains(t)) {
        return FieldKind::Money;
    }
    FieldKind::Text
}

const DATE_TOKENS: [&str; 5] = ["data", "dt", "date", "emissão", "emissao"];
const MONEY_TOKENS: [&str; 8] = [
    "valor", "vlr", "preço", "preco", "total", "base", "iss", "alíquota",
];
const DESCRIPTION_TOKENS: [&str; 3] = ["tomador", "serviço", "servico"];

// Order matters: "iss retido" must be tested before "iss", "situação da nota"
// before "nota", "vlr. serviço" before "serviço".
const KEYWORDS: [(&[&str], Field); 14] = [
    (&["compet", "período", "periodo"], Field::Period),
    (&["situa", "status"], Field::Status),
    (&["nota"], Field::NoteNumber),
    (&["emissão", "emissao", "data", "dt."], Field::IssueDate),
    (&["cpf", "cnpj"], Field::PayerTaxId),
    (&["retido", "retenção", "retencao"], Field::ThirdPartyTax),
    (&["iss"], Field::OwnTax),
    (&["base"], Field::TaxBase),
    (&["aliq", "alíq"], Field::TaxRate),
    (&["tomador", "razão social", "razao social"], Field::PayerName),
    (&["incid"], Field::Incidence),
    (&["natureza", "nat."], Field::OperationNature),
    (&["valor", "vlr", "vrl", "vl."], Field::ServiceValue),
    (&["servi", "discrimina", "descri"], Field::ServiceDescription),
];

static SYNONYMS: LazyLock<HashMap<&'static str, Field>> = LazyLock::new(|| {
    let mut m = HashMap::new();

    for label in [
        "n° nota", "nº nota", "n. nota", "no nota", "n° da nota", "nº da nota",
        "número da nota", "numero da nota", "nota", "nota fiscal", "número", "numero",
    ] {
        m.insert(label, Field::NoteNumber);
    }
    for label in [
        "dt,. emissão", "dt. emissão", "dt emissão", "dt. emissao", "data emissão",
        "data de emissão", "data emissao", "data de emissao", "emissão", "emissao", "data",
    ] {
        m.insert(label, Field::IssueDate);
    }
    for label in [
        "cpf/cnpj tomador", "cpf/cnpj do tomador", "cpf/cnpj", "cnpj tomador", "cnpj",
    ] {
        m.insert(label, Field::PayerTaxId);
    }
    for label in [
        "tomador do serviço", "tomador do servico", "tomador", "nome do tomador",
        "razão social",
    ] {
        m.insert(label, Field::PayerName);
    }
    for label in [
        "serviço", "servico", "descrição do serviço", "descrição", "discriminação",
    ] {
        m.insert(label, Field::ServiceDescription);
    }
    for label in [
        "vrl. serviço", "vlr. serviço", "vl. serviço", "vlr serviço", "valor do serviço",
        "valor serviço", "valor servico", "valor",
    ] {
        m.insert(label, Field::ServiceValue);
    }
    for label in ["base de cálculo", "base de calculo", "base cálculo", "bc"] {
        m.insert(label, Field::TaxBase);
    }
    for label in ["aliq.", "alíq.", "aliq", "aliquota", "alíquota"] {
        m.insert(label, Field::TaxRate);
    }
    for label in ["iss próprio", "iss proprio", "iss"] {
        m.insert(label, Field::OwnTax);
    }
    for label in ["iss retido", "iss ret.", "iss retido por terceiro", "retido"] {
        m.insert(label, Field::ThirdPartyTax);
    }
    for label in [
        "nat. da operação", "nat. da operacao", "nat. operação", "natureza da operação",
        "natureza",
    ] {
        m.insert(label, Field::OperationNature);
    }
    for label in ["incidência", "incidencia", "local de incidência"] {
        m.insert(label, Field::Incidence);
    }
    for label in ["situação", "situacao", "status"] {
        m.insert(label, Field::Status);
    }
    for label in ["competência", "competencia", "período", "periodo"] {
        m.insert(label, Field::Period);
    }

    m
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_labels_resolve_to_themselves() {
        for field in Field::CANONICAL {
            assert_eq!(resolve_header(field.default_label()), Some(field), "{field:?}");
        }
        assert_eq!(resolve_header("competência"), Some(Field::Period));
    }

    #[test]
    fn report_header_spellings() {
        assert_eq!(resolve_header("  N° Nota "), Some(Field::NoteNumber));
        assert_eq!(resolve_header("Dt,. Emissão"), Some(Field::IssueDate));
        assert_eq!(resolve_header("Vrl. Serviço"), Some(Field::ServiceValue));
        assert_eq!(resolve_header("Base de Cálculo"), Some(Field::TaxBase));
        assert_eq!(resolve_header("ISS Retido"), Some(Field::ThirdPartyTax));
    }

    #[test]
    fn keyword_fallback_priority() {
        assert_eq!(resolve_header("Valor ISS Retido (R$)"), Some(Field::ThirdPartyTax));
        assert_eq!(resolve_header("Valor do ISS"), Some(Field::OwnTax));
        assert_eq!(resolve_header("Nome/Razão Social do Tomador"), Some(Field::PayerName));
        assert_eq!(resolve_header("Situação da Nota"), Some(Field::Status));
        assert_eq!(resolve_header("Observações"), None);
        assert_eq!(resolve_header(""), None);
    }

    #[test]
    fn infer_kind_excludes_description_columns() {
        assert_eq!(infer_kind("Data de Cancelamento"), FieldKind::Date);
        assert_eq!(infer_kind("Valor Deduções"), FieldKind::Money);
        assert_eq!(infer_kind("Tomador do Serviço (Total)"), FieldKind::Text);
        assert_eq!(infer_kind("Observações"), FieldKind::Text);
    }

    #[test]
    fn normalize_label_collapses_whitespace() {
        assert_eq!(normalize_label("  Base   de\nCálculo "), "base de cálculo");
    }
}
