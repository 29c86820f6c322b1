//! Expected source columns and the spellings seen across yearly exports.
//!
//! Headers are matched after folding: diacritics removed, lower-cased, and
//! everything that is not a letter or digit dropped. `Descrição da despesa`
//! and `descricao_da_despesa` therefore resolve to the same field.

use std::collections::BTreeMap;

use serde::Serialize;
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Year,
    Entity,
    Creditor,
    CommitmentNumber,
    FundSource,
    CategoryCode,
    NatureCode,
    Description,
    CommitmentDate,
    Gross,
    Canceled,
    Settled,
    CategoryDescription,
    NatureDescription,
}

/// What to do when a file has no column for a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultFill {
    EmptyText,
    Zero,
    Absent,
}

pub const TRANSACTION_FIELDS: [Field; 12] = [
    Field::Year,
    Field::Entity,
    Field::Creditor,
    Field::CommitmentNumber,
    Field::FundSource,
    Field::CategoryCode,
    Field::NatureCode,
    Field::Description,
    Field::CommitmentDate,
    Field::Gross,
    Field::Canceled,
    Field::Settled,
];

pub const REFERENCE_FIELDS: [Field; 6] = [
    Field::Year,
    Field::Entity,
    Field::CategoryCode,
    Field::NatureCode,
    Field::CategoryDescription,
    Field::NatureDescription,
];

pub const MONETARY_FIELDS: [Field; 3] = [Field::Gross, Field::Canceled, Field::Settled];

impl Field {
    /// Header names, first one canonical. Export writes the canonical name.
    pub fn aliases(self) -> &'static [&'static str] {
        match self {
            Self::Year => &["anoEmpenho", "Ano", "exercicio", "anoExercicio"],
            Self::Entity => &["nomeEntidade", "entidade"],
            Self::Creditor => &["nomeCredor", "credor"],
            Self::CommitmentNumber => &["numeroEmpenho", "numEmpenho", "empenho"],
            Self::FundSource => &["numRecurso", "fonteRecurso", "recurso", "fonte"],
            Self::CategoryCode => &["numDespesa", "codDespesa", "categoriaDespesa", "despesa"],
            Self::NatureCode => &["numNaturezaEmp", "naturezaDespesa", "numNatureza", "natureza"],
            Self::Description => &["especificacao", "historico", "descricaoEmpenho"],
            Self::CommitmentDate => &["data", "dataEmpenho"],
            Self::Gross => &["valorEmpenhadoBruto", "valorEmpenhado"],
            Self::Canceled => &["valorEmpenhadoAnulado", "valorAnulado"],
            Self::Settled => &["valorBaixadoBruto", "saldoBaixado", "valorBaixado"],
            Self::CategoryDescription => &["Descrição da despesa", "descricaoDespesa"],
            Self::NatureDescription => &["Descrição da natureza", "descricaoNatureza"],
        }
    }

    pub fn canonical(self) -> &'static str {
        self.aliases()[0]
    }

    pub fn default_fill(self) -> DefaultFill {
        match self {
            Self::Gross | Self::Canceled | Self::Settled => DefaultFill::Zero,
            Self::Year | Self::CommitmentDate => DefaultFill::Absent,
            _ => DefaultFill::EmptyText,
        }
    }

    /// Position of `folded_header` in the alias list. Lower ranks win when a
    /// file carries more than one spelling of the same field.
    fn alias_rank(self, folded_header: &str) -> Option<usize> {
        self.aliases()
            .iter()
            .position(|alias| fold_header(alias) == folded_header)
    }
}

/// Column positions for one file, resolved once when the file is loaded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceSchema {
    columns: BTreeMap<Field, usize>,
}

impl SourceSchema {
    /// Maps `headers` onto `fields`. A header belongs to the first field it
    /// names; among headers naming one field, the earliest alias wins, then
    /// the leftmost column.
    pub fn resolve(headers: &[String], fields: &[Field]) -> Self {
        let mut ranked: BTreeMap<Field, (usize, usize)> = BTreeMap::new();
        for (index, header) in headers.iter().enumerate() {
            let folded = fold_header(header);
            if folded.is_empty() {
                continue;
            }
            let matched = fields
                .iter()
                .find_map(|field| field.alias_rank(&folded).map(|rank| (*field, rank)));
            let Some((field, rank)) = matched else {
                continue;
            };
            let best = ranked.entry(field).or_insert((rank, index));
            if rank < best.0 {
                *best = (rank, index);
            }
        }
        let columns = ranked
            .into_iter()
            .map(|(field, (_, index))| (field, index))
            .collect();
        Self { columns }
    }

    pub fn column(&self, field: Field) -> Option<usize> {
        self.columns.get(&field).copied()
    }

    pub fn has(&self, field: Field) -> bool {
        self.columns.contains_key(&field)
    }

    /// Fields from `fields` with no column here, listed by canonical name.
    pub fn missing(&self, fields: &[Field]) -> Vec<String> {
        fields
            .iter()
            .filter(|field| !self.has(**field))
            .map(|field| field.canonical().to_string())
            .collect()
    }
}

pub fn fold_header(raw: &str) -> String {
    raw.trim()
        .nfd()
        .filter(|ch| !is_combining_mark(*ch))
        .filter(|ch| ch.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}
