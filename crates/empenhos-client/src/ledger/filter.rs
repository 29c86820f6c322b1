use std::borrow::Cow;
use std::collections::BTreeSet;

use serde::Serialize;

use crate::ledger::record::EnrichedRecord;

/// A column that can be filtered on or grouped by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    FiscalYear,
    Entity,
    Creditor,
    FundSource,
    /// Expense-category description (falls back to the code).
    ExpenseCategory,
    /// Expense-nature description (falls back to the code).
    ExpenseNature,
    NatureCode,
}

impl Dimension {
    pub fn value_of<'a>(&self, row: &'a EnrichedRecord) -> Cow<'a, str> {
        match self {
            Self::FiscalYear => Cow::Owned(row.record.fiscal_year.to_string()),
            Self::Entity => Cow::Borrowed(&row.record.entity),
            Self::Creditor => Cow::Borrowed(&row.record.creditor),
            Self::FundSource => Cow::Borrowed(&row.record.fund_source),
            Self::ExpenseCategory => Cow::Borrowed(&row.category_label),
            Self::ExpenseNature => Cow::Borrowed(&row.nature_label),
            Self::NatureCode => Cow::Borrowed(&row.record.nature_code),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::FiscalYear => "Exercício",
            Self::Entity => "Entidade",
            Self::Creditor => "Credor",
            Self::FundSource => "Fonte de Recurso",
            Self::ExpenseCategory => "Descrição da despesa",
            Self::ExpenseNature => "Descrição da natureza",
            Self::NatureCode => "Natureza da Despesa",
        }
    }

    pub fn key(&self) -> &'static str {
        match self {
            Self::FiscalYear => "fiscal_year",
            Self::Entity => "entity",
            Self::Creditor => "creditor",
            Self::FundSource => "fund_source",
            Self::ExpenseCategory => "expense_category",
            Self::ExpenseNature => "expense_nature",
            Self::NatureCode => "nature_code",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "fiscal_year" | "year" => Some(Self::FiscalYear),
            "entity" => Some(Self::Entity),
            "creditor" => Some(Self::Creditor),
            "fund_source" | "fund" => Some(Self::FundSource),
            "expense_category" | "expense" => Some(Self::ExpenseCategory),
            "expense_nature" => Some(Self::ExpenseNature),
            "nature_code" | "nature" => Some(Self::NatureCode),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", content = "values", rename_all = "snake_case")]
pub enum Selection {
    All,
    Only(BTreeSet<String>),
}

impl Selection {
    /// An empty value list selects everything, matching an untouched
    /// multi-select.
    pub fn from_values<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let set = values
            .into_iter()
            .map(|value| value.as_ref().trim().to_string())
            .collect::<BTreeSet<String>>();
        if set.is_empty() {
            Self::All
        } else {
            Self::Only(set)
        }
    }

    pub fn admits(&self, value: &str) -> bool {
        match self {
            Self::All => true,
            Self::Only(values) => values.contains(value),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterSpec {
    pub dimension: Dimension,
    pub selection: Selection,
}

impl FilterSpec {
    pub fn matches(&self, row: &EnrichedRecord) -> bool {
        self.selection.admits(&self.dimension.value_of(row))
    }
}

/// Conjunction of set-membership predicates. Order never matters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilterSet {
    specs: Vec<FilterSpec>,
}

impl FilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, dimension: Dimension, selection: Selection) -> Self {
        if selection != Selection::All {
            self.specs.push(FilterSpec {
                dimension,
                selection,
            });
        }
        self
    }

    pub fn specs(&self) -> &[FilterSpec] {
        &self.specs
    }

    pub fn matches(&self, row: &EnrichedRecord) -> bool {
        self.specs.iter().all(|spec| spec.matches(row))
    }

    pub fn apply<'a, I>(&self, rows: I) -> Vec<&'a EnrichedRecord>
    where
        I: IntoIterator<Item = &'a EnrichedRecord>,
    {
        rows.into_iter().filter(|row| self.matches(row)).collect()
    }
}
