//! Category rule table.
//!
//! The table maps a category name to the criteria each source system must
//! meet to land in it. Entry order is significant: classification is
//! first-match-wins, so the table keeps the order the document declared.

use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersonalFinanceRule {
    pub primary: Option<Vec<String>>,
    pub detailed: Option<Vec<String>>,
}

/// Per-field allow-lists for aggregator transactions. `None` skips the field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregatorRule {
    pub transaction_id: Option<Vec<String>>,
    pub name: Option<Vec<String>>,
    pub personal_finance_category: Option<PersonalFinanceRule>,
    /// One allow-list per hierarchy depth, root first.
    pub category: Option<Vec<Option<Vec<String>>>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SharedExpenseRule {
    pub category: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryRule {
    #[serde(alias = "plaid")]
    pub aggregator: AggregatorRule,
    #[serde(alias = "splitwise")]
    pub shared: SharedExpenseRule,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryRuleTable {
    entries: Vec<(String, CategoryRule)>,
}

impl CategoryRuleTable {
    pub fn new(entries: Vec<(String, CategoryRule)>) -> Self {
        Self { entries }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CategoryRule)> {
        self.entries.iter().map(|(name, rule)| (name.as_str(), rule))
    }

    pub fn get(&self, category: &str) -> Option<&CategoryRule> {
        self.entries
            .iter()
            .find(|(name, _)| name == category)
            .map(|(_, rule)| rule)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for CategoryRuleTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, rule) in &self.entries {
            map.serialize_entry(name, rule)?;
        }
        map.end()
    }
}

struct TableVisitor;

impl<'de> Visitor<'de> for TableVisitor {
    type Value = CategoryRuleTable;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a mapping of category names to rules")
    }

    fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(CategoryRuleTable::default())
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut entries: Vec<(String, CategoryRule)> = Vec::new();
        while let Some((name, rule)) = access.next_entry::<String, Option<CategoryRule>>()? {
            if entries.iter().any(|(existing, _)| *existing == name) {
                return Err(de::Error::custom(format!("duplicate category `{name}`")));
            }
            entries.push((name, rule.unwrap_or_default()));
        }
        Ok(CategoryRuleTable { entries })
    }
}

impl<'de> Deserialize<'de> for CategoryRuleTable {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(TableVisitor)
    }
}
