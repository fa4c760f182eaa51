use reckon_core::CategoryRuleTable;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RuleTableError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse rule table: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub fn parse_rule_table(yaml: &str) -> Result<CategoryRuleTable, RuleTableError> {
    let table: CategoryRuleTable = serde_yaml::from_str(yaml)?;
    tracing::debug!("Loaded {} category rules", table.len());
    Ok(table)
}

pub fn load_rule_table(path: &Path) -> Result<CategoryRuleTable, RuleTableError> {
    let yaml = std::fs::read_to_string(path)?;
    parse_rule_table(&yaml)
}

#[cfg(test)]
mod tests {
    use super::*;

    const RULES: &str = r#"
restaurants:
  aggregator:
    transaction_id: null
    name: [Chipotle, Sweetgreen]
    personal_finance_category:
      primary: [FOOD_AND_DRINK]
      detailed: null
    category:
      - [Food and Drink]
      - [Restaurants]
  shared:
    category: [Dining out, Food and drink - Other]
travel:
  aggregator:
    category:
      - [Travel]
      - null
      - [Airlines and Aviation Services]
  shared:
    category: [Plane, Hotel]
income:
"#;

    #[test]
    fn parses_nested_yaml() {
        let table = parse_rule_table(RULES).unwrap();
        let names: Vec<_> = table.names().collect();
        assert_eq!(names, ["restaurants", "travel", "income"]);

        let restaurants = table.get("restaurants").unwrap();
        assert_eq!(restaurants.aggregator.transaction_id, None);
        let pfc = restaurants.aggregator.personal_finance_category.as_ref().unwrap();
        assert_eq!(pfc.primary.as_deref(), Some(&["FOOD_AND_DRINK".to_string()][..]));
        assert_eq!(pfc.detailed, None);

        let travel = table.get("travel").unwrap();
        let levels = travel.aggregator.category.as_ref().unwrap();
        assert_eq!(levels.len(), 3);
        assert!(levels[1].is_none());
        assert_eq!(travel.aggregator.name, None);
    }

    #[test]
    fn empty_rule_body_is_allowed() {
        let table = parse_rule_table(RULES).unwrap();
        assert_eq!(table.get("income"), Some(&Default::default()));
    }

    #[test]
    fn accepts_vendor_keys() {
        let yaml = "groceries:\n  plaid:\n    name: [Safeway]\n  splitwise:\n    category: [Groceries]\n";
        let table = parse_rule_table(yaml).unwrap();
        let rule = table.get("groceries").unwrap();
        assert!(rule.aggregator.name.is_some());
        assert!(rule.shared.category.is_some());
    }

    #[test]
    fn rejects_non_mapping_document() {
        assert!(matches!(
            parse_rule_table("- restaurants\n- travel\n"),
            Err(RuleTableError::Yaml(_))
        ));
    }

    #[test]
    fn rejects_duplicate_category() {
        assert!(parse_rule_table("travel: {}\ntravel: {}\n").is_err());
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("transaction_categories.yml");
        std::fs::write(&path, RULES).unwrap();
        assert_eq!(load_rule_table(&path).unwrap().len(), 3);
    }

    #[test]
    fn sample_table_parses_in_order() {
        let table = parse_rule_table(include_str!("../../../demos/transaction_categories.yml")).unwrap();
        let names: Vec<_> = table.names().collect();
        assert_eq!(names.first(), Some(&"income"));
        assert_eq!(names.last(), Some(&"uncategorized"));
        let groceries = table.get("groceries").unwrap();
        let pfc = groceries.aggregator.personal_finance_category.as_ref().unwrap();
        assert!(pfc.primary.is_none());
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            load_rule_table(&dir.path().join("absent.yml")),
            Err(RuleTableError::Io(_))
        ));
    }
}
