use rust_decimal::Decimal;

/// Value for a single request or feed field. Adapters and mappers
/// produce these, the client flattens them into query parameters and
/// the feed writers render them into envelope messages.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Int(i64),
    Decimal(Decimal),
    List(Vec<FieldValue>),
    Map(Vec<(String, FieldValue)>),
}

impl FieldValue {
    pub fn text(value: impl Into<String>) -> Self {
        FieldValue::Text(value.into())
    }

    /// Falsy values are omitted from feeds and requests: empty text,
    /// zero numbers, and empty containers all count as falsy.
    pub fn is_truthy(&self) -> bool {
        match self {
            FieldValue::Text(s) => !s.is_empty(),
            FieldValue::Int(n) => *n != 0,
            FieldValue::Decimal(d) => !d.is_zero(),
            FieldValue::List(items) => !items.is_empty(),
            FieldValue::Map(entries) => !entries.is_empty(),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Scalar rendering used for query parameters and leaf elements
    pub fn render(&self) -> String {
        match self {
            FieldValue::Text(s) => s.clone(),
            FieldValue::Int(n) => n.to_string(),
            FieldValue::Decimal(d) => d.to_string(),
            FieldValue::List(_) | FieldValue::Map(_) => String::new(),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Int(value)
    }
}

impl From<Decimal> for FieldValue {
    fn from(value: Decimal) -> Self {
        FieldValue::Decimal(value)
    }
}

/// Ordered name/value map. Field order is significant in feed
/// documents, so this preserves insertion order rather than hashing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldMap {
    entries: Vec<(String, FieldValue)>,
}

impl FieldMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace, keeping the original position on replace
    pub fn insert(&mut self, name: impl Into<String>, value: FieldValue) {
        let name = name.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    /// Insert only when the value is truthy
    pub fn insert_truthy(&mut self, name: impl Into<String>, value: FieldValue) {
        if value.is_truthy() {
            self.insert(name, value);
        }
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    pub fn contains_key(&self, name: &str) -> bool {
        self.entries.iter().any(|(n, _)| n == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &(String, FieldValue)> {
        self.entries.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn falsy_values_are_not_truthy() {
        assert!(!FieldValue::text("").is_truthy());
        assert!(!FieldValue::Int(0).is_truthy());
        assert!(!FieldValue::Decimal(Decimal::ZERO).is_truthy());
        assert!(!FieldValue::List(vec![]).is_truthy());
        assert!(!FieldValue::Map(vec![]).is_truthy());
    }

    #[test]
    fn non_empty_values_are_truthy() {
        assert!(FieldValue::text("x").is_truthy());
        assert!(FieldValue::Int(-1).is_truthy());
        assert!(FieldValue::Decimal(dec!(12.99)).is_truthy());
        assert!(FieldValue::List(vec![FieldValue::Int(0)]).is_truthy());
    }

    #[test]
    fn insert_truthy_skips_falsy_values() {
        let mut map = FieldMap::new();
        map.insert_truthy("Title", FieldValue::text("Widget"));
        map.insert_truthy("Brand", FieldValue::text(""));
        map.insert_truthy("NumberOfItems", FieldValue::Int(0));
        assert!(map.contains_key("Title"));
        assert!(!map.contains_key("Brand"));
        assert!(!map.contains_key("NumberOfItems"));
    }

    #[test]
    fn insertion_order_is_preserved_on_replace() {
        let mut map = FieldMap::new();
        map.insert("A", FieldValue::Int(1));
        map.insert("B", FieldValue::Int(2));
        map.insert("A", FieldValue::Int(3));
        let names: Vec<_> = map.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["A", "B"]);
        assert_eq!(map.get("A"), Some(&FieldValue::Int(3)));
    }
}
