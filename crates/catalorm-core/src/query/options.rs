//! Query options for `find_all` and `load_first_matching`.

use crate::value::Value;

/// Options of a SELECT over one entity table.
///
/// `filter`, `order_by`, `group_by` and join fragments are SQL written by
/// the caller; values belong in `params`, bound to the `?` placeholders of
/// the filter in order. Columns are validated identifiers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryOptions {
    /// Projected columns; empty selects `*`.
    pub columns: Vec<String>,
    /// WHERE condition.
    pub filter: Option<String>,
    /// Parameters of the filter.
    pub params: Vec<Value>,
    /// ORDER BY fragment.
    pub order_by: Option<String>,
    /// GROUP BY fragment.
    pub group_by: Option<String>,
    /// Maximum number of rows.
    pub limit: Option<u64>,
    /// Rows to skip.
    pub offset: Option<u64>,
    /// Join fragments, in order.
    pub joins: Vec<String>,
}

impl QueryOptions {
    /// Select every row and column.
    pub fn new() -> Self {
        Self::default()
    }

    /// Project `columns` (`*`, `column`, `table.column` or `table.*`).
    pub fn columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Set the WHERE condition.
    pub fn filter(mut self, condition: impl Into<String>) -> Self {
        self.filter = Some(condition.into());
        self
    }

    /// Set the WHERE condition with its parameters.
    pub fn filter_with<I, V>(mut self, condition: impl Into<String>, params: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.filter = Some(condition.into());
        self.params = params.into_iter().map(Into::into).collect();
        self
    }

    /// Append one filter parameter.
    pub fn param(mut self, value: impl Into<Value>) -> Self {
        self.params.push(value.into());
        self
    }

    /// Set the ORDER BY fragment.
    pub fn order_by(mut self, order: impl Into<String>) -> Self {
        self.order_by = Some(order.into());
        self
    }

    /// Set the GROUP BY fragment.
    pub fn group_by(mut self, group: impl Into<String>) -> Self {
        self.group_by = Some(group.into());
        self
    }

    /// Limit the number of rows.
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Skip rows.
    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Add a join. Fragments without a join keyword are prefixed with
    /// `INNER JOIN`.
    pub fn join(mut self, join: impl Into<String>) -> Self {
        self.joins.push(join.into());
        self
    }

    /// The projection recorded on hydrated models, if any.
    pub(crate) fn projection(&self) -> Option<Vec<String>> {
        let wildcard = |c: &String| {
            let c = c.trim();
            c == "*" || c.ends_with(".*")
        };
        if self.columns.is_empty() || self.columns.iter().any(wildcard) {
            return None;
        }
        Some(
            self.columns
                .iter()
                .map(|c| {
                    let c = c.trim();
                    c.rsplit_once('.').map(|(_, name)| name).unwrap_or(c).to_string()
                })
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let options = QueryOptions::new()
            .columns(["name", "age"])
            .filter_with("age > ?", [30])
            .param(Value::from("x"))
            .order_by("age DESC")
            .limit(5)
            .offset(10);

        assert_eq!(options.columns, vec!["name", "age"]);
        assert_eq!(options.params, vec![Value::Integer(30), Value::from("x")]);
        assert_eq!(options.limit, Some(5));
        assert_eq!(options.offset, Some(10));
    }

    #[test]
    fn test_projection() {
        assert_eq!(QueryOptions::new().projection(), None);
        assert_eq!(QueryOptions::new().columns(["*"]).projection(), None);
        assert_eq!(
            QueryOptions::new()
                .columns(["person.*", "city.title"])
                .projection(),
            None
        );
        assert_eq!(
            QueryOptions::new()
                .columns(["person.name", "age"])
                .projection(),
            Some(vec!["name".to_string(), "age".to_string()])
        );
    }
}
