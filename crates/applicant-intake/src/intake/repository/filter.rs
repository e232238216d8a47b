use std::cmp::Ordering;

use super::Entity;
use crate::intake::domain::FieldValue;

/// Single predicate over an entity field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    Equals {
        field: String,
        value: FieldValue,
    },
    /// Inclusive range; an open side is `None`.
    Range {
        field: String,
        min: Option<FieldValue>,
        max: Option<FieldValue>,
    },
}

impl Condition {
    fn matches<E: Entity>(&self, entity: &E) -> bool {
        match self {
            Condition::Equals { field, value } => entity.field(field).as_ref() == Some(value),
            Condition::Range { field, min, max } => {
                let Some(actual) = entity.field(field) else {
                    return false;
                };
                let above_min = min.as_ref().map_or(true, |min| {
                    matches!(
                        actual.compare(min),
                        Some(Ordering::Greater | Ordering::Equal)
                    )
                });
                let below_max = max.as_ref().map_or(true, |max| {
                    matches!(actual.compare(max), Some(Ordering::Less | Ordering::Equal))
                });
                above_min && below_max
            }
        }
    }
}

/// Conjunction of equality and range conditions. An empty filter matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    conditions: Vec<Condition>,
}

impl Filter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn equals(mut self, field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.conditions.push(Condition::Equals {
            field: field.into(),
            value: value.into(),
        });
        self
    }

    pub fn range(
        mut self,
        field: impl Into<String>,
        min: Option<FieldValue>,
        max: Option<FieldValue>,
    ) -> Self {
        self.conditions.push(Condition::Range {
            field: field.into(),
            min,
            max,
        });
        self
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn matches<E: Entity>(&self, entity: &E) -> bool {
        self.conditions
            .iter()
            .all(|condition| condition.matches(entity))
    }
}

/// Lazy result sequence: the filter is applied as items are pulled.
pub struct QueryResults<E> {
    rows: std::vec::IntoIter<E>,
    filter: Filter,
}

impl<E: Entity> QueryResults<E> {
    pub(crate) fn new(rows: Vec<E>, filter: Filter) -> Self {
        Self {
            rows: rows.into_iter(),
            filter,
        }
    }
}

impl<E: Entity> Iterator for QueryResults<E> {
    type Item = E;

    fn next(&mut self) -> Option<E> {
        let filter = &self.filter;
        self.rows.by_ref().find(|row| filter.matches(row))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, self.rows.size_hint().1)
    }
}
