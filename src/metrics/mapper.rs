//! Row Mapper
//!
//! Turns result rows into samples for one metric definition.

use thiserror::Error;

use crate::domain::ports::{ConversionError, ResultRow};
use crate::metrics::definition::MetricDefinition;

/// A value ready to be written into the scrape registry.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub name: String,
    /// Label values, in the order of the definition's label names.
    pub label_values: Vec<String>,
    pub value: f64,
}

/// Failure to map a single row.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MappingError {
    #[error("row has no field '{0}'")]
    MissingField(String),

    #[error("field '{field}': {source}")]
    Conversion {
        field: String,
        #[source]
        source: ConversionError,
    },
}

/// Map one row.
pub fn map_row(definition: &MetricDefinition, row: &ResultRow) -> Result<Sample, MappingError> {
    let label_values = definition
        .labels
        .iter()
        .map(|label| {
            row.get(label)
                .map(|value| value.to_label_value())
                .ok_or_else(|| MappingError::MissingField(label.clone()))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let field = &definition.value_field;
    let value = row
        .get(field)
        .ok_or_else(|| MappingError::MissingField(field.clone()))?
        .as_f64()
        .map_err(|source| MappingError::Conversion {
            field: field.clone(),
            source,
        })?;

    Ok(Sample {
        name: definition.name.clone(),
        label_values,
        value,
    })
}

/// Outcome of mapping every row a definition's query returned.
#[derive(Debug, Default)]
pub struct MappedRows {
    pub samples: Vec<Sample>,
    /// Failed rows, with their index in the result set.
    pub errors: Vec<(usize, MappingError)>,
}

/// Map a full result set.
///
/// Labeled definitions produce one sample per row, each row failing on its
/// own. Unlabeled definitions only read the first row; the rest are ignored.
pub fn map_rows(definition: &MetricDefinition, rows: &[ResultRow]) -> MappedRows {
    let rows = if definition.is_labeled() {
        rows
    } else {
        &rows[..rows.len().min(1)]
    };

    let mut mapped = MappedRows::default();
    for (index, row) in rows.iter().enumerate() {
        match map_row(definition, row) {
            Ok(sample) => mapped.samples.push(sample),
            Err(e) => mapped.errors.push((index, e)),
        }
    }
    mapped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::{FieldValue, QueryParams};
    use assert_matches::assert_matches;

    fn definition(labels: &[&str]) -> MetricDefinition {
        MetricDefinition {
            name: "people".to_string(),
            help: "people".to_string(),
            query: "MATCH (p) RETURN p.city AS city, count(p) AS value".to_string(),
            value_field: "value".to_string(),
            labels: labels.iter().map(|l| l.to_string()).collect(),
            query_params: QueryParams::new(),
        }
    }

    #[test]
    fn test_map_unlabeled_row() {
        let row = ResultRow::new().with("value", 42i64);
        let sample = map_row(&definition(&[]), &row).unwrap();

        assert_eq!(sample.name, "people");
        assert!(sample.label_values.is_empty());
        assert_eq!(sample.value, 42.0);
    }

    #[test]
    fn test_map_labeled_row() {
        let row = ResultRow::new()
            .with("city", "NYC")
            .with("value", 5i64);
        let sample = map_row(&definition(&["city"]), &row).unwrap();

        assert_eq!(sample.label_values, vec!["NYC".to_string()]);
        assert_eq!(sample.value, 5.0);
    }

    #[test]
    fn test_missing_label_field() {
        let row = ResultRow::new().with("value", 5i64);
        assert_eq!(
            map_row(&definition(&["city"]), &row),
            Err(MappingError::MissingField("city".to_string()))
        );
    }

    #[test]
    fn test_missing_value_field() {
        let row = ResultRow::new().with("count", 5i64);
        assert_eq!(
            map_row(&definition(&[]), &row),
            Err(MappingError::MissingField("value".to_string()))
        );
    }

    #[test]
    fn test_non_numeric_value() {
        let row = ResultRow::new().with("value", "lots");
        assert_matches!(
            map_row(&definition(&[]), &row),
            Err(MappingError::Conversion { source: ConversionError::NonNumericString(_), .. })
        );

        let row = ResultRow::new().with("value", FieldValue::Null);
        assert_matches!(
            map_row(&definition(&[]), &row),
            Err(MappingError::Conversion { source: ConversionError::Null, .. })
        );
    }

    #[test]
    fn test_labeled_rows_fail_independently() {
        let rows = vec![
            ResultRow::new().with("city", "NYC").with("value", 5i64),
            ResultRow::new().with("city", "SF").with("value", "n/a"),
            ResultRow::new().with("city", "LA").with("value", 3i64),
        ];

        let mapped = map_rows(&definition(&["city"]), &rows);
        assert_eq!(mapped.samples.len(), 2);
        assert_eq!(mapped.errors.len(), 1);
        assert_eq!(mapped.errors[0].0, 1);
        assert_eq!(mapped.samples[1].label_values, vec!["LA".to_string()]);
    }

    #[test]
    fn test_unlabeled_uses_first_row_only() {
        let rows = vec![
            ResultRow::new().with("value", 1i64),
            ResultRow::new().with("value", "ignored"),
        ];

        let mapped = map_rows(&definition(&[]), &rows);
        assert_eq!(mapped.samples.len(), 1);
        assert_eq!(mapped.samples[0].value, 1.0);
        assert!(mapped.errors.is_empty());
    }

    #[test]
    fn test_zero_rows() {
        let mapped = map_rows(&definition(&[]), &[]);
        assert!(mapped.samples.is_empty());
        assert!(mapped.errors.is_empty());

        let mapped = map_rows(&definition(&["city"]), &[]);
        assert!(mapped.samples.is_empty());
        assert!(mapped.errors.is_empty());
    }
}
