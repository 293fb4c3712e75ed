//! Constraint query builder
//!
//! Pure functions compiling `(name, kind, values, exclude)` into backend
//! query fragments. Each builder validates the value shapes its kind
//! accepts and rejects anything else; no state, no I/O.

use search_session_query as qb;
use search_session_query::{GeoBox, QueryFragment, RangeOperator, Scalar};

use crate::constraint::ConstraintKind;
use crate::error::{Result, SearchError};
use crate::value::ConstraintValue;

fn invalid_value(kind: ConstraintKind, name: &str) -> SearchError {
    SearchError::InvalidConstraintValue {
        kind: kind.to_string(),
        name: name.to_string(),
    }
}

/// Compile values for a range constraint.
///
/// Scalar values collapse into a single equality fragment (`EQ`, or `NE`
/// under `exclude`) carrying all of them; each range value then emits a
/// lower-bound fragment (`GE`/`LT`) when `min` is present and an
/// upper-bound fragment (`LE`/`GT`) when `max` is present, in input order.
pub fn range_queries(
    name: &str,
    values: &[&ConstraintValue],
    exclude: bool,
) -> Result<Vec<QueryFragment>> {
    let operator = |base: RangeOperator| if exclude { base.negated() } else { base };

    let mut scalars: Vec<Scalar> = Vec::new();
    for value in values {
        match value {
            ConstraintValue::Value { value, .. } => scalars.push(value.clone()),
            ConstraintValue::Range { .. } => {}
            ConstraintValue::Box { .. } => {
                return Err(invalid_value(ConstraintKind::Range, name));
            }
        }
    }

    let mut queries = Vec::new();
    if !scalars.is_empty() {
        queries.push(qb::range_constraint(
            name,
            operator(RangeOperator::Eq),
            scalars,
        ));
    }

    for value in values {
        if let ConstraintValue::Range { min, max } = value {
            if let Some(min) = min {
                queries.push(qb::range_constraint(
                    name,
                    operator(RangeOperator::Ge),
                    vec![min.clone()],
                ));
            }
            if let Some(max) = max {
                queries.push(qb::range_constraint(
                    name,
                    operator(RangeOperator::Le),
                    vec![max.clone()],
                ));
            }
        }
    }

    Ok(queries)
}

fn boxes_of(kind: ConstraintKind, name: &str, values: &[&ConstraintValue]) -> Result<Vec<GeoBox>> {
    values
        .iter()
        .map(|value| match value {
            ConstraintValue::Box { rect, .. } => Ok(rect.clone()),
            _ => Err(invalid_value(kind, name)),
        })
        .collect()
}

/// Compile box values into one geospatial fragment.
pub fn geospatial_query(name: &str, values: &[&ConstraintValue]) -> Result<QueryFragment> {
    let boxes = boxes_of(ConstraintKind::Geospatial, name, values)?;
    Ok(qb::geospatial_constraint(name, boxes))
}

/// Compile box values into a custom-constraint fragment wrapping the boxes.
pub fn custom_geospatial_query(name: &str, values: &[&ConstraintValue]) -> Result<QueryFragment> {
    let boxes = boxes_of(ConstraintKind::CustomGeospatial, name, values)?;
    Ok(qb::custom_geospatial_constraint(name, boxes))
}

/// Compile scalar values into one fragment of the kind-specific flavor
/// (value/word/collection/custom).
pub fn term_query(
    kind: ConstraintKind,
    name: &str,
    values: &[&ConstraintValue],
) -> Result<QueryFragment> {
    let scalars: Vec<Scalar> = values
        .iter()
        .map(|value| match value {
            ConstraintValue::Value { value, .. } => Ok(value.clone()),
            _ => Err(invalid_value(kind, name)),
        })
        .collect::<Result<_>>()?;

    match kind {
        ConstraintKind::Value => Ok(qb::value_constraint(name, scalars)),
        ConstraintKind::Word => Ok(qb::word_constraint(name, scalars)),
        ConstraintKind::Collection => Ok(qb::collection_constraint(name, scalars)),
        ConstraintKind::Custom => Ok(qb::custom_constraint(name, scalars)),
        ConstraintKind::Range | ConstraintKind::Geospatial | ConstraintKind::CustomGeospatial => {
            Err(SearchError::UnknownConstraintKind {
                key: kind.to_string(),
            })
        }
    }
}

/// Dispatch to the kind-specific builder, returning a flat fragment list.
pub fn build(
    kind: ConstraintKind,
    name: &str,
    values: &[&ConstraintValue],
    exclude: bool,
) -> Result<Vec<QueryFragment>> {
    match kind {
        ConstraintKind::Range => range_queries(name, values, exclude),
        ConstraintKind::Geospatial => Ok(vec![geospatial_query(name, values)?]),
        ConstraintKind::CustomGeospatial => Ok(vec![custom_geospatial_query(name, values)?]),
        ConstraintKind::Value
        | ConstraintKind::Word
        | ConstraintKind::Collection
        | ConstraintKind::Custom => Ok(vec![term_query(kind, name, values)?]),
    }
}
