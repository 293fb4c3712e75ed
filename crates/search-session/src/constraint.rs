//! Named search constraints
//!
//! A [`Constraint`] is one backend-exposed filter: a name, a kind derived
//! once from the backend's definition object, and three independently
//! toggled value sets — `every` (AND), `any` (OR), and `none` (negated).
//! It compiles its active values into query fragments via the builder
//! module and serializes them to/from URL parameter tokens.

use serde_json::Value;

use search_session_query as qb;
use search_session_query::QueryFragment;

use crate::builder;
use crate::error::{Result, SearchError};
use crate::params::{ConstraintCategory, ParamsConfig};
use crate::response::FacetResult;
use crate::value::{ConstraintValue, ValueSet, encode_component};

/// Geospatial definition sub-kinds; any of these as the discriminating key
/// (or as the first annotation of a custom definition) marks the
/// constraint geospatial.
const GEOSPATIAL_SUBKINDS: [&str; 6] = [
    "geo-attr-pair",
    "geo-elem-pair",
    "geo-elem",
    "geo-path",
    "geo-json-property",
    "geo-json-property-pair",
];

/// The seven constraint kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConstraintKind {
    Value,
    Word,
    Collection,
    Custom,
    Range,
    Geospatial,
    CustomGeospatial,
}

impl ConstraintKind {
    /// Whether fragments of this kind are geospatial (partitioned
    /// separately when the session combines queries).
    #[must_use]
    pub const fn is_geospatial(self) -> bool {
        matches!(self, Self::Geospatial | Self::CustomGeospatial)
    }

    /// Derive the kind from a backend constraint definition.
    ///
    /// The discriminating key is the first key that is not `name` or the
    /// `_value` internal marker. A `custom` definition whose first
    /// annotation is a geospatial sub-kind reclassifies as
    /// custom-geospatial.
    pub fn classify(definition: &Value) -> Result<Self> {
        let key = discriminating_key(definition).ok_or(SearchError::NotAConstraint)?;

        if key == "custom" && annotated_geospatial(definition) {
            return Ok(Self::CustomGeospatial);
        }

        match key {
            "value" => Ok(Self::Value),
            "word" => Ok(Self::Word),
            "collection" => Ok(Self::Collection),
            "custom" => Ok(Self::Custom),
            "range" => Ok(Self::Range),
            key if GEOSPATIAL_SUBKINDS.contains(&key) => Ok(Self::Geospatial),
            key => Err(SearchError::UnknownConstraintKind {
                key: key.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for ConstraintKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Value => "value",
            Self::Word => "word",
            Self::Collection => "collection",
            Self::Custom => "custom",
            Self::Range => "range",
            Self::Geospatial => "geospatial",
            Self::CustomGeospatial => "custom-geospatial",
        };
        f.write_str(name)
    }
}

fn discriminating_key(definition: &Value) -> Option<&str> {
    definition
        .as_object()?
        .keys()
        .map(String::as_str)
        .find(|key| *key != "name" && *key != "_value")
}

fn annotated_geospatial(definition: &Value) -> bool {
    definition
        .get("annotation")
        .and_then(Value::as_array)
        .and_then(|annotations| annotations.first())
        .and_then(discriminating_key)
        .is_some_and(|sub| GEOSPATIAL_SUBKINDS.contains(&sub))
}

/// Per-category URL parameter entries produced by [`Constraint::params`];
/// each entry has the form `urlencode(name) + separator + token`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConstraintParams {
    pub constraints: Vec<String>,
    pub or_constraints: Vec<String>,
    pub not_constraints: Vec<String>,
}

impl ConstraintParams {
    /// Entries of one category.
    #[must_use]
    pub fn get(&self, category: ConstraintCategory) -> &[String] {
        match category {
            ConstraintCategory::Constraints => &self.constraints,
            ConstraintCategory::OrConstraints => &self.or_constraints,
            ConstraintCategory::NotConstraints => &self.not_constraints,
        }
    }
}

/// Per-category raw value tokens consumed by [`Constraint::from_params`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenBundle {
    pub constraints: Vec<String>,
    pub or_constraints: Vec<String>,
    pub not_constraints: Vec<String>,
}

impl TokenBundle {
    pub fn push(&mut self, category: ConstraintCategory, token: impl Into<String>) {
        let list = match category {
            ConstraintCategory::Constraints => &mut self.constraints,
            ConstraintCategory::OrConstraints => &mut self.or_constraints,
            ConstraintCategory::NotConstraints => &mut self.not_constraints,
        };
        list.push(token.into());
    }

    #[must_use]
    pub fn get(&self, category: ConstraintCategory) -> &[String] {
        match category {
            ConstraintCategory::Constraints => &self.constraints,
            ConstraintCategory::OrConstraints => &self.or_constraints,
            ConstraintCategory::NotConstraints => &self.not_constraints,
        }
    }
}

/// One named, typed backend filter with its three active value sets.
#[derive(Debug, Clone)]
pub struct Constraint {
    name: String,
    kind: ConstraintKind,
    datatype: Option<String>,
    every: ValueSet,
    any: ValueSet,
    none: ValueSet,
    facet: Option<FacetResult>,
}

impl Constraint {
    /// Build a constraint from a backend definition object.
    pub fn from_definition(definition: &Value) -> Result<Self> {
        let kind = ConstraintKind::classify(definition)?;
        let name = definition
            .get("name")
            .and_then(Value::as_str)
            .ok_or(SearchError::NotAConstraint)?
            .to_string();
        let datatype = if kind == ConstraintKind::Range {
            definition
                .pointer("/range/type")
                .and_then(Value::as_str)
                .map(String::from)
        } else {
            None
        };
        Ok(Self {
            name,
            kind,
            datatype,
            every: ValueSet::new(),
            any: ValueSet::new(),
            none: ValueSet::new(),
            facet: None,
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn kind(&self) -> ConstraintKind {
        self.kind
    }

    /// Range index datatype from the definition (range constraints only).
    #[must_use]
    pub fn datatype(&self) -> Option<&str> {
        self.datatype.as_deref()
    }

    #[must_use]
    pub fn facet(&self) -> Option<&FacetResult> {
        self.facet.as_ref()
    }

    pub fn set_facet(&mut self, facet: Option<FacetResult>) {
        self.facet = facet;
    }

    /// Must-match-all values (AND semantics).
    #[must_use]
    pub const fn every(&self) -> &ValueSet {
        &self.every
    }

    pub fn every_mut(&mut self) -> &mut ValueSet {
        &mut self.every
    }

    /// Match-any values (OR semantics).
    #[must_use]
    pub const fn any(&self) -> &ValueSet {
        &self.any
    }

    pub fn any_mut(&mut self) -> &mut ValueSet {
        &mut self.any
    }

    /// Excluded values (negated semantics).
    #[must_use]
    pub const fn none(&self) -> &ValueSet {
        &self.none
    }

    pub fn none_mut(&mut self) -> &mut ValueSet {
        &mut self.none
    }

    /// True when any of the three value sets is non-empty.
    #[must_use]
    pub fn active(&self) -> bool {
        !(self.every.is_empty() && self.any.is_empty() && self.none.is_empty())
    }

    /// True for geospatial and custom-geospatial constraints.
    #[must_use]
    pub const fn geospatial(&self) -> bool {
        self.kind.is_geospatial()
    }

    /// Add must-match-all values. Input may be one raw value or an array;
    /// each entry is classified independently.
    pub fn match_values(&mut self, values: &Value) -> Result<()> {
        add_values(&mut self.every, values)
    }

    /// Add match-any values.
    pub fn match_any(&mut self, values: &Value) -> Result<()> {
        add_values(&mut self.any, values)
    }

    /// Add excluded values.
    pub fn exclude(&mut self, values: &Value) -> Result<()> {
        add_values(&mut self.none, values)
    }

    pub fn clear_matches(&mut self) {
        self.every.clear();
    }

    pub fn clear_choices(&mut self) {
        self.any.clear();
    }

    pub fn clear_exclusions(&mut self) {
        self.none.clear();
    }

    pub fn clear(&mut self) {
        self.clear_matches();
        self.clear_choices();
        self.clear_exclusions();
    }

    /// Compile the active values into a flat fragment list, ordered
    /// every → any → none.
    ///
    /// `every` compiles one builder call per value (a two-bound range
    /// value legitimately yields two fragments); `any` compiles the whole
    /// set in one batched call regardless of kind (for ranges the batched
    /// output is not a strict OR of the per-value queries — kept as
    /// specified); `none` uses the builder's exclude mode for ranges and
    /// a NOT wrapper otherwise.
    pub fn queries(&self) -> Result<Vec<QueryFragment>> {
        let mut queries = Vec::new();

        for value in self.every.iter() {
            queries.extend(builder::build(self.kind, &self.name, &[value], false)?);
        }

        if !self.any.is_empty() {
            let values: Vec<&ConstraintValue> = self.any.iter().collect();
            queries.extend(builder::build(self.kind, &self.name, &values, false)?);
        }

        if !self.none.is_empty() {
            let values: Vec<&ConstraintValue> = self.none.iter().collect();
            if self.kind == ConstraintKind::Range {
                queries.extend(builder::build(self.kind, &self.name, &values, true)?);
            } else if let Some(fragment) =
                builder::build(self.kind, &self.name, &values, false)?.into_iter().next()
            {
                queries.push(qb::not(fragment));
            }
        }

        Ok(queries)
    }

    /// Render the active values as URL parameter entries, one list per
    /// category, using the configured separator.
    #[must_use]
    pub fn params(&self, config: &ParamsConfig) -> ConstraintParams {
        let prefix = format!("{}{}", encode_component(&self.name), config.separator());
        let render = |set: &ValueSet| {
            set.iter()
                .map(|value| format!("{prefix}{}", value.to_token()))
                .collect()
        };
        ConstraintParams {
            constraints: render(&self.every),
            or_constraints: render(&self.any),
            not_constraints: render(&self.none),
        }
    }

    /// Replace the three value sets from raw parameter tokens.
    ///
    /// All tokens are parsed before any set is replaced, so a bad token
    /// leaves this constraint untouched. `None` clears everything.
    pub fn from_params(&mut self, bundle: Option<&TokenBundle>) -> Result<()> {
        let Some(bundle) = bundle else {
            self.clear();
            return Ok(());
        };
        let every = parse_tokens(&bundle.constraints)?;
        let any = parse_tokens(&bundle.or_constraints)?;
        let none = parse_tokens(&bundle.not_constraints)?;
        self.every = every;
        self.any = any;
        self.none = none;
        Ok(())
    }

    /// Reserved extension point for fetching additional facet values.
    pub fn more(&self) -> Result<()> {
        Err(SearchError::NotImplemented {
            what: "Constraint::more",
        })
    }
}

fn add_values(set: &mut ValueSet, values: &Value) -> Result<()> {
    let parsed: Vec<ConstraintValue> = match values {
        Value::Array(entries) => entries
            .iter()
            .map(ConstraintValue::from_raw)
            .collect::<Result<_>>()?,
        single => vec![ConstraintValue::from_raw(single)?],
    };
    for value in parsed {
        set.insert(value);
    }
    Ok(())
}

fn parse_tokens(tokens: &[String]) -> Result<ValueSet> {
    let mut set = ValueSet::new();
    for token in tokens {
        set.insert(ConstraintValue::from_token(token)?);
    }
    Ok(set)
}
