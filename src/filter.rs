//! Typed representation of listing search parameters.
//!
//! Query strings arrive as flat `name=value` pairs with bracket-suffixed
//! range operators (`price[gte]=50`). They are parsed once into
//! [`ListingQuery`], which both the cache key deriver and the store query
//! builder consume.

use chrono::{DateTime, NaiveDate, Utc};
use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::validation::ValidationError;

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_LIMIT: i64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ListingField {
    Id,
    Title,
    PropertyType,
    Furnished,
    ListedBy,
    ListingType,
    ColorTheme,
    State,
    City,
    Price,
    AreaSqFt,
    Bedrooms,
    Bathrooms,
    Rating,
    AvailableFrom,
    IsVerified,
    Amenities,
    Tags,
    CreatedAt,
    UpdatedAt,
}

impl ListingField {
    const TEXT: [ListingField; 7] = [
        Self::PropertyType,
        Self::Furnished,
        Self::ListedBy,
        Self::ListingType,
        Self::ColorTheme,
        Self::State,
        Self::City,
    ];

    const NUMERIC: [ListingField; 5] = [
        Self::Price,
        Self::AreaSqFt,
        Self::Bedrooms,
        Self::Bathrooms,
        Self::Rating,
    ];

    const SORTABLE: [ListingField; 18] = [
        Self::Id,
        Self::Title,
        Self::PropertyType,
        Self::Furnished,
        Self::ListedBy,
        Self::ListingType,
        Self::ColorTheme,
        Self::State,
        Self::City,
        Self::Price,
        Self::AreaSqFt,
        Self::Bedrooms,
        Self::Bathrooms,
        Self::Rating,
        Self::AvailableFrom,
        Self::IsVerified,
        Self::CreatedAt,
        Self::UpdatedAt,
    ];

    /// Name used in query strings and JSON bodies.
    pub fn param_name(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Title => "title",
            Self::PropertyType => "type",
            Self::Furnished => "furnished",
            Self::ListedBy => "listedBy",
            Self::ListingType => "listingType",
            Self::ColorTheme => "colorTheme",
            Self::State => "state",
            Self::City => "city",
            Self::Price => "price",
            Self::AreaSqFt => "areaSqFt",
            Self::Bedrooms => "bedrooms",
            Self::Bathrooms => "bathrooms",
            Self::Rating => "rating",
            Self::AvailableFrom => "availableFrom",
            Self::IsVerified => "isVerified",
            Self::Amenities => "amenities",
            Self::Tags => "tags",
            Self::CreatedAt => "createdAt",
            Self::UpdatedAt => "updatedAt",
        }
    }

    /// Column in the `listings` table.
    pub fn column(self) -> &'static str {
        match self {
            Self::Id => "l.external_id",
            Self::Title => "l.title",
            Self::PropertyType => "l.property_type",
            Self::Furnished => "l.furnished",
            Self::ListedBy => "l.listed_by",
            Self::ListingType => "l.listing_type",
            Self::ColorTheme => "l.color_theme",
            Self::State => "l.location_state",
            Self::City => "l.location_city",
            Self::Price => "l.price",
            Self::AreaSqFt => "l.area_sq_ft",
            Self::Bedrooms => "l.bedrooms",
            Self::Bathrooms => "l.bathrooms",
            Self::Rating => "l.rating",
            Self::AvailableFrom => "l.available_from",
            Self::IsVerified => "l.is_verified",
            Self::Amenities => "l.amenities",
            Self::Tags => "l.tags",
            Self::CreatedAt => "l.created_at",
            Self::UpdatedAt => "l.updated_at",
        }
    }

    fn sortable(name: &str) -> Option<Self> {
        Self::SORTABLE
            .into_iter()
            .find(|field| field.param_name() == name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FilterOp {
    Eq,
    Gte,
    Lte,
    Gt,
    Lt,
    /// Every listed value must be present.
    All,
    /// At least one listed value must be present.
    Any,
}

impl FilterOp {
    const RANGE: [FilterOp; 4] = [Self::Gte, Self::Lte, Self::Gt, Self::Lt];

    fn suffix(self) -> &'static str {
        match self {
            Self::Gte => "gte",
            Self::Lte => "lte",
            Self::Gt => "gt",
            Self::Lt => "lt",
            Self::Eq | Self::All | Self::Any => "",
        }
    }

    pub fn sql(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Gte => ">=",
            Self::Lte => "<=",
            Self::Gt => ">",
            Self::Lt => "<",
            Self::All | Self::Any => "IN",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Text(String),
    Number(f64),
    Bool(bool),
    Date(DateTime<Utc>),
    List(Vec<String>),
}

impl FilterValue {
    fn canonical(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Number(n) => n.to_string(),
            Self::Bool(b) => b.to_string(),
            Self::Date(date) => date.to_rfc3339(),
            Self::List(items) => items.join(","),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub field: ListingField,
    pub op: FilterOp,
    pub value: FilterValue,
}

impl Filter {
    fn new(field: ListingField, op: FilterOp, value: FilterValue) -> Self {
        Self { field, op, value }
    }

    fn param_name(&self) -> String {
        let suffix = self.op.suffix();
        if suffix.is_empty() {
            self.field.param_name().to_string()
        } else {
            format!("{}[{}]", self.field.param_name(), suffix)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortSpec {
    pub field: ListingField,
    pub descending: bool,
}

impl Default for SortSpec {
    fn default() -> Self {
        Self {
            field: ListingField::Id,
            descending: false,
        }
    }
}

impl SortSpec {
    pub fn parse(raw: Option<&str>) -> Result<Self, ValidationError> {
        let raw = match raw.map(str::trim) {
            Some(raw) if !raw.is_empty() => raw,
            _ => return Ok(Self::default()),
        };

        let (name, descending) = match raw.strip_prefix('-') {
            Some(name) => (name, true),
            None => (raw, false),
        };

        ListingField::sortable(name)
            .map(|field| Self { field, descending })
            .ok_or_else(|| ValidationError::InvalidParameter(format!("Cannot sort by '{}'", name)))
    }

    fn canonical(&self) -> String {
        if self.descending {
            format!("-{}", self.field.param_name())
        } else {
            self.field.param_name().to_string()
        }
    }
}

/// Effective page and limit after coercion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl Pagination {
    /// Absent, non-integer or non-positive values fall back to the defaults.
    pub fn coerce(page: Option<&str>, limit: Option<&str>, max_limit: i64) -> Self {
        let page = positive_int(page).unwrap_or(DEFAULT_PAGE);
        let limit = positive_int(limit).unwrap_or(DEFAULT_LIMIT).min(max_limit.max(1));
        Self { page, limit }
    }

    pub fn from_params(params: &HashMap<String, String>, max_limit: i64) -> Self {
        Self::coerce(
            params.get("page").map(String::as_str),
            params.get("limit").map(String::as_str),
            max_limit,
        )
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

fn positive_int(raw: Option<&str>) -> Option<i64> {
    raw.and_then(|raw| raw.trim().parse::<i64>().ok())
        .filter(|n| *n > 0)
}

#[derive(Debug, Clone, PartialEq)]
pub struct ListingQuery {
    pub filters: Vec<Filter>,
    pub sort: SortSpec,
    pub pagination: Pagination,
}

impl ListingQuery {
    pub fn from_params(
        params: &HashMap<String, String>,
        max_limit: i64,
    ) -> Result<Self, ValidationError> {
        let mut filters = Vec::new();

        for field in ListingField::TEXT {
            if let Some(value) = non_empty(params, field.param_name()) {
                filters.push(Filter::new(field, FilterOp::Eq, FilterValue::Text(value.to_string())));
            }
        }

        for field in ListingField::NUMERIC {
            let ranges: Vec<Filter> = FilterOp::RANGE
                .into_iter()
                .filter_map(|op| {
                    let raw = non_empty(params, &format!("{}[{}]", field.param_name(), op.suffix()))?;
                    parse_number(raw).map(|n| Filter::new(field, op, FilterValue::Number(n)))
                })
                .collect();

            if !ranges.is_empty() {
                filters.extend(ranges);
            } else if let Some(n) = non_empty(params, field.param_name()).and_then(parse_number) {
                filters.push(Filter::new(field, FilterOp::Eq, FilterValue::Number(n)));
            }
        }

        for op in FilterOp::RANGE {
            let name = format!("{}[{}]", ListingField::AvailableFrom.param_name(), op.suffix());
            if let Some(date) = non_empty(params, &name).and_then(parse_date) {
                filters.push(Filter::new(ListingField::AvailableFrom, op, FilterValue::Date(date)));
            }
        }

        match non_empty(params, ListingField::IsVerified.param_name()) {
            Some("true") => filters.push(Filter::new(ListingField::IsVerified, FilterOp::Eq, FilterValue::Bool(true))),
            Some("false") => filters.push(Filter::new(ListingField::IsVerified, FilterOp::Eq, FilterValue::Bool(false))),
            _ => {}
        }

        if let Some(list) = non_empty(params, "amenities").and_then(split_list) {
            filters.push(Filter::new(ListingField::Amenities, FilterOp::All, FilterValue::List(list)));
        }
        if let Some(list) = non_empty(params, "tags").and_then(split_list) {
            filters.push(Filter::new(ListingField::Tags, FilterOp::Any, FilterValue::List(list)));
        }

        Ok(Self {
            filters,
            sort: SortSpec::parse(params.get("sort").map(String::as_str))?,
            pagination: Pagination::from_params(params, max_limit),
        })
    }

    /// Every effective parameter, keyed by its query-string name.
    ///
    /// Ordering comes from the map, so two queries with the same effective
    /// parameters produce identical maps regardless of input order.
    pub fn canonical_params(&self) -> BTreeMap<String, String> {
        let mut params: BTreeMap<String, String> = self
            .filters
            .iter()
            .map(|filter| (filter.param_name(), filter.value.canonical()))
            .collect();

        params.insert("sort".to_string(), self.sort.canonical());
        params.insert("page".to_string(), self.pagination.page.to_string());
        params.insert("limit".to_string(), self.pagination.limit.to_string());
        params
    }
}

fn non_empty<'a>(params: &'a HashMap<String, String>, name: &str) -> Option<&'a str> {
    params
        .get(name)
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
}

fn parse_number(raw: &str) -> Option<f64> {
    raw.parse::<f64>().ok().filter(|n| n.is_finite())
}

fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(date) = DateTime::parse_from_rfc3339(raw) {
        return Some(date.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Sorted and de-duplicated, so list order never fragments the cache.
fn split_list(raw: &str) -> Option<Vec<String>> {
    let items: BTreeSet<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect();

    if items.is_empty() {
        None
    } else {
        Some(items.into_iter().collect())
    }
}
