use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
pub enum PropertyType {
    Apartment,
    Villa,
    Bungalow,
    Studio,
    Penthouse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
pub enum Furnishing {
    Furnished,
    Unfurnished,
    Semi,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
pub enum ListedBy {
    Builder,
    Owner,
    Agent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum ListingType {
    Rent,
    Sale,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub state: Option<String>,
    pub city: Option<String>,
}

/// Writable attributes of a listing, shared by create payloads and stored rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingFields {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, rename = "type")]
    pub property_type: Option<PropertyType>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub location: Location,
    #[serde(default)]
    pub area_sq_ft: Option<f64>,
    #[serde(default)]
    pub bedrooms: Option<i64>,
    #[serde(default)]
    pub bathrooms: Option<i64>,
    #[serde(default)]
    pub amenities: Vec<String>,
    #[serde(default)]
    pub furnished: Option<Furnishing>,
    #[serde(default)]
    pub available_from: Option<DateTime<Utc>>,
    #[serde(default)]
    pub listed_by: Option<ListedBy>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub color_theme: Option<String>,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub is_verified: bool,
    #[serde(default)]
    pub listing_type: Option<ListingType>,
}

/// Partial update; every present field overwrites the stored one.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingPatch {
    pub id: Option<String>,
    pub title: Option<String>,
    #[serde(rename = "type")]
    pub property_type: Option<PropertyType>,
    pub price: Option<f64>,
    pub location: Option<Location>,
    pub area_sq_ft: Option<f64>,
    pub bedrooms: Option<i64>,
    pub bathrooms: Option<i64>,
    pub amenities: Option<Vec<String>>,
    pub furnished: Option<Furnishing>,
    pub available_from: Option<DateTime<Utc>>,
    pub listed_by: Option<ListedBy>,
    pub tags: Option<Vec<String>>,
    pub color_theme: Option<String>,
    pub rating: Option<f64>,
    pub is_verified: Option<bool>,
    pub listing_type: Option<ListingType>,
}

impl ListingPatch {
    pub fn apply(self, fields: &mut ListingFields) {
        if let Some(id) = self.id {
            fields.id = id;
        }
        if self.title.is_some() {
            fields.title = self.title;
        }
        if self.property_type.is_some() {
            fields.property_type = self.property_type;
        }
        if self.price.is_some() {
            fields.price = self.price;
        }
        if let Some(location) = self.location {
            fields.location = location;
        }
        if self.area_sq_ft.is_some() {
            fields.area_sq_ft = self.area_sq_ft;
        }
        if self.bedrooms.is_some() {
            fields.bedrooms = self.bedrooms;
        }
        if self.bathrooms.is_some() {
            fields.bathrooms = self.bathrooms;
        }
        if let Some(amenities) = self.amenities {
            fields.amenities = amenities;
        }
        if self.furnished.is_some() {
            fields.furnished = self.furnished;
        }
        if self.available_from.is_some() {
            fields.available_from = self.available_from;
        }
        if self.listed_by.is_some() {
            fields.listed_by = self.listed_by;
        }
        if let Some(tags) = self.tags {
            fields.tags = tags;
        }
        if self.color_theme.is_some() {
            fields.color_theme = self.color_theme;
        }
        if self.rating.is_some() {
            fields.rating = self.rating;
        }
        if let Some(is_verified) = self.is_verified {
            fields.is_verified = is_verified;
        }
        if self.listing_type.is_some() {
            fields.listing_type = self.listing_type;
        }
    }
}

/// Public view of a user embedded in other documents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: String,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            email: self.email.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    /// Store-internal key; never leaves the process.
    #[serde(skip)]
    pub row_id: i64,
    #[serde(flatten)]
    pub fields: ListingFields,
    pub created_by: UserSummary,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Listing {
    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.created_by.id == user_id
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteEntry {
    pub id: i64,
    pub property: Listing,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub id: i64,
    pub property: Option<Listing>,
    pub from_user: UserSummary,
    pub to_user: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

/// Paginated response body shared by every list endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultPage<T> {
    pub total: i64,
    pub page: i64,
    pub page_size: i64,
    pub items: Vec<T>,
}

impl<T> ResultPage<T> {
    pub fn new(total: i64, page: i64, items: Vec<T>) -> Self {
        Self {
            total,
            page,
            page_size: items.len() as i64,
            items,
        }
    }
}
