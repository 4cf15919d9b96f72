//! Domain models.

pub mod item;
pub mod params;
pub mod slug;

pub use item::{CategoryRef, ContentItem, CustomFields, FieldValue, SerializedItem};
pub use params::{
    LISTING_PARAMS, ListingParams, OrderBy, ParamErrors, ParamSpec, ParamValue, SortOrder,
};
pub use slug::{CategorySlug, ListingConfig};
