//! Listing analysis against a catalog reference price
//!
//! A listing is a snipe when it is priced at least `min_discount` below the
//! reference (0.3 = 30% under the Scryfall price).

use crate::models::Listing;
use serde::Serialize;

pub const DEFAULT_MIN_DISCOUNT: f64 = 0.3;

/// A listing with its discount relative to the reference price
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotatedListing {
    #[serde(flatten)]
    pub listing: Listing,
    /// Fraction below reference; negative when priced above it.
    /// None without a usable reference.
    pub discount: Option<f64>,
    pub snipe: bool,
}

/// Fraction `price` sits below `reference`
pub fn discount(price: f64, reference: f64) -> Option<f64> {
    if !reference.is_finite() || reference <= 0.0 || !price.is_finite() {
        return None;
    }
    Some(1.0 - price / reference)
}

pub fn annotate(listings: Vec<Listing>, reference: Option<f64>, min_discount: f64) -> Vec<AnnotatedListing> {
    listings
        .into_iter()
        .map(|listing| {
            let discount = reference.and_then(|r| discount(listing.price, r));
            AnnotatedListing {
                snipe: discount.is_some_and(|d| d >= min_discount),
                discount,
                listing,
            }
        })
        .collect()
}

/// Listings at least `min_discount` under the reference, biggest discount first
pub fn find_snipes(listings: &[Listing], reference: f64, min_discount: f64) -> Vec<AnnotatedListing> {
    let mut snipes: Vec<AnnotatedListing> = annotate(listings.to_vec(), Some(reference), min_discount)
        .into_iter()
        .filter(|annotated| annotated.snipe)
        .collect();
    snipes.sort_by(|a, b| {
        let a = a.discount.unwrap_or(0.0);
        let b = b.discount.unwrap_or(0.0);
        b.total_cmp(&a)
    });
    snipes
}
