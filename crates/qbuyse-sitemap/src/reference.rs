//! Read-only reference data: states, categories and static pages.
//!
//! Slugs are stored pre-computed; tests keep them in sync with
//! [`generate_slug`](crate::url::generate_slug).

use crate::types::{ChangeFrequency, Priority};

/// A state listings can be filtered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateInfo {
    /// Display name.
    pub name: &'static str,
    /// ISO 3166-2:IN subdivision code (without the `IN-` prefix).
    pub code: &'static str,
    /// URL slug.
    pub slug: &'static str,
}

/// A listing category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryInfo {
    /// Display name.
    pub name: &'static str,
    /// Stable numeric id as stored on posts.
    pub id: u16,
    /// URL slug.
    pub slug: &'static str,
}

/// A fixed page with its SEO hints.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StaticPageInfo {
    /// Path relative to the base URL (`""` is the home page).
    pub path: &'static str,
    /// Display name.
    pub name: &'static str,
    /// Sitemap priority.
    pub priority: Priority,
    /// Sitemap change frequency.
    pub changefreq: ChangeFrequency,
}

const fn state(name: &'static str, code: &'static str, slug: &'static str) -> StateInfo {
    StateInfo { name, code, slug }
}

const fn category(name: &'static str, id: u16, slug: &'static str) -> CategoryInfo {
    CategoryInfo { name, id, slug }
}

const fn page(
    path: &'static str,
    name: &'static str,
    priority: f32,
    changefreq: ChangeFrequency,
) -> StaticPageInfo {
    StaticPageInfo {
        path,
        name,
        priority: Priority::from_static(priority),
        changefreq,
    }
}

/// The 28 states of India.
pub const STATES: [StateInfo; 28] = [
    state("Andhra Pradesh", "AP", "andhra-pradesh"),
    state("Arunachal Pradesh", "AR", "arunachal-pradesh"),
    state("Assam", "AS", "assam"),
    state("Bihar", "BR", "bihar"),
    state("Chhattisgarh", "CT", "chhattisgarh"),
    state("Goa", "GA", "goa"),
    state("Gujarat", "GJ", "gujarat"),
    state("Haryana", "HR", "haryana"),
    state("Himachal Pradesh", "HP", "himachal-pradesh"),
    state("Jharkhand", "JH", "jharkhand"),
    state("Karnataka", "KA", "karnataka"),
    state("Kerala", "KL", "kerala"),
    state("Madhya Pradesh", "MP", "madhya-pradesh"),
    state("Maharashtra", "MH", "maharashtra"),
    state("Manipur", "MN", "manipur"),
    state("Meghalaya", "ML", "meghalaya"),
    state("Mizoram", "MZ", "mizoram"),
    state("Nagaland", "NL", "nagaland"),
    state("Odisha", "OR", "odisha"),
    state("Punjab", "PB", "punjab"),
    state("Rajasthan", "RJ", "rajasthan"),
    state("Sikkim", "SK", "sikkim"),
    state("Tamil Nadu", "TN", "tamil-nadu"),
    state("Telangana", "TG", "telangana"),
    state("Tripura", "TR", "tripura"),
    state("Uttar Pradesh", "UP", "uttar-pradesh"),
    state("Uttarakhand", "UT", "uttarakhand"),
    state("West Bengal", "WB", "west-bengal"),
];

/// The 16 listing categories.
pub const CATEGORIES: [CategoryInfo; 16] = [
    category("Mobiles", 1, "mobiles"),
    category("Electronics & Appliances", 2, "electronics-appliances"),
    category("Cars", 3, "cars"),
    category("Bikes", 4, "bikes"),
    category("Properties", 5, "properties"),
    category("Furniture", 6, "furniture"),
    category("Fashion", 7, "fashion"),
    category("Books, Sports & Hobbies", 8, "books-sports-hobbies"),
    category("Pets", 9, "pets"),
    category("Jobs", 10, "jobs"),
    category("Services", 11, "services"),
    category("Home & Garden", 12, "home-garden"),
    category("Kids & Baby", 13, "kids-baby"),
    category("Agriculture", 14, "agriculture"),
    category("Commercial Vehicles", 15, "commercial-vehicles"),
    category("Others", 16, "others"),
];

/// Fixed pages, highest priority first.
pub const STATIC_PAGES: [StaticPageInfo; 8] = [
    page("", "Home", 1.0, ChangeFrequency::Daily),
    page("browse", "Browse", 0.9, ChangeFrequency::Daily),
    page("post-ad", "Post an Ad", 0.6, ChangeFrequency::Monthly),
    page("about", "About", 0.5, ChangeFrequency::Monthly),
    page("contact", "Contact", 0.5, ChangeFrequency::Monthly),
    page("help", "Help", 0.4, ChangeFrequency::Monthly),
    page("privacy", "Privacy Policy", 0.3, ChangeFrequency::Yearly),
    page("terms", "Terms of Service", 0.3, ChangeFrequency::Yearly),
];

/// Find a state by slug, name or code (case-insensitive for name and code).
pub fn find_state(key: &str) -> Option<&'static StateInfo> {
    STATES.iter().find(|s| {
        s.slug == key || s.name.eq_ignore_ascii_case(key) || s.code.eq_ignore_ascii_case(key)
    })
}

/// Find a category by slug or display name.
pub fn find_category(key: &str) -> Option<&'static CategoryInfo> {
    CATEGORIES
        .iter()
        .find(|c| c.slug == key || c.name.eq_ignore_ascii_case(key))
}

/// Find a category by its numeric id.
pub fn category_by_id(id: u16) -> Option<&'static CategoryInfo> {
    CATEGORIES.iter().find(|c| c.id == id)
}
