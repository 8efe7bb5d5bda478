//! Deterministic extraction over unstructured text and HTML.
//!
//! - [`signals`]: title, description, logo and leading text from a homepage
//! - [`industry`]: keyword-table industry classifier
//! - [`names`]: legal-entity company names mined from prose
//!
//! Everything here is synchronous and performs no I/O.

pub mod industry;
pub mod names;
pub mod signals;

pub use industry::{DEFAULT_INDUSTRY, IndustryClassifier, infer_industry};
pub use names::extract as extract_company_names;
pub use signals::{
    DEFAULT_IMAGE_EXTENSION, IMAGE_EXTENSIONS, LogoCandidate, PageSignals, extract_signals,
    image_extension, is_logo_like, leading_text, logo, title_description,
};
