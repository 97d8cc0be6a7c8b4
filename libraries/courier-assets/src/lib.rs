//! Media asset resolution for release packages
//!
//! For each track the resolver scans a set of **slots** (an extension plus a
//! source folder), picks the first file a [`TitleMatcher`] accepts, rejects
//! undersized covers and copies the rest into the track's package folder.
//!
//! # Example
//!
//! ```rust,no_run
//! use courier_assets::{AssetResolver, FuzzyMatcher};
//! use courier_core::{BatchContext, MetadataRecord};
//!
//! let batch = BatchContext::today("/srv/ddex");
//! let resolver = AssetResolver::with_search_root("/srv/ddex".as_ref())
//!     .with_matcher(Box::new(FuzzyMatcher::new(85)));
//!
//! let record = MetadataRecord::new("Amazing Grace", "US123", "00012345");
//! let bundle = resolver.resolve(&record, &batch)?;
//! for missing in &bundle.missing {
//!     eprintln!("{missing}");
//! }
//! # Ok::<(), courier_assets::AssetError>(())
//! ```

mod cover;
pub mod error;
mod hash;
mod matcher;
mod resolver;

pub use cover::{image_dimensions, validate_image_size, MIN_COVER_PX};
pub use error::{AssetError, Result};
pub use hash::{bytes_digest, file_digest};
pub use matcher::{
    normalize_title, ExactStemMatcher, FuzzyMatcher, MatcherKind, SubstringMatcher, TitleMatcher,
};
pub use resolver::{
    copy_preserving_times, standard_slots, AssetBundle, AssetResolver, AssetSlot, FailedAsset,
    MissingAsset, RejectedAsset, ResolvedAsset,
};
