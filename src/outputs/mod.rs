//! Output generation: article JSON, the news index and the sitemap.
//!
//! # Submodules
//!
//! - [`json`]: Writes raw extraction files and processed articles
//! - [`indexes`]: Rebuilds `index.json` from the output directory
//! - [`sitemap`]: Renders `sitemap.xml` from the index
//!
//! # Output Structure
//!
//! ```text
//! output_dir/
//! ├── 20250819.json      # NewsArticle, or raw fallback
//! ├── 20250820.json
//! ├── index.json         # ["20250820.json", "20250819.json"]
//! └── raw/
//!     ├── 20250819.json  # [ParsedArticle, ...]
//!     └── 20250820.json
//! ```

pub mod indexes;
pub mod json;
pub mod sitemap;
