/// Default lines per page before a form-feed newline is emitted to the
/// device. Overridable per-server via `--lines-per-page` (spec §6's
/// `lines_per_page` constant, promoted to a configuration default).
pub const DEFAULT_LINES_PER_PAGE: u32 = 5;

/// Default billed cost per page. Overridable per-server via
/// `--page-price` (spec §6's `page_price` constant, promoted to a
/// configuration default).
pub const DEFAULT_PAGE_PRICE: f64 = 0.05;

/// Maximum length of one wire-protocol line, in bytes.
pub const MAX_CANON: usize = 256;
