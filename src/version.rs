const fn build_version(overridden: Option<&'static str>) -> &'static str {
    match overridden {
        Some(val) => val,
        None => env!("CARGO_PKG_VERSION"),
    }
}

/// Release version, overridable at build time with `SCRAPEWATCH_VERSION`.
pub const VERSION: &str = build_version(option_env!("SCRAPEWATCH_VERSION"));

pub fn banner() -> String {
    format!("{} {VERSION}", env!("CARGO_PKG_NAME"))
}
