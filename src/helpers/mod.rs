pub mod http;
pub mod ingest;
pub mod picker;

use self::picker::Picker;
use anyhow::{Context, Result, bail};

/// Wrapper around the `termenu` picker. Converts the supplied items into
/// `String`s so callers do not have to worry about ownership.
pub fn choose_one<S: ToString>(title: &str, items: Vec<S>) -> Result<String> {
    let display_items: Vec<String> = items.into_iter().map(|s| s.to_string()).collect();
    if display_items.is_empty() {
        bail!("Nothing to choose for '{title}'");
    }
    let picker = Picker::new(title.to_string(), display_items);
    match picker.invoke().context("menu failed")? {
        Some(choice) => Ok(choice),
        None => bail!("No selection made"),
    }
}

/// Reasonable arch options per distro, in the spelling the cache names use.
pub fn arch_options_for(distro: &str) -> Vec<&'static str> {
    match distro {
        "ubuntu" => vec!["amd64", "arm64", "ppc64el", "s390x", "i386"],
        "debian" => vec!["amd64", "arm64"],
        _ => vec!["amd64", "x86_64", "arm64"],
    }
}
