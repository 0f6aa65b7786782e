//! Heuristic check for whether an address is specific enough to hand to a
//! map application.

const NAVIGABLE_KEYWORDS: &[&str] = &[
  "street", "avenue", "road", "boulevard", "highway", "lane", "drive", "airport",
  "terminal", "plaza", "center",
];

/// A value is navigable if it carries a digit, a comma separating
/// locality parts, or one of [`NAVIGABLE_KEYWORDS`]. Bare place names are not.
pub fn is_navigable(address: &str) -> bool {
  let address = address.trim();
  if address.is_empty() {
    return false;
  }
  if address.contains(',') || address.chars().any(|c| c.is_ascii_digit()) {
    return true;
  }
  let lower = address.to_lowercase();
  NAVIGABLE_KEYWORDS.iter().any(|keyword| lower.contains(keyword))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn street_addresses() {
    assert!(is_navigable("123 Main Street, Budapest"));
    assert!(is_navigable("Rua Augusta 24"));
    assert!(is_navigable("Vienna, Austria"));
  }

  #[test]
  fn keywords_without_digits() {
    assert!(is_navigable("Munich Airport"));
    assert!(is_navigable("Abbey road"));
    assert!(is_navigable("ROCKEFELLER CENTER"));
  }

  #[test]
  fn bare_place_names() {
    assert!(!is_navigable("Downtown"));
    assert!(!is_navigable("Munich"));
    assert!(!is_navigable("   "));
  }
}
