//! Best-effort phone number normalisation for tap-to-call.
//!
//! This is a heuristic, not a numbering-plan parser: a local number whose
//! digits happen to begin with a country code and are long enough will be
//! wrongly internationalised, and international numbers written without a
//! prefix whose country is missing from [`COUNTRY_CODES`] are left alone.

/// Country calling codes recognised without a leading `+` or `00`. Ordered
/// longest first so that e.g. `353` wins over `35`.
const COUNTRY_CODES: &[&str] = &[
  "212", "213", "216", "234", "254", "255", "256", "351", "352", "353", "354", "356",
  "357", "358", "359", "370", "371", "372", "380", "381", "385", "386", "420", "421",
  "852", "853", "886", "961", "962", "965", "966", "971", "972", "974", "20", "27",
  "30", "31", "32", "33", "34", "36", "39", "40", "41", "43", "44", "45", "46", "47",
  "48", "49", "51", "52", "53", "54", "55", "56", "57", "58", "60", "61", "62", "63",
  "64", "65", "66", "81", "82", "84", "86", "90", "91", "92", "94", "98", "1", "7",
];

/// Digits beyond the country code needed before a number is treated as a
/// full international number.
const MIN_SUBSCRIBER_DIGITS: usize = 6;

pub fn normalize_phone(raw: &str) -> String {
  let trimmed = raw.trim();
  if trimmed.starts_with('+') {
    return trimmed.to_owned();
  }
  if let Some(rest) = trimmed.strip_prefix("00") {
    return format!("+{rest}");
  }

  let digits: String = trimmed.chars().filter(char::is_ascii_digit).collect();
  let international = COUNTRY_CODES
    .iter()
    .find(|code| digits.starts_with(*code))
    .is_some_and(|code| digits.len() > code.len() + MIN_SUBSCRIBER_DIGITS);

  if international { format!("+{trimmed}") } else { trimmed.to_owned() }
}
