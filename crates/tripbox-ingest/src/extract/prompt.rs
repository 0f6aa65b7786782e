use std::fmt::Write as _;

use tripbox_core::document::Category;

/// Context that sharpens the oracle's reading of ambiguous content.
#[derive(Debug, Clone, Default)]
pub struct ExtractionHints {
  pub file_name:     Option<String>,
  pub email_subject: Option<String>,
  pub sender:        Option<String>,
}

const PREAMBLE: &str = "\
You extract travel bookings from documents. A document may contain several \
bookings, for example the outbound and return legs of a round trip or a hotel \
stay plus a car rental. Report one entry per booking.

Reply with a single JSON object and nothing else:

{\"documents\": [{
  \"category\": one of the categories below,
  \"documentType\": short label such as \"Boarding Pass\" or \"Hotel Reservation\",
  \"title\": short human title such as \"BUD → TLV\" or \"Hotel Lux Lisbon\",
  \"subtitle\": optional secondary line,
  \"documentDate\": primary local date-time of the booking as YYYY-MM-DDTHH:MM:SS \
(departure, check-in, pickup, appointment or event start),
  \"details\": object of string values using the keys listed for the category
}]}

If the document contains no travel booking reply with {\"documents\": []}. \
Omit unknown values rather than guessing. Use IATA codes for airports.
";

/// The instruction text sent alongside every piece of content.
pub fn instructions(hints: &ExtractionHints) -> String {
  let mut prompt = String::from(PREAMBLE);

  prompt.push_str("\nCategories and their detail keys:\n");
  for category in Category::ALL {
    let _ = writeln!(prompt, "- {category}: {}", category.known_detail_keys().join(", "));
  }

  let context = [
    ("File name", &hints.file_name),
    ("Email subject", &hints.email_subject),
    ("Sender", &hints.sender),
  ];
  let mut header_written = false;
  for (label, value) in context {
    let Some(value) = value.as_deref().map(str::trim).filter(|v| !v.is_empty()) else {
      continue;
    };
    if !header_written {
      prompt.push_str("\nContext:\n");
      header_written = true;
    }
    let _ = writeln!(prompt, "{label}: {value}");
  }

  prompt
}
