//! Static IATA code to street address table for commonly travelled airports.

use std::sync::LazyLock;

use regex::Regex;

static PARENTHESISED_CODE: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"\(([A-Za-z]{3})\)").expect("invalid regex"));

fn lookup(code: &str) -> Option<&'static str> {
  let address = match code {
    "AMS" => "Evert van de Beekstraat 202, 1118 CP Schiphol, Netherlands",
    "ARN" => "Stockholm Arlanda Airport, 190 45 Stockholm-Arlanda, Sweden",
    "ATH" => "Athens International Airport, Attiki Odos, 190 04 Spata, Greece",
    "ATL" => "6000 N Terminal Pkwy, Atlanta, GA 30320, USA",
    "BCN" => "Aeropuerto de Barcelona-El Prat, 08820 El Prat de Llobregat, Spain",
    "BER" => "Willy-Brandt-Platz, 12529 Schönefeld, Germany",
    "BOS" => "1 Harborside Dr, Boston, MA 02128, USA",
    "BRU" => "Leopoldlaan, 1930 Zaventem, Belgium",
    "BUD" => "Budapest Ferenc Liszt International Airport, 1185 Budapest, Hungary",
    "CDG" => "Aéroport Paris-Charles de Gaulle, 95700 Roissy-en-France, France",
    "CPH" => "Lufthavnsboulevarden 6, 2770 Kastrup, Denmark",
    "DFW" => "2400 Aviation Dr, DFW Airport, TX 75261, USA",
    "DOH" => "Hamad International Airport, Doha, Qatar",
    "DUB" => "Dublin Airport, Collinstown, Co. Dublin, K67 F2K5, Ireland",
    "DXB" => "Dubai International Airport, Al Garhoud, Dubai, United Arab Emirates",
    "EWR" => "3 Brewster Rd, Newark, NJ 07114, USA",
    "FCO" => "Via dell'Aeroporto di Fiumicino, 00054 Fiumicino RM, Italy",
    "FRA" => "Frankfurt Airport, 60547 Frankfurt am Main, Germany",
    "HEL" => "Lentäjäntie 3, 01530 Vantaa, Finland",
    "HKG" => "1 Sky Plaza Rd, Chek Lap Kok, Hong Kong",
    "HND" => "Hanedakuko, Ota City, Tokyo 144-0041, Japan",
    "IST" => "Tayakadın, Terminal Caddesi No:1, 34283 Arnavutköy/İstanbul, Turkey",
    "JFK" => "Queens, NY 11430, USA",
    "LAX" => "1 World Way, Los Angeles, CA 90045, USA",
    "LGW" => "Gatwick Airport, Horley, Gatwick RH6 0NP, United Kingdom",
    "LHR" => "Heathrow Airport, Longford TW6, United Kingdom",
    "LIS" => "Alameda das Comunidades Portuguesas, 1700-111 Lisboa, Portugal",
    "MAD" => "Av de la Hispanidad, s/n, 28042 Madrid, Spain",
    "MIA" => "2100 NW 42nd Ave, Miami, FL 33142, USA",
    "MUC" => "Nordallee 25, 85356 München-Flughafen, Germany",
    "MXP" => "21010 Ferno, Province of Varese, Italy",
    "NRT" => "1-1 Furugome, Narita, Chiba 282-0004, Japan",
    "ORD" => "10000 W O'Hare Ave, Chicago, IL 60666, USA",
    "ORY" => "Aéroport de Paris-Orly, 94390 Orly, France",
    "OSL" => "Edvard Munchs veg, 2061 Gardermoen, Norway",
    "PRG" => "Aviatická, 161 08 Praha 6, Czechia",
    "SEA" => "17801 International Blvd, Seattle, WA 98158, USA",
    "SFO" => "San Francisco, CA 94128, USA",
    "SIN" => "Airport Blvd, Singapore",
    "SYD" => "Sydney NSW 2020, Australia",
    "TLV" => "Ben Gurion Airport, 7015001, Israel",
    "VIE" => "1300 Schwechat, Austria",
    "WAW" => "Żwirki i Wigury 1, 00-906 Warszawa, Poland",
    "YYZ" => "6301 Silver Dart Dr, Mississauga, ON L5P 1B2, Canada",
    "ZRH" => "8058 Zürich-Flughafen, Switzerland",
    _ => return None,
  };
  Some(address)
}

/// Pull a three-letter code out of values like `"BUD"` or
/// `"Budapest Liszt Ferenc (BUD)"`.
fn airport_code(raw: &str) -> Option<String> {
  let raw = raw.trim();
  if raw.len() == 3 && raw.chars().all(|c| c.is_ascii_alphabetic()) {
    return Some(raw.to_ascii_uppercase());
  }
  PARENTHESISED_CODE
    .captures(raw)
    .map(|caps| caps[1].to_ascii_uppercase())
}

/// The navigable address of `airport`, with `terminal` appended when known.
/// Unknown codes resolve to `None`.
pub fn resolve_airport(airport: &str, terminal: Option<&str>) -> Option<String> {
  let address = lookup(&airport_code(airport)?)?;
  let terminal = terminal.map(str::trim).filter(|t| !t.is_empty());
  Some(match terminal {
    Some(t) => {
      let t = strip_terminal_word(t);
      format!("{address}, Terminal {t}")
    }
    None => address.to_owned(),
  })
}

fn strip_terminal_word(terminal: &str) -> &str {
  match terminal.get(..8) {
    Some(head) if head.eq_ignore_ascii_case("terminal") => terminal[8..].trim_start(),
    _ => terminal,
  }
}
