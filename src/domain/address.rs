use std::fmt;

/// Uppercase the street and abbreviate whole-word compass directions.
pub fn normalize_street(street: &str) -> String {
    street
        .split_whitespace()
        .map(|token| {
            let upper = token.to_uppercase();
            let (word, trailing) = match upper.strip_suffix(['.', ',']) {
                Some(stripped) => (stripped.to_string(), &upper[stripped.len()..]),
                None => (upper.clone(), ""),
            };
            let abbreviated = match word.as_str() {
                "NORTH" => "N",
                "SOUTH" => "S",
                "EAST" => "E",
                "WEST" => "W",
                other => other,
            };
            format!("{abbreviated}{trailing}")
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Lookup key shared by the location table and package destinations.
pub fn address_key(street: &str, zipcode: &str) -> String {
    format!("{} {}", normalize_street(street), zipcode.trim())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Address {
    pub street: String,
    pub city: String,
    pub state: String,
    pub zipcode: String,
}

impl Address {
    pub fn new(street: &str, city: &str, state: &str, zipcode: &str) -> Self {
        Self {
            street: normalize_street(street),
            city: city.trim().to_uppercase(),
            state: state.trim().to_uppercase(),
            zipcode: zipcode.trim().to_string(),
        }
    }

    pub fn key(&self) -> String {
        format!("{} {}", self.street, self.zipcode)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}, {}, {} {}",
            self.street, self.city, self.state, self.zipcode
        )
    }
}
