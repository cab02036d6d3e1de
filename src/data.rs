use serde::Deserialize;

/// A geographic position as stored in the buildings table: latitude first.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

/// Raw `coords` column. Newer rows hold an array of `[lat, lng]` pairs,
/// older rows hold `{lat, lng}` objects, and the table query path returns
/// the column as a JSON-encoded string wrapping either form.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RawCoords {
    Pairs(Vec<[f64; 2]>),
    Objects(Vec<LatLng>),
    Text(String),
}

/// One building row, immutable once fetched.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct BuildingRecord {
    pub name: String,
    #[serde(default)]
    pub coords: Option<RawCoords>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub info: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

pub const DEFAULT_TAG: &str = "blue";

impl BuildingRecord {
    /// Category tag used to group this building in the legend.
    pub fn tag(&self) -> &str {
        self.color.as_deref().unwrap_or(DEFAULT_TAG)
    }

    /// Normalizes whichever coords form the row carries into lat/lng points.
    /// Returns None when the row has no usable outline.
    pub fn outline(&self) -> Option<Vec<LatLng>> {
        normalize(self.coords.as_ref()?)
    }
}

fn normalize(raw: &RawCoords) -> Option<Vec<LatLng>> {
    let ring: Vec<LatLng> = match raw {
        RawCoords::Pairs(pairs) => pairs
            .iter()
            .map(|p| LatLng { lat: p[0], lng: p[1] })
            .collect(),
        RawCoords::Objects(points) => points.clone(),
        RawCoords::Text(json) => {
            // One level of quoting only
            let inner: RawCoords = serde_json::from_str(json).ok()?;
            if matches!(inner, RawCoords::Text(_)) {
                return None;
            }
            return normalize(&inner);
        }
    };
    (ring.len() >= 3).then_some(ring)
}

/// Legend display descriptor for a category.
#[derive(Clone, Debug, PartialEq)]
pub struct Descriptor {
    pub name: String,
    pub icon: &'static str,
}

/// Display name and icon for a tag. An explicit category wins; known campus
/// tags map to their scheme names; anything else becomes "<Tag> Buildings".
pub fn descriptor(tag: &str, category: Option<&str>) -> Descriptor {
    if let Some(cat) = category {
        if cat != "General" {
            return Descriptor {
                name: cat.to_string(),
                icon: "▣",
            };
        }
    }

    let (name, icon) = match tag {
        "blue" => ("Academic", "▣"),
        "green" => ("Sports", "♣"),
        "red" => ("Emergency", "♥"),
        "orange" => ("Living Quarters", "⌂"),
        "purple" => ("Food/Drink", "¤"),
        "#F7DC6F" => ("Misc", "◦"),
        _ => {
            let mut chars = tag.chars();
            let capitalized = match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            };
            return Descriptor {
                name: format!("{capitalized} Buildings"),
                icon: "▢",
            };
        }
    };
    Descriptor {
        name: name.to_string(),
        icon,
    }
}
