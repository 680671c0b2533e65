use crate::reading::{Location, LocationType};

/// Lower-case, dash-separated id derived from a display name.
pub fn slugify(name: &str) -> String {
    name.split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .map(str::to_ascii_lowercase)
        .collect::<Vec<_>>()
        .join("-")
}

/// Ports and routes monitored out of the box.
pub fn default_locations() -> Vec<Location> {
    [
        ("Los Angeles Port", LocationType::Port, 33.7406, -118.2775, "America/Los_Angeles"),
        ("New York Harbor", LocationType::Port, 40.7128, -74.006, "America/New_York"),
        ("Rotterdam Port", LocationType::Port, 51.9244, 4.4777, "Europe/Amsterdam"),
        ("Singapore Hub", LocationType::Port, 1.3521, 103.8198, "Asia/Singapore"),
        ("Pacific Northern Route", LocationType::Route, 55.0, -150.0, "Etc/UTC"),
        ("Gulf Coast Corridor", LocationType::Route, 29.0, -90.0, "America/Chicago"),
    ]
    .into_iter()
    .map(|(name, location_type, latitude, longitude, timezone)| Location {
        id: slugify(name),
        name: name.to_string(),
        latitude,
        longitude,
        location_type,
        timezone: timezone.to_string(),
    })
    .collect()
}
