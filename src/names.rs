// names.rs

/// Known spelling differences between the crop table's state names and the
/// boundary file's `NAME_1` values.
const STATE_NAME_MAPPING: &[(&str, &str)] = &[
    ("Andaman and Nicobar Islands", "Andaman and Nicobar"),
    ("Telangana", "Telangana"),
    ("Dadra and Nagar Haveli", "Dadra and Nagar Haveli"),
    ("Daman and Diu", "Daman and Diu"),
];

/// Maps a crop-table state name onto the boundary file's spelling.
/// Names without an entry pass through unchanged.
pub fn map_state_name(name: &str) -> &str {
    STATE_NAME_MAPPING
        .iter()
        .find(|(from, _)| *from == name)
        .map(|(_, to)| *to)
        .unwrap_or(name)
}
