// NFL team codes. Team-defense records use these as their player id.

/// Current franchise abbreviations.
pub const NFL_TEAM_CODES: [&str; 32] = [
    "ARI", "ATL", "BAL", "BUF", "CAR", "CHI", "CIN", "CLE", "DAL", "DEN", "DET", "GB", "HOU",
    "IND", "JAX", "KC", "LAC", "LAR", "LV", "MIA", "MIN", "NE", "NO", "NYG", "NYJ", "PHI", "PIT",
    "SEA", "SF", "TB", "TEN", "WAS",
];

/// Whether `id` names a team (and therefore a team-defense player).
pub fn is_team_code(id: &str) -> bool {
    NFL_TEAM_CODES.contains(&id)
}

/// Map a provider's team abbreviation onto the league's. Only Washington
/// differs between sources.
pub fn normalize_team_code(code: &str) -> String {
    let code = code.trim().to_uppercase();
    match code.as_str() {
        "WSH" => "WAS".to_string(),
        _ => code,
    }
}
