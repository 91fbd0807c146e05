/// Calculation-details parsing and formatting.
pub mod details;
/// League mutations.
pub mod league_service;
/// Raw table loading.
pub mod loader;
/// Per-event delta normalization.
pub mod normalizer;
/// Team composition rules.
pub mod roster;
/// Per-event player scoring.
pub mod scoring_service;
/// Season reference data and store bootstrap.
pub mod season;
/// Standings and other read-side queries.
pub mod standings_service;
