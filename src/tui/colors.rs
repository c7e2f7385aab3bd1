//! Color constants for the terminal board interface.

use ratatui::style::Color;

// One accent per fixed category, mirroring the visual classes
// the category table declares.

/// Used for Bug cards
pub const DARK_RED: Color = Color::Rgb(114, 0, 0);
/// Used for New Feature cards
pub const DARK_GREEN: Color = Color::Rgb(0, 80, 0);
/// Used for Design cards
pub const DARK_PURPLE: Color = Color::Rgb(86, 60, 92);
/// Used for Documentation cards
pub const GOLD: Color = Color::Rgb(255, 215, 0);
