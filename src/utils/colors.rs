/// ANSI color helper utilities for terminal output.
pub const RESET: &str = "\x1b[0m";

pub const GREY: &str = "\x1b[90m";
pub const GREEN: &str = "\x1b[32m";
pub const YELLOW: &str = "\x1b[33m";
pub const CYAN: &str = "\x1b[36m";

use crate::models::Direction;

/// IN → green, OUT → yellow
pub fn color_for_direction(direction: Direction) -> &'static str {
    match direction {
        Direction::In => GREEN,
        Direction::Out => YELLOW,
    }
}
