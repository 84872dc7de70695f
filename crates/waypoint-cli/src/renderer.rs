//! Terminal output.
//!
//! Core types format themselves as markdown; this module decides whether
//! that markdown is styled through termimad or printed verbatim.

use std::fmt;

use termimad::{
    crossterm::style::{Color, Stylize},
    MadSkin,
};

pub struct TerminalRenderer {
    rich_enabled: bool,
    skin: MadSkin,
}

impl TerminalRenderer {
    pub fn new(rich_enabled: bool) -> Self {
        let mut skin = MadSkin::default();
        skin.bold.set_fg(Color::Yellow);
        skin.italic.set_fg(Color::Magenta);
        skin.inline_code.set_bg(Color::AnsiValue(238));

        Self { rich_enabled, skin }
    }

    /// Print anything with a markdown `Display`.
    pub fn render(&self, content: &impl fmt::Display) {
        let markdown = content.to_string();
        if !self.rich_enabled {
            print!("{markdown}");
            return;
        }

        // Headers keep their hashes so ids stay visible.
        for line in markdown.lines() {
            if line.starts_with('#') {
                println!("{}", line.blue().bold());
            } else if line.starts_with("Error:") {
                println!("{}", line.red());
            } else {
                self.skin.print_inline(line);
                println!();
            }
        }
    }
}

impl Default for TerminalRenderer {
    fn default() -> Self {
        Self::new(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_renderer() {
        let renderer = TerminalRenderer::new(false);
        assert!(!renderer.rich_enabled);
    }

    #[test]
    fn test_default_is_rich() {
        assert!(TerminalRenderer::default().rich_enabled);
    }
}
