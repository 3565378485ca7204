//! Coloured CLI output. Server logs go through tracing and are unstyled.

use std::sync::OnceLock;

use owo_colors::{OwoColorize, Style};

use crate::ui::Icons;

static COLOR: OnceLock<bool> = OnceLock::new();

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tone {
    Heading,
    Good,
    Bad,
    Caution,
    Accent,
    Muted,
}

impl Tone {
    fn style(self) -> Style {
        match self {
            Tone::Heading => Style::new().cyan().bold(),
            Tone::Good => Style::new().green().bold(),
            Tone::Bad => Style::new().red().bold(),
            Tone::Caution => Style::new().yellow().bold(),
            Tone::Accent => Style::new().magenta(),
            Tone::Muted => Style::new().white().dimmed(),
        }
    }
}

/// Colour only on a terminal, and never when `NO_COLOR` is set
fn color_enabled() -> bool {
    *COLOR.get_or_init(|| {
        let no_color = std::env::var_os("NO_COLOR").is_some_and(|v| !v.is_empty());
        !no_color && console::Term::stdout().is_term()
    })
}

fn paint_with(enabled: bool, tone: Tone, text: &str) -> String {
    if enabled {
        text.style(tone.style()).to_string()
    } else {
        text.to_string()
    }
}

fn paint(tone: Tone, text: &str) -> String {
    paint_with(color_enabled(), tone, text)
}

pub fn header(text: &str) {
    println!("{} {}", Icons::ROCKET, paint(Tone::Heading, text));
}

pub fn success(label: &str) {
    println!("{} {}", Icons::CHECK, paint(Tone::Good, label));
}

pub fn error(label: &str) {
    eprintln!("{} {}", Icons::CROSS, paint(Tone::Bad, label));
}

pub fn warn(label: &str) {
    eprintln!("{} {}", Icons::WARN, paint(Tone::Caution, label));
}

pub fn info(icon: &str, label: &str, value: &str) {
    println!(
        "{} {}: {}",
        paint(Tone::Accent, icon),
        paint(Tone::Muted, label),
        value
    );
}

pub fn section(title: &str) {
    println!();
    println!("━{}━", paint(Tone::Heading, title));
}

pub fn dim(text: &str) -> String {
    paint(Tone::Muted, text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_output_is_untouched() {
        assert_eq!(paint_with(false, Tone::Bad, "Provisioning failed"), "Provisioning failed");
    }

    #[test]
    fn test_colored_output_wraps_text() {
        let painted = paint_with(true, Tone::Good, "Table ready");
        assert!(painted.contains("Table ready"));
        assert!(painted.starts_with('\u{1b}'));
    }
}
