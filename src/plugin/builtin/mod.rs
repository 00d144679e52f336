//! Built-in plugins, compiled into the binary.
//!
//! - `config_menu` - Configuration submenu with the RC/IR keymap editor
//! - `default_style` - header, footer and backdrop of the main window
//! - `system_menu` - System submenu (console, reset, reboot, power off)

// Rust guideline compliant 2026-02

pub mod config_menu;
pub mod default_style;
pub mod keymap_editor;
pub mod system_menu;

use super::BuiltinFactory;

/// Every built-in unit with its factory, in load order (by name).
#[must_use]
pub fn builtins() -> Vec<(&'static str, BuiltinFactory)> {
    vec![
        ("config_menu", config_menu::factory as BuiltinFactory),
        ("default_style", default_style::factory),
        ("system_menu", system_menu::factory),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtins_sorted_by_name() {
        let names: Vec<&str> = builtins().iter().map(|(name, _)| *name).collect();
        let mut sorted = names.clone();
        sorted.sort_unstable();
        assert_eq!(names, sorted);
        assert_eq!(names.len(), 3);
    }
}
