//! `internal:default_style`: the stock look of the main window.
//!
//! Replaces the bare main window with one showing the menu frame as a
//! centered column over a shaded backdrop, and fills the frame's header
//! and footer.
//!
//! ```text
//! ▒▒▒▒▒▒┌──────────────────────┐▒▒▒▒▒▒
//! ▒▒▒▒▒▒│        KIOSK         │▒▒▒▒▒▒
//! ▒▒▒▒▒▒│  A terminal kiosk    │▒▒▒▒▒▒
//! ▒▒▒▒▒▒│     [ menu 40% ]     │▒▒▒▒▒▒
//! ▒▒▒▒▒▒│ kiosk v0.3.0 • url   │▒▒▒▒▒▒
//! ▒▒▒▒▒▒└──────────────────────┘▒▒▒▒▒▒
//! ```

// Rust guideline compliant 2026-02

use std::rc::Rc;

use anyhow::Result;
use crossterm::event::KeyEvent;
use ratatui::layout::Constraint;

use crate::constants::{
    BACKGROUND_FILL, HOMEPAGE, STYLED_BODY_WIDTH_PCT, STYLED_FRAME_WIDTH_PCT, VERSION,
};
use crate::plugin::{Control, Plugin};
use crate::tui::render_tree::{ParagraphAlignment, ParagraphProps, StyledSpan, WidgetProps};
use crate::tui::{
    Extent, HAlign, MenuFrame, OverlayGeometry, RenderNode, SpanColor, SpanStyle, StyledContent,
    VAlign, View,
};
use crate::wm::{Content, StyleChoice, WindowFlags, WindowSpec};

/// Horizontal padding between the backdrop and the frame, in cells.
const FRAME_PADDING: u16 = 2;

fn centered(lines: Vec<StyledContent>) -> RenderNode {
    let mut node = RenderNode::paragraph(lines);
    if let RenderNode::Widget {
        props: Some(WidgetProps::Paragraph(ParagraphProps { alignment, .. })),
        ..
    } = &mut node
    {
        *alignment = ParagraphAlignment::Center;
    }
    node
}

fn span(text: &str, style: SpanStyle) -> StyledSpan {
    StyledSpan {
        text: text.to_string(),
        style,
    }
}

fn header() -> RenderNode {
    let cyan = SpanStyle::fg(SpanColor::Cyan);
    let title = SpanStyle {
        bold: true,
        ..cyan
    };
    centered(vec![
        StyledContent::Plain(String::new()),
        StyledContent::styled("KIOSK", title),
        StyledContent::Styled(vec![
            span("A terminal ", SpanStyle::default()),
            span("Ki", cyan),
            span("osk shell", SpanStyle::default()),
        ]),
        StyledContent::Plain(String::new()),
    ])
}

fn footer() -> RenderNode {
    centered(vec![
        StyledContent::Plain(String::new()),
        StyledContent::Plain(format!("kiosk v{VERSION} \u{2022} {HOMEPAGE}")),
        StyledContent::Plain(String::new()),
    ])
}

/// The menu frame as a padded column over a filled backdrop.
struct StyledFrame {
    frame: Rc<MenuFrame>,
}

impl View for StyledFrame {
    fn render(&self) -> RenderNode {
        let padded = RenderNode::columns(vec![
            (Constraint::Length(FRAME_PADDING), RenderNode::empty()),
            (Constraint::Min(0), self.frame.render()),
            (Constraint::Length(FRAME_PADDING), RenderNode::empty()),
        ]);
        RenderNode::Overlay {
            top: Box::new(padded),
            bottom: Box::new(RenderNode::fill(BACKGROUND_FILL)),
            geometry: OverlayGeometry {
                align: HAlign::Center,
                width: Extent::Relative(STYLED_FRAME_WIDTH_PCT),
                valign: VAlign::Middle,
                height: Extent::Relative(100),
            },
        }
    }

    fn handle_key(&self, key: &KeyEvent) -> bool {
        self.frame.handle_key(key)
    }
}

/// Default style plugin.
#[derive(Debug)]
pub struct DefaultStyle {
    ctl: Control,
}

/// [`BuiltinFactory`](crate::plugin::BuiltinFactory) for this plugin.
pub fn factory(ctl: Control) -> Box<dyn Plugin> {
    Box::new(DefaultStyle { ctl })
}

impl Plugin for DefaultStyle {
    fn on_ui_create(&mut self) -> Result<()> {
        let ui = self.ctl.internals();

        // reopen the frame in a styled main window
        self.ctl.window_close_all();
        let styled = StyledFrame {
            frame: Rc::clone(&ui.frame),
        };
        self.ctl.window_make(
            WindowSpec::new(Content::view(styled))
                .flags(WindowFlags::BASIC)
                .style(StyleChoice::None),
            true,
        );

        ui.frame.set_body_width(Some(STYLED_BODY_WIDTH_PCT));
        ui.frame.set_header(Some(header()));
        ui.frame.set_footer(Some(footer()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::plugin::Core;
    use crate::process::SystemRunner;
    use crate::runtime::Scheduler;
    use crate::wm::WindowManager;

    #[test]
    fn test_styles_main_window() {
        let sched = Scheduler::new().expect("Should build scheduler");
        let config = Config::with_data_dir(std::env::temp_dir().join("kiosk-style-tests"));
        let core = Core::new(WindowManager::new(), sched, Rc::new(SystemRunner), config);
        let bare = core.skeleton().main_window;

        let mut plugin = factory(Control::new(&core, "internal:default_style"));
        plugin.on_ui_create().expect("Should style");

        let wm = core.wm();
        assert!(!wm.is_open(bare));
        assert_eq!(wm.children(wm.root()).len(), 1);

        let RenderNode::Overlay {
            bottom, geometry, ..
        } = wm.render()
        else {
            panic!("Expected the framed overlay");
        };
        assert_eq!(*bottom, RenderNode::fill(BACKGROUND_FILL));
        assert_eq!(geometry.width, Extent::Relative(STYLED_FRAME_WIDTH_PCT));

        let text = format!("{:?}", core.screen().current());
        assert!(text.contains("KIOSK"));
        assert!(text.contains(&format!("kiosk v{VERSION}")));
    }
}
