//! Declarative render tree: the "renderable" value the compositor publishes.
//!
//! Windows, menus and plugins describe what they want on screen as a
//! [`RenderNode`] tree; Rust interprets the tree into ratatui calls. Trees are
//! plain data (`Clone + PartialEq`), so two renders of the same window state
//! compare equal and tests can assert on composites directly.
//!
//! # Render Tree
//!
//! ```text
//! RenderNode
//!   ├── HSplit { constraints, children }
//!   ├── VSplit { constraints, children }
//!   ├── Centered { width_pct, height_pct, child }
//!   ├── Overlay { top, bottom, geometry }
//!   ├── Framed { block, child }
//!   └── Widget { widget_type, block, props }
//! ```
//!
//! # Flow
//!
//! ```text
//! Lua table → RenderNode::from_lua_table() ─┐
//! View::render() ───────────────────────────┴→ WindowManager → interpret_tree()
//! ```

// Rust guideline compliant 2026-02

use anyhow::{anyhow, bail, Result};
use mlua::{Table as LuaTable, Value as LuaValue};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};

use super::layout::{centered_rect, OverlayGeometry};

/// A node in the declarative render tree.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderNode {
    /// Horizontal split (children arranged left to right).
    HSplit {
        /// Layout constraints for each child.
        constraints: Vec<Constraint>,
        /// Child nodes.
        children: Vec<RenderNode>,
    },
    /// Vertical split (children arranged top to bottom).
    VSplit {
        /// Layout constraints for each child.
        constraints: Vec<Constraint>,
        /// Child nodes.
        children: Vec<RenderNode>,
    },
    /// Centered box taking a percentage of the parent.
    Centered {
        /// Width as percentage of parent.
        width_pct: u16,
        /// Height as percentage of parent.
        height_pct: u16,
        /// Child node rendered inside.
        child: Box<RenderNode>,
    },
    /// A layer floating over another tree.
    Overlay {
        /// The floating layer.
        top: Box<RenderNode>,
        /// Everything beneath the layer.
        bottom: Box<RenderNode>,
        /// Placement of the floating layer.
        geometry: OverlayGeometry,
    },
    /// A child wrapped in a border/title decoration.
    Framed {
        /// Decoration.
        block: BlockConfig,
        /// Decorated content.
        child: Box<RenderNode>,
    },
    /// Leaf widget node.
    Widget {
        /// Which Rust widget to render.
        widget_type: WidgetType,
        /// Optional block (border/title) wrapping the widget.
        block: Option<BlockConfig>,
        /// Widget-specific props.
        props: Option<WidgetProps>,
    },
}

/// Generic UI widget types.
///
/// Lua refers to these by string name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WidgetType {
    /// Selectable list with optional headers.
    List,
    /// Static styled text block.
    Paragraph,
    /// Text input with prompt lines.
    Input,
    /// A row of push buttons.
    Buttons,
    /// Area filled with a repeated symbol (backdrops).
    Fill,
    /// Empty placeholder, renders just the block border/title.
    Empty,
}

/// Widget-specific props.
#[derive(Debug, Clone, PartialEq)]
pub enum WidgetProps {
    /// List widget props.
    List(ListProps),
    /// Paragraph widget props.
    Paragraph(ParagraphProps),
    /// Input widget props.
    Input(InputProps),
    /// Button row props.
    Buttons(ButtonsProps),
    /// Fill props.
    Fill(FillProps),
}

// =============================================================================
// Generic Widget Props
// =============================================================================

/// Props for a generic list widget.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ListProps {
    /// Items to display.
    pub items: Vec<ListItemProps>,
    /// Index of the selected item among selectable (non-header) items.
    pub selected: Option<usize>,
    /// Style applied to the highlighted item.
    pub highlight_style: Option<SpanStyle>,
    /// Symbol prepended to the highlighted item (e.g., "> ").
    pub highlight_symbol: Option<String>,
}

/// A single item in a generic list.
#[derive(Debug, Clone, PartialEq)]
pub struct ListItemProps {
    /// The display content (plain string or styled spans).
    pub content: StyledContent,
    /// If true, this item is a non-selectable header (rendered dim+bold).
    pub header: bool,
    /// Optional per-item style override.
    pub style: Option<SpanStyle>,
}

impl ListItemProps {
    /// Plain selectable item.
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            content: StyledContent::Plain(text.into()),
            header: false,
            style: None,
        }
    }
}

/// Props for a paragraph widget.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParagraphProps {
    /// Lines of styled content.
    pub lines: Vec<StyledContent>,
    /// Text alignment.
    pub alignment: ParagraphAlignment,
    /// Whether to wrap long lines.
    pub wrap: bool,
}

/// Paragraph text alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParagraphAlignment {
    /// Left-aligned text.
    #[default]
    Left,
    /// Center-aligned text.
    Center,
    /// Right-aligned text.
    Right,
}

/// Props for a text input widget.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct InputProps {
    /// Prompt shown before the value.
    pub prompt: Option<StyledContent>,
    /// Current input value.
    pub value: String,
    /// Whether the input currently has focus (cursor is drawn).
    pub focused: bool,
}

/// Props for a row of buttons.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ButtonsProps {
    /// Buttons, left to right.
    pub buttons: Vec<ButtonProps>,
    /// Index of the focused button, if the row has focus.
    pub focused: Option<usize>,
    /// Placement of the row.
    pub alignment: ParagraphAlignment,
}

/// A single push button.
#[derive(Debug, Clone, PartialEq)]
pub struct ButtonProps {
    /// Button label.
    pub label: String,
    /// Label style.
    pub style: Option<SpanStyle>,
    /// Disabled buttons are drawn dim and never activate.
    pub disabled: bool,
}

impl ButtonProps {
    /// Enabled button with the default style.
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            style: None,
            disabled: false,
        }
    }

    fn text(&self) -> String {
        format!("[ {} ]", self.label)
    }
}

/// Props for a fill widget.
#[derive(Debug, Clone, PartialEq)]
pub struct FillProps {
    /// Symbol repeated over the whole area.
    pub symbol: String,
    /// Symbol style.
    pub style: Option<SpanStyle>,
}

/// Configuration for a ratatui Block (border + title).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BlockConfig {
    /// Title drawn top-left.
    pub title: Option<StyledContent>,
    /// Title drawn top-right.
    pub title_right: Option<StyledContent>,
    /// Which borders are drawn.
    pub borders: BorderStyle,
    /// Line weight of the borders.
    pub weight: LineWeight,
    /// Border styling (color, bold, etc.). Applied via `Block::border_style()`.
    pub border_style: Option<SpanStyle>,
}

/// Border style for blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BorderStyle {
    /// No borders.
    None,
    /// Only a rule along the top edge.
    Top,
    /// Borders on all sides.
    #[default]
    All,
}

/// Border line weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineWeight {
    /// Single light line.
    #[default]
    Light,
    /// Double line, used for emphasis.
    Double,
}

// =============================================================================
// Styled Content Types
// =============================================================================

/// A line of styled text: either a plain string or a sequence of styled spans.
///
/// Parsed from Lua values where strings produce `Plain` and arrays of
/// `{ text, style }` tables produce `Styled`. Converts to ratatui `Line`
/// via [`to_line`](Self::to_line).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StyledContent {
    /// Plain unformatted text.
    Plain(String),
    /// Sequence of individually styled spans.
    Styled(Vec<StyledSpan>),
}

/// A styled text span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyledSpan {
    /// The text content.
    pub text: String,
    /// Styling attributes.
    pub style: SpanStyle,
}

/// Styling attributes for a span.
///
/// Maps to a subset of ratatui `Style`. All fields default to off/none.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SpanStyle {
    /// Foreground color.
    pub fg: Option<SpanColor>,
    /// Background color.
    pub bg: Option<SpanColor>,
    /// Bold text.
    pub bold: bool,
    /// Dim text.
    pub dim: bool,
    /// Reversed (highlighted) text.
    pub reversed: bool,
    /// Italic text.
    pub italic: bool,
}

/// Named terminal colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpanColor {
    /// Black.
    Black,
    /// Cyan.
    Cyan,
    /// Green.
    Green,
    /// Red.
    Red,
    /// Yellow.
    Yellow,
    /// White.
    White,
    /// Gray.
    Gray,
    /// Blue.
    Blue,
    /// Magenta.
    Magenta,
}

impl PartialEq<&str> for StyledContent {
    fn eq(&self, other: &&str) -> bool {
        self.as_plain_str() == Some(*other)
    }
}

impl From<&str> for StyledContent {
    fn from(s: &str) -> Self {
        Self::Plain(s.to_string())
    }
}

impl From<String> for StyledContent {
    fn from(s: String) -> Self {
        Self::Plain(s)
    }
}

impl StyledContent {
    /// Single span with the given style.
    pub fn styled(text: impl Into<String>, style: SpanStyle) -> Self {
        Self::Styled(vec![StyledSpan {
            text: text.into(),
            style,
        }])
    }

    /// Returns the inner string if this is a `Plain` variant, or `None`.
    #[must_use]
    pub fn as_plain_str(&self) -> Option<&str> {
        match self {
            Self::Plain(s) => Some(s.as_str()),
            Self::Styled(_) => None,
        }
    }

    /// Text with all styling removed.
    #[must_use]
    pub fn text(&self) -> String {
        match self {
            Self::Plain(s) => s.clone(),
            Self::Styled(spans) => spans.iter().map(|s| s.text.as_str()).collect(),
        }
    }

    /// Convert to a ratatui `Line`.
    #[must_use]
    pub fn to_line(&self) -> Line<'static> {
        match self {
            Self::Plain(s) => Line::from(s.clone()),
            Self::Styled(spans) => {
                let ratatui_spans: Vec<Span<'static>> = spans
                    .iter()
                    .map(|s| Span::styled(s.text.clone(), s.style.to_ratatui_style()))
                    .collect();
                Line::from(ratatui_spans)
            }
        }
    }
}

impl SpanStyle {
    /// Foreground-only style.
    #[must_use]
    pub fn fg(color: SpanColor) -> Self {
        Self {
            fg: Some(color),
            ..Self::default()
        }
    }

    /// Convert to a ratatui `Style`.
    #[must_use]
    pub fn to_ratatui_style(&self) -> Style {
        let modifiers = [
            (self.bold, Modifier::BOLD),
            (self.dim, Modifier::DIM),
            (self.reversed, Modifier::REVERSED),
            (self.italic, Modifier::ITALIC),
        ]
        .into_iter()
        .filter(|(on, _)| *on)
        .fold(Modifier::empty(), |acc, (_, m)| acc | m);

        let mut style = Style::default().add_modifier(modifiers);
        if let Some(fg) = self.fg {
            style = style.fg(fg.to_ratatui_color());
        }
        if let Some(bg) = self.bg {
            style = style.bg(bg.to_ratatui_color());
        }
        style
    }
}

/// Color names accepted from Lua, with their ratatui colors.
const COLORS: [(&str, SpanColor, Color); 9] = [
    ("black", SpanColor::Black, Color::Black),
    ("cyan", SpanColor::Cyan, Color::Cyan),
    ("green", SpanColor::Green, Color::Green),
    ("red", SpanColor::Red, Color::Red),
    ("yellow", SpanColor::Yellow, Color::Yellow),
    ("white", SpanColor::White, Color::White),
    ("gray", SpanColor::Gray, Color::Gray),
    ("blue", SpanColor::Blue, Color::Blue),
    ("magenta", SpanColor::Magenta, Color::Magenta),
];

impl SpanColor {
    /// Convert to a ratatui `Color`.
    #[must_use]
    pub fn to_ratatui_color(&self) -> Color {
        COLORS
            .iter()
            .find(|(_, span, _)| span == self)
            .map_or(Color::Reset, |(_, _, color)| *color)
    }

    /// Look up a color by name (`grey` is accepted for `gray`).
    pub fn from_name(name: &str) -> Result<Self> {
        let name = if name == "grey" { "gray" } else { name };
        COLORS
            .iter()
            .find(|(n, _, _)| *n == name)
            .map(|(_, span, _)| *span)
            .ok_or_else(|| anyhow!("Unknown color: '{name}'"))
    }
}

impl RenderNode {
    /// Paragraph of plain or styled lines.
    pub fn paragraph<I, L>(lines: I) -> Self
    where
        I: IntoIterator<Item = L>,
        L: Into<StyledContent>,
    {
        Self::Widget {
            widget_type: WidgetType::Paragraph,
            block: None,
            props: Some(WidgetProps::Paragraph(ParagraphProps {
                lines: lines.into_iter().map(Into::into).collect(),
                alignment: ParagraphAlignment::Left,
                wrap: true,
            })),
        }
    }

    /// Single line of text.
    pub fn text(line: impl Into<StyledContent>) -> Self {
        Self::paragraph([line.into()])
    }

    /// Area filled with `symbol`.
    pub fn fill(symbol: &str) -> Self {
        Self::Widget {
            widget_type: WidgetType::Fill,
            block: None,
            props: Some(WidgetProps::Fill(FillProps {
                symbol: symbol.to_string(),
                style: None,
            })),
        }
    }

    /// Empty placeholder.
    #[must_use]
    pub fn empty() -> Self {
        Self::Widget {
            widget_type: WidgetType::Empty,
            block: None,
            props: None,
        }
    }

    /// Vertical stack from `(constraint, child)` rows.
    #[must_use]
    pub fn rows(rows: Vec<(Constraint, RenderNode)>) -> Self {
        let (constraints, children) = rows.into_iter().unzip();
        Self::VSplit {
            constraints,
            children,
        }
    }

    /// Horizontal row from `(constraint, child)` columns.
    #[must_use]
    pub fn columns(columns: Vec<(Constraint, RenderNode)>) -> Self {
        let (constraints, children) = columns.into_iter().unzip();
        Self::HSplit {
            constraints,
            children,
        }
    }

    /// Wrap `self` in a decoration.
    #[must_use]
    pub fn framed(self, block: BlockConfig) -> Self {
        Self::Framed {
            block,
            child: Box::new(self),
        }
    }

    /// Rows this node would like to occupy at the given width.
    ///
    /// Used for packed overlays. Splits sum fixed-length rows and ask
    /// flexible children; widgets count their lines plus border rows.
    #[must_use]
    pub fn preferred_height(&self, width: u16) -> u16 {
        match self {
            Self::VSplit {
                constraints,
                children,
            } => constraints
                .iter()
                .zip(children)
                .map(|(constraint, child)| match constraint {
                    Constraint::Length(n) => *n,
                    _ => child.preferred_height(width),
                })
                .fold(0u16, u16::saturating_add),
            Self::HSplit { children, .. } => children
                .iter()
                .map(|c| c.preferred_height(width))
                .max()
                .unwrap_or(0),
            Self::Centered { child, .. } => child.preferred_height(width),
            Self::Overlay { bottom, .. } => bottom.preferred_height(width),
            Self::Framed { block, child } => {
                let (rows, cols) = block.border_size();
                child
                    .preferred_height(width.saturating_sub(cols))
                    .saturating_add(rows)
            }
            Self::Widget {
                widget_type,
                block,
                props,
            } => {
                let (rows, cols) = block.as_ref().map_or((0, 0), BlockConfig::border_size);
                let inner = width.saturating_sub(cols).max(1);
                let content = match (widget_type, props) {
                    (WidgetType::Paragraph, Some(WidgetProps::Paragraph(p))) => {
                        if p.wrap {
                            p.lines
                                .iter()
                                .map(|l| wrapped_rows(l, inner))
                                .fold(0u16, u16::saturating_add)
                        } else {
                            p.lines.len() as u16
                        }
                    }
                    (WidgetType::List, Some(WidgetProps::List(l))) => l.items.len() as u16,
                    (WidgetType::Input | WidgetType::Buttons | WidgetType::Fill, _) => 1,
                    _ => 0,
                };
                content.saturating_add(rows)
            }
        }
    }
}

fn wrapped_rows(line: &StyledContent, width: u16) -> u16 {
    let len = line.to_line().width().max(1);
    len.div_ceil(usize::from(width)) as u16
}

// =============================================================================
// Constraint Parsing
// =============================================================================

/// Parse a constraint string into a ratatui `Constraint`.
///
/// Supported formats:
/// - `"30%"` → `Constraint::Percentage(30)`
/// - `"20"` → `Constraint::Length(20)`
/// - `"min:10"` → `Constraint::Min(10)`
/// - `"max:80"` → `Constraint::Max(80)`
pub fn parse_constraint(s: &str) -> Result<Constraint> {
    let s = s.trim();

    if let Some(pct) = s.strip_suffix('%') {
        let val: u16 = pct
            .parse()
            .map_err(|e| anyhow!("Invalid percentage constraint {s}: {e}"))?;
        Ok(Constraint::Percentage(val))
    } else if let Some(min) = s.strip_prefix("min:") {
        let val: u16 = min
            .parse()
            .map_err(|e| anyhow!("Invalid min constraint {s}: {e}"))?;
        Ok(Constraint::Min(val))
    } else if let Some(max) = s.strip_prefix("max:") {
        let val: u16 = max
            .parse()
            .map_err(|e| anyhow!("Invalid max constraint {s}: {e}"))?;
        Ok(Constraint::Max(val))
    } else {
        let val: u16 = s
            .parse()
            .map_err(|e| anyhow!("Invalid length constraint {s}: {e}"))?;
        Ok(Constraint::Length(val))
    }
}

// =============================================================================
// Lua Table Deserialization
// =============================================================================

impl RenderNode {
    /// Deserialize a Lua table into a `RenderNode`.
    ///
    /// Expected table format:
    /// ```lua
    /// { type = "vsplit", constraints = { "1", "min:0" }, children = { ... } }
    /// { type = "paragraph", block = { title = "Info", borders = "all" }, props = { lines = {...} } }
    /// { type = "centered", width = 50, height = 40, child = { ... } }
    /// ```
    pub fn from_lua_table(table: &LuaTable) -> Result<Self> {
        let node_type: String = table
            .get("type")
            .map_err(|e| anyhow!("RenderNode missing 'type' field: {e}"))?;

        match node_type.as_str() {
            "hsplit" => Self::parse_split(table, Direction::Horizontal),
            "vsplit" => Self::parse_split(table, Direction::Vertical),
            "centered" => Self::parse_centered(table),
            _ => Self::parse_widget(table, &node_type),
        }
    }

    fn parse_split(table: &LuaTable, direction: Direction) -> Result<Self> {
        let field = |key: &str| -> Result<LuaTable> {
            table
                .get(key)
                .map_err(|e| anyhow!("Split node missing '{key}': {e}"))
        };
        let constraints = field("constraints")?
            .sequence_values::<String>()
            .map(|v| {
                let s = v.map_err(|e| anyhow!("Invalid constraint value: {e}"))?;
                parse_constraint(&s)
            })
            .collect::<Result<Vec<_>>>()?;
        let children = field("children")?
            .sequence_values::<LuaTable>()
            .map(|v| {
                let child = v.map_err(|e| anyhow!("Invalid child node: {e}"))?;
                Self::from_lua_table(&child)
            })
            .collect::<Result<Vec<_>>>()?;

        if constraints.len() != children.len() {
            bail!(
                "Split node has {} constraints for {} children",
                constraints.len(),
                children.len()
            );
        }
        Ok(if direction == Direction::Horizontal {
            Self::HSplit {
                constraints,
                children,
            }
        } else {
            Self::VSplit {
                constraints,
                children,
            }
        })
    }

    fn parse_centered(table: &LuaTable) -> Result<Self> {
        let percent = |key: &str| -> Result<u16> {
            let value: u16 = table
                .get(key)
                .map_err(|e| anyhow!("Centered node missing '{key}': {e}"))?;
            Ok(value.min(100))
        };
        let child: LuaTable = table
            .get("child")
            .map_err(|e| anyhow!("Centered node missing 'child': {e}"))?;
        Ok(Self::Centered {
            width_pct: percent("width")?,
            height_pct: percent("height")?,
            child: Box::new(Self::from_lua_table(&child)?),
        })
    }

    fn parse_widget(table: &LuaTable, type_name: &str) -> Result<Self> {
        let widget_type = match type_name {
            "list" => WidgetType::List,
            "paragraph" => WidgetType::Paragraph,
            "input" => WidgetType::Input,
            "buttons" => WidgetType::Buttons,
            "fill" => WidgetType::Fill,
            "empty" => WidgetType::Empty,
            _ => {
                return Err(anyhow!("Unknown widget type: '{type_name}'"));
            }
        };

        let block = parse_block_config(table);
        let props_table = match table.get::<LuaValue>("props") {
            Ok(LuaValue::Table(t)) => Some(t),
            _ => None,
        };
        let props = match (widget_type, props_table) {
            (WidgetType::List, Some(p)) => Some(WidgetProps::List(parse_list_props(&p))),
            (WidgetType::Paragraph, Some(p)) => {
                Some(WidgetProps::Paragraph(parse_paragraph_props(&p)))
            }
            (WidgetType::Input, Some(p)) => Some(WidgetProps::Input(parse_input_props(&p))),
            (WidgetType::Buttons, Some(p)) => Some(WidgetProps::Buttons(parse_buttons_props(&p)?)),
            (WidgetType::Fill, p) => Some(WidgetProps::Fill(parse_fill_props(p.as_ref()))),
            _ => None,
        };

        Ok(RenderNode::Widget {
            widget_type,
            block,
            props,
        })
    }
}

/// Parse list widget props from a Lua table.
///
/// Items can be plain strings or tables with `text`, `header`, and `style` fields.
fn parse_list_props(props_table: &LuaTable) -> ListProps {
    let mut items = Vec::new();

    if let Ok(items_table) = props_table.get::<LuaTable>("items") {
        for val in items_table.sequence_values::<LuaValue>() {
            let Ok(v) = val else { continue };
            match v {
                LuaValue::String(s) => {
                    items.push(ListItemProps::plain(s.to_string_lossy()));
                }
                LuaValue::Table(item_table) => {
                    let Ok(text_val) = item_table.get::<LuaValue>("text") else {
                        continue;
                    };
                    let Ok(content) = parse_styled_content(&text_val) else {
                        continue;
                    };
                    let header: bool = item_table.get("header").unwrap_or(false);
                    let style = item_table
                        .get::<LuaValue>("style")
                        .ok()
                        .and_then(|v| parse_span_style(&v).ok());
                    items.push(ListItemProps {
                        content,
                        header,
                        style,
                    });
                }
                _ => continue,
            }
        }
    }

    let selected: Option<usize> = props_table.get("selected").ok();
    let highlight_style = props_table
        .get::<LuaValue>("highlight_style")
        .ok()
        .and_then(|v| parse_span_style(&v).ok());
    let highlight_symbol: Option<String> = props_table.get("highlight_symbol").ok();

    ListProps {
        items,
        selected,
        highlight_style,
        highlight_symbol,
    }
}

fn parse_alignment(table: &LuaTable) -> ParagraphAlignment {
    let alignment_str: Option<String> = table.get("alignment").ok();
    match alignment_str.as_deref() {
        Some("center") => ParagraphAlignment::Center,
        Some("right") => ParagraphAlignment::Right,
        _ => ParagraphAlignment::Left,
    }
}

fn parse_paragraph_props(props_table: &LuaTable) -> ParagraphProps {
    ParagraphProps {
        lines: parse_styled_lines(props_table, "lines").unwrap_or_default(),
        alignment: parse_alignment(props_table),
        wrap: props_table.get("wrap").unwrap_or(true),
    }
}

fn parse_input_props(props_table: &LuaTable) -> InputProps {
    InputProps {
        prompt: props_table
            .get::<LuaValue>("prompt")
            .ok()
            .and_then(|v| parse_styled_content(&v).ok()),
        value: props_table.get("value").unwrap_or_default(),
        focused: props_table.get("focused").unwrap_or(false),
    }
}

/// Buttons are plain labels or `{ label = "...", style = ..., disabled = bool }`.
fn parse_buttons_props(props_table: &LuaTable) -> Result<ButtonsProps> {
    let list: LuaTable = props_table
        .get("buttons")
        .map_err(|e| anyhow!("Buttons node missing 'buttons': {e}"))?;

    let mut buttons = Vec::new();
    for val in list.sequence_values::<LuaValue>() {
        match val.map_err(|e| anyhow!("Invalid button: {e}"))? {
            LuaValue::String(s) => buttons.push(ButtonProps::new(s.to_string_lossy())),
            LuaValue::Table(t) => {
                let label: String = t
                    .get("label")
                    .map_err(|e| anyhow!("Button missing 'label': {e}"))?;
                let style = t
                    .get::<LuaValue>("style")
                    .ok()
                    .and_then(|v| parse_span_style(&v).ok());
                let disabled: bool = t.get("disabled").unwrap_or(false);
                buttons.push(ButtonProps {
                    label,
                    style,
                    disabled,
                });
            }
            _ => return Err(anyhow!("Button must be a string or table")),
        }
    }

    // Lua indices are 1-based
    let focused = props_table
        .get::<Option<usize>>("focused")
        .unwrap_or(None)
        .and_then(|i| i.checked_sub(1));

    Ok(ButtonsProps {
        buttons,
        focused,
        alignment: parse_alignment(props_table),
    })
}

fn parse_fill_props(props_table: Option<&LuaTable>) -> FillProps {
    let symbol = props_table
        .and_then(|t| t.get::<String>("symbol").ok())
        .unwrap_or_else(|| " ".to_string());
    let style = props_table
        .and_then(|t| t.get::<LuaValue>("style").ok())
        .and_then(|v| parse_span_style(&v).ok());
    FillProps { symbol, style }
}

/// Parse optional block config from a table.
fn parse_block_config(table: &LuaTable) -> Option<BlockConfig> {
    let block_value: LuaValue = table.get("block").ok()?;

    let LuaValue::Table(block_table) = block_value else {
        return None;
    };

    let title: Option<StyledContent> = block_table
        .get::<LuaValue>("title")
        .ok()
        .and_then(|v| parse_styled_content(&v).ok());
    let title_right: Option<StyledContent> = block_table
        .get::<LuaValue>("title_right")
        .ok()
        .and_then(|v| parse_styled_content(&v).ok());

    let borders_str: Option<String> = block_table.get("borders").ok();
    let borders = match borders_str.as_deref() {
        Some("none") => BorderStyle::None,
        Some("top") => BorderStyle::Top,
        _ => BorderStyle::All,
    };

    let weight_str: Option<String> = block_table.get("weight").ok();
    let weight = match weight_str.as_deref() {
        Some("double") => LineWeight::Double,
        _ => LineWeight::Light,
    };

    let border_style = block_table
        .get::<LuaValue>("border_style")
        .ok()
        .and_then(|v| parse_span_style(&v).ok());

    Some(BlockConfig {
        title,
        title_right,
        borders,
        weight,
        border_style,
    })
}

// =============================================================================
// Styled Content Parsing
// =============================================================================

/// Parse a Lua value into styled content.
///
/// Accepts either:
/// - A plain string → `StyledContent::Plain`
/// - An array of span tables/strings → `StyledContent::Styled`
pub(crate) fn parse_styled_content(value: &LuaValue) -> Result<StyledContent> {
    match value {
        LuaValue::String(s) => Ok(StyledContent::Plain(s.to_string_lossy())),
        LuaValue::Table(table) => {
            let mut spans = Vec::new();
            for val in table.clone().sequence_values::<LuaValue>() {
                let v = val.map_err(|e| anyhow!("Invalid span in styled content: {e}"))?;
                spans.push(parse_styled_span(&v)?);
            }
            Ok(StyledContent::Styled(spans))
        }
        LuaValue::Nil => Err(anyhow!("Styled content is nil")),
        _ => Err(anyhow!("Styled content must be a string or table")),
    }
}

fn parse_styled_span(value: &LuaValue) -> Result<StyledSpan> {
    match value {
        LuaValue::String(s) => Ok(StyledSpan {
            text: s.to_string_lossy(),
            style: SpanStyle::default(),
        }),
        LuaValue::Table(table) => {
            let text: String = table
                .get("text")
                .map_err(|e| anyhow!("Span missing 'text' field: {e}"))?;
            let style = match table.get::<LuaValue>("style") {
                Ok(style_val) => parse_span_style(&style_val)?,
                Err(_) => SpanStyle::default(),
            };
            Ok(StyledSpan { text, style })
        }
        _ => Err(anyhow!("Span must be a string or table")),
    }
}

/// Parse a span style from a Lua value.
///
/// Accepts either:
/// - A shorthand string: `"bold"`, `"dim"`, `"reversed"`, `"italic"`, or a color name
/// - A table: `{ fg = "cyan", bold = true, dim = true }`
pub(crate) fn parse_span_style(value: &LuaValue) -> Result<SpanStyle> {
    match value {
        LuaValue::String(s) => {
            let name = s.to_string_lossy();
            let mut style = SpanStyle::default();
            match name.as_ref() {
                "bold" => style.bold = true,
                "dim" => style.dim = true,
                "reversed" => style.reversed = true,
                "italic" => style.italic = true,
                other => style.fg = Some(SpanColor::from_name(other)?),
            }
            Ok(style)
        }
        LuaValue::Table(table) => {
            let fg = table
                .get::<Option<String>>("fg")
                .unwrap_or(None)
                .map(|s| SpanColor::from_name(&s))
                .transpose()?;
            let bg = table
                .get::<Option<String>>("bg")
                .unwrap_or(None)
                .map(|s| SpanColor::from_name(&s))
                .transpose()?;
            let flag = |key: &str| table.get::<Option<bool>>(key).unwrap_or(None).unwrap_or(false);

            Ok(SpanStyle {
                fg,
                bg,
                bold: flag("bold"),
                dim: flag("dim"),
                reversed: flag("reversed"),
                italic: flag("italic"),
            })
        }
        LuaValue::Nil => Ok(SpanStyle::default()),
        _ => Err(anyhow!("Style must be a string or table")),
    }
}

/// Parse an array of styled content lines from a table field.
fn parse_styled_lines(table: &LuaTable, key: &str) -> Result<Vec<StyledContent>> {
    let arr: LuaTable = table
        .get(key)
        .map_err(|e| anyhow!("Missing array field '{key}': {e}"))?;

    let mut result = Vec::new();
    for val in arr.clone().sequence_values::<LuaValue>() {
        let v = val.map_err(|e| anyhow!("Invalid value in '{key}': {e}"))?;
        result.push(parse_styled_content(&v)?);
    }
    Ok(result)
}

// =============================================================================
// Block Config → ratatui Block
// =============================================================================

impl BlockConfig {
    /// Convert to a ratatui `Block` widget.
    #[must_use]
    pub fn to_block(&self) -> Block<'static> {
        let mut block = Block::default();

        match self.borders {
            BorderStyle::All => block = block.borders(Borders::ALL),
            BorderStyle::Top => block = block.borders(Borders::TOP),
            BorderStyle::None => {}
        }

        block = block.border_type(match self.weight {
            LineWeight::Light => BorderType::Plain,
            LineWeight::Double => BorderType::Double,
        });

        if let Some(ref title) = self.title {
            block = block.title_top(title.to_line().left_aligned());
        }
        if let Some(ref title) = self.title_right {
            block = block.title_top(title.to_line().right_aligned());
        }

        if let Some(ref style) = self.border_style {
            block = block.border_style(style.to_ratatui_style());
        }

        block
    }

    /// Rows and columns consumed by the borders.
    #[must_use]
    pub fn border_size(&self) -> (u16, u16) {
        match self.borders {
            BorderStyle::All => (2, 2),
            BorderStyle::Top => (1, 0),
            BorderStyle::None => (u16::from(self.title.is_some() || self.title_right.is_some()), 0),
        }
    }
}

// =============================================================================
// Tree Interpreter
// =============================================================================

/// Interpret a render tree, rendering each node to the given frame area.
///
/// Recursively walks the tree, splitting areas for layout nodes and
/// dispatching to Rust widget implementations for leaf nodes. Overlay
/// layers clear their rectangle before drawing over the layer beneath.
pub fn interpret_tree(node: &RenderNode, f: &mut Frame, area: Rect) {
    match node {
        RenderNode::HSplit {
            constraints,
            children,
        } => {
            let chunks = Layout::default()
                .direction(Direction::Horizontal)
                .constraints(constraints.as_slice())
                .split(area);

            for (child, chunk) in children.iter().zip(chunks.iter()) {
                interpret_tree(child, f, *chunk);
            }
        }
        RenderNode::VSplit {
            constraints,
            children,
        } => {
            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints(constraints.as_slice())
                .split(area);

            for (child, chunk) in children.iter().zip(chunks.iter()) {
                interpret_tree(child, f, *chunk);
            }
        }
        RenderNode::Centered {
            width_pct,
            height_pct,
            child,
        } => {
            let centered_area = centered_rect(*width_pct, *height_pct, area);
            f.render_widget(Clear, centered_area);
            interpret_tree(child, f, centered_area);
        }
        RenderNode::Overlay {
            top,
            bottom,
            geometry,
        } => {
            interpret_tree(bottom, f, area);
            let layer = geometry.place(area, top.preferred_height(area.width));
            f.render_widget(Clear, layer);
            interpret_tree(top, f, layer);
        }
        RenderNode::Framed { block, child } => {
            let block = block.to_block();
            let inner = block.inner(area);
            f.render_widget(block, area);
            interpret_tree(child, f, inner);
        }
        RenderNode::Widget {
            widget_type,
            block,
            props,
        } => {
            render_widget(*widget_type, block.as_ref(), props.as_ref(), f, area);
        }
    }
}

fn to_alignment(alignment: ParagraphAlignment) -> Alignment {
    match alignment {
        ParagraphAlignment::Left => Alignment::Left,
        ParagraphAlignment::Center => Alignment::Center,
        ParagraphAlignment::Right => Alignment::Right,
    }
}

/// Render a leaf widget.
fn render_widget(
    widget_type: WidgetType,
    block_cfg: Option<&BlockConfig>,
    props: Option<&WidgetProps>,
    f: &mut Frame,
    area: Rect,
) {
    let block = block_cfg.map(BlockConfig::to_block).unwrap_or_default();

    match (widget_type, props) {
        (WidgetType::List, Some(WidgetProps::List(list))) => render_list(f, area, block, list),
        (WidgetType::Paragraph, Some(WidgetProps::Paragraph(para))) => {
            let text: Vec<Line> = para.lines.iter().map(StyledContent::to_line).collect();
            let mut paragraph = Paragraph::new(text)
                .block(block)
                .alignment(to_alignment(para.alignment));
            if para.wrap {
                paragraph = paragraph.wrap(Wrap { trim: false });
            }
            f.render_widget(paragraph, area);
        }
        (WidgetType::Input, Some(WidgetProps::Input(input))) => {
            let mut spans: Vec<Span<'static>> = input
                .prompt
                .as_ref()
                .map(|p| p.to_line().spans)
                .unwrap_or_default();
            spans.push(Span::raw(input.value.clone()));
            if input.focused {
                spans.push(Span::styled(" ", Style::default().add_modifier(Modifier::REVERSED)));
            }
            f.render_widget(Paragraph::new(Line::from(spans)).block(block), area);
        }
        (WidgetType::Buttons, Some(WidgetProps::Buttons(row))) => {
            let mut spans = Vec::new();
            for (i, button) in row.buttons.iter().enumerate() {
                if i > 0 {
                    spans.push(Span::raw(" "));
                }
                let mut style = button.style.map(|s| s.to_ratatui_style()).unwrap_or_default();
                if button.disabled {
                    style = style.add_modifier(Modifier::DIM);
                } else if row.focused == Some(i) {
                    style = style.add_modifier(Modifier::REVERSED);
                }
                spans.push(Span::styled(button.text(), style));
            }
            let paragraph = Paragraph::new(Line::from(spans))
                .block(block)
                .alignment(to_alignment(row.alignment));
            f.render_widget(paragraph, area);
        }
        (WidgetType::Fill, Some(WidgetProps::Fill(fill))) => {
            let inner = block.inner(area);
            f.render_widget(block, area);
            let row = fill.symbol.repeat(usize::from(inner.width));
            let style = fill.style.map(|s| s.to_ratatui_style()).unwrap_or_default();
            let lines: Vec<Line> = (0..inner.height)
                .map(|_| Line::styled(row.clone(), style))
                .collect();
            f.render_widget(Paragraph::new(lines), inner);
        }
        _ => f.render_widget(block, area),
    }
}

fn render_list(f: &mut Frame, area: Rect, block: Block<'static>, props: &ListProps) {
    let mut selectable = 0usize;
    let mut selected_row = None;
    let items: Vec<ListItem> = props
        .items
        .iter()
        .enumerate()
        .map(|(row, item)| {
            let mut style = item.style.map(|s| s.to_ratatui_style()).unwrap_or_default();
            if item.header {
                style = style.add_modifier(Modifier::DIM | Modifier::BOLD);
            } else {
                if props.selected == Some(selectable) {
                    selected_row = Some(row);
                }
                selectable += 1;
            }
            ListItem::new(item.content.to_line()).style(style)
        })
        .collect();

    let highlight = props
        .highlight_style
        .map_or_else(
            || Style::default().add_modifier(Modifier::REVERSED),
            |s| s.to_ratatui_style(),
        );
    let mut list = List::new(items).block(block).highlight_style(highlight);
    if let Some(ref symbol) = props.highlight_symbol {
        list = list.highlight_symbol(symbol.as_str());
    }

    let mut state = ListState::default().with_selected(selected_row);
    f.render_stateful_widget(list, area, &mut state);
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::{backend::TestBackend, Terminal};

    fn lua_table(lua: &mlua::Lua, src: &str) -> LuaTable {
        lua.load(src).eval().expect("Should evaluate Lua table")
    }

    fn paint(node: &RenderNode, width: u16, height: u16) -> Vec<String> {
        let mut terminal =
            Terminal::new(TestBackend::new(width, height)).expect("Should create terminal");
        terminal
            .draw(|f| interpret_tree(node, f, f.area()))
            .expect("Should draw");
        let buffer = terminal.backend().buffer().clone();
        (0..height)
            .map(|y| {
                (0..width)
                    .map(|x| buffer[(x, y)].symbol().to_string())
                    .collect::<String>()
            })
            .collect()
    }

    // === Constraint Parsing ===

    #[test]
    fn test_parse_percentage_constraint() {
        assert_eq!(parse_constraint("30%").expect("Should parse"), Constraint::Percentage(30));
    }

    #[test]
    fn test_parse_length_and_bounds_constraints() {
        assert_eq!(parse_constraint("20").expect("Should parse"), Constraint::Length(20));
        assert_eq!(parse_constraint("min:10").expect("Should parse"), Constraint::Min(10));
        assert_eq!(parse_constraint("max:80").expect("Should parse"), Constraint::Max(80));
        assert_eq!(parse_constraint("  30%  ").expect("Should parse"), Constraint::Percentage(30));
    }

    #[test]
    fn test_parse_invalid_constraint() {
        assert!(parse_constraint("abc").is_err());
        assert!(parse_constraint("%30").is_err());
    }

    // === Lua Table Deserialization ===

    #[test]
    fn test_parse_paragraph_with_block() {
        let lua = mlua::Lua::new();
        let table = lua_table(
            &lua,
            r#"return {
                type = "paragraph",
                block = { title = " Info ", borders = "top", weight = "double" },
                props = { lines = { "Line 1", { "a", { text = "b", style = "cyan" } } }, alignment = "center" },
            }"#,
        );

        let node = RenderNode::from_lua_table(&table).expect("Should parse paragraph");
        let RenderNode::Widget { widget_type, block, props } = node else {
            panic!("Expected Widget node");
        };
        assert_eq!(widget_type, WidgetType::Paragraph);
        let block = block.expect("Should have block");
        assert_eq!(block.borders, BorderStyle::Top);
        assert_eq!(block.weight, LineWeight::Double);
        let Some(WidgetProps::Paragraph(para)) = props else {
            panic!("Expected Paragraph props");
        };
        assert_eq!(para.lines.len(), 2);
        assert_eq!(para.lines[0], "Line 1");
        assert_eq!(para.lines[1].text(), "ab");
        assert_eq!(para.alignment, ParagraphAlignment::Center);
    }

    #[test]
    fn test_parse_nested_split() {
        let lua = mlua::Lua::new();
        let table = lua_table(
            &lua,
            r#"return {
                type = "vsplit",
                constraints = { "1", "min:0" },
                children = {
                    { type = "buttons", props = { buttons = { "OK", { label = "Cancel", style = "white" } }, focused = 2 } },
                    { type = "hsplit", constraints = { "50%", "50%" }, children = { { type = "empty" }, { type = "fill" } } },
                },
            }"#,
        );

        let node = RenderNode::from_lua_table(&table).expect("Should parse tree");
        let RenderNode::VSplit { constraints, children } = node else {
            panic!("Expected VSplit node");
        };
        assert_eq!(constraints, vec![Constraint::Length(1), Constraint::Min(0)]);
        let RenderNode::Widget { props: Some(WidgetProps::Buttons(row)), .. } = &children[0] else {
            panic!("Expected buttons");
        };
        assert_eq!(row.buttons.len(), 2);
        assert_eq!(row.focused, Some(1));
        assert_eq!(row.buttons[1].style, Some(SpanStyle::fg(SpanColor::White)));
        assert!(matches!(children[1], RenderNode::HSplit { .. }));
    }

    #[test]
    fn test_parse_mismatched_constraints_children() {
        let lua = mlua::Lua::new();
        let table = lua_table(
            &lua,
            r#"return { type = "hsplit", constraints = { "30%", "70%" }, children = { { type = "empty" } } }"#,
        );

        let err = RenderNode::from_lua_table(&table).expect_err("Should reject mismatch");
        assert!(err.to_string().contains("2 constraints for 1 children"));
    }

    #[test]
    fn test_parse_unknown_widget_type() {
        let lua = mlua::Lua::new();
        let table = lua_table(&lua, r#"return { type = "terminal" }"#);
        assert!(RenderNode::from_lua_table(&table).is_err());
    }

    #[test]
    fn test_parse_list_widget() {
        let lua = mlua::Lua::new();
        let table = lua_table(
            &lua,
            r#"return {
                type = "list",
                props = {
                    items = { "plain item", { text = "Header", header = true }, { text = "styled", style = { fg = "cyan" } } },
                    selected = 1,
                    highlight_symbol = ">> ",
                },
            }"#,
        );

        let node = RenderNode::from_lua_table(&table).expect("Should parse list");
        let RenderNode::Widget { props: Some(WidgetProps::List(list)), .. } = node else {
            panic!("Expected List props");
        };
        assert_eq!(list.items.len(), 3);
        assert!(list.items[1].header);
        assert_eq!(list.selected, Some(1));
        assert_eq!(list.highlight_symbol.as_deref(), Some(">> "));
    }

    // === Geometry ===

    #[test]
    fn test_preferred_height_counts_rows_and_borders() {
        let node = RenderNode::rows(vec![
            (Constraint::Length(1), RenderNode::text("title")),
            (Constraint::Min(0), RenderNode::paragraph(["a", "b", "c"])),
        ])
        .framed(BlockConfig::default());
        assert_eq!(node.preferred_height(40), 1 + 3 + 2);
    }

    #[test]
    fn test_preferred_height_wraps_long_lines() {
        let node = RenderNode::text("x".repeat(25));
        assert_eq!(node.preferred_height(10), 3);
    }

    // === Painting ===

    #[test]
    fn test_overlay_paints_top_over_bottom() {
        let node = RenderNode::Overlay {
            top: Box::new(RenderNode::text("TOP")),
            bottom: Box::new(RenderNode::fill("#")),
            geometry: crate::tui::layout::OverlayGeometry {
                width: crate::tui::layout::Extent::Fixed(3),
                ..Default::default()
            },
        };
        let rows = paint(&node, 9, 3);
        assert_eq!(rows[0], "#########");
        assert_eq!(rows[1], "###TOP###");
        assert_eq!(rows[2], "#########");
    }

    #[test]
    fn test_framed_draws_titles_on_both_sides() {
        let block = BlockConfig {
            title: Some("Left".into()),
            title_right: Some("Close".into()),
            ..BlockConfig::default()
        };
        let rows = paint(&RenderNode::text("body").framed(block), 20, 3);
        assert!(rows[0].contains("Left"));
        assert!(rows[0].trim_end_matches('┐').ends_with("Close"));
        assert!(rows[1].contains("body"));
    }

    #[test]
    fn test_buttons_render_brackets() {
        let node = RenderNode::Widget {
            widget_type: WidgetType::Buttons,
            block: None,
            props: Some(WidgetProps::Buttons(ButtonsProps {
                buttons: vec![ButtonProps::new("OK"), ButtonProps::new("No")],
                focused: Some(0),
                alignment: ParagraphAlignment::Left,
            })),
        };
        let rows = paint(&node, 16, 1);
        assert_eq!(rows[0], "[ OK ] [ No ]   ");
    }
}
