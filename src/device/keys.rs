//! Linux key code names (`linux/input-event-codes.h`).
//!
//! Covers the keyboard block plus the consumer and remote-control keys IR
//! remotes usually map to.

// Rust guideline compliant 2026-02

use crate::constants::KEY_SEARCH_MAX;

const KEY_CODES: &[(u16, &str)] = &[
    (1, "KEY_ESC"),
    (2, "KEY_1"),
    (3, "KEY_2"),
    (4, "KEY_3"),
    (5, "KEY_4"),
    (6, "KEY_5"),
    (7, "KEY_6"),
    (8, "KEY_7"),
    (9, "KEY_8"),
    (10, "KEY_9"),
    (11, "KEY_0"),
    (12, "KEY_MINUS"),
    (13, "KEY_EQUAL"),
    (14, "KEY_BACKSPACE"),
    (15, "KEY_TAB"),
    (16, "KEY_Q"),
    (17, "KEY_W"),
    (18, "KEY_E"),
    (19, "KEY_R"),
    (20, "KEY_T"),
    (21, "KEY_Y"),
    (22, "KEY_U"),
    (23, "KEY_I"),
    (24, "KEY_O"),
    (25, "KEY_P"),
    (26, "KEY_LEFTBRACE"),
    (27, "KEY_RIGHTBRACE"),
    (28, "KEY_ENTER"),
    (29, "KEY_LEFTCTRL"),
    (30, "KEY_A"),
    (31, "KEY_S"),
    (32, "KEY_D"),
    (33, "KEY_F"),
    (34, "KEY_G"),
    (35, "KEY_H"),
    (36, "KEY_J"),
    (37, "KEY_K"),
    (38, "KEY_L"),
    (39, "KEY_SEMICOLON"),
    (40, "KEY_APOSTROPHE"),
    (41, "KEY_GRAVE"),
    (42, "KEY_LEFTSHIFT"),
    (43, "KEY_BACKSLASH"),
    (44, "KEY_Z"),
    (45, "KEY_X"),
    (46, "KEY_C"),
    (47, "KEY_V"),
    (48, "KEY_B"),
    (49, "KEY_N"),
    (50, "KEY_M"),
    (51, "KEY_COMMA"),
    (52, "KEY_DOT"),
    (53, "KEY_SLASH"),
    (54, "KEY_RIGHTSHIFT"),
    (55, "KEY_KPASTERISK"),
    (56, "KEY_LEFTALT"),
    (57, "KEY_SPACE"),
    (58, "KEY_CAPSLOCK"),
    (59, "KEY_F1"),
    (60, "KEY_F2"),
    (61, "KEY_F3"),
    (62, "KEY_F4"),
    (63, "KEY_F5"),
    (64, "KEY_F6"),
    (65, "KEY_F7"),
    (66, "KEY_F8"),
    (67, "KEY_F9"),
    (68, "KEY_F10"),
    (69, "KEY_NUMLOCK"),
    (70, "KEY_SCROLLLOCK"),
    (71, "KEY_KP7"),
    (72, "KEY_KP8"),
    (73, "KEY_KP9"),
    (74, "KEY_KPMINUS"),
    (75, "KEY_KP4"),
    (76, "KEY_KP5"),
    (77, "KEY_KP6"),
    (78, "KEY_KPPLUS"),
    (79, "KEY_KP1"),
    (80, "KEY_KP2"),
    (81, "KEY_KP3"),
    (82, "KEY_KP0"),
    (83, "KEY_KPDOT"),
    (87, "KEY_F11"),
    (88, "KEY_F12"),
    (96, "KEY_KPENTER"),
    (97, "KEY_RIGHTCTRL"),
    (98, "KEY_KPSLASH"),
    (99, "KEY_SYSRQ"),
    (100, "KEY_RIGHTALT"),
    (102, "KEY_HOME"),
    (103, "KEY_UP"),
    (104, "KEY_PAGEUP"),
    (105, "KEY_LEFT"),
    (106, "KEY_RIGHT"),
    (107, "KEY_END"),
    (108, "KEY_DOWN"),
    (109, "KEY_PAGEDOWN"),
    (110, "KEY_INSERT"),
    (111, "KEY_DELETE"),
    (113, "KEY_MUTE"),
    (114, "KEY_VOLUMEDOWN"),
    (115, "KEY_VOLUMEUP"),
    (116, "KEY_POWER"),
    (117, "KEY_KPEQUAL"),
    (119, "KEY_PAUSE"),
    (128, "KEY_STOP"),
    (129, "KEY_AGAIN"),
    (130, "KEY_PROPS"),
    (131, "KEY_UNDO"),
    (132, "KEY_FRONT"),
    (133, "KEY_COPY"),
    (134, "KEY_OPEN"),
    (135, "KEY_PASTE"),
    (136, "KEY_FIND"),
    (137, "KEY_CUT"),
    (138, "KEY_HELP"),
    (139, "KEY_MENU"),
    (142, "KEY_SLEEP"),
    (143, "KEY_WAKEUP"),
    (158, "KEY_BACK"),
    (159, "KEY_FORWARD"),
    (163, "KEY_NEXTSONG"),
    (164, "KEY_PLAYPAUSE"),
    (165, "KEY_PREVIOUSSONG"),
    (166, "KEY_STOPCD"),
    (167, "KEY_RECORD"),
    (168, "KEY_REWIND"),
    (171, "KEY_CONFIG"),
    (172, "KEY_HOMEPAGE"),
    (173, "KEY_REFRESH"),
    (174, "KEY_EXIT"),
    (200, "KEY_PLAYCD"),
    (201, "KEY_PAUSECD"),
    (207, "KEY_PLAY"),
    (208, "KEY_FASTFORWARD"),
    (210, "KEY_PRINT"),
    (212, "KEY_CAMERA"),
    (217, "KEY_SEARCH"),
    (352, "KEY_OK"),
    (353, "KEY_SELECT"),
    (354, "KEY_GOTO"),
    (355, "KEY_CLEAR"),
    (356, "KEY_POWER2"),
    (357, "KEY_OPTION"),
    (358, "KEY_INFO"),
    (359, "KEY_TIME"),
    (360, "KEY_VENDOR"),
    (361, "KEY_ARCHIVE"),
    (362, "KEY_PROGRAM"),
    (363, "KEY_CHANNEL"),
    (364, "KEY_FAVORITES"),
    (365, "KEY_EPG"),
    (366, "KEY_PVR"),
    (367, "KEY_MHP"),
    (368, "KEY_LANGUAGE"),
    (369, "KEY_TITLE"),
    (370, "KEY_SUBTITLE"),
    (371, "KEY_ANGLE"),
    (372, "KEY_ZOOM"),
    (373, "KEY_MODE"),
    (374, "KEY_KEYBOARD"),
    (375, "KEY_SCREEN"),
    (376, "KEY_PC"),
    (377, "KEY_TV"),
    (378, "KEY_TV2"),
    (379, "KEY_VCR"),
    (380, "KEY_VCR2"),
    (381, "KEY_SAT"),
    (382, "KEY_SAT2"),
    (383, "KEY_CD"),
    (384, "KEY_TAPE"),
    (385, "KEY_RADIO"),
    (386, "KEY_TUNER"),
    (387, "KEY_PLAYER"),
    (388, "KEY_TEXT"),
    (389, "KEY_DVD"),
    (390, "KEY_AUX"),
    (391, "KEY_MP3"),
    (392, "KEY_AUDIO"),
    (393, "KEY_VIDEO"),
    (394, "KEY_DIRECTORY"),
    (395, "KEY_LIST"),
    (396, "KEY_MEMO"),
    (397, "KEY_CALENDAR"),
    (398, "KEY_RED"),
    (399, "KEY_GREEN"),
    (400, "KEY_YELLOW"),
    (401, "KEY_BLUE"),
    (402, "KEY_CHANNELUP"),
    (403, "KEY_CHANNELDOWN"),
    (404, "KEY_FIRST"),
    (405, "KEY_LAST"),
    (406, "KEY_AB"),
    (407, "KEY_NEXT"),
    (408, "KEY_RESTART"),
    (409, "KEY_SLOW"),
    (410, "KEY_SHUFFLE"),
    (411, "KEY_BREAK"),
    (412, "KEY_PREVIOUS"),
    (413, "KEY_DIGITS"),
    (414, "KEY_TEEN"),
    (415, "KEY_TWEN"),
    (512, "KEY_NUMERIC_0"),
    (513, "KEY_NUMERIC_1"),
    (514, "KEY_NUMERIC_2"),
    (515, "KEY_NUMERIC_3"),
    (516, "KEY_NUMERIC_4"),
    (517, "KEY_NUMERIC_5"),
    (518, "KEY_NUMERIC_6"),
    (519, "KEY_NUMERIC_7"),
    (520, "KEY_NUMERIC_8"),
    (521, "KEY_NUMERIC_9"),
];

/// Name of a key code.
#[must_use]
pub fn key_name(code: u16) -> Option<&'static str> {
    KEY_CODES
        .binary_search_by_key(&code, |(c, _)| *c)
        .ok()
        .map(|i| KEY_CODES[i].1)
}

/// Name of a key code, or `KEY_<code>` when unknown.
#[must_use]
pub fn key_label(code: u16) -> String {
    key_name(code).map_or_else(|| format!("KEY_{code}"), str::to_string)
}

/// Code of a key name.
#[must_use]
pub fn key_code(name: &str) -> Option<u16> {
    KEY_CODES.iter().find(|(_, n)| *n == name).map(|(c, _)| *c)
}

/// Key names containing `text` (case-insensitive, ignoring the `KEY_`
/// prefix), shortest first, at most [`KEY_SEARCH_MAX`].
#[must_use]
pub fn search(text: &str) -> Vec<&'static str> {
    let text = text.trim().to_ascii_uppercase();
    if text.is_empty() {
        return Vec::new();
    }
    let mut found: Vec<&'static str> = KEY_CODES
        .iter()
        .map(|(_, name)| *name)
        .filter(|name| name.trim_start_matches("KEY_").contains(&text))
        .collect();
    found.sort_by_key(|name| name.len());
    found.truncate(KEY_SEARCH_MAX);
    found
}
