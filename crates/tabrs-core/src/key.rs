// Tabrs Key Type
// Represents a single key code from Linux input-event-codes.h

use std::fmt;
use std::str::FromStr;

/// Represents a single keyboard key code.
///
/// This is a newtype wrapper around u16 for type safety.
/// The numeric values match Linux input-event-codes.h definitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct Key(pub u16);

impl Key {
    pub const TAB: Key = Key(15);
    pub const ENTER: Key = Key(28);
    pub const LEFT_CTRL: Key = Key(29);
    pub const LEFT_SHIFT: Key = Key(42);
    pub const RIGHT_SHIFT: Key = Key(54);
    pub const LEFT_ALT: Key = Key(56);
    pub const SPACE: Key = Key(57);
    pub const CAPSLOCK: Key = Key(58);
    pub const NUMLOCK: Key = Key(69);
    pub const SCROLLLOCK: Key = Key(70);
    pub const RIGHT_CTRL: Key = Key(97);
    pub const RIGHT_ALT: Key = Key(100);
    pub const LEFT_META: Key = Key(125);
    pub const RIGHT_META: Key = Key(126);

    /// Get the raw numeric code value
    pub fn code(self) -> u16 {
        self.0
    }

    /// Get the name of this key
    pub fn name(self) -> &'static str {
        key_name(self.0)
    }

    /// Whether this key is one of the 26 alphabetic keys.
    ///
    /// The alphabetic keys occupy three code ranges on the QWERTY rows:
    /// Q..P (16-25), A..L (30-38), Z..M (44-50).
    pub fn is_letter(self) -> bool {
        matches!(self.0, 16..=25 | 30..=38 | 44..=50)
    }
}

impl From<u16> for Key {
    fn from(code: u16) -> Self {
        Key(code)
    }
}

impl From<Key> for u16 {
    fn from(key: Key) -> Self {
        key.0
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Key {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        key_from_name(s).ok_or_else(|| format!("Unknown key: {}", s))
    }
}

/// Display name for a key code
pub fn key_name(code: u16) -> &'static str {
    match code {
        1 => "ESC",
        14 => "BACKSPACE",
        15 => "TAB",
        16 => "Q",
        17 => "W",
        18 => "E",
        19 => "R",
        20 => "T",
        21 => "Y",
        22 => "U",
        23 => "I",
        24 => "O",
        25 => "P",
        28 => "ENTER",
        29 => "LEFT_CTRL",
        30 => "A",
        31 => "S",
        32 => "D",
        33 => "F",
        34 => "G",
        35 => "H",
        36 => "J",
        37 => "K",
        38 => "L",
        42 => "LEFT_SHIFT",
        44 => "Z",
        45 => "X",
        46 => "C",
        47 => "V",
        48 => "B",
        49 => "N",
        50 => "M",
        54 => "RIGHT_SHIFT",
        56 => "LEFT_ALT",
        57 => "SPACE",
        58 => "CAPSLOCK",
        69 => "NUMLOCK",
        70 => "SCROLLLOCK",
        97 => "RIGHT_CTRL",
        100 => "RIGHT_ALT",
        125 => "LEFT_META",
        126 => "RIGHT_META",
        _ => "UNKNOWN",
    }
}

/// Try to parse a key name to a key code
///
/// Accepts the canonical names from `key_name` plus a few common aliases,
/// case-insensitively.
pub fn key_from_name(name: &str) -> Option<Key> {
    let name_upper = name.to_uppercase();
    let code = match name_upper.as_str() {
        "ESC" | "ESCAPE" => 1,
        "BACKSPACE" => 14,
        "TAB" => 15,
        "Q" => 16,
        "W" => 17,
        "E" => 18,
        "R" => 19,
        "T" => 20,
        "Y" => 21,
        "U" => 22,
        "I" => 23,
        "O" => 24,
        "P" => 25,
        "ENTER" | "RETURN" => 28,
        "LEFT_CTRL" | "CTRL" | "LCTRL" => 29,
        "A" => 30,
        "S" => 31,
        "D" => 32,
        "F" => 33,
        "G" => 34,
        "H" => 35,
        "J" => 36,
        "K" => 37,
        "L" => 38,
        "LEFT_SHIFT" | "SHIFT" | "LSHIFT" => 42,
        "Z" => 44,
        "X" => 45,
        "C" => 46,
        "V" => 47,
        "B" => 48,
        "N" => 49,
        "M" => 50,
        "RIGHT_SHIFT" | "RSHIFT" => 54,
        "LEFT_ALT" | "ALT" | "LALT" => 56,
        "SPACE" => 57,
        "CAPSLOCK" | "CAPS_LOCK" | "CAPS" => 58,
        "NUMLOCK" | "NUM_LOCK" => 69,
        "SCROLLLOCK" | "SCROLL_LOCK" => 70,
        "RIGHT_CTRL" | "RCTRL" => 97,
        "RIGHT_ALT" | "RALT" => 100,
        "LEFT_META" | "META" | "SUPER" | "LMETA" => 125,
        "RIGHT_META" | "RMETA" => 126,
        _ => return None,
    };
    Some(Key(code))
}
