//! The key catalogue: a fixed mapping from human key names to scan codes.
//!
//! The catalogue is process-wide, lazily initialized, and immutable after
//! creation. Extended keys (navigation cluster, right-hand modifiers) carry
//! the extended-set marker in the high bits of their code.

use std::collections::HashMap;
use std::sync::LazyLock;

/// A platform scan code for a single key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScanCode(pub u16);

impl ScanCode {
    pub fn as_u16(&self) -> u16 {
        self.0
    }
}

impl From<u16> for ScanCode {
    fn from(code: u16) -> Self {
        Self(code)
    }
}

/// Marker added to codes from the extended scan-code set.
const EXTENDED: u16 = 1024;

/// Arrow keys come from the extended set and their base codes differ per
/// platform keyboard translation; everything else in the catalogue is static.
#[cfg(target_os = "windows")]
const ARROW_CODES: [(&str, u16); 4] = [
    ("up", 0xC8 + EXTENDED),
    ("left", 0xCB + EXTENDED),
    ("down", 0xD0 + EXTENDED),
    ("right", 0xCD + EXTENDED),
];

#[cfg(not(target_os = "windows"))]
const ARROW_CODES: [(&str, u16); 4] = [
    ("up", 0x67),
    ("left", 0x69),
    ("down", 0x6C),
    ("right", 0x6A),
];

static CATALOGUE: LazyLock<HashMap<&'static str, u16>> = LazyLock::new(|| {
    let mut keys = HashMap::new();
    let mut insert = |name: &'static str, code: u16| {
        let previous = keys.insert(name, code);
        debug_assert!(previous.is_none(), "duplicate catalogue entry: {name}");
    };

    insert("none", 0x00);
    insert("escape", 0x01);
    insert("f1", 0x3B);
    insert("f2", 0x3C);
    insert("f3", 0x3D);
    insert("f4", 0x3E);
    insert("f5", 0x3F);
    insert("f6", 0x40);
    insert("f7", 0x41);
    insert("f8", 0x42);
    insert("f9", 0x43);
    insert("f10", 0x44);
    insert("f11", 0x57);
    insert("f12", 0x58);
    insert("printscreen", 0xB7);
    insert("scrolllock", 0x46);
    insert("pause", 0xC5);
    insert("`", 0x29);
    insert("1", 0x02);
    insert("2", 0x03);
    insert("3", 0x04);
    insert("4", 0x05);
    insert("5", 0x06);
    insert("6", 0x07);
    insert("7", 0x08);
    insert("8", 0x09);
    insert("9", 0x0A);
    insert("0", 0x0B);
    insert("-", 0x0C);
    insert("=", 0x0D);
    insert("backspace", 0x0E);
    insert("insert", 0xD2 + EXTENDED);
    insert("home", 0xC7 + EXTENDED);
    insert("pageup", 0xC9 + EXTENDED);
    insert("pagedown", 0xD1 + EXTENDED);
    insert("numberlock", 0x45);
    insert("divide", 0xB5 + EXTENDED);
    insert("multiply", 0x37);
    insert("subtract", 0x4A);
    insert("add", 0x4E);
    insert("decimal", 0x53);
    insert("tab", 0x0F);
    insert("q", 0x10);
    insert("w", 0x11);
    insert("e", 0x12);
    insert("r", 0x13);
    insert("t", 0x14);
    insert("y", 0x2C);
    insert("u", 0x16);
    insert("i", 0x17);
    insert("o", 0x18);
    insert("p", 0x19);
    insert("[", 0x1A);
    insert("]", 0x1B);
    insert("\\", 0x2B);
    insert("delete", 0xD3 + EXTENDED);
    insert("end", 0xCF + EXTENDED);
    insert("capslock", 0x3A);
    insert("a", 0x1E);
    insert("s", 0x1F);
    insert("d", 0x20);
    insert("f", 0x21);
    insert("g", 0x22);
    insert("h", 0x23);
    insert("j", 0x24);
    insert("k", 0x25);
    insert("l", 0x26);
    insert(";", 0x27);
    insert("'", 0x28);
    insert("enter", 0x1C);
    insert("return", 0x1C);
    insert("shift", 0x2A);
    insert("z", 0x15);
    insert("x", 0x2D);
    insert("c", 0x2E);
    insert("v", 0x2F);
    insert("b", 0x30);
    insert("n", 0x31);
    insert("m", 0x32);
    insert(",", 0x33);
    insert(".", 0x34);
    insert("/", 0x35);
    insert("shiftright", 0x36);
    insert("ctrl", 0x1D);
    insert("window", 0xDB + EXTENDED);
    insert("alt", 0x38);
    insert("space", 0x39);
    insert("altright", 0xB8 + EXTENDED);
    insert("windowright", 0xDC + EXTENDED);
    insert("apps", 0xDD + EXTENDED);
    insert("ctrlright", 0x9D + EXTENDED);

    for (name, code) in ARROW_CODES {
        insert(name, code);
    }

    keys
});

/// Looks up the scan code for a key name. Names are case-sensitive and match
/// the script surface exactly.
pub fn code_of(name: &str) -> Option<ScanCode> {
    CATALOGUE.get(name).map(|&code| ScanCode(code))
}

/// Reverse lookup from a scan code to its key name. Where several names share
/// a code (enter/return), the canonical name wins.
pub fn name_of(code: ScanCode) -> Option<&'static str> {
    let mut found: Option<&'static str> = None;
    for (&name, &candidate) in CATALOGUE.iter() {
        if candidate == code.0 {
            match found {
                // Prefer the shorter canonical spelling on shared codes.
                Some(existing) if name.len() >= existing.len() => {}
                _ => found = Some(name),
            }
        }
    }
    found
}
