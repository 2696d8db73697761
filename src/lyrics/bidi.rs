//! Text direction detection for word highlighting.

use unicode_bidi::{BidiClass, bidi_class};

/// Whether the first strongly directional character of `text` is right-to-left.
pub fn is_rtl(text: &str) -> bool {
    text.chars()
        .map(bidi_class)
        .find(|class| matches!(class, BidiClass::L | BidiClass::R | BidiClass::AL))
        .is_some_and(|class| class != BidiClass::L)
}
