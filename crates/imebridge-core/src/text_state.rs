use std::ops::Range;

use unicode_segmentation::UnicodeSegmentation;

use crate::{InputContext, WindowHandle};

/// Text buffer with a caret/selection and an optional IME composition,
/// edited through [`InputContext`]. All ranges are byte offsets.
#[derive(Clone, Debug)]
pub struct TextInputState {
    handle: WindowHandle,
    text: String,
    selection: Range<usize>,
    composition: Option<Range<usize>>,
    composing: bool,
}

fn clamp_to_char_boundary(text: &str, mut i: usize) -> usize {
    i = i.min(text.len());
    while i > 0 && !text.is_char_boundary(i) {
        i -= 1;
    }
    i
}

/// Last grapheme boundary at or before `byte`.
fn floor_grapheme_boundary(text: &str, byte: usize) -> usize {
    let mut last = 0usize;
    for (i, _) in text.grapheme_indices(true) {
        if i > byte {
            break;
        }
        last = i;
    }
    last
}

/// First grapheme boundary at or after `byte`.
fn ceil_grapheme_boundary(text: &str, byte: usize) -> usize {
    for (i, _) in text.grapheme_indices(true) {
        if i >= byte {
            return i;
        }
    }
    text.len()
}

impl TextInputState {
    pub fn new(handle: WindowHandle) -> Self {
        Self {
            handle,
            text: String::new(),
            selection: 0..0,
            composition: None,
            composing: false,
        }
    }

    /// Starts with `text`, caret at the end.
    pub fn with_text(handle: WindowHandle, text: impl Into<String>) -> Self {
        let text = text.into();
        let end = text.len();
        Self {
            handle,
            text,
            selection: end..end,
            composition: None,
            composing: false,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn selection(&self) -> Range<usize> {
        self.selection.clone()
    }

    pub fn composition(&self) -> Option<Range<usize>> {
        self.composition.clone()
    }

    pub fn composition_text(&self) -> Option<&str> {
        self.composition.as_ref().map(|r| &self.text[r.clone()])
    }

    pub fn is_composing(&self) -> bool {
        self.composing || self.composition.is_some()
    }

    pub fn caret(&self) -> usize {
        self.selection.end
    }

    pub fn set_caret(&mut self, byte: usize) {
        let pos = clamp_to_char_boundary(&self.text, byte);
        self.selection = pos..pos;
    }

    pub fn select(&mut self, range: Range<usize>) {
        let s = clamp_to_char_boundary(&self.text, range.start);
        let e = clamp_to_char_boundary(&self.text, range.end);
        self.selection = s.min(e)..s.max(e);
    }

    /// Text outside any composition; what the field would hold if the
    /// input method were dismissed now.
    pub fn committed_text(&self) -> String {
        match &self.composition {
            Some(r) => {
                let mut out = self.text.clone();
                out.replace_range(r.clone(), "");
                out
            }
            None => self.text.clone(),
        }
    }

    fn set_composition(&mut self, text: &str) {
        if text.is_empty() {
            self.cancel_composition();
            return;
        }

        let anchor_start = if let Some(r) = self.composition.take() {
            let mut s = clamp_to_char_boundary(&self.text, r.start);
            let mut e = clamp_to_char_boundary(&self.text, r.end);
            if e < s {
                std::mem::swap(&mut s, &mut e);
            }
            self.text.replace_range(s..e, text);
            s
        } else {
            // replaces the selection, like typing would
            let s = clamp_to_char_boundary(&self.text, self.selection.start);
            let e = clamp_to_char_boundary(&self.text, self.selection.end);
            self.text.replace_range(s..e, text);
            s
        };

        let end = anchor_start + text.len();
        self.composition = Some(anchor_start..end);
        self.selection = end..end;
    }

    fn commit_composition(&mut self, text: &str) {
        let (s, e) = match self.composition.take() {
            Some(r) => (
                clamp_to_char_boundary(&self.text, r.start),
                clamp_to_char_boundary(&self.text, r.end),
            ),
            None => (
                clamp_to_char_boundary(&self.text, self.selection.start),
                clamp_to_char_boundary(&self.text, self.selection.end),
            ),
        };
        self.text.replace_range(s..e, text);
        let new_pos = s + text.len();
        self.selection = new_pos..new_pos;
    }

    fn cancel_composition(&mut self) {
        if let Some(r) = self.composition.take() {
            let s = clamp_to_char_boundary(&self.text, r.start);
            let e = clamp_to_char_boundary(&self.text, r.end);
            if s <= e {
                self.text.replace_range(s..e, "");
                self.selection = s..s;
            }
        }
    }
}

impl InputContext for TextInputState {
    fn handle(&self) -> WindowHandle {
        self.handle
    }

    fn commit(&mut self, text: &str) {
        self.commit_composition(text);
        self.composing = false;
    }

    fn preedit_changed(&mut self, text: &str, commit: &str) {
        if !commit.is_empty() {
            self.commit_composition(commit);
        }
        self.set_composition(text);
        self.composing = !text.is_empty();
    }

    /// Deletes `length` bytes starting `index` bytes from the caret (or from
    /// the start of the composition while composing). The range is widened
    /// to grapheme boundaries and never reaches into the composition.
    fn delete_range(&mut self, index: i32, length: u32) {
        let len = self.text.len() as i64;
        let anchor = self
            .composition
            .as_ref()
            .map_or(self.selection.end, |r| r.start) as i64;

        let lo_raw = (anchor + index as i64).clamp(0, len) as usize;
        let hi_raw = (lo_raw as i64 + length as i64).clamp(0, len) as usize;
        let lo = floor_grapheme_boundary(&self.text, lo_raw);
        let mut hi = ceil_grapheme_boundary(&self.text, hi_raw);
        if let Some(r) = &self.composition {
            hi = hi.min(r.start);
        }
        if lo >= hi {
            return;
        }

        self.text.replace_range(lo..hi, "");
        let removed = hi - lo;
        let shift = |pos: usize| {
            if pos >= hi {
                pos - removed
            } else if pos > lo {
                lo
            } else {
                pos
            }
        };
        self.selection = shift(self.selection.start)..shift(self.selection.end);
        if let Some(r) = self.composition.as_mut() {
            *r = shift(r.start)..shift(r.end);
        }
    }

    fn preedit_start(&mut self) {
        self.composing = true;
    }

    fn preedit_end(&mut self) {
        self.cancel_composition();
        self.composing = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(text: &str) -> TextInputState {
        TextInputState::with_text(WindowHandle(1), text)
    }

    #[test]
    fn test_commit_inserts_at_caret() {
        let mut st = field("ac");
        st.set_caret(1);
        st.commit("b");
        assert_eq!(st.text(), "abc");
        assert_eq!(st.caret(), 2);
    }

    #[test]
    fn test_commit_replaces_selection() {
        let mut st = field("hello world");
        st.select(6..11);
        st.commit("there");
        assert_eq!(st.text(), "hello there");
    }

    #[test]
    fn test_preedit_then_commit() {
        let mut st = field("x");
        st.preedit_changed("ni", "");
        assert_eq!(st.text(), "xni");
        assert_eq!(st.composition_text(), Some("ni"));
        assert_eq!(st.committed_text(), "x");

        st.preedit_changed("nih", "");
        assert_eq!(st.text(), "xnih");

        st.commit("你");
        assert_eq!(st.text(), "x你");
        assert_eq!(st.composition(), None);
        assert!(!st.is_composing());
        assert_eq!(st.caret(), st.text().len());
    }

    #[test]
    fn test_preedit_changed_with_commit_text() {
        let mut st = field("");
        st.preedit_changed("ni", "");
        // input method finalises the first word and opens a new composition
        st.preedit_changed("h", "你");
        assert_eq!(st.text(), "你h");
        assert_eq!(st.composition_text(), Some("h"));
        assert_eq!(st.committed_text(), "你");
    }

    #[test]
    fn test_empty_preedit_clears_composition() {
        let mut st = field("ab");
        st.preedit_changed("zz", "");
        st.preedit_changed("", "");
        assert_eq!(st.text(), "ab");
        assert_eq!(st.composition(), None);
        assert!(!st.is_composing());
    }

    #[test]
    fn test_preedit_end_cancels() {
        let mut st = field("ab");
        st.preedit_start();
        assert!(st.is_composing());
        st.preedit_changed("cd", "");
        st.preedit_end();
        assert_eq!(st.text(), "ab");
        assert_eq!(st.caret(), 2);
        assert!(!st.is_composing());
    }

    #[test]
    fn test_delete_before_caret() {
        let mut st = field("hello");
        st.delete_range(-2, 2);
        assert_eq!(st.text(), "hel");
        assert_eq!(st.caret(), 3);
    }

    #[test]
    fn test_delete_after_caret_keeps_caret() {
        let mut st = field("hello");
        st.set_caret(1);
        st.delete_range(0, 3);
        assert_eq!(st.text(), "ho");
        assert_eq!(st.caret(), 1);
    }

    #[test]
    fn test_delete_clamps_and_snaps_to_graphemes() {
        // "é" as e + combining acute: 3 bytes, one grapheme
        let mut st = field("ae\u{301}b");
        st.set_caret(4);
        // points into the middle of the cluster
        st.delete_range(-2, 1);
        assert_eq!(st.text(), "ab");
        assert_eq!(st.caret(), 1);

        let mut st = field("abc");
        st.delete_range(-100, 1000);
        assert_eq!(st.text(), "");
        assert_eq!(st.caret(), 0);
    }

    #[test]
    fn test_delete_stops_at_composition() {
        let mut st = field("abc");
        st.preedit_changed("xy", "");
        assert_eq!(st.text(), "abcxy");
        // relative to the composition start, reaching into it
        st.delete_range(-1, 3);
        assert_eq!(st.text(), "abxy");
        assert_eq!(st.composition_text(), Some("xy"));
        assert_eq!(st.caret(), 4);
    }
}
