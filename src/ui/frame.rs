/// Character-cell frame and the diff writer that pushes it to the terminal.
///
/// The renderer composes a fresh `Frame` every tick, `write_diff` emits only
/// the glyphs that differ from the frame currently on screen, and the two
/// frames are swapped. A wide glyph (emoji) owns the column to its right,
/// which holds `Glyph::SPACER`.

use std::io::{self, Write};

use crossterm::{
    cursor::MoveTo,
    queue,
    style::{Color, Print, SetBackgroundColor, SetForegroundColor},
};

/// Explicit dark background for every glyph, so the inter-row gaps match
/// on terminals that paint them from the last Clear.
pub const BASE_BG: Color = Color::Rgb { r: 22, g: 22, b: 35 };

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Glyph {
    bytes: [u8; 8],
    len: u8,
    pub fg: Color,
    pub bg: Color,
    /// Occupies two terminal columns.
    pub wide: bool,
    /// Right half of a wide glyph; never printed.
    pub spacer: bool,
}

impl Glyph {
    pub const BLANK: Glyph = Glyph::ascii(b' ', Color::White, BASE_BG);

    pub const SPACER: Glyph = Glyph {
        bytes: [0; 8],
        len: 0,
        fg: Color::White,
        bg: BASE_BG,
        wide: false,
        spacer: true,
    };

    /// Never composed, so a frame filled with it differs everywhere.
    pub const STALE: Glyph = Glyph::ascii(b'?', Color::Magenta, Color::Magenta);

    const fn ascii(b: u8, fg: Color, bg: Color) -> Glyph {
        Glyph { bytes: [b, 0, 0, 0, 0, 0, 0, 0], len: 1, fg, bg, wide: false, spacer: false }
    }

    /// `Color::Reset` as background means the base background.
    pub fn new(c: char, fg: Color, bg: Color) -> Self {
        let mut bytes = [0u8; 8];
        let len = c.encode_utf8(&mut bytes).len() as u8;
        let bg = if bg == Color::Reset { BASE_BG } else { bg };
        Glyph { bytes, len, fg, bg, wide: false, spacer: false }
    }

    pub fn wide(c: char, fg: Color, bg: Color) -> Self {
        Glyph { wide: true, ..Glyph::new(c, fg, bg) }
    }

    pub fn as_str(&self) -> &str {
        std::str::from_utf8(&self.bytes[..self.len as usize]).unwrap_or("?")
    }
}

pub struct Frame {
    width: usize,
    height: usize,
    glyphs: Vec<Glyph>,
}

impl Frame {
    pub fn new(width: usize, height: usize) -> Self {
        Frame { width, height, glyphs: vec![Glyph::BLANK; width * height] }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn resize(&mut self, width: usize, height: usize) {
        if (self.width, self.height) != (width, height) {
            *self = Frame::new(width, height);
        }
    }

    pub fn fill(&mut self, glyph: Glyph) {
        self.glyphs.fill(glyph);
    }

    /// Out-of-range writes are dropped.
    pub fn set(&mut self, x: usize, y: usize, glyph: Glyph) {
        if x < self.width && y < self.height {
            self.glyphs[y * self.width + x] = glyph;
        }
    }

    pub fn get(&self, x: usize, y: usize) -> Glyph {
        if x < self.width && y < self.height {
            self.glyphs[y * self.width + x]
        } else {
            Glyph::BLANK
        }
    }

    /// One column per char, clipped at the right edge.
    pub fn put_str(&mut self, x: usize, y: usize, s: &str, fg: Color, bg: Color) {
        for (cx, ch) in (x..self.width).zip(s.chars()) {
            self.set(cx, y, Glyph::new(ch, fg, bg));
        }
    }

    pub fn put_wide(&mut self, x: usize, y: usize, c: char, fg: Color, bg: Color) {
        self.set(x, y, Glyph::wide(c, fg, bg));
        self.set(x + 1, y, Glyph::SPACER);
    }

    pub fn fill_row(&mut self, y: usize, bg: Color) {
        for x in 0..self.width {
            self.set(x, y, Glyph::new(' ', Color::White, bg));
        }
    }

    /// Queue the glyphs of `self` that differ from `shown` and flush once.
    pub fn write_diff<W: Write>(&self, shown: &Frame, out: &mut W) -> io::Result<()> {
        let mut pen = Pen::new(out)?;
        for y in 0..self.height {
            let mut x = 0;
            while x < self.width {
                let glyph = self.get(x, y);
                let span = if glyph.wide { 2 } else { 1 };
                let changed = (x..x + span).any(|cx| self.get(cx, y) != shown.get(cx, y));
                if changed && !glyph.spacer {
                    pen.draw(x, y, glyph, span)?;
                }
                x += span;
            }
        }
        pen.out.flush()
    }
}

/// Terminal drawing state, so colours and cursor moves are only emitted
/// when they change.
struct Pen<'a, W: Write> {
    out: &'a mut W,
    fg: Color,
    bg: Color,
    cursor: Option<(usize, usize)>,
}

impl<'a, W: Write> Pen<'a, W> {
    fn new(out: &'a mut W) -> io::Result<Self> {
        // Never ResetColor here: the terminal default may differ from BASE_BG.
        queue!(out, SetForegroundColor(Color::White), SetBackgroundColor(BASE_BG))?;
        Ok(Pen { out, fg: Color::White, bg: BASE_BG, cursor: None })
    }

    fn draw(&mut self, x: usize, y: usize, glyph: Glyph, span: usize) -> io::Result<()> {
        if self.cursor != Some((x, y)) {
            queue!(self.out, MoveTo(x as u16, y as u16))?;
        }
        if glyph.fg != self.fg {
            queue!(self.out, SetForegroundColor(glyph.fg))?;
            self.fg = glyph.fg;
        }
        if glyph.bg != self.bg {
            queue!(self.out, SetBackgroundColor(glyph.bg))?;
            self.bg = glyph.bg;
        }
        queue!(self.out, Print(glyph.as_str()))?;
        self.cursor = Some((x + span, y));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn diff(next: &Frame, shown: &Frame) -> String {
        let mut out = Vec::new();
        next.write_diff(shown, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn unchanged_frame_prints_nothing() {
        let mut a = Frame::new(6, 2);
        a.put_str(0, 0, "abc", Color::White, Color::Reset);
        let mut b = Frame::new(6, 2);
        b.put_str(0, 0, "abc", Color::White, Color::Reset);
        let text = diff(&a, &b);
        assert!(!text.contains('a') && !text.contains('c'));
    }

    #[test]
    fn only_changed_glyphs_are_printed() {
        let shown = Frame::new(6, 2);
        let mut next = Frame::new(6, 2);
        next.put_str(2, 1, "Z", Color::White, Color::Reset);
        let text = diff(&next, &shown);
        assert!(text.contains('Z'));
        assert_eq!(text.matches(' ').count(), 0);
    }

    #[test]
    fn stale_frame_redraws_everything() {
        let mut shown = Frame::new(3, 1);
        shown.fill(Glyph::STALE);
        let mut next = Frame::new(3, 1);
        next.put_str(0, 0, "xyz", Color::White, Color::Reset);
        let text = diff(&next, &shown);
        assert!(text.contains("xyz"));
    }

    #[test]
    fn wide_glyph_owns_the_next_column() {
        let mut f = Frame::new(4, 1);
        f.put_wide(1, 0, '🦊', Color::Reset, Color::Reset);
        assert!(f.get(1, 0).wide);
        assert!(f.get(2, 0).spacer);
        assert_eq!(f.get(1, 0).as_str(), "🦊");
        assert_eq!(f.get(1, 0).bg, BASE_BG);
        let text = diff(&f, &Frame::new(4, 1));
        assert_eq!(text.matches('🦊').count(), 1);
    }

    #[test]
    fn writes_outside_the_frame_are_dropped() {
        let mut f = Frame::new(2, 2);
        f.set(5, 5, Glyph::new('x', Color::White, Color::Reset));
        f.put_str(1, 0, "long", Color::White, Color::Reset);
        assert_eq!(f.get(1, 0).as_str(), "l");
        assert_eq!(f.get(5, 5), Glyph::BLANK);
    }
}
