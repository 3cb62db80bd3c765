// SPDX-License-Identifier: GPL-3.0-only

//! Terminal preview window
//!
//! Renders the composed preview to the terminal using Unicode half-block
//! characters for improved vertical resolution. The window title goes to
//! the terminal emulator and is repeated on the top line; the bottom line
//! is a status bar.

use std::io::{self, Stdout, stdout};

use crossterm::{
    execute,
    terminal::{
        EnterAlternateScreen, LeaveAlternateScreen, SetTitle, disable_raw_mode, enable_raw_mode,
    },
};
use image::RgbImage;
use ratatui::{
    Terminal,
    backend::CrosstermBackend,
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    widgets::Widget,
};
use tracing::{debug, warn};

use crate::capture_loop::PreviewSurface;
use crate::errors::AppResult;

/// Alternate-screen preview; the terminal is restored on drop
pub struct TerminalPreview {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    title: Option<String>,
    active: bool,
}

impl TerminalPreview {
    pub fn enter() -> io::Result<Self> {
        enable_raw_mode()?;
        let mut stdout = stdout();
        if let Err(e) = execute!(stdout, EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(e);
        }
        let terminal = Terminal::new(CrosstermBackend::new(stdout))?;
        debug!("Entered terminal preview");
        Ok(Self {
            terminal,
            title: None,
            active: true,
        })
    }

    /// Restore the terminal and report any failure
    pub fn leave(mut self) -> io::Result<()> {
        self.restore()
    }

    fn restore(&mut self) -> io::Result<()> {
        if !self.active {
            return Ok(());
        }
        self.active = false;
        disable_raw_mode()?;
        execute!(self.terminal.backend_mut(), LeaveAlternateScreen)?;
        self.terminal.show_cursor()
    }
}

impl Drop for TerminalPreview {
    fn drop(&mut self) {
        if let Err(e) = self.restore() {
            warn!(error = %e, "Failed to restore terminal");
        }
    }
}

impl PreviewSurface for TerminalPreview {
    fn present(&mut self, title: &str, canvas: &RgbImage, status: &str) -> AppResult<()> {
        if self.title.as_deref() != Some(title) {
            execute!(self.terminal.backend_mut(), SetTitle(title))?;
            self.title = Some(title.to_string());
        }

        self.terminal.draw(|f| {
            let area = f.area();
            let title_area = Rect {
                height: area.height.min(1),
                ..area
            };
            let status_area = Rect {
                y: area.y + area.height.saturating_sub(1),
                height: area.height.min(1),
                ..area
            };
            let frame_area = Rect {
                y: area.y + 1,
                height: area.height.saturating_sub(2),
                ..area
            };

            f.render_widget(
                TextBar {
                    message: title,
                    style: Style::default().fg(Color::Black).bg(Color::Gray),
                },
                title_area,
            );
            f.render_widget(FrameWidget { image: canvas }, frame_area);
            f.render_widget(
                TextBar {
                    message: status,
                    style: Style::default().fg(Color::White).bg(Color::DarkGray),
                },
                status_area,
            );
        })?;
        Ok(())
    }
}

/// Widget that renders an image using half-block characters
pub struct FrameWidget<'a> {
    pub image: &'a RgbImage,
}

impl Widget for FrameWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let (width, height) = self.image.dimensions();
        if width == 0 || height == 0 || area.width == 0 || area.height == 0 {
            return;
        }

        // Each terminal cell displays 2 vertical pixels
        let aspect = width as f64 / height as f64;
        let term_width = area.width as f64;
        let term_height = (area.height * 2) as f64;

        let (display_width, display_height) = if term_width / term_height > aspect {
            let h = term_height;
            ((h * aspect) as u16, (h / 2.0) as u16)
        } else {
            let w = term_width;
            (w as u16, (w / aspect / 2.0) as u16)
        };
        let display_width = display_width.clamp(1, area.width);
        let display_height = display_height.clamp(1, area.height);

        let x_offset = area.x + (area.width - display_width) / 2;
        let y_offset = area.y + (area.height - display_height) / 2;
        let x_scale = width as f64 / display_width as f64;
        let y_scale = height as f64 / (display_height as f64 * 2.0);

        // Upper half (▀) colored with fg, lower half with bg
        for ty in 0..display_height {
            for tx in 0..display_width {
                let src_x = (tx as f64 * x_scale) as u32;
                let src_top = (ty as f64 * 2.0 * y_scale) as u32;
                let src_bottom = ((ty as f64 * 2.0 + 1.0) * y_scale) as u32;

                if let Some(cell) = buf.cell_mut((x_offset + tx, y_offset + ty)) {
                    cell.set_char('▀');
                    cell.set_fg(sample(self.image, src_x, src_top));
                    cell.set_bg(sample(self.image, src_x, src_bottom));
                }
            }
        }
    }
}

fn sample(image: &RgbImage, x: u32, y: u32) -> Color {
    let x = x.min(image.width() - 1);
    let y = y.min(image.height() - 1);
    let [r, g, b] = image.get_pixel(x, y).0;
    Color::Rgb(r, g, b)
}

/// One-line bar with a solid background
struct TextBar<'a> {
    message: &'a str,
    style: Style,
}

impl Widget for TextBar<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.height == 0 {
            return;
        }
        for x in area.x..area.x + area.width {
            if let Some(cell) = buf.cell_mut((x, area.y)) {
                cell.set_char(' ');
                cell.set_style(self.style);
            }
        }
        // Truncate on characters; status text carries non-ASCII arrows
        let text: String = self.message.chars().take(area.width as usize).collect();
        buf.set_string(area.x, area.y, text, self.style);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_frame_widget_fills_area() {
        let image = RgbImage::from_fn(8, 4, |_, y| {
            if y < 2 { Rgb([255, 0, 0]) } else { Rgb([0, 0, 255]) }
        });
        let area = Rect::new(0, 0, 8, 2);
        let mut buf = Buffer::empty(area);
        FrameWidget { image: &image }.render(area, &mut buf);

        let top = &buf[(0, 0)];
        assert_eq!(top.symbol(), "▀");
        assert_eq!(top.fg, Color::Rgb(255, 0, 0));
        assert_eq!(buf[(0, 1)].bg, Color::Rgb(0, 0, 255));
    }

    #[test]
    fn test_frame_widget_keeps_aspect() {
        // Wide image in a square-ish area leaves rows blank
        let image = RgbImage::from_pixel(40, 10, Rgb([9, 9, 9]));
        let area = Rect::new(0, 0, 20, 20);
        let mut buf = Buffer::empty(area);
        FrameWidget { image: &image }.render(area, &mut buf);

        assert_eq!(buf[(0, 0)].symbol(), " ");
        assert_eq!(buf[(10, 10)].symbol(), "▀");
    }

    #[test]
    fn test_text_bar_truncates_on_chars() {
        let area = Rect::new(0, 0, 5, 1);
        let mut buf = Buffer::empty(area);
        TextBar {
            message: "a→bcdefg",
            style: Style::default(),
        }
        .render(area, &mut buf);
        assert_eq!(buf[(1, 0)].symbol(), "→");
    }
}
