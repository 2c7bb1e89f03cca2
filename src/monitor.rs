//! A terminal progress bar for a running spectrogram. Any key press
//! cancels the work.

use crate::error::{PressError, PressResult};
use crate::raster::RasterImage;
use crate::spectrogrammer::PendingSpectrogram;

use crossterm::{
    event::{self, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use log::info;
use ratatui::{
    prelude::*,
    widgets::{block::Title, *},
    Terminal,
};
use std::io::stdout;
use std::time::Duration;

/// Puts the terminal back the way we found it, even on early returns.
struct RawScreen;

impl RawScreen {
    fn enter() -> PressResult<Self> {
        enable_raw_mode()?;
        stdout().execute(EnterAlternateScreen)?;
        Ok(Self)
    }
}

impl Drop for RawScreen {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = stdout().execute(LeaveAlternateScreen);
    }
}

/// Draws a gauge for `pending` until it finishes, then returns its image.
/// A key press cancels the spectrogram and yields [PressError::Cancelled].
pub fn watch_spectrogram(mut pending: PendingSpectrogram) -> PressResult<RasterImage> {
    let screen = RawScreen::enter()?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;
    terminal.clear()?;

    let result = loop {
        if let Some(result) = pending.try_take() {
            break result;
        }

        let ratio = pending.progress().clamp(0.0, 1.0) as f64;
        let title = Title::from(" Pressing spectrogram... ".magenta().bold());
        let footer = Title::from(format!(
            " {} frames, press any key to cancel ",
            pending.total_frames()
        ));
        let gauge = Gauge::default()
            .block(
                Block::default()
                    .title(title.alignment(Alignment::Center))
                    .title(
                        footer
                            .alignment(Alignment::Center)
                            .position(block::Position::Bottom),
                    )
                    .borders(Borders::ALL),
            )
            .gauge_style(Style::default().fg(Color::Magenta))
            .ratio(ratio);
        terminal.draw(|frame| {
            let area = frame.size();
            frame.render_widget(gauge, area);
        })?;

        if event::poll(Duration::from_millis(16))? {
            if let event::Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    pending.cancel();
                    info!("spectrogram cancelled from the keyboard");
                    break pending.wait();
                }
            }
        }
    };

    drop(screen);
    result
}

/// Uses the terminal gauge when `watch` is set, otherwise just waits.
pub fn finish_spectrogram(pending: PendingSpectrogram, watch: bool) -> PressResult<RasterImage> {
    if watch {
        watch_spectrogram(pending)
    } else {
        pending.wait()
    }
}
