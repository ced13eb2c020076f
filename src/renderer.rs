use crossterm::{
    cursor::{Hide, MoveTo, Show},
    execute, queue,
    style::{Print, ResetColor},
    terminal::{Clear, ClearType},
};
use log::debug;
use std::io::{self, stdout, Stdout, Write};

/// Line-buffered text output the playback loop draws into.
pub trait TextSink {
    /// Blank the display and move to its top-left corner.
    fn clear(&mut self) -> io::Result<()>;

    /// Write one line of text followed by a line break.
    fn write_line(&mut self, line: &str) -> io::Result<()>;

    /// Push everything written so far to the display.
    fn flush(&mut self) -> io::Result<()>;
}

/// Terminal renderer for text-art frames
pub struct TerminalRenderer<W: Write = Stdout> {
    out: W,
    initialized: bool,
}

impl TerminalRenderer<Stdout> {
    /// Renderer drawing to the process's standard output.
    pub fn stdout() -> Self {
        Self::new(stdout())
    }
}

impl<W: Write> TerminalRenderer<W> {
    pub fn new(out: W) -> Self {
        Self { out, initialized: false }
    }

    /// Hide the cursor and clear the screen.
    pub fn init(&mut self) -> io::Result<()> {
        execute!(self.out, Hide, Clear(ClearType::All), MoveTo(0, 0))?;
        self.initialized = true;
        debug!("Terminal initialized for rendering");
        Ok(())
    }

    /// Restore the cursor and default colors. Safe to call more than once.
    pub fn cleanup(&mut self) -> io::Result<()> {
        if !self.initialized {
            return Ok(());
        }
        self.initialized = false;
        execute!(self.out, ResetColor, Show)?;
        debug!("Terminal restored to normal state");
        Ok(())
    }

    pub fn get_ref(&self) -> &W {
        &self.out
    }
}

impl<W: Write> TextSink for TerminalRenderer<W> {
    fn clear(&mut self) -> io::Result<()> {
        queue!(self.out, Clear(ClearType::All), MoveTo(0, 0))
    }

    fn write_line(&mut self, line: &str) -> io::Result<()> {
        queue!(self.out, Print(line), Print("\n"))
    }

    fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}

impl<W: Write> Drop for TerminalRenderer<W> {
    fn drop(&mut self) {
        // Ensure terminal is restored on drop
        let _ = self.cleanup();
    }
}
