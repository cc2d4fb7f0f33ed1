use std::{
    io::{self, Write},
    sync::{
        Arc, Mutex, MutexGuard, PoisonError,
        mpsc::{self, RecvTimeoutError, Sender},
    },
    thread,
    time::Duration,
};

use unicode_width::UnicodeWidthStr;

const DEFAULT_GLYPHS: [char; 4] = ['|', '/', '-', '\\'];
const DEFAULT_INTERVAL: Duration = Duration::from_millis(100);

/// Redraws `message` followed by a rotating glyph on a single terminal line
/// from a background thread, until [`Spinner::stop`] is called or the spinner
/// is dropped.
///
/// Callers should not write to the same stream between `start` and `stop`.
pub struct Spinner<W: Write + Send + 'static = io::Stderr> {
    message: Arc<Mutex<String>>,
    glyphs: Vec<char>,
    interval: Duration,
    out: Arc<Mutex<W>>,
    cancel: Option<Sender<()>>,
    handle: Option<thread::JoinHandle<usize>>,
}

impl Spinner {
    pub fn new(message: impl Into<String>) -> Spinner {
        Spinner::with_writer(message, io::stderr())
    }
}

impl<W: Write + Send + 'static> Spinner<W> {
    pub fn with_writer(message: impl Into<String>, out: W) -> Self {
        Spinner {
            message: Arc::new(Mutex::new(single_line(message.into()))),
            glyphs: DEFAULT_GLYPHS.to_vec(),
            interval: DEFAULT_INTERVAL,
            out: Arc::new(Mutex::new(out)),
            cancel: None,
            handle: None,
        }
    }

    /// Replaces the animation frames. An empty sequence keeps the default.
    pub fn glyphs(mut self, glyphs: impl IntoIterator<Item = char>) -> Self {
        let glyphs: Vec<char> = glyphs.into_iter().collect();
        if !glyphs.is_empty() {
            self.glyphs = glyphs;
        }
        self
    }

    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    pub fn start(&mut self) {
        if self.is_running() {
            return;
        }

        let (cancel, cancelled) = mpsc::channel::<()>();
        let message = Arc::clone(&self.message);
        let out = Arc::clone(&self.out);
        let glyphs = self.glyphs.clone();
        let interval = self.interval;

        tracing::debug!(?interval, "starting spinner");

        let handle = thread::spawn(move || {
            // Widest render so far, so the final clear covers every column we touched.
            let mut width = 0usize;
            for glyph in glyphs.iter().cycle() {
                let text = lock(&message).clone();
                let line = format!("{text} {glyph} ");
                width = width.max(line.width());
                {
                    let mut out = lock(&out);
                    let _ = write!(out, "\r{line}");
                    let _ = out.flush();
                }
                match cancelled.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => continue,
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            }
            width
        });

        self.cancel = Some(cancel);
        self.handle = Some(handle);
    }

    /// Swaps the displayed text. Picked up by the next tick.
    pub fn update_message(&self, message: impl Into<String>) {
        *lock(&self.message) = single_line(message.into());
    }

    /// Signals the worker, waits for it to exit and blanks the rendered line.
    /// Does nothing when the spinner is not running.
    pub fn stop(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        if let Some(cancel) = self.cancel.take() {
            let _ = cancel.send(());
        }

        let width = handle
            .join()
            .unwrap_or_else(|_| lock(&self.message).width() + 4);

        let mut out = lock(&self.out);
        let _ = write!(out, "\r{}\r", " ".repeat(width));
        let _ = out.flush();
        tracing::debug!("spinner stopped");
    }
}

impl<W: Write + Send + 'static> Drop for Spinner<W> {
    fn drop(&mut self) {
        if self.is_running() {
            self.stop();
        }
    }
}

/// Control characters would break the single-line overwrite, so they render as blanks.
fn single_line(message: String) -> String {
    if message.chars().any(char::is_control) {
        message
            .chars()
            .map(|c| if c.is_control() { ' ' } else { c })
            .collect()
    } else {
        message
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
