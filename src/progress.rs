// src/progress.rs
/// Lightweight progress reporting for a load (fetch + extract).
/// Frontends implement this to surface status to users.
pub trait Progress: Send {
    /// Called at the start with the number of source files.
    fn begin(&mut self, _total: usize) {}

    /// Free-form status line for human eyes.
    fn log(&mut self, _msg: &str) {}

    /// Called when one source file has been fetched (or given up on), by list index.
    fn item_done(&mut self, _index: usize) {}

    /// Called at the end, successful or not.
    fn finish(&mut self) {}
}

/// Forwards everything to the log at info level.
#[derive(Default)]
pub struct LogProgress {
    total: usize,
    done: usize,
}

impl Progress for LogProgress {
    fn begin(&mut self, total: usize) {
        self.total = total;
        self.done = 0;
        logf!("loading {total} source file(s)");
    }

    fn log(&mut self, msg: &str) {
        logf!("{msg}");
    }

    fn item_done(&mut self, index: usize) {
        self.done += 1;
        logd!("source #{index} done ({}/{})", self.done, self.total);
    }

    fn finish(&mut self) {
        logf!("sources done: {}/{}", self.done, self.total);
    }
}
