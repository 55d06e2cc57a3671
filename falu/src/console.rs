use std::io::Write;
use std::sync::{Arc, Mutex};

/// Shared line-oriented output for streaming commands.
///
/// Each line is written and flushed under one lock so output from the
/// receive loop and from forwarding tasks never interleaves.
#[derive(Clone)]
pub struct Console {
    out: Arc<Mutex<Box<dyn Write + Send>>>,
}

impl Console {
    pub fn new(writer: impl Write + Send + 'static) -> Self {
        Self {
            out: Arc::new(Mutex::new(Box::new(writer))),
        }
    }

    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }

    pub fn line(&self, line: impl AsRef<str>) {
        let mut out = match self.out.lock() {
            Ok(out) => out,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Err(e) = writeln!(out, "{}", line.as_ref()).and_then(|_| out.flush()) {
            tracing::debug!("Failed to write console line: {}", e);
        }
    }
}

impl std::fmt::Debug for Console {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Console").finish_non_exhaustive()
    }
}

/// Timestamp format used at the start of every streamed line
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::SharedBuffer;

    #[test]
    fn test_lines_are_written_whole() {
        let buffer = SharedBuffer::new();
        let console = Console::new(buffer.clone());

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let console = console.clone();
                std::thread::spawn(move || {
                    for j in 0..50 {
                        console.line(format!("worker {i} line {j}"));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let lines = buffer.lines();
        assert_eq!(lines.len(), 400);
        assert!(lines.iter().all(|l| l.starts_with("worker ") && l.contains(" line ")));
    }
}
