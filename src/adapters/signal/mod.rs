// Signal adapter - Ctrl-C presses mapped to interrupts

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::error::{ConcatError, ConcatResult};
use crate::ports::{Interrupt, InterruptSource};

/// Counts Ctrl-C presses between polls.
///
/// One press since the last poll skips the current file, two or more stop
/// the batch.
#[derive(Debug, Clone, Default)]
pub struct CtrlCInterrupts {
    presses: Arc<AtomicUsize>,
}

impl CtrlCInterrupts {
    /// Install the process-wide Ctrl-C handler
    pub fn install() -> ConcatResult<Self> {
        let interrupts = Self::default();
        let presses = Arc::clone(&interrupts.presses);

        ctrlc::set_handler(move || {
            let count = presses.fetch_add(1, Ordering::SeqCst) + 1;
            if count == 1 {
                eprintln!(
                    "\nInterrupt received, skipping current file (press again to stop the batch)"
                );
            } else {
                eprintln!("\nInterrupt received, stopping the batch");
            }
        })
        .map_err(|e| {
            ConcatError::invalid_input(format!("Failed to install Ctrl-C handler: {}", e))
        })?;

        Ok(interrupts)
    }

    /// Record a press as the handler would
    pub fn press(&self) {
        self.presses.fetch_add(1, Ordering::SeqCst);
    }
}

impl InterruptSource for CtrlCInterrupts {
    fn poll(&self) -> Option<Interrupt> {
        match self.presses.swap(0, Ordering::SeqCst) {
            0 => None,
            1 => Some(Interrupt::AbortFile),
            _ => Some(Interrupt::AbortBatch),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_press_no_interrupt() {
        let interrupts = CtrlCInterrupts::default();
        assert_eq!(interrupts.poll(), None);
    }

    #[test]
    fn test_single_press_aborts_file_once() {
        let interrupts = CtrlCInterrupts::default();
        interrupts.press();
        assert_eq!(interrupts.poll(), Some(Interrupt::AbortFile));
        assert_eq!(interrupts.poll(), None);
    }

    #[test]
    fn test_double_press_aborts_batch() {
        let interrupts = CtrlCInterrupts::default();
        let handler_side = interrupts.clone();
        handler_side.press();
        handler_side.press();
        handler_side.press();
        assert_eq!(interrupts.poll(), Some(Interrupt::AbortBatch));
        assert_eq!(interrupts.poll(), None);
    }
}
