//! Frame post-processing module
//!
//! Post-processors receive every emitted frame synchronously, in
//! registration order, before the driver reads further. A task opens one
//! [`PostProcessSession`]; `end` is called exactly once per processor when
//! the session finishes or is dropped on an error or abort path.

use tracing::{debug, warn};

use crate::domain::model::Resolution;
use crate::error::{ConcatError, ConcatResult};
use crate::ports::Frame;

pub mod detection;
pub mod object_saver;

pub use detection::{Detection, DetectionPostProcessor, DetectorFactory, ObjectDetector};
pub use object_saver::ObjectSaver;

/// Consumer of emitted frames
pub trait FramePostProcessor {
    /// Processor identifier used in logs and errors
    fn name(&self) -> &str;

    /// Acquire resources before the first file of a task
    fn begin(&mut self, resolution: Resolution) -> ConcatResult<()>;

    /// Handle one emitted frame
    fn process(&mut self, frame: &Frame) -> ConcatResult<()>;

    /// Release resources when the task finishes or aborts
    fn end(&mut self) -> ConcatResult<()>;
}

/// Ordered set of post-processors shared by every task of a batch
#[derive(Default)]
pub struct PostProcessorRegistry {
    processors: Vec<Box<dyn FramePostProcessor>>,
}

impl PostProcessorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a processor; frames reach processors in registration order
    pub fn register<P: FramePostProcessor + 'static>(&mut self, processor: P) {
        self.processors.push(Box::new(processor));
    }

    pub fn register_boxed(&mut self, processor: Box<dyn FramePostProcessor>) {
        self.processors.push(processor);
    }

    pub fn len(&self) -> usize {
        self.processors.len()
    }

    /// Drop every processor registered after the first `len`
    pub fn truncate(&mut self, len: usize) {
        self.processors.truncate(len);
    }

    pub fn is_empty(&self) -> bool {
        self.processors.is_empty()
    }

    pub fn names(&self) -> Vec<String> {
        self.processors.iter().map(|p| p.name().to_string()).collect()
    }

    /// Begin every processor.
    ///
    /// When a `begin` fails, the processors already begun are ended before
    /// the error is returned.
    pub fn begin(&mut self, resolution: Resolution) -> ConcatResult<PostProcessSession<'_>> {
        let mut session = PostProcessSession {
            processors: &mut self.processors[..],
            begun: 0,
            finished: false,
        };
        while session.begun < session.processors.len() {
            let processor = &mut session.processors[session.begun];
            debug!("Beginning post-processor {}", processor.name());
            processor
                .begin(resolution)
                .map_err(|e| attribute(processor.name(), e))?;
            session.begun += 1;
        }
        Ok(session)
    }
}

/// Begun post-processors of one task
pub struct PostProcessSession<'a> {
    processors: &'a mut [Box<dyn FramePostProcessor>],
    begun: usize,
    finished: bool,
}

impl PostProcessSession<'_> {
    pub fn len(&self) -> usize {
        self.begun
    }

    pub fn is_empty(&self) -> bool {
        self.begun == 0
    }

    /// Pass a frame to every processor, stopping at the first failure
    pub fn process(&mut self, frame: &Frame) -> ConcatResult<()> {
        for processor in self.processors[..self.begun].iter_mut() {
            processor
                .process(frame)
                .map_err(|e| attribute(processor.name(), e))?;
        }
        Ok(())
    }

    /// End every processor and report the first `end` failure
    pub fn finish(mut self) -> ConcatResult<()> {
        self.end_all()
    }

    fn end_all(&mut self) -> ConcatResult<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;

        let mut first_error = None;
        for processor in self.processors[..self.begun].iter_mut() {
            debug!("Ending post-processor {}", processor.name());
            if let Err(e) = processor.end() {
                let e = attribute(processor.name(), e);
                warn!("{}", e);
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl Drop for PostProcessSession<'_> {
    fn drop(&mut self) {
        // errors were already logged by end_all
        let _ = self.end_all();
    }
}

/// Tag an error with the processor that raised it
fn attribute(name: &str, error: ConcatError) -> ConcatError {
    match error {
        ConcatError::PostProcessor { .. } => error,
        other => ConcatError::PostProcessor {
            name: name.to_string(),
            message: other.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    type Log = Rc<RefCell<Vec<String>>>;

    struct Recorder {
        name: &'static str,
        log: Log,
        fail_begin: bool,
        fail_process: bool,
        fail_end: bool,
    }

    impl Recorder {
        fn new(name: &'static str, log: &Log) -> Self {
            Self {
                name,
                log: Rc::clone(log),
                fail_begin: false,
                fail_process: false,
                fail_end: false,
            }
        }
    }

    impl FramePostProcessor for Recorder {
        fn name(&self) -> &str {
            self.name
        }

        fn begin(&mut self, _resolution: Resolution) -> ConcatResult<()> {
            self.log.borrow_mut().push(format!("{}:begin", self.name));
            if self.fail_begin {
                return Err(ConcatError::invalid_input("no begin"));
            }
            Ok(())
        }

        fn process(&mut self, _frame: &Frame) -> ConcatResult<()> {
            self.log.borrow_mut().push(format!("{}:process", self.name));
            if self.fail_process {
                return Err(ConcatError::invalid_input("no process"));
            }
            Ok(())
        }

        fn end(&mut self) -> ConcatResult<()> {
            self.log.borrow_mut().push(format!("{}:end", self.name));
            if self.fail_end {
                return Err(ConcatError::invalid_input("no end"));
            }
            Ok(())
        }
    }

    fn resolution() -> Resolution {
        Resolution::new(4, 2).unwrap()
    }

    fn frame() -> Frame {
        Frame::new(4, 2)
    }

    #[test]
    fn test_frames_reach_processors_in_registration_order() {
        let log: Log = Rc::default();
        let mut registry = PostProcessorRegistry::new();
        registry.register(Recorder::new("a", &log));
        registry.register(Recorder::new("b", &log));
        assert_eq!(registry.names(), vec!["a", "b"]);

        let mut session = registry.begin(resolution()).unwrap();
        session.process(&frame()).unwrap();
        session.finish().unwrap();

        assert_eq!(
            *log.borrow(),
            vec!["a:begin", "b:begin", "a:process", "b:process", "a:end", "b:end"]
        );
    }

    #[test]
    fn test_drop_ends_each_processor_once() {
        let log: Log = Rc::default();
        let mut registry = PostProcessorRegistry::new();
        registry.register(Recorder::new("a", &log));
        {
            let _session = registry.begin(resolution()).unwrap();
        }
        assert_eq!(*log.borrow(), vec!["a:begin", "a:end"]);
    }

    #[test]
    fn test_failed_begin_ends_already_begun_processors() {
        let log: Log = Rc::default();
        let mut registry = PostProcessorRegistry::new();
        registry.register(Recorder::new("a", &log));
        let mut failing = Recorder::new("b", &log);
        failing.fail_begin = true;
        registry.register(failing);
        registry.register(Recorder::new("c", &log));

        let error = registry.begin(resolution()).err().unwrap();
        assert!(matches!(error, ConcatError::PostProcessor { ref name, .. } if name == "b"));
        assert_eq!(*log.borrow(), vec!["a:begin", "b:begin", "a:end"]);
    }

    #[test]
    fn test_process_failure_stops_fan_out() {
        let log: Log = Rc::default();
        let mut registry = PostProcessorRegistry::new();
        let mut failing = Recorder::new("a", &log);
        failing.fail_process = true;
        registry.register(failing);
        registry.register(Recorder::new("b", &log));

        let mut session = registry.begin(resolution()).unwrap();
        assert!(session.process(&frame()).is_err());
        drop(session);

        assert_eq!(
            *log.borrow(),
            vec!["a:begin", "b:begin", "a:process", "a:end", "b:end"]
        );
    }

    #[test]
    fn test_finish_reports_end_failure_after_ending_all() {
        let log: Log = Rc::default();
        let mut registry = PostProcessorRegistry::new();
        let mut failing = Recorder::new("a", &log);
        failing.fail_end = true;
        registry.register(failing);
        registry.register(Recorder::new("b", &log));

        let session = registry.begin(resolution()).unwrap();
        assert!(session.finish().is_err());
        assert_eq!(*log.borrow(), vec!["a:begin", "b:begin", "a:end", "b:end"]);
    }

    #[test]
    fn test_empty_registry_session() {
        let mut registry = PostProcessorRegistry::new();
        assert!(registry.is_empty());
        let mut session = registry.begin(resolution()).unwrap();
        assert!(session.is_empty());
        session.process(&frame()).unwrap();
        session.finish().unwrap();
    }
}
