use super::pipeline::PipelinePhase;

/// User-visible progress events emitted by the pipeline, in emission order.
#[derive(Debug, Clone)]
pub enum Progress {
    PhaseStart { phase: PipelinePhase },
    PhaseFinish,

    StepsStart { total: u64 },
    StepsAdvance { completed: u64 },
    StepsFinish,

    Message(String),
}

pub type ProgressCallback<'a> = Box<dyn Fn(Progress) + Send + Sync + 'a>;

#[derive(Default)]
pub struct ProgressReporter<'a> {
    callback: Option<ProgressCallback<'a>>,
}

impl<'a> ProgressReporter<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_callback(callback: ProgressCallback<'a>) -> Self {
        Self {
            callback: Some(callback),
        }
    }

    #[inline]
    pub fn report(&self, event: Progress) {
        if let Some(cb) = &self.callback {
            cb(event);
        }
    }
}
