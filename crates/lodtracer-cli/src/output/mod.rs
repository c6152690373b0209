mod file_output;

use anyhow::Result;
pub use file_output::FileOutput;

use crate::executor::OutputBuffers;

pub trait FinalOutput: Send {
    fn commit(&self, output_buffers: &OutputBuffers) -> Result<()>;
}
