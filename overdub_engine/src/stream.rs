use ringbuf::traits::{Consumer, Producer};

use crate::block::SampleBlock;

/// Bridges device callbacks of any length to fixed-size stereo blocks.
///
/// The output side pulls one block of captured input whenever the previous
/// output block has been played out, renders a new block from it and hands
/// the result back frame by frame. Both buffers are reused between blocks.
pub struct BlockAdapter {
    input: SampleBlock,
    output: Vec<i16>,
    cursor: usize,
}

impl BlockAdapter {
    pub fn new(samples_per_block: usize) -> Self {
        Self {
            input: SampleBlock::silence(samples_per_block),
            output: vec![0; samples_per_block],
            // Start exhausted so the first frame renders a block.
            cursor: samples_per_block,
        }
    }

    /// Next stereo frame of output, rendering a new block when needed.
    pub fn next_frame<C, R>(&mut self, captured: &mut C, mut render: R) -> (i16, i16)
    where
        C: Consumer<Item = i16>,
        R: FnMut(&SampleBlock) -> SampleBlock,
    {
        if self.cursor + 1 >= self.output.len() {
            self.take_input(captured);
            let rendered = render(&self.input);
            for (o, &s) in self.output.iter_mut().zip(rendered.samples()) {
                *o = s;
            }
            self.cursor = 0;
        }

        let frame = (self.output[self.cursor], self.output[self.cursor + 1]);
        self.cursor += 2;
        frame
    }

    /// Fills the input block from the capture queue.
    ///
    /// Input that has not arrived yet is silence rather than waited for. The
    /// backlog left behind is always under one block: whole blocks that piled
    /// up behind a late input callback are dropped.
    fn take_input<C>(&mut self, captured: &mut C)
    where
        C: Consumer<Item = i16>,
    {
        let len = self.input.len();
        // Whole frames only; the producer may be between left and right.
        let queued = captured.occupied_len() & !1;
        if len > 0 && queued >= 2 * len {
            captured.skip(queued - len - queued % len);
        }

        let available = (captured.occupied_len() & !1).min(len);
        let samples = self.input.samples_mut();
        let taken = captured.pop_slice(&mut samples[..available]);
        samples[taken..].fill(0);
    }
}

/// Pushes one captured frame as a stereo pair. Drops the whole frame when
/// the queue cannot take both samples, so channels never swap.
pub fn push_frame<P>(queue: &mut P, left: i16, right: i16)
where
    P: Producer<Item = i16>,
{
    if queue.vacant_len() >= 2 {
        let _ = queue.try_push(left);
        let _ = queue.try_push(right);
    }
}
