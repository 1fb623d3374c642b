use crate::block::{mix_into, SampleBlock};

/// Ordered, growable sequence of equally sized blocks.
///
/// Positions past the end read as absent; forward writes fill any gap with
/// silence so no index is ever undefined.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LoopBuffer {
    blocks: Vec<SampleBlock>,
}

impl LoopBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_blocks(blocks: Vec<SampleBlock>) -> Self {
        Self { blocks }
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Block at `pos`, or `None` past the end.
    pub fn get(&self, pos: usize) -> Option<&SampleBlock> {
        self.blocks.get(pos)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SampleBlock> {
        self.blocks.iter()
    }

    pub fn into_blocks(self) -> Vec<SampleBlock> {
        self.blocks
    }

    /// Overdub `block` at `pos`.
    ///
    /// Inside the buffer the block is mixed with what is already there; at or
    /// past the end the buffer grows, padding with silence. Negative positions
    /// are dropped. Returns the number of silence blocks inserted.
    pub fn record(&mut self, pos: i64, block: &SampleBlock) -> usize {
        if pos < 0 {
            return 0;
        }
        let pos = pos as usize;

        if let Some(existing) = self.blocks.get_mut(pos) {
            mix_into(existing, block);
            return 0;
        }

        let gap = pos - self.blocks.len();
        if gap > 0 {
            let silence = SampleBlock::silence(block.len());
            self.blocks.resize(pos, silence);
        }
        self.blocks.push(block.clone());
        gap
    }
}

impl<'a> IntoIterator for &'a LoopBuffer {
    type Item = &'a SampleBlock;
    type IntoIter = std::slice::Iter<'a, SampleBlock>;

    fn into_iter(self) -> Self::IntoIter {
        self.blocks.iter()
    }
}
