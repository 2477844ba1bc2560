/// One input frame. `input` is whatever the configured detector consumes:
/// raw image data, or detections computed upstream.
pub struct Frame<I> {
    pub index: u64,
    pub input: I,
}

impl<I> Frame<I> {
    #[inline]
    pub fn new(index: u64, input: I) -> Self {
        Self { index, input }
    }
}
